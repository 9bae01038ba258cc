//! Facade over the [`lcss`] resolution engine with a file logger for
//! tracing compiles.
//!
//! ```rust,no_run
//! use lcss_rs::{Compiler, CompileOptions};
//!
//! lcss_rs::init_logger("lcss.log").unwrap();
//! let compilation = Compiler::new(CompileOptions::default())
//!     .compile_file("styles/main.less")
//!     .unwrap();
//! for warning in &compilation.warnings {
//!     eprintln!("{}: {}", warning.span, warning.message);
//! }
//! ```

pub mod error;
pub mod log_init;

pub use error::{Error, Result};
pub use lcss::*;
pub use log_init::{init_logger, init_logger_with_level};
