//! Mixins: argument matching and call expansion.
//!
//! [`matcher`] decides whether one call fits one definition and binds its
//! parameters. Expansion of calls lives on the evaluator (see `resolver`).

pub mod matcher;
mod resolver;

pub use matcher::{Argument, ArgumentBinding, Bound, MatchFailure, bind, matches};
