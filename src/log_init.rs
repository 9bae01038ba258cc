use log::{Level, Metadata, Record};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Appends `[LEVEL] target: message` lines to a file.
struct FileLogger {
    file_path: PathBuf,
    level: Level,
}

impl log::Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            if let Ok(mut file) = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.file_path)
            {
                let _ = writeln!(
                    file,
                    "[{}] {}: {}",
                    record.level(),
                    record.target(),
                    record.args()
                );
            }
        }
    }

    fn flush(&self) {}
}

/// Sends debug and higher records to `path`.
pub fn init_logger(path: impl AsRef<Path>) -> Result<()> {
    init_logger_with_level(path, Level::Debug)
}

/// Sends records at `level` and higher to `path`. Fails if a logger is
/// already installed.
pub fn init_logger_with_level(path: impl AsRef<Path>, level: Level) -> Result<()> {
    let logger = FileLogger {
        file_path: path.as_ref().to_path_buf(),
        level,
    };
    log::set_boxed_logger(Box::new(logger)).map_err(|_| Error::LoggerAlreadySet)?;
    log::set_max_level(level.to_level_filter());
    Ok(())
}
