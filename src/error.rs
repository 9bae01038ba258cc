use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] lcss::CompileError),

    #[error("A logger was already installed")]
    LoggerAlreadySet,
}

// Create a type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use lcss::{Compiler, ErrorKind};

    #[test]
    fn test_compile_errors_convert() {
        let err: Error = Compiler::default()
            .compile_source(".a { color: @nope; }")
            .unwrap_err()
            .into();
        assert_eq!(err.to_string(), "variable @nope is undefined");
        let Error::Compile(inner) = err else {
            panic!("expected a compile error");
        };
        assert_eq!(inner.kind(), ErrorKind::UndefinedVariable);
    }
}
