//! Library error type.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InteropError {
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),
    #[error("python interpreter not found: {0}")]
    InterpreterNotFound(String),
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("background execution failed: {0}")]
    Background(String),
}

pub type Result<T> = std::result::Result<T, InteropError>;
