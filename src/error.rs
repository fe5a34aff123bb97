use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConfError {
    #[error("failed to parse {file} line {line}: {message}")]
    ParseError {
        file: String,
        line: usize,
        message: String,
    },

    #[error("{0} is not in the allowed list of permissions")]
    InvalidPermission(String),

    #[error("group dependency cycle: {0}")]
    GroupDependency(String),

    #[error("config dependency cycle: {0}")]
    ConfigDependency(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl ConfError {
    pub(crate) fn parse(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        ConfError::ParseError {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    pub(crate) fn io(path: &std::path::Path, err: std::io::Error) -> Self {
        ConfError::IoError(format!("{}: {err}", path.display()))
    }
}

impl From<std::io::Error> for ConfError {
    fn from(err: std::io::Error) -> Self {
        ConfError::IoError(err.to_string())
    }
}
