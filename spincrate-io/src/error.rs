//! Error types for I/O operations

use thiserror::Error;

/// Errors that can occur during I/O operations
#[derive(Error, Debug)]
pub enum IoError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },
    
    #[error("Invalid file format: {format}")]
    InvalidFormat { format: String },
    
    #[error("Parse error: {message}")]
    ParseError { message: String },
    
    #[error("Write error: {message}")]
    WriteError { message: String },
}

impl From<IoError> for spincrate_core::Error {
    fn from(err: IoError) -> Self {
        match err {
            IoError::FileNotFound { .. } => spincrate_core::Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                err.to_string(),
            )),
            IoError::InvalidFormat { .. } => spincrate_core::Error::UnsupportedFormat(err.to_string()),
            IoError::ParseError { .. } | IoError::WriteError { .. } => {
                spincrate_core::Error::InvalidData(err.to_string())
            }
        }
    }
}
