//! Error types for Experimento

use crate::config::ValidationErrors;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read config file {}: {source}", path.display())]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse YAML document: {0}")]
    Parse(String),

    #[error("Invalid override: {0}")]
    Override(String),

    #[error("Invalid configuration ({n} problem(s)):\n{0}", n = .0.len())]
    Invalid(ValidationErrors),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Error::Invalid(errors)
    }
}

impl Error {
    /// Validation problems carried by this error, if any
    pub fn violations(&self) -> &[crate::config::ConfigError] {
        match self {
            Error::Invalid(errors) => errors.as_slice(),
            _ => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
