use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Required path '{field}' is empty")]
    MissingPath { field: &'static str },

    #[error("Invalid watch directory '{path}': {reason}")]
    WatchDirInvalid { path: PathBuf, reason: String },

    #[error("Tag blacklist is not a valid regular expression: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("Mover '{mover}' is unavailable: {reason}")]
    MoverUnavailable { mover: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
