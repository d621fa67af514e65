//! Error types for the mailgate-core crate

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No section: '{0}'")]
    NoSection(String),

    #[error("No option '{key}' in section: '{section}'")]
    NoOption { section: String, key: String },

    #[error("Bad value substitution in [{section}] {key}: {message}")]
    Interpolation {
        section: String,
        key: String,
        message: String,
    },

    #[error("Not a boolean: [{section}] {key} = '{value}'")]
    InvalidBoolean {
        section: String,
        key: String,
        value: String,
    },

    #[error("Cannot find a directory to store certificate (tried: {0})")]
    NoCertificateDirectory(String),

    #[error("Failed to install certbot, unsupported distribution: {0}")]
    UnsupportedDistribution(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Command execution failed: {cmd} - {message}")]
    Command { cmd: String, message: String },

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Command exited with status {exit_code}: {cmd} - {stderr}")]
    CommandFailed {
        cmd: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Template error: {0}")]
    Template(String),

    #[error("Template file does not exist: {}", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn template(msg: impl Into<String>) -> Self {
        Error::Template(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    pub fn no_option(section: &str, key: &str) -> Self {
        Error::NoOption {
            section: section.to_string(),
            key: key.to_string(),
        }
    }

    /// True when the error is the "no such section" condition, which callers
    /// catch to retry under a fallback section.
    pub fn is_no_section(&self) -> bool {
        matches!(self, Error::NoSection(_))
    }
}
