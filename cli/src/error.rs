use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to load settings from {}: {source}", path.display())]
    Settings {
        path: PathBuf,
        source: mailgate_core::Error,
    },

    #[error("{0}")]
    Core(#[from] mailgate_core::Error),
}
