use crate::ConfigFormat;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CfgDiffError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A comparison target could not be opened or read.
    #[error("Failed to open file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document sniffed (or forced) as a format did not parse as that format.
    #[error("Failed to parse {format} document: {detail}")]
    Parse { format: ConfigFormat, detail: String },

    /// The report sink could not persist a report.
    #[error("Failed to write report file '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path error: {0}")]
    Path(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Hash cache error: {0}")]
    Cache(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Walk error: {0}")]
    Walk(String),
}

impl CfgDiffError {
    pub fn parse(format: ConfigFormat, detail: impl Into<String>) -> Self {
        Self::Parse {
            format,
            detail: detail.into(),
        }
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}

pub type Result<T> = std::result::Result<T, CfgDiffError>;
