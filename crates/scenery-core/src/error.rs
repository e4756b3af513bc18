//! Error taxonomy shared by importers, operators and loaders.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Every failure the scenery crates can report.
#[derive(Debug, Error)]
pub enum SceneryError {
    /// Malformed or unsupported input. Nothing partial is returned.
    #[error("{source_name}: {reason}")]
    Format { source_name: String, reason: String },

    /// Some samples fell outside the expected domain and were written as no-data.
    /// The grid was still fully rewritten.
    #[error("{unmapped} of {total} samples could not be mapped")]
    SemanticRange { unmapped: usize, total: usize },

    /// An editing operation would have produced an invalid map.
    #[error("topology error: {0}")]
    Topology(String),

    /// A numeric geometry operation failed on degenerate input.
    #[error("geometry error: {0}")]
    Geometry(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A configuration line could not be parsed.
    #[error("{}:{line}: {reason}", file.display())]
    Config {
        file: PathBuf,
        line: usize,
        reason: String,
    },

    /// The progress callback asked the operation to stop.
    #[error("operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, SceneryError>;

impl SceneryError {
    /// Shorthand for a format error.
    pub fn format(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Format {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an `io::Error` with the path that produced it.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Read a whole file into memory, attaching the path to any failure.
pub fn read_file(path: &std::path::Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| SceneryError::io(path, e))
}
