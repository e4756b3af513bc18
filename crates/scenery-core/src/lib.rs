//! Shared vocabulary for the scenery GIS crates.
//!
//! This crate owns the pieces every other crate leans on: the token
//! dictionary that names enumeration values, the line-oriented table
//! reader, the error taxonomy, progress reporting and pipeline settings.
//! It has no knowledge of rasters or maps.

pub mod config;
pub mod constants;
pub mod error;
pub mod progress;
pub mod settings;
pub mod tokens;

pub use error::{Result, SceneryError};
pub use progress::{NoProgress, Progress};
pub use settings::PipelineConfig;
pub use tokens::{TokenId, TokenTable, NO_VALUE};

#[cfg(test)]
mod tests;
