//! Filesystem layer for the platform extension manager.
//!
//! Provides normalized paths, locked atomic writes, and a format-agnostic
//! store for TOML/JSON/YAML documents.

pub mod config;
pub mod error;
pub mod io;
pub mod path;

pub use config::{ConfigStore, Format};
pub use error::{Error, Result};
pub use path::NormalizedPath;
