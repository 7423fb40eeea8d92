//! Format-agnostic document loading and saving

use crate::{Error, NormalizedPath, Result, io};
use serde::{Serialize, de::DeserializeOwned};

/// Document formats understood by [`ConfigStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Json,
    Yaml,
}

impl Format {
    /// Detect the format from a file extension (case-insensitive).
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Detect the format of `path`, failing for unknown extensions.
    pub fn of(path: &NormalizedPath) -> Result<Self> {
        let extension = path.extension().unwrap_or("");
        Self::from_extension(extension).ok_or_else(|| Error::UnsupportedFormat {
            extension: extension.to_string(),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
            Self::Yaml => "YAML",
        }
    }
}

/// Format-agnostic document store.
///
/// Detects the format from the file extension and handles
/// serialization/deserialization transparently. Extension descriptors,
/// `platform.toml`, and the persisted state files all go through here.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigStore;

impl ConfigStore {
    pub fn new() -> Self {
        Self
    }

    /// Load a document from a file.
    ///
    /// Format is detected from file extension:
    /// - `.toml` -> TOML
    /// - `.json` -> JSON
    /// - `.yaml`, `.yml` -> YAML
    pub fn load<T: DeserializeOwned>(&self, path: &NormalizedPath) -> Result<T> {
        let format = Format::of(path)?;
        let content = io::read_locked(path)?;
        self.parse(path, format, &content)
    }

    /// Parse `content` as a document of the given format.
    ///
    /// `path` is only used for error reporting.
    pub fn parse<T: DeserializeOwned>(
        &self,
        path: &NormalizedPath,
        format: Format,
        content: &str,
    ) -> Result<T> {
        let parse_error = |message: String| Error::Parse {
            path: path.to_native(),
            format: format.name().into(),
            message,
        };

        match format {
            Format::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string())),
            Format::Json => serde_json::from_str(content).map_err(|e| parse_error(e.to_string())),
            Format::Yaml => serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string())),
        }
    }

    /// Save a document to a file.
    ///
    /// Format is determined from file extension.
    /// Uses atomic write to prevent corruption.
    pub fn save<T: Serialize>(&self, path: &NormalizedPath, value: &T) -> Result<()> {
        let format = Format::of(path)?;
        let serialize_error = |message: String| Error::Serialize {
            path: path.to_native(),
            format: format.name().into(),
            message,
        };

        let content = match format {
            Format::Toml => {
                toml::to_string_pretty(value).map_err(|e| serialize_error(e.to_string()))?
            }
            Format::Json => {
                serde_json::to_string_pretty(value).map_err(|e| serialize_error(e.to_string()))?
            }
            Format::Yaml => {
                serde_yaml::to_string(value).map_err(|e| serialize_error(e.to_string()))?
            }
        };

        io::write_atomic(path, content.as_bytes())
    }
}
