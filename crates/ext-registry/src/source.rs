//! Descriptor sources: where extension descriptors come from.
//!
//! [`FsDescriptorSource`] scans an extensions directory laid out as
//!
//! ```text
//! extensions/
//!   platform/
//!     menus/extension.toml      -> platform.menus
//!     users/extension.toml      -> platform.users
//!   blog/extension.json         -> default.blog
//! ```
//!
//! [`MemoryDescriptorSource`] serves payloads registered in code.

use std::collections::BTreeMap;
use std::fs;

use ext_fs::{ConfigStore, NormalizedPath};

use crate::error::{Error, Result};
use crate::id::{DEFAULT_VENDOR, ExtensionId};

/// File stem of every descriptor file.
pub const DESCRIPTOR_STEM: &str = "extension";

/// Accepted descriptor file extensions, in lookup order.
pub const DESCRIPTOR_EXTENSIONS: &[&str] = &["toml", "json", "yaml", "yml"];

/// A raw descriptor as read from its source.
#[derive(Debug, Clone)]
pub struct DescriptorPayload {
    /// Directory of the extension.
    pub location: NormalizedPath,
    /// Key/value tree of the descriptor.
    pub payload: serde_json::Value,
}

/// Supplies extension descriptors to the registry.
pub trait DescriptorSource {
    /// List every extension this source knows about.
    fn scan(&self) -> Result<Vec<ExtensionId>>;

    /// Load the raw descriptor for `id`.
    ///
    /// Returns [`Error::NotFound`] when there is none and
    /// [`Error::InvalidDescriptor`] when the file cannot be parsed.
    fn load(&self, id: &ExtensionId) -> Result<DescriptorPayload>;
}

/// Descriptor source backed by an extensions directory.
#[derive(Debug, Clone)]
pub struct FsDescriptorSource {
    root: NormalizedPath,
    store: ConfigStore,
}

impl FsDescriptorSource {
    pub fn new(root: impl Into<NormalizedPath>) -> Self {
        Self {
            root: root.into(),
            store: ConfigStore::new(),
        }
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    /// The descriptor file inside `dir`, if any.
    fn descriptor_file(dir: &NormalizedPath) -> Option<NormalizedPath> {
        DESCRIPTOR_EXTENSIONS
            .iter()
            .map(|ext| dir.join(&format!("{DESCRIPTOR_STEM}.{ext}")))
            .find(NormalizedPath::is_file)
    }

    /// Sorted names of the subdirectories of `dir`.
    fn subdirectories(dir: &NormalizedPath) -> Result<Vec<String>> {
        let entries = fs::read_dir(dir.to_native())
            .map_err(|e| Error::Fs(ext_fs::Error::io(dir.to_native(), e)))?;

        let mut names: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.path().is_dir())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| !name.starts_with('.'))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Candidate directories for `id`, most specific first.
    fn candidate_dirs(&self, id: &ExtensionId) -> Vec<NormalizedPath> {
        let mut dirs = vec![self.root.join(&id.relative_dir())];
        if id.is_default_vendor() {
            dirs.push(self.root.join(&id.bundle()));
        }
        dirs
    }
}

impl DescriptorSource for FsDescriptorSource {
    fn scan(&self) -> Result<Vec<ExtensionId>> {
        let mut found: Vec<ExtensionId> = Vec::new();

        if !self.root.is_dir() {
            tracing::debug!(root = %self.root, "extensions directory does not exist");
            return Ok(found);
        }

        for first in Self::subdirectories(&self.root)? {
            let first_dir = self.root.join(&first);

            // One level: extensions/<name>/extension.* with the default vendor
            if Self::descriptor_file(&first_dir).is_some() {
                match ExtensionId::new(DEFAULT_VENDOR, first.as_str()) {
                    Ok(id) => found.push(id),
                    Err(e) => tracing::warn!(dir = %first_dir, "skipping extension: {e}"),
                }
            }

            // Two levels: extensions/<vendor>/<name>/extension.*
            for second in Self::subdirectories(&first_dir)? {
                let second_dir = first_dir.join(&second);
                if Self::descriptor_file(&second_dir).is_none() {
                    continue;
                }
                match ExtensionId::new(first.as_str(), second.as_str()) {
                    Ok(id) => found.push(id),
                    Err(e) => tracing::warn!(dir = %second_dir, "skipping extension: {e}"),
                }
            }
        }

        found.sort();
        found.dedup();
        tracing::debug!(root = %self.root, count = found.len(), "scanned extensions directory");
        Ok(found)
    }

    fn load(&self, id: &ExtensionId) -> Result<DescriptorPayload> {
        for dir in self.candidate_dirs(id) {
            let Some(file) = Self::descriptor_file(&dir) else {
                continue;
            };
            let payload: serde_json::Value = self.store.load(&file).map_err(|e| match e {
                ext_fs::Error::Parse { message, .. } => Error::invalid_descriptor(id, message),
                other => Error::Fs(other),
            })?;
            return Ok(DescriptorPayload {
                location: dir,
                payload,
            });
        }
        Err(Error::NotFound(id.clone()))
    }
}

/// Descriptor source holding payloads in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryDescriptorSource {
    payloads: BTreeMap<ExtensionId, serde_json::Value>,
}

impl MemoryDescriptorSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a descriptor payload.
    pub fn insert(&mut self, id: ExtensionId, payload: serde_json::Value) {
        self.payloads.insert(id, payload);
    }

    /// Builder-style [`insert`](Self::insert) taking a slug.
    pub fn with(mut self, slug: &str, payload: serde_json::Value) -> Result<Self> {
        self.insert(ExtensionId::parse(slug)?, payload);
        Ok(self)
    }
}

impl DescriptorSource for MemoryDescriptorSource {
    fn scan(&self) -> Result<Vec<ExtensionId>> {
        Ok(self.payloads.keys().cloned().collect())
    }

    fn load(&self, id: &ExtensionId) -> Result<DescriptorPayload> {
        let payload = self
            .payloads
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.clone()))?;
        Ok(DescriptorPayload {
            location: NormalizedPath::new(id.relative_dir()),
            payload,
        })
    }
}
