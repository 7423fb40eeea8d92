//! [`TestPlatform`] builder for registry and CLI test scenarios.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::descriptor::DescriptorBuilder;

/// A temporary platform root:
///
/// ```text
/// <root>/
///   platform.toml            (write_config)
///   extensions/
///     <vendor>/<name>/extension.toml
///     <name>/extension.toml  (default vendor)
/// ```
pub struct TestPlatform {
    temp_dir: TempDir,
}

impl Default for TestPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl TestPlatform {
    /// Create an empty platform root with an `extensions/` directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("extensions")).unwrap();
        Self { temp_dir }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn extensions_dir(&self) -> PathBuf {
        self.root().join("extensions")
    }

    /// Directory of `vendor.name`, or `name` for a slug without vendor.
    pub fn extension_dir(&self, slug: &str) -> PathBuf {
        match slug.split_once('.') {
            Some((vendor, name)) => self.extensions_dir().join(vendor).join(name),
            None => self.extensions_dir().join(slug),
        }
    }

    /// Write `extension.toml` for `slug`.
    pub fn add_extension(&self, slug: &str, descriptor: &DescriptorBuilder) -> PathBuf {
        self.add_raw_descriptor(slug, "extension.toml", &descriptor.to_toml())
    }

    /// Write a descriptor file with arbitrary name and content.
    pub fn add_raw_descriptor(&self, slug: &str, file_name: &str, content: &str) -> PathBuf {
        let dir = self.extension_dir(slug);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(file_name), content).unwrap();
        dir
    }

    /// Add an empty migration file to the extension.
    pub fn add_migration(&self, slug: &str, name: &str) {
        let dir = self.extension_dir(slug).join("migrations");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{name}.sql")), "").unwrap();
    }

    /// Write `platform.toml` at the root.
    pub fn write_config(&self, content: &str) {
        fs::write(self.root().join("platform.toml"), content).unwrap();
    }

    /// Read a file relative to the root.
    pub fn read(&self, path: &str) -> String {
        let full_path = self.root().join(path);
        fs::read_to_string(&full_path)
            .unwrap_or_else(|_| panic!("Could not read file: {}", full_path.display()))
    }

    /// Assert that `path` (relative to the root) exists.
    pub fn assert_file_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }
}
