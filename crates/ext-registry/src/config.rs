//! Platform configuration from `platform.toml`.
//!
//! ```toml
//! extensions_dir = "extensions"
//! state_dir = ".platform"
//! installer_mode = false
//! core_vendor = "platform"
//! ```
//!
//! Relative directories are resolved against the directory holding the
//! configuration file.

use ext_fs::{ConfigStore, NormalizedPath};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::id::CORE_VENDOR;

/// File name of the platform configuration.
pub const CONFIG_FILENAME: &str = "platform.toml";

const RECORDS_FILE: &str = "extensions.toml";
const MIGRATIONS_FILE: &str = "migrations.toml";
const MENUS_FILE: &str = "menus.toml";

fn default_extensions_dir() -> String {
    "extensions".to_string()
}

fn default_state_dir() -> String {
    ".platform".to_string()
}

fn default_core_vendor() -> String {
    CORE_VENDOR.to_string()
}

/// Registry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Root of the extensions tree.
    #[serde(default = "default_extensions_dir")]
    pub extensions_dir: String,
    /// Where installation records, the migration ledger and menus live.
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
    /// Bypass dependency and enablement guards while bootstrapping.
    #[serde(default)]
    pub installer_mode: bool,
    /// Vendor whose core extensions ship with the platform.
    #[serde(default = "default_core_vendor")]
    pub core_vendor: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            extensions_dir: default_extensions_dir(),
            state_dir: default_state_dir(),
            installer_mode: false,
            core_vendor: default_core_vendor(),
        }
    }
}

impl RegistryConfig {
    /// Load from a TOML, JSON or YAML file.
    pub fn load(path: &NormalizedPath) -> Result<Self> {
        Ok(ConfigStore::new().load(path)?)
    }

    /// Load `base/platform.toml`, falling back to defaults when it is absent.
    pub fn load_or_default(base: &NormalizedPath) -> Result<Self> {
        let path = base.join(CONFIG_FILENAME);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn extensions_root(&self, base: &NormalizedPath) -> NormalizedPath {
        resolve(base, &self.extensions_dir)
    }

    pub fn state_root(&self, base: &NormalizedPath) -> NormalizedPath {
        resolve(base, &self.state_dir)
    }

    pub fn records_path(&self, base: &NormalizedPath) -> NormalizedPath {
        self.state_root(base).join(RECORDS_FILE)
    }

    pub fn migrations_ledger(&self, base: &NormalizedPath) -> NormalizedPath {
        self.state_root(base).join(MIGRATIONS_FILE)
    }

    pub fn menus_path(&self, base: &NormalizedPath) -> NormalizedPath {
        self.state_root(base).join(MENUS_FILE)
    }
}

fn resolve(base: &NormalizedPath, dir: &str) -> NormalizedPath {
    if std::path::Path::new(dir).is_absolute() {
        NormalizedPath::new(dir)
    } else {
        base.join(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_apply_to_missing_keys() {
        let config: RegistryConfig = toml::from_str("installer_mode = true").unwrap();
        assert_eq!(
            config,
            RegistryConfig {
                installer_mode: true,
                ..RegistryConfig::default()
            }
        );
    }

    #[test]
    fn state_paths_under_base() {
        let config = RegistryConfig::default();
        let base = NormalizedPath::new("/srv/site");
        assert_eq!(config.extensions_root(&base).as_str(), "/srv/site/extensions");
        assert_eq!(
            config.records_path(&base).as_str(),
            "/srv/site/.platform/extensions.toml"
        );
        assert_eq!(
            config.migrations_ledger(&base).as_str(),
            "/srv/site/.platform/migrations.toml"
        );
    }

    #[test]
    fn absolute_dirs_are_kept() {
        let config = RegistryConfig {
            extensions_dir: "/opt/extensions".to_string(),
            ..RegistryConfig::default()
        };
        let base = NormalizedPath::new("/srv/site");
        assert_eq!(config.extensions_root(&base).as_str(), "/opt/extensions");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RegistryConfig::load_or_default(&NormalizedPath::new(dir.path())).unwrap();
        assert_eq!(config, RegistryConfig::default());
    }
}
