//! Platform context detection
//!
//! Locates the platform root from any directory below it, so commands work
//! from anywhere in the tree, and opens a registry over its on-disk state.

use std::path::{Path, PathBuf};

use ext_fs::NormalizedPath;
use ext_registry::{BundleRouter, CONFIG_FILENAME, ExtensionRegistry, RegistryBuilder, RegistryConfig};

use crate::error::Result;

/// Walk up from `cwd` looking for `platform.toml`.
pub fn find_platform_root(cwd: &Path) -> Option<PathBuf> {
    cwd.ancestors()
        .find(|dir| dir.join(CONFIG_FILENAME).is_file())
        .map(Path::to_path_buf)
}

/// An opened platform: root, effective config and the registry over it.
pub struct PlatformContext {
    pub root: NormalizedPath,
    pub config: RegistryConfig,
    pub registry: ExtensionRegistry,
    /// In-process binder shared with the registry; inspect after `start`.
    pub router: BundleRouter,
}

impl PlatformContext {
    /// Open the platform containing `cwd`.
    ///
    /// Without a `platform.toml` anywhere above, `cwd` itself is the root and
    /// the defaults apply. `installer` forces installer mode on.
    pub fn open(cwd: &Path, installer: bool) -> Result<Self> {
        let root = find_platform_root(cwd).unwrap_or_else(|| cwd.to_path_buf());
        let root = NormalizedPath::new(root);
        tracing::debug!(root = %root, "opening platform");

        let mut config = RegistryConfig::load_or_default(&root)?;
        if installer {
            config.installer_mode = true;
        }

        let router = BundleRouter::new();
        let registry = RegistryBuilder::from_config(&root, &config)
            .binder(router.clone())
            .build();

        Ok(Self {
            root,
            config,
            registry,
            router,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn finds_root_from_nested_directory() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILENAME), "").unwrap();
        let nested = temp.path().join("extensions/acme/blog");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_platform_root(&nested), Some(temp.path().to_path_buf()));
    }

    #[test]
    fn no_config_means_no_root() {
        let temp = TempDir::new().unwrap();
        assert_eq!(find_platform_root(temp.path()), None);
    }

    #[test]
    fn installer_flag_overrides_config() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILENAME), "installer_mode = false\n").unwrap();

        let context = PlatformContext::open(temp.path(), true).unwrap();
        assert!(context.config.installer_mode);
        assert!(context.registry.installer_mode());
    }

    #[test]
    fn falls_back_to_cwd_with_defaults() {
        let temp = TempDir::new().unwrap();
        let context = PlatformContext::open(temp.path(), false).unwrap();

        assert_eq!(context.config, RegistryConfig::default());
        assert!(!context.registry.installer_mode());
    }
}
