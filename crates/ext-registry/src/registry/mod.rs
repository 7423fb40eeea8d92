//! The extension registry.
//!
//! [`ExtensionRegistry`] owns the catalog of discoverable extensions, the
//! persisted installation state and the relationship indexes, and exposes
//! the lifecycle state machine on top of them:
//!
//! ```text
//! unknown --install--> installed-disabled <--enable/disable--> installed-enabled
//!    ^                        |                                      |
//!    +-------uninstall--------+--------------uninstall---------------+
//! ```
//!
//! Core extensions are pinned to installed-enabled. Every lifecycle
//! operation checks its `can_*` guard first and fails with
//! [`Error::GuardViolation`] when the guard declines.
//!
//! The registry is single-threaded: it memoizes the catalog and the
//! installed view, and every memoizing or mutating call takes `&mut self`.

mod lifecycle;
mod overrides;
mod startup;

pub use startup::{StartFailure, StartReport};

use std::collections::BTreeMap;
use std::rc::Rc;

use ext_fs::NormalizedPath;

use crate::bundle::{BundleBinder, BundleRouter};
use crate::config::RegistryConfig;
use crate::dependency::{DependencyGraph, SortOutcome};
use crate::descriptor::ExtensionDescriptor;
use crate::error::{Error, Result, Transition};
use crate::id::{CORE_VENDOR, ExtensionId};
use crate::menu::{MemoryMenuService, MenuService, TomlMenuService};
use crate::migration::{LedgerMigrationRunner, MemoryMigrationRunner, MigrationRunner};
use crate::record::{InstallationRecord, MemoryRecordStore, RecordStore, TomlRecordStore};
use crate::source::{DescriptorSource, FsDescriptorSource, MemoryDescriptorSource};
use crate::version::is_newer;

/// A descriptor together with its installation state.
#[derive(Debug, Clone)]
pub struct ExtensionInfo {
    pub descriptor: Rc<ExtensionDescriptor>,
    pub is_installed: bool,
    pub is_enabled: bool,
    /// Version recorded at install or last update.
    pub installed_version: Option<String>,
}

impl ExtensionInfo {
    pub fn id(&self) -> &ExtensionId {
        &self.descriptor.id
    }

    pub fn is_core(&self) -> bool {
        self.descriptor.is_core
    }

    pub fn slug(&self) -> String {
        self.descriptor.id.canonical()
    }

    pub fn bundle(&self) -> String {
        self.descriptor.id.bundle()
    }
}

/// Relationship indexes, rebuilt from descriptors as they are parsed.
///
/// Keys are ordered like reversed slugs (name, then vendor).
#[derive(Debug, Default)]
struct Indexes {
    dependencies: BTreeMap<ExtensionId, Vec<ExtensionId>>,
    dependents: BTreeMap<ExtensionId, Vec<ExtensionId>>,
    overrides: BTreeMap<ExtensionId, Vec<ExtensionId>>,
    overridden: BTreeMap<ExtensionId, Vec<ExtensionId>>,
}

impl Indexes {
    fn add(&mut self, descriptor: &ExtensionDescriptor) {
        let id = &descriptor.id;
        Self::link(
            &mut self.dependencies,
            &mut self.dependents,
            id,
            &descriptor.dependencies,
        );
        Self::link(
            &mut self.overrides,
            &mut self.overridden,
            id,
            &descriptor.overrides,
        );
    }

    fn link(
        forward: &mut BTreeMap<ExtensionId, Vec<ExtensionId>>,
        backward: &mut BTreeMap<ExtensionId, Vec<ExtensionId>>,
        id: &ExtensionId,
        targets: &[ExtensionId],
    ) {
        if targets.is_empty() {
            return;
        }
        forward.insert(id.clone(), targets.to_vec());
        for target in targets {
            let sources = backward.entry(target.clone()).or_default();
            if !sources.contains(id) {
                sources.push(id.clone());
            }
        }
    }

    fn get(map: &BTreeMap<ExtensionId, Vec<ExtensionId>>, id: &ExtensionId) -> Vec<ExtensionId> {
        map.get(id).cloned().unwrap_or_default()
    }
}

/// Extension catalog, installation state and lifecycle operations.
pub struct ExtensionRegistry {
    source: Box<dyn DescriptorSource>,
    records: Box<dyn RecordStore>,
    migrations: Box<dyn MigrationRunner>,
    menus: Box<dyn MenuService>,
    binder: Box<dyn BundleBinder>,
    installer_mode: bool,
    core_vendor: String,
    /// Discovered ids that parsed, in catalog order.
    catalog: Option<Vec<ExtensionId>>,
    descriptors: BTreeMap<ExtensionId, Rc<ExtensionDescriptor>>,
    installed: Option<BTreeMap<ExtensionId, InstallationRecord>>,
    indexes: Indexes,
    /// Handle -> extension that bound it.
    claimed_handles: BTreeMap<String, ExtensionId>,
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("installer_mode", &self.installer_mode)
            .field("core_vendor", &self.core_vendor)
            .field("catalog", &self.catalog)
            .field("claimed_handles", &self.claimed_handles)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ExtensionRegistry`].
///
/// Every collaborator defaults to its in-memory implementation.
pub struct RegistryBuilder {
    source: Box<dyn DescriptorSource>,
    records: Box<dyn RecordStore>,
    migrations: Box<dyn MigrationRunner>,
    menus: Box<dyn MenuService>,
    binder: Box<dyn BundleBinder>,
    installer_mode: bool,
    core_vendor: String,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self {
            source: Box::new(MemoryDescriptorSource::new()),
            records: Box::new(MemoryRecordStore::new()),
            migrations: Box::new(MemoryMigrationRunner::new()),
            menus: Box::new(MemoryMenuService::new()),
            binder: Box::new(BundleRouter::new()),
            installer_mode: false,
            core_vendor: CORE_VENDOR.to_string(),
        }
    }
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// File-backed collaborators for a platform rooted at `base`.
    pub fn from_config(base: &NormalizedPath, config: &RegistryConfig) -> Self {
        Self::new()
            .source(FsDescriptorSource::new(config.extensions_root(base)))
            .records(TomlRecordStore::new(config.records_path(base)))
            .migrations(LedgerMigrationRunner::new(config.migrations_ledger(base)))
            .menus(TomlMenuService::new(config.menus_path(base)))
            .installer_mode(config.installer_mode)
            .core_vendor(config.core_vendor.clone())
    }

    pub fn source(mut self, source: impl DescriptorSource + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    pub fn records(mut self, records: impl RecordStore + 'static) -> Self {
        self.records = Box::new(records);
        self
    }

    pub fn migrations(mut self, migrations: impl MigrationRunner + 'static) -> Self {
        self.migrations = Box::new(migrations);
        self
    }

    pub fn menus(mut self, menus: impl MenuService + 'static) -> Self {
        self.menus = Box::new(menus);
        self
    }

    pub fn binder(mut self, binder: impl BundleBinder + 'static) -> Self {
        self.binder = Box::new(binder);
        self
    }

    pub fn installer_mode(mut self, installer_mode: bool) -> Self {
        self.installer_mode = installer_mode;
        self
    }

    pub fn core_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.core_vendor = vendor.into();
        self
    }

    pub fn build(self) -> ExtensionRegistry {
        ExtensionRegistry {
            source: self.source,
            records: self.records,
            migrations: self.migrations,
            menus: self.menus,
            binder: self.binder,
            installer_mode: self.installer_mode,
            core_vendor: self.core_vendor,
            catalog: None,
            descriptors: BTreeMap::new(),
            installed: None,
            indexes: Indexes::default(),
            claimed_handles: BTreeMap::new(),
        }
    }
}

impl ExtensionRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn installer_mode(&self) -> bool {
        self.installer_mode
    }

    pub fn set_installer_mode(&mut self, installer_mode: bool) {
        self.installer_mode = installer_mode;
    }

    pub fn core_vendor(&self) -> &str {
        &self.core_vendor
    }

    // ---------------------------------------------------------------------
    // Catalog
    // ---------------------------------------------------------------------

    /// Scan the descriptor source and parse every descriptor found.
    ///
    /// Memoized. Descriptors that fail to parse are logged and left out of
    /// the catalog; [`get`](Self::get) on them reports the error.
    pub fn discover(&mut self) -> Result<Vec<ExtensionId>> {
        if let Some(catalog) = &self.catalog {
            return Ok(catalog.clone());
        }

        let mut catalog = Vec::new();
        for id in self.source.scan()? {
            match self.descriptor(&id) {
                Ok(_) => catalog.push(id),
                Err(e) => tracing::warn!(extension = %id, "skipping extension: {e}"),
            }
        }
        catalog.sort();
        catalog.dedup();

        tracing::debug!(count = catalog.len(), "discovered extensions");
        self.catalog = Some(catalog.clone());
        Ok(catalog)
    }

    /// Parsed descriptor of `id`, cached after the first load.
    pub fn descriptor(&mut self, id: &ExtensionId) -> Result<Rc<ExtensionDescriptor>> {
        if let Some(descriptor) = self.descriptors.get(id) {
            return Ok(Rc::clone(descriptor));
        }

        let raw = self.source.load(id)?;
        let descriptor = Rc::new(ExtensionDescriptor::from_payload(
            id.clone(),
            raw.location,
            raw.payload,
        )?);
        self.indexes.add(&descriptor);
        self.descriptors.insert(id.clone(), Rc::clone(&descriptor));
        tracing::debug!(extension = %id, version = %descriptor.version, "parsed descriptor");
        Ok(descriptor)
    }

    /// Descriptor of `id` enriched with its installation state.
    pub fn get(&mut self, id: &ExtensionId) -> Result<ExtensionInfo> {
        let descriptor = self.descriptor(id)?;
        let record = self.load_installed()?.get(id);
        Ok(ExtensionInfo {
            is_installed: record.is_some(),
            is_enabled: record.is_some_and(|r| r.enabled),
            installed_version: record.map(|r| r.version.clone()),
            descriptor,
        })
    }

    /// Whether a valid descriptor exists for `id`.
    pub fn exists(&mut self, id: &ExtensionId) -> Result<bool> {
        match self.descriptor(id) {
            Ok(_) => Ok(true),
            Err(Error::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// All vendor variants of the extension called `name`, in catalog order.
    pub fn vendors(&mut self, name: &str) -> Result<Vec<ExtensionId>> {
        Ok(self
            .discover()?
            .into_iter()
            .filter(|id| id.name() == name)
            .collect())
    }

    /// The catalog ordered by the `dependencies` relation.
    pub fn dependency_order(&mut self) -> Result<SortOutcome<ExtensionId>> {
        let mut graph = DependencyGraph::new();
        for id in self.discover()? {
            let descriptor = self.descriptor(&id)?;
            graph.add_node(id, descriptor.dependencies.iter().cloned());
        }
        Ok(graph.sort())
    }

    // ---------------------------------------------------------------------
    // Installation state
    // ---------------------------------------------------------------------

    /// The installation records, keyed by id. Read from the record store
    /// once and kept in sync by the lifecycle operations.
    pub fn load_installed(&mut self) -> Result<&BTreeMap<ExtensionId, InstallationRecord>> {
        if self.installed.is_none() {
            let mut installed = BTreeMap::new();
            for record in self.records.all()? {
                match record.id() {
                    Ok(id) => {
                        installed.insert(id, record);
                    }
                    Err(e) => tracing::warn!(
                        vendor = %record.vendor,
                        extension = %record.extension,
                        "ignoring installation record: {e}"
                    ),
                }
            }
            tracing::debug!(count = installed.len(), "loaded installation records");
            self.installed = Some(installed);
        }
        Ok(self.installed.get_or_insert_with(BTreeMap::new))
    }

    /// The installation record of `id`, if installed.
    pub fn record(&mut self, id: &ExtensionId) -> Result<Option<InstallationRecord>> {
        Ok(self.load_installed()?.get(id).cloned())
    }

    /// Every discovered extension, in catalog order.
    pub fn extensions(&mut self) -> Result<Vec<ExtensionId>> {
        self.discover()
    }

    pub fn installed(&mut self) -> Result<Vec<ExtensionId>> {
        Ok(self.load_installed()?.keys().cloned().collect())
    }

    pub fn enabled(&mut self) -> Result<Vec<ExtensionId>> {
        Ok(self
            .load_installed()?
            .iter()
            .filter(|(_, r)| r.enabled)
            .map(|(id, _)| id.clone())
            .collect())
    }

    pub fn disabled(&mut self) -> Result<Vec<ExtensionId>> {
        Ok(self
            .load_installed()?
            .iter()
            .filter(|(_, r)| !r.enabled)
            .map(|(id, _)| id.clone())
            .collect())
    }

    pub fn uninstalled(&mut self) -> Result<Vec<ExtensionId>> {
        let catalog = self.discover()?;
        let installed = self.load_installed()?;
        Ok(catalog
            .into_iter()
            .filter(|id| !installed.contains_key(id))
            .collect())
    }

    pub fn is_installed(&mut self, id: &ExtensionId) -> Result<bool> {
        Ok(self.load_installed()?.contains_key(id))
    }

    pub fn is_uninstalled(&mut self, id: &ExtensionId) -> Result<bool> {
        Ok(!self.is_installed(id)?)
    }

    pub fn is_enabled(&mut self, id: &ExtensionId) -> Result<bool> {
        Ok(self.load_installed()?.get(id).is_some_and(|r| r.enabled))
    }

    pub fn is_disabled(&mut self, id: &ExtensionId) -> Result<bool> {
        Ok(!self.is_enabled(id)?)
    }

    /// Whether the descriptor marks `id` as core. Unknown extensions are
    /// not core.
    pub fn is_core(&mut self, id: &ExtensionId) -> Result<bool> {
        match self.descriptor(id) {
            Ok(descriptor) => Ok(descriptor.is_core),
            Err(Error::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Whether `id` is a core extension shipped by the core vendor.
    pub fn is_core_vendor(&mut self, id: &ExtensionId) -> Result<bool> {
        Ok(id.vendor() == self.core_vendor && self.is_core(id)?)
    }

    fn is_active(&mut self, id: &ExtensionId) -> Result<bool> {
        Ok(self.is_installed(id)? && self.is_enabled(id)?)
    }

    // ---------------------------------------------------------------------
    // Relationships
    // ---------------------------------------------------------------------

    pub fn dependencies(&mut self, id: &ExtensionId) -> Result<Vec<ExtensionId>> {
        self.discover()?;
        Ok(Indexes::get(&self.indexes.dependencies, id))
    }

    /// Extensions that declare `id` as a dependency.
    pub fn dependents(&mut self, id: &ExtensionId) -> Result<Vec<ExtensionId>> {
        self.discover()?;
        Ok(Indexes::get(&self.indexes.dependents, id))
    }

    pub fn overrides(&mut self, id: &ExtensionId) -> Result<Vec<ExtensionId>> {
        self.discover()?;
        Ok(Indexes::get(&self.indexes.overrides, id))
    }

    /// Extensions that declare they override `id`.
    pub fn overridden(&mut self, id: &ExtensionId) -> Result<Vec<ExtensionId>> {
        self.discover()?;
        Ok(Indexes::get(&self.indexes.overridden, id))
    }

    /// Dependencies of `id` that are uninstalled or disabled.
    pub fn required_extensions(&mut self, id: &ExtensionId) -> Result<Vec<ExtensionId>> {
        let mut required = Vec::new();
        for dependency in self.dependencies(id)? {
            if !self.is_active(&dependency)? {
                required.push(dependency);
            }
        }
        Ok(required)
    }

    fn has_installed_dependent(&mut self, id: &ExtensionId) -> Result<bool> {
        for dependent in self.dependents(id)? {
            if self.is_installed(&dependent)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    // ---------------------------------------------------------------------
    // Guards
    // ---------------------------------------------------------------------

    /// Installer mode, or: the extension exists, is not installed, and
    /// every dependency is installed and enabled.
    pub fn can_install(&mut self, id: &ExtensionId) -> Result<bool> {
        if self.installer_mode {
            return Ok(true);
        }
        if !self.exists(id)? || self.is_installed(id)? {
            return Ok(false);
        }
        Ok(self.required_extensions(id)?.is_empty())
    }

    /// Not core, installed, and no installed extension depends on it.
    ///
    /// A malformed descriptor cannot declare the extension core, so it
    /// does not block removal.
    pub fn can_uninstall(&mut self, id: &ExtensionId) -> Result<bool> {
        let is_core = match self.is_core(id) {
            Ok(is_core) => is_core,
            Err(Error::InvalidDescriptor { .. }) => false,
            Err(e) => return Err(e),
        };
        if is_core || !self.is_installed(id)? {
            return Ok(false);
        }
        Ok(!self.has_installed_dependent(id)?)
    }

    /// Installer mode, or: installed, not enabled, and every dependency is
    /// installed and enabled.
    pub fn can_enable(&mut self, id: &ExtensionId) -> Result<bool> {
        if self.installer_mode {
            return Ok(true);
        }
        if !self.is_installed(id)? || self.is_enabled(id)? {
            return Ok(false);
        }
        Ok(self.required_extensions(id)?.is_empty())
    }

    /// Not core, enabled, and no installed extension depends on it.
    pub fn can_disable(&mut self, id: &ExtensionId) -> Result<bool> {
        if self.is_core(id)? || !self.is_enabled(id)? {
            return Ok(false);
        }
        Ok(!self.has_installed_dependent(id)?)
    }

    fn guard(&mut self, transition: Transition, id: &ExtensionId) -> Result<()> {
        let allowed = match transition {
            Transition::Install => self.can_install(id)?,
            Transition::Uninstall => self.can_uninstall(id)?,
            Transition::Enable => self.can_enable(id)?,
            Transition::Disable => self.can_disable(id)?,
        };
        if allowed {
            Ok(())
        } else {
            Err(Error::GuardViolation {
                transition,
                id: id.clone(),
            })
        }
    }

    // ---------------------------------------------------------------------
    // Versions
    // ---------------------------------------------------------------------

    /// The installed version, or the descriptor's when not installed.
    pub fn current_version(&mut self, id: &ExtensionId) -> Result<String> {
        if let Some(record) = self.load_installed()?.get(id) {
            return Ok(record.version.clone());
        }
        Ok(self.descriptor(id)?.version.clone())
    }

    /// Whether the descriptor declares a newer version than the installed
    /// one. Always false for uninstalled extensions.
    pub fn has_update(&mut self, id: &ExtensionId) -> Result<bool> {
        let Some(installed) = self.record(id)? else {
            return Ok(false);
        };
        let descriptor = self.descriptor(id)?;
        is_newer(&descriptor.version, &installed.version)
    }

    /// The version an update would install, or the current version.
    pub fn new_version(&mut self, id: &ExtensionId) -> Result<String> {
        if self.has_update(id)? {
            return Ok(self.descriptor(id)?.version.clone());
        }
        self.current_version(id)
    }

    /// Insert or replace `record` in the installed view.
    fn remember(&mut self, id: &ExtensionId, record: InstallationRecord) -> Result<()> {
        self.load_installed()?;
        if let Some(installed) = self.installed.as_mut() {
            installed.insert(id.clone(), record);
        }
        Ok(())
    }

    fn forget(&mut self, id: &ExtensionId) {
        if let Some(installed) = self.installed.as_mut() {
            installed.remove(id);
        }
    }
}
