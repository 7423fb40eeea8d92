//! Extension dependency resolution and lifecycle engine.
//!
//! This crate discovers extension descriptors, tracks which extensions are
//! installed and enabled, orders them by their dependency and override
//! relations, and enforces the lifecycle rules (a depended-upon extension
//! cannot be uninstalled, a core extension cannot be disabled, ...).
//!
//! Storage, migrations, menus and bundle binding are collaborators behind
//! traits; file-backed and in-memory implementations ship with the crate.

pub mod bundle;
pub mod config;
pub mod dependency;
pub mod descriptor;
pub mod error;
pub mod id;
pub mod menu;
pub mod migration;
pub mod record;
pub mod registry;
pub mod source;
pub mod version;

pub use bundle::{BundleBinder, BundleRouter};
pub use config::{CONFIG_FILENAME, RegistryConfig};
pub use dependency::{DependencyGraph, SortOutcome};
pub use descriptor::{Deferred, ExtensionDescriptor, ListenersConfig, RoutesConfig};
pub use error::{Error, Result, Status, Transition};
pub use id::{CORE_VENDOR, DEFAULT_VENDOR, ExtensionId};
pub use menu::{MemoryMenuService, MenuError, MenuItem, MenuService, TomlMenuService};
pub use migration::{Direction, LedgerMigrationRunner, MemoryMigrationRunner, MigrationRunner};
pub use record::{InstallationRecord, MemoryRecordStore, RecordStore, TomlRecordStore};
pub use registry::{ExtensionInfo, ExtensionRegistry, RegistryBuilder, StartFailure, StartReport};
pub use source::{DescriptorSource, FsDescriptorSource, MemoryDescriptorSource};
