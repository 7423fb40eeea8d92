//! Installation records: the persisted install/enable state.
//!
//! One record exists per installed extension. Stores provide row-level
//! atomicity for single writes only; the registry's multi-step lifecycle
//! operations are not wrapped in a transaction.

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use ext_fs::{ConfigStore, NormalizedPath};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::id::{DEFAULT_VENDOR, ExtensionId};

fn default_vendor() -> String {
    DEFAULT_VENDOR.to_string()
}

/// Persisted state of one installed extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallationRecord {
    /// Empty or missing vendors are read as the default vendor.
    #[serde(default = "default_vendor")]
    pub vendor: String,
    pub extension: String,
    pub version: String,
    pub enabled: bool,
    pub installed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InstallationRecord {
    pub fn new(id: &ExtensionId, version: impl Into<String>, enabled: bool) -> Self {
        let now = Utc::now();
        Self {
            vendor: id.vendor().to_string(),
            extension: id.name().to_string(),
            version: version.into(),
            enabled,
            installed_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> Result<ExtensionId> {
        let vendor = if self.vendor.is_empty() {
            DEFAULT_VENDOR
        } else {
            self.vendor.as_str()
        };
        ExtensionId::new(vendor, self.extension.as_str())
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.updated_at = Utc::now();
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
        self.updated_at = Utc::now();
    }

    fn matches(&self, id: &ExtensionId) -> bool {
        self.id().is_ok_and(|own| &own == id)
    }
}

/// CRUD over installation records.
pub trait RecordStore {
    /// Every record, in storage order.
    fn all(&self) -> Result<Vec<InstallationRecord>>;

    fn find(&self, id: &ExtensionId) -> Result<Option<InstallationRecord>> {
        Ok(self.all()?.into_iter().find(|r| r.matches(id)))
    }

    /// Insert the record, replacing any record for the same extension.
    fn save(&mut self, record: InstallationRecord) -> Result<()>;

    /// Delete the record for `id`. Returns whether one existed.
    fn delete(&mut self, id: &ExtensionId) -> Result<bool>;
}

fn upsert(records: &mut Vec<InstallationRecord>, record: InstallationRecord) {
    let id = record.id().ok();
    match records
        .iter_mut()
        .find(|r| id.as_ref().is_some_and(|id| r.matches(id)))
    {
        Some(existing) => *existing = record,
        None => records.push(record),
    }
}

/// In-memory record store.
///
/// Clones share the same records, so a test can keep a handle while the
/// registry owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    records: Rc<RefCell<Vec<InstallationRecord>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing records.
    pub fn with_records(records: impl IntoIterator<Item = InstallationRecord>) -> Self {
        Self {
            records: Rc::new(RefCell::new(records.into_iter().collect())),
        }
    }
}

impl RecordStore for MemoryRecordStore {
    fn all(&self) -> Result<Vec<InstallationRecord>> {
        Ok(self.records.borrow().clone())
    }

    fn save(&mut self, record: InstallationRecord) -> Result<()> {
        upsert(&mut self.records.borrow_mut(), record);
        Ok(())
    }

    fn delete(&mut self, id: &ExtensionId) -> Result<bool> {
        let mut records = self.records.borrow_mut();
        let before = records.len();
        records.retain(|r| !r.matches(id));
        Ok(records.len() != before)
    }
}

/// On-disk layout of the records file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecordFile {
    /// Format version for forward compatibility
    version: String,
    #[serde(default)]
    extensions: Vec<InstallationRecord>,
}

impl Default for RecordFile {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            extensions: Vec::new(),
        }
    }
}

/// Record store persisted as a TOML file.
///
/// Reads take a shared lock and writes go through a locked temp file plus
/// rename, so each single write is atomic. The format follows the file
/// extension. A missing file means no
/// extension is installed.
#[derive(Debug, Clone)]
pub struct TomlRecordStore {
    path: NormalizedPath,
}

impl TomlRecordStore {
    pub fn new(path: impl Into<NormalizedPath>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &NormalizedPath {
        &self.path
    }

    fn read(&self) -> Result<RecordFile> {
        match ConfigStore::new().load(&self.path) {
            Ok(file) => Ok(file),
            Err(e) if e.is_not_found() => Ok(RecordFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, file: &RecordFile) -> Result<()> {
        ConfigStore::new().save(&self.path, file)?;
        Ok(())
    }
}

impl RecordStore for TomlRecordStore {
    fn all(&self) -> Result<Vec<InstallationRecord>> {
        Ok(self.read()?.extensions)
    }

    fn save(&mut self, record: InstallationRecord) -> Result<()> {
        let mut file = self.read()?;
        upsert(&mut file.extensions, record);
        self.write(&file)
    }

    fn delete(&mut self, id: &ExtensionId) -> Result<bool> {
        let mut file = self.read()?;
        let before = file.extensions.len();
        file.extensions.retain(|r| !r.matches(id));
        let removed = file.extensions.len() != before;
        if removed {
            self.write(&file)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn id(slug: &str) -> ExtensionId {
        ExtensionId::parse(slug).unwrap()
    }

    #[test]
    fn memory_store_upserts_by_id() {
        let mut store = MemoryRecordStore::new();
        store
            .save(InstallationRecord::new(&id("acme.blog"), "1.0", false))
            .unwrap();
        store
            .save(InstallationRecord::new(&id("acme.blog"), "1.1", true))
            .unwrap();

        let all = store.all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].version, "1.1");
        assert!(all[0].enabled);
    }

    #[test]
    fn memory_store_clones_share_state() {
        let store = MemoryRecordStore::new();
        let mut handle = store.clone();
        handle
            .save(InstallationRecord::new(&id("acme.blog"), "1.0", true))
            .unwrap();

        assert!(store.find(&id("acme.blog")).unwrap().is_some());
    }

    #[test]
    fn memory_store_delete() {
        let mut store = MemoryRecordStore::with_records([InstallationRecord::new(
            &id("acme.blog"),
            "1.0",
            true,
        )]);
        assert!(store.delete(&id("acme.blog")).unwrap());
        assert!(!store.delete(&id("acme.blog")).unwrap());
        assert!(store.all().unwrap().is_empty());
    }

    #[test]
    fn empty_vendor_reads_as_default() {
        let record = InstallationRecord {
            vendor: String::new(),
            ..InstallationRecord::new(&id("blog"), "1.0", true)
        };
        assert_eq!(record.id().unwrap(), id("default.blog"));
    }

    #[test]
    fn toml_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = TomlRecordStore::new(dir.path().join("extensions.toml"));
        assert!(store.all().unwrap().is_empty());
    }

    #[test]
    fn toml_store_persists_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state/extensions.toml");

        let mut store = TomlRecordStore::new(&*path);
        store
            .save(InstallationRecord::new(&id("platform.menus"), "1.1.1", true))
            .unwrap();
        store
            .save(InstallationRecord::new(&id("acme.blog"), "0.2", false))
            .unwrap();

        let reopened = TomlRecordStore::new(&*path);
        let blog = reopened.find(&id("acme.blog")).unwrap().unwrap();
        assert_eq!(blog.version, "0.2");
        assert!(!blog.enabled);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("version = \"1.0\""));
        assert!(raw.contains("vendor = \"platform\""));
    }

    #[test]
    fn toml_store_reads_records_without_vendor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extensions.toml");
        std::fs::write(
            &path,
            r#"version = "1.0"

[[extensions]]
extension = "blog"
version = "1.0"
enabled = true
installed_at = "2012-06-01T10:00:00Z"
updated_at = "2012-06-01T10:00:00Z"
"#,
        )
        .unwrap();

        let store = TomlRecordStore::new(&*path);
        let record = store.find(&id("blog")).unwrap().unwrap();
        assert_eq!(record.vendor, "default");
    }
}
