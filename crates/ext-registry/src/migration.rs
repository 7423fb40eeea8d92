//! Migration ordering and bookkeeping.
//!
//! The registry never executes migration bodies. A [`MigrationRunner`]
//! decides which migrations of a bundle apply, in what order, and records
//! the outcome; executing them is up to the host.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use ext_fs::{ConfigStore, NormalizedPath};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Subdirectory of an extension holding its migration files.
pub const MIGRATIONS_DIR: &str = "migrations";

/// Which way to run migrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Up => "up",
            Self::Down => "down",
        })
    }
}

/// Runs a bundle's migrations.
pub trait MigrationRunner {
    /// Apply (`Up`) the pending migrations in name order, or roll back
    /// (`Down`) the applied ones newest first.
    ///
    /// Returns the migration names in the order they were handled.
    fn run(
        &mut self,
        bundle: &str,
        location: &NormalizedPath,
        direction: Direction,
    ) -> Result<Vec<String>>;
}

/// One applied migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub bundle: String,
    pub name: String,
    pub batch: u32,
    pub applied_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerFile {
    version: String,
    #[serde(default)]
    migrations: Vec<LedgerEntry>,
}

impl Default for LedgerFile {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            migrations: Vec::new(),
        }
    }
}

/// Migration runner that scans `<location>/migrations/` and keeps a ledger
/// of applied migrations in a TOML file.
///
/// Migration names are the file stems; files are applied in name order, so
/// timestamp prefixes such as `2012_06_01_000000_create_menus` sort
/// naturally.
#[derive(Debug, Clone)]
pub struct LedgerMigrationRunner {
    ledger: NormalizedPath,
}

impl LedgerMigrationRunner {
    pub fn new(ledger: impl Into<NormalizedPath>) -> Self {
        Self {
            ledger: ledger.into(),
        }
    }

    /// All ledger entries for `bundle`, oldest first.
    pub fn applied(&self, bundle: &str) -> Result<Vec<LedgerEntry>> {
        Ok(self
            .read()?
            .migrations
            .into_iter()
            .filter(|e| e.bundle == bundle)
            .collect())
    }

    fn read(&self) -> Result<LedgerFile> {
        match ConfigStore::new().load(&self.ledger) {
            Ok(file) => Ok(file),
            Err(e) if e.is_not_found() => Ok(LedgerFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, file: &LedgerFile) -> Result<()> {
        ConfigStore::new().save(&self.ledger, file)?;
        Ok(())
    }

    /// Migration names found under `location`, sorted.
    fn available(location: &NormalizedPath) -> Result<Vec<String>> {
        let dir = location.join(MIGRATIONS_DIR);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(dir.to_native())
            .map_err(|e| Error::Fs(ext_fs::Error::io(dir.to_native(), e)))?;
        let mut names: Vec<String> = entries
            .flatten()
            .map(|entry| NormalizedPath::new(entry.path()))
            .filter(|path| path.is_file())
            .filter_map(|path| path.file_stem().map(str::to_string))
            .filter(|name| !name.starts_with('.'))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}

impl MigrationRunner for LedgerMigrationRunner {
    fn run(
        &mut self,
        bundle: &str,
        location: &NormalizedPath,
        direction: Direction,
    ) -> Result<Vec<String>> {
        let mut file = self.read()?;

        let handled = match direction {
            Direction::Up => {
                let applied: BTreeSet<&str> = file
                    .migrations
                    .iter()
                    .filter(|e| e.bundle == bundle)
                    .map(|e| e.name.as_str())
                    .collect();
                let pending: Vec<String> = Self::available(location)?
                    .into_iter()
                    .filter(|name| !applied.contains(name.as_str()))
                    .collect();
                if pending.is_empty() {
                    return Ok(pending);
                }

                let batch = file.migrations.iter().map(|e| e.batch).max().unwrap_or(0) + 1;
                let now = Utc::now();
                file.migrations
                    .extend(pending.iter().map(|name| LedgerEntry {
                        bundle: bundle.to_string(),
                        name: name.clone(),
                        batch,
                        applied_at: now,
                    }));
                pending
            }
            Direction::Down => {
                let mut rolled_back: Vec<String> = file
                    .migrations
                    .iter()
                    .filter(|e| e.bundle == bundle)
                    .map(|e| e.name.clone())
                    .collect();
                if rolled_back.is_empty() {
                    return Ok(rolled_back);
                }
                rolled_back.sort();
                rolled_back.reverse();
                file.migrations.retain(|e| e.bundle != bundle);
                rolled_back
            }
        };

        self.write(&file)?;
        tracing::debug!(bundle, %direction, count = handled.len(), "recorded migrations");
        Ok(handled)
    }
}

#[derive(Debug, Default)]
struct MemoryMigrationState {
    available: BTreeMap<String, Vec<String>>,
    applied: BTreeMap<String, Vec<String>>,
    calls: Vec<(String, Direction)>,
    fail_on: BTreeSet<String>,
}

/// In-memory migration runner.
///
/// Clones share state, so tests can inspect the calls the registry made.
#[derive(Debug, Clone, Default)]
pub struct MemoryMigrationRunner {
    state: Rc<RefCell<MemoryMigrationState>>,
}

impl MemoryMigrationRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the migrations a bundle ships with.
    pub fn with_migrations<I, S>(self, bundle: &str, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort();
        self.state
            .borrow_mut()
            .available
            .insert(bundle.to_string(), names);
        self
    }

    /// Make every run for `bundle` fail.
    pub fn fail_on(&self, bundle: &str) {
        self.state.borrow_mut().fail_on.insert(bundle.to_string());
    }

    /// Every `(bundle, direction)` the runner was called with, in order.
    pub fn calls(&self) -> Vec<(String, Direction)> {
        self.state.borrow().calls.clone()
    }

    /// Applied migrations of `bundle`, oldest first.
    pub fn applied(&self, bundle: &str) -> Vec<String> {
        self.state
            .borrow()
            .applied
            .get(bundle)
            .cloned()
            .unwrap_or_default()
    }
}

impl MigrationRunner for MemoryMigrationRunner {
    fn run(
        &mut self,
        bundle: &str,
        _location: &NormalizedPath,
        direction: Direction,
    ) -> Result<Vec<String>> {
        let mut state = self.state.borrow_mut();
        state.calls.push((bundle.to_string(), direction));

        if state.fail_on.contains(bundle) {
            return Err(Error::Migration {
                bundle: bundle.to_string(),
                reason: "runner configured to fail".to_string(),
            });
        }

        match direction {
            Direction::Up => {
                let available = state.available.get(bundle).cloned().unwrap_or_default();
                let applied = state.applied.entry(bundle.to_string()).or_default();
                let pending: Vec<String> = available
                    .into_iter()
                    .filter(|name| !applied.contains(name))
                    .collect();
                applied.extend(pending.iter().cloned());
                Ok(pending)
            }
            Direction::Down => {
                let mut rolled_back = state.applied.remove(bundle).unwrap_or_default();
                rolled_back.reverse();
                Ok(rolled_back)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn extension_with_migrations(root: &std::path::Path, names: &[&str]) -> NormalizedPath {
        let location = root.join("extensions/platform/menus");
        std::fs::create_dir_all(location.join(MIGRATIONS_DIR)).unwrap();
        for name in names {
            std::fs::write(location.join(MIGRATIONS_DIR).join(format!("{name}.sql")), "").unwrap();
        }
        NormalizedPath::new(location)
    }

    #[test]
    fn ledger_applies_in_name_order_once() {
        let dir = tempfile::tempdir().unwrap();
        let location = extension_with_migrations(
            dir.path(),
            &["2012_06_02_000000_add_items", "2012_06_01_000000_create_menus"],
        );
        let mut runner = LedgerMigrationRunner::new(dir.path().join(".platform/migrations.toml"));

        let applied = runner.run("platform/menus", &location, Direction::Up).unwrap();
        assert_eq!(
            applied,
            vec!["2012_06_01_000000_create_menus", "2012_06_02_000000_add_items"]
        );

        let again = runner.run("platform/menus", &location, Direction::Up).unwrap();
        assert!(again.is_empty());

        let entries = runner.applied("platform/menus").unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.batch == 1));
    }

    #[test]
    fn ledger_new_files_get_next_batch() {
        let dir = tempfile::tempdir().unwrap();
        let location = extension_with_migrations(dir.path(), &["001_create"]);
        let mut runner = LedgerMigrationRunner::new(dir.path().join("migrations.toml"));
        runner.run("platform/menus", &location, Direction::Up).unwrap();

        std::fs::write(location.join(MIGRATIONS_DIR).join("002_alter.sql").to_native(), "").unwrap();
        let applied = runner.run("platform/menus", &location, Direction::Up).unwrap();
        assert_eq!(applied, vec!["002_alter"]);

        let batches: Vec<u32> = runner
            .applied("platform/menus")
            .unwrap()
            .iter()
            .map(|e| e.batch)
            .collect();
        assert_eq!(batches, vec![1, 2]);
    }

    #[test]
    fn ledger_rolls_back_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let location = extension_with_migrations(dir.path(), &["001_create", "002_alter"]);
        let mut runner = LedgerMigrationRunner::new(dir.path().join("migrations.toml"));
        runner.run("platform/menus", &location, Direction::Up).unwrap();
        runner.run("acme/menus", &location, Direction::Up).unwrap();

        let rolled_back = runner
            .run("platform/menus", &location, Direction::Down)
            .unwrap();
        assert_eq!(rolled_back, vec!["002_alter", "001_create"]);
        assert!(runner.applied("platform/menus").unwrap().is_empty());
        assert_eq!(runner.applied("acme/menus").unwrap().len(), 2);
    }

    #[test]
    fn ledger_without_migrations_dir_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = dir.path().join("migrations.toml");
        let mut runner = LedgerMigrationRunner::new(&*ledger);

        let applied = runner
            .run("acme/blog", &NormalizedPath::new(dir.path()), Direction::Up)
            .unwrap();
        assert!(applied.is_empty());
        assert!(!ledger.exists());
    }

    #[test]
    fn memory_runner_records_calls() {
        let runner = MemoryMigrationRunner::new().with_migrations("acme/blog", ["002", "001"]);
        let mut handle = runner.clone();
        let location = NormalizedPath::new("acme/blog");

        assert_eq!(
            handle.run("acme/blog", &location, Direction::Up).unwrap(),
            vec!["001", "002"]
        );
        assert_eq!(
            handle.run("acme/blog", &location, Direction::Down).unwrap(),
            vec!["002", "001"]
        );
        assert_eq!(
            runner.calls(),
            vec![
                ("acme/blog".to_string(), Direction::Up),
                ("acme/blog".to_string(), Direction::Down)
            ]
        );
    }

    #[test]
    fn memory_runner_can_fail() {
        let mut runner = MemoryMigrationRunner::new();
        runner.fail_on("acme/blog");
        let err = runner
            .run("acme/blog", &NormalizedPath::new("x"), Direction::Up)
            .unwrap_err();
        assert!(matches!(err, Error::Migration { .. }));
    }
}
