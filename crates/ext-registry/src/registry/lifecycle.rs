//! Install, uninstall, enable, disable and update.
//!
//! None of these are transactional. Each step writes through to its
//! collaborator as it runs, so a failure part-way (say, a migration error
//! after the record was saved) leaves the earlier steps in place for manual
//! recovery.

use super::ExtensionRegistry;
use crate::descriptor::ExtensionDescriptor;
use crate::error::{Error, Result, Transition};
use crate::id::ExtensionId;
use crate::migration::Direction;
use crate::record::InstallationRecord;

impl ExtensionRegistry {
    /// Install an extension.
    ///
    /// The record is enabled when `auto_enable` is set, the extension is
    /// core, or more than one vendor ships an extension of this name. The
    /// extension is then started and its migrations applied; when it was
    /// installed disabled its menu entries are hidden.
    pub fn install(&mut self, id: &ExtensionId, auto_enable: bool) -> Result<InstallationRecord> {
        if self.records.find(id)?.is_some() {
            return Err(Error::AlreadyInstalled(id.clone()));
        }
        self.guard(Transition::Install, id)?;

        let descriptor = self.descriptor(id)?;
        let enabled =
            auto_enable || descriptor.is_core || self.vendors(id.name())?.len() > 1;

        let record = InstallationRecord::new(id, descriptor.version.as_str(), enabled);
        self.records.save(record.clone())?;
        self.remember(id, record.clone())?;
        tracing::info!(extension = %id, version = %record.version, enabled, "installed extension");

        self.start(id)?;
        self.migrate(&descriptor, Direction::Up)?;

        if !enabled {
            self.set_menu_visibility(id, false);
        }
        Ok(record)
    }

    /// Uninstall an extension.
    ///
    /// Rolls its migrations back newest first, enables the first other
    /// installed vendor variant of the same extension, and deletes the
    /// record.
    pub fn uninstall(&mut self, id: &ExtensionId) -> Result<()> {
        if self.records.find(id)?.is_none() {
            return Err(Error::NotInstalled(id.clone()));
        }
        self.guard(Transition::Uninstall, id)?;

        match self.descriptor(id) {
            Ok(descriptor) => self.migrate(&descriptor, Direction::Down)?,
            Err(Error::NotFound(_)) => {
                tracing::warn!(extension = %id, "descriptor missing, skipping migrations");
            }
            Err(e @ Error::InvalidDescriptor { .. }) => {
                tracing::warn!(extension = %id, "skipping migrations: {e}");
            }
            Err(e) => return Err(e),
        }

        for sibling in self.vendors(id.name())? {
            if &sibling == id {
                continue;
            }
            if let Some(mut record) = self.record(&sibling)? {
                record.set_enabled(true);
                self.records.save(record.clone())?;
                self.remember(&sibling, record)?;
                tracing::info!(extension = %sibling, "enabled vendor variant");
                break;
            }
        }

        self.records.delete(id)?;
        self.forget(id);
        tracing::info!(extension = %id, "uninstalled extension");
        Ok(())
    }

    /// Enable an installed extension and show its menu entries.
    pub fn enable(&mut self, id: &ExtensionId) -> Result<InstallationRecord> {
        self.toggle(id, Transition::Enable, true)
    }

    /// Disable an installed extension and hide its menu entries.
    pub fn disable(&mut self, id: &ExtensionId) -> Result<InstallationRecord> {
        self.toggle(id, Transition::Disable, false)
    }

    fn toggle(
        &mut self,
        id: &ExtensionId,
        transition: Transition,
        enabled: bool,
    ) -> Result<InstallationRecord> {
        let Some(mut record) = self.records.find(id)? else {
            return Err(Error::NotInstalled(id.clone()));
        };
        self.guard(transition, id)?;

        self.set_menu_visibility(id, enabled);

        record.set_enabled(enabled);
        self.records.save(record.clone())?;
        self.remember(id, record.clone())?;
        tracing::info!(extension = %id, enabled, "toggled extension");
        Ok(record)
    }

    /// Move an installed extension to the version its descriptor declares.
    ///
    /// Fails with [`Error::NoUpdateAvailable`] unless that version is newer
    /// than the installed one.
    pub fn update(&mut self, id: &ExtensionId) -> Result<InstallationRecord> {
        let Some(mut record) = self.records.find(id)? else {
            return Err(Error::NotInstalled(id.clone()));
        };
        if !self.has_update(id)? {
            return Err(Error::NoUpdateAvailable(id.clone()));
        }

        let descriptor = self.descriptor(id)?;
        let previous = record.version.clone();
        record.set_version(descriptor.version.as_str());
        self.records.save(record.clone())?;
        self.remember(id, record.clone())?;
        tracing::info!(extension = %id, from = %previous, to = %record.version, "updated extension");

        self.start(id)?;
        self.migrate(&descriptor, Direction::Up)?;
        Ok(record)
    }

    fn migrate(&mut self, descriptor: &ExtensionDescriptor, direction: Direction) -> Result<()> {
        let bundle = descriptor.id.bundle();
        let handled = self
            .migrations
            .run(&bundle, &descriptor.bundle.location, direction)
            .map_err(|e| match e {
                Error::Migration { .. } => e,
                other => Error::Migration {
                    bundle: bundle.clone(),
                    reason: other.to_string(),
                },
            })?;
        if !handled.is_empty() {
            tracing::info!(bundle = %bundle, %direction, migrations = ?handled, "ran migrations");
        }
        Ok(())
    }

    /// Show or hide the menu entries of `id`. Menu failures are logged and
    /// otherwise ignored.
    fn set_menu_visibility(&mut self, id: &ExtensionId, visible: bool) {
        let items = match self.menus.flat(id.vendor(), id.name()) {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(extension = %id, "could not list menus: {e}");
                return;
            }
        };
        for item in items {
            if let Err(e) = self.menus.set_status(&item.slug, visible) {
                tracing::warn!(extension = %id, menu = %item.slug, "could not update menu: {e}");
                return;
            }
        }
    }
}
