//! Activation of enabled extensions.
//!
//! Enabled extensions are ordered by the `overrides` relation, so an
//! overridden extension sorts before the extensions overriding it. Routes
//! are mounted in that order. The order is then reversed and every
//! extension is started: overriding extensions start first and bind their
//! handle before the extensions they override get to it.

use super::ExtensionRegistry;
use crate::dependency::DependencyGraph;
use crate::descriptor::ExtensionDescriptor;
use crate::error::{Error, Result};
use crate::id::ExtensionId;

/// An extension that could not be activated.
#[derive(Debug)]
pub struct StartFailure {
    pub id: ExtensionId,
    pub error: Error,
}

/// Outcome of [`ExtensionRegistry::start_all`].
#[derive(Debug, Default)]
pub struct StartReport {
    /// Start order: overriding extensions first.
    pub order: Vec<ExtensionId>,
    /// Extensions started, in start order.
    pub started: Vec<ExtensionId>,
    /// Enabled extensions left out of the order because something they
    /// override is not enabled, or their overrides form a cycle.
    pub dropped: Vec<ExtensionId>,
    pub failed: Vec<StartFailure>,
}

impl StartReport {
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty() && self.failed.is_empty()
    }
}

impl ExtensionRegistry {
    /// Mount routes for and start every enabled extension.
    ///
    /// Failures of individual extensions are logged and collected in the
    /// report; only failing to read the catalog or the installation state
    /// fails the whole batch.
    pub fn start_all(&mut self) -> Result<StartReport> {
        let mut report = StartReport::default();
        let enabled = self.enabled()?;
        if enabled.is_empty() {
            return Ok(report);
        }
        // Populate the indexes before descriptors are consulted one by one.
        self.discover()?;

        let mut graph = DependencyGraph::new();
        for id in enabled {
            match self.descriptor(&id) {
                Ok(descriptor) => graph.add_node(id, descriptor.overrides.iter().cloned()),
                Err(error) => {
                    tracing::warn!(extension = %id, "cannot start extension: {error}");
                    report.failed.push(StartFailure { id, error });
                }
            }
        }

        let outcome = graph.sort();
        for id in &outcome.unresolved {
            tracing::warn!(extension = %id, "extension left out of activation order");
        }
        report.dropped = outcome.unresolved;

        let mut order = Vec::with_capacity(outcome.sorted.len());
        for id in outcome.sorted {
            match self.mount_routes(&id) {
                Ok(()) => order.push(id),
                Err(error) => {
                    tracing::warn!(extension = %id, "cannot mount routes: {error}");
                    report.failed.push(StartFailure { id, error });
                }
            }
        }

        order.reverse();
        for id in &order {
            match self.start(id) {
                Ok(()) => report.started.push(id.clone()),
                Err(error) => {
                    tracing::warn!(extension = %id, "cannot start extension: {error}");
                    report.failed.push(StartFailure {
                        id: id.clone(),
                        error,
                    });
                }
            }
        }
        report.order = order;

        tracing::debug!(
            started = report.started.len(),
            dropped = report.dropped.len(),
            failed = report.failed.len(),
            "started extensions"
        );
        Ok(report)
    }

    /// Start one extension: bind its bundle (once) and attach its
    /// listeners (once).
    pub fn start(&mut self, id: &ExtensionId) -> Result<()> {
        let descriptor = self.descriptor(id)?;
        self.start_bundle(&descriptor)?;

        if let Some(listeners) = &descriptor.listeners {
            listeners
                .invoke(|payload| self.binder.attach_listeners(id, payload))
                .transpose()?;
        }
        Ok(())
    }

    /// Hand the extension's routes to the binder, once.
    pub fn mount_routes(&mut self, id: &ExtensionId) -> Result<()> {
        let descriptor = self.descriptor(id)?;
        if let Some(routes) = &descriptor.routes {
            routes
                .invoke(|payload| self.binder.mount_routes(id, payload))
                .transpose()?;
        }
        Ok(())
    }

    /// The extension bound to `handle`, if any.
    pub fn handle_owner(&self, handle: &str) -> Option<&ExtensionId> {
        self.claimed_handles.get(handle)
    }

    /// Register and start the bundle unless the binder already started it.
    ///
    /// Only the first extension to claim a handle binds it; later
    /// claimants are registered without one. Returns whether the bundle
    /// was started by this call.
    fn start_bundle(&mut self, descriptor: &ExtensionDescriptor) -> Result<bool> {
        let id = &descriptor.id;
        let bundle = id.bundle();
        if self.binder.started(&bundle) {
            return Ok(false);
        }

        let mut config = descriptor.bundle.clone();
        let mut claim = None;
        if let Some(handle) = config.handles.take() {
            match self.claimed_handles.get(&handle) {
                Some(owner) if owner != id => {
                    tracing::debug!(extension = %id, handle = %handle, owner = %owner, "handle already bound");
                }
                _ => {
                    config.handles = Some(handle.clone());
                    claim = Some(handle);
                }
            }
        }

        self.binder.register(&bundle, &config)?;
        self.binder.start(&bundle)?;
        if let Some(handle) = claim {
            self.claimed_handles.insert(handle, id.clone());
        }
        tracing::info!(extension = %id, handle = ?config.handles, "started extension");
        Ok(true)
    }
}
