//! Bundle binding: how a started extension reaches the host.
//!
//! The registry decides *what* to bind and in which order; a
//! [`BundleBinder`] performs the binding. [`BundleRouter`] is the
//! in-process binder: it keeps a table of registered bundles, their
//! handles, mounted routes and attached listeners.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::descriptor::{BundleConfig, Listener, ListenersConfig, Route, RoutesConfig};
use crate::error::{Error, Result};
use crate::id::ExtensionId;

/// Registers and starts extension bundles with the host.
pub trait BundleBinder {
    /// Register a bundle under `bundle` (the `vendor/name` form).
    fn register(&mut self, bundle: &str, config: &BundleConfig) -> Result<()>;

    /// Start a registered bundle.
    fn start(&mut self, bundle: &str) -> Result<()>;

    /// Whether the bundle has been started.
    fn started(&self, bundle: &str) -> bool;

    fn mount_routes(&mut self, id: &ExtensionId, routes: &RoutesConfig) -> Result<()>;

    fn attach_listeners(&mut self, id: &ExtensionId, listeners: &ListenersConfig) -> Result<()>;
}

/// A route mounted by an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountedRoute {
    pub extension: ExtensionId,
    pub route: Route,
}

/// A listener attached by an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedListener {
    pub extension: ExtensionId,
    pub listener: Listener,
}

#[derive(Debug, Default)]
struct RouterState {
    registered: BTreeMap<String, BundleConfig>,
    started: Vec<String>,
    handles: BTreeMap<String, String>,
    routes: Vec<MountedRoute>,
    listeners: Vec<AttachedListener>,
    refuse: Vec<String>,
}

/// In-process [`BundleBinder`].
///
/// Clones share the same tables, so a caller can keep a handle to inspect
/// what the registry bound.
#[derive(Debug, Clone, Default)]
pub struct BundleRouter {
    state: Rc<RefCell<RouterState>>,
}

impl BundleRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `register` fail for `bundle`.
    pub fn refuse(&self, bundle: &str) {
        self.state.borrow_mut().refuse.push(bundle.to_string());
    }

    /// Started bundles, in start order.
    pub fn started_bundles(&self) -> Vec<String> {
        self.state.borrow().started.clone()
    }

    /// The bundle bound to `handle`, if any.
    pub fn handle_owner(&self, handle: &str) -> Option<String> {
        self.state.borrow().handles.get(handle).cloned()
    }

    /// Every bound handle with its bundle, sorted by handle.
    pub fn handles(&self) -> Vec<(String, String)> {
        self.state
            .borrow()
            .handles
            .iter()
            .map(|(h, b)| (h.clone(), b.clone()))
            .collect()
    }

    /// The configuration a bundle was registered with.
    pub fn config(&self, bundle: &str) -> Option<BundleConfig> {
        self.state.borrow().registered.get(bundle).cloned()
    }

    pub fn routes(&self) -> Vec<MountedRoute> {
        self.state.borrow().routes.clone()
    }

    pub fn listeners(&self) -> Vec<AttachedListener> {
        self.state.borrow().listeners.clone()
    }
}

impl BundleBinder for BundleRouter {
    fn register(&mut self, bundle: &str, config: &BundleConfig) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.refuse.iter().any(|b| b == bundle) {
            return Err(Error::Binder {
                bundle: bundle.to_string(),
                reason: "registration refused".to_string(),
            });
        }
        if let Some(handle) = &config.handles {
            if let Some(owner) = state.handles.get(handle).filter(|owner| *owner != bundle) {
                return Err(Error::Binder {
                    bundle: bundle.to_string(),
                    reason: format!("handle '{handle}' is bound to '{owner}'"),
                });
            }
            state.handles.insert(handle.clone(), bundle.to_string());
        }
        state.registered.insert(bundle.to_string(), config.clone());
        Ok(())
    }

    fn start(&mut self, bundle: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if !state.registered.contains_key(bundle) {
            return Err(Error::Binder {
                bundle: bundle.to_string(),
                reason: "bundle is not registered".to_string(),
            });
        }
        if !state.started.iter().any(|b| b == bundle) {
            state.started.push(bundle.to_string());
        }
        Ok(())
    }

    fn started(&self, bundle: &str) -> bool {
        self.state.borrow().started.iter().any(|b| b == bundle)
    }

    fn mount_routes(&mut self, id: &ExtensionId, routes: &RoutesConfig) -> Result<()> {
        self.state
            .borrow_mut()
            .routes
            .extend(routes.0.iter().map(|route| MountedRoute {
                extension: id.clone(),
                route: route.clone(),
            }));
        Ok(())
    }

    fn attach_listeners(&mut self, id: &ExtensionId, listeners: &ListenersConfig) -> Result<()> {
        self.state
            .borrow_mut()
            .listeners
            .extend(listeners.0.iter().map(|listener| AttachedListener {
                extension: id.clone(),
                listener: listener.clone(),
            }));
        Ok(())
    }
}
