//! Extension descriptor parsing.
//!
//! Every extension directory holds a descriptor file named
//! [`DESCRIPTOR_STEM`](crate::source::DESCRIPTOR_STEM) with a `.toml`,
//! `.json` or `.yaml` extension. The payload is read as a generic key/value
//! tree and then validated into an [`ExtensionDescriptor`].
//!
//! # Example TOML
//!
//! ```toml
//! dependencies = ["platform.users"]
//! overrides = ["platform.pages"]
//! events = ["menu.create", "menu.update"]
//! rules = ["platform/menus::admin.menus@index"]
//! controllers = ["admin.menus"]
//!
//! [info]
//! name = "Menus"
//! author = "Platform Team"
//! description = "Manages all menus throughout the website admin."
//! version = "1.1.1"
//! is_core = true
//!
//! [bundles]
//! handles = "menus"
//!
//! [[routes]]
//! method = "GET"
//! uri = "admin/menus"
//! action = "admin.menus@index"
//!
//! [[listeners]]
//! event = "user.delete"
//! handler = "menus::purge_user_items"
//! ```

use std::cell::Cell;

use ext_fs::NormalizedPath;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::id::ExtensionId;
use crate::version::parse_version;

/// A registration payload handed to the bundle binder exactly once.
///
/// The payload is validated when the descriptor is parsed; invoking it only
/// decides *when* it is applied.
#[derive(Debug)]
pub struct Deferred<T> {
    payload: T,
    invoked: Cell<bool>,
}

impl<T> Deferred<T> {
    pub fn new(payload: T) -> Self {
        Self {
            payload,
            invoked: Cell::new(false),
        }
    }

    /// Run `f` on the payload the first time this is called.
    ///
    /// Returns `None` on every later call.
    pub fn invoke<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        if self.invoked.replace(true) {
            return None;
        }
        Some(f(&self.payload))
    }

    pub fn is_invoked(&self) -> bool {
        self.invoked.get()
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }
}

fn default_method() -> String {
    "GET".to_string()
}

/// One declared route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Route {
    #[serde(default = "default_method")]
    pub method: String,
    pub uri: String,
    /// `controller@action` target.
    pub action: String,
}

/// Routes an extension registers when it is activated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoutesConfig(pub Vec<Route>);

/// One declared event listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Listener {
    pub event: String,
    pub handler: String,
}

/// Listeners an extension attaches when it is started.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenersConfig(pub Vec<Listener>);

/// Bundle settings passed to the binder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleConfig {
    /// URL handle the extension claims. `None` once another extension has
    /// claimed it.
    pub handles: Option<String>,
    /// Directory holding the extension.
    pub location: NormalizedPath,
}

#[derive(Debug, Default, Deserialize)]
struct RawInfo {
    name: Option<String>,
    version: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    is_core: bool,
}

#[derive(Debug, Default, Deserialize)]
struct RawBundles {
    #[serde(default)]
    handles: Option<String>,
}

// Unknown top-level keys are accepted; descriptors carry host-specific
// sections (widgets, plugins, settings) this crate does not interpret.
#[derive(Debug, Deserialize)]
struct RawDescriptor {
    info: Option<RawInfo>,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    overrides: Vec<String>,
    #[serde(default)]
    bundles: RawBundles,
    #[serde(default)]
    routes: Option<RoutesConfig>,
    #[serde(default)]
    listeners: Option<ListenersConfig>,
    #[serde(default)]
    events: Vec<String>,
    #[serde(default)]
    rules: Vec<String>,
    #[serde(default)]
    controllers: Vec<String>,
}

/// A parsed, validated extension descriptor.
///
/// Descriptors are immutable once parsed; the registry caches one per id.
#[derive(Debug)]
pub struct ExtensionDescriptor {
    pub id: ExtensionId,
    /// Display name (`info.name`).
    pub name: String,
    /// Declared version, as written.
    pub version: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub is_core: bool,
    /// Extensions that must be installed and enabled first.
    pub dependencies: Vec<ExtensionId>,
    /// Extensions this one supersedes.
    pub overrides: Vec<ExtensionId>,
    /// Handle and location; the handle defaults to the extension name.
    pub bundle: BundleConfig,
    pub routes: Option<Deferred<RoutesConfig>>,
    pub listeners: Option<Deferred<ListenersConfig>>,
    pub events: Vec<String>,
    pub rules: Vec<String>,
    pub controllers: Vec<String>,
}

impl ExtensionDescriptor {
    /// Validate a raw descriptor payload.
    ///
    /// Fails with [`Error::InvalidDescriptor`] when `info.name` or
    /// `info.version` is missing, the version is not a version, a slug in
    /// `dependencies`/`overrides` is malformed, or `routes`/`listeners` do
    /// not have the declarative shape.
    pub fn from_payload(
        id: ExtensionId,
        location: NormalizedPath,
        payload: serde_json::Value,
    ) -> Result<Self> {
        let raw: RawDescriptor = serde_json::from_value(payload)
            .map_err(|e| Error::invalid_descriptor(&id, e.to_string()))?;

        let info = raw
            .info
            .ok_or_else(|| Error::invalid_descriptor(&id, "missing [info] section"))?;
        let name = info
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| Error::invalid_descriptor(&id, "missing info.name"))?;
        let version = info
            .version
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| Error::invalid_descriptor(&id, "missing info.version"))?;
        parse_version(&version).map_err(|e| Error::invalid_descriptor(&id, e.to_string()))?;

        let dependencies = parse_slugs(&id, "dependencies", &raw.dependencies)?;
        let overrides = parse_slugs(&id, "overrides", &raw.overrides)?;

        let handles = raw
            .bundles
            .handles
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| id.name().to_string());

        Ok(Self {
            name,
            version,
            author: info.author,
            description: info.description,
            is_core: info.is_core,
            dependencies,
            overrides,
            bundle: BundleConfig {
                handles: Some(handles),
                location,
            },
            routes: raw.routes.map(Deferred::new),
            listeners: raw.listeners.map(Deferred::new),
            events: raw.events,
            rules: raw.rules,
            controllers: raw.controllers,
            id,
        })
    }

    /// Parse a descriptor from TOML text.
    pub fn from_toml(id: ExtensionId, location: NormalizedPath, content: &str) -> Result<Self> {
        let payload: serde_json::Value =
            toml::from_str(content).map_err(|e| Error::invalid_descriptor(&id, e.to_string()))?;
        Self::from_payload(id, location, payload)
    }

    /// The handle this extension asks for.
    pub fn handle(&self) -> Option<&str> {
        self.bundle.handles.as_deref()
    }

    pub fn declares_controller(&self, controller: &str) -> bool {
        self.controllers.iter().any(|c| c == controller)
    }
}

/// Parse a slug list, dropping duplicates but keeping first-seen order.
fn parse_slugs(owner: &ExtensionId, field: &str, slugs: &[String]) -> Result<Vec<ExtensionId>> {
    let mut ids: Vec<ExtensionId> = Vec::with_capacity(slugs.len());
    for slug in slugs {
        let id = ExtensionId::parse(slug)
            .map_err(|e| Error::invalid_descriptor(owner, format!("{field}: {e}")))?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}
