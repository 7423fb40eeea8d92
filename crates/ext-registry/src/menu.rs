//! Menu visibility service.
//!
//! Extensions contribute admin menu entries. Installing an extension
//! disabled, or disabling it, hides its entries; enabling shows them again.
//! Menu failures never abort a lifecycle operation.

use std::cell::RefCell;
use std::rc::Rc;

use ext_fs::{ConfigStore, NormalizedPath};
use serde::{Deserialize, Serialize};

/// Errors reported by a [`MenuService`].
#[derive(Debug, thiserror::Error)]
pub enum MenuError {
    /// The menu backend rejected the request.
    #[error("menu request failed: {0}")]
    Client(String),

    #[error(transparent)]
    Fs(#[from] ext_fs::Error),
}

/// One menu entry owned by an extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub slug: String,
    pub vendor: String,
    pub extension: String,
    #[serde(default = "visible_by_default")]
    pub visible: bool,
}

fn visible_by_default() -> bool {
    true
}

impl MenuItem {
    pub fn new(
        slug: impl Into<String>,
        vendor: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            slug: slug.into(),
            vendor: vendor.into(),
            extension: extension.into(),
            visible: true,
        }
    }

    fn owned_by(&self, vendor: &str, extension: &str) -> bool {
        self.vendor == vendor && self.extension == extension
    }
}

/// Lists and toggles the menu entries of an extension.
pub trait MenuService {
    /// Every menu entry owned by `vendor.extension`, flattened.
    fn flat(&self, vendor: &str, extension: &str) -> Result<Vec<MenuItem>, MenuError>;

    /// Show or hide one entry.
    fn set_status(&mut self, slug: &str, visible: bool) -> Result<(), MenuError>;
}

fn set_item_status(items: &mut [MenuItem], slug: &str, visible: bool) -> Result<(), MenuError> {
    let item = items
        .iter_mut()
        .find(|item| item.slug == slug)
        .ok_or_else(|| MenuError::Client(format!("no menu with slug '{slug}'")))?;
    item.visible = visible;
    Ok(())
}

#[derive(Debug, Default)]
struct MemoryMenuState {
    items: Vec<MenuItem>,
    unavailable: bool,
}

/// In-memory menu service. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryMenuService {
    state: Rc<RefCell<MemoryMenuState>>,
}

impl MemoryMenuService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: impl IntoIterator<Item = MenuItem>) -> Self {
        let service = Self::new();
        service.state.borrow_mut().items.extend(items);
        service
    }

    /// Make every request fail with [`MenuError::Client`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.borrow_mut().unavailable = unavailable;
    }

    pub fn items(&self) -> Vec<MenuItem> {
        self.state.borrow().items.clone()
    }

    pub fn is_visible(&self, slug: &str) -> Option<bool> {
        self.state
            .borrow()
            .items
            .iter()
            .find(|item| item.slug == slug)
            .map(|item| item.visible)
    }

    fn check_available(&self) -> Result<(), MenuError> {
        if self.state.borrow().unavailable {
            return Err(MenuError::Client("menu service unavailable".to_string()));
        }
        Ok(())
    }
}

impl MenuService for MemoryMenuService {
    fn flat(&self, vendor: &str, extension: &str) -> Result<Vec<MenuItem>, MenuError> {
        self.check_available()?;
        Ok(self
            .state
            .borrow()
            .items
            .iter()
            .filter(|item| item.owned_by(vendor, extension))
            .cloned()
            .collect())
    }

    fn set_status(&mut self, slug: &str, visible: bool) -> Result<(), MenuError> {
        self.check_available()?;
        set_item_status(&mut self.state.borrow_mut().items, slug, visible)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MenuFile {
    version: String,
    #[serde(default)]
    menus: Vec<MenuItem>,
}

impl Default for MenuFile {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            menus: Vec::new(),
        }
    }
}

/// Menu service persisted in a TOML file.
#[derive(Debug, Clone)]
pub struct TomlMenuService {
    path: NormalizedPath,
}

impl TomlMenuService {
    pub fn new(path: impl Into<NormalizedPath>) -> Self {
        Self { path: path.into() }
    }

    /// Add entries, replacing any with the same slug.
    pub fn register(&mut self, items: impl IntoIterator<Item = MenuItem>) -> Result<(), MenuError> {
        let mut file = self.read()?;
        for item in items {
            file.menus.retain(|existing| existing.slug != item.slug);
            file.menus.push(item);
        }
        self.write(&file)
    }

    pub fn all(&self) -> Result<Vec<MenuItem>, MenuError> {
        Ok(self.read()?.menus)
    }

    fn read(&self) -> Result<MenuFile, MenuError> {
        match ConfigStore::new().load(&self.path) {
            Ok(file) => Ok(file),
            Err(e) if e.is_not_found() => Ok(MenuFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, file: &MenuFile) -> Result<(), MenuError> {
        ConfigStore::new().save(&self.path, file)?;
        Ok(())
    }
}

impl MenuService for TomlMenuService {
    fn flat(&self, vendor: &str, extension: &str) -> Result<Vec<MenuItem>, MenuError> {
        Ok(self
            .read()?
            .menus
            .into_iter()
            .filter(|item| item.owned_by(vendor, extension))
            .collect())
    }

    fn set_status(&mut self, slug: &str, visible: bool) -> Result<(), MenuError> {
        let mut file = self.read()?;
        set_item_status(&mut file.menus, slug, visible)?;
        self.write(&file)
    }
}
