//! [`DescriptorBuilder`] for extension descriptor fixtures.

/// Builds the TOML text of an `extension.toml`.
///
/// # Example
///
/// ```rust
/// use ext_test_utils::DescriptorBuilder;
///
/// let toml = DescriptorBuilder::new("Menus", "1.1.1")
///     .core()
///     .dependency("platform.users")
///     .route("GET", "admin/menus", "admin.menus@index")
///     .to_toml();
/// assert!(toml.contains("is_core = true"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct DescriptorBuilder {
    name: String,
    version: String,
    is_core: bool,
    dependencies: Vec<String>,
    overrides: Vec<String>,
    controllers: Vec<String>,
    handle: Option<String>,
    routes: Vec<(String, String, String)>,
    listeners: Vec<(String, String)>,
}

fn quoted(value: &str) -> String {
    format!("{value:?}")
}

fn array(values: &[String]) -> String {
    let items: Vec<String> = values.iter().map(|v| quoted(v)).collect();
    format!("[{}]", items.join(", "))
}

impl DescriptorBuilder {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            ..Self::default()
        }
    }

    pub fn core(mut self) -> Self {
        self.is_core = true;
        self
    }

    pub fn dependency(mut self, slug: &str) -> Self {
        self.dependencies.push(slug.to_string());
        self
    }

    pub fn overrides(mut self, slug: &str) -> Self {
        self.overrides.push(slug.to_string());
        self
    }

    pub fn controller(mut self, controller: &str) -> Self {
        self.controllers.push(controller.to_string());
        self
    }

    pub fn handle(mut self, handle: &str) -> Self {
        self.handle = Some(handle.to_string());
        self
    }

    pub fn route(mut self, method: &str, uri: &str, action: &str) -> Self {
        self.routes
            .push((method.to_string(), uri.to_string(), action.to_string()));
        self
    }

    pub fn listener(mut self, event: &str, handler: &str) -> Self {
        self.listeners.push((event.to_string(), handler.to_string()));
        self
    }

    /// Render the descriptor as TOML.
    pub fn to_toml(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("dependencies = {}\n", array(&self.dependencies)));
        out.push_str(&format!("overrides = {}\n", array(&self.overrides)));
        if !self.controllers.is_empty() {
            out.push_str(&format!("controllers = {}\n", array(&self.controllers)));
        }

        out.push_str("\n[info]\n");
        out.push_str(&format!("name = {}\n", quoted(&self.name)));
        out.push_str(&format!("version = {}\n", quoted(&self.version)));
        out.push_str(&format!("is_core = {}\n", self.is_core));

        if let Some(handle) = &self.handle {
            out.push_str(&format!("\n[bundles]\nhandles = {}\n", quoted(handle)));
        }

        for (method, uri, action) in &self.routes {
            out.push_str(&format!(
                "\n[[routes]]\nmethod = {}\nuri = {}\naction = {}\n",
                quoted(method),
                quoted(uri),
                quoted(action)
            ));
        }

        for (event, handler) in &self.listeners {
            out.push_str(&format!(
                "\n[[listeners]]\nevent = {}\nhandler = {}\n",
                quoted(event),
                quoted(handler)
            ));
        }
        out
    }
}
