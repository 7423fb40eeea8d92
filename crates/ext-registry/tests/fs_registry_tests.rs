//! Registry over the file-backed collaborators.

use ext_fs::NormalizedPath;
use ext_registry::{
    BundleRouter, Error, ExtensionId, ExtensionRegistry, LedgerMigrationRunner, RegistryBuilder,
    RegistryConfig,
};
use ext_test_utils::{DescriptorBuilder, TestPlatform};
use pretty_assertions::assert_eq;

fn id(slug: &str) -> ExtensionId {
    ExtensionId::parse(slug).unwrap()
}

fn open(platform: &TestPlatform) -> ExtensionRegistry {
    let base = NormalizedPath::new(platform.root());
    let config = RegistryConfig::load_or_default(&base).unwrap();
    RegistryBuilder::from_config(&base, &config).build()
}

fn sample_platform() -> TestPlatform {
    let platform = TestPlatform::new();
    platform.add_extension(
        "platform.users",
        &DescriptorBuilder::new("Users", "1.0.0").core(),
    );
    platform.add_extension(
        "platform.menus",
        &DescriptorBuilder::new("Menus", "1.1.1")
            .core()
            .dependency("platform.users")
            .route("GET", "admin/menus", "admin.menus@index"),
    );
    platform.add_extension(
        "blog",
        &DescriptorBuilder::new("Blog", "0.2").dependency("platform.users"),
    );
    platform
}

#[test]
fn discovers_vendor_and_default_extensions() {
    let platform = sample_platform();
    let mut registry = open(&platform);

    assert_eq!(
        registry.discover().unwrap(),
        vec![id("blog"), id("platform.menus"), id("platform.users")]
    );

    let info = registry.get(&id("platform.menus")).unwrap();
    assert!(
        info.descriptor
            .bundle
            .location
            .as_str()
            .ends_with("extensions/platform/menus")
    );
}

#[test]
fn json_and_yaml_descriptors_are_read() {
    let platform = TestPlatform::new();
    platform.add_raw_descriptor(
        "acme.shop",
        "extension.json",
        r#"{"info": {"name": "Shop", "version": "2.0"}, "dependencies": ["acme.cart"]}"#,
    );
    platform.add_raw_descriptor(
        "acme.cart",
        "extension.yaml",
        "info:\n  name: Cart\n  version: \"1.0\"\n",
    );
    let mut registry = open(&platform);

    assert_eq!(registry.discover().unwrap(), vec![id("acme.cart"), id("acme.shop")]);
    assert_eq!(
        registry.dependencies(&id("acme.shop")).unwrap(),
        vec![id("acme.cart")]
    );
    assert_eq!(registry.get(&id("acme.cart")).unwrap().descriptor.name, "Cart");
}

#[test]
fn broken_descriptor_is_skipped() {
    let platform = sample_platform();
    platform.add_raw_descriptor("acme.broken", "extension.toml", "[info\nname = ");
    let mut registry = open(&platform);

    let catalog = registry.discover().unwrap();
    assert!(!catalog.contains(&id("acme.broken")));
    assert!(matches!(
        registry.get(&id("acme.broken")),
        Err(Error::InvalidDescriptor { .. })
    ));
}

#[test]
fn lifecycle_state_survives_reopening() {
    let platform = sample_platform();
    platform.add_migration("blog", "2012_06_01_000000_create_posts");

    {
        let mut registry = open(&platform);
        registry.install(&id("platform.users"), false).unwrap();
        registry.install(&id("blog"), false).unwrap();
    }
    platform.assert_file_exists(".platform/extensions.toml");
    platform.assert_file_exists(".platform/migrations.toml");

    let mut registry = open(&platform);
    assert_eq!(
        registry.installed().unwrap(),
        vec![id("blog"), id("platform.users")]
    );
    assert!(registry.is_enabled(&id("platform.users")).unwrap());
    assert!(registry.is_disabled(&id("blog")).unwrap());
    assert!(!registry.can_uninstall(&id("platform.users")).unwrap());

    let ledger = LedgerMigrationRunner::new(
        NormalizedPath::new(platform.root()).join(".platform/migrations.toml"),
    );
    let applied = ledger.applied("default/blog").unwrap();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].name, "2012_06_01_000000_create_posts");

    registry.uninstall(&id("blog")).unwrap();
    assert!(ledger.applied("default/blog").unwrap().is_empty());
    assert!(!open(&platform).is_installed(&id("blog")).unwrap());
}

#[test]
fn config_overrides_directories_and_installer_mode() {
    let platform = TestPlatform::new();
    platform.write_config("extensions_dir = \"addons\"\nstate_dir = \"var\"\ninstaller_mode = true\n");
    let addon = platform.root().join("addons/acme/blog");
    std::fs::create_dir_all(&addon).unwrap();
    std::fs::write(
        addon.join("extension.toml"),
        DescriptorBuilder::new("Blog", "1.0")
            .dependency("platform.users")
            .to_toml(),
    )
    .unwrap();

    let mut registry = open(&platform);
    assert!(registry.installer_mode());
    assert_eq!(registry.discover().unwrap(), vec![id("acme.blog")]);

    registry.install(&id("acme.blog"), true).unwrap();
    platform.assert_file_exists("var/extensions.toml");
}

#[test]
fn start_all_binds_enabled_extensions() {
    let platform = sample_platform();
    let base = NormalizedPath::new(platform.root());
    let config = RegistryConfig::default();
    let router = BundleRouter::new();

    let mut registry = RegistryBuilder::from_config(&base, &config)
        .installer_mode(true)
        .build();
    registry.install(&id("platform.users"), false).unwrap();
    registry.install(&id("platform.menus"), false).unwrap();

    let mut registry = RegistryBuilder::from_config(&base, &config)
        .binder(router.clone())
        .build();
    let report = registry.start_all().unwrap();

    assert!(report.is_clean());
    assert_eq!(report.started.len(), 2);
    assert_eq!(router.routes().len(), 1);
    assert_eq!(router.handle_owner("menus").as_deref(), Some("platform/menus"));
    assert_eq!(router.started_bundles(), vec!["platform/users", "platform/menus"]);
}
