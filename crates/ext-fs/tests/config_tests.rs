use ext_fs::{ConfigStore, Error, Format, NormalizedPath};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde::{Deserialize, Serialize};
use std::fs;
use tempfile::TempDir;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Settings {
    extensions_dir: String,
    installer_mode: bool,
}

#[rstest]
#[case("platform.toml", "extensions_dir = \"ext\"\ninstaller_mode = true\n")]
#[case("platform.json", r#"{"extensions_dir": "ext", "installer_mode": true}"#)]
#[case("platform.yaml", "extensions_dir: ext\ninstaller_mode: true\n")]
#[case("platform.yml", "extensions_dir: ext\ninstaller_mode: true\n")]
fn load_detects_format_from_extension(#[case] file: &str, #[case] content: &str) {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join(file);
    fs::write(&file_path, content).unwrap();

    let settings: Settings = ConfigStore::new()
        .load(&NormalizedPath::new(&file_path))
        .unwrap();

    assert_eq!(
        settings,
        Settings {
            extensions_dir: "ext".into(),
            installer_mode: true,
        }
    );
}

#[test]
fn save_then_load_toml() {
    let temp = TempDir::new().unwrap();
    let path = NormalizedPath::new(temp.path().join("state/platform.toml"));
    let store = ConfigStore::new();

    let settings = Settings {
        extensions_dir: "extensions".into(),
        installer_mode: false,
    };
    store.save(&path, &settings).unwrap();

    let raw = fs::read_to_string(path.to_native()).unwrap();
    assert!(raw.contains("extensions_dir = \"extensions\""));

    let loaded: Settings = store.load(&path).unwrap();
    assert_eq!(loaded, settings);
}

#[test]
fn unsupported_extension_is_rejected() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("platform.ini");
    fs::write(&file_path, "x=1").unwrap();

    let err = ConfigStore::new()
        .load::<Settings>(&NormalizedPath::new(&file_path))
        .unwrap_err();

    assert!(matches!(err, Error::UnsupportedFormat { ref extension } if extension == "ini"));
}

#[test]
fn parse_error_names_the_format() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("broken.json");
    fs::write(&file_path, "{ not json").unwrap();

    let err = ConfigStore::new()
        .load::<Settings>(&NormalizedPath::new(&file_path))
        .unwrap_err();

    match err {
        Error::Parse { format, .. } => assert_eq!(format, "JSON"),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn format_names() {
    assert_eq!(Format::from_extension("TOML"), Some(Format::Toml));
    assert_eq!(Format::from_extension("php"), None);
    assert_eq!(Format::Yaml.name(), "YAML");
}
