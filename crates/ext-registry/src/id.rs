//! Extension identifiers and the slug algebra.
//!
//! An extension is identified by `(vendor, name)` and has three string
//! forms:
//!
//! | form      | example          | used for                         |
//! |-----------|------------------|----------------------------------|
//! | canonical | `platform.menus` | user input, records, descriptors |
//! | reversed  | `menus.platform` | index keys, catalog ordering     |
//! | bundle    | `platform/menus` | bundle binder and migrations     |
//!
//! A slug without a vendor (`menus`) belongs to the [`DEFAULT_VENDOR`].

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Vendor implied when a slug or directory omits one.
pub const DEFAULT_VENDOR: &str = "default";

/// Vendor that ships the platform's own core extensions.
pub const CORE_VENDOR: &str = "platform";

/// Identifier of one extension.
///
/// Ordering follows the reversed form: extension name first, then vendor,
/// so vendor variants of the same extension sort next to each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExtensionId {
    vendor: String,
    name: String,
}

impl ExtensionId {
    /// Build an id from its parts, validating both.
    pub fn new(vendor: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let vendor = vendor.into();
        let name = name.into();
        let slug = format!("{vendor}.{name}");
        validate_part(&slug, &vendor, "vendor")?;
        validate_part(&slug, &name, "extension name")?;
        Ok(Self { vendor, name })
    }

    /// Parse a canonical slug (`vendor.name`, or `name` for the default
    /// vendor).
    pub fn parse(slug: &str) -> Result<Self> {
        Self::split(slug, '.', false)
    }

    /// Parse a reversed slug (`name.vendor`, or `name`).
    pub fn from_reversed(slug: &str) -> Result<Self> {
        Self::split(slug, '.', true)
    }

    /// Parse a bundle slug (`vendor/name`, or `name`).
    pub fn from_bundle(slug: &str) -> Result<Self> {
        Self::split(slug, '/', false)
    }

    fn split(slug: &str, separator: char, reversed: bool) -> Result<Self> {
        let parts: Vec<&str> = slug.split(separator).collect();
        match parts.as_slice() {
            [name] => Self::new(DEFAULT_VENDOR, *name),
            [first, second] if reversed => Self::new(*second, *first),
            [first, second] => Self::new(*first, *second),
            _ => Err(Error::InvalidSlug {
                slug: slug.to_string(),
                reason: format!("expected at most one '{separator}' separator"),
            }),
        }
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_default_vendor(&self) -> bool {
        self.vendor == DEFAULT_VENDOR
    }

    /// `vendor.name`
    pub fn canonical(&self) -> String {
        format!("{}.{}", self.vendor, self.name)
    }

    /// `name.vendor`
    pub fn reversed(&self) -> String {
        format!("{}.{}", self.name, self.vendor)
    }

    /// `vendor/name`
    pub fn bundle(&self) -> String {
        format!("{}/{}", self.vendor, self.name)
    }

    /// Relative directory of the extension under the extensions root.
    ///
    /// Default-vendor extensions live directly under the root.
    pub fn relative_dir(&self) -> String {
        if self.is_default_vendor() {
            self.name.clone()
        } else {
            self.bundle()
        }
    }
}

fn validate_part(slug: &str, part: &str, what: &str) -> Result<()> {
    if part.is_empty() {
        return Err(Error::InvalidSlug {
            slug: slug.to_string(),
            reason: format!("{what} must not be empty"),
        });
    }
    if !part
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::InvalidSlug {
            slug: slug.to_string(),
            reason: format!(
                "{what} must contain only alphanumeric characters, hyphens, or underscores"
            ),
        });
    }
    Ok(())
}

impl Ord for ExtensionId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.vendor.cmp(&other.vendor))
    }
}

impl PartialOrd for ExtensionId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.vendor, self.name)
    }
}

impl FromStr for ExtensionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ExtensionId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ExtensionId> for String {
    fn from(id: ExtensionId) -> Self {
        id.canonical()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn three_forms() {
        let id = ExtensionId::parse("platform.menus").unwrap();
        assert_eq!(id.vendor(), "platform");
        assert_eq!(id.name(), "menus");
        assert_eq!(id.canonical(), "platform.menus");
        assert_eq!(id.reversed(), "menus.platform");
        assert_eq!(id.bundle(), "platform/menus");
    }

    #[test]
    fn missing_vendor_is_default() {
        let id = ExtensionId::parse("blog").unwrap();
        assert_eq!(id.vendor(), DEFAULT_VENDOR);
        assert_eq!(id.canonical(), "default.blog");
        assert_eq!(id.relative_dir(), "blog");
        assert!(id.is_default_vendor());
    }

    #[rstest]
    #[case("platform.menus")]
    #[case("acme.blog-posts")]
    #[case("default.pages")]
    #[case("v_2.ext_1")]
    fn reversed_round_trip(#[case] slug: &str) {
        let id = ExtensionId::parse(slug).unwrap();
        let back = ExtensionId::from_reversed(&id.reversed()).unwrap();
        assert_eq!(back, id);
        assert_eq!(back.canonical(), slug);

        let bundle = ExtensionId::from_bundle(&id.bundle()).unwrap();
        assert_eq!(bundle, id);
    }

    #[test]
    fn reversing_twice_is_identity_on_strings() {
        let slug = "platform.menus";
        let once = ExtensionId::parse(slug).unwrap().reversed();
        let twice = ExtensionId::parse(&once).unwrap().reversed();
        assert_eq!(twice, slug);
    }

    #[rstest]
    #[case("")]
    #[case(".menus")]
    #[case("platform.")]
    #[case("a.b.c")]
    #[case("platform.my menus")]
    #[case("platform/menus")]
    fn invalid_slugs_rejected(#[case] slug: &str) {
        assert!(matches!(
            ExtensionId::parse(slug),
            Err(Error::InvalidSlug { .. })
        ));
    }

    #[test]
    fn ordering_groups_vendor_variants() {
        let mut ids = vec![
            ExtensionId::parse("zeta.menus").unwrap(),
            ExtensionId::parse("platform.users").unwrap(),
            ExtensionId::parse("acme.menus").unwrap(),
        ];
        ids.sort();
        let slugs: Vec<String> = ids.iter().map(ExtensionId::canonical).collect();
        assert_eq!(slugs, vec!["acme.menus", "zeta.menus", "platform.users"]);
    }

    #[test]
    fn serde_uses_canonical_string() {
        let id = ExtensionId::parse("platform.menus").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"platform.menus\"");
        let back: ExtensionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<ExtensionId>("\"a.b.c\"").is_err());
    }
}
