//! Lenient semver parsing and update checks.
//!
//! Descriptors and installation records often carry two-part versions such
//! as `1.1`; they are read as `1.1.0`.

use crate::error::{Error, Result};

/// Parse a version string, appending `.0` when the patch is omitted.
///
/// - `"1.1"` -> `1.1.0`
/// - `"1.1.4"` -> `1.1.4`
/// - `"1"` -> error
pub fn parse_version(s: &str) -> Result<semver::Version> {
    let s = s.trim();

    if let Ok(v) = semver::Version::parse(s) {
        return Ok(v);
    }

    let with_patch = format!("{s}.0");
    semver::Version::parse(&with_patch).map_err(|source| Error::InvalidVersion {
        version: s.to_string(),
        source,
    })
}

/// Whether `available` is strictly newer than `current`.
pub fn is_newer(available: &str, current: &str) -> Result<bool> {
    Ok(parse_version(available)? > parse_version(current)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_part() {
        assert_eq!(parse_version("1.1.4").unwrap(), semver::Version::new(1, 1, 4));
    }

    #[test]
    fn two_part() {
        assert_eq!(parse_version("1.1").unwrap(), semver::Version::new(1, 1, 0));
    }

    #[test]
    fn whitespace() {
        assert_eq!(parse_version("  2.0.1 ").unwrap(), semver::Version::new(2, 0, 1));
    }

    #[test]
    fn garbage_rejected() {
        assert!(matches!(
            parse_version("abc"),
            Err(Error::InvalidVersion { .. })
        ));
        assert!(parse_version("1").is_err());
    }

    #[test]
    fn newer() {
        assert!(is_newer("1.1", "1.0").unwrap());
        assert!(is_newer("1.0.1", "1.0").unwrap());
        assert!(!is_newer("1.1", "1.1.0").unwrap());
        assert!(!is_newer("1.0", "1.1").unwrap());
    }
}
