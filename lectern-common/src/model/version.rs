// lectern-common/src/model/version.rs
// Dotted-numeric version comparison. Deliberately not semver: descriptor
// authors write anything from "1.0" to "2024.04-beta", and release tags add
// a leading "v". Components split on '.' and '-', parse as integers (zero
// when non-numeric), shorter sequences are padded with trailing zeros, and
// the first differing component decides.
use std::cmp::Ordering;

fn components(version: &str) -> Vec<u64> {
    version
        .split(['.', '-'])
        .map(|part| part.trim().parse::<u64>().unwrap_or(0))
        .collect()
}

pub fn compare(a: &str, b: &str) -> Ordering {
    let mut left = components(a);
    let mut right = components(b);
    let width = left.len().max(right.len());
    left.resize(width, 0);
    right.resize(width, 0);
    left.cmp(&right)
}

/// True iff `remote` compares strictly greater than `local`.
pub fn is_newer(remote: &str, local: &str) -> bool {
    compare(remote, local) == Ordering::Greater
}

/// Strips a leading version-tag prefix ("v1.2.0" -> "1.2.0").
pub fn strip_tag_prefix(tag: &str) -> &str {
    tag.trim()
        .strip_prefix(['v', 'V'])
        .unwrap_or_else(|| tag.trim())
}

/// Normalizes a host-version string for comparison.
pub fn normalize(version: &str) -> String {
    strip_tag_prefix(version).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strictly_greater_is_newer() {
        assert!(is_newer("1.1.0", "1.0"));
        assert!(is_newer("2", "1.9.9"));
        assert!(is_newer("1.0.1", "1.0"));
        assert!(is_newer("1.10", "1.9"));
    }

    #[test]
    fn equal_sequences_are_not_newer() {
        assert!(!is_newer("1.0", "1.0"));
        assert!(!is_newer("1.0", "1.0.0"));
        assert!(!is_newer("1.0.0", "1.0"));
        assert_eq!(compare("1.2.3", "1.2.3"), Ordering::Equal);
    }

    #[test]
    fn older_is_not_newer() {
        assert!(!is_newer("1.0", "1.1"));
        assert!(!is_newer("0.9.9", "1.0"));
    }

    #[test]
    fn non_numeric_components_count_as_zero() {
        // "1.0-beta" == "1.0.0"
        assert_eq!(compare("1.0-beta", "1.0.0"), Ordering::Equal);
        assert!(is_newer("1.0-2", "1.0-1"));
        assert!(!is_newer("1.0-rc", "1.0"));
    }

    #[test]
    fn tag_prefix_is_stripped() {
        assert_eq!(strip_tag_prefix("v1.2.0"), "1.2.0");
        assert_eq!(strip_tag_prefix("V2.0"), "2.0");
        assert_eq!(strip_tag_prefix("1.2.0"), "1.2.0");
    }

    #[test]
    fn coerced_numeric_descriptor_version_compares() {
        // A descriptor author wrote `version = 1.0`; after string coercion
        // and prefix stripping the release tag still compares newer.
        assert!(is_newer(strip_tag_prefix("v1.1.0"), "1.0"));
    }
}
