//! Dotted three-part version numbers embedded in file names.
//!
//! Installer names look like `ZaloSetup-universal-25.8.2.dmg`; the first
//! `major.minor.patch` run in the text is the version.

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]+)\.([0-9]+)\.([0-9]+)").expect("version regex is valid")
});

/// A `major.minor.patch` version parsed out of a string.
///
/// Ordering and equality only consider the numeric components.
#[derive(Debug, Clone, Eq)]
pub struct Version {
    /// Major component
    pub major: u64,
    /// Minor component
    pub minor: u64,
    /// Patch component
    pub patch: u64,
    /// The matched text, e.g. `25.8.2`
    pub raw: String,
}

impl Version {
    /// Parse the first `\d+\.\d+\.\d+` occurrence in `text`, ASCII digits only.
    ///
    /// Returns `None` when there is no such occurrence or a component does not fit in `u64`.
    pub fn parse(text: &str) -> Option<Self> {
        let caps = VERSION_RE.captures(text)?;
        Some(Self {
            major: caps[1].parse().ok()?,
            minor: caps[2].parse().ok()?,
            patch: caps[3].parse().ok()?,
            raw: caps[0].to_string(),
        })
    }

    /// Numeric components as a tuple
    pub fn triple(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.triple() == other.triple()
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.triple().cmp(&other.triple())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(text: &str) -> Version {
        Version::parse(text).expect("test version parses")
    }

    #[test]
    fn test_parse_from_installer_name() {
        let version = v("ZaloSetup-universal-25.8.2.dmg");
        assert_eq!(version.triple(), (25, 8, 2));
        assert_eq!(version.raw, "25.8.2");
    }

    #[test]
    fn test_parse_takes_first_match() {
        assert_eq!(v("App-1.2.3-build-4.5.6.dmg").raw, "1.2.3");
    }

    #[test]
    fn test_parse_skips_non_ascii_digits() {
        assert_eq!(v("App-1.2.\u{0663}-4.5.6.dmg").triple(), (4, 5, 6));
        assert!(Version::parse("\u{0661}.\u{0662}.\u{0663}").is_none());
    }

    #[test]
    fn test_parse_absent() {
        assert!(Version::parse("zalo.dmg").is_none());
        assert!(Version::parse("App-1.2.dmg").is_none());
        assert!(Version::parse("").is_none());
    }

    #[test]
    fn test_parse_accepts_large_components() {
        assert_eq!(v("999.999.999").triple(), (999, 999, 999));
    }

    #[test]
    fn test_parse_overflow_is_absent() {
        assert!(Version::parse("99999999999999999999999.1.1").is_none());
    }

    #[test]
    fn test_numeric_ordering() {
        assert!(!(v("9.0.0") > v("10.0.0")));
        assert!(v("1.9.0") < v("1.10.0"));
        assert!(v("2.0.0") > v("1.99.99"));
        assert_eq!(v("1.2.3").cmp(&v("x-1.2.3")), Ordering::Equal);
    }

    #[test]
    fn test_equality_ignores_raw_text() {
        assert_eq!(v("01.2.3"), v("1.2.3"));
        assert_ne!(v("01.2.3").raw, v("1.2.3").raw);
    }
}
