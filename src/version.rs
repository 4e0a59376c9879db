//! Semantic versions recorded in the project document.

use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Version written by this build into every saved project document.
pub const CURRENT_VERSION: &str = "1.0.0";

/// Version assumed for projects without a readable document.
pub const INITIAL_VERSION: &str = "0.0.0";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("Expected 3 version components in '{0}'")]
    ComponentCount(String),

    #[error("Invalid {component} version component: '{value}'")]
    InvalidComponent {
        component: &'static str,
        value: String,
    },
}

/// Semantic version (`major.minor.patch[-prerelease]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub prerelease: Option<String>,
}

impl Version {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
        }
    }

    /// Parse `1.2.3`, `v1.2.3` or `1.2.3-beta.1`. Build metadata is ignored.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let s = s.trim().trim_start_matches('v');
        let s = s.split('+').next().unwrap_or(s);

        let (core, prerelease) = match s.split_once('-') {
            Some((core, pre)) => (core, Some(pre.to_string())),
            None => (s, None),
        };

        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() != 3 {
            return Err(VersionError::ComponentCount(s.to_string()));
        }

        let component = |name: &'static str, value: &str| {
            value.parse::<u32>().map_err(|_| VersionError::InvalidComponent {
                component: name,
                value: value.to_string(),
            })
        };

        Ok(Self {
            major: component("major", parts[0])?,
            minor: component("minor", parts[1])?,
            patch: component("patch", parts[2])?,
            prerelease,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prerelease {
            Some(ref pre) => write!(f, "{}.{}.{}-{}", self.major, self.minor, self.patch, pre),
            None => write!(f, "{}.{}.{}", self.major, self.minor, self.patch),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.patch.cmp(&other.patch))
            .then_with(|| match (&self.prerelease, &other.prerelease) {
                // Prerelease versions sort before the release
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => compare_prerelease(a, b),
            })
    }
}

fn compare_prerelease(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse() {
        assert_eq!(Version::parse("1.2.3").unwrap(), Version::new(1, 2, 3));
        assert_eq!(Version::parse("v1.2.3").unwrap(), Version::new(1, 2, 3));
        assert_eq!(
            Version::parse("1.2.3-beta.1").unwrap().prerelease.as_deref(),
            Some("beta.1")
        );
        assert_eq!(Version::parse("1.2.3+build.7").unwrap(), Version::new(1, 2, 3));
    }

    #[test]
    fn test_version_parse_invalid() {
        assert!(matches!(
            Version::parse("1.2"),
            Err(VersionError::ComponentCount(_))
        ));
        assert!(Version::parse("1.2.3.4").is_err());
        assert!(matches!(
            Version::parse("a.b.c"),
            Err(VersionError::InvalidComponent { component: "major", .. })
        ));
    }

    #[test]
    fn test_ordering() {
        let v = |s| Version::parse(s).unwrap();
        assert!(v("1.0.0") > v("0.0.0"));
        assert!(v("1.0.0") > v("0.9.9"));
        assert!(v("1.10.0") > v("1.9.0"));
        assert!(v("1.0.0") > v("1.0.0-rc.1"));
        assert!(v("1.0.0-rc.2") > v("1.0.0-rc.1"));
        assert!(v("1.0.0-rc.10") > v("1.0.0-rc.9"));
        assert!(v("1.0.0-beta") > v("1.0.0-alpha.1"));
        assert_eq!(v("1.0.0").cmp(&v("v1.0.0")), Ordering::Equal);
    }

    #[test]
    fn test_display_roundtrip() {
        assert_eq!(Version::parse("2.4.1-rc.3").unwrap().to_string(), "2.4.1-rc.3");
        assert_eq!(Version::parse(CURRENT_VERSION).unwrap().to_string(), CURRENT_VERSION);
    }
}
