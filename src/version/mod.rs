//! Semantic versions as used by release trains
//!
//! Release trains only ever carry two kinds of prerelease labels: `next`
//! (primary development and feature-freeze) and `rc` (release-candidate).
//! Parsing goes through the `semver` crate and then narrows the prerelease
//! to a `(tag, number)` pair.

pub mod calculator;

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Prerelease label of a release-train version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrereleaseTag {
    /// Primary development or feature-freeze
    Next,
    /// Release-candidate
    Rc,
}

impl PrereleaseTag {
    /// Label as it appears in the version string
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Next => "next",
            Self::Rc => "rc",
        }
    }
}

impl fmt::Display for PrereleaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `(tag, number)` prerelease, e.g. `next.3`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Prerelease {
    /// Prerelease label
    pub tag: PrereleaseTag,
    /// Trailing numeric component
    pub number: u64,
}

impl Prerelease {
    /// Create a prerelease
    pub const fn new(tag: PrereleaseTag, number: u64) -> Self {
        Self { tag, number }
    }
}

/// A semantic version with an optional release-train prerelease
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Version {
    /// Major component
    pub major: u64,
    /// Minor component
    pub minor: u64,
    /// Patch component
    pub patch: u64,
    /// Prerelease, `None` for stable versions
    pub prerelease: Option<Prerelease>,
}

impl Version {
    /// Create a stable version
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
        }
    }

    /// Copy of this version with the given prerelease
    #[must_use]
    pub const fn with_prerelease(self, tag: PrereleaseTag, number: u64) -> Self {
        Self {
            prerelease: Some(Prerelease::new(tag, number)),
            ..self
        }
    }

    /// Parse a version string such as `10.1.0-next.3`
    pub fn parse(input: &str) -> Result<Self> {
        let parsed = semver::Version::parse(input.trim())
            .map_err(|e| Error::Version(format!("{input}: {e}")))?;

        if !parsed.build.is_empty() {
            return Err(Error::Version(format!(
                "{input}: build metadata is not supported"
            )));
        }

        let prerelease = if parsed.pre.is_empty() {
            None
        } else {
            Some(parse_prerelease(input, parsed.pre.as_str())?)
        };

        Ok(Self {
            major: parsed.major,
            minor: parsed.minor,
            patch: parsed.patch,
            prerelease,
        })
    }

    /// Prerelease label, if any
    pub fn prerelease_tag(&self) -> Option<PrereleaseTag> {
        self.prerelease.map(|p| p.tag)
    }

    /// Whether this version has no prerelease
    pub const fn is_stable(&self) -> bool {
        self.prerelease.is_none()
    }

    /// Whether this is the first version of a new major (`X.0.0`)
    pub const fn is_major(&self) -> bool {
        self.minor == 0 && self.patch == 0
    }

    /// Name of the version branch for this version (`{major}.{minor}.x`)
    pub fn version_branch_name(&self) -> String {
        format!("{}.{}.x", self.major, self.minor)
    }
}

fn parse_prerelease(input: &str, pre: &str) -> Result<Prerelease> {
    let (tag, number) = pre
        .split_once('.')
        .ok_or_else(|| Error::Version(format!("{input}: prerelease must be <tag>.<number>")))?;

    let tag = match tag {
        "next" => PrereleaseTag::Next,
        "rc" => PrereleaseTag::Rc,
        other => {
            return Err(Error::Version(format!(
                "{input}: unsupported prerelease tag \"{other}\""
            )));
        }
    };

    let number = number
        .parse()
        .map_err(|_| Error::Version(format!("{input}: prerelease number must be numeric")))?;

    Ok(Prerelease::new(tag, number))
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                // A stable version takes precedence over any of its prereleases
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = self.prerelease {
            write!(f, "-{}.{}", pre.tag, pre.number)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
