//! Target platforms (`os/arch[/variant]`) and ordered platform sets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// An operating-system / architecture pair an image variant runs on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: String,
    pub arch: String,
    pub variant: Option<String>,
}

impl Platform {
    pub fn new(os: &str, arch: &str, variant: Option<&str>) -> Self {
        Self {
            os: os.to_owned(),
            arch: arch.to_owned(),
            variant: variant.map(str::to_owned),
        }
    }

    /// Whether `self` (an available platform) satisfies `wanted`.
    ///
    /// A wanted platform without a variant accepts any variant.
    /// `arm64` and `arm64/v8` are the same platform.
    pub fn satisfies(&self, wanted: &Platform) -> bool {
        if self.os != wanted.os || self.arch != wanted.arch {
            return false;
        }
        match (self.normalized_variant(), wanted.normalized_variant()) {
            (_, None) => true,
            (Some(have), Some(want)) => have == want,
            (None, Some(_)) => false,
        }
    }

    fn normalized_variant(&self) -> Option<&str> {
        match (self.arch.as_str(), self.variant.as_deref()) {
            ("arm64", Some("v8")) => None,
            (_, v) => v,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)?;
        if let Some(variant) = &self.variant {
            write!(f, "/{variant}")?;
        }
        Ok(())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidPlatform {
            value: s.to_owned(),
        };

        let parts: Vec<&str> = s.trim().split('/').collect();
        let valid_part = |p: &&str| {
            !p.is_empty()
                && p.chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        };
        if !(2..=3).contains(&parts.len()) || !parts.iter().all(valid_part) {
            return Err(invalid());
        }

        Ok(Self::new(parts[0], parts[1], parts.get(2).copied()))
    }
}

impl Serialize for Platform {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Platform {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// An ordered, duplicate-free, non-empty set of target platforms.
///
/// # Examples
///
/// ```
/// use multiarch_core::PlatformSet;
///
/// let set = PlatformSet::parse(["linux/amd64", "linux/arm64", "linux/amd64"]).unwrap();
/// assert_eq!(set.len(), 2);
/// assert_eq!(set.to_buildx_arg(), "linux/amd64,linux/arm64");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformSet {
    platforms: Vec<Platform>,
}

impl PlatformSet {
    /// Build a set, dropping duplicates while keeping first-seen order.
    pub fn new(platforms: impl IntoIterator<Item = Platform>) -> crate::Result<Self> {
        let mut unique: Vec<Platform> = Vec::new();
        for platform in platforms {
            if !unique.contains(&platform) {
                unique.push(platform);
            }
        }
        if unique.is_empty() {
            return Err(Error::EmptyPlatformSet);
        }
        Ok(Self { platforms: unique })
    }

    pub fn parse<I, S>(values: I) -> crate::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let platforms = values
            .into_iter()
            .map(|v| v.as_ref().parse())
            .collect::<crate::Result<Vec<Platform>>>()?;
        Self::new(platforms)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Platform> {
        self.platforms.iter()
    }

    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    /// A constructed set is never empty.
    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }

    /// Value for `docker buildx build --platform`.
    pub fn to_buildx_arg(&self) -> String {
        self.platforms
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Platforms in `self` not satisfied by any of `available`.
    pub fn unsatisfied_by<'a>(&'a self, available: &[Platform]) -> Vec<&'a Platform> {
        self.platforms
            .iter()
            .filter(|wanted| !available.iter().any(|have| have.satisfies(wanted)))
            .collect()
    }
}

impl Default for PlatformSet {
    fn default() -> Self {
        Self {
            platforms: vec![
                Platform::new("linux", "amd64", None),
                Platform::new("linux", "arm64", None),
            ],
        }
    }
}

impl fmt::Display for PlatformSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_buildx_arg())
    }
}

impl<'a> IntoIterator for &'a PlatformSet {
    type Item = &'a Platform;
    type IntoIter = std::slice::Iter<'a, Platform>;

    fn into_iter(self) -> Self::IntoIter {
        self.platforms.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_and_three_part_platforms() {
        let p: Platform = "linux/amd64".parse().unwrap();
        assert_eq!(p, Platform::new("linux", "amd64", None));

        let p: Platform = "linux/arm/v7".parse().unwrap();
        assert_eq!(p.variant.as_deref(), Some("v7"));
        assert_eq!(p.to_string(), "linux/arm/v7");
    }

    #[test]
    fn rejects_malformed_platforms() {
        for bad in ["", "linux", "linux/", "/amd64", "linux/amd64/v8/x", "Linux/AMD64"] {
            assert!(bad.parse::<Platform>().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn arm64_v8_satisfies_plain_arm64() {
        let have = Platform::new("linux", "arm64", Some("v8"));
        let want = Platform::new("linux", "arm64", None);
        assert!(have.satisfies(&want));
        assert!(want.satisfies(&have));
    }

    #[test]
    fn variant_mismatch_does_not_satisfy() {
        let have = Platform::new("linux", "arm", Some("v6"));
        let want = Platform::new("linux", "arm", Some("v7"));
        assert!(!have.satisfies(&want));
    }

    #[test]
    fn set_deduplicates_and_keeps_order() {
        let set = PlatformSet::parse(["linux/arm64", "linux/amd64", "linux/arm64"]).unwrap();
        let names: Vec<String> = set.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["linux/arm64", "linux/amd64"]);
    }

    #[test]
    fn empty_set_is_rejected() {
        let err = PlatformSet::parse(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, Error::EmptyPlatformSet));
    }

    #[test]
    fn default_set_is_amd64_and_arm64() {
        assert_eq!(
            PlatformSet::default().to_buildx_arg(),
            "linux/amd64,linux/arm64"
        );
    }

    #[test]
    fn unsatisfied_lists_missing_platforms() {
        let set = PlatformSet::parse(["linux/amd64", "linux/arm64", "linux/arm/v7"]).unwrap();
        let available = vec![
            Platform::new("linux", "amd64", None),
            Platform::new("linux", "arm64", Some("v8")),
        ];
        let missing: Vec<String> = set
            .unsatisfied_by(&available)
            .into_iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(missing, vec!["linux/arm/v7"]);
    }
}
