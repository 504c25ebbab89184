//! Registry manifest model, as returned by `docker buildx imagetools inspect --raw`.

use serde::Deserialize;

use crate::platform::{Platform, PlatformSet};

/// A manifest entry for one architecture-specific image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub digest: String,
    pub media_type: Option<String>,
    pub platform: Platform,
}

/// A registry manifest: either a multi-arch index or a single-platform manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub media_type: Option<String>,
    /// Per-platform entries; empty for a single-platform manifest.
    pub entries: Vec<ManifestEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawManifest {
    media_type: Option<String>,
    manifests: Option<Vec<RawDescriptor>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDescriptor {
    media_type: Option<String>,
    digest: String,
    platform: Option<RawPlatform>,
}

#[derive(Deserialize)]
struct RawPlatform {
    architecture: String,
    os: String,
    variant: Option<String>,
}

impl Manifest {
    /// Parse raw manifest JSON.
    ///
    /// Attestation entries (`unknown/unknown`) and entries without a platform
    /// are skipped.
    pub fn from_json(raw: &str) -> crate::Result<Self> {
        let parsed: RawManifest = serde_json::from_str(raw)
            .map_err(|e| crate::Error::ManifestParse { source: e })?;

        let entries = parsed
            .manifests
            .unwrap_or_default()
            .into_iter()
            .filter_map(|d| {
                let p = d.platform?;
                if p.os == "unknown" || p.architecture == "unknown" {
                    return None;
                }
                Some(ManifestEntry {
                    digest: d.digest,
                    media_type: d.media_type,
                    platform: Platform {
                        os: p.os,
                        arch: p.architecture,
                        variant: p.variant,
                    },
                })
            })
            .collect();

        Ok(Self {
            media_type: parsed.media_type,
            entries,
        })
    }

    /// Whether this is a multi-arch index / manifest list.
    pub fn is_multi_arch(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn platforms(&self) -> Vec<Platform> {
        self.entries.iter().map(|e| e.platform.clone()).collect()
    }

    /// Target platforms with no matching entry in this manifest.
    pub fn missing<'a>(&self, targets: &'a PlatformSet) -> Vec<&'a Platform> {
        targets.unsatisfied_by(&self.platforms())
    }
}
