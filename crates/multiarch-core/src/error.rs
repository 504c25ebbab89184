use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    // ── Image reference ──
    #[error("invalid image reference {reference:?}: {reason}")]
    InvalidImageRef {
        reference: String,
        reason: &'static str,
    },

    #[error(
        "no image reference given — set IMG, pass --image, or set [publish].image in multiarch.toml"
    )]
    MissingImageRef,

    #[error("cannot publish to {reference}: a digest names existing content — use a tag")]
    DigestNotPushable { reference: String },

    // ── Platforms ──
    #[error("invalid platform {value:?}: expected os/arch[/variant]")]
    InvalidPlatform { value: String },

    #[error("target platform set is empty — list at least one platform")]
    EmptyPlatformSet,

    // ── Dependency manifest ──
    #[error("dependency manifest not found at {path}")]
    RequirementsMissing {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path}:{line}: unresolvable requirement {content:?}: {reason}")]
    InvalidRequirement {
        path: PathBuf,
        line: usize,
        content: String,
        reason: &'static str,
    },

    // ── Staged files ──
    #[error("invalid staged path {path:?}: {reason}")]
    InvalidStagedPath { path: String, reason: &'static str },

    #[error("invalid [image] {field} {value:?}: {reason}")]
    InvalidImageField {
        field: String,
        value: String,
        reason: &'static str,
    },

    // ── Registry manifest ──
    #[error("failed to parse registry manifest")]
    ManifestParse { source: serde_json::Error },
}
