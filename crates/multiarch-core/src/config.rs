use std::collections::BTreeMap;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use crate::{ImageRef, PlatformSet};

/// File name of the project configuration.
pub const CONFIG_FILE: &str = "multiarch.toml";

/// multiarch.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MultiarchConfig {
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub publish: PublishConfig,
}

/// Which image definition to render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageVariant {
    /// Installs the dependency manifest, then stages the application scripts.
    #[default]
    Full,
    /// Stages the entrypoint only; relies on the base image's packages.
    Slim,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Base runtime image
    #[serde(default = "default_base_image")]
    pub base_image: String,
    #[serde(default)]
    pub variant: ImageVariant,
    /// Dependency manifest, relative to the project directory (full variant only)
    #[serde(default = "default_requirements")]
    pub requirements: String,
    /// Files staged into the image.
    /// When None, the variant default is used.
    #[serde(default)]
    pub files: Option<Vec<String>>,
    /// Script run as the container's default command
    #[serde(default = "default_entrypoint")]
    pub entrypoint: String,
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    #[serde(default = "default_workdir")]
    pub workdir: String,
    /// Environment variables baked into the image. Overrides the fixed defaults.
    #[serde(default = "default_env")]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Target image reference; IMG and --image take precedence
    #[serde(default)]
    pub image: Option<String>,
    /// Target platforms, in build order
    #[serde(default = "default_platforms")]
    pub platforms: Vec<String>,
    /// Name of the buildx builder context
    #[serde(default = "default_builder")]
    pub builder: String,
    /// Run `docker login` before pushing
    #[serde(default = "default_login")]
    pub login: bool,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            base_image: default_base_image(),
            variant: ImageVariant::default(),
            requirements: default_requirements(),
            files: None,
            entrypoint: default_entrypoint(),
            interpreter: default_interpreter(),
            workdir: default_workdir(),
            env: default_env(),
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            image: None,
            platforms: default_platforms(),
            builder: default_builder(),
            login: default_login(),
        }
    }
}

impl MultiarchConfig {
    /// Load from multiarch.toml at the given path, or return defaults if not found.
    pub fn load(project_dir: &Path) -> crate::Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE);
        if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                    path: config_path.clone(),
                    source: e,
                })?;
            let mut config: Self =
                toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
                    path: config_path,
                    source: e,
                })?;
            config.image.fill_fixed_env();
            Ok(config)
        } else {
            tracing::debug!(dir = %project_dir.display(), "no multiarch.toml, using defaults");
            Ok(Self::default())
        }
    }
}

impl ImageConfig {
    /// Files copied into the image, in order, without duplicates.
    ///
    /// The entrypoint is always staged. Every path must be relative and stay
    /// inside the project directory.
    pub fn staged_files(&self) -> crate::Result<Vec<String>> {
        let listed: Vec<String> = match (&self.files, self.variant) {
            (Some(files), _) => files.clone(),
            (None, ImageVariant::Full) => DEFAULT_FULL_FILES.iter().map(|f| (*f).to_owned()).collect(),
            (None, ImageVariant::Slim) => vec![self.entrypoint.clone()],
        };

        let mut staged: Vec<String> = Vec::new();
        for file in listed.into_iter().chain(std::iter::once(self.entrypoint.clone())) {
            validate_staged_path(&file)?;
            if !staged.contains(&file) {
                staged.push(file);
            }
        }
        Ok(staged)
    }

    /// Check the fields interpolated into the Dockerfile.
    ///
    /// Each value must stay on its own instruction line, and the
    /// interpreter and entrypoint must fit inside the JSON `CMD` strings.
    pub fn validate(&self) -> crate::Result<()> {
        self.base_image.parse::<ImageRef>()?;

        check_instruction_value("workdir", &self.workdir)?;
        if !self.workdir.starts_with('/') {
            return Err(invalid_field("workdir", &self.workdir, "must be an absolute path"));
        }
        for (field, value) in [("interpreter", &self.interpreter), ("entrypoint", &self.entrypoint)] {
            check_instruction_value(field, value)?;
            if value.contains('\\') {
                return Err(invalid_field(field, value, "must not contain backslashes"));
            }
        }

        for (key, value) in &self.env {
            let field = format!("env.{key}");
            let mut chars = key.chars();
            let valid_key = chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid_key {
                return Err(invalid_field(&field, key, "name must match [A-Za-z_][A-Za-z0-9_]*"));
            }
            if value.chars().any(char::is_control) {
                return Err(invalid_field(&field, value, "must not contain control characters"));
            }
        }
        Ok(())
    }

    /// Whether the image installs the dependency manifest.
    pub fn installs_dependencies(&self) -> bool {
        self.variant == ImageVariant::Full
    }

    /// Ensure the fixed build-time variables are present unless overridden.
    fn fill_fixed_env(&mut self) {
        for (key, value) in default_env() {
            self.env.entry(key).or_insert(value);
        }
    }
}

impl PublishConfig {
    pub fn platform_set(&self) -> crate::Result<PlatformSet> {
        PlatformSet::parse(&self.platforms)
    }

    /// Resolve the target image: explicit override first, then the config value.
    pub fn resolve_image(&self, override_ref: Option<&str>) -> crate::Result<ImageRef> {
        override_ref
            .filter(|s| !s.trim().is_empty())
            .or(self.image.as_deref())
            .ok_or(crate::Error::MissingImageRef)?
            .parse()
    }

    /// Resolve the reference `publish` writes to.
    ///
    /// Digests are accepted by [`resolve_image`](Self::resolve_image) for
    /// reading, but a push target needs a tag.
    pub fn resolve_push_target(&self, override_ref: Option<&str>) -> crate::Result<ImageRef> {
        let image = self.resolve_image(override_ref)?;
        if image.digest.is_some() {
            return Err(crate::Error::DigestNotPushable {
                reference: image.to_string(),
            });
        }
        Ok(image)
    }
}

const DEFAULT_FULL_FILES: &[&str] = &["app.py", "current_time.py", "whatsmyip.py"];

fn validate_staged_path(path: &str) -> crate::Result<()> {
    let invalid = |reason| crate::Error::InvalidStagedPath {
        path: path.to_owned(),
        reason,
    };

    if path.trim().is_empty() {
        return Err(invalid("path is empty"));
    }
    let p = Path::new(path);
    if p.is_absolute() {
        return Err(invalid("must be relative to the project directory"));
    }
    if p.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(invalid("must not contain '..'"));
    }
    if path.chars().any(|c| c.is_whitespace() || c == '"') {
        return Err(invalid("must not contain whitespace or quotes"));
    }
    Ok(())
}

fn invalid_field(field: &str, value: &str, reason: &'static str) -> crate::Error {
    crate::Error::InvalidImageField {
        field: field.to_owned(),
        value: value.to_owned(),
        reason,
    }
}

fn check_instruction_value(field: &str, value: &str) -> crate::Result<()> {
    if value.trim().is_empty() {
        return Err(invalid_field(field, value, "must not be empty"));
    }
    if value.chars().any(|c| c.is_control() || c == '"') {
        return Err(invalid_field(field, value, "must not contain quotes or control characters"));
    }
    Ok(())
}

fn default_base_image() -> String {
    "python:3.11-slim".to_owned()
}

fn default_requirements() -> String {
    "requirements.txt".to_owned()
}

fn default_entrypoint() -> String {
    "app.py".to_owned()
}

fn default_interpreter() -> String {
    "python".to_owned()
}

fn default_workdir() -> String {
    "/app".to_owned()
}

fn default_env() -> BTreeMap<String, String> {
    // OpenBLAS misdetects some ARM cores; pin the core type.
    BTreeMap::from([
        ("OPENBLAS_CORETYPE".to_owned(), "ARMV8".to_owned()),
        ("PIP_NO_CACHE_DIR".to_owned(), "1".to_owned()),
        ("PIP_PREFER_BINARY".to_owned(), "1".to_owned()),
    ])
}

fn default_platforms() -> Vec<String> {
    vec!["linux/amd64".to_owned(), "linux/arm64".to_owned()]
}

fn default_builder() -> String {
    "multiarch".to_owned()
}

fn default_login() -> bool {
    true
}
