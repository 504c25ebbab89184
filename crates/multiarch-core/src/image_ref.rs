//! Container image references (`registry/repository:tag[@digest]`).

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Registry used when a reference carries no explicit host.
pub const DEFAULT_REGISTRY: &str = "docker.io";

const DEFAULT_TAG: &str = "latest";
const MAX_TAG_LEN: usize = 128;

/// A fully-qualified image reference.
///
/// Parsing follows the Docker distribution convention: the first path
/// component is a registry host only if it contains `.` or `:`, or is
/// `localhost`. Single-component Docker Hub names get the `library/` prefix.
///
/// # Examples
///
/// ```
/// use multiarch_core::ImageRef;
///
/// let img: ImageRef = "acme/demo:v1".parse().unwrap();
/// assert_eq!(img.registry, "docker.io");
/// assert_eq!(img.repository, "acme/demo");
/// assert_eq!(img.tag.as_deref(), Some("v1"));
/// assert_eq!(img.to_string(), "docker.io/acme/demo:v1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub registry: String,
    pub repository: String,
    /// `None` only when the reference is pinned by digest alone.
    pub tag: Option<String>,
    pub digest: Option<String>,
}

impl ImageRef {
    /// Server argument for `docker login`; `None` means Docker Hub.
    pub fn login_server(&self) -> Option<&str> {
        if self.registry == DEFAULT_REGISTRY {
            None
        } else {
            Some(&self.registry)
        }
    }

    /// The reference without tag or digest.
    pub fn name(&self) -> String {
        format!("{}/{}", self.registry, self.repository)
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.registry, self.repository)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{tag}")?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "@{digest}")?;
        }
        Ok(())
    }
}

impl FromStr for ImageRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| Error::InvalidImageRef {
            reference: s.to_owned(),
            reason,
        };

        let input = s.trim();
        if input.is_empty() {
            return Err(invalid("reference is empty"));
        }

        let (rest, digest) = match input.split_once('@') {
            Some((rest, digest)) => {
                validate_digest(digest).map_err(invalid)?;
                (rest, Some(digest.to_owned()))
            }
            None => (input, None),
        };

        // A ':' after the last '/' separates the tag; earlier ones belong to a host:port.
        let last_slash = rest.rfind('/').map_or(0, |i| i + 1);
        let (name, tag) = match rest[last_slash..].rfind(':') {
            Some(i) => {
                let split = last_slash + i;
                (&rest[..split], Some(rest[split + 1..].to_owned()))
            }
            None => (rest, None),
        };

        if let Some(tag) = &tag {
            validate_tag(tag).map_err(invalid)?;
        }

        let (registry, repository) = match name.split_once('/') {
            Some((first, remainder)) if is_registry_host(first) => {
                (first.to_owned(), remainder.to_owned())
            }
            _ => (DEFAULT_REGISTRY.to_owned(), name.to_owned()),
        };

        if registry.is_empty() {
            return Err(invalid("registry host is empty"));
        }
        validate_repository(&repository).map_err(invalid)?;

        let repository = if registry == DEFAULT_REGISTRY && !repository.contains('/') {
            format!("library/{repository}")
        } else {
            repository
        };

        let tag = match (tag, &digest) {
            (Some(tag), _) => Some(tag),
            (None, Some(_)) => None,
            (None, None) => Some(DEFAULT_TAG.to_owned()),
        };

        Ok(Self {
            registry,
            repository,
            tag,
            digest,
        })
    }
}

fn is_registry_host(component: &str) -> bool {
    component.contains('.') || component.contains(':') || component == "localhost"
}

fn validate_repository(repository: &str) -> Result<(), &'static str> {
    if repository.is_empty() {
        return Err("repository is empty");
    }
    for component in repository.split('/') {
        if component.is_empty() {
            return Err("repository has an empty path component");
        }
        if !component
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'))
        {
            return Err("repository must be lowercase alphanumerics separated by '.', '_' or '-'");
        }
        let starts_ok = component
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric());
        let ends_ok = component
            .chars()
            .last()
            .is_some_and(|c| c.is_ascii_alphanumeric());
        if !starts_ok || !ends_ok {
            return Err("repository components must start and end with an alphanumeric");
        }
    }
    Ok(())
}

fn validate_tag(tag: &str) -> Result<(), &'static str> {
    if tag.is_empty() {
        return Err("tag is empty");
    }
    if tag.len() > MAX_TAG_LEN {
        return Err("tag longer than 128 characters");
    }
    if tag.starts_with('.') || tag.starts_with('-') {
        return Err("tag must not start with '.' or '-'");
    }
    if !tag
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
    {
        return Err("tag may only contain alphanumerics, '.', '-' and '_'");
    }
    Ok(())
}

fn validate_digest(digest: &str) -> Result<(), &'static str> {
    let Some((algorithm, hex)) = digest.split_once(':') else {
        return Err("digest must be algorithm:hex");
    };
    if algorithm.is_empty() || !algorithm.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("digest algorithm must be alphanumeric");
    }
    if hex.len() < 32 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err("digest must carry at least 32 hex characters");
    }
    Ok(())
}
