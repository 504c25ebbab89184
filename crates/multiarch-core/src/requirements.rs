//! `requirements.txt` parsing for the dependency-install image layer.
//!
//! Only what can be checked without a package index is validated here:
//! distribution names, extras, and version specifier syntax. Whether a
//! constraint resolves against the index is left to pip at build time.
//! URL, VCS, archive and path lines are kept as opaque locations.

use std::path::{Path, PathBuf};

use crate::Error;

const OPERATORS: &[&str] = &["===", "~=", "==", "!=", "<=", ">=", "<", ">"];

/// One package requirement line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// Distribution name as written.
    pub name: String,
    pub extras: Vec<String>,
    /// Version specifiers (`>=2.0,<3`) or a direct reference (`@ https://…`).
    pub constraint: Option<String>,
    /// Bare URL, VCS link, archive, or local path handed to pip as written.
    pub location: Option<String>,
    /// Environment marker after `;`.
    pub marker: Option<String>,
    /// 1-based line number in the source file.
    pub line: usize,
}

/// An ordered dependency manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyManifest {
    pub path: PathBuf,
    pub requirements: Vec<Requirement>,
    /// pip option lines (`-r base.txt`, `--index-url …`), kept verbatim.
    pub options: Vec<String>,
}

impl DependencyManifest {
    /// Read and validate a requirements file.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::RequirementsMissing {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(path, &content)
    }

    /// Parse requirements content; `path` is only used in error messages.
    pub fn parse(path: &Path, content: &str) -> crate::Result<Self> {
        let mut manifest = DependencyManifest {
            path: path.to_path_buf(),
            ..Default::default()
        };

        for (line_no, raw) in logical_lines(content) {
            let line = strip_comment(&raw).trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('-') {
                manifest.options.push(line.to_owned());
                continue;
            }

            let requirement = parse_requirement(line, line_no).map_err(|reason| {
                Error::InvalidRequirement {
                    path: path.to_path_buf(),
                    line: line_no,
                    content: line.to_owned(),
                    reason,
                }
            })?;
            manifest.requirements.push(requirement);
        }

        tracing::debug!(
            path = %path.display(),
            count = manifest.requirements.len(),
            "parsed dependency manifest"
        );
        Ok(manifest)
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }
}

/// Joins `\`-continued lines, yielding each logical line with its starting number.
fn logical_lines(content: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (i, line) in content.lines().enumerate() {
        let (start, mut buf) = pending.take().unwrap_or((i + 1, String::new()));
        match line.strip_suffix('\\') {
            Some(head) => {
                buf.push_str(head);
                pending = Some((start, buf));
            }
            None => {
                buf.push_str(line);
                lines.push((start, buf));
            }
        }
    }
    if let Some(rest) = pending {
        lines.push(rest);
    }
    lines
}

/// pip treats `#` as a comment at line start or after whitespace.
fn strip_comment(line: &str) -> &str {
    if line.trim_start().starts_with('#') {
        return "";
    }
    let bytes = line.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'#' && i > 0 && bytes[i - 1].is_ascii_whitespace() {
            return &line[..i];
        }
    }
    line
}

const VCS_PREFIXES: &[&str] = &["git+", "hg+", "svn+", "bzr+"];
const ARCHIVE_SUFFIXES: &[&str] = &[".whl", ".tar.gz", ".tar.bz2", ".tgz", ".zip"];

fn parse_requirement(line: &str, line_no: usize) -> Result<Requirement, &'static str> {
    // Per-requirement options such as `--hash=sha256:…`.
    let line = match line.find(" --") {
        Some(i) => line[..i].trim_end(),
        None => line,
    };

    if is_location(line) {
        return Ok(parse_location(line, line_no));
    }

    let (spec, marker) = match line.split_once(';') {
        Some((spec, marker)) => {
            let marker = marker.trim();
            if marker.is_empty() {
                return Err("empty environment marker");
            }
            (spec.trim(), Some(marker.to_owned()))
        }
        None => (line.trim(), None),
    };

    let name_end = spec
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
        .unwrap_or(spec.len());
    let name = &spec[..name_end];
    validate_name(name)?;

    let mut rest = spec[name_end..].trim_start();

    let mut extras = Vec::new();
    if let Some(after) = rest.strip_prefix('[') {
        let close = after.find(']').ok_or("unterminated extras list")?;
        for extra in after[..close].split(',') {
            let extra = extra.trim();
            validate_name(extra).map_err(|_| "invalid extra name")?;
            extras.push(extra.to_owned());
        }
        rest = after[close + 1..].trim_start();
    }

    let constraint = if rest.is_empty() {
        None
    } else if let Some(url) = rest.strip_prefix('@') {
        if url.trim().is_empty() {
            return Err("direct reference without a URL");
        }
        Some(rest.to_owned())
    } else {
        let inner = rest
            .strip_prefix('(')
            .and_then(|r| r.strip_suffix(')'))
            .unwrap_or(rest);
        for clause in inner.split(',') {
            validate_specifier(clause.trim())?;
        }
        Some(inner.split_whitespace().collect::<String>())
    };

    Ok(Requirement {
        name: name.to_owned(),
        extras,
        constraint,
        location: None,
        marker,
        line: line_no,
    })
}

/// Lines pip installs from a URL, VCS checkout, archive, or directory.
fn is_location(line: &str) -> bool {
    let target = line.split_whitespace().next().unwrap_or(line);
    let has_scheme = target.split_once("://").is_some_and(|(scheme, _)| {
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    });
    let path = target.split('#').next().unwrap_or(target);

    has_scheme
        || VCS_PREFIXES.iter().any(|p| target.starts_with(p))
        || target.starts_with("file:")
        || target.starts_with('.')
        || target.starts_with('/')
        || ARCHIVE_SUFFIXES.iter().any(|s| path.ends_with(s))
}

/// The name comes from `#egg=` when present; otherwise the location itself
/// stands in for it. A marker must be separated by `; ` since URLs may
/// contain `;`.
fn parse_location(line: &str, line_no: usize) -> Requirement {
    let (target, marker) = match line.split_once("; ") {
        Some((target, marker)) if !marker.trim().is_empty() => {
            (target.trim(), Some(marker.trim().to_owned()))
        }
        _ => (line.trim(), None),
    };

    let name = target
        .split_once("#egg=")
        .map(|(_, egg)| egg.split('&').next().unwrap_or(egg))
        .filter(|egg| validate_name(egg).is_ok())
        .unwrap_or(target);

    Requirement {
        name: name.to_owned(),
        extras: Vec::new(),
        constraint: None,
        location: Some(target.to_owned()),
        marker,
        line: line_no,
    }
}

fn validate_name(name: &str) -> Result<(), &'static str> {
    let first = name.chars().next();
    let last = name.chars().last();
    match (first, last) {
        (Some(f), Some(l)) if f.is_ascii_alphanumeric() && l.is_ascii_alphanumeric() => Ok(()),
        (None, _) => Err("missing package name"),
        _ => Err("package name must start and end with a letter or digit"),
    }
}

fn validate_specifier(clause: &str) -> Result<(), &'static str> {
    let op = OPERATORS
        .iter()
        .find(|op| clause.starts_with(**op))
        .ok_or("unknown version operator")?;
    let version = clause[op.len()..].trim();
    if version.is_empty() {
        return Err("operator without a version");
    }
    if !version
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '*' | '+' | '!' | '_' | '-'))
    {
        return Err("version contains invalid characters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> crate::Result<DependencyManifest> {
        DependencyManifest::parse(Path::new("requirements.txt"), content)
    }

    #[test]
    fn parses_pinned_and_ranged_requirements() {
        let manifest = parse("requests==2.31.0\npytz>=2023.3, <2025\nredis\n").unwrap();
        let names: Vec<&str> = manifest
            .requirements
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["requests", "pytz", "redis"]);
        assert_eq!(
            manifest.requirements[0].constraint.as_deref(),
            Some("==2.31.0")
        );
        assert_eq!(
            manifest.requirements[1].constraint.as_deref(),
            Some(">=2023.3,<2025")
        );
        assert!(manifest.requirements[2].constraint.is_none());
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let manifest = parse("# pinned deps\n\nrequests==2.31.0  # http client\n").unwrap();
        assert_eq!(manifest.requirements.len(), 1);
        assert_eq!(manifest.requirements[0].line, 3);
    }

    #[test]
    fn keeps_option_lines() {
        let manifest = parse("--index-url https://pypi.org/simple\n-r base.txt\nnumpy\n").unwrap();
        assert_eq!(manifest.options.len(), 2);
        assert_eq!(manifest.requirements.len(), 1);
    }

    #[test]
    fn parses_extras_and_markers() {
        let manifest = parse("redis[hiredis]>=5.0 ; python_version >= \"3.8\"\n").unwrap();
        let req = &manifest.requirements[0];
        assert_eq!(req.extras, vec!["hiredis"]);
        assert_eq!(req.constraint.as_deref(), Some(">=5.0"));
        assert_eq!(req.marker.as_deref(), Some("python_version >= \"3.8\""));
    }

    #[test]
    fn parses_direct_reference() {
        let manifest = parse("mypkg @ https://example.com/mypkg-1.0.tar.gz\n").unwrap();
        assert_eq!(
            manifest.requirements[0].constraint.as_deref(),
            Some("@ https://example.com/mypkg-1.0.tar.gz")
        );
    }

    #[test]
    fn parses_vcs_reference_with_egg_name() {
        let manifest =
            parse("git+https://github.com/psf/requests.git@v2.31.0#egg=requests\n").unwrap();
        let req = &manifest.requirements[0];
        assert_eq!(req.name, "requests");
        assert_eq!(
            req.location.as_deref(),
            Some("git+https://github.com/psf/requests.git@v2.31.0#egg=requests")
        );
        assert!(req.constraint.is_none());
    }

    #[test]
    fn parses_bare_archive_urls() {
        let manifest = parse(
            "https://files.example.com/mypkg-1.0-py3-none-any.whl\n\
             https://files.example.com/other-2.0.tar.gz\n",
        )
        .unwrap();
        assert_eq!(manifest.requirements.len(), 2);
        assert!(manifest.requirements.iter().all(|r| r.location.is_some()));
    }

    #[test]
    fn parses_local_paths() {
        let manifest =
            parse("./vendor/mypkg\n/opt/wheels/fast-1.0.whl\nfile:///srv/pkgs/tool.zip\n").unwrap();
        let locations: Vec<&str> = manifest
            .requirements
            .iter()
            .filter_map(|r| r.location.as_deref())
            .collect();
        assert_eq!(
            locations,
            vec!["./vendor/mypkg", "/opt/wheels/fast-1.0.whl", "file:///srv/pkgs/tool.zip"]
        );
    }

    #[test]
    fn location_keeps_marker_and_drops_hash_option() {
        let manifest = parse(
            "./vendor/mypkg ; python_version >= \"3.8\" --hash=sha256:abcdef\n",
        )
        .unwrap();
        let req = &manifest.requirements[0];
        assert_eq!(req.location.as_deref(), Some("./vendor/mypkg"));
        assert_eq!(req.marker.as_deref(), Some("python_version >= \"3.8\""));
    }

    #[test]
    fn named_direct_reference_is_not_a_location() {
        let manifest = parse("mypkg @ git+https://example.com/mypkg.git\n").unwrap();
        let req = &manifest.requirements[0];
        assert_eq!(req.name, "mypkg");
        assert!(req.location.is_none());
    }

    #[test]
    fn joins_continuation_lines() {
        let manifest = parse("requests==2.31.0 \\\n    --hash=sha256:abcdef\npytz\n").unwrap();
        assert_eq!(manifest.requirements.len(), 2);
        assert_eq!(manifest.requirements[1].line, 3);
    }

    #[test]
    fn rejects_unknown_operator_with_line_number() {
        let err = parse("requests==2.31.0\npytz=>2023\n").unwrap_err();
        match err {
            Error::InvalidRequirement { line, reason, .. } => {
                assert_eq!(line, 2);
                assert_eq!(reason, "unknown version operator");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_operator_without_version() {
        assert!(parse("requests==\n").is_err());
    }

    #[test]
    fn rejects_invalid_names() {
        assert!(parse("-requests\n").is_ok()); // option line, not a name
        assert!(parse("_private==1.0\n").is_err());
        assert!(parse(">=1.0\n").is_err());
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = DependencyManifest::load(&tmp.path().join("requirements.txt")).unwrap_err();
        assert!(matches!(err, Error::RequirementsMissing { .. }));
    }
}
