//! Handing the image definition over to the operator.
//!
//! Once `.multiarch/Dockerfile` exists, publish stages it verbatim and the
//! `[image]` rendering settings no longer apply to it. Staged files and the
//! dependency manifest are still copied into the context from the config.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Directory holding operator-owned build files.
pub const EJECT_DIR: &str = ".multiarch";

const EJECTED_HEADER: &str =
    "# Ejected by `multiarch eject`. `multiarch publish` stages this file as is.\n";

fn ejected_dockerfile_path(project_dir: &Path) -> PathBuf {
    project_dir.join(EJECT_DIR).join("Dockerfile")
}

/// Writes the rendered Dockerfile to `.multiarch/Dockerfile`.
///
/// An existing file is never replaced, even if two ejects race.
pub fn eject(project_dir: &Path, dockerfile_content: &str) -> Result<PathBuf, EjectError> {
    let eject_dir = project_dir.join(EJECT_DIR);
    std::fs::create_dir_all(&eject_dir).map_err(|e| EjectError::CreateDir {
        path: eject_dir,
        source: e,
    })?;

    let path = ejected_dockerfile_path(project_dir);
    let mut file = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
    {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(EjectError::AlreadyEjected(path));
        }
        Err(e) => return Err(EjectError::Write { path, source: e }),
    };

    file.write_all(EJECTED_HEADER.as_bytes())
        .and_then(|()| file.write_all(dockerfile_content.as_bytes()))
        .map_err(|e| EjectError::Write {
            path: path.clone(),
            source: e,
        })?;

    tracing::info!(path = %path.display(), "ejected Dockerfile");
    Ok(path)
}

pub fn is_ejected(project_dir: &Path) -> bool {
    ejected_dockerfile_path(project_dir).is_file()
}

/// Reads the ejected Dockerfile, rejecting one without a `FROM` instruction
/// so a broken edit fails before any docker command runs.
pub fn load_ejected_dockerfile(project_dir: &Path) -> Result<String, EjectError> {
    let path = ejected_dockerfile_path(project_dir);
    let content = std::fs::read_to_string(&path).map_err(|e| EjectError::Read {
        path: path.clone(),
        source: e,
    })?;

    let has_from = content.lines().map(str::trim_start).any(|line| {
        line.get(..5)
            .is_some_and(|keyword| keyword.eq_ignore_ascii_case("FROM "))
    });
    if !has_from {
        return Err(EjectError::MissingFrom(path));
    }
    Ok(content)
}

#[derive(Debug, thiserror::Error)]
pub enum EjectError {
    #[error("failed to create .multiarch directory at {path}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Dockerfile already ejected at {0} — edit it, or delete it to eject again")]
    AlreadyEjected(PathBuf),
    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read ejected Dockerfile at {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("ejected Dockerfile at {0} has no FROM instruction")]
    MissingFrom(PathBuf),
}
