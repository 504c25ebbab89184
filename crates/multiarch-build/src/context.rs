use std::path::{Path, PathBuf};

use multiarch_core::{DependencyManifest, ImageConfig};

use crate::dockerfile::CONTEXT_REQUIREMENTS;

/// Directory, relative to the project, that holds the staged build context.
pub const CONTEXT_DIR: &str = ".multiarch-context";

/// A staged build context ready for `docker buildx build`.
#[derive(Debug)]
pub struct BuildContext {
    pub dir: PathBuf,
    /// Project-relative files copied into the context.
    pub files: Vec<String>,
    /// Present for the full variant only.
    pub dependencies: Option<DependencyManifest>,
}

/// Stages the build context under `.multiarch-context/`.
///
/// Everything is validated before the directory is touched: for the full
/// variant the dependency manifest must exist and parse, and every staged
/// file must exist. On failure no context is produced.
pub fn create_context(
    project_dir: &Path,
    config: &ImageConfig,
    dockerfile_content: &str,
) -> Result<BuildContext, ContextError> {
    config
        .validate()
        .map_err(|e| ContextError::Config { source: e })?;
    let files = config
        .staged_files()
        .map_err(|e| ContextError::Config { source: e })?;

    let dependencies = if config.installs_dependencies() {
        let manifest = DependencyManifest::load(&project_dir.join(&config.requirements))
            .map_err(|e| ContextError::Requirements { source: e })?;
        if manifest.is_empty() {
            tracing::warn!(path = %manifest.path.display(), "dependency manifest lists no packages");
        }
        Some(manifest)
    } else {
        None
    };

    if let Some(missing) = files.iter().find(|f| !project_dir.join(f).is_file()) {
        return Err(ContextError::MissingFile {
            path: project_dir.join(missing),
        });
    }

    let context_dir = project_dir.join(CONTEXT_DIR);

    // Clean previous context
    if context_dir.exists() {
        std::fs::remove_dir_all(&context_dir).map_err(|e| ContextError::Cleanup {
            path: context_dir.clone(),
            source: e,
        })?;
    }
    std::fs::create_dir_all(&context_dir).map_err(|e| ContextError::Create {
        path: context_dir.clone(),
        source: e,
    })?;

    if let Some(manifest) = &dependencies {
        copy_file(&manifest.path, &context_dir.join(CONTEXT_REQUIREMENTS))?;
    }

    for relative_path in &files {
        copy_file(&project_dir.join(relative_path), &context_dir.join(relative_path))?;
    }

    let dockerfile_path = context_dir.join("Dockerfile");
    std::fs::write(&dockerfile_path, dockerfile_content).map_err(|e| {
        ContextError::WriteDockerfile {
            path: dockerfile_path.clone(),
            source: e,
        }
    })?;

    tracing::debug!(
        dir = %context_dir.display(),
        files = files.len(),
        "staged build context"
    );

    Ok(BuildContext {
        dir: context_dir,
        files,
        dependencies,
    })
}

/// Removes a previously staged context. Returns whether anything was removed.
pub fn clean_context(project_dir: &Path) -> Result<bool, ContextError> {
    let context_dir = project_dir.join(CONTEXT_DIR);
    if !context_dir.exists() {
        return Ok(false);
    }
    std::fs::remove_dir_all(&context_dir).map_err(|e| ContextError::Cleanup {
        path: context_dir,
        source: e,
    })?;
    Ok(true)
}

fn copy_file(src: &Path, dst: &Path) -> Result<(), ContextError> {
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ContextError::Create {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    std::fs::copy(src, dst).map_err(|e| ContextError::CopyFile {
        path: src.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("invalid image configuration")]
    Config { source: multiarch_core::Error },
    #[error("dependency manifest rejected")]
    Requirements { source: multiarch_core::Error },
    #[error("staged file not found: {path}")]
    MissingFile { path: PathBuf },
    #[error("failed to clean up build context {path}")]
    Cleanup {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to create directory {path}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to copy file {path}")]
    CopyFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write Dockerfile at {path}")]
    WriteDockerfile {
        path: PathBuf,
        source: std::io::Error,
    },
}
