use std::fmt;
use std::path::Path;

use multiarch_core::{ImageRef, Manifest, Platform, PlatformSet};
use secrecy::{ExposeSecret, SecretString};

use crate::docker::DockerError;
use crate::executor::{DockerExecutor, RealExecutor};

/// docker / buildx operations client, parameterized over the executor for testability.
pub struct DockerClient<E: DockerExecutor = RealExecutor> {
    executor: E,
}

impl DockerClient<RealExecutor> {
    pub fn new() -> Self {
        Self {
            executor: RealExecutor::from_env(),
        }
    }
}

impl Default for DockerClient<RealExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: DockerExecutor> DockerClient<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    // ── Preflight ──

    pub async fn check_prerequisites(&self) -> Result<PreflightReport, PreflightError> {
        let mut report = PreflightReport::default();

        // 1. docker CLI available
        match self
            .executor
            .exec(&args(["version", "--format", "{{.Client.Version}}"]))
            .await
        {
            Ok(version) => report.docker_version = Some(version.trim().to_owned()),
            Err(DockerError::NotFound { .. }) => return Err(PreflightError::DockerNotInstalled),
            // The client version is printed even when the daemon is down.
            Err(e) => tracing::debug!(error = %e, "docker version reported an error"),
        }

        // 2. Daemon reachable
        match self
            .executor
            .exec(&args(["info", "--format", "{{.ServerVersion}}"]))
            .await
        {
            Ok(version) => report.server_version = Some(version.trim().to_owned()),
            Err(e) => return Err(PreflightError::DaemonUnreachable { source: e }),
        }

        // 3. buildx plugin
        match self.executor.exec(&args(["buildx", "version"])).await {
            Ok(version) => report.buildx_version = Some(parse_buildx_version(&version)),
            Err(e) => return Err(PreflightError::BuildxUnavailable { source: e }),
        }

        Ok(report)
    }

    // ── Doctor ──

    /// Run all diagnostic checks without early return.
    /// Returns a report with pass/fail for each check item.
    pub async fn doctor(&self, builder: &str) -> DoctorReport {
        let mut report = DoctorReport::default();

        // 1. docker CLI
        match self
            .executor
            .exec(&args(["version", "--format", "{{.Client.Version}}"]))
            .await
        {
            Ok(v) => report.docker = CheckResult::ok(v.trim()),
            Err(DockerError::NotFound { .. }) => {
                report.docker = CheckResult::fail("docker CLI not installed");
                return report;
            }
            Err(_) => report.docker = CheckResult::ok("installed"),
        }

        // 2. Daemon
        match self
            .executor
            .exec(&args(["info", "--format", "{{.ServerVersion}}"]))
            .await
        {
            Ok(v) if !v.trim().is_empty() => report.daemon = CheckResult::ok(v.trim()),
            _ => report.daemon = CheckResult::fail("daemon not reachable"),
        }

        // 3. buildx
        match self.executor.exec(&args(["buildx", "version"])).await {
            Ok(v) => report.buildx = CheckResult::ok(&parse_buildx_version(&v)),
            Err(_) => {
                report.buildx = CheckResult::fail("buildx plugin not available");
                return report;
            }
        }

        // 4. Builder context
        match self.executor.exec(&args(["buildx", "inspect", builder])).await {
            Ok(out) => {
                let status = parse_builder_status(&out).unwrap_or("unknown");
                report.builder = CheckResult::ok(&format!("{builder} ({status})"));
            }
            Err(_) => {
                report.builder = CheckResult::fail(&format!(
                    "{builder} — not created (run: multiarch builder ensure)"
                ));
            }
        }

        report
    }

    // ── Builder context ──

    /// Ensure the named buildx builder exists, creating it if needed.
    ///
    /// Safe to call repeatedly. The builder is never made the global default;
    /// callers pass it explicitly with `--builder`.
    pub async fn ensure_builder(
        &self,
        name: &str,
        platforms: &PlatformSet,
    ) -> Result<BuilderStatus, BuilderError> {
        if self
            .builder_exists(name)
            .await
            .map_err(|e| BuilderError::Inspect { source: e })?
        {
            tracing::debug!(builder = name, "builder already exists");
            return Ok(BuilderStatus::Existing);
        }

        let platform_arg = platforms.to_buildx_arg();
        let created = self
            .executor
            .exec(&args([
                "buildx",
                "create",
                "--name",
                name,
                "--driver",
                "docker-container",
                "--platform",
                &platform_arg,
            ]))
            .await;

        match created {
            Ok(_) => {}
            // Another invocation created it between our inspect and create.
            Err(DockerError::CommandFailed { ref stderr, .. })
                if stderr.contains("existing instance") =>
            {
                tracing::info!(builder = name, "builder created concurrently, reusing");
                return Ok(BuilderStatus::Existing);
            }
            Err(e) => return Err(BuilderError::Create { source: e }),
        }

        self.executor
            .exec(&args(["buildx", "inspect", "--bootstrap", name]))
            .await
            .map_err(|e| BuilderError::Bootstrap { source: e })?;

        tracing::info!(builder = name, platforms = %platform_arg, "created builder");
        Ok(BuilderStatus::Created)
    }

    /// Remove the named builder. Returns `false` if it did not exist.
    pub async fn remove_builder(&self, name: &str) -> Result<bool, BuilderError> {
        if !self
            .builder_exists(name)
            .await
            .map_err(|e| BuilderError::Inspect { source: e })?
        {
            return Ok(false);
        }

        self.executor
            .exec(&args(["buildx", "rm", name]))
            .await
            .map_err(|e| BuilderError::Remove { source: e })?;

        Ok(true)
    }

    /// Only buildx's own "no builder … found" answer means absent; any other
    /// failure (daemon down, missing plugin) is returned as is.
    async fn builder_exists(&self, name: &str) -> Result<bool, DockerError> {
        match self.executor.exec(&args(["buildx", "inspect", name])).await {
            Ok(_) => Ok(true),
            Err(DockerError::CommandFailed { ref stderr, .. }) if is_missing_builder(stderr) => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    // ── Registry ──

    /// Authenticate against a registry (`None` = Docker Hub).
    ///
    /// Without credentials the login is interactive on the current terminal.
    pub async fn login(
        &self,
        server: Option<&str>,
        credentials: Option<&Credentials>,
    ) -> Result<(), LoginError> {
        let mut cmd = vec!["login".to_owned()];

        match credentials {
            Some(creds) => {
                cmd.extend([
                    "--username".to_owned(),
                    creds.username.clone(),
                    "--password-stdin".to_owned(),
                ]);
                cmd.extend(server.map(str::to_owned));
                self.executor
                    .exec_with_stdin(&cmd, creds.password.expose_secret().as_bytes())
                    .await
                    .map_err(|e| LoginError::Failed { source: e })?;
            }
            None => {
                cmd.extend(server.map(str::to_owned));
                self.executor
                    .exec_streaming(&cmd)
                    .await
                    .map_err(|e| LoginError::Failed { source: e })?;
            }
        }

        Ok(())
    }

    // ── Build ──

    /// Build the context for every target platform, optionally pushing the
    /// result as a single multi-arch manifest.
    pub async fn build_and_push(&self, request: &BuildRequest<'_>) -> Result<(), BuildError> {
        let context_str = request
            .context_dir
            .to_str()
            .ok_or_else(|| BuildError::InvalidPath(request.context_dir.to_path_buf()))?;

        let image = request.image.to_string();
        let platforms = request.platforms.to_buildx_arg();

        let mut cmd = args([
            "buildx",
            "build",
            "--builder",
            request.builder,
            "--platform",
            &platforms,
            "--tag",
            &image,
        ]);
        if request.push {
            cmd.push("--push".to_owned());
        }
        cmd.push(context_str.to_owned());

        self.executor
            .exec_streaming(&cmd)
            .await
            .map_err(|e| BuildError::Build { source: e })
    }

    // ── Manifest ──

    /// Fetch the raw registry manifest for a reference.
    pub async fn inspect_manifest(&self, reference: &str) -> Result<Manifest, InspectError> {
        let raw = self
            .executor
            .exec(&args(["buildx", "imagetools", "inspect", "--raw", reference]))
            .await
            .map_err(|e| InspectError::Fetch {
                reference: reference.to_owned(),
                source: e,
            })?;

        Manifest::from_json(&raw).map_err(|e| InspectError::Parse {
            reference: reference.to_owned(),
            source: e,
        })
    }

    /// Platforms offered by a base image, or `None` for a single-platform image.
    pub async fn base_image_platforms(
        &self,
        base_image: &str,
    ) -> Result<Option<Vec<Platform>>, InspectError> {
        let manifest = self.inspect_manifest(base_image).await?;
        Ok(manifest.is_multi_arch().then(|| manifest.platforms()))
    }

    /// Check that the published manifest lists every target platform.
    pub async fn verify_manifest(
        &self,
        image: &ImageRef,
        platforms: &PlatformSet,
    ) -> Result<Manifest, VerifyError> {
        let reference = image.to_string();
        let manifest = self
            .inspect_manifest(&reference)
            .await
            .map_err(|e| VerifyError::Inspect { source: e })?;

        let missing: Vec<String> = manifest
            .missing(platforms)
            .into_iter()
            .map(ToString::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(VerifyError::MissingPlatforms {
                image: reference,
                missing,
            });
        }

        Ok(manifest)
    }
}

// ── Helper ──

fn args<const N: usize>(a: [&str; N]) -> Vec<String> {
    a.iter().map(|s| (*s).to_owned()).collect()
}

/// `github.com/docker/buildx v0.14.1 59582…` → `v0.14.1`
fn parse_buildx_version(output: &str) -> String {
    let line = output.lines().next().unwrap_or("").trim();
    line.split_whitespace()
        .nth(1)
        .unwrap_or(line)
        .to_owned()
}

/// `ERROR: no builder "multiarch" found`
fn is_missing_builder(stderr: &str) -> bool {
    stderr
        .lines()
        .any(|line| line.contains("no builder") && line.contains("found"))
}

/// Extracts the first `Status:` value from `docker buildx inspect` output.
fn parse_builder_status(output: &str) -> Option<&str> {
    output
        .lines()
        .find_map(|line| line.trim().strip_prefix("Status:"))
        .map(str::trim)
}

// ── Request / report types ──

/// Parameters for a multi-platform build.
#[derive(Debug)]
pub struct BuildRequest<'a> {
    pub builder: &'a str,
    pub context_dir: &'a Path,
    pub image: &'a ImageRef,
    pub platforms: &'a PlatformSet,
    /// Push the manifest list; otherwise the result stays in the builder cache.
    pub push: bool,
}

/// Registry credentials for non-interactive login.
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderStatus {
    Existing,
    Created,
}

#[derive(Debug, Default)]
pub struct PreflightReport {
    pub docker_version: Option<String>,
    pub server_version: Option<String>,
    pub buildx_version: Option<String>,
}

// ── Doctor types ──

#[derive(Debug, Default)]
pub struct DoctorReport {
    pub docker: CheckResult,
    pub daemon: CheckResult,
    pub buildx: CheckResult,
    pub builder: CheckResult,
    pub config_file: CheckResult,
}

impl DoctorReport {
    pub fn all_passed(&self) -> bool {
        self.docker.passed
            && self.daemon.passed
            && self.buildx.passed
            && self.builder.passed
            && self.config_file.passed
    }
}

impl fmt::Display for DoctorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "multiarch doctor")?;
        writeln!(f, "{}", "─".repeat(40))?;
        let rows = [
            ("docker CLI", &self.docker),
            ("docker daemon", &self.daemon),
            ("buildx", &self.buildx),
            ("builder", &self.builder),
            ("multiarch.toml", &self.config_file),
        ];
        for (label, check) in rows {
            writeln!(f, "{label:<16}{:<4}{}", check.icon(), check.detail)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct CheckResult {
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    pub fn ok(detail: &str) -> Self {
        Self {
            passed: true,
            detail: detail.to_owned(),
        }
    }

    pub fn fail(detail: &str) -> Self {
        Self {
            passed: false,
            detail: detail.to_owned(),
        }
    }

    pub fn icon(&self) -> &'static str {
        if self.passed { "OK" } else { "NG" }
    }
}

// ── Error types ──

#[derive(Debug, thiserror::Error)]
pub enum PreflightError {
    #[error("docker CLI not installed — https://docs.docker.com/get-docker/")]
    DockerNotInstalled,

    #[error("docker daemon not reachable — is it running?")]
    DaemonUnreachable { source: DockerError },

    #[error("docker buildx not available — install the buildx plugin")]
    BuildxUnavailable { source: DockerError },
}

#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
    #[error("failed to inspect buildx builder")]
    Inspect { source: DockerError },

    #[error("failed to create buildx builder")]
    Create { source: DockerError },

    #[error("failed to bootstrap buildx builder")]
    Bootstrap { source: DockerError },

    #[error("failed to remove buildx builder")]
    Remove { source: DockerError },
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("registry login failed")]
    Failed { source: DockerError },
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("build context path is not valid UTF-8: {0}")]
    InvalidPath(std::path::PathBuf),

    #[error("multi-platform build failed")]
    Build { source: DockerError },
}

#[derive(Debug, thiserror::Error)]
pub enum InspectError {
    #[error("failed to inspect manifest for {reference}")]
    Fetch {
        reference: String,
        source: DockerError,
    },

    #[error("unexpected manifest format for {reference}")]
    Parse {
        reference: String,
        source: multiarch_core::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("could not verify published manifest")]
    Inspect { source: InspectError },

    #[error("manifest for {image} is missing platform(s): {}", missing.join(", "))]
    MissingPlatforms { image: String, missing: Vec<String> },
}
