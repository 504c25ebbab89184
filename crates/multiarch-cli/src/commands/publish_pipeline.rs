use anyhow::Context;
use multiarch_build::DockerfileGenerator;
use multiarch_build::context;
use multiarch_build::eject as eject_mod;
use multiarch_core::{ImageRef, Manifest, MultiarchConfig, PlatformSet};
use multiarch_docker::{
    BuildRequest, BuilderStatus, Credentials, DockerClient, DockerExecutor, InspectError,
};
use std::fmt;
use std::path::Path;

/// Flags and environment overrides for one publish run.
#[derive(Debug, Default)]
pub struct PublishOptions {
    /// Overrides `[publish].image`.
    pub image: Option<String>,
    /// Overrides `[publish].platforms` when non-empty.
    pub platforms: Vec<String>,
    pub skip_login: bool,
    pub push: bool,
    pub check_base: bool,
    pub credentials: Option<Credentials>,
}

/// Pipeline steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Configure,
    Stage,
    Preflight,
    CheckBase,
    EnsureBuilder,
    Login,
    BuildPush,
    Verify,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Configure => "configure",
            Self::Stage => "stage build context",
            Self::Preflight => "pre-flight checks",
            Self::CheckBase => "base image check",
            Self::EnsureBuilder => "ensure builder",
            Self::Login => "registry login",
            Self::BuildPush => "build + push",
            Self::Verify => "verify manifest",
        };
        f.write_str(label)
    }
}

/// Result of a successful publish pipeline run.
pub(crate) struct PublishOutcome {
    pub steps: Vec<String>,
    pub image: ImageRef,
    pub platforms: PlatformSet,
    /// The verified manifest; `None` when nothing was pushed.
    pub manifest: Option<Manifest>,
}

/// Run the publish pipeline: configure → stage → preflight → base check →
/// builder → login → build + push → verify.
///
/// Stops at the first failing step. The error names the step and keeps the
/// underlying docker error in its chain.
pub(crate) async fn run<E: DockerExecutor>(
    client: &DockerClient<E>,
    project_dir: &Path,
    options: &PublishOptions,
) -> anyhow::Result<PublishOutcome> {
    let mut steps = Vec::new();

    // Configure
    let (config, image, platforms) = configure(project_dir, options)
        .with_context(|| format!("{} failed", Step::Configure))?;
    steps.push(format!("Target {image} for {platforms}"));

    // Stage
    let dockerfile_content = if eject_mod::is_ejected(project_dir) {
        steps.push("Using ejected Dockerfile".to_string());
        eject_mod::load_ejected_dockerfile(project_dir)
            .with_context(|| format!("{} failed", Step::Stage))?
    } else {
        DockerfileGenerator::new(&config.image)
            .with_context(|| format!("{} failed", Step::Stage))?
            .render()
    };
    let staged = context::create_context(project_dir, &config.image, &dockerfile_content)
        .with_context(|| format!("{} failed", Step::Stage))?;
    steps.push(format!("Staged {} file(s)", staged.files.len()));

    // Pre-flight checks
    let report = client
        .check_prerequisites()
        .await
        .with_context(|| format!("{} failed", Step::Preflight))?;
    tracing::debug!(?report, "pre-flight passed");
    steps.push("Pre-flight checks passed".to_string());

    // Base image platforms
    if options.check_base {
        let base = &config.image.base_image;
        match client.base_image_platforms(base).await {
            Ok(Some(available)) => {
                let missing: Vec<String> = platforms
                    .unsatisfied_by(&available)
                    .into_iter()
                    .map(ToString::to_string)
                    .collect();
                if !missing.is_empty() {
                    anyhow::bail!(
                        "{} failed: base image {base} does not offer {}",
                        Step::CheckBase,
                        missing.join(", ")
                    );
                }
                steps.push(format!("Base image {base} supports all platforms"));
            }
            Ok(None) => {
                tracing::warn!(base = %base, "base image is single-platform, skipping platform check");
                steps.push(format!("Skipped base check ({base} is single-platform)"));
            }
            // Private bases may only be readable with the build's credentials.
            Err(InspectError::Fetch { source, .. }) => {
                tracing::warn!(base = %base, error = %source, "cannot read base image manifest, skipping platform check");
                steps.push(format!("Skipped base check ({base} not readable)"));
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!("{} failed", Step::CheckBase)));
            }
        }
    }

    // Builder context
    let builder = &config.publish.builder;
    let status = client
        .ensure_builder(builder, &platforms)
        .await
        .with_context(|| format!("{} failed", Step::EnsureBuilder))?;
    steps.push(match status {
        BuilderStatus::Existing => format!("Using builder '{builder}'"),
        BuilderStatus::Created => format!("Created builder '{builder}'"),
    });

    // Registry login
    if options.push && config.publish.login && !options.skip_login {
        client
            .login(image.login_server(), options.credentials.as_ref())
            .await
            .with_context(|| format!("{} failed", Step::Login))?;
        steps.push(format!(
            "Logged in to {}",
            image.login_server().unwrap_or("Docker Hub")
        ));
    }

    // Build + push
    client
        .build_and_push(&BuildRequest {
            builder,
            context_dir: &staged.dir,
            image: &image,
            platforms: &platforms,
            push: options.push,
        })
        .await
        .with_context(|| format!("{} failed", Step::BuildPush))?;

    if !options.push {
        steps.push(format!("Built {} platform(s), not pushed", platforms.len()));
        return Ok(PublishOutcome {
            steps,
            image,
            platforms,
            manifest: None,
        });
    }
    steps.push(format!("Pushed {image}"));

    // Verify
    let manifest = client
        .verify_manifest(&image, &platforms)
        .await
        .with_context(|| format!("{} failed", Step::Verify))?;
    steps.push(format!(
        "Manifest lists {} platform(s)",
        manifest.entries.len()
    ));

    Ok(PublishOutcome {
        steps,
        image,
        platforms,
        manifest: Some(manifest),
    })
}

fn configure(
    project_dir: &Path,
    options: &PublishOptions,
) -> multiarch_core::Result<(MultiarchConfig, ImageRef, PlatformSet)> {
    let config = MultiarchConfig::load(project_dir)?;
    let image = config.publish.resolve_push_target(options.image.as_deref())?;
    let platforms = if options.platforms.is_empty() {
        config.publish.platform_set()?
    } else {
        PlatformSet::parse(&options.platforms)?
    };
    Ok((config, image, platforms))
}
