use multiarch_build::DockerfileGenerator;
use multiarch_build::eject as eject_mod;
use multiarch_core::MultiarchConfig;
use std::path::Path;

/// Print the Dockerfile `multiarch publish` would stage.
pub async fn dockerfile() -> anyhow::Result<()> {
    let project_dir = Path::new(".");

    let content = if eject_mod::is_ejected(project_dir) {
        tracing::info!("using ejected Dockerfile");
        eject_mod::load_ejected_dockerfile(project_dir)?
    } else {
        let config = MultiarchConfig::load(project_dir)?;
        DockerfileGenerator::new(&config.image)?.render()
    };

    print!("{content}");
    Ok(())
}
