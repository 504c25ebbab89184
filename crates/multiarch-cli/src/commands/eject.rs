use multiarch_build::DockerfileGenerator;
use multiarch_core::MultiarchConfig;
use std::path::PathBuf;

pub async fn eject() -> anyhow::Result<()> {
    let project_dir = PathBuf::from(".");
    let config = MultiarchConfig::load(&project_dir)?;

    let generator = DockerfileGenerator::new(&config.image)?;
    let dockerfile = generator.render();

    let path = multiarch_build::eject::eject(&project_dir, &dockerfile)?;

    println!("Ejected Dockerfile to {}", path.display());
    println!("You can now edit it directly. multiarch publish will use this file.");
    Ok(())
}
