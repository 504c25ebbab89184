use multiarch_core::MultiarchConfig;
use multiarch_docker::{BuilderStatus, DockerClient};
use std::path::Path;

pub async fn builder_ensure() -> anyhow::Result<()> {
    let config = MultiarchConfig::load(Path::new("."))?;
    let platforms = config.publish.platform_set()?;
    let name = &config.publish.builder;

    let client = DockerClient::new();
    match client.ensure_builder(name, &platforms).await? {
        BuilderStatus::Existing => println!("Builder '{name}' already exists"),
        BuilderStatus::Created => println!("Created builder '{name}' for {platforms}"),
    }
    Ok(())
}

pub async fn builder_rm() -> anyhow::Result<()> {
    let config = MultiarchConfig::load(Path::new("."))?;
    let name = &config.publish.builder;

    let client = DockerClient::new();
    if client.remove_builder(name).await? {
        println!("Removed builder '{name}'");
    } else {
        println!("Builder '{name}' does not exist");
    }
    Ok(())
}
