use multiarch_core::MultiarchConfig;
use multiarch_docker::DockerClient;
use std::path::Path;

pub async fn inspect(image: Option<String>) -> anyhow::Result<()> {
    let config = MultiarchConfig::load(Path::new("."))?;
    let image = config.publish.resolve_image(image.as_deref())?;

    let client = DockerClient::new();
    let manifest = client.inspect_manifest(&image.to_string()).await?;

    println!("{image}");
    if manifest.is_multi_arch() {
        for entry in &manifest.entries {
            println!("  {:<16}{}", entry.platform.to_string(), entry.digest);
        }
    } else {
        let media_type = manifest.media_type.as_deref().unwrap_or("unknown media type");
        println!("  single-platform image ({media_type})");
    }
    Ok(())
}
