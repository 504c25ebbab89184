use super::publish_pipeline::{self, PublishOptions};
use multiarch_docker::DockerClient;
use std::path::PathBuf;

/// Execute the full publish pipeline.
pub async fn publish(options: PublishOptions) -> anyhow::Result<()> {
    let project_dir = PathBuf::from(".");
    let client = DockerClient::new();

    println!("Publishing multi-arch image...");
    let outcome = publish_pipeline::run(&client, &project_dir, &options).await?;

    for step in &outcome.steps {
        println!("  - {step}");
    }

    println!();
    match &outcome.manifest {
        Some(manifest) => {
            println!("Published: {}", outcome.image);
            for entry in &manifest.entries {
                println!("  {}  {}", entry.platform, entry.digest);
            }
        }
        None => println!(
            "Built {} for {} (not pushed)",
            outcome.image, outcome.platforms
        ),
    }

    Ok(())
}
