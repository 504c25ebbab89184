use multiarch_core::config::CONFIG_FILE;
use multiarch_core::MultiarchConfig;
use multiarch_docker::{CheckResult, DockerClient};
use std::path::Path;

pub async fn doctor() -> anyhow::Result<()> {
    let project_dir = Path::new(".");
    let config = MultiarchConfig::load(project_dir);

    let client = DockerClient::new();
    let builder = config
        .as_ref()
        // arch-lint: allow(no-silent-result-drop) reason="doctor must report diagnostics even when multiarch.toml is invalid"
        .ok()
        .map_or_else(
            || MultiarchConfig::default().publish.builder,
            |c| c.publish.builder.clone(),
        );
    let mut report = client.doctor(&builder).await;

    report.config_file = match &config {
        Ok(_) if project_dir.join(CONFIG_FILE).exists() => CheckResult::ok("Found"),
        Ok(_) => CheckResult::ok("Not found (using defaults)"),
        Err(e) => CheckResult::fail(&format!("Invalid: {e}")),
    };

    println!();
    println!("{report}");

    if !report.all_passed() {
        anyhow::bail!("some checks failed — see above for details");
    }

    Ok(())
}
