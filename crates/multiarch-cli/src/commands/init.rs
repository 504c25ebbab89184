use multiarch_core::config::CONFIG_FILE;
use std::path::Path;

/// Initialize multiarch in an existing project directory.
pub async fn init_project() -> anyhow::Result<()> {
    let mut created = Vec::new();

    // multiarch.toml
    let config_path = Path::new(CONFIG_FILE);
    if config_path.exists() {
        eprintln!("{CONFIG_FILE} already exists, skipping");
    } else {
        let config_toml = r#"[image]
# base_image = "python:3.11-slim"
# variant = "full"            # "full" installs requirements.txt, "slim" copies the entrypoint only
# requirements = "requirements.txt"
# files = ["app.py", "current_time.py", "whatsmyip.py"]
# entrypoint = "app.py"
# interpreter = "python"
# workdir = "/app"

# [image.env]
# OPENBLAS_CORETYPE = "ARMV8"

[publish]
# image = "docker.io/your-user/your-app:latest"   # IMG / --image take precedence
# platforms = ["linux/amd64", "linux/arm64"]
# builder = "multiarch"
# login = true
"#;
        std::fs::write(config_path, config_toml)?;
        created.push(CONFIG_FILE);
    }

    // .env.example
    let env_example_path = Path::new(".env.example");
    if env_example_path.exists() {
        eprintln!(".env.example already exists, skipping");
    } else {
        let env_example = r#"IMG=docker.io/your-user/your-app:latest
# Non-interactive registry login (CI)
# REGISTRY_USERNAME=your-user
# REGISTRY_PASSWORD=your-token
"#;
        std::fs::write(env_example_path, env_example)?;
        created.push(".env.example");
    }

    if created.is_empty() {
        println!("Nothing to create — already initialized.");
    } else {
        for f in &created {
            println!("Created {f}");
        }
    }

    println!();
    println!("Next steps:");
    println!();
    println!("  1. Set the target image:");
    println!("     cp .env.example .env   # then edit IMG");
    println!();
    println!("  2. Check your docker / buildx setup:");
    println!("     multiarch doctor");
    println!();
    println!("  3. Publish for every platform:");
    println!("     multiarch publish");

    Ok(())
}
