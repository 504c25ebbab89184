mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "multiarch",
    about = "Build and publish multi-architecture container images"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter multiarch.toml
    Init,
    /// Print the generated Dockerfile
    Dockerfile,
    /// Eject Dockerfile for manual customization
    Eject,
    /// Build for every target platform and push one multi-arch manifest
    Publish {
        /// Target image reference (registry/repository:tag)
        #[arg(long, env = "IMG")]
        image: Option<String>,
        /// Target platform; repeat or comma-separate (default: from multiarch.toml)
        #[arg(long = "platform", value_delimiter = ',')]
        platforms: Vec<String>,
        /// Skip `docker login` (already authenticated)
        #[arg(long)]
        skip_login: bool,
        /// Build all platforms without pushing or verifying
        #[arg(long)]
        no_push: bool,
        /// Do not check that the base image offers every target platform
        #[arg(long)]
        skip_base_check: bool,
        /// Registry user for non-interactive login
        #[arg(long, env = "REGISTRY_USERNAME")]
        username: Option<String>,
        /// Registry password; read from the environment only
        #[arg(long, env = "REGISTRY_PASSWORD", hide = true, hide_env_values = true)]
        password: Option<String>,
    },
    /// Show the platforms listed in a published manifest
    Inspect {
        /// Image reference to inspect
        #[arg(long, env = "IMG")]
        image: Option<String>,
    },
    /// Manage the buildx builder context
    Builder {
        #[command(subcommand)]
        action: BuilderAction,
    },
    /// Check docker / buildx setup and readiness
    Doctor,
    /// Remove the staged build context
    Clean,
}

#[derive(Subcommand)]
enum BuilderAction {
    /// Create the builder if it does not exist
    Ensure,
    /// Remove the builder
    Rm,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Loaded before parsing so `.env` can provide IMG.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!(error = %e, "ignoring unreadable .env file");
        }
    }

    let cli = Cli::parse();

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(commands::exit_code(&err))
        }
    }
}

async fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Init => commands::init_project().await?,
        Commands::Dockerfile => commands::dockerfile().await?,
        Commands::Eject => commands::eject().await?,
        Commands::Publish {
            image,
            platforms,
            skip_login,
            no_push,
            skip_base_check,
            username,
            password,
        } => {
            let options = commands::PublishOptions {
                image,
                platforms,
                skip_login,
                push: !no_push,
                check_base: !skip_base_check,
                credentials: commands::credentials(username, password)?,
            };
            commands::publish(options).await?
        }
        Commands::Inspect { image } => commands::inspect(image).await?,
        Commands::Builder { action } => match action {
            BuilderAction::Ensure => commands::builder_ensure().await?,
            BuilderAction::Rm => commands::builder_rm().await?,
        },
        Commands::Doctor => commands::doctor().await?,
        Commands::Clean => commands::clean().await?,
    }

    Ok(())
}
