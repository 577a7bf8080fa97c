use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use exportwatch::Settings;

#[derive(Parser)]
#[command(name = "exportwatch")]
#[command(about = "Change tracking for export profiles")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration file
    Init {
        /// Project directory (defaults to the current directory)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().unwrap_or_else(|e| {
        eprintln!("Warning: failed to load configuration: {e}");
        Settings::default()
    });
    exportwatch::logging::init_with_config(&settings.logging);

    match cli.command {
        Commands::Init { path, force } => {
            let base = match path {
                Some(path) => path,
                None => std::env::current_dir().context("cannot resolve current directory")?,
            };
            let config_path = Settings::init_config_file(&base, force)
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            println!("Created configuration at: {}", config_path.display());
        }

        Commands::Config => {
            let rendered =
                toml::to_string_pretty(&settings).context("cannot serialize settings")?;
            println!("{rendered}");
        }
    }

    Ok(())
}
