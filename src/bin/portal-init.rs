//! Portal schema initializer
//!
//! Connects to the configured primary target (no fallback) and creates the
//! tables/collections and indexes the schema declares. Safe to re-run.
//!
//! Usage:
//!   portal-init --config config/portal.toml --env-file .env
//!
//! Exit codes: 0 success (or mock mode, with a warning), 1 configuration
//! error, 2 connection error, 3 provision error.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use portal_store::config::{ConfigLayers, ConfigurationLoader, EnvironmentLoader};
use portal_store::observability::Logger;
use portal_store::provision::{provision_primary, InitError};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "portal-init")]
#[command(about = "Provision the portal's database schema")]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "config/portal.toml")]
    config: PathBuf,

    /// Load environment variables from this file first
    #[arg(short, long)]
    env_file: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn load(args: &Args) -> Result<(ConfigLayers, ConfigurationLoader, EnvironmentLoader)> {
    let env = EnvironmentLoader::new(args.env_file.as_deref());
    let loader = ConfigurationLoader::new(Some(args.config.as_path()))?;
    let layers = ConfigLayers::from_environment(&env, loader.config.clone());
    Ok((layers, loader, env))
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let (layers, loader, env) = match load(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            // No logger yet; the level is part of the config that failed.
            eprintln!("portal-init: {:#}", e);
            return ExitCode::from(1);
        }
    };

    let level = if args.verbose {
        "debug".to_string()
    } else {
        env.log_level()
            .unwrap_or_else(|| loader.log_level().to_string())
    };
    match Logger::new(None, Some(&level)) {
        Ok(logger) => {
            if let Err(e) = logger.install() {
                eprintln!("portal-init: {:#}", e);
            }
        }
        Err(e) => eprintln!("portal-init: {:#}", e),
    }

    let descriptor = match portal_store::config::resolve(&layers) {
        Ok(descriptor) => descriptor,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(InitError::from(e).exit_code());
        }
    };

    info!(mode = %descriptor.mode(), "provisioning primary target");
    match provision_primary(&descriptor, &loader.schema()).await {
        Ok(report) if report.skipped => ExitCode::SUCCESS,
        Ok(report) => {
            info!(
                collections = ?report.collections_created,
                indexes = ?report.indexes_created,
                "schema is up to date"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
