use anyhow::Result;
use clap::Parser;
use imds_credential_agent::manager::CredentialManager;
use imds_credential_agent::server;
use imds_credential_agent::utils::config_loader;
use imds_credential_agent::utils::logging;
use imds_credential_agent::utils::logging::LogLevel;
use tracing::{error, info};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "imds-credential-agent.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level).await?;

    // -------------------------------
    // 2. Fetch first credentials, arm refresh timer
    // -------------------------------

    let manager = CredentialManager::from_settings(&service_config.settings).await?;

    // -------------------------------
    // 3. Serve status / health / metrics until Ctrl-C
    // -------------------------------

    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown signal received"),
            Err(err) => error!(error = %err, "unable to listen for shutdown signal, shutting down"),
        }
    };
    let served = server::server::start(&service_config.settings, manager.handle(), shutdown).await;

    // -------------------------------
    // 4. Release refresh timer
    // -------------------------------

    manager.stop().await;
    served
}
