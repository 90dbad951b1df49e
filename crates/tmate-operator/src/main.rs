// ABOUTME: tmate-operator CLI entry point.
// ABOUTME: Dispatches install, update-status, consumer-joined, and the get-server-config action.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tmate_operator::keys::fingerprints;
use tmate_operator::state::{HTTPS_PROXY_ENV, HTTP_PROXY_ENV, NO_PROXY_ENV};
use tmate_operator::{
    Host, HookOutcome, LocalUnitModel, Operator, ProvisioningState, ProxyInputs, Settings,
};
use tmate_ssh::Readiness;

/// Exit code for a hook that should be retried later (EX_TEMPFAIL).
const EXIT_DEFERRED: u8 = 75;

#[derive(Parser)]
#[command(name = "tmate-operator")]
#[command(about = "Provision and supervise a tmate-ssh-server relay")]
struct Cli {
    /// Path to settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Address the relay binds to and advertises (IP or hostname)
    #[arg(long, global = true, env = "TMATE_BIND_ADDRESS")]
    bind_address: Option<String>,

    /// HTTP proxy for the container runtime
    #[arg(long, global = true, env = HTTP_PROXY_ENV)]
    http_proxy: Option<String>,

    /// HTTPS proxy for the container runtime
    #[arg(long, global = true, env = HTTPS_PROXY_ENV)]
    https_proxy: Option<String>,

    /// Hosts that bypass the proxy
    #[arg(long, global = true, env = NO_PROXY_ENV)]
    no_proxy: Option<String>,

    /// Log to a file under the state directory instead of stderr
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install dependencies, generate keys, and start the daemon
    Install,
    /// Restart the daemon if it has stopped and refresh consumers
    UpdateStatus,
    /// Publish connection details to consumers
    ConsumerJoined {
        /// Register this consumer before publishing
        #[arg(long)]
        relation: Option<String>,
    },
    /// Print the client .tmate.conf block
    GetServerConfig,
    /// Print the host key fingerprints
    Fingerprints,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (ignore errors if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if cli.log_file {
        tmate_log::init_file("tmate-operator");
    } else {
        tmate_log::init();
    }

    match run(cli).await {
        Ok(HookOutcome::Completed) => ExitCode::SUCCESS,
        Ok(HookOutcome::Deferred(reason)) => {
            eprintln!("deferred: {reason}");
            ExitCode::from(EXIT_DEFERRED)
        }
        Err(e) => {
            tracing::error!(error = %e, "Hook failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<HookOutcome> {
    let settings_path = cli.config.unwrap_or_else(Settings::default_path);
    let settings = Settings::load_or_default(&settings_path)?;

    let proxy = ProxyInputs {
        http_proxy: cli.http_proxy,
        https_proxy: cli.https_proxy,
        no_proxy: cli.no_proxy,
    };
    let state = ProvisioningState::from_inputs(cli.bind_address.as_deref(), &proxy)
        .context("Invalid provisioning inputs")?;

    let model = Arc::new(LocalUnitModel::new(settings.state_dir.clone()));
    let operator = Operator::new(settings, Host::system(), model.clone());

    match cli.command {
        Commands::Install => Ok(operator.install(&state).await?),
        Commands::UpdateStatus => Ok(operator.update_status(&state).await?),
        Commands::ConsumerJoined { relation } => {
            if let Some(id) = relation {
                model.join_relation(&id).await?;
            }
            Ok(operator.consumer_joined(&state).await?)
        }
        Commands::GetServerConfig => {
            let result = operator
                .get_server_config(&state)
                .map_err(|failure| anyhow::anyhow!(failure))?;
            for config in result.values() {
                print!("{config}");
            }
            Ok(HookOutcome::Completed)
        }
        Commands::Fingerprints => match fingerprints(operator.settings())? {
            Readiness::Ready(fingerprints) => {
                println!("rsa: {}", fingerprints.rsa);
                println!("ed25519: {}", fingerprints.ed25519);
                Ok(HookOutcome::Completed)
            }
            Readiness::NotReady(missing) => Ok(HookOutcome::Deferred(missing.to_string())),
        },
    }
}
