//! pgpass broker - serves short-lived PostgreSQL credentials on a named pipe.
//!
//! Each time a local process opens the pipe for reading it receives one
//! `host:port:database:user:token` line carrying a fresh RDS IAM token, which
//! makes the pipe usable directly as a `PGPASSFILE`.

use anyhow::anyhow;
use clap::Parser;
use pgpass_core::{
    daemon, ensure_pipe, AwsConfig, BrokerConfig, BrokerError, ConnectionProfile, ExitCode,
    FifoRendezvous, Outcome, RdsIamTokenProvider, ShutdownSignals,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "pgpass-broker", version)]
#[command(about = "Serve short-lived PostgreSQL credentials over a named pipe")]
struct Args {
    /// Named pipe to serve credentials on (created if missing)
    pipe_path: PathBuf,
}

fn main() -> std::process::ExitCode {
    // Wrong argument count fails here, before anything is touched on disk.
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::Usage.into()
            } else {
                ExitCode::Ok.into()
            };
        }
    };

    if let Err(e) = init_logging() {
        eprintln!("Failed to set up logging: {:#}", e);
    }

    let code = match run(args) {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            error!("{}", e);
            e.exit_code()
        }
    };
    code.into()
}

fn init_logging() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env(BrokerConfig::LOG_FILTER_VAR)
        .unwrap_or_else(|_| EnvFilter::new(BrokerConfig::DEFAULT_LOG_FILTER));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .try_init()
        .map_err(|e| anyhow!(e))
}

fn run(args: Args) -> pgpass_core::Result<Outcome> {
    info!("Starting {}", BrokerConfig::APP_NAME);

    ensure_pipe(&args.pipe_path)?;

    let profile = ConnectionProfile::from_env()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let outcome = runtime.block_on(async move {
        let mut signals = ShutdownSignals::register()?;

        let provider = RdsIamTokenProvider::new(AwsConfig::load().await?);
        info!("Signing RDS IAM tokens for region {}", provider.region());

        let outcome = daemon::run(
            FifoRendezvous::new(args.pipe_path),
            Arc::new(provider),
            profile,
            async move { signals.recv().await },
        )
        .await;
        Ok::<_, BrokerError>(outcome)
    });

    // The connection loop may still be parked in a blocking open that no
    // reader will ever complete; don't wait for it.
    runtime.shutdown_background();
    outcome
}
