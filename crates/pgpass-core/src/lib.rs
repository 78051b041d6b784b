//! pgpass core - named-pipe broker for short-lived PostgreSQL credentials.
//!
//! A single FIFO is created with owner-only permissions. Every time a local
//! process opens it for reading, the broker writes one pgpass-style line
//! (`host:port:database:user:token`) carrying a freshly generated token and
//! closes the pipe.
//!
//! # Example
//!
//! ```rust,ignore
//! use pgpass_core::{daemon, platform, AwsConfig, ConnectionProfile, FifoRendezvous};
//! use pgpass_core::{RdsIamTokenProvider, ShutdownSignals};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> pgpass_core::Result<()> {
//!     let path = std::path::Path::new("/run/user/1000/pgpass");
//!     platform::ensure_pipe(path)?;
//!
//!     let provider = Arc::new(RdsIamTokenProvider::new(AwsConfig::load().await?));
//!     let mut signals = ShutdownSignals::register()?;
//!
//!     let outcome = daemon::run(
//!         FifoRendezvous::new(path),
//!         provider,
//!         ConnectionProfile::from_env()?,
//!         async move { signals.recv().await },
//!     )
//!     .await;
//!     println!("exit code {}", outcome.exit_code().as_i32());
//!     Ok(())
//! }
//! ```

#[cfg(not(unix))]
compile_error!("pgpass-core requires a Unix platform with named pipes");

pub mod broker;
pub mod cancel;
pub mod config;
pub mod daemon;
pub mod error;
pub mod platform;
pub mod provider;
pub mod shutdown;

// Re-export commonly used types
pub use broker::{ConnectionLoop, FifoRendezvous, LoopState, Rendezvous, ServeSummary};
pub use cancel::{CancellationToken, CancelledError};
pub use config::{BrokerConfig, ConnectionProfile, PgDefaults};
pub use error::{BrokerError, ExitCode, Result};
pub use platform::{ensure_pipe, PipeStatus};
pub use provider::{AwsConfig, CredentialProvider, RdsIamTokenProvider};
pub use shutdown::{Outcome, ShutdownCoordinator, ShutdownSignal, ShutdownSignals};
