//! The connection-serving loop.
//!
//! One writer, one pending open at a time. Each cycle waits for a reader on
//! the rendezvous, asks the provider for a fresh token, writes a single
//! credential line and closes the handle.
//!
//! # Failure policy
//!
//! - provider or write failure: logged, connection closed, loop continues
//! - rendezvous failure: fatal, loop terminates with [`BrokerError::Accept`]
//! - cancellation: observed between cycles only, loop exits with `Ok`

pub mod rendezvous;
pub mod state;

pub use rendezvous::{FifoRendezvous, Rendezvous};
pub use state::{LoopState, ServeSummary};

use crate::cancel::CancellationToken;
use crate::config::ConnectionProfile;
use crate::error::{BrokerError, Result};
use crate::provider::CredentialProvider;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Serves credentials over a [`Rendezvous`] until cancelled or broken.
pub struct ConnectionLoop<R: Rendezvous> {
    rendezvous: R,
    provider: Arc<dyn CredentialProvider>,
    profile: ConnectionProfile,
    cancel: CancellationToken,
    state_tx: watch::Sender<LoopState>,
}

impl<R: Rendezvous> ConnectionLoop<R> {
    pub fn new(
        rendezvous: R,
        provider: Arc<dyn CredentialProvider>,
        profile: ConnectionProfile,
        cancel: CancellationToken,
    ) -> Self {
        let (state_tx, _) = watch::channel(LoopState::Idle);
        Self {
            rendezvous,
            provider,
            profile,
            cancel,
            state_tx,
        }
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<LoopState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, state: LoopState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!("Connection loop {} -> {}", previous, state);
        }
    }

    /// Run until cancellation (returns `Ok`) or a rendezvous failure (returns `Err`).
    pub async fn run(self) -> Result<ServeSummary> {
        let mut summary = ServeSummary::default();

        loop {
            if self.cancel.check().is_err() {
                info!("Shutting down gracefully...");
                self.set_state(LoopState::Terminated);
                return Ok(summary);
            }

            self.set_state(LoopState::Open);
            info!("Waiting for client to connect...");

            let conn = match self.rendezvous.accept().await {
                Ok(conn) => conn,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {
                    // Only rendezvous implementations that surface EINTR get here.
                    debug!("Pipe open interrupted, retrying");
                    self.set_state(LoopState::Idle);
                    continue;
                }
                Err(e) => {
                    error!("Pipe open failed: {}", e);
                    self.set_state(LoopState::Terminated);
                    return Err(BrokerError::accept_failed(e, self.rendezvous.path()));
                }
            };

            self.set_state(LoopState::Serving);
            info!("Client connected");

            match self.serve(conn).await {
                Ok(()) => {
                    summary.served += 1;
                    info!("Credentials sent, waiting for next client");
                }
                Err(_) => summary.failed += 1,
            }

            self.set_state(LoopState::Idle);
        }
    }

    /// Serve one attached reader. The handle is dropped, and the pipe closed,
    /// on every path out of this function.
    async fn serve(&self, mut conn: R::Conn) -> Result<()> {
        let token = match self.provider.generate(&self.profile).await {
            Ok(token) => token,
            Err(e) => {
                warn!(
                    "Error generating credentials via {}: {}",
                    self.provider.name(),
                    e
                );
                return Err(e);
            }
        };

        let line = self.profile.credential_line(&token);
        let written = async {
            conn.write_all(line.as_bytes()).await?;
            conn.shutdown().await
        }
        .await;

        if let Err(e) = written {
            warn!("Error writing to pipe: {}", e);
            return Err(e.into());
        }
        Ok(())
    }
}
