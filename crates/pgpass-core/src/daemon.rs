//! Top-level broker run.
//!
//! Spawns the connection loop as its own task and blocks on the shutdown
//! coordinator. The pipe must already have been prepared with
//! [`crate::platform::ensure_pipe`].

use crate::broker::{ConnectionLoop, Rendezvous};
use crate::cancel::CancellationToken;
use crate::config::ConnectionProfile;
use crate::provider::CredentialProvider;
use crate::shutdown::{Outcome, ShutdownCoordinator, ShutdownSignal};
use std::future::Future;
use std::sync::Arc;
use tracing::info;

/// Serve credentials on `rendezvous` until `shutdown` resolves or the loop fails.
pub async fn run<R, S>(
    rendezvous: R,
    provider: Arc<dyn CredentialProvider>,
    profile: ConnectionProfile,
    shutdown: S,
) -> Outcome
where
    R: Rendezvous,
    S: Future<Output = ShutdownSignal>,
{
    info!(
        "Serving {} credentials for {} on {}",
        provider.name(),
        profile,
        rendezvous.path().display()
    );

    let cancel = CancellationToken::new();
    let connection_loop = ConnectionLoop::new(rendezvous, provider, profile, cancel.clone());
    let worker = tokio::spawn(connection_loop.run());

    ShutdownCoordinator::new(cancel)
        .supervise(worker, shutdown)
        .await
}
