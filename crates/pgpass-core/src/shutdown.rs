//! Shutdown coordination.
//!
//! The supervisor races two one-shot events: a termination signal and the
//! connection loop's exit. Whichever comes first decides the [`Outcome`].
//! On a signal the loop's token is cancelled but the loop is not awaited; an
//! open blocked in the rendezvous may never return.

use crate::broker::ServeSummary;
use crate::cancel::CancellationToken;
use crate::error::{BrokerError, ExitCode, Result};
use std::fmt;
use std::future::Future;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Termination signals that trigger a graceful shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Interrupt => write!(f, "SIGINT"),
            ShutdownSignal::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// SIGINT and SIGTERM listeners.
///
/// Register before the loop starts so no signal between startup and the
/// first `recv` falls back to the default disposition.
pub struct ShutdownSignals {
    interrupt: Signal,
    terminate: Signal,
}

impl ShutdownSignals {
    pub fn register() -> Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Wait for the next termination signal.
    pub async fn recv(&mut self) -> ShutdownSignal {
        tokio::select! {
            _ = self.interrupt.recv() => ShutdownSignal::Interrupt,
            _ = self.terminate.recv() => ShutdownSignal::Terminate,
        }
    }
}

/// How a broker run ended.
#[derive(Debug)]
pub enum Outcome {
    /// A termination signal arrived first.
    Signalled(ShutdownSignal),
    /// The loop stopped on its own after observing cancellation.
    Stopped(ServeSummary),
    /// The loop hit a fatal error first.
    Failed(BrokerError),
}

impl Outcome {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Outcome::Signalled(_) | Outcome::Stopped(_) => ExitCode::Ok,
            Outcome::Failed(e) => e.exit_code(),
        }
    }
}

/// Decides the single outcome of a run.
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    cancel: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// Wait for `shutdown` or for `worker` to finish, whichever is first.
    pub async fn supervise<S>(
        &self,
        mut worker: JoinHandle<Result<ServeSummary>>,
        shutdown: S,
    ) -> Outcome
    where
        S: Future<Output = ShutdownSignal>,
    {
        let outcome = tokio::select! {
            signal = shutdown => {
                info!("{} received, shutting down", signal);
                Outcome::Signalled(signal)
            }
            joined = &mut worker => match joined {
                Ok(Ok(summary)) => Outcome::Stopped(summary),
                Ok(Err(e)) => {
                    error!("Error accepting: {}", e);
                    Outcome::Failed(e)
                }
                Err(e) => {
                    error!("Connection loop task failed: {}", e);
                    Outcome::Failed(BrokerError::WorkerAborted {
                        message: e.to_string(),
                    })
                }
            },
        };

        // Stop the loop at its next checkpoint. `worker` is dropped without
        // awaiting, which detaches it.
        self.cancel.cancel();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::tests::{ScriptedProvider, ScriptedRendezvous};
    use crate::broker::{ConnectionLoop, LoopState};
    use crate::config::ConnectionProfile;
    use std::sync::Arc;
    use tokio::sync::oneshot;

    fn spawn_loop(
        rendezvous: ScriptedRendezvous,
        cancel: &CancellationToken,
    ) -> (
        JoinHandle<Result<ServeSummary>>,
        tokio::sync::watch::Receiver<LoopState>,
    ) {
        let connection_loop = ConnectionLoop::new(
            rendezvous,
            Arc::new(ScriptedProvider::new(vec![])),
            ConnectionProfile::default(),
            cancel.clone(),
        );
        let states = connection_loop.subscribe();
        (tokio::spawn(connection_loop.run()), states)
    }

    #[tokio::test]
    async fn test_signal_while_waiting_is_clean_shutdown() {
        let (rendezvous, tx) = ScriptedRendezvous::new();
        let cancel = CancellationToken::new();
        let (worker, mut states) = spawn_loop(rendezvous, &cancel);
        states.wait_for(|s| *s == LoopState::Open).await.unwrap();

        let (signal_tx, signal_rx) = oneshot::channel();
        signal_tx.send(ShutdownSignal::Terminate).unwrap();
        let outcome = ShutdownCoordinator::new(cancel.clone())
            .supervise(worker, async move { signal_rx.await.unwrap() })
            .await;

        assert!(matches!(
            outcome,
            Outcome::Signalled(ShutdownSignal::Terminate)
        ));
        assert_eq!(outcome.exit_code().as_i32(), 0);
        assert!(cancel.is_cancelled());
        // The loop never served anything.
        assert_eq!(*states.borrow(), LoopState::Open);
        drop(tx);
    }

    #[tokio::test]
    async fn test_fatal_error_wins_over_pending_signal() {
        let (rendezvous, tx) = ScriptedRendezvous::new();
        drop(tx);
        let cancel = CancellationToken::new();
        let (worker, _states) = spawn_loop(rendezvous, &cancel);

        let outcome = ShutdownCoordinator::new(cancel)
            .supervise(worker, std::future::pending())
            .await;

        assert!(matches!(outcome, Outcome::Failed(BrokerError::Accept { .. })));
        assert_eq!(outcome.exit_code(), ExitCode::Accept);
    }

    #[tokio::test]
    async fn test_panicked_worker_is_failure() {
        let worker: JoinHandle<Result<ServeSummary>> =
            tokio::spawn(async { panic!("loop exploded") });

        let outcome = ShutdownCoordinator::new(CancellationToken::new())
            .supervise(worker, std::future::pending())
            .await;

        assert!(matches!(
            outcome,
            Outcome::Failed(BrokerError::WorkerAborted { .. })
        ));
        assert_eq!(outcome.exit_code(), ExitCode::Accept);
    }

    #[tokio::test]
    async fn test_stopped_loop_is_success() {
        let worker = tokio::spawn(async { Ok(ServeSummary { served: 2, failed: 0 }) });

        let outcome = ShutdownCoordinator::new(CancellationToken::new())
            .supervise(worker, std::future::pending())
            .await;

        assert!(matches!(outcome, Outcome::Stopped(ServeSummary { served: 2, .. })));
        assert_eq!(outcome.exit_code(), ExitCode::Ok);
    }

    #[test]
    fn test_signal_display() {
        assert_eq!(ShutdownSignal::Interrupt.to_string(), "SIGINT");
        assert_eq!(ShutdownSignal::Terminate.to_string(), "SIGTERM");
    }
}
