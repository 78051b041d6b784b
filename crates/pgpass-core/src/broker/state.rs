//! Connection loop state.

use std::fmt;

/// Where the connection loop currently is in its cycle.
///
/// ```text
/// Idle -> Open -> Serving -> Idle
///          |
///          +-> Terminated (fatal open error or cancellation)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoopState {
    /// Between cycles; the only point where cancellation is observed.
    #[default]
    Idle,
    /// Blocked in the rendezvous open, waiting for a reader.
    Open,
    /// A reader is attached and a credential is being produced.
    Serving,
    /// The loop has exited and will not serve again.
    Terminated,
}

impl LoopState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopState::Idle => "idle",
            LoopState::Open => "open",
            LoopState::Serving => "serving",
            LoopState::Terminated => "terminated",
        }
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Counters reported when the loop exits cleanly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeSummary {
    /// Connections that received a full credential line.
    pub served: u64,
    /// Connections closed without a credential (provider or write failure).
    pub failed: u64,
}
