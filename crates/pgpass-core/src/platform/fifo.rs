//! Named pipe (FIFO) lifecycle.
//!
//! [`ensure_pipe`] is run once before the connection loop starts and leaves
//! the path as a FIFO with mode 0600. It never replaces an existing non-FIFO
//! object.

use super::permissions::set_private;
use crate::config::BrokerConfig;
use crate::error::{BrokerError, Result};
use nix::sys::stat::Mode;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;
use tracing::info;

/// What [`ensure_pipe`] found at the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeStatus {
    /// A new FIFO was created.
    Created,
    /// A FIFO was already present and has been reused.
    Existing,
}

impl PipeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipeStatus::Created => "created",
            PipeStatus::Existing => "already exists",
        }
    }
}

impl std::fmt::Display for PipeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Make sure `path` is a FIFO restricted to its owner.
///
/// # Errors
/// - [`BrokerError::PathConflict`] if something other than a FIFO occupies the path
/// - [`BrokerError::CreateFailed`] if the FIFO can't be created or the path can't be inspected
/// - [`BrokerError::PermissionFailed`] if the mode can't be set to 0600
pub fn ensure_pipe(path: &Path) -> Result<PipeStatus> {
    let status = match std::fs::metadata(path) {
        Ok(metadata) if metadata.file_type().is_fifo() => PipeStatus::Existing,
        Ok(_) => return Err(BrokerError::PathConflict(path.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            create_fifo(path)?;
            PipeStatus::Created
        }
        Err(e) => return Err(BrokerError::create_failed(e, path)),
    };

    set_private(path)?;

    info!("Pipe {}: {}", status, path.display());

    Ok(status)
}

fn create_fifo(path: &Path) -> Result<()> {
    let mode = Mode::from_bits_truncate(BrokerConfig::PIPE_MODE as nix::libc::mode_t);
    nix::unistd::mkfifo(path, mode)
        .map_err(|errno| BrokerError::create_failed(std::io::Error::from(errno), path))
}
