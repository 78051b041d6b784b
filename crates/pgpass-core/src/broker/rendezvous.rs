//! The blocking rendezvous the connection loop waits on.
//!
//! Opening a FIFO for writing suspends the caller until a reader opens the
//! other end. [`FifoRendezvous`] runs that open on the blocking pool so the
//! supervisor can stop awaiting it; the open itself cannot be aborted and is
//! reclaimed when the process exits.

use async_trait::async_trait;
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWrite;
use tracing::debug;

/// A source of reader attachments.
#[async_trait]
pub trait Rendezvous: Send + Sync + 'static {
    /// Write half handed to the loop for one connection. Dropping it closes
    /// the connection.
    type Conn: AsyncWrite + Unpin + Send;

    /// Path reported in errors.
    fn path(&self) -> &Path;

    /// Wait for the next reader.
    ///
    /// `ErrorKind::Interrupted` is retried by the loop; any other error means
    /// the rendezvous itself is broken. [`FifoRendezvous`] never reports
    /// `Interrupted`, since `std::fs::OpenOptions::open` already retries
    /// `EINTR`; the retry only matters for implementations that surface it.
    async fn accept(&self) -> io::Result<Self::Conn>;
}

/// Rendezvous on a named pipe on disk.
#[derive(Debug, Clone)]
pub struct FifoRendezvous {
    path: PathBuf,
}

impl FifoRendezvous {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Rendezvous for FifoRendezvous {
    type Conn = tokio::fs::File;

    fn path(&self) -> &Path {
        &self.path
    }

    async fn accept(&self) -> io::Result<Self::Conn> {
        let path = self.path.clone();
        let file = tokio::task::spawn_blocking(move || open_for_write(&path))
            .await
            .map_err(io::Error::other)??;
        Ok(tokio::fs::File::from_std(file))
    }
}

/// Blocking open-for-write of the FIFO.
///
/// The opened handle is re-checked so a path swapped for a regular file after
/// startup is refused instead of written to.
fn open_for_write(path: &Path) -> io::Result<std::fs::File> {
    let file = std::fs::OpenOptions::new().write(true).open(path)?;
    if !file.metadata()?.file_type().is_fifo() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is no longer a named pipe", path.display()),
        ));
    }
    debug!("Reader attached to {}", path.display());
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::ensure_pipe;
    use std::io::Read;
    use tempfile::TempDir;
    use tokio::io::AsyncWriteExt;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_accept_waits_for_reader() {
        let temp_dir = TempDir::new().unwrap();
        let pipe = temp_dir.path().join("rdv.pipe");
        ensure_pipe(&pipe).unwrap();

        let reader_path = pipe.clone();
        let reader = std::thread::spawn(move || {
            let mut contents = String::new();
            std::fs::File::open(&reader_path)
                .unwrap()
                .read_to_string(&mut contents)
                .unwrap();
            contents
        });

        let rendezvous = FifoRendezvous::new(&pipe);
        let mut conn = rendezvous.accept().await.unwrap();
        conn.write_all(b"hello\n").await.unwrap();
        conn.shutdown().await.unwrap();
        drop(conn);

        assert_eq!(reader.join().unwrap(), "hello\n");
    }

    #[tokio::test]
    async fn test_accept_missing_pipe_fails() {
        let temp_dir = TempDir::new().unwrap();
        let rendezvous = FifoRendezvous::new(temp_dir.path().join("gone.pipe"));

        let err = rendezvous.accept().await.unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_accept_refuses_regular_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("swapped");
        std::fs::write(&path, b"").unwrap();

        let err = FifoRendezvous::new(&path).accept().await.unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(std::fs::read(&path).unwrap(), b"");
    }
}
