//! Platform layer for the named pipe.
//!
//! All filesystem-level FIFO handling lives here so the connection loop only
//! ever deals with an already prepared path.
//!
//! - `fifo` - existence check, creation and type validation
//! - `permissions` - owner-only mode enforcement

pub mod fifo;
pub mod permissions;

pub use fifo::{ensure_pipe, PipeStatus};
pub use permissions::set_private;
