//! Owner-only permission handling for the pipe.

use crate::config::BrokerConfig;
use crate::error::{BrokerError, Result};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tracing::debug;

/// Set the path to be readable and writable by its owner only (mode 0600).
///
/// Applied on every startup, including when the pipe already existed with a
/// looser mode.
///
/// # Errors
/// Returns [`BrokerError::PermissionFailed`] if the mode can't be changed.
pub fn set_private(path: &Path) -> Result<()> {
    let permissions = std::fs::Permissions::from_mode(BrokerConfig::PIPE_MODE);
    std::fs::set_permissions(path, permissions)
        .map_err(|e| BrokerError::permission_failed(e, path))?;
    debug!("Set private permissions (0600) on: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn is_private(path: &Path) -> bool {
        std::fs::metadata(path)
            .map(|m| m.permissions().mode() & 0o777 == BrokerConfig::PIPE_MODE)
            .unwrap_or(false)
    }

    #[test]
    fn test_set_private_tightens_mode() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("loose");
        File::create(&file_path).unwrap();
        std::fs::set_permissions(&file_path, std::fs::Permissions::from_mode(0o666)).unwrap();
        assert!(!is_private(&file_path));

        set_private(&file_path).unwrap();

        let mode = std::fs::metadata(&file_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(is_private(&file_path));
    }

    #[test]
    fn test_set_private_missing_path() {
        let temp_dir = TempDir::new().unwrap();
        let err = set_private(&temp_dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, BrokerError::PermissionFailed { .. }));
    }
}
