//! Credential providers.
//!
//! The connection loop asks a [`CredentialProvider`] for a fresh token on
//! every reader attachment. Tokens are never cached here or by the caller.
//!
//! - `aws` - region and credential discovery for the RDS provider
//! - `rds` - Amazon RDS IAM authentication tokens (SigV4 presigned)

pub mod aws;
pub mod rds;

pub use aws::AwsConfig;
pub use rds::RdsIamTokenProvider;

use crate::config::ConnectionProfile;
use crate::error::Result;
use async_trait::async_trait;

/// Source of short-lived database passwords.
///
/// Implementations may hit the network. A failure must come back as
/// `Err(BrokerError::Provider { .. })`; partial tokens are never returned.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    /// Produce a token valid for `profile`.
    async fn generate(&self, profile: &ConnectionProfile) -> Result<String>;
}
