//! AWS region and credentials source.
//!
//! Discovery is delegated to `aws-config`, which walks the standard chain:
//! environment, shared config/credentials files (profiles, SSO, assume-role,
//! `credential_process`), web identity, ECS container and EC2 instance
//! metadata. Only the region is required at startup; credentials are resolved
//! lazily by the token provider on each connection.

use crate::error::{BrokerError, Result};
use aws_config::{BehaviorVersion, SdkConfig};
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use tracing::debug;

/// Signing region plus the credentials provider it pairs with.
#[derive(Debug, Clone)]
pub struct AwsConfig {
    region: String,
    credentials: SharedCredentialsProvider,
}

impl AwsConfig {
    pub fn new(region: impl Into<String>, credentials: impl ProvideCredentials + 'static) -> Self {
        Self {
            region: region.into(),
            credentials: SharedCredentialsProvider::new(credentials),
        }
    }

    /// Load the default AWS configuration chain.
    ///
    /// # Errors
    /// Returns [`BrokerError::ProviderInit`] when no region or no credentials
    /// provider could be configured.
    pub async fn load() -> Result<Self> {
        let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::from_sdk_config(&sdk_config)
    }

    /// Take region and credentials provider from an already loaded config.
    pub fn from_sdk_config(config: &SdkConfig) -> Result<Self> {
        let region = config
            .region()
            .map(|region| region.as_ref().to_string())
            .ok_or_else(|| BrokerError::ProviderInit {
                message: "no AWS region configured (set AWS_REGION or region in the AWS profile)"
                    .to_string(),
            })?;

        let credentials = config
            .credentials_provider()
            .ok_or_else(|| BrokerError::ProviderInit {
                message: "no AWS credentials provider configured".to_string(),
            })?;

        debug!("Loaded AWS configuration for region {}", region);
        Ok(Self {
            region,
            credentials,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn credentials_provider(&self) -> &SharedCredentialsProvider {
        &self.credentials
    }
}
