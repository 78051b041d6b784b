//! Amazon RDS IAM authentication tokens.
//!
//! A token is a SigV4 query-string presigned `GET /?Action=connect&DBUser=..`
//! for the `rds-db` service against `host:port`, with the scheme stripped.
//! Signing is local. Only credential resolution may reach out to AWS, and it
//! goes through the provider chain loaded by [`AwsConfig`].

use super::aws::AwsConfig;
use super::CredentialProvider;
use crate::config::{AwsDefaults, BrokerConfig, ConnectionProfile};
use crate::error::{BrokerError, Result};
use async_trait::async_trait;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Generates RDS IAM tokens, resolving AWS credentials per token.
///
/// Resolved credentials are reused until they would expire within one token
/// lifetime, so every token handed out stays valid for its full TTL.
#[derive(Debug)]
pub struct RdsIamTokenProvider {
    region: String,
    credentials: SharedCredentialsProvider,
    cached: Mutex<Option<Credentials>>,
    ttl: Duration,
}

impl RdsIamTokenProvider {
    pub fn new(config: AwsConfig) -> Self {
        Self {
            region: config.region().to_string(),
            credentials: config.credentials_provider().clone(),
            cached: Mutex::new(None),
            ttl: BrokerConfig::TOKEN_TTL,
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Current credentials, refreshed from the provider when missing or close
    /// to expiry.
    async fn credentials(&self) -> Result<Credentials> {
        let mut cached = self.cached.lock().await;
        if let Some(credentials) = cached.as_ref() {
            if is_fresh(credentials, SystemTime::now(), self.ttl) {
                return Ok(credentials.clone());
            }
        }

        let credentials = self
            .credentials
            .provide_credentials()
            .await
            .map_err(|e| BrokerError::Provider {
                message: format!("failed to resolve AWS credentials: {}", e),
            })?;
        debug!("Resolved AWS credentials (expiry: {:?})", credentials.expiry());

        *cached = Some(credentials.clone());
        Ok(credentials)
    }

    /// Build a token as of `now`.
    pub fn build_token(
        &self,
        credentials: &Credentials,
        profile: &ConnectionProfile,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let endpoint = profile.endpoint();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let scope = format!(
            "{}/{}/{}/aws4_request",
            date,
            self.region,
            AwsDefaults::SIGNING_SERVICE
        );

        let mut query: BTreeMap<&str, String> = BTreeMap::new();
        query.insert("Action", "connect".to_string());
        query.insert("DBUser", profile.user().to_string());
        query.insert("X-Amz-Algorithm", ALGORITHM.to_string());
        query.insert(
            "X-Amz-Credential",
            format!("{}/{}", credentials.access_key_id(), scope),
        );
        query.insert("X-Amz-Date", amz_date.clone());
        query.insert("X-Amz-Expires", self.ttl.as_secs().to_string());
        query.insert("X-Amz-SignedHeaders", "host".to_string());
        if let Some(token) = credentials.session_token() {
            query.insert("X-Amz-Security-Token", token.to_string());
        }

        let canonical_query = query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let canonical_request = format!(
            "GET\n/\n{}\nhost:{}\n\nhost\n{}",
            canonical_query,
            endpoint,
            hex::encode(Sha256::digest(b""))
        );

        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            amz_date,
            scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let secret = format!("AWS4{}", credentials.secret_access_key());
        let mut key = hmac_sha256(secret.as_bytes(), date.as_bytes())?;
        for part in [self.region.as_str(), AwsDefaults::SIGNING_SERVICE, "aws4_request"] {
            key = hmac_sha256(&key, part.as_bytes())?;
        }
        let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())?);

        Ok(format!(
            "{}/?{}&X-Amz-Signature={}",
            endpoint, canonical_query, signature
        ))
    }
}

/// Credentials without an expiry never go stale.
fn is_fresh(credentials: &Credentials, now: SystemTime, margin: Duration) -> bool {
    match credentials.expiry() {
        Some(expiry) => now + margin < expiry,
        None => true,
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| BrokerError::Provider {
        message: format!("invalid signing key: {}", e),
    })?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

#[async_trait]
impl CredentialProvider for RdsIamTokenProvider {
    fn name(&self) -> &str {
        "rds-iam"
    }

    async fn generate(&self, profile: &ConnectionProfile) -> Result<String> {
        let credentials = self.credentials().await?;
        self.build_token(&credentials, profile, Utc::now())
    }
}
