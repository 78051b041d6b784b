//! Centralized configuration for the pgpass broker.
//!
//! Constants live on unit structs grouped by concern. The only runtime value is
//! [`ConnectionProfile`], read from the environment once at startup and passed
//! into the connection loop; nothing re-reads the environment afterwards.

use crate::error::{BrokerError, Result};
use std::fmt;
use std::time::Duration;

/// PostgreSQL connection defaults and the variables that override them.
pub struct PgDefaults;

impl PgDefaults {
    pub const HOST: &'static str = "localhost";
    pub const PORT: u16 = 5432;
    pub const USER: &'static str = "postgres";
    pub const DATABASE: &'static str = "postgres";

    pub const HOST_VAR: &'static str = "PGHOST";
    pub const PORT_VAR: &'static str = "PGPORT";
    pub const USER_VAR: &'static str = "PGUSER";
    pub const DATABASE_VAR: &'static str = "PGDATABASE";
}

/// Broker-level settings.
pub struct BrokerConfig;

impl BrokerConfig {
    pub const APP_NAME: &'static str = "pgpass-broker";
    /// Mode applied to the FIFO on every startup.
    pub const PIPE_MODE: u32 = 0o600;
    /// Lifetime of a generated RDS token.
    pub const TOKEN_TTL: Duration = Duration::from_secs(900);
    pub const LOG_FILTER_VAR: &'static str = "RUST_LOG";
    pub const DEFAULT_LOG_FILTER: &'static str = "info";
}

/// AWS signing settings.
pub struct AwsDefaults;

impl AwsDefaults {
    pub const SIGNING_SERVICE: &'static str = "rds-db";
}

/// Target database the broker mints credentials for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionProfile {
    host: String,
    port: u16,
    user: String,
    database: String,
}

impl ConnectionProfile {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            database: database.into(),
        }
    }

    /// Read `PGHOST`, `PGPORT`, `PGUSER` and `PGDATABASE`, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a profile from an arbitrary variable source.
    ///
    /// A variable that is present but empty counts as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let port = match get(PgDefaults::PORT_VAR) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| BrokerError::Config {
                message: format!("{} is not a valid port: {:?}", PgDefaults::PORT_VAR, raw),
            })?,
            None => PgDefaults::PORT,
        };

        Ok(Self {
            host: get(PgDefaults::HOST_VAR).unwrap_or_else(|| PgDefaults::HOST.to_string()),
            port,
            user: get(PgDefaults::USER_VAR).unwrap_or_else(|| PgDefaults::USER.to_string()),
            database: get(PgDefaults::DATABASE_VAR)
                .unwrap_or_else(|| PgDefaults::DATABASE.to_string()),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// `host:port`, the endpoint a token is signed for.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Format one pgpass-style credential line for `token`.
    pub fn credential_line(&self, token: &str) -> String {
        format!(
            "{}:{}:{}:{}:{}\n",
            self.host, self.port, self.database, self.user, token
        )
    }
}

impl Default for ConnectionProfile {
    fn default() -> Self {
        Self::new(
            PgDefaults::HOST,
            PgDefaults::PORT,
            PgDefaults::USER,
            PgDefaults::DATABASE,
        )
    }
}

impl fmt::Display for ConnectionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let profile = ConnectionProfile::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(profile, ConnectionProfile::default());
        assert_eq!(profile.host(), "localhost");
        assert_eq!(profile.port(), 5432);
        assert_eq!(profile.user(), "postgres");
        assert_eq!(profile.database(), "postgres");
    }

    #[test]
    fn test_overrides() {
        let profile = ConnectionProfile::from_lookup(lookup_from(&[
            ("PGHOST", "db.internal"),
            ("PGPORT", "6432"),
            ("PGUSER", "app"),
            ("PGDATABASE", "orders"),
        ]))
        .unwrap();
        assert_eq!(profile.endpoint(), "db.internal:6432");
        assert_eq!(profile.user(), "app");
        assert_eq!(profile.database(), "orders");
    }

    #[test]
    fn test_empty_values_fall_back() {
        let profile =
            ConnectionProfile::from_lookup(lookup_from(&[("PGHOST", ""), ("PGPORT", "")]))
                .unwrap();
        assert_eq!(profile.host(), "localhost");
        assert_eq!(profile.port(), 5432);
    }

    #[test]
    fn test_invalid_port_rejected() {
        let err = ConnectionProfile::from_lookup(lookup_from(&[("PGPORT", "postgres")]))
            .unwrap_err();
        assert!(matches!(err, BrokerError::Config { .. }));
        assert!(ConnectionProfile::from_lookup(lookup_from(&[("PGPORT", "70000")])).is_err());
    }

    #[test]
    fn test_credential_line_field_order() {
        let profile = ConnectionProfile::new("h", 1, "u", "d");
        assert_eq!(profile.credential_line("tok"), "h:1:d:u:tok\n");
    }
}
