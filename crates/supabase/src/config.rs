//! Connection settings shared by every operation in a workflow run.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::SupabaseError;

/// Path under the project URL where PostgREST is mounted.
pub const REST_ROOT: &str = "/rest/v1";

/// Schema PostgREST serves when no profile header is sent.
pub const DEFAULT_SCHEMA: &str = "public";

fn default_schema() -> String {
    DEFAULT_SCHEMA.to_string()
}

/// Where and as whom to talk to PostgREST.
///
/// Deserialises from the same camelCase keys a task step uses:
/// `url`, `apiKey` and the optional `schema`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    /// Project URL, with or without the trailing REST root.
    #[serde(rename = "url")]
    pub base_url: String,
    /// Sent both as `apikey` and as the bearer token.
    pub api_key: String,
    /// Postgres schema; anything but `public` adds profile headers.
    #[serde(default = "default_schema")]
    pub schema: String,
}

impl ConnectionConfig {
    /// Build a config for the `public` schema.
    ///
    /// # Errors
    /// [`SupabaseError::InvalidConfig`] if either value is blank.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, SupabaseError> {
        let config = Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            schema: default_schema(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Replace the target schema.
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Check the invariants a deserialised config cannot enforce by itself.
    pub fn validate(&self) -> Result<(), SupabaseError> {
        if self.base_url.trim().is_empty() {
            return Err(SupabaseError::InvalidConfig("url must not be empty".into()));
        }
        if self.api_key.trim().is_empty() {
            return Err(SupabaseError::InvalidConfig("apiKey must not be empty".into()));
        }
        Ok(())
    }

    /// Base URL with exactly one REST root appended.
    pub fn rest_url(&self) -> String {
        normalize_base_url(&self.base_url)
    }

    /// `true` when no profile headers need to be sent.
    pub fn is_default_schema(&self) -> bool {
        self.schema == DEFAULT_SCHEMA
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("schema", &self.schema)
            .finish()
    }
}

/// Append [`REST_ROOT`] to `base_url` unless it is already there.
///
/// Trailing slashes are dropped first, so `…/rest/v1/` keeps a single root.
/// Idempotent: a normalised URL is returned unchanged.
pub fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    if trimmed.ends_with(REST_ROOT) {
        trimmed.to_string()
    } else {
        format!("{trimmed}{REST_ROOT}")
    }
}

/// Tuning knobs for the HTTP client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportOptions {
    /// Total time allowed for one request, response body included.
    pub timeout: Option<Duration>,
    /// Time allowed to establish the connection.
    pub connect_timeout: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_rest_root_with_single_slash() {
        assert_eq!(
            normalize_base_url("https://abc.supabase.co"),
            "https://abc.supabase.co/rest/v1"
        );
        assert_eq!(
            normalize_base_url("https://abc.supabase.co/"),
            "https://abc.supabase.co/rest/v1"
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize_base_url("https://abc.supabase.co");
        assert_eq!(normalize_base_url(&once), once);
        assert_eq!(
            normalize_base_url("http://localhost:54321/rest/v1"),
            "http://localhost:54321/rest/v1"
        );

        let slashed = normalize_base_url("https://abc.supabase.co/rest/v1/");
        assert_eq!(slashed, "https://abc.supabase.co/rest/v1");
        assert_eq!(slashed.matches(REST_ROOT).count(), 1);
        assert_eq!(normalize_base_url(&slashed), slashed);
    }

    #[test]
    fn blank_credentials_are_rejected() {
        assert!(ConnectionConfig::new("", "key").is_err());
        assert!(ConnectionConfig::new("https://abc.supabase.co", "  ").is_err());
        assert!(ConnectionConfig::new("https://abc.supabase.co", "key").is_ok());
    }

    #[test]
    fn deserializes_step_keys_with_default_schema() {
        let config: ConnectionConfig = serde_json::from_value(serde_json::json!({
            "url": "https://abc.supabase.co",
            "apiKey": "secret",
        }))
        .expect("valid config");
        assert_eq!(config.schema, "public");
        assert!(config.is_default_schema());
        assert!(!format!("{config:?}").contains("secret"));
    }
}
