//! Provider and client configuration.
//!
//! The runtime hands the provider its configuration block as JSON. It is
//! deserialized once into [`ProviderConfig`], completed from the environment,
//! and resolved into an immutable [`ClientConfig`] used to build the
//! [`CspClient`](crate::client::CspClient).
//!
//! # Environment Variables
//!
//! - `CSP_URL`: base URL of the CSP API (`cspurl`)
//! - `TOKEN`: bearer token (`token`)
//! - `SVC_DEF_ID`: service definition ID scoping all role endpoints
//!   (`servicedefinitionid`)
//!
//! Values set explicitly in the configuration block take precedence.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ProviderError;

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:19090";

/// Timeout applied to every request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable supplying `cspurl`.
pub const ENV_CSP_URL: &str = "CSP_URL";

/// Environment variable supplying `token`.
pub const ENV_TOKEN: &str = "TOKEN";

/// Environment variable supplying `servicedefinitionid`.
pub const ENV_SERVICE_DEFINITION_ID: &str = "SVC_DEF_ID";

/// How the client authenticates, and which service scope it addresses.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Credentials {
    /// No token. Requests carry no `Authorization` header, so every role
    /// endpoint rejects them.
    #[default]
    Anonymous,
    /// Bearer token authentication within a service definition.
    Bearer {
        /// The bearer token.
        token: String,
        /// The service definition ID roles are addressed under.
        service_definition_id: String,
    },
}

impl Credentials {
    /// Create bearer credentials.
    pub fn bearer(token: impl Into<String>, service_definition_id: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
            service_definition_id: service_definition_id.into(),
        }
    }

    /// Resolve optional token and scope values.
    ///
    /// Both must be present and non-empty for bearer credentials; anything
    /// else yields [`Credentials::Anonymous`].
    pub fn from_parts(token: Option<String>, service_definition_id: Option<String>) -> Self {
        match (token, service_definition_id) {
            (Some(token), Some(scope)) if !token.is_empty() && !scope.is_empty() => {
                Self::bearer(token, scope)
            }
            _ => Self::Anonymous,
        }
    }

    /// The bearer token, if any.
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::Bearer { token, .. } => Some(token),
        }
    }

    /// The service definition ID, empty for anonymous credentials.
    pub fn service_definition_id(&self) -> &str {
        match self {
            Self::Anonymous => "",
            Self::Bearer {
                service_definition_id,
                ..
            } => service_definition_id,
        }
    }

    /// Whether these are anonymous credentials.
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Bearer {
                service_definition_id,
                ..
            } => f
                .debug_struct("Bearer")
                .field("token", &"<redacted>")
                .field("service_definition_id", service_definition_id)
                .finish(),
        }
    }
}

/// Connection settings for a [`CspClient`](crate::client::CspClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the CSP API.
    pub base_url: String,
    /// Authentication and scope.
    pub credentials: Credentials,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials: Credentials::Anonymous,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Create a client configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the credentials.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// The provider configuration block.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the CSP API.
    #[serde(default)]
    pub cspurl: Option<String>,
    /// Bearer token.
    #[serde(default)]
    pub token: Option<String>,
    /// Service definition ID.
    #[serde(default)]
    pub servicedefinitionid: Option<String>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("cspurl", &self.cspurl)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("servicedefinitionid", &self.servicedefinitionid)
            .finish()
    }
}

impl ProviderConfig {
    /// Parse a configuration block, filling unset values from the process
    /// environment.
    pub fn from_value(value: Value) -> Result<Self, ProviderError> {
        Self::from_value_with_env(value, |key| std::env::var(key).ok())
    }

    /// Parse a configuration block, filling unset values through `env`.
    pub fn from_value_with_env<F>(value: Value, env: F) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: ProviderConfig = match value {
            Value::Null => ProviderConfig::default(),
            value => serde_json::from_value(value)
                .map_err(|e| ProviderError::Configuration(e.to_string()))?,
        };

        if config.cspurl.is_none() {
            config.cspurl = env(ENV_CSP_URL);
        }
        if config.token.is_none() {
            config.token = env(ENV_TOKEN);
        }
        if config.servicedefinitionid.is_none() {
            config.servicedefinitionid = env(ENV_SERVICE_DEFINITION_ID);
        }

        Ok(config)
    }

    /// Resolve into client settings.
    pub fn into_client_config(self) -> ClientConfig {
        let mut client = ClientConfig::new()
            .with_credentials(Credentials::from_parts(self.token, self.servicedefinitionid));
        if let Some(url) = self.cspurl.filter(|url| !url.is_empty()) {
            client = client.with_base_url(url);
        }
        client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_client_config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:19090");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.credentials.is_anonymous());
    }

    #[test]
    fn test_client_config_builder() {
        let config = ClientConfig::new()
            .with_base_url("https://console.example.com")
            .with_credentials(Credentials::bearer("t", "svc"))
            .with_timeout(Duration::from_secs(2));
        assert_eq!(config.base_url, "https://console.example.com");
        assert_eq!(config.credentials.token(), Some("t"));
        assert_eq!(config.credentials.service_definition_id(), "svc");
        assert_eq!(config.timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_credentials_require_token_and_scope() {
        assert!(Credentials::from_parts(None, None).is_anonymous());
        assert!(Credentials::from_parts(Some("t".into()), None).is_anonymous());
        assert!(Credentials::from_parts(None, Some("svc".into())).is_anonymous());
        assert!(Credentials::from_parts(Some("".into()), Some("svc".into())).is_anonymous());
        assert!(Credentials::from_parts(Some("t".into()), Some("".into())).is_anonymous());
        assert_eq!(
            Credentials::from_parts(Some("t".into()), Some("svc".into())),
            Credentials::bearer("t", "svc")
        );
    }

    #[test]
    fn test_credentials_debug_redacts_token() {
        let debug = format!("{:?}", Credentials::bearer("secret-token", "svc"));
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("svc"));
    }

    #[test]
    fn test_provider_config_explicit_values_win() {
        let env = env_from(&[
            ("CSP_URL", "http://env"),
            ("TOKEN", "env-token"),
            ("SVC_DEF_ID", "env-svc"),
        ]);
        let config = ProviderConfig::from_value_with_env(
            json!({"cspurl": "http://explicit", "token": "tok", "servicedefinitionid": "svc"}),
            env,
        )
        .unwrap();
        assert_eq!(config.cspurl.as_deref(), Some("http://explicit"));
        assert_eq!(config.token.as_deref(), Some("tok"));
        assert_eq!(config.servicedefinitionid.as_deref(), Some("svc"));
    }

    #[test]
    fn test_provider_config_falls_back_to_env() {
        let env = env_from(&[("TOKEN", "env-token"), ("SVC_DEF_ID", "env-svc")]);
        let config =
            ProviderConfig::from_value_with_env(json!({"cspurl": null}), env).unwrap();
        assert_eq!(config.cspurl, None);
        assert_eq!(config.token.as_deref(), Some("env-token"));

        let client = config.into_client_config();
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
        assert_eq!(client.credentials, Credentials::bearer("env-token", "env-svc"));
    }

    #[test]
    fn test_provider_config_null_block() {
        let config = ProviderConfig::from_value_with_env(Value::Null, env_from(&[])).unwrap();
        assert_eq!(config, ProviderConfig::default());
        assert!(config.into_client_config().credentials.is_anonymous());
    }

    #[test]
    fn test_provider_config_rejects_wrong_types() {
        let err = ProviderConfig::from_value_with_env(json!({"token": 42}), env_from(&[]))
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_empty_url_keeps_default() {
        let config = ProviderConfig {
            cspurl: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(config.into_client_config().base_url, DEFAULT_BASE_URL);
    }
}
