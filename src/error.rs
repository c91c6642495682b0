//! Error types for the CSP provider.

use thiserror::Error;

use crate::schema::Diagnostic;

/// Errors returned by [`CspClient`](crate::client::CspClient) calls.
#[derive(Debug, Error)]
pub enum CspError {
    /// The base URL or a URL derived from it is not usable.
    #[error("Invalid URL: {0}")]
    Url(String),

    /// The request could not be sent or the response body could not be read
    /// (connection failure, timeout).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a status other than 200.
    #[error("status: {status}, body: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// A request body could not be serialized.
    #[error("Failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    /// A 200 response body did not match the expected shape.
    #[error("Failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
}

impl CspError {
    /// The HTTP status code, for [`CspError::Api`] errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the API reported that the addressed object does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Errors surfaced by provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// A call to the CSP API failed.
    #[error(transparent)]
    Csp(#[from] CspError),

    /// A value could not be stored into the tracked resource state.
    #[error("Failed to set attribute '{attribute}': {detail}")]
    Assignment {
        /// The attribute being written.
        attribute: String,
        /// Why the value was rejected.
        detail: String,
    },

    /// Input from the runtime failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Provider configuration is invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A resource operation arrived before `configure`.
    #[error("Provider is not configured")]
    NotConfigured,

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// The requested data source type is unknown.
    #[error("Unknown data source type: {0}")]
    UnknownDataSource(String),

    /// The resource type does not support import.
    #[error("Import not supported for resource type: {0}")]
    ImportNotSupported(String),

    /// The remote object was changed but the transition failed afterwards.
    ///
    /// `state` is the tracked state at the point of failure. It carries the
    /// id of the remote object, so the runtime should store it.
    #[error("{source}")]
    Incomplete {
        /// Partial state of the resource, including its id.
        state: Box<serde_json::Value>,
        /// The error that stopped the transition.
        #[source]
        source: Box<ProviderError>,
    },
}

impl ProviderError {
    /// The partial state to keep tracking, for [`ProviderError::Incomplete`].
    pub fn partial_state(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Incomplete { state, .. } => Some(&**state),
            _ => None,
        }
    }
}

impl From<ProviderError> for Diagnostic {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Incomplete { source, .. } => {
                let diag = Diagnostic::from(*source);
                let detail = match &diag.detail {
                    Some(detail) => format!(
                        "{} (the remote object exists; its state may be incomplete)",
                        detail
                    ),
                    None => "The remote object exists; its state may be incomplete".to_string(),
                };
                diag.with_detail(detail)
            }
            ProviderError::Assignment { ref attribute, .. } => {
                let attribute = attribute.clone();
                Diagnostic::error(err.to_string()).with_attribute(attribute)
            }
            ProviderError::Csp(CspError::Api { status, body }) => {
                Diagnostic::error(format!("CSP API returned status {}", status)).with_detail(body)
            }
            other => Diagnostic::error(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DiagnosticSeverity;

    #[test]
    fn test_api_error_display_carries_status_and_body() {
        let err = CspError::Api {
            status: 404,
            body: "role not found".to_string(),
        };
        assert_eq!(format!("{}", err), "status: 404, body: role not found");
        assert_eq!(err.status(), Some(404));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_non_api_errors_have_no_status() {
        let decode = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = CspError::Decode(decode);
        assert_eq!(err.status(), None);
        assert!(!err.is_not_found());
        assert!(format!("{}", err).starts_with("Failed to decode response body"));
    }

    #[test]
    fn test_provider_error_is_transparent_over_csp_error() {
        let err: ProviderError = CspError::Api {
            status: 401,
            body: "unauthorized".to_string(),
        }
        .into();
        assert_eq!(format!("{}", err), "status: 401, body: unauthorized");
        assert!(err.partial_state().is_none());
    }

    #[test]
    fn test_incomplete_displays_its_source() {
        let err = ProviderError::Incomplete {
            state: Box::new(serde_json::json!({"id": "viewer"})),
            source: Box::new(ProviderError::NotConfigured),
        };
        assert_eq!(format!("{}", err), "Provider is not configured");
        assert_eq!(err.partial_state().unwrap()["id"], "viewer");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::Assignment {
            attribute: "visible".to_string(),
            detail: "Expected bool, got string".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "Failed to set attribute 'visible': Expected bool, got string"
        );

        let err = ProviderError::UnknownResource("csp_group".to_string());
        assert_eq!(format!("{}", err), "Unknown resource type: csp_group");

        let err = ProviderError::UnknownDataSource("csp_groups".to_string());
        assert_eq!(format!("{}", err), "Unknown data source type: csp_groups");

        let err = ProviderError::ImportNotSupported("csp_group".to_string());
        assert_eq!(
            format!("{}", err),
            "Import not supported for resource type: csp_group"
        );

        assert_eq!(
            format!("{}", ProviderError::NotConfigured),
            "Provider is not configured"
        );
    }

    #[test]
    fn test_error_to_diagnostic() {
        let diag: Diagnostic = ProviderError::Assignment {
            attribute: "type".to_string(),
            detail: "bad".to_string(),
        }
        .into();
        assert_eq!(diag.severity, DiagnosticSeverity::Error);
        assert_eq!(diag.attribute, Some("type".to_string()));

        let diag: Diagnostic = ProviderError::Csp(CspError::Api {
            status: 500,
            body: "boom".to_string(),
        })
        .into();
        assert_eq!(diag.summary, "CSP API returned status 500");
        assert_eq!(diag.detail, Some("boom".to_string()));

        let diag: Diagnostic = ProviderError::Incomplete {
            state: Box::new(serde_json::json!({"id": "viewer"})),
            source: Box::new(ProviderError::Csp(CspError::Api {
                status: 500,
                body: "boom".to_string(),
            })),
        }
        .into();
        assert_eq!(diag.summary, "CSP API returned status 500");
        assert_eq!(
            diag.detail.as_deref(),
            Some("boom (the remote object exists; its state may be incomplete)")
        );

        let diag: Diagnostic = ProviderError::Validation("missing id".to_string()).into();
        assert_eq!(diag.summary, "Validation error: missing id");
        assert!(diag.detail.is_none());
    }
}
