//! The interface an orchestration runtime drives.
//!
//! A runtime owns the declarative configuration and the stored state of
//! every resource instance. It calls into a [`ProviderService`] for each
//! lifecycle transition, passing state as JSON, and stores whatever comes
//! back. Errors are terminal for the transition that raised them.

use crate::error::ProviderError;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::types::{ImportedResource, PlanResult, ProviderMetadata};

/// Operations a provider exposes to the runtime.
///
/// # Example
///
/// ```ignore
/// use csp_provider::{CspProvider, ProviderService};
/// use serde_json::json;
///
/// let provider = CspProvider::new();
/// provider.configure(json!({"token": "t", "servicedefinitionid": "svc"})).await?;
/// let state = provider
///     .create("csp_role", json!({"name": "viewer", "display_name": "Viewer"}))
///     .await?;
/// assert_eq!(state["id"], "viewer");
/// ```
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Return the provider's schema including all resources and data sources.
    fn schema(&self) -> ProviderSchema;

    /// Return the resource and data source names.
    /// By default, this is derived from the schema.
    fn metadata(&self) -> ProviderMetadata {
        let schema = self.schema();
        ProviderMetadata {
            resources: schema.resources.keys().cloned().collect(),
            data_sources: schema.data_sources.keys().cloned().collect(),
        }
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate the provider configuration before configuring.
    async fn validate_provider_config(
        &self,
        config: serde_json::Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = config;
        Ok(vec![])
    }

    /// Configure the provider with credentials and settings.
    async fn configure(&self, config: serde_json::Value) -> Result<Vec<Diagnostic>, ProviderError>;

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource's configuration before planning.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: serde_json::Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let _ = (resource_type, config);
        Ok(vec![])
    }

    /// Plan changes for a resource.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<serde_json::Value>,
        proposed_state: serde_json::Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create a new resource; returns its state.
    async fn create(
        &self,
        resource_type: &str,
        planned_state: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError>;

    /// Read the current state of a resource.
    async fn read(
        &self,
        resource_type: &str,
        current_state: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError>;

    /// Update an existing resource; returns its new state.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: serde_json::Value,
        planned_state: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError>;

    /// Delete a resource; returns the cleared state.
    async fn delete(
        &self,
        resource_type: &str,
        current_state: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError>;

    /// Bring an existing object under management by id.
    async fn import_resource(
        &self,
        resource_type: &str,
        _id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        Err(ProviderError::ImportNotSupported(resource_type.to_string()))
    }

    // =========================================================================
    // Data Source Operations
    // =========================================================================

    /// Read data from an external source.
    async fn read_data_source(
        &self,
        data_source_type: &str,
        _config: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError> {
        Err(ProviderError::UnknownDataSource(data_source_type.to_string()))
    }
}
