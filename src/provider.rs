//! The CSP provider.
//!
//! [`CspProvider`] implements [`ProviderService`]: it builds its
//! [`CspClient`] once from the provider configuration and routes each
//! resource operation to [`RoleResource`].

use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{error, info, instrument, warn};

use crate::client::CspClient;
use crate::config::{ProviderConfig, ENV_CSP_URL, ENV_SERVICE_DEFINITION_ID, ENV_TOKEN};
use crate::error::ProviderError;
use crate::resource::{
    import_role, plan, role_schema, roles_data_source_schema, RoleResource, ROLES_DATA_SOURCE,
    ROLE_RESOURCE,
};
use crate::schema::{Attribute, Diagnostic, ProviderSchema, Schema};
use crate::service::ProviderService;
use crate::state::ResourceData;
use crate::types::{ImportedResource, PlanResult};
use crate::validation::validate;

type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Schema of the provider configuration block.
pub fn provider_config_schema() -> Schema {
    Schema::v0()
        .with_attribute(
            "cspurl",
            Attribute::optional_string()
                .with_description(format!("Base URL of the CSP API. Defaults to ${}.", ENV_CSP_URL)),
        )
        .with_attribute(
            "token",
            Attribute::optional_string()
                .with_description(format!("Bearer token. Defaults to ${}.", ENV_TOKEN))
                .sensitive(),
        )
        .with_attribute(
            "servicedefinitionid",
            Attribute::optional_string().with_description(format!(
                "Service definition the roles belong to. Defaults to ${}.",
                ENV_SERVICE_DEFINITION_ID
            )),
        )
}

/// Provider managing CSP roles.
pub struct CspProvider {
    schema: ProviderSchema,
    client: OnceCell<CspClient>,
    env: EnvLookup,
}

impl Default for CspProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CspProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CspProvider")
            .field("client", &self.client.get())
            .finish()
    }
}

impl CspProvider {
    /// Create an unconfigured provider reading defaults from the process
    /// environment.
    pub fn new() -> Self {
        Self::with_env(|key| std::env::var(key).ok())
    }

    /// Create an unconfigured provider reading defaults through `env`.
    pub fn with_env<F>(env: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            schema: ProviderSchema::new()
                .with_provider_config(provider_config_schema())
                .with_resource(ROLE_RESOURCE, role_schema())
                .with_data_source(ROLES_DATA_SOURCE, roles_data_source_schema()),
            client: OnceCell::new(),
            env: Box::new(env),
        }
    }

    /// Create a provider that is already configured with `client`.
    pub fn with_client(client: CspClient) -> Self {
        Self {
            client: OnceCell::new_with(Some(client)),
            ..Self::with_env(|_| None)
        }
    }

    /// The configured client.
    pub fn client(&self) -> Result<&CspClient, ProviderError> {
        self.client.get().ok_or(ProviderError::NotConfigured)
    }

    fn resource_schema(&self, resource_type: &str) -> Result<&Schema, ProviderError> {
        self.schema
            .resources
            .get(resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }
}

#[async_trait::async_trait]
impl ProviderService for CspProvider {
    fn schema(&self) -> ProviderSchema {
        self.schema.clone()
    }

    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&self.schema.provider, &config))
    }

    #[instrument(skip(self, config))]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let diagnostics = validate(&self.schema.provider, &config);
        if diagnostics.iter().any(Diagnostic::is_error) {
            warn!(diagnostics = diagnostics.len(), "Provider configuration is invalid");
            return Ok(diagnostics);
        }

        let config = ProviderConfig::from_value_with_env(config, |key| (self.env)(key))?;
        let client_config = config.into_client_config();
        let anonymous = client_config.credentials.is_anonymous();

        let client = match CspClient::new(client_config) {
            Ok(client) => client,
            Err(e) => {
                error!(error = %e, "Unable to create CSP client");
                let detail = if anonymous {
                    format!("Unable to create anonymous CSP client: {}", e)
                } else {
                    format!("Unable to create authenticated CSP client: {}", e)
                };
                return Ok(vec![
                    Diagnostic::error("Unable to create CSP client").with_detail(detail)
                ]);
            }
        };
        let base_url = client.base_url().to_string();

        if self.client.set(client).is_err() {
            warn!("Provider already configured; keeping the existing client");
            return Ok(vec![Diagnostic::warning("Provider already configured")
                .with_detail("The client from the first configuration is kept")]);
        }

        if anonymous {
            warn!(%base_url, "Configured anonymous CSP client");
            return Ok(vec![Diagnostic::warning("Using an anonymous CSP client")
                .with_detail("Role operations need both token and servicedefinitionid")]);
        }

        info!(%base_url, "Configured CSP client");
        Ok(vec![])
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let schema = self.resource_schema(resource_type)?;
        Ok(validate(schema, &config))
    }

    #[instrument(skip(self, prior_state, proposed_state))]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        let schema = self.resource_schema(resource_type)?;
        plan(schema, prior_state, proposed_state)
    }

    #[instrument(skip(self, planned_state))]
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        let schema = self.resource_schema(resource_type)?;
        let mut data = ResourceData::new(schema, planned_state)?;
        data.clear_id();
        if let Err(e) = RoleResource::new(self.client()?).create(&mut data).await {
            // The id is only set once the role exists remotely.
            let Some(id) = data.id().map(str::to_string) else {
                return Err(e);
            };
            warn!(%id, error = %e, "Role created but its state could not be read back");
            return Err(ProviderError::Incomplete {
                state: Box::new(data.into_state()),
                source: Box::new(e),
            });
        }
        Ok(data.into_state())
    }

    #[instrument(skip(self, current_state))]
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        let schema = self.resource_schema(resource_type)?;
        let mut data = ResourceData::new(schema, current_state)?;
        RoleResource::new(self.client()?).read(&mut data).await?;
        Ok(data.into_state())
    }

    #[instrument(skip(self, prior_state, planned_state))]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let schema = self.resource_schema(resource_type)?;
        let mut data = ResourceData::new(schema, planned_state)?.with_prior(prior_state)?;
        RoleResource::new(self.client()?).update(&mut data).await?;
        Ok(data.into_state())
    }

    #[instrument(skip(self, current_state))]
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        let schema = self.resource_schema(resource_type)?;
        let mut data = ResourceData::new(schema, current_state)?;
        RoleResource::new(self.client()?).delete(&mut data).await?;
        Ok(data.into_state())
    }

    #[instrument(skip(self))]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let schema = self.resource_schema(resource_type)?;
        Ok(vec![import_role(schema, id)?])
    }

    #[instrument(skip(self, config))]
    async fn read_data_source(
        &self,
        data_source_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let schema = self
            .schema
            .data_sources
            .get(data_source_type)
            .ok_or_else(|| ProviderError::UnknownDataSource(data_source_type.to_string()))?;
        if let Some(diag) = validate(schema, &config).into_iter().find(Diagnostic::is_error) {
            return Err(ProviderError::Validation(diag.summary));
        }
        RoleResource::new(self.client()?).list().await
    }
}
