//! The `csp_role` resource and the `csp_roles` data source.
//!
//! [`RoleResource`] drives the lifecycle transitions of one role instance:
//! it reads the instance's configuration into a typed [`RoleConfig`], calls
//! the role endpoints through [`CspClient`], and writes the server's view of
//! the role back into the tracked [`ResourceData`].

use std::collections::BTreeSet;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::client::CspClient;
use crate::error::ProviderError;
use crate::roles::Role;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};
use crate::state::ResourceData;
use crate::types::{AttributeChange, ImportedResource, PlanResult};

/// Resource type name of a CSP role.
pub const ROLE_RESOURCE: &str = "csp_role";

/// Data source type name listing the roles of a service definition.
pub const ROLES_DATA_SOURCE: &str = "csp_roles";

/// Computed attribute stamped on every applied update.
pub const LAST_UPDATED: &str = "last_updated";

/// `time.RFC850` layout: `Monday, 02-Jan-06 15:04:05 UTC`.
const RFC850: &str = "%A, %d-%b-%y %H:%M:%S %Z";

/// Attributes whose change triggers an update call.
const UPDATE_TRIGGERS: &[&str] = &[
    "name",
    "display_name",
    "description",
    "visible",
    "type",
    "on_access",
    "composable",
    "disallowed_resource_types",
];

fn string_set() -> AttributeType {
    AttributeType::set(AttributeType::String)
}

fn string_list() -> AttributeType {
    AttributeType::list(AttributeType::String)
}

/// Schema of the `csp_role` resource.
pub fn role_schema() -> Schema {
    Schema::v0()
        .with_description("A role within a CSP service definition")
        .with_attribute("id", Attribute::computed_string())
        .with_attribute(
            "name",
            Attribute::required_string()
                .with_description("Unique role name; changing it replaces the role")
                .with_force_new(),
        )
        .with_attribute("display_name", Attribute::required_string())
        .with_attribute("description", Attribute::optional_string())
        .with_attribute("on_access", Attribute::optional_bool())
        .with_attribute("visible", Attribute::optional_bool())
        .with_attribute("type", Attribute::optional_string())
        .with_attribute("composable", Attribute::optional_bool())
        .with_attribute("bundled", Attribute::optional_bool())
        .with_attribute(
            "disallowed_resource_types",
            Attribute::new(string_set(), AttributeFlags::optional()),
        )
        .with_attribute(
            "permissions",
            Attribute::new(string_list(), AttributeFlags::optional()),
        )
        .with_attribute(LAST_UPDATED, Attribute::computed_string())
}

/// Schema of the `csp_roles` data source.
pub fn roles_data_source_schema() -> Schema {
    let role = AttributeType::object([
        ("name", AttributeType::String),
        ("display_name", AttributeType::String),
        ("description", AttributeType::String),
        ("on_access", AttributeType::Bool),
        ("visible", AttributeType::Bool),
        ("type", AttributeType::String),
        ("composable", AttributeType::Bool),
        ("bundled", AttributeType::Bool),
        ("disallowed_resource_types", string_set()),
        ("permissions", string_list()),
    ]);
    Schema::v0()
        .with_description("All roles of the configured service definition")
        .with_attribute("id", Attribute::computed_string())
        .with_attribute("service_definition_id", Attribute::computed_string())
        .with_attribute(
            "roles",
            Attribute::new(AttributeType::list(role), AttributeFlags::computed()),
        )
}

/// Writable attributes of a `csp_role`, read from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RoleConfig {
    /// Role name.
    pub name: String,
    /// Display name.
    pub display_name: String,
    /// Description.
    pub description: String,
    /// Granted on access.
    pub on_access: bool,
    /// Visible to users.
    pub visible: bool,
    /// Role type.
    #[serde(rename = "type")]
    pub role_type: String,
    /// Composable into other roles.
    pub composable: bool,
    /// Bundled with the service.
    pub bundled: bool,
    /// Disallowed resource types.
    pub disallowed_resource_types: BTreeSet<String>,
    /// Permissions, in order.
    pub permissions: Vec<String>,
}

impl From<RoleConfig> for Role {
    fn from(config: RoleConfig) -> Self {
        Role {
            name: config.name,
            display_name: config.display_name,
            description: config.description,
            on_access: config.on_access,
            visible: config.visible,
            role_type: config.role_type,
            composable: config.composable,
            bundled: config.bundled,
            disallowed_resource_types: config.disallowed_resource_types.into_iter().collect(),
            permissions: config.permissions,
        }
    }
}

/// The tracked attributes of a role, in schema naming.
pub fn role_attributes(role: &Role) -> Vec<(&'static str, Value)> {
    vec![
        ("name", json!(role.name)),
        ("display_name", json!(role.display_name)),
        ("description", json!(role.description)),
        ("visible", json!(role.visible)),
        ("type", json!(role.role_type)),
        ("on_access", json!(role.on_access)),
        ("composable", json!(role.composable)),
        ("bundled", json!(role.bundled)),
        (
            "disallowed_resource_types",
            json!(dedup(&role.disallowed_resource_types)),
        ),
        ("permissions", json!(role.permissions)),
    ]
}

// The API returns the set as a list; keep first occurrences.
fn dedup(items: &[String]) -> Vec<&String> {
    let mut seen = BTreeSet::new();
    items.iter().filter(|item| seen.insert(*item)).collect()
}

/// Lifecycle transitions of `csp_role` instances.
#[derive(Debug, Clone, Copy)]
pub struct RoleResource<'a> {
    client: &'a CspClient,
}

impl<'a> RoleResource<'a> {
    /// Operate through `client`.
    pub fn new(client: &'a CspClient) -> Self {
        Self { client }
    }

    /// Create the role described by `data`'s configuration.
    ///
    /// The tracked id becomes the name the server returns, then the state
    /// is refreshed with [`RoleResource::read`].
    pub async fn create(&self, data: &mut ResourceData<'_>) -> Result<(), ProviderError> {
        let role: Role = data.decode::<RoleConfig>()?.into();
        let created = self.client.create_role(&role).await?;
        info!(name = %created.name, "Created role");

        data.set_id(created.name);
        self.read(data).await
    }

    /// Refresh every tracked attribute from the server.
    pub async fn read(&self, data: &mut ResourceData<'_>) -> Result<(), ProviderError> {
        let id = data.require_id()?.to_string();
        let role = self.client.get_role(&id).await?;
        debug!(name = %id, "Read role");

        for (key, value) in role_attributes(&role) {
            data.set(key, value)?;
        }
        Ok(())
    }

    /// Push configuration changes, then refresh.
    ///
    /// The update call is skipped when none of the update-triggering
    /// attributes changed. The full role is always sent.
    pub async fn update(&self, data: &mut ResourceData<'_>) -> Result<(), ProviderError> {
        if data.has_changes(UPDATE_TRIGGERS) {
            let id = data.require_id()?.to_string();
            let role: Role = data.decode::<RoleConfig>()?.into();
            self.client.update_role(&id, &role).await?;
            info!(name = %id, "Updated role");

            data.set(LAST_UPDATED, Utc::now().format(RFC850).to_string())?;
        } else {
            debug!("No update-triggering changes; skipping update call");
        }

        self.read(data).await
    }

    /// Delete the role and clear the tracked id.
    pub async fn delete(&self, data: &mut ResourceData<'_>) -> Result<(), ProviderError> {
        let id = data.require_id()?.to_string();
        self.client.delete_role(&id).await?;
        info!(name = %id, "Deleted role");

        data.clear_id();
        Ok(())
    }

    /// List every role of the client's service definition as data source
    /// state.
    pub async fn list(&self) -> Result<Value, ProviderError> {
        let roles = self.client.get_all_roles().await?;
        let scope = self.client.service_definition_id();
        let roles: Vec<Value> = roles
            .iter()
            .map(|role| Value::Object(
                role_attributes(role)
                    .into_iter()
                    .map(|(key, value)| (key.to_string(), value))
                    .collect(),
            ))
            .collect();

        Ok(json!({
            "id": scope,
            "service_definition_id": scope,
            "roles": roles,
        }))
    }
}

/// Import a role by name. The id is used as-is.
pub fn import_role(schema: &Schema, id: &str) -> Result<ImportedResource, ProviderError> {
    let mut data = ResourceData::new(schema, Value::Null)?;
    data.set_id(id);
    Ok(ImportedResource::new(ROLE_RESOURCE, data.into_state()))
}

/// Plan a transition from `prior` to `proposed`.
///
/// - No prior state: every configured attribute is added; computed
///   attributes are unknown (null) until apply.
/// - Null proposed state: every prior attribute is removed.
/// - Otherwise each non-computed attribute is compared as in
///   [`ResourceData::has_change`], computed attributes are carried over
///   from the prior state, and a change to a `force_new` attribute requires
///   replacement.
pub fn plan(
    schema: &Schema,
    prior: Option<Value>,
    proposed: Value,
) -> Result<PlanResult, ProviderError> {
    let Some(prior) = prior.filter(|p| !p.is_null()) else {
        let mut planned = into_map(proposed)?;
        let mut changes = Vec::new();
        for (name, attr) in &schema.attributes {
            if attr.flags.is_computed_only() {
                planned.insert(name.clone(), Value::Null);
            } else if let Some(value) = planned.get(name).filter(|v| !v.is_null()) {
                changes.push(AttributeChange::added(name.clone(), value.clone()));
            }
        }
        return Ok(PlanResult::with_changes(
            Value::Object(planned),
            changes,
            false,
        ));
    };

    if proposed.is_null() {
        let changes = into_map(prior)?
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(name, value)| AttributeChange::removed(name, value))
            .collect();
        return Ok(PlanResult::with_changes(Value::Null, changes, false));
    }

    let prior_map = into_map(prior.clone())?;
    let mut planned = into_map(proposed.clone())?;
    let data = ResourceData::new(schema, proposed)?.with_prior(prior)?;

    let mut changes = Vec::new();
    let mut requires_replace = false;
    for (name, attr) in &schema.attributes {
        if attr.flags.is_computed_only() {
            let carried = prior_map.get(name).cloned().unwrap_or(Value::Null);
            planned.insert(name.clone(), carried);
        } else if data.has_change(name) {
            requires_replace |= attr.force_new;
            changes.push(AttributeChange::new(
                name.clone(),
                prior_map.get(name).cloned(),
                planned.get(name).cloned(),
            ));
        }
    }

    if changes.is_empty() {
        return Ok(PlanResult::no_change(Value::Object(planned)));
    }
    Ok(PlanResult::with_changes(
        Value::Object(planned),
        changes,
        requires_replace,
    ))
}

fn into_map(value: Value) -> Result<serde_json::Map<String, Value>, ProviderError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(serde_json::Map::new()),
        other => Err(ProviderError::Validation(format!(
            "expected state object, got {}",
            other
        ))),
    }
}
