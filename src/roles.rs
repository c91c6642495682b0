//! Role operations against the CSP IAM roles-management API.
//!
//! All endpoints live under
//! `<base>/csp/gateway/iam-roles-mgmt/api/services/<scope>/roles[/<name>]`,
//! where `<scope>` is the client's service definition ID.

use reqwest::{Method, Url};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::client::CspClient;
use crate::error::CspError;

/// A CSP role: a named permission bundle within a service definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Role {
    /// Unique name within the service definition. Acts as the role's ID.
    pub name: String,
    /// Human-readable name.
    pub display_name: String,
    /// Free-form description.
    pub description: String,
    /// Whether the role is granted on access.
    pub on_access: bool,
    /// Whether the role is visible to users.
    pub visible: bool,
    /// Role type.
    #[serde(rename = "type")]
    pub role_type: String,
    /// Whether the role can be composed into other roles.
    pub composable: bool,
    /// Resource types the role may not be applied to.
    #[serde(deserialize_with = "null_as_default")]
    pub disallowed_resource_types: Vec<String>,
    /// Whether the role is bundled with the service.
    pub bundled: bool,
    /// Permissions granted by the role, in order.
    #[serde(deserialize_with = "null_as_default")]
    pub permissions: Vec<String>,
}

/// Decode JSON `null` as the type's default value.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl CspClient {
    fn roles_url(&self, name: Option<&str>) -> Result<Url, CspError> {
        let mut segments = vec![
            "csp",
            "gateway",
            "iam-roles-mgmt",
            "api",
            "services",
            self.service_definition_id(),
            "roles",
        ];
        segments.extend(name);
        self.url(segments)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&Role>,
    ) -> Result<T, CspError> {
        let mut request = self.request(method, url);
        if let Some(role) = body {
            let payload = serde_json::to_vec(role).map_err(CspError::Encode)?;
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(payload);
        }
        let body = self.execute(request).await?;
        serde_json::from_slice(&body).map_err(CspError::Decode)
    }

    /// List every role in the service definition.
    #[instrument(skip(self), fields(scope = %self.service_definition_id()))]
    pub async fn get_all_roles(&self) -> Result<Vec<Role>, CspError> {
        let roles: Vec<Role> = self
            .send_json(Method::GET, self.roles_url(None)?, None)
            .await?;
        debug!(count = roles.len(), "Listed roles");
        Ok(roles)
    }

    /// Fetch a single role by name.
    #[instrument(skip(self), fields(scope = %self.service_definition_id()))]
    pub async fn get_role(&self, name: &str) -> Result<Role, CspError> {
        self.send_json(Method::GET, self.roles_url(Some(name))?, None)
            .await
    }

    /// Create a role.
    ///
    /// Returns the role as stored by the server, which may differ from the
    /// input.
    #[instrument(skip(self, role), fields(scope = %self.service_definition_id(), name = %role.name))]
    pub async fn create_role(&self, role: &Role) -> Result<Role, CspError> {
        self.send_json(Method::POST, self.roles_url(None)?, Some(role))
            .await
    }

    /// Replace a role.
    ///
    /// The request is a `PATCH`, but the full role is always sent: callers
    /// pass the complete desired role, not a diff.
    #[instrument(skip(self, role), fields(scope = %self.service_definition_id()))]
    pub async fn update_role(&self, name: &str, role: &Role) -> Result<Role, CspError> {
        self.send_json(Method::PATCH, self.roles_url(Some(name))?, Some(role))
            .await
    }

    /// Delete a role. The response body is ignored.
    #[instrument(skip(self), fields(scope = %self.service_definition_id()))]
    pub async fn delete_role(&self, name: &str) -> Result<(), CspError> {
        let url = self.roles_url(Some(name))?;
        self.execute(self.request(Method::DELETE, url)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientConfig, Credentials};
    use serde_json::json;
    use wiremock::matchers::{bearer_token, body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ROLES: &str = "/csp/gateway/iam-roles-mgmt/api/services/svc-1/roles";

    fn viewer() -> Role {
        Role {
            name: "viewer".to_string(),
            display_name: "Viewer".to_string(),
            visible: true,
            disallowed_resource_types: vec!["cluster".to_string()],
            permissions: vec!["read".to_string()],
            ..Default::default()
        }
    }

    fn client(server: &MockServer) -> CspClient {
        CspClient::new(
            ClientConfig::new()
                .with_base_url(server.uri())
                .with_credentials(Credentials::bearer("token", "svc-1")),
        )
        .unwrap()
    }

    #[test]
    fn test_role_wire_format() {
        let value = serde_json::to_value(viewer()).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "viewer",
                "displayName": "Viewer",
                "description": "",
                "onAccess": false,
                "visible": true,
                "type": "",
                "composable": false,
                "disallowedResourceTypes": ["cluster"],
                "bundled": false,
                "permissions": ["read"],
            })
        );
    }

    #[test]
    fn test_role_decodes_sparse_and_null_fields() {
        let role: Role = serde_json::from_value(json!({
            "name": "admin",
            "type": "SERVICE",
            "disallowedResourceTypes": null,
            "permissions": null,
            "extra": 1
        }))
        .unwrap();
        assert_eq!(role.name, "admin");
        assert_eq!(role.role_type, "SERVICE");
        assert!(role.disallowed_resource_types.is_empty());
        assert!(role.permissions.is_empty());
        assert!(!role.visible);
    }

    #[test]
    fn test_roles_url() {
        let client = CspClient::new(
            ClientConfig::new()
                .with_base_url("http://localhost:19090")
                .with_credentials(Credentials::bearer("t", "svc-1")),
        )
        .unwrap();
        assert_eq!(
            client.roles_url(None).unwrap().as_str(),
            "http://localhost:19090/csp/gateway/iam-roles-mgmt/api/services/svc-1/roles"
        );
        assert_eq!(
            client.roles_url(Some("viewer")).unwrap().path(),
            "/csp/gateway/iam-roles-mgmt/api/services/svc-1/roles/viewer"
        );
    }

    #[tokio::test]
    async fn test_get_all_roles() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ROLES))
            .and(bearer_token("token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "viewer", "displayName": "Viewer"},
                {"name": "admin", "displayName": "Admin"}
            ])))
            .mount(&server)
            .await;

        let roles = client(&server).get_all_roles().await.unwrap();
        assert_eq!(roles.len(), 2);
        assert_eq!(roles[0].name, "viewer");
        assert_eq!(roles[1].display_name, "Admin");
    }

    #[tokio::test]
    async fn test_get_all_roles_empty_scope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ROLES))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let roles = client(&server).get_all_roles().await.unwrap();
        assert!(roles.is_empty());
    }

    #[tokio::test]
    async fn test_get_role_malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{}/viewer", ROLES)))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"name\": "))
            .mount(&server)
            .await;

        let err = client(&server).get_role("viewer").await.unwrap_err();
        assert!(matches!(err, CspError::Decode(_)));
    }

    #[tokio::test]
    async fn test_get_role_wrong_shape_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{}/viewer", ROLES)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"visible": "yes"})))
            .mount(&server)
            .await;

        let err = client(&server).get_role("viewer").await.unwrap_err();
        assert!(matches!(err, CspError::Decode(_)));
    }

    #[tokio::test]
    async fn test_get_role_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{}/ghost", ROLES)))
            .respond_with(ResponseTemplate::new(404).set_body_string("Role not found"))
            .mount(&server)
            .await;

        let err = client(&server).get_role("ghost").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(format!("{}", err), "status: 404, body: Role not found");
    }

    #[tokio::test]
    async fn test_create_role_returns_server_view() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ROLES))
            .and(body_json(serde_json::to_value(viewer()).unwrap()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "viewer",
                "displayName": "Viewer",
                "visible": true,
                "type": "CUSTOM",
                "disallowedResourceTypes": ["cluster"],
                "permissions": ["read"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let created = client(&server).create_role(&viewer()).await.unwrap();
        assert_eq!(created.name, "viewer");
        assert_eq!(created.role_type, "CUSTOM");
    }

    #[tokio::test]
    async fn test_update_role_sends_full_object_with_patch() {
        let server = MockServer::start().await;
        let mut role = viewer();
        role.description = "Read only".to_string();

        Mock::given(method("PATCH"))
            .and(path(format!("{}/viewer", ROLES)))
            .and(body_json(serde_json::to_value(&role).unwrap()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::to_value(&role).unwrap()),
            )
            .expect(1)
            .mount(&server)
            .await;

        let updated = client(&server).update_role("viewer", &role).await.unwrap();
        assert_eq!(updated, role);
    }

    #[tokio::test]
    async fn test_delete_role_ignores_body() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(format!("{}/viewer", ROLES)))
            .respond_with(ResponseTemplate::new(200).set_body_string("Deleted Role"))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).delete_role("viewer").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_role_error_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(format!("{}/viewer", ROLES)))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let err = client(&server).delete_role("viewer").await.unwrap_err();
        assert_eq!(err.status(), Some(403));
    }
}
