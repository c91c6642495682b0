//! CSP Provider
//!
//! An infrastructure provider that manages IAM roles in a CSP service
//! through the roles-management REST API. It exposes one resource,
//! `csp_role`, and one data source, `csp_roles`.
//!
//! # Overview
//!
//! The crate provides:
//!
//! - **HTTP client**: [`CspClient`], a thin JSON client carrying the endpoint,
//!   credentials and service-definition scope
//! - **Roles API**: list, get, create, update and delete on [`Role`] objects
//! - **Schema types**: Types describing the provider, resource and data source schemas
//! - **ProviderService trait**: The operations an orchestration runtime drives
//! - **CspProvider**: The [`ProviderService`] implementation for `csp_role`
//! - **Testing**: [`ProviderTester`](testing::ProviderTester) for driving full lifecycles
//! - **Logging**: Integration with `tracing` for structured logging
//!
//! # Quick Start
//!
//! ```ignore
//! use csp_provider::{CspProvider, ProviderService};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     csp_provider::init_logging();
//!
//!     let provider = CspProvider::new();
//!     provider
//!         .configure(json!({
//!             "cspurl": "https://csp.example.com",
//!             "token": "secret",
//!             "servicedefinitionid": "svc-1",
//!         }))
//!         .await?;
//!
//!     let state = provider
//!         .create("csp_role", json!({"name": "viewer", "display_name": "Viewer"}))
//!         .await?;
//!     assert_eq!(state["id"], "viewer");
//!     Ok(())
//! }
//! ```
//!
//! # Environment Variables
//!
//! Provider configuration left unset falls back to:
//!
//! - `CSP_URL`: base URL of the CSP service
//! - `TOKEN`: bearer token
//! - `SVC_DEF_ID`: service definition the roles are scoped to

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod provider;
pub mod resource;
pub mod roles;
pub mod schema;
pub mod service;
pub mod state;
pub mod testing;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use client::CspClient;
pub use config::{ClientConfig, Credentials, ProviderConfig};
pub use error::{CspError, ProviderError};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::CspProvider;
pub use resource::{RoleConfig, RoleResource};
pub use roles::Role;
pub use schema::ProviderSchema;
pub use service::ProviderService;
pub use state::ResourceData;
pub use types::{AttributeChange, ImportedResource, PlanResult, ProviderMetadata};
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
