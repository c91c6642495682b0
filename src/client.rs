//! HTTP client for the CSP API.
//!
//! [`CspClient`] holds the immutable connection settings and exposes a single
//! low-level primitive, [`CspClient::execute`], which attaches credentials,
//! sends the request and classifies the response status. Decoding response
//! bodies is left to callers (see [`crate::roles`]).

use reqwest::{Method, RequestBuilder, StatusCode, Url};
use tracing::debug;

use crate::config::{ClientConfig, Credentials};
use crate::error::CspError;

/// Client for the CSP REST API.
///
/// The configuration is fixed at construction. The client performs no
/// retries and keeps no cache.
#[derive(Debug, Clone)]
pub struct CspClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
}

impl CspClient {
    /// Build a client from its configuration.
    ///
    /// Fails with [`CspError::Url`] if the base URL is not an absolute URL
    /// that paths can be appended to.
    pub fn new(config: ClientConfig) -> Result<Self, CspError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| CspError::Url(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(CspError::Url(format!(
                "{}: cannot be used as a base URL",
                config.base_url
            )));
        }

        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            base_url,
            credentials: config.credentials,
        })
    }

    /// Build an anonymous client against the default base URL.
    pub fn anonymous() -> Result<Self, CspError> {
        Self::new(ClientConfig::default())
    }

    /// The base URL requests are made against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The credentials attached to requests.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The service definition ID roles are addressed under.
    pub fn service_definition_id(&self) -> &str {
        self.credentials.service_definition_id()
    }

    /// Append percent-encoded path segments to the base URL.
    pub fn url<I>(&self, segments: I) -> Result<Url, CspError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CspError::Url(format!("{}: cannot be used as a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Start a request with the client's transport.
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http.request(method, url)
    }

    /// Send a request and return the raw response body.
    ///
    /// `Authorization: Bearer <token>` is attached to every request; an
    /// anonymous client sends it with an empty token. The whole body is read
    /// before the status is inspected; any status other than 200 fails with
    /// [`CspError::Api`] carrying the body text.
    pub async fn execute(&self, request: RequestBuilder) -> Result<Vec<u8>, CspError> {
        let token = self.credentials.token().unwrap_or_default();
        let request = request.bearer_auth(token).build()?;
        let method = request.method().clone();
        let url = request.url().clone();

        debug!(%method, %url, "Sending CSP request");
        let response = self.http.execute(request).await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(%method, %url, status = status.as_u16(), bytes = body.len(), "CSP request completed");

        if status != StatusCode::OK {
            return Err(CspError::Api {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(body.to_vec())
    }
}
