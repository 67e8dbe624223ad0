//! HTTP transport seam: endpoint descriptors, request/response values and
//! the executor trait.

use std::fmt;
use std::sync::OnceLock;

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, ACCEPT};
use url::Url;

use crate::error::OAuthError;

pub use reqwest::Method;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(reqwest::Client::new)
}

/// A provider endpoint: base URI plus resource path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub base_uri: String,
    pub resource: String,
}

impl Endpoint {
    pub fn new(base_uri: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            base_uri: base_uri.into(),
            resource: resource.into(),
        }
    }

    /// Same resource against another base URI (used to point adapters at test servers).
    pub fn rebased(&self, base_uri: impl Into<String>) -> Self {
        Self::new(base_uri, self.resource.clone())
    }

    pub fn uri(&self) -> String {
        let base = self.base_uri.trim_end_matches('/');
        let resource = self.resource.trim_start_matches('/');
        if resource.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{resource}")
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

/// An outbound request before execution.
///
/// Hooks mutate this value; the transport turns it into a wire request.
#[derive(Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub endpoint: Endpoint,
    pub query: Vec<(String, String)>,
    /// Sent as `application/x-www-form-urlencoded` when non-empty.
    pub form: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub basic_auth: Option<(String, String)>,
}

impl fmt::Debug for HttpRequest {
    // Parameter values carry secrets; only names are printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |pairs: &[(String, String)]| -> Vec<String> {
            pairs.iter().map(|(k, _)| k.clone()).collect()
        };
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("endpoint", &self.endpoint.uri())
            .field("query", &names(&self.query))
            .field("form", &names(&self.form))
            .field("headers", &names(&self.headers))
            .field("basic_auth", &self.basic_auth.as_ref().map(|_| ".."))
            .finish()
    }
}

impl HttpRequest {
    pub fn new(method: Method, endpoint: Endpoint) -> Self {
        Self {
            method,
            endpoint,
            query: Vec::new(),
            form: Vec::new(),
            headers: Vec::new(),
            basic_auth: None,
        }
    }

    pub fn get(endpoint: Endpoint) -> Self {
        Self::new(Method::GET, endpoint)
    }

    pub fn post(endpoint: Endpoint) -> Self {
        Self::new(Method::POST, endpoint)
    }

    pub fn add_query(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn add_form(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.form.push((name.into(), value.into()));
        self
    }

    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn set_basic_auth(
        &mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> &mut Self {
        self.basic_auth = Some((username.into(), password.into()));
        self
    }

    /// Remove every form parameter with the given name.
    pub fn remove_form(&mut self, name: &str) -> &mut Self {
        self.form.retain(|(k, _)| k != name);
        self
    }

    pub fn form_value(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Final URL with query parameters appended in insertion order.
    pub fn build_uri(&self) -> Result<Url, OAuthError> {
        let mut url = Url::parse(&self.endpoint.uri())?;
        if !self.query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(self.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }
}

/// A completed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Executes provider requests.
///
/// Timeouts and retries belong to implementations; the client never retries.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Execute the request and return whatever status the server sent.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, OAuthError>;

    /// Execute and fail with [`OAuthError::Transport`] on any non-2xx status.
    async fn execute_and_verify(&self, request: HttpRequest) -> Result<HttpResponse, OAuthError> {
        let response = self.execute(request).await?;
        if !response.is_success() {
            return Err(OAuthError::status(response.status, response.body));
        }
        Ok(response)
    }
}

/// Default transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(shared_client().clone())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, OAuthError> {
        let url = request.build_uri()?;
        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .header(ACCEPT, "application/json");
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| OAuthError::Configuration(format!("invalid header {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| OAuthError::Configuration(format!("invalid header value: {e}")))?;
            builder = builder.header(name, value);
        }
        if let Some((username, password)) = &request.basic_auth {
            builder = builder.basic_auth(username, Some(password));
        }
        if !request.form.is_empty() {
            builder = builder.form(&request.form);
        }

        tracing::debug!(
            method = %request.method,
            endpoint = %request.endpoint,
            "executing provider request"
        );
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        tracing::debug!(status, endpoint = %request.endpoint, "provider responded");
        Ok(HttpResponse { status, body })
    }
}
