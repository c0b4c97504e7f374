//! Authenticated HTTP session.
//!
//! [`AuthSession::request`] is the single entry point every other part of the
//! client uses to reach the portal. It authenticates lazily and, when a
//! cached session turns out to have expired, logs in again and retries the
//! request exactly once.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, Response, StatusCode};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, trace};
use url::Url;

use crate::auth::AuthPolicy;
use crate::cookie_jar::CookieJar;
use crate::error::{Result, VinfraError};

/// Per-request timeout for a single HTTP exchange
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Header carrying the project-scoped token
pub const PROJECT_TOKEN_HEADER: &str = "X-Auth-Token";

/// What to send besides method and path
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub json: Option<Value>,
    pub authenticated: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        RequestOptions {
            query: Vec::new(),
            json: None,
            authenticated: true,
        }
    }
}

impl RequestOptions {
    pub fn unauthenticated() -> Self {
        RequestOptions {
            authenticated: false,
            ..Default::default()
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_json(mut self, body: Value) -> Self {
        self.json = Some(body);
        self
    }
}

/// HTTP client, portal address and the cookie jar they share
#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
    base_url: Url,
    jar: Arc<CookieJar>,
}

impl Transport {
    pub fn new(base_url: Url, insecure: bool) -> Result<Self> {
        Self::with_timeout(base_url, insecure, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: Url, insecure: bool, timeout: Duration) -> Result<Self> {
        let jar = Arc::new(CookieJar::new());
        let client = reqwest::Client::builder()
            .user_agent(concat!("vinfra/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .cookie_provider(jar.clone())
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(|e| VinfraError::Client(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Transport {
            client,
            base_url,
            jar,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn jar(&self) -> &CookieJar {
        &self.jar
    }

    /// Whether the jar holds cookies the portal would accept as a session
    pub fn has_session(&self) -> bool {
        self.jar.has_cookies_for_host(&self.base_url)
    }

    /// Absolute URL for an API path such as `api/v2/tasks/42`
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| VinfraError::Client(format!("Invalid portal URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(path.split('/').filter(|segment| !segment.is_empty()));
        Ok(url)
    }

    /// Send one request. Non-success statuses become [`VinfraError::Http`].
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        options: &RequestOptions,
        project_token: Option<&str>,
    ) -> Result<Response> {
        let url = self.endpoint(path)?;
        trace!("{} {}", method, url);

        let mut request = self.client.request(method, url);
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        if let Some(body) = &options.json {
            request = request.json(body);
        }
        if let Some(token) = project_token {
            request = request.header(PROJECT_TOKEN_HEADER, token);
        }

        let response = request.send().await?;
        let status = response.status();
        trace!("Response status: {}", status);

        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(VinfraError::http(status, &body))
        }
    }
}

/// Transport plus authentication policy
pub struct AuthSession {
    transport: Transport,
    policy: Mutex<Box<dyn AuthPolicy>>,
}

impl AuthSession {
    pub fn new(transport: Transport, policy: impl AuthPolicy + 'static) -> Self {
        AuthSession {
            transport,
            policy: Mutex::new(Box::new(policy)),
        }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Log in unconditionally, replacing whatever session is cached
    pub async fn login(&self) -> Result<()> {
        self.policy.lock().await.make_authenticate(&self.transport).await
    }

    /// Authenticate if needed. Returns the project token to send and whether
    /// a fresh login happened during this call.
    async fn ensure_authenticated(&self) -> Result<(Option<String>, bool)> {
        let mut policy = self.policy.lock().await;
        let mut fresh_login = false;
        if policy.needs_reauthenticate(&self.transport).await? {
            policy.make_authenticate(&self.transport).await?;
            fresh_login = true;
        }
        Ok((policy.project_token().map(str::to_string), fresh_login))
    }

    /// Issue a request against the portal.
    ///
    /// A 401 on an authenticated request is retried once, after a new login,
    /// but only when the policy keeps a session cache on disk and one exists
    /// from an earlier login. A 401 right after a fresh login, on an
    /// unauthenticated request, or on the retry itself is returned as is.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Response> {
        if !options.authenticated {
            return self.transport.send(method, path, &options, None).await;
        }

        let (token, fresh_login) = self.ensure_authenticated().await?;
        let first = self
            .transport
            .send(method.clone(), path, &options, token.as_deref())
            .await;

        match first {
            Err(error) if error.is_status(StatusCode::UNAUTHORIZED) && !fresh_login => {
                let mut policy = self.policy.lock().await;
                if !policy.has_cached_session() {
                    return Err(error);
                }

                debug!("Session expired, authenticating again...");
                policy.make_authenticate(&self.transport).await?;
                let token = policy.project_token().map(str::to_string);
                drop(policy);

                self.transport
                    .send(method, path, &options, token.as_deref())
                    .await
            }
            other => other,
        }
    }

    pub async fn request_json(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Value> {
        let response = self.request(method, path, options).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    pub async fn get_json(&self, path: &str, options: RequestOptions) -> Result<Value> {
        self.request_json(Method::GET, path, options).await
    }

    pub async fn post_json(&self, path: &str, body: Value) -> Result<Value> {
        self.request_json(Method::POST, path, RequestOptions::default().with_json(body))
            .await
    }

    pub async fn delete_json(&self, path: &str) -> Result<Value> {
        self.request_json(Method::DELETE, path, RequestOptions::default())
            .await
    }
}
