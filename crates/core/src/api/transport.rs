//! Backend request description and the HTTP transport that executes it.

use std::future::Future;

use serde_json::Value;
use tracing::{debug, error};

use crate::{
    config::AppConfig,
    error::{FetchError, FetchResult},
};

/// HTTP verb of an [`ApiRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST` with a JSON body.
    Post,
}

/// Transport-agnostic description of one backend call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// HTTP verb.
    pub method: Method,
    /// Path relative to the API base URL, starting with `/`.
    pub path: String,
    /// Query parameters in order.
    pub query: Vec<(String, String)>,
    /// JSON body for `POST`.
    pub body: Option<Value>,
    /// Bearer token to attach, if signed in.
    pub bearer: Option<String>,
}

impl ApiRequest {
    /// `GET path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    /// `POST path` with `body`.
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
            bearer: None,
        }
    }

    /// Append a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }
}

/// Network collaborator that executes [`ApiRequest`]s and yields decoded JSON.
pub trait Transport: Send + Sync + 'static {
    /// Execute `request`. An empty body yields `Value::Null`.
    fn send(&self, request: ApiRequest) -> impl Future<Output = FetchResult<Value>> + Send;
}

/// reqwest-backed transport talking to the recommendation backend.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Build a client for `config.api_base_url`, honouring the optional timeout.
    pub fn new(config: &AppConfig) -> FetchResult<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("gamefinder/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL requests are joined onto.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> FetchResult<Value> {
        let url = self.url(&request.path);
        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|err| {
            error!(path = %request.path, %err, "Request failed");
            FetchError::from(err)
        })?;
        let status = response.status();
        debug!(path = %request.path, status = status.as_u16(), "Response received");

        if !status.is_success() {
            error!(path = %request.path, status = status.as_u16(), "API error");
            return Err(match status.as_u16() {
                404 => FetchError::NotFound(request.path),
                401 | 403 => FetchError::Unauthorized(request.path),
                code => FetchError::Status {
                    path: request.path,
                    status: code,
                },
            });
        }

        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_paths_without_double_slashes() {
        let config = AppConfig {
            api_base_url: "http://localhost:3000/".into(),
            ..AppConfig::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(transport.base_url(), "http://localhost:3000");
        assert_eq!(transport.url("/game/tags"), "http://localhost:3000/game/tags");
        assert_eq!(transport.url("game/42"), "http://localhost:3000/game/42");
    }

    #[test]
    fn request_builders() {
        let request = ApiRequest::get("/game/tags").with_query("count", 10);
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.query, vec![("count".to_string(), "10".to_string())]);
        assert!(request.body.is_none());

        let request = ApiRequest::post("/game/search", serde_json::json!({"tags": ["RPG"]}));
        assert_eq!(request.method, Method::Post);
        assert!(request.body.is_some());
    }
}
