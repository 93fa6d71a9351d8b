//! Blocking HTTP transport used by the client.
//!
//! The client only ever sees [`HttpResponse`]: status code, the `ETag`
//! header and the body text. Status interpretation happens in the client.

use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, ETAG, IF_NONE_MATCH, USER_AGENT};
use reqwest::Method;
use url::Url;

use crate::error::{CatalogError, CatalogResult};
use crate::types::CatalogConfig;

pub const CATALOG_USER_AGENT: &str = concat!("filecatalog-client/", env!("CARGO_PKG_VERSION"));

/// One request to the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    /// Concurrency token sent as `If-None-Match`.
    pub if_none_match: Option<String>,
    /// JSON body.
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            if_none_match: None,
            body: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.if_none_match = Some(token.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// What the client needs from a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// `ETag` header value, if any.
    pub etag: Option<String>,
    /// Body text; empty when the response had none.
    pub body: String,
}

/// Blocking request executor.
///
/// Errors returned here are connection-level failures; any response that
/// arrived, whatever its status, is returned as `Ok`.
pub trait Transport: Send + Sync + fmt::Debug {
    fn execute(&self, request: HttpRequest) -> CatalogResult<HttpResponse>;
}

/// [`Transport`] over `reqwest`'s blocking client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(config: &CatalogConfig) -> CatalogResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(CATALOG_USER_AGENT));

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| CatalogError::Transport {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: HttpRequest) -> CatalogResult<HttpResponse> {
        let mut builder = self.client.request(request.method, request.url);

        if let Some(token) = request.if_none_match {
            builder = builder.header(IF_NONE_MATCH, token);
        }

        if let Some(body) = request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.text().map_err(|e| CatalogError::Transport {
            message: format!("failed to read response body: {}", e),
        })?;

        Ok(HttpResponse { status, etag, body })
    }
}
