//! HTTP layer: URL building and expected-status checks.
//!
//! This is the ONLY place that knows methods and status codes. Any status
//! other than the one an endpoint promises goes through the classifier.

use reqwest::Method;
use tracing::debug;
use url::Url;

use crate::classify::classify;
use crate::error::{CatalogError, CatalogResult};
use crate::transport::{HttpRequest, HttpResponse, Transport};
use crate::types::{CatalogConfig, ListQuery};

const OK: u16 = 200;
const CREATED: u16 = 201;
const NO_CONTENT: u16 = 204;

/// Server-side semantics of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteMode {
    /// PATCH: merge the given fields into the record.
    Merge,
    /// PUT: overwrite the record.
    Replace,
}

impl WriteMode {
    fn method(self) -> Method {
        match self {
            Self::Merge => Method::PATCH,
            Self::Replace => Method::PUT,
        }
    }
}

/// Body of a response that carries a concurrency token.
#[derive(Debug)]
pub(crate) struct Versioned {
    pub body: String,
    pub etag: Option<String>,
}

/// HTTP backend for making requests (holds the transport and API root).
#[derive(Debug)]
pub(crate) struct HttpBackend {
    transport: Box<dyn Transport>,
    api_base: Url,
}

impl HttpBackend {
    pub(crate) fn new(
        config: &CatalogConfig,
        transport: Box<dyn Transport>,
    ) -> CatalogResult<Self> {
        Ok(Self {
            transport,
            api_base: api_base(config)?,
        })
    }

    pub(crate) fn api_base(&self) -> &Url {
        &self.api_base
    }

    /// GET /files with optional filter and paging; expects 200.
    pub(crate) fn list(&self, query: &ListQuery) -> CatalogResult<String> {
        let mut url = self.files_url()?;
        if let Some(filter) = &query.query {
            url.query_pairs_mut().append_pair("query", filter);
        }
        if let Some(limit) = query.limit {
            url.query_pairs_mut().append_pair("limit", &limit.to_string());
        }
        if let Some(start) = query.start {
            url.query_pairs_mut().append_pair("start", &start.to_string());
        }

        let response = self.exchange(HttpRequest::new(Method::GET, url), OK)?;
        Ok(response.body)
    }

    /// POST /files; expects 201.
    pub(crate) fn create(&self, body: String) -> CatalogResult<String> {
        let request = HttpRequest::new(Method::POST, self.files_url()?).with_body(body);
        let response = self.exchange(request, CREATED)?;
        Ok(response.body)
    }

    /// GET /files/{id}; expects 200.
    pub(crate) fn fetch(&self, stable_id: &str) -> CatalogResult<Versioned> {
        let request = HttpRequest::new(Method::GET, self.file_url(stable_id)?);
        let response = self.exchange(request, OK)?;
        Ok(Versioned {
            body: response.body,
            etag: response.etag,
        })
    }

    /// PATCH or PUT /files/{id} guarded by `token`; expects 200.
    pub(crate) fn write(
        &self,
        mode: WriteMode,
        stable_id: &str,
        token: &str,
        body: String,
    ) -> CatalogResult<Versioned> {
        let request = HttpRequest::new(mode.method(), self.file_url(stable_id)?)
            .with_token(token)
            .with_body(body);
        let response = self.exchange(request, OK)?;
        Ok(Versioned {
            body: response.body,
            etag: response.etag,
        })
    }

    /// DELETE /files/{id}; expects 204.
    pub(crate) fn delete(&self, stable_id: &str) -> CatalogResult<()> {
        let request = HttpRequest::new(Method::DELETE, self.file_url(stable_id)?);
        self.exchange(request, NO_CONTENT)?;
        Ok(())
    }

    fn exchange(&self, request: HttpRequest, expected: u16) -> CatalogResult<HttpResponse> {
        debug!(method = %request.method, url = %request.url, "catalog request");

        let response = self.transport.execute(request)?;
        if response.status == expected {
            return Ok(response);
        }

        debug!(
            status = response.status,
            expected = expected,
            "catalog request rejected"
        );
        Err(classify(response.status, response.body).into())
    }

    fn files_url(&self) -> CatalogResult<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| not_a_base(&self.api_base))?
            .push("files");
        Ok(url)
    }

    /// `/files/{id}` with `id` percent-encoded as one path segment.
    fn file_url(&self, stable_id: &str) -> CatalogResult<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| not_a_base(&self.api_base))?
            .push("files")
            .push(stable_id);
        Ok(url)
    }
}

/// `{url}/api`, with the configured port applied.
fn api_base(config: &CatalogConfig) -> CatalogResult<Url> {
    let mut url = Url::parse(&config.url).map_err(|e| CatalogError::Config {
        message: format!("invalid catalog URL `{}`: {}", config.url, e),
    })?;

    if let Some(port) = config.port {
        url.set_port(Some(port)).map_err(|_| CatalogError::Config {
            message: format!("cannot set port {} on `{}`", port, config.url),
        })?;
    }

    if url.cannot_be_a_base() {
        return Err(not_a_base(&url));
    }

    url.set_query(None);
    url.set_fragment(None);
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push("api");
    }
    Ok(url)
}

fn not_a_base(url: &Url) -> CatalogError {
    CatalogError::Config {
        message: format!("catalog URL `{}` cannot carry a path", url),
    }
}
