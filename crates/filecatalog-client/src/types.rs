//! Request and response types for the file catalog API.

use serde::{Deserialize, Deserializer, Serialize};

/// A metadata document: open-ended JSON object that always carries `uid`.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Hyperlink in a `_links` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
}

/// `_links` block carried by list and creation responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Links {
    #[serde(rename = "self", default)]
    pub self_link: Option<Link>,

    #[serde(default)]
    pub parent: Option<Link>,
}

/// uid / stable identifier pair from a list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    /// Server-assigned stable identifier.
    pub mongo_id: String,

    /// Caller-assigned logical identifier. Numbers and booleans are read as
    /// their text; any other non-string value leaves this `None`.
    #[serde(default, deserialize_with = "lenient_uid")]
    pub uid: Option<String>,
}

fn lenient_uid<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(uid) => Some(uid),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// `_embedded` block of a list response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embedded {
    #[serde(default)]
    pub files: Vec<FileSummary>,
}

/// Response from GET /api/files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileList {
    #[serde(rename = "_links", default)]
    pub links: Links,

    #[serde(rename = "_embedded", default)]
    pub embedded: Embedded,

    /// Reference paths of the listed records (`/api/files/{id}`).
    #[serde(default)]
    pub files: Vec<String>,
}

/// Response from POST /api/files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creation {
    #[serde(rename = "_links", default)]
    pub links: Links,

    /// Reference path of the new record.
    pub file: String,
}

/// Filter and paging for [`crate::CatalogClient::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// JSON filter string, e.g. `{"uid": "abc"}`.
    pub query: Option<String>,

    /// Maximum number of entries. Passed through unchecked; the server
    /// rejects negative values.
    pub limit: Option<i64>,

    /// Offset of the first entry.
    pub start: Option<i64>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter on one exact uid.
    pub fn for_uid(uid: &str) -> Self {
        Self::new().with_filter(&serde_json::json!({ "uid": uid }))
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_filter(self, filter: &serde_json::Value) -> Self {
        self.with_query(filter.to_string())
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_start(mut self, start: i64) -> Self {
        self.start = Some(start);
        self
    }
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Server root; the API lives under `{url}/api`.
    #[serde(default = "default_catalog_url")]
    pub url: String,

    /// Overrides the port of `url`.
    #[serde(default)]
    pub port: Option<u16>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_catalog_url() -> String {
    "http://localhost:8888".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: default_catalog_url(),
            port: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl CatalogConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `FILE_CATALOG_URL` | Server root URL |
    /// | `FILE_CATALOG_PORT` | Port override |
    /// | `FILE_CATALOG_TIMEOUT` | Request timeout in seconds |
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("FILE_CATALOG_URL").unwrap_or_else(|_| default_catalog_url()),
            port: std::env::var("FILE_CATALOG_PORT")
                .ok()
                .and_then(|v| v.parse().ok()),
            timeout_secs: std::env::var("FILE_CATALOG_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_timeout),
        }
    }

    /// Set the server URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the request timeout.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}
