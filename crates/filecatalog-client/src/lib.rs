//! Client for the file catalog metadata service.
//!
//! Records are addressed two ways: by the caller-assigned `uid` and by the
//! server-assigned stable identifier (`mongo_id`). Writes are conditional on
//! a per-record concurrency token (the `ETag` of the last read). This crate
//! provides:
//!
//! - Blocking HTTP client for the `/api/files` endpoints
//! - uid → stable identifier cache, filled by list, create and get
//! - Concurrency token cache, with one implicit fetch on a cache miss
//! - Typed errors classified from the response status
//!
//! # Quick Start
//!
//! ```no_run
//! use filecatalog_client::{CatalogClient, CatalogConfig};
//! use serde_json::json;
//!
//! # fn example() -> Result<(), filecatalog_client::CatalogError> {
//! let client = CatalogClient::new(CatalogConfig::default().with_url("http://localhost:8888"))?;
//!
//! client.create(&json!({"uid": "run-42", "locations": ["/data/run-42.i3"]}))?;
//!
//! // No prior read needed: the concurrency token is fetched on demand.
//! let updated = client.update_by_uid("run-42", &json!({"backup": true}), false)?;
//! assert_eq!(updated["backup"], json!(true));
//! # Ok(())
//! # }
//! ```
//!
//! # Conflicts
//!
//! A write made with a stale token fails with a conflict
//! ([`CatalogError::is_conflict`]). It is never retried automatically; pass
//! `force_refresh = true` to re-read the token and try again.
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `FILE_CATALOG_URL` | Server root URL (default: `http://localhost:8888`) |
//! | `FILE_CATALOG_PORT` | Port override |
//! | `FILE_CATALOG_TIMEOUT` | Request timeout in seconds (default: 30) |

pub mod cache;
pub mod classify;
pub mod client;
pub mod error;
pub mod transport;
pub mod types;

// Re-export main types
pub use cache::{CatalogCache, IdentifierCache, TokenCache, TokenState};
pub use classify::classify;
pub use client::{stable_id_from_path, CatalogClient};
pub use error::{CatalogError, CatalogResult, ClassifiedError, ErrorKind};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, CATALOG_USER_AGENT};
pub use types::{
    CatalogConfig, Creation, Embedded, FileList, FileSummary, Link, Links, ListQuery, Metadata,
};
