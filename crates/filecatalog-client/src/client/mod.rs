//! Catalog client: uid resolution and conditional writes over cached state.
//!
//! Public API: no status code knowledge. All HTTP/status mapping in http.rs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::CatalogCache;
use crate::error::{CatalogError, CatalogResult};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{CatalogConfig, Creation, FileList, ListQuery, Metadata};

mod helpers;
mod http;

pub use helpers::stable_id_from_path;

use helpers::{decode, find_uid, require_document, require_stable_id};
use http::{HttpBackend, Versioned, WriteMode};

/// Client for the file catalog.
///
/// Every operation blocks until its round-trips complete. The identifier
/// and token caches sit behind one mutex, which is never held across a
/// request, so a client may be shared between threads.
///
/// Writes and deletes of the same stable identifier are serialized: the
/// token fetch, the write and the token store happen as one step with
/// respect to other callers on this client.
#[derive(Debug)]
pub struct CatalogClient {
    http: HttpBackend,
    cache: Mutex<CatalogCache>,
    /// One lock per stable identifier ever written or deleted.
    record_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CatalogClient {
    pub fn new(config: CatalogConfig) -> CatalogResult<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(config, transport)
    }

    pub fn with_transport(
        config: CatalogConfig,
        transport: impl Transport + 'static,
    ) -> CatalogResult<Self> {
        Ok(Self {
            http: HttpBackend::new(&config, Box::new(transport))?,
            cache: Mutex::new(CatalogCache::new()),
            record_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn from_env() -> CatalogResult<Self> {
        Self::new(CatalogConfig::from_env())
    }

    /// List records, caching every uid / stable identifier pair returned.
    pub fn list(&self, query: &ListQuery) -> CatalogResult<FileList> {
        let body = self.http.list(query)?;
        let list: FileList = decode(&body, "file list")?;

        let mut cache = self.cache();
        for summary in &list.embedded.files {
            match &summary.uid {
                Some(uid) => cache.ids.set(uid.as_str(), summary.mongo_id.as_str()),
                None => {
                    warn!(stable_id = %summary.mongo_id, "listed record has no usable uid")
                }
            }
        }
        debug!(entries = list.embedded.files.len(), "cached listed uids");

        Ok(list)
    }

    /// Create a record. `metadata` must be a non-empty object with a
    /// string `uid`.
    pub fn create(&self, metadata: &Value) -> CatalogResult<Creation> {
        let document = require_document(metadata)?;
        let uid = find_uid(document)
            .ok_or_else(|| CatalogError::precondition("metadata has no string `uid`"))?;

        let body = self.http.create(metadata.to_string())?;
        let creation: Creation = decode(&body, "creation response")?;
        let stable_id = stable_id_from_path(&creation.file)?;

        debug!(uid = %uid, stable_id = %stable_id, "created record");
        self.cache().ids.set(uid, stable_id);

        Ok(creation)
    }

    /// Fetch a record and remember its concurrency token.
    ///
    /// A response without a token fails with
    /// [`CatalogError::TokenUnavailable`]; later writes depend on it.
    pub fn get(&self, stable_id: &str) -> CatalogResult<Metadata> {
        require_stable_id(stable_id)?;

        let Versioned { body, etag } = self.http.fetch(stable_id)?;
        let Some(etag) = etag else {
            self.cache().tokens.set(stable_id, None);
            return Err(CatalogError::TokenUnavailable {
                id: stable_id.to_string(),
                message: "the server responded without an etag".to_string(),
            });
        };

        let metadata: Metadata = decode(&body, "metadata")?;
        let uid = find_uid(&metadata).ok_or_else(|| {
            CatalogError::invalid_response("cannot find `uid` in server response")
        })?;

        let mut cache = self.cache();
        cache.tokens.set(stable_id, Some(etag));
        cache.ids.set(uid, stable_id);
        drop(cache);

        Ok(metadata)
    }

    pub fn get_by_uid(&self, uid: &str) -> CatalogResult<Metadata> {
        let stable_id = self.resolve_uid(uid)?;
        self.get(&stable_id)
    }

    /// Merge `metadata` into the record (PATCH).
    ///
    /// With `force_refresh` the cached token is discarded and re-read
    /// first; that is the recovery for a conflict caused by a stale token.
    pub fn update(
        &self,
        stable_id: &str,
        metadata: &Value,
        force_refresh: bool,
    ) -> CatalogResult<Metadata> {
        self.conditional_write(WriteMode::Merge, stable_id, metadata, force_refresh)
    }

    pub fn update_by_uid(
        &self,
        uid: &str,
        metadata: &Value,
        force_refresh: bool,
    ) -> CatalogResult<Metadata> {
        let stable_id = self.resolve_uid(uid)?;
        self.update(&stable_id, metadata, force_refresh)
    }

    /// Overwrite the record with `metadata` (PUT). Token handling as
    /// [`CatalogClient::update`].
    pub fn replace(
        &self,
        stable_id: &str,
        metadata: &Value,
        force_refresh: bool,
    ) -> CatalogResult<Metadata> {
        self.conditional_write(WriteMode::Replace, stable_id, metadata, force_refresh)
    }

    pub fn replace_by_uid(
        &self,
        uid: &str,
        metadata: &Value,
        force_refresh: bool,
    ) -> CatalogResult<Metadata> {
        let stable_id = self.resolve_uid(uid)?;
        self.replace(&stable_id, metadata, force_refresh)
    }

    /// Delete a record and everything cached about it.
    pub fn delete(&self, stable_id: &str) -> CatalogResult<()> {
        require_stable_id(stable_id)?;

        let record_lock = self.record_lock(stable_id);
        let _serialized = record_lock.lock().unwrap_or_else(PoisonError::into_inner);

        self.http.delete(stable_id)?;
        self.cache().clear_by_stable_id(stable_id);
        debug!(stable_id = %stable_id, "deleted record, cache cleared");

        Ok(())
    }

    pub fn delete_by_uid(&self, uid: &str) -> CatalogResult<()> {
        let stable_id = self.resolve_uid(uid)?;
        self.delete(&stable_id)
    }

    /// Stable identifier for `uid`: from the cache, else from one list
    /// call filtered on that uid.
    pub fn resolve_uid(&self, uid: &str) -> CatalogResult<String> {
        if let Some(stable_id) = self.cached_stable_id(uid) {
            return Ok(stable_id);
        }

        debug!(uid = %uid, "uid not cached, querying catalog");
        self.list(&ListQuery::for_uid(uid))?;

        self.cached_stable_id(uid)
            .ok_or_else(|| CatalogError::UidNotResolvable {
                uid: uid.to_string(),
            })
    }

    pub fn cached_stable_id(&self, uid: &str) -> Option<String> {
        self.cache().ids.get(uid).map(String::from)
    }

    pub fn cached_token(&self, stable_id: &str) -> Option<String> {
        self.cache().tokens.get(stable_id).map(String::from)
    }

    /// API root, e.g. `http://localhost:8888/api`.
    pub fn base_url(&self) -> &str {
        self.http.api_base().as_str()
    }

    fn conditional_write(
        &self,
        mode: WriteMode,
        stable_id: &str,
        metadata: &Value,
        force_refresh: bool,
    ) -> CatalogResult<Metadata> {
        require_stable_id(stable_id)?;
        require_document(metadata)?;

        let record_lock = self.record_lock(stable_id);
        let _serialized = record_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if force_refresh {
            debug!(stable_id = %stable_id, "evicting cached token");
            self.cache().tokens.delete(stable_id);
        }

        let token = self.acquire_token(stable_id)?;

        let Versioned { body, etag } = self
            .http
            .write(mode, stable_id, &token, metadata.to_string())
            .inspect_err(|e| {
                if e.is_conflict() {
                    warn!(
                        stable_id = %stable_id,
                        error = %e,
                        "conditional write rejected; retry with force_refresh"
                    );
                }
            })?;

        // The token sent with the write is spent either way.
        self.cache().tokens.set(stable_id, etag.clone());
        if etag.is_none() {
            return Err(CatalogError::TokenUnavailable {
                id: stable_id.to_string(),
                message: "the server responded to a write without an etag".to_string(),
            });
        }

        decode(&body, "metadata")
    }

    /// Cached token, or one `get` to obtain it.
    fn acquire_token(&self, stable_id: &str) -> CatalogResult<String> {
        if let Some(token) = self.cached_token(stable_id) {
            return Ok(token);
        }

        debug!(stable_id = %stable_id, "no cached token, fetching record");
        self.get(stable_id)?;

        self.cached_token(stable_id)
            .ok_or_else(|| CatalogError::TokenUnavailable {
                id: stable_id.to_string(),
                message: "no etag cached after fetching the record".to_string(),
            })
    }

    fn cache(&self) -> MutexGuard<'_, CatalogCache> {
        // The maps are consistent after every statement, so a poisoned
        // guard is still usable.
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_lock(&self, stable_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.record_locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(stable_id.to_string()).or_default())
    }
}
