//! Pure helpers: identifier extraction and payload checks (no HTTP).

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{CatalogError, CatalogResult};
use crate::types::Metadata;

/// Stable identifier from a reference path such as `/api/files/{id}`.
///
/// Fails when the path has no `/` or ends with one.
pub fn stable_id_from_path(path: &str) -> CatalogResult<String> {
    match path.rsplit_once('/') {
        Some((_, id)) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(CatalogError::invalid_response(format!(
            "reference path `{}` does not end in a stable identifier",
            path
        ))),
    }
}

/// The `uid` field of a metadata document, if it is a string.
pub(crate) fn find_uid(metadata: &Metadata) -> Option<&str> {
    metadata.get("uid").and_then(Value::as_str)
}

/// Metadata arguments must be non-empty JSON objects.
pub(crate) fn require_document(metadata: &Value) -> CatalogResult<&Metadata> {
    match metadata.as_object() {
        Some(map) if !map.is_empty() => Ok(map),
        Some(_) => Err(CatalogError::precondition("no metadata given")),
        None => Err(CatalogError::precondition("metadata must be a JSON object")),
    }
}

/// Non-empty, and not a dot segment (URL normalisation would drop it).
pub(crate) fn require_stable_id(stable_id: &str) -> CatalogResult<()> {
    match stable_id {
        "" => Err(CatalogError::precondition("no stable identifier given")),
        "." | ".." => Err(CatalogError::precondition(format!(
            "`{}` is not a valid stable identifier",
            stable_id
        ))),
        _ => Ok(()),
    }
}

pub(crate) fn decode<T: DeserializeOwned>(body: &str, what: &str) -> CatalogResult<T> {
    serde_json::from_str(body).map_err(|e| {
        CatalogError::invalid_response(format!("failed to parse {}: {}", what, e))
    })
}
