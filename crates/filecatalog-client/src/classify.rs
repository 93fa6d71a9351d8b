//! Status code classification.
//!
//! The registry is a fixed table built on first use and shared for the
//! process lifetime.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::{ClassifiedError, ErrorKind};

const STATUS_KINDS: [(u16, ErrorKind); 6] = [
    (400, ErrorKind::BadRequest),
    (403, ErrorKind::ServiceUnavailable),
    (404, ErrorKind::NotFound),
    (409, ErrorKind::Conflict),
    (429, ErrorKind::TooManyRequests),
    (500, ErrorKind::ServerError),
];

fn registry() -> &'static HashMap<u16, ErrorKind> {
    static REGISTRY: OnceLock<HashMap<u16, ErrorKind>> = OnceLock::new();
    REGISTRY.get_or_init(|| STATUS_KINDS.into_iter().collect())
}

/// Classify a non-success response.
///
/// Unregistered status codes become [`ErrorKind::Unmapped`]. The body is
/// carried as the message without reformatting.
pub fn classify(status: u16, body: impl Into<String>) -> ClassifiedError {
    let kind = registry()
        .get(&status)
        .copied()
        .unwrap_or(ErrorKind::Unmapped);
    ClassifiedError::new(kind, status, body.into())
}
