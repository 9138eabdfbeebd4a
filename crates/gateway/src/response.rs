//! Response metadata returned with every gateway call

use crate::error::GatewayError;
use crate::request::EsiRequest;
use crate::telemetry;
use killfeed_core::Timestamp;
use std::collections::HashMap;

/// Everything about a call except the body
///
/// `status` is `0` when no response was ever received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    pub method: String,
    pub path: String,
    pub query: String,
    pub status: u16,
    /// Header names are lower-case
    pub headers: HashMap<String, String>,
    pub attempts: u32,
    pub error: Option<GatewayError>,
}

impl ResponseMeta {
    pub(crate) fn new(
        request: &EsiRequest,
        status: u16,
        headers: HashMap<String, String>,
        attempts: u32,
        error: Option<GatewayError>,
    ) -> Self {
        Self {
            method: request.method.to_string(),
            path: request.path.clone(),
            query: request.query_string(),
            status,
            headers,
            attempts,
            error,
        }
    }

    /// No error: a 2xx or a 304
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_not_modified(&self) -> bool {
        self.status == 304
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn cache_directives(&self, now: Timestamp) -> CacheDirectives {
        CacheDirectives {
            etag: telemetry::etag(&self.headers),
            expires: telemetry::expires(&self.headers, now),
        }
    }
}

/// Caching hints attached to an entity response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheDirectives {
    pub etag: Option<String>,
    pub expires: Timestamp,
}
