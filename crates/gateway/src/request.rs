//! Logical upstream request

use reqwest::Method;

/// A request before it is bound to a base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EsiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    /// Previously stored ETag, sent as `If-None-Match`
    pub etag: Option<String>,
}

impl EsiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            etag: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Vec<u8>) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_etag(mut self, etag: Option<&str>) -> Self {
        self.etag = etag.map(str::to_string);
        self
    }

    /// Query rendered as `k=v&k=v`, for logging and [`ResponseMeta`](crate::ResponseMeta)
    pub fn query_string(&self) -> String {
        self.query
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let req = EsiRequest::get("/v1/status/")
            .with_query("datasource", "tranquility")
            .with_query("page", "2")
            .with_etag(Some("\"abc\""));

        assert_eq!(req.method, Method::GET);
        assert_eq!(req.query_string(), "datasource=tranquility&page=2");
        assert_eq!(req.etag.as_deref(), Some("\"abc\""));
        assert!(req.body.is_none());
    }
}
