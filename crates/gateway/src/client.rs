//! Retrying upstream HTTP client

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::request::EsiRequest;
use crate::response::ResponseMeta;
use crate::retry::AttemptOutcome;
use crate::telemetry;
use killfeed_core::Timestamp;
use killfeed_ports::{Clock, TelemetrySink};
use reqwest::Url;
use reqwest::header::{CONTENT_TYPE, IF_NONE_MATCH};
use std::collections::HashMap;
use std::sync::Arc;

const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// One fully read response
struct RawResponse {
    status: u16,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

/// Client for the upstream API
///
/// Every terminal response is reported to the [`TelemetrySink`] before the
/// caller sees it.
pub struct EsiClient {
    http: reqwest::Client,
    config: GatewayConfig,
    telemetry: Arc<dyn TelemetrySink>,
    clock: Arc<dyn Clock>,
}

impl EsiClient {
    pub fn new(
        config: GatewayConfig,
        telemetry: Arc<dyn TelemetrySink>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Build(e.to_string()))?;

        Ok(Self {
            http,
            config,
            telemetry,
            clock,
        })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub(crate) fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Execute a request with retries
    ///
    /// HTTP failures are reported through [`ResponseMeta::error`], never as a
    /// panic or `Err`.
    pub async fn execute(&self, request: &EsiRequest) -> (Vec<u8>, ResponseMeta) {
        let url = match self.url_for(request) {
            Ok(url) => url,
            Err(err) => {
                log::error!("[gateway] {} {}: {}", request.method, request.path, err);
                return (
                    Vec::new(),
                    ResponseMeta::new(request, 0, HashMap::new(), 0, Some(err)),
                );
            }
        };

        let policy = self.config.retry;
        let mut attempt = 0;
        let mut last_status = None;

        loop {
            attempt += 1;

            match self.attempt(&url, request).await {
                Ok(raw) => {
                    last_status = Some(raw.status);
                    if policy.should_retry(attempt, &AttemptOutcome::Status(raw.status)) {
                        log::warn!(
                            "[gateway] {} {} returned {}, retrying in {:?} ({}/{})",
                            request.method,
                            request.path,
                            raw.status,
                            policy.backoff,
                            attempt,
                            policy.max_attempts
                        );
                        tokio::time::sleep(policy.backoff).await;
                        continue;
                    }
                    return self.finish(request, raw, attempt);
                }
                Err(err) => {
                    if policy.should_retry(attempt, &AttemptOutcome::Failed(err.clone())) {
                        log::warn!(
                            "[gateway] {} {} failed: {}, retrying in {:?} ({}/{})",
                            request.method,
                            request.path,
                            err,
                            policy.backoff,
                            attempt,
                            policy.max_attempts
                        );
                        tokio::time::sleep(policy.backoff).await;
                        continue;
                    }

                    let (status, error) = if err.is_transient() {
                        let status = last_status.unwrap_or(500);
                        (
                            status,
                            GatewayError::MaxAttemptsExceeded {
                                attempts: attempt,
                                status,
                            },
                        )
                    } else {
                        (0, err)
                    };
                    log::error!("[gateway] {} {}: {}", request.method, request.path, error);
                    return (
                        Vec::new(),
                        ResponseMeta::new(request, status, HashMap::new(), attempt, Some(error)),
                    );
                }
            }
        }
    }

    fn finish(&self, request: &EsiRequest, raw: RawResponse, attempts: u32) -> (Vec<u8>, ResponseMeta) {
        telemetry::publish(self.telemetry.as_ref(), raw.status, &raw.headers, self.now());

        let error = GatewayError::from_terminal_status(raw.status, attempts);
        match &error {
            None => log::debug!(
                "[gateway] {} {} -> {}",
                request.method,
                request.path,
                raw.status
            ),
            Some(GatewayError::UpstreamClient(status)) => log::debug!(
                "[gateway] {} {} rejected with {}",
                request.method,
                request.path,
                status
            ),
            Some(err) => log::error!("[gateway] {} {}: {}", request.method, request.path, err),
        }

        let meta = ResponseMeta::new(request, raw.status, raw.headers, attempts, error);
        (raw.body, meta)
    }

    /// A single attempt, bounded by the client timeout
    async fn attempt(&self, url: &Url, request: &EsiRequest) -> Result<RawResponse, GatewayError> {
        let mut builder = self
            .http
            .request(request.method.clone(), url.clone())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(etag) = &request.etag {
            builder = builder.header(IF_NONE_MATCH, etag);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| self.classify(e))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(|e| self.classify(e))?;

        Ok(RawResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }

    fn classify(&self, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout(self.config.timeout)
        } else {
            err.into()
        }
    }

    fn url_for(&self, request: &EsiRequest) -> Result<Url, GatewayError> {
        let raw = format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            request.path
        );
        Url::parse(&raw).map_err(|e| GatewayError::InvalidRequest(format!("{}: {}", raw, e)))
    }
}
