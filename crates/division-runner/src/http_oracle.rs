//! [`ReasoningOracle`] over an OpenAI-compatible chat-completions endpoint.
//!
//! Every request asks for structured output against the contract's JSON
//! schema. HTTP and transport failures are classified into
//! [`OracleErrorKind`]s; retriable kinds are retried here with exponential
//! backoff so the engine itself never waits on anything but the throttle.

use std::time::Duration;

use adjudication::{OracleError, OracleErrorKind, OracleRequest, ReasoningOracle};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::EndpointConfig;
use crate::retry::RetryPolicy;

/// A failed attempt plus the server's `Retry-After` hint, if any.
#[derive(Debug)]
struct AttemptFailure {
    error: OracleError,
    retry_after: Option<Duration>,
}

impl From<OracleError> for AttemptFailure {
    fn from(error: OracleError) -> Self {
        Self {
            error,
            retry_after: None,
        }
    }
}

pub struct HttpOracle {
    client: reqwest::Client,
    endpoint: EndpointConfig,
    retry: RetryPolicy,
}

impl HttpOracle {
    pub fn new(endpoint: EndpointConfig, retry: RetryPolicy) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(endpoint.timeout())
            .build()
            .map_err(|e| {
                OracleError::new(
                    OracleErrorKind::Unreachable,
                    format!("failed to build HTTP client: {}", e),
                )
            })?;
        Ok(Self {
            client,
            endpoint,
            retry,
        })
    }

    fn url(&self, route: &str) -> String {
        format!("{}/{}", self.endpoint.base_url.trim_end_matches('/'), route)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.endpoint.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Chat-completions body for one request.
    ///
    /// `strict` is off: generated schemas carry constructs the strict mode
    /// rejects, and replies are validated against the contract anyway.
    pub fn request_body(&self, request: &OracleRequest) -> Value {
        let mut body = json!({
            "model": self.endpoint.model,
            "max_tokens": self.endpoint.max_tokens,
            "messages": [{ "role": "user", "content": request.prompt }],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": request.contract,
                    "schema": request.schema,
                    "strict": false,
                }
            }
        });
        if let Some(t) = request.temperature {
            body["temperature"] = json!(t);
        }
        body
    }

    async fn attempt(&self, request: &OracleRequest) -> Result<Value, AttemptFailure> {
        let response = self
            .authorized(self.client.post(self.url("chat/completions")))
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(|e| OracleError::new(classify_transport(&e), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(AttemptFailure {
                error: OracleError::new(
                    classify_status(status.as_u16(), &body),
                    format!("HTTP {}: {}", status, truncate(&body, 300)),
                ),
                retry_after,
            });
        }

        let envelope: Value = response
            .json()
            .await
            .map_err(|e| OracleError::new(OracleErrorKind::Malformed, e.to_string()))?;
        Ok(parse_completion(&envelope)?)
    }

    /// Ids served by the endpoint's `/models` route.
    pub async fn list_models(&self) -> Result<Vec<String>, OracleError> {
        let response = self
            .authorized(self.client.get(self.url("models")))
            .send()
            .await
            .map_err(|e| OracleError::new(classify_transport(&e), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::new(
                classify_status(status.as_u16(), &body),
                format!("HTTP {}: {}", status, truncate(&body, 300)),
            ));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| OracleError::new(OracleErrorKind::Malformed, e.to_string()))?;
        Ok(body["data"]
            .as_array()
            .map(|models| {
                models
                    .iter()
                    .filter_map(|m| m["id"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl ReasoningOracle for HttpOracle {
    async fn complete(&self, request: &OracleRequest) -> Result<Value, OracleError> {
        let mut attempt = 0;
        loop {
            match self.attempt(request).await {
                Ok(value) => {
                    debug!(contract = request.contract, attempt, "Oracle call succeeded");
                    return Ok(value);
                }
                Err(failure) => {
                    if !failure.error.is_retriable() || !self.retry.should_retry(attempt) {
                        return Err(failure.error);
                    }
                    attempt += 1;
                    let delay = self.retry.delay_with_hint(attempt, failure.retry_after);
                    warn!(
                        contract = request.contract,
                        attempt,
                        max_retries = self.retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %failure.error,
                        "Oracle call failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Map an HTTP error status (and its body) to an error kind.
pub fn classify_status(status: u16, body: &str) -> OracleErrorKind {
    match status {
        429 if is_quota_body(body) => OracleErrorKind::QuotaExhausted,
        429 => OracleErrorKind::RateLimited,
        402 => OracleErrorKind::QuotaExhausted,
        408 | 500..=599 => OracleErrorKind::Transient,
        401 | 403 => OracleErrorKind::Unauthorized,
        _ => OracleErrorKind::NonConforming,
    }
}

fn is_quota_body(body: &str) -> bool {
    match serde_json::from_str::<Value>(body) {
        Ok(v) => {
            let error = &v["error"];
            error["code"] == "insufficient_quota" || error["type"] == "insufficient_quota"
        }
        Err(_) => body.contains("insufficient_quota"),
    }
}

fn classify_transport(err: &reqwest::Error) -> OracleErrorKind {
    if err.is_timeout() {
        OracleErrorKind::Transient
    } else if err.is_connect() {
        OracleErrorKind::Unreachable
    } else if err.is_body() || err.is_decode() {
        OracleErrorKind::Transient
    } else {
        OracleErrorKind::Unreachable
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Pull the JSON reply out of a chat-completions envelope.
pub fn parse_completion(envelope: &Value) -> Result<Value, OracleError> {
    let message = &envelope["choices"][0]["message"];
    if let Some(refusal) = message["refusal"].as_str() {
        return Err(OracleError::new(
            OracleErrorKind::NonConforming,
            format!("model refused: {}", refusal),
        ));
    }
    let content = message["content"].as_str().ok_or_else(|| {
        OracleError::new(OracleErrorKind::Malformed, "response has no message content")
    })?;
    let block = extract_json_block(content).ok_or_else(|| {
        OracleError::new(
            OracleErrorKind::Malformed,
            format!("no JSON object in reply: {}", truncate(content, 200)),
        )
    })?;
    serde_json::from_str(block).map_err(|e| {
        OracleError::new(
            OracleErrorKind::Malformed,
            format!("reply is not valid JSON: {}", e),
        )
    })
}

/// The outermost `{...}` in a reply, ignoring markdown fences and chatter.
pub fn extract_json_block(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end > start).then(|| &content[start..=end])
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
