//! The transport capability and its default `reqwest` implementation.
//!
//! # Design
//! Status-code and failure-code classification lives in two pure functions,
//! [`check_error_response`] and [`classify_system_error`], so that every
//! [`Transport`] implementation applies the same override tables the same
//! way. [`ReqwestTransport`] only performs the round-trip and feeds its
//! outcome through them. No transport in this crate retries.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ServiceError, INACCESSIBLE, INVALID, NOT_FOUND, RATE_LIMITED};
use crate::http::{HttpMethod, ResponseBuffer, TransportRequest};
use crate::request::{HttpErrors, SystemErrorCode, SystemErrors};

const RESPONSE_TOO_LARGE: &str = "Maximum response size exceeded";

/// Performs the network call for one [`TransportRequest`].
///
/// Implementations must classify non-2xx statuses and network failures into
/// [`ServiceError`]s, honouring `http_errors` and `system_errors`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, request: TransportRequest) -> Result<ResponseBuffer, ServiceError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn request(&self, request: TransportRequest) -> Result<ResponseBuffer, ServiceError> {
        (**self).request(request).await
    }
}

/// Map a non-2xx status to the appropriate [`ServiceError`] variant.
///
/// 404 becomes `NotFound`, 5xx becomes `Inaccessible`, everything else
/// `InvalidResponse`. A message in `http_errors` for the status replaces the
/// default pretty message.
pub fn check_error_response(
    response: ResponseBuffer,
    http_errors: &HttpErrors,
) -> Result<ResponseBuffer, ServiceError> {
    let status = response.status;
    if (200..300).contains(&status) {
        return Ok(response);
    }

    let pretty = |default: &str| {
        http_errors
            .get(&status)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    };
    let cause = format!("Got status code {status} (expected 2xx)");
    let err = match status {
        404 => ServiceError::NotFound {
            pretty_message: pretty(NOT_FOUND),
        },
        429 => ServiceError::InvalidResponse {
            pretty_message: pretty(RATE_LIMITED),
            status: Some(status),
            cause,
        },
        s if s >= 500 => ServiceError::Inaccessible {
            pretty_message: pretty(INACCESSIBLE),
            code: None,
            status: Some(s),
            cause,
        },
        _ => ServiceError::InvalidResponse {
            pretty_message: pretty(INVALID),
            status: Some(status),
            cause,
        },
    };
    warn!(status, error = %err, "upstream returned an error status");
    Err(err)
}

/// Build the error for a failure below HTTP, applying `system_errors`.
pub fn classify_system_error(
    code: SystemErrorCode,
    detail: impl Into<String>,
    system_errors: &SystemErrors,
) -> ServiceError {
    let pretty_message = system_errors
        .get(&code)
        .and_then(|props| props.pretty_message.clone())
        .unwrap_or_else(|| INACCESSIBLE.to_string());
    let err = ServiceError::Inaccessible {
        pretty_message,
        code: Some(code),
        status: None,
        cause: detail.into(),
    };
    warn!(%code, error = %err, "upstream request failed");
    err
}

fn response_too_large(status: u16) -> ServiceError {
    ServiceError::InvalidResponse {
        pretty_message: INVALID.to_string(),
        status: Some(status),
        cause: RESPONSE_TOO_LARGE.to_string(),
    }
}

/// Settings shared by every request a [`ReqwestTransport`] sends.
///
/// Per-request [`RequestOptions`](crate::RequestOptions) take precedence over
/// `timeout` and `max_response_size`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub user_agent: String,
    #[serde(rename = "timeout_ms", with = "crate::http::millis")]
    pub timeout: Option<Duration>,
    pub max_response_size: Option<usize>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("upstream-json/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Some(Duration::from_secs(30)),
            max_response_size: Some(10 * 1024 * 1024),
        }
    }
}

/// Async HTTP transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    config: TransportConfig,
}

impl ReqwestTransport {
    pub fn new(config: TransportConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { client, config })
    }

    /// Wrap an existing client. The client's own user agent is left as is.
    pub fn from_client(client: reqwest::Client, config: TransportConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn request(&self, request: TransportRequest) -> Result<ResponseBuffer, ServiceError> {
        let TransportRequest {
            url,
            options,
            http_errors,
            system_errors,
        } = request;
        debug!(%url, method = ?options.method, "sending upstream request");

        let mut builder = self.client.request(options.method.into(), url.as_str());
        for (name, value) in options.headers.iter().flatten() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if let Some(body) = options.body {
            builder = builder.body(body);
        }
        if let Some(timeout) = options.timeout.or(self.config.timeout) {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| {
                let code = system_error_code(&e, SystemErrorCode::Request);
                classify_system_error(code, e.to_string(), &system_errors)
            })?;
        let status = response.status().as_u16();
        let limit = options.max_response_size.or(self.config.max_response_size);
        let body = read_body(response, limit, &system_errors).await?;
        debug!(%url, status, bytes = body.len(), "received upstream response");

        check_error_response(ResponseBuffer::new(status, body), &http_errors)
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Read the body chunk by chunk, stopping as soon as `limit` is exceeded.
async fn read_body(
    mut response: reqwest::Response,
    limit: Option<usize>,
    system_errors: &SystemErrors,
) -> Result<Bytes, ServiceError> {
    let status = response.status().as_u16();
    if let (Some(limit), Some(declared)) = (limit, response.content_length()) {
        if declared > limit as u64 {
            return Err(response_too_large(status));
        }
    }

    let mut body = BytesMut::new();
    loop {
        let chunk = response.chunk().await.map_err(|e| {
            let code = system_error_code(&e, SystemErrorCode::Body);
            classify_system_error(code, e.to_string(), system_errors)
        })?;
        let Some(chunk) = chunk else { break };
        if limit.is_some_and(|limit| body.len() + chunk.len() > limit) {
            return Err(response_too_large(status));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}

/// Pick the [`SystemErrorCode`] that best describes a failed send or body
/// read. Timeouts win over `fallback`, whichever phase they fired in.
fn system_error_code(err: &reqwest::Error, fallback: SystemErrorCode) -> SystemErrorCode {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            match io.kind() {
                std::io::ErrorKind::TimedOut => return SystemErrorCode::Timeout,
                std::io::ErrorKind::ConnectionRefused => return SystemErrorCode::ConnectionRefused,
                std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::ConnectionAborted => {
                    return SystemErrorCode::ConnectionReset
                }
                _ => {}
            }
        }
        source = e.source();
    }

    if err.is_timeout() {
        SystemErrorCode::Timeout
    } else if err.is_body() || err.is_decode() {
        SystemErrorCode::Body
    } else {
        fallback
    }
}
