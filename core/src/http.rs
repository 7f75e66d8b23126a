//! HTTP request options and response buffers, described as plain data.
//!
//! # Design
//! [`RequestOptions`] is the open configuration bag a service hands to the
//! transport. It is deliberately flat so that merging defaults over it is a
//! shallow, field-by-field operation: a caller who supplies `headers` at all
//! owns the whole header list, and the default `Accept: application/json`
//! is only used when `headers` is absent.
//!
//! All fields use owned types so requests can be built once and moved into
//! an async transport without lifetime concerns.

use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::request::{HttpErrors, SystemErrors};

/// Header applied when the caller does not supply a header list.
pub const ACCEPT_JSON: (&str, &str) = ("Accept", "application/json");

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

/// Options forwarded to the transport.
///
/// `headers == None` means the caller did not supply a header list; see
/// [`RequestOptions::merged_with_defaults`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RequestOptions {
    pub method: HttpMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<(String, String)>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(
        rename = "timeout_ms",
        with = "millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_response_size: Option<usize>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Replace the header list wholesale.
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers = Some(
            headers
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Append one header. Starts a fresh list when none was supplied, which
    /// means the default `Accept` header will no longer be applied.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(Vec::new)
            .push((name.into(), value.into()));
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_response_size(mut self, limit: usize) -> Self {
        self.max_response_size = Some(limit);
        self
    }

    /// Overlay these options on the defaults `{ headers: [Accept: application/json] }`.
    ///
    /// The merge is shallow: supplied `headers` replace the default list
    /// entirely, so `Accept` is only present if the caller included it.
    pub fn merged_with_defaults(self) -> Self {
        let headers = self.headers.or_else(default_headers);
        Self { headers, ..self }
    }

    /// Case-insensitive lookup of the first header named `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .flatten()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn default_headers() -> Option<Vec<(String, String)>> {
    Some(vec![(ACCEPT_JSON.0.to_string(), ACCEPT_JSON.1.to_string())])
}

/// Everything a [`crate::Transport`] needs for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    pub url: String,
    pub options: RequestOptions,
    pub http_errors: HttpErrors,
    pub system_errors: SystemErrors,
}

/// Raw response returned by a transport, consumed by the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseBuffer {
    pub status: u16,
    pub body: Bytes,
}

impl ResponseBuffer {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// `Option<Duration>` as integer milliseconds.
pub(crate) mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_u64(d.as_millis() as u64),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
