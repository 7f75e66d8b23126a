//! Caller-facing request description and error override tables.
//!
//! # Design
//! `url` and `schema` are `Option`s so that a missing field is reported by
//! the pipeline as [`ServiceError::InvalidRequest`](crate::ServiceError)
//! before any I/O happens. [`RequestSpec::new`] is the usual constructor and
//! always supplies both.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::http::RequestOptions;

/// Status code → pretty message, e.g. `{ 404: "package not found" }`.
pub type HttpErrors = BTreeMap<u16, String>;

/// Transport failure code → parameters for the resulting error.
pub type SystemErrors = BTreeMap<SystemErrorCode, ErrorProps>;

/// Failure codes for errors that happen below HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SystemErrorCode {
    #[serde(rename = "ETIMEDOUT")]
    Timeout,
    #[serde(rename = "ECONNREFUSED")]
    ConnectionRefused,
    #[serde(rename = "ECONNRESET")]
    ConnectionReset,
    /// The request could not be sent for any other reason (DNS, TLS, ...).
    #[serde(rename = "EREQUEST")]
    Request,
    /// The connection failed while the body was being read.
    #[serde(rename = "EBODY")]
    Body,
}

impl SystemErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            SystemErrorCode::Timeout => "ETIMEDOUT",
            SystemErrorCode::ConnectionRefused => "ECONNREFUSED",
            SystemErrorCode::ConnectionReset => "ECONNRESET",
            SystemErrorCode::Request => "EREQUEST",
            SystemErrorCode::Body => "EBODY",
        }
    }
}

impl fmt::Display for SystemErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters substituted into the error raised for a [`SystemErrorCode`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorProps {
    pub pretty_message: Option<String>,
}

impl ErrorProps {
    pub fn pretty(message: impl Into<String>) -> Self {
        Self {
            pretty_message: Some(message.into()),
        }
    }
}

/// One call to [`crate::JsonRequestPipeline::request_json`].
#[derive(Debug, Clone)]
pub struct RequestSpec<S> {
    pub schema: Option<S>,
    pub url: Option<String>,
    pub options: RequestOptions,
    pub http_errors: HttpErrors,
    pub system_errors: SystemErrors,
}

impl<S> Default for RequestSpec<S> {
    fn default() -> Self {
        Self {
            schema: None,
            url: None,
            options: RequestOptions::default(),
            http_errors: HttpErrors::new(),
            system_errors: SystemErrors::new(),
        }
    }
}

impl<S> RequestSpec<S> {
    pub fn new(url: impl Into<String>, schema: S) -> Self {
        Self {
            schema: Some(schema),
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_schema(mut self, schema: S) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_http_error(mut self, status: u16, message: impl Into<String>) -> Self {
        self.http_errors.insert(status, message.into());
        self
    }

    pub fn with_system_error(mut self, code: SystemErrorCode, props: ErrorProps) -> Self {
        self.system_errors.insert(code, props);
        self
    }
}
