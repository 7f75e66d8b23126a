//! Error taxonomy for the request → parse → validate pipeline.
//!
//! # Design
//! Every variant belongs to exactly one pipeline stage, reported by
//! [`ServiceError::kind`]. Callers can then tell "the upstream is unreachable
//! or rejected the request" apart from "the upstream returned garbage" and
//! from "the upstream changed its contract." Each variant also carries a
//! short `pretty_message` suitable for end users; the override tables in
//! [`crate::request`] replace it for transport failures.

use thiserror::Error;

use crate::request::SystemErrorCode;

pub const NOT_FOUND: &str = "not found";
pub const INACCESSIBLE: &str = "inaccessible";
pub const INVALID: &str = "invalid";
pub const RATE_LIMITED: &str = "rate limited by upstream service";
pub const UNPARSEABLE_JSON: &str = "unparseable json response";
pub const INVALID_DATA: &str = "invalid response data";
pub const INVALID_REQUEST: &str = "invalid request";

/// The pipeline stage an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller broke the request contract; nothing was sent.
    Precondition,
    /// Non-2xx response or network-level failure.
    Transport,
    /// The response body could not be decoded.
    Decode,
    /// The decoded value did not match the schema.
    Validation,
}

/// Errors returned by [`crate::JsonRequestPipeline`] and its collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// A required request field (`url` or `schema`) was missing.
    #[error("invalid request: `{field}` is required")]
    InvalidRequest { field: &'static str },

    /// The upstream answered 404.
    #[error("{pretty_message}")]
    NotFound { pretty_message: String },

    /// The upstream could not be reached, or answered with a 5xx status.
    #[error("{pretty_message}: {cause}")]
    Inaccessible {
        pretty_message: String,
        /// Set when the failure happened below HTTP (connect, timeout, ...).
        code: Option<SystemErrorCode>,
        /// Set when the upstream answered with a server error.
        status: Option<u16>,
        cause: String,
    },

    /// The upstream answered with an unexpected non-2xx status, or the
    /// response was too large to accept.
    #[error("{pretty_message}: {cause}")]
    InvalidResponse {
        pretty_message: String,
        status: Option<u16>,
        cause: String,
    },

    /// The response body is not valid JSON (or the configured format).
    #[error("{pretty_message}: {cause}")]
    InvalidJson { pretty_message: String, cause: String },

    /// The decoded value does not conform to the schema.
    #[error("{pretty_message}: {cause}")]
    InvalidData {
        pretty_message: String,
        keys: Vec<String>,
        cause: String,
    },
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::InvalidRequest { .. } => ErrorKind::Precondition,
            ServiceError::NotFound { .. }
            | ServiceError::Inaccessible { .. }
            | ServiceError::InvalidResponse { .. } => ErrorKind::Transport,
            ServiceError::InvalidJson { .. } => ErrorKind::Decode,
            ServiceError::InvalidData { .. } => ErrorKind::Validation,
        }
    }

    /// Short end-user message, after any override table was applied.
    pub fn pretty_message(&self) -> &str {
        match self {
            ServiceError::InvalidRequest { .. } => INVALID_REQUEST,
            ServiceError::NotFound { pretty_message }
            | ServiceError::Inaccessible { pretty_message, .. }
            | ServiceError::InvalidResponse { pretty_message, .. }
            | ServiceError::InvalidJson { pretty_message, .. }
            | ServiceError::InvalidData { pretty_message, .. } => pretty_message,
        }
    }

    /// HTTP status of the upstream response, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ServiceError::NotFound { .. } => Some(404),
            ServiceError::Inaccessible { status, .. } | ServiceError::InvalidResponse { status, .. } => *status,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct_per_stage() {
        let transport = ServiceError::NotFound {
            pretty_message: NOT_FOUND.to_string(),
        };
        let decode = ServiceError::InvalidJson {
            pretty_message: UNPARSEABLE_JSON.to_string(),
            cause: "expected value at line 1 column 1".to_string(),
        };
        let validation = ServiceError::InvalidData {
            pretty_message: INVALID_DATA.to_string(),
            keys: vec!["version".to_string()],
            cause: "missing field `version`".to_string(),
        };
        assert_eq!(transport.kind(), ErrorKind::Transport);
        assert_eq!(decode.kind(), ErrorKind::Decode);
        assert_eq!(validation.kind(), ErrorKind::Validation);
        assert_eq!(
            ServiceError::InvalidRequest { field: "url" }.kind(),
            ErrorKind::Precondition
        );
    }

    #[test]
    fn display_leads_with_pretty_message() {
        let err = ServiceError::Inaccessible {
            pretty_message: "connection reset".to_string(),
            code: Some(SystemErrorCode::ConnectionReset),
            status: None,
            cause: "connection reset by peer".to_string(),
        };
        assert_eq!(err.to_string(), "connection reset: connection reset by peer");
        assert_eq!(err.pretty_message(), "connection reset");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn invalid_request_names_the_field() {
        let err = ServiceError::InvalidRequest { field: "schema" };
        assert_eq!(err.to_string(), "invalid request: `schema` is required");
        assert_eq!(err.pretty_message(), INVALID_REQUEST);
    }

    #[test]
    fn not_found_reports_status_404() {
        let err = ServiceError::NotFound {
            pretty_message: "package not found".to_string(),
        };
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "package not found");
    }
}
