//! The decoder capability: raw response body → structured value.

use serde_json::Value;
use tracing::{trace, warn};

use crate::error::{ServiceError, UNPARSEABLE_JSON};
use crate::http::ResponseBuffer;

/// Turns a [`ResponseBuffer`] into a [`Value`].
///
/// Any `Fn(&ResponseBuffer) -> Result<Value, ServiceError>` is a decoder, so
/// a service reading a JSON-like format can plug in a closure.
pub trait Decoder: Send + Sync {
    fn decode(&self, buffer: &ResponseBuffer) -> Result<Value, ServiceError>;
}

/// Plain JSON via `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl Decoder for JsonDecoder {
    fn decode(&self, buffer: &ResponseBuffer) -> Result<Value, ServiceError> {
        match serde_json::from_slice::<Value>(buffer.as_bytes()) {
            Ok(json) => {
                trace!(%json, "response json (before validation)");
                Ok(json)
            }
            Err(e) => {
                warn!(error = %e, bytes = buffer.len(), "unparseable json response");
                Err(ServiceError::InvalidJson {
                    pretty_message: UNPARSEABLE_JSON.to_string(),
                    cause: e.to_string(),
                })
            }
        }
    }
}

impl<F> Decoder for F
where
    F: Fn(&ResponseBuffer) -> Result<Value, ServiceError> + Send + Sync,
{
    fn decode(&self, buffer: &ResponseBuffer) -> Result<Value, ServiceError> {
        self(buffer)
    }
}
