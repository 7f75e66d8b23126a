//! Request → parse → validate orchestration.
//!
//! # Design
//! `JsonRequestPipeline` owns one instance of each capability and nothing
//! else, so every call is independent and `&self` can be shared across
//! tasks. Stages run strictly in order and the first failure is returned
//! unchanged; there is no recovery or retry at this layer.

use serde_json::Value;
use tracing::debug;

use crate::decode::{Decoder, JsonDecoder};
use crate::error::ServiceError;
use crate::http::{ResponseBuffer, TransportRequest};
use crate::request::RequestSpec;
use crate::schema::{Schema, SchemaValidator, Validator};
use crate::transport::Transport;

/// Base for services that read a JSON upstream API.
#[derive(Debug, Clone)]
pub struct JsonRequestPipeline<T, D = JsonDecoder, V = SchemaValidator> {
    transport: T,
    decoder: D,
    validator: V,
}

impl<T: Transport> JsonRequestPipeline<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            decoder: JsonDecoder,
            validator: SchemaValidator::default(),
        }
    }
}

impl<T, D, V> JsonRequestPipeline<T, D, V> {
    /// Replace the decoding stage, keeping the rest of the pipeline.
    pub fn with_decoder<D2: Decoder>(self, decoder: D2) -> JsonRequestPipeline<T, D2, V> {
        JsonRequestPipeline {
            transport: self.transport,
            decoder,
            validator: self.validator,
        }
    }

    pub fn with_validator<V2: Validator>(self, validator: V2) -> JsonRequestPipeline<T, D, V2> {
        JsonRequestPipeline {
            transport: self.transport,
            decoder: self.decoder,
            validator,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport, D: Decoder, V: Validator> JsonRequestPipeline<T, D, V> {
    /// Request `spec.url`, decode the body and validate it against `spec.schema`.
    ///
    /// `spec.options` is merged over `{ headers: [Accept: application/json] }`.
    /// The merge is shallow: if the caller supplies any headers, they replace
    /// the default list, and `Accept` is only sent if included by the caller.
    pub async fn request_json<S: Schema>(&self, spec: RequestSpec<S>) -> Result<S::Output, ServiceError> {
        let RequestSpec {
            schema,
            url,
            options,
            http_errors,
            system_errors,
        } = spec;
        let url = url
            .filter(|u| !u.trim().is_empty())
            .ok_or(ServiceError::InvalidRequest { field: "url" })?;
        let schema = schema.ok_or(ServiceError::InvalidRequest { field: "schema" })?;

        debug!(%url, "requesting upstream json");
        let buffer = self
            .transport
            .request(TransportRequest {
                url,
                options: options.merged_with_defaults(),
                http_errors,
                system_errors,
            })
            .await?;
        let json = self.parse_json(&buffer)?;
        self.validator.validate(json, &schema)
    }

    /// Decode a response body with this pipeline's [`Decoder`].
    pub fn parse_json(&self, buffer: &ResponseBuffer) -> Result<Value, ServiceError> {
        self.decoder.decode(buffer)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde::Deserialize;

    use super::*;
    use crate::error::ErrorKind;
    use crate::http::RequestOptions;
    use crate::schema::Typed;

    /// Returns a canned body and remembers what it was asked for.
    struct CannedTransport {
        body: &'static str,
        seen: Mutex<Vec<TransportRequest>>,
    }

    impl CannedTransport {
        fn new(body: &'static str) -> Self {
            Self {
                body,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for CannedTransport {
        async fn request(&self, request: TransportRequest) -> Result<ResponseBuffer, ServiceError> {
            self.seen.lock().unwrap().push(request);
            Ok(ResponseBuffer::new(200, self.body))
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Version {
        version: String,
    }

    #[tokio::test]
    async fn forwards_merged_request() {
        let pipeline = JsonRequestPipeline::new(CannedTransport::new(r#"{"version":"1.2.3"}"#));
        let spec = RequestSpec::new("http://upstream/pkg", Typed::<Version>::new())
            .with_http_error(404, "package not found");
        let version = pipeline.request_json(spec).await.unwrap();
        assert_eq!(version.version, "1.2.3");

        let seen = pipeline.transport().seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].url, "http://upstream/pkg");
        assert_eq!(seen[0].options.header("Accept"), Some("application/json"));
        assert_eq!(seen[0].http_errors.get(&404).map(String::as_str), Some("package not found"));
    }

    #[tokio::test]
    async fn blank_url_fails_before_transport() {
        let pipeline = JsonRequestPipeline::new(CannedTransport::new("{}"));
        let spec = RequestSpec::new("  ", Typed::<Version>::new());
        let err = pipeline.request_json(spec).await.unwrap_err();
        assert_eq!(err, ServiceError::InvalidRequest { field: "url" });
        assert!(pipeline.transport().seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn supplied_headers_reach_transport_verbatim() {
        let pipeline = JsonRequestPipeline::new(CannedTransport::new(r#"{"version":"1"}"#));
        let spec = RequestSpec::new("http://upstream/pkg", Typed::<Version>::new())
            .with_options(RequestOptions::new().with_header("X-Api-Key", "k"));
        pipeline.request_json(spec).await.unwrap();

        let seen = pipeline.transport().seen.lock().unwrap();
        assert_eq!(
            seen[0].options.headers,
            Some(vec![("X-Api-Key".to_string(), "k".to_string())])
        );
    }

    #[tokio::test]
    async fn parse_json_uses_configured_decoder() {
        let pipeline = JsonRequestPipeline::new(CannedTransport::new("version=3.0"))
            .with_decoder(|buffer: &ResponseBuffer| -> Result<Value, ServiceError> {
                let text = String::from_utf8_lossy(buffer.as_bytes());
                let (key, value) = text.split_once('=').unwrap_or_default();
                let mut map = serde_json::Map::new();
                map.insert(key.to_string(), Value::String(value.to_string()));
                Ok(Value::Object(map))
            });
        let version = pipeline
            .request_json(RequestSpec::new("http://upstream/pkg", Typed::<Version>::new()))
            .await
            .unwrap();
        assert_eq!(version.version, "3.0");
    }

    #[tokio::test]
    async fn garbage_body_is_a_decode_error() {
        let pipeline = JsonRequestPipeline::new(CannedTransport::new("<html>"));
        let err = pipeline
            .request_json(RequestSpec::new("http://upstream/pkg", Typed::<Version>::new()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }
}
