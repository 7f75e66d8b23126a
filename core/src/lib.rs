//! Shared base for services that read an upstream JSON API.
//!
//! # Overview
//! [`JsonRequestPipeline::request_json`] fetches a URL, decodes the body and
//! validates the decoded value against a schema, returning the validated
//! value or a classified [`ServiceError`]. Every service built on it shares
//! one pipeline and one error taxonomy instead of mapping HTTP and parse
//! failures by hand.
//!
//! # Design
//! - The three stages are capabilities behind traits: [`Transport`],
//!   [`Decoder`], and [`Validator`] (checking a [`Schema`]). Defaults are
//!   [`ReqwestTransport`], [`JsonDecoder`] and [`SchemaValidator`].
//! - Request options are merged shallowly over
//!   `{ headers: [Accept: application/json] }`; see
//!   [`RequestOptions::merged_with_defaults`].
//! - Status and network failures are classified once, in
//!   [`check_error_response`] and [`classify_system_error`], using the
//!   caller's override tables.
//! - The pipeline is stateless; concurrent calls share nothing mutable.

pub mod decode;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod request;
pub mod schema;
pub mod transport;

pub use decode::{Decoder, JsonDecoder};
pub use error::{ErrorKind, ServiceError};
pub use http::{HttpMethod, RequestOptions, ResponseBuffer, TransportRequest};
pub use pipeline::JsonRequestPipeline;
pub use request::{ErrorProps, HttpErrors, RequestSpec, SystemErrorCode, SystemErrors};
pub use schema::{FnSchema, Schema, SchemaMismatch, SchemaValidator, Typed, Validator};
pub use transport::{check_error_response, classify_system_error, ReqwestTransport, Transport, TransportConfig};
