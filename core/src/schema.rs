//! Schemas and the validator capability.
//!
//! # Design
//! A [`Schema`] turns a decoded [`Value`] into its typed output or reports a
//! [`SchemaMismatch`]. The [`Validator`] wraps that check with the service's
//! error policy: which pretty message to show, and whether to name the
//! offending keys. Keeping the two apart lets one validator serve every
//! schema a service declares.
//!
//! [`Typed`] is the schema most services want: the response is deserialized
//! into a `serde` type, so `#[serde(default)]` fills absent fields and keys
//! the type does not name are dropped.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{trace, warn};

use crate::error::{ServiceError, INVALID_DATA};

/// Why a value did not match a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaMismatch {
    pub message: String,
    /// Paths of the offending keys, when they are known.
    pub keys: Vec<String>,
}

impl SchemaMismatch {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            keys: Vec::new(),
        }
    }

    pub fn at(mut self, key: impl Into<String>) -> Self {
        self.keys.push(key.into());
        self
    }

    fn from_serde(err: &serde_json::Error) -> Self {
        let message = err.to_string();
        let keys = missing_field(&message).into_iter().collect();
        Self { message, keys }
    }
}

impl fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// serde reports absent fields as "missing field `name`".
fn missing_field(message: &str) -> Option<String> {
    let rest = message.strip_prefix("missing field `")?;
    let end = rest.find('`')?;
    Some(rest[..end].to_string())
}

/// A declarative description of the expected shape of a decoded value.
pub trait Schema: Send + Sync {
    type Output;

    fn check(&self, value: Value) -> Result<Self::Output, SchemaMismatch>;
}

/// Schema backed by a `serde` type.
pub struct Typed<T>(PhantomData<fn() -> T>);

impl<T> Typed<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Typed<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Typed<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Typed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Typed<{}>", std::any::type_name::<T>())
    }
}

impl<T: DeserializeOwned> Schema for Typed<T> {
    type Output = T;

    fn check(&self, value: Value) -> Result<T, SchemaMismatch> {
        serde_json::from_value(value).map_err(|e| SchemaMismatch::from_serde(&e))
    }
}

/// Schema backed by a closure, for checks a `serde` type cannot express.
#[derive(Clone)]
pub struct FnSchema<F>(pub F);

impl<F, O> Schema for FnSchema<F>
where
    F: Fn(Value) -> Result<O, SchemaMismatch> + Send + Sync,
{
    type Output = O;

    fn check(&self, value: Value) -> Result<O, SchemaMismatch> {
        (self.0)(value)
    }
}

/// Checks a decoded value against a schema and classifies failures.
pub trait Validator: Send + Sync {
    fn validate<S: Schema>(&self, value: Value, schema: &S) -> Result<S::Output, ServiceError>;
}

/// The default validator: any mismatch becomes [`ServiceError::InvalidData`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaValidator {
    pretty_message: String,
    include_keys: bool,
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self {
            pretty_message: INVALID_DATA.to_string(),
            include_keys: false,
        }
    }
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pretty_message(mut self, message: impl Into<String>) -> Self {
        self.pretty_message = message.into();
        self
    }

    /// Append the offending keys to the pretty message, e.g.
    /// `"invalid response data: version"`.
    pub fn include_keys(mut self, include: bool) -> Self {
        self.include_keys = include;
        self
    }
}

impl Validator for SchemaValidator {
    fn validate<S: Schema>(&self, value: Value, schema: &S) -> Result<S::Output, ServiceError> {
        match schema.check(value) {
            Ok(validated) => {
                trace!("response matched schema");
                Ok(validated)
            }
            Err(mismatch) => {
                warn!(error = %mismatch, keys = ?mismatch.keys, "response did not match schema");
                let pretty_message = if self.include_keys && !mismatch.keys.is_empty() {
                    format!("{}: {}", self.pretty_message, mismatch.keys.join(","))
                } else {
                    self.pretty_message.clone()
                };
                Err(ServiceError::InvalidData {
                    pretty_message,
                    keys: mismatch.keys,
                    cause: mismatch.message,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::error::ErrorKind;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Package {
        name: String,
        version: String,
        #[serde(default)]
        downloads: u64,
    }

    #[test]
    fn typed_schema_accepts_matching_value() {
        let value = json!({"name": "serde", "version": "1.0.0", "downloads": 7});
        let package = SchemaValidator::new()
            .validate(value, &Typed::<Package>::new())
            .unwrap();
        assert_eq!(
            package,
            Package {
                name: "serde".to_string(),
                version: "1.0.0".to_string(),
                downloads: 7,
            }
        );
    }

    #[test]
    fn typed_schema_defaults_and_strips() {
        let value = json!({"name": "serde", "version": "1.0.0", "homepage": "https://serde.rs"});
        let package = Typed::<Package>::new().check(value).unwrap();
        assert_eq!(package.downloads, 0);
    }

    #[test]
    fn missing_field_is_reported_as_key() {
        let err = Typed::<Package>::new()
            .check(json!({"name": "serde"}))
            .unwrap_err();
        assert_eq!(err.keys, vec!["version".to_string()]);
    }

    #[test]
    fn wrong_type_has_no_key() {
        let err = Typed::<Package>::new()
            .check(json!({"name": 7, "version": "1"}))
            .unwrap_err();
        assert!(err.keys.is_empty());
        assert!(err.message.contains("invalid type"));
    }

    #[test]
    fn validator_uses_default_pretty_message() {
        let err = SchemaValidator::new()
            .validate(json!([]), &Typed::<Package>::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.pretty_message(), "invalid response data");
    }

    #[test]
    fn validator_can_include_keys() {
        let err = SchemaValidator::new()
            .include_keys(true)
            .validate(json!({"name": "serde"}), &Typed::<Package>::new())
            .unwrap_err();
        assert_eq!(err.pretty_message(), "invalid response data: version");
    }

    #[test]
    fn validator_custom_message() {
        let err = SchemaValidator::new()
            .with_pretty_message("unexpected registry response")
            .validate(json!(null), &Typed::<Package>::new())
            .unwrap_err();
        assert_eq!(err.pretty_message(), "unexpected registry response");
    }

    #[test]
    fn fn_schema_can_coerce() {
        let semver = FnSchema(|value: Value| match value.get("version") {
            Some(Value::String(v)) => Ok(v.trim_start_matches('v').to_string()),
            _ => Err(SchemaMismatch::new("version must be a string").at("version")),
        });
        let version = SchemaValidator::new()
            .validate(json!({"version": "v2.1.0"}), &semver)
            .unwrap();
        assert_eq!(version, "2.1.0");

        let err = SchemaValidator::new()
            .include_keys(true)
            .validate(json!({"version": 2}), &semver)
            .unwrap_err();
        assert_eq!(err.pretty_message(), "invalid response data: version");
    }
}
