//! # partial-rs
//!
//! Partial validation of JSON records. Every field of a schema is validated
//! on its own: a field that is missing or cannot be coerced to its declared
//! type is set to `null` and described in an error list, while the rest of
//! the record is still returned.
//!
//! ## Quick Start
//!
//! ```rust
//! use partial_rs::prelude::*;
//! use serde_json::json;
//!
//! let model = schema("Model")
//!     .field("a", int().required())
//!     .field("b", boolean().required())
//!     .field("c", string().required())
//!     .field("d", float().required());
//!
//! let result = model
//!     .validate(&json!({"a": "3", "b": "something", "c": null}))
//!     .expect("input is an object");
//!
//! assert_eq!(result.values.get_int("a"), Some(3));
//! assert!(result.values["b"].is_null());
//! assert_eq!(result.invalid_fields(), vec!["b", "c", "d"]);
//! ```

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Serialize, Serializer};

pub mod coerce;
pub mod config;
pub mod schema;
pub mod validators;

pub use coerce::{coerce, Rejection};
pub use config::{CoercionMode, NullPolicy, ValidatorConfig};
pub use schema::*;
pub use validators::*;

/// Library version
pub const VERSION: &str = "0.1.0";

// =============================================================================
// Error Types
// =============================================================================

/// Failures that stop a validation pass before any field is looked at.
#[derive(Error, Debug)]
pub enum Error {
    /// The top-level input was not a JSON object.
    #[error("input should be an object, got {found}")]
    InvalidInputShape { found: &'static str },

    /// `validate_json` was handed text that is not JSON.
    #[error("invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),

    /// A validator configuration document could not be read.
    #[error("invalid validator configuration: {0}")]
    Config(#[source] serde_json::Error),
}

impl Error {
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidInputShape { .. } => "invalid_input_shape",
            Error::Json(_) => "invalid_json",
            Error::Config(_) => "invalid_config",
        }
    }
}

/// Result type for operations that can fail as a whole
pub type Result<T> = std::result::Result<T, Error>;

/// Why a single field was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ErrorKind {
    /// A required field was absent.
    Missing,
    /// The raw value has the wrong JSON type for the field.
    TypeMismatch,
    /// A string or number could not be interpreted as the field type.
    ParseError,
    /// A date or time string is malformed or out of range.
    FormatError,
    /// A well-typed value failed a constraint or custom validator.
    ValueError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Missing => "missing",
            ErrorKind::TypeMismatch => "type_mismatch",
            ErrorKind::ParseError => "parse_error",
            ErrorKind::FormatError => "format_error",
            ErrorKind::ValueError => "value_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field validation error
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct FieldError {
    pub field: String,
    pub kind: ErrorKind,
    pub message: String,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub input: Option<Value>,
}

impl FieldError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: ErrorKind::Missing,
            message: "Field required".to_string(),
            input: None,
        }
    }

    pub fn from_rejection(field: impl Into<String>, rejection: Rejection, input: Option<Value>) -> Self {
        Self {
            field: field.into(),
            kind: rejection.kind,
            message: rejection.message,
            input,
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} [type={}", self.field, self.message, self.kind)?;
        if let Some(input) = &self.input {
            write!(f, ", input_value={}", input)?;
        }
        write!(f, "]")
    }
}

impl std::error::Error for FieldError {}

/// All field errors of one pass, as a single error value
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub title: String,
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn new(title: impl Into<String>, errors: Vec<FieldError>) -> Self {
        Self {
            title: title.into(),
            errors,
        }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = if self.errors.len() == 1 { "" } else { "s" };
        write!(
            f,
            "{} validation error{} for {}",
            self.errors.len(),
            plural,
            self.title
        )?;
        for error in &self.errors {
            write!(f, "\n{}\n  {} [type={}", error.field, error.message, error.kind)?;
            if let Some(input) = &error.input {
                write!(f, ", input_value={}", input)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

// =============================================================================
// Value Types
// =============================================================================

/// A coerced field value, or the `Null` placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    DateTime(chrono::DateTime<chrono::FixedOffset>),
    Date(chrono::NaiveDate),
    List(Vec<Value>),
    Json(Value),
}

impl FieldValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            FieldValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&chrono::DateTime<chrono::FixedOffset>> {
        match self {
            FieldValue::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<chrono::NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Convert back to JSON. Datetimes become RFC 3339 strings, dates
    /// become `YYYY-MM-DD`.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::String(s) => Value::String(s.clone()),
            FieldValue::DateTime(dt) => Value::String(dt.to_rfc3339()),
            FieldValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            FieldValue::List(items) => Value::Array(items.clone()),
            FieldValue::Json(v) => v.clone(),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<chrono::NaiveDate> for FieldValue {
    fn from(d: chrono::NaiveDate) -> Self {
        FieldValue::Date(d)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

#[cfg(feature = "serde")]
impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

// =============================================================================
// Validated Record
// =============================================================================

/// The sanitized output record: one entry per schema field, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.push((name.into(), value));
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn get_string(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(|v| v.as_str())
    }

    pub fn get_int(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(|v| v.as_int())
    }

    pub fn get_float(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(|v| v.as_float())
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(|v| v.as_bool())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Keys keep field order (`serde_json` is built with `preserve_order`).
    pub fn to_json_map(&self) -> Map<String, Value> {
        self.iter()
            .map(|(name, value)| (name.to_string(), value.to_json()))
            .collect()
    }
}

impl std::ops::Index<&str> for Record {
    type Output = FieldValue;

    fn index(&self, field: &str) -> &Self::Output {
        match self.get(field) {
            Some(value) => value,
            None => panic!("no field named {:?} in record", field),
        }
    }
}

#[cfg(feature = "serde")]
impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

// =============================================================================
// Validation Result
// =============================================================================

/// Outcome of one validation pass
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ValidationResult {
    #[cfg_attr(feature = "serde", serde(skip))]
    pub title: String,
    pub values: Record,
    pub errors: Vec<FieldError>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error_for(&self, field: &str) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.field == field)
    }

    /// Names of the fields that failed, in schema order.
    pub fn invalid_fields(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.field.as_str()).collect()
    }

    /// Names of the fields that did not fail, in schema order.
    pub fn fields_set(&self) -> Vec<&str> {
        self.values
            .keys()
            .filter(|name| self.error_for(name).is_none())
            .collect()
    }

    /// Only the fields that did not fail, as JSON.
    pub fn valid_values(&self) -> Map<String, Value> {
        self.values
            .iter()
            .filter(|(name, _)| self.error_for(name).is_none())
            .map(|(name, value)| (name.to_string(), value.to_json()))
            .collect()
    }

    pub fn to_error(&self) -> Option<ValidationError> {
        if self.errors.is_empty() {
            None
        } else {
            Some(ValidationError::new(&self.title, self.errors.clone()))
        }
    }

    /// The record if every field passed, otherwise the collected errors.
    pub fn into_result(self) -> std::result::Result<Record, ValidationError> {
        if self.errors.is_empty() {
            Ok(self.values)
        } else {
            Err(ValidationError::new(self.title, self.errors))
        }
    }

    /// Serialize as `{"values": {...}, "errors": [...]}`.
    #[cfg(feature = "serde")]
    pub fn to_json(&self, pretty: bool) -> String {
        if pretty {
            serde_json::to_string_pretty(self).unwrap_or_default()
        } else {
            serde_json::to_string(self).unwrap_or_default()
        }
    }
}

// =============================================================================
// Re-exports
// =============================================================================

pub mod prelude {
    pub use crate::config::*;
    pub use crate::schema::*;
    pub use crate::validators::*;
    pub use crate::{
        Error, ErrorKind, FieldError, FieldValue, Record, Rejection, Result, ValidationError,
        ValidationResult,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> ValidationResult {
        let mut values = Record::new();
        values.push("a", FieldValue::String("x".into()));
        values.push("b", FieldValue::Null);
        values.push("c", FieldValue::Float(1.5));
        ValidationResult {
            title: "Model".into(),
            values,
            errors: vec![FieldError::from_rejection(
                "b",
                Rejection::parse_error("Input should be a valid integer, unable to parse string as an integer"),
                Some(json!("foo")),
            )],
        }
    }

    #[test]
    fn test_record_access() {
        let result = sample();
        assert_eq!(result.values.len(), 3);
        assert_eq!(result.values.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(result.values.get_string("a"), Some("x"));
        assert_eq!(result.values.get_float("c"), Some(1.5));
        assert!(result.values["b"].is_null());
        assert!(result.values.get("z").is_none());
    }

    #[test]
    fn test_result_views() {
        let result = sample();
        assert!(!result.is_valid());
        assert_eq!(result.invalid_fields(), vec!["b"]);
        assert_eq!(result.fields_set(), vec!["a", "c"]);

        let valid = result.valid_values();
        assert_eq!(valid.len(), 2);
        assert_eq!(valid["a"], json!("x"));
        assert!(!valid.contains_key("b"));
    }

    #[test]
    fn test_json_maps_keep_field_order() {
        let mut values = Record::new();
        values.push("z", FieldValue::Int(1));
        values.push("a", FieldValue::Null);
        values.push("m", FieldValue::Bool(true));
        let result = ValidationResult {
            title: "Model".into(),
            values,
            errors: vec![FieldError::missing("a")],
        };

        let all: Vec<String> = result.values.to_json_map().keys().cloned().collect();
        assert_eq!(all, vec!["z", "a", "m"]);
        let valid: Vec<String> = result.valid_values().keys().cloned().collect();
        assert_eq!(valid, vec!["z", "m"]);
    }

    #[test]
    fn test_validation_error_display() {
        let err = sample().to_error().unwrap();
        assert_eq!(
            err.to_string(),
            "1 validation error for Model\n\
             b\n  Input should be a valid integer, unable to parse string as an integer \
             [type=parse_error, input_value=\"foo\"]"
        );
    }

    #[test]
    fn test_into_result() {
        let err = sample().into_result().unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.title, "Model");

        let mut values = Record::new();
        values.push("a", FieldValue::Int(1));
        let ok = ValidationResult {
            title: "Model".into(),
            values,
            errors: Vec::new(),
        };
        assert!(ok.to_error().is_none());
        assert_eq!(ok.into_result().unwrap().get_int("a"), Some(1));
    }

    #[test]
    fn test_field_value_to_json() {
        let dt = chrono::DateTime::parse_from_rfc3339("2024-06-26T15:57:33+00:00").unwrap();
        let date = chrono::NaiveDate::from_ymd_opt(2024, 6, 27).unwrap();
        assert_eq!(FieldValue::DateTime(dt).to_json(), json!("2024-06-26T15:57:33+00:00"));
        assert_eq!(FieldValue::Date(date).to_json(), json!("2024-06-27"));
        assert_eq!(FieldValue::Int(3).to_json(), json!(3));
        assert_eq!(FieldValue::List(vec![json!(1)]).to_json(), json!([1]));
        assert_eq!(FieldValue::Null.to_json(), Value::Null);
    }

    #[test]
    fn test_error_kind_names() {
        assert_eq!(ErrorKind::Missing.as_str(), "missing");
        assert_eq!(ErrorKind::TypeMismatch.to_string(), "type_mismatch");
        assert_eq!(ErrorKind::FormatError.as_str(), "format_error");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_to_json_shape() {
        let mut result = sample();
        result.errors.push(FieldError::missing("d"));
        let parsed: Value = serde_json::from_str(&result.to_json(true)).unwrap();
        assert_eq!(
            parsed,
            json!({
                "values": {"a": "x", "b": null, "c": 1.5},
                "errors": [
                    {
                        "field": "b",
                        "kind": "parse_error",
                        "message": "Input should be a valid integer, unable to parse string as an integer",
                        "input": "foo"
                    },
                    {"field": "d", "kind": "missing", "message": "Field required"}
                ]
            })
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_to_json_keeps_field_order() {
        let json = sample().to_json(false);
        let a = json.find("\"a\"").unwrap();
        let b = json.find("\"b\"").unwrap();
        let c = json.find("\"c\"").unwrap();
        assert!(a < b && b < c);
    }
}
