//! Coercion of raw JSON values to declared field types
//!
//! Every function here returns either the coerced [`FieldValue`] or a
//! [`Rejection`] describing why the value does not fit. Nothing panics and
//! nothing is thrown; the validator loop decides what to do with a rejection.

use std::fmt;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime};
use serde_json::{Number, Value};

use crate::config::CoercionMode;
use crate::schema::FieldType;
use crate::{ErrorKind, FieldValue};

const STRING_TYPE: &str = "Input should be a valid string";
const INT_TYPE: &str = "Input should be a valid integer";
const INT_PARSING: &str = "Input should be a valid integer, unable to parse string as an integer";
const INT_FROM_FLOAT: &str = "Input should be a valid integer, got a number with a fractional part";
const INT_RANGE: &str = "Input should be a valid integer, number is out of range";
const FLOAT_TYPE: &str = "Input should be a valid number";
const FLOAT_PARSING: &str = "Input should be a valid number, unable to parse string as a number";
const BOOL_TYPE: &str = "Input should be a valid boolean";
const BOOL_PARSING: &str = "Input should be a valid boolean, unable to interpret input";
const DATETIME_TYPE: &str = "Input should be a valid datetime";
const DATETIME_PARSING: &str = "Input should be a valid datetime, invalid format";
const DATETIME_RANGE: &str = "Input should be a valid datetime, timestamp is out of range";
const DATE_TYPE: &str = "Input should be a valid date";
const DATE_PARSING: &str = "Input should be a valid date in the format YYYY-MM-DD";
const LIST_TYPE: &str = "Input should be a valid list";

/// Unix timestamps above this magnitude are read as milliseconds.
const MILLIS_THRESHOLD: u64 = 20_000_000_000;

const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// A coercion failure for one value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub kind: ErrorKind,
    pub message: String,
}

impl Rejection {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeMismatch, message)
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseError, message)
    }

    pub fn format_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FormatError, message)
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValueError, message)
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [type={}]", self.message, self.kind)
    }
}

impl std::error::Error for Rejection {}

/// Coerce `value` to `field_type`.
///
/// `null` is treated like any other value here and is rejected by every type
/// except `Any`; nullability is decided by the caller.
pub fn coerce(field_type: &FieldType, value: &Value, mode: CoercionMode) -> Result<FieldValue, Rejection> {
    match field_type {
        FieldType::String(_) => coerce_string(value),
        FieldType::Int(_) => coerce_int(value, mode),
        FieldType::Float(_) => coerce_float(value, mode),
        FieldType::Bool => coerce_bool(value, mode),
        FieldType::DateTime => coerce_datetime(value, mode),
        FieldType::Date => coerce_date(value),
        FieldType::List => coerce_list(value),
        FieldType::Any => Ok(FieldValue::Json(value.clone())),
    }
}

pub fn coerce_string(value: &Value) -> Result<FieldValue, Rejection> {
    match value {
        Value::String(s) => Ok(FieldValue::String(s.clone())),
        _ => Err(Rejection::type_mismatch(STRING_TYPE)),
    }
}

pub fn coerce_int(value: &Value, mode: CoercionMode) -> Result<FieldValue, Rejection> {
    let lax = mode == CoercionMode::Lax;
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(FieldValue::Int(i));
            }
            if n.is_u64() {
                return Err(Rejection::parse_error(INT_RANGE));
            }
            if !lax {
                return Err(Rejection::type_mismatch(INT_TYPE));
            }
            int_from_float(n.as_f64().unwrap_or(f64::NAN))
        }
        Value::String(s) if lax => s
            .trim()
            .parse::<i64>()
            .map(FieldValue::Int)
            .map_err(|_| Rejection::parse_error(INT_PARSING)),
        Value::Bool(b) if lax => Ok(FieldValue::Int(i64::from(*b))),
        _ => Err(Rejection::type_mismatch(INT_TYPE)),
    }
}

fn int_from_float(f: f64) -> Result<FieldValue, Rejection> {
    if !f.is_finite() || f.fract() != 0.0 {
        return Err(Rejection::parse_error(INT_FROM_FLOAT));
    }
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    if f < i64::MIN as f64 || f >= i64::MAX as f64 {
        return Err(Rejection::parse_error(INT_RANGE));
    }
    Ok(FieldValue::Int(f as i64))
}

pub fn coerce_float(value: &Value, mode: CoercionMode) -> Result<FieldValue, Rejection> {
    let lax = mode == CoercionMode::Lax;
    match value {
        Value::Number(n) => n
            .as_f64()
            .map(FieldValue::Float)
            .ok_or_else(|| Rejection::type_mismatch(FLOAT_TYPE)),
        Value::String(s) if lax => match s.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(FieldValue::Float(f)),
            _ => Err(Rejection::parse_error(FLOAT_PARSING)),
        },
        Value::Bool(b) if lax => Ok(FieldValue::Float(if *b { 1.0 } else { 0.0 })),
        _ => Err(Rejection::type_mismatch(FLOAT_TYPE)),
    }
}

pub fn coerce_bool(value: &Value, mode: CoercionMode) -> Result<FieldValue, Rejection> {
    let lax = mode == CoercionMode::Lax;
    match value {
        Value::Bool(b) => Ok(FieldValue::Bool(*b)),
        Value::Number(n) if lax => match n.as_f64() {
            Some(f) if f == 0.0 => Ok(FieldValue::Bool(false)),
            Some(f) if f == 1.0 => Ok(FieldValue::Bool(true)),
            _ => Err(Rejection::parse_error(BOOL_PARSING)),
        },
        Value::String(s) if lax => parse_bool(s)
            .map(FieldValue::Bool)
            .ok_or_else(|| Rejection::parse_error(BOOL_PARSING)),
        _ => Err(Rejection::type_mismatch(BOOL_TYPE)),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "on" | "t" | "true" | "y" | "yes" => Some(true),
        "0" | "off" | "f" | "false" | "n" | "no" => Some(false),
        _ => None,
    }
}

pub fn coerce_datetime(value: &Value, mode: CoercionMode) -> Result<FieldValue, Rejection> {
    match value {
        Value::String(s) => parse_datetime(s.trim(), mode).map(FieldValue::DateTime),
        Value::Number(n) if mode == CoercionMode::Lax => {
            datetime_from_timestamp(n).map(FieldValue::DateTime)
        }
        _ => Err(Rejection::type_mismatch(DATETIME_TYPE)),
    }
}

fn parse_datetime(s: &str, mode: CoercionMode) -> Result<DateTime<FixedOffset>, Rejection> {
    let parsed = DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z"))
        .ok()
        .or_else(|| {
            NAIVE_DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|naive| naive.and_utc().fixed_offset())
        })
        .or_else(|| {
            if mode != CoercionMode::Lax {
                return None;
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc().fixed_offset())
        });

    match parsed {
        Some(dt) if year_in_range(dt.year()) => Ok(dt),
        Some(_) => Err(Rejection::format_error(DATETIME_RANGE)),
        None => Err(Rejection::format_error(DATETIME_PARSING)),
    }
}

fn datetime_from_timestamp(n: &Number) -> Result<DateTime<FixedOffset>, Rejection> {
    let (secs, nanos) = if let Some(i) = n.as_i64() {
        if i.unsigned_abs() > MILLIS_THRESHOLD {
            (i.div_euclid(1000), (i.rem_euclid(1000) * 1_000_000) as u32)
        } else {
            (i, 0)
        }
    } else {
        let mut f = n.as_f64().unwrap_or(f64::NAN);
        if f.abs() > MILLIS_THRESHOLD as f64 {
            f /= 1000.0;
        }
        if !f.is_finite() || f < i64::MIN as f64 || f >= i64::MAX as f64 {
            return Err(Rejection::format_error(DATETIME_RANGE));
        }
        let whole = f.floor();
        let nanos = ((f - whole) * 1e9).round().min(999_999_999.0) as u32;
        (whole as i64, nanos)
    };

    DateTime::from_timestamp(secs, nanos)
        .filter(|dt| year_in_range(dt.year()))
        .map(|dt| dt.fixed_offset())
        .ok_or_else(|| Rejection::format_error(DATETIME_RANGE))
}

pub fn coerce_date(value: &Value) -> Result<FieldValue, Rejection> {
    match value {
        Value::String(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .ok()
            .filter(|date| year_in_range(date.year()))
            .map(FieldValue::Date)
            .ok_or_else(|| Rejection::format_error(DATE_PARSING)),
        _ => Err(Rejection::type_mismatch(DATE_TYPE)),
    }
}

pub fn coerce_list(value: &Value) -> Result<FieldValue, Rejection> {
    match value {
        Value::Array(items) => Ok(FieldValue::List(items.clone())),
        _ => Err(Rejection::type_mismatch(LIST_TYPE)),
    }
}

/// Four-digit years only, so every accepted value prints back as RFC 3339.
fn year_in_range(year: i32) -> bool {
    (1..=9999).contains(&year)
}

/// JSON type name used in diagnostics.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const LAX: CoercionMode = CoercionMode::Lax;
    const STRICT: CoercionMode = CoercionMode::Strict;

    fn kind(result: Result<FieldValue, Rejection>) -> ErrorKind {
        result.unwrap_err().kind
    }

    #[test]
    fn test_string() {
        assert_eq!(coerce_string(&json!("x")).unwrap(), FieldValue::String("x".into()));
        assert_eq!(kind(coerce_string(&json!(false))), ErrorKind::TypeMismatch);
        assert_eq!(kind(coerce_string(&json!(3))), ErrorKind::TypeMismatch);
        assert_eq!(kind(coerce_string(&Value::Null)), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_int_lax() {
        assert_eq!(coerce_int(&json!(7), LAX).unwrap(), FieldValue::Int(7));
        assert_eq!(coerce_int(&json!(" 3 "), LAX).unwrap(), FieldValue::Int(3));
        assert_eq!(coerce_int(&json!(4.0), LAX).unwrap(), FieldValue::Int(4));
        assert_eq!(coerce_int(&json!(true), LAX).unwrap(), FieldValue::Int(1));

        let err = coerce_int(&json!("foo"), LAX).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ParseError);
        assert_eq!(err.message, INT_PARSING);

        assert_eq!(kind(coerce_int(&json!(4.5), LAX)), ErrorKind::ParseError);
        assert_eq!(kind(coerce_int(&json!(u64::MAX), LAX)), ErrorKind::ParseError);
        assert_eq!(kind(coerce_int(&json!(1e300), LAX)), ErrorKind::ParseError);
        assert_eq!(kind(coerce_int(&json!([1]), LAX)), ErrorKind::TypeMismatch);
        assert_eq!(kind(coerce_int(&Value::Null, LAX)), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_int_strict() {
        assert_eq!(coerce_int(&json!(7), STRICT).unwrap(), FieldValue::Int(7));
        assert_eq!(kind(coerce_int(&json!("3"), STRICT)), ErrorKind::TypeMismatch);
        assert_eq!(kind(coerce_int(&json!(4.0), STRICT)), ErrorKind::TypeMismatch);
        assert_eq!(kind(coerce_int(&json!(true), STRICT)), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_float() {
        assert_eq!(coerce_float(&json!(1.5), LAX).unwrap(), FieldValue::Float(1.5));
        assert_eq!(coerce_float(&json!(2), LAX).unwrap(), FieldValue::Float(2.0));
        assert_eq!(coerce_float(&json!("2.5"), LAX).unwrap(), FieldValue::Float(2.5));
        assert_eq!(coerce_float(&json!(true), LAX).unwrap(), FieldValue::Float(1.0));
        assert_eq!(kind(coerce_float(&json!("abc"), LAX)), ErrorKind::ParseError);
        assert_eq!(kind(coerce_float(&json!("inf"), LAX)), ErrorKind::ParseError);
        assert_eq!(kind(coerce_float(&Value::Null, LAX)), ErrorKind::TypeMismatch);
        assert_eq!(kind(coerce_float(&json!("2.5"), STRICT)), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_bool() {
        assert_eq!(coerce_bool(&json!(true), LAX).unwrap(), FieldValue::Bool(true));
        for s in ["yes", "ON", "t", "1", "True"] {
            assert_eq!(coerce_bool(&json!(s), LAX).unwrap(), FieldValue::Bool(true), "{s}");
        }
        for s in ["no", "off", "F", "0", "false"] {
            assert_eq!(coerce_bool(&json!(s), LAX).unwrap(), FieldValue::Bool(false), "{s}");
        }
        assert_eq!(coerce_bool(&json!(0), LAX).unwrap(), FieldValue::Bool(false));

        let err = coerce_bool(&json!("maybe"), LAX).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ParseError);
        assert_eq!(err.message, BOOL_PARSING);

        assert_eq!(kind(coerce_bool(&json!(2), LAX)), ErrorKind::ParseError);
        assert_eq!(kind(coerce_bool(&json!("2024-06-26T15:57:33"), LAX)), ErrorKind::ParseError);
        assert_eq!(kind(coerce_bool(&json!({}), LAX)), ErrorKind::TypeMismatch);
        assert_eq!(kind(coerce_bool(&json!("yes"), STRICT)), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_datetime_strings() {
        let dt = coerce_datetime(&json!("2024-06-26T15:57:33.276163+02:00"), LAX).unwrap();
        assert_eq!(
            dt.as_datetime().unwrap().to_rfc3339(),
            "2024-06-26T15:57:33.276163+02:00"
        );

        let naive = coerce_datetime(&json!("2024-06-26T15:57:33"), LAX).unwrap();
        assert_eq!(naive.to_json(), json!("2024-06-26T15:57:33+00:00"));

        let spaced = coerce_datetime(&json!("2024-06-26 15:57:33"), STRICT).unwrap();
        assert_eq!(spaced, naive);

        let date_only = coerce_datetime(&json!("2024-06-27"), LAX).unwrap();
        assert_eq!(date_only.to_json(), json!("2024-06-27T00:00:00+00:00"));
        assert_eq!(kind(coerce_datetime(&json!("2024-06-27"), STRICT)), ErrorKind::FormatError);
    }

    #[test]
    fn test_datetime_rejections() {
        assert_eq!(kind(coerce_datetime(&json!(false), LAX)), ErrorKind::TypeMismatch);
        assert_eq!(kind(coerce_datetime(&json!("yesterday"), LAX)), ErrorKind::FormatError);
        assert_eq!(kind(coerce_datetime(&json!("2024-13-40"), LAX)), ErrorKind::FormatError);
        assert_eq!(kind(coerce_datetime(&json!(i64::MAX), LAX)), ErrorKind::FormatError);
        assert_eq!(kind(coerce_datetime(&json!(1_719_417_453), STRICT)), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_datetime_timestamps() {
        let secs = coerce_datetime(&json!(1_719_417_453), LAX).unwrap();
        assert_eq!(secs.to_json(), json!("2024-06-26T15:57:33+00:00"));

        let millis = coerce_datetime(&json!(1_719_417_453_500i64), LAX).unwrap();
        assert_eq!(millis.to_json(), json!("2024-06-26T15:57:33.500+00:00"));

        let fractional = coerce_datetime(&json!(1_719_417_453.25), LAX).unwrap();
        assert_eq!(fractional.to_json(), json!("2024-06-26T15:57:33.250+00:00"));
    }

    #[test]
    fn test_date() {
        let date = coerce_date(&json!("2024-06-27")).unwrap();
        assert_eq!(date.as_date(), NaiveDate::from_ymd_opt(2024, 6, 27));
        assert_eq!(kind(coerce_date(&json!("27/06/2024"))), ErrorKind::FormatError);
        assert_eq!(kind(coerce_date(&json!(20240627))), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_list_and_any() {
        assert_eq!(coerce_list(&json!([1, "a"])).unwrap(), FieldValue::List(vec![json!(1), json!("a")]));
        assert_eq!(kind(coerce_list(&json!("[1]"))), ErrorKind::TypeMismatch);
        assert_eq!(
            coerce(&FieldType::Any, &json!({"k": 1}), LAX).unwrap(),
            FieldValue::Json(json!({"k": 1}))
        );
    }

    #[test]
    fn test_json_type_name() {
        assert_eq!(json_type_name(&json!([])), "array");
        assert_eq!(json_type_name(&json!({})), "object");
        assert_eq!(json_type_name(&json!(1.5)), "number");
    }
}
