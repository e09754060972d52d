//! Checks that run on a field after coercion succeeded

use std::fmt;
use std::sync::Arc;

use crate::schema::FieldValidator;
use crate::{FieldValue, Rejection};

/// Rejects empty strings, empty lists and empty JSON containers
#[derive(Debug, Clone, Copy)]
pub struct NotEmptyValidator;

impl FieldValidator for NotEmptyValidator {
    fn validate(&self, value: &FieldValue) -> Result<(), Rejection> {
        let what = match value {
            FieldValue::String(s) if s.is_empty() => "String",
            FieldValue::List(items) if items.is_empty() => "List",
            FieldValue::Json(serde_json::Value::Array(items)) if items.is_empty() => "List",
            FieldValue::Json(serde_json::Value::Object(map)) if map.is_empty() => "Object",
            _ => return Ok(()),
        };
        Err(Rejection::value_error(format!("{} cannot be empty", what)))
    }

    fn clone_box(&self) -> Box<dyn FieldValidator> {
        Box::new(*self)
    }
}

/// Accepts only values equal to one of a fixed set
///
/// Integers and floats compare by numeric value, so `one_of([1i64, 2])`
/// accepts a float field holding `2.0`.
#[derive(Debug, Clone)]
pub struct OneOfValidator {
    pub allowed: Vec<FieldValue>,
}

impl OneOfValidator {
    pub fn new(allowed: Vec<FieldValue>) -> Self {
        Self { allowed }
    }

    fn permits(&self, value: &FieldValue) -> bool {
        self.allowed.iter().any(|candidate| match (candidate, value) {
            (FieldValue::Int(i), FieldValue::Float(f)) | (FieldValue::Float(f), FieldValue::Int(i)) => {
                *i as f64 == *f
            }
            _ => candidate == value,
        })
    }
}

impl FieldValidator for OneOfValidator {
    fn validate(&self, value: &FieldValue) -> Result<(), Rejection> {
        if value.is_null() || self.permits(value) {
            return Ok(());
        }
        let expected: Vec<String> = self.allowed.iter().map(FieldValue::to_string).collect();
        Err(Rejection::value_error(format!(
            "Input should be {}",
            expected.join(" or ")
        )))
    }

    fn clone_box(&self) -> Box<dyn FieldValidator> {
        Box::new(self.clone())
    }
}

type Predicate = dyn Fn(&FieldValue) -> bool + Send + Sync;

/// A predicate over the coerced value with a fixed failure message
#[derive(Clone)]
pub struct CustomValidator {
    predicate: Arc<Predicate>,
    message: String,
}

impl CustomValidator {
    pub fn new(predicate: impl Fn(&FieldValue) -> bool + Send + Sync + 'static, message: impl Into<String>) -> Self {
        Self {
            predicate: Arc::new(predicate),
            message: message.into(),
        }
    }
}

impl fmt::Debug for CustomValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomValidator")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

impl FieldValidator for CustomValidator {
    fn validate(&self, value: &FieldValue) -> Result<(), Rejection> {
        if (self.predicate)(value) {
            Ok(())
        } else {
            Err(Rejection::value_error(self.message.clone()))
        }
    }

    fn clone_box(&self) -> Box<dyn FieldValidator> {
        Box::new(self.clone())
    }
}

pub fn custom(
    predicate: impl Fn(&FieldValue) -> bool + Send + Sync + 'static,
    message: impl Into<String>,
) -> CustomValidator {
    CustomValidator::new(predicate, message)
}

pub fn not_empty() -> NotEmptyValidator {
    NotEmptyValidator
}

/// `one_of(["active", "inactive"])`, `one_of([1i64, 2, 3])`
pub fn one_of<V: Into<FieldValue>>(allowed: impl IntoIterator<Item = V>) -> OneOfValidator {
    OneOfValidator::new(allowed.into_iter().map(Into::into).collect())
}
