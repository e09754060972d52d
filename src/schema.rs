//! Schema definitions and the partial validation pass

use serde_json::{Map, Value};

use crate::coerce::{coerce, json_type_name};
use crate::config::{NullPolicy, ValidatorConfig};
use crate::{Error, FieldError, FieldValue, Record, Rejection, Result, ValidationResult};

// =============================================================================
// Field Schema
// =============================================================================

/// Whether a field appears in the input record at all
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Presence<'a> {
    Absent,
    Present(&'a Value),
}

impl<'a> Presence<'a> {
    pub fn of(record: &'a Map<String, Value>, field: &str) -> Self {
        match record.get(field) {
            Some(value) => Presence::Present(value),
            None => Presence::Absent,
        }
    }
}

/// Schema for a single field
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    pub nullable: bool,
    pub default: Option<FieldValue>,
    pub validators: Vec<Box<dyn FieldValidator>>,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            nullable: false,
            default: None,
            validators: Vec::new(),
        }
    }

    /// Validate one field. A rejected field comes back as the `FieldError`
    /// that the pass records; the caller substitutes the placeholder.
    pub fn validate(
        &self,
        presence: Presence<'_>,
        config: &ValidatorConfig,
    ) -> std::result::Result<FieldValue, FieldError> {
        let value = match presence {
            Presence::Present(Value::Null)
                if !self.accepts_null() && config.null_policy == NullPolicy::Missing =>
            {
                return self.fill_absent(config.capture_input.then_some(Value::Null));
            }
            Presence::Present(v) => v,
            Presence::Absent => return self.fill_absent(None),
        };

        if value.is_null() && self.accepts_null() {
            return Ok(FieldValue::Null);
        }

        let reject = |rejection: Rejection| {
            FieldError::from_rejection(&self.name, rejection, config.capture_input.then(|| value.clone()))
        };

        let coerced = coerce(&self.field_type, value, config.mode).map_err(reject)?;
        self.field_type.check(&coerced).map_err(reject)?;
        for validator in &self.validators {
            validator.validate(&coerced).map_err(reject)?;
        }

        Ok(coerced)
    }

    fn accepts_null(&self) -> bool {
        self.nullable || matches!(self.field_type, FieldType::Any)
    }

    /// Default, then `missing` for a required field, then the placeholder.
    fn fill_absent(&self, input: Option<Value>) -> std::result::Result<FieldValue, FieldError> {
        if let Some(default) = &self.default {
            return Ok(default.clone());
        }
        if self.required {
            let mut error = FieldError::missing(&self.name);
            error.input = input;
            return Err(error);
        }
        Ok(FieldValue::Null)
    }
}

/// Field type enumeration
#[derive(Debug, Clone)]
pub enum FieldType {
    String(StringConstraints),
    Int(IntConstraints),
    Float(NumberConstraints),
    Bool,
    DateTime,
    Date,
    List,
    Any,
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::String(_) => "string",
            FieldType::Int(_) => "int",
            FieldType::Float(_) => "float",
            FieldType::Bool => "bool",
            FieldType::DateTime => "datetime",
            FieldType::Date => "date",
            FieldType::List => "list",
            FieldType::Any => "any",
        }
    }

    /// Run the constraints attached to the type against a coerced value.
    fn check(&self, value: &FieldValue) -> std::result::Result<(), Rejection> {
        match (self, value) {
            (FieldType::String(constraints), FieldValue::String(s)) => constraints.validate(s),
            (FieldType::Int(constraints), FieldValue::Int(i)) => constraints.validate(*i),
            (FieldType::Float(constraints), FieldValue::Float(f)) => constraints.validate(*f),
            _ => Ok(()),
        }
    }
}

// =============================================================================
// Constraints
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct StringConstraints {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub email: bool,
}

impl StringConstraints {
    fn validate(&self, value: &str) -> std::result::Result<(), Rejection> {
        let len = value.chars().count();
        if let Some(min) = self.min_length {
            if len < min {
                return Err(Rejection::value_error(format!(
                    "String should have at least {} characters",
                    min
                )));
            }
        }
        if let Some(max) = self.max_length {
            if len > max {
                return Err(Rejection::value_error(format!(
                    "String should have at most {} characters",
                    max
                )));
            }
        }
        if self.email && !looks_like_email(value) {
            return Err(Rejection::value_error("value is not a valid email address"));
        }
        Ok(())
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
        None => false,
    }
}

#[derive(Debug, Clone, Default)]
pub struct IntConstraints {
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub positive: bool,
}

impl IntConstraints {
    fn validate(&self, value: i64) -> std::result::Result<(), Rejection> {
        if let Some(min) = self.min.filter(|min| value < *min) {
            return Err(Rejection::value_error(format!(
                "Input should be greater than or equal to {}",
                min
            )));
        }
        if let Some(max) = self.max.filter(|max| value > *max) {
            return Err(Rejection::value_error(format!(
                "Input should be less than or equal to {}",
                max
            )));
        }
        if self.positive && value <= 0 {
            return Err(Rejection::value_error("Input should be greater than 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct NumberConstraints {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub positive: bool,
}

impl NumberConstraints {
    fn validate(&self, value: f64) -> std::result::Result<(), Rejection> {
        if let Some(min) = self.min {
            if value < min {
                return Err(Rejection::value_error(format!(
                    "Input should be greater than or equal to {}",
                    min
                )));
            }
        }
        if let Some(max) = self.max {
            if value > max {
                return Err(Rejection::value_error(format!(
                    "Input should be less than or equal to {}",
                    max
                )));
            }
        }
        if self.positive && value <= 0.0 {
            return Err(Rejection::value_error("Input should be greater than 0"));
        }
        Ok(())
    }
}

// =============================================================================
// Field Validator Trait
// =============================================================================

/// Extra check run on a value after it has been coerced
pub trait FieldValidator: std::fmt::Debug + Send + Sync {
    fn validate(&self, value: &FieldValue) -> std::result::Result<(), Rejection>;
    fn clone_box(&self) -> Box<dyn FieldValidator>;
}

impl Clone for Box<dyn FieldValidator> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

// =============================================================================
// Schema Builders
// =============================================================================

/// Settings shared by every field builder
#[derive(Debug, Clone, Default)]
pub struct FieldOptions {
    required: bool,
    nullable: bool,
    default: Option<FieldValue>,
    validators: Vec<Box<dyn FieldValidator>>,
}

impl FieldOptions {
    fn build(self, name: impl Into<String>, field_type: FieldType) -> FieldSchema {
        let mut schema = FieldSchema::new(name, field_type);
        schema.required = self.required;
        schema.nullable = self.nullable;
        schema.default = self.default;
        schema.validators = self.validators;
        schema
    }
}

pub trait FieldBuilder: Sized {
    fn options_mut(&mut self) -> &mut FieldOptions;

    fn into_field_schema(self, name: impl Into<String>) -> FieldSchema;

    fn required(mut self) -> Self {
        self.options_mut().required = true;
        self
    }

    /// Accept an explicit `null` as a valid value.
    fn nullable(mut self) -> Self {
        self.options_mut().nullable = true;
        self
    }

    fn validator(mut self, validator: impl FieldValidator + 'static) -> Self {
        self.options_mut().validators.push(Box::new(validator));
        self
    }
}

/// String field builder
#[derive(Debug, Clone, Default)]
pub struct StringFieldBuilder {
    constraints: StringConstraints,
    options: FieldOptions,
}

impl StringFieldBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, len: usize) -> Self {
        self.constraints.min_length = Some(len);
        self
    }

    pub fn max(mut self, len: usize) -> Self {
        self.constraints.max_length = Some(len);
        self
    }

    pub fn email(mut self) -> Self {
        self.constraints.email = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.options.default = Some(FieldValue::String(value.into()));
        self
    }
}

impl FieldBuilder for StringFieldBuilder {
    fn options_mut(&mut self) -> &mut FieldOptions {
        &mut self.options
    }

    fn into_field_schema(self, name: impl Into<String>) -> FieldSchema {
        self.options.build(name, FieldType::String(self.constraints))
    }
}

/// Integer field builder
#[derive(Debug, Clone, Default)]
pub struct IntFieldBuilder {
    constraints: IntConstraints,
    options: FieldOptions,
}

impl IntFieldBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, value: i64) -> Self {
        self.constraints.min = Some(value);
        self
    }

    pub fn max(mut self, value: i64) -> Self {
        self.constraints.max = Some(value);
        self
    }

    pub fn positive(mut self) -> Self {
        self.constraints.positive = true;
        self
    }

    pub fn default_value(mut self, value: i64) -> Self {
        self.options.default = Some(FieldValue::Int(value));
        self
    }
}

impl FieldBuilder for IntFieldBuilder {
    fn options_mut(&mut self) -> &mut FieldOptions {
        &mut self.options
    }

    fn into_field_schema(self, name: impl Into<String>) -> FieldSchema {
        self.options.build(name, FieldType::Int(self.constraints))
    }
}

/// Float field builder
#[derive(Debug, Clone, Default)]
pub struct FloatFieldBuilder {
    constraints: NumberConstraints,
    options: FieldOptions,
}

impl FloatFieldBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, value: f64) -> Self {
        self.constraints.min = Some(value);
        self
    }

    pub fn max(mut self, value: f64) -> Self {
        self.constraints.max = Some(value);
        self
    }

    pub fn positive(mut self) -> Self {
        self.constraints.positive = true;
        self
    }

    pub fn default_value(mut self, value: f64) -> Self {
        self.options.default = Some(FieldValue::Float(value));
        self
    }
}

impl FieldBuilder for FloatFieldBuilder {
    fn options_mut(&mut self) -> &mut FieldOptions {
        &mut self.options
    }

    fn into_field_schema(self, name: impl Into<String>) -> FieldSchema {
        self.options.build(name, FieldType::Float(self.constraints))
    }
}

/// Boolean field builder
#[derive(Debug, Clone, Default)]
pub struct BoolFieldBuilder {
    options: FieldOptions,
}

impl BoolFieldBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_value(mut self, value: bool) -> Self {
        self.options.default = Some(FieldValue::Bool(value));
        self
    }
}

impl FieldBuilder for BoolFieldBuilder {
    fn options_mut(&mut self) -> &mut FieldOptions {
        &mut self.options
    }

    fn into_field_schema(self, name: impl Into<String>) -> FieldSchema {
        self.options.build(name, FieldType::Bool)
    }
}

/// Datetime field builder
#[derive(Debug, Clone, Default)]
pub struct DateTimeFieldBuilder {
    options: FieldOptions,
}

impl DateTimeFieldBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_value(mut self, value: chrono::DateTime<chrono::FixedOffset>) -> Self {
        self.options.default = Some(FieldValue::DateTime(value));
        self
    }
}

impl FieldBuilder for DateTimeFieldBuilder {
    fn options_mut(&mut self) -> &mut FieldOptions {
        &mut self.options
    }

    fn into_field_schema(self, name: impl Into<String>) -> FieldSchema {
        self.options.build(name, FieldType::DateTime)
    }
}

/// Date field builder
#[derive(Debug, Clone, Default)]
pub struct DateFieldBuilder {
    options: FieldOptions,
}

impl DateFieldBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_value(mut self, value: chrono::NaiveDate) -> Self {
        self.options.default = Some(FieldValue::Date(value));
        self
    }
}

impl FieldBuilder for DateFieldBuilder {
    fn options_mut(&mut self) -> &mut FieldOptions {
        &mut self.options
    }

    fn into_field_schema(self, name: impl Into<String>) -> FieldSchema {
        self.options.build(name, FieldType::Date)
    }
}

/// List field builder. Items are kept as raw JSON.
#[derive(Debug, Clone, Default)]
pub struct ListFieldBuilder {
    options: FieldOptions,
}

impl ListFieldBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_value(mut self, value: Vec<Value>) -> Self {
        self.options.default = Some(FieldValue::List(value));
        self
    }
}

impl FieldBuilder for ListFieldBuilder {
    fn options_mut(&mut self) -> &mut FieldOptions {
        &mut self.options
    }

    fn into_field_schema(self, name: impl Into<String>) -> FieldSchema {
        self.options.build(name, FieldType::List)
    }
}

/// Field that accepts any JSON value
#[derive(Debug, Clone, Default)]
pub struct AnyFieldBuilder {
    options: FieldOptions,
}

impl AnyFieldBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.options.default = Some(FieldValue::Json(value));
        self
    }
}

impl FieldBuilder for AnyFieldBuilder {
    fn options_mut(&mut self) -> &mut FieldOptions {
        &mut self.options
    }

    fn into_field_schema(self, name: impl Into<String>) -> FieldSchema {
        self.options.build(name, FieldType::Any)
    }
}

// =============================================================================
// Record Schema
// =============================================================================

/// An ordered set of field schemas under a title
#[derive(Debug, Clone)]
pub struct Schema {
    pub title: String,
    pub fields: Vec<FieldSchema>,
}

impl Schema {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field. Re-declaring an existing name replaces it in place.
    pub fn field(mut self, name: impl Into<String>, builder: impl FieldBuilder) -> Self {
        let field = builder.into_field_schema(name);
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(slot) => *slot = field,
            None => self.fields.push(field),
        }
        self
    }

    /// A child schema that starts with every field of `self`.
    pub fn extended(&self, title: impl Into<String>) -> Schema {
        Schema {
            title: title.into(),
            fields: self.fields.clone(),
        }
    }

    /// The same fields, all optional and nullable, without defaults.
    pub fn relaxed(&self) -> Schema {
        let fields = self
            .fields
            .iter()
            .cloned()
            .map(|mut field| {
                field.required = false;
                field.nullable = true;
                field.default = None;
                field
            })
            .collect();
        Schema {
            title: self.title.clone(),
            fields,
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate with the default configuration.
    pub fn validate(&self, input: &Value) -> Result<ValidationResult> {
        self.validate_with(input, &ValidatorConfig::default())
    }

    /// Validate `input`, which must be a JSON object.
    pub fn validate_with(&self, input: &Value, config: &ValidatorConfig) -> Result<ValidationResult> {
        match input {
            Value::Object(record) => Ok(self.validate_map(record, config)),
            other => {
                let found = json_type_name(other);
                tracing::debug!(schema = %self.title, found, "rejected non-object input");
                Err(Error::InvalidInputShape { found })
            }
        }
    }

    /// Parse JSON text and validate it with the default configuration.
    pub fn validate_json(&self, text: &str) -> Result<ValidationResult> {
        let input: Value = serde_json::from_str(text)?;
        self.validate(&input)
    }

    /// Validate every field in declaration order. Never fails: rejected
    /// fields become `Null` and their errors are collected.
    pub fn validate_map(&self, record: &Map<String, Value>, config: &ValidatorConfig) -> ValidationResult {
        let mut values = Record::with_capacity(self.fields.len());
        let mut errors = Vec::new();

        for field in &self.fields {
            match field.validate(Presence::of(record, &field.name), config) {
                Ok(value) => values.push(field.name.clone(), value),
                Err(error) => {
                    tracing::debug!(
                        schema = %self.title,
                        field = %field.name,
                        kind = %error.kind,
                        "field rejected"
                    );
                    values.push(field.name.clone(), FieldValue::Null);
                    errors.push(error);
                }
            }
        }

        tracing::trace!(
            schema = %self.title,
            fields = self.fields.len(),
            errors = errors.len(),
            "validation pass complete"
        );

        ValidationResult {
            title: self.title.clone(),
            values,
            errors,
        }
    }
}

// =============================================================================
// Convenience Functions
// =============================================================================

/// Validate `input` against `schema` with the default configuration
pub fn validate(schema: &Schema, input: &Value) -> Result<ValidationResult> {
    schema.validate(input)
}

/// Create a record schema
pub fn schema(title: impl Into<String>) -> Schema {
    Schema::new(title)
}

/// Create a string field
pub fn string() -> StringFieldBuilder {
    StringFieldBuilder::new()
}

/// Create an integer field
pub fn int() -> IntFieldBuilder {
    IntFieldBuilder::new()
}

/// Create a float field
pub fn float() -> FloatFieldBuilder {
    FloatFieldBuilder::new()
}

/// Create a boolean field
pub fn boolean() -> BoolFieldBuilder {
    BoolFieldBuilder::new()
}

/// Create a datetime field
pub fn datetime() -> DateTimeFieldBuilder {
    DateTimeFieldBuilder::new()
}

/// Create a date field
pub fn date() -> DateFieldBuilder {
    DateFieldBuilder::new()
}

/// Create a list field
pub fn list() -> ListFieldBuilder {
    ListFieldBuilder::new()
}

/// Create a field that accepts any value
pub fn any_value() -> AnyFieldBuilder {
    AnyFieldBuilder::new()
}
