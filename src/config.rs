//! Validator configuration

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How eagerly raw values are converted to the declared field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CoercionMode {
    /// Numeric strings become numbers, boolean-like strings become booleans,
    /// unix timestamps become datetimes.
    #[default]
    Lax,
    /// Only the native JSON type of the field is accepted.
    Strict,
}

/// What an explicit `null` means for a field that is not nullable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum NullPolicy {
    /// `null` is a present value of the wrong type.
    #[default]
    TypeMismatch,
    /// `null` is reported as if the field had been left out.
    Missing,
}

/// Options for a validation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ValidatorConfig {
    pub mode: CoercionMode,
    pub null_policy: NullPolicy,
    /// Attach the offending raw value to each field error.
    pub capture_input: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            mode: CoercionMode::Lax,
            null_policy: NullPolicy::TypeMismatch,
            capture_input: true,
        }
    }
}

impl ValidatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self::default().mode(CoercionMode::Strict)
    }

    pub fn mode(mut self, mode: CoercionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn null_policy(mut self, policy: NullPolicy) -> Self {
        self.null_policy = policy;
        self
    }

    pub fn capture_input(mut self, capture: bool) -> Self {
        self.capture_input = capture;
        self
    }

    /// Load a configuration from JSON. Missing keys keep their defaults.
    #[cfg(feature = "serde")]
    pub fn from_json(text: &str) -> crate::Result<Self> {
        serde_json::from_str(text).map_err(crate::Error::Config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ValidatorConfig::default();
        assert_eq!(config.mode, CoercionMode::Lax);
        assert_eq!(config.null_policy, NullPolicy::TypeMismatch);
        assert!(config.capture_input);
    }

    #[test]
    fn test_builder() {
        let config = ValidatorConfig::strict()
            .null_policy(NullPolicy::Missing)
            .capture_input(false);
        assert_eq!(config.mode, CoercionMode::Strict);
        assert_eq!(config.null_policy, NullPolicy::Missing);
        assert!(!config.capture_input);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_json_partial() {
        let config = ValidatorConfig::from_json(r#"{"mode": "strict"}"#).unwrap();
        assert_eq!(config, ValidatorConfig::strict());

        let config = ValidatorConfig::from_json(r#"{"null_policy": "missing"}"#).unwrap();
        assert_eq!(config.mode, CoercionMode::Lax);
        assert_eq!(config.null_policy, NullPolicy::Missing);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_json_rejects_unknown_mode() {
        let err = ValidatorConfig::from_json(r#"{"mode": "loose"}"#).unwrap_err();
        assert_eq!(err.kind(), "invalid_config");
    }
}
