//! Declarative parameter descriptors shared by stages and observers.
//!
//! A stage or observer publishes a schema of [`ParameterDescriptor`]s; consumers (the CLI, a
//! GUI) render it, and [`validate_configuration`] checks a concrete configuration against it
//! before the component is run.

use std::collections::BTreeMap;
use std::path::PathBuf;

use derive_more::derive::Display;
use serde::{Deserialize, Serialize};
use snafu::Snafu;


/// The type of a configuration parameter.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    /// Boolean switch.
    #[display("bool")]
    Bool,
    /// 32-bit integer.
    #[display("int32")]
    I32,
    /// Floating point.
    #[display("double")]
    F64,
    /// Free-form or enumerated string.
    #[display("string")]
    Str,
    /// Filesystem path.
    #[display("path")]
    Path,
}

/// A concrete parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    /// Boolean switch.
    Bool(bool),
    /// 32-bit integer.
    I32(i32),
    /// Floating point.
    F64(f64),
    /// String (also carries [`ParameterType::Path`] values as text).
    Str(String),
}

impl ParameterValue {
    /// The type of this value.  Paths deserialize as strings, so they report
    /// [`ParameterType::Str`]; [`ParameterValue::matches`] accepts that for path parameters.
    pub fn parameter_type(&self) -> ParameterType {
        match self {
            ParameterValue::Bool(_) => ParameterType::Bool,
            ParameterValue::I32(_) => ParameterType::I32,
            ParameterValue::F64(_) => ParameterType::F64,
            ParameterValue::Str(_) => ParameterType::Str,
        }
    }

    /// Whether this value is acceptable for a parameter of the given declared type.
    pub fn matches(&self, declared: ParameterType) -> bool {
        match declared {
            ParameterType::Path => matches!(self, ParameterValue::Str(_)),
            other => self.parameter_type() == other,
        }
    }

    /// The contained boolean, if any.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParameterValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// The contained integer, if any.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            ParameterValue::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// The contained float, if any (integers widen).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::F64(v) => Some(*v),
            ParameterValue::I32(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    /// The contained string, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::Str(v) => Some(v),
            _ => None,
        }
    }

    /// The contained string interpreted as a path, if any.
    pub fn as_path(&self) -> Option<PathBuf> {
        self.as_str().map(PathBuf::from)
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        ParameterValue::Bool(v)
    }
}

impl From<i32> for ParameterValue {
    fn from(v: i32) -> Self {
        ParameterValue::I32(v)
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        ParameterValue::F64(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        ParameterValue::Str(v.to_owned())
    }
}

impl From<String> for ParameterValue {
    fn from(v: String) -> Self {
        ParameterValue::Str(v)
    }
}

/// A configuration map as supplied by a pipeline file or caller.
pub type ParameterMap = BTreeMap<String, ParameterValue>;

/// Gates a parameter on the value of another parameter.
///
/// The gate is advisory: it is evaluated by consumers (a GUI greys the field out, the analyzer
/// CLI skips prompting) rather than by [`validate_configuration`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDependency {
    /// Name of the controlling parameter.
    pub parameter: String,
    /// Values of the controlling parameter for which this parameter is enabled.
    pub values: Vec<ParameterValue>,
}

impl ParameterDependency {
    /// Whether the gated parameter is enabled under `config`.
    pub fn is_enabled(&self, config: &ParameterMap) -> bool {
        config.get(&self.parameter).is_some_and(|value| self.values.contains(value))
    }
}

/// Declares one configurable parameter of a stage or observer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    /// Machine name used in configuration maps.
    pub name: String,
    /// Name shown to users.
    pub display_name: String,
    /// Human-readable description.
    pub description: String,
    /// Declared value type.
    pub parameter_type: ParameterType,
    /// Default applied when the parameter is omitted.  Parameters without a default are
    /// required.
    pub default: Option<ParameterValue>,
    /// Inclusive lower bound for numeric parameters.
    pub min: Option<f64>,
    /// Inclusive upper bound for numeric parameters.
    pub max: Option<f64>,
    /// Permitted values for enumerated string parameters.  Empty means unrestricted.
    pub allowed_strings: Vec<String>,
    /// Optional gate on another parameter's value.
    pub depends_on: Option<ParameterDependency>,
}

impl ParameterDescriptor {
    /// Creates a descriptor with no constraints beyond its type.
    pub fn new(name: &str, display_name: &str, description: &str, ty: ParameterType) -> Self {
        ParameterDescriptor {
            name: name.to_owned(),
            display_name: display_name.to_owned(),
            description: description.to_owned(),
            parameter_type: ty,
            default: None,
            min: None,
            max: None,
            allowed_strings: Vec::new(),
            depends_on: None,
        }
    }

    /// Sets the default value (making the parameter optional).
    pub fn with_default(mut self, default: impl Into<ParameterValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Sets an inclusive numeric range.
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Restricts a string parameter to an enumerated set.
    pub fn with_allowed_strings(mut self, allowed: &[&str]) -> Self {
        self.allowed_strings = allowed.iter().map(|s| (*s).to_owned()).collect();
        self
    }

    /// Gates this parameter on another parameter's value.
    pub fn with_dependency(mut self, parameter: &str, values: Vec<ParameterValue>) -> Self {
        self.depends_on =
            Some(ParameterDependency { parameter: parameter.to_owned(), values });
        self
    }
}

/// Result type for configuration validation.
pub type ConfigResult<T, E = ConfigError> = std::result::Result<T, E>;

/// Error type for configuration validation.
#[derive(Debug, Snafu)]
pub enum ConfigError {
    /// Required parameters were not supplied.
    #[snafu(display("Missing required parameters: {}", names.join(", ")))]
    MissingParameters {
        /// The missing parameter names.
        names: Vec<String>,
    },

    /// A supplied parameter is not part of the schema.
    #[snafu(display("Unknown parameter: {name}"))]
    UnknownParameter {
        /// The unknown parameter name.
        name: String,
    },

    /// A supplied value has the wrong type.
    #[snafu(display("Parameter {name} expects {expected} but got {actual}"))]
    WrongType {
        /// The parameter name.
        name: String,
        /// The declared type.
        expected: ParameterType,
        /// The supplied type.
        actual: ParameterType,
    },

    /// A numeric value lies outside the declared range.
    #[snafu(display("Parameter {name} value {value} is outside [{min}, {max}]"))]
    OutOfRange {
        /// The parameter name.
        name: String,
        /// The supplied value.
        value: f64,
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },

    /// A string value is not in the enumerated set.
    #[snafu(display("Parameter {name} value {value:?} is not one of: {}", allowed.join(", ")))]
    NotAllowed {
        /// The parameter name.
        name: String,
        /// The supplied value.
        value: String,
        /// The permitted values.
        allowed: Vec<String>,
    },
}

impl ConfigError {
    /// The error taxonomy entry this error maps onto.
    pub fn kind(&self) -> crate::ErrorKind {
        crate::ErrorKind::InvalidArgument
    }
}

/// Validates a configuration against a schema.
///
/// Checks required parameters, unknown parameters, value types, numeric ranges, and enumerated
/// strings.  `depends_on` gates are advisory and are not enforced here.
pub fn validate_configuration(
    schema: &[ParameterDescriptor],
    config: &ParameterMap,
) -> ConfigResult<()> {
    let missing: Vec<String> = schema
        .iter()
        .filter(|d| d.default.is_none() && !config.contains_key(&d.name))
        .map(|d| d.name.clone())
        .collect();
    snafu::ensure!(missing.is_empty(), MissingParametersSnafu { names: missing });

    for (name, value) in config {
        let Some(descriptor) = schema.iter().find(|d| &d.name == name) else {
            return UnknownParameterSnafu { name: name.clone() }.fail();
        };
        snafu::ensure!(
            value.matches(descriptor.parameter_type),
            WrongTypeSnafu {
                name: name.clone(),
                expected: descriptor.parameter_type,
                actual: value.parameter_type(),
            }
        );
        if let (Some(min), Some(max)) = (descriptor.min, descriptor.max) {
            if let Some(v) = value.as_f64() {
                snafu::ensure!(
                    v >= min && v <= max,
                    OutOfRangeSnafu { name: name.clone(), value: v, min, max }
                );
            }
        }
        if !descriptor.allowed_strings.is_empty() {
            if let Some(s) = value.as_str() {
                snafu::ensure!(
                    descriptor.allowed_strings.iter().any(|a| a == s),
                    NotAllowedSnafu {
                        name: name.clone(),
                        value: s.to_owned(),
                        allowed: descriptor.allowed_strings.clone(),
                    }
                );
            }
        }
    }
    Ok(())
}

/// Returns `config` with schema defaults filled in for absent parameters.
pub fn apply_defaults(schema: &[ParameterDescriptor], config: &ParameterMap) -> ParameterMap {
    let mut result = config.clone();
    for descriptor in schema {
        if let Some(default) = &descriptor.default {
            result.entry(descriptor.name.clone()).or_insert_with(|| default.clone());
        }
    }
    result
}
