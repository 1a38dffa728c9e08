use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Name of the parameter that carries the implementing class of a plugin.
pub const CLASS_PARAMETER: &str = "__class__";
/// Context of the [`CLASS_PARAMETER`] entry.
pub const CLASS_PARAMETER_CONTEXT: &str = "__python__";

/// Value type of a parameter, fixed by its default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterType {
    Bool,
    Int,
    Double,
    String,
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParameterType::Bool => "bool",
            ParameterType::Int => "int",
            ParameterType::Double => "double",
            ParameterType::String => "string",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
}

impl ParameterValue {
    pub fn kind(&self) -> ParameterType {
        match self {
            ParameterValue::Bool(_) => ParameterType::Bool,
            ParameterValue::Int(_) => ParameterType::Int,
            ParameterValue::Double(_) => ParameterType::Double,
            ParameterValue::String(_) => ParameterType::String,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParameterValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Reads a JSON scalar. Integers are told apart from doubles by their
    /// textual form, so `5` is an int and `5.0` a double.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(ParameterValue::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(ParameterValue::Int(i)),
                None => n.as_f64().map(ParameterValue::Double),
            },
            Value::String(s) => Some(ParameterValue::String(s.clone())),
            _ => None,
        }
    }

    /// Reads a JSON scalar as the given type. Integers are accepted where a
    /// double is expected.
    pub fn from_json_as(value: &Value, kind: ParameterType) -> Option<Self> {
        match (kind, ParameterValue::from_json(value)?) {
            (ParameterType::Double, ParameterValue::Int(i)) => {
                Some(ParameterValue::Double(i as f64))
            }
            (kind, parsed) if parsed.kind() == kind => Some(parsed),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ParameterValue::Bool(b) => Value::Bool(*b),
            ParameterValue::Int(i) => Value::Number((*i).into()),
            ParameterValue::Double(d) => Number::from_f64(*d).map_or(Value::Null, Value::Number),
            ParameterValue::String(s) => Value::String(s.clone()),
        }
    }

    /// Parses command-line text as a value of the given type.
    pub fn parse_as(text: &str, kind: ParameterType) -> Option<Self> {
        match kind {
            ParameterType::Bool => match text.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(ParameterValue::Bool(true)),
                "false" | "no" | "0" => Some(ParameterValue::Bool(false)),
                _ => None,
            },
            ParameterType::Int => text.parse().ok().map(ParameterValue::Int),
            ParameterType::Double => text.parse().ok().map(ParameterValue::Double),
            ParameterType::String => Some(ParameterValue::String(text.to_string())),
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Bool(b) => write!(f, "{b}"),
            ParameterValue::Int(i) => write!(f, "{i}"),
            ParameterValue::Double(d) => write!(f, "{d}"),
            ParameterValue::String(s) => f.write_str(s),
        }
    }
}

/// Constraint class of a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterClass {
    Value,
    Range {
        min: ParameterValue,
        max: ParameterValue,
    },
    Enum {
        choices: Vec<ParameterValue>,
    },
}

impl ParameterClass {
    pub fn name(&self) -> &'static str {
        match self {
            ParameterClass::Value => "value",
            ParameterClass::Range { .. } => "range",
            ParameterClass::Enum { .. } => "enum",
        }
    }
}

/// How a parameter may be set from one configuration source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterMode {
    pub enabled: bool,
    pub alias: String,
}

impl ParameterMode {
    fn named(name: &str) -> Self {
        Self {
            enabled: true,
            alias: name.to_string(),
        }
    }
}

/// A single recipe parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ParameterDocument", into = "ParameterDocument")]
pub struct Parameter {
    pub name: String,
    pub description: String,
    pub context: String,
    pub id: i32,
    pub value: ParameterValue,
    pub default: ParameterValue,
    pub class: ParameterClass,
    /// Whether the value was explicitly set rather than left at its default.
    pub present: bool,
    pub tag: Option<String>,
    pub cli: ParameterMode,
    pub env: ParameterMode,
    pub cfg: ParameterMode,
}

impl Parameter {
    pub fn new_value(
        name: impl Into<String>,
        description: impl Into<String>,
        context: impl Into<String>,
        default: ParameterValue,
    ) -> Self {
        let name = name.into();
        Self {
            cli: ParameterMode::named(&name),
            env: ParameterMode::named(&name),
            cfg: ParameterMode::named(&name),
            name,
            description: description.into(),
            context: context.into(),
            id: 0,
            value: default.clone(),
            default,
            class: ParameterClass::Value,
            present: false,
            tag: None,
        }
    }

    /// The entry appended to decoded parameter lists to remember which
    /// class implements the plugin.
    pub fn class_marker(class_name: &str) -> Self {
        Self::new_value(
            CLASS_PARAMETER,
            "Python class name",
            CLASS_PARAMETER_CONTEXT,
            ParameterValue::String(class_name.to_string()),
        )
    }

    pub fn kind(&self) -> ParameterType {
        self.default.kind()
    }

    /// Replaces the current value, keeping the parameter's type and
    /// constraint.
    pub fn set_value(&mut self, value: ParameterValue) -> Result<(), String> {
        let value = match (self.kind(), value) {
            (ParameterType::Double, ParameterValue::Int(i)) => ParameterValue::Double(i as f64),
            (kind, value) if value.kind() == kind => value,
            (kind, value) => {
                return Err(format!(
                    "Parameter '{}' expects a {kind} value, got {}.",
                    self.name,
                    value.kind()
                ))
            }
        };
        match &self.class {
            ParameterClass::Range { min, max } if !within(&value, min, max) => {
                return Err(format!(
                    "Value {value} for parameter '{}' is outside the range [{min}, {max}].",
                    self.name
                ));
            }
            ParameterClass::Enum { choices } if !choices.contains(&value) => {
                return Err(format!(
                    "Value {value} for parameter '{}' is not one of the allowed choices.",
                    self.name
                ));
            }
            _ => {}
        }
        self.value = value;
        self.present = true;
        Ok(())
    }
}

fn within(value: &ParameterValue, min: &ParameterValue, max: &ParameterValue) -> bool {
    match (value, min, max) {
        (ParameterValue::Int(v), ParameterValue::Int(lo), ParameterValue::Int(hi)) => {
            lo <= v && v <= hi
        }
        (ParameterValue::Double(v), ParameterValue::Double(lo), ParameterValue::Double(hi)) => {
            lo <= v && v <= hi
        }
        _ => true,
    }
}

fn default_enabled() -> bool {
    true
}

/// Wire form of a [`Parameter`].
#[derive(Clone, Serialize, Deserialize)]
struct ParameterDocument {
    name: String,
    class: String,
    #[serde(default)]
    id: i32,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    value: Option<Value>,
    default: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    choices: Option<Vec<Value>>,
    #[serde(default)]
    present: bool,
    #[serde(default)]
    tag: Option<String>,
    #[serde(default = "default_enabled")]
    cli_enabled: bool,
    #[serde(default)]
    cli_alias: Option<String>,
    #[serde(default = "default_enabled")]
    env_enabled: bool,
    #[serde(default)]
    env_alias: Option<String>,
    #[serde(default = "default_enabled")]
    cfg_enabled: bool,
    #[serde(default)]
    cfg_alias: Option<String>,
}

impl TryFrom<ParameterDocument> for Parameter {
    type Error = String;

    fn try_from(doc: ParameterDocument) -> Result<Self, Self::Error> {
        let default = ParameterValue::from_json(&doc.default).ok_or_else(|| {
            format!("Type not supported for the default value of parameter '{}'.", doc.name)
        })?;
        let kind = default.kind();
        let typed = |what: &str, value: &Value| {
            ParameterValue::from_json_as(value, kind).ok_or_else(|| {
                format!(
                    "Type mismatch between '{what}' of parameter '{}' and the type used for the parameter's default value.",
                    doc.name
                )
            })
        };
        let class = match doc.class.as_str() {
            "value" => ParameterClass::Value,
            "range" => {
                if !matches!(kind, ParameterType::Int | ParameterType::Double) {
                    return Err(format!("Type not supported for range parameter '{}'.", doc.name));
                }
                let min = doc.min.as_ref().ok_or_else(|| {
                    format!("Failed to find key 'min' for range parameter '{}'.", doc.name)
                })?;
                let max = doc.max.as_ref().ok_or_else(|| {
                    format!("Failed to find key 'max' for range parameter '{}'.", doc.name)
                })?;
                ParameterClass::Range {
                    min: typed("min", min)?,
                    max: typed("max", max)?,
                }
            }
            "enum" => {
                if kind == ParameterType::Bool {
                    return Err(format!("Type not supported for enum parameter '{}'.", doc.name));
                }
                let choices = doc.choices.as_ref().ok_or_else(|| {
                    format!("Failed to find key 'choices' for enum parameter '{}'.", doc.name)
                })?;
                ParameterClass::Enum {
                    choices: choices
                        .iter()
                        .map(|choice| typed("choices", choice))
                        .collect::<Result<_, _>>()?,
                }
            }
            other => {
                return Err(format!(
                    "Invalid value '{other}' for 'class'. Must be one of 'value', 'range' or 'enum'."
                ))
            }
        };
        let value = match &doc.value {
            Some(value) => typed("value", value)?,
            None => default.clone(),
        };
        let mode = |enabled: bool, alias: Option<String>| ParameterMode {
            enabled,
            alias: alias.unwrap_or_else(|| doc.name.clone()),
        };
        Ok(Parameter {
            cli: mode(doc.cli_enabled, doc.cli_alias.clone()),
            env: mode(doc.env_enabled, doc.env_alias.clone()),
            cfg: mode(doc.cfg_enabled, doc.cfg_alias.clone()),
            description: doc.description.unwrap_or_default(),
            context: doc.context.unwrap_or_default(),
            id: doc.id,
            value,
            default,
            class,
            present: doc.present,
            tag: doc.tag,
            name: doc.name,
        })
    }
}

impl From<Parameter> for ParameterDocument {
    fn from(param: Parameter) -> Self {
        let (min, max, choices) = match &param.class {
            ParameterClass::Value => (None, None, None),
            ParameterClass::Range { min, max } => (Some(min.to_json()), Some(max.to_json()), None),
            ParameterClass::Enum { choices } => {
                (None, None, Some(choices.iter().map(ParameterValue::to_json).collect()))
            }
        };
        ParameterDocument {
            class: param.class.name().to_string(),
            id: param.id,
            description: Some(param.description),
            context: Some(param.context),
            value: Some(param.value.to_json()),
            default: param.default.to_json(),
            min,
            max,
            choices,
            present: param.present,
            tag: param.tag,
            cli_enabled: param.cli.enabled,
            cli_alias: Some(param.cli.alias),
            env_enabled: param.env.enabled,
            env_alias: Some(param.env.alias),
            cfg_enabled: param.cfg.enabled,
            cfg_alias: Some(param.cfg.alias),
            name: param.name,
        }
    }
}
