//! Scalar and composite property values.
//!
//! Stores keep every scalar as text. [`Scalar::encode`] turns booleans and
//! numbers into text and [`Scalar::decode`] infers the type back on read:
//! integers have no decimal point, floats always carry one.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::flags::Shape;

/// A leaf value as decoded from its stored text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Infer a scalar from stored text.
    pub fn decode(text: &str) -> Self {
        match text {
            "True" | "true" => return Self::Bool(true),
            "False" | "false" => return Self::Bool(false),
            _ => {}
        }
        if let Ok(int) = text.parse::<i64>() {
            // Only canonical spellings, so "007" stays text.
            if int.to_string() == text {
                return Self::Int(int);
            }
        }
        if text.contains('.') {
            if let Ok(float) = text.parse::<f64>() {
                if float.is_finite() {
                    return Self::Float(float);
                }
            }
        }
        Self::Text(text.to_string())
    }

    /// Text form written to a store.
    pub fn encode(&self) -> String {
        match self {
            Self::Bool(true) => "True".to_string(),
            Self::Bool(false) => "False".to_string(),
            Self::Int(int) => int.to_string(),
            Self::Float(float) => {
                let text = float.to_string();
                if float.is_finite() && !text.contains('.') {
                    format!("{text}.0")
                } else {
                    text
                }
            }
            Self::Text(text) => text.clone(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A value as seen through the tree: a scalar or a composite of values.
///
/// Also the input of writes, where the composite kind selects the shape of
/// the nodes that get created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Scalar(Scalar),
    /// Field-keyed composite; keys are field names.
    Struct(IndexMap<String, Value>),
    /// Positionally ordered composite.
    Array(Vec<Value>),
    /// Unordered composite without duplicates.
    Set(Vec<Value>),
}

impl Value {
    /// Build a set, dropping values equal to one already present.
    pub fn set_of(values: impl IntoIterator<Item = Value>) -> Self {
        let mut members: Vec<Value> = Vec::new();
        for value in values {
            if !members.contains(&value) {
                members.push(value);
            }
        }
        Self::Set(members)
    }

    /// Build a structure from `(field, value)` pairs.
    pub fn struct_of<K: Into<String>>(fields: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Struct(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// The node shape this value materializes as.
    pub fn shape(&self) -> Shape {
        match self {
            Self::Scalar(_) => Shape::Value,
            Self::Struct(_) => Shape::Structure,
            Self::Array(_) => Shape::OrderedArray,
            Self::Set(_) => Shape::UnorderedSet,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn is_composite(&self) -> bool {
        !matches!(self, Self::Scalar(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(scalar) => write!(f, "{scalar}"),
            Self::Struct(fields) => {
                f.write_str("{")?;
                for (i, (key, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Self::Array(items) | Self::Set(items) => {
                let (open, close) = if matches!(self, Self::Array(_)) {
                    ("[", "]")
                } else {
                    ("{", "}")
                };
                f.write_str(open)?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(close)
            }
        }
    }
}

impl From<Scalar> for Value {
    fn from(value: Scalar) -> Self {
        Self::Scalar(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Scalar(value.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}
