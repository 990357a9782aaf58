//! Built-in type coercion between cell text and field values.
//!
//! Every built-in [`SemanticType`] has a textual parse and a typed format.
//! Empty text is never an error: it becomes the type's zero value for plain
//! fields and `None` for `Option` fields. Malformed text is always reported as
//! a [`CellFault`] so callers can tell blank cells from corrupt ones.

use std::{fmt, str::FromStr};

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::{error::CellFault, sheet::CellValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SemanticType {
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Char,
    Bool,
    String,
    /// Delegated entirely to a codec; has no built-in coercion.
    Custom,
}

impl SemanticType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::Byte => "byte",
            SemanticType::Short => "short",
            SemanticType::Int => "int",
            SemanticType::Long => "long",
            SemanticType::Float => "float",
            SemanticType::Double => "double",
            SemanticType::Char => "char",
            SemanticType::Bool => "bool",
            SemanticType::String => "string",
            SemanticType::Custom => "custom",
        }
    }

    pub fn variants() -> &'static [&'static str] {
        &[
            "byte", "short", "int", "long", "float", "double", "char", "bool", "string", "custom",
        ]
    }

    pub fn is_builtin(&self) -> bool {
        !matches!(self, SemanticType::Custom)
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SemanticType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "byte" | "i8" => Ok(SemanticType::Byte),
            "short" | "i16" => Ok(SemanticType::Short),
            "int" | "integer" | "i32" => Ok(SemanticType::Int),
            "long" | "i64" => Ok(SemanticType::Long),
            "float" | "f32" => Ok(SemanticType::Float),
            "double" | "f64" => Ok(SemanticType::Double),
            "char" => Ok(SemanticType::Char),
            "bool" | "boolean" => Ok(SemanticType::Bool),
            "string" | "text" => Ok(SemanticType::String),
            "custom" => Ok(SemanticType::Custom),
            _ => Err(anyhow!(
                "Unknown semantic type '{value}'. Supported types: {}",
                SemanticType::variants().join(", ")
            )),
        }
    }
}

impl TryFrom<String> for SemanticType {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SemanticType> for String {
    fn from(value: SemanticType) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    Bool(bool),
    String(String),
}

impl Value {
    pub fn semantic_type(&self) -> SemanticType {
        match self {
            Value::Byte(_) => SemanticType::Byte,
            Value::Short(_) => SemanticType::Short,
            Value::Int(_) => SemanticType::Int,
            Value::Long(_) => SemanticType::Long,
            Value::Float(_) => SemanticType::Float,
            Value::Double(_) => SemanticType::Double,
            Value::Char(_) => SemanticType::Char,
            Value::Bool(_) => SemanticType::Bool,
            Value::String(_) => SemanticType::String,
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::Byte(v) => v.to_string(),
            Value::Short(v) => v.to_string(),
            Value::Int(v) => v.to_string(),
            Value::Long(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Double(v) => v.to_string(),
            Value::Char(c) => c.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::String(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// Zero value written into non-nullable fields when their cell is empty.
pub fn zero_value(ty: SemanticType) -> Option<Value> {
    let zero = match ty {
        SemanticType::Byte => Value::Byte(0),
        SemanticType::Short => Value::Short(0),
        SemanticType::Int => Value::Int(0),
        SemanticType::Long => Value::Long(0),
        SemanticType::Float => Value::Float(0.0),
        SemanticType::Double => Value::Double(0.0),
        SemanticType::Char => Value::Char('\0'),
        SemanticType::Bool => Value::Bool(false),
        SemanticType::String => Value::String(String::new()),
        SemanticType::Custom => return None,
    };
    Some(zero)
}

fn parse_number<T: FromStr>(text: &str, ty: SemanticType) -> Result<T, CellFault> {
    text.parse::<T>()
        .map_err(|_| CellFault::malformed(text, ty))
}

/// Parses non-empty cell text; empty text yields `Ok(None)`.
pub fn parse_value(text: &str, ty: SemanticType) -> Result<Option<Value>, CellFault> {
    if text.is_empty() {
        return Ok(None);
    }
    let parsed = match ty {
        SemanticType::Byte => Value::Byte(parse_number(text, ty)?),
        SemanticType::Short => Value::Short(parse_number(text, ty)?),
        SemanticType::Int => Value::Int(parse_number(text, ty)?),
        SemanticType::Long => Value::Long(parse_number(text, ty)?),
        SemanticType::Float => Value::Float(parse_number(text, ty)?),
        SemanticType::Double => Value::Double(parse_number(text, ty)?),
        SemanticType::Char => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Value::Char(c),
                _ => return Err(CellFault::malformed(text, ty)),
            }
        }
        SemanticType::Bool => {
            let lowered = text.to_ascii_lowercase();
            let parsed = match lowered.as_str() {
                "true" | "t" | "yes" | "y" | "1" => true,
                "false" | "f" | "no" | "n" | "0" => false,
                _ => return Err(CellFault::malformed(text, ty)),
            };
            Value::Bool(parsed)
        }
        SemanticType::String => Value::String(text.to_string()),
        SemanticType::Custom => return Err(CellFault::malformed(text, ty)),
    };
    Ok(Some(parsed))
}

/// Parses cell text for a field, applying the empty-cell rule.
pub fn parse_cell(text: &str, ty: SemanticType, nullable: bool) -> Result<Option<Value>, CellFault> {
    if text.is_empty() {
        return Ok(if nullable { None } else { zero_value(ty) });
    }
    parse_value(text, ty)
}

pub fn format_value(value: &Value) -> CellValue {
    match value {
        Value::Byte(v) => CellValue::Int(i64::from(*v)),
        Value::Short(v) => CellValue::Int(i64::from(*v)),
        Value::Int(v) => CellValue::Int(i64::from(*v)),
        Value::Long(v) => CellValue::Int(*v),
        // Widen through the shortest decimal form so 0.1f32 stays "0.1".
        Value::Float(v) => CellValue::Float(v.to_string().parse().unwrap_or(f64::from(*v))),
        Value::Double(v) => CellValue::Float(*v),
        Value::Char(c) => CellValue::String(c.to_string()),
        Value::Bool(b) => CellValue::Bool(*b),
        Value::String(s) => CellValue::String(s.clone()),
    }
}

/// Rust types with a built-in semantic type.
pub trait Primitive: Sized + Clone + Send + Sync + 'static {
    const SEMANTIC_TYPE: SemanticType;

    fn zero() -> Self;
    fn from_value(value: Value) -> Option<Self>;
    fn to_value(&self) -> Value;
}

/// Field representations the schema builder can bind without a codec.
///
/// Implemented for every [`Primitive`] and for `Option` of each; the `Option`
/// forms are nullable: empty cells read as `None` and `None` writes no cell.
pub trait FieldValue: Sized + Send + Sync + 'static {
    const SEMANTIC_TYPE: SemanticType;
    const NULLABLE: bool;

    fn from_text(text: &str) -> Result<Self, CellFault>;
    fn to_cell(&self) -> Option<CellValue>;
}

macro_rules! primitive_field {
    ($ty:ty, $variant:ident, $zero:expr) => {
        impl Primitive for $ty {
            const SEMANTIC_TYPE: SemanticType = SemanticType::$variant;

            fn zero() -> Self {
                $zero
            }

            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn to_value(&self) -> Value {
                Value::$variant(self.clone())
            }
        }

        impl FieldValue for $ty {
            const SEMANTIC_TYPE: SemanticType = SemanticType::$variant;
            const NULLABLE: bool = false;

            fn from_text(text: &str) -> Result<Self, CellFault> {
                Ok(parse_value(text, SemanticType::$variant)?
                    .and_then(<$ty as Primitive>::from_value)
                    .unwrap_or_else(<$ty as Primitive>::zero))
            }

            fn to_cell(&self) -> Option<CellValue> {
                Some(format_value(&Primitive::to_value(self)))
            }
        }

        impl FieldValue for Option<$ty> {
            const SEMANTIC_TYPE: SemanticType = SemanticType::$variant;
            const NULLABLE: bool = true;

            fn from_text(text: &str) -> Result<Self, CellFault> {
                Ok(parse_value(text, SemanticType::$variant)?
                    .and_then(<$ty as Primitive>::from_value))
            }

            fn to_cell(&self) -> Option<CellValue> {
                self.as_ref()
                    .map(|value| format_value(&Primitive::to_value(value)))
            }
        }
    };
}

primitive_field!(i8, Byte, 0);
primitive_field!(i16, Short, 0);
primitive_field!(i32, Int, 0);
primitive_field!(i64, Long, 0);
primitive_field!(f32, Float, 0.0);
primitive_field!(f64, Double, 0.0);
primitive_field!(char, Char, '\0');
primitive_field!(bool, Bool, false);
primitive_field!(String, String, String::new());
