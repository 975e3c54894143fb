//! Value model for row cells
//!
//! A row holds one of a closed set of value kinds. Numeric classification
//! and coercion live here so the aggregate engine never inspects raw types.
//!
//! Display is the row-to-string conversion used by the persistence layer:
//! integers in decimal, decimals in their shortest exact form with at least
//! one fractional digit (so `infer` reads them back as decimals), text
//! as-is, booleans as `true`/`false`.

use std::fmt;

use crate::error::{CqlError, CqlResult};

/// A single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i32),
    BigInteger(i64),
    Decimal(f64),
    Text(String),
    Boolean(bool),
}

/// Value kinds without payload, for declarations and error context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Integer,
    BigInteger,
    Decimal,
    Text,
    Boolean,
}

impl ValueKind {
    /// Canonical lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Integer => "integer",
            ValueKind::BigInteger => "bigint",
            ValueKind::Decimal => "decimal",
            ValueKind::Text => "text",
            ValueKind::Boolean => "boolean",
        }
    }

    /// Resolve a declared kind name. Anything outside the closed set is a
    /// `TypeMismatch`.
    pub fn from_name(name: &str) -> CqlResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" => Ok(ValueKind::Integer),
            "bigint" | "big_int" => Ok(ValueKind::BigInteger),
            "decimal" | "float" => Ok(ValueKind::Decimal),
            "text" | "string" => Ok(ValueKind::Text),
            "bool" | "boolean" => Ok(ValueKind::Boolean),
            other => Err(CqlError::TypeMismatch {
                expected: "one of integer, bigint, decimal, text, boolean".to_string(),
                found: other.to_string(),
            }),
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ValueKind::Integer | ValueKind::BigInteger | ValueKind::Decimal)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Integer(_) => ValueKind::Integer,
            Value::BigInteger(_) => ValueKind::BigInteger,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::Text(_) => ValueKind::Text,
            Value::Boolean(_) => ValueKind::Boolean,
        }
    }

    /// True for Integer, BigInteger and Decimal only.
    pub fn is_numeric(&self) -> bool {
        self.kind().is_numeric()
    }

    /// Decimal interpretation of a numeric value; `None` for text and booleans.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(f64::from(*v)),
            Value::BigInteger(v) => Some(*v as f64),
            Value::Decimal(v) => Some(*v),
            Value::Text(_) | Value::Boolean(_) => None,
        }
    }

    /// Integer interpretation of Integer/BigInteger values.
    pub fn as_i64(&self) -> CqlResult<i64> {
        match self {
            Value::Integer(v) => Ok(i64::from(*v)),
            Value::BigInteger(v) => Ok(*v),
            other => Err(CqlError::type_mismatch(ValueKind::BigInteger, other.kind())),
        }
    }

    pub fn as_text(&self) -> CqlResult<&str> {
        match self {
            Value::Text(s) => Ok(s),
            other => Err(CqlError::type_mismatch(ValueKind::Text, other.kind())),
        }
    }

    pub fn as_bool(&self) -> CqlResult<bool> {
        match self {
            Value::Boolean(b) => Ok(*b),
            other => Err(CqlError::type_mismatch(ValueKind::Boolean, other.kind())),
        }
    }

    /// Build a value of a declared kind from its textual form.
    pub fn parse_as(kind: ValueKind, text: &str) -> CqlResult<Self> {
        let mismatch = || CqlError::TypeMismatch {
            expected: kind.name().to_string(),
            found: format!("'{}'", text),
        };
        match kind {
            ValueKind::Integer => text.parse().map(Value::Integer).map_err(|_| mismatch()),
            ValueKind::BigInteger => text.parse().map(Value::BigInteger).map_err(|_| mismatch()),
            ValueKind::Decimal => parse_finite(text).map(Value::Decimal).ok_or_else(mismatch),
            ValueKind::Text => Ok(Value::Text(text.to_string())),
            ValueKind::Boolean => match text {
                "true" => Ok(Value::Boolean(true)),
                "false" => Ok(Value::Boolean(false)),
                _ => Err(mismatch()),
            },
        }
    }

    /// Narrowest kind that reads `text` back: Integer, BigInteger, Decimal,
    /// Boolean, falling back to Text.
    pub fn infer(text: &str) -> Self {
        if let Ok(v) = text.parse::<i32>() {
            return Value::Integer(v);
        }
        if let Ok(v) = text.parse::<i64>() {
            return Value::BigInteger(v);
        }
        if let Some(v) = parse_finite(text) {
            return Value::Decimal(v);
        }
        match text {
            "true" => Value::Boolean(true),
            "false" => Value::Boolean(false),
            _ => Value::Text(text.to_string()),
        }
    }
}

/// f64 parse that refuses "nan", "inf" and friends so words stay text.
fn parse_finite(text: &str) -> Option<f64> {
    if !text.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::BigInteger(v) => write!(f, "{}", v),
            Value::Decimal(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{:.1}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::Text(s) => f.write_str(s),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self { Value::Integer(v) }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self { Value::BigInteger(v) }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self { Value::Decimal(v) }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self { Value::Decimal(f64::from(v)) }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self { Value::Boolean(v) }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self { Value::Text(v.to_string()) }
}

impl From<String> for Value {
    fn from(v: String) -> Self { Value::Text(v) }
}
