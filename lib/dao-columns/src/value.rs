//! Query parameter values.
//!
//! `Value` is the form a column takes when it is bound into a prepared query
//! or read back out of a result row, as opposed to the bean's in-memory form.

use crate::{ParamType, Timestamp};

/// A value that can be bound to a query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Strings(Vec<String>),
    Datetime(Timestamp),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The natural parameter type of this value, or `None` for `Null`.
    pub fn param_type(&self) -> Option<ParamType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(ParamType::Boolean),
            Value::Int(n) if i32::try_from(*n).is_ok() => Some(ParamType::Integer),
            Value::Int(_) => Some(ParamType::BigInt),
            Value::UInt(n) if i32::try_from(*n).is_ok() => Some(ParamType::Integer),
            Value::UInt(_) => Some(ParamType::BigInt),
            Value::Float(_) => Some(ParamType::Double),
            Value::String(_) => Some(ParamType::Text),
            Value::Strings(_) => Some(ParamType::TextArray),
            Value::Datetime(_) => Some(ParamType::Timestamp),
            Value::Bytes(_) => Some(ParamType::Bytes),
            Value::Json(_) => Some(ParamType::Json),
        }
    }

    /// Short variant name used in type-mismatch messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Strings(_) => "strings",
            Value::Datetime(_) => "datetime",
            Value::Bytes(_) => "bytes",
            Value::Json(_) => "json",
        }
    }

    /// Bring a value stored under a wider parameter type back to `target`.
    ///
    /// Integral floats become integers, and JSON scalars and arrays become
    /// the variant `target` binds. Anything that does not fit is returned
    /// unchanged so the decoder reports it.
    pub fn narrow_to(self, target: ParamType) -> Value {
        match (target, self) {
            (ParamType::Integer | ParamType::BigInt, Value::Float(n))
                if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 =>
            {
                Value::Int(n as i64)
            }
            (ParamType::Json, value) => value,
            (target, Value::Json(json)) => from_json(target, json),
            (_, value) => value,
        }
    }

    /// Render as JSON, e.g. for binding into a JSON column.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(n) => serde_json::Value::from(*n),
            Value::UInt(n) => serde_json::Value::from(*n),
            Value::Float(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Strings(v) => serde_json::Value::from(v.clone()),
            Value::Datetime(dt) => serde_json::Value::String(dt.to_rfc3339()),
            Value::Bytes(b) => serde_json::Value::from(b.clone()),
            Value::Json(j) => j.clone(),
        }
    }
}

fn from_json(target: ParamType, json: serde_json::Value) -> Value {
    use serde_json::Value as Json;

    match (target, json) {
        (_, Json::Null) => Value::Null,
        (ParamType::Boolean, Json::Bool(b)) => Value::Bool(b),
        (ParamType::Integer | ParamType::BigInt, Json::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(u) = n.as_u64() {
                Value::UInt(u)
            } else {
                match n.as_f64() {
                    Some(f) => Value::Float(f).narrow_to(target),
                    None => Value::Json(Json::Number(n)),
                }
            }
        }
        (ParamType::Double, Json::Number(n)) => match n.as_f64() {
            Some(f) => Value::Float(f),
            None => Value::Json(Json::Number(n)),
        },
        (ParamType::Text, Json::String(s)) => Value::String(s),
        (ParamType::Timestamp, Json::String(s)) => match Timestamp::parse(&s) {
            Ok(ts) => Value::Datetime(ts),
            Err(_) => Value::String(s),
        },
        (ParamType::TextArray, Json::Array(items)) => {
            let strings: Option<Vec<String>> = items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect();
            match strings {
                Some(strings) => Value::Strings(strings),
                None => Value::Json(Json::Array(items)),
            }
        }
        (ParamType::Bytes, Json::Array(items)) => {
            let bytes: Option<Vec<u8>> = items
                .iter()
                .map(|item| item.as_u64().and_then(|n| u8::try_from(n).ok()))
                .collect();
            match bytes {
                Some(bytes) => Value::Bytes(bytes),
                None => Value::Json(Json::Array(items)),
            }
        }
        (_, json) => Value::Json(json),
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::String(s.clone())
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::UInt(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::Strings(v)
    }
}

impl<'a> From<Vec<&'a str>> for Value {
    fn from(v: Vec<&'a str>) -> Self {
        Value::Strings(v.into_iter().map(|s| s.to_string()).collect())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<Timestamp> for Value {
    fn from(dt: Timestamp) -> Self {
        Value::Datetime(dt)
    }
}

impl From<serde_json::Value> for Value {
    fn from(j: serde_json::Value) -> Self {
        Value::Json(j)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
