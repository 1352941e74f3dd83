//! Conversions between bean-level field types and query parameter values.

use chrono::{DateTime, Utc};

use crate::{ColumnError, ParamType, Timestamp, Value};

/// A Rust type that can be stored in a mapped column.
///
/// `PARAM_TYPE` is the parameter type the default conversion produces; column
/// builders check it against the declared parameter type at construction.
pub trait ColumnValue: Clone + Send + Sync + 'static {
    const PARAM_TYPE: ParamType;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, ColumnError>;
}

/// Decode a result value into `C`, accepting values stored under a wider
/// parameter type than `C::PARAM_TYPE`.
pub(crate) fn decode<C: ColumnValue>(value: Value) -> Result<C, ColumnError> {
    C::from_value(value.narrow_to(C::PARAM_TYPE))
}

fn mismatch<T>(value: &Value) -> ColumnError {
    if value.is_null() {
        return ColumnError::UnexpectedNull {
            column: String::new(),
        };
    }
    ColumnError::TypeMismatch {
        column: String::new(),
        expected: std::any::type_name::<T>().to_string(),
        found: value.kind().to_string(),
    }
}

fn out_of_range(value: impl ToString) -> ColumnError {
    ColumnError::ValueOutOfRange {
        column: String::new(),
        value: value.to_string(),
    }
}

impl ColumnValue for String {
    const PARAM_TYPE: ParamType = ParamType::Text;

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ColumnError> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl ColumnValue for i32 {
    const PARAM_TYPE: ParamType = ParamType::Integer;

    fn to_value(&self) -> Value {
        Value::Int((*self).into())
    }

    fn from_value(value: Value) -> Result<Self, ColumnError> {
        match value {
            Value::Int(n) => i32::try_from(n).map_err(|_| out_of_range(n)),
            Value::UInt(n) => i32::try_from(n).map_err(|_| out_of_range(n)),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl ColumnValue for i64 {
    const PARAM_TYPE: ParamType = ParamType::BigInt;

    fn to_value(&self) -> Value {
        Value::Int(*self)
    }

    fn from_value(value: Value) -> Result<Self, ColumnError> {
        match value {
            Value::Int(n) => Ok(n),
            Value::UInt(n) => i64::try_from(n).map_err(|_| out_of_range(n)),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

// Unsigned types are stored in signed 64-bit columns (PostgreSQL has no unsigned)
impl ColumnValue for u32 {
    const PARAM_TYPE: ParamType = ParamType::BigInt;

    fn to_value(&self) -> Value {
        Value::Int((*self).into())
    }

    fn from_value(value: Value) -> Result<Self, ColumnError> {
        match value {
            Value::Int(n) => u32::try_from(n).map_err(|_| out_of_range(n)),
            Value::UInt(n) => u32::try_from(n).map_err(|_| out_of_range(n)),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl ColumnValue for u64 {
    const PARAM_TYPE: ParamType = ParamType::BigInt;

    fn to_value(&self) -> Value {
        Value::UInt(*self)
    }

    fn from_value(value: Value) -> Result<Self, ColumnError> {
        match value {
            Value::Int(n) => u64::try_from(n).map_err(|_| out_of_range(n)),
            Value::UInt(n) => Ok(n),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl ColumnValue for f64 {
    const PARAM_TYPE: ParamType = ParamType::Double;

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self, ColumnError> {
        match value {
            Value::Float(n) => Ok(n),
            Value::Int(n) => Ok(n as f64),
            Value::UInt(n) => Ok(n as f64),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl ColumnValue for bool {
    const PARAM_TYPE: ParamType = ParamType::Boolean;

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, ColumnError> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl ColumnValue for Timestamp {
    const PARAM_TYPE: ParamType = ParamType::Timestamp;

    fn to_value(&self) -> Value {
        Value::Datetime(*self)
    }

    fn from_value(value: Value) -> Result<Self, ColumnError> {
        match value {
            Value::Datetime(dt) => Ok(dt),
            // Backends that hand rows over as JSON carry timestamps as RFC 3339 strings
            Value::String(s) => Timestamp::parse(&s).map_err(|e| ColumnError::TypeMismatch {
                column: String::new(),
                expected: "RFC 3339 timestamp".to_string(),
                found: e.to_string(),
            }),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

// Converting truncates to microseconds; see `Timestamp`
impl ColumnValue for DateTime<Utc> {
    const PARAM_TYPE: ParamType = ParamType::Timestamp;

    fn to_value(&self) -> Value {
        Value::Datetime(Timestamp::from(*self))
    }

    fn from_value(value: Value) -> Result<Self, ColumnError> {
        Timestamp::from_value(value).map(Into::into)
    }
}

impl ColumnValue for Vec<u8> {
    const PARAM_TYPE: ParamType = ParamType::Bytes;

    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ColumnError> {
        match value {
            Value::Bytes(b) => Ok(b),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl ColumnValue for Vec<String> {
    const PARAM_TYPE: ParamType = ParamType::TextArray;

    fn to_value(&self) -> Value {
        Value::Strings(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ColumnError> {
        match value {
            Value::Strings(v) => Ok(v),
            Value::Json(serde_json::Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    serde_json::Value::String(s) => Ok(s),
                    other => Err(ColumnError::TypeMismatch {
                        column: String::new(),
                        expected: "string array element".to_string(),
                        found: other.to_string(),
                    }),
                })
                .collect(),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl ColumnValue for serde_json::Value {
    const PARAM_TYPE: ParamType = ParamType::Json;

    fn to_value(&self) -> Value {
        Value::Json(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, ColumnError> {
        match value {
            Value::Json(j) => Ok(j),
            other => Ok(other.to_json()),
        }
    }
}

impl<T: ColumnValue> ColumnValue for Option<T> {
    const PARAM_TYPE: ParamType = T::PARAM_TYPE;

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self, ColumnError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
