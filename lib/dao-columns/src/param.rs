//! Parameter types and the typed query-binding operations.

use std::fmt;

use crate::{ColumnError, ParameterSink, Value};

/// Semantic SQL type used when binding a column value into a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    Text,
    /// 32-bit integer
    Integer,
    /// 64-bit integer
    BigInt,
    Double,
    Boolean,
    Timestamp,
    Bytes,
    TextArray,
    Json,
}

impl ParamType {
    /// Stable database-agnostic name, as written in `#[column(param_type = "...")]`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::Text => "text",
            ParamType::Integer => "integer",
            ParamType::BigInt => "bigint",
            ParamType::Double => "double",
            ParamType::Boolean => "boolean",
            ParamType::Timestamp => "datetime",
            ParamType::Bytes => "bytes",
            ParamType::TextArray => "text[]",
            ParamType::Json => "json",
        }
    }

    /// Whether values of type `produced` may be bound as `self`.
    ///
    /// Widening is allowed (integer into bigint, integers into double), and a
    /// JSON parameter accepts anything.
    pub fn can_bind(self, produced: ParamType) -> bool {
        use ParamType::*;

        match (self, produced) {
            (a, b) if a == b => true,
            (BigInt, Integer) => true,
            (Double, Integer | BigInt) => true,
            (Json, _) => true,
            _ => false,
        }
    }

    /// Whether a concrete value may be bound as this type. `Null` always is.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (ParamType::Json, _) => true,
            (ParamType::Integer, Value::Int(n)) => i32::try_from(*n).is_ok(),
            (ParamType::Integer, Value::UInt(n)) => i32::try_from(*n).is_ok(),
            (ParamType::BigInt, Value::Int(_)) => true,
            (ParamType::BigInt, Value::UInt(n)) => i64::try_from(*n).is_ok(),
            (ParamType::Double, Value::Float(_) | Value::Int(_) | Value::UInt(_)) => true,
            (ParamType::Text, Value::String(_)) => true,
            (ParamType::Boolean, Value::Bool(_)) => true,
            (ParamType::Timestamp, Value::Datetime(_)) => true,
            (ParamType::Bytes, Value::Bytes(_)) => true,
            (ParamType::TextArray, Value::Strings(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies which typed "set parameter" operation binds a column's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryMethod {
    SetString,
    SetInt,
    SetLong,
    SetDouble,
    SetBoolean,
    SetTimestamp,
    SetBytes,
    SetStringArray,
    SetJson,
    /// Dispatch on the runtime value.
    SetObject,
}

impl QueryMethod {
    /// The default binding operation for a parameter type.
    pub fn for_param_type(param_type: ParamType) -> Self {
        match param_type {
            ParamType::Text => QueryMethod::SetString,
            ParamType::Integer => QueryMethod::SetInt,
            ParamType::BigInt => QueryMethod::SetLong,
            ParamType::Double => QueryMethod::SetDouble,
            ParamType::Boolean => QueryMethod::SetBoolean,
            ParamType::Timestamp => QueryMethod::SetTimestamp,
            ParamType::Bytes => QueryMethod::SetBytes,
            ParamType::TextArray => QueryMethod::SetStringArray,
            ParamType::Json => QueryMethod::SetJson,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            QueryMethod::SetString => "set_string",
            QueryMethod::SetInt => "set_int",
            QueryMethod::SetLong => "set_long",
            QueryMethod::SetDouble => "set_double",
            QueryMethod::SetBoolean => "set_bool",
            QueryMethod::SetTimestamp => "set_timestamp",
            QueryMethod::SetBytes => "set_bytes",
            QueryMethod::SetStringArray => "set_string_array",
            QueryMethod::SetJson => "set_json",
            QueryMethod::SetObject => "set_object",
        }
    }

    /// Whether this operation can bind parameters declared as `param_type`.
    pub fn can_bind(&self, param_type: ParamType) -> bool {
        match self {
            QueryMethod::SetObject | QueryMethod::SetJson => true,
            QueryMethod::SetLong => matches!(param_type, ParamType::BigInt | ParamType::Integer),
            QueryMethod::SetDouble => matches!(
                param_type,
                ParamType::Double | ParamType::BigInt | ParamType::Integer
            ),
            method => *method == QueryMethod::for_param_type(param_type),
        }
    }

    /// Invoke this operation on `sink`.
    ///
    /// `Null` is always bound with `set_null(param_type)` so the backend can
    /// pick a typed null.
    pub fn bind(
        &self,
        sink: &mut dyn ParameterSink,
        param_type: ParamType,
        value: &Value,
    ) -> Result<(), ColumnError> {
        match (self, value) {
            (_, Value::Null) => sink.set_null(param_type),
            (QueryMethod::SetObject, value) => {
                let method = if param_type.accepts(value) {
                    QueryMethod::for_param_type(param_type)
                } else {
                    value
                        .param_type()
                        .map(QueryMethod::for_param_type)
                        .unwrap_or(QueryMethod::SetJson)
                };
                method.bind(sink, param_type, value)
            }
            (QueryMethod::SetString, Value::String(s)) => sink.set_string(s),
            (QueryMethod::SetInt, Value::Int(n)) => sink.set_int(narrow_i32(*n)?),
            (QueryMethod::SetInt, Value::UInt(n)) => {
                let n = i64::try_from(*n).map_err(|_| out_of_range(n))?;
                sink.set_int(narrow_i32(n)?)
            }
            (QueryMethod::SetLong, Value::Int(n)) => sink.set_long(*n),
            (QueryMethod::SetLong, Value::UInt(n)) => {
                sink.set_long(i64::try_from(*n).map_err(|_| out_of_range(n))?)
            }
            (QueryMethod::SetDouble, Value::Float(n)) => sink.set_double(*n),
            (QueryMethod::SetDouble, Value::Int(n)) => sink.set_double(*n as f64),
            (QueryMethod::SetDouble, Value::UInt(n)) => sink.set_double(*n as f64),
            (QueryMethod::SetBoolean, Value::Bool(b)) => sink.set_bool(*b),
            (QueryMethod::SetTimestamp, Value::Datetime(dt)) => sink.set_timestamp(dt),
            (QueryMethod::SetBytes, Value::Bytes(b)) => sink.set_bytes(b),
            (QueryMethod::SetStringArray, Value::Strings(v)) => sink.set_string_array(v),
            (QueryMethod::SetJson, value) => sink.set_json(&value.to_json()),
            (method, value) => Err(ColumnError::TypeMismatch {
                column: String::new(),
                expected: format!("value bindable by {}", method),
                found: value.kind().to_string(),
            }),
        }
    }
}

impl fmt::Display for QueryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn narrow_i32(n: i64) -> Result<i32, ColumnError> {
    i32::try_from(n).map_err(|_| out_of_range(&n))
}

fn out_of_range(n: &impl fmt::Display) -> ColumnError {
    ColumnError::ValueOutOfRange {
        column: String::new(),
        value: n.to_string(),
    }
}
