//! Binding bean values into query parameters.
//!
//! For every column the binder reads the field off the bean, converts it to
//! its parameter form, and hands it to the column's [`QueryMethod`]. The
//! order of bound parameters always matches the placeholders produced by
//! [`ColumnMapping`].

use std::sync::Arc;

use tracing::trace;

use crate::{Column, ColumnError, ColumnMapping, ParamType, Timestamp, Value};

/// Target of typed "set parameter" operations, implemented by database backends.
///
/// Each call appends the next positional parameter.
pub trait ParameterSink {
    fn set_string(&mut self, value: &str) -> Result<(), ColumnError>;
    fn set_int(&mut self, value: i32) -> Result<(), ColumnError>;
    fn set_long(&mut self, value: i64) -> Result<(), ColumnError>;
    fn set_double(&mut self, value: f64) -> Result<(), ColumnError>;
    fn set_bool(&mut self, value: bool) -> Result<(), ColumnError>;
    fn set_timestamp(&mut self, value: &Timestamp) -> Result<(), ColumnError>;
    fn set_bytes(&mut self, value: &[u8]) -> Result<(), ColumnError>;
    fn set_string_array(&mut self, value: &[String]) -> Result<(), ColumnError>;
    fn set_json(&mut self, value: &serde_json::Value) -> Result<(), ColumnError>;
    fn set_null(&mut self, param_type: ParamType) -> Result<(), ColumnError>;
}

/// In-memory sink recording each bound parameter with the type it was bound as.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundParameters {
    params: Vec<(ParamType, Value)>,
}

impl BoundParameters {
    pub fn params(&self) -> &[(ParamType, Value)] {
        &self.params
    }

    pub fn values(&self) -> Vec<&Value> {
        self.params.iter().map(|(_, v)| v).collect()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.params.into_iter().map(|(_, v)| v).collect()
    }

    fn push(&mut self, param_type: ParamType, value: Value) -> Result<(), ColumnError> {
        self.params.push((param_type, value));
        Ok(())
    }
}

impl ParameterSink for BoundParameters {
    fn set_string(&mut self, value: &str) -> Result<(), ColumnError> {
        self.push(ParamType::Text, Value::from(value))
    }

    fn set_int(&mut self, value: i32) -> Result<(), ColumnError> {
        self.push(ParamType::Integer, Value::from(value))
    }

    fn set_long(&mut self, value: i64) -> Result<(), ColumnError> {
        self.push(ParamType::BigInt, Value::Int(value))
    }

    fn set_double(&mut self, value: f64) -> Result<(), ColumnError> {
        self.push(ParamType::Double, Value::Float(value))
    }

    fn set_bool(&mut self, value: bool) -> Result<(), ColumnError> {
        self.push(ParamType::Boolean, Value::Bool(value))
    }

    fn set_timestamp(&mut self, value: &Timestamp) -> Result<(), ColumnError> {
        self.push(ParamType::Timestamp, Value::Datetime(*value))
    }

    fn set_bytes(&mut self, value: &[u8]) -> Result<(), ColumnError> {
        self.push(ParamType::Bytes, Value::Bytes(value.to_vec()))
    }

    fn set_string_array(&mut self, value: &[String]) -> Result<(), ColumnError> {
        self.push(ParamType::TextArray, Value::Strings(value.to_vec()))
    }

    fn set_json(&mut self, value: &serde_json::Value) -> Result<(), ColumnError> {
        self.push(ParamType::Json, Value::Json(value.clone()))
    }

    fn set_null(&mut self, param_type: ParamType) -> Result<(), ColumnError> {
        self.push(param_type, Value::Null)
    }
}

/// Bind one column of `bean`.
pub fn bind_column<B: 'static>(
    column: &dyn Column<B>,
    bean: &B,
    sink: &mut dyn ParameterSink,
) -> Result<(), ColumnError> {
    let value = column.bind_value(bean)?;
    trace!(
        column = column.column_name(),
        method = %column.query_method(),
        kind = value.kind(),
        "binding parameter"
    );
    column
        .query_method()
        .bind(sink, column.param_type(), &value)
        .map_err(|e| e.for_column(column.column_name()))
}

fn bind_all<'a, B: 'static>(
    columns: impl IntoIterator<Item = &'a Arc<dyn Column<B>>>,
    bean: &B,
    sink: &mut dyn ParameterSink,
) -> Result<usize, ColumnError> {
    let mut count = 0;
    for column in columns {
        bind_column(&**column, bean, sink)?;
        count += 1;
    }
    Ok(count)
}

/// Bind the parameters of [`ColumnMapping::insert_sql`]. Auto-generated
/// columns are never bound.
pub fn bind_insert<B: 'static>(
    mapping: &ColumnMapping<B>,
    bean: &B,
    sink: &mut dyn ParameterSink,
) -> Result<usize, ColumnError> {
    bind_all(mapping.insert_columns(), bean, sink)
}

/// Bind the parameters of [`ColumnMapping::update_by_key_sql`].
pub fn bind_update_by_key<B: 'static>(
    mapping: &ColumnMapping<B>,
    bean: &B,
    sink: &mut dyn ParameterSink,
) -> Result<usize, ColumnError> {
    mapping.ensure_updatable()?;
    let count = bind_all(mapping.update_columns(), bean, sink)?;
    Ok(count + bind_key(mapping, bean, sink)?)
}

/// Bind the key parameters of the `*_by_key_sql` statements from a bean.
pub fn bind_key<B: 'static>(
    mapping: &ColumnMapping<B>,
    bean: &B,
    sink: &mut dyn ParameterSink,
) -> Result<usize, ColumnError> {
    let keys = mapping.key_columns();
    if keys.is_empty() {
        return Err(ColumnError::NoKeyColumns {
            table: mapping.table().to_string(),
        });
    }
    bind_all(keys, bean, sink)
}

/// Bind explicit key values, e.g. for a lookup without a bean at hand.
pub fn bind_key_values<B: 'static>(
    mapping: &ColumnMapping<B>,
    key_values: &[Value],
    sink: &mut dyn ParameterSink,
) -> Result<usize, ColumnError> {
    let keys = mapping.key_columns();
    if keys.is_empty() {
        return Err(ColumnError::NoKeyColumns {
            table: mapping.table().to_string(),
        });
    }
    if keys.len() != key_values.len() {
        return Err(ColumnError::TypeMismatch {
            column: mapping.table().to_string(),
            expected: format!("{} key values", keys.len()),
            found: format!("{} key values", key_values.len()),
        });
    }

    for (column, value) in keys.iter().zip(key_values) {
        if !column.param_type().accepts(value) {
            return Err(ColumnError::ParamTypeMismatch {
                column: column.column_name().to_string(),
                declared: column.param_type(),
                produced: value.param_type().unwrap_or(column.param_type()),
            });
        }
        column
            .query_method()
            .bind(sink, column.param_type(), value)
            .map_err(|e| e.for_column(column.column_name()))?;
    }
    Ok(keys.len())
}
