//! Reading `PgRow` values for the result mapper.

use chrono::{DateTime, NaiveDateTime, Utc};
use dao_columns::{ColumnError, ParamType, ResultRow, Timestamp, Value};
use sqlx::postgres::PgRow;
use sqlx::{Column as _, Row, TypeInfo};

/// `ResultRow` over a borrowed sqlx `PgRow`.
pub struct PgResultRow<'r> {
    row: &'r PgRow,
}

impl<'r> PgResultRow<'r> {
    pub fn new(row: &'r PgRow) -> Self {
        Self { row }
    }
}

impl ResultRow for PgResultRow<'_> {
    fn get(&self, column: &str, param_type: ParamType) -> Result<Value, ColumnError> {
        let value = extract_column_value(self.row, column)?;
        json_from_text(value, param_type)
    }
}

/// JSON columns may be stored as text; parse them when JSON was declared.
fn json_from_text(value: Value, param_type: ParamType) -> Result<Value, ColumnError> {
    match (param_type, value) {
        (ParamType::Json, Value::String(s)) => Ok(Value::Json(serde_json::from_str(&s)?)),
        (_, value) => Ok(value),
    }
}

/// How a PostgreSQL column type is read out of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PgKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    TimestampTz,
    Timestamp,
    Bytea,
    TextArray,
    Json,
    Text,
}

impl PgKind {
    fn from_type_name(type_name: &str) -> Self {
        match type_name {
            "BOOL" => PgKind::Bool,
            "INT2" => PgKind::Int2,
            "INT4" => PgKind::Int4,
            "INT8" => PgKind::Int8,
            "FLOAT4" => PgKind::Float4,
            "FLOAT8" => PgKind::Float8,
            "TIMESTAMPTZ" => PgKind::TimestampTz,
            "TIMESTAMP" => PgKind::Timestamp,
            "BYTEA" => PgKind::Bytea,
            "TEXT[]" | "VARCHAR[]" => PgKind::TextArray,
            "JSONB" | "JSON" => PgKind::Json,
            // VARCHAR, TEXT, CHAR and anything else readable as a string
            _ => PgKind::Text,
        }
    }
}

fn try_get<'r, T>(row: &'r PgRow, idx: usize) -> Result<Option<T>, ColumnError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(idx)
        .map_err(|e| ColumnError::Storage(e.to_string()))
}

/// Extract a column value from a row based on its PostgreSQL type
fn extract_column_value(row: &PgRow, col_name: &str) -> Result<Value, ColumnError> {
    let col_idx = row
        .columns()
        .iter()
        .position(|c| c.name() == col_name)
        .ok_or_else(|| ColumnError::UnknownColumn {
            table: String::new(),
            column: col_name.to_string(),
        })?;

    let kind = PgKind::from_type_name(row.columns()[col_idx].type_info().name());

    let value = match kind {
        PgKind::Bool => try_get::<bool>(row, col_idx)?.map(Value::Bool),
        PgKind::Int2 => try_get::<i16>(row, col_idx)?.map(|n| Value::Int(n.into())),
        PgKind::Int4 => try_get::<i32>(row, col_idx)?.map(|n| Value::Int(n.into())),
        PgKind::Int8 => try_get::<i64>(row, col_idx)?.map(Value::Int),
        PgKind::Float4 => try_get::<f32>(row, col_idx)?.map(|n| Value::Float(n.into())),
        PgKind::Float8 => try_get::<f64>(row, col_idx)?.map(Value::Float),
        PgKind::TimestampTz => try_get::<DateTime<Utc>>(row, col_idx)?
            .map(|dt| Value::Datetime(Timestamp::from(dt))),
        PgKind::Timestamp => try_get::<NaiveDateTime>(row, col_idx)?
            .map(|dt| Value::Datetime(Timestamp::from(dt.and_utc()))),
        PgKind::Bytea => try_get::<Vec<u8>>(row, col_idx)?.map(Value::Bytes),
        PgKind::TextArray => try_get::<Vec<String>>(row, col_idx)?.map(Value::Strings),
        PgKind::Json => try_get::<serde_json::Value>(row, col_idx)?.map(Value::Json),
        PgKind::Text => try_get::<String>(row, col_idx)?.map(Value::String),
    };

    Ok(value.unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn json_text_is_parsed_for_json_columns() {
        let value = json_from_text(Value::from(r#"{"retries": 2}"#), ParamType::Json).unwrap();
        assert_eq!(value, Value::Json(serde_json::json!({"retries": 2})));
    }

    #[test]
    fn text_is_left_alone_for_other_columns() {
        let value = json_from_text(Value::from("{not json"), ParamType::Text).unwrap();
        assert_eq!(value, Value::from("{not json"));

        let value = json_from_text(Value::Int(3), ParamType::Json).unwrap();
        assert_eq!(value, Value::Int(3));
    }

    #[test]
    fn malformed_json_text_is_a_serialization_error() {
        let err = json_from_text(Value::from("{not json"), ParamType::Json).unwrap_err();
        assert!(matches!(err, ColumnError::Serialization(_)));
    }

    #[test]
    fn type_names_select_readers() {
        assert_eq!(PgKind::from_type_name("BOOL"), PgKind::Bool);
        assert_eq!(PgKind::from_type_name("INT2"), PgKind::Int2);
        assert_eq!(PgKind::from_type_name("INT8"), PgKind::Int8);
        assert_eq!(PgKind::from_type_name("FLOAT4"), PgKind::Float4);
        assert_eq!(PgKind::from_type_name("TIMESTAMPTZ"), PgKind::TimestampTz);
        assert_eq!(PgKind::from_type_name("TIMESTAMP"), PgKind::Timestamp);
        assert_eq!(PgKind::from_type_name("BYTEA"), PgKind::Bytea);
        assert_eq!(PgKind::from_type_name("VARCHAR[]"), PgKind::TextArray);
        assert_eq!(PgKind::from_type_name("JSONB"), PgKind::Json);
        assert_eq!(PgKind::from_type_name("VARCHAR"), PgKind::Text);
        assert_eq!(PgKind::from_type_name("CITEXT"), PgKind::Text);
    }
}
