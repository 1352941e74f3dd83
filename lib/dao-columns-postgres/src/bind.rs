//! PostgreSQL parameter sink.
//!
//! Implements the typed "set parameter" operations of `ParameterSink` on top
//! of sqlx `PgArguments`, so column query methods bind straight into a
//! prepared statement.

use chrono::{DateTime, Utc};
use dao_columns::{ColumnError, ParamType, ParameterSink, Timestamp};
use sqlx::Arguments;
use sqlx::postgres::PgArguments;

/// `ParameterSink` appending to sqlx `PgArguments`.
pub struct PgParameterSink<'a> {
    args: &'a mut PgArguments,
}

impl<'a> PgParameterSink<'a> {
    pub fn new(args: &'a mut PgArguments) -> Self {
        Self { args }
    }
}

impl ParameterSink for PgParameterSink<'_> {
    fn set_string(&mut self, value: &str) -> Result<(), ColumnError> {
        self.args
            .add(value.to_string())
            .map_err(|e| ColumnError::Storage(e.to_string()))
    }

    fn set_int(&mut self, value: i32) -> Result<(), ColumnError> {
        self.args
            .add(value)
            .map_err(|e| ColumnError::Storage(e.to_string()))
    }

    fn set_long(&mut self, value: i64) -> Result<(), ColumnError> {
        self.args
            .add(value)
            .map_err(|e| ColumnError::Storage(e.to_string()))
    }

    fn set_double(&mut self, value: f64) -> Result<(), ColumnError> {
        self.args
            .add(value)
            .map_err(|e| ColumnError::Storage(e.to_string()))
    }

    fn set_bool(&mut self, value: bool) -> Result<(), ColumnError> {
        self.args
            .add(value)
            .map_err(|e| ColumnError::Storage(e.to_string()))
    }

    fn set_timestamp(&mut self, value: &Timestamp) -> Result<(), ColumnError> {
        let dt: DateTime<Utc> = (*value).into();
        self.args
            .add(dt)
            .map_err(|e| ColumnError::Storage(e.to_string()))
    }

    fn set_bytes(&mut self, value: &[u8]) -> Result<(), ColumnError> {
        self.args
            .add(value.to_vec())
            .map_err(|e| ColumnError::Storage(e.to_string()))
    }

    fn set_string_array(&mut self, value: &[String]) -> Result<(), ColumnError> {
        self.args
            .add(value.to_vec())
            .map_err(|e| ColumnError::Storage(e.to_string()))
    }

    fn set_json(&mut self, value: &serde_json::Value) -> Result<(), ColumnError> {
        self.args
            .add(value.clone())
            .map_err(|e| ColumnError::Storage(e.to_string()))
    }

    fn set_null(&mut self, param_type: ParamType) -> Result<(), ColumnError> {
        // Use the parameter type to bind the correct null type
        match param_type {
            ParamType::Text => self.args.add(None::<String>),
            ParamType::Integer => self.args.add(None::<i32>),
            ParamType::BigInt => self.args.add(None::<i64>),
            ParamType::Double => self.args.add(None::<f64>),
            ParamType::Boolean => self.args.add(None::<bool>),
            ParamType::Timestamp => self.args.add(None::<DateTime<Utc>>),
            ParamType::Bytes => self.args.add(None::<Vec<u8>>),
            ParamType::TextArray => self.args.add(None::<Vec<String>>),
            ParamType::Json => self.args.add(None::<serde_json::Value>),
        }
        .map_err(|e| ColumnError::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dao_columns::{ColumnDescriptor, ColumnMapping, Value, bind_insert, bind_key_values};
    use pretty_assertions::assert_eq;

    #[derive(Debug, Default)]
    struct Host {
        id: i64,
        name: String,
        aliases: Vec<String>,
        last_seen: Option<Timestamp>,
    }

    fn host_mapping() -> ColumnMapping<Host> {
        ColumnMapping::builder("hosts")
            .column(
                ColumnDescriptor::builder("id", |h: &Host| h.id)
                    .auto_generated()
                    .setter(|h, v| h.id = v)
                    .build()
                    .unwrap(),
            )
            .column(
                ColumnDescriptor::builder("name", |h: &Host| h.name.clone())
                    .build()
                    .unwrap(),
            )
            .column(
                ColumnDescriptor::builder("aliases", |h: &Host| h.aliases.clone())
                    .build()
                    .unwrap(),
            )
            .column(
                ColumnDescriptor::builder("last_seen", |h: &Host| h.last_seen)
                    .build()
                    .unwrap(),
            )
            .key("id")
            .build()
            .unwrap()
    }

    #[test]
    fn binds_insert_columns_into_pg_arguments() {
        let host = Host {
            name: "db-1".to_string(),
            aliases: vec!["primary".to_string()],
            ..Default::default()
        };
        let mut args = PgArguments::default();
        let count = bind_insert(&host_mapping(), &host, &mut PgParameterSink::new(&mut args))
            .unwrap();
        assert_eq!(count, 3);
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn binds_key_values() {
        let mut args = PgArguments::default();
        bind_key_values(
            &host_mapping(),
            &[Value::Int(4)],
            &mut PgParameterSink::new(&mut args),
        )
        .unwrap();
        assert_eq!(args.len(), 1);
    }
}
