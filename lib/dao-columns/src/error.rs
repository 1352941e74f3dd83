use thiserror::Error;

use crate::ParamType;

/// Errors raised while building or using column descriptors.
///
/// `Clone` so a mapping that failed to build once can report the same error
/// to every later caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ColumnError {
    #[error("Column name must not be blank (field `{field}`)")]
    EmptyColumnName { field: String },

    #[error("Table name must not be blank")]
    EmptyTableName,

    #[error("Duplicate column `{column}` in mapping for table `{table}`")]
    DuplicateColumn { table: String, column: String },

    #[error("Unknown column `{column}` in mapping for table `{table}`")]
    UnknownColumn { table: String, column: String },

    #[error("Mapping for table `{table}` has no key columns")]
    NoKeyColumns { table: String },

    #[error("Mapping for table `{table}` has no columns to update")]
    NoUpdateColumns { table: String },

    #[error("Column `{column}` declares parameter type {declared} but produces {produced}")]
    ParamTypeMismatch {
        column: String,
        declared: ParamType,
        produced: ParamType,
    },

    #[error("Query method {method} cannot bind {param_type} for column `{column}`")]
    IncompatibleQueryMethod {
        column: String,
        method: String,
        param_type: ParamType,
    },

    #[error("Type mismatch for column `{column}`: expected {expected}, got {found}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    #[error("Unexpected NULL for non-nullable column `{column}`")]
    UnexpectedNull { column: String },

    #[error("Value out of range for column `{column}`: {value}")]
    ValueOutOfRange { column: String, value: String },

    #[error("Column `{column}` has no query parameter populator")]
    MissingPopulator { column: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl ColumnError {
    /// Attach a column name to a conversion error raised before the column was known.
    pub(crate) fn for_column(self, name: &str) -> Self {
        match self {
            ColumnError::TypeMismatch {
                column,
                expected,
                found,
            } if column.is_empty() => ColumnError::TypeMismatch {
                column: name.to_string(),
                expected,
                found,
            },
            ColumnError::UnexpectedNull { column } if column.is_empty() => {
                ColumnError::UnexpectedNull {
                    column: name.to_string(),
                }
            }
            ColumnError::ValueOutOfRange { column, value } if column.is_empty() => {
                ColumnError::ValueOutOfRange {
                    column: name.to_string(),
                    value,
                }
            }
            other => other,
        }
    }
}

impl From<serde_json::Error> for ColumnError {
    fn from(e: serde_json::Error) -> Self {
        ColumnError::Serialization(e.to_string())
    }
}
