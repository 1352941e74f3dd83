//! Populating beans from query result rows.

use std::collections::HashMap;

use tracing::trace;

use crate::{ColumnError, ColumnMapping, ParamType, Value};

/// A single result row, addressed by column name.
pub trait ResultRow {
    /// Read `column`, decoding it as `param_type`.
    ///
    /// Missing columns fail with [`ColumnError::UnknownColumn`].
    fn get(&self, column: &str, param_type: ParamType) -> Result<Value, ColumnError>;
}

/// What to do with a column that has no populator while populating a bean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingPopulator {
    /// Leave the field as it is.
    #[default]
    Skip,
    /// Fail with [`ColumnError::MissingPopulator`].
    Fail,
}

/// Row held in memory, e.g. for tests or for values returned by `RETURNING`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapRow {
    values: HashMap<String, Value>,
}

impl MapRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(column.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ResultRow for MapRow {
    fn get(&self, column: &str, _param_type: ParamType) -> Result<Value, ColumnError> {
        self.values
            .get(column)
            .cloned()
            .ok_or_else(|| ColumnError::UnknownColumn {
                table: String::new(),
                column: column.to_string(),
            })
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for MapRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = MapRow::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

/// Write every populatable column of `row` onto `bean`.
///
/// Returns the number of columns written.
pub fn populate_bean<B: 'static>(
    mapping: &ColumnMapping<B>,
    row: &dyn ResultRow,
    bean: &mut B,
    missing: MissingPopulator,
) -> Result<usize, ColumnError> {
    let mut written = 0;
    for column in mapping.columns() {
        let Some(populator) = column.query_parameter_populator() else {
            match missing {
                MissingPopulator::Skip => continue,
                MissingPopulator::Fail => {
                    return Err(ColumnError::MissingPopulator {
                        column: column.column_name().to_string(),
                    });
                }
            }
        };

        let value = row
            .get(column.column_name(), populator.param_type())
            .map_err(|e| with_table(e, mapping.table()))?;
        trace!(column = column.column_name(), kind = value.kind(), "populating field");
        column.populate(bean, value)?;
        written += 1;
    }
    Ok(written)
}

/// Write auto-generated column values (e.g. from `RETURNING`) onto `bean`.
///
/// Every generated column needs a populator; otherwise the generated key
/// would be lost silently.
pub fn populate_generated<B: 'static>(
    mapping: &ColumnMapping<B>,
    row: &dyn ResultRow,
    bean: &mut B,
) -> Result<usize, ColumnError> {
    let generated = mapping.generated_columns();
    for column in &generated {
        let Some(populator) = column.query_parameter_populator() else {
            return Err(ColumnError::MissingPopulator {
                column: column.column_name().to_string(),
            });
        };
        let value = row
            .get(column.column_name(), populator.param_type())
            .map_err(|e| with_table(e, mapping.table()))?;
        column.populate(bean, value)?;
    }
    Ok(generated.len())
}

fn with_table(error: ColumnError, table: &str) -> ColumnError {
    match error {
        ColumnError::UnknownColumn { table: t, column } if t.is_empty() => {
            ColumnError::UnknownColumn {
                table: table.to_string(),
                column,
            }
        }
        other => other,
    }
}
