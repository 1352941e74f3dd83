//! Ordered column mappings for one bean type and the SQL derived from them.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::{Column, ColumnDescriptor, ColumnError};

/// All columns of one bean type, in declaration order, bound to one table.
///
/// Constructed once during mapping setup and shared read-only afterwards.
pub struct ColumnMapping<B: 'static> {
    table: String,
    columns: Vec<Arc<dyn Column<B>>>,
    keys: Vec<String>,
}

impl<B: 'static> ColumnMapping<B> {
    pub fn builder(table: impl Into<String>) -> MappingBuilder<B> {
        MappingBuilder {
            table: table.into(),
            columns: Vec::new(),
            keys: Vec::new(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[Arc<dyn Column<B>>] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Arc<dyn Column<B>>> {
        self.columns.iter().find(|c| c.column_name() == name)
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.column_name()).collect()
    }

    /// Key columns, in the order they were declared as keys.
    pub fn key_columns(&self) -> Vec<&Arc<dyn Column<B>>> {
        self.keys
            .iter()
            .filter_map(|key| self.column(key))
            .collect()
    }

    /// Columns whose values the caller supplies on INSERT.
    pub fn insert_columns(&self) -> Vec<&Arc<dyn Column<B>>> {
        self.columns
            .iter()
            .filter(|c| !c.is_auto_generated())
            .collect()
    }

    /// Columns the persistence layer fills in.
    pub fn generated_columns(&self) -> Vec<&Arc<dyn Column<B>>> {
        self.columns
            .iter()
            .filter(|c| c.is_auto_generated())
            .collect()
    }

    /// Columns written by UPDATE: neither keys nor generated.
    pub fn update_columns(&self) -> Vec<&Arc<dyn Column<B>>> {
        self.columns
            .iter()
            .filter(|c| !c.is_auto_generated() && !self.is_key(c.column_name()))
            .collect()
    }

    pub fn is_key(&self, column: &str) -> bool {
        self.keys.iter().any(|k| k == column)
    }

    /// INSERT with positional placeholders ($1, $2, ...). Generated columns
    /// are omitted from the value list and returned instead.
    pub fn insert_sql(&self) -> String {
        let insert = self.insert_columns();
        let cols: Vec<&str> = insert.iter().map(|c| c.column_name()).collect();
        let mut sql = if cols.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", self.table)
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.table,
                cols.join(", "),
                placeholders(1, cols.len())
            )
        };

        let generated: Vec<&str> = self
            .generated_columns()
            .iter()
            .map(|c| c.column_name())
            .collect();
        if !generated.is_empty() {
            sql.push_str(&format!(" RETURNING {}", generated.join(", ")));
        }
        sql
    }

    pub fn select_all_sql(&self) -> String {
        format!(
            "SELECT {} FROM {}",
            self.column_names().join(", "),
            self.table
        )
    }

    pub fn select_by_key_sql(&self) -> Result<String, ColumnError> {
        let (where_clause, _) = self.key_where_clause(1)?;
        Ok(format!("{}{}", self.select_all_sql(), where_clause))
    }

    /// UPDATE binding update columns first, then keys.
    ///
    /// Fails when every column is a key or generated, since there is nothing to SET.
    pub fn update_by_key_sql(&self) -> Result<String, ColumnError> {
        self.ensure_updatable()?;
        let update = self.update_columns();
        let sets: Vec<String> = update
            .iter()
            .enumerate()
            .map(|(idx, c)| format!("{} = ${}", c.column_name(), idx + 1))
            .collect();
        let (where_clause, _) = self.key_where_clause(update.len() + 1)?;
        Ok(format!(
            "UPDATE {} SET {}{}",
            self.table,
            sets.join(", "),
            where_clause
        ))
    }

    pub fn delete_by_key_sql(&self) -> Result<String, ColumnError> {
        let (where_clause, _) = self.key_where_clause(1)?;
        Ok(format!("DELETE FROM {}{}", self.table, where_clause))
    }

    pub(crate) fn ensure_updatable(&self) -> Result<(), ColumnError> {
        if self.keys.is_empty() {
            return Err(ColumnError::NoKeyColumns {
                table: self.table.clone(),
            });
        }
        if self.update_columns().is_empty() {
            return Err(ColumnError::NoUpdateColumns {
                table: self.table.clone(),
            });
        }
        Ok(())
    }

    /// Build a WHERE clause over the key columns and return it with the placeholder count.
    fn key_where_clause(&self, start_param: usize) -> Result<(String, usize), ColumnError> {
        if self.keys.is_empty() {
            return Err(ColumnError::NoKeyColumns {
                table: self.table.clone(),
            });
        }

        let clauses: Vec<String> = self
            .keys
            .iter()
            .enumerate()
            .map(|(idx, key)| format!("{} = ${}", key, start_param + idx))
            .collect();
        Ok((format!(" WHERE {}", clauses.join(" AND ")), clauses.len()))
    }
}

impl<B: 'static> fmt::Debug for ColumnMapping<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnMapping")
            .field("table", &self.table)
            .field("columns", &self.column_names())
            .field("keys", &self.keys)
            .finish()
    }
}

fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Builder for [`ColumnMapping`].
pub struct MappingBuilder<B: 'static> {
    table: String,
    columns: Vec<Arc<dyn Column<B>>>,
    keys: Vec<String>,
}

impl<B: 'static> MappingBuilder<B> {
    pub fn column<C: Clone + Send + Sync + 'static>(self, column: ColumnDescriptor<B, C>) -> Self {
        self.dyn_column(Arc::new(column))
    }

    /// Add a column implemented outside this crate.
    pub fn dyn_column(mut self, column: Arc<dyn Column<B>>) -> Self {
        self.columns.push(column);
        self
    }

    /// Mark an already-added or later-added column as part of the key.
    pub fn key(mut self, column: impl Into<String>) -> Self {
        self.keys.push(column.into());
        self
    }

    pub fn build(self) -> Result<ColumnMapping<B>, ColumnError> {
        if self.table.trim().is_empty() {
            return Err(ColumnError::EmptyTableName);
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            let name = column.column_name();
            if name.trim().is_empty() {
                return Err(ColumnError::EmptyColumnName {
                    field: column.bean_field().name().to_string(),
                });
            }
            if !seen.insert(name) {
                return Err(ColumnError::DuplicateColumn {
                    table: self.table.clone(),
                    column: name.to_string(),
                });
            }
        }

        let mut keys_seen = HashSet::new();
        for key in &self.keys {
            if !seen.contains(key.as_str()) {
                return Err(ColumnError::UnknownColumn {
                    table: self.table.clone(),
                    column: key.clone(),
                });
            }
            if !keys_seen.insert(key.as_str()) {
                return Err(ColumnError::DuplicateColumn {
                    table: self.table.clone(),
                    column: key.clone(),
                });
            }
        }

        debug!(
            table = %self.table,
            columns = self.columns.len(),
            keys = ?self.keys,
            "built column mapping"
        );

        Ok(ColumnMapping {
            table: self.table,
            columns: self.columns,
            keys: self.keys,
        })
    }
}

/// Bean types with a process-wide column mapping.
///
/// Usually implemented with `#[derive(Columns)]`.
pub trait Mapped: Sized + Send + Sync + 'static {
    fn mapping() -> Result<&'static ColumnMapping<Self>, ColumnError>;
}
