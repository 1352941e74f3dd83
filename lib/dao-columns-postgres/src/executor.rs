//! PostgreSQL implementation of MappingExecutor.

const DEFAULT_MAX_CONNECTIONS: u32 = 16;

use async_trait::async_trait;
use dao_columns::{
    ColumnError, ColumnMapping, ConnectionConfig, Mapped, MappingConnection, MappingExecutor,
    MissingPopulator, Value, bind_insert, bind_key, bind_key_values, bind_update_by_key,
    populate_bean, populate_generated,
};
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use std::ops::Deref;
use tracing::debug;

use crate::{PgParameterSink, PgResultRow};

/// Wrapper around sqlx::PgPool that implements MappingExecutor.
#[derive(Clone, Debug)]
pub struct PgPool(sqlx::PgPool);

impl PgPool {
    /// Create a new PgPool from an sqlx PgPool.
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self(pool)
    }

    /// Get the inner sqlx::PgPool.
    pub fn inner(&self) -> &sqlx::PgPool {
        &self.0
    }
}

impl Deref for PgPool {
    type Target = sqlx::PgPool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl MappingConnection for PgPool {
    async fn connect(config: impl Into<ConnectionConfig> + Send) -> Result<Self, ColumnError> {
        let config = config.into();
        let max_connections = config.max_connections().unwrap_or(DEFAULT_MAX_CONNECTIONS);
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(config.url())
            .await
            .map_err(|e| ColumnError::Storage(e.to_string()))?;
        debug!(max_connections, "connected to PostgreSQL");
        Ok(Self(pool))
    }
}

/// Build a bean from a row, skipping write-only columns.
fn bean_from_row<B: Mapped + Default>(
    mapping: &ColumnMapping<B>,
    row: &PgRow,
) -> Result<B, ColumnError> {
    let mut bean = B::default();
    populate_bean(
        mapping,
        &PgResultRow::new(row),
        &mut bean,
        MissingPopulator::Skip,
    )?;
    Ok(bean)
}

#[async_trait]
impl MappingExecutor for PgPool {
    async fn insert<B: Mapped>(&self, bean: &mut B) -> Result<u64, ColumnError> {
        let mapping = B::mapping()?;
        let sql = mapping.insert_sql();

        let mut args = PgArguments::default();
        bind_insert(mapping, bean, &mut PgParameterSink::new(&mut args))?;

        debug!(table = mapping.table(), %sql, "executing insert");

        if mapping.generated_columns().is_empty() {
            let result = sqlx::query_with(&sql, args)
                .execute(&self.0)
                .await
                .map_err(|e| ColumnError::Storage(e.to_string()))?;
            return Ok(result.rows_affected());
        }

        // Generated columns come back through RETURNING
        let row = sqlx::query_with(&sql, args)
            .fetch_one(&self.0)
            .await
            .map_err(|e| ColumnError::Storage(e.to_string()))?;
        populate_generated(mapping, &PgResultRow::new(&row), bean)?;
        Ok(1)
    }

    async fn update<B: Mapped>(&self, bean: &B) -> Result<u64, ColumnError> {
        let mapping = B::mapping()?;
        let sql = mapping.update_by_key_sql()?;

        let mut args = PgArguments::default();
        bind_update_by_key(mapping, bean, &mut PgParameterSink::new(&mut args))?;

        debug!(table = mapping.table(), %sql, "executing update");

        let result = sqlx::query_with(&sql, args)
            .execute(&self.0)
            .await
            .map_err(|e| ColumnError::Storage(e.to_string()))?;
        Ok(result.rows_affected())
    }

    async fn delete<B: Mapped>(&self, bean: &B) -> Result<u64, ColumnError> {
        let mapping = B::mapping()?;
        let sql = mapping.delete_by_key_sql()?;

        let mut args = PgArguments::default();
        bind_key(mapping, bean, &mut PgParameterSink::new(&mut args))?;

        debug!(table = mapping.table(), %sql, "executing delete");

        let result = sqlx::query_with(&sql, args)
            .execute(&self.0)
            .await
            .map_err(|e| ColumnError::Storage(e.to_string()))?;
        Ok(result.rows_affected())
    }

    async fn fetch_all<B: Mapped + Default>(&self) -> Result<Vec<B>, ColumnError> {
        let mapping = B::mapping()?;
        let sql = mapping.select_all_sql();

        debug!(table = mapping.table(), %sql, "executing select");

        let rows = sqlx::query_with(&sql, PgArguments::default())
            .fetch_all(&self.0)
            .await
            .map_err(|e| ColumnError::Storage(e.to_string()))?;

        rows.iter().map(|row| bean_from_row(mapping, row)).collect()
    }

    async fn fetch_by_key<B: Mapped + Default>(
        &self,
        key: &[Value],
    ) -> Result<Option<B>, ColumnError> {
        let mapping = B::mapping()?;
        let sql = mapping.select_by_key_sql()?;

        let mut args = PgArguments::default();
        bind_key_values(mapping, key, &mut PgParameterSink::new(&mut args))?;

        debug!(table = mapping.table(), %sql, "executing select by key");

        let row = sqlx::query_with(&sql, args)
            .fetch_optional(&self.0)
            .await
            .map_err(|e| ColumnError::Storage(e.to_string()))?;

        row.map(|row| bean_from_row(mapping, &row)).transpose()
    }
}
