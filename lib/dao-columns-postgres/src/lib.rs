//! PostgreSQL implementation for dao-columns.
//!
//! This crate binds column descriptors to sqlx: each column's query method
//! lands in `PgArguments` through [`PgParameterSink`], result rows are read
//! through [`PgResultRow`], and [`PgPool`] executes the statements a
//! `ColumnMapping` generates.
//!
//! # Usage
//!
//! `#[derive(Columns)]` expands to paths under `dao_columns`. Either depend
//! on `dao-columns` directly or bring the re-exported crate into scope:
//!
//! ```text
//! use dao_columns_postgres::dao_columns;
//! use dao_columns_postgres::{Columns, MappingConnection, MappingExecutor, PgPool};
//!
//! #[derive(Columns, Default)]
//! #[columns(table = "users")]
//! pub struct User {
//!     #[column(key, auto_generated)]
//!     pub id: i64,
//!     pub name: String,
//! }
//!
//! let pool = PgPool::connect("postgres://localhost/app").await?;
//! let mut user = User { name: "Ann".to_string(), ..Default::default() };
//! pool.insert(&mut user).await?;   // user.id now holds the generated key
//! ```

#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::unwrap_in_result)
)]

mod bind;
mod executor;
mod row;

pub use bind::PgParameterSink;
pub use executor::PgPool;
pub use row::PgResultRow;

// Re-export core types for convenience
pub use dao_columns;
pub use dao_columns::{
    Column, ColumnDescriptor, ColumnError, ColumnMapping, Columns, ConnectionConfig, Mapped,
    MappingConnection, MappingExecutor, ParamType, QueryMethod, Value,
};
