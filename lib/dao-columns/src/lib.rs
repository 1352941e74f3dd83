//! dao-columns - Column descriptors mapping bean fields to database columns.
//!
//! A *bean* is a plain data struct whose fields map to the columns of one
//! table. Each field is described by a [`Column`]: which field it is, the
//! column name and parameter type, how its value is turned into a query
//! parameter, whether the database generates it, and how a result value is
//! written back.
//!
//! # Core Concepts
//!
//! - **Column descriptor**: immutable, built once from typed accessor closures
//!   and validated at construction ([`ColumnDescriptor`]).
//! - **Mapping**: the ordered columns of one bean type plus key columns, and the
//!   SQL derived from them ([`ColumnMapping`]).
//! - **Binder**: reads fields off a bean and binds them through a
//!   [`ParameterSink`] ([`bind_insert`], [`bind_update_by_key`], [`bind_key`]).
//! - **Result mapper**: writes row values back onto beans via each column's
//!   [`QueryParameterPopulator`] ([`populate_bean`], [`populate_generated`]).
//!
//! # Example
//!
//! ```text
//! #[derive(Columns, Default)]
//! #[columns(table = "users")]
//! pub struct User {
//!     #[column(key, auto_generated)]
//!     pub id: i64,
//!     pub name: String,
//! }
//!
//! let mapping = User::mapping()?;
//! assert_eq!(mapping.insert_sql(), "INSERT INTO users (name) VALUES ($1) RETURNING id");
//! ```

#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::unwrap_in_result,
        clippy::panic
    )
)]

mod binder;
mod column;
mod convert;
mod descriptor;
mod error;
mod executor;
mod mapping;
mod param;
mod populator;
mod row;
mod time;
mod value;

pub use binder::{
    BoundParameters, ParameterSink, bind_column, bind_insert, bind_key, bind_key_values,
    bind_update_by_key,
};
pub use column::{BeanField, Column};
pub use convert::ColumnValue;
pub use descriptor::{ColumnBuilder, ColumnDescriptor};
pub use error::ColumnError;
pub use executor::{ConnectionConfig, MappingConnection, MappingExecutor};
pub use mapping::{ColumnMapping, Mapped, MappingBuilder};
pub use param::{ParamType, QueryMethod};
pub use populator::{QueryParameterPopulator, SetterPopulator};
pub use row::{MapRow, MissingPopulator, ResultRow, populate_bean, populate_generated};
pub use time::Timestamp;
pub use value::Value;

// Re-export derive macro
pub use dao_columns_derive::Columns;
