#![allow(clippy::unwrap_used, clippy::expect_used)]

use dao_columns_postgres::dao_columns;
use dao_columns_postgres::{Columns, Mapped, ParamType};
use pretty_assertions::assert_eq;

#[derive(Columns, Debug, Default)]
#[columns(table = "hosts")]
struct Host {
    #[column(key, auto_generated)]
    id: i64,
    name: String,
    #[column(param_type = "json")]
    labels: Vec<String>,
}

#[test]
fn derive_resolves_through_reexport() {
    let mapping = Host::mapping().unwrap();
    assert_eq!(
        mapping.insert_sql(),
        "INSERT INTO hosts (name, labels) VALUES ($1, $2) RETURNING id"
    );
    assert_eq!(
        mapping.column("labels").unwrap().param_type(),
        ParamType::Json
    );
    let columns: Vec<&str> = dao_columns::ColumnMapping::column_names(mapping);
    assert_eq!(columns, vec!["id", "name", "labels"]);
}
