#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! Drives the binder and result mapper through `MappingExecutor` against an
//! in-memory table store.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dao_columns::{
    BoundParameters, ColumnError, ColumnMapping, Columns, MapRow, Mapped, MappingExecutor,
    MissingPopulator, ResultRow, Value, bind_insert, bind_key, bind_update_by_key, populate_bean,
    populate_generated,
};
use pretty_assertions::assert_eq;

#[derive(Default)]
struct MemoryExecutor {
    tables: Mutex<HashMap<String, Vec<MapRow>>>,
    sequence: AtomicI64,
}

fn key_matches<B: 'static>(
    mapping: &ColumnMapping<B>,
    row: &MapRow,
    key: &[Value],
) -> Result<bool, ColumnError> {
    for (column, value) in mapping.key_columns().iter().zip(key) {
        if row.get(column.column_name(), column.param_type())? != *value {
            return Ok(false);
        }
    }
    Ok(true)
}

fn bean_key<B: 'static>(mapping: &ColumnMapping<B>, bean: &B) -> Result<Vec<Value>, ColumnError> {
    let mut params = BoundParameters::default();
    bind_key(mapping, bean, &mut params)?;
    Ok(params.into_values())
}

#[async_trait]
impl MappingExecutor for MemoryExecutor {
    async fn insert<B: Mapped>(&self, bean: &mut B) -> Result<u64, ColumnError> {
        let mapping = B::mapping()?;

        let mut params = BoundParameters::default();
        bind_insert(mapping, bean, &mut params)?;
        let mut row: MapRow = mapping
            .insert_columns()
            .iter()
            .map(|c| c.column_name().to_string())
            .zip(params.into_values())
            .collect();

        let mut returning = MapRow::new();
        for column in mapping.generated_columns() {
            let id = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
            row.insert(column.column_name(), id);
            returning.insert(column.column_name(), id);
        }
        populate_generated(mapping, &returning, bean)?;

        self.tables
            .lock()
            .unwrap()
            .entry(mapping.table().to_string())
            .or_default()
            .push(row);
        Ok(1)
    }

    async fn update<B: Mapped>(&self, bean: &B) -> Result<u64, ColumnError> {
        let mapping = B::mapping()?;
        let key = bean_key(mapping, bean)?;

        let mut params = BoundParameters::default();
        bind_update_by_key(mapping, bean, &mut params)?;
        let updates: Vec<(String, Value)> = mapping
            .update_columns()
            .iter()
            .map(|c| c.column_name().to_string())
            .zip(params.into_values())
            .collect();

        let mut tables = self.tables.lock().unwrap();
        let mut affected = 0;
        for row in tables.entry(mapping.table().to_string()).or_default() {
            if key_matches(mapping, row, &key)? {
                for (column, value) in &updates {
                    row.insert(column.clone(), value.clone());
                }
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn delete<B: Mapped>(&self, bean: &B) -> Result<u64, ColumnError> {
        let mapping = B::mapping()?;
        let key = bean_key(mapping, bean)?;

        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(mapping.table().to_string()).or_default();
        let mut kept = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            if !key_matches(mapping, row, &key)? {
                kept.push(row.clone());
            }
        }
        let removed = rows.len() - kept.len();
        *rows = kept;
        Ok(removed as u64)
    }

    async fn fetch_all<B: Mapped + Default>(&self) -> Result<Vec<B>, ColumnError> {
        let mapping = B::mapping()?;
        let tables = self.tables.lock().unwrap();
        let Some(rows) = tables.get(mapping.table()) else {
            return Ok(Vec::new());
        };
        rows.iter()
            .map(|row| {
                let mut bean = B::default();
                populate_bean(mapping, row, &mut bean, MissingPopulator::Skip)?;
                Ok(bean)
            })
            .collect()
    }

    async fn fetch_by_key<B: Mapped + Default>(
        &self,
        key: &[Value],
    ) -> Result<Option<B>, ColumnError> {
        let mapping = B::mapping()?;
        let tables = self.tables.lock().unwrap();
        let Some(rows) = tables.get(mapping.table()) else {
            return Ok(None);
        };
        for row in rows {
            if key_matches(mapping, row, key)? {
                let mut bean = B::default();
                populate_bean(mapping, row, &mut bean, MissingPopulator::Skip)?;
                return Ok(Some(bean));
            }
        }
        Ok(None)
    }
}

#[derive(Columns, Debug, Default, Clone, PartialEq)]
#[columns(table = "users")]
struct User {
    #[column(key, auto_generated)]
    id: i64,
    name: String,
}

#[derive(Columns, Debug, Default, Clone, PartialEq)]
#[columns(table = "notes")]
struct Note {
    title: String,
    body: Option<String>,
}

#[tokio::test]
async fn insert_assigns_generated_key() {
    let executor = MemoryExecutor::default();
    let mut ann = User {
        name: "Ann".to_string(),
        ..Default::default()
    };

    assert_eq!(executor.insert(&mut ann).await.unwrap(), 1);
    assert_eq!(ann.id, 1);

    let stored = executor.tables.lock().unwrap()["users"][0].clone();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored.get("name", dao_columns::ParamType::Text).unwrap(), Value::from("Ann"));
}

#[tokio::test]
async fn crud_through_mapping() {
    let executor = MemoryExecutor::default();
    let mut ann = User {
        name: "Ann".to_string(),
        ..Default::default()
    };
    let mut bob = User {
        name: "Bob".to_string(),
        ..Default::default()
    };
    executor.insert(&mut ann).await.unwrap();
    executor.insert(&mut bob).await.unwrap();
    assert_eq!(bob.id, 2);

    let fetched: Option<User> = executor.fetch_by_key(&[Value::Int(ann.id)]).await.unwrap();
    assert_eq!(fetched, Some(ann.clone()));

    ann.name = "Annie".to_string();
    assert_eq!(executor.update(&ann).await.unwrap(), 1);

    let all: Vec<User> = executor.fetch_all().await.unwrap();
    assert_eq!(all, vec![ann.clone(), bob.clone()]);

    assert_eq!(executor.delete(&ann).await.unwrap(), 1);
    let all: Vec<User> = executor.fetch_all().await.unwrap();
    assert_eq!(all, vec![bob]);

    let missing: Option<User> = executor.fetch_by_key(&[Value::Int(ann.id)]).await.unwrap();
    assert_eq!(missing, None);
}

#[tokio::test]
async fn key_operations_need_key_columns() {
    let executor = MemoryExecutor::default();
    let mut note = Note {
        title: "todo".to_string(),
        body: None,
    };
    executor.insert(&mut note).await.unwrap();

    let err = executor.delete(&note).await.unwrap_err();
    assert_eq!(
        err,
        ColumnError::NoKeyColumns {
            table: "notes".to_string()
        }
    );

    let notes: Vec<Note> = executor.fetch_all().await.unwrap();
    assert_eq!(notes, vec![note]);
}

#[tokio::test]
async fn failed_delete_leaves_table_intact() {
    let executor = MemoryExecutor::default();
    let mut ann = User {
        name: "Ann".to_string(),
        ..Default::default()
    };
    executor.insert(&mut ann).await.unwrap();
    executor
        .tables
        .lock()
        .unwrap()
        .get_mut("users")
        .unwrap()
        .push(MapRow::new().with("name", "orphan"));

    let err = executor.delete(&ann).await.unwrap_err();
    assert!(matches!(err, ColumnError::UnknownColumn { .. }));
    assert_eq!(executor.tables.lock().unwrap()["users"].len(), 2);
}
