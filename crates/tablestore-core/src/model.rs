//! Rows, keys and change descriptions exchanged with the service.
//!
//! Kept deliberately small: just enough structure for the engine to encode
//! requests, address rows by primary key when narrowing a retry, and hand
//! decoded rows back to the caller.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum PrimaryKeyValue {
    Integer(i64),
    String(String),
    Binary(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKeyColumn {
    pub name: String,
    pub value: PrimaryKeyValue,
}

/// Ordered primary key columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrimaryKey {
    pub columns: Vec<PrimaryKeyColumn>,
}

impl PrimaryKey {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn integer(mut self, name: impl Into<String>, value: i64) -> Self {
        self.columns.push(PrimaryKeyColumn {
            name: name.into(),
            value: PrimaryKeyValue::Integer(value),
        });
        self
    }

    pub fn string(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.columns.push(PrimaryKeyColumn {
            name: name.into(),
            value: PrimaryKeyValue::String(value.into()),
        });
        self
    }

    pub fn binary(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.columns.push(PrimaryKeyColumn {
            name: name.into(),
            value: PrimaryKeyValue::Binary(value.into()),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Integer(i64),
    String(String),
    Binary(Vec<u8>),
    Boolean(bool),
    Double(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub value: ColumnValue,
    /// Cell version in milliseconds; `None` lets the server assign one.
    pub timestamp: Option<i64>,
}

impl Column {
    pub fn new(name: impl Into<String>, value: ColumnValue) -> Self {
        Self {
            name: name.into(),
            value,
            timestamp: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub primary_key: PrimaryKey,
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumedCapacity {
    pub read: i32,
    pub write: i32,
}

/// Row existence expectation checked by the server before a write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowExistence {
    #[default]
    Ignore,
    ExpectExist,
    ExpectNotExist,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PutChange {
    pub primary_key: PrimaryKey,
    pub columns: Vec<Column>,
    pub condition: RowExistence,
}

impl PutChange {
    pub fn new(primary_key: PrimaryKey) -> Self {
        Self {
            primary_key,
            columns: Vec::new(),
            condition: RowExistence::Ignore,
        }
    }

    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateChange {
    pub primary_key: PrimaryKey,
    pub put_columns: Vec<Column>,
    pub delete_columns: Vec<String>,
    pub condition: RowExistence,
}

impl UpdateChange {
    pub fn new(primary_key: PrimaryKey) -> Self {
        Self {
            primary_key,
            put_columns: Vec::new(),
            delete_columns: Vec::new(),
            condition: RowExistence::Ignore,
        }
    }

    pub fn put(mut self, column: Column) -> Self {
        self.put_columns.push(column);
        self
    }

    pub fn delete(mut self, name: impl Into<String>) -> Self {
        self.delete_columns.push(name.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteChange {
    pub primary_key: PrimaryKey,
    pub condition: RowExistence,
}

impl DeleteChange {
    pub fn new(primary_key: PrimaryKey) -> Self {
        Self {
            primary_key,
            condition: RowExistence::Ignore,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListTableRequest;

#[derive(Debug, Clone, PartialEq)]
pub struct ListTableResult {
    pub request_id: String,
    pub table_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetRowRequest {
    pub table_name: String,
    pub primary_key: PrimaryKey,
    pub columns_to_get: Vec<String>,
    pub max_versions: Option<i32>,
}

impl GetRowRequest {
    pub fn new(table_name: impl Into<String>, primary_key: PrimaryKey) -> Self {
        Self {
            table_name: table_name.into(),
            primary_key,
            columns_to_get: Vec::new(),
            max_versions: Some(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetRowResult {
    pub request_id: String,
    pub row: Option<Row>,
    pub consumed: ConsumedCapacity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PutRowRequest {
    pub table_name: String,
    pub change: PutChange,
}

impl PutRowRequest {
    pub fn new(table_name: impl Into<String>, change: PutChange) -> Self {
        Self {
            table_name: table_name.into(),
            change,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PutRowResult {
    pub request_id: String,
    pub consumed: ConsumedCapacity,
}

/// Keys to read from one table in a batch read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiRowQueryCriteria {
    pub primary_keys: Vec<PrimaryKey>,
    pub columns_to_get: Vec<String>,
    pub max_versions: Option<i32>,
}

/// Batch read; one criteria per table, rows addressed by position in
/// `primary_keys`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchGetRowRequest {
    pub tables: BTreeMap<String, MultiRowQueryCriteria>,
}

impl BatchGetRowRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, table_name: impl Into<String>, primary_key: PrimaryKey) -> &mut Self {
        let criteria = self
            .tables
            .entry(table_name.into())
            .or_insert_with(|| MultiRowQueryCriteria {
                max_versions: Some(1),
                ..Default::default()
            });
        criteria.primary_keys.push(primary_key);
        self
    }

    pub fn row_count(&self) -> usize {
        self.tables.values().map(|c| c.primary_keys.len()).sum()
    }
}

/// Writes for one table, split by row-group kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableWrites {
    pub put: Vec<PutChange>,
    pub update: Vec<UpdateChange>,
    pub delete: Vec<DeleteChange>,
}

impl TableWrites {
    pub fn is_empty(&self) -> bool {
        self.put.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchWriteRowRequest {
    pub tables: BTreeMap<String, TableWrites>,
}

impl BatchWriteRowRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, table_name: impl Into<String>, change: PutChange) -> &mut Self {
        self.tables.entry(table_name.into()).or_default().put.push(change);
        self
    }

    pub fn update(&mut self, table_name: impl Into<String>, change: UpdateChange) -> &mut Self {
        self.tables
            .entry(table_name.into())
            .or_default()
            .update
            .push(change);
        self
    }

    pub fn delete(&mut self, table_name: impl Into<String>, change: DeleteChange) -> &mut Self {
        self.tables
            .entry(table_name.into())
            .or_default()
            .delete
            .push(change);
        self
    }

    pub fn row_count(&self) -> usize {
        self.tables
            .values()
            .map(|t| t.put.len() + t.update.len() + t.delete.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_get_groups_keys_by_table_in_insertion_order() {
        let mut req = BatchGetRowRequest::new();
        req.add("t1", PrimaryKey::new().integer("id", 1))
            .add("t2", PrimaryKey::new().string("name", "a"))
            .add("t1", PrimaryKey::new().integer("id", 2));
        assert_eq!(req.row_count(), 3);
        let t1 = &req.tables["t1"];
        assert_eq!(t1.primary_keys.len(), 2);
        assert_eq!(
            t1.primary_keys[1].columns[0].value,
            PrimaryKeyValue::Integer(2)
        );
    }

    #[test]
    fn batch_write_counts_every_group() {
        let mut req = BatchWriteRowRequest::new();
        req.put("t", PutChange::new(PrimaryKey::new().integer("id", 1)))
            .update("t", UpdateChange::new(PrimaryKey::new().integer("id", 2)))
            .delete("u", DeleteChange::new(PrimaryKey::new().integer("id", 3)));
        assert_eq!(req.row_count(), 3);
        assert!(!req.tables["t"].is_empty());
        assert_eq!(req.tables["u"].delete.len(), 1);
    }
}
