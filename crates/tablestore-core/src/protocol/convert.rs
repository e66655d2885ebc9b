//! Conversions between the public model and wire messages.

use crate::error::OtsError;
use crate::model;

use super::messages as pb;

pub fn primary_key_to_pb(pk: &model::PrimaryKey) -> pb::PrimaryKey {
    pb::PrimaryKey {
        columns: pk
            .columns
            .iter()
            .map(|c| pb::PrimaryKeyColumn {
                name: c.name.clone(),
                value: Some(match &c.value {
                    model::PrimaryKeyValue::Integer(v) => pb::primary_key_column::Value::Integer(*v),
                    model::PrimaryKeyValue::String(v) => {
                        pb::primary_key_column::Value::String(v.clone())
                    }
                    model::PrimaryKeyValue::Binary(v) => {
                        pb::primary_key_column::Value::Binary(v.clone())
                    }
                }),
            })
            .collect(),
    }
}

pub fn primary_key_from_pb(pk: pb::PrimaryKey) -> Result<model::PrimaryKey, OtsError> {
    let columns = pk
        .columns
        .into_iter()
        .map(|c| {
            let value = match c.value {
                Some(pb::primary_key_column::Value::Integer(v)) => model::PrimaryKeyValue::Integer(v),
                Some(pb::primary_key_column::Value::String(v)) => model::PrimaryKeyValue::String(v),
                Some(pb::primary_key_column::Value::Binary(v)) => model::PrimaryKeyValue::Binary(v),
                None => {
                    return Err(OtsError::decode(format!(
                        "primary key column {} has no value",
                        c.name
                    )))
                }
            };
            Ok(model::PrimaryKeyColumn {
                name: c.name,
                value,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(model::PrimaryKey { columns })
}

pub fn column_to_pb(c: &model::Column) -> pb::Column {
    let value = match &c.value {
        model::ColumnValue::Integer(v) => pb::column::Value::Integer(*v),
        model::ColumnValue::String(v) => pb::column::Value::String(v.clone()),
        model::ColumnValue::Binary(v) => pb::column::Value::Binary(v.clone()),
        model::ColumnValue::Boolean(v) => pb::column::Value::Boolean(*v),
        model::ColumnValue::Double(v) => pb::column::Value::Double(*v),
    };
    pb::Column {
        name: c.name.clone(),
        value: Some(value),
        timestamp: c.timestamp,
    }
}

pub fn column_from_pb(c: pb::Column) -> Result<model::Column, OtsError> {
    let value = match c.value {
        Some(pb::column::Value::Integer(v)) => model::ColumnValue::Integer(v),
        Some(pb::column::Value::String(v)) => model::ColumnValue::String(v),
        Some(pb::column::Value::Binary(v)) => model::ColumnValue::Binary(v),
        Some(pb::column::Value::Boolean(v)) => model::ColumnValue::Boolean(v),
        Some(pb::column::Value::Double(v)) => model::ColumnValue::Double(v),
        None => return Err(OtsError::decode(format!("column {} has no value", c.name))),
    };
    Ok(model::Column {
        name: c.name,
        value,
        timestamp: c.timestamp,
    })
}

pub fn row_from_pb(row: pb::Row) -> Result<model::Row, OtsError> {
    let primary_key = row
        .primary_key
        .ok_or_else(|| OtsError::decode("row without primary key"))?;
    Ok(model::Row {
        primary_key: primary_key_from_pb(primary_key)?,
        columns: row
            .columns
            .into_iter()
            .map(column_from_pb)
            .collect::<Result<Vec<_>, _>>()?,
    })
}

pub fn consumed_from_pb(c: Option<pb::ConsumedCapacity>) -> model::ConsumedCapacity {
    c.map(|c| model::ConsumedCapacity {
        read: c.read,
        write: c.write,
    })
    .unwrap_or_default()
}

pub fn condition_to_pb(c: model::RowExistence) -> i32 {
    let e = match c {
        model::RowExistence::Ignore => pb::RowExistenceExpectation::Ignore,
        model::RowExistence::ExpectExist => pb::RowExistenceExpectation::ExpectExist,
        model::RowExistence::ExpectNotExist => pb::RowExistenceExpectation::ExpectNotExist,
    };
    e as i32
}

pub fn put_to_pb(change: &model::PutChange) -> pb::RowPut {
    pb::RowPut {
        primary_key: Some(primary_key_to_pb(&change.primary_key)),
        columns: change.columns.iter().map(column_to_pb).collect(),
        condition: condition_to_pb(change.condition),
    }
}

pub fn update_to_pb(change: &model::UpdateChange) -> pb::RowUpdate {
    pb::RowUpdate {
        primary_key: Some(primary_key_to_pb(&change.primary_key)),
        put_columns: change.put_columns.iter().map(column_to_pb).collect(),
        delete_columns: change.delete_columns.clone(),
        condition: condition_to_pb(change.condition),
    }
}

pub fn delete_to_pb(change: &model::DeleteChange) -> pb::RowDelete {
    pb::RowDelete {
        primary_key: Some(primary_key_to_pb(&change.primary_key)),
        condition: condition_to_pb(change.condition),
    }
}

pub fn get_row_to_pb(req: &model::GetRowRequest) -> pb::GetRowRequest {
    pb::GetRowRequest {
        table_name: req.table_name.clone(),
        primary_key: Some(primary_key_to_pb(&req.primary_key)),
        columns_to_get: req.columns_to_get.clone(),
        max_versions: req.max_versions,
    }
}

pub fn put_row_to_pb(req: &model::PutRowRequest) -> pb::PutRowRequest {
    pb::PutRowRequest {
        table_name: req.table_name.clone(),
        row: Some(put_to_pb(&req.change)),
    }
}

pub fn batch_get_to_pb(req: &model::BatchGetRowRequest) -> pb::BatchGetRowRequest {
    pb::BatchGetRowRequest {
        tables: req
            .tables
            .iter()
            .map(|(name, criteria)| pb::TableInBatchGetRowRequest {
                table_name: name.clone(),
                primary_keys: criteria.primary_keys.iter().map(primary_key_to_pb).collect(),
                columns_to_get: criteria.columns_to_get.clone(),
                max_versions: criteria.max_versions,
            })
            .collect(),
    }
}

pub fn batch_write_to_pb(req: &model::BatchWriteRowRequest) -> pb::BatchWriteRowRequest {
    pb::BatchWriteRowRequest {
        tables: req
            .tables
            .iter()
            .map(|(name, writes)| pb::TableInBatchWriteRowRequest {
                table_name: name.clone(),
                put_rows: writes.put.iter().map(put_to_pb).collect(),
                update_rows: writes.update.iter().map(update_to_pb).collect(),
                delete_rows: writes.delete.iter().map(delete_to_pb).collect(),
            })
            .collect(),
    }
}
