//! Protobuf wire messages.

#[derive(Clone, PartialEq, prost::Message)]
pub struct Error {
    #[prost(string, tag = "1")]
    pub code: String,
    #[prost(string, tag = "2")]
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum RowExistenceExpectation {
    Ignore = 0,
    ExpectExist = 1,
    ExpectNotExist = 2,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PrimaryKeyColumn {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(oneof = "primary_key_column::Value", tags = "2, 3, 4")]
    pub value: Option<primary_key_column::Value>,
}

pub mod primary_key_column {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Value {
        #[prost(int64, tag = "2")]
        Integer(i64),
        #[prost(string, tag = "3")]
        String(String),
        #[prost(bytes = "vec", tag = "4")]
        Binary(Vec<u8>),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PrimaryKey {
    #[prost(message, repeated, tag = "1")]
    pub columns: Vec<PrimaryKeyColumn>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Column {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(oneof = "column::Value", tags = "2, 3, 4, 5, 6")]
    pub value: Option<column::Value>,
    #[prost(int64, optional, tag = "7")]
    pub timestamp: Option<i64>,
}

pub mod column {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Value {
        #[prost(int64, tag = "2")]
        Integer(i64),
        #[prost(string, tag = "3")]
        String(String),
        #[prost(bytes = "vec", tag = "4")]
        Binary(Vec<u8>),
        #[prost(bool, tag = "5")]
        Boolean(bool),
        #[prost(double, tag = "6")]
        Double(f64),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Row {
    #[prost(message, optional, tag = "1")]
    pub primary_key: Option<PrimaryKey>,
    #[prost(message, repeated, tag = "2")]
    pub columns: Vec<Column>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ConsumedCapacity {
    #[prost(int32, tag = "1")]
    pub read: i32,
    #[prost(int32, tag = "2")]
    pub write: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ListTableRequest {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ListTableResponse {
    #[prost(string, repeated, tag = "1")]
    pub table_names: Vec<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetRowRequest {
    #[prost(string, tag = "1")]
    pub table_name: String,
    #[prost(message, optional, tag = "2")]
    pub primary_key: Option<PrimaryKey>,
    #[prost(string, repeated, tag = "3")]
    pub columns_to_get: Vec<String>,
    #[prost(int32, optional, tag = "4")]
    pub max_versions: Option<i32>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GetRowResponse {
    #[prost(message, optional, tag = "1")]
    pub consumed: Option<ConsumedCapacity>,
    #[prost(message, optional, tag = "2")]
    pub row: Option<Row>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RowPut {
    #[prost(message, optional, tag = "1")]
    pub primary_key: Option<PrimaryKey>,
    #[prost(message, repeated, tag = "2")]
    pub columns: Vec<Column>,
    #[prost(enumeration = "RowExistenceExpectation", tag = "3")]
    pub condition: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RowUpdate {
    #[prost(message, optional, tag = "1")]
    pub primary_key: Option<PrimaryKey>,
    #[prost(message, repeated, tag = "2")]
    pub put_columns: Vec<Column>,
    #[prost(string, repeated, tag = "3")]
    pub delete_columns: Vec<String>,
    #[prost(enumeration = "RowExistenceExpectation", tag = "4")]
    pub condition: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RowDelete {
    #[prost(message, optional, tag = "1")]
    pub primary_key: Option<PrimaryKey>,
    #[prost(enumeration = "RowExistenceExpectation", tag = "2")]
    pub condition: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PutRowRequest {
    #[prost(string, tag = "1")]
    pub table_name: String,
    #[prost(message, optional, tag = "2")]
    pub row: Option<RowPut>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PutRowResponse {
    #[prost(message, optional, tag = "1")]
    pub consumed: Option<ConsumedCapacity>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TableInBatchGetRowRequest {
    #[prost(string, tag = "1")]
    pub table_name: String,
    #[prost(message, repeated, tag = "2")]
    pub primary_keys: Vec<PrimaryKey>,
    #[prost(string, repeated, tag = "3")]
    pub columns_to_get: Vec<String>,
    #[prost(int32, optional, tag = "4")]
    pub max_versions: Option<i32>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BatchGetRowRequest {
    #[prost(message, repeated, tag = "1")]
    pub tables: Vec<TableInBatchGetRowRequest>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RowInBatchGetRowResponse {
    #[prost(bool, tag = "1")]
    pub is_ok: bool,
    #[prost(message, optional, tag = "2")]
    pub error: Option<Error>,
    #[prost(message, optional, tag = "3")]
    pub consumed: Option<ConsumedCapacity>,
    #[prost(message, optional, tag = "4")]
    pub row: Option<Row>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TableInBatchGetRowResponse {
    #[prost(string, tag = "1")]
    pub table_name: String,
    #[prost(message, repeated, tag = "2")]
    pub rows: Vec<RowInBatchGetRowResponse>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BatchGetRowResponse {
    #[prost(message, repeated, tag = "1")]
    pub tables: Vec<TableInBatchGetRowResponse>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TableInBatchWriteRowRequest {
    #[prost(string, tag = "1")]
    pub table_name: String,
    #[prost(message, repeated, tag = "2")]
    pub put_rows: Vec<RowPut>,
    #[prost(message, repeated, tag = "3")]
    pub update_rows: Vec<RowUpdate>,
    #[prost(message, repeated, tag = "4")]
    pub delete_rows: Vec<RowDelete>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BatchWriteRowRequest {
    #[prost(message, repeated, tag = "1")]
    pub tables: Vec<TableInBatchWriteRowRequest>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RowInBatchWriteRowResponse {
    #[prost(bool, tag = "1")]
    pub is_ok: bool,
    #[prost(message, optional, tag = "2")]
    pub error: Option<Error>,
    #[prost(message, optional, tag = "3")]
    pub consumed: Option<ConsumedCapacity>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TableInBatchWriteRowResponse {
    #[prost(string, tag = "1")]
    pub table_name: String,
    #[prost(message, repeated, tag = "2")]
    pub put_rows: Vec<RowInBatchWriteRowResponse>,
    #[prost(message, repeated, tag = "3")]
    pub update_rows: Vec<RowInBatchWriteRowResponse>,
    #[prost(message, repeated, tag = "4")]
    pub delete_rows: Vec<RowInBatchWriteRowResponse>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BatchWriteRowResponse {
    #[prost(message, repeated, tag = "1")]
    pub tables: Vec<TableInBatchWriteRowResponse>,
}
