//! Concrete operations: action name, wire messages and result parsing.
//!
//! Each operation is a marker type implementing [`Operation`]; the client
//! runs every call through the same generic pipeline and only the
//! `parse_result` step differs. Batch operations fold the accumulated result
//! of the previous attempt into the new one before deciding success.

use crate::batch::{BatchGetRowResult, BatchWriteRowResult};
use crate::error::{BatchOutcome, OtsError, PartialFailure};
use crate::model::{
    BatchGetRowRequest, BatchWriteRowRequest, GetRowRequest, GetRowResult, ListTableRequest,
    ListTableResult, PutRowRequest, PutRowResult,
};
use crate::protocol::messages as pb;
use crate::protocol::{action, convert, encode};
use crate::retry::RetryableRequest;

/// What `parse_result` gets besides the decoded message.
#[derive(Debug)]
pub struct ParseContext<'a, Req> {
    /// Request sent by this attempt (narrowed on batch retries).
    pub request: &'a Req,
    pub request_id: &'a str,
    pub http_status: u16,
    /// Accumulated outcome of the previous attempt, if it partially failed.
    pub previous: Option<&'a PartialFailure>,
}

pub trait Operation: Send + Sync + 'static {
    const ACTION: &'static str;

    type Request: RetryableRequest + 'static;
    type Response: prost::Message + Default;
    type Output: Send + 'static;

    fn encode(request: &Self::Request) -> Vec<u8>;

    fn parse_result(
        response: Self::Response,
        ctx: ParseContext<'_, Self::Request>,
    ) -> Result<Self::Output, OtsError>;
}

impl RetryableRequest for ListTableRequest {}
impl RetryableRequest for GetRowRequest {}
impl RetryableRequest for PutRowRequest {}

#[derive(Debug)]
pub struct ListTable;

impl Operation for ListTable {
    const ACTION: &'static str = action::LIST_TABLE;
    type Request = ListTableRequest;
    type Response = pb::ListTableResponse;
    type Output = ListTableResult;

    fn encode(_request: &ListTableRequest) -> Vec<u8> {
        encode(&pb::ListTableRequest {})
    }

    fn parse_result(
        response: pb::ListTableResponse,
        ctx: ParseContext<'_, ListTableRequest>,
    ) -> Result<ListTableResult, OtsError> {
        Ok(ListTableResult {
            request_id: ctx.request_id.to_string(),
            table_names: response.table_names,
        })
    }
}

#[derive(Debug)]
pub struct GetRow;

impl Operation for GetRow {
    const ACTION: &'static str = action::GET_ROW;
    type Request = GetRowRequest;
    type Response = pb::GetRowResponse;
    type Output = GetRowResult;

    fn encode(request: &GetRowRequest) -> Vec<u8> {
        encode(&convert::get_row_to_pb(request))
    }

    fn parse_result(
        response: pb::GetRowResponse,
        ctx: ParseContext<'_, GetRowRequest>,
    ) -> Result<GetRowResult, OtsError> {
        Ok(GetRowResult {
            request_id: ctx.request_id.to_string(),
            row: response.row.map(convert::row_from_pb).transpose()?,
            consumed: convert::consumed_from_pb(response.consumed),
        })
    }
}

#[derive(Debug)]
pub struct PutRow;

impl Operation for PutRow {
    const ACTION: &'static str = action::PUT_ROW;
    type Request = PutRowRequest;
    type Response = pb::PutRowResponse;
    type Output = PutRowResult;

    fn encode(request: &PutRowRequest) -> Vec<u8> {
        encode(&convert::put_row_to_pb(request))
    }

    fn parse_result(
        response: pb::PutRowResponse,
        ctx: ParseContext<'_, PutRowRequest>,
    ) -> Result<PutRowResult, OtsError> {
        Ok(PutRowResult {
            request_id: ctx.request_id.to_string(),
            consumed: convert::consumed_from_pb(response.consumed),
        })
    }
}

#[derive(Debug)]
pub struct BatchGetRow;

impl Operation for BatchGetRow {
    const ACTION: &'static str = action::BATCH_GET_ROW;
    type Request = BatchGetRowRequest;
    type Response = pb::BatchGetRowResponse;
    type Output = BatchGetRowResult;

    fn encode(request: &BatchGetRowRequest) -> Vec<u8> {
        encode(&convert::batch_get_to_pb(request))
    }

    fn parse_result(
        response: pb::BatchGetRowResponse,
        ctx: ParseContext<'_, BatchGetRowRequest>,
    ) -> Result<BatchGetRowResult, OtsError> {
        let current =
            BatchGetRowResult::from_response(response, ctx.request, ctx.request_id, ctx.http_status)?;
        let merged = match ctx.previous.map(|p| &p.outcome) {
            None => current,
            Some(BatchOutcome::Get(previous)) => previous.clone().merge(current)?,
            Some(BatchOutcome::Write(_)) => {
                return Err(OtsError::protocol("batch read merged into a write outcome"))
            }
        };
        merged.into_outcome()
    }
}

#[derive(Debug)]
pub struct BatchWriteRow;

impl Operation for BatchWriteRow {
    const ACTION: &'static str = action::BATCH_WRITE_ROW;
    type Request = BatchWriteRowRequest;
    type Response = pb::BatchWriteRowResponse;
    type Output = BatchWriteRowResult;

    fn encode(request: &BatchWriteRowRequest) -> Vec<u8> {
        encode(&convert::batch_write_to_pb(request))
    }

    fn parse_result(
        response: pb::BatchWriteRowResponse,
        ctx: ParseContext<'_, BatchWriteRowRequest>,
    ) -> Result<BatchWriteRowResult, OtsError> {
        let current =
            BatchWriteRowResult::from_response(response, ctx.request, ctx.request_id, ctx.http_status)?;
        let merged = match ctx.previous.map(|p| &p.outcome) {
            None => current,
            Some(BatchOutcome::Write(previous)) => previous.clone().merge(current)?,
            Some(BatchOutcome::Get(_)) => {
                return Err(OtsError::protocol("batch write merged into a read outcome"))
            }
        };
        merged.into_outcome()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::codes;
    use crate::model::PrimaryKey;

    fn ok_row() -> pb::RowInBatchGetRowResponse {
        pb::RowInBatchGetRowResponse {
            is_ok: true,
            ..Default::default()
        }
    }

    fn busy_row() -> pb::RowInBatchGetRowResponse {
        pb::RowInBatchGetRowResponse {
            is_ok: false,
            error: Some(pb::Error {
                code: codes::SERVER_BUSY.into(),
                message: "busy".into(),
            }),
            ..Default::default()
        }
    }

    fn request(n: i64) -> BatchGetRowRequest {
        let mut req = BatchGetRowRequest::new();
        for id in 0..n {
            req.add("t", PrimaryKey::new().integer("id", id));
        }
        req
    }

    fn response(rows: Vec<pb::RowInBatchGetRowResponse>) -> pb::BatchGetRowResponse {
        pb::BatchGetRowResponse {
            tables: vec![pb::TableInBatchGetRowResponse {
                table_name: "t".into(),
                rows,
            }],
        }
    }

    #[test]
    fn failed_rows_become_partial_failure() {
        let req = request(2);
        let err = BatchGetRow::parse_result(
            response(vec![ok_row(), busy_row()]),
            ParseContext {
                request: &req,
                request_id: "r1",
                http_status: 200,
                previous: None,
            },
        )
        .unwrap_err();
        let failure = err.as_partial_failure().unwrap();
        assert_eq!(failure.errors.len(), 1);
        assert_eq!(failure.errors[0].request_id, "r1");
    }

    #[test]
    fn retry_response_is_merged_into_previous() {
        let full = request(3);
        let first = BatchGetRow::parse_result(
            response(vec![ok_row(), busy_row(), ok_row()]),
            ParseContext {
                request: &full,
                request_id: "r1",
                http_status: 200,
                previous: None,
            },
        )
        .unwrap_err();
        let previous = first.as_partial_failure().unwrap();
        let narrowed = full.narrow(previous).unwrap();
        let merged = BatchGetRow::parse_result(
            response(vec![ok_row()]),
            ParseContext {
                request: &narrowed,
                request_id: "r2",
                http_status: 200,
                previous: Some(previous),
            },
        )
        .unwrap();
        assert_eq!(merged.request_id, "r2");
        assert_eq!(merged.rows.len(), 3);
        assert!(merged.is_all_succeeded());
    }

    #[test]
    fn outcome_kind_mismatch_is_a_protocol_violation() {
        let req = BatchWriteRowRequest::new();
        let read_failure = PartialFailure {
            outcome: BatchOutcome::Get(BatchGetRowResult {
                request_id: "r".into(),
                rows: Default::default(),
            }),
            errors: vec![],
            last_error: None,
        };
        let err = BatchWriteRow::parse_result(
            pb::BatchWriteRowResponse::default(),
            ParseContext {
                request: &req,
                request_id: "r",
                http_status: 200,
                previous: Some(&read_failure),
            },
        )
        .unwrap_err();
        assert!(matches!(err, OtsError::ProtocolViolation(_)));
    }
}
