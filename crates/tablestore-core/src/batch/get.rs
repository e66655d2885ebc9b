//! Batch read results.

use crate::error::{BatchOutcome, OtsError, PartialFailure, ServiceError};
use crate::model::{BatchGetRowRequest, ConsumedCapacity, MultiRowQueryCriteria, Row};
use crate::protocol::convert;
use crate::protocol::messages as pb;
use crate::retry::RetryableRequest;

use super::{BatchResult, RowStatus};

const GROUP: &str = "get";

/// One successfully read row; `row` is `None` when the key does not exist.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadRow {
    pub row: Option<Row>,
    pub consumed: ConsumedCapacity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchGetRowResult {
    /// Request id of the most recent attempt.
    pub request_id: String,
    pub rows: BatchResult<ReadRow>,
}

impl BatchGetRowResult {
    /// Build the positional result of one attempt, checking it row-for-row
    /// against the request that was sent.
    pub(crate) fn from_response(
        response: pb::BatchGetRowResponse,
        request: &BatchGetRowRequest,
        request_id: &str,
        http_status: u16,
    ) -> Result<Self, OtsError> {
        let mut rows = BatchResult::default();
        for table in response.tables {
            rows.ensure_table(&table.table_name);
            for (index, row) in table.rows.into_iter().enumerate() {
                let status = if row.is_ok {
                    let decoded = row.row.map(convert::row_from_pb).transpose()?;
                    RowStatus::succeeded(
                        table.table_name.clone(),
                        index,
                        ReadRow {
                            row: decoded,
                            consumed: convert::consumed_from_pb(row.consumed),
                        },
                    )
                } else {
                    RowStatus::failed(
                        table.table_name.clone(),
                        index,
                        row_error(row.error, request_id, http_status),
                    )
                };
                rows.push_row(status);
            }
        }
        rows.check_counts(
            GROUP,
            request
                .tables
                .iter()
                .map(|(name, c)| (name.as_str(), c.primary_keys.len())),
        )?;
        Ok(Self {
            request_id: request_id.to_string(),
            rows,
        })
    }

    /// Fold the sub-batch of a retry into this (accumulated) result.
    pub fn merge(self, next: BatchGetRowResult) -> Result<Self, OtsError> {
        Ok(Self {
            request_id: next.request_id,
            rows: self.rows.merge(next.rows, GROUP)?,
        })
    }

    pub fn is_all_succeeded(&self) -> bool {
        self.rows.is_all_succeeded()
    }

    pub fn errors(&self) -> Vec<ServiceError> {
        self.rows.errors()
    }

    /// `Ok` when every row succeeded, otherwise a partial failure carrying
    /// the whole reconciled result.
    pub fn into_outcome(self) -> Result<Self, OtsError> {
        let errors = self.errors();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(PartialFailure::new(BatchOutcome::Get(self), errors).into())
        }
    }
}

pub(crate) fn row_error(error: Option<pb::Error>, request_id: &str, http_status: u16) -> ServiceError {
    match error {
        Some(e) => ServiceError::new(e.code, e.message, request_id, http_status),
        None => ServiceError::new(
            crate::error::codes::UNKNOWN_SERVER_ERROR,
            "row failed without an error body",
            request_id,
            http_status,
        ),
    }
}

impl RetryableRequest for BatchGetRowRequest {
    /// Keep only the keys of rows that failed, addressed through their
    /// original indices into this (original) request.
    fn narrow(&self, failure: &PartialFailure) -> Result<Self, OtsError> {
        let BatchOutcome::Get(result) = &failure.outcome else {
            return Err(OtsError::protocol("batch read retried with a write outcome"));
        };
        let mut narrowed = BatchGetRowRequest::new();
        for table in result.rows.table_names() {
            let failed = result.rows.failed_indices(table);
            if failed.is_empty() {
                continue;
            }
            let criteria = self.tables.get(table).ok_or_else(|| {
                OtsError::protocol(format!("failed rows for unknown table {}", table))
            })?;
            let primary_keys = failed
                .iter()
                .map(|&i| {
                    criteria.primary_keys.get(i).cloned().ok_or_else(|| {
                        OtsError::protocol(format!("table {}: failed index {} out of range", table, i))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            narrowed.tables.insert(
                table.to_string(),
                MultiRowQueryCriteria {
                    primary_keys,
                    columns_to_get: criteria.columns_to_get.clone(),
                    max_versions: criteria.max_versions,
                },
            );
        }
        Ok(narrowed)
    }
}
