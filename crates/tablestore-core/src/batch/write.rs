//! Batch write results, tracked per row-group kind.

use std::fmt;

use crate::error::{BatchOutcome, OtsError, PartialFailure, ServiceError};
use crate::model::{BatchWriteRowRequest, ConsumedCapacity, TableWrites};
use crate::protocol::convert;
use crate::protocol::messages as pb;
use crate::retry::RetryableRequest;

use super::get::row_error;
use super::{BatchResult, RowStatus};

/// Row-group kind within a batch write. Each group keeps its own index
/// space and is merged independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowGroup {
    Put,
    Update,
    Delete,
}

impl RowGroup {
    pub const ALL: [RowGroup; 3] = [RowGroup::Put, RowGroup::Update, RowGroup::Delete];

    pub fn as_str(self) -> &'static str {
        match self {
            RowGroup::Put => "put",
            RowGroup::Update => "update",
            RowGroup::Delete => "delete",
        }
    }

    fn requested(self, writes: &TableWrites) -> usize {
        match self {
            RowGroup::Put => writes.put.len(),
            RowGroup::Update => writes.update.len(),
            RowGroup::Delete => writes.delete.len(),
        }
    }
}

impl fmt::Display for RowGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchWriteRowResult {
    /// Request id of the most recent attempt.
    pub request_id: String,
    pub put: BatchResult<ConsumedCapacity>,
    pub update: BatchResult<ConsumedCapacity>,
    pub delete: BatchResult<ConsumedCapacity>,
}

impl BatchWriteRowResult {
    pub fn group(&self, group: RowGroup) -> &BatchResult<ConsumedCapacity> {
        match group {
            RowGroup::Put => &self.put,
            RowGroup::Update => &self.update,
            RowGroup::Delete => &self.delete,
        }
    }

    pub(crate) fn from_response(
        response: pb::BatchWriteRowResponse,
        request: &BatchWriteRowRequest,
        request_id: &str,
        http_status: u16,
    ) -> Result<Self, OtsError> {
        let mut put = BatchResult::default();
        let mut update = BatchResult::default();
        let mut delete = BatchResult::default();
        for table in response.tables {
            for (target, rows) in [
                (&mut put, table.put_rows),
                (&mut update, table.update_rows),
                (&mut delete, table.delete_rows),
            ] {
                target.ensure_table(&table.table_name);
                for (index, row) in rows.into_iter().enumerate() {
                    target.push_row(if row.is_ok {
                        RowStatus::succeeded(
                            table.table_name.clone(),
                            index,
                            convert::consumed_from_pb(row.consumed),
                        )
                    } else {
                        RowStatus::failed(
                            table.table_name.clone(),
                            index,
                            row_error(row.error, request_id, http_status),
                        )
                    });
                }
            }
        }
        let result = Self {
            request_id: request_id.to_string(),
            put,
            update,
            delete,
        };
        for group in RowGroup::ALL {
            result.group(group).check_counts(
                group.as_str(),
                request
                    .tables
                    .iter()
                    .map(|(name, writes)| (name.as_str(), group.requested(writes))),
            )?;
        }
        Ok(result)
    }

    /// Fold the sub-batch of a retry into this (accumulated) result, group by group.
    pub fn merge(self, next: BatchWriteRowResult) -> Result<Self, OtsError> {
        Ok(Self {
            request_id: next.request_id,
            put: self.put.merge(next.put, RowGroup::Put.as_str())?,
            update: self.update.merge(next.update, RowGroup::Update.as_str())?,
            delete: self.delete.merge(next.delete, RowGroup::Delete.as_str())?,
        })
    }

    pub fn is_all_succeeded(&self) -> bool {
        RowGroup::ALL.iter().all(|g| self.group(*g).is_all_succeeded())
    }

    /// Flattened per-row errors: put, then update, then delete.
    pub fn errors(&self) -> Vec<ServiceError> {
        RowGroup::ALL
            .iter()
            .flat_map(|g| self.group(*g).errors())
            .collect()
    }

    pub fn into_outcome(self) -> Result<Self, OtsError> {
        let errors = self.errors();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(PartialFailure::new(BatchOutcome::Write(self), errors).into())
        }
    }
}

fn pick<T: Clone>(table: &str, group: RowGroup, source: &[T], indices: &[usize]) -> Result<Vec<T>, OtsError> {
    indices
        .iter()
        .map(|&i| {
            source.get(i).cloned().ok_or_else(|| {
                OtsError::protocol(format!(
                    "table {} ({}): failed index {} out of range",
                    table, group, i
                ))
            })
        })
        .collect()
}

impl RetryableRequest for BatchWriteRowRequest {
    /// Keep only the changes whose rows failed, group by group.
    fn narrow(&self, failure: &PartialFailure) -> Result<Self, OtsError> {
        let BatchOutcome::Write(result) = &failure.outcome else {
            return Err(OtsError::protocol("batch write retried with a read outcome"));
        };
        let mut narrowed = BatchWriteRowRequest::new();
        for (table, writes) in &self.tables {
            let retry = TableWrites {
                put: pick(table, RowGroup::Put, &writes.put, &result.put.failed_indices(table))?,
                update: pick(
                    table,
                    RowGroup::Update,
                    &writes.update,
                    &result.update.failed_indices(table),
                )?,
                delete: pick(
                    table,
                    RowGroup::Delete,
                    &writes.delete,
                    &result.delete.failed_indices(table),
                )?,
            };
            if !retry.is_empty() {
                narrowed.tables.insert(table.clone(), retry);
            }
        }
        let known = |t: &str| self.tables.contains_key(t);
        for group in RowGroup::ALL {
            if let Some(t) = result
                .group(group)
                .failed_rows()
                .map(|r| r.table_name.as_str())
                .find(|t| !known(t))
            {
                return Err(OtsError::protocol(format!("failed rows for unknown table {}", t)));
            }
        }
        Ok(narrowed)
    }
}
