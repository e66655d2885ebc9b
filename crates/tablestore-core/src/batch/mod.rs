//! Batch results and their reconciliation across retries.
//!
//! Every row keeps the index it had in the original, full request. A retry
//! only re-sends the rows that failed, so the result of attempt k+1 is a
//! dense sub-batch; [`BatchResult::merge`] re-homes its entries at their
//! original indices. Succeeded rows are never revisited, the same way a
//! completed segment in a resume bitmap is never downloaded again.

mod get;
mod merge;
mod write;


use std::collections::BTreeMap;

use crate::error::{OtsError, ServiceError};

pub use get::{BatchGetRowResult, ReadRow};
pub use write::{BatchWriteRowResult, RowGroup};

/// Outcome of one row of a batch call.
#[derive(Debug, Clone, PartialEq)]
pub struct RowStatus<T> {
    pub table_name: String,
    /// Position of the row in the original request for its table (and group).
    pub index: usize,
    pub result: Result<T, ServiceError>,
}

impl<T> RowStatus<T> {
    pub fn succeeded(table_name: impl Into<String>, index: usize, value: T) -> Self {
        Self {
            table_name: table_name.into(),
            index,
            result: Ok(value),
        }
    }

    pub fn failed(table_name: impl Into<String>, index: usize, error: ServiceError) -> Self {
        Self {
            table_name: table_name.into(),
            index,
            result: Err(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&ServiceError> {
        self.result.as_ref().err()
    }
}

/// Per-table row outcomes, one entry per requested row, in original order.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult<T> {
    tables: BTreeMap<String, Vec<RowStatus<T>>>,
}

impl<T> Default for BatchResult<T> {
    fn default() -> Self {
        Self {
            tables: BTreeMap::new(),
        }
    }
}

impl<T> BatchResult<T> {
    /// Append a row to its table. Rows must arrive in index order.
    pub fn push_row(&mut self, row: RowStatus<T>) {
        self.tables.entry(row.table_name.clone()).or_default().push(row);
    }

    /// Make sure `table` has an entry even if it ends up with no rows.
    pub(crate) fn ensure_table(&mut self, table: &str) {
        self.tables.entry(table.to_string()).or_default();
    }

    pub fn table(&self, name: &str) -> Option<&[RowStatus<T>]> {
        self.tables.get(name).map(Vec::as_slice)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn rows(&self) -> impl Iterator<Item = &RowStatus<T>> {
        self.tables.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn succeeded_rows(&self) -> impl Iterator<Item = &RowStatus<T>> {
        self.rows().filter(|r| r.is_ok())
    }

    pub fn failed_rows(&self) -> impl Iterator<Item = &RowStatus<T>> {
        self.rows().filter(|r| !r.is_ok())
    }

    pub fn is_all_succeeded(&self) -> bool {
        self.failed_rows().next().is_none()
    }

    /// Original indices of the failed rows of `table`, ascending.
    pub fn failed_indices(&self, table: &str) -> Vec<usize> {
        self.tables
            .get(table)
            .map(|rows| rows.iter().filter(|r| !r.is_ok()).map(|r| r.index).collect())
            .unwrap_or_default()
    }

    /// Flattened per-row errors in table / index order.
    pub fn errors(&self) -> Vec<ServiceError> {
        self.failed_rows().filter_map(|r| r.error().cloned()).collect()
    }

    /// Count of entries per table, for validating a response against the
    /// request it answers.
    pub(crate) fn check_counts<'a>(
        &self,
        group: &str,
        expected: impl IntoIterator<Item = (&'a str, usize)>,
    ) -> Result<(), OtsError> {
        let expected: Vec<(&str, usize)> = expected.into_iter().collect();
        for (table, want) in &expected {
            let got = self.tables.get(*table).map(Vec::len).unwrap_or(0);
            if got != *want {
                return Err(OtsError::protocol(format!(
                    "table {} ({}): response has {} row(s), request had {}",
                    table, group, got, want
                )));
            }
        }
        let unexpected = self
            .tables
            .iter()
            .filter(|(_, rows)| !rows.is_empty())
            .find(|(table, _)| !expected.iter().any(|(name, _)| *name == table.as_str()));
        if let Some((table, _)) = unexpected {
            return Err(OtsError::protocol(format!(
                "{} response has rows for table {} that was not requested",
                group, table
            )));
        }
        Ok(())
    }

    /// Fold a retry's sub-batch into this result. See [`merge::merge_rows`].
    pub fn merge(self, next: BatchResult<T>, group: &str) -> Result<BatchResult<T>, OtsError> {
        let mut next = next.tables;
        let mut merged = BTreeMap::new();
        for (table, previous) in self.tables {
            let fresh = next.remove(&table).unwrap_or_default();
            let rows = merge::merge_rows(&table, group, previous, fresh)?;
            merged.insert(table, rows);
        }
        if let Some((table, _)) = next.iter().find(|(_, rows)| !rows.is_empty()) {
            return Err(OtsError::protocol(format!(
                "retry response has rows for table {} ({}) with no failed rows",
                table, group
            )));
        }
        Ok(BatchResult { tables: merged })
    }
}
