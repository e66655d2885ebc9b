//! Index-preserving merge of one table's row list.

use crate::error::OtsError;

use super::RowStatus;

/// Merge the sub-batch `next` into `previous` for one table (and row group).
///
/// `previous` covers every row of the original request in index order;
/// `next` has exactly one entry per failed row of `previous`, in the same
/// relative order. Succeeded entries are copied unchanged; each failed
/// entry is replaced by the next entry of `next`, re-homed at the original
/// index. Any count mismatch is a protocol violation, never a misalignment.
pub(crate) fn merge_rows<T>(
    table: &str,
    group: &str,
    previous: Vec<RowStatus<T>>,
    next: Vec<RowStatus<T>>,
) -> Result<Vec<RowStatus<T>>, OtsError> {
    let failed = previous.iter().filter(|r| !r.is_ok()).count();
    if failed != next.len() {
        return Err(OtsError::protocol(format!(
            "table {} ({}): retry returned {} row(s) for {} failed row(s)",
            table,
            group,
            next.len(),
            failed
        )));
    }

    let mut fresh = next.into_iter();
    let mut merged = Vec::with_capacity(previous.len());
    for prev in previous {
        if prev.is_ok() {
            merged.push(prev);
            continue;
        }
        let Some(retried) = fresh.next() else {
            return Err(OtsError::protocol(format!(
                "table {} ({}): retry rows exhausted at index {}",
                table, group, prev.index
            )));
        };
        merged.push(RowStatus {
            table_name: prev.table_name,
            index: prev.index,
            result: retried.result,
        });
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{codes, ServiceError};

    fn busy(req: &str) -> ServiceError {
        ServiceError::new(codes::SERVER_BUSY, "busy", req, 200)
    }

    fn rows(pattern: &[Option<u32>]) -> Vec<RowStatus<u32>> {
        pattern
            .iter()
            .enumerate()
            .map(|(i, v)| match v {
                Some(v) => RowStatus::succeeded("t", i, *v),
                None => RowStatus::failed("t", i, busy("r1")),
            })
            .collect()
    }

    #[test]
    fn failed_entries_are_rehomed_at_original_indices() {
        let previous = rows(&[Some(0), None, Some(2), None, Some(4)]);
        let next = vec![
            RowStatus::succeeded("t", 0, 11),
            RowStatus::succeeded("t", 1, 33),
        ];
        let merged = merge_rows("t", "get", previous, next).unwrap();
        let values: Vec<_> = merged.iter().map(|r| (r.index, r.result.clone().ok())).collect();
        assert_eq!(
            values,
            vec![
                (0, Some(0)),
                (1, Some(11)),
                (2, Some(2)),
                (3, Some(33)),
                (4, Some(4)),
            ]
        );
    }

    #[test]
    fn successes_are_sticky_and_new_errors_replace_old() {
        let previous = rows(&[None, Some(1)]);
        let next = vec![RowStatus::failed(
            "t",
            0,
            ServiceError::new(codes::ROW_OPERATION_CONFLICT, "conflict", "r2", 200),
        )];
        let merged = merge_rows("t", "get", previous, next).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].error().unwrap().code, codes::ROW_OPERATION_CONFLICT);
        assert_eq!(merged[0].error().unwrap().request_id, "r2");
        assert_eq!(merged[1].result, Ok(1));
    }

    #[test]
    fn too_few_retry_rows_is_a_protocol_violation() {
        let previous = rows(&[None, None]);
        let next = vec![RowStatus::succeeded("t", 0, 9)];
        let err = merge_rows("t", "get", previous, next).unwrap_err();
        assert!(matches!(err, OtsError::ProtocolViolation(_)));
    }

    #[test]
    fn too_many_retry_rows_is_a_protocol_violation() {
        let previous = rows(&[None, Some(1)]);
        let next = vec![RowStatus::succeeded("t", 0, 9), RowStatus::succeeded("t", 1, 8)];
        let err = merge_rows("t", "get", previous, next).unwrap_err();
        assert!(matches!(err, OtsError::ProtocolViolation(_)));
    }

    #[test]
    fn all_succeeded_previous_accepts_only_empty_retry() {
        let previous = rows(&[Some(0), Some(1)]);
        let merged = merge_rows("t", "get", previous.clone(), Vec::new()).unwrap();
        assert_eq!(merged, previous);
    }
}
