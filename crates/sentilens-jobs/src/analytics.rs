//! Read and write operations over a completed job's result table
//!
//! Every operation checks its preconditions up front: unknown job is
//! `NotFound`, a job that is not Completed is `NotReady`.

use crate::store::JobStore;
use crate::validation::{validate_labels, ValidationMetrics};
use sentilens_core::{Error, ExportRow, JobId, Label, Record, Result};
use tracing::info;

/// Records whose text contains `query` (case-insensitive), optionally limited
/// to one exact `source`, in table order
pub fn search(
    store: &JobStore,
    job_id: &JobId,
    query: &str,
    source: Option<&str>,
) -> Result<Vec<Record>> {
    let job = store.get(job_id)?;
    let needle = query.to_lowercase();

    job.with_table(|table| {
        table
            .iter()
            .filter(|r| r.text.to_lowercase().contains(&needle))
            .filter(|r| matches_source(r, source))
            .cloned()
            .collect()
    })
}

/// Records matching `label` and `source`; a missing filter places no
/// constraint on that field
pub fn filter(
    store: &JobStore,
    job_id: &JobId,
    label: Option<Label>,
    source: Option<&str>,
) -> Result<Vec<Record>> {
    let job = store.get(job_id)?;

    job.with_table(|table| {
        table
            .iter()
            .filter(|r| label.map_or(true, |l| r.label == Some(l)))
            .filter(|r| matches_source(r, source))
            .cloned()
            .collect()
    })
}

/// Override the label of record `index` and flag it as manually corrected.
///
/// Arguments are checked in order: label range, job lookup, readiness, then
/// index. A negative index is out of range like any other.
///
/// Concurrent corrections of the same record are applied in lock order; the
/// last write wins.
pub fn correct(store: &JobStore, job_id: &JobId, index: i64, new_label: i64) -> Result<Record> {
    let label = Label::from_id(new_label)?;
    let job = store.get(job_id)?;

    let record = job.with_table_mut(|table| {
        let position = usize::try_from(index)
            .map_err(|_| Error::not_found(format!("record {index} out of range")))?;
        table.correct(position, label).cloned()
    })?;

    metrics::counter!("sentilens_corrections_total").increment(1);
    info!(job_id = %job_id, index, label = label.id(), "Record manually corrected");

    Ok(record)
}

/// Rows of a completed job in export column order
pub fn export(store: &JobStore, job_id: &JobId) -> Result<Vec<ExportRow>> {
    store.get(job_id)?.with_table(|table| table.export_rows())
}

/// Validate a completed job's current labels, corrections included, against
/// ground truth given in table order
pub fn validate_job(
    store: &JobStore,
    job_id: &JobId,
    true_labels: &[i64],
) -> Result<ValidationMetrics> {
    let job = store.get(job_id)?;
    let predicted = job.with_table(|table| table.labels())?;

    if true_labels.len() != predicted.len() {
        return Err(Error::ValidationInputMismatch {
            expected: true_labels.len(),
            actual: predicted.len(),
        });
    }

    let truth = true_labels
        .iter()
        .map(|&id| Label::from_id(id))
        .collect::<Result<Vec<_>>>()?;

    validate_labels(&truth, &predicted)
}

fn matches_source(record: &Record, source: Option<&str>) -> bool {
    match source {
        Some(wanted) => record.source.as_deref() == Some(wanted),
        None => true,
    }
}
