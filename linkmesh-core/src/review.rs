//! Review & audit ledger.
//!
//! Candidates come out of the resolver as `pending` and are moved to a
//! terminal status by a human, one by one or in filtered bulk. Rows are
//! only ever re-statused, never deleted, so the run keeps a full audit
//! trail. Publishing is gated on every candidate being decided.

use crate::data::{CandidateFilter, CandidateRow, Database, RunRow};
use linkmesh_engine::error::{EngineError, Result};
use linkmesh_engine::model::{CandidateStatus, RunStatus};
use tracing::info;

fn storage(error: rusqlite::Error) -> EngineError {
    EngineError::Storage(error.to_string())
}

pub fn list_candidates(
    db: &Database,
    run_id: &str,
    filter: &CandidateFilter,
) -> Result<Vec<CandidateRow>> {
    db.get_run(run_id)
        .map_err(storage)?
        .ok_or_else(|| EngineError::NotFound(format!("run {}", run_id)))?;
    db.list_candidates(run_id, filter).map_err(storage)
}

/// Toggle one pending candidate to approved or rejected.
///
/// The update is optimistic: if the row was decided concurrently the
/// update matches zero rows and the caller gets a conflict.
pub fn decide_candidate(
    db: &Database,
    candidate_id: &str,
    decision: CandidateStatus,
) -> Result<CandidateRow> {
    if !decision.is_terminal() {
        return Err(EngineError::Validation(
            "decision must be approved or rejected".to_string(),
        ));
    }
    db.get_candidate(candidate_id)
        .map_err(storage)?
        .ok_or_else(|| EngineError::NotFound(format!("candidate {}", candidate_id)))?;

    let changed = db
        .update_candidate_status(candidate_id, CandidateStatus::Pending, decision)
        .map_err(storage)?;
    if changed == 0 {
        return Err(EngineError::Conflict);
    }

    db.get_candidate(candidate_id)
        .map_err(storage)?
        .ok_or_else(|| EngineError::NotFound(format!("candidate {}", candidate_id)))
}

/// Approve every pending candidate the filter currently selects; already
/// decided rows are untouched. Returns how many rows moved.
pub fn approve_all_visible(db: &Database, run_id: &str, filter: &CandidateFilter) -> Result<usize> {
    db.get_run(run_id)
        .map_err(storage)?
        .ok_or_else(|| EngineError::NotFound(format!("run {}", run_id)))?;
    let approved = db.approve_pending(run_id, filter).map_err(storage)?;
    info!("approved {} candidate(s) on run {}", approved, run_id);
    Ok(approved)
}

/// Finalize a completed, fully reviewed run. Re-publishing an already
/// published run is a no-op, not an error.
pub fn publish_run(db: &Database, run_id: &str) -> Result<RunRow> {
    let run = db
        .get_run(run_id)
        .map_err(storage)?
        .ok_or_else(|| EngineError::NotFound(format!("run {}", run_id)))?;

    match run.status {
        RunStatus::Published => return Ok(run),
        RunStatus::Completed => {}
        other => {
            return Err(EngineError::IllegalTransition {
                from: other.as_str().to_string(),
                to: RunStatus::Published.as_str().to_string(),
            });
        }
    }

    let pending = db.pending_count(run_id).map_err(storage)?;
    if pending > 0 {
        return Err(EngineError::ReviewIncomplete {
            pending: pending as usize,
        });
    }

    db.mark_published(run_id).map_err(storage)?;
    info!("run {} published", run_id);
    db.get_run(run_id)
        .map_err(storage)?
        .ok_or_else(|| EngineError::NotFound(format!("run {}", run_id)))
}

/// Candidate counts per strategy for the review filter bar.
pub fn counts_by_type(db: &Database, run_id: &str) -> Result<Vec<(String, i64)>> {
    let conn = db.get_connection();
    let mut stmt = conn
        .prepare(
            "SELECT type, COUNT(*) FROM link_candidates WHERE run_id = ?1
             GROUP BY type ORDER BY type",
        )
        .map_err(storage)?;
    let counts = stmt
        .query_map([run_id], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(storage)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(storage)?;
    Ok(counts)
}
