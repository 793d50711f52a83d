use rusqlite::Connection;

use crate::data::repository;
use crate::error::AppError;
use crate::models::record::{Record, RecordView, Verification};
use crate::state::AppState;

/// Moves `record` from `Unverified` to `Verified { at }`. An already verified
/// record is returned untouched. The ledger is written before memory changes.
pub fn transition(conn: &Connection, record: &Record, at: String) -> Result<RecordView, AppError> {
    let mut record_state = record.lock_state();
    if record_state.verification.is_verified() {
        return Ok(record.view_with(&record_state));
    }

    if let Some((natural_key, occurrence)) = record.ledger_key() {
        repository::save_verification(conn, natural_key, occurrence, &at)?;
    }
    record_state.verification = Verification::Verified { at };

    tracing::info!(record_id = record.id, "record verified");
    Ok(record.view_with(&record_state))
}

pub fn verify(state: &AppState, record_id: &str) -> Result<RecordView, AppError> {
    let not_found = || AppError::NotFound(format!("record {record_id}"));
    let id = record_id.trim().parse::<u64>().map_err(|_| not_found())?;

    // Snapshot after the db lock; see `ingest_service::load_folder`.
    let conn = state.lock_db();
    let catalog = state.catalog();
    let record = catalog.record(id).ok_or_else(not_found)?;

    transition(&conn, record, crate::services::local_timestamp())
}
