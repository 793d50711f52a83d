use tauri::{command, State};

use crate::data::repository;
use crate::error::AppError;
use crate::models::query::{EngineStatus, LoadResult, QueryResult};
use crate::models::record::RecordView;
use crate::services::{ingest_service, query_service, verify_service};
use crate::state::AppState;

#[command(async)]
pub fn load_data_folder(
    folder_path: String,
    state: State<'_, AppState>,
) -> Result<LoadResult, AppError> {
    ingest_service::load_folder(&state, &folder_path).map_err(AppError::capture)
}

#[command]
pub fn query_data(query_key: String, state: State<'_, AppState>) -> Result<QueryResult, AppError> {
    query_service::query(&state, &query_key).map_err(AppError::capture)
}

#[command]
pub fn verify_record(record_id: String, state: State<'_, AppState>) -> Result<RecordView, AppError> {
    verify_service::verify(&state, &record_id).map_err(AppError::capture)
}

#[command]
pub fn get_status(state: State<'_, AppState>) -> Result<EngineStatus, AppError> {
    Ok(state.status())
}

#[command]
pub fn clear_record_ledger(state: State<'_, AppState>) -> Result<usize, AppError> {
    let conn = state.lock_db();
    let removed = repository::clear_ledger(&conn).map_err(AppError::capture)?;
    tracing::info!(removed, "record ledger cleared");
    Ok(removed)
}
