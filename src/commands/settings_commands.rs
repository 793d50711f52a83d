use tauri::{command, State};

use crate::error::AppError;
use crate::services::settings_service::{self, IngestSettings};
use crate::state::AppState;

#[command]
pub fn get_setting(key: String, state: State<'_, AppState>) -> Result<Option<String>, AppError> {
    let conn = state.lock_db();
    settings_service::get(&conn, &key)
}

#[command]
pub fn set_setting(key: String, value: String, state: State<'_, AppState>) -> Result<(), AppError> {
    let conn = state.lock_db();
    settings_service::set(&conn, &key, &value)?;
    tracing::info!(key = %key, "setting updated");
    Ok(())
}

#[command]
pub fn get_ingest_settings(state: State<'_, AppState>) -> Result<IngestSettings, AppError> {
    let conn = state.lock_db();
    settings_service::load_ingest_settings(&conn)
}
