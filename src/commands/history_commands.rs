use tauri::{command, State};

use crate::error::AppError;
use crate::models::history::HistoryEntry;
use crate::state::AppState;

#[command]
pub fn get_history(state: State<'_, AppState>) -> Result<Vec<HistoryEntry>, AppError> {
    Ok(state.lock_history().list())
}

#[command]
pub fn clear_history(state: State<'_, AppState>) -> Result<(), AppError> {
    let mut history = state.lock_history();
    let conn = state.lock_db();
    history.clear(&conn).map_err(AppError::capture)
}

#[command]
pub fn delete_history_item(id: String, state: State<'_, AppState>) -> Result<(), AppError> {
    let mut history = state.lock_history();
    let conn = state.lock_db();
    history.delete(&conn, &id).map_err(AppError::capture)
}
