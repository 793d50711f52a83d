use tauri::{command, State};

use crate::error::AppError;
use crate::services::export_service;
use crate::state::AppState;

#[command(async)]
pub fn save_qrcode_to_data_folder(
    filename: String,
    base64_data: String,
    state: State<'_, AppState>,
) -> Result<(), AppError> {
    let bytes = export_service::decode_payload(&base64_data)?;
    export_service::save(&state.export_dir, &filename, &bytes).map_err(AppError::capture)?;
    Ok(())
}
