use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::AppError;

pub fn validate_file_name(file_name: &str) -> Result<(), AppError> {
    let invalid = file_name.trim().is_empty()
        || file_name == "."
        || file_name == ".."
        || file_name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(AppError::InvalidInput(format!(
            "invalid export file name: '{file_name}'"
        )));
    }
    Ok(())
}

/// Decodes a base64 image payload. A `data:...;base64,` prefix is tolerated.
pub fn decode_payload(base64_data: &str) -> Result<Vec<u8>, AppError> {
    let payload = match base64_data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => base64_data,
    };
    STANDARD
        .decode(payload.trim())
        .map_err(|e| AppError::InvalidInput(format!("image payload is not valid base64: {e}")))
}

/// Writes `bytes` to `dir/file_name`, replacing any existing file. The data
/// goes to a synced temp file in the same directory first and is renamed
/// into place, so readers never see a partial file.
pub fn save(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, AppError> {
    validate_file_name(file_name)?;
    fs::create_dir_all(dir)?;

    let target = dir.join(file_name);
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(&target).map_err(|e| AppError::Io(e.error))?;

    tracing::info!(path = %target.display(), bytes = bytes.len(), "image exported");
    Ok(target)
}
