use std::collections::HashMap;
use std::fs;
use std::io::{Error as IoError, ErrorKind};
use std::path::{Path, PathBuf};

use crate::data::repository::{self, LedgerEntry};
use crate::error::AppError;
use crate::models::query::LoadResult;
use crate::models::record::{Record, RecordState, Verification};
use crate::services::index_service::{Catalog, CatalogSource};
use crate::services::parser_service::{self, Row};
use crate::services::settings_service::{self, IngestSettings};
use crate::state::AppState;

/// Rows of one successfully parsed file, header already dropped.
#[derive(Debug)]
pub struct ParsedFile {
    pub name: String,
    pub rows: Vec<(usize, Row)>,
}

#[derive(Debug, Default)]
pub struct ParsedFolder {
    pub files: Vec<ParsedFile>,
    pub skipped_files: Vec<String>,
}

impl ParsedFolder {
    pub fn row_count(&self) -> usize {
        self.files.iter().map(|file| file.rows.len()).sum()
    }
}

/// Supported files directly inside `folder`, sorted by name.
pub fn list_candidates(folder: &Path) -> Result<Vec<PathBuf>, AppError> {
    if !folder.is_dir() {
        return Err(AppError::Io(IoError::new(
            ErrorKind::NotFound,
            format!("folder not found: {}", folder.display()),
        )));
    }

    let mut candidates = Vec::new();
    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        if path.is_file() && parser_service::is_supported(&path) {
            candidates.push(path);
        }
    }
    candidates.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(candidates)
}

fn parse_file(path: &Path, settings: &IngestSettings) -> Result<ParsedFile, AppError> {
    let rows = parser_service::open_rows(path)?;
    let name = rows.file_name().to_string();

    let mut parsed = Vec::new();
    let mut header_pending = settings.has_header;
    for row in rows {
        let (line, row) = row?;
        if header_pending {
            header_pending = false;
            continue;
        }
        let row = if settings.trim_values {
            row.into_iter().map(|cell| cell.trim().to_string()).collect()
        } else {
            row
        };
        parsed.push((line, row));
    }

    Ok(ParsedFile { name, rows: parsed })
}

/// Parses every candidate into a private structure. A file that fails to
/// parse is recorded in `skipped_files` and contributes nothing.
pub fn parse_folder(folder: &Path, settings: &IngestSettings) -> Result<ParsedFolder, AppError> {
    let mut parsed = ParsedFolder::default();

    for path in list_candidates(folder)? {
        match parse_file(&path, settings) {
            Ok(file) => parsed.files.push(file),
            Err(err) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                tracing::warn!(file = %name, error = %err, "skipping unreadable data file");
                parsed.skipped_files.push(name);
            }
        }
    }

    Ok(parsed)
}

type LedgerMap = HashMap<(String, u32), LedgerEntry>;

fn ledger_map(entries: Vec<LedgerEntry>) -> LedgerMap {
    entries
        .into_iter()
        .map(|entry| ((entry.natural_key.clone(), entry.occurrence), entry))
        .collect()
}

fn restored_state(key: Option<(&str, u32)>, ledger: &LedgerMap) -> RecordState {
    let Some(entry) = key.and_then(|(natural_key, occurrence)| {
        ledger.get(&(natural_key.to_string(), occurrence))
    }) else {
        return RecordState::default();
    };
    RecordState {
        query_count: entry.query_count,
        verification: match &entry.verify_time {
            Some(at) => Verification::Verified { at: at.clone() },
            None => Verification::Unverified,
        },
    }
}

/// Turns parsed rows into records with ids `first_id..`, in file then row
/// order. Records sharing a natural key are told apart by their occurrence
/// in that order, and each picks up its own ledger row.
pub fn build_records(
    parsed: ParsedFolder,
    first_id: u64,
    settings: &IngestSettings,
    ledger: &LedgerMap,
) -> (Vec<Record>, LoadResult) {
    let mut result = LoadResult {
        file_count: parsed.files.len(),
        record_count: 0,
        skipped_files: parsed.skipped_files,
    };

    let mut records = Vec::new();
    let mut seen: HashMap<String, u32> = HashMap::new();
    let mut next_id = first_id;
    for file in parsed.files {
        for (row_number, columns) in file.rows {
            let link = columns
                .get(settings.link_column)
                .cloned()
                .unwrap_or_default();
            let natural_key = columns
                .get(settings.key_column)
                .filter(|value| !value.is_empty())
                .cloned();
            let occurrence = match &natural_key {
                Some(key) => {
                    let count = seen.entry(key.clone()).or_insert(0);
                    *count += 1;
                    *count - 1
                }
                None => 0,
            };

            let state = restored_state(natural_key.as_deref().map(|key| (key, occurrence)), ledger);

            records.push(
                Record::new(
                    next_id,
                    columns,
                    link,
                    natural_key,
                    file.name.clone(),
                    row_number,
                    state,
                )
                .with_occurrence(occurrence),
            );
            next_id += 1;
        }
    }

    result.record_count = records.len();
    (records, result)
}

/// Loads `folder` and swaps the result in as the active catalog. Nothing is
/// published unless the whole call succeeds.
///
/// Parsing runs with no lock held. Everything from the ledger read to the swap
/// happens under the history and db locks. Ledger writers hold the db lock
/// too, so none of their writes can fall between the read and the swap.
pub fn load_folder(state: &AppState, folder: &str) -> Result<LoadResult, AppError> {
    let folder_path = Path::new(folder);

    let settings = {
        let conn = state.lock_db();
        settings_service::load_ingest_settings(&conn)?
    };

    let parsed = parse_folder(folder_path, &settings)?;

    let _history = state.lock_history();
    let conn = state.lock_db();
    let ledger = ledger_map(repository::load_ledger(&conn)?);
    let first_id = settings_service::allocate_record_ids(&conn, parsed.row_count())?;

    let (records, result) = build_records(parsed, first_id, &settings, &ledger);
    let catalog = Catalog::build(
        records,
        Some(CatalogSource {
            folder: folder.to_string(),
            loaded_at: crate::services::local_timestamp(),
            file_count: result.file_count,
        }),
    );
    if catalog.is_empty() {
        tracing::warn!(folder, "data folder holds no records");
    }
    let distinct_keys = catalog.distinct_keys();
    state.install_catalog(catalog);

    tracing::info!(
        folder,
        file_count = result.file_count,
        record_count = result.record_count,
        skipped = result.skipped_files.len(),
        distinct_keys,
        "data folder loaded"
    );

    Ok(result)
}
