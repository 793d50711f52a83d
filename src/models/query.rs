use serde::{Deserialize, Serialize};

use crate::models::record::RecordView;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadResult {
    pub file_count: usize,
    pub record_count: usize,
    pub skipped_files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    pub found: bool,
    pub record: Option<RecordView>,
    pub is_duplicate: bool,
    pub matched_column: Option<usize>,
    pub multiple_matches: bool,
}

impl QueryResult {
    pub fn not_found() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub record_count: usize,
    pub file_count: usize,
    pub loaded_folder: Option<String>,
    pub loaded_at: Option<String>,
    pub history_count: usize,
}
