use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

/// Verification lifecycle of a record. `Verified` is terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Unverified,
    Verified { at: String },
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }

    pub fn verify_time(&self) -> Option<&str> {
        match self {
            Self::Unverified => None,
            Self::Verified { at } => Some(at),
        }
    }
}

/// The mutable part of a record. Guarded per record so counter bumps and
/// verification transitions on the same id never interleave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordState {
    pub query_count: u64,
    pub verification: Verification,
}

impl Default for RecordState {
    fn default() -> Self {
        Self {
            query_count: 0,
            verification: Verification::Unverified,
        }
    }
}

/// One ingested row. Everything except `state` is fixed at ingestion.
#[derive(Debug)]
pub struct Record {
    pub id: u64,
    pub columns: Vec<String>,
    pub link: String,
    pub natural_key: Option<String>,
    /// How many records earlier in the same load share `natural_key`.
    pub occurrence: u32,
    pub source_file: String,
    pub row_number: usize,
    state: Mutex<RecordState>,
}

impl Record {
    pub fn new(
        id: u64,
        columns: Vec<String>,
        link: String,
        natural_key: Option<String>,
        source_file: String,
        row_number: usize,
        state: RecordState,
    ) -> Self {
        Self {
            id,
            columns,
            link,
            natural_key,
            occurrence: 0,
            source_file,
            row_number,
            state: Mutex::new(state),
        }
    }

    pub fn with_occurrence(mut self, occurrence: u32) -> Self {
        self.occurrence = occurrence;
        self
    }

    /// Row key in the record ledger; `None` when the key column is empty.
    pub fn ledger_key(&self) -> Option<(&str, u32)> {
        self.natural_key
            .as_deref()
            .map(|natural_key| (natural_key, self.occurrence))
    }

    pub fn lock_state(&self) -> MutexGuard<'_, RecordState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[cfg(test)]
    pub fn view(&self) -> RecordView {
        let state = self.lock_state().clone();
        self.view_with(&state)
    }

    pub fn view_with(&self, state: &RecordState) -> RecordView {
        RecordView {
            id: self.id.to_string(),
            link: self.link.clone(),
            columns: self.columns.clone(),
            query_count: state.query_count,
            is_verified: state.verification.is_verified(),
            verify_time: state.verification.verify_time().map(str::to_string),
            source_file: self.source_file.clone(),
            row_number: self.row_number,
        }
    }
}

/// Wire form of a record as handed to the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordView {
    pub id: String,
    pub link: String,
    #[serde(rename = "all_columns")]
    pub columns: Vec<String>,
    pub query_count: u64,
    pub is_verified: bool,
    pub verify_time: Option<String>,
    pub source_file: String,
    pub row_number: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(state: RecordState) -> Record {
        Record::new(
            7,
            vec!["A-001".to_string(), "https://example.com/a".to_string()],
            "https://example.com/a".to_string(),
            Some("A-001".to_string()),
            "batch.csv".to_string(),
            2,
            state,
        )
    }

    #[test]
    fn view_reflects_unverified_state() {
        let view = sample(RecordState::default()).view();
        assert_eq!(view.id, "7");
        assert_eq!(view.query_count, 0);
        assert!(!view.is_verified);
        assert!(view.verify_time.is_none());
    }

    #[test]
    fn view_reflects_verified_state() {
        let record = sample(RecordState {
            query_count: 3,
            verification: Verification::Verified {
                at: "2026-01-02 03:04:05".to_string(),
            },
        });
        let view = record.view();
        assert!(view.is_verified);
        assert_eq!(view.verify_time.as_deref(), Some("2026-01-02 03:04:05"));
        assert_eq!(view.query_count, 3);
    }

    #[test]
    fn columns_serialize_as_all_columns() {
        let value = serde_json::to_value(sample(RecordState::default()).view()).unwrap();
        assert_eq!(value["all_columns"][0], "A-001");
        assert_eq!(value["source_file"], "batch.csv");
    }
}
