use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub query_time: String,
    pub query_key: String,
    pub query_result: Option<String>,
    pub is_verified: bool,
}
