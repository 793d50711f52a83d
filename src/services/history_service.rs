use std::collections::VecDeque;

use rusqlite::Connection;

use crate::data::repository;
use crate::error::AppError;
use crate::models::history::HistoryEntry;

pub const HISTORY_CAPACITY: usize = 100;

/// In-memory mirror of the persisted query log, oldest entry at the front.
/// Every mutation commits to SQLite first and only then touches memory, so a
/// failed write leaves both sides as they were.
#[derive(Debug)]
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl HistoryLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn restore(conn: &Connection, capacity: usize) -> Result<Self, AppError> {
        let mut log = Self::new(capacity);
        let newest_first = repository::list_history(conn, capacity)?;
        log.entries.extend(newest_first.into_iter().rev());
        Ok(log)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Newest first.
    pub fn list(&self) -> Vec<HistoryEntry> {
        self.entries.iter().rev().cloned().collect()
    }

    pub fn append(&mut self, conn: &Connection, entry: HistoryEntry) -> Result<(), AppError> {
        self.append_with(conn, entry, |_| Ok(()))
    }

    /// Appends `entry`, running `also` in the same transaction.
    pub fn append_with<F>(
        &mut self,
        conn: &Connection,
        entry: HistoryEntry,
        also: F,
    ) -> Result<(), AppError>
    where
        F: FnOnce(&Connection) -> Result<(), AppError>,
    {
        let tx = conn.unchecked_transaction()?;
        repository::insert_history(&tx, &entry)?;
        repository::trim_history(&tx, self.capacity)?;
        also(&*tx)?;
        tx.commit()?;

        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        Ok(())
    }

    pub fn delete(&mut self, conn: &Connection, id: &str) -> Result<(), AppError> {
        let Some(position) = self.entries.iter().position(|entry| entry.id == id) else {
            return Err(AppError::NotFound(format!("history entry {id}")));
        };
        repository::delete_history(conn, id)?;
        self.entries.remove(position);
        Ok(())
    }

    pub fn clear(&mut self, conn: &Connection) -> Result<(), AppError> {
        repository::clear_history(conn)?;
        self.entries.clear();
        Ok(())
    }
}

pub fn new_entry(query_key: &str, query_result: Option<String>, is_verified: bool) -> HistoryEntry {
    HistoryEntry {
        id: uuid::Uuid::new_v4().to_string(),
        query_time: crate::services::local_timestamp(),
        query_key: query_key.to_string(),
        query_result,
        is_verified,
    }
}
