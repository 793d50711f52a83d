use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use rusqlite::Connection;

use crate::error::AppError;
use crate::models::query::EngineStatus;
use crate::services::history_service::{HistoryLog, HISTORY_CAPACITY};
use crate::services::index_service::Catalog;

/// Lock order, whenever more than one is held: `history`, then `db`, then a
/// record's state. The catalog lock is only held long enough to clone or
/// replace the `Arc`.
pub struct AppState {
    pub db: Mutex<Connection>,
    pub export_dir: PathBuf,
    pub history: Mutex<HistoryLog>,
    catalog: RwLock<Arc<Catalog>>,
}

impl AppState {
    pub fn new(conn: Connection, export_dir: PathBuf) -> Result<Self, AppError> {
        let history = HistoryLog::restore(&conn, HISTORY_CAPACITY)?;
        Ok(Self {
            db: Mutex::new(conn),
            export_dir,
            history: Mutex::new(history),
            catalog: RwLock::new(Arc::new(Catalog::empty())),
        })
    }

    pub fn lock_db(&self) -> MutexGuard<'_, Connection> {
        self.db
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn lock_history(&self) -> MutexGuard<'_, HistoryLog> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The active snapshot. Callers keep using it even if a reload lands meanwhile.
    pub fn catalog(&self) -> Arc<Catalog> {
        self.catalog
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Publishes a fully built catalog and returns the one it replaced.
    pub fn install_catalog(&self, catalog: Catalog) -> Arc<Catalog> {
        let next = Arc::new(catalog);
        let mut guard = self
            .catalog
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *guard, next)
    }

    pub fn status(&self) -> EngineStatus {
        let catalog = self.catalog();
        let history_count = self.lock_history().len();
        let source = catalog.source();
        EngineStatus {
            record_count: catalog.len(),
            file_count: source.map(|s| s.file_count).unwrap_or(0),
            loaded_folder: source.map(|s| s.folder.clone()),
            loaded_at: source.map(|s| s.loaded_at.clone()),
            history_count,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_state() -> (AppState, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("qrledger.db");
    let conn = Connection::open(&db_path).unwrap();
    crate::data::migrations::run_migrations(&conn).unwrap();
    let state = AppState::new(conn, dir.path().join("qrcodes")).unwrap();
    (state, dir)
}
