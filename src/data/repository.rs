use rusqlite::{params, Connection, OptionalExtension};

use crate::error::AppError;
use crate::models::history::HistoryEntry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub natural_key: String,
    pub occurrence: u32,
    pub query_count: u64,
    pub verify_time: Option<String>,
}

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>, AppError> {
    let value = conn
        .query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

pub fn insert_history(conn: &Connection, entry: &HistoryEntry) -> Result<i64, AppError> {
    conn.execute(
        "INSERT INTO query_history (id, query_time, query_key, query_result, is_verified)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry.id,
            entry.query_time,
            entry.query_key,
            entry.query_result,
            entry.is_verified,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Newest first.
pub fn list_history(conn: &Connection, limit: usize) -> Result<Vec<HistoryEntry>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, query_time, query_key, query_result, is_verified
         FROM query_history ORDER BY seq DESC LIMIT ?1",
    )?;

    let entries = stmt
        .query_map(params![limit as i64], |row| {
            Ok(HistoryEntry {
                id: row.get(0)?,
                query_time: row.get(1)?,
                query_key: row.get(2)?,
                query_result: row.get(3)?,
                is_verified: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(entries)
}

pub fn delete_history(conn: &Connection, id: &str) -> Result<usize, AppError> {
    let count = conn.execute("DELETE FROM query_history WHERE id = ?1", params![id])?;
    Ok(count)
}

pub fn clear_history(conn: &Connection) -> Result<usize, AppError> {
    let count = conn.execute("DELETE FROM query_history", [])?;
    Ok(count)
}

/// Drops everything but the newest `keep` rows.
pub fn trim_history(conn: &Connection, keep: usize) -> Result<usize, AppError> {
    let count = conn.execute(
        "DELETE FROM query_history WHERE seq NOT IN (
             SELECT seq FROM query_history ORDER BY seq DESC LIMIT ?1
         )",
        params![keep as i64],
    )?;
    Ok(count)
}

pub fn load_ledger(conn: &Connection) -> Result<Vec<LedgerEntry>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT natural_key, occurrence, query_count, verify_time
         FROM record_ledger ORDER BY natural_key, occurrence",
    )?;

    let entries = stmt
        .query_map([], |row| {
            let count: i64 = row.get(2)?;
            Ok(LedgerEntry {
                natural_key: row.get(0)?,
                occurrence: row.get(1)?,
                query_count: count.max(0) as u64,
                verify_time: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(entries)
}

/// Rows are keyed by `(natural_key, occurrence)`, where `occurrence` counts
/// earlier records with the same natural key in load order.
pub fn save_query_count(
    conn: &Connection,
    natural_key: &str,
    occurrence: u32,
    query_count: u64,
) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO record_ledger (natural_key, occurrence, query_count, updated_at)
         VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)
         ON CONFLICT(natural_key, occurrence) DO UPDATE SET
             query_count = excluded.query_count,
             updated_at = CURRENT_TIMESTAMP",
        params![natural_key, occurrence, query_count as i64],
    )?;
    Ok(())
}

/// An existing verify_time is never overwritten.
pub fn save_verification(
    conn: &Connection,
    natural_key: &str,
    occurrence: u32,
    verify_time: &str,
) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO record_ledger (natural_key, occurrence, query_count, verify_time, updated_at)
         VALUES (?1, ?2, 0, ?3, CURRENT_TIMESTAMP)
         ON CONFLICT(natural_key, occurrence) DO UPDATE SET
             verify_time = COALESCE(record_ledger.verify_time, excluded.verify_time),
             updated_at = CURRENT_TIMESTAMP",
        params![natural_key, occurrence, verify_time],
    )?;
    Ok(())
}

pub fn clear_ledger(conn: &Connection) -> Result<usize, AppError> {
    let count = conn.execute("DELETE FROM record_ledger", [])?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::migrations::run_migrations;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn entry(id: &str, key: &str) -> HistoryEntry {
        HistoryEntry {
            id: id.to_string(),
            query_time: "2026-10-18 09:30:00".to_string(),
            query_key: key.to_string(),
            query_result: Some(format!("https://example.com/{key}")),
            is_verified: false,
        }
    }

    #[test]
    fn test_settings_upsert() {
        let conn = setup_db();
        assert!(get_setting(&conn, "ingest_has_header").unwrap().is_none());

        set_setting(&conn, "ingest_has_header", "true").unwrap();
        set_setting(&conn, "ingest_has_header", "false").unwrap();

        assert_eq!(
            get_setting(&conn, "ingest_has_header").unwrap().as_deref(),
            Some("false")
        );
    }

    #[test]
    fn test_history_roundtrips_all_fields() {
        let conn = setup_db();
        let mut missing = entry("h2", "nope");
        missing.query_result = None;
        let mut verified = entry("h1", "A-1");
        verified.is_verified = true;

        insert_history(&conn, &verified).unwrap();
        insert_history(&conn, &missing).unwrap();

        let list = list_history(&conn, 100).unwrap();
        assert_eq!(list, vec![missing, verified]);
    }

    #[test]
    fn test_trim_history_keeps_newest() {
        let conn = setup_db();
        for i in 0..10 {
            insert_history(&conn, &entry(&format!("h{i}"), &format!("k{i}"))).unwrap();
        }

        let removed = trim_history(&conn, 4).unwrap();
        assert_eq!(removed, 6);

        let ids: Vec<String> = list_history(&conn, 100)
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["h9", "h8", "h7", "h6"]);
    }

    #[test]
    fn test_delete_and_clear_history() {
        let conn = setup_db();
        insert_history(&conn, &entry("a", "1")).unwrap();
        insert_history(&conn, &entry("b", "2")).unwrap();

        assert_eq!(delete_history(&conn, "a").unwrap(), 1);
        assert_eq!(delete_history(&conn, "a").unwrap(), 0);
        assert_eq!(clear_history(&conn).unwrap(), 1);
        assert!(list_history(&conn, 100).unwrap().is_empty());
    }

    #[test]
    fn test_ledger_never_overwrites_verify_time() {
        let conn = setup_db();
        save_query_count(&conn, "A-1", 0, 2).unwrap();
        save_verification(&conn, "A-1", 0, "2026-10-18 10:00:00").unwrap();
        save_verification(&conn, "A-1", 0, "2026-10-18 11:00:00").unwrap();
        save_query_count(&conn, "A-1", 0, 3).unwrap();

        let ledger = load_ledger(&conn).unwrap();
        assert_eq!(
            ledger,
            vec![LedgerEntry {
                natural_key: "A-1".to_string(),
                occurrence: 0,
                query_count: 3,
                verify_time: Some("2026-10-18 10:00:00".to_string()),
            }]
        );

        assert_eq!(clear_ledger(&conn).unwrap(), 1);
        assert!(load_ledger(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_ledger_rows_per_occurrence_are_independent() {
        let conn = setup_db();
        save_query_count(&conn, "K", 0, 3).unwrap();
        save_query_count(&conn, "K", 1, 1).unwrap();
        save_verification(&conn, "K", 1, "2026-10-18 12:00:00").unwrap();

        let ledger = load_ledger(&conn).unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!((ledger[0].occurrence, ledger[0].query_count), (0, 3));
        assert!(ledger[0].verify_time.is_none());
        assert_eq!((ledger[1].occurrence, ledger[1].query_count), (1, 1));
        assert_eq!(ledger[1].verify_time.as_deref(), Some("2026-10-18 12:00:00"));

        assert_eq!(clear_ledger(&conn).unwrap(), 2);
        assert!(load_ledger(&conn).unwrap().is_empty());
    }
}
