use rusqlite::Connection;

use crate::data::repository;
use crate::error::AppError;

pub const HAS_HEADER_KEY: &str = "ingest_has_header";
pub const LINK_COLUMN_KEY: &str = "ingest_link_column";
pub const KEY_COLUMN_KEY: &str = "ingest_key_column";
pub const TRIM_VALUES_KEY: &str = "ingest_trim_values";
pub const NEXT_RECORD_ID_KEY: &str = "next_record_id";

const EDITABLE_KEYS: &[&str] = &[
    HAS_HEADER_KEY,
    LINK_COLUMN_KEY,
    KEY_COLUMN_KEY,
    TRIM_VALUES_KEY,
];

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IngestSettings {
    pub has_header: bool,
    pub link_column: usize,
    pub key_column: usize,
    pub trim_values: bool,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            has_header: true,
            link_column: 1,
            key_column: 0,
            trim_values: true,
        }
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, AppError> {
    match raw.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(AppError::InvalidInput(format!(
            "{key} expects true or false, got '{other}'"
        ))),
    }
}

fn parse_column(key: &str, raw: &str) -> Result<usize, AppError> {
    raw.trim().parse::<usize>().map_err(|_| {
        AppError::InvalidInput(format!(
            "{key} expects a non-negative column position, got '{raw}'"
        ))
    })
}

fn ensure_editable(key: &str) -> Result<(), AppError> {
    if EDITABLE_KEYS.contains(&key) {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!("unknown setting: {key}")))
    }
}

/// Returns the canonical form of `value`, or an error if it does not fit `key`.
fn validate(key: &str, value: &str) -> Result<String, AppError> {
    match key {
        HAS_HEADER_KEY | TRIM_VALUES_KEY => parse_bool(key, value).map(|v| v.to_string()),
        LINK_COLUMN_KEY | KEY_COLUMN_KEY => parse_column(key, value).map(|v| v.to_string()),
        _ => Err(AppError::InvalidInput(format!("unknown setting: {key}"))),
    }
}

pub fn load_ingest_settings(conn: &Connection) -> Result<IngestSettings, AppError> {
    let defaults = IngestSettings::default();
    let read = |key: &str| repository::get_setting(conn, key);

    Ok(IngestSettings {
        has_header: match read(HAS_HEADER_KEY)? {
            Some(raw) => parse_bool(HAS_HEADER_KEY, &raw)?,
            None => defaults.has_header,
        },
        link_column: match read(LINK_COLUMN_KEY)? {
            Some(raw) => parse_column(LINK_COLUMN_KEY, &raw)?,
            None => defaults.link_column,
        },
        key_column: match read(KEY_COLUMN_KEY)? {
            Some(raw) => parse_column(KEY_COLUMN_KEY, &raw)?,
            None => defaults.key_column,
        },
        trim_values: match read(TRIM_VALUES_KEY)? {
            Some(raw) => parse_bool(TRIM_VALUES_KEY, &raw)?,
            None => defaults.trim_values,
        },
    })
}

pub fn get(conn: &Connection, key: &str) -> Result<Option<String>, AppError> {
    ensure_editable(key)?;
    repository::get_setting(conn, key)
}

pub fn set(conn: &Connection, key: &str, value: &str) -> Result<(), AppError> {
    ensure_editable(key)?;
    let canonical = validate(key, value)?;
    repository::set_setting(conn, key, &canonical)
}

/// Reserves `count` consecutive record ids and returns the first one. The
/// counter is persisted, so ids are never handed out twice.
pub fn allocate_record_ids(conn: &Connection, count: usize) -> Result<u64, AppError> {
    let tx = conn.unchecked_transaction()?;
    let first = match repository::get_setting(&tx, NEXT_RECORD_ID_KEY)? {
        Some(raw) => raw.parse::<u64>().map_err(|_| {
            AppError::General(format!("corrupt {NEXT_RECORD_ID_KEY} setting: '{raw}'"))
        })?,
        None => 1,
    };
    let next = first + count as u64;
    repository::set_setting(&tx, NEXT_RECORD_ID_KEY, &next.to_string())?;
    tx.commit()?;
    Ok(first)
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

    #[test]
    fn test_defaults_when_unset() {
        let conn = setup_db();
        assert_eq!(
            load_ingest_settings(&conn).unwrap(),
            IngestSettings::default()
        );
    }

    #[test]
    fn test_set_validates_and_canonicalizes() {
        let conn = setup_db();
        set(&conn, LINK_COLUMN_KEY, " 3 ").unwrap();
        set(&conn, HAS_HEADER_KEY, "false").unwrap();

        let settings = load_ingest_settings(&conn).unwrap();
        assert_eq!(settings.link_column, 3);
        assert!(!settings.has_header);
        assert_eq!(get(&conn, LINK_COLUMN_KEY).unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn test_set_rejects_bad_values_and_unknown_keys() {
        let conn = setup_db();
        assert_eq!(
            set(&conn, LINK_COLUMN_KEY, "-1").unwrap_err().kind(),
            "invalid_input"
        );
        assert_eq!(
            set(&conn, TRIM_VALUES_KEY, "yes").unwrap_err().kind(),
            "invalid_input"
        );
        assert_eq!(
            set(&conn, NEXT_RECORD_ID_KEY, "1").unwrap_err().kind(),
            "invalid_input"
        );
        assert!(get(&conn, "api_key").is_err());
    }

    #[test]
    fn test_record_ids_are_never_reused() {
        let conn = setup_db();
        assert_eq!(allocate_record_ids(&conn, 3).unwrap(), 1);
        assert_eq!(allocate_record_ids(&conn, 0).unwrap(), 4);
        assert_eq!(allocate_record_ids(&conn, 2).unwrap(), 4);
        assert_eq!(allocate_record_ids(&conn, 1).unwrap(), 6);
    }
}
