use std::sync::Arc;

use crate::data::repository;
use crate::error::AppError;
use crate::models::query::QueryResult;
use crate::models::record::{Record, RecordState};
use crate::services::history_service;
use crate::services::index_service::Catalog;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct Resolution {
    pub record: Arc<Record>,
    pub column: usize,
    pub multiple: bool,
}

/// Picks the first location for `key` in (record id, column) order.
pub fn resolve(catalog: &Catalog, key: &str) -> Option<Resolution> {
    let locations = catalog.lookup(key);
    let first = locations.first()?;
    let record = catalog.record(first.record_id)?.clone();
    Some(Resolution {
        record,
        column: first.column,
        multiple: locations.len() > 1,
    })
}

/// Looks `key` up in the active catalog, bumps the matched record's query
/// count and logs the query to history. The history row and the ledger
/// update commit together.
///
/// The catalog snapshot is taken after the history and db locks, so a reload
/// cannot swap catalogs between this ledger write and its own ledger read.
pub fn query(state: &AppState, key: &str) -> Result<QueryResult, AppError> {
    let mut history = state.lock_history();
    let conn = state.lock_db();

    let catalog = state.catalog();
    let resolution = resolve(&catalog, key);

    let Some(resolution) = resolution else {
        tracing::debug!(key, "query matched nothing");
        history.append(&conn, history_service::new_entry(key, None, false))?;
        return Ok(QueryResult::not_found());
    };

    let record = &resolution.record;
    let mut record_state = record.lock_state();
    let next = RecordState {
        query_count: record_state.query_count + 1,
        verification: record_state.verification.clone(),
    };

    let entry = history_service::new_entry(
        key,
        Some(record.link.clone()),
        next.verification.is_verified(),
    );
    history.append_with(&conn, entry, |tx| match record.ledger_key() {
        Some((natural_key, occurrence)) => {
            repository::save_query_count(tx, natural_key, occurrence, next.query_count)
        }
        None => Ok(()),
    })?;
    *record_state = next;

    tracing::debug!(
        key,
        record_id = record.id,
        column = resolution.column,
        multiple = resolution.multiple,
        "query matched"
    );

    Ok(QueryResult {
        found: true,
        record: Some(record.view_with(&record_state)),
        is_duplicate: resolution.multiple,
        matched_column: Some(resolution.column),
        multiple_matches: resolution.multiple,
    })
}
