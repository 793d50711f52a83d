use std::collections::HashMap;
use std::sync::Arc;

use crate::models::record::Record;

/// Where a value occurs: which record, which column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location {
    pub record_id: u64,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSource {
    pub folder: String,
    pub loaded_at: String,
    pub file_count: usize,
}

/// An immutable record set plus its value index. Published as a whole and
/// never patched; only the per-record state inside each `Record` changes.
#[derive(Debug, Default)]
pub struct Catalog {
    records: Vec<Arc<Record>>,
    positions: HashMap<u64, usize>,
    index: HashMap<String, Vec<Location>>,
    source: Option<CatalogSource>,
}

impl Catalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds the index in one pass. Locations for a key end up ordered by
    /// record id, then column, as long as `records` is sorted by id.
    pub fn build(mut records: Vec<Record>, source: Option<CatalogSource>) -> Self {
        records.sort_by_key(|record| record.id);

        let mut index: HashMap<String, Vec<Location>> = HashMap::new();
        let mut positions = HashMap::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            positions.insert(record.id, position);
            for (column, value) in record.columns.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                index.entry(value.clone()).or_default().push(Location {
                    record_id: record.id,
                    column,
                });
            }
        }

        Self {
            records: records.into_iter().map(Arc::new).collect(),
            positions,
            index,
            source,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn source(&self) -> Option<&CatalogSource> {
        self.source.as_ref()
    }

    pub fn record(&self, id: u64) -> Option<&Arc<Record>> {
        self.positions.get(&id).map(|&position| &self.records[position])
    }

    #[cfg(test)]
    pub fn records(&self) -> impl Iterator<Item = &Arc<Record>> {
        self.records.iter()
    }

    /// Exact, case-sensitive match.
    pub fn lookup(&self, key: &str) -> &[Location] {
        self.index.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn distinct_keys(&self) -> usize {
        self.index.len()
    }
}
