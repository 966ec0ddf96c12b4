use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::loader::{Loader, TableSource};
use super::{Row, Snapshot, SnapshotStore};
use crate::translit;

/// Shortest accepted query, counted in characters of the raw input.
pub const MIN_QUERY_CHARS: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Qidiruv so'rovi kamida 2 ta belgidan iborat bo'lishi kerak.")]
    InvalidQuery,

    #[error("Serverda ma'lumotlar bazasi topilmadi yoki xato yuklangan.")]
    NoData,

    #[error("Qidiruv jarayonida ichki xatolik yuz berdi.")]
    Internal(String),
}

/// Price-ordered substring search over the cached catalog.
///
/// A stale snapshot triggers a reload before searching; if the reload fails
/// the search runs against whatever snapshot is still held.
pub struct SearchEngine<S> {
    store: Arc<SnapshotStore>,
    loader: Loader<S>,
    ttl: Duration,
}

impl<S: TableSource> SearchEngine<S> {
    pub fn new(store: Arc<SnapshotStore>, loader: Loader<S>, ttl: Duration) -> Self {
        Self { store, loader, ttl }
    }

    /// Unconditionally reload the catalog.
    pub async fn refresh(&self) -> Result<usize, super::LoadError> {
        self.loader.load(&self.store).await
    }

    pub async fn search(&self, query: Option<&str>) -> Result<Vec<Row>, SearchError> {
        self.search_at(query, Instant::now()).await
    }

    pub(crate) async fn search_at(
        &self,
        query: Option<&str>,
        now: Instant,
    ) -> Result<Vec<Row>, SearchError> {
        let query = match query {
            Some(q) if q.chars().count() >= MIN_QUERY_CHARS => q,
            _ => return Err(SearchError::InvalidQuery),
        };

        if self.store.is_stale(now, self.ttl) {
            info!(age = ?self.store.age(now), "catalog snapshot stale, refreshing");
            if let Err(e) = self.refresh().await {
                debug!(error = %e, "refresh failed, searching previous snapshot");
            }
        }

        let snapshot = self.store.current();
        if snapshot.is_empty() {
            return Err(SearchError::NoData);
        }

        let key = translit::search_key(query);
        let price_column = self.loader.columns().price.clone();
        let results = tokio::task::spawn_blocking(move || {
            find_sorted(&snapshot, &key, &price_column)
        })
        .await
        .map_err(|e| SearchError::Internal(e.to_string()))?;

        info!(query, matches = results.len(), "search complete");
        Ok(results)
    }
}

/// Rows whose search key contains `key`, ordered by ascending price.
/// Rows without a usable price go last; ties keep catalog order.
pub fn find_sorted(snapshot: &Snapshot, key: &str, price_column: &str) -> Vec<Row> {
    let mut matched: Vec<(Option<u64>, &Row)> = snapshot
        .entries
        .iter()
        .filter(|entry| entry.search_key.contains(key))
        .map(|entry| (entry.row.get(price_column).and_then(parse_price), &entry.row))
        .collect();

    if matched.is_empty() {
        return Vec::new();
    }
    if matched.iter().all(|(_, row)| row.get(price_column).is_none()) {
        debug!(column = price_column, "price column missing, results left unsorted");
    }

    debug!(before = ?prices(&matched), "sorting matches by price");
    matched.sort_by_key(|(price, _)| match price {
        Some(value) => (false, *value),
        None => (true, 0),
    });
    debug!(after = ?prices(&matched), "sorted");

    matched.into_iter().map(|(_, row)| row.clone()).collect()
}

/// Keep only ASCII digits and read them as an integer.
/// No digits yields `None`; values past `u64::MAX` saturate.
pub fn parse_price(raw: &str) -> Option<u64> {
    let mut digits = raw.bytes().filter(u8::is_ascii_digit).peekable();
    digits.peek()?;
    Some(digits.fold(0u64, |acc, d| {
        acc.saturating_mul(10).saturating_add(u64::from(d - b'0'))
    }))
}

fn prices(matched: &[(Option<u64>, &Row)]) -> Vec<Option<u64>> {
    matched.iter().map(|(price, _)| *price).collect()
}
