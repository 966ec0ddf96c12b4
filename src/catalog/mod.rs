//! In-memory medicine catalog: snapshot storage, loading from a table source, and search.

pub(crate) mod loader;
pub(crate) mod search;

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use serde::ser::{Serialize, SerializeMap, Serializer};

pub use loader::{Columns, LoadError, Loader, TableSource};
pub use search::{SearchEngine, SearchError};

/// Default time a loaded snapshot is served before a refresh is attempted.
pub const CACHE_DURATION: Duration = Duration::from_secs(300);

/// Raw worksheet contents: a header row and text cells.
///
/// Every row has exactly `headers.len()` cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Shape raw grid values into a table. The first row is the header.
    ///
    /// The width is the widest row. Blank headers become `Unnamed: <i>`,
    /// repeated headers get `.1`, `.2`, … suffixes, and short rows are padded
    /// with empty strings.
    pub fn from_values(mut values: Vec<Vec<String>>) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let width = values.iter().map(Vec::len).max().unwrap_or(0);
        let raw_headers = values.remove(0);

        let mut headers: Vec<String> = Vec::with_capacity(width);
        for i in 0..width {
            let base = match raw_headers.get(i).map(|h| h.as_str()) {
                Some(h) if !h.trim().is_empty() => h.to_string(),
                _ => format!("Unnamed: {i}"),
            };
            let mut name = base.clone();
            let mut suffix = 1;
            while headers.contains(&name) {
                name = format!("{base}.{suffix}");
                suffix += 1;
            }
            headers.push(name);
        }

        let rows = values
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();

        Self { headers, rows }
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// One catalog entry as exposed to API clients: ordered column → value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: Vec<(String, String)>,
}

impl Row {
    pub fn new(cells: Vec<(String, String)>) -> Self {
        Self { cells }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (name, value) in &self.cells {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// A row plus its precomputed search key. The key never leaves the catalog.
#[derive(Debug, Clone)]
pub struct Entry {
    pub row: Row,
    pub search_key: String,
}

/// The table currently served, with the instant it was fetched.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub entries: Vec<Entry>,
    pub fetched_at: Option<Instant>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn age(&self, now: Instant) -> Option<Duration> {
        self.fetched_at.map(|t| now.saturating_duration_since(t))
    }
}

/// Whether a snapshot fetched at `fetched_at` has outlived `ttl` at `now`.
/// A snapshot that was never fetched is always stale.
pub fn is_stale(fetched_at: Option<Instant>, now: Instant, ttl: Duration) -> bool {
    match fetched_at {
        Some(t) => now.saturating_duration_since(t) > ttl,
        None => true,
    }
}

/// Holds the current snapshot. Replacement swaps the whole `Arc`, so readers
/// always see either the old or the new snapshot in full.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Arc<Snapshot> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    pub fn replace(&self, snapshot: Snapshot) {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(snapshot);
    }

    pub fn age(&self, now: Instant) -> Option<Duration> {
        self.current().age(now)
    }

    pub fn is_stale(&self, now: Instant, ttl: Duration) -> bool {
        is_stale(self.current().fetched_at, now, ttl)
    }
}
