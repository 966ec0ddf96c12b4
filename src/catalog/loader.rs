use std::future::Future;
use std::time::Instant;

use tracing::{info, warn};

use super::{Entry, Row, Snapshot, SnapshotStore, Table};
use crate::sheets::SheetsError;
use crate::translit;

pub const DEFAULT_NAME_COLUMN: &str = "Dori Nomi";
pub const DEFAULT_PRICE_COLUMN: &str = "Narxi";

/// Where the catalog table comes from.
/// Implemented by `SheetsClient` for production; in-memory sources are used in tests.
pub trait TableSource {
    fn fetch_table(&self) -> impl Future<Output = Result<Table, SheetsError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("table source failed: {0}")]
    Source(#[from] SheetsError),

    #[error("column '{0}' not found in sheet header")]
    MissingColumn(String),
}

/// Header names of the columns the catalog relies on.
#[derive(Debug, Clone)]
pub struct Columns {
    pub name: String,
    pub price: String,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME_COLUMN.to_string(),
            price: DEFAULT_PRICE_COLUMN.to_string(),
        }
    }
}

pub struct Loader<S> {
    source: S,
    columns: Columns,
}

impl<S: TableSource> Loader<S> {
    pub fn new(source: S, columns: Columns) -> Self {
        Self { source, columns }
    }

    pub fn columns(&self) -> &Columns {
        &self.columns
    }

    #[cfg(test)]
    pub(crate) fn source(&self) -> &S {
        &self.source
    }

    /// Pull the full table and swap it into `store`.
    ///
    /// On any failure the store keeps its previous snapshot. Returns the
    /// number of rows loaded.
    pub async fn load(&self, store: &SnapshotStore) -> Result<usize, LoadError> {
        info!("loading catalog from table source");
        let result = self.fetch_snapshot().await;
        match result {
            Ok(snapshot) => {
                let count = snapshot.entries.len();
                store.replace(snapshot);
                info!(rows = count, "catalog loaded");
                Ok(count)
            }
            Err(e) => {
                warn!(error = %e, "catalog load failed, keeping previous snapshot");
                Err(e)
            }
        }
    }

    async fn fetch_snapshot(&self) -> Result<Snapshot, LoadError> {
        let table = self.source.fetch_table().await?;
        let entries = build_entries(table, &self.columns.name)?;
        Ok(Snapshot {
            entries,
            fetched_at: Some(Instant::now()),
        })
    }
}

fn build_entries(table: Table, name_column: &str) -> Result<Vec<Entry>, LoadError> {
    let name_idx = table
        .column(name_column)
        .ok_or_else(|| LoadError::MissingColumn(name_column.to_string()))?;

    let Table { headers, rows } = table;
    let entries = rows
        .into_iter()
        .map(|cells| {
            let search_key = translit::search_key(&cells[name_idx]);
            let row = Row::new(headers.iter().cloned().zip(cells).collect());
            Entry { row, search_key }
        })
        .collect();
    Ok(entries)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays queued results; once drained, every call fails.
    pub(crate) struct ScriptedSource {
        responses: Mutex<VecDeque<Result<Table, SheetsError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        pub(crate) fn new(responses: Vec<Result<Table, SheetsError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TableSource for ScriptedSource {
        async fn fetch_table(&self) -> Result<Table, SheetsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(unavailable()))
        }
    }

    pub(crate) fn unavailable() -> SheetsError {
        SheetsError::Api {
            code: 503,
            message: "backend unavailable".into(),
        }
    }

    pub(crate) fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table::from_values(
            std::iter::once(headers)
                .chain(rows.iter().copied())
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[tokio::test]
    async fn load_computes_search_keys() {
        let source = ScriptedSource::new(vec![Ok(table(
            &["Dori Nomi", "Narxi"],
            &[&["Парацетамол", "5000"], &["No-Spa Forte", "21 000"]],
        ))]);
        let loader = Loader::new(source, Columns::default());
        let store = SnapshotStore::new();

        let count = loader.load(&store).await.unwrap();

        assert_eq!(count, 2);
        let snapshot = store.current();
        assert!(snapshot.fetched_at.is_some());
        assert_eq!(snapshot.entries[0].search_key, "paratsetamol");
        assert_eq!(snapshot.entries[1].search_key, "no-spa forte");
        assert_eq!(snapshot.entries[1].row.get("Narxi"), Some("21 000"));
    }

    #[tokio::test]
    async fn missing_name_column_keeps_previous_snapshot() {
        let source = ScriptedSource::new(vec![
            Ok(table(&["Dori Nomi"], &[&["Nospa"]])),
            Ok(table(&["Nomi"], &[&["Analgin"]])),
        ]);
        let loader = Loader::new(source, Columns::default());
        let store = SnapshotStore::new();
        loader.load(&store).await.unwrap();

        let err = loader.load(&store).await.unwrap_err();

        assert!(matches!(err, LoadError::MissingColumn(ref c) if c == "Dori Nomi"));
        let snapshot = store.current();
        assert_eq!(snapshot.entries.len(), 1);
        assert_eq!(snapshot.entries[0].row.get("Dori Nomi"), Some("Nospa"));
    }

    #[tokio::test]
    async fn source_failure_keeps_previous_snapshot() {
        let source = ScriptedSource::new(vec![Ok(table(&["Dori Nomi"], &[&["Nospa"]]))]);
        let loader = Loader::new(source, Columns::default());
        let store = SnapshotStore::new();
        loader.load(&store).await.unwrap();
        let first = store.current().fetched_at;

        let err = loader.load(&store).await.unwrap_err();

        assert!(matches!(err, LoadError::Source(SheetsError::Api { code: 503, .. })));
        assert_eq!(store.current().fetched_at, first);
        assert_eq!(store.current().entries.len(), 1);
    }

    #[tokio::test]
    async fn failure_on_empty_store_leaves_it_unfetched() {
        let loader = Loader::new(ScriptedSource::new(vec![]), Columns::default());
        let store = SnapshotStore::new();

        assert!(loader.load(&store).await.is_err());
        assert!(store.current().is_empty());
        assert!(store.current().fetched_at.is_none());
    }

    #[tokio::test]
    async fn custom_name_column_is_honoured() {
        let source = ScriptedSource::new(vec![Ok(table(&["Name", "Price"], &[&["Аспирин", "3"]]))]);
        let columns = Columns {
            name: "Name".into(),
            price: "Price".into(),
        };
        let loader = Loader::new(source, columns);
        let store = SnapshotStore::new();

        loader.load(&store).await.unwrap();

        assert_eq!(store.current().entries[0].search_key, "aspirin");
    }
}
