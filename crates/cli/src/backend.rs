//! Wiring of stores, ledger and auth provider from command-line options.

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use krishi_core::{Actor, PriceReference, PriceTable};
use krishi_storage::{
    get_profile, list_profiles, DocumentRecordStore, DocumentStore, JsonFileDocumentStore,
    MemoryDocumentStore,
};
use krishi_trace::{seed_demo, Ledger, LocalAuthProvider, TraceError};

pub(crate) type SharedDocuments = Arc<dyn DocumentStore>;
pub(crate) type AppLedger = Ledger<DocumentRecordStore<SharedDocuments>>;
pub(crate) type AppAuth = LocalAuthProvider<SharedDocuments>;

/// Everything a command or the server needs, over one document store.
pub(crate) struct Backend {
    pub(crate) documents: SharedDocuments,
    pub(crate) ledger: AppLedger,
    pub(crate) auth: AppAuth,
}

/// Open the document store at `data` (in-memory when `None`) and build the
/// ledger and auth provider over it.
pub(crate) async fn open_backend(
    data: Option<&Path>,
    prices: Option<&Path>,
) -> Result<Backend, Box<dyn Error>> {
    let prices = load_prices(prices)?;
    let documents: SharedDocuments = match data {
        Some(path) => {
            let store = JsonFileDocumentStore::open(path).await?;
            tracing::info!(path = %path.display(), "opened data file");
            Arc::new(store)
        }
        None => Arc::new(MemoryDocumentStore::new()),
    };
    Ok(Backend {
        ledger: Ledger::new(DocumentRecordStore::new(documents.clone()), prices),
        auth: LocalAuthProvider::new(documents.clone()),
        documents,
    })
}

/// Like [`open_backend`], but a run without a data file reads from a freshly
/// seeded demo dataset.
pub(crate) async fn open_for_reading(
    data: Option<&Path>,
    prices: Option<&Path>,
) -> Result<Backend, Box<dyn Error>> {
    let backend = open_backend(data, prices).await?;
    if data.is_none() {
        seed_demo(&backend.ledger, &backend.auth).await?;
    }
    Ok(backend)
}

/// The built-in table, or the JSON array of references at `path`.
pub(crate) fn load_prices(path: Option<&Path>) -> Result<PriceTable, Box<dyn Error>> {
    let Some(path) = path else {
        return Ok(PriceTable::builtin());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("error reading price file '{}': {}", path.display(), e))?;
    let entries: Vec<PriceReference> = serde_json::from_str(&text)
        .map_err(|e| format!("invalid price file '{}': {}", path.display(), e))?;
    Ok(PriceTable::from_entries(entries))
}

/// Find an actor by uid, or by email when `key` contains `@`.
pub(crate) async fn find_actor(backend: &Backend, key: &str) -> Result<Actor, TraceError> {
    let key = key.trim();
    let found = if key.contains('@') {
        let email = key.to_lowercase();
        list_profiles(&backend.documents)
            .await?
            .into_iter()
            .find(|a| a.email == email)
    } else {
        get_profile(&backend.documents, key).await?
    };
    found.ok_or_else(|| TraceError::NotFound {
        what: "actor",
        key: key.to_string(),
    })
}
