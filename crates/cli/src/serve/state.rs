//! Application state shared across request handlers.

use std::time::Instant;

use krishi_core::Actor;

use crate::backend::{AppAuth, AppLedger, Backend, SharedDocuments};

pub(crate) struct AppState {
    /// Profiles and accounts, shared with the ledger's record store.
    pub(crate) documents: SharedDocuments,
    pub(crate) ledger: AppLedger,
    pub(crate) auth: AppAuth,
    pub(crate) started_at: Instant,
}

impl AppState {
    pub(crate) fn new(backend: Backend) -> Self {
        Self {
            documents: backend.documents,
            ledger: backend.ledger,
            auth: backend.auth,
            started_at: Instant::now(),
        }
    }
}

/// The signed-in caller, inserted into request extensions by the session
/// middleware.
#[derive(Debug, Clone)]
pub(crate) struct CurrentSession {
    pub(crate) token: String,
    pub(crate) actor: Actor,
}
