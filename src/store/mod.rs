//! Transactional state store.
//!
//! # Data Flow
//! ```text
//! writer (allocate, register, pool edit, ...)
//!     → lock writer mutex
//!     → clone current snapshot into a draft
//!     → mutate draft; any error drops the draft (rollback)
//!     → publish draft as the new snapshot (commit)
//!
//! reader (list, stats, lookups)
//!     → load current snapshot (lock-free)
//! ```
//!
//! # Design Decisions
//! - One writer at a time: capacity checks and port reservation cannot race
//! - Readers never block and always see a fully committed state
//! - Optional JSON persistence after every commit and on shutdown

pub mod persistence;
pub mod state;

use arc_swap::ArcSwap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

pub use state::{PortsExhausted, StoreState};

/// Errors from loading or saving the state image.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Shared handle to the service state.
pub struct Store {
    snapshot: ArcSwap<StoreState>,
    writer: Mutex<()>,
    path: Option<PathBuf>,
    autosave: bool,
}

impl Store {
    /// In-memory store.
    pub fn new(base_port: u16) -> Self {
        Self::from_state(StoreState::new(base_port))
    }

    /// Store seeded with an existing state image.
    pub fn from_state(state: StoreState) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(state),
            writer: Mutex::new(()),
            path: None,
            autosave: false,
        }
    }

    /// Store backed by a JSON file, loading it if present.
    pub fn open(path: &Path, base_port: u16, autosave: bool) -> Result<Self, StoreError> {
        let mut state = persistence::load_state(path)?.unwrap_or_else(|| StoreState::new(base_port));
        state.normalize(base_port);

        let mut store = Self::from_state(state);
        store.path = Some(path.to_path_buf());
        store.autosave = autosave;
        Ok(store)
    }

    /// Current committed state.
    pub fn snapshot(&self) -> Arc<StoreState> {
        self.snapshot.load_full()
    }

    /// Run `f` as one atomic unit.
    ///
    /// `f` works on a private draft. The draft replaces the snapshot only if
    /// `f` returns `Ok`; on `Err` nothing is visible to anyone.
    pub async fn transact<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut StoreState) -> Result<T, E>,
    {
        let _guard = self.writer.lock().await;
        let mut draft = StoreState::clone(&self.snapshot.load());
        let out = f(&mut draft)?;
        let committed = Arc::new(draft);
        self.snapshot.store(committed.clone());

        if self.autosave {
            if let Some(path) = &self.path {
                if let Err(e) = persistence::save_state(path, &committed) {
                    tracing::error!(path = %path.display(), error = %e, "Failed to persist committed state");
                }
            }
        }
        Ok(out)
    }

    /// Persist the current snapshot, if a path is configured.
    pub async fn save(&self) -> Result<(), StoreError> {
        if let Some(path) = &self.path {
            let _guard = self.writer.lock().await;
            persistence::save_state(path, &self.snapshot.load())?;
        }
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
