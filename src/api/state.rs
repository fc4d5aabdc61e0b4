use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::error::AppResult;
use crate::services::{load_snapshot, EngineSnapshot, StayRecordSource};

/// Shared application state
///
/// Readers take a cheap clone of the current snapshot `Arc` and release the
/// lock before doing any work. A refresh builds the replacement off to the side
/// and swaps it in under the write lock, so a half-built engine is never visible.
#[derive(Clone)]
pub struct AppState {
    source: Arc<dyn StayRecordSource>,
    snapshot: Arc<RwLock<Arc<EngineSnapshot>>>,
    refresh_guard: Arc<Mutex<()>>,
}

impl AppState {
    /// Wraps an already built snapshot
    pub fn new(source: Arc<dyn StayRecordSource>, snapshot: EngineSnapshot) -> Self {
        Self {
            source,
            snapshot: Arc::new(RwLock::new(Arc::new(snapshot))),
            refresh_guard: Arc::new(Mutex::new(())),
        }
    }

    /// Loads records from `source` and builds the first snapshot
    pub async fn load(source: Arc<dyn StayRecordSource>) -> AppResult<Self> {
        let snapshot = load_snapshot(source.clone()).await?;
        Ok(Self::new(source, snapshot))
    }

    /// The snapshot currently serving requests
    pub async fn snapshot(&self) -> Arc<EngineSnapshot> {
        self.snapshot.read().await.clone()
    }

    /// Rebuilds from the source and swaps the result in
    ///
    /// Concurrent refreshes are serialized. On failure the previous snapshot
    /// keeps serving.
    pub async fn refresh(&self) -> AppResult<Arc<EngineSnapshot>> {
        let _guard = self.refresh_guard.lock().await;

        let fresh = Arc::new(load_snapshot(self.source.clone()).await?);
        *self.snapshot.write().await = fresh.clone();

        tracing::info!(built_at = %fresh.built_at, "Engine snapshot swapped");
        Ok(fresh)
    }
}
