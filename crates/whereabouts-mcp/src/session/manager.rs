//! Engine lifecycle for one server process.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use whereabouts::{EngineConfig, InferenceEngine, LoadStats, TrainPolicy, WhereaboutsResult};

use crate::types::{McpError, McpResult};

/// Owns the inference engine shared by every tool call.
pub struct WhereaboutsSession {
    engine: Arc<InferenceEngine>,
    train_policy: TrainPolicy,
    tool_calls: AtomicU64,
}

impl WhereaboutsSession {
    /// Open the storage directory named by `config` and build the engine.
    pub fn open(config: &EngineConfig) -> McpResult<Self> {
        let engine = InferenceEngine::open(config).map_err(|e| {
            McpError::Storage(format!(
                "Failed to open storage at {}: {e}",
                config.storage_dir.display()
            ))
        })?;

        let LoadStats { files, rows, skipped } = engine.store().load_stats();
        tracing::info!(
            "Session started. {} labels, {} sightings ({} rows skipped) in {} log files",
            engine.store().labels().len(),
            rows,
            skipped,
            files
        );

        Ok(Self::with_engine(Arc::new(engine)))
    }

    /// Wrap an already constructed engine.
    pub fn with_engine(engine: Arc<InferenceEngine>) -> Self {
        Self {
            engine,
            train_policy: TrainPolicy::TrainIfMissing,
            tool_calls: AtomicU64::new(0),
        }
    }

    /// Change how predictions treat labels without a trained model.
    pub fn set_train_policy(&mut self, policy: TrainPolicy) {
        self.train_policy = policy;
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    /// Run engine work that touches disk or retrains on the blocking pool.
    pub async fn blocking<T, F>(&self, work: F) -> McpResult<T>
    where
        F: FnOnce(&InferenceEngine) -> WhereaboutsResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || work(&engine))
            .await
            .map_err(|e| McpError::InternalError(format!("Engine task failed: {e}")))?
            .map_err(McpError::from)
    }

    pub fn train_policy(&self) -> TrainPolicy {
        self.train_policy
    }

    /// Count one tool invocation and return the running total.
    pub fn record_call(&self) -> u64 {
        self.tool_calls.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn tool_calls(&self) -> u64 {
        self.tool_calls.load(Ordering::Relaxed)
    }
}
