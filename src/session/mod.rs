//! Session Registry: a mapping from logical sink name to an opaque,
//! pre-opened handle. Frozen during the run; the Manager owns the registry
//! and releases every session after termination.

pub mod postgres;
pub mod timeseries;

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use tracing::{info, warn};

use crate::errors::Result;

/// A live connection or client borrowed for the duration of one
/// `Observation::observe` or `Exporter::export` call.
#[async_trait]
pub trait Session: Send + Sync {
    /// Released once, after the pipeline reaches quiescence and shuts down.
    async fn release(&self) -> Result<()> {
        Ok(())
    }

    /// Narrows to the query-capable facet, when this session supports it.
    /// Default `None` for write-only/no-query sessions.
    fn as_query_session(&self) -> Option<&dyn QuerySession> {
        None
    }

    /// Narrows to the write-capable facet, when this session supports it.
    /// Default `None` for read-only sessions.
    fn as_writable_session(&self) -> Option<&dyn WritableSession> {
        None
    }

    /// Narrows to the batch time-series writer facet. Default `None` for
    /// sessions that aren't one.
    fn as_time_series_writer(&self) -> Option<&dyn TimeSeriesWriter> {
        None
    }
}

/// A session that can run a read-only query and hand rows back as JSON.
#[async_trait]
pub trait QuerySession: Session {
    async fn query_json(&self, query: &str) -> Result<Vec<serde_json::Value>>;
}

/// A session that can write a JSON row into a named relation.
#[async_trait]
pub trait WritableSession: Session {
    async fn insert_row(&self, table: &str, row: &serde_json::Value) -> Result<()>;
}

/// A session that accepts a pre-encoded batch write — time-series exporters
/// submit a write batch rather than one row at a time.
#[async_trait]
pub trait TimeSeriesWriter: Session {
    async fn write_batch(&self, body: String) -> Result<()>;
}

/// Mapping `name -> Session`, built once before the run and handed to the
/// Manager inside the Context. Iteration (and therefore release) order is
/// insertion order, which keeps shutdown logs deterministic.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<IndexMap<String, Arc<dyn Session>>>,
}

impl SessionRegistry {
    pub fn builder() -> SessionRegistryBuilder {
        SessionRegistryBuilder::default()
    }

    /// Looked up by `exporter.name`; a missing key means the dispatcher logs
    /// at CRITICAL and drops the exporter rather than failing the run.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Session>> {
        self.sessions.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Releases every session in registration order. A release failure is
    /// logged but does not abort the release of the remaining sessions.
    pub async fn release_all(&self) {
        for (name, session) in self.sessions.iter() {
            match session.release().await {
                Ok(()) => info!(session = %name, "released session"),
                Err(err) => warn!(session = %name, error = %err, "failed to release session"),
            }
        }
    }
}

#[derive(Default)]
pub struct SessionRegistryBuilder {
    sessions: IndexMap<String, Arc<dyn Session>>,
}

impl SessionRegistryBuilder {
    pub fn with_session(mut self, name: impl Into<String>, session: Arc<dyn Session>) -> Self {
        self.sessions.insert(name.into(), session);
        self
    }

    pub fn build(self) -> SessionRegistry {
        SessionRegistry {
            sessions: Arc::new(self.sessions),
        }
    }
}
