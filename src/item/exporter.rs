use std::fmt::Debug;

use async_trait::async_trait;

use crate::errors::Result;
use crate::session::Session;

/// A request to write one record (or batch) to the sink named by `name()`.
/// `identity()` is a stable key used to de-duplicate the *exported*
/// accounting set so that re-exporting the same logical record (e.g. on a
/// retried run) is counted once.
#[async_trait]
pub trait Exporter: Debug + Send + Sync {
    /// The session-registry key identifying the target sink.
    fn name(&self) -> &str;

    /// Stable identity for the *exported* de-duplication set.
    fn identity(&self) -> u64;

    /// Load this exporter's payload to `session`. Transport/driver failures
    /// should be returned as `Err`; the dispatcher logs at CRITICAL and never
    /// retries.
    async fn export(&self, session: &dyn Session) -> Result<()>;
}
