//! The read-only slice of run state that Observation variants need in order
//! to fetch: merged HTTP/renderer defaults and a handle to the session
//! registry. Kept separate from `pipeline::ManagerShared` (which adds the
//! queues, the accounting sets, and the pending-work counter) so that the
//! `item` module never has to depend on `pipeline`.

use std::sync::Arc;

use crate::config::Settings;
use crate::session::SessionRegistry;

/// Handed to `Observation::observe` by the manager on every dequeue.
#[derive(Clone)]
pub struct RunContext {
    pub settings: Arc<Settings>,
    pub sessions: SessionRegistry,
}

impl RunContext {
    pub fn new(settings: Arc<Settings>, sessions: SessionRegistry) -> Self {
        Self { settings, sessions }
    }
}
