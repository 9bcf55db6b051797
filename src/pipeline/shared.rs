//! `ManagerShared`: the run state that observers and adapters hold a
//! back-reference to. Never stores the observer/adapter instances
//! themselves, so no reference cycle exists.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashSet;
use tokio::sync::{mpsc, Notify};

use crate::config::Settings;
use crate::context::RunContext;
use crate::item::{Exporter, Finding, Observation};
use crate::session::SessionRegistry;

/// One item of "outstanding work": queued or currently being processed by a
/// worker. Reaching zero is necessary and sufficient for quiescence — see
/// the doc on `wait_for_zero`.
#[derive(Default)]
pub struct PendingCounter {
    count: AtomicUsize,
    notify: Notify,
}

impl PendingCounter {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Called by the router on every successful enqueue (including seeds).
    pub fn increment(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    /// Called by a worker once it has fully finished one dequeued item,
    /// including routing all of that item's own downstream items (whose
    /// increments have therefore already landed before this decrement).
    pub fn decrement(&self) {
        let previous = self.count.fetch_sub(1, Ordering::SeqCst);
        if previous == 1 {
            self.notify.notify_waiters();
        }
    }

    /// Resolves once the counter is (still) zero. Registers the `Notify`
    /// listener before re-checking the count so a decrement landing between
    /// the check and the wait is never missed.
    pub async fn wait_for_zero(&self) {
        loop {
            let notified = self.notify.notified();
            if self.count.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

pub(crate) type Queue<T: ?Sized> = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Option<Box<T>>>>>;

/// The manager's mutable run state, behind an `Arc`. Observer and Adapter
/// instances hold a clone of this `Arc` as their back-reference; it is never
/// stored the other way around.
pub struct ManagerShared {
    pub settings: Arc<Settings>,
    pub sessions: SessionRegistry,

    pub seen: DashSet<u64>,
    pub observed: DashSet<u64>,
    pub not_observed: DashSet<u64>,
    pub exported: DashSet<u64>,

    pub pending: PendingCounter,

    observe_tx: mpsc::UnboundedSender<Option<Box<dyn Observation>>>,
    adapt_tx: mpsc::UnboundedSender<Option<Box<dyn Finding>>>,
    export_tx: mpsc::UnboundedSender<Option<Box<dyn Exporter>>>,
}

impl ManagerShared {
    pub(crate) fn new(
        settings: Arc<Settings>,
        sessions: SessionRegistry,
        observe_tx: mpsc::UnboundedSender<Option<Box<dyn Observation>>>,
        adapt_tx: mpsc::UnboundedSender<Option<Box<dyn Finding>>>,
        export_tx: mpsc::UnboundedSender<Option<Box<dyn Exporter>>>,
    ) -> Self {
        Self {
            settings,
            sessions,
            seen: DashSet::new(),
            observed: DashSet::new(),
            not_observed: DashSet::new(),
            exported: DashSet::new(),
            pending: PendingCounter::default(),
            observe_tx,
            adapt_tx,
            export_tx,
        }
    }

    /// The read-only slice of state an `Observation::observe` call needs.
    pub fn run_context(&self) -> RunContext {
        RunContext::new(self.settings.clone(), self.sessions.clone())
    }

    pub(crate) fn send_observation(&self, obs: Box<dyn Observation>) {
        let _ = self.observe_tx.send(Some(obs));
    }

    pub(crate) fn send_finding(&self, finding: Box<dyn Finding>) {
        let _ = self.adapt_tx.send(Some(finding));
    }

    pub(crate) fn send_exporter(&self, exporter: Box<dyn Exporter>) {
        let _ = self.export_tx.send(Some(exporter));
    }

    pub(crate) fn send_observe_sentinel(&self) {
        let _ = self.observe_tx.send(None);
    }

    pub(crate) fn send_adapt_sentinel(&self) {
        let _ = self.adapt_tx.send(None);
    }

    pub(crate) fn send_export_sentinel(&self) {
        let _ = self.export_tx.send(None);
    }
}
