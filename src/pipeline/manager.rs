//! The Manager: owns the three queues and worker pools, drives
//! initialization, routing, and quiescence-then-sentinel termination.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};

use crate::adapter::{sort_by_priority, Adapter};
use crate::config::Settings;
use crate::errors::Result;
use crate::item::observation::ObserveOutcome;
use crate::item::{Exporter, Finding, Item, ItemSource, Observation};
use crate::observer::Observer;
use crate::pipeline::router::route;
use crate::pipeline::shared::{ManagerShared, Queue};
use crate::session::SessionRegistry;

/// Produces a `Box<dyn Observer>` given the shared run state. Context holds
/// factories rather than class metadata, so constructing an observer/adapter
/// set is just calling each factory once at startup.
pub type ObserverFactory = Box<dyn Fn(Arc<ManagerShared>) -> Box<dyn Observer> + Send + Sync>;

/// Produces an `Arc<dyn Adapter>` given the shared run state.
pub type AdapterFactory = Box<dyn Fn(Arc<ManagerShared>) -> Arc<dyn Adapter> + Send + Sync>;

/// The record an external collaborator assembles and hands to the Manager at
/// construction: the observer/adapter factories, the session registry, and
/// the settings bundle.
pub struct PipelineContext {
    pub settings: Arc<Settings>,
    pub sessions: SessionRegistry,
    pub observer_factories: Vec<ObserverFactory>,
    pub adapter_factories: Vec<AdapterFactory>,
}

/// Aggregate counts returned at the end of a run, logged at INFO.
#[derive(Debug, Clone, Copy, Default)]
pub struct Summary {
    pub observed: usize,
    pub not_observed: usize,
    pub exported: usize,
}

pub struct Manager {
    shared: Arc<ManagerShared>,
    observe_rx: Queue<dyn Observation>,
    adapt_rx: Queue<dyn Finding>,
    export_rx: Queue<dyn Exporter>,
    observers: Vec<Box<dyn Observer>>,
    adapters: Arc<Vec<Arc<dyn Adapter>>>,
}

impl Manager {
    pub fn new(context: PipelineContext) -> Self {
        let (observe_tx, observe_rx) = mpsc::unbounded_channel();
        let (adapt_tx, adapt_rx) = mpsc::unbounded_channel();
        let (export_tx, export_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(ManagerShared::new(
            context.settings,
            context.sessions,
            observe_tx,
            adapt_tx,
            export_tx,
        ));

        let observers: Vec<Box<dyn Observer>> = context
            .observer_factories
            .iter()
            .map(|factory| factory(shared.clone()))
            .collect();

        let mut adapters: Vec<Arc<dyn Adapter>> = context
            .adapter_factories
            .iter()
            .map(|factory| factory(shared.clone()))
            .collect();
        sort_by_priority(&mut adapters);

        Self {
            shared,
            observe_rx: Arc::new(Mutex::new(observe_rx)),
            adapt_rx: Arc::new(Mutex::new(adapt_rx)),
            export_rx: Arc::new(Mutex::new(export_rx)),
            observers,
            adapters: Arc::new(adapters),
        }
    }

    /// Runs the pipeline to quiescence and returns the aggregate counts.
    pub async fn run_observe(&mut self) -> Result<Summary> {
        self.seed_initial_observations();

        let concurrency = self.shared.settings.concurrency.clone();
        let mut handles = Vec::new();

        for _ in 0..concurrency.observers {
            handles.push(tokio::spawn(observe_worker(
                self.shared.clone(),
                self.observe_rx.clone(),
            )));
        }
        for _ in 0..concurrency.adapters {
            handles.push(tokio::spawn(adapt_worker(
                self.shared.clone(),
                self.adapt_rx.clone(),
                self.adapters.clone(),
            )));
        }
        for _ in 0..concurrency.exporters {
            handles.push(tokio::spawn(export_worker(
                self.shared.clone(),
                self.export_rx.clone(),
            )));
        }

        self.shared.pending.wait_for_zero().await;

        for _ in 0..concurrency.observers {
            self.shared.send_observe_sentinel();
        }
        for _ in 0..concurrency.adapters {
            self.shared.send_adapt_sentinel();
        }
        for _ in 0..concurrency.exporters {
            self.shared.send_export_sentinel();
        }

        let mut join_err = None;
        for handle in handles {
            if let Err(err) = handle.await {
                join_err.get_or_insert(err);
            }
        }

        self.shared.sessions.release_all().await;

        if let Some(err) = join_err {
            return Err(err.into());
        }

        let summary = Summary {
            observed: self.shared.observed.len(),
            not_observed: self.shared.not_observed.len(),
            exported: self.shared.exported.len(),
        };
        info!(
            observed = summary.observed,
            not_observed = summary.not_observed,
            exported = summary.exported,
            "pipeline run complete"
        );
        Ok(summary)
    }

    fn seed_initial_observations(&self) {
        for observer in &self.observers {
            for obs in observer.initial_observations() {
                route(Item::Observation(obs), ItemSource::FromObserver, &self.shared);
            }
        }
    }
}

async fn observe_worker(shared: Arc<ManagerShared>, rx: Queue<dyn Observation>) {
    let ctx = shared.run_context();
    loop {
        let next = {
            let mut guard = rx.lock().await;
            guard.recv().await
        };
        let obs = match next.flatten() {
            Some(obs) => obs,
            None => break,
        };

        let delay = shared.settings.observation.delay;
        if delay > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(delay)).await;
        }

        let hash = obs.hash();
        match obs.observe(&ctx).await {
            Ok(ObserveOutcome::None) => {
                shared.not_observed.insert(hash);
            }
            Ok(ObserveOutcome::Items(mut stream)) => {
                shared.observed.insert(hash);
                while let Some(item) = stream.next().await {
                    route(item, ItemSource::FromObserver, &shared);
                }
            }
            Err(err) => {
                warn!(error = %err, "observation callback failed");
                shared.not_observed.insert(hash);
            }
        }
        shared.pending.decrement();
    }
}

async fn adapt_worker(
    shared: Arc<ManagerShared>,
    rx: Queue<dyn Finding>,
    adapters: Arc<Vec<Arc<dyn Adapter>>>,
) {
    loop {
        let next = {
            let mut guard = rx.lock().await;
            guard.recv().await
        };
        let finding = match next.flatten() {
            Some(finding) => finding,
            None => break,
        };

        // Adapters run in priority order, one after another, not concurrently.
        for adapter in adapters.iter() {
            if adapter.subscribers().contains(&finding.tag()) {
                for item in adapter.adapt(finding.as_ref()).await {
                    route(item, ItemSource::FromAdapter, &shared);
                }
            }
        }
        shared.pending.decrement();
    }
}

async fn export_worker(shared: Arc<ManagerShared>, rx: Queue<dyn Exporter>) {
    loop {
        let next = {
            let mut guard = rx.lock().await;
            guard.recv().await
        };
        let exporter = match next.flatten() {
            Some(exporter) => exporter,
            None => break,
        };

        match shared.sessions.get(exporter.name()) {
            None => {
                error!(sink = exporter.name(), "exporter references unknown session, dropping");
            }
            Some(session) => match exporter.export(session.as_ref()).await {
                Ok(()) => {
                    shared.exported.insert(exporter.identity());
                }
                Err(err) => {
                    error!(sink = exporter.name(), error = %err, "exporter failed");
                }
            },
        }
        shared.pending.decrement();
    }
}
