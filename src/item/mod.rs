//! The Item Model: the three tagged variants that flow through the
//! pipeline. Observers and adapters both produce `Item`s; the router
//! decides which queue each one lands on.

pub mod exporter;
pub mod finding;
pub mod observation;

pub use exporter::Exporter;
pub use finding::{Finding, FindingTag};
pub use observation::Observation;

/// A single unit produced by an observer callback or an adapter. The router
/// is the only code that inspects this enum; everywhere else the pipeline
/// works with the trait objects directly.
pub enum Item {
    Observation(Box<dyn Observation>),
    Finding(Box<dyn Finding>),
    Exporter(Box<dyn Exporter>),
}

impl Item {
    pub fn observation(obs: impl Observation + 'static) -> Self {
        Item::Observation(Box::new(obs))
    }

    pub fn finding(finding: impl Finding + 'static) -> Self {
        Item::Finding(Box::new(finding))
    }

    pub fn exporter(exporter: impl Exporter + 'static) -> Self {
        Item::Exporter(Box::new(exporter))
    }
}

/// Explicit caller provenance for a routed item: a Finding produced by an
/// adapter may never cascade back through the adapter stage, and the router
/// needs to know who produced an item to enforce that without inspecting
/// the call stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemSource {
    FromObserver,
    FromAdapter,
}
