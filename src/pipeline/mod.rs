//! The pipeline runtime: the Manager, the Item Router, and the
//! shared run state they both operate on.

pub mod manager;
pub mod router;
pub mod shared;

pub use manager::{AdapterFactory, Manager, ObserverFactory, PipelineContext, Summary};
pub use shared::ManagerShared;
