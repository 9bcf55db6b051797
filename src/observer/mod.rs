//! Observer: defines the seed list the manager routes at startup.
//! Observers hold a back-reference to the shared manager state so they can
//! read sessions/settings while building their `initial_observations`, but
//! they never mutate it directly.

use crate::item::Observation;

pub trait Observer: Send + Sync {
    /// Stable name, used in logs and for label-based selection upstream;
    /// selection itself is an external collaborator's concern.
    fn name(&self) -> &str;

    fn labels(&self) -> &[String] {
        &[]
    }

    /// Populated synchronously so the manager can seed the observe-queue in
    /// one shot at startup.
    fn initial_observations(&self) -> Vec<Box<dyn Observation>>;
}
