//! The Item Router: decides which queue a produced item goes on, and
//! applies the de-duplication gate.

use tracing::warn;

use crate::item::{Item, ItemSource};
use crate::pipeline::shared::ManagerShared;

/// Routes one item. `source` tells the router who produced it — an explicit
/// parameter rather than something inferred from the call stack, so a
/// Finding an adapter tries to yield is rejected without any stack walking.
///
/// The allow-list check runs before the atomic `seen` check-and-insert: a
/// disallowed observation never touches `seen`, and the insertion itself is
/// both the membership check and the commit to enqueue, so there is no
/// separate contains-then-insert race window.
pub fn route(item: Item, source: ItemSource, shared: &ManagerShared) {
    match item {
        Item::Exporter(exporter) => {
            shared.pending.increment();
            shared.send_exporter(exporter);
        }
        Item::Finding(finding) => {
            if source == ItemSource::FromAdapter {
                warn!(tag = %finding.tag(), "adapter yielded a finding, findings may not cascade through adapters");
                return;
            }
            shared.pending.increment();
            shared.send_finding(finding);
        }
        Item::Observation(obs) => {
            let allowed = obs.allowed();
            if !allowed.is_empty() && !allowed.iter().any(|prefix| obs.url().starts_with(prefix.as_str())) {
                warn!(url = %obs.url(), "observation url not in allow-list, dropping");
                return;
            }
            if !shared.seen.insert(obs.hash()) {
                return;
            }
            shared.pending.increment();
            shared.send_observation(obs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::item::observation::HttpObservation;
    use crate::session::SessionRegistry;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn test_settings() -> Arc<Settings> {
        Arc::new(
            Settings::from_yaml_str(
                r#"
concurrency:
  observers: 1
  adapters: 1
  exporters: 1
observation:
  delay: 0
"#,
            )
            .unwrap(),
        )
    }

    fn test_shared() -> ManagerShared {
        let (otx, _orx) = mpsc::unbounded_channel();
        let (atx, _arx) = mpsc::unbounded_channel();
        let (etx, _erx) = mpsc::unbounded_channel();
        ManagerShared::new(test_settings(), SessionRegistry::default(), otx, atx, etx)
    }

    #[test]
    fn duplicate_observation_is_dropped_without_incrementing_pending() {
        let shared = test_shared();
        let obs = || {
            Box::new(HttpObservation::new("https://example.test/", |_| {
                Box::pin(futures::stream::empty())
            })) as Box<dyn crate::item::Observation>
        };
        route(Item::Observation(obs()), ItemSource::FromObserver, &shared);
        route(Item::Observation(obs()), ItemSource::FromObserver, &shared);
        assert_eq!(shared.seen.len(), 1);
    }

    #[test]
    fn disallowed_url_never_touches_seen() {
        let shared = test_shared();
        let obs = HttpObservation::new("https://other.test/", |_| Box::pin(futures::stream::empty()))
            .with_allowed(vec!["https://example.test/".to_string()]);
        route(Item::Observation(Box::new(obs)), ItemSource::FromObserver, &shared);
        assert!(shared.seen.is_empty());
    }

    #[test]
    fn finding_from_adapter_is_rejected() {
        use crate::item::{Finding, FindingTag};
        use std::any::Any;

        #[derive(Debug)]
        struct F;
        impl Finding for F {
            fn tag(&self) -> FindingTag {
                "f"
            }
            fn as_any(&self) -> &dyn Any {
                self
            }
        }

        let shared = test_shared();
        route(Item::Finding(Box::new(F)), ItemSource::FromAdapter, &shared);
        assert_eq!(shared.pending.count(), 0);
    }
}
