//! Adapter set: transforms that map a Finding to zero or more
//! downstream Observations or Exporters. Adapters never yield Findings; the
//! router rejects any that try to.

use async_trait::async_trait;

use crate::item::{Finding, FindingTag, Item};

#[async_trait]
pub trait Adapter: Send + Sync {
    /// Total order among adapters is descending priority, ties broken by
    /// discovery order (stable sort).
    fn priority(&self) -> i64 {
        0
    }

    /// Finding tags this adapter is invoked for; matching is tag-membership,
    /// not an inheritance check.
    fn subscribers(&self) -> &[FindingTag];

    async fn adapt(&self, finding: &dyn Finding) -> Vec<Item>;
}

/// Stable sort by descending priority; ties preserve discovery (input) order.
pub fn sort_by_priority(adapters: &mut [std::sync::Arc<dyn Adapter>]) {
    adapters.sort_by(|a, b| b.priority().cmp(&a.priority()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Debug)]
    struct NamedAdapter {
        name: &'static str,
        priority: i64,
    }

    #[async_trait]
    impl Adapter for NamedAdapter {
        fn priority(&self) -> i64 {
            self.priority
        }

        fn subscribers(&self) -> &[FindingTag] {
            &["page"]
        }

        async fn adapt(&self, _finding: &dyn Finding) -> Vec<Item> {
            Vec::new()
        }
    }

    #[test]
    fn sort_is_stable_and_descending() {
        let mut adapters: Vec<Arc<dyn Adapter>> = vec![
            Arc::new(NamedAdapter { name: "low", priority: 1 }),
            Arc::new(NamedAdapter { name: "high-a", priority: 10 }),
            Arc::new(NamedAdapter { name: "high-b", priority: 10 }),
        ];
        sort_by_priority(&mut adapters);
        assert_eq!(adapters[0].priority(), 10);
        assert_eq!(adapters[1].priority(), 10);
        assert_eq!(adapters[2].priority(), 1);
    }
}
