use std::any::Any;
use std::fmt::Debug;

/// Stable tag identifying a concrete Finding kind, used for adapter
/// subscription matching: membership in an adapter's `subscribers()` list,
/// not an inheritance check.
pub type FindingTag = &'static str;

/// An immutable domain record emitted by an observer's callback.
/// Value semantics; no identity beyond content. `as_any` enables adapters to
/// downcast to the concrete Finding type they subscribed to.
pub trait Finding: Debug + Send + Sync {
    fn tag(&self) -> FindingTag;
    fn as_any(&self) -> &dyn Any;
}
