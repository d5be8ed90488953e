//! Declarative macros for ergonomic effect construction

/// Create an `Effect::Cancellation` for identities of mixed types
///
/// Every argument goes through `EffectId::from`, so plain strings and
/// integers work directly; wrap application types with `EffectId::new`.
///
/// # Example
///
/// ```rust
/// use statefx_core::cancel_effects;
/// use statefx_core::effect::{Effect, EffectId};
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// struct PollId;
///
/// let effect: Effect<(), ()> = cancel_effects!["search", 42_u64, EffectId::new(PollId)];
/// let ids = effect.as_cancellation().map(|c| c.ids().to_vec()).unwrap_or_default();
/// assert_eq!(ids, vec![EffectId::from("search"), EffectId::from(42_u64), EffectId::new(PollId)]);
/// ```
#[macro_export]
macro_rules! cancel_effects {
    ($($id:expr),* $(,)?) => {{
        let ids: ::std::vec::Vec<$crate::effect::EffectId> =
            ::std::vec![$($crate::effect::EffectId::from($id)),*];
        $crate::effect::Effect::cancel_all(ids)
    }};
}

#[cfg(test)]
mod tests {
    use crate::effect::{Effect, EffectId};

    #[test]
    fn cancel_effects_collects_ids_in_order() {
        let effect: Effect<(), ()> = cancel_effects!["a", 1_u32, String::from("b")];
        let ids = effect.as_cancellation().map(|c| c.ids().to_vec()).unwrap_or_default();
        assert_eq!(
            ids,
            vec![EffectId::from("a"), EffectId::from(1_u32), EffectId::from("b".to_string())]
        );
    }

    #[test]
    fn empty_cancellation_is_allowed() {
        let effect: Effect<(), ()> = cancel_effects![];
        assert!(effect.as_cancellation().is_some_and(|c| c.ids().is_empty()));
    }
}
