//! Effect descriptions returned by reducers.
//!
//! An [`Effect`] is either an [`Execution`] (an async unit of work, optionally
//! keyed by an [`EffectId`]) or a [`Cancellation`] of previously launched
//! executions. Effects are values: nothing runs until the runtime's scheduler
//! receives them.
//!
//! # Example
//!
//! ```
//! use statefx_core::effect::{Effect, EffectId};
//!
//! #[derive(Debug)]
//! enum Action {
//!     Tick,
//! }
//!
//! let poll: Effect<(), Action> = Effect::execution_with_id("poll", |fx| async move {
//!     fx.dispatch(Action::Tick)?;
//!     Ok(())
//! });
//! assert_eq!(poll.id(), Some(&EffectId::from("poll")));
//!
//! let stop: Effect<(), Action> = Effect::cancel("poll");
//! assert!(stop.is_cancellation());
//! ```

use crate::error::StoreError;
use futures::future::{BoxFuture, FutureExt};
use std::any::{Any, TypeId};
use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Object-safe view of an identity value.
trait Identity: Any + Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn dyn_eq(&self, other: &dyn Identity) -> bool;
    fn dyn_hash(&self, state: &mut dyn Hasher);
}

impl<T> Identity for T
where
    T: Any + Hash + Eq + fmt::Debug + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn Identity) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| other == self)
    }

    fn dyn_hash(&self, state: &mut dyn Hasher) {
        let mut state = state;
        TypeId::of::<T>().hash(&mut state);
        self.hash(&mut state);
    }
}

/// Identity of an [`Execution`], used as a dedup and cancellation key.
///
/// Wraps any `Hash + Eq + Debug` value. Two ids are equal only when they wrap
/// the same type and the wrapped values compare equal, so `EffectId::new(1_u32)`
/// and `EffectId::new(1_u64)` are distinct.
#[derive(Clone)]
pub struct EffectId(Arc<dyn Identity>);

impl EffectId {
    /// Wrap an application value as an effect identity
    pub fn new<T>(value: T) -> Self
    where
        T: Hash + Eq + fmt::Debug + Send + Sync + 'static,
    {
        Self(Arc::new(value))
    }

    /// Borrow the wrapped value if it has type `T`
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }
}

impl PartialEq for EffectId {
    fn eq(&self, other: &Self) -> bool {
        self.0.dyn_eq(&*other.0)
    }
}

impl Eq for EffectId {}

impl Hash for EffectId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.dyn_hash(state);
    }
}

impl fmt::Debug for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

macro_rules! effect_id_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for EffectId {
                fn from(value: $ty) -> Self {
                    Self::new(value)
                }
            }
        )*
    };
}

effect_id_from!(&'static str, String, char, u32, u64, usize, i32, i64);

/// Destination for actions produced by running effects.
///
/// Implemented by the runtime's stores; closures qualify as well, which is
/// handy for driving an effect body in isolation.
pub trait Dispatcher<A>: Send + Sync {
    /// Feed `action` back into the owning store
    ///
    /// # Errors
    ///
    /// Returns the store's error when the action cannot be reduced or the
    /// store is gone.
    fn dispatch(&self, action: A) -> Result<(), StoreError>;
}

impl<A, F> Dispatcher<A> for F
where
    F: Fn(A) -> Result<(), StoreError> + Send + Sync,
{
    fn dispatch(&self, action: A) -> Result<(), StoreError> {
        self(action)
    }
}

/// Everything an effect body can reach: the environment and a way back into
/// the store.
pub struct EffectContext<E, A> {
    environment: Arc<E>,
    dispatcher: Arc<dyn Dispatcher<A>>,
}

impl<E, A> EffectContext<E, A> {
    /// Create a context over a shared environment and a dispatcher
    #[must_use]
    pub fn new(environment: Arc<E>, dispatcher: Arc<dyn Dispatcher<A>>) -> Self {
        Self {
            environment,
            dispatcher,
        }
    }

    /// The store's environment
    #[must_use]
    pub fn environment(&self) -> &E {
        &self.environment
    }

    /// Dispatch an action into the store that launched this effect.
    ///
    /// Runs the reducer synchronously, exactly like an external dispatch.
    ///
    /// # Errors
    ///
    /// Propagates the store's dispatch error, e.g. [`StoreError::Reduce`] or
    /// [`StoreError::StoreDropped`].
    pub fn dispatch(&self, action: A) -> Result<(), StoreError> {
        self.dispatcher.dispatch(action)
    }
}

impl<E, A> Clone for EffectContext<E, A> {
    fn clone(&self) -> Self {
        Self {
            environment: Arc::clone(&self.environment),
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }
}

impl<E: fmt::Debug, A> fmt::Debug for EffectContext<E, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectContext")
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

/// Boxed body of an [`Execution`]
pub type EffectBody<E, A> =
    Box<dyn FnOnce(EffectContext<E, A>) -> BoxFuture<'static, anyhow::Result<()>> + Send>;

/// An async unit of work.
///
/// When `id` is set, at most one execution with that id runs at a time: a
/// second one scheduled while the first is still running is skipped.
pub struct Execution<E, A> {
    id: Option<EffectId>,
    body: EffectBody<E, A>,
}

impl<E, A> Execution<E, A> {
    /// Identity of this execution, if any
    #[must_use]
    pub const fn id(&self) -> Option<&EffectId> {
        self.id.as_ref()
    }

    /// Split into identity and body
    #[must_use]
    pub fn into_parts(self) -> (Option<EffectId>, EffectBody<E, A>) {
        (self.id, self.body)
    }

    /// Start the body with the given context
    pub fn run(self, context: EffectContext<E, A>) -> BoxFuture<'static, anyhow::Result<()>> {
        (self.body)(context)
    }
}

impl<E, A> fmt::Debug for Execution<E, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Execution")
            .field("id", &self.id)
            .field("body", &"<async fn>")
            .finish()
    }
}

/// Request to stop running executions by identity.
///
/// Ids that are not running are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cancellation {
    ids: Vec<EffectId>,
}

impl Cancellation {
    /// Identities to cancel, in order
    #[must_use]
    pub fn ids(&self) -> &[EffectId] {
        &self.ids
    }

    /// Take the identities
    #[must_use]
    pub fn into_ids(self) -> Vec<EffectId> {
        self.ids
    }
}

/// Effect type - describes a side effect to be executed
///
/// Effects are NOT executed immediately. They are descriptions returned from
/// reducers (or expansion functions) and handed to the Store's scheduler in
/// the order they were produced.
///
/// # Type Parameters
///
/// - `E`: The environment available to execution bodies
/// - `A`: The action type execution bodies can dispatch (feedback loop)
pub enum Effect<E, A> {
    /// Launch an async body
    Execution(Execution<E, A>),

    /// Stop running executions
    Cancellation(Cancellation),
}

impl<E, A> fmt::Debug for Effect<E, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Execution(execution) => fmt::Debug::fmt(execution, f),
            Self::Cancellation(cancellation) => fmt::Debug::fmt(cancellation, f),
        }
    }
}

impl<E, A> Effect<E, A>
where
    E: Send + Sync + 'static,
    A: Send + 'static,
{
    /// An anonymous execution; never deduplicated and not cancellable by id
    pub fn execution<F, Fut>(body: F) -> Self
    where
        F: FnOnce(EffectContext<E, A>) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::Execution(Execution {
            id: None,
            body: Box::new(move |context| body(context).boxed()),
        })
    }

    /// An execution keyed by `id`
    pub fn execution_with_id<F, Fut>(id: impl Into<EffectId>, body: F) -> Self
    where
        F: FnOnce(EffectContext<E, A>) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::Execution(Execution {
            id: Some(id.into()),
            body: Box::new(move |context| body(context).boxed()),
        })
    }
}

impl<E, A> Effect<E, A> {
    /// Cancel a single identity
    pub fn cancel(id: impl Into<EffectId>) -> Self {
        Self::Cancellation(Cancellation {
            ids: vec![id.into()],
        })
    }

    /// Cancel several identities at once
    pub fn cancel_all<I>(ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<EffectId>,
    {
        Self::Cancellation(Cancellation {
            ids: ids.into_iter().map(Into::into).collect(),
        })
    }

    /// Identity of an execution; `None` for anonymous executions and
    /// cancellations
    #[must_use]
    pub const fn id(&self) -> Option<&EffectId> {
        match self {
            Self::Execution(execution) => execution.id(),
            Self::Cancellation(_) => None,
        }
    }

    /// Whether this is an [`Effect::Execution`]
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Whether this is an [`Effect::Cancellation`]
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancellation(_))
    }

    /// Borrow the cancellation, if this is one
    #[must_use]
    pub const fn as_cancellation(&self) -> Option<&Cancellation> {
        match self {
            Self::Cancellation(cancellation) => Some(cancellation),
            Self::Execution(_) => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum SearchId {
        Query,
    }

    #[test]
    fn effect_ids_compare_by_type_and_value() {
        assert_eq!(EffectId::from("search"), EffectId::from("search"));
        assert_ne!(EffectId::from("search"), EffectId::from("login"));
        assert_ne!(EffectId::new(1_u32), EffectId::new(1_u64));
        assert_eq!(EffectId::new(SearchId::Query), EffectId::new(SearchId::Query));
        assert_eq!(EffectId::from("query".to_string()), EffectId::from("query".to_string()));
    }

    #[test]
    fn effect_ids_hash_consistently() {
        let mut ids = HashSet::new();
        ids.insert(EffectId::from("a"));
        ids.insert(EffectId::from("a"));
        ids.insert(EffectId::new(SearchId::Query));
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&EffectId::new(SearchId::Query)));
    }

    #[test]
    fn effect_id_downcasts_to_wrapped_value() {
        let id = EffectId::new(SearchId::Query);
        assert_eq!(id.downcast_ref::<SearchId>(), Some(&SearchId::Query));
        assert!(id.downcast_ref::<&str>().is_none());
        assert_eq!(format!("{id:?}"), "Query");
    }

    #[test]
    fn execution_constructors_set_identity() {
        let anonymous: Effect<(), ()> = Effect::execution(|_| async { Ok(()) });
        let keyed: Effect<(), ()> = Effect::execution_with_id(7_u32, |_| async { Ok(()) });

        assert!(anonymous.is_execution());
        assert!(anonymous.id().is_none());
        assert_eq!(keyed.id(), Some(&EffectId::new(7_u32)));
    }

    #[test]
    fn cancellation_constructors_keep_order() {
        let single: Effect<(), ()> = Effect::cancel(1_i32);
        let many: Effect<(), ()> = Effect::cancel_all([2_i32, 3]);

        assert_eq!(single.as_cancellation().unwrap().ids(), &[EffectId::new(1_i32)]);
        assert_eq!(
            many.as_cancellation().unwrap().ids(),
            &[EffectId::new(2_i32), EffectId::new(3_i32)]
        );
        assert!(single.id().is_none());
    }

    #[test]
    fn execution_body_receives_environment_and_dispatcher() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        let dispatcher: Arc<dyn Dispatcher<i32>> = Arc::new(move |action: i32| {
            sink.lock().unwrap().push(action);
            Ok::<_, StoreError>(())
        });

        let effect: Effect<i32, i32> = Effect::execution(|fx| async move {
            let value = *fx.environment();
            fx.dispatch(value * 2)?;
            Ok(())
        });
        let Effect::Execution(execution) = effect else {
            panic!("expected an execution");
        };

        let result = tokio_test::block_on(execution.run(EffectContext::new(Arc::new(21), dispatcher)));
        tokio_test::assert_ok!(result);
        assert_eq!(*received.lock().unwrap(), vec![42]);
    }
}
