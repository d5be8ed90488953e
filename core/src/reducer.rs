//! Reducer module - The core trait for business logic
//!
//! Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
//! The new state is returned as a value; effects are collected on the
//! [`Context`] passed alongside, which doubles as read access to the
//! environment.

use crate::effect::{Effect, EffectContext, EffectId};
use crate::error::ReduceError;
use smallvec::SmallVec;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;

/// Effects accumulated during one reduction
pub type Effects<E, A> = SmallVec<[Effect<E, A>; 4]>;

/// Side accumulator handed to reducers and expansion functions.
///
/// Effects are scheduled in the order they are added, after the new state has
/// been published.
pub struct Context<'a, E, A> {
    environment: &'a E,
    effects: Effects<E, A>,
}

/// The context an expansion function runs in; identical to a reducer's
pub type ExpandContext<'a, E, A> = Context<'a, E, A>;

impl<'a, E, A> Context<'a, E, A> {
    /// Create an empty context over `environment`
    #[must_use]
    pub fn new(environment: &'a E) -> Self {
        Self {
            environment,
            effects: SmallVec::new(),
        }
    }

    /// The environment
    #[must_use]
    pub const fn environment(&self) -> &'a E {
        self.environment
    }

    /// Queue an effect
    pub fn add(&mut self, effect: Effect<E, A>) {
        self.effects.push(effect);
    }

    /// Queue a cancellation of `id`
    pub fn cancel_effect(&mut self, id: impl Into<EffectId>) {
        self.add(Effect::cancel(id));
    }

    /// Queue a cancellation of every id in `ids`
    pub fn cancel_effects<I>(&mut self, ids: I)
    where
        I: IntoIterator,
        I::Item: Into<EffectId>,
    {
        self.add(Effect::cancel_all(ids));
    }

    /// Effects queued so far
    #[must_use]
    pub fn effects(&self) -> &[Effect<E, A>] {
        &self.effects
    }

    /// Consume the context, yielding its effects in order
    #[must_use]
    pub fn into_effects(self) -> Effects<E, A> {
        self.effects
    }
}

impl<E, A> Context<'_, E, A>
where
    E: Send + Sync + 'static,
    A: Send + 'static,
{
    /// Queue an anonymous execution
    pub fn effect<F, Fut>(&mut self, body: F)
    where
        F: FnOnce(EffectContext<E, A>) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.add(Effect::execution(body));
    }

    /// Queue an execution keyed by `id`
    pub fn effect_with_id<F, Fut>(&mut self, id: impl Into<EffectId>, body: F)
    where
        F: FnOnce(EffectContext<E, A>) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.add(Effect::execution_with_id(id, body));
    }
}

impl<E, A> fmt::Debug for Context<'_, E, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("effects", &self.effects.len())
            .finish_non_exhaustive()
    }
}

/// The Reducer trait - core abstraction for business logic
///
/// # Type Parameters
///
/// - `State`: The domain state this reducer operates on
/// - `Action`: The action type this reducer processes
/// - `Environment`: The injected dependencies this reducer needs
///
/// # Example
///
/// ```
/// use statefx_core::reducer::{Context, Reducer};
/// use statefx_core::error::ReduceError;
///
/// struct CounterReducer;
///
/// impl Reducer for CounterReducer {
///     type State = i64;
///     type Action = i64;
///     type Environment = ();
///
///     fn reduce(
///         &self,
///         state: &i64,
///         action: i64,
///         _ctx: &mut Context<'_, (), i64>,
///     ) -> Result<i64, ReduceError> {
///         Ok(state + action)
///     }
/// }
///
/// let mut ctx = Context::new(&());
/// assert_eq!(CounterReducer.reduce(&40, 2, &mut ctx).ok(), Some(42));
/// ```
pub trait Reducer {
    /// The state type this reducer operates on
    type State;

    /// The action type this reducer processes
    type Action;

    /// The environment type with injected dependencies
    type Environment;

    /// Reduce an action into a new state
    ///
    /// Must be deterministic: no I/O, no suspension. Side work is described
    /// by adding effects to `ctx`.
    ///
    /// # Errors
    ///
    /// Returning an error fails the dispatch call. The store keeps the
    /// previous state and discards the effects queued on `ctx`.
    fn reduce(
        &self,
        state: &Self::State,
        action: Self::Action,
        ctx: &mut Context<'_, Self::Environment, Self::Action>,
    ) -> Result<Self::State, ReduceError>;

    /// Effect scheduled once when a store is built around this reducer,
    /// before any dispatched action
    fn initial_effect(&self) -> Option<Effect<Self::Environment, Self::Action>> {
        None
    }
}

type InitialEffect<E, A> = Box<dyn Fn() -> Effect<E, A> + Send + Sync>;

/// A [`Reducer`] backed by a closure.
///
/// Created by [`reducer_fn`].
pub struct FnReducer<S, A, E, F> {
    reduce: F,
    initial_effect: Option<InitialEffect<E, A>>,
    _phantom: PhantomData<fn(&S, A, &E) -> S>,
}

/// Build a reducer from a closure.
///
/// ```
/// use statefx_core::reducer::{reducer_fn, Context, Reducer};
///
/// let reducer = reducer_fn(|state: &i32, action: i32, _ctx: &mut Context<'_, (), i32>| {
///     Ok(state + action)
/// });
///
/// let mut ctx = Context::new(&());
/// assert_eq!(reducer.reduce(&1, 2, &mut ctx).ok(), Some(3));
/// ```
pub fn reducer_fn<S, A, E, F>(reduce: F) -> FnReducer<S, A, E, F>
where
    F: Fn(&S, A, &mut Context<'_, E, A>) -> Result<S, ReduceError>,
{
    FnReducer {
        reduce,
        initial_effect: None,
        _phantom: PhantomData,
    }
}

impl<S, A, E, F> FnReducer<S, A, E, F> {
    /// Declare the effect to schedule when a store is built.
    ///
    /// Effects are single-use, so a factory is stored and invoked once per
    /// store.
    #[must_use]
    pub fn with_initial_effect<G>(mut self, effect: G) -> Self
    where
        G: Fn() -> Effect<E, A> + Send + Sync + 'static,
    {
        self.initial_effect = Some(Box::new(effect));
        self
    }
}

impl<S, A, E, F> Reducer for FnReducer<S, A, E, F>
where
    F: Fn(&S, A, &mut Context<'_, E, A>) -> Result<S, ReduceError>,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(
        &self,
        state: &S,
        action: A,
        ctx: &mut Context<'_, E, A>,
    ) -> Result<S, ReduceError> {
        (self.reduce)(state, action, ctx)
    }

    fn initial_effect(&self) -> Option<Effect<E, A>> {
        self.initial_effect.as_ref().map(|factory| factory())
    }
}

impl<S, A, E, F> fmt::Debug for FnReducer<S, A, E, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnReducer")
            .field("has_initial_effect", &self.initial_effect.is_some())
            .finish_non_exhaustive()
    }
}

/// A reducer that never changes state and never produces effects
pub struct EmptyReducer<S, A, E> {
    _phantom: PhantomData<fn(&S, A, &E) -> S>,
}

impl<S, A, E> EmptyReducer<S, A, E> {
    /// Create an empty reducer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<S, A, E> Default for EmptyReducer<S, A, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, A, E> fmt::Debug for EmptyReducer<S, A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EmptyReducer")
    }
}

impl<S: Clone, A, E> Reducer for EmptyReducer<S, A, E> {
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(&self, state: &S, _action: A, _ctx: &mut Context<'_, E, A>) -> Result<S, ReduceError> {
        Ok(state.clone())
    }
}
