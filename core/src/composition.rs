//! Reducer composition utilities
//!
//! This module provides utilities for composing reducers synchronously:
//! - **`combine_reducers`**: Run multiple reducers on the same state/action
//! - **`scope_reducer`**: Focus a reducer on a subset of state
//! - **`scope_action`** / [`scope_action!`](crate::scope_action): Unwrap a
//!   child action from the parent action that carries it
//!
//! Both produce a single reducer, so the composed logic still runs inside one
//! store with one scheduler. Independently running member stores are composed
//! by the runtime's delegating store instead.
//!
//! # Examples
//!
//! ```
//! use statefx_core::composition::combine_reducers;
//! use statefx_core::reducer::{reducer_fn, Context, Reducer};
//!
//! let add = reducer_fn(|s: &i32, a: i32, _ctx: &mut Context<'_, (), i32>| Ok(s + a));
//! let double = reducer_fn(|s: &i32, _a: i32, _ctx: &mut Context<'_, (), i32>| Ok(s * 2));
//!
//! let combined = combine_reducers(vec![Box::new(add), Box::new(double)]);
//! let mut ctx = Context::new(&());
//! assert_eq!(combined.reduce(&1, 2, &mut ctx).ok(), Some(6));
//! ```

use crate::effect::Effect;
use crate::error::ReduceError;
use crate::reducer::{Context, Reducer};
use std::marker::PhantomData;

/// Boxed reducer accepted by [`combine_reducers`]
pub type BoxedReducer<S, A, E> = Box<dyn Reducer<State = S, Action = A, Environment = E> + Send + Sync>;

/// Combines multiple reducers that operate on the same state and action types.
///
/// Reducers run in order, each one seeing the state produced by the previous
/// one, and all effects land on the same context in that order. The first
/// failing reducer aborts the whole reduction.
#[must_use]
pub fn combine_reducers<S, A, E>(reducers: Vec<BoxedReducer<S, A, E>>) -> CombinedReducer<S, A, E>
where
    S: Clone,
    A: Clone,
{
    CombinedReducer { reducers }
}

/// A combined reducer that runs multiple reducers in sequence.
///
/// Created by [`combine_reducers`].
pub struct CombinedReducer<S, A, E> {
    reducers: Vec<BoxedReducer<S, A, E>>,
}

impl<S, A, E> Reducer for CombinedReducer<S, A, E>
where
    S: Clone,
    A: Clone,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(&self, state: &S, action: A, ctx: &mut Context<'_, E, A>) -> Result<S, ReduceError> {
        let mut current = state.clone();

        for reducer in &self.reducers {
            current = reducer.reduce(&current, action.clone(), ctx)?;
        }

        Ok(current)
    }

    /// The initial effect of the first member that declares one
    fn initial_effect(&self) -> Option<Effect<E, A>> {
        self.reducers.iter().find_map(|reducer| reducer.initial_effect())
    }
}

/// Scopes a reducer to operate on a subset of a larger state.
///
/// `get_state` borrows the child state out of the parent; `set_state` builds
/// the new parent from the old one and the reduced child.
///
/// # Examples
///
/// ```
/// use statefx_core::composition::scope_reducer;
/// use statefx_core::reducer::{reducer_fn, Context, Reducer};
///
/// #[derive(Clone, Debug, Default, PartialEq)]
/// struct AppState {
///     counter: i32,
///     title: String,
/// }
///
/// let counter = reducer_fn(|s: &i32, a: i32, _ctx: &mut Context<'_, (), i32>| Ok(s + a));
/// let scoped = scope_reducer(
///     counter,
///     |app: &AppState| &app.counter,
///     |app: &AppState, counter| AppState { counter, ..app.clone() },
/// );
///
/// let mut ctx = Context::new(&());
/// let state = AppState { counter: 1, title: "hi".into() };
/// let next = scoped.reduce(&state, 2, &mut ctx).ok();
/// assert_eq!(next, Some(AppState { counter: 3, title: "hi".into() }));
/// ```
pub fn scope_reducer<S, SubS, A, E, R>(
    reducer: R,
    get_state: fn(&S) -> &SubS,
    set_state: fn(&S, SubS) -> S,
) -> ScopedReducer<S, SubS, A, E, R>
where
    R: Reducer<State = SubS, Action = A, Environment = E>,
{
    ScopedReducer {
        reducer,
        get_state,
        set_state,
        _phantom: PhantomData,
    }
}

/// A scoped reducer that operates on a subset of state.
///
/// Created by [`scope_reducer`].
pub struct ScopedReducer<S, SubS, A, E, R>
where
    R: Reducer<State = SubS, Action = A, Environment = E>,
{
    reducer: R,
    get_state: fn(&S) -> &SubS,
    set_state: fn(&S, SubS) -> S,
    _phantom: PhantomData<fn(A, &E)>,
}

impl<S, SubS, A, E, R> Reducer for ScopedReducer<S, SubS, A, E, R>
where
    R: Reducer<State = SubS, Action = A, Environment = E>,
{
    type State = S;
    type Action = A;
    type Environment = E;

    fn reduce(&self, state: &S, action: A, ctx: &mut Context<'_, E, A>) -> Result<S, ReduceError> {
        let sub_state = self.reducer.reduce((self.get_state)(state), action, ctx)?;
        Ok((self.set_state)(state, sub_state))
    }

    fn initial_effect(&self) -> Option<Effect<E, A>> {
        self.reducer.initial_effect()
    }
}

/// Scoping function for a delegate whose actions arrive wrapped in a parent
/// action.
///
/// `extract` borrows the child action out of the parent (or returns `None`
/// when the parent action is meant for someone else); the returned function
/// clones it out.
///
/// # Examples
///
/// ```
/// use statefx_core::composition::scope_action;
///
/// #[derive(Debug, Clone, PartialEq)]
/// enum Counter {
///     Add(i32),
/// }
///
/// enum App {
///     Counter(Counter),
///     Quit,
/// }
///
/// let scope = scope_action(|action: &App| match action {
///     App::Counter(counter) => Some(counter),
///     App::Quit => None,
/// });
///
/// assert_eq!(scope(&App::Counter(Counter::Add(2))), Some(Counter::Add(2)));
/// assert_eq!(scope(&App::Quit), None);
/// ```
pub fn scope_action<P, C, F>(extract: F) -> impl Fn(&P) -> Option<C> + Send + Sync
where
    C: Clone,
    F: Fn(&P) -> Option<&C> + Send + Sync,
{
    move |action: &P| extract(action).cloned()
}

/// Scoping closure for the common case of one enum variant wrapping the
/// child action.
///
/// `scope_action!(App::Counter)` yields `Some(child.clone())` for
/// `App::Counter(child)` and `None` for every other variant.
///
/// # Examples
///
/// ```
/// use statefx_core::scope_action;
///
/// #[derive(Debug, Clone, PartialEq)]
/// enum Counter {
///     Add(i32),
/// }
///
/// enum App {
///     Counter(Counter),
///     Quit,
/// }
///
/// let scope = scope_action!(App::Counter);
/// assert_eq!(scope(&App::Counter(Counter::Add(2))), Some(Counter::Add(2)));
/// assert_eq!(scope(&App::Quit), None);
/// ```
#[macro_export]
macro_rules! scope_action {
    ($parent:ident :: $variant:ident) => {
        |action: &$parent| match action {
            $parent::$variant(child) => ::std::option::Option::Some(::std::clone::Clone::clone(child)),
            #[allow(unreachable_patterns)]
            _ => ::std::option::Option::None,
        }
    };
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::effect::EffectId;
    use crate::reducer::reducer_fn;
    use proptest::prelude::*;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct TestState {
        counter: i32,
        name: String,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Increment,
        Decrement,
        SetName(String),
    }

    struct CounterReducer;

    impl Reducer for CounterReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &TestState,
            action: TestAction,
            ctx: &mut Context<'_, (), TestAction>,
        ) -> Result<TestState, ReduceError> {
            let counter = match action {
                TestAction::Increment => state.counter + 1,
                TestAction::Decrement => state.counter - 1,
                TestAction::SetName(_) => return Ok(state.clone()),
            };
            ctx.effect_with_id("counter", |_| async { Ok(()) });
            Ok(TestState {
                counter,
                ..state.clone()
            })
        }
    }

    struct NameReducer;

    impl Reducer for NameReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = ();

        fn reduce(
            &self,
            state: &TestState,
            action: TestAction,
            _ctx: &mut Context<'_, (), TestAction>,
        ) -> Result<TestState, ReduceError> {
            match action {
                TestAction::SetName(name) if name.is_empty() => Err(ReduceError::rejected("empty name")),
                TestAction::SetName(name) => Ok(TestState {
                    name,
                    ..state.clone()
                }),
                _ => Ok(state.clone()),
            }
        }
    }

    fn combined() -> CombinedReducer<TestState, TestAction, ()> {
        combine_reducers(vec![Box::new(CounterReducer), Box::new(NameReducer)])
    }

    #[test]
    fn test_combine_reducers() {
        let combined = combined();
        let mut ctx = Context::new(&());

        let state = combined.reduce(&TestState::default(), TestAction::Increment, &mut ctx).unwrap();
        assert_eq!(state.counter, 1);

        let state = combined
            .reduce(&state, TestAction::SetName("Alice".to_string()), &mut ctx)
            .unwrap();
        assert_eq!(state.name, "Alice");

        let state = combined.reduce(&state, TestAction::Decrement, &mut ctx).unwrap();
        assert_eq!(state.counter, 0);
        assert_eq!(state.name, "Alice");

        assert_eq!(ctx.effects().len(), 2);
        assert_eq!(ctx.effects()[0].id(), Some(&EffectId::from("counter")));
    }

    #[test]
    fn combined_reducer_stops_at_first_failure() {
        let combined = combined();
        let mut ctx = Context::new(&());

        let result = combined.reduce(&TestState::default(), TestAction::SetName(String::new()), &mut ctx);
        assert!(matches!(result, Err(ReduceError::Rejected(_))));
    }

    #[test]
    fn combined_reducer_picks_first_initial_effect() {
        let quiet = reducer_fn(|s: &i32, _: i32, _ctx: &mut Context<'_, (), i32>| Ok(*s));
        let booting = reducer_fn(|s: &i32, _: i32, _ctx: &mut Context<'_, (), i32>| Ok(*s))
            .with_initial_effect(|| Effect::execution_with_id("boot", |_| async { Ok(()) }));

        let combined = combine_reducers(vec![Box::new(quiet), Box::new(booting)]);
        let effect = combined.initial_effect().unwrap();
        assert_eq!(effect.id(), Some(&EffectId::from("boot")));
    }

    #[derive(Clone, Default, Debug, PartialEq)]
    struct ParentState {
        sub: i32,
        other: String,
    }

    #[test]
    fn test_scope_reducer() {
        let sub = reducer_fn(|s: &i32, a: i32, _ctx: &mut Context<'_, (), i32>| Ok(s * a));
        let scoped = scope_reducer(
            sub,
            |parent: &ParentState| &parent.sub,
            |parent: &ParentState, sub| ParentState {
                sub,
                ..parent.clone()
            },
        );

        let state = ParentState {
            sub: 5,
            other: "test".to_string(),
        };
        let mut ctx = Context::new(&());

        let state = scoped.reduce(&state, 2, &mut ctx).unwrap();
        assert_eq!(state.sub, 10);
        assert_eq!(state.other, "test");
    }

    #[derive(Clone, Debug, PartialEq)]
    enum ParentAction {
        Counter(TestAction),
        Reset,
    }

    #[test]
    fn scope_action_unwraps_the_child_action() {
        let scope = scope_action(|action: &ParentAction| match action {
            ParentAction::Counter(action) => Some(action),
            ParentAction::Reset => None,
        });

        assert_eq!(scope(&ParentAction::Counter(TestAction::Increment)), Some(TestAction::Increment));
        assert_eq!(scope(&ParentAction::Reset), None);
    }

    #[test]
    fn scope_action_macro_matches_one_variant() {
        let scope = crate::scope_action!(ParentAction::Counter);

        assert_eq!(
            scope(&ParentAction::Counter(TestAction::SetName("a".into()))),
            Some(TestAction::SetName("a".into()))
        );
        assert_eq!(scope(&ParentAction::Reset), None);
    }

    #[test]
    fn scoped_actions_drive_a_reducer() {
        let scope = crate::scope_action!(ParentAction::Counter);
        let mut state = TestState::default();

        for action in [
            ParentAction::Counter(TestAction::Increment),
            ParentAction::Reset,
            ParentAction::Counter(TestAction::Increment),
        ] {
            if let Some(action) = scope(&action) {
                let mut ctx = Context::new(&());
                state = CounterReducer.reduce(&state, action, &mut ctx).unwrap();
            }
        }

        assert_eq!(state.counter, 2);
    }

    proptest! {
        #[test]
        fn combined_reducer_matches_sequential_application(
            actions in prop::collection::vec(0_u8..3, 0..32)
        ) {
            let combined = combined();
            let mut combined_state = TestState::default();
            let mut manual_state = TestState::default();

            for tag in actions {
                let action = match tag {
                    0 => TestAction::Increment,
                    1 => TestAction::Decrement,
                    _ => TestAction::SetName(format!("n{tag}")),
                };

                let mut ctx = Context::new(&());
                combined_state = combined.reduce(&combined_state, action.clone(), &mut ctx).unwrap();

                let mut ctx = Context::new(&());
                let intermediate = CounterReducer.reduce(&manual_state, action.clone(), &mut ctx).unwrap();
                manual_state = NameReducer.reduce(&intermediate, action, &mut ctx).unwrap();
            }

            prop_assert_eq!(combined_state, manual_state);
        }
    }
}
