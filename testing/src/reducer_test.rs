//! Ergonomic testing utilities for reducers
//!
//! This module provides a fluent API for testing reducers with readable Given-When-Then syntax.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use statefx_core::effect::Effect;
use statefx_core::error::ReduceError;
use statefx_core::reducer::{Context, Reducer};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for effect assertion functions
type EffectAssertion<E, A> = Box<dyn FnOnce(&[Effect<E, A>])>;

/// Type alias for error assertion functions
type ErrorAssertion = Box<dyn FnOnce(&ReduceError)>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// Actions given to [`when_action`](Self::when_action) are reduced in order,
/// each against the state produced by the previous one. State assertions see
/// the final state; effect assertions see the effects of every action,
/// concatenated.
///
/// # Example
///
/// ```
/// use statefx_core::reducer::{reducer_fn, Context};
/// use statefx_testing::{assertions, ReducerTest};
///
/// let counter = reducer_fn(|s: &i32, a: i32, _ctx: &mut Context<'_, (), i32>| Ok(s + a));
///
/// ReducerTest::new(counter)
///     .with_env(())
///     .given_state(0)
///     .when_action(1)
///     .when_action(2)
///     .then_state(|state| assert_eq!(*state, 3))
///     .then_effects(|effects| assertions::assert_no_effects(effects))
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    actions: Vec<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<E, A>>,
    error_assertion: Option<ErrorAssertion>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
            error_assertion: None,
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Add an action to reduce (When)
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Add several actions to reduce, in order (When)
    #[must_use]
    pub fn when_actions(mut self, actions: impl IntoIterator<Item = A>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the resulting effects (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<E, A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Expect the last action to be rejected, and inspect the error (Then)
    ///
    /// State assertions then see the state before the failing action.
    #[must_use]
    pub fn then_error<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&ReduceError) + 'static,
    {
        self.error_assertion = Some(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state, action, or environment is not set, if a
    /// reducer fails unexpectedly (or succeeds when `then_error` was given),
    /// or if any assertions fail.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");
        assert!(!self.actions.is_empty(), "Action must be set with when_action()");

        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        let mut effects = Vec::new();
        let mut error = None;
        let last = self.actions.len() - 1;

        for (index, action) in self.actions.into_iter().enumerate() {
            let mut ctx = Context::new(&env);
            match self.reducer.reduce(&state, action, &mut ctx) {
                Ok(next) => {
                    state = next;
                    effects.extend(ctx.into_effects());
                },
                Err(e) if index == last && self.error_assertion.is_some() => error = Some(e),
                Err(e) => panic!("Reducer failed on action #{index}: {e}"),
            }
        }

        match (self.error_assertion, error) {
            (Some(assertion), Some(error)) => assertion(&error),
            (Some(_), None) => panic!("Expected the last action to fail, but it succeeded"),
            (None, _) => {},
        }

        // Run state assertions
        for assertion in self.state_assertions {
            assertion(&state);
        }

        // Run effect assertions
        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Helper assertions for effects
pub mod assertions {
    use statefx_core::effect::{Effect, EffectId};

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if effects is not empty.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<E, A>(effects: &[Effect<E, A>]) {
        assert!(
            effects.is_empty(),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of effects
    ///
    /// # Panics
    ///
    /// Panics if the number of effects doesn't match expected.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<E, A>(effects: &[Effect<E, A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {} effects, but found {}",
            expected,
            effects.len()
        );
    }

    /// Assert that effects contain an execution keyed by `id`
    ///
    /// # Panics
    ///
    /// Panics if no such execution is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_launches<E, A>(effects: &[Effect<E, A>], id: impl Into<EffectId>) {
        let id = id.into();
        assert!(
            effects.iter().any(|e| e.id() == Some(&id)),
            "Expected an execution with id {id:?}, but found {effects:?}"
        );
    }

    /// Assert that effects contain a cancellation of `id`
    ///
    /// # Panics
    ///
    /// Panics if no cancellation names `id`.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_cancels<E, A>(effects: &[Effect<E, A>], id: impl Into<EffectId>) {
        let id = id.into();
        assert!(
            effects
                .iter()
                .filter_map(Effect::as_cancellation)
                .any(|c| c.ids().contains(&id)),
            "Expected a cancellation of {id:?}, but found {effects:?}"
        );
    }

    /// Assert that a cancellation of `id` comes before the execution keyed
    /// by `id` (the restart idiom)
    ///
    /// # Panics
    ///
    /// Panics if either effect is missing or they are out of order.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_restarts<E, A>(effects: &[Effect<E, A>], id: impl Into<EffectId>) {
        let id = id.into();
        let cancel = effects.iter().position(|e| {
            e.as_cancellation()
                .is_some_and(|c| c.ids().contains(&id))
        });
        let launch = effects.iter().position(|e| e.id() == Some(&id));
        assert!(
            matches!((cancel, launch), (Some(c), Some(l)) if c < l),
            "Expected cancel then launch of {id:?}, but found {effects:?}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statefx_core::effect::Effect;

    #[derive(Clone, Debug)]
    struct TestState {
        count: i32,
    }

    #[derive(Clone, Debug)]
    enum TestAction {
        Increment,
        Decrement,
        Poll,
    }

    struct TestReducer;

    struct TestEnv;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = TestEnv;

        fn reduce(
            &self,
            state: &TestState,
            action: TestAction,
            ctx: &mut Context<'_, TestEnv, TestAction>,
        ) -> Result<TestState, ReduceError> {
            match action {
                TestAction::Increment => Ok(TestState {
                    count: state.count + 1,
                }),
                TestAction::Decrement if state.count == 0 => {
                    Err(ReduceError::rejected("count is already zero"))
                },
                TestAction::Decrement => Ok(TestState {
                    count: state.count - 1,
                }),
                TestAction::Poll => {
                    ctx.cancel_effect("poll");
                    ctx.effect_with_id("poll", |_| async { Ok(()) });
                    Ok(state.clone())
                },
            }
        }
    }

    #[test]
    fn test_reducer_test_increment() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 0 })
            .when_action(TestAction::Increment)
            .then_state(|state| {
                assert_eq!(state.count, 1);
            })
            .then_effects(|effects| {
                assertions::assert_no_effects(effects);
            })
            .run();
    }

    #[test]
    fn test_reducer_test_action_sequence() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 5 })
            .when_actions([TestAction::Decrement, TestAction::Decrement, TestAction::Increment])
            .then_state(|state| {
                assert_eq!(state.count, 4);
            })
            .run();
    }

    #[test]
    fn test_reducer_test_error() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 1 })
            .when_action(TestAction::Decrement)
            .when_action(TestAction::Decrement)
            .then_error(|error| {
                assert!(matches!(error, ReduceError::Rejected(_)));
            })
            .then_state(|state| assert_eq!(state.count, 0))
            .run();
    }

    #[test]
    fn test_restart_assertions() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 0 })
            .when_action(TestAction::Poll)
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 2);
                assertions::assert_cancels(effects, "poll");
                assertions::assert_launches(effects, "poll");
                assertions::assert_restarts(effects, "poll");
            })
            .run();
    }

    #[test]
    #[should_panic(expected = "Expected no effects")]
    fn test_no_effects_assertion_fails_on_effects() {
        let effects: Vec<Effect<(), ()>> = vec![Effect::cancel("poll")];
        assertions::assert_no_effects(&effects);
    }
}
