//! # Statefx Testing
//!
//! Testing utilities and helpers for statefx.
//!
//! This crate provides:
//! - A Given-When-Then harness for reducers ([`ReducerTest`])
//! - Assertion helpers for effect lists
//! - Recording doubles for event sinks and dispatchers
//! - Helpers for driving stores under Tokio's paused clock
//! - Property-based testing utilities
//!
//! ## Example
//!
//! ```
//! use statefx_core::reducer::{reducer_fn, Context};
//! use statefx_runtime::{Store, StoreConfig};
//! use statefx_testing::{settle, RecordingSink};
//!
//! # #[tokio::main(flavor = "current_thread", start_paused = true)]
//! # async fn main() -> Result<(), statefx_core::error::StoreError> {
//! let sink = RecordingSink::new();
//! let reducer = reducer_fn(|s: &i32, a: i32, _ctx: &mut Context<'_, (), i32>| Ok(s + a));
//! let store = Store::with_config(0, reducer, (), StoreConfig::default().with_events(sink.clone()))?;
//!
//! store.dispatch(1)?;
//! settle().await;
//!
//! assert_eq!(sink.kinds(), vec!["init", "dispatch", "reduce"]);
//! # Ok(())
//! # }
//! ```

/// Test doubles for sinks and dispatchers
///
/// Mock implementations for testing.
pub mod mocks {
    use statefx_core::effect::Dispatcher;
    use statefx_core::error::StoreError;
    use statefx_core::event::{EventSink, StoreEvent};
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Event sink that records every event in memory
    ///
    /// Clones share the same buffer, so keep one clone for assertions and
    /// hand the other to the store.
    ///
    /// # Example
    ///
    /// ```
    /// use statefx_core::event::{EventSink, StoreEvent};
    /// use statefx_testing::RecordingSink;
    ///
    /// let sink = RecordingSink::new();
    /// sink.emit(&StoreEvent::Dispatch { action: "Increment".into() });
    /// assert_eq!(sink.lines(), vec!["dispatch > Increment"]);
    /// ```
    #[derive(Debug, Clone, Default)]
    pub struct RecordingSink {
        events: Arc<Mutex<Vec<StoreEvent>>>,
    }

    impl RecordingSink {
        /// Create an empty sink
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Every event recorded so far
        #[must_use]
        pub fn events(&self) -> Vec<StoreEvent> {
            lock(&self.events).clone()
        }

        /// The [`kind`](StoreEvent::kind) of each recorded event
        #[must_use]
        pub fn kinds(&self) -> Vec<&'static str> {
            lock(&self.events).iter().map(StoreEvent::kind).collect()
        }

        /// Each recorded event rendered as a line
        #[must_use]
        pub fn lines(&self) -> Vec<String> {
            lock(&self.events).iter().map(ToString::to_string).collect()
        }

        /// Forget everything recorded so far
        pub fn clear(&self) {
            lock(&self.events).clear();
        }
    }

    impl EventSink for RecordingSink {
        fn emit(&self, event: &StoreEvent) {
            lock(&self.events).push(event.clone());
        }
    }

    /// Dispatcher that records actions instead of reducing them
    ///
    /// Useful for running an effect body in isolation.
    #[derive(Debug)]
    pub struct ActionRecorder<A> {
        actions: Arc<Mutex<Vec<A>>>,
    }

    impl<A> ActionRecorder<A> {
        /// Create an empty recorder
        #[must_use]
        pub fn new() -> Self {
            Self {
                actions: Arc::new(Mutex::new(Vec::new())),
            }
        }

        /// Take the recorded actions, leaving the recorder empty
        #[must_use]
        pub fn take(&self) -> Vec<A> {
            std::mem::take(&mut *lock(&self.actions))
        }

        /// Number of recorded actions
        #[must_use]
        pub fn len(&self) -> usize {
            lock(&self.actions).len()
        }

        /// Whether nothing has been recorded
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    impl<A> Default for ActionRecorder<A> {
        fn default() -> Self {
            Self::new()
        }
    }

    impl<A> Clone for ActionRecorder<A> {
        fn clone(&self) -> Self {
            Self {
                actions: Arc::clone(&self.actions),
            }
        }
    }

    impl<A: Send> Dispatcher<A> for ActionRecorder<A> {
        fn dispatch(&self, action: A) -> Result<(), StoreError> {
            lock(&self.actions).push(action);
            Ok(())
        }
    }
}

/// Test helpers and utilities
pub mod helpers {
    use crate::mocks::ActionRecorder;
    use statefx_core::effect::{Effect, EffectContext};
    use statefx_runtime::StateStore;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::error::Elapsed;

    /// Let every task that can progress without time passing run to
    /// quiescence.
    ///
    /// Under a paused clock (`#[tokio::test(start_paused = true)]`) this
    /// advances virtual time by one millisecond, which is enough for effect
    /// bodies, observers and expansions to catch up.
    pub async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    /// Wait until the store's state satisfies `predicate`, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`Elapsed`] if `timeout` passes first.
    pub async fn wait_for_state<St, F>(store: &St, timeout: Duration, predicate: F) -> Result<St::State, Elapsed>
    where
        St: StateStore,
        F: Fn(&St::State) -> bool,
    {
        let mut receiver = store.subscribe();
        tokio::time::timeout(timeout, async move {
            loop {
                let current = receiver.borrow_and_update().clone();
                if predicate(&current) {
                    return current;
                }
                if receiver.changed().await.is_err() {
                    // The store is gone; nothing can change any more.
                    std::future::pending::<()>().await;
                }
            }
        })
        .await
    }

    /// Run a single execution to completion outside of any store.
    ///
    /// Returns the body's result and every action it dispatched. A
    /// cancellation resolves immediately with no actions.
    pub async fn run_effect<E, A>(effect: Effect<E, A>, environment: E) -> (anyhow::Result<()>, Vec<A>)
    where
        E: Send + Sync + 'static,
        A: Send + 'static,
    {
        let Effect::Execution(execution) = effect else {
            return (Ok(()), Vec::new());
        };
        let recorder = ActionRecorder::new();
        let context = EffectContext::new(Arc::new(environment), Arc::new(recorder.clone()));
        let result = execution.run(context).await;
        (result, recorder.take())
    }

    /// Install a `tracing` subscriber that writes through the test harness.
    ///
    /// Honors `RUST_LOG`; safe to call from every test.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("statefx_runtime=debug")),
            )
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities
///
/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::collection::vec;
    use proptest::strategy::Strategy;

    /// Sequences of up to `max_len` actions drawn from `action`
    pub fn action_sequence<S: Strategy>(action: S, max_len: usize) -> impl Strategy<Value = Vec<S::Value>> {
        vec(action, 0..=max_len)
    }
}

/// Reducer testing utilities
pub mod reducer_test;

// Re-export commonly used items
pub use helpers::{init_test_tracing, run_effect, settle, wait_for_state};
pub use mocks::{ActionRecorder, RecordingSink};
pub use reducer_test::{ReducerTest, assertions};
