//! Store module - The runtime for reducers
//!
//! A [`Store`] owns one state value, one reducer and one effect scheduler.
//! `dispatch` reduces synchronously under the store's dispatch lock,
//! publishes the new state and hands the reducer's effects to the scheduler
//! before the lock is released.

use crate::config::StoreConfig;
use crate::events::EventEmitter;
use crate::metrics::DispatchMetrics;
use crate::scheduler::EffectScheduler;
use futures::StreamExt;
use futures::stream::{BoxStream, Stream};
use statefx_core::effect::{Dispatcher, EffectId};
use statefx_core::error::StoreError;
use statefx_core::event::StoreEvent;
use statefx_core::reducer::{Context, Reducer};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// A handle to a running store: read its state, feed it actions.
///
/// Implemented by [`Store`] and [`DelegatingStore`](crate::DelegatingStore),
/// so composites can delegate to either.
pub trait StateStore: Clone + Send + Sync + 'static {
    /// State published by the store
    type State: Clone + fmt::Debug + Send + Sync + 'static;

    /// Actions accepted by the store
    type Action: fmt::Debug + Send + 'static;

    /// Feed an action into the store
    ///
    /// # Errors
    ///
    /// See [`Store::dispatch`].
    fn dispatch(&self, action: Self::Action) -> Result<(), StoreError>;

    /// The current state
    fn state(&self) -> Self::State;

    /// A receiver that is notified on every published state
    fn subscribe(&self) -> watch::Receiver<Self::State>;

    /// The current state followed by every later one
    fn observe(&self) -> BoxStream<'static, Self::State> {
        state_stream(self.subscribe()).boxed()
    }
}

/// Stream the value held by `receiver`, then each change.
///
/// Values published faster than the consumer polls are conflated; the stream
/// ends when the sender is dropped.
pub(crate) fn state_stream<S>(mut receiver: watch::Receiver<S>) -> impl Stream<Item = S> + Send + 'static
where
    S: Clone + Send + Sync + 'static,
{
    async_stream::stream! {
        let current = receiver.borrow_and_update().clone();
        yield current;
        while receiver.changed().await.is_ok() {
            let next = receiver.borrow_and_update().clone();
            yield next;
        }
    }
}

type BoxedReducer<S, A, E> = Box<dyn Reducer<State = S, Action = A, Environment = E> + Send + Sync>;

/// The Store - runtime coordinator for a reducer
///
/// The Store manages:
/// 1. State (published through a `watch` channel)
/// 2. Reducer (business logic)
/// 3. Environment (injected dependencies, shared with effects)
/// 4. Effect scheduling (with the action feedback loop)
///
/// Handles are cheap to clone and share one store. Dropping the last handle
/// aborts every effect the store launched.
///
/// # Type Parameters
///
/// - `S`: State type
/// - `A`: Action type
/// - `E`: Environment type
///
/// # Example
///
/// ```
/// use statefx_core::reducer::{reducer_fn, Context};
/// use statefx_runtime::Store;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), statefx_core::error::StoreError> {
/// let reducer = reducer_fn(|state: &i64, action: i64, _ctx: &mut Context<'_, (), i64>| {
///     Ok(state + action)
/// });
///
/// let store = Store::new(0, reducer, ())?;
/// store.dispatch(40)?;
/// store.dispatch(2)?;
/// assert_eq!(store.state(), 42);
/// # Ok(())
/// # }
/// ```
pub struct Store<S, A, E> {
    inner: Arc<StoreInner<S, A, E>>,
}

struct StoreInner<S, A, E> {
    reducer: BoxedReducer<S, A, E>,
    environment: Arc<E>,
    state: watch::Sender<S>,
    dispatch_lock: Mutex<()>,
    scheduler: EffectScheduler<E, A>,
    events: EventEmitter,
    shutdown: AtomicBool,
    shutdown_timeout: Duration,
}

/// Routes effect actions back into a store without keeping it alive
struct StoreDispatcher<S, A, E> {
    inner: Weak<StoreInner<S, A, E>>,
}

impl<S, A, E> Dispatcher<A> for StoreDispatcher<S, A, E>
where
    S: Clone + fmt::Debug + Send + Sync + 'static,
    A: fmt::Debug + Send + 'static,
    E: fmt::Debug + Send + Sync + 'static,
{
    fn dispatch(&self, action: A) -> Result<(), StoreError> {
        let inner = self.inner.upgrade().ok_or(StoreError::StoreDropped)?;
        inner.dispatch(action)
    }
}

impl<S, A, E> Store<S, A, E>
where
    S: Clone + fmt::Debug + Send + Sync + 'static,
    A: fmt::Debug + Send + 'static,
    E: fmt::Debug + Send + Sync + 'static,
{
    /// Create a new store with initial state, reducer, and environment
    ///
    /// Uses [`StoreConfig::default`]: no event sink and the ambient Tokio
    /// runtime. The reducer's initial effect, if any, is scheduled before
    /// this returns.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoRuntime`] when called outside a Tokio runtime.
    pub fn new<R>(initial_state: S, reducer: R, environment: E) -> Result<Self, StoreError>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
    {
        Self::with_config(initial_state, reducer, environment, StoreConfig::default())
    }

    /// Create a new Store with custom configuration
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoRuntime`] when the configuration names no
    /// runtime and the caller is outside a Tokio runtime.
    ///
    /// # Example
    ///
    /// ```
    /// use statefx_core::reducer::EmptyReducer;
    /// use statefx_runtime::{Store, StoreConfig, TracingSink};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> Result<(), statefx_core::error::StoreError> {
    /// let config = StoreConfig::default().with_events(TracingSink::new("counter"));
    /// let store = Store::with_config(0_u32, EmptyReducer::<u32, (), ()>::new(), (), config)?;
    /// assert_eq!(store.state(), 0);
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_config<R>(
        initial_state: S,
        reducer: R,
        environment: E,
        config: StoreConfig,
    ) -> Result<Self, StoreError>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
    {
        let runtime = config.runtime()?;
        let events = EventEmitter::new(config.events().cloned());
        let environment = Arc::new(environment);
        let initial_effect = reducer.initial_effect();

        events.emit(|| StoreEvent::Initialization {
            initial_state: format!("{initial_state:?}"),
            environment: format!("{environment:?}"),
            has_initial_effect: initial_effect.is_some(),
        });

        let (state, _) = watch::channel(initial_state);
        let inner = Arc::new_cyclic(|weak: &Weak<StoreInner<S, A, E>>| {
            let dispatcher: Arc<dyn Dispatcher<A>> = Arc::new(StoreDispatcher {
                inner: Weak::clone(weak),
            });
            StoreInner {
                reducer: Box::new(reducer),
                scheduler: EffectScheduler::new(
                    runtime,
                    Arc::clone(&environment),
                    dispatcher,
                    events.clone(),
                ),
                environment,
                state,
                dispatch_lock: Mutex::new(()),
                events,
                shutdown: AtomicBool::new(false),
                shutdown_timeout: config.shutdown_timeout(),
            }
        });

        if let Some(effect) = initial_effect {
            tracing::debug!("Scheduling initial effect");
            let _guard = inner.dispatch_lock.lock().unwrap_or_else(PoisonError::into_inner);
            inner.scheduler.schedule([effect]);
        }

        Ok(Self { inner })
    }

    /// Send an action to the store
    ///
    /// 1. Acquires the dispatch lock
    /// 2. Calls the reducer with (state, action, environment)
    /// 3. Publishes the new state
    /// 4. Hands the reducer's effects to the scheduler, in order
    ///
    /// Returns once the effects are scheduled, not once they complete. Safe
    /// to call from any thread and from inside effect bodies.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Reduce`] if the reducer rejected the action; the
    ///   state is unchanged and none of its effects run
    /// - [`StoreError::ShutdownInProgress`] if the store is shutting down
    ///
    /// # Panics
    ///
    /// A panicking reducer propagates to the caller. The store keeps its last
    /// published state and stays usable.
    #[tracing::instrument(skip_all, name = "store_dispatch")]
    pub fn dispatch(&self, action: A) -> Result<(), StoreError> {
        self.inner.dispatch(action)
    }

    /// The current state
    #[must_use]
    pub fn state(&self) -> S {
        self.inner.state.borrow().clone()
    }

    /// Read the current state through a closure without cloning it
    ///
    /// ```ignore
    /// let query_len = store.read(|s| s.query.len());
    /// ```
    pub fn read<T>(&self, f: impl FnOnce(&S) -> T) -> T {
        f(&self.inner.state.borrow())
    }

    /// A `watch` receiver over the published state
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.inner.state.subscribe()
    }

    /// The current state followed by every later one.
    ///
    /// Any number of observers may exist. Intermediate states published
    /// faster than an observer polls are skipped. The stream ends when the
    /// store is dropped.
    pub fn observe(&self) -> impl Stream<Item = S> + Send + 'static {
        state_stream(self.subscribe())
    }

    /// The store's environment
    #[must_use]
    pub fn environment(&self) -> &E {
        &self.inner.environment
    }

    /// Number of effect executions still running
    #[must_use]
    pub fn running_effects(&self) -> usize {
        self.inner.scheduler.running()
    }

    /// Whether an execution keyed by `id` is running
    #[must_use]
    pub fn is_effect_running(&self, id: impl Into<EffectId>) -> bool {
        self.inner.scheduler.is_running(&id.into())
    }

    /// Initiate graceful shutdown of the store
    ///
    /// This method:
    /// 1. Sets the shutdown flag (rejecting new actions)
    /// 2. Waits for running effects to complete (with timeout)
    /// 3. Aborts whatever is still running when the timeout expires
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] with the number of aborted
    /// effects if the timeout expired first.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        tracing::info!("Initiating graceful shutdown");
        self.inner.shutdown.store(true, Ordering::Release);
        self.inner.scheduler.drain(timeout).await?;
        tracing::info!("All effects completed, shutdown successful");
        Ok(())
    }

    /// [`shutdown`](Self::shutdown) with the configured default timeout
    ///
    /// # Errors
    ///
    /// See [`shutdown`](Self::shutdown).
    pub async fn shutdown_gracefully(&self) -> Result<(), StoreError> {
        self.shutdown(self.inner.shutdown_timeout).await
    }
}

impl<S, A, E> StoreInner<S, A, E>
where
    S: Clone + fmt::Debug + Send + Sync + 'static,
    A: fmt::Debug + Send + 'static,
    E: fmt::Debug + Send + Sync + 'static,
{
    fn dispatch(&self, action: A) -> Result<(), StoreError> {
        if self.shutdown.load(Ordering::Acquire) {
            tracing::warn!("Rejected action: store is shutting down");
            return Err(StoreError::ShutdownInProgress);
        }

        let _guard = self.dispatch_lock.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::trace!("Acquired dispatch lock");

        let rendered_action = self.events.is_enabled().then(|| format!("{action:?}"));
        if let Some(action) = &rendered_action {
            self.events.emit(|| StoreEvent::Dispatch {
                action: action.clone(),
            });
        }

        let previous = self.state.borrow().clone();
        let mut ctx = Context::new(&*self.environment);

        let start = Instant::now();
        let result = self.reducer.reduce(&previous, action, &mut ctx);
        DispatchMetrics::record_reduce(start.elapsed());

        let next = match result {
            Ok(next) => next,
            Err(error) => {
                tracing::debug!(error = %error, "Reducer rejected action");
                DispatchMetrics::record_failure();
                return Err(error.into());
            },
        };

        let effects = ctx.into_effects();
        tracing::trace!("Reducer completed, returned {} effects", effects.len());

        if let Some(action) = rendered_action {
            self.events.emit(|| StoreEvent::Reduce {
                previous_state: format!("{previous:?}"),
                action,
                new_state: format!("{next:?}"),
            });
        }

        self.state.send_replace(next);
        self.scheduler.schedule(effects);
        Ok(())
    }
}

impl<S, A, E> Clone for Store<S, A, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: fmt::Debug, A, E> fmt::Debug for Store<S, A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &*self.inner.state.borrow())
            .finish_non_exhaustive()
    }
}

impl<S, A, E> StateStore for Store<S, A, E>
where
    S: Clone + fmt::Debug + Send + Sync + 'static,
    A: fmt::Debug + Send + 'static,
    E: fmt::Debug + Send + Sync + 'static,
{
    type State = S;
    type Action = A;

    fn dispatch(&self, action: A) -> Result<(), StoreError> {
        Self::dispatch(self, action)
    }

    fn state(&self) -> S {
        Self::state(self)
    }

    fn subscribe(&self) -> watch::Receiver<S> {
        Self::subscribe(self)
    }
}
