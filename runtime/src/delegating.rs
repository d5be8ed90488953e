//! Composite store built from independently running members.
//!
//! A [`DelegatingStore`] has no reducer of its own. Dispatch fans the parent
//! action out to every [`Delegate`] in order. Each member publishes its state
//! on its own; one observer task per member folds every new member state into
//! the parent state through the delegate's expand function.
//!
//! All expansions are serialized by a single lock, which is held while the
//! expansion's effects are handed to the parent scheduler. The order in which
//! two members' changes are expanded follows the order their notifications
//! arrive, not the order of the delegate list.

use crate::config::StoreConfig;
use crate::delegate::{Delegate, Expansion};
use crate::events::EventEmitter;
use crate::metrics::{DispatchMetrics, ExpansionMetrics};
use crate::scheduler::EffectScheduler;
use crate::store::{StateStore, state_stream};
use futures::StreamExt;
use futures::stream::Stream;
use statefx_core::effect::{Dispatcher, Effect};
use statefx_core::error::StoreError;
use statefx_core::event::StoreEvent;
use statefx_core::reducer::Context;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::AbortHandle;

/// A store whose state is the expansion of its members' states.
///
/// Implements [`StateStore`], so composites can themselves be delegates of a
/// larger composite.
///
/// # Example
///
/// ```
/// use statefx_core::reducer::{reducer_fn, Context};
/// use statefx_runtime::{DelegatingStore, ReducerDelegateExt};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), statefx_core::error::StoreError> {
/// let doubler = reducer_fn(|_: &i32, a: i32, _ctx: &mut Context<'_, (), i32>| Ok(a * 2));
/// let member = doubler.delegate(0, (), |a: &i32| Some(*a), |_ctx, _parent: &i32, child: &i32| *child)?;
///
/// let composite = DelegatingStore::new(0, (), vec![member])?;
/// composite.dispatch(21)?;
/// # Ok(())
/// # }
/// ```
pub struct DelegatingStore<S, A, E> {
    inner: Arc<DelegatingInner<S, A, E>>,
}

struct DelegatingInner<S, A, E> {
    delegates: Vec<Box<dyn Delegate<S, A, E>>>,
    environment: Arc<E>,
    state: watch::Sender<S>,
    dispatch_lock: Mutex<()>,
    expansion_lock: Mutex<()>,
    scheduler: EffectScheduler<E, A>,
    events: EventEmitter,
    observers: Mutex<Vec<AbortHandle>>,
    shutdown: AtomicBool,
    shutdown_timeout: Duration,
}

struct DelegatingDispatcher<S, A, E> {
    inner: Weak<DelegatingInner<S, A, E>>,
}

impl<S, A, E> Dispatcher<A> for DelegatingDispatcher<S, A, E>
where
    S: Clone + fmt::Debug + Send + Sync + 'static,
    A: fmt::Debug + Send + 'static,
    E: fmt::Debug + Send + Sync + 'static,
{
    fn dispatch(&self, action: A) -> Result<(), StoreError> {
        let inner = self.inner.upgrade().ok_or(StoreError::StoreDropped)?;
        inner.dispatch(&action)
    }
}

impl<S, A, E> DelegatingStore<S, A, E>
where
    S: Clone + fmt::Debug + Send + Sync + 'static,
    A: fmt::Debug + Send + 'static,
    E: fmt::Debug + Send + Sync + 'static,
{
    /// Create a composite over `delegates` with the default configuration
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoRuntime`] when called outside a Tokio runtime.
    pub fn new(
        initial_state: S,
        environment: E,
        delegates: Vec<Box<dyn Delegate<S, A, E>>>,
    ) -> Result<Self, StoreError> {
        Self::build(initial_state, environment, delegates, None, StoreConfig::default())
    }

    /// Create a composite with custom configuration
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoRuntime`] when the configuration names no
    /// runtime and the caller is outside a Tokio runtime.
    pub fn with_config(
        initial_state: S,
        environment: E,
        delegates: Vec<Box<dyn Delegate<S, A, E>>>,
        config: StoreConfig,
    ) -> Result<Self, StoreError> {
        Self::build(initial_state, environment, delegates, None, config)
    }

    /// Create a composite that schedules `initial_effect` on its own
    /// scheduler before any action is dispatched
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoRuntime`] when the configuration names no
    /// runtime and the caller is outside a Tokio runtime.
    pub fn with_initial_effect(
        initial_state: S,
        environment: E,
        delegates: Vec<Box<dyn Delegate<S, A, E>>>,
        initial_effect: Effect<E, A>,
        config: StoreConfig,
    ) -> Result<Self, StoreError> {
        Self::build(initial_state, environment, delegates, Some(initial_effect), config)
    }

    fn build(
        initial_state: S,
        environment: E,
        delegates: Vec<Box<dyn Delegate<S, A, E>>>,
        initial_effect: Option<Effect<E, A>>,
        config: StoreConfig,
    ) -> Result<Self, StoreError> {
        let runtime = config.runtime()?;
        let events = EventEmitter::new(config.events().cloned());
        let environment = Arc::new(environment);

        events.emit(|| StoreEvent::Initialization {
            initial_state: format!("{initial_state:?}"),
            environment: format!("{environment:?}"),
            has_initial_effect: initial_effect.is_some(),
        });

        // Subscribe before anything can change, so no member state is missed.
        let changes: Vec<_> = delegates.iter().map(|delegate| delegate.changes()).collect();

        let (state, _) = watch::channel(initial_state);
        let inner = Arc::new_cyclic(|weak: &Weak<DelegatingInner<S, A, E>>| {
            let dispatcher: Arc<dyn Dispatcher<A>> = Arc::new(DelegatingDispatcher {
                inner: Weak::clone(weak),
            });
            DelegatingInner {
                delegates,
                scheduler: EffectScheduler::new(
                    runtime.clone(),
                    Arc::clone(&environment),
                    dispatcher,
                    events.clone(),
                ),
                environment,
                state,
                dispatch_lock: Mutex::new(()),
                expansion_lock: Mutex::new(()),
                events,
                observers: Mutex::new(Vec::new()),
                shutdown: AtomicBool::new(false),
                shutdown_timeout: config.shutdown_timeout(),
            }
        });

        let observers = changes
            .into_iter()
            .enumerate()
            .map(|(index, mut changes)| {
                let weak = Arc::downgrade(&inner);
                runtime
                    .spawn(async move {
                        while let Some(expansion) = changes.next().await {
                            let Some(inner) = weak.upgrade() else {
                                break;
                            };
                            inner.expand(index, expansion);
                        }
                        tracing::trace!(delegate = index, "Delegate observer finished");
                    })
                    .abort_handle()
            })
            .collect();
        *inner.observers.lock().unwrap_or_else(PoisonError::into_inner) = observers;

        if let Some(effect) = initial_effect {
            tracing::debug!("Scheduling initial effect");
            let _guard = inner.expansion_lock.lock().unwrap_or_else(PoisonError::into_inner);
            inner.scheduler.schedule([effect]);
        }

        Ok(Self { inner })
    }

    /// Fan `action` out to every delegate, in order
    ///
    /// Each delegate finishes its own dispatch before the next one is
    /// entered. The composite state changes later, when the members' new
    /// states have been expanded.
    ///
    /// # Errors
    ///
    /// - The first delegate error; later delegates are not entered
    /// - [`StoreError::ShutdownInProgress`] if the composite is shutting down
    #[tracing::instrument(skip_all, name = "delegating_dispatch")]
    pub fn dispatch(&self, action: A) -> Result<(), StoreError> {
        self.inner.dispatch(&action)
    }

    /// The current composite state
    #[must_use]
    pub fn state(&self) -> S {
        self.inner.state.borrow().clone()
    }

    /// A `watch` receiver over the composite state
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.inner.state.subscribe()
    }

    /// The current composite state followed by every later one
    pub fn observe(&self) -> impl Stream<Item = S> + Send + 'static {
        state_stream(self.subscribe())
    }

    /// The composite's environment
    #[must_use]
    pub fn environment(&self) -> &E {
        &self.inner.environment
    }

    /// Number of composite-level effect executions still running
    #[must_use]
    pub fn running_effects(&self) -> usize {
        self.inner.scheduler.running()
    }

    /// Reject further dispatches, stop following members and wait for
    /// composite-level effects.
    ///
    /// Member changes are no longer expanded once this is called, so no new
    /// composite effect can start while the running ones drain. Members are
    /// independent stores and keep running; shut them down through their own
    /// handles.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] with the number of aborted
    /// effects if the timeout expired first.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        tracing::info!("Initiating graceful shutdown of delegating store");
        self.inner.shutdown.store(true, Ordering::Release);
        self.inner.stop_observers();
        self.inner.scheduler.drain(timeout).await
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

impl<S, A, E> DelegatingInner<S, A, E>
where
    S: Clone + fmt::Debug + Send + Sync + 'static,
    A: fmt::Debug + Send + 'static,
    E: fmt::Debug + Send + Sync + 'static,
{
    fn dispatch(&self, action: &A) -> Result<(), StoreError> {
        if self.shutdown.load(Ordering::Acquire) {
            tracing::warn!("Rejected action: delegating store is shutting down");
            return Err(StoreError::ShutdownInProgress);
        }

        let _guard = self.dispatch_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.events.emit(|| StoreEvent::Dispatch {
            action: format!("{action:?}"),
        });
        DispatchMetrics::record_forward();

        for (index, delegate) in self.delegates.iter().enumerate() {
            if let Err(error) = delegate.dispatch(action) {
                tracing::debug!(delegate = index, error = %error, "Delegate rejected action");
                DispatchMetrics::record_failure();
                return Err(error);
            }
        }
        Ok(())
    }

    /// Abort every observer, then wait out an expansion already in progress
    fn stop_observers(&self) {
        let observers = std::mem::take(&mut *self.observers.lock().unwrap_or_else(PoisonError::into_inner));
        for observer in &observers {
            observer.abort();
        }
        drop(self.expansion_lock.lock().unwrap_or_else(PoisonError::into_inner));
        tracing::debug!(observers = observers.len(), "Stopped delegate observers");
    }

    fn expand(&self, index: usize, expansion: Box<dyn Expansion<S, A, E>>) {
        let _guard = self.expansion_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.shutdown.load(Ordering::Acquire) {
            tracing::trace!(delegate = index, "Shutting down, expansion dropped");
            return;
        }

        let previous = self.state.borrow().clone();
        let delegate_state = self.events.is_enabled().then(|| expansion.describe());

        let mut ctx = Context::new(&*self.environment);
        let expanded = expansion.expand(&mut ctx, &previous);
        let effects = ctx.into_effects();
        tracing::trace!(delegate = index, effects = effects.len(), "Expanded delegate state");
        ExpansionMetrics::record_expansion();

        if let Some(delegate_state) = delegate_state {
            self.events.emit(|| StoreEvent::ExpandState {
                previous_state: format!("{previous:?}"),
                delegate_state,
                expanded_state: format!("{expanded:?}"),
            });
        }

        self.state.send_replace(expanded);
        self.scheduler.schedule(effects);
    }
}

impl<S, A, E> Drop for DelegatingInner<S, A, E> {
    fn drop(&mut self) {
        let observers = self.observers.get_mut().unwrap_or_else(PoisonError::into_inner);
        for observer in observers.drain(..) {
            observer.abort();
        }
    }
}

impl<S, A, E> Clone for DelegatingStore<S, A, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: fmt::Debug, A, E> fmt::Debug for DelegatingStore<S, A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegatingStore")
            .field("state", &*self.inner.state.borrow())
            .field("delegates", &self.inner.delegates.len())
            .finish_non_exhaustive()
    }
}

impl<S, A, E> StateStore for DelegatingStore<S, A, E>
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
