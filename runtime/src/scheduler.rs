//! Effect scheduling and the running-execution registry.
//!
//! The scheduler receives the effects of one reduction, in order, and turns
//! them into Tokio tasks. Keyed executions are tracked in an
//! [`ExecutionRegistry`] so they can be deduplicated and cancelled by id.

use crate::events::EventEmitter;
use crate::metrics::EffectMetrics;
use futures::FutureExt;
use statefx_core::effect::{Cancellation, Dispatcher, Effect, EffectBody, EffectContext, EffectId, Execution};
use statefx_core::error::StoreError;
use statefx_core::event::{EffectEvent, StoreEvent};
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::AbortHandle;

/// Sequence number of one launch; distinguishes successive executions that
/// share an id
pub(crate) type LaunchId = u64;

struct RunningExecution {
    id: Option<EffectId>,
    /// `None` between [`ExecutionRegistry::reserve`] and
    /// [`ExecutionRegistry::attach`]
    abort: Option<AbortHandle>,
}

#[derive(Default)]
struct Executions {
    next_launch: LaunchId,
    by_id: HashMap<EffectId, LaunchId>,
    running: HashMap<LaunchId, RunningExecution>,
}

/// In-flight executions of one scheduler.
///
/// Holds at most one entry per [`EffectId`]. Every mutation goes through a
/// single mutex.
pub(crate) struct ExecutionRegistry {
    executions: Mutex<Executions>,
    running: watch::Sender<usize>,
}

impl ExecutionRegistry {
    pub(crate) fn new() -> Self {
        let (running, _) = watch::channel(0);
        Self {
            executions: Mutex::new(Executions::default()),
            running,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Executions> {
        self.executions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish_count(&self, executions: &Executions) {
        self.running.send_replace(executions.running.len());
    }

    /// Reserve an entry unless `id` is already running.
    ///
    /// The task is spawned after the lock is released and attached with
    /// [`attach`](Self::attach); the entry already exists by then, so the task
    /// can always observe its own completion.
    pub(crate) fn reserve(&self, id: Option<&EffectId>) -> Option<LaunchId> {
        let mut executions = self.lock();
        if id.is_some_and(|id| executions.by_id.contains_key(id)) {
            return None;
        }

        let launch = executions.next_launch;
        executions.next_launch += 1;

        if let Some(id) = id {
            executions.by_id.insert(id.clone(), launch);
        }
        executions.running.insert(
            launch,
            RunningExecution {
                id: id.cloned(),
                abort: None,
            },
        );
        self.publish_count(&executions);
        Some(launch)
    }

    /// Attach the spawned task to its reserved entry.
    ///
    /// When the entry is already gone the launch was cancelled (or aborted by
    /// shutdown) before its task existed, so the task is aborted here.
    pub(crate) fn attach(&self, launch: LaunchId, abort: AbortHandle) {
        let mut executions = self.lock();
        match executions.running.get_mut(&launch) {
            Some(execution) => execution.abort = Some(abort),
            None => abort.abort(),
        }
    }

    /// Remove the entry of a finished launch.
    ///
    /// A no-op when the launch was already cancelled, so a successor that
    /// reused the id keeps its entry.
    pub(crate) fn complete(&self, launch: LaunchId) {
        let mut executions = self.lock();
        if let Some(finished) = executions.running.remove(&launch) {
            if let Some(id) = finished.id {
                if executions.by_id.get(&id) == Some(&launch) {
                    executions.by_id.remove(&id);
                }
            }
            self.publish_count(&executions);
        }
    }

    /// Abort the execution registered under `id`, returning whether one was
    /// running
    pub(crate) fn cancel(&self, id: &EffectId) -> bool {
        let mut executions = self.lock();
        let Some(launch) = executions.by_id.remove(id) else {
            return false;
        };
        if let Some(abort) = executions.running.remove(&launch).and_then(|cancelled| cancelled.abort) {
            abort.abort();
        }
        self.publish_count(&executions);
        true
    }

    /// Abort everything, returning how many executions were still running
    pub(crate) fn abort_all(&self) -> usize {
        let mut executions = self.lock();
        let count = executions.running.len();
        for abort in executions.running.drain().filter_map(|(_, execution)| execution.abort) {
            abort.abort();
        }
        executions.by_id.clear();
        self.publish_count(&executions);
        count
    }

    pub(crate) fn is_running(&self, id: &EffectId) -> bool {
        self.lock().by_id.contains_key(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().running.len()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<usize> {
        self.running.subscribe()
    }
}

/// Frees a registry entry however the task ends (completion, error, panic
/// or abort)
struct CompletionGuard {
    registry: Arc<ExecutionRegistry>,
    launch: LaunchId,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.registry.complete(self.launch);
    }
}

/// Applies effect batches for one store.
///
/// Dropping the scheduler aborts every execution it launched.
pub(crate) struct EffectScheduler<E, A> {
    registry: Arc<ExecutionRegistry>,
    runtime: Handle,
    environment: Arc<E>,
    dispatcher: Arc<dyn Dispatcher<A>>,
    events: EventEmitter,
}

impl<E, A> EffectScheduler<E, A>
where
    E: Send + Sync + 'static,
    A: Send + 'static,
{
    pub(crate) fn new(
        runtime: Handle,
        environment: Arc<E>,
        dispatcher: Arc<dyn Dispatcher<A>>,
        events: EventEmitter,
    ) -> Self {
        Self {
            registry: Arc::new(ExecutionRegistry::new()),
            runtime,
            environment,
            dispatcher,
            events,
        }
    }

    /// Apply one batch, in order
    pub(crate) fn schedule<I>(&self, effects: I)
    where
        I: IntoIterator<Item = Effect<E, A>>,
    {
        for effect in effects {
            match effect {
                Effect::Cancellation(cancellation) => self.cancel(cancellation),
                Effect::Execution(execution) => self.launch(execution),
            }
        }
    }

    fn cancel(&self, cancellation: Cancellation) {
        for id in cancellation.into_ids() {
            if self.registry.cancel(&id) {
                tracing::debug!(effect = ?id, "Cancelled running effect");
                EffectMetrics::record_cancel();
                self.events.emit(|| StoreEvent::cancel(id));
            } else {
                tracing::trace!(effect = ?id, "Effect not running, cancellation ignored");
            }
        }
    }

    fn launch(&self, execution: Execution<E, A>) {
        let (id, body) = execution.into_parts();

        let Some(launch) = self.registry.reserve(id.as_ref()) else {
            tracing::debug!(effect = ?id, "Effect already running, launch skipped");
            EffectMetrics::record_skip();
            return;
        };

        self.events.emit(|| StoreEvent::launch(id.clone()));
        let context = EffectContext::new(Arc::clone(&self.environment), Arc::clone(&self.dispatcher));
        let task = run_execution(
            Arc::clone(&self.registry),
            self.events.clone(),
            launch,
            id.clone(),
            body,
            context,
        );
        let abort = self.runtime.spawn(task).abort_handle();
        self.registry.attach(launch, abort);

        tracing::trace!(effect = ?id, "Launched effect");
        EffectMetrics::record_launch();
    }

    /// Number of executions still running
    pub(crate) fn running(&self) -> usize {
        self.registry.len()
    }

    /// Whether an execution with `id` is running
    pub(crate) fn is_running(&self, id: &EffectId) -> bool {
        self.registry.is_running(id)
    }

    /// Wait up to `timeout` for every execution to finish, then abort the rest.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] with the number of executions
    /// that had to be aborted.
    pub(crate) async fn drain(&self, timeout: Duration) -> Result<(), StoreError> {
        let mut running = self.registry.subscribe();
        let finished = tokio::time::timeout(timeout, async move {
            // The sender lives as long as the registry, which we hold.
            let _ = running.wait_for(|count| *count == 0).await;
        })
        .await;

        match finished {
            Ok(()) => Ok(()),
            Err(_) => {
                let aborted = self.registry.abort_all();
                tracing::error!(pending_effects = aborted, "Shutdown timeout, aborting effects");
                Err(StoreError::ShutdownTimeout(aborted))
            },
        }
    }
}

impl<E, A> Drop for EffectScheduler<E, A> {
    fn drop(&mut self) {
        let aborted = self.registry.abort_all();
        if aborted > 0 {
            tracing::debug!(aborted, "Store dropped, aborted running effects");
        }
    }
}

/// Body of one spawned execution.
///
/// The body closure is only invoked here, inside the task, so nothing it does
/// runs on the dispatching thread.
async fn run_execution<E, A>(
    registry: Arc<ExecutionRegistry>,
    events: EventEmitter,
    launch: LaunchId,
    id: Option<EffectId>,
    body: EffectBody<E, A>,
    context: EffectContext<E, A>,
) {
    let _guard = CompletionGuard { registry, launch };

    let execution = async move { body(context).await };
    let error = match AssertUnwindSafe(execution).catch_unwind().await {
        Ok(Ok(())) => {
            tracing::trace!(effect = ?id, "Effect completed");
            return;
        },
        Ok(Err(error)) => format!("{error:#}"),
        Err(panic) => panic_message(panic.as_ref()),
    };

    tracing::warn!(effect = ?id, error = %error, "Effect failed");
    EffectMetrics::record_failure();
    events.emit(|| StoreEvent::Effect(EffectEvent::Failure { id, error }));
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_string()
    }
}
