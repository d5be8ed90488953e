//! Store lifecycle events and the sink that observes them.
//!
//! Events are emitted synchronously at the point they happen and carry
//! `Debug` renderings of the values involved. A sink is purely observational:
//! it cannot fail or alter the operation that emitted the event.

use crate::effect::EffectId;
use std::fmt;

/// Lifecycle events of an effect execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectEvent {
    /// An execution was spawned
    Launch {
        /// Identity of the execution, if keyed
        id: Option<EffectId>,
    },

    /// A running execution was cancelled
    Cancel {
        /// Identity of the cancelled execution
        id: EffectId,
    },

    /// An execution returned an error or panicked
    Failure {
        /// Identity of the failed execution, if keyed
        id: Option<EffectId>,
        /// Rendered error
        error: String,
    },
}

/// All events emitted by a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// The store was created
    Initialization {
        /// Initial state
        initial_state: String,
        /// The store's environment
        environment: String,
        /// Whether an initial effect was scheduled
        has_initial_effect: bool,
    },

    /// An action entered `dispatch`
    Dispatch {
        /// The dispatched action
        action: String,
    },

    /// A reducer produced a new state
    Reduce {
        /// State before the action
        previous_state: String,
        /// The reduced action
        action: String,
        /// State after the action
        new_state: String,
    },

    /// A composite store folded a delegate's state into its own
    ExpandState {
        /// Composite state before expansion
        previous_state: String,
        /// The delegate state that triggered it
        delegate_state: String,
        /// Composite state after expansion
        expanded_state: String,
    },

    /// An effect lifecycle event
    Effect(EffectEvent),
}

impl StoreEvent {
    /// Shorthand for [`EffectEvent::Launch`]
    #[must_use]
    pub const fn launch(id: Option<EffectId>) -> Self {
        Self::Effect(EffectEvent::Launch { id })
    }

    /// Shorthand for [`EffectEvent::Cancel`]
    #[must_use]
    pub const fn cancel(id: EffectId) -> Self {
        Self::Effect(EffectEvent::Cancel { id })
    }

    /// Short tag naming the kind of event (`init`, `dispatch`, ...)
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Initialization { .. } => "init",
            Self::Dispatch { .. } => "dispatch",
            Self::Reduce { .. } => "reduce",
            Self::ExpandState { .. } => "expansion",
            Self::Effect(EffectEvent::Launch { .. }) => "launch",
            Self::Effect(EffectEvent::Cancel { .. }) => "cancel",
            Self::Effect(EffectEvent::Failure { .. }) => "failure",
        }
    }
}

impl fmt::Display for StoreEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind();
        match self {
            Self::Initialization {
                initial_state,
                environment,
                has_initial_effect,
            } => write!(
                f,
                "{kind} > (initial_state={initial_state}, environment={environment}, \
                 initial_effect={has_initial_effect})"
            ),
            Self::Dispatch { action } => write!(f, "{kind} > {action}"),
            Self::Reduce {
                previous_state,
                action,
                new_state,
            } => write!(f, "{kind} > ({previous_state}, {action}) -> {new_state}"),
            Self::ExpandState {
                previous_state,
                delegate_state,
                expanded_state,
            } => write!(
                f,
                "{kind} > ({previous_state}, {delegate_state}) -> {expanded_state}"
            ),
            Self::Effect(EffectEvent::Launch { id: Some(id) }) => {
                write!(f, "{kind} > effect: {id:?}")
            },
            Self::Effect(EffectEvent::Launch { id: None }) => write!(f, "{kind} > effect"),
            Self::Effect(EffectEvent::Cancel { id }) => write!(f, "{kind} > effect: {id:?}"),
            Self::Effect(EffectEvent::Failure { id: Some(id), error }) => {
                write!(f, "{kind} > effect: {id:?}: {error}")
            },
            Self::Effect(EffectEvent::Failure { id: None, error }) => {
                write!(f, "{kind} > effect: {error}")
            },
        }
    }
}

/// Receives [`StoreEvent`]s.
///
/// Called synchronously from inside the store's critical sections, so
/// implementations must be quick and must not dispatch into the store they
/// observe.
pub trait EventSink: Send + Sync {
    /// Observe one event
    fn emit(&self, event: &StoreEvent);
}

impl<F> EventSink for F
where
    F: Fn(&StoreEvent) + Send + Sync,
{
    fn emit(&self, event: &StoreEvent) {
        self(event);
    }
}
