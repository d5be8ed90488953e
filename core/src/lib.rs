//! # Statefx Core
//!
//! Core traits and types for statefx, a unidirectional state-and-effect
//! coordination engine.
//!
//! ## Core Concepts
//!
//! - **State**: Immutable snapshot owned by a store, replaced on every action
//! - **Action**: Discrete input dispatched into a store
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: An async [`Execution`](effect::Execution) or a
//!   [`Cancellation`](effect::Cancellation), optionally keyed by an
//!   [`EffectId`](effect::EffectId)
//! - **Environment**: Constant dependency bundle shared with reducers and effects
//! - **Store events**: Observational records emitted to an [`EventSink`](event::EventSink)
//!
//! This crate only describes work. The runtime crate owns the stores that
//! reduce actions and the scheduler that runs effects.
//!
//! ## Example
//!
//! ```
//! use statefx_core::prelude::*;
//!
//! #[derive(Clone, Debug, Default, PartialEq)]
//! struct SearchState {
//!     query: String,
//!     loading: bool,
//! }
//!
//! #[derive(Clone, Debug)]
//! enum SearchAction {
//!     QueryChanged(String),
//!     Loaded(Vec<String>),
//! }
//!
//! let reducer = reducer_fn(
//!     |state: &SearchState, action: SearchAction, ctx: &mut Context<'_, (), SearchAction>| {
//!         match action {
//!             SearchAction::QueryChanged(query) => {
//!                 ctx.cancel_effect("search");
//!                 ctx.effect_with_id("search", |fx| async move {
//!                     fx.dispatch(SearchAction::Loaded(vec![]))?;
//!                     Ok(())
//!                 });
//!                 Ok(SearchState { query, loading: true })
//!             },
//!             SearchAction::Loaded(_) => Ok(SearchState { loading: false, ..state.clone() }),
//!         }
//!     },
//! );
//!
//! let mut ctx = Context::new(&());
//! let state = reducer
//!     .reduce(&SearchState::default(), SearchAction::QueryChanged("rust".into()), &mut ctx)
//!     .ok();
//! assert_eq!(state.map(|s| s.loading), Some(true));
//! assert_eq!(ctx.effects().len(), 2);
//! ```

/// Reducer composition utilities
pub mod composition;

/// Effect descriptions and identities
pub mod effect;

/// Declarative macros for effect construction
pub mod effect_macros;

/// Error types
pub mod error;

/// Store lifecycle events and sinks
pub mod event;

/// Reducer trait and its effect-collecting context
pub mod reducer;

/// Commonly used items
pub mod prelude {
    pub use crate::effect::{Cancellation, Dispatcher, Effect, EffectContext, EffectId, Execution};
    pub use crate::error::{ReduceError, StoreError};
    pub use crate::event::{EffectEvent, EventSink, StoreEvent};
    pub use crate::reducer::{Context, EmptyReducer, ExpandContext, Reducer, reducer_fn};
}

pub use smallvec::{SmallVec, smallvec};
