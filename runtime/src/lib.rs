//! # Statefx Runtime
//!
//! Runtime implementation for statefx.
//!
//! This crate provides the stores that run reducers and the scheduler that
//! runs their effects.
//!
//! ## Core Components
//!
//! - **Store**: Owns state, reduces actions synchronously, publishes state
//! - **Effect Scheduler**: Launches executions, deduplicates and cancels them
//!   by [`EffectId`](statefx_core::effect::EffectId)
//! - **Delegating Store**: Composes independently running member stores into
//!   one logical store
//! - **Tracing Sink**: Reference [`EventSink`](statefx_core::event::EventSink)
//!   that logs lifecycle events
//!
//! ## Example
//!
//! ```
//! use statefx_core::reducer::{reducer_fn, Context};
//! use statefx_runtime::Store;
//! use std::time::Duration;
//!
//! #[derive(Clone, Debug, Default, PartialEq)]
//! struct Timer {
//!     ticks: u32,
//! }
//!
//! #[derive(Debug)]
//! enum TimerAction {
//!     Start,
//!     Tick,
//!     Stop,
//! }
//!
//! # #[tokio::main(flavor = "current_thread", start_paused = true)]
//! # async fn main() -> Result<(), statefx_core::error::StoreError> {
//! let reducer = reducer_fn(|state: &Timer, action, ctx: &mut Context<'_, (), TimerAction>| {
//!     match action {
//!         TimerAction::Start => ctx.effect_with_id("timer", |fx| async move {
//!             loop {
//!                 tokio::time::sleep(Duration::from_secs(1)).await;
//!                 fx.dispatch(TimerAction::Tick)?;
//!             }
//!         }),
//!         TimerAction::Tick => return Ok(Timer { ticks: state.ticks + 1 }),
//!         TimerAction::Stop => ctx.cancel_effect("timer"),
//!     }
//!     Ok(state.clone())
//! });
//!
//! let store = Store::new(Timer::default(), reducer, ())?;
//! store.dispatch(TimerAction::Start)?;
//! tokio::time::sleep(Duration::from_millis(3500)).await;
//! store.dispatch(TimerAction::Stop)?;
//! assert_eq!(store.state().ticks, 3);
//! # Ok(())
//! # }
//! ```

/// Store configuration
pub mod config;

/// Members of a delegating store
pub mod delegate;

/// Composite store over delegates
pub mod delegating;

/// Runtime event sinks
pub mod events;

/// Prometheus metrics for observability
pub mod metrics;

/// Effect scheduling and the running-execution registry
mod scheduler;

/// Store runtime for coordinating reducer execution and effect handling
pub mod store;

pub use config::StoreConfig;
pub use delegate::{Delegate, DelegateExt, Expansion, ReducerDelegateExt, StoreDelegate};
pub use delegating::DelegatingStore;
pub use events::TracingSink;
pub use statefx_core::error::StoreError;
pub use store::{StateStore, Store};
