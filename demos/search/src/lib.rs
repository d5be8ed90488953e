//! # Search Example
//!
//! A login screen and a debounced search demonstrating statefx.
//!
//! This example showcases:
//! - Keyed effects and the restart idiom (cancel, then launch by id)
//! - An injected async repository in the environment
//! - Composing feature reducers into one [`DelegatingStore`](statefx_runtime::DelegatingStore)
//! - Effects emitted while expanding a feature state
//! - A keyed effect that is never started twice while in flight (login)
//!
//! ## Example
//!
//! ```no_run
//! use search::search::{SearchAction, SearchEnvironment, SearchReducer, SearchState};
//! use search::service::MockSearchRepository;
//! use statefx_runtime::Store;
//!
//! # async fn example() -> Result<(), statefx_core::error::StoreError> {
//! let env = SearchEnvironment::from_env(MockSearchRepository::new());
//! let store = Store::new(SearchState::default(), SearchReducer, env)?;
//!
//! store.dispatch(SearchAction::QueryChanged("Item 4".into()))?;
//! assert!(store.state().loading);
//! # Ok(())
//! # }
//! ```

/// Navigation and search composed into the app store
pub mod app;

/// Validated login
pub mod login;

/// Navigation between screens
pub mod navigation;

/// Debounced search feature
pub mod search;

/// Injected services
pub mod service;
