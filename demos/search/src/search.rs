//! Debounced search feature
//!
//! Every `QueryChanged` cancels the pending lookup and starts a new one that
//! first waits out the debounce window, so a burst of keystrokes produces a
//! single repository call for the final query.

use crate::service::SearchRepository;
use statefx_core::error::ReduceError;
use statefx_core::reducer::{Context, Reducer};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Identity of the in-flight lookup
pub const SEARCH_EFFECT: &str = "search";

/// Debounce window used when `SEARCH_DEBOUNCE_MS` is unset or invalid
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Environment variable overriding the debounce window, in milliseconds
pub const DEBOUNCE_ENV: &str = "SEARCH_DEBOUNCE_MS";

/// Dependencies of the search reducer
#[derive(Clone)]
pub struct SearchEnvironment {
    /// Where items come from
    pub repository: Arc<dyn SearchRepository>,
    /// Quiet period after the last keystroke before searching
    pub debounce: Duration,
}

impl SearchEnvironment {
    /// Environment with the default debounce window
    pub fn new(repository: impl SearchRepository + 'static) -> Self {
        Self {
            repository: Arc::new(repository),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    /// Environment whose debounce window is read from `SEARCH_DEBOUNCE_MS`
    pub fn from_env(repository: impl SearchRepository + 'static) -> Self {
        Self::new(repository).with_debounce(debounce_from_env())
    }

    /// Override the debounce window
    #[must_use]
    pub const fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

impl fmt::Debug for SearchEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchEnvironment")
            .field("debounce", &self.debounce)
            .finish_non_exhaustive()
    }
}

/// Read the debounce window from `SEARCH_DEBOUNCE_MS`
#[must_use]
pub fn debounce_from_env() -> Duration {
    parse_debounce(std::env::var(DEBOUNCE_ENV).ok().as_deref())
}

fn parse_debounce(value: Option<&str>) -> Duration {
    match value.map(str::parse::<u64>) {
        Some(Ok(millis)) => Duration::from_millis(millis),
        Some(Err(error)) => {
            tracing::warn!(%error, "Invalid {DEBOUNCE_ENV}, using default");
            DEFAULT_DEBOUNCE
        },
        None => DEFAULT_DEBOUNCE,
    }
}

/// Search actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchAction {
    /// The user edited the query
    QueryChanged(String),
    /// The lookup for the current query finished
    ItemsLoaded(Vec<String>),
    /// The lookup for the current query failed
    LoadFailed(String),
    /// The user cleared the query
    ResetQuery,
}

/// Search state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    /// Current query text
    pub query: String,
    /// Items matching the last completed lookup
    pub items: Vec<String>,
    /// Whether a lookup is pending
    pub loading: bool,
    /// Message of the last failed lookup
    pub error: Option<String>,
}

/// Search reducer
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchReducer;

impl Reducer for SearchReducer {
    type State = SearchState;
    type Action = SearchAction;
    type Environment = SearchEnvironment;

    fn reduce(
        &self,
        state: &SearchState,
        action: SearchAction,
        ctx: &mut Context<'_, SearchEnvironment, SearchAction>,
    ) -> Result<SearchState, ReduceError> {
        match action {
            SearchAction::QueryChanged(query) => {
                let debounce = ctx.environment().debounce;
                let lookup = query.clone();

                ctx.cancel_effect(SEARCH_EFFECT);
                ctx.effect_with_id(SEARCH_EFFECT, move |fx| async move {
                    tokio::time::sleep(debounce).await;
                    tracing::debug!(query = %lookup, "Loading items");
                    let action = match fx.environment().repository.load_query_items(&lookup).await {
                        Ok(items) => SearchAction::ItemsLoaded(items),
                        Err(error) => SearchAction::LoadFailed(format!("{error:#}")),
                    };
                    fx.dispatch(action)?;
                    Ok(())
                });

                Ok(SearchState {
                    query,
                    loading: true,
                    ..state.clone()
                })
            },
            SearchAction::ItemsLoaded(items) => Ok(SearchState {
                items,
                loading: false,
                error: None,
                ..state.clone()
            }),
            SearchAction::LoadFailed(error) => Ok(SearchState {
                loading: false,
                error: Some(error),
                ..state.clone()
            }),
            SearchAction::ResetQuery => {
                // Drop any lookup still in flight for the old query
                ctx.cancel_effect(SEARCH_EFFECT);
                Ok(SearchState::default())
            },
        }
    }
}
