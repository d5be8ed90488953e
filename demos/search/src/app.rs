//! The app: navigation, login and search composed into one delegating store
//!
//! Two decisions are made while expanding feature states and run as
//! app-level effects: a successful login moves to the search screen, and a
//! lookup that yields exactly one item opens its detail screen.

use crate::login::{LoginAction, LoginEnvironment, LoginReducer, LoginState};
use crate::navigation::{NavigationAction, NavigationReducer, NavigationState, Route};
use crate::search::{SearchAction, SearchEnvironment, SearchReducer, SearchState};
use statefx_core::error::StoreError;
use statefx_core::reducer::ExpandContext;
use statefx_core::scope_action;
use statefx_runtime::{Delegate, DelegateExt, DelegatingStore, ReducerDelegateExt, Store, StoreConfig};

/// Identity of the navigation effect that follows a successful login
pub const NAVIGATE_TO_SEARCH: &str = "navigate_to_search";

/// Identity of the automatic navigation effect
pub const NAVIGATE_TO_DETAIL: &str = "navigate_to_detail";

/// App actions, one variant per feature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    /// Forwarded to navigation
    Navigation(NavigationAction),
    /// Forwarded to login
    Login(LoginAction),
    /// Forwarded to search
    Search(SearchAction),
}

/// App state, expanded from the feature states
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    /// Navigation state
    pub navigation: NavigationState,
    /// Login state
    pub login: LoginState,
    /// Search state
    pub search: SearchState,
}

/// The app store
pub type AppStore = DelegatingStore<AppState, AppAction, ()>;

/// Build the app store
///
/// Navigation and search run as reducers owned by the app; login runs as its
/// own store that the app delegates to.
///
/// # Errors
///
/// Returns [`StoreError::NoRuntime`] when called outside a Tokio runtime.
pub fn app_store(login: LoginEnvironment, search: SearchEnvironment, config: StoreConfig) -> Result<AppStore, StoreError> {
    let login_store = Store::new(LoginState::default(), LoginReducer, login)?;

    let delegates: Vec<Box<dyn Delegate<AppState, AppAction, ()>>> = vec![
        ReducerDelegateExt::delegate(
            NavigationReducer,
            NavigationState::default(),
            (),
            scope_action!(AppAction::Navigation),
            |_ctx, app: &AppState, navigation: &NavigationState| AppState {
                navigation: navigation.clone(),
                ..app.clone()
            },
        )?,
        login_store.delegate(scope_action!(AppAction::Login), expand_login),
        ReducerDelegateExt::delegate(
            SearchReducer,
            SearchState::default(),
            search,
            scope_action!(AppAction::Search),
            expand_search,
        )?,
    ];

    DelegatingStore::with_config(AppState::default(), (), delegates, config)
}

fn expand_login(ctx: &mut ExpandContext<'_, (), AppAction>, app: &AppState, login: &LoginState) -> AppState {
    if login.is_authenticated() && !app.login.is_authenticated() {
        ctx.effect_with_id(NAVIGATE_TO_SEARCH, |fx| async move {
            fx.dispatch(AppAction::Navigation(NavigationAction::GoTo(Route::Search)))?;
            Ok(())
        });
    }

    AppState {
        login: login.clone(),
        ..app.clone()
    }
}

fn expand_search(ctx: &mut ExpandContext<'_, (), AppAction>, app: &AppState, search: &SearchState) -> AppState {
    let finished_loading = app.search.loading && !search.loading;
    if let [item] = search.items.as_slice() {
        if finished_loading && app.navigation.route == Route::Search {
            let route = Route::Detail(item.clone());
            ctx.effect_with_id(NAVIGATE_TO_DETAIL, move |fx| async move {
                fx.dispatch(AppAction::Navigation(NavigationAction::GoTo(route)))?;
                Ok(())
            });
        }
    }

    AppState {
        search: search.clone(),
        ..app.clone()
    }
}
