//! Navigation between login, the search list and item details

use statefx_core::error::ReduceError;
use statefx_core::reducer::{Context, Reducer};

/// Screens of the app
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Route {
    /// The login screen
    #[default]
    Login,
    /// The search list
    Search,
    /// Details of one item
    Detail(String),
}

/// Navigation state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationState {
    /// Screen currently shown
    pub route: Route,
}

impl NavigationState {
    /// Whether `GoBack` is allowed
    #[must_use]
    pub const fn can_go_back(&self) -> bool {
        matches!(self.route, Route::Detail(_))
    }
}

/// Navigation actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationAction {
    /// Show `route`
    GoTo(Route),
    /// Return to the search list
    GoBack,
}

/// Navigation reducer
#[derive(Debug, Clone, Copy, Default)]
pub struct NavigationReducer;

impl Reducer for NavigationReducer {
    type State = NavigationState;
    type Action = NavigationAction;
    type Environment = ();

    fn reduce(
        &self,
        state: &NavigationState,
        action: NavigationAction,
        _ctx: &mut Context<'_, (), NavigationAction>,
    ) -> Result<NavigationState, ReduceError> {
        match action {
            NavigationAction::GoTo(route) => Ok(NavigationState { route }),
            NavigationAction::GoBack if state.can_go_back() => Ok(NavigationState {
                route: Route::Search,
            }),
            NavigationAction::GoBack => Err(ReduceError::rejected(format!(
                "cannot go back from {:?}",
                state.route
            ))),
        }
    }
}
