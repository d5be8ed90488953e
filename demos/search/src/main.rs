//! Search example binary
//!
//! Simulates a user logging in and typing a query, waits for the debounced
//! lookup and prints the resulting app state.

use search::app::{AppAction, app_store};
use search::login::{LoginAction, LoginEnvironment};
use search::navigation::NavigationAction;
use search::search::{SearchAction, SearchEnvironment};
use search::service::{MockAuthenticationService, MockSearchRepository};
use statefx_runtime::metrics::install_prometheus_recorder;
use statefx_runtime::{StoreConfig, TracingSink};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "search=debug,statefx_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let metrics = install_prometheus_recorder()?;

    println!("=== Search Example: statefx ===\n");

    let env = SearchEnvironment::from_env(MockSearchRepository::new());
    let debounce = env.debounce;
    println!("Debounce window: {debounce:?}");

    let config = StoreConfig::default().with_events(TracingSink::new("app"));
    let store = app_store(LoginEnvironment::mock(), env, config)?;

    println!(">>> Logging in");
    store.dispatch(AppAction::Login(LoginAction::EmailEntered("user@example.com".into())))?;
    store.dispatch(AppAction::Login(LoginAction::PasswordEntered("secret".into())))?;
    store.dispatch(AppAction::Login(LoginAction::Authenticate))?;
    // A second attempt while the first is in flight is skipped
    store.dispatch(AppAction::Login(LoginAction::Authenticate))?;
    tokio::time::sleep(MockAuthenticationService::DEFAULT_LATENCY + Duration::from_millis(100)).await;
    println!("Route after login: {:?}\n", store.state().navigation.route);

    // Type "Item 42" one keystroke at a time, faster than the debounce
    let mut query = String::new();
    for key in "Item 42".chars() {
        query.push(key);
        println!(">>> Typing: {query:?}");
        store.dispatch(AppAction::Search(SearchAction::QueryChanged(query.clone())))?;
        tokio::time::sleep(debounce / 3).await;
    }

    // Debounce plus repository latency
    tokio::time::sleep(debounce + MockSearchRepository::DEFAULT_LATENCY + Duration::from_millis(100)).await;

    let state = store.state();
    println!("\nQuery: {:?}", state.search.query);
    println!("Items: {:?}", state.search.items);
    println!("Route: {:?}", state.navigation.route);

    if state.navigation.can_go_back() {
        println!("\n>>> Going back");
        store.dispatch(AppAction::Navigation(NavigationAction::GoBack))?;
    }

    println!("\n>>> Resetting query");
    store.dispatch(AppAction::Search(SearchAction::ResetQuery))?;
    tokio::time::sleep(Duration::from_millis(10)).await;
    println!("State: {:?}", store.state());

    store.shutdown_gracefully().await?;

    if let Some(handle) = metrics {
        println!("\n=== Metrics ===\n{}", handle.render());
    }

    Ok(())
}
