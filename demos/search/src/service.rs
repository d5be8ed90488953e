//! Services injected through feature environments
//!
//! Async services use explicit `Pin<Box<dyn Future>>` returns so they can be
//! used as trait objects inside an environment.

use regex::Regex;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{LazyLock, Mutex, PoisonError};
use std::time::Duration;

/// Loads the items matching a query
pub trait SearchRepository: Send + Sync {
    /// Items containing `query`, case-insensitively
    fn load_query_items(
        &self,
        query: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<String>>> + Send + '_>>;
}

/// In-memory repository over `Item 0` ..= `Item 100` with a fixed latency
#[derive(Debug, Clone)]
pub struct MockSearchRepository {
    items: Vec<String>,
    latency: Duration,
}

impl MockSearchRepository {
    /// Latency of every lookup unless overridden
    pub const DEFAULT_LATENCY: Duration = Duration::from_millis(500);

    /// Create a repository over the default items
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: (0..=100).map(|n| format!("Item {n}")).collect(),
            latency: Self::DEFAULT_LATENCY,
        }
    }

    /// Override the lookup latency
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

impl Default for MockSearchRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchRepository for MockSearchRepository {
    fn load_query_items(
        &self,
        query: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<String>>> + Send + '_>> {
        let needle = query.to_lowercase();
        Box::pin(async move {
            tokio::time::sleep(self.latency).await;
            Ok(self
                .items
                .iter()
                .filter(|item| item.to_lowercase().contains(&needle))
                .cloned()
                .collect::<Vec<_>>())
        })
    }
}

/// Checks login input before anything is sent to the backend
pub trait InputValidator: Send + Sync {
    /// Whether `email` looks like an email address
    fn validate_email(&self, email: &str) -> bool;
    /// Whether `password` is acceptable
    fn validate_password(&self, password: &str) -> bool;
}

#[allow(clippy::expect_used)] // literal pattern
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email pattern")
});

/// Regex email check; any non-empty password passes
#[derive(Debug, Clone, Copy, Default)]
pub struct MockInputValidator;

impl InputValidator for MockInputValidator {
    fn validate_email(&self, email: &str) -> bool {
        EMAIL_PATTERN.is_match(email)
    }

    fn validate_password(&self, password: &str) -> bool {
        !password.is_empty()
    }
}

/// Session token handed out by a successful authentication
#[derive(Clone, PartialEq, Eq)]
pub struct Token(pub String);

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

/// Exchanges credentials for a [`Token`]
pub trait AuthenticationService: Send + Sync {
    /// Authenticate `email` with `password`
    fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Token>> + Send + '_>>;
}

/// Accepts every credential after a fixed latency
#[derive(Debug, Clone)]
pub struct MockAuthenticationService {
    latency: Duration,
}

impl MockAuthenticationService {
    /// Latency of every authentication unless overridden
    pub const DEFAULT_LATENCY: Duration = Duration::from_secs(2);

    /// Create a service with the default latency
    #[must_use]
    pub const fn new() -> Self {
        Self {
            latency: Self::DEFAULT_LATENCY,
        }
    }

    /// Override the authentication latency
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

impl Default for MockAuthenticationService {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthenticationService for MockAuthenticationService {
    fn authenticate(
        &self,
        email: &str,
        _password: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Token>> + Send + '_>> {
        let token = Token(format!("user-{email}"));
        Box::pin(async move {
            tokio::time::sleep(self.latency).await;
            Ok(token)
        })
    }
}

/// Persists the session token
pub trait TokenRepository: Send + Sync {
    /// Store `token`, replacing any previous one
    fn store(&self, token: Token) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;
}

/// Keeps the last stored token in memory
#[derive(Debug, Default)]
pub struct MockTokenRepository {
    token: Mutex<Option<Token>>,
}

impl MockTokenRepository {
    /// Create an empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The last stored token
    #[must_use]
    pub fn token(&self) -> Option<Token> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl TokenRepository for MockTokenRepository {
    fn store(&self, token: Token) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token);
        Box::pin(async { Ok(()) })
    }
}
