//! Validated login
//!
//! Email and password are validated as they are entered. `Authenticate` only
//! starts a backend call when both are valid, and a call already in flight is
//! never started twice.

use crate::service::{
    AuthenticationService, InputValidator, MockAuthenticationService, MockInputValidator, MockTokenRepository,
    TokenRepository,
};
use statefx_core::error::ReduceError;
use statefx_core::reducer::{Context, Reducer};
use std::fmt;
use std::sync::Arc;

/// Identity of the in-flight authentication
pub const AUTHENTICATE_EFFECT: &str = "authenticate";

/// Dependencies of the login reducer
#[derive(Clone)]
pub struct LoginEnvironment {
    /// Input checks
    pub validator: Arc<dyn InputValidator>,
    /// Credential exchange
    pub authentication: Arc<dyn AuthenticationService>,
    /// Where the session token goes
    pub tokens: Arc<dyn TokenRepository>,
}

impl LoginEnvironment {
    /// Environment over the given services
    pub fn new(
        validator: impl InputValidator + 'static,
        authentication: impl AuthenticationService + 'static,
        tokens: Arc<dyn TokenRepository>,
    ) -> Self {
        Self {
            validator: Arc::new(validator),
            authentication: Arc::new(authentication),
            tokens,
        }
    }

    /// Environment over the in-memory services
    #[must_use]
    pub fn mock() -> Self {
        Self::new(
            MockInputValidator,
            MockAuthenticationService::new(),
            Arc::new(MockTokenRepository::new()),
        )
    }
}

impl fmt::Debug for LoginEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginEnvironment").finish_non_exhaustive()
    }
}

/// A password that never shows up in logs or events
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Password(pub String);

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

impl From<&str> for Password {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Login actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginAction {
    /// The user edited the email field
    EmailEntered(String),
    /// The user edited the password field
    PasswordEntered(Password),
    /// The user asked to log in
    Authenticate,
    /// The backend accepted the credentials and the token was stored
    AuthenticationSucceeded,
    /// The backend rejected the credentials or could not be reached
    AuthenticationFailed,
}

/// Progress of the authentication
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Authentication {
    /// Nothing attempted since the last edit
    #[default]
    Uninitialized,
    /// Backend call in flight
    Loading,
    /// Logged in
    Success,
    /// Last attempt failed
    Failure,
}

/// Login state
///
/// Validity fields are `None` until the corresponding field was entered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginState {
    /// Entered email
    pub email: Option<String>,
    /// Whether the entered email is valid
    pub email_valid: Option<bool>,
    /// Entered password
    pub password: Option<Password>,
    /// Whether the entered password is valid
    pub password_valid: Option<bool>,
    /// Authentication progress
    pub authentication: Authentication,
}

impl LoginState {
    /// Whether both fields hold valid input
    #[must_use]
    pub fn can_log_in(&self) -> bool {
        self.email_valid == Some(true) && self.password_valid == Some(true)
    }

    /// Whether the last authentication succeeded
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authentication == Authentication::Success
    }
}

/// Login reducer
#[derive(Debug, Clone, Copy, Default)]
pub struct LoginReducer;

impl Reducer for LoginReducer {
    type State = LoginState;
    type Action = LoginAction;
    type Environment = LoginEnvironment;

    fn reduce(
        &self,
        state: &LoginState,
        action: LoginAction,
        ctx: &mut Context<'_, LoginEnvironment, LoginAction>,
    ) -> Result<LoginState, ReduceError> {
        match action {
            LoginAction::EmailEntered(email) => Ok(LoginState {
                email_valid: Some(ctx.environment().validator.validate_email(&email)),
                email: Some(email),
                authentication: Authentication::Uninitialized,
                ..state.clone()
            }),
            LoginAction::PasswordEntered(password) => Ok(LoginState {
                password_valid: Some(ctx.environment().validator.validate_password(&password.0)),
                password: Some(password),
                authentication: Authentication::Uninitialized,
                ..state.clone()
            }),
            LoginAction::Authenticate => {
                let (Some(email), Some(password)) = (state.email.clone(), state.password.clone()) else {
                    return Ok(state.clone());
                };
                if !state.can_log_in() {
                    return Ok(state.clone());
                }

                ctx.effect_with_id(AUTHENTICATE_EFFECT, move |fx| async move {
                    let env = fx.environment();
                    let outcome = match env.authentication.authenticate(&email, &password.0).await {
                        Ok(token) => env.tokens.store(token).await,
                        Err(error) => Err(error),
                    };
                    let action = match outcome {
                        Ok(()) => LoginAction::AuthenticationSucceeded,
                        Err(error) => {
                            tracing::warn!(error = %format!("{error:#}"), "Authentication failed");
                            LoginAction::AuthenticationFailed
                        },
                    };
                    fx.dispatch(action)?;
                    Ok(())
                });

                Ok(LoginState {
                    authentication: Authentication::Loading,
                    ..state.clone()
                })
            },
            LoginAction::AuthenticationSucceeded => Ok(LoginState {
                authentication: Authentication::Success,
                ..state.clone()
            }),
            LoginAction::AuthenticationFailed => Ok(LoginState {
                authentication: Authentication::Failure,
                ..state.clone()
            }),
        }
    }
}
