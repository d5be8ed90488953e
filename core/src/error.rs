//! Error types shared by reducers and stores

use thiserror::Error;

/// A reducer refused to produce a new state.
///
/// Returning this from [`Reducer::reduce`](crate::reducer::Reducer::reduce)
/// fails the dispatch call that triggered it. The store keeps its previous
/// state and schedules none of the effects added during that reduction.
#[derive(Error, Debug)]
pub enum ReduceError {
    /// The action is not valid for the current state
    #[error("action rejected: {0}")]
    Rejected(String),

    /// Any other failure raised while reducing
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReduceError {
    /// Convenience constructor for [`ReduceError::Rejected`]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }
}

/// Errors that can occur during Store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// The reducer failed; state is unchanged
    #[error("reducer failed: {0}")]
    Reduce(#[from] ReduceError),

    /// No Tokio runtime was available to run effects
    ///
    /// Stores capture a runtime handle at construction, either from
    /// the configuration or from the ambient runtime context.
    #[error("no Tokio runtime available to execute effects")]
    NoRuntime,

    /// The store behind a dispatcher no longer exists
    ///
    /// Returned when an effect outlives its store and tries to dispatch.
    #[error("store has been dropped")]
    StoreDropped,

    /// Store is shutting down and not accepting new actions
    ///
    /// This error is returned when `dispatch()` is called after shutdown initiated.
    #[error("Store is shutting down")]
    ShutdownInProgress,

    /// Shutdown timed out waiting for effects to complete
    ///
    /// The remaining effects were aborted.
    #[error("Shutdown timed out with {0} effects still running")]
    ShutdownTimeout(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduce_errors_render_their_reason() {
        let error = StoreError::from(ReduceError::rejected("cart is empty"));
        assert_eq!(error.to_string(), "reducer failed: action rejected: cart is empty");
    }

    #[test]
    fn shutdown_timeout_reports_pending_count() {
        assert_eq!(
            StoreError::ShutdownTimeout(3).to_string(),
            "Shutdown timed out with 3 effects still running"
        );
    }
}
