//! Store configuration

use statefx_core::error::StoreError;
use statefx_core::event::EventSink;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

/// Configuration for [`Store`](crate::Store) and
/// [`DelegatingStore`](crate::DelegatingStore) instances
///
/// # Example
///
/// ```
/// use statefx_runtime::{StoreConfig, TracingSink};
/// use std::time::Duration;
///
/// let config = StoreConfig::default()
///     .with_events(TracingSink::new("search"))
///     .with_shutdown_timeout(Duration::from_secs(5));
///
/// assert!(config.events().is_some());
/// assert_eq!(config.shutdown_timeout(), Duration::from_secs(5));
/// ```
#[derive(Clone)]
pub struct StoreConfig {
    events: Option<Arc<dyn EventSink>>,
    runtime: Option<Handle>,
    shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Default timeout used by `shutdown_gracefully`
    pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

    /// Report lifecycle events to `sink`
    #[must_use]
    pub fn with_events(self, sink: impl EventSink + 'static) -> Self {
        self.with_event_sink(Arc::new(sink))
    }

    /// Report lifecycle events to a shared sink
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    /// Run effects on `runtime` instead of the ambient one
    #[must_use]
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Set the default shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// The configured event sink, if any
    #[must_use]
    pub fn events(&self) -> Option<&Arc<dyn EventSink>> {
        self.events.as_ref()
    }

    /// The default shutdown timeout
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// The runtime effects will be spawned on.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoRuntime`] when no runtime was configured and
    /// the caller is not inside a Tokio runtime.
    pub fn runtime(&self) -> Result<Handle, StoreError> {
        match &self.runtime {
            Some(handle) => Ok(handle.clone()),
            None => Handle::try_current().map_err(|_| StoreError::NoRuntime),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            events: None,
            runtime: None,
            shutdown_timeout: Self::DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("events", &self.events.is_some())
            .field("runtime", &self.runtime.is_some())
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish()
    }
}
