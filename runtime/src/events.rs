//! Event sinks provided by the runtime.

use statefx_core::event::{EffectEvent, EventSink, StoreEvent};
use std::sync::Arc;

/// Logs every [`StoreEvent`] through `tracing`.
///
/// Events are recorded at `debug` level with the sink's tag as a field;
/// effect failures are raised to `warn`.
///
/// ```
/// use statefx_runtime::{StoreConfig, TracingSink};
///
/// let config = StoreConfig::default().with_events(TracingSink::new("search"));
/// # let _ = config;
/// ```
#[derive(Debug, Clone)]
pub struct TracingSink {
    tag: String,
}

impl TracingSink {
    /// Create a sink that labels every line with `tag`
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    /// The tag attached to each event
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl EventSink for TracingSink {
    fn emit(&self, event: &StoreEvent) {
        if let StoreEvent::Effect(EffectEvent::Failure { .. }) = event {
            tracing::warn!(tag = %self.tag, kind = event.kind(), "{event}");
        } else {
            tracing::debug!(tag = %self.tag, kind = event.kind(), "{event}");
        }
    }
}

/// Optional sink shared by a store and its scheduler.
///
/// Events are built lazily so a store without a sink never pays for the
/// `Debug` renderings.
#[derive(Clone, Default)]
pub(crate) struct EventEmitter {
    sink: Option<Arc<dyn EventSink>>,
}

impl EventEmitter {
    pub(crate) const fn new(sink: Option<Arc<dyn EventSink>>) -> Self {
        Self { sink }
    }

    pub(crate) const fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub(crate) fn emit(&self, event: impl FnOnce() -> StoreEvent) {
        if let Some(sink) = &self.sink {
            sink.emit(&event());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn captured(f: impl FnOnce()) -> String {
        let buffer = Buffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, f);

        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn tracing_sink_logs_tagged_lines() {
        let sink = TracingSink::new("counter");
        let output = captured(|| {
            sink.emit(&StoreEvent::Dispatch {
                action: "Increment".into(),
            });
        });

        assert!(output.contains("DEBUG"));
        assert!(output.contains("tag=counter"));
        assert!(output.contains("dispatch > Increment"));
    }

    #[test]
    fn tracing_sink_warns_on_failures() {
        let sink = TracingSink::new("search");
        let output = captured(|| {
            sink.emit(&StoreEvent::Effect(EffectEvent::Failure {
                id: None,
                error: "connection reset".into(),
            }));
        });

        assert!(output.contains("WARN"));
        assert!(output.contains("connection reset"));
    }

    #[test]
    fn emitter_skips_rendering_without_sink() {
        let emitter = EventEmitter::default();
        let mut rendered = false;
        emitter.emit(|| {
            rendered = true;
            StoreEvent::launch(None)
        });

        assert!(!emitter.is_enabled());
        assert!(!rendered);
    }
}
