use std::fmt::{self, Write as _};
use std::sync::{Arc, Mutex};
use tracing::{Event, Subscriber, field::Visit};
use tracing_subscriber::layer::{Context, Layer};

const MAX_BUFFERED: usize = 1000;

#[derive(Clone, Debug)]
pub struct LogEntry {
    pub level: tracing::Level,
    pub timestamp: String,
    pub message: String,
    pub target: String,
}

impl LogEntry {
    pub fn new(level: tracing::Level, message: String, target: String) -> Self {
        Self {
            level,
            timestamp: chrono::Utc::now().format("%H:%M:%S").to_string(),
            message,
            target,
        }
    }
}

static LOG_BUFFER: once_cell::sync::Lazy<Arc<Mutex<Vec<LogEntry>>>> =
    once_cell::sync::Lazy::new(|| Arc::new(Mutex::new(Vec::new())));

/// Events captured since the GUI last drained the buffer.
pub fn get_log_buffer() -> Arc<Mutex<Vec<LogEntry>>> {
    LOG_BUFFER.clone()
}

/// Tracing layer feeding the in-app log console.
#[derive(Default)]
pub struct GuiLogLayer;

impl GuiLogLayer {
    pub fn new() -> Self {
        Self
    }
}

/// Collects the `message` field plus any structured fields as `key=value`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

impl<S> Layer<S> for GuiLogLayer
where
    S: Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let mut message = if visitor.message.is_empty() {
            metadata.target().to_string()
        } else {
            visitor.message
        };
        message.push_str(&visitor.fields);

        let entry = LogEntry::new(*metadata.level(), message, metadata.target().to_string());

        if let Ok(mut buf) = LOG_BUFFER.lock() {
            buf.push(entry);
            if buf.len() > MAX_BUFFERED {
                let excess = buf.len() - MAX_BUFFERED;
                buf.drain(..excess);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::prelude::*;

    #[test]
    fn events_land_in_the_buffer_with_fields() {
        let subscriber = tracing_subscriber::registry().with(GuiLogLayer::new());
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(layer = "Flood Water", "empty layer");
        });
        let buf = get_log_buffer();
        let logs = buf.lock().unwrap();
        let entry = logs
            .iter()
            .rev()
            .find(|e| e.message.starts_with("empty layer"))
            .unwrap();
        assert_eq!(entry.level, tracing::Level::WARN);
        assert!(entry.message.contains("layer=Flood Water"));
    }
}
