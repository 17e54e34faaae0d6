//! Tracing layer that turns discussion log events into channel messages.
//!
//! Front-ends subscribe to the receiving end to show a live trace of the run
//! (turn started, turn finished, failures) without parsing log output.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

/// One forwarded tracing event.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DiscussionEvent {
    /// Module path of the emitter, e.g. `duet_application::orchestrator`.
    pub target: String,
    pub level: String,
    pub message: String,
    /// Structured event fields, without `message`.
    pub fields: HashMap<String, Value>,
    /// Fields of the enclosing spans, innermost last.
    pub span: HashMap<String, Value>,
    pub timestamp: String,
}

impl DiscussionEvent {
    /// Field lookup across event and span fields, event first.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).or_else(|| self.span.get(name))
    }
}

/// Span fields stored in the registry extensions.
#[derive(Debug, Default, Clone)]
struct SpanFields(HashMap<String, Value>);

/// Sends every event it sees to an unbounded channel.
pub struct DiscussionEventLayer {
    sender: mpsc::UnboundedSender<DiscussionEvent>,
}

impl DiscussionEventLayer {
    pub fn new(sender: mpsc::UnboundedSender<DiscussionEvent>) -> Self {
        Self { sender }
    }

    /// Creates a layer together with its receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DiscussionEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl<S> Layer<S> for DiscussionEventLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut fields = HashMap::new();
        attrs.record(&mut FieldVisitor(&mut fields));
        span.extensions_mut().insert(SpanFields(fields));
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        if let Some(stored) = extensions.get_mut::<SpanFields>() {
            values.record(&mut FieldVisitor(&mut stored.0));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut fields = HashMap::new();
        event.record(&mut FieldVisitor(&mut fields));
        let message = match fields.remove("message") {
            Some(Value::String(message)) => message,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        let mut span_fields = HashMap::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if let Some(stored) = span.extensions().get::<SpanFields>() {
                    span_fields.extend(stored.0.clone());
                }
            }
        }

        let metadata = event.metadata();
        let forwarded = DiscussionEvent {
            target: metadata.target().to_string(),
            level: metadata.level().to_string(),
            message,
            fields,
            span: span_fields,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        // A dropped receiver just means nobody is watching.
        let _ = self.sender.send(forwarded);
    }
}

struct FieldVisitor<'a>(&'a mut HashMap<String, Value>);

impl Visit for FieldVisitor<'_> {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.0
            .insert(field.name().to_string(), Value::from(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0
            .insert(field.name().to_string(), Value::from(format!("{value:?}")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    fn capture(body: impl FnOnce()) -> Vec<DiscussionEvent> {
        let (layer, mut receiver) = DiscussionEventLayer::channel();
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, body);

        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_event_fields_are_forwarded() {
        let events = capture(|| {
            tracing::info!(iteration = 2u64, persona = "Analyst", duration_ms = 15u64, "turn finished");
        });

        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.level, "INFO");
        assert_eq!(event.message, "turn finished");
        assert_eq!(event.fields.get("iteration"), Some(&Value::from(2u64)));
        assert_eq!(event.fields.get("persona"), Some(&Value::from("Analyst")));
        assert!(!event.fields.contains_key("message"));
        assert!(event.target.contains("event_layer"));
    }

    #[test]
    fn test_span_fields_reach_nested_events() {
        let events = capture(|| {
            let run = tracing::info_span!("discussion_run", conversation_id = "conv-1");
            let _run = run.enter();
            let turn = tracing::info_span!("turn", persona = "Skeptic");
            let _turn = turn.enter();
            tracing::warn!(error = "timeout", "turn failed");
        });

        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.level, "WARN");
        assert_eq!(event.field("conversation_id"), Some(&Value::from("conv-1")));
        assert_eq!(event.field("persona"), Some(&Value::from("Skeptic")));
        assert_eq!(event.field("error"), Some(&Value::from("timeout")));
    }

    #[test]
    fn test_recorded_span_values_are_visible() {
        let events = capture(|| {
            let run = tracing::info_span!("discussion_run", iterations = tracing::field::Empty);
            let _run = run.enter();
            run.record("iterations", 3u64);
            tracing::info!("discussion run settled");
        });

        assert_eq!(events[0].field("iterations"), Some(&Value::from(3u64)));
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let (layer, receiver) = DiscussionEventLayer::channel();
        drop(receiver);
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::error!("nobody listening");
        });
    }
}
