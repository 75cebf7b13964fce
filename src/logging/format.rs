//! JSON line formatter.
//!
//! One object per event:
//! `{"timestamp", "level", "logger", "message", "correlation_id", "fields"}`.

use std::{
    fmt,
    sync::{Arc, RwLock},
};

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::{
    Event, Subscriber,
    field::{Field, Visit},
    span::{Attributes, Id},
};
use tracing_subscriber::{
    Layer,
    fmt::{FmtContext, FormatEvent, FormatFields, format::Writer},
    layer::Context,
    registry::LookupSpan,
};

use crate::{error::UNKNOWN_CORRELATION_ID, utils::PiiScrubber};

const CORRELATION_FIELD: &str = "correlation_id";

/// Correlation ID captured from a span's fields when it was created.
#[derive(Debug, Clone)]
struct SpanCorrelation(String);

/// Stores the `correlation_id` field of new spans so events inside them can be
/// tagged without re-parsing formatted span fields.
pub struct CorrelationLayer;

impl<S> Layer<S> for CorrelationLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = CorrelationVisitor::default();
        attrs.record(&mut visitor);

        if let (Some(correlation_id), Some(span)) = (visitor.0, ctx.span(id)) {
            span.extensions_mut().insert(SpanCorrelation(correlation_id));
        }
    }
}

#[derive(Default)]
struct CorrelationVisitor(Option<String>);

impl Visit for CorrelationVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == CORRELATION_FIELD {
            self.0 = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == CORRELATION_FIELD {
            self.0 = Some(format!("{value:?}"));
        }
    }
}

/// Collects event fields as JSON values.
#[derive(Default)]
struct JsonVisitor(Map<String, Value>);

impl Visit for JsonVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0
            .insert(field.name().to_string(), Value::String(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name().to_string(), value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().to_string(), value.into());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.0.insert(field.name().to_string(), value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name().to_string(), value.into());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.0
            .insert(field.name().to_string(), Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0
            .insert(field.name().to_string(), Value::String(format!("{value:?}")));
    }
}

/// Structured JSON event format with PII redaction.
pub struct JsonLogFormat {
    scrubber: Arc<RwLock<PiiScrubber>>,
}

impl JsonLogFormat {
    pub fn new(scrubber: Arc<RwLock<PiiScrubber>>) -> Self {
        Self { scrubber }
    }

    fn current_scrubber(&self) -> PiiScrubber {
        match self.scrubber.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl<S, N> FormatEvent<S, N> for JsonLogFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();

        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);
        let mut fields = visitor.0;

        let message = match fields.remove("message") {
            Some(Value::String(text)) => text,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        // Event field first, then the innermost span that carries one.
        let correlation_id = match fields.remove(CORRELATION_FIELD) {
            Some(Value::String(id)) => Some(id),
            _ => ctx.event_scope().and_then(|scope| {
                scope.into_iter().find_map(|span| {
                    let extensions = span.extensions();
                    let found = extensions.get::<SpanCorrelation>().map(|c| c.0.clone());
                    found
                })
            }),
        }
        .unwrap_or_else(|| UNKNOWN_CORRELATION_ID.to_string());

        let scrubber = self.current_scrubber();
        let mut fields = Value::Object(fields);
        scrubber.scrub_in_place(&mut fields);

        let mut record = Map::new();
        record.insert(
            "timestamp".to_string(),
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true).into(),
        );
        record.insert("level".to_string(), metadata.level().as_str().into());
        record.insert("logger".to_string(), metadata.target().into());
        record.insert("message".to_string(), scrubber.scrub_text(&message).into());
        record.insert(CORRELATION_FIELD.to_string(), correlation_id.into());
        if fields.as_object().is_some_and(|f| !f.is_empty()) {
            record.insert("fields".to_string(), fields);
        }

        let line = serde_json::to_string(&record).map_err(|_| fmt::Error)?;
        writeln!(writer, "{line}")
    }
}
