//! JSON record layout for production sinks.
//!
//! Same shape as `tracing-subscriber`'s JSON format (`timestamp`, `level`,
//! `target`, `fields`, `spans`), except that the structured fields written by
//! [`Logger`](super::Logger) (`metadata`, `context`, `details`) are embedded
//! as JSON objects rather than as strings holding JSON.

use serde_json::{Map, Value};
use std::fmt;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::{format::Writer, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use crate::observability::logging::iso_timestamp;

/// Fields that carry serialized [`Metadata`](super::Metadata).
const STRUCTURED_FIELDS: [&str; 3] = ["metadata", "context", "details"];

/// One JSON object per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredJson;

impl<S, N> FormatEvent<S, N> for StructuredJson
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
        let meta = event.metadata();
        let mut fields = FieldMap::default();
        event.record(&mut fields);

        let mut record = Map::new();
        record.insert("timestamp".into(), iso_timestamp().into());
        record.insert("level".into(), meta.level().to_string().into());
        record.insert("target".into(), meta.target().into());
        record.insert("fields".into(), Value::Object(fields.0));

        if let Some(scope) = ctx.event_scope() {
            let spans: Vec<Value> = scope.from_root().map(|span| span.name().into()).collect();
            record.insert("spans".into(), spans.into());
        }

        writeln!(writer, "{}", Value::Object(record))
    }
}

#[derive(Default)]
struct FieldMap(Map<String, Value>);

impl FieldMap {
    fn put(&mut self, field: &Field, value: Value) {
        self.0.insert(field.name().to_string(), value);
    }
}

impl Visit for FieldMap {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, value.into());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, value.into());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.put(field, value.into());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.put(field, value.to_string().into());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let text = format!("{value:?}");
        let value = if STRUCTURED_FIELDS.contains(&field.name()) {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        } else {
            Value::String(text)
        };
        self.put(field, value);
    }
}
