//! Structured logging: newline-delimited JSON over `tracing`.
//!
//! Each line carries `ts` (UTC ISO-8601 to the second), `level`, `logger`
//! (the event target), `msg`, `pid`, plus any fields attached at the log
//! site (`task_id`, `elapsed_ms`, ...). Errors attached under an `exc`
//! field land as their display string.

use std::fmt;

use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// Initialize the process-wide tracing subscriber.
///
/// `level` is the fallback (`DEBUG`, `INFO`, `WARNING`, `ERROR`); `RUST_LOG`
/// takes precedence when set. Installation is idempotent: if a subscriber
/// is already set, this is a no-op.
pub fn init_telemetry(level: &str) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let directive = match level.to_ascii_uppercase().as_str() {
        "DEBUG" => "debug",
        "WARNING" | "WARN" => "warn",
        "ERROR" => "error",
        _ => "info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .event_format(JsonLineFormat)
        .try_init();
}

/// NDJSON event formatter implementing the runtime's log-line contract.
struct JsonLineFormat;

impl<S, N> FormatEvent<S, N> for JsonLineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut fields = Map::new();
        event.record(&mut JsonVisitor {
            fields: &mut fields,
        });
        let msg = match fields.remove("message") {
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        let meta = event.metadata();
        let mut line = Map::new();
        line.insert(
            "ts".to_string(),
            Value::String(chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()),
        );
        line.insert(
            "level".to_string(),
            Value::String(level_name(*meta.level()).to_string()),
        );
        line.insert("logger".to_string(), Value::String(meta.target().to_string()));
        line.insert("msg".to_string(), Value::String(msg));
        line.insert("pid".to_string(), Value::from(std::process::id()));
        for (key, value) in fields {
            line.insert(key, value);
        }

        writeln!(writer, "{}", Value::Object(line))
    }
}

fn level_name(level: Level) -> &'static str {
    match level {
        Level::TRACE | Level::DEBUG => "DEBUG",
        Level::INFO => "INFO",
        Level::WARN => "WARNING",
        Level::ERROR => "ERROR",
    }
}

struct JsonVisitor<'a> {
    fields: &'a mut Map<String, Value>,
}

impl Visit for JsonVisitor<'_> {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.fields
            .insert(field.name().to_string(), Value::from(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.fields
            .insert(field.name().to_string(), Value::from(format!("{value:?}")));
    }
}
