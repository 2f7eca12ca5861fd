// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fmt::Debug, path::Path, sync::Arc};

use anyhow::{Context, Result};
use chrono::Utc;
use fastrace::collector::{Config as FastraceConfig, ConsoleReporter};
use serde::Serialize;
use serde_json::json;
use tracing::{Event, Subscriber, span};
use tracing_appender::{non_blocking::WorkerGuard, rolling::{RollingFileAppender, Rotation}};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, FmtContext, FormatEvent, FormatFields, format::{JsonFields, Writer}, writer::BoxMakeWriter},
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
};

use crate::cfg::config::{LogOutput, LoggerConfig};

#[derive(Default, Debug)]
struct SpanFields(pub serde_json::Map<String, serde_json::Value>);

struct CaptureSpanFieldsLayer;

impl<S> Layer<S> for CaptureSpanFieldsLayer
where S: Subscriber + for<'a> LookupSpan<'a>
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: tracing_subscriber::layer::Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            let mut map = serde_json::Map::with_capacity(8);
            let mut vis = FieldVisitor(&mut map);
            attrs.record(&mut vis);
            span.extensions_mut().insert(SpanFields(map));
        }
    }

    fn on_record(&self, id: &span::Id, values: &span::Record<'_>, ctx: tracing_subscriber::layer::Context<'_, S>) {
        if let Some(span) = ctx.span(id)
            && let Some(fields) = span.extensions_mut().get_mut::<SpanFields>()
        {
            let mut vis = FieldVisitor(&mut fields.0);
            values.record(&mut vis);
        }
    }
}

struct FieldVisitor<'a>(&'a mut serde_json::Map<String, serde_json::Value>);

impl tracing::field::Visit for FieldVisitor<'_> {
    fn record_debug(&mut self, f: &tracing::field::Field, v: &dyn Debug) {
        self.0.insert(f.name().to_string(), json!(format!("{v:?}")));
    }

    fn record_i64(&mut self, f: &tracing::field::Field, v: i64) {
        self.0.insert(f.name().to_string(), json!(v));
    }

    fn record_u64(&mut self, f: &tracing::field::Field, v: u64) {
        self.0.insert(f.name().to_string(), json!(v));
    }

    fn record_bool(&mut self, f: &tracing::field::Field, v: bool) {
        self.0.insert(f.name().to_string(), json!(v));
    }

    fn record_str(&mut self, f: &tracing::field::Field, v: &str) {
        self.0.insert(f.name().to_string(), json!(v));
    }
}

struct JsonFormatter {
    config: Arc<LoggerConfig>,
}

impl JsonFormatter {
    fn new(config: Arc<LoggerConfig>) -> Self {
        Self { config }
    }
}

#[derive(Serialize)]
struct LogEntry {
    timestamp: String,
    level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
    fields: serde_json::Map<String, serde_json::Value>,
}

/// Usage: enter a span (e.g. `info_span!("connection", peer = %addr)`) and
/// log from within it; span fields get merged into every event emitted
/// while that span is active.
impl<S, N> FormatEvent<S, N> for JsonFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(&self, ctx: &FmtContext<'_, S, N>, mut writer: Writer<'_>, event: &Event<'_>) -> std::fmt::Result {
        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);

        let mut fields = visitor.fields;

        if let Some(scope) = ctx.event_scope() {
            let mut span_names = Vec::with_capacity(8);
            for span in scope.from_root() {
                span_names.push(span.name().to_string());
                if let Some(ext) = span.extensions().get::<SpanFields>() {
                    for (k, v) in &ext.0 {
                        fields.entry(k.clone()).or_insert_with(|| v.clone());
                    }
                }
            }
            fields.insert("span_names".to_string(), json!(span_names));
        }

        let log_entry = LogEntry {
            timestamp: Utc::now().to_rfc3339(),
            level: event.metadata().level().to_string(),
            target: self.config.is_show_target.then(|| event.metadata().target().to_string()),
            line: self.config.is_show_line.then(|| event.metadata().line()).flatten(),
            fields,
        };

        writeln!(writer, "{}", serde_json::to_string(&log_entry).map_err(|_| std::fmt::Error)?)
    }
}

#[derive(Default)]
struct JsonVisitor {
    fields: serde_json::Map<String, serde_json::Value>,
}

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn Debug) {
        self.fields.insert(field.name().to_string(), json!(format!("{value:?}")));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.fields.insert(field.name().to_string(), json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.fields.insert(field.name().to_string(), json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.fields.insert(field.name().to_string(), json!(value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.fields.insert(field.name().to_string(), json!(value));
    }
}

/// Wires up the global `tracing` subscriber from an already-loaded
/// [`LoggerConfig`] (itself part of the engine's [`crate::cfg::config::Config`]).
/// The returned guard must be kept alive for the process lifetime; dropping
/// it stops the background writer thread.
pub fn init_logger(config: &LoggerConfig) -> Result<WorkerGuard> {
    let (writer, guard) = make_writer(config)?;

    fastrace::set_reporter(ConsoleReporter, FastraceConfig::default());
    let compat_layer = fastrace_tracing::FastraceCompatLayer::new();

    let env_filter =
        EnvFilter::try_new(&config.level).or_else(|_| EnvFilter::try_from_default_env()).context("invalid log level")?;

    let json_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .json()
        .event_format(JsonFormatter::new(Arc::new(config.clone())))
        .fmt_fields(JsonFields::default());

    let subscriber =
        Registry::default().with(env_filter).with(compat_layer).with(CaptureSpanFieldsLayer).with(json_layer);

    tracing::subscriber::set_global_default(subscriber).context("failed to set global default subscriber")?;

    Ok(guard)
}

fn make_writer(config: &LoggerConfig) -> Result<(BoxMakeWriter, WorkerGuard)> {
    Ok(match config.output {
        LogOutput::Stdout => {
            let (w, g) = tracing_appender::non_blocking(std::io::stdout());
            (BoxMakeWriter::new(w), g)
        },
        LogOutput::Stderr => {
            let (w, g) = tracing_appender::non_blocking(std::io::stderr());
            (BoxMakeWriter::new(w), g)
        },
        LogOutput::File => {
            let file = config.file.clone().context("logger.file is required for output = file")?;
            let path = Path::new(&file.path);
            let dir = path.parent().unwrap_or_else(|| Path::new(""));
            let file_appender = RollingFileAppender::new(Rotation::NEVER, dir, path.file_name().unwrap_or_default());
            let (w, g) = tracing_appender::non_blocking(file_appender);
            (BoxMakeWriter::new(w), g)
        },
    })
}
