//! JSON-lines log file sink and the tracing layer that feeds it.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing::field::{Field, Visit};
use tracing::span;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// One line of the JSON-lines log file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileLogRecord {
    /// RFC 3339 UTC timestamp.
    pub timestamp: String,
    /// Upper-case level name, e.g. `WARN`.
    pub level: String,
    /// Module path the event came from.
    pub target: String,
    /// Formatted event message.
    pub message: String,
    /// Structured fields other than the message and ids.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub fields: serde_json::Map<String, serde_json::Value>,
    /// Cluster the event belongs to, from the event or an enclosing span.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
    /// Frame routing id, from the event or an enclosing span.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<String>,
}

/// Append-only JSON-lines file that can be closed once, after which every
/// further record is dropped.
pub struct FileLogSink {
    path: PathBuf,
    writer: Mutex<Option<BufWriter<File>>>,
    written: AtomicU64,
}

impl FileLogSink {
    /// Open `path` for appending, creating parent directories as needed.
    pub fn new(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(Some(BufWriter::new(file))),
            written: AtomicU64::new(0),
        })
    }

    /// File the sink appends to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records written since the sink was opened.
    pub fn lines_written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Whether [`Self::close`] has run.
    pub fn is_closed(&self) -> bool {
        self.writer.lock().is_none()
    }

    /// Flush and close the file. Returns `false` if it was already closed.
    pub fn close(&self) -> bool {
        let Some(mut writer) = self.writer.lock().take() else {
            return false;
        };
        if let Err(e) = writer.flush() {
            eprintln!("kubeframe-logging: failed to flush {}: {e}", self.path.display());
        }
        true
    }

    /// Write and flush a record. Logging must never fail the caller, so
    /// I/O errors are swallowed.
    pub fn write_record(&self, record: &FileLogRecord) {
        let Ok(line) = serde_json::to_string(record) else {
            return;
        };
        let mut guard = self.writer.lock();
        let Some(writer) = guard.as_mut() else {
            return;
        };
        if writeln!(writer, "{line}").and_then(|()| writer.flush()).is_ok() {
            let _ = self.written.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl std::fmt::Debug for FileLogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLogSink")
            .field("path", &self.path)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// tracing Layer that appends events at or above `min_level` to a [`FileLogSink`].
pub struct FileLogLayer {
    sink: Arc<FileLogSink>,
    min_level: Level,
}

impl FileLogLayer {
    /// Write events at `min_level` or more severe to `sink`.
    pub fn new(sink: Arc<FileLogSink>, min_level: Level) -> Self {
        Self { sink, min_level }
    }
}

/// Visitor that extracts fields from a tracing event or span.
struct FieldVisitor {
    message: Option<String>,
    fields: serde_json::Map<String, serde_json::Value>,
    cluster_id: Option<String>,
    frame_id: Option<String>,
}

impl FieldVisitor {
    fn new() -> Self {
        Self {
            message: None,
            fields: serde_json::Map::new(),
            cluster_id: None,
            frame_id: None,
        }
    }

    fn insert(&mut self, field: &Field, value: serde_json::Value) {
        let _ = self.fields.insert(field.name().to_string(), value);
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let val = format!("{value:?}");
        match field.name() {
            "message" => self.message = Some(val),
            "cluster_id" => self.cluster_id = Some(val.trim_matches('"').to_string()),
            "frame_id" => self.frame_id = Some(val.trim_matches('"').to_string()),
            _ => self.insert(field, serde_json::Value::String(val)),
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            "cluster_id" => self.cluster_id = Some(value.to_string()),
            "frame_id" => self.frame_id = Some(value.to_string()),
            _ => self.insert(field, serde_json::Value::String(value.to_string())),
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, serde_json::Value::Number(value.into()));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        if field.name() == "frame_id" {
            self.frame_id = Some(value.to_string());
        } else {
            self.insert(field, serde_json::Value::Number(value.into()));
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, serde_json::Value::Bool(value));
    }
}

/// Stored on spans so child events inherit `cluster_id` / `frame_id`.
struct SpanFields {
    cluster_id: Option<String>,
    frame_id: Option<String>,
}

impl<S> Layer<S> for FileLogLayer
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        if level > self.min_level || self.sink.is_closed() {
            return;
        }

        let mut visitor = FieldVisitor::new();
        event.record(&mut visitor);

        if visitor.cluster_id.is_none() || visitor.frame_id.is_none() {
            if let Some(scope) = ctx.event_scope(event) {
                for span in scope {
                    let extensions = span.extensions();
                    if let Some(fields) = extensions.get::<SpanFields>() {
                        if visitor.cluster_id.is_none() {
                            visitor.cluster_id.clone_from(&fields.cluster_id);
                        }
                        if visitor.frame_id.is_none() {
                            visitor.frame_id.clone_from(&fields.frame_id);
                        }
                    }
                }
            }
        }

        self.sink.write_record(&FileLogRecord {
            timestamp: Utc::now().to_rfc3339(),
            level: level.to_string(),
            target: event.metadata().target().to_string(),
            message: visitor.message.unwrap_or_default(),
            fields: visitor.fields,
            cluster_id: visitor.cluster_id,
            frame_id: visitor.frame_id,
        });
    }

    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::new();
        attrs.record(&mut visitor);

        if visitor.cluster_id.is_some() || visitor.frame_id.is_some() {
            if let Some(span) = ctx.span(id) {
                span.extensions_mut().insert(SpanFields {
                    cluster_id: visitor.cluster_id,
                    frame_id: visitor.frame_id,
                });
            }
        }
    }
}
