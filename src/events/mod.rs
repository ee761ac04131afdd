//! Status events streamed to an observer while a task runs.
//!
//! Every externally visible step (search started, page read, extraction done,
//! synthesis done, each streamed token) produces one [`StatusEvent`]. Events are
//! delivered synchronously through an [`EventSink`]; a slow sink slows the pipeline.

mod correlation;

pub use correlation::{Correlation, IdSource, SequentialIds, UuidIds};

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};

use crate::task::Task;

/// Partial output of a streaming completion (cumulative buffer).
pub const TASK_EXECUTE: &str = "task-execute";
/// Finished output of a completion.
pub const TASK_OUTPUT: &str = "task-output";
/// A completion ended without output (aborted or failed).
pub const TASK_ERROR: &str = "task-error";

pub const ICON_SEARCH: &str = "🔎";
pub const ICON_THINKING: &str = "🤖";
pub const ICON_DONE: &str = "✅";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStyle {
    Text,
    Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Running,
    Complete,
    Aborted,
    Failed,
}

/// A progress record. Built once, then handed to the sink by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    /// Correlation id of the step that produced the event
    pub id: String,
    pub task_id: String,
    /// Category: `task-execute`, `task-output`, `task-error` or the task's skill name
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub style: EventStyle,
    pub status: EventStatus,
    pub timestamp: DateTime<Utc>,
}

impl StatusEvent {
    /// A running, text-styled event for `task`.
    pub fn new(
        correlation: &Correlation,
        task: &Task,
        event_type: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: correlation.id().to_string(),
            task_id: task.id().to_string(),
            event_type: event_type.into(),
            icon: None,
            content: content.into(),
            title: None,
            style: EventStyle::Text,
            status: EventStatus::Running,
            timestamp: Utc::now(),
        }
    }

    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = Some(icon.to_string());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_style(mut self, style: EventStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.status = status;
        self
    }
}

/// Receiver of status events. Implementations must not block for long and
/// have no way to report failure.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: StatusEvent);
}

impl<F> EventSink for F
where
    F: Fn(StatusEvent) + Send + Sync,
{
    fn emit(&self, event: StatusEvent) {
        self(event)
    }
}

/// Forward into an unbounded channel; a closed receiver drops events.
pub struct ChannelSink(pub mpsc::UnboundedSender<StatusEvent>);

impl EventSink for ChannelSink {
    fn emit(&self, event: StatusEvent) {
        let _ = self.0.send(event);
    }
}

/// Fan out to any number of subscribers; no subscribers drops events.
pub struct BroadcastSink(pub broadcast::Sender<StatusEvent>);

impl EventSink for BroadcastSink {
    fn emit(&self, event: StatusEvent) {
        let _ = self.0.send(event);
    }
}

/// Discards everything.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: StatusEvent) {}
}

/// Delivers events to the observer and, in verbose mode, to the log.
///
/// `emit` never fails: a panicking sink is caught and logged.
#[derive(Clone)]
pub struct StatusEmitter {
    sink: Arc<dyn EventSink>,
    verbose: bool,
}

impl StatusEmitter {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink,
            verbose: false,
        }
    }

    /// An emitter that discards every event.
    pub fn silent() -> Self {
        Self::new(Arc::new(NullSink))
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn emit(&self, event: StatusEvent) {
        if self.verbose {
            tracing::info!(
                task_id = %event.task_id,
                event_type = %event.event_type,
                status = ?event.status,
                "{}",
                event.content.trim_end()
            );
        }

        let sink = &self.sink;
        if catch_unwind(AssertUnwindSafe(|| sink.emit(event))).is_err() {
            tracing::warn!("Status event sink panicked; event dropped");
        }
    }
}

impl std::fmt::Debug for StatusEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusEmitter")
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}
