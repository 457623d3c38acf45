//! Interaction trace replay
//!
//! Replays a recorded interaction trace through a [`SessionController`] driven
//! by a manual clock, synthesizing heartbeats at every interval the trace
//! crosses. Useful for offline analysis and for checking tracker settings
//! against real sessions.
//!
//! Trace JSON:
//! ```text
//! {
//!   "content_id": "post-42",
//!   "title": "Optional title",
//!   "events": [
//!     { "at_ms": 0,     "kind": "scroll", "scroll_top": 0, "viewport_height": 900, "scroll_height": 4000 },
//!     { "at_ms": 45000, "kind": "visibility", "visible": false },
//!     { "at_ms": 61000, "kind": "link", "href": "/blog/next", "text": "Next" },
//!     { "at_ms": 90000, "kind": "navigate", "content_id": "next" },
//!     { "at_ms": 99000, "kind": "end" }
//!   ]
//! }
//! ```

use crate::clock::ManualClock;
use crate::config::TrackerConfig;
use crate::error::EngageError;
use crate::tracking::emitter::InteractionSink;
use crate::tracking::lifecycle::{SessionController, SessionPhase};
use crate::tracking::types::{ContentItem, InteractionEvent, ViewportMetrics};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

/// A recorded interaction trace for one page visit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionTrace {
    pub content_id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub events: Vec<TraceEvent>,
}

/// One timestamped trace entry, relative to the visit start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    pub at_ms: u64,
    #[serde(flatten)]
    pub kind: TraceEventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEventKind {
    Scroll {
        scroll_top: f64,
        viewport_height: f64,
        scroll_height: f64,
    },
    Visibility {
        visible: bool,
    },
    Link {
        href: String,
        #[serde(default)]
        text: String,
    },
    /// The reader moved to another content item in place
    Navigate {
        content_id: String,
        #[serde(default)]
        title: Option<String>,
    },
    End,
}

/// Outcome of a replay
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub content_id: String,
    pub duration_ms: u64,
    pub scroll_events: usize,
    pub samples_accepted: usize,
    pub heartbeats: usize,
    pub events: Vec<InteractionEvent>,
}

/// Sink that keeps every event in memory
#[derive(Debug, Default)]
pub struct BufferedSink {
    events: Mutex<Vec<InteractionEvent>>,
}

impl BufferedSink {
    pub fn events(&self) -> Vec<InteractionEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl InteractionSink for BufferedSink {
    async fn log_interaction(&self, event: &InteractionEvent) -> Result<(), EngageError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}

/// Parse a trace from JSON and check it is replayable
pub fn parse_trace(json: &str) -> Result<InteractionTrace, EngageError> {
    let trace: InteractionTrace = serde_json::from_str(json)
        .map_err(|e| EngageError::ParseError(format!("Failed to parse interaction trace: {}", e)))?;
    validate_trace(&trace)?;
    Ok(trace)
}

fn validate_trace(trace: &InteractionTrace) -> Result<(), EngageError> {
    if trace.content_id.trim().is_empty() {
        return Err(EngageError::InvalidTrace("content_id is empty".to_string()));
    }
    if let Some(pair) = trace.events.windows(2).find(|p| p[1].at_ms < p[0].at_ms) {
        return Err(EngageError::InvalidTrace(format!(
            "events out of order at {}ms (after {}ms)",
            pair[1].at_ms, pair[0].at_ms
        )));
    }
    Ok(())
}

/// Replay `trace` and collect every interaction it would emit
pub async fn replay_trace(
    trace: &InteractionTrace,
    config: &TrackerConfig,
) -> Result<ReplayReport, EngageError> {
    config.validate()?;
    validate_trace(trace)?;

    let clock = ManualClock::new(0);
    let sink = Arc::new(BufferedSink::default());
    let controller = SessionController::new(
        config.clone().without_heartbeat(),
        sink.clone(),
        Arc::new(clock.clone()),
    );

    let interval = config.heartbeat_interval_ms;
    let mut next_heartbeat = interval;
    let mut scroll_events = 0;
    let mut samples_accepted = 0;
    let mut heartbeats = 0;
    let mut last_ms = 0;

    let mut first = ContentItem::new(trace.content_id.clone());
    first.title = trace.title.clone();
    controller.start(first).await;

    for event in &trace.events {
        while interval > 0 && next_heartbeat <= event.at_ms {
            clock.set(next_heartbeat);
            if controller.heartbeat().await.is_some() {
                heartbeats += 1;
            }
            next_heartbeat += interval;
        }
        clock.set(event.at_ms);
        last_ms = event.at_ms;

        match &event.kind {
            TraceEventKind::Scroll {
                scroll_top,
                viewport_height,
                scroll_height,
            } => {
                scroll_events += 1;
                let metrics = ViewportMetrics {
                    scroll_top: *scroll_top,
                    viewport_height: *viewport_height,
                    scroll_height: *scroll_height,
                };
                if controller.on_scroll(&metrics).is_some() {
                    samples_accepted += 1;
                }
            }
            TraceEventKind::Visibility { visible } => {
                controller.on_visibility_change(*visible).await;
            }
            TraceEventKind::Link { href, text } => {
                controller.on_link_activated(href, text).await;
            }
            TraceEventKind::Navigate { content_id, title } => {
                let mut item = ContentItem::new(content_id.clone());
                item.title = title.clone();
                controller.start(item).await;
                next_heartbeat = event.at_ms + interval;
            }
            TraceEventKind::End => {
                debug!("trace ended at {}ms", event.at_ms);
                break;
            }
        }
    }

    if controller.phase() == SessionPhase::Active {
        controller.teardown().await;
    }

    Ok(ReplayReport {
        content_id: trace.content_id.clone(),
        duration_ms: last_ms,
        scroll_events,
        samples_accepted,
        heartbeats,
        events: sink.events(),
    })
}
