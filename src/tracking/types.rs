//! Interaction tracking types
//!
//! This module defines the session state, samples and emitted events that
//! flow through the tracking pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use uuid::Uuid;

/// Content item descriptor supplied by the presentation layer.
///
/// Display fields only enrich emitted events; they never feed scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Opaque content identifier
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ContentItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            url: None,
            metadata: Map::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Event metadata derived from the descriptor
    pub fn event_metadata(&self) -> Map<String, Value> {
        let mut metadata = self.metadata.clone();
        if let Some(title) = &self.title {
            metadata.insert("title".to_string(), Value::String(title.clone()));
        }
        if let Some(url) = &self.url {
            metadata.insert("url".to_string(), Value::String(url.clone()));
        }
        metadata
    }
}

/// Raw scroll geometry read from the page
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportMetrics {
    /// Current vertical scroll offset in pixels
    pub scroll_top: f64,
    /// Visible viewport height in pixels
    pub viewport_height: f64,
    /// Total scrollable document height in pixels
    pub scroll_height: f64,
}

/// One accepted scroll observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollSample {
    /// Scroll depth, 0-100
    pub depth_percent: u8,
    /// Monotonic clock reading in milliseconds
    pub timestamp_ms: u64,
}

/// Interaction kinds understood by the logging collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    View,
    Click,
}

/// Reading session classification by elapsed time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    DeepReading,
    ModerateReading,
    Scanning,
}

/// Derived reading-pattern report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternReport {
    /// Accepted samples per second
    pub reading_velocity: f64,
    /// Mean signed depth change between consecutive samples
    pub avg_depth_increment: f64,
    pub session_type: SessionType,
    /// 1.0 for forward progress, 0.5 for back-and-forth scrolling
    pub scroll_consistency: f64,
    pub sample_count: usize,
}

/// Immutable interaction fact handed to the logging collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub content_id: String,
    pub interaction_type: InteractionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_spent_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_percentage: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_reading: Option<bool>,
    /// Engagement score scaled to 0-100
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement_score: Option<u8>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Tracking session that produced the event
    pub session_id: Uuid,
    pub emitted_at: DateTime<Utc>,
}

/// Tracking state for one (content item, mount lifetime)
#[derive(Debug, Clone)]
pub struct TrackedSession {
    pub session_id: Uuid,
    pub content: ContentItem,
    /// Wall-clock start, for reporting
    pub started_at: DateTime<Utc>,
    /// Monotonic clock reading at start
    pub started_at_ms: u64,
    scroll_samples: Vec<ScrollSample>,
    max_depth_percent: u8,
    sent_interaction_keys: HashSet<(String, InteractionType)>,
    buffer_cap: usize,
    buffer_retain: usize,
}

impl TrackedSession {
    pub fn new(content: ContentItem, started_at_ms: u64, buffer_cap: usize, buffer_retain: usize) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            content,
            started_at: Utc::now(),
            started_at_ms,
            scroll_samples: Vec::new(),
            max_depth_percent: 0,
            sent_interaction_keys: HashSet::new(),
            buffer_cap,
            buffer_retain: buffer_retain.min(buffer_cap),
        }
    }

    pub fn content_id(&self) -> &str {
        &self.content.id
    }

    pub fn scroll_samples(&self) -> &[ScrollSample] {
        &self.scroll_samples
    }

    pub fn max_depth_percent(&self) -> u8 {
        self.max_depth_percent
    }

    /// Milliseconds since the session started
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.started_at_ms)
    }

    /// Append a sample, keeping the buffer time-ordered and bounded.
    ///
    /// Returns false when the sample is older than the newest one held.
    pub fn record_sample(&mut self, sample: ScrollSample) -> bool {
        if let Some(last) = self.scroll_samples.last() {
            if sample.timestamp_ms < last.timestamp_ms {
                return false;
            }
        }

        let depth = sample.depth_percent.min(100);
        self.scroll_samples.push(ScrollSample {
            depth_percent: depth,
            timestamp_ms: sample.timestamp_ms,
        });
        self.max_depth_percent = self.max_depth_percent.max(depth);

        if self.scroll_samples.len() > self.buffer_cap {
            let excess = self.scroll_samples.len() - self.buffer_retain;
            self.scroll_samples.drain(..excess);
        }
        true
    }

    /// Whether `(content_id, kind)` was already emitted this session
    pub fn was_sent(&self, content_id: &str, kind: InteractionType) -> bool {
        self.sent_interaction_keys
            .contains(&(content_id.to_string(), kind))
    }

    /// Record `(content_id, kind)` as emitted; returns false if it already was
    pub fn mark_sent(&mut self, content_id: &str, kind: InteractionType) -> bool {
        self.sent_interaction_keys.insert((content_id.to_string(), kind))
    }
}
