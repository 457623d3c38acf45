//! Interaction emission
//!
//! Builds interaction events from session state and hands them to the
//! interaction-logging collaborator. Dispatch is best-effort: transport
//! failures are logged and swallowed, never returned.

use crate::error::EngageError;
use crate::tracking::scorer::{
    classify, completed_reading, engagement_score, engagement_score_percent,
};
use crate::tracking::types::{InteractionEvent, InteractionType, SessionType, TrackedSession};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Interaction-logging collaborator.
///
/// Repeated reading-time `view` events for one session are upserts of
/// "time spent so far", not increments.
#[async_trait]
pub trait InteractionSink: Send + Sync {
    async fn log_interaction(&self, event: &InteractionEvent) -> Result<(), EngageError>;
}

/// Builds and forwards interaction events
#[derive(Clone)]
pub struct InteractionEmitter {
    sink: Arc<dyn InteractionSink>,
    min_reading_time_ms: u64,
}

impl InteractionEmitter {
    pub fn new(sink: Arc<dyn InteractionSink>, min_reading_time_ms: u64) -> Self {
        Self {
            sink,
            min_reading_time_ms,
        }
    }

    /// Build the initial presence event, at most once per content id per session
    pub fn view_event(
        &self,
        session: &mut TrackedSession,
        metadata: Map<String, Value>,
    ) -> Option<InteractionEvent> {
        let content_id = session.content_id().to_string();
        if !session.mark_sent(&content_id, InteractionType::View) {
            debug!("view for {} already sent in session {}", content_id, session.session_id);
            return None;
        }

        Some(InteractionEvent {
            content_id,
            interaction_type: InteractionType::View,
            time_spent_seconds: None,
            scroll_percentage: None,
            completed_reading: None,
            engagement_score: None,
            metadata,
            session_id: session.session_id,
            emitted_at: Utc::now(),
        })
    }

    /// Build a reading-time event for the session at `now_ms`.
    ///
    /// Returns `None` for bounce visits shorter than the minimum reading time.
    pub fn reading_time_event(&self, session: &TrackedSession, now_ms: u64) -> Option<InteractionEvent> {
        let elapsed_ms = session.elapsed_ms(now_ms);
        if elapsed_ms < self.min_reading_time_ms {
            return None;
        }

        let max_depth = session.max_depth_percent();
        let pattern = classify(session.scroll_samples(), elapsed_ms);
        let velocity = pattern.as_ref().map_or(0.0, |p| p.reading_velocity);
        let score = engagement_score(elapsed_ms, max_depth, velocity);
        let completed = completed_reading(elapsed_ms, max_depth);

        let mut metadata = session.content.event_metadata();
        metadata.insert(
            "session_type".to_string(),
            json!(SessionType::from_elapsed(elapsed_ms)),
        );
        if let Some(pattern) = &pattern {
            metadata.insert("reading_pattern".to_string(), json!(pattern));
        }

        Some(InteractionEvent {
            content_id: session.content_id().to_string(),
            interaction_type: InteractionType::View,
            time_spent_seconds: Some((elapsed_ms as f64 / 1000.0).round() as u64),
            scroll_percentage: Some(max_depth),
            completed_reading: Some(completed),
            engagement_score: Some(engagement_score_percent(score)),
            metadata,
            session_id: session.session_id,
            emitted_at: Utc::now(),
        })
    }

    /// Build a click event for a link to another content item
    pub fn click_event(
        &self,
        session_id: Uuid,
        content_id: &str,
        href: &str,
        link_text: &str,
    ) -> InteractionEvent {
        let mut metadata = Map::new();
        metadata.insert("href".to_string(), Value::String(href.to_string()));
        metadata.insert("link_text".to_string(), Value::String(link_text.to_string()));

        InteractionEvent {
            content_id: content_id.to_string(),
            interaction_type: InteractionType::Click,
            time_spent_seconds: None,
            scroll_percentage: None,
            completed_reading: None,
            engagement_score: None,
            metadata,
            session_id,
            emitted_at: Utc::now(),
        }
    }

    /// Forward an event, swallowing transport failures
    pub async fn dispatch(&self, event: &InteractionEvent) {
        if let Err(e) = self.sink.log_interaction(event).await {
            warn!(
                "Failed to log {:?} interaction for {}: {}",
                event.interaction_type, event.content_id, e
            );
        }
    }

    /// Emit the initial view; returns whether an event was forwarded
    pub async fn emit_view(&self, session: &mut TrackedSession, metadata: Map<String, Value>) -> bool {
        match self.view_event(session, metadata) {
            Some(event) => {
                self.dispatch(&event).await;
                true
            }
            None => false,
        }
    }

    /// Emit accumulated reading time; always permitted once past the bounce threshold
    pub async fn emit_reading_time(&self, session: &TrackedSession, now_ms: u64) -> Option<InteractionEvent> {
        let event = self.reading_time_event(session, now_ms)?;
        self.dispatch(&event).await;
        Some(event)
    }

    /// Emit a click; never deduplicated
    pub async fn emit_click(&self, session_id: Uuid, content_id: &str, href: &str, link_text: &str) {
        let event = self.click_event(session_id, content_id, href, link_text);
        self.dispatch(&event).await;
    }
}
