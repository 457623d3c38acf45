//! Recommendation click attribution
//!
//! When a reader picks a recommended item, its provenance (strategy, rank,
//! confidence, anchor) is sent to the click-logging collaborator in the
//! background. Navigation never waits on it and failures are only logged.

use crate::error::EngageError;
use crate::recommend::types::{RecommendationCandidate, Strategy};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Click-logging collaborator
#[async_trait]
pub trait ClickSink: Send + Sync {
    async fn log_click(&self, payload: &AttributionPayload) -> Result<(), EngageError>;
}

/// Provenance of a recommendation click
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionPayload {
    pub item_id: String,
    pub strategy: Strategy,
    pub confidence: f64,
    pub rank: u32,
    pub reason: String,
    pub anchor_content_id: Option<String>,
    pub clicked_at: DateTime<Utc>,
}

impl AttributionPayload {
    pub fn new(candidate: &RecommendationCandidate, rank: u32, anchor_content_id: Option<&str>) -> Self {
        Self {
            item_id: candidate.item_id.clone(),
            strategy: candidate.strategy,
            confidence: candidate.confidence,
            rank,
            reason: candidate.reason.clone(),
            anchor_content_id: anchor_content_id.map(str::to_string),
            clicked_at: Utc::now(),
        }
    }
}

/// Fire-and-forget click attribution
#[derive(Clone)]
pub struct ClickAttributor {
    sink: Arc<dyn ClickSink>,
}

impl ClickAttributor {
    pub fn new(sink: Arc<dyn ClickSink>) -> Self {
        Self { sink }
    }

    /// Send attribution for `candidate` in the background and return at once.
    ///
    /// The handle is only for callers that want to observe completion.
    /// Outside a tokio runtime the payload is dropped.
    pub fn attribute(
        &self,
        candidate: &RecommendationCandidate,
        rank: u32,
        anchor_content_id: Option<&str>,
    ) -> Option<JoinHandle<()>> {
        let payload = AttributionPayload::new(candidate, rank, anchor_content_id);

        let Ok(runtime) = Handle::try_current() else {
            warn!(
                "No async runtime, dropping click attribution for {}",
                payload.item_id
            );
            return None;
        };

        let sink = self.sink.clone();
        Some(runtime.spawn(async move {
            match sink.log_click(&payload).await {
                Ok(()) => debug!(
                    "attributed click on {} ({}, rank {})",
                    payload.item_id, payload.strategy, payload.rank
                ),
                Err(e) => warn!("Failed to attribute click on {}: {}", payload.item_id, e),
            }
        }))
    }
}
