//! Recommendation retrieval coordination
//!
//! Fetches candidates from the strategy-scoring collaborator and exposes
//! loading/error state to presentation code. Requests are numbered; only the
//! most recently issued request may update the state (last-request-wins).

use crate::error::EngageError;
use crate::recommend::adapter::RecommendationAdapter;
use crate::recommend::attribution::ClickAttributor;
use crate::recommend::types::{RawRecommendation, RecommendationCandidate, RecommendationQuery};
use async_trait::async_trait;
use log::{debug, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

/// Strategy-scoring collaborator
#[async_trait]
pub trait StrategyScorer: Send + Sync {
    async fn recommend(&self, query: &RecommendationQuery) -> Result<Vec<RawRecommendation>, EngageError>;
}

/// Retrieval state visible to presentation code
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetrievalState {
    pub loading: bool,
    pub error: Option<String>,
    pub candidates: Vec<RecommendationCandidate>,
    /// Query behind the current state
    pub query: Option<RecommendationQuery>,
    /// Sequence number of that query
    pub sequence: u64,
}

/// Result of one `fetch` call
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Results were applied to the state
    Applied(Vec<RecommendationCandidate>),
    /// Retrieval failed; the state carries the error
    Failed(String),
    /// A newer request was issued; this response was discarded
    Superseded,
}

/// Last-request-wins recommendation retrieval
pub struct RecommendationCoordinator {
    scorer: Arc<dyn StrategyScorer>,
    latest: AtomicU64,
    state: Mutex<RetrievalState>,
}

impl RecommendationCoordinator {
    pub fn new(scorer: Arc<dyn StrategyScorer>) -> Self {
        Self {
            scorer,
            latest: AtomicU64::new(0),
            state: Mutex::new(RetrievalState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RetrievalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the current state
    pub fn state(&self) -> RetrievalState {
        self.lock().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn candidates(&self) -> Vec<RecommendationCandidate> {
        self.lock().candidates.clone()
    }

    /// Fetch recommendations for `query`.
    ///
    /// Never retries. Failures land in the state rather than propagating.
    pub async fn fetch(&self, query: RecommendationQuery) -> FetchOutcome {
        let sequence = self.latest.fetch_add(1, Ordering::SeqCst) + 1;

        if query.limit <= 0 {
            debug!("limit {} requested, skipping retrieval", query.limit);
            let mut state = self.lock();
            if self.latest.load(Ordering::SeqCst) == sequence {
                *state = RetrievalState {
                    loading: false,
                    error: None,
                    candidates: Vec::new(),
                    query: Some(query),
                    sequence,
                };
            }
            return FetchOutcome::Applied(Vec::new());
        }

        {
            let mut state = self.lock();
            state.loading = true;
            state.error = None;
            state.candidates.clear();
            state.query = Some(query.clone());
            state.sequence = sequence;
        }

        let result = self.scorer.recommend(&query).await;

        let mut state = self.lock();
        if self.latest.load(Ordering::SeqCst) != sequence {
            debug!(
                "discarding stale {} response (request {}, latest {})",
                query.strategy,
                sequence,
                self.latest.load(Ordering::SeqCst)
            );
            return FetchOutcome::Superseded;
        }

        state.loading = false;
        match result {
            Ok(raw) => {
                let candidates = RecommendationAdapter::normalize(raw, &query);
                debug!(
                    "applied {} {} candidates for anchor {:?}",
                    candidates.len(),
                    query.strategy,
                    query.anchor_content_id
                );
                state.candidates = candidates.clone();
                FetchOutcome::Applied(candidates)
            }
            Err(e) => {
                warn!("Recommendation retrieval failed ({}): {}", query.strategy, e);
                let message = e.to_string();
                state.candidates.clear();
                state.error = Some(message.clone());
                FetchOutcome::Failed(message)
            }
        }
    }

    /// Attribute a click on a currently displayed candidate.
    ///
    /// Returns the selected candidate so the caller can navigate to it; the
    /// attribution itself runs in the background.
    pub fn select(
        &self,
        attributor: &ClickAttributor,
        item_id: &str,
    ) -> Option<(RecommendationCandidate, Option<JoinHandle<()>>)> {
        let (candidate, anchor) = {
            let state = self.lock();
            let candidate = state.candidates.iter().find(|c| c.item_id == item_id)?.clone();
            let anchor = state.query.as_ref().and_then(|q| q.anchor_content_id.clone());
            (candidate, anchor)
        };
        let handle = attributor.attribute(&candidate, candidate.rank, anchor.as_deref());
        Some((candidate, handle))
    }
}
