//! Recommendation retrieval module
//!
//! Requests recommendations for an anchor item and strategy, reconciles the
//! heterogeneous response shapes of the scoring backends, and attributes
//! clicks on rendered results.
//!
//! Pipeline: Query → StrategyScorer → Adapter → Candidates → ClickAttributor

pub mod adapter;
pub mod attribution;
pub mod coordinator;
pub mod types;

pub use adapter::RecommendationAdapter;
pub use attribution::{AttributionPayload, ClickAttributor, ClickSink};
pub use coordinator::{FetchOutcome, RecommendationCoordinator, RetrievalState, StrategyScorer};
pub use types::{
    DisplayFields, RawRecommendation, RecommendationCandidate, RecommendationQuery, Strategy,
};
