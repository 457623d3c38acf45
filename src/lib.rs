//! Synheart Engage - Reading-engagement tracking and recommendation retrieval
//!
//! Engage observes how a visitor engages with a content item and turns the raw
//! telemetry into engagement signals: throttled scroll sampling → engagement
//! scoring → interaction emission, all driven by a session lifecycle with a
//! heartbeat. Alongside it, a retrieval coordinator requests recommendations
//! from pluggable scoring strategies and attributes clicks on them.
//!
//! ## Modules
//!
//! - **Tracking**: Sample, score and report engagement with one content item
//! - **Recommend**: Retrieve, normalize and attribute recommendations
//! - **Replay**: Run recorded interaction traces through the tracker offline

pub mod clock;
pub mod config;
pub mod error;
pub mod recommend;
pub mod replay;
pub mod tracking;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::TrackerConfig;
pub use error::EngageError;

// Tracking exports
pub use tracking::{
    ContentItem, InteractionEvent, InteractionSink, SessionController, SessionPhase,
};

// Recommendation exports
pub use recommend::{
    ClickAttributor, ClickSink, FetchOutcome, RecommendationCandidate, RecommendationCoordinator,
    RecommendationQuery, StrategyScorer, Strategy,
};

pub use replay::{parse_trace, replay_trace, InteractionTrace, ReplayReport};

/// Engage version
pub const ENGAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name attached to CLI reports
pub const PRODUCER_NAME: &str = "synheart-engage";
