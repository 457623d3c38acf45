//! Reading-engagement tracking module
//!
//! This module observes a visitor's engagement with one content item (view,
//! scroll, dwell time, link follow) and reports it to the interaction-logging
//! collaborator.
//!
//! Flow: Lifecycle → Sampler → Scorer → Emitter → InteractionSink

pub mod emitter;
pub mod lifecycle;
pub mod links;
pub mod sampler;
pub mod scorer;
pub mod types;

pub use emitter::{InteractionEmitter, InteractionSink};
pub use lifecycle::{SessionController, SessionPhase};
pub use links::resolve_content_link;
pub use sampler::{depth_percent, ScrollSampler, Throttle};
pub use scorer::{classify, completed_reading, engagement_score};
pub use types::{
    ContentItem, InteractionEvent, InteractionType, PatternReport, ScrollSample, SessionType,
    TrackedSession, ViewportMetrics,
};
