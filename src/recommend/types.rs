//! Recommendation types
//!
//! Queries sent to the strategy-scoring collaborator, the raw shapes it
//! answers with, and the normalized candidates handed to presentation code.

use crate::error::EngageError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default number of recommendations requested
pub const DEFAULT_LIMIT: i32 = 5;

/// Default diversity boost
pub const DEFAULT_DIVERSITY_BOOST: f64 = 0.3;

/// Recommendation scoring strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    ContentBased,
    Collaborative,
    Personalized,
    Trending,
    Hybrid,
}

impl Strategy {
    pub const ALL: [Strategy; 5] = [
        Strategy::ContentBased,
        Strategy::Collaborative,
        Strategy::Personalized,
        Strategy::Trending,
        Strategy::Hybrid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::ContentBased => "content_based",
            Strategy::Collaborative => "collaborative",
            Strategy::Personalized => "personalized",
            Strategy::Trending => "trending",
            Strategy::Hybrid => "hybrid",
        }
    }

    /// Justification used when the collaborator supplies none
    pub fn default_reason(&self) -> &'static str {
        match self {
            Strategy::ContentBased => "Similar to what you're reading",
            Strategy::Collaborative => "Readers like you also read this",
            Strategy::Personalized => "Picked for your interests",
            Strategy::Trending => "Popular right now",
            Strategy::Hybrid => "Recommended for you",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = EngageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "content_based" | "content" | "similar" => Ok(Strategy::ContentBased),
            "collaborative" => Ok(Strategy::Collaborative),
            "personalized" | "personalised" => Ok(Strategy::Personalized),
            "trending" | "popular" => Ok(Strategy::Trending),
            "hybrid" => Ok(Strategy::Hybrid),
            _ => Err(EngageError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Request descriptor for the strategy-scoring collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationQuery {
    /// Item being viewed; `None` asks for the general feed
    pub anchor_content_id: Option<String>,
    pub strategy: Strategy,
    /// Number of items wanted; zero or less yields nothing
    pub limit: i32,
    /// 0.0-1.0
    pub diversity_boost: f64,
    pub include_explanation: bool,
}

impl RecommendationQuery {
    pub fn new(anchor_content_id: Option<String>, strategy: Strategy) -> Self {
        Self {
            anchor_content_id,
            strategy,
            limit: DEFAULT_LIMIT,
            diversity_boost: DEFAULT_DIVERSITY_BOOST,
            include_explanation: true,
        }
    }

    /// Query anchored on a specific content item
    pub fn related_to(anchor: impl Into<String>, strategy: Strategy) -> Self {
        Self::new(Some(anchor.into()), strategy)
    }

    /// Query with no anchor
    pub fn general_feed(strategy: Strategy) -> Self {
        Self::new(None, strategy)
    }

    pub fn with_limit(mut self, limit: i32) -> Self {
        self.limit = limit;
        self
    }

    /// Set the diversity boost, clamped to 0.0-1.0
    pub fn with_diversity_boost(mut self, boost: f64) -> Self {
        self.diversity_boost = if boost.is_nan() { 0.0 } else { boost.clamp(0.0, 1.0) };
        self
    }

    pub fn with_explanation(mut self, include: bool) -> Self {
        self.include_explanation = include;
        self
    }
}

/// Display fields carried through for presentation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayFields {
    pub slug: Option<String>,
    pub image_url: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<String>,
}

/// Normalized recommendation with provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationCandidate {
    pub item_id: String,
    pub title: String,
    pub excerpt: String,
    pub display: DisplayFields,
    pub strategy: Strategy,
    /// 0.0-1.0
    pub confidence: f64,
    /// 1-based position in the returned list
    pub rank: u32,
    pub reason: String,
}

/// One recommendation as returned by the collaborator.
///
/// Strategy, confidence and reason arrive under either of two names
/// depending on the scoring backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRecommendationWire")]
pub struct RawRecommendation {
    pub item_id: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub slug: Option<String>,
    pub image_url: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_level: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_reason: Option<String>,
}

/// Identifier that may be sent as a JSON string or number
#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Number(serde_json::Number),
}

impl WireId {
    fn into_id(self) -> Option<String> {
        let id = match self {
            WireId::Text(text) => text.trim().to_string(),
            WireId::Number(number) => number.to_string(),
        };
        (!id.is_empty()).then_some(id)
    }
}

/// Recommendation as it appears on the wire, before id and image aliases are merged
#[derive(Deserialize)]
struct RawRecommendationWire {
    #[serde(default)]
    item_id: Option<WireId>,
    #[serde(default)]
    id: Option<WireId>,
    #[serde(default)]
    content_id: Option<WireId>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    excerpt: Option<String>,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    featured_image: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    algorithm_used: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    confidence_level: Option<f64>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    primary_reason: Option<String>,
}

impl TryFrom<RawRecommendationWire> for RawRecommendation {
    type Error = String;

    fn try_from(wire: RawRecommendationWire) -> Result<Self, Self::Error> {
        let item_id = [wire.item_id, wire.id, wire.content_id]
            .into_iter()
            .flatten()
            .find_map(WireId::into_id)
            .ok_or_else(|| "recommendation has no item_id, id or content_id".to_string())?;

        Ok(Self {
            item_id,
            title: wire.title.unwrap_or_default(),
            excerpt: wire.excerpt,
            slug: wire.slug,
            image_url: wire.image_url.or(wire.featured_image),
            author: wire.author,
            published_at: wire.published_at,
            source: wire.source,
            algorithm_used: wire.algorithm_used,
            confidence: wire.confidence,
            confidence_level: wire.confidence_level,
            reason: wire.reason,
            primary_reason: wire.primary_reason,
        })
    }
}
