//! Recommendation response adapter
//!
//! Scoring backends disagree on field names: strategy arrives as `source` or
//! `algorithm_used`, confidence as `confidence` or `confidence_level`, and the
//! justification as `reason` or `primary_reason`. This adapter is the single
//! place that reconciles them into [`RecommendationCandidate`]s.

use crate::error::EngageError;
use crate::recommend::types::{
    DisplayFields, RawRecommendation, RecommendationCandidate, RecommendationQuery, Strategy,
};
use log::warn;
use serde::Deserialize;
use serde_json::Value;

/// Response body: either a bare list or wrapped in an envelope
#[derive(Deserialize)]
#[serde(untagged)]
enum ResponseBody {
    List(Vec<Value>),
    Envelope {
        #[serde(alias = "results", alias = "items")]
        recommendations: Vec<Value>,
    },
}

/// Adapter for normalizing strategy-scoring responses
pub struct RecommendationAdapter;

impl RecommendationAdapter {
    /// Parse a JSON response body into raw recommendations.
    ///
    /// Items that cannot be read are skipped with a warning; the rest of the
    /// response is kept.
    pub fn parse_response(json: &str) -> Result<Vec<RawRecommendation>, EngageError> {
        let body: ResponseBody = serde_json::from_str(json).map_err(|e| {
            EngageError::ParseError(format!("Failed to parse recommendation response: {}", e))
        })?;
        let items = match body {
            ResponseBody::List(items) => items,
            ResponseBody::Envelope { recommendations } => recommendations,
        };

        Ok(items
            .into_iter()
            .enumerate()
            .filter_map(|(idx, item)| match serde_json::from_value(item) {
                Ok(raw) => Some(raw),
                Err(e) => {
                    warn!("Skipping malformed recommendation at index {}: {}", idx, e);
                    None
                }
            })
            .collect())
    }

    /// Normalize raw recommendations, ranking them by response order.
    ///
    /// At most `query.limit` candidates are returned.
    pub fn normalize(
        raw: Vec<RawRecommendation>,
        query: &RecommendationQuery,
    ) -> Vec<RecommendationCandidate> {
        let limit = usize::try_from(query.limit).unwrap_or(0);
        raw.into_iter()
            .take(limit)
            .enumerate()
            .map(|(idx, item)| normalize_one(item, idx as u32 + 1, query))
            .collect()
    }
}

fn normalize_one(raw: RawRecommendation, rank: u32, query: &RecommendationQuery) -> RecommendationCandidate {
    let strategy = resolve_strategy(&raw, query.strategy);
    let confidence = resolve_confidence(&raw);
    let reason = resolve_reason(&raw, strategy, query.include_explanation);

    RecommendationCandidate {
        item_id: raw.item_id,
        title: raw.title,
        excerpt: raw.excerpt.unwrap_or_default(),
        display: DisplayFields {
            slug: raw.slug,
            image_url: raw.image_url,
            author: raw.author,
            published_at: raw.published_at,
        },
        strategy,
        confidence,
        rank,
        reason,
    }
}

/// Strategy from `source`, then `algorithm_used`, then the query's own
fn resolve_strategy(raw: &RawRecommendation, requested: Strategy) -> Strategy {
    let Some(name) = raw.source.as_deref().or(raw.algorithm_used.as_deref()) else {
        return requested;
    };
    name.parse().unwrap_or_else(|_| {
        warn!(
            "Unknown strategy '{}' for item {}, using {}",
            name, raw.item_id, requested
        );
        requested
    })
}

/// Confidence from `confidence`, then `confidence_level`, clamped to 0.0-1.0
fn resolve_confidence(raw: &RawRecommendation) -> f64 {
    match raw.confidence.or(raw.confidence_level) {
        Some(value) if value.is_finite() => value.clamp(0.0, 1.0),
        _ => 0.0,
    }
}

/// Reason from `reason`, then `primary_reason`, then the strategy default
fn resolve_reason(raw: &RawRecommendation, strategy: Strategy, include_explanation: bool) -> String {
    match raw
        .reason
        .as_deref()
        .or(raw.primary_reason.as_deref())
        .filter(|r| !r.trim().is_empty())
    {
        Some(reason) => reason.to_string(),
        None if include_explanation => strategy.default_reason().to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn query() -> RecommendationQuery {
        RecommendationQuery::related_to("post-42", Strategy::Hybrid).with_limit(10)
    }

    fn parse_one(json: &str) -> RawRecommendation {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_field_name_variants_normalize_identically() {
        let legacy = parse_one(
            r#"{"item_id": "post-7", "title": "Seven", "algorithm_used": "trending",
                "confidence_level": 0.72, "primary_reason": "Popular"}"#,
        );
        let current = parse_one(
            r#"{"item_id": "post-7", "title": "Seven", "source": "trending",
                "confidence": 0.72, "reason": "Popular"}"#,
        );

        let a = RecommendationAdapter::normalize(vec![legacy], &query());
        let b = RecommendationAdapter::normalize(vec![current], &query());

        assert_eq!(a, b);
        assert_eq!(a[0].strategy, Strategy::Trending);
        assert_eq!(a[0].confidence, 0.72);
        assert_eq!(a[0].reason, "Popular");
    }

    #[test]
    fn test_rank_follows_response_order() {
        let raw = vec![
            parse_one(r#"{"item_id": "c", "confidence": 0.2}"#),
            parse_one(r#"{"item_id": "a", "confidence": 0.9}"#),
            parse_one(r#"{"item_id": "b", "confidence": 0.5}"#),
        ];
        let candidates = RecommendationAdapter::normalize(raw, &query());

        let ranked: Vec<_> = candidates.iter().map(|c| (c.item_id.as_str(), c.rank)).collect();
        assert_eq!(ranked, vec![("c", 1), ("a", 2), ("b", 3)]);
    }

    #[test]
    fn test_limit_truncates() {
        let raw = (0..8)
            .map(|i| RawRecommendation {
                item_id: format!("post-{}", i),
                ..Default::default()
            })
            .collect();
        let candidates = RecommendationAdapter::normalize(raw, &query().with_limit(3));
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[2].rank, 3);
    }

    #[test]
    fn test_missing_fields_fall_back() {
        let raw = parse_one(r#"{"item_id": "post-1"}"#);
        let candidate = &RecommendationAdapter::normalize(vec![raw.clone()], &query())[0];

        assert_eq!(candidate.strategy, Strategy::Hybrid);
        assert_eq!(candidate.confidence, 0.0);
        assert_eq!(candidate.reason, Strategy::Hybrid.default_reason());
        assert_eq!(candidate.excerpt, "");

        let quiet = RecommendationAdapter::normalize(vec![raw], &query().with_explanation(false));
        assert_eq!(quiet[0].reason, "");
    }

    #[test]
    fn test_unknown_strategy_and_out_of_range_confidence() {
        let raw = parse_one(r#"{"item_id": "post-1", "source": "graph_walk", "confidence": 1.8}"#);
        let candidate = &RecommendationAdapter::normalize(vec![raw], &query())[0];
        assert_eq!(candidate.strategy, Strategy::Hybrid);
        assert_eq!(candidate.confidence, 1.0);
    }

    #[test]
    fn test_primary_name_wins_when_both_present() {
        let raw = parse_one(
            r#"{"item_id": "post-1", "source": "collaborative", "algorithm_used": "trending",
                "confidence": 0.4, "confidence_level": 0.9}"#,
        );
        let candidate = &RecommendationAdapter::normalize(vec![raw], &query())[0];
        assert_eq!(candidate.strategy, Strategy::Collaborative);
        assert_eq!(candidate.confidence, 0.4);
    }

    #[test]
    fn test_parse_response_shapes() {
        let bare = RecommendationAdapter::parse_response(r#"[{"id": "a"}, {"id": "b"}]"#).unwrap();
        assert_eq!(bare.len(), 2);

        let wrapped =
            RecommendationAdapter::parse_response(r#"{"recommendations": [{"item_id": "a"}]}"#).unwrap();
        assert_eq!(wrapped[0].item_id, "a");

        let results = RecommendationAdapter::parse_response(r#"{"results": []}"#).unwrap();
        assert!(results.is_empty());

        assert!(matches!(
            RecommendationAdapter::parse_response("not json"),
            Err(EngageError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_response_numeric_ids() {
        let raw =
            RecommendationAdapter::parse_response(r#"[{"id": 42, "title": "T", "source": "trending"}]"#)
                .unwrap();
        let candidates = RecommendationAdapter::normalize(raw, &query());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].item_id, "42");
        assert_eq!(candidates[0].strategy, Strategy::Trending);
    }

    #[test]
    fn test_malformed_item_does_not_drop_response() {
        let raw = RecommendationAdapter::parse_response(
            r#"{"items": [
                {"id": "a", "item_id": "a"},
                {"title": "missing id"},
                {"id": "b", "confidence": "high"},
                {"content_id": 7}
            ]}"#,
        )
        .unwrap();
        let ids: Vec<_> = raw.iter().map(|r| r.item_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "7"]);

        let ranked = RecommendationAdapter::normalize(raw, &query());
        assert_eq!(ranked[1].rank, 2);
    }

    #[test]
    fn test_display_fields_carried() {
        let raw = parse_one(
            r#"{"item_id": "post-3", "title": "Three", "excerpt": "About three",
                "slug": "three", "featured_image": "/i/3.jpg", "author": "Ada",
                "published_at": "2024-01-15T14:00:00Z"}"#,
        );
        let candidate = &RecommendationAdapter::normalize(vec![raw], &query())[0];
        assert_eq!(
            candidate.display,
            DisplayFields {
                slug: Some("three".to_string()),
                image_url: Some("/i/3.jpg".to_string()),
                author: Some("Ada".to_string()),
                published_at: Some("2024-01-15T14:00:00Z".to_string()),
            }
        );
        assert_eq!(candidate.excerpt, "About three");
    }
}
