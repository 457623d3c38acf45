//! Engagement scoring
//!
//! Pure functions turning a session's scroll samples and elapsed time into an
//! engagement score, a reading-pattern report and the completed-reading flag.

use crate::tracking::types::{PatternReport, ScrollSample, SessionType};

/// Dwell time at which the time component saturates (3 minutes)
const TIME_SATURATION_MS: f64 = 180_000.0;

/// Minimum samples needed to classify a reading pattern
pub const MIN_SAMPLES_FOR_PATTERN: usize = 5;

/// Sessions longer than this are deep reading (5 minutes)
const DEEP_READING_MS: u64 = 300_000;

/// Sessions longer than this are moderate reading (2 minutes)
const MODERATE_READING_MS: u64 = 120_000;

/// Depth a reader must pass for a read to count as completed
const COMPLETION_DEPTH_PERCENT: u8 = 80;

const TIME_WEIGHT: f64 = 0.35;
const DEPTH_WEIGHT: f64 = 0.40;
const VELOCITY_WEIGHT: f64 = 0.25;

/// Compute the engagement score (weighted combination)
///
/// Formula:
/// ```text
/// Engagement = 0.35 * min(time_spent_ms / 180000, 1)
///            + 0.40 * (max_depth_percent / 100)
///            + 0.25 * min(reading_velocity, 1)
/// ```
pub fn engagement_score(time_spent_ms: u64, max_depth_percent: u8, reading_velocity: f64) -> f64 {
    let time_component = (time_spent_ms as f64 / TIME_SATURATION_MS).min(1.0);
    let depth_component = f64::from(max_depth_percent.min(100)) / 100.0;
    let velocity_component = if reading_velocity.is_finite() {
        reading_velocity.clamp(0.0, 1.0)
    } else {
        0.0
    };

    let score = TIME_WEIGHT * time_component
        + DEPTH_WEIGHT * depth_component
        + VELOCITY_WEIGHT * velocity_component;
    score.clamp(0.0, 1.0)
}

/// Engagement score scaled to the 0-100 integer range used on the wire
pub fn engagement_score_percent(score: f64) -> u8 {
    (score * 100.0).round().clamp(0.0, 100.0) as u8
}

impl SessionType {
    /// Classify a session purely by elapsed time
    pub fn from_elapsed(time_spent_ms: u64) -> Self {
        if time_spent_ms > DEEP_READING_MS {
            SessionType::DeepReading
        } else if time_spent_ms > MODERATE_READING_MS {
            SessionType::ModerateReading
        } else {
            SessionType::Scanning
        }
    }
}

/// Classify the reading pattern of a session
///
/// Returns `None` with fewer than five samples: there is not enough signal.
pub fn classify(samples: &[ScrollSample], time_spent_ms: u64) -> Option<PatternReport> {
    if samples.len() < MIN_SAMPLES_FOR_PATTERN {
        return None;
    }

    let reading_velocity = compute_reading_velocity(samples.len(), time_spent_ms);
    let avg_depth_increment = compute_avg_depth_increment(samples);
    let scroll_consistency = if avg_depth_increment > 0.0 { 1.0 } else { 0.5 };

    Some(PatternReport {
        reading_velocity,
        avg_depth_increment,
        session_type: SessionType::from_elapsed(time_spent_ms),
        scroll_consistency,
        sample_count: samples.len(),
    })
}

/// Whether a session counts as a completed read
pub fn completed_reading(time_spent_ms: u64, max_depth_percent: u8) -> bool {
    time_spent_ms > MODERATE_READING_MS && max_depth_percent > COMPLETION_DEPTH_PERCENT
}

/// Samples per second of session time
fn compute_reading_velocity(sample_count: usize, time_spent_ms: u64) -> f64 {
    if time_spent_ms == 0 {
        return 0.0;
    }
    sample_count as f64 / (time_spent_ms as f64 / 1000.0)
}

/// Mean of consecutive signed depth deltas
fn compute_avg_depth_increment(samples: &[ScrollSample]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }

    let total: f64 = samples
        .windows(2)
        .map(|pair| f64::from(pair[1].depth_percent) - f64::from(pair[0].depth_percent))
        .sum();
    total / (samples.len() - 1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(depths: &[u8]) -> Vec<ScrollSample> {
        depths
            .iter()
            .enumerate()
            .map(|(i, &d)| ScrollSample {
                depth_percent: d,
                timestamp_ms: i as u64 * 1_000,
            })
            .collect()
    }

    #[test]
    fn test_score_saturates_at_one() {
        let score = engagement_score(180_000, 100, 1.0);
        assert!((score - 1.0).abs() < 1e-9);

        // Beyond every cap still saturates
        assert!((engagement_score(900_000, 100, 7.5) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_zero() {
        assert_eq!(engagement_score(0, 0, 0.0), 0.0);
    }

    #[test]
    fn test_score_weights() {
        assert!((engagement_score(180_000, 0, 0.0) - 0.35).abs() < 1e-9);
        assert!((engagement_score(0, 100, 0.0) - 0.40).abs() < 1e-9);
        assert!((engagement_score(0, 0, 1.0) - 0.25).abs() < 1e-9);

        // 90s = half the time cap, 50% depth, 0.4 velocity
        let expected = 0.35 * 0.5 + 0.40 * 0.5 + 0.25 * 0.4;
        assert!((engagement_score(90_000, 50, 0.4) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_score_ignores_invalid_velocity() {
        assert_eq!(engagement_score(0, 0, f64::NAN), 0.0);
        assert_eq!(engagement_score(0, 0, -3.0), 0.0);
    }

    #[test]
    fn test_score_percent() {
        assert_eq!(engagement_score_percent(0.0), 0);
        assert_eq!(engagement_score_percent(0.455), 46);
        assert_eq!(engagement_score_percent(1.0), 100);
    }

    #[test]
    fn test_classify_needs_five_samples() {
        for n in 0..MIN_SAMPLES_FOR_PATTERN {
            let s = samples(&vec![10; n]);
            assert!(classify(&s, 0).is_none());
            assert!(classify(&s, 60_000).is_none());
            assert!(classify(&s, 600_000).is_none());
        }
        assert!(classify(&samples(&[1, 2, 3, 4, 5]), 60_000).is_some());
    }

    #[test]
    fn test_classify_forward_reading() {
        let report = classify(&samples(&[0, 20, 40, 60, 80]), 10_000).unwrap();

        // 5 samples over 10 seconds
        assert!((report.reading_velocity - 0.5).abs() < 1e-9);
        assert!((report.avg_depth_increment - 20.0).abs() < 1e-9);
        assert_eq!(report.scroll_consistency, 1.0);
        assert_eq!(report.session_type, SessionType::Scanning);
        assert_eq!(report.sample_count, 5);
    }

    #[test]
    fn test_classify_back_and_forth() {
        let report = classify(&samples(&[50, 20, 60, 10, 30]), 200_000).unwrap();

        // Net delta -20 over 4 steps
        assert!((report.avg_depth_increment + 5.0).abs() < 1e-9);
        assert_eq!(report.scroll_consistency, 0.5);
        assert_eq!(report.session_type, SessionType::ModerateReading);
    }

    #[test]
    fn test_classify_zero_time_has_zero_velocity() {
        let report = classify(&samples(&[0, 10, 20, 30, 40]), 0).unwrap();
        assert_eq!(report.reading_velocity, 0.0);
    }

    #[test]
    fn test_session_type_thresholds() {
        assert_eq!(SessionType::from_elapsed(0), SessionType::Scanning);
        assert_eq!(SessionType::from_elapsed(120_000), SessionType::Scanning);
        assert_eq!(SessionType::from_elapsed(120_001), SessionType::ModerateReading);
        assert_eq!(SessionType::from_elapsed(130_000), SessionType::ModerateReading);
        assert_eq!(SessionType::from_elapsed(300_000), SessionType::ModerateReading);
        assert_eq!(SessionType::from_elapsed(300_001), SessionType::DeepReading);
    }

    #[test]
    fn test_completed_reading_policy() {
        assert!(completed_reading(130_000, 90));
        assert!(!completed_reading(120_000, 90));
        assert!(!completed_reading(130_000, 80));
        assert!(completed_reading(120_001, 81));
        assert!(!completed_reading(60_000, 100));
    }

    #[test]
    fn test_scenario_post_42() {
        // Three samples at [10, 45, 90] over 130 seconds
        let s = samples(&[10, 45, 90]);
        let elapsed = 130_000;
        let max_depth = 90;

        assert!(classify(&s, elapsed).is_none());
        assert_eq!(SessionType::from_elapsed(elapsed), SessionType::ModerateReading);
        assert!(completed_reading(elapsed, max_depth));

        let score = engagement_score(elapsed, max_depth, 0.0);
        let expected = 0.35 * (130_000.0 / 180_000.0) + 0.40 * 0.90;
        assert!((score - expected).abs() < 1e-9);
    }
}
