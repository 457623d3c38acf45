//! Scroll depth sampling
//!
//! Converts raw scroll geometry into depth percentages and feeds them into
//! the active session at a bounded rate.

use crate::tracking::types::{ScrollSample, TrackedSession, ViewportMetrics};

/// Compute scroll depth as a percentage of the scrollable range
///
/// Formula: `round(scroll_top / (scroll_height - viewport_height) * 100)`,
/// clamped to 0-100. A page that cannot scroll reports 0.
pub fn depth_percent(metrics: &ViewportMetrics) -> u8 {
    let scrollable = metrics.scroll_height - metrics.viewport_height;
    if scrollable <= 0.0 || !scrollable.is_finite() {
        return 0;
    }
    let pct = (metrics.scroll_top / scrollable * 100.0).round();
    if pct.is_nan() {
        return 0;
    }
    pct.clamp(0.0, 100.0) as u8
}

/// Rate limiter that admits at most one call per interval
#[derive(Debug, Clone)]
pub struct Throttle {
    interval_ms: u64,
    last_accepted_ms: Option<u64>,
}

impl Throttle {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_accepted_ms: None,
        }
    }

    /// Admit the call at `now_ms` if the interval has elapsed since the last admission
    pub fn try_acquire(&mut self, now_ms: u64) -> bool {
        match self.last_accepted_ms {
            Some(last) if now_ms.saturating_sub(last) < self.interval_ms => false,
            _ => {
                self.last_accepted_ms = Some(now_ms);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last_accepted_ms = None;
    }
}

/// Throttled scroll sampler bound to one session at a time
#[derive(Debug, Clone)]
pub struct ScrollSampler {
    throttle: Throttle,
}

impl ScrollSampler {
    pub fn new(throttle_ms: u64) -> Self {
        Self {
            throttle: Throttle::new(throttle_ms),
        }
    }

    /// Take a sample at `now_ms` and record it into `session`.
    ///
    /// Returns the accepted sample, or `None` when throttled.
    pub fn sample(
        &mut self,
        session: &mut TrackedSession,
        metrics: &ViewportMetrics,
        now_ms: u64,
    ) -> Option<ScrollSample> {
        if !self.throttle.try_acquire(now_ms) {
            return None;
        }

        let sample = ScrollSample {
            depth_percent: depth_percent(metrics),
            timestamp_ms: now_ms,
        };
        session.record_sample(sample).then_some(sample)
    }

    /// Forget throttle history, for a new session
    pub fn reset(&mut self) {
        self.throttle.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::types::ContentItem;

    fn metrics(scroll_top: f64) -> ViewportMetrics {
        ViewportMetrics {
            scroll_top,
            viewport_height: 800.0,
            scroll_height: 2800.0,
        }
    }

    #[test]
    fn test_depth_percent() {
        assert_eq!(depth_percent(&metrics(0.0)), 0);
        assert_eq!(depth_percent(&metrics(1000.0)), 50);
        assert_eq!(depth_percent(&metrics(2000.0)), 100);
        // 333 / 2000 = 16.65% rounds to 17
        assert_eq!(depth_percent(&metrics(333.0)), 17);
    }

    #[test]
    fn test_depth_percent_clamped() {
        // Overscroll (rubber-banding) past either end
        assert_eq!(depth_percent(&metrics(2500.0)), 100);
        assert_eq!(depth_percent(&metrics(-40.0)), 0);
    }

    #[test]
    fn test_unscrollable_page_is_zero() {
        let short = ViewportMetrics {
            scroll_top: 0.0,
            viewport_height: 900.0,
            scroll_height: 900.0,
        };
        assert_eq!(depth_percent(&short), 0);

        let shorter = ViewportMetrics {
            scroll_top: 10.0,
            viewport_height: 900.0,
            scroll_height: 400.0,
        };
        assert_eq!(depth_percent(&shorter), 0);
    }

    #[test]
    fn test_throttle_interval() {
        let mut throttle = Throttle::new(150);
        assert!(throttle.try_acquire(1_000));
        assert!(!throttle.try_acquire(1_100));
        assert!(!throttle.try_acquire(1_149));
        assert!(throttle.try_acquire(1_150));
        assert!(!throttle.try_acquire(1_200));
        assert!(throttle.try_acquire(1_400));
    }

    #[test]
    fn test_throttle_reset() {
        let mut throttle = Throttle::new(150);
        assert!(throttle.try_acquire(0));
        throttle.reset();
        assert!(throttle.try_acquire(10));
    }

    #[test]
    fn test_sampler_records_into_session() {
        let mut session = TrackedSession::new(ContentItem::new("post-1"), 0, 100, 50);
        let mut sampler = ScrollSampler::new(150);

        assert!(sampler.sample(&mut session, &metrics(500.0), 100).is_some());
        // Throttled: only 50ms later
        assert!(sampler.sample(&mut session, &metrics(1500.0), 150).is_none());
        let accepted = sampler.sample(&mut session, &metrics(1500.0), 260).unwrap();

        assert_eq!(accepted.depth_percent, 75);
        assert_eq!(session.scroll_samples().len(), 2);
        assert_eq!(session.max_depth_percent(), 75);
    }

    #[test]
    fn test_sampler_bounds_event_volume() {
        let mut session = TrackedSession::new(ContentItem::new("post-1"), 0, 100, 50);
        let mut sampler = ScrollSampler::new(150);

        // A scroll event every 10ms for 3 seconds
        let accepted = (0..300u64)
            .filter(|i| {
                sampler
                    .sample(&mut session, &metrics(*i as f64 * 6.0), i * 10)
                    .is_some()
            })
            .count();

        assert_eq!(accepted, 20);
    }
}
