//! Session lifecycle control
//!
//! Owns the tracked session for the content item currently on screen and
//! drives it through `Idle -> Active -> TornDown`. While active, a heartbeat
//! periodically reports reading time; hiding the page flushes it too.
//!
//! Every session carries a generation number. The heartbeat task captures the
//! generation it was spawned for and stops as soon as it no longer matches, so
//! a torn-down session can never report into its successor.

use crate::clock::{Clock, SystemClock};
use crate::config::TrackerConfig;
use crate::tracking::emitter::{InteractionEmitter, InteractionSink};
use crate::tracking::links::resolve_content_link;
use crate::tracking::sampler::ScrollSampler;
use crate::tracking::types::{
    ContentItem, InteractionEvent, ScrollSample, TrackedSession, ViewportMetrics,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Lifecycle phase of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Active,
    TornDown,
}

struct ControllerState {
    phase: SessionPhase,
    session: Option<TrackedSession>,
    sampler: ScrollSampler,
    generation: u64,
    page_hidden: bool,
    tracking_enabled: bool,
}

struct ControllerInner {
    state: Mutex<ControllerState>,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
    emitter: InteractionEmitter,
    clock: Arc<dyn Clock>,
    config: TrackerConfig,
}

/// Tracks one content item at a time
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<ControllerInner>,
}

impl SessionController {
    pub fn new(config: TrackerConfig, sink: Arc<dyn InteractionSink>, clock: Arc<dyn Clock>) -> Self {
        let emitter = InteractionEmitter::new(sink, config.min_reading_time_ms);
        let state = ControllerState {
            phase: SessionPhase::Idle,
            session: None,
            sampler: ScrollSampler::new(config.sample_throttle_ms),
            generation: 0,
            page_hidden: false,
            tracking_enabled: config.enabled,
        };

        Self {
            inner: Arc::new(ControllerInner {
                state: Mutex::new(state),
                heartbeat: Mutex::new(None),
                emitter,
                clock,
                config,
            }),
        }
    }

    /// Controller reading time from the tokio clock
    pub fn with_system_clock(config: TrackerConfig, sink: Arc<dyn InteractionSink>) -> Self {
        Self::new(config, sink, Arc::new(SystemClock::new()))
    }

    pub fn phase(&self) -> SessionPhase {
        self.inner.state().phase
    }

    pub fn generation(&self) -> u64 {
        self.inner.state().generation
    }

    pub fn is_page_hidden(&self) -> bool {
        self.inner.state().page_hidden
    }

    pub fn current_content_id(&self) -> Option<String> {
        self.inner
            .state()
            .session
            .as_ref()
            .map(|s| s.content_id().to_string())
    }

    /// Copy of the active session, if any
    pub fn session_snapshot(&self) -> Option<TrackedSession> {
        self.inner.state().session.clone()
    }

    /// Begin tracking `item`.
    ///
    /// A different item already being tracked is torn down first. Starting the
    /// item that is already active does nothing.
    pub async fn start(&self, item: ContentItem) {
        {
            let state = self.inner.state();
            if !state.tracking_enabled {
                debug!("tracking disabled, not starting session for {}", item.id);
                return;
            }
            if state.phase == SessionPhase::Active
                && state.session.as_ref().map(|s| s.content_id()) == Some(item.id.as_str())
            {
                return;
            }
        }

        self.teardown().await;

        let (view, generation) = {
            let mut state = self.inner.state();
            state.generation += 1;
            state.sampler.reset();
            state.page_hidden = false;

            let cfg = &self.inner.config;
            let mut session = TrackedSession::new(
                item,
                self.inner.clock.now_ms(),
                cfg.sample_buffer_cap,
                cfg.sample_buffer_retain,
            );
            let metadata = session.content.event_metadata();
            let view = self.inner.emitter.view_event(&mut session, metadata);

            info!(
                "Started tracking {} (session {}, generation {})",
                session.content_id(),
                session.session_id,
                state.generation
            );
            state.session = Some(session);
            state.phase = SessionPhase::Active;
            (view, state.generation)
        };

        if let Some(event) = view {
            self.inner.emitter.dispatch(&event).await;
        }

        self.inner.spawn_heartbeat(generation);
    }

    /// Feed a scroll event; returns the sample if the throttle admitted it
    pub fn on_scroll(&self, metrics: &ViewportMetrics) -> Option<ScrollSample> {
        let now_ms = self.inner.clock.now_ms();
        let mut guard = self.inner.state();
        let state = &mut *guard;
        if state.phase != SessionPhase::Active {
            return None;
        }
        let session = state.session.as_mut()?;
        state.sampler.sample(session, metrics, now_ms)
    }

    /// Page visibility changed; hiding the page flushes reading time
    pub async fn on_visibility_change(&self, visible: bool) -> Option<InteractionEvent> {
        let event = {
            let mut state = self.inner.state();
            state.page_hidden = !visible;
            if visible || state.phase != SessionPhase::Active {
                return None;
            }
            let session = state.session.as_ref()?;
            self.inner
                .emitter
                .reading_time_event(session, self.inner.clock.now_ms())?
        };

        self.inner.emitter.dispatch(&event).await;
        Some(event)
    }

    /// A link was activated; emits a click when it targets another content item
    pub async fn on_link_activated(&self, href: &str, link_text: &str) -> bool {
        let Some(target) = resolve_content_link(href, &self.inner.config.trackable_path_prefixes) else {
            return false;
        };

        let event = {
            let state = self.inner.state();
            let Some(session) = state.session.as_ref() else {
                return false;
            };
            if state.phase != SessionPhase::Active || session.content_id() == target {
                return false;
            }
            self.inner
                .emitter
                .click_event(session.session_id, &target, href, link_text)
        };

        self.inner.emitter.dispatch(&event).await;
        true
    }

    /// Report reading time for the active session now, outside the timer
    pub async fn heartbeat(&self) -> Option<InteractionEvent> {
        let generation = self.generation();
        self.inner.heartbeat_for(generation).await.flatten()
    }

    /// Enable or disable tracking; disabling tears down the active session
    pub async fn set_tracking_enabled(&self, enabled: bool) -> Option<InteractionEvent> {
        self.inner.state().tracking_enabled = enabled;
        if enabled {
            return None;
        }
        self.teardown().await
    }

    /// Tear down the active session with one final reading-time flush.
    ///
    /// The heartbeat is cancelled before the flush is awaited.
    pub async fn teardown(&self) -> Option<InteractionEvent> {
        let (session, now_ms) = {
            let mut state = self.inner.state();
            if state.phase != SessionPhase::Active {
                return None;
            }
            state.generation += 1;
            state.phase = SessionPhase::TornDown;
            state.page_hidden = false;
            (state.session.take()?, self.inner.clock.now_ms())
        };
        self.inner.cancel_heartbeat();

        info!(
            "Tearing down session {} for {}",
            session.session_id,
            session.content_id()
        );
        self.inner.emitter.emit_reading_time(&session, now_ms).await
    }
}

impl ControllerInner {
    fn state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reading-time flush guarded by `generation`.
    ///
    /// Returns `None` when the generation is stale, `Some(event)` otherwise.
    async fn heartbeat_for(&self, generation: u64) -> Option<Option<InteractionEvent>> {
        let event = {
            let state = self.state();
            if state.generation != generation || state.phase != SessionPhase::Active {
                return None;
            }
            state
                .session
                .as_ref()
                .and_then(|s| self.emitter.reading_time_event(s, self.clock.now_ms()))
        };

        if let Some(event) = &event {
            self.emitter.dispatch(event).await;
        }
        Some(event)
    }

    fn spawn_heartbeat(self: &Arc<Self>, generation: u64) {
        let interval_ms = self.config.heartbeat_interval_ms;
        if interval_ms == 0 {
            return;
        }

        let mut slot = self.heartbeat.lock().unwrap_or_else(PoisonError::into_inner);
        if self.state().generation != generation {
            return;
        }
        if let Some(handle) = slot.take() {
            handle.abort();
        }

        let weak: Weak<ControllerInner> = Arc::downgrade(self);
        let period = Duration::from_millis(interval_ms);
        let first_tick = Instant::now() + period;

        *slot = Some(tokio::spawn(async move {
            let mut interval = time::interval_at(first_tick, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;

                let Some(inner) = weak.upgrade() else {
                    break;
                };
                if inner.heartbeat_for(generation).await.is_none() {
                    debug!("heartbeat for generation {} is stale, stopping", generation);
                    break;
                }
            }
        }));
    }

    fn cancel_heartbeat(&self) {
        let handle = self
            .heartbeat
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}
