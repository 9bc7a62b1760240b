//! The appliance loop body
//!
//! [`Appliance::tick`] is called every input period with the raw button level,
//! a monotonic millisecond counter and the wall clock. It runs the button state
//! machine, the note timeout and the periodic clock render, in that order, and
//! returns what happened so callers and tests can observe it.

use chrono::Timelike;
use log::{debug, error, info, warn};

use crate::config::{AppConfig, InputTiming};
use crate::http::HttpConnection;
use crate::input::{ButtonEvent, InputController};
use crate::pipeline::{DisplaySink, RenderOutcome, RenderPipeline};
use crate::poem::PoemService;
use crate::state::{DisplayState, ViewMode};
use crate::time_index::{TimeCode, TimeIndex};

/// Observable result of one [`Appliance::tick`].
#[derive(Debug, Default)]
pub struct TickOutput {
    pub event: Option<ButtonEvent>,
    /// Set when a clock render was attempted
    pub render: Option<RenderOutcome>,
}

pub struct Appliance<C, P, D> {
    state: DisplayState,
    input: InputController,
    pipeline: RenderPipeline<C>,
    poems: P,
    display: D,
    timing: InputTiming,
    last_render_at: Option<u64>,
    last_code: Option<TimeCode>,
}

impl<C, P, D> Appliance<C, P, D>
where
    C: HttpConnection,
    P: PoemService,
    D: DisplaySink,
{
    pub fn new(index: TimeIndex, conn: C, poems: P, display: D, config: &AppConfig) -> Self {
        Self::with_pipeline(RenderPipeline::new(index, conn, config), poems, display, config)
    }

    pub fn with_pipeline(
        pipeline: RenderPipeline<C>,
        poems: P,
        display: D,
        config: &AppConfig,
    ) -> Self {
        Self {
            state: DisplayState::default(),
            input: InputController::new(config.timing),
            pipeline,
            poems,
            display,
            timing: config.timing,
            last_render_at: None,
            last_code: None,
        }
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn poems(&self) -> &P {
        &self.poems
    }

    pub fn pipeline_mut(&mut self) -> &mut RenderPipeline<C> {
        &mut self.pipeline
    }

    pub fn tick<T: Timelike>(&mut self, now_ms: u64, pressed: bool, wall: &T) -> TickOutput {
        let mut out = TickOutput {
            event: self.input.poll(pressed, now_ms, self.state.note_shown()),
            render: None,
        };

        if let Some(event) = out.event {
            out.render = self.handle_event(event, now_ms, wall);
        }

        if self.note_expired(now_ms) {
            info!("Note timed out, back to the clock");
            self.state.leave_note();
            out.render = Some(self.redraw_clock(now_ms, wall));
        }

        // Periodic redraw never replaces a note being read
        if out.render.is_none() && !self.state.note_shown() && self.render_due(now_ms, wall) {
            let outcome = self
                .pipeline
                .tick(&mut self.state, wall, &mut self.poems, &mut self.display);
            self.mark_rendered(now_ms, wall);
            out.render = Some(outcome);
        }

        out
    }

    fn handle_event<T: Timelike>(
        &mut self,
        event: ButtonEvent,
        now_ms: u64,
        wall: &T,
    ) -> Option<RenderOutcome> {
        match event {
            ButtonEvent::DismissNote => {
                self.state.leave_note();
                Some(self.redraw_clock(now_ms, wall))
            }
            ButtonEvent::Clicks(1) => {
                self.open_note(now_ms);
                None
            }
            ButtonEvent::Clicks(_) => self.like(now_ms, wall),
        }
    }

    fn open_note(&mut self, now_ms: u64) {
        match self.pipeline.show_note(&mut self.state, now_ms, &mut self.display) {
            Ok(true) => {
                let note_id = self
                    .state
                    .poem
                    .as_ref()
                    .and_then(|p| p.note.as_ref())
                    .and_then(|n| n.id.clone());
                if let Some(id) = note_id {
                    if let Err(e) = self.poems.mark_note_seen(&id) {
                        warn!("Could not mark note {} seen: {}", id, e);
                    }
                }
            }
            Ok(false) => debug!("Single click without a note"),
            Err(e) => error!("Showing note failed: {}", e),
        }
    }

    fn like<T: Timelike>(&mut self, now_ms: u64, wall: &T) -> Option<RenderOutcome> {
        let Some(poem_id) = self.state.poem.as_ref().and_then(|p| p.poem_id.clone()) else {
            info!("Nothing to like, poem has no id");
            return None;
        };

        if self.poems.like(&poem_id).is_err() {
            return None;
        }
        info!("Liked poem {}", poem_id);

        let previous = self.state.mode;
        if let Err(e) = self.display.show_acknowledgment() {
            error!("Acknowledgment failed: {}", e);
        }

        match previous {
            ViewMode::Note => {
                if let Err(e) = self.pipeline.show_note(&mut self.state, now_ms, &mut self.display) {
                    error!("Restoring note failed: {}", e);
                }
                None
            }
            ViewMode::Clock => {
                self.state.last_rendered = None;
                Some(self.redraw_clock(now_ms, wall))
            }
        }
    }

    fn redraw_clock<T: Timelike>(&mut self, now_ms: u64, wall: &T) -> RenderOutcome {
        let outcome = self
            .pipeline
            .redraw(&mut self.state, wall, &mut self.poems, &mut self.display);
        self.mark_rendered(now_ms, wall);
        outcome
    }

    fn note_expired(&self, now_ms: u64) -> bool {
        self.state.note_shown()
            && !self.input.is_pressing()
            && self
                .state
                .note_age(now_ms)
                .is_some_and(|age| age >= self.timing.note_timeout_ms)
    }

    fn render_due<T: Timelike>(&self, now_ms: u64, wall: &T) -> bool {
        let interval_elapsed = self
            .last_render_at
            .map_or(true, |at| now_ms.saturating_sub(at) >= self.timing.render_interval_ms);
        interval_elapsed || self.last_code != Some(TimeCode::from_time(wall))
    }

    fn mark_rendered<T: Timelike>(&mut self, now_ms: u64, wall: &T) {
        self.last_render_at = Some(now_ms);
        self.last_code = Some(TimeCode::from_time(wall));
    }
}
