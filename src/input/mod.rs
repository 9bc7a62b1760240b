//! Input handling for the single front button
//!
//! The controller is fed one raw sample per input tick and owns debouncing and
//! click counting. It never touches a pin or a clock itself, the caller passes
//! the level and a millisecond timestamp.

use log::{debug, info};

use crate::config::InputTiming;

// Re-export the public types
pub mod types;
pub use types::*;

/// Debounce and click classification for one button
#[derive(Debug, Clone)]
pub struct InputController {
    timing: InputTiming,
    raw: ButtonState,
    raw_since: u64,
    debounced: ButtonState,
    clicks: u32,
    deadline: Option<u64>,
}

impl InputController {
    pub fn new(timing: InputTiming) -> Self {
        Self {
            timing,
            raw: ButtonState::Released,
            raw_since: 0,
            debounced: ButtonState::Released,
            clicks: 0,
            deadline: None,
        }
    }

    /// Feed one raw sample. `note_shown` routes the next committed press to
    /// [`ButtonEvent::DismissNote`] instead of the click counter.
    pub fn poll(&mut self, pressed: bool, now_ms: u64, note_shown: bool) -> Option<ButtonEvent> {
        let raw = ButtonState::from_pressed(pressed);
        if raw != self.raw {
            self.raw = raw;
            self.raw_since = now_ms;
        }

        if self.raw != self.debounced
            && now_ms.saturating_sub(self.raw_since) >= self.timing.debounce_ms
        {
            self.debounced = self.raw;
            debug!("Button {} at {} ms", self.debounced, now_ms);

            if self.debounced == ButtonState::Pressed {
                if note_shown {
                    self.reset_clicks();
                    info!("{}", ButtonEvent::DismissNote);
                    return Some(ButtonEvent::DismissNote);
                }
                self.clicks += 1;
                self.deadline = Some(now_ms + self.timing.double_click_ms);
            }
        }

        match self.deadline {
            Some(deadline) if now_ms >= deadline => {
                let event = ButtonEvent::Clicks(self.clicks);
                self.reset_clicks();
                info!("{}", event);
                Some(event)
            }
            _ => None,
        }
    }

    /// Debounced level is down.
    pub fn is_held(&self) -> bool {
        self.debounced == ButtonState::Pressed
    }

    /// Held, or a press still settling through the debounce window.
    pub fn is_pressing(&self) -> bool {
        self.is_held() || self.raw == ButtonState::Pressed
    }

    pub fn debounced(&self) -> ButtonState {
        self.debounced
    }

    pub fn pending_clicks(&self) -> u32 {
        self.clicks
    }

    pub fn phase(&self, note_shown: bool) -> ClickPhase {
        if note_shown {
            ClickPhase::NoteShown
        } else if self.raw != self.debounced {
            ClickPhase::Armed
        } else if self.clicks > 0 {
            ClickPhase::WaitingSecondClick
        } else {
            ClickPhase::Idle
        }
    }

    fn reset_clicks(&mut self) {
        self.clicks = 0;
        self.deadline = None;
    }
}

impl Default for InputController {
    fn default() -> Self {
        Self::new(InputTiming::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sample every 10 ms from `from` to `to` (exclusive) at a fixed level.
    fn hold(
        ctrl: &mut InputController,
        from: u64,
        to: u64,
        pressed: bool,
        note_shown: bool,
    ) -> Vec<(u64, ButtonEvent)> {
        (from..to)
            .step_by(10)
            .filter_map(|t| ctrl.poll(pressed, t, note_shown).map(|e| (t, e)))
            .collect()
    }

    #[test]
    fn single_press_yields_one_click_after_window() {
        let mut ctrl = InputController::default();
        let mut events = hold(&mut ctrl, 0, 100, false, false);
        events.extend(hold(&mut ctrl, 100, 200, true, false));
        events.extend(hold(&mut ctrl, 200, 1000, false, false));

        // press commits at 150, window closes at 550
        assert_eq!(events, vec![(550, ButtonEvent::Clicks(1))]);
    }

    #[test]
    fn two_quick_presses_are_one_double_click() {
        let mut ctrl = InputController::default();
        let mut events = hold(&mut ctrl, 0, 100, true, false);
        events.extend(hold(&mut ctrl, 100, 200, false, false));
        events.extend(hold(&mut ctrl, 200, 300, true, false));
        events.extend(hold(&mut ctrl, 300, 1200, false, false));

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].1, ButtonEvent::Clicks(2));
    }

    #[test]
    fn flicker_never_commits() {
        let mut ctrl = InputController::default();
        for t in (0..500).step_by(10) {
            let pressed = (t / 20) % 2 == 1;
            assert_eq!(ctrl.poll(pressed, t, false), None);
            assert!(!ctrl.is_held());
        }
        assert_eq!(ctrl.pending_clicks(), 0);
    }

    #[test]
    fn first_press_dismisses_note_without_counting() {
        let mut ctrl = InputController::default();
        let events = hold(&mut ctrl, 0, 100, true, true);
        assert_eq!(events, vec![(50, ButtonEvent::DismissNote)]);
        assert_eq!(ctrl.pending_clicks(), 0);

        let later = hold(&mut ctrl, 100, 1000, false, false);
        assert!(later.is_empty());
    }

    #[test]
    fn settling_press_counts_as_pressing() {
        let mut ctrl = InputController::default();
        ctrl.poll(true, 0, false);
        assert!(!ctrl.is_held());
        assert!(ctrl.is_pressing());

        ctrl.poll(true, 50, false);
        ctrl.poll(false, 60, false);
        assert!(ctrl.is_held());
        assert!(ctrl.is_pressing());

        ctrl.poll(false, 110, false);
        assert!(!ctrl.is_pressing());
    }

    #[test]
    fn phases_follow_the_press() {
        let mut ctrl = InputController::default();
        assert_eq!(ctrl.phase(false), ClickPhase::Idle);
        ctrl.poll(true, 0, false);
        assert_eq!(ctrl.phase(false), ClickPhase::Armed);
        ctrl.poll(true, 50, false);
        assert_eq!(ctrl.phase(false), ClickPhase::WaitingSecondClick);
        assert!(ctrl.is_held());
        assert_eq!(ctrl.phase(true), ClickPhase::NoteShown);
    }
}
