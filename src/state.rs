//! Process-wide display context
//!
//! One record holds everything the render and input paths share. It is passed
//! by `&mut` into each tick, so there is exactly one writer at a time.

use crate::poem::PoemContent;
use crate::time_index::TimeCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Clock,
    Note,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayState {
    pub mode: ViewMode,
    /// Code of the last clock frame that reached the panel
    pub last_rendered: Option<TimeCode>,
    /// Milliseconds timestamp at which the note view appeared
    pub note_shown_at: Option<u64>,
    /// Poem of the last successful render
    pub poem: Option<PoemContent>,
    /// Time code `poem` was composed for
    pub poem_code: Option<TimeCode>,
}

impl DisplayState {
    pub fn note_shown(&self) -> bool {
        self.mode == ViewMode::Note
    }

    pub fn enter_note(&mut self, now_ms: u64) {
        self.mode = ViewMode::Note;
        self.note_shown_at = Some(now_ms);
    }

    /// Back to the clock. The next tick redraws because the last rendered code
    /// is forgotten.
    pub fn leave_note(&mut self) {
        self.mode = ViewMode::Clock;
        self.note_shown_at = None;
        self.last_rendered = None;
    }

    /// Milliseconds the note has been on screen.
    pub fn note_age(&self, now_ms: u64) -> Option<u64> {
        self.note_shown_at.map(|at| now_ms.saturating_sub(at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaving_note_forces_a_redraw() {
        let mut state = DisplayState {
            last_rendered: TimeCode::new(930),
            ..DisplayState::default()
        };
        state.enter_note(1_000);
        assert!(state.note_shown());
        assert_eq!(state.note_age(4_000), Some(3_000));

        state.leave_note();
        assert_eq!(state.mode, ViewMode::Clock);
        assert_eq!(state.last_rendered, None);
        assert_eq!(state.note_age(4_000), None);
    }
}
