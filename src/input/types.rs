//! Types for input handling

/// Debounced button level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonState {
    Pressed,
    #[default]
    Released,
}

impl ButtonState {
    pub fn from_pressed(pressed: bool) -> Self {
        if pressed {
            ButtonState::Pressed
        } else {
            ButtonState::Released
        }
    }
}

/// Where the click classifier currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickPhase {
    Idle,
    /// Raw level changed, waiting for it to hold still
    Armed,
    /// At least one click counted, window still open
    WaitingSecondClick,
    /// A note is on screen; the next press dismisses it
    NoteShown,
}

/// Events produced by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    /// First press while a note was shown
    DismissNote,
    /// Click window closed with this many presses
    Clicks(u32),
}

impl std::fmt::Display for ButtonState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ButtonState::Pressed => write!(f, "pressed"),
            ButtonState::Released => write!(f, "released"),
        }
    }
}

impl std::fmt::Display for ButtonEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ButtonEvent::DismissNote => write!(f, "Note dismissed"),
            ButtonEvent::Clicks(1) => write!(f, "Single click"),
            ButtonEvent::Clicks(2) => write!(f, "Double click"),
            ButtonEvent::Clicks(n) => write!(f, "{} clicks", n),
        }
    }
}
