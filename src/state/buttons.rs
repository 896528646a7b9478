use serde::{Deserialize, Serialize};

/// Number of physical player buttons the controller supports.
pub const MAX_PLAYERS: usize = 3;

/// Identifier of a physical input or output line.
pub type Line = u8;

/// Index of a player in the board, assigned in configuration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerSlot(pub(crate) usize);

impl PlayerSlot {
    /// Position of the player in configuration order.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Moderator actions available on the control panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    /// The buzzing player answered correctly.
    Correct,
    /// The buzzing player answered incorrectly; the round reopens.
    Incorrect,
    /// Move on: every lock and indicator is reset.
    NextQuestion,
}

impl ControlKind {
    /// Event name relayed to spectators.
    pub fn name(self) -> &'static str {
        match self {
            ControlKind::Correct => "correct",
            ControlKind::Incorrect => "incorrect",
            ControlKind::NextQuestion => "next_question",
        }
    }

    /// Whether the action also clears every per-player lock.
    pub fn resets_round(self) -> bool {
        matches!(self, ControlKind::NextQuestion)
    }
}

/// A press that survived debounce and lockout, waiting to be relayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    /// A player won the buzz.
    Player(PlayerSlot),
    /// A moderator pressed a control button.
    Control(ControlKind),
}

/// What an input line is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTarget {
    /// A player button.
    Player(PlayerSlot),
    /// A control button, by position in the control list.
    Control(usize),
}
