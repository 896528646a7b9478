use std::time::{Duration, Instant};

use thiserror::Error;

use crate::{
    config::{ControlConfig, PlayerConfig},
    state::{
        buttons::{ButtonEvent, ControlKind, LineTarget, PlayerSlot},
        debounce::Debounce,
        indicator::LedTimer,
    },
};

/// Round-level lockout phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutPhase {
    /// No player holds the floor; any unlocked player may buzz.
    Idle,
    /// A player buzzed first and every other press is dropped until a control press.
    RoundLocked {
        /// Player that won the race.
        winner: PlayerSlot,
    },
}

/// Reason an edge was dropped without producing an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Ignored {
    /// The edge arrived within the debounce window of the previous one.
    #[error("edge within debounce window")]
    Debounced,
    /// Another player already holds the floor.
    #[error("round locked by player {}", .winner.index())]
    RoundLocked {
        /// Player currently holding the floor.
        winner: PlayerSlot,
    },
    /// The player already buzzed during this question.
    #[error("player already buzzed this question")]
    PlayerLocked,
    /// The line is not wired to any button.
    #[error("line is not wired to a button")]
    UnknownTarget,
}

impl Ignored {
    /// Whether the edge cleared debounce before the lockout refused it.
    pub fn passed_debounce(&self) -> bool {
        matches!(self, Self::RoundLocked { .. } | Self::PlayerLocked)
    }
}

/// A validated transition that has not yet touched the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    target: LineTarget,
    at: Instant,
    event: ButtonEvent,
}

impl Plan {
    /// Event to relay once the plan is applied.
    pub fn event(&self) -> ButtonEvent {
        self.event
    }
}

/// Indicator side effect of an applied plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Light the winner's LED.
    Lit(PlayerSlot),
    /// Every LED goes off.
    AllOff,
}

/// Observable state of the board, used for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Current lockout phase.
    pub phase: LockoutPhase,
    /// Per-player lock flags in slot order.
    pub locked: Vec<bool>,
    /// Per-player LED state in slot order.
    pub lit: Vec<bool>,
}

#[derive(Debug, Clone)]
struct PlayerState {
    debounce: Debounce,
    locked: bool,
    led: LedTimer,
}

#[derive(Debug, Clone)]
struct ControlState {
    kind: ControlKind,
    debounce: Debounce,
}

/// Lockout state for every button, mutated only through [`Board::apply`] and
/// [`Board::sweep`].
///
/// All storage is sized at construction, so planning and applying a press
/// never allocates.
#[derive(Debug, Clone)]
pub struct Board {
    phase: LockoutPhase,
    players: Vec<PlayerState>,
    controls: Vec<ControlState>,
    led_duration: Option<Duration>,
}

impl Board {
    /// Build a board in the idle phase with every lock clear.
    pub fn new(
        players: &[PlayerConfig],
        controls: &[ControlConfig],
        debounce: Duration,
        led_duration: Option<Duration>,
    ) -> Self {
        Self {
            phase: LockoutPhase::Idle,
            players: players
                .iter()
                .map(|_| PlayerState {
                    debounce: Debounce::new(debounce),
                    locked: false,
                    led: LedTimer::default(),
                })
                .collect(),
            controls: controls
                .iter()
                .map(|control| ControlState {
                    kind: control.kind,
                    debounce: Debounce::new(debounce),
                })
                .collect(),
            led_duration,
        }
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> LockoutPhase {
        self.phase
    }

    /// Whether any player currently holds the floor.
    pub fn global_lockout(&self) -> bool {
        matches!(self.phase, LockoutPhase::RoundLocked { .. })
    }

    /// Whether `slot` already buzzed during the current question.
    pub fn is_locked(&self, slot: PlayerSlot) -> bool {
        self.players.get(slot.0).is_some_and(|player| player.locked)
    }

    /// Create a snapshot of the current board state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            locked: self.players.iter().map(|player| player.locked).collect(),
            lit: self.players.iter().map(|player| player.led.is_lit()).collect(),
        }
    }

    /// Validate an edge on `target` without mutating the board.
    pub fn plan(&self, target: LineTarget, now: Instant) -> Result<Plan, Ignored> {
        let event = match target {
            LineTarget::Player(slot) => {
                let player = self.players.get(slot.0).ok_or(Ignored::UnknownTarget)?;
                if !player.debounce.would_accept(now) {
                    return Err(Ignored::Debounced);
                }
                if let LockoutPhase::RoundLocked { winner } = self.phase {
                    return Err(Ignored::RoundLocked { winner });
                }
                if player.locked {
                    return Err(Ignored::PlayerLocked);
                }
                ButtonEvent::Player(slot)
            }
            LineTarget::Control(index) => {
                let control = self.controls.get(index).ok_or(Ignored::UnknownTarget)?;
                if !control.debounce.would_accept(now) {
                    return Err(Ignored::Debounced);
                }
                ButtonEvent::Control(control.kind)
            }
        };

        Ok(Plan {
            target,
            at: now,
            event,
        })
    }

    /// Apply a plan produced by [`Board::plan`] and report the LED side effect.
    pub fn apply(&mut self, plan: Plan) -> Effect {
        match plan.target {
            LineTarget::Player(slot) => {
                let led_duration = self.led_duration;
                let player = &mut self.players[slot.0];
                player.debounce.record(plan.at);
                player.locked = true;
                player.led.light(plan.at, led_duration);
                self.phase = LockoutPhase::RoundLocked { winner: slot };
                Effect::Lit(slot)
            }
            LineTarget::Control(index) => {
                let control = &mut self.controls[index];
                control.debounce.record(plan.at);
                let kind = control.kind;

                self.phase = LockoutPhase::Idle;
                let resets_round = kind.resets_round();
                for player in &mut self.players {
                    if resets_round {
                        player.locked = false;
                    }
                    player.led.clear();
                }
                Effect::AllOff
            }
        }
    }

    /// Record a debounced edge the lockout refused, so its bounces stay filtered.
    pub fn note_refused(&mut self, target: LineTarget, now: Instant) {
        if let LineTarget::Player(slot) = target {
            if let Some(player) = self.players.get_mut(slot.0) {
                player.debounce.record(now);
            }
        }
    }

    /// Consume every LED deadline that has passed, calling `off` once per expired LED.
    pub fn sweep(&mut self, now: Instant, mut off: impl FnMut(PlayerSlot)) {
        for (index, player) in self.players.iter_mut().enumerate() {
            if player.led.expire(now) {
                off(PlayerSlot(index));
            }
        }
    }
}
