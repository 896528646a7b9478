//! Button handling core: debounce, lockout, LED timing and the event queue.

/// Player slots, control kinds and the events they produce.
pub mod buttons;
/// Per-line edge filtering.
pub mod debounce;
/// Indicator line abstraction and auto-off timing.
pub mod indicator;
/// The lockout state machine.
pub mod lockout;
/// Bounded queue between the edge path and the main loop.
pub mod queue;

use std::{collections::HashMap, sync::Arc, time::Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, PlayerConfig};

use self::{
    buttons::{ButtonEvent, ControlKind, Line, LineTarget, PlayerSlot},
    indicator::Indicator,
    lockout::{Board, Effect, Ignored, Snapshot},
    queue::{EventQueue, QueueFull},
};

/// Shared handle to the engine, cloned into the edge source and the main loop.
pub type SharedEngine = Arc<Engine>;

/// Result of feeding one raw edge to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// The edge produced an event that is now queued for relay.
    Queued(ButtonEvent),
    /// The edge was filtered out by debounce or lockout.
    Ignored(Ignored),
    /// The edge was valid but the queue had no room left.
    Dropped(QueueFull),
}

struct PlayerLine {
    name: String,
    indicator: Arc<dyn Indicator>,
}

/// Event engine shared by the edge handler and the main loop.
///
/// Built once at the composition root. The edge path ([`Engine::on_edge`])
/// only takes the board and queue locks for a bounded amount of work and
/// never performs network I/O.
pub struct Engine {
    board: Mutex<Board>,
    queue: EventQueue,
    lines: HashMap<Line, LineTarget>,
    players: Vec<PlayerLine>,
    controls: Vec<ControlKind>,
}

impl Engine {
    /// Construct the engine from the configured wiring, asking `make_indicator`
    /// for each player's LED line.
    pub fn new<F>(config: &AppConfig, mut make_indicator: F) -> SharedEngine
    where
        F: FnMut(&PlayerConfig) -> Arc<dyn Indicator>,
    {
        let mut lines = HashMap::new();
        for (index, player) in config.players.iter().enumerate() {
            register_line(&mut lines, player.input_line, LineTarget::Player(PlayerSlot(index)));
        }
        for (index, control) in config.controls.iter().enumerate() {
            register_line(&mut lines, control.input_line, LineTarget::Control(index));
        }

        let players = config
            .players
            .iter()
            .map(|player| {
                let indicator = make_indicator(player);
                indicator.set(false);
                PlayerLine {
                    name: player.name.clone(),
                    indicator,
                }
            })
            .collect();

        Arc::new(Self {
            board: Mutex::new(Board::new(
                &config.players,
                &config.controls,
                config.debounce,
                config.led_duration,
            )),
            queue: EventQueue::new(config.queue_capacity),
            lines,
            players,
            controls: config.controls.iter().map(|control| control.kind).collect(),
        })
    }

    /// Handle a raw edge on `line` observed at `now`.
    ///
    /// Planning, queueing and applying happen under the board lock, so a press
    /// either fully lands (state updated, event queued, LED lit) or leaves no
    /// trace. An edge that clears debounce but is refused by the lockout still
    /// starts the line's debounce window; one dropped for a full queue does not.
    pub fn on_edge(&self, line: Line, now: Instant) -> EdgeOutcome {
        let Some(&target) = self.lines.get(&line) else {
            debug!(line, "edge on unwired line");
            return EdgeOutcome::Ignored(Ignored::UnknownTarget);
        };

        let mut board = self.board.lock();
        let plan = match board.plan(target, now) {
            Ok(plan) => plan,
            Err(reason) => {
                if reason.passed_debounce() {
                    board.note_refused(target, now);
                }
                debug!(line, %reason, "edge ignored");
                return EdgeOutcome::Ignored(reason);
            }
        };

        let event = plan.event();
        if let Err(full) = self.queue.enqueue(event) {
            warn!(line, error = %full, "dropping press");
            return EdgeOutcome::Dropped(full);
        }

        match board.apply(plan) {
            Effect::Lit(slot) => self.players[slot.0].indicator.set(true),
            Effect::AllOff => self.players.iter().for_each(|player| player.indicator.set(false)),
        }
        EdgeOutcome::Queued(event)
    }

    /// Take every queued event in press order.
    pub fn drain_events(&self) -> Vec<ButtonEvent> {
        self.queue.drain_all()
    }

    /// Take every queued event and resolve it to the name relayed to spectators.
    pub fn drain_names(&self) -> Vec<&str> {
        self.drain_events()
            .into_iter()
            .map(|event| self.event_name(event))
            .collect()
    }

    /// Name relayed to spectators for `event`.
    pub fn event_name(&self, event: ButtonEvent) -> &str {
        match event {
            ButtonEvent::Player(slot) => self
                .players
                .get(slot.0)
                .map(|player| player.name.as_str())
                .unwrap_or("unknown"),
            ButtonEvent::Control(kind) => kind.name(),
        }
    }

    /// Turn off every LED whose auto-off deadline has passed.
    pub fn sweep_indicators(&self, now: Instant) {
        let mut board = self.board.lock();
        board.sweep(now, |slot| {
            let player = &self.players[slot.0];
            debug!(player = %player.name, "indicator timed out");
            player.indicator.set(false);
        });
    }

    /// Force every LED off, used on shutdown.
    pub fn indicators_off(&self) {
        self.players
            .iter()
            .for_each(|player| player.indicator.set(false));
    }

    /// Create a snapshot of the lockout board.
    pub fn snapshot(&self) -> Snapshot {
        self.board.lock().snapshot()
    }

    /// Whether any player currently holds the floor.
    pub fn global_lockout(&self) -> bool {
        self.board.lock().global_lockout()
    }

    /// Input line a named player or control is wired to.
    pub fn line_of(&self, name: &str) -> Option<Line> {
        self.lines.iter().find_map(|(line, target)| {
            let wired = match *target {
                LineTarget::Player(slot) => self.players[slot.0].name.as_str(),
                LineTarget::Control(index) => self.controls[index].name(),
            };
            (wired == name).then_some(*line)
        })
    }
}

fn register_line(lines: &mut HashMap<Line, LineTarget>, line: Line, target: LineTarget) {
    if let Some(previous) = lines.insert(line, target) {
        warn!(line, ?previous, ?target, "input line wired twice; last wiring wins");
    } else {
        info!(line, ?target, "input line wired");
    }
}
