//! Controller configuration loading: pin map, timing windows, and relay limits.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::buttons::{ControlKind, Line, MAX_PLAYERS};

/// Default location on disk where the controller looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "BUZZER_RELAY_CONFIG_PATH";

const DEFAULT_PORT: u16 = 80;
const DEFAULT_MAX_CONNECTIONS: usize = 10;
const DEFAULT_DEBOUNCE_MS: u64 = 500;
const DEFAULT_LED_DURATION_MS: u64 = 3000;
const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 2000;
const DEFAULT_WRITE_TIMEOUT_MS: u64 = 2000;
const DEFAULT_TICK_MS: u64 = 10;
const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Wiring of a single player button and its indicator LED.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlayerConfig {
    /// Name relayed to spectators when this player buzzes (e.g. `player1`).
    pub name: String,
    /// Input line the button is attached to.
    pub input_line: Line,
    /// Output line driving the player's LED.
    pub indicator_line: Line,
}

/// Wiring of a moderator control button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ControlConfig {
    /// Which moderator action the button triggers.
    pub kind: ControlKind,
    /// Input line the button is attached to.
    pub input_line: Line,
}

/// Immutable runtime configuration shared across the controller.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the relay listener binds to.
    pub bind_address: String,
    /// Port the relay listener binds to.
    pub port: u16,
    /// Directory the static UI bundle is served from.
    pub web_root: PathBuf,
    /// Upper bound on simultaneously registered relay clients.
    pub max_connections: usize,
    /// Minimum spacing between two accepted edges on one line.
    pub debounce: Duration,
    /// How long a player's LED stays lit after a buzz; `None` keeps it lit until a control press.
    pub led_duration: Option<Duration>,
    /// Bound on reading an incoming request head.
    pub handshake_timeout: Duration,
    /// Bound on a single relay write before the client is considered gone.
    pub write_timeout: Duration,
    /// Idle sleep of the main loop when no network event is pending.
    pub tick: Duration,
    /// Maximum number of undrained button events.
    pub queue_capacity: usize,
    /// Whether the safety interlock is asserted (grounded) at boot.
    pub interlock_asserted: bool,
    /// Player buttons, at most [`MAX_PLAYERS`].
    pub players: Vec<PlayerConfig>,
    /// Moderator buttons.
    pub controls: Vec<ControlConfig>,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to the built-in wiring.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        players = config.players.len(),
                        controls = config.controls.len(),
                        "loaded controller config"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a JSON document, filling every missing field with its default.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawConfig {
    bind_address: String,
    port: u16,
    web_root: PathBuf,
    max_connections: usize,
    debounce_ms: u64,
    led_duration_ms: Option<u64>,
    handshake_timeout_ms: u64,
    write_timeout_ms: u64,
    tick_ms: u64,
    queue_capacity: usize,
    interlock_asserted: bool,
    players: Vec<PlayerConfig>,
    controls: Vec<ControlConfig>,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            web_root: PathBuf::from("web"),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            led_duration_ms: Some(DEFAULT_LED_DURATION_MS),
            handshake_timeout_ms: DEFAULT_HANDSHAKE_TIMEOUT_MS,
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
            tick_ms: DEFAULT_TICK_MS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            interlock_asserted: true,
            players: default_players(),
            controls: default_controls(),
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let mut players = value.players;
        if players.len() > MAX_PLAYERS {
            warn!(
                configured = players.len(),
                max = MAX_PLAYERS,
                "too many players configured; extra buttons are ignored"
            );
            players.truncate(MAX_PLAYERS);
        }

        Self {
            bind_address: value.bind_address,
            port: value.port,
            web_root: value.web_root,
            max_connections: value.max_connections,
            debounce: Duration::from_millis(value.debounce_ms),
            led_duration: value.led_duration_ms.map(Duration::from_millis),
            handshake_timeout: Duration::from_millis(value.handshake_timeout_ms),
            write_timeout: Duration::from_millis(value.write_timeout_ms),
            tick: Duration::from_millis(value.tick_ms.max(1)),
            queue_capacity: value.queue_capacity.max(1),
            interlock_asserted: value.interlock_asserted,
            players,
            controls: value.controls,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in wiring of the three player buttons and their LEDs.
fn default_players() -> Vec<PlayerConfig> {
    [("player1", 0, 13), ("player2", 1, 14), ("player3", 2, 15)]
        .into_iter()
        .map(|(name, input_line, indicator_line)| PlayerConfig {
            name: name.into(),
            input_line,
            indicator_line,
        })
        .collect()
}

/// Built-in wiring of the moderator buttons.
fn default_controls() -> Vec<ControlConfig> {
    vec![
        ControlConfig {
            kind: ControlKind::Correct,
            input_line: 16,
        },
        ControlConfig {
            kind: ControlKind::Incorrect,
            input_line: 4,
        },
        ControlConfig {
            kind: ControlKind::NextQuestion,
            input_line: 5,
        },
    ]
}
