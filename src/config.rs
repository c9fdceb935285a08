//! Runtime configuration loaded from environment variables

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_RESPONSE_TIME_LIMIT: u64 = 180;
pub const DEFAULT_GUESSING_TIME_LIMIT: u64 = 120;
pub const DEFAULT_RESULTS_DISPLAY_TIME: u64 = 30;
pub const DEFAULT_MIN_PLAYERS: usize = 2;
pub const DEFAULT_MAX_PLAYERS_PER_ROOM: usize = 8;
pub const DEFAULT_MAX_RESPONSE_CHARS: usize = 500;
pub const DEFAULT_ABANDONED_ROOM_GRACE_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Seconds players get to write a response
    pub response_time_limit: u64,
    /// Seconds players get to guess the machine response
    pub guessing_time_limit: u64,
    /// Seconds the results stay up before returning to the lobby
    pub results_display_time: u64,
    pub min_players: usize,
    pub max_players_per_room: usize,
    pub max_response_chars: usize,
    /// How often the deadline watcher checks for expired phases
    pub deadline_poll: Duration,
    /// How long a room with nobody connected is kept for reconnects
    pub abandoned_room_grace: Duration,
    pub bind_addr: SocketAddr,
    /// JSON file with the prompt deck (None = built-in deck)
    pub prompts_file: Option<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            response_time_limit: DEFAULT_RESPONSE_TIME_LIMIT,
            guessing_time_limit: DEFAULT_GUESSING_TIME_LIMIT,
            results_display_time: DEFAULT_RESULTS_DISPLAY_TIME,
            min_players: DEFAULT_MIN_PLAYERS,
            max_players_per_room: DEFAULT_MAX_PLAYERS_PER_ROOM,
            max_response_chars: DEFAULT_MAX_RESPONSE_CHARS,
            deadline_poll: Duration::from_millis(500),
            abandoned_room_grace: Duration::from_secs(DEFAULT_ABANDONED_ROOM_GRACE_SECS),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            prompts_file: None,
        }
    }
}

impl GameConfig {
    /// Load config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            response_time_limit: env_or("RESPONSE_TIME_LIMIT", defaults.response_time_limit),
            guessing_time_limit: env_or("GUESSING_TIME_LIMIT", defaults.guessing_time_limit),
            results_display_time: env_or("RESULTS_DISPLAY_TIME", defaults.results_display_time),
            min_players: env_or("MIN_PLAYERS_TO_START", defaults.min_players),
            max_players_per_room: env_or("MAX_PLAYERS_PER_ROOM", defaults.max_players_per_room),
            max_response_chars: env_or("MAX_RESPONSE_CHARS", defaults.max_response_chars),
            deadline_poll: Duration::from_millis(env_or(
                "DEADLINE_POLL_MS",
                defaults.deadline_poll.as_millis() as u64,
            )),
            abandoned_room_grace: Duration::from_secs(env_or(
                "ABANDONED_ROOM_GRACE_SECS",
                defaults.abandoned_room_grace.as_secs(),
            )),
            bind_addr: env_or("BIND_ADDR", defaults.bind_addr),
            prompts_file: std::env::var("PROMPTS_FILE")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        }
    }

    /// Zero-length timers, handy for driving forced advances in tests
    pub fn instant() -> Self {
        Self {
            response_time_limit: 0,
            guessing_time_limit: 0,
            results_display_time: 0,
            ..Self::default()
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Ignoring invalid {}={:?}, using default", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}
