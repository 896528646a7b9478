use std::{
    io::{self, BufRead},
    thread::{self, JoinHandle},
    time::Instant,
};

use tracing::{debug, info, warn};

use crate::state::{EdgeOutcome, Engine, SharedEngine};

/// Spawn a thread turning stdin lines into button edges.
///
/// Each line holds one token: `1`, `2`, `3` for the players, `c`, `i`, `n` for
/// the controls, or any configured line name.
pub fn spawn_console_edges(engine: SharedEngine) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("console-edges".into())
        .spawn(move || {
            let stdin = io::stdin();
            let fed = pump(&engine, stdin.lock());
            info!(fed, "console edge source closed");
        })
}

/// Feed every line of `reader` to the engine, returning how many were wired.
pub fn pump<R: BufRead>(engine: &Engine, reader: R) -> usize {
    let mut fed = 0;
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, "console read failed");
                break;
            }
        };
        let token = line.trim();
        if token.is_empty() {
            continue;
        }

        let Some(input) = engine.line_of(expand(token)) else {
            warn!(token, "unknown console token");
            continue;
        };
        fed += 1;
        match engine.on_edge(input, Instant::now()) {
            EdgeOutcome::Queued(event) => debug!(token, ?event, "console press queued"),
            outcome => debug!(token, ?outcome, "console press not queued"),
        }
    }
    fed
}

fn expand(token: &str) -> &str {
    match token {
        "1" => "player1",
        "2" => "player2",
        "3" => "player3",
        "c" => "correct",
        "i" => "incorrect",
        "n" => "next_question",
        name => name,
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Cursor, sync::Arc, time::Duration};

    use super::*;
    use crate::{config::AppConfig, state::indicator::Indicator};

    struct Dark;

    impl Indicator for Dark {
        fn set(&self, _on: bool) {}
    }

    #[test]
    fn tokens_map_to_configured_names() {
        assert_eq!(expand("2"), "player2");
        assert_eq!(expand("n"), "next_question");
        assert_eq!(expand("incorrect"), "incorrect");
    }

    #[test]
    fn pump_feeds_wired_tokens() {
        let config = AppConfig {
            debounce: Duration::ZERO,
            ..AppConfig::default()
        };
        let engine = Engine::new(&config, |_| Arc::new(Dark) as Arc<dyn Indicator>);

        let fed = pump(&engine, Cursor::new("2\n\nbogus\n1\nc\n"));

        assert_eq!(fed, 3);
        assert_eq!(engine.drain_names(), vec!["player2", "correct"]);
    }
}
