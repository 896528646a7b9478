use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

use crate::{
    config::PlayerConfig,
    state::{buttons::Line, indicator::Indicator},
};

/// LED line that records its level and logs every change.
#[derive(Debug)]
pub struct LogIndicator {
    owner: String,
    line: Line,
    lit: AtomicBool,
}

impl LogIndicator {
    /// Indicator for `player`'s configured LED line, initially off.
    pub fn for_player(player: &PlayerConfig) -> Self {
        Self {
            owner: player.name.clone(),
            line: player.indicator_line,
            lit: AtomicBool::new(false),
        }
    }

    /// Current level of the line.
    pub fn is_lit(&self) -> bool {
        self.lit.load(Ordering::Acquire)
    }
}

impl Indicator for LogIndicator {
    fn set(&self, on: bool) {
        if self.lit.swap(on, Ordering::AcqRel) != on {
            info!(player = %self.owner, line = self.line, on, "indicator changed");
        }
    }
}
