use std::time::{Duration, Instant};

/// Per-line edge filter: an edge is accepted only when it arrives strictly
/// later than `window` after the last accepted one.
#[derive(Debug, Clone, Copy)]
pub struct Debounce {
    window: Duration,
    last_edge: Option<Instant>,
}

impl Debounce {
    /// Build a filter that has not seen any edge yet.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_edge: None,
        }
    }

    /// Check an edge without recording it.
    pub fn would_accept(&self, now: Instant) -> bool {
        match self.last_edge {
            None => true,
            // An edge stamped before the last accepted one is noise as well.
            Some(last) => now
                .checked_duration_since(last)
                .is_some_and(|elapsed| elapsed > self.window),
        }
    }

    /// Record `now` as the last accepted edge.
    pub fn record(&mut self, now: Instant) {
        self.last_edge = Some(now);
    }

    /// Check and record an edge in one step, returning whether it was accepted.
    pub fn accept(&mut self, now: Instant) -> bool {
        if !self.would_accept(now) {
            return false;
        }
        self.record(now);
        true
    }

    /// Time of the last accepted edge.
    pub fn last_edge(&self) -> Option<Instant> {
        self.last_edge
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(500);

    #[test]
    fn first_edge_is_accepted() {
        let mut debounce = Debounce::new(WINDOW);
        assert!(debounce.accept(Instant::now()));
    }

    #[test]
    fn burst_within_window_coalesces() {
        let start = Instant::now();
        let mut debounce = Debounce::new(WINDOW);

        let accepted = (0..20)
            .map(|step| start + Duration::from_millis(step * 20))
            .filter(|edge| debounce.accept(*edge))
            .count();

        assert_eq!(accepted, 1);
        assert_eq!(debounce.last_edge(), Some(start));
    }

    #[test]
    fn edge_exactly_on_window_is_rejected() {
        let start = Instant::now();
        let mut debounce = Debounce::new(WINDOW);
        assert!(debounce.accept(start));
        assert!(!debounce.accept(start + WINDOW));
        assert!(debounce.accept(start + WINDOW + Duration::from_millis(1)));
    }

    #[test]
    fn rejected_edge_does_not_extend_window() {
        let start = Instant::now();
        let mut debounce = Debounce::new(WINDOW);
        assert!(debounce.accept(start));
        assert!(!debounce.accept(start + Duration::from_millis(400)));
        assert!(debounce.accept(start + Duration::from_millis(501)));
    }

    #[test]
    fn out_of_order_edge_is_rejected() {
        let start = Instant::now() + Duration::from_secs(1);
        let mut debounce = Debounce::new(WINDOW);
        assert!(debounce.accept(start));
        assert!(!debounce.accept(start - Duration::from_millis(1)));
    }
}
