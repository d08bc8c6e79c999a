//! The single highlighted ticker (e.g. the ship under the pointer).

use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct FocusState {
    ticker: Option<String>,
    expires_at: Option<Duration>,
}

impl FocusState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Focus `ticker` until `now + duration`. Replaces any earlier focus and
    /// its expiry; expiries never stack.
    pub fn set_focus(&mut self, ticker: &str, duration: Duration, now: Duration) {
        self.ticker = Some(ticker.to_string());
        self.expires_at = Some(now + duration);
    }

    /// Focus with no expiry.
    pub fn pin(&mut self, ticker: &str) {
        self.ticker = Some(ticker.to_string());
        self.expires_at = None;
    }

    pub fn clear(&mut self) {
        self.ticker = None;
        self.expires_at = None;
    }

    /// Focused ticker at `now`; expired focus is dropped.
    pub fn focused(&mut self, now: Duration) -> Option<&str> {
        if matches!(self.expires_at, Some(at) if now >= at) {
            self.clear();
        }
        self.ticker.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn focus_expires_after_duration() {
        let mut f = FocusState::new();
        f.set_focus("RKLB", ms(1000), ms(0));
        assert_eq!(f.focused(ms(0)), Some("RKLB"));
        assert_eq!(f.focused(ms(999)), Some("RKLB"));
        assert_eq!(f.focused(ms(1000)), None);
    }

    #[test]
    fn refocus_replaces_previous_timeout() {
        let mut f = FocusState::new();
        f.set_focus("RKLB", ms(1000), ms(0));
        f.set_focus("LUNR", ms(1000), ms(800));
        assert_eq!(f.focused(ms(1200)), Some("LUNR"));
        assert_eq!(f.focused(ms(1800)), None);
    }

    #[test]
    fn pinned_focus_never_expires() {
        let mut f = FocusState::new();
        f.pin("ASTS");
        assert_eq!(f.focused(ms(1_000_000)), Some("ASTS"));
        f.clear();
        assert_eq!(f.focused(ms(0)), None);
    }
}
