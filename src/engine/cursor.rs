//! Round-robin cursor for the scroll sensor.
//!
//! Walks the fixed cycle EuroJackpot → Lotto → VikingLotto → … and skips
//! any lottery that is not subscribed.

use serde::Serialize;

use crate::types::{JackpotCache, LotteryKind, Subscriptions};

/// Which lottery the scroll sensor currently shows, and its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundRobinCursor {
    current: LotteryKind,
    display: String,
    /// Set by `realign`; the next `step` renders without advancing.
    realigned: bool,
}

impl Default for RoundRobinCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundRobinCursor {
    pub fn new() -> Self {
        Self {
            current: LotteryKind::EuroJackpot,
            display: String::new(),
            realigned: false,
        }
    }

    pub fn current(&self) -> LotteryKind {
        self.current
    }

    pub fn display(&self) -> &str {
        &self.display
    }

    /// Next subscribed kind after `from`, searching at most one full cycle.
    ///
    /// `from` itself is the last candidate, so a single subscription
    /// keeps pointing at itself. `None` when nothing is subscribed.
    pub fn successor(from: LotteryKind, subs: &Subscriptions) -> Option<LotteryKind> {
        let start = from.cycle_index();
        (1..=LotteryKind::CYCLE.len())
            .map(|step| LotteryKind::CYCLE[(start + step) % LotteryKind::CYCLE.len()])
            .find(|kind| subs.contains(*kind))
    }

    /// Move to the next subscribed kind. Leaves the pointer alone when the
    /// set is empty.
    pub fn advance(&mut self, subs: &Subscriptions) -> Option<LotteryKind> {
        let next = Self::successor(self.current, subs)?;
        self.current = next;
        Some(next)
    }

    /// Move off the current kind only if it has been unsubscribed.
    ///
    /// The move counts as the next advance: the display is re-rendered
    /// and the following `step` only renders.
    pub fn realign(&mut self, cache: &JackpotCache, subs: &Subscriptions) {
        if !subs.contains(self.current) && self.advance(subs).is_some() {
            self.render(cache, subs);
            self.realigned = true;
        }
    }

    /// Render `"<name>: <millions> mio"` for the current kind.
    pub fn render(&mut self, cache: &JackpotCache, subs: &Subscriptions) -> &str {
        if subs.contains(self.current) {
            self.display = format!(
                "{}: {} mio",
                self.current.display_name(),
                cache.millions(self.current)
            );
        }
        &self.display
    }

    /// Advance, then render. One call per poll cycle.
    pub fn step(&mut self, cache: &JackpotCache, subs: &Subscriptions) -> &str {
        if !std::mem::take(&mut self.realigned) {
            self.advance(subs);
        }
        self.render(cache, subs)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
