//! Shared types for the Lotto DK service.
//!
//! The lottery kinds, the subscription set and the jackpot cache form the
//! data model every other module builds on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// LotteryKind
// ---------------------------------------------------------------------------

/// One of the three Danske Spil lotteries we track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotteryKind {
    EuroJackpot,
    Lotto,
    VikingLotto,
}

impl LotteryKind {
    /// All kinds in round-robin display order.
    pub const CYCLE: [LotteryKind; 3] = [
        LotteryKind::EuroJackpot,
        LotteryKind::Lotto,
        LotteryKind::VikingLotto,
    ];

    /// Human-readable name used in sensor names and the scroll text.
    pub fn display_name(&self) -> &'static str {
        match self {
            LotteryKind::EuroJackpot => "Euro jackpot",
            LotteryKind::Lotto => "Lotto",
            LotteryKind::VikingLotto => "Viking lotto",
        }
    }

    /// Stable sensor identifier (also the config key for the flag).
    pub fn unique_id(&self) -> &'static str {
        match self {
            LotteryKind::EuroJackpot => "euro_jackpot",
            LotteryKind::Lotto => "lotto",
            LotteryKind::VikingLotto => "viking_lotto",
        }
    }

    /// Jackpot page on danskespil.dk.
    pub fn default_url(&self) -> &'static str {
        match self {
            LotteryKind::EuroJackpot => "https://danskespil.dk/eurojackpot",
            LotteryKind::Lotto => "https://danskespil.dk/lotto",
            LotteryKind::VikingLotto => "https://danskespil.dk/vikinglotto",
        }
    }

    /// Position in [`LotteryKind::CYCLE`].
    pub fn cycle_index(&self) -> usize {
        match self {
            LotteryKind::EuroJackpot => 0,
            LotteryKind::Lotto => 1,
            LotteryKind::VikingLotto => 2,
        }
    }
}

impl fmt::Display for LotteryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for LotteryKind {
    type Err = LottoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "euro_jackpot" | "eurojackpot" => Ok(LotteryKind::EuroJackpot),
            "lotto" => Ok(LotteryKind::Lotto),
            "viking_lotto" | "vikinglotto" => Ok(LotteryKind::VikingLotto),
            _ => Err(LottoError::Config(format!("Unknown lottery: {s}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Subscriptions
// ---------------------------------------------------------------------------

/// Which lotteries an instance tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriptions {
    pub euro_jackpot: bool,
    pub lotto: bool,
    pub viking_lotto: bool,
}

impl Default for Subscriptions {
    fn default() -> Self {
        Self::all()
    }
}

impl Subscriptions {
    pub fn all() -> Self {
        Self {
            euro_jackpot: true,
            lotto: true,
            viking_lotto: true,
        }
    }

    pub fn none() -> Self {
        Self {
            euro_jackpot: false,
            lotto: false,
            viking_lotto: false,
        }
    }

    /// A set containing exactly the given kinds.
    pub fn only(kinds: &[LotteryKind]) -> Self {
        let mut subs = Self::none();
        for kind in kinds {
            subs.set(*kind, true);
        }
        subs
    }

    pub fn contains(&self, kind: LotteryKind) -> bool {
        match kind {
            LotteryKind::EuroJackpot => self.euro_jackpot,
            LotteryKind::Lotto => self.lotto,
            LotteryKind::VikingLotto => self.viking_lotto,
        }
    }

    pub fn set(&mut self, kind: LotteryKind, enabled: bool) {
        match kind {
            LotteryKind::EuroJackpot => self.euro_jackpot = enabled,
            LotteryKind::Lotto => self.lotto = enabled,
            LotteryKind::VikingLotto => self.viking_lotto = enabled,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.euro_jackpot || self.lotto || self.viking_lotto)
    }

    /// Subscribed kinds in cycle order.
    pub fn iter(&self) -> impl Iterator<Item = LotteryKind> + '_ {
        LotteryKind::CYCLE.into_iter().filter(|k| self.contains(*k))
    }

    /// Reject the empty set.
    pub fn validate(&self) -> Result<(), LottoError> {
        if self.is_empty() {
            return Err(LottoError::MissingSelection);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Jackpot cache
// ---------------------------------------------------------------------------

/// Last successfully observed jackpot per lottery, in DKK.
///
/// Starts at zero and only moves forward on a successful scrape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JackpotCache {
    pub euro_jackpot: u64,
    pub lotto: u64,
    pub viking_lotto: u64,
}

impl JackpotCache {
    pub fn get(&self, kind: LotteryKind) -> u64 {
        match kind {
            LotteryKind::EuroJackpot => self.euro_jackpot,
            LotteryKind::Lotto => self.lotto,
            LotteryKind::VikingLotto => self.viking_lotto,
        }
    }

    pub fn set(&mut self, kind: LotteryKind, amount: u64) {
        match kind {
            LotteryKind::EuroJackpot => self.euro_jackpot = amount,
            LotteryKind::Lotto => self.lotto = amount,
            LotteryKind::VikingLotto => self.viking_lotto = amount,
        }
    }

    /// Amount in whole millions, truncated.
    pub fn millions(&self, kind: LotteryKind) -> u64 {
        self.get(kind) / 1_000_000
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for Lotto DK.
#[derive(Debug, thiserror::Error)]
pub enum LottoError {
    #[error("Fetch failed ({url}): {message}")]
    Fetch { url: String, message: String },

    #[error("Fetch timed out after {millis}ms: {lottery}")]
    Timeout { lottery: LotteryKind, millis: u64 },

    #[error("Jackpot amount not found: {0}")]
    AmountNotFound(String),

    #[error("must select at least one lottery")]
    MissingSelection,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Home Assistant error: {0}")]
    HostApi(String),

    #[error("Timer entity not found: {0}")]
    MissingTimerEntity(String),

    #[error("Unknown entry: {0}")]
    UnknownEntry(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
