//! Sensor views over a coordinator snapshot.
//!
//! One numeric sensor per subscribed lottery (jackpot in whole millions,
//! raw amount as the `price_pool` attribute) and one scroll sensor
//! carrying the round-robin text.

use serde::Serialize;

use crate::engine::coordinator::CoordinatorSnapshot;
use crate::types::LotteryKind;

pub const UNIT_MILLIONS: &str = "mio";
pub const SCROLL_NAME: &str = "Lotto puljer";
pub const SCROLL_UNIQUE_ID: &str = "lotto_puljer";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JackpotAttributes {
    pub price_pool: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JackpotSensor {
    pub name: &'static str,
    pub unique_id: &'static str,
    pub lottery: LotteryKind,
    /// Jackpot in whole millions.
    pub state: u64,
    pub unit_of_measurement: &'static str,
    pub attributes: JackpotAttributes,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrollSensor {
    pub name: &'static str,
    pub unique_id: &'static str,
    pub state: String,
    pub available: bool,
}

/// Everything one entry exposes.
#[derive(Debug, Clone, Serialize)]
pub struct SensorSet {
    pub entry_id: String,
    pub jackpots: Vec<JackpotSensor>,
    pub scroll: ScrollSensor,
}

impl SensorSet {
    pub fn from_snapshot(entry_id: &str, snap: &CoordinatorSnapshot) -> Self {
        let available = snap.available();

        let jackpots = snap
            .subscriptions
            .iter()
            .map(|kind| {
                let amount = if available { snap.cache.get(kind) } else { 0 };
                JackpotSensor {
                    name: kind.display_name(),
                    unique_id: kind.unique_id(),
                    lottery: kind,
                    state: amount / 1_000_000,
                    unit_of_measurement: UNIT_MILLIONS,
                    attributes: JackpotAttributes { price_pool: amount },
                    available,
                }
            })
            .collect();

        let scroll = ScrollSensor {
            name: SCROLL_NAME,
            unique_id: SCROLL_UNIQUE_ID,
            state: if available { snap.display.clone() } else { String::new() },
            available,
        };

        Self {
            entry_id: entry_id.to_string(),
            jackpots,
            scroll,
        }
    }

    pub fn jackpot(&self, unique_id: &str) -> Option<&JackpotSensor> {
        self.jackpots.iter().find(|s| s.unique_id == unique_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
