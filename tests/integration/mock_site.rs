//! Mock Danske Spil site for integration testing.
//!
//! Provides a deterministic `PageSource` whose jackpots and failures are
//! controllable from test code, plus helpers for rendering pages the way
//! the real site titles them.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use lotto_dk::scrape::PageSource;
use lotto_dk::types::{LotteryKind, LottoError};

/// Render a page whose `<title>` carries `amount` in Danish grouping.
pub fn jackpot_page(amount: u64) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>Puljen | Puljen er {} kr.</title></head>\
         <body><h1>Spil nu</h1></body></html>",
        group_thousands(amount)
    )
}

/// `90500000` → `90.500.000`
pub fn group_thousands(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}

/// An in-memory site. Clones share state.
#[derive(Clone, Default)]
pub struct MockSite {
    amounts: Arc<Mutex<HashMap<LotteryKind, u64>>>,
    broken: Arc<Mutex<Vec<LotteryKind>>>,
    hits: Arc<Mutex<Vec<LotteryKind>>>,
}

impl MockSite {
    pub fn new(euro_jackpot: u64, lotto: u64, viking_lotto: u64) -> Self {
        let site = Self::default();
        site.set_amount(LotteryKind::EuroJackpot, euro_jackpot);
        site.set_amount(LotteryKind::Lotto, lotto);
        site.set_amount(LotteryKind::VikingLotto, viking_lotto);
        site
    }

    pub fn set_amount(&self, kind: LotteryKind, amount: u64) {
        self.amounts.lock().unwrap().insert(kind, amount);
    }

    /// Make every fetch of `kind` fail until `repair` is called.
    pub fn break_page(&self, kind: LotteryKind) {
        self.broken.lock().unwrap().push(kind);
    }

    pub fn repair(&self, kind: LotteryKind) {
        self.broken.lock().unwrap().retain(|k| *k != kind);
    }

    /// Every fetch seen so far, in order.
    pub fn hits(&self) -> Vec<LotteryKind> {
        self.hits.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageSource for MockSite {
    async fn fetch_page(&self, kind: LotteryKind) -> Result<String, LottoError> {
        self.hits.lock().unwrap().push(kind);
        if self.broken.lock().unwrap().contains(&kind) {
            return Err(LottoError::Fetch {
                url: format!("mock://{}", kind.unique_id()),
                message: "HTTP 503 Service Unavailable".into(),
            });
        }
        let amount = self.amounts.lock().unwrap().get(&kind).copied().unwrap_or(0);
        Ok(jackpot_page(amount))
    }
}

#[test]
fn test_group_thousands() {
    assert_eq!(group_thousands(90_500_000), "90.500.000");
    assert_eq!(group_thousands(999), "999");
    assert_eq!(group_thousands(1_000), "1.000");
}
