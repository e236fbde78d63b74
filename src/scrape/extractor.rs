//! Jackpot amount extraction.
//!
//! The Danske Spil pages carry the current pool in the `<title>`, e.g.
//! `Eurojackpot | Puljen er på 90.000.000 kr.`. The amount sits at a fixed
//! whitespace-separated position with `.` as thousands separator. This is
//! a positional contract with the page layout, not a general parser.

use scraper::{Html, Selector};

use crate::types::LottoError;

/// Token index of the amount in the title text.
pub const AMOUNT_TOKEN_INDEX: usize = 4;

/// Extract the jackpot amount from a lottery page.
pub fn extract_amount(html: &str) -> Result<u64, LottoError> {
    let title = page_title(html)
        .ok_or_else(|| LottoError::AmountNotFound("page has no <title>".into()))?;
    amount_from_title(&title)
}

/// Parse the amount out of the title text alone.
pub fn amount_from_title(title: &str) -> Result<u64, LottoError> {
    let token = title
        .split_whitespace()
        .nth(AMOUNT_TOKEN_INDEX)
        .ok_or_else(|| LottoError::AmountNotFound(format!("title too short: {title:?}")))?;

    token
        .replace('.', "")
        .parse::<u64>()
        .map_err(|_| LottoError::AmountNotFound(format!("token {token:?} is not numeric")))
}

fn page_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
