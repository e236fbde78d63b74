//! Jackpot page scraping.
//!
//! Defines the `PageSource` trait the poll coordinator fetches through,
//! the HTTP implementation, and the title extractor.

pub mod extractor;
pub mod fetcher;

use async_trait::async_trait;

use crate::types::{LotteryKind, LottoError};

/// Abstraction over where lottery pages come from.
///
/// The coordinator wraps every call in its own timeout, so implementors
/// may suspend for as long as the underlying transport does.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the raw HTML of the jackpot page for `kind`.
    async fn fetch_page(&self, kind: LotteryKind) -> Result<String, LottoError>;
}
