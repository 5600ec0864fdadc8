//! Price sources: one adapter per external marketplace or search backend.

pub mod ebay;
pub mod shopping;
pub mod site_search;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;
use thiserror::Error;

use crate::domain::RawOffer;
use crate::infra::fallback::BackendError;

pub use ebay::EbayAdapter;
pub use shopping::ShoppingAdapter;
pub use site_search::{SearchClient, SiteSearchAdapter};

/// Browser-looking agent; marketplaces serve interstitials to obvious bots.
pub(crate) const SCRAPE_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Cap on offers harvested by the permissive document sweep.
pub(crate) const MAX_SWEEP_OFFERS: usize = 30;

/// One external marketplace or search backend.
///
/// `fetch` never lets a transport, parse, or block failure escape its
/// boundary: a broken source contributes zero offers, nothing more.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn id(&self) -> &str;
    async fn fetch(&self, query: &str) -> Vec<RawOffer>;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("blocked by interstitial page")]
    Blocked,
    #[error("api error: {0}")]
    Api(String),
}

impl From<SourceError> for BackendError {
    fn from(error: SourceError) -> Self {
        match &error {
            SourceError::Http(http) if http.status() == Some(StatusCode::TOO_MANY_REQUESTS) => {
                BackendError::RateLimited(error.to_string())
            }
            _ => BackendError::Failed(error.to_string()),
        }
    }
}

/// Phrases that mark a verification or interstitial page served in place of
/// real results. Such a page is zero offers, never data.
const BLOCK_MARKERS: &[&str] = &[
    "captcha",
    "unusual traffic",
    "verify you are a human",
    "are you a robot",
    "access denied",
    "pardon our interruption",
];

pub(crate) fn looks_blocked(document: &str) -> bool {
    let lowered = document.to_lowercase();
    BLOCK_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// Permissive euro-amount fragment: `"1 200,50 €"`, `"EUR 45.00"`, `"€45"`.
/// Site markup churns constantly; when structural selectors find nothing,
/// a sweep with this pattern over the whole document still does.
pub(crate) static PRICE_FRAGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:€|EUR)[ \x{A0}]?\d(?:[\d\x{A0} .,]*\d)?|\d(?:[\d\x{A0} .,]*\d)?[ \x{A0}]?(?:€|EUR)",
    )
    .unwrap()
});

/// Harvests bare price fragments from the full document text. The offers
/// carry no title or link; only the amount survives normalization anyway.
pub(crate) fn sweep_prices(document: &str, source_id: &str) -> Vec<RawOffer> {
    PRICE_FRAGMENT
        .find_iter(document)
        .take(MAX_SWEEP_OFFERS)
        .map(|fragment| RawOffer {
            source_id: source_id.to_string(),
            price_text: fragment.as_str().to_string(),
            title: String::new(),
            link: None,
            thumbnail_url: None,
        })
        .collect()
}
