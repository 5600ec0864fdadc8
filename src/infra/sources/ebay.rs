//! Sold/completed-listings adapter.
//!
//! Sold listings approximate realized transaction prices rather than asking
//! prices, which is what a resale cote should track.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::domain::{RawOffer, RetryPolicy};
use crate::infra::fallback::{first_accepted, BackendError};

use super::{looks_blocked, sweep_prices, SourceAdapter, SourceError, SCRAPE_USER_AGENT};

const SOURCE_ID: &str = "ebay";
const DEFAULT_MIRRORS: &[&str] = &[
    "https://www.ebay.fr/sch/i.html",
    "https://www.ebay.com/sch/i.html",
];

pub struct EbayAdapter {
    http: Client,
    mirrors: Vec<Url>,
    retry: RetryPolicy,
}

impl EbayAdapter {
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        Self::with_mirrors(DEFAULT_MIRRORS, timeout)
    }

    /// Search endpoints tried in order until one yields offers.
    pub fn with_mirrors(mirrors: &[&str], timeout: Duration) -> Result<Self, SourceError> {
        let mirrors = mirrors
            .iter()
            .map(|base| Url::parse(base))
            .collect::<Result<Vec<_>, _>>()?;
        let http = Client::builder()
            .user_agent(SCRAPE_USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            mirrors,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn fetch_from(&self, base: Url, query: &str) -> Result<Vec<RawOffer>, BackendError> {
        let mut url = base;
        url.query_pairs_mut()
            .append_pair("_nkw", query)
            .append_pair("LH_Sold", "1")
            .append_pair("LH_Complete", "1");

        debug!("[ebay] requesting {url}");
        let document = async {
            let response = self.http.get(url).send().await?.error_for_status()?;
            Ok::<String, SourceError>(response.text().await?)
        }
        .await?;

        if looks_blocked(&document) {
            return Err(SourceError::Blocked.into());
        }

        let offers = extract_listings(&document);
        if !offers.is_empty() {
            return Ok(offers);
        }
        debug!("[ebay] structural selectors found nothing, sweeping document text");
        Ok(sweep_prices(&document, SOURCE_ID))
    }
}

#[async_trait]
impl SourceAdapter for EbayAdapter {
    fn id(&self) -> &str {
        SOURCE_ID
    }

    async fn fetch(&self, query: &str) -> Vec<RawOffer> {
        let result = first_accepted(
            &self.mirrors,
            &self.retry,
            |base| self.fetch_from(base, query),
            |offers: &Vec<RawOffer>| !offers.is_empty(),
        )
        .await;

        match result {
            Ok(offers) => offers,
            Err(error) => {
                warn!("[ebay] degraded to zero offers: {error}");
                Vec::new()
            }
        }
    }
}

/// Precise pass: one offer per `.s-item` result card.
fn extract_listings(document: &str) -> Vec<RawOffer> {
    let html = Html::parse_document(document);
    let item = Selector::parse(".s-item").unwrap();
    let price = Selector::parse(".s-item__price").unwrap();
    let title = Selector::parse(".s-item__title").unwrap();
    let link = Selector::parse("a.s-item__link").unwrap();
    let image = Selector::parse(".s-item__image img").unwrap();

    let mut offers = Vec::new();
    for element in html.select(&item) {
        let Some(price_text) = element
            .select(&price)
            .next()
            .map(|node| node.text().collect::<String>())
        else {
            continue;
        };
        let title = element
            .select(&title)
            .next()
            .map(|node| node.text().collect::<String>())
            .unwrap_or_default();
        let link = element
            .select(&link)
            .next()
            .and_then(|node| node.value().attr("href"))
            .map(str::to_string);
        let thumbnail_url = element
            .select(&image)
            .next()
            .and_then(|node| node.value().attr("src"))
            .map(str::to_string);

        offers.push(RawOffer {
            source_id: SOURCE_ID.to_string(),
            price_text: price_text.trim().to_string(),
            title: title.trim().to_string(),
            link,
            thumbnail_url,
        });
    }
    offers
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULT_PAGE: &str = r#"
        <html><body>
          <ul>
            <li class="s-item">
              <a class="s-item__link" href="https://www.ebay.fr/itm/1"></a>
              <div class="s-item__image"><img src="https://i.ebayimg.com/1.jpg"></div>
              <div class="s-item__title">Console PS5 Digital Edition</div>
              <span class="s-item__price">249,99 €</span>
            </li>
            <li class="s-item">
              <div class="s-item__title">PS5 Digital occasion</div>
              <span class="s-item__price">EUR 260.00</span>
            </li>
            <li class="s-item">
              <div class="s-item__title">Lot sans prix</div>
            </li>
          </ul>
        </body></html>"#;

    #[test]
    fn structural_pass_extracts_result_cards() {
        let offers = extract_listings(RESULT_PAGE);
        assert_eq!(offers.len(), 2);
        assert_eq!(offers[0].price_text, "249,99 €");
        assert_eq!(offers[0].title, "Console PS5 Digital Edition");
        assert_eq!(offers[0].link.as_deref(), Some("https://www.ebay.fr/itm/1"));
        assert_eq!(
            offers[0].thumbnail_url.as_deref(),
            Some("https://i.ebayimg.com/1.jpg")
        );
        assert_eq!(offers[1].price_text, "EUR 260.00");
        assert!(offers[1].link.is_none());
    }

    #[test]
    fn markup_without_result_cards_leaves_the_sweep_to_fire() {
        // Layout churn scenario: prices present, known classes gone.
        let page = "<html><body><div class=\"new-layout\">Vendu 249,99 €</div></body></html>";
        assert!(extract_listings(page).is_empty());
        let swept = sweep_prices(page, SOURCE_ID);
        assert_eq!(swept.len(), 1);
        assert_eq!(swept[0].price_text, "249,99 €");
    }
}
