//! One resilient query-and-extract primitive over an HTML search endpoint,
//! reused for every marketplace reachable with a `site:` restriction and
//! for the resolver's barcode lookup.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::domain::RawOffer;

use super::{looks_blocked, sweep_prices, SourceAdapter, SourceError, PRICE_FRAGMENT, SCRAPE_USER_AGENT};

const DEFAULT_BASE_URL: &str = "https://html.duckduckgo.com/html/";

/// Permissive fallback over anchor markup when the result selectors rot.
static RESULT_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<a[^>]*class="[^"]*result__a[^"]*"[^>]*>([^<]+)</a>"#).unwrap()
});

/// A plain HTML search endpoint turned into typed lookups.
#[derive(Clone)]
pub struct SearchClient {
    http: Client,
    base_url: Url,
}

impl SearchClient {
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    pub fn with_base_url(base: &str, timeout: Duration) -> Result<Self, SourceError> {
        let base_url = Url::parse(base)?;
        let http = Client::builder()
            .user_agent(SCRAPE_USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { http, base_url })
    }

    async fn request(&self, query: &str) -> Result<String, SourceError> {
        let mut url = self.base_url.clone();
        url.query_pairs_mut().append_pair("q", query);
        debug!("[search] requesting {url}");
        let document = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        if looks_blocked(&document) {
            return Err(SourceError::Blocked);
        }
        Ok(document)
    }

    /// Titles of the organic results, most relevant first.
    pub async fn organic_titles(&self, query: &str) -> Result<Vec<String>, SourceError> {
        let document = self.request(query).await?;
        let mut titles = extract_titles(&document);
        if titles.is_empty() {
            titles = RESULT_ANCHOR
                .captures_iter(&document)
                .filter_map(|capture| capture.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|title| !title.is_empty())
                .collect();
        }
        Ok(titles)
    }

    /// Result rows carrying a recognizable price fragment, as raw offers.
    pub(crate) async fn offers(
        &self,
        query: &str,
        source_id: &str,
    ) -> Result<Vec<RawOffer>, SourceError> {
        let document = self.request(query).await?;
        let offers = extract_result_offers(&document, source_id);
        if !offers.is_empty() {
            return Ok(offers);
        }
        debug!("[search] no structured results for {source_id}, sweeping document text");
        Ok(sweep_prices(&document, source_id))
    }
}

fn extract_titles(document: &str) -> Vec<String> {
    let html = Html::parse_document(document);
    let anchor = Selector::parse("a.result__a").unwrap();
    html.select(&anchor)
        .map(|node| node.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty())
        .collect()
}

/// Precise pass: one offer per result row whose title or snippet quotes a
/// price.
fn extract_result_offers(document: &str, source_id: &str) -> Vec<RawOffer> {
    let html = Html::parse_document(document);
    let row = Selector::parse("div.result").unwrap();
    let anchor = Selector::parse("a.result__a").unwrap();
    let snippet = Selector::parse(".result__snippet").unwrap();

    let mut offers = Vec::new();
    for element in html.select(&row) {
        let Some(link_node) = element.select(&anchor).next() else {
            continue;
        };
        let title = link_node.text().collect::<String>().trim().to_string();
        let link = link_node.value().attr("href").map(str::to_string);
        let snippet_text = element
            .select(&snippet)
            .next()
            .map(|node| node.text().collect::<String>())
            .unwrap_or_default();

        let haystack = format!("{title} {snippet_text}");
        let Some(fragment) = PRICE_FRAGMENT.find(&haystack) else {
            continue;
        };

        offers.push(RawOffer {
            source_id: source_id.to_string(),
            price_text: fragment.as_str().to_string(),
            title,
            link,
            thumbnail_url: None,
        });
    }
    offers
}

/// A marketplace reached through the search engine with a `site:`
/// restriction. One primitive, many call sites.
pub struct SiteSearchAdapter {
    search: SearchClient,
    source_id: String,
    domain: String,
}

impl SiteSearchAdapter {
    pub fn new(
        search: SearchClient,
        source_id: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            search,
            source_id: source_id.into(),
            domain: domain.into(),
        }
    }
}

#[async_trait]
impl SourceAdapter for SiteSearchAdapter {
    fn id(&self) -> &str {
        &self.source_id
    }

    async fn fetch(&self, query: &str) -> Vec<RawOffer> {
        let restricted = format!("site:{} {}", self.domain, query);
        match self.search.offers(&restricted, &self.source_id).await {
            Ok(offers) => offers,
            Err(error) => {
                warn!("[{}] degraded to zero offers: {error}", self.source_id);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULT_PAGE: &str = r#"
        <html><body>
          <div class="result">
            <a class="result__a" href="https://www.leboncoin.fr/annonce/1">PS5 Digital comme neuve</a>
            <a class="result__snippet">Vendue complete, 320 € a debattre.</a>
          </div>
          <div class="result">
            <a class="result__a" href="https://www.leboncoin.fr/annonce/2">PS5 Digital occasion 300€</a>
          </div>
          <div class="result">
            <a class="result__a" href="https://www.leboncoin.fr/annonce/3">Manette seule</a>
            <a class="result__snippet">Etat correct, sans prix indique.</a>
          </div>
        </body></html>"#;

    #[test]
    fn rows_without_a_price_fragment_are_skipped() {
        let offers = extract_result_offers(RESULT_PAGE, "leboncoin");
        assert_eq!(offers.len(), 2);
        assert_eq!(offers[0].price_text, "320 €");
        assert_eq!(offers[0].title, "PS5 Digital comme neuve");
        assert_eq!(
            offers[0].link.as_deref(),
            Some("https://www.leboncoin.fr/annonce/1")
        );
        assert_eq!(offers[1].price_text, "300€");
    }

    #[test]
    fn titles_come_back_in_document_order() {
        let titles = extract_titles(RESULT_PAGE);
        assert_eq!(titles[0], "PS5 Digital comme neuve");
        assert_eq!(titles.len(), 3);
    }

    #[test]
    fn anchor_regex_catches_titles_when_selectors_fail() {
        // Same class buried in markup the structural pass cannot model.
        let degraded = r#"<table><tr><td><a data-x class="wide result__a extra" href="/r">Generic Widget Model X - Fiche produit</a></td></tr></table>"#;
        let captured: Vec<String> = RESULT_ANCHOR
            .captures_iter(degraded)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .collect();
        assert_eq!(captured, vec!["Generic Widget Model X - Fiche produit"]);
    }
}
