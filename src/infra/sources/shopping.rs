//! Google Shopping adapter over a SerpAPI-style JSON endpoint, targeting
//! the French market.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::RawOffer;

use super::{SourceAdapter, SourceError, SCRAPE_USER_AGENT};

const SOURCE_ID: &str = "google_shopping";
const DEFAULT_BASE_URL: &str = "https://serpapi.com/search";

pub struct ShoppingAdapter {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl ShoppingAdapter {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        Self::with_base_url(DEFAULT_BASE_URL, api_key, timeout)
    }

    pub fn with_base_url(
        base: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let base_url = Url::parse(base)?;
        let http = Client::builder()
            .user_agent(SCRAPE_USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
        })
    }

    async fn try_fetch(&self, query: &str) -> Result<Vec<RawOffer>, SourceError> {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("engine", "google_shopping")
            .append_pair("q", query)
            .append_pair("google_domain", "google.fr")
            .append_pair("gl", "fr")
            .append_pair("hl", "fr")
            .append_pair("api_key", &self.api_key);

        debug!("[shopping] requesting google_shopping results for {query:?}");
        let body = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_results(&body)
    }
}

#[async_trait]
impl SourceAdapter for ShoppingAdapter {
    fn id(&self) -> &str {
        SOURCE_ID
    }

    async fn fetch(&self, query: &str) -> Vec<RawOffer> {
        match self.try_fetch(query).await {
            Ok(offers) => offers,
            Err(error) => {
                warn!("[shopping] degraded to zero offers: {error}");
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ShoppingEnvelope {
    #[serde(default)]
    shopping_results: Vec<ShoppingResultDto>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ShoppingResultDto {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    price: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
}

fn parse_results(body: &str) -> Result<Vec<RawOffer>, SourceError> {
    let envelope: ShoppingEnvelope =
        serde_json::from_str(body).map_err(|e| SourceError::Api(e.to_string()))?;
    if let Some(message) = envelope.error {
        return Err(SourceError::Api(message));
    }

    Ok(envelope
        .shopping_results
        .into_iter()
        .filter_map(|dto| {
            let price_text = dto.price?;
            Some(RawOffer {
                source_id: SOURCE_ID.to_string(),
                price_text,
                title: dto.title.unwrap_or_default(),
                link: dto.link,
                thumbnail_url: dto.thumbnail,
            })
        })
        .collect())
}
