//! The valuation pipeline: identify, fan out, normalize, aggregate.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::valuation::summarize;
use crate::domain::{
    normalize, CanonicalName, Currency, EngineConfig, Identification, NormalizedPrice, Query,
    Valuation,
};
use crate::infra::classifier::{ClassifierClient, ClassifierError};
use crate::infra::resolver::{Resolver, ResolverError};
use crate::infra::sources::{
    EbayAdapter, SearchClient, ShoppingAdapter, SiteSearchAdapter, SourceAdapter, SourceError,
};

#[derive(Debug, Error)]
pub enum EngineBuildError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

/// One finished scan: the resolved identity plus its market estimate and a
/// representative thumbnail for the record.
#[derive(Clone, Debug, PartialEq)]
pub struct Appraisal {
    pub name: CanonicalName,
    pub valuation: Valuation,
    pub thumbnail_url: Option<String>,
}

/// Stateless facade over the resolver and the configured price sources.
/// Each call is one self-contained request; nothing is shared or cached
/// between calls.
pub struct ValuationEngine {
    resolver: Resolver,
    adapters: Vec<Arc<dyn SourceAdapter>>,
    config: EngineConfig,
}

impl ValuationEngine {
    pub fn new(
        resolver: Resolver,
        adapters: Vec<Arc<dyn SourceAdapter>>,
        config: EngineConfig,
    ) -> Self {
        Self {
            resolver,
            adapters,
            config,
        }
    }

    /// Wires the standard source roster: eBay sold listings, site-restricted
    /// marketplace searches, and Google Shopping.
    pub fn with_default_sources(
        classifier_api_key: impl Into<String>,
        shopping_api_key: impl Into<String>,
        config: EngineConfig,
    ) -> Result<Self, EngineBuildError> {
        let search = SearchClient::new(config.fetch_timeout)?;
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::new(EbayAdapter::new(config.fetch_timeout)?.with_retry(config.retry)),
            Arc::new(SiteSearchAdapter::new(
                search.clone(),
                "leboncoin",
                "leboncoin.fr",
            )),
            Arc::new(SiteSearchAdapter::new(search.clone(), "vinted", "vinted.fr")),
            Arc::new(ShoppingAdapter::new(shopping_api_key, config.fetch_timeout)?),
        ];
        let resolver = Resolver::new(
            ClassifierClient::new(classifier_api_key)?,
            search,
            config.clone(),
        );
        Ok(Self::new(resolver, adapters, config))
    }

    /// Resolves a query into ranked name candidates; see [`Resolver`].
    pub async fn identify(&self, query: &Query) -> Result<Identification, ResolverError> {
        self.resolver.identify(query).await
    }

    /// Collects, normalizes, and aggregates prices for one canonical name.
    /// Always returns a structured result; zero surviving offers is a valid
    /// "no market evidence" outcome.
    pub async fn valuate(&self, name: &CanonicalName) -> Valuation {
        self.collect(name).await.0
    }

    /// The full scan flow: identify, take the best candidate, valuate.
    pub async fn appraise(&self, query: &Query) -> Result<Appraisal, ResolverError> {
        let identification = self.resolver.identify(query).await?;
        let name = identification.best().ok_or(ResolverError::EmptyQuery)?;
        let (valuation, thumbnail_url) = self.collect(&name).await;
        Ok(Appraisal {
            name,
            valuation,
            thumbnail_url,
        })
    }

    async fn collect(&self, name: &CanonicalName) -> (Valuation, Option<String>) {
        let mut handles = Vec::with_capacity(self.adapters.len());
        for adapter in &self.adapters {
            let adapter = Arc::clone(adapter);
            let query = name.label.clone();
            let source_id = adapter.id().to_string();
            handles.push((
                source_id,
                tokio::spawn(async move { adapter.fetch(&query).await }),
            ));
        }

        let bounds = self.config.bounds_for(name.category);
        let mut prices = Vec::new();
        let mut thumbnail_url = None;

        for (source_id, handle) in handles {
            // A sibling's panic or timeout stays local to that source.
            let offers = match handle.await {
                Ok(offers) => offers,
                Err(error) => {
                    warn!("[engine] source {source_id} task failed: {error}");
                    continue;
                }
            };
            debug!("[engine] {source_id} returned {} raw offer(s)", offers.len());

            for offer in offers {
                if thumbnail_url.is_none() && offer.thumbnail_url.is_some() {
                    thumbnail_url = offer.thumbnail_url.clone();
                }
                let Some(amount) = normalize(&offer.price_text) else {
                    continue;
                };
                if !bounds.admits(amount) {
                    continue;
                }
                prices.push(NormalizedPrice {
                    source_id: offer.source_id,
                    amount,
                    currency: Currency::Eur,
                });
            }
        }

        (summarize(prices, &self.config.liquidity), thumbnail_url)
    }
}
