//! Valuation engine estimating the resale cote of secondhand items.
//!
//! - Resolves a photo, text, or barcode query into a canonical product name.
//! - Fans the name out to independent marketplace adapters and normalizes
//!   their raw price text.
//! - Aggregates the surviving prices into a median estimate with a
//!   liquidity label.

pub mod domain;
pub mod engine;
pub mod infra;
pub mod util;

pub use domain::{
    CanonicalName, Category, Currency, EngineConfig, Identification, ImageData, Liquidity,
    LiquidityThresholds, NormalizedPrice, PlausibilityBounds, Query, QueryKind, RawOffer,
    RetryPolicy, Valuation,
};
pub use engine::{Appraisal, EngineBuildError, ValuationEngine};
pub use infra::classifier::ClassifierClient;
pub use infra::resolver::{Resolver, ResolverError};
pub use infra::sources::{
    EbayAdapter, SearchClient, ShoppingAdapter, SiteSearchAdapter, SourceAdapter,
};
pub use util::sink::{JsonlSink, SinkError, ValuationRecord, ValuationSink};
