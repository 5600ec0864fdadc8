//! Domain logic for item valuation lives here.

pub mod config;
pub mod entities;
pub mod normalize;
pub mod valuation;

pub use config::{EngineConfig, LiquidityThresholds, PlausibilityBounds, RetryPolicy};
pub use entities::{
    CanonicalName, Category, Currency, Identification, ImageData, Liquidity, NormalizedPrice,
    Query, QueryKind, RawOffer, Valuation,
};
pub use normalize::normalize;
pub use valuation::summarize;
