use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::entities::{Category, Liquidity};

/// Band of amounts accepted as plausible resale prices. Values below the
/// floor are accessory upsells; values above the ceiling are OCR or parse
/// corruption. Source text is noisy HTML, so this filter does most of the
/// correctness work.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlausibilityBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for PlausibilityBounds {
    fn default() -> Self {
        Self {
            min: 1.0,
            max: 10_000.0,
        }
    }
}

impl PlausibilityBounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Inclusive at both ends.
    pub fn admits(&self, amount: f64) -> bool {
        amount >= self.min && amount <= self.max
    }
}

/// Sample-count cut points for the liquidity label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityThresholds {
    /// Strictly more samples than this is a liquid market.
    pub high_over: usize,
    /// At least this many samples is a medium market.
    pub medium_from: usize,
}

impl Default for LiquidityThresholds {
    fn default() -> Self {
        Self {
            high_over: 12,
            medium_from: 3,
        }
    }
}

impl LiquidityThresholds {
    pub fn classify(&self, sample_count: usize) -> Liquidity {
        if sample_count > self.high_over {
            Liquidity::High
        } else if sample_count >= self.medium_from {
            Liquidity::Medium
        } else {
            Liquidity::Low
        }
    }
}

/// Same-backend retry budget for transient rate-limit signals.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub pause: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            pause: Duration::from_millis(1500),
        }
    }
}

/// All engine tunables in one place. Candidate lists, bounds, and
/// thresholds are data, not constants baked into the logic.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub bounds: PlausibilityBounds,
    pub category_bounds: HashMap<Category, PlausibilityBounds>,
    pub liquidity: LiquidityThresholds,
    pub retry: RetryPolicy,
    pub fetch_timeout: Duration,
    /// Classifier backends tried in order; all share the same contract.
    pub classifier_models: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bounds: PlausibilityBounds::default(),
            category_bounds: HashMap::new(),
            liquidity: LiquidityThresholds::default(),
            retry: RetryPolicy::default(),
            fetch_timeout: Duration::from_secs(8),
            classifier_models: vec![
                "gemini-2.0-flash".to_string(),
                "gemini-flash-lite-latest".to_string(),
                "gemini-1.5-flash".to_string(),
            ],
        }
    }
}

impl EngineConfig {
    pub fn with_bounds(mut self, bounds: PlausibilityBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn with_category_bounds(mut self, category: Category, bounds: PlausibilityBounds) -> Self {
        self.category_bounds.insert(category, bounds);
        self
    }

    pub fn with_liquidity(mut self, liquidity: LiquidityThresholds) -> Self {
        self.liquidity = liquidity;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_classifier_models(mut self, models: Vec<String>) -> Self {
        self.classifier_models = models;
        self
    }

    /// The plausibility band for an item, honoring per-category overrides.
    pub fn bounds_for(&self, category: Option<Category>) -> PlausibilityBounds {
        category
            .and_then(|c| self.category_bounds.get(&c).copied())
            .unwrap_or(self.bounds)
    }
}
