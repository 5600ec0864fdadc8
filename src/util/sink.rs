//! Outbound record emission toward the external spreadsheet-like store.
//!
//! The engine only ever writes here; valuation never reads past results
//! back (no historical-price feedback loop).

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::domain::{Category, Liquidity};
use crate::engine::Appraisal;

/// One flat row per finished appraisal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValuationRecord {
    pub name: String,
    pub category: Option<Category>,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub sample_count: usize,
    pub liquidity: Liquidity,
    pub thumbnail_url: Option<String>,
    pub valued_at: String,
}

impl ValuationRecord {
    pub fn from_appraisal(appraisal: &Appraisal) -> Self {
        Self {
            name: appraisal.name.label.clone(),
            category: appraisal.name.category,
            median: appraisal.valuation.median,
            min: appraisal.valuation.min,
            max: appraisal.valuation.max,
            sample_count: appraisal.valuation.sample_count,
            liquidity: appraisal.valuation.liquidity,
            thumbnail_url: appraisal.thumbnail_url.clone(),
            valued_at: OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

/// The receiving side of the store boundary.
pub trait ValuationSink {
    fn record(&self, record: &ValuationRecord) -> Result<(), SinkError>;
}

/// Append-only store, one JSON object per line.
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ValuationSink for JsonlSink {
    fn record(&self, record: &ValuationRecord) -> Result<(), SinkError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(record)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{json}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CanonicalName, Currency, NormalizedPrice, Valuation};

    fn sample_appraisal() -> Appraisal {
        Appraisal {
            name: CanonicalName::new("PS5 Digital").with_category(Category::Tech),
            valuation: Valuation {
                median: 62.5,
                min: 58.0,
                max: 70.0,
                sample_count: 4,
                liquidity: Liquidity::Medium,
                offers: vec![NormalizedPrice {
                    source_id: "ebay".to_string(),
                    amount: 58.0,
                    currency: Currency::Eur,
                }],
            },
            thumbnail_url: Some("https://img.test/ps5.jpg".to_string()),
        }
    }

    #[test]
    fn record_mirrors_the_appraisal() {
        let record = ValuationRecord::from_appraisal(&sample_appraisal());
        assert_eq!(record.name, "PS5 Digital");
        assert_eq!(record.category, Some(Category::Tech));
        assert_eq!(record.median, 62.5);
        assert_eq!(record.sample_count, 4);
        assert!(!record.valued_at.is_empty());
    }

    #[test]
    fn jsonl_sink_appends_one_parseable_line_per_record() {
        let path = std::env::temp_dir().join(format!(
            "cote-scanner-sink-{}.jsonl",
            uuid::Uuid::new_v4()
        ));
        let sink = JsonlSink::new(&path);

        let record = ValuationRecord::from_appraisal(&sample_appraisal());
        sink.record(&record).unwrap();
        sink.record(&record).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let parsed: ValuationRecord = serde_json::from_str(line).unwrap();
            assert_eq!(parsed.name, "PS5 Digital");
        }

        fs::remove_file(&path).unwrap();
    }
}
