use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One user request: captured photos of a physical item, or a typed
/// text/barcode query. Immutable for the lifetime of the request.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub id: Uuid,
    pub kind: QueryKind,
    pub text: Option<String>,
    pub images: Vec<ImageData>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryKind {
    Image,
    Text,
    Barcode,
}

impl Query {
    /// Builds a text query, classifying long digit runs as barcodes.
    pub fn from_text(input: &str) -> Self {
        let trimmed = input.trim();
        let kind = if is_barcode(trimmed) {
            QueryKind::Barcode
        } else {
            QueryKind::Text
        };
        Self {
            id: Uuid::new_v4(),
            kind,
            text: Some(trimmed.to_string()),
            images: Vec::new(),
        }
    }

    /// Builds an image query from one or more views of the same object.
    pub fn from_images(images: Vec<ImageData>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: QueryKind::Image,
            text: None,
            images,
        }
    }
}

/// EAN-8 is the shortest barcode format in the wild; anything purely
/// numeric and longer than that is treated as a code, not a product name.
fn is_barcode(text: &str) -> bool {
    text.len() > 8 && text.chars().all(|c| c.is_ascii_digit())
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Vetement,
    Meuble,
    Tech,
    Autre,
}

impl Category {
    /// Tolerant match over a classifier's free-form category line.
    pub fn parse(label: &str) -> Option<Self> {
        let upper = label.trim().to_uppercase();
        if upper.contains("VETEMENT") || upper.contains("VÊTEMENT") {
            Some(Self::Vetement)
        } else if upper.contains("MEUBLE") {
            Some(Self::Meuble)
        } else if upper.contains("TECH") {
            Some(Self::Tech)
        } else if upper.contains("AUTRE") {
            Some(Self::Autre)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vetement => "VETEMENT",
            Self::Meuble => "MEUBLE",
            Self::Tech => "TECH",
            Self::Autre => "AUTRE",
        }
    }
}

/// The resolved product identity used as the query key for all price sources.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanonicalName {
    pub label: String,
    pub category: Option<Category>,
}

impl CanonicalName {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            category: None,
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }
}

/// Resolver output prior to human disambiguation: up to four ranked name
/// candidates, most probable first.
#[derive(Clone, Debug, PartialEq)]
pub struct Identification {
    pub candidates: Vec<String>,
    pub category: Option<Category>,
}

impl Identification {
    /// The leading candidate as a canonical name, if any candidate exists.
    pub fn best(&self) -> Option<CanonicalName> {
        self.candidates.first().map(|label| CanonicalName {
            label: label.clone(),
            category: self.category,
        })
    }
}

/// One listing as extracted from a source, price still in raw text form.
#[derive(Clone, Debug, PartialEq)]
pub struct RawOffer {
    pub source_id: String,
    pub price_text: String,
    pub title: String,
    pub link: Option<String>,
    pub thumbnail_url: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    Eur,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPrice {
    pub source_id: String,
    pub amount: f64,
    pub currency: Currency,
}

/// Coarse volume label derived from how many price observations were found.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Liquidity {
    Low,
    Medium,
    High,
}

/// The market estimate for one item: median cote, observed band, and how
/// much evidence backs it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Valuation {
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub sample_count: usize,
    pub liquidity: Liquidity,
    pub offers: Vec<NormalizedPrice>,
}

impl Valuation {
    /// "No market evidence found" — a valid outcome, not a failure.
    pub fn empty() -> Self {
        Self {
            median: 0.0,
            min: 0.0,
            max: 0.0,
            sample_count: 0,
            liquidity: Liquidity::Low,
            offers: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_digit_runs_classify_as_barcode() {
        let query = Query::from_text("3401234567890");
        assert_eq!(query.kind, QueryKind::Barcode);
        assert_eq!(query.text.as_deref(), Some("3401234567890"));
    }

    #[test]
    fn short_or_mixed_input_stays_text() {
        assert_eq!(Query::from_text("12345678").kind, QueryKind::Text);
        assert_eq!(Query::from_text("PS5 Digital").kind, QueryKind::Text);
        assert_eq!(Query::from_text("iphone 12 64go").kind, QueryKind::Text);
    }

    #[test]
    fn category_parses_tolerantly() {
        assert_eq!(Category::parse("TECH"), Some(Category::Tech));
        assert_eq!(Category::parse(" vêtement "), Some(Category::Vetement));
        assert_eq!(Category::parse("CATEGORIE: MEUBLE"), Some(Category::Meuble));
        assert_eq!(Category::parse("inconnu"), None);
    }

    #[test]
    fn best_candidate_carries_the_category() {
        let identification = Identification {
            candidates: vec!["PS5 Digital".to_string(), "PS5".to_string()],
            category: Some(Category::Tech),
        };
        let name = identification.best().unwrap();
        assert_eq!(name.label, "PS5 Digital");
        assert_eq!(name.category, Some(Category::Tech));
    }

    #[test]
    fn empty_valuation_signals_no_evidence() {
        let valuation = Valuation::empty();
        assert_eq!(valuation.sample_count, 0);
        assert_eq!(valuation.median, 0.0);
        assert_eq!(valuation.liquidity, Liquidity::Low);
    }
}
