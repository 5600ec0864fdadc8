//! Identification resolution: image, text, or barcode in, ranked product
//! name candidates out.

use thiserror::Error;
use tracing::debug;

use crate::domain::{Category, EngineConfig, Identification, Query, QueryKind};
use crate::infra::classifier::ClassifierClient;
use crate::infra::fallback::{first_accepted, BackendError, Exhausted};
use crate::infra::sources::SearchClient;

/// Ceiling on ranked name candidates kept from a classifier reply.
const MAX_CANDIDATES: usize = 4;

const IDENTIFY_INSTRUCTION: &str = "Identifie l'objet visible sur ces photos \
(plusieurs vues du même objet physique).\n\
Réponds exactement dans ce format:\n\
CATEGORIE: VETEMENT, MEUBLE, TECH ou AUTRE\n\
1. nom de produit le plus probable\n\
2. deuxième candidat\n\
3. troisième candidat\n\
4. quatrième candidat\n\
Donne des noms précis et vendables (marque et modèle quand ils sont lisibles).";

#[derive(Debug, Error)]
pub enum ResolverError {
    /// Every configured backend was tried without a usable identification.
    /// The only engine condition worth surfacing to the user: retry, or
    /// fall back to manual entry.
    #[error("identification failed: {0}")]
    Exhausted(#[from] Exhausted),
    #[error("query carries neither text nor images")]
    EmptyQuery,
}

pub struct Resolver {
    classifier: ClassifierClient,
    search: SearchClient,
    config: EngineConfig,
}

impl Resolver {
    pub fn new(classifier: ClassifierClient, search: SearchClient, config: EngineConfig) -> Self {
        Self {
            classifier,
            search,
            config,
        }
    }

    /// Resolves a query into ranked name candidates. Stateless: when several
    /// candidates come back, the caller is expected to let a human pick one
    /// before valuation runs.
    pub async fn identify(&self, query: &Query) -> Result<Identification, ResolverError> {
        match query.kind {
            QueryKind::Text => {
                let text = query
                    .text
                    .as_deref()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .ok_or(ResolverError::EmptyQuery)?;
                Ok(Identification {
                    candidates: vec![text.to_string()],
                    category: None,
                })
            }
            QueryKind::Barcode => {
                let code = query.text.as_deref().ok_or(ResolverError::EmptyQuery)?;
                self.lookup_barcode(code).await
            }
            QueryKind::Image => {
                if query.images.is_empty() {
                    return Err(ResolverError::EmptyQuery);
                }
                self.classify_images(query).await
            }
        }
    }

    /// Raw digit codes resolve poorly on price-search engines; a generic web
    /// search first turns the code into a human-readable name, and price
    /// sources only ever see that name.
    async fn lookup_barcode(&self, code: &str) -> Result<Identification, ResolverError> {
        let titles = self.search.organic_titles(code).await.map_err(|error| {
            Exhausted {
                attempted: 1,
                last_detail: error.to_string(),
            }
        })?;

        let Some(title) = titles.first() else {
            return Err(ResolverError::Exhausted(Exhausted {
                attempted: 1,
                last_detail: format!("web lookup returned no results for code {code}"),
            }));
        };

        let name = leading_fragment(title);
        debug!("[resolver] code {code} resolved to {name:?}");
        Ok(Identification {
            candidates: vec![name.to_string()],
            category: None,
        })
    }

    async fn classify_images(&self, query: &Query) -> Result<Identification, ResolverError> {
        let identification = first_accepted(
            &self.config.classifier_models,
            &self.config.retry,
            |model| async move {
                match self
                    .classifier
                    .generate(&model, IDENTIFY_INSTRUCTION, &query.images)
                    .await
                {
                    Ok(text) => Ok(parse_identification(&text)),
                    Err(error) if error.is_rate_limited() => {
                        Err(BackendError::RateLimited(error.to_string()))
                    }
                    Err(error) => Err(BackendError::Failed(error.to_string())),
                }
            },
            |identification: &Identification| !identification.candidates.is_empty(),
        )
        .await?;

        Ok(identification)
    }
}

/// Tolerant line scanner over a classifier's free-form reply. The strict
/// format in the instruction is a request the backend may ignore: category
/// and candidate lines are recognized wherever they appear, and anything
/// unrecognized degrades to defaults.
pub(crate) fn parse_identification(text: &str) -> Identification {
    let mut category = None;
    let mut candidates = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let upper = line.to_uppercase();
        if upper.starts_with("CAT") {
            let value = line.split_once(':').map(|(_, v)| v).unwrap_or(line);
            category = category.or_else(|| Category::parse(value));
            continue;
        }
        if upper.starts_with("NOM") {
            if let Some((_, value)) = line.split_once(':') {
                push_candidate(&mut candidates, value);
            }
            continue;
        }
        if let Some(name) = enumerated_name(line) {
            push_candidate(&mut candidates, name);
        }
    }

    Identification {
        candidates,
        category,
    }
}

fn push_candidate(candidates: &mut Vec<String>, name: &str) {
    let name = name.trim();
    if !name.is_empty() && candidates.len() < MAX_CANDIDATES {
        candidates.push(name.to_string());
    }
}

/// Strips a leading ordinal marker (`1.`, `2)`, `3 -`) from an enumerated
/// line; returns `None` for lines that are not enumerated entries.
fn enumerated_name(line: &str) -> Option<&str> {
    let digit_count = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digit_count == 0 || digit_count > 2 {
        return None;
    }
    let rest = line[digit_count..].trim_start();
    let rest = rest.strip_prefix(|c: char| matches!(c, '.' | ')' | '-' | ':'))?;
    let name = rest.trim();
    (!name.is_empty()).then_some(name)
}

/// The most specific leading fragment of a page title: everything before
/// the first separator a retail site appends its own branding after.
pub(crate) fn leading_fragment(title: &str) -> &str {
    let mut fragment = title;
    for separator in [" - ", " | ", " – ", " — "] {
        if let Some((head, _)) = fragment.split_once(separator) {
            fragment = head;
        }
    }
    fragment.trim()
}
