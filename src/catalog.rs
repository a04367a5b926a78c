use std::collections::HashSet;
use std::fmt;

use rust_embed::Embed;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Embed)]
#[folder = "assets/catalog/"]
struct CatalogAssets;

const CATALOG_FILE: &str = "cards.toml";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog asset {0} is missing")]
    Missing(&'static str),
    #[error("catalog is not valid UTF-8")]
    Encoding,
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("duplicate card id: {0}")]
    DuplicateCard(CardId),
    #[error("duplicate domain: {0}")]
    DuplicateDomain(String),
    #[error("card {card} references unknown domain {domain:?}")]
    UnknownDomain { card: CardId, domain: String },
    #[error("domain id {0:?} is reserved")]
    ReservedDomain(String),
}

/// Stable card identifier. Progress documents reference cards by this id.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CardId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub id: String,
    pub number: String,
    pub color: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub question: String,
    pub answer: String,
    pub domain: String,
    /// Filled from the owning domain when the catalog is assembled.
    #[serde(default)]
    pub domain_number: String,
    pub objective: String,
    pub color: String,
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    domains: Vec<Domain>,
    #[serde(default)]
    cards: Vec<Card>,
}

/// Read-only card catalog, in display order.
#[derive(Clone, Debug)]
pub struct Catalog {
    domains: Vec<Domain>,
    cards: Vec<Card>,
}

impl Catalog {
    /// Load the catalog compiled into the binary.
    pub fn embedded() -> Result<Self, CatalogError> {
        let file = CatalogAssets::get(CATALOG_FILE).ok_or(CatalogError::Missing(CATALOG_FILE))?;
        let content = std::str::from_utf8(file.data.as_ref()).map_err(|_| CatalogError::Encoding)?;
        Self::from_toml_str(content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(content)?;
        Self::from_parts(file.domains, file.cards)
    }

    pub fn from_parts(domains: Vec<Domain>, mut cards: Vec<Card>) -> Result<Self, CatalogError> {
        let mut domain_ids = HashSet::new();
        for domain in &domains {
            if domain.id == crate::engine::selection::ALL_DOMAINS {
                return Err(CatalogError::ReservedDomain(domain.id.clone()));
            }
            if !domain_ids.insert(domain.id.as_str()) {
                return Err(CatalogError::DuplicateDomain(domain.id.clone()));
            }
        }

        let mut card_ids = HashSet::new();
        for card in &mut cards {
            if !card_ids.insert(card.id.clone()) {
                return Err(CatalogError::DuplicateCard(card.id.clone()));
            }
            let Some(domain) = domains.iter().find(|d| d.id == card.domain) else {
                return Err(CatalogError::UnknownDomain {
                    card: card.id.clone(),
                    domain: card.domain.clone(),
                });
            };
            card.domain_number = domain.number.clone();
        }

        Ok(Self { domains, cards })
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn domains(&self) -> &[Domain] {
        &self.domains
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn card(&self, id: &CardId) -> Option<&Card> {
        self.cards.iter().find(|c| &c.id == id)
    }

    pub fn contains(&self, id: &CardId) -> bool {
        self.card(id).is_some()
    }

    pub fn domain(&self, id: &str) -> Option<&Domain> {
        self.domains.iter().find(|d| d.id == id)
    }

    pub fn cards_in_domain<'a>(&'a self, domain: &'a str) -> impl Iterator<Item = &'a Card> + 'a {
        self.cards.iter().filter(move |c| c.domain == domain)
    }
}
