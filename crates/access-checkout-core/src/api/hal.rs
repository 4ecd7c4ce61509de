//! Minimal HAL (`application/hal+json`) document model.
//!
//! Only `_links` is read. A relation maps to a single link object or to an
//! array of them; `curies` is the conventional array of compact URI
//! templates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CheckoutError;

/// One link object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HalLink {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub templated: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum HalLinks {
    One(HalLink),
    Many(Vec<HalLink>),
}

impl HalLinks {
    fn first(&self) -> Option<&HalLink> {
        match self {
            Self::One(link) => Some(link),
            Self::Many(links) => links.first(),
        }
    }

    fn all(&self) -> &[HalLink] {
        match self {
            Self::One(link) => std::slice::from_ref(link),
            Self::Many(links) => links,
        }
    }
}

/// A parsed HAL document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HalDocument {
    #[serde(rename = "_links", default)]
    links: BTreeMap<String, HalLinks>,
}

impl HalDocument {
    /// Parses a response body.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Deserialization`] for an empty body or text
    /// that is not a JSON object.
    pub fn parse(body: &str) -> Result<Self, CheckoutError> {
        if body.trim().is_empty() {
            return Err(CheckoutError::deserialization("Cannot deserialize empty string"));
        }
        serde_json::from_str(body)
            .map_err(|e| CheckoutError::deserialization(format!("Cannot interpret json: {e}")))
    }

    /// The `href` of `relation`; the first one when the relation is an array.
    pub fn href(&self, relation: &str) -> Option<&str> {
        self.links
            .get(relation)
            .and_then(HalLinks::first)
            .map(|link| link.href.as_str())
    }

    /// Like [`href`](Self::href) but fails with the missing relation's name.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Deserialization`] when `relation` is absent.
    pub fn require_href(&self, relation: &str) -> Result<&str, CheckoutError> {
        self.href(relation)
            .ok_or_else(|| CheckoutError::deserialization(format!("Missing property: '{relation}'")))
    }

    /// The document's curies, in order.
    pub fn curies(&self) -> Vec<HalLink> {
        self.links
            .get("curies")
            .map(|links| links.all().to_vec())
            .unwrap_or_default()
    }

    /// All relation names present, sorted.
    pub fn relations(&self) -> impl Iterator<Item = &str> {
        self.links.keys().map(String::as_str)
    }
}
