//! Core domain types for scraped bands and their members.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// BandMember
// ---------------------------------------------------------------------------

/// A person listed in a band's members category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandMember {
    /// Heading text of the member's own page (falls back to `url`).
    pub page_name: String,
    /// Bolded lead text of the member's page (falls back to `page_name`).
    pub name: String,
    /// Relative link to the member's page, as found on the listing.
    pub url: String,
}

// ---------------------------------------------------------------------------
// Band
// ---------------------------------------------------------------------------

/// A band entry from the category index, with its members resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Band {
    /// Anchor text on the index page, verbatim.
    pub page_name: String,
    /// `page_name` without the trailing `(qualifier) members` suffix.
    pub name: String,
    /// Relative link to the band's members category page.
    pub url: String,
    /// Members in listing order.
    pub members: Vec<BandMember>,
    /// The index entry carried a category-tree bullet (it has subcategories).
    #[serde(default)]
    pub has_subcategories: bool,
}

// ---------------------------------------------------------------------------
// PageResult
// ---------------------------------------------------------------------------

/// The outcome of walking one category index page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageResult {
    /// Bands in anchor order.
    pub bands: Vec<Band>,
    /// Link to the following index page, if the page had one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_url: Option<String>,
}

// ---------------------------------------------------------------------------
// MissingElement
// ---------------------------------------------------------------------------

/// An expected page element that was not found, forcing a fallback value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingElement {
    /// No `#firstHeading` on a member page.
    Title,
    /// No bold lead text in the first paragraphs of a member page.
    BoldName,
}

impl std::fmt::Display for MissingElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Title => write!(f, "title"),
            Self::BoldName => write!(f, "bold name"),
        }
    }
}
