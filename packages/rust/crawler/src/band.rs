//! Band construction from category index entries.

use std::sync::LazyLock;

use regex::Regex;
use scraper::ElementRef;
use tracing::{debug, warn};

use bandgraph_shared::{Band, Result};

use crate::members::MemberExtractor;

/// Class of the expand/collapse bullet shown before entries with subcategories.
pub const BULLET_CLASS: &str = "CategoryTreeBullet";

/// Trailing ` members` with an optional ` (qualifier)` before it.
static MEMBERS_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"( \([a-zA-Z0-9 \-]+\))? members$").expect("valid regex")
});

/// `"Queen (band) members"` → `"Queen"`. Names without the suffix are unchanged.
pub fn strip_members_suffix(page_name: &str) -> String {
    let mut name = page_name.to_string();
    while let Some(m) = MEMBERS_SUFFIX.find(&name) {
        name.truncate(m.start());
    }
    name
}

/// One band anchor of an index page, detached from the parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandEntry {
    pub page_name: String,
    pub url: String,
    pub has_subcategories: bool,
}

impl BandEntry {
    /// Read an index anchor. Anchors without `href` yield `None`.
    pub fn from_anchor(anchor: ElementRef<'_>) -> Option<Self> {
        let page_name = anchor.text().collect::<String>();
        let Some(url) = anchor.value().attr("href") else {
            warn!(%page_name, "band anchor without href, skipping");
            return None;
        };

        let has_subcategories = anchor
            .prev_siblings()
            .find_map(ElementRef::wrap)
            .is_some_and(|sibling| sibling.value().classes().any(|c| c == BULLET_CLASS));

        Some(Self {
            page_name,
            url: url.to_string(),
            has_subcategories,
        })
    }
}

/// Turns index entries into [`Band`]s, resolving members eagerly.
#[derive(Debug, Clone)]
pub struct BandBuilder {
    members: MemberExtractor,
}

impl BandBuilder {
    pub fn new(members: MemberExtractor) -> Self {
        Self { members }
    }

    pub async fn build(&self, entry: BandEntry) -> Result<Band> {
        let members = self.members.extract(&entry.url).await?;
        debug!(band = %entry.page_name, members = members.len(), "band built");

        Ok(Band {
            name: strip_members_suffix(&entry.page_name),
            page_name: entry.page_name,
            url: entry.url,
            members,
            has_subcategories: entry.has_subcategories,
        })
    }
}
