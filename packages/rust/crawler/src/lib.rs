//! Category-tree crawler: cached page fetching, index walking, and
//! band/member extraction.
//!
//! This crate provides:
//! - [`cache`]: content-addressed page cache (`pages/<sha256>`)
//! - [`fetcher`]: [`PageFetcher`], origin-relative fetching through the cache
//! - [`pool`]: [`WorkerPool`], bounded order-preserving concurrent map
//! - [`index`]: [`IndexWalker`], paginated category index traversal
//! - [`band`] / [`members`]: band entries and member extraction

pub mod band;
pub mod cache;
pub mod fetcher;
pub mod index;
pub mod members;
pub mod pool;

pub use band::{BandBuilder, BandEntry, strip_members_suffix};
pub use cache::{PageCache, cache_key};
pub use fetcher::PageFetcher;
pub use index::{IndexPage, IndexWalk, IndexWalker, parse_index_page};
pub use members::{
    ListingLayout, MemberExtractor, MemberLink, MemberListing, MemberPage, parse_member_listing,
    parse_member_page,
};
pub use pool::WorkerPool;
