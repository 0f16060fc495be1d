//! URL handling module for Trawl
//!
//! This module provides URL canonicalization, relative reference resolution,
//! include/exclude filtering, and allowed-domain matching.
//!
//! Deduplication and the page budget are keyed on the canonical form of the
//! URL that was *requested*. When a fetch is redirected, the final URL is
//! recorded on the page and also marked as visited so it is not fetched a
//! second time, but it does not consume budget.

mod domain;
mod filter;
mod matcher;
mod normalize;

// Re-export main functions
pub use domain::{host_key, robots_url};
pub use filter::{passes_filters, UrlFilter};
pub use matcher::matches_wildcard;
pub use normalize::{normalize_url, resolve_url};
