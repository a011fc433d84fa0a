// src/sitemap/mod.rs
// =============================================================================
// This module turns a sitemap (or a tree of sitemap indexes) into a flat,
// de-duplicated list of page URLs.
//
// Submodules:
// - parse: Decompresses and parses one XML payload into a SitemapDocument
// - resolve: Fetches sitemaps and recurses through <sitemapindex> documents
//
// Failures here are never fatal: a sitemap that can't be fetched or parsed
// simply contributes zero URLs, and the problem is reported as a status
// message.
//
// Rust concepts:
// - thiserror: Derives std::error::Error and Display for our error enum
// - pub use: Re-exporting the public API of the submodules
// =============================================================================

mod parse;
mod resolve;

use thiserror::Error;

pub use resolve::{SitemapResolver, SitemapSource, StatusCallback};

/// Everything that can go wrong while resolving a single sitemap node.
#[derive(Error, Debug)]
pub enum SitemapError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to fetch {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("gzip decompression failed: {0}")]
    Decompress(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    Parse(String),

    #[error("XML parse returned empty document - check the sitemap source")]
    EmptyDocument,
}
