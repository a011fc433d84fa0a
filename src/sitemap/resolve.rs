// src/sitemap/resolve.rs
// =============================================================================
// This module resolves a sitemap source into the list of page URLs it
// declares, following <sitemapindex> documents recursively.
//
// How it works:
// 1. Get the bytes: either given directly, or fetched from a URL
// 2. Decompress + parse them (see parse.rs)
// 3. For a <urlset>: collect every <loc>
//    For a <sitemapindex>: resolve each child sitemap and merge its URLs
//
// Two things keep the recursion finite:
// - A depth bound (MAX_DEPTH) passed explicitly to every recursive call
// - A visited set, so a sitemap URL is never fetched twice in one run
//   (this is what stops self-referencing or looping indexes)
//
// Output order is depth-first, children in document order, and a URL only
// appears the first time it is seen.
//
// Rust concepts:
// - Recursive async functions: Need Box::pin because a future can't contain
//   itself
// - &mut borrows: The ResolveContext is threaded through every call
// - Arc<dyn Fn>: A shareable callback for status messages
// =============================================================================

use super::parse::{decompress_if_gzip, parse_document, RootKind};
use super::SitemapError;
use crate::headers::{build_headers, to_header_map, Identity};
use reqwest::header::HeaderMap;
use reqwest::Client;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How many levels of nested sitemap indexes are followed.
pub const MAX_DEPTH: usize = 3;

// Timeout for fetching a single sitemap document
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Receives free-text status messages while a sitemap is being resolved.
pub type StatusCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Where a sitemap document comes from.
#[derive(Debug, Clone)]
pub enum SitemapSource {
    /// Raw document bytes (plain XML or gzip)
    Bytes(Vec<u8>),
    /// A URL to fetch
    Url(String),
}

/// Per-run traversal state: the sitemap URLs already fetched.
#[derive(Debug, Default)]
pub struct ResolveContext {
    visited: HashSet<String>,
}

impl ResolveContext {
    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    // Returns false if the URL was already visited
    fn mark_visited(&mut self, url: &str) -> bool {
        self.visited.insert(url.to_string())
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}

type NodeFuture<'a> = Pin<Box<dyn Future<Output = Vec<String>> + Send + 'a>>;

/// Fetches and flattens sitemap trees.
pub struct SitemapResolver {
    client: Client,
    headers: HeaderMap,
    status_callback: Option<StatusCallback>,
}

impl SitemapResolver {
    /// Creates a resolver whose requests present `identity`.
    pub fn new(identity: &Identity) -> Result<Self, SitemapError> {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(SitemapError::Client)?;

        Ok(Self {
            client,
            headers: to_header_map(&build_headers(&identity.user_agent)),
            status_callback: None,
        })
    }

    pub fn with_status_callback(mut self, callback: StatusCallback) -> Self {
        self.status_callback = Some(callback);
        self
    }

    /// Resolves `source` into an ordered, duplicate-free URL list.
    pub async fn resolve(&self, source: SitemapSource) -> Vec<String> {
        let mut ctx = ResolveContext::default();
        let urls = self.resolve_with(source, &mut ctx).await;
        info!(
            "Resolved {} unique URL(s) from {} fetched sitemap(s)",
            urls.len(),
            ctx.visited_count()
        );
        urls
    }

    /// Like [`resolve`](Self::resolve), but with a caller-owned context.
    pub async fn resolve_with(&self, source: SitemapSource, ctx: &mut ResolveContext) -> Vec<String> {
        self.resolve_node(source, ctx, 0).await
    }

    // Resolves one node of the sitemap tree
    //
    // Parameters:
    //   source: bytes or URL for this node
    //   ctx: the run's visited set (shared with every other node)
    //   depth: 0 for the top-level document, +1 per index level
    fn resolve_node<'a>(
        &'a self,
        source: SitemapSource,
        ctx: &'a mut ResolveContext,
        depth: usize,
    ) -> NodeFuture<'a> {
        Box::pin(async move {
            let raw = match source {
                SitemapSource::Bytes(bytes) => bytes,
                SitemapSource::Url(url) => {
                    let url = url.trim().to_string();
                    // Cycle guard
                    if !ctx.mark_visited(&url) {
                        debug!("Skipping already visited sitemap {}", url);
                        return Vec::new();
                    }
                    self.report(&format!("Fetching {}", url));
                    match self.fetch(&url).await {
                        Ok(bytes) => bytes,
                        Err(e) => {
                            self.report_failure(&e);
                            return Vec::new();
                        }
                    }
                }
            };

            let document = match decompress_if_gzip(raw).and_then(|data| parse_document(&data)) {
                Ok(document) => document,
                Err(e) => {
                    self.report_failure(&e);
                    return Vec::new();
                }
            };

            match document.kind {
                RootKind::SitemapIndex => {
                    let mut urls = Vec::new();
                    let mut seen = HashSet::new();

                    for child in document.locations {
                        if depth + 1 > MAX_DEPTH {
                            debug!("Depth limit reached, not following {}", child);
                            continue;
                        }
                        if ctx.is_visited(&child) {
                            continue;
                        }

                        let child_urls = self
                            .resolve_node(SitemapSource::Url(child), ctx, depth + 1)
                            .await;
                        for url in child_urls {
                            if seen.insert(url.clone()) {
                                urls.push(url);
                            }
                        }
                    }

                    urls
                }
                RootKind::UrlSet => {
                    let mut seen = HashSet::new();
                    document
                        .locations
                        .into_iter()
                        .filter(|loc| seen.insert(loc.clone()))
                        .collect()
                }
                RootKind::Unrecognized(tag) => {
                    self.report(&format!("Unknown root element: <{}>", tag));
                    Vec::new()
                }
            }
        })
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, SitemapError> {
        let response = self
            .client
            .get(url)
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(|source| SitemapError::Fetch {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SitemapError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|source| SitemapError::Fetch {
            url: url.to_string(),
            source,
        })?;
        Ok(bytes.to_vec())
    }

    fn report(&self, message: &str) {
        debug!("{}", message);
        if let Some(callback) = &self.status_callback {
            callback(message);
        }
    }

    fn report_failure(&self, error: &SitemapError) {
        warn!("{}", error);
        if let Some(callback) = &self.status_callback {
            callback(&error.to_string());
        }
    }
}
