// src/checker/http.rs
// =============================================================================
// This module checks URLs by making HTTP requests.
//
// Key functionality:
// - HEAD first (lightweight, no body download), GET if HEAD gets >= 400
// - Redirects are followed hop by hop so we can record the whole chain
// - Transport failures are retried with exponential backoff + jitter
// - 403/404 responses can be retried with an alternate browser identity
// - 200 HTML responses are inspected for "soft 404" error pages
// - Every URL runs in its own task; a semaphore caps how many are probing
//   at once
//
// Guarantees:
// - check_all returns exactly one CheckResult per input URL
// - Attempts for the same URL never overlap
//
// Rust concepts:
// - tokio::spawn + Arc: Sharing one client between many tasks
// - Semaphore: A counting gate for concurrency
// - FuturesUnordered: Handling tasks in the order they finish
// - Option<T>: The alternate-identity probe may simply produce nothing
// =============================================================================

use super::errors::{ErrorKind, ProbeError};
use super::result::CheckResult;
use super::settings::CheckSettings;
use super::soft404::{self, SNIPPET_LIMIT};
use crate::headers::{build_headers, to_header_map, Identity};
use futures::stream::{FuturesUnordered, StreamExt};
use rand::Rng;
use reqwest::header::{HeaderMap, CONTENT_TYPE, LOCATION};
use reqwest::{Client, Method, Response};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Receives `(completed, total)` every time a URL finishes.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

// Same hop limit reqwest uses by default
const MAX_REDIRECTS: usize = 10;

const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(500);
const MAX_JITTER_MS: u64 = 300;

/// What one HEAD/GET probe observed.
#[derive(Debug, Clone)]
pub struct Probe {
    /// Status of every response in order; the last one is final
    pub statuses: Vec<u16>,
    pub final_url: String,
    /// Method of the request that produced the final response
    pub method: Method,
    pub soft_404: bool,
}

impl Probe {
    pub fn first_status(&self) -> u16 {
        self.statuses.first().copied().unwrap_or_default()
    }

    pub fn final_status(&self) -> u16 {
        self.statuses.last().copied().unwrap_or_default()
    }

    pub fn redirect_count(&self) -> usize {
        self.statuses.len().saturating_sub(1)
    }

    /// The chain as a string like "301→302→200".
    pub fn chain(&self) -> String {
        self.statuses
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join("→")
    }
}

/// Checks URLs with one shared HTTP client.
///
/// Cheap to clone; clones share the client and settings.
#[derive(Clone)]
pub struct UrlChecker {
    inner: Arc<Inner>,
}

#[derive(Clone)]
struct Inner {
    client: Client,
    settings: CheckSettings,
    primary_headers: HeaderMap,
    alternate: Identity,
    alternate_headers: HeaderMap,
    backoff_base: Duration,
}

impl UrlChecker {
    pub fn new(settings: CheckSettings) -> Result<Self, reqwest::Error> {
        // Redirects are followed by hand in send_following()
        let client = Client::builder()
            .timeout(settings.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .pool_max_idle_per_host(settings.concurrency.max(1))
            .build()?;

        let alternate = Identity::alternate_for(&settings.identity);

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                primary_headers: to_header_map(&build_headers(&settings.identity.user_agent)),
                alternate_headers: to_header_map(&build_headers(&alternate.user_agent)),
                alternate,
                settings,
                backoff_base: DEFAULT_BACKOFF_BASE,
            }),
        })
    }

    /// Overrides the base interval of the retry backoff.
    #[cfg(test)]
    pub fn with_backoff_base(self, base: Duration) -> Self {
        let mut inner = Arc::try_unwrap(self.inner).unwrap_or_else(|shared| (*shared).clone());
        inner.backoff_base = base;
        Self {
            inner: Arc::new(inner),
        }
    }

    // Checks every URL concurrently
    //
    // Each URL becomes its own task. The semaphore lets at most
    // `settings.concurrency` of them probe at any moment; the rest wait for a
    // slot. Results come back in completion order, not input order.
    pub async fn check_all(&self, urls: Vec<String>, progress: Option<ProgressCallback>) -> Vec<CheckResult> {
        let total = urls.len();
        let concurrency = self.inner.settings.concurrency.max(1);
        info!("Checking {} URL(s) with concurrency {}", total, concurrency);

        let semaphore = Arc::new(Semaphore::new(concurrency));

        let tasks: Vec<_> = urls
            .into_iter()
            .map(|url| {
                let inner = self.inner.clone();
                let semaphore = semaphore.clone();
                let task_url = url.clone();
                (url, tokio::spawn(async move { inner.check_one(task_url, semaphore).await }))
            })
            .collect();

        let results = collect_results(tasks, progress, &self.inner.settings.identity.label).await;

        info!("Finished checking {} URL(s)", results.len());
        results
    }

    /// Checks a single URL outside of any batch.
    #[cfg(test)]
    pub async fn check_one(&self, url: &str) -> CheckResult {
        self.inner
            .check_one(url.to_string(), Arc::new(Semaphore::new(1)))
            .await
    }
}

impl Inner {
    async fn check_one(&self, url: String, semaphore: Arc<Semaphore>) -> CheckResult {
        // The semaphore is never closed, so acquire can't fail in practice
        let _permit = semaphore.acquire_owned().await.ok();

        let settings = &self.settings;
        let attempts = settings.retries + 1;
        let mut last_error = ErrorKind::Other("unknown".to_string());
        let mut elapsed_ms = 0.0;

        for attempt in 0..attempts {
            let start = Instant::now();
            match self.probe(&url, &self.primary_headers).await {
                Ok(probe) => {
                    let mut result = CheckResult::new(url.as_str());
                    result.response_time_ms = millis_since(start);
                    result.record_probe(&probe, &settings.identity.label);

                    if settings.alternate_identity_retry && matches!(probe.final_status(), 403 | 404) {
                        if let Some(alt) = self.alternate_probe(&url).await {
                            result.record_alternate(&alt, &self.alternate.label);
                        }
                    }

                    debug!(
                        "{} -> {} via {} ({:.0} ms)",
                        url, result.final_status_code, result.method_used, result.response_time_ms
                    );
                    return result;
                }
                Err(e) => {
                    elapsed_ms = millis_since(start);
                    last_error = e.kind();
                    debug!(
                        "Attempt {}/{} for {} failed ({}): {}",
                        attempt + 1,
                        attempts,
                        url,
                        last_error,
                        e
                    );
                    if attempt + 1 < attempts {
                        tokio::time::sleep(backoff_delay(self.backoff_base, attempt)).await;
                    }
                }
            }
        }

        CheckResult::failed(url, &last_error, elapsed_ms, &settings.identity.label)
    }

    // Best-effort retry with the alternate identity. Any failure just means
    // "no alternate result".
    async fn alternate_probe(&self, url: &str) -> Option<Probe> {
        match self.probe(url, &self.alternate_headers).await {
            Ok(probe) => Some(probe),
            Err(e) => {
                debug!("Alternate identity probe for {} failed: {}", url, e);
                None
            }
        }
    }

    // One HEAD -> GET probe
    async fn probe(&self, url: &str, headers: &HeaderMap) -> Result<Probe, ProbeError> {
        if self.settings.head_then_get {
            let (statuses, response) = self.send_following(Method::HEAD, url, headers).await?;
            if response.status().as_u16() < 400 {
                return Ok(Probe {
                    statuses,
                    final_url: response.url().to_string(),
                    method: Method::HEAD,
                    soft_404: false,
                });
            }
        }

        let (statuses, response) = self.send_following(Method::GET, url, headers).await?;
        let final_url = response.url().to_string();
        let soft_404 = if response.status().as_u16() == 200 {
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            if soft404::is_html(&content_type) {
                let snippet = read_snippet(response, SNIPPET_LIMIT).await?;
                soft404::looks_like_soft_404(&content_type, &snippet)
            } else {
                false
            }
        } else {
            false
        };

        Ok(Probe {
            statuses,
            final_url,
            method: Method::GET,
            soft_404,
        })
    }

    // Sends a request and, if enabled, follows redirects manually
    //
    // Returns: every status seen (first hop first) and the final response
    async fn send_following(
        &self,
        method: Method,
        url: &str,
        headers: &HeaderMap,
    ) -> Result<(Vec<u16>, Response), ProbeError> {
        let mut statuses = Vec::new();
        let mut target = url.to_string();

        loop {
            let response = self
                .client
                .request(method.clone(), &target)
                .headers(headers.clone())
                .send()
                .await?;
            let status = response.status();
            statuses.push(status.as_u16());

            if !self.settings.follow_redirects || !status.is_redirection() {
                return Ok((statuses, response));
            }

            let next: Option<url::Url> = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|location| response.url().join(location).ok());

            match next {
                // A redirect without a usable Location is as final as it gets
                None => return Ok((statuses, response)),
                Some(_) if statuses.len() > MAX_REDIRECTS => return Err(ProbeError::TooManyRedirects),
                Some(next) => target = next.to_string(),
            }
        }
    }
}

// Waits for every task, in completion order, ticking progress once per URL
//
// A panicked task still owes us a result for its URL, so a JoinError
// becomes an "ERROR (task)" row and counts as completed like any other.
async fn collect_results(
    tasks: Vec<(String, JoinHandle<CheckResult>)>,
    progress: Option<ProgressCallback>,
    identity_label: &str,
) -> Vec<CheckResult> {
    let total = tasks.len();

    let mut pending: FuturesUnordered<_> = tasks
        .into_iter()
        .map(|(url, handle)| async move { (url, handle.await) })
        .collect();

    let mut results = Vec::with_capacity(total);
    while let Some((url, joined)) = pending.next().await {
        let result = match joined {
            Ok(result) => result,
            Err(e) => {
                warn!("Check task for {} failed: {}", url, e);
                CheckResult::failed(url, &ErrorKind::Other("task".to_string()), 0.0, identity_label)
            }
        };
        results.push(result);

        if let Some(callback) = &progress {
            callback(results.len(), total);
        }
    }
    results
}

// Reads at most `limit` bytes of the body
async fn read_snippet(mut response: Response, limit: usize) -> Result<Vec<u8>, reqwest::Error> {
    let mut snippet = Vec::with_capacity(limit);
    while snippet.len() < limit {
        match response.chunk().await? {
            Some(chunk) => {
                let take = (limit - snippet.len()).min(chunk.len());
                snippet.extend_from_slice(&chunk[..take]);
            }
            None => break,
        }
    }
    Ok(snippet)
}

// base * 2^attempt plus up to MAX_JITTER_MS of random jitter
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let jitter = rand::thread_rng().gen_range(0..=MAX_JITTER_MS);
    base * 2u32.saturating_pow(attempt) + Duration::from_millis(jitter)
}

fn millis_since(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Checks every URL with a freshly built client.
pub async fn check_all(
    urls: Vec<String>,
    settings: &CheckSettings,
    progress: Option<ProgressCallback>,
) -> Result<Vec<CheckResult>, reqwest::Error> {
    let checker = UrlChecker::new(settings.clone())?;
    Ok(checker.check_all(urls, progress).await)
}
