//! Breadth-first site crawler.
//!
//! Fetches pages from a seed URL with a pool of bounded-concurrency
//! workers draining a shared frontier queue. A visited set of
//! normalized URLs enforces at-most-once fetch per URL, and a
//! semaphore of `max_pages` permits makes the page cap a hard
//! guarantee: a permit is consumed permanently on each successful
//! fetch, so the (max_pages+1)-th fetch is never issued.
//!
//! Failures are isolated per page: transient fetch errors are
//! retried with exponential backoff and then skipped, content
//! errors (non-HTML, empty extraction) are logged and skipped, and
//! a partially-completed crawl yields whatever pages were fetched.

pub mod extract;
pub mod normalize;

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{Mutex as AsyncMutex, Semaphore};

use crate::core::config::CrawlConfig;
use crate::core::error::{Result, SiteragError};
use crate::core::types::{CrawlStats, Page};

use extract::extract_page;
use normalize::{normalize_url, resolve_link, same_site};

/// Breadth-first crawler over a single site.
pub struct Crawler {
    client: reqwest::Client,
    config: CrawlConfig,
}

/// State shared by all fetch workers.
struct CrawlShared {
    seed: String,
    config: CrawlConfig,

    /// FIFO frontier of (normalized url, depth)
    frontier: Mutex<VecDeque<(String, usize)>>,

    /// Normalized URLs ever enqueued; checked-and-inserted
    /// atomically under one lock so two workers can never fetch the
    /// same URL
    visited: Mutex<HashSet<String>>,

    /// URLs enqueued but not yet fully processed
    outstanding: AtomicUsize,

    /// One permit per allowed successful fetch; forgotten on success
    budget: Semaphore,

    /// Successful fetches so far
    successes: AtomicUsize,

    /// Completed pages with their completion order
    pages: Mutex<Vec<(usize, Page)>>,
    completion: AtomicUsize,

    /// Politeness gate: next allowed request time for the crawled
    /// host (single-site crawl, so one host)
    next_slot: AsyncMutex<Option<Instant>>,
}

impl Crawler {
    /// Create a crawler from configuration.
    pub fn new(config: CrawlConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_sec))
            .user_agent(concat!("siterag/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SiteragError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Crawl breadth-first from `seed_url`.
    ///
    /// Halts when the frontier empties or `max_pages` pages with
    /// non-empty content have been fetched. Returns the fetched
    /// pages in breadth-first completion order.
    pub async fn crawl(&self, seed_url: &str) -> Result<(Vec<Page>, CrawlStats)> {
        let start = Instant::now();

        let seed = normalize_url(seed_url).ok_or_else(|| {
            SiteragError::Config(format!("Seed is not a valid http(s) URL: {seed_url}"))
        })?;

        let shared = Arc::new(CrawlShared {
            seed: seed.clone(),
            config: self.config.clone(),
            frontier: Mutex::new(VecDeque::from([(seed.clone(), 0)])),
            visited: Mutex::new(HashSet::from([seed])),
            outstanding: AtomicUsize::new(1),
            budget: Semaphore::new(self.config.max_pages),
            successes: AtomicUsize::new(0),
            pages: Mutex::new(Vec::new()),
            completion: AtomicUsize::new(0),
            next_slot: AsyncMutex::new(None),
        });

        let workers: Vec<_> = (0..self.config.concurrency)
            .map(|id| {
                let shared = Arc::clone(&shared);
                let client = self.client.clone();
                tokio::spawn(worker_loop(id, shared, client))
            })
            .collect();

        for worker in workers {
            // A panicking worker is a bug; surface it as a fetch error
            // rather than poisoning the whole process.
            if let Err(e) = worker.await {
                tracing::error!("Crawl worker panicked: {e}");
            }
        }

        let mut ordered = {
            let mut pages = shared.pages.lock().expect("pages lock");
            std::mem::take(&mut *pages)
        };
        ordered.sort_by_key(|(order, _)| *order);

        let urls_visited = shared.visited.lock().expect("visited lock").len();
        let pages: Vec<Page> = ordered.into_iter().map(|(_, page)| page).collect();

        let stats = CrawlStats {
            pages_fetched: pages.len(),
            urls_visited,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        tracing::info!(
            "Crawl complete: {} pages from {} visited URLs in {}ms",
            stats.pages_fetched,
            stats.urls_visited,
            stats.duration_ms
        );

        Ok((pages, stats))
    }
}

/// One fetch worker: drain the frontier until it is exhausted or
/// the page budget closes.
async fn worker_loop(id: usize, shared: Arc<CrawlShared>, client: reqwest::Client) {
    loop {
        let next = {
            let mut frontier = shared.frontier.lock().expect("frontier lock");
            frontier.pop_front()
        };

        let (url, depth) = match next {
            Some(item) => item,
            None => {
                if shared.outstanding.load(Ordering::Acquire) == 0 || shared.budget.is_closed() {
                    break;
                }
                // Another worker may still discover links.
                tokio::time::sleep(Duration::from_millis(10)).await;
                continue;
            }
        };

        // Reserve a success slot before issuing the fetch. Waiting
        // here (instead of try_acquire) lets a slot freed by a
        // failing in-flight fetch be reused.
        let permit = match shared.budget.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                // Budget closed: cap reached, abandon remaining work.
                shared.outstanding.fetch_sub(1, Ordering::AcqRel);
                break;
            }
        };

        match process_url(&shared, &client, &url, depth).await {
            Ok(()) => {
                permit.forget();
                let done = shared.successes.fetch_add(1, Ordering::AcqRel) + 1;
                if done >= shared.config.max_pages {
                    shared.budget.close();
                }
            }
            Err(e) => {
                if e.is_transient() {
                    tracing::warn!("Skipping {url}: {e}");
                } else {
                    tracing::debug!("Skipping {url}: {e}");
                }
                drop(permit);
            }
        }

        shared.outstanding.fetch_sub(1, Ordering::AcqRel);
    }

    tracing::debug!("Crawl worker {id} finished");
}

/// Fetch one URL, extract its content and enqueue discovered links.
///
/// `Ok` means a page with non-empty content was stored and counts
/// against the page budget; skipped pages surface as errors the
/// caller logs and isolates.
async fn process_url(
    shared: &CrawlShared,
    client: &reqwest::Client,
    url: &str,
    depth: usize,
) -> Result<()> {
    tracing::debug!("Fetching {url} (depth {depth})");

    let html = fetch_with_retry(shared, client, url).await?;
    let extracted = extract_page(&html);

    // Discover links before the empty-content check: a hub page with
    // no body text of its own still leads to content pages.
    if depth < shared.config.max_depth && !shared.budget.is_closed() {
        enqueue_links(shared, url, &extracted.hrefs, depth + 1);
    }

    if extracted.text.is_empty() {
        return Err(SiteragError::Content(format!("Empty extracted text: {url}")));
    }

    let page = Page {
        url: url.to_string(),
        title: extracted.title,
        text: extracted.text,
        fetched_at: Utc::now(),
    };

    tracing::info!("Fetched {url} ({} chars)", page.text.len());

    let order = shared.completion.fetch_add(1, Ordering::AcqRel);
    shared.pages.lock().expect("pages lock").push((order, page));

    Ok(())
}

/// Normalize, filter and enqueue same-site links not yet visited.
fn enqueue_links(shared: &CrawlShared, base: &str, hrefs: &[String], depth: usize) {
    let mut enqueued = 0usize;
    for href in hrefs {
        if enqueued >= shared.config.max_links_per_page {
            break;
        }

        let Some(link) = resolve_link(base, href) else {
            continue;
        };
        if !same_site(&shared.seed, &link) {
            continue;
        }

        // Atomic test-and-set: insert returns false when another
        // worker already claimed this URL.
        let fresh = shared.visited.lock().expect("visited lock").insert(link.clone());
        if !fresh {
            continue;
        }

        shared.outstanding.fetch_add(1, Ordering::AcqRel);
        shared
            .frontier
            .lock()
            .expect("frontier lock")
            .push_back((link, depth));
        enqueued += 1;
    }
}

/// Fetch a URL with a politeness delay, a bounded timeout and
/// exponential-backoff retries for transient failures.
async fn fetch_with_retry(
    shared: &CrawlShared,
    client: &reqwest::Client,
    url: &str,
) -> Result<String> {
    let mut attempt = 0usize;

    loop {
        politeness_wait(shared).await;

        let outcome = client.get(url).send().await;
        match outcome {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    return resp
                        .text()
                        .await
                        .map_err(|e| SiteragError::Fetch(format!("Reading {url}: {e}")));
                }

                let retryable = status.as_u16() == 429 || status.is_server_error();
                if retryable && attempt + 1 < shared.config.max_retries {
                    attempt += 1;
                    tokio::time::sleep(retry_backoff(attempt)).await;
                    continue;
                }

                if status.is_client_error() {
                    return Err(SiteragError::Content(format!("{status} for {url}")));
                }
                return Err(SiteragError::Fetch(format!("{status} for {url}")));
            }
            Err(err) => {
                let retryable = err.is_timeout() || err.is_connect() || err.is_request();
                if retryable && attempt + 1 < shared.config.max_retries {
                    attempt += 1;
                    tokio::time::sleep(retry_backoff(attempt)).await;
                    continue;
                }
                return Err(SiteragError::Fetch(format!("Fetching {url}: {err}")));
            }
        }
    }
}

/// Reserve the next politeness slot for the crawled host and sleep
/// until it arrives.
async fn politeness_wait(shared: &CrawlShared) {
    let delay = Duration::from_millis(shared.config.politeness_ms);
    if delay.is_zero() {
        return;
    }

    let wait = {
        let mut slot = shared.next_slot.lock().await;
        let now = Instant::now();
        let start = match *slot {
            Some(at) if at > now => at,
            _ => now,
        };
        *slot = Some(start + delay);
        start.saturating_duration_since(now)
    };

    if !wait.is_zero() {
        tokio::time::sleep(wait).await;
    }
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(500 * (1 << capped))
}
