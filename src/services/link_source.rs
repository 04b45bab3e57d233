//! Link sources: where pages, their outbound links and their tags come from.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::config::LinkSourceConfig;
use super::error::FetchError;
use crate::models::canonicalize;

/// Canonical-title prefix of listing pages, which are never walked into.
pub const LISTING_PREFIX: &str = "List_of_";

/// Tag prefixes that mark administrative or maintenance categories.
pub const GENERIC_TAG_PREFIXES: &[&str] = &[
    "Article ",
    "Articles ",
    "Use ",
    "Pages ",
    "CS1 ",
    "Good articles",
    "Wikipedia ",
];

/// Short description of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSummary {
    /// Plain-text extract
    pub text: String,

    /// Canonical page URL, when the source reports one
    pub canonical_url: Option<String>,
}

/// Whether a tag is administrative noise rather than content.
pub fn is_generic_tag(name: &str) -> bool {
    GENERIC_TAG_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

/// Whether a canonical title names a listing page.
pub fn is_listing_title(id: &str) -> bool {
    id.starts_with(LISTING_PREFIX)
}

/// Canonicalizes, drops listings and empties, de-duplicates keeping first
/// occurrence, and stops at `cap` entries.
pub fn filter_links<I, S>(raw: I, cap: usize) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for title in raw {
        if links.len() >= cap {
            break;
        }
        let id = canonicalize(title.as_ref());
        if id.is_empty() || is_listing_title(&id) {
            continue;
        }
        if seen.insert(id.clone()) {
            links.push(id);
        }
    }

    links
}

/// Strips the `Category:` prefix, drops generic tags and de-duplicates, up to `cap`.
pub fn filter_tags<I, S>(raw: I, cap: usize) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut tags = Vec::new();

    for name in raw {
        if tags.len() >= cap {
            break;
        }
        let name = name.as_ref();
        let name = name.strip_prefix("Category:").unwrap_or(name).trim();
        if name.is_empty() || is_generic_tag(name) {
            continue;
        }
        if seen.insert(name.to_string()) {
            tags.push(name.to_string());
        }
    }

    tags
}

/// Logical contract of the external page graph.
#[async_trait]
pub trait LinkSource: Send + Sync {
    /// Content tags of a page.
    async fn resolve_tags(&self, title: &str) -> Result<Vec<String>, FetchError>;

    /// Canonical titles the page links to.
    async fn resolve_links(&self, title: &str) -> Result<Vec<String>, FetchError>;

    /// Page summary. Absence or failure is not an error.
    async fn resolve_summary(&self, title: &str) -> Option<PageSummary>;

    /// URL to use for a page when the summary has none.
    fn page_url(&self, id: &str) -> String;

    /// Gets the provider name.
    fn provider_name(&self) -> &str;
}

// =============================================================================
// Mock Provider
// =============================================================================

/// Page data served by [`MockLinkSource`].
#[derive(Debug, Clone, Default)]
pub struct MockPage {
    pub links: Vec<String>,
    pub tags: Vec<String>,
    pub summary: Option<String>,
}

/// Per-method call counters of a [`MockLinkSource`].
#[derive(Debug, Default)]
pub struct FetchCounters {
    pub tags: AtomicUsize,
    pub links: AtomicUsize,
    pub summaries: AtomicUsize,
}

/// In-memory link source for tests and offline runs.
///
/// Unknown titles resolve to a page with no links and no tags.
pub struct MockLinkSource {
    pages: HashMap<String, MockPage>,
    failing: HashSet<String>,
    fail_all: AtomicBool,
    latency: Duration,
    counters: FetchCounters,
    tag_calls: Mutex<HashMap<String, usize>>,
    page_base: String,
}

impl MockLinkSource {
    /// Creates an empty mock source.
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            failing: HashSet::new(),
            fail_all: AtomicBool::new(false),
            latency: Duration::ZERO,
            counters: FetchCounters::default(),
            tag_calls: Mutex::new(HashMap::new()),
            page_base: "https://mock.invalid/wiki/".to_string(),
        }
    }

    /// Small connected demo graph used by the `mock` provider.
    pub fn demo() -> Self {
        Self::new()
            .with_page("Rust", &["Ferris", "Cargo", "LLVM"], &["Programming languages", "Mozilla"])
            .with_page("Ferris", &["Rust", "Crab"], &["Mascots", "Crustaceans"])
            .with_page("Crab", &["Ferris", "Crustacean"], &["Crustaceans"])
            .with_page("Crustacean", &["Crab", "Lobster"], &["Crustaceans", "Arthropods"])
            .with_page("Lobster", &["Crustacean"], &["Crustaceans", "Seafood"])
            .with_page("Cargo", &["Rust", "Package manager"], &["Programming languages"])
            .with_page("Package manager", &["Cargo"], &["Software"])
            .with_page("LLVM", &["Rust", "Compiler"], &["Compilers", "Software"])
            .with_page("Compiler", &["LLVM"], &["Compilers"])
    }

    /// Builder: add a page with links and tags.
    pub fn with_page(mut self, title: &str, links: &[&str], tags: &[&str]) -> Self {
        self.pages.insert(
            canonicalize(title),
            MockPage {
                links: links.iter().map(|s| s.to_string()).collect(),
                tags: tags.iter().map(|s| s.to_string()).collect(),
                summary: Some(format!("Summary of {}.", title)),
            },
        );
        self
    }

    /// Builder: add a page without a summary.
    pub fn with_page_without_summary(mut self, title: &str, links: &[&str], tags: &[&str]) -> Self {
        self = self.with_page(title, links, tags);
        if let Some(page) = self.pages.get_mut(&canonicalize(title)) {
            page.summary = None;
        }
        self
    }

    /// Builder: make every tag/link request for this title fail.
    pub fn with_failing_title(mut self, title: &str) -> Self {
        self.failing.insert(canonicalize(title));
        self
    }

    /// Builder: simulated latency per request.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Makes all subsequent requests fail (or succeed again).
    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Call counters.
    pub fn counters(&self) -> &FetchCounters {
        &self.counters
    }

    /// Number of tag resolutions issued for one title.
    pub fn tag_calls_for(&self, title: &str) -> usize {
        self.tag_calls
            .lock()
            .map(|calls| calls.get(&canonicalize(title)).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn check_failure(&self, id: &str) -> Result<(), FetchError> {
        if self.fail_all.load(Ordering::SeqCst) || self.failing.contains(id) {
            return Err(FetchError::Transport(format!(
                "Mock link source configured to fail for {}",
                id
            )));
        }
        Ok(())
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl Default for MockLinkSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkSource for MockLinkSource {
    async fn resolve_tags(&self, title: &str) -> Result<Vec<String>, FetchError> {
        let id = canonicalize(title);
        self.counters.tags.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut calls) = self.tag_calls.lock() {
            *calls.entry(id.clone()).or_default() += 1;
        }

        self.simulate_latency().await;
        self.check_failure(&id)?;

        let raw = self.pages.get(&id).map(|p| p.tags.clone()).unwrap_or_default();
        Ok(filter_tags(raw, usize::MAX))
    }

    async fn resolve_links(&self, title: &str) -> Result<Vec<String>, FetchError> {
        let id = canonicalize(title);
        self.counters.links.fetch_add(1, Ordering::SeqCst);

        self.simulate_latency().await;
        self.check_failure(&id)?;

        let raw = self.pages.get(&id).map(|p| p.links.clone()).unwrap_or_default();
        Ok(filter_links(raw, usize::MAX))
    }

    async fn resolve_summary(&self, title: &str) -> Option<PageSummary> {
        let id = canonicalize(title);
        self.counters.summaries.fetch_add(1, Ordering::SeqCst);

        self.simulate_latency().await;

        let page = self.pages.get(&id)?;
        page.summary.as_ref().map(|text| PageSummary {
            text: text.clone(),
            canonical_url: None,
        })
    }

    fn page_url(&self, id: &str) -> String {
        format!("{}{}", self.page_base, urlencoding::encode(id))
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}

// =============================================================================
// Wikipedia Provider
// =============================================================================

/// MediaWiki action API response envelope.
#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    query: Option<QueryBody>,
    #[serde(default, rename = "continue")]
    continuation: Option<Continuation>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct QueryBody {
    #[serde(default)]
    pages: HashMap<String, QueryPage>,
}

#[derive(Debug, Deserialize)]
struct QueryPage {
    #[serde(default)]
    links: Vec<TitleEntry>,
    #[serde(default)]
    categories: Vec<TitleEntry>,
}

#[derive(Debug, Deserialize)]
struct TitleEntry {
    title: String,
}

#[derive(Debug, Default, Deserialize)]
struct Continuation {
    #[serde(default)]
    plcontinue: Option<String>,
    #[serde(default)]
    clcontinue: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    info: Option<String>,
}

/// REST summary endpoint response.
#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    #[serde(default)]
    desktop: Option<PageUrl>,
}

#[derive(Debug, Deserialize)]
struct PageUrl {
    #[serde(default)]
    page: Option<String>,
}

/// Which paginated `prop` a query walks.
#[derive(Debug, Clone, Copy)]
enum QueryProp {
    Links,
    Categories,
}

impl QueryProp {
    /// Applies the filter matching this prop, keeping at most `cap` entries.
    fn filter(self, raw: &[String], cap: usize) -> Vec<String> {
        match self {
            QueryProp::Links => filter_links(raw, cap),
            QueryProp::Categories => filter_tags(raw, cap),
        }
    }
}

/// Link source backed by the Wikipedia APIs.
pub struct WikipediaLinkSource {
    config: LinkSourceConfig,
    client: Client,
}

impl WikipediaLinkSource {
    /// Creates a new Wikipedia provider.
    pub fn new(config: LinkSourceConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Fetches every page of a `prop=links|categories` query until the source
    /// runs out or `cap` filtered titles have been collected.
    async fn paginate(&self, title: &str, prop: QueryProp, cap: usize) -> Result<Vec<String>, FetchError> {
        let mut collected: Vec<String> = Vec::new();
        let mut kept: Vec<String> = Vec::new();
        let mut continue_token: Option<String> = None;

        loop {
            let mut params: Vec<(&str, String)> = vec![
                ("action", "query".to_string()),
                ("format", "json".to_string()),
                ("titles", title.to_string()),
                ("origin", "*".to_string()),
            ];
            match prop {
                QueryProp::Links => {
                    params.push(("prop", "links".to_string()));
                    params.push(("plnamespace", "0".to_string()));
                    params.push(("pllimit", "max".to_string()));
                    if let Some(token) = &continue_token {
                        params.push(("plcontinue", token.clone()));
                    }
                }
                QueryProp::Categories => {
                    params.push(("prop", "categories".to_string()));
                    params.push(("cllimit", "max".to_string()));
                    params.push(("clshow", "!hidden".to_string()));
                    if let Some(token) = &continue_token {
                        params.push(("clcontinue", token.clone()));
                    }
                }
            }

            debug!("Wikipedia {:?} query for '{}' (continue: {:?})", prop, title, continue_token);

            let response = self.client.get(&self.config.api_base).query(&params).send().await?;

            if !response.status().is_success() {
                return Err(FetchError::Status(response.status().as_u16()));
            }

            let body: QueryResponse = response.json().await?;

            if let Some(error) = body.error {
                return Err(FetchError::Api(
                    error
                        .info
                        .unwrap_or_else(|| "Wikipedia API returned an error.".to_string()),
                ));
            }

            let Some(page) = body.query.and_then(|q| q.pages.into_values().next()) else {
                break;
            };

            let entries = match prop {
                QueryProp::Links => page.links,
                QueryProp::Categories => page.categories,
            };
            if entries.is_empty() {
                break;
            }
            collected.extend(entries.into_iter().map(|e| e.title));
            kept = prop.filter(&collected, cap);

            let continuation = body.continuation.unwrap_or_default();
            continue_token = match prop {
                QueryProp::Links => continuation.plcontinue,
                QueryProp::Categories => continuation.clcontinue,
            };

            if continue_token.is_none() || kept.len() >= cap {
                break;
            }
        }

        Ok(kept)
    }
}

#[async_trait]
impl LinkSource for WikipediaLinkSource {
    async fn resolve_tags(&self, title: &str) -> Result<Vec<String>, FetchError> {
        self.paginate(title, QueryProp::Categories, self.config.max_tags)
            .await
    }

    async fn resolve_links(&self, title: &str) -> Result<Vec<String>, FetchError> {
        self.paginate(title, QueryProp::Links, self.config.max_links)
            .await
    }

    async fn resolve_summary(&self, title: &str) -> Option<PageSummary> {
        let url = format!("{}{}", self.config.summary_base, urlencoding::encode(title));

        let response = match self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
        {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                debug!("Summary for '{}' unavailable: {}", title, r.status());
                return None;
            }
            Err(e) => {
                warn!("Summary request failed for '{}': {}", title, e);
                return None;
            }
        };

        match response.json::<SummaryResponse>().await {
            Ok(summary) => summary.extract.map(|text| PageSummary {
                text,
                canonical_url: summary
                    .content_urls
                    .and_then(|urls| urls.desktop)
                    .and_then(|desktop| desktop.page),
            }),
            Err(e) => {
                warn!("Failed to parse summary for '{}': {}", title, e);
                None
            }
        }
    }

    fn page_url(&self, id: &str) -> String {
        format!("{}{}", self.config.page_base, urlencoding::encode(id))
    }

    fn provider_name(&self) -> &str {
        "wikipedia"
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Factory for creating link sources.
pub struct LinkSourceFactory;

impl LinkSourceFactory {
    /// Creates a link source based on configuration.
    pub fn create(config: LinkSourceConfig) -> Result<Arc<dyn LinkSource>, FetchError> {
        match config.provider.as_str() {
            "wikipedia" => Ok(Arc::new(WikipediaLinkSource::new(config)?)),
            "mock" => Ok(Arc::new(MockLinkSource::demo())),
            _ => {
                warn!(
                    "Unknown link source provider '{}', falling back to wikipedia",
                    config.provider
                );
                Ok(Arc::new(WikipediaLinkSource::new(config)?))
            }
        }
    }
}

/// Tags as an ordered set.
pub fn tag_set(tags: Vec<String>) -> BTreeSet<String> {
    tags.into_iter().collect()
}
