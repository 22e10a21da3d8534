//! Company context: a short text description of the hiring company, scraped from
//! its public pages and cached in Redis.
//!
//! The provider never fails towards the pipeline. Any fetch, parse, or cache
//! problem degrades to `None` and generation continues without company context.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::CollaboratorError;

/// Upper bound on the context text handed to prompts.
pub const MAX_CONTEXT_CHARS: usize = 4000;
/// Pages scraped per company.
pub const MAX_COMPANY_URLS: usize = 3;
const CACHE_PREFIX: &str = "company_context";
const SKIP_TAGS: [&str; 6] = ["script", "style", "noscript", "svg", "nav", "footer"];

/// Identifies a company by name and/or the pages describing it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyRef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub urls: Vec<String>,
}

impl CompanyRef {
    /// Cache key: the explicit name if present, else derived from the first URL's host.
    pub fn key(&self) -> Option<String> {
        self.name
            .as_deref()
            .map(|n| n.trim().to_lowercase())
            .filter(|n| !n.is_empty())
            .or_else(|| self.urls.first().and_then(|u| company_key_from_url(u)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyContext {
    pub company: String,
    pub text: String,
    pub sources: Vec<String>,
}

#[async_trait]
pub trait CompanyContextProvider: Send + Sync {
    async fn fetch(&self, company: &CompanyRef) -> Option<CompanyContext>;
}

/// `https://www.refline.io/about` -> `refline`.
pub fn company_key_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url)
        .or_else(|_| Url::parse(&format!("https://{url}")))
        .ok()?;
    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    let label = host.split('.').next()?.trim().to_lowercase();
    (!label.is_empty()).then_some(label)
}

/// The first `MAX_COMPANY_URLS` absolute http(s) URLs. Other schemes and
/// unparsable entries are skipped.
pub fn fetchable_urls(urls: &[String]) -> Vec<Url> {
    urls.iter()
        .filter_map(|raw| Url::parse(raw.trim()).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .take(MAX_COMPANY_URLS)
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// ScrapingContextProvider
// ────────────────────────────────────────────────────────────────────────────

pub struct ScrapingContextProvider {
    http: Client,
    redis: redis::Client,
    cache_ttl: Duration,
}

impl ScrapingContextProvider {
    pub fn new(redis: redis::Client, fetch_timeout: Duration, cache_ttl: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(fetch_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            redis,
            cache_ttl,
        })
    }

    async fn cached(&self, key: &str) -> Result<Option<CompanyContext>, CollaboratorError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        let raw: Option<String> = redis::cmd("GET")
            .arg(cache_key(key))
            .query_async(&mut conn)
            .await?;

        Ok(raw.and_then(|r| serde_json::from_str(&r).ok()))
    }

    async fn store(&self, context: &CompanyContext) -> Result<(), CollaboratorError> {
        let value = serde_json::to_string(context)
            .map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))?;
        let mut conn = self.redis.get_multiplexed_async_connection().await?;
        redis::cmd("SET")
            .arg(cache_key(&context.company))
            .arg(value)
            .arg("EX")
            .arg(self.cache_ttl.as_secs())
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn scrape(&self, url: &Url) -> Result<String, CollaboratorError> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| CollaboratorError::Unavailable(format!("{url}: {e}")))?;

        if !response.status().is_success() {
            return Err(CollaboratorError::Unavailable(format!(
                "{url}: HTTP {}",
                response.status()
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| CollaboratorError::InvalidResponse(format!("{url}: {e}")))?;
        Ok(html_to_text(&html))
    }
}

fn cache_key(company: &str) -> String {
    format!("{CACHE_PREFIX}:{company}")
}

#[async_trait]
impl CompanyContextProvider for ScrapingContextProvider {
    async fn fetch(&self, company: &CompanyRef) -> Option<CompanyContext> {
        let key = company.key()?;

        match self.cached(&key).await {
            Ok(Some(hit)) => {
                debug!("Company context cache hit for {key}");
                return Some(hit);
            }
            Ok(None) => {}
            Err(e) => warn!("Company context cache unavailable: {e}"),
        }

        let urls = fetchable_urls(&company.urls);
        if urls.len() < company.urls.len() {
            debug!(
                "Scraping {} of {} company URL(s) for {key}",
                urls.len(),
                company.urls.len()
            );
        }
        if urls.is_empty() {
            return None;
        }

        let mut parts = Vec::new();
        let mut sources = Vec::new();
        for url in &urls {
            match self.scrape(url).await {
                Ok(text) if !text.is_empty() => {
                    parts.push(text);
                    sources.push(url.to_string());
                }
                Ok(_) => debug!("No readable text at {url}"),
                Err(e) => warn!("Company scrape failed: {e}"),
            }
        }

        if parts.is_empty() {
            return None;
        }

        let context = CompanyContext {
            company: key,
            text: truncate_chars(&parts.join("\n\n"), MAX_CONTEXT_CHARS),
            sources,
        };
        info!(
            "Scraped {} chars of company context for {} from {} page(s)",
            context.text.len(),
            context.company,
            context.sources.len()
        );

        if let Err(e) = self.store(&context).await {
            warn!("Failed to cache company context: {e}");
        }

        Some(context)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// HTML to text
// ────────────────────────────────────────────────────────────────────────────

/// Visible text of the page body with scripts, styles and navigation removed.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let body = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next());
    let root = body.unwrap_or_else(|| document.root_element());

    let mut parts = Vec::new();
    collect_text(root, &mut parts);
    parts.join(" ")
}

fn collect_text(element: ElementRef, parts: &mut Vec<String>) {
    if SKIP_TAGS.contains(&element.value().name()) {
        return;
    }
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
                if !text.is_empty() {
                    parts.push(text);
                }
            }
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(child, parts);
                }
            }
            _ => {}
        }
    }
}

/// Truncates on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((at, _)) => text[..at].to_string(),
        None => text.to_string(),
    }
}
