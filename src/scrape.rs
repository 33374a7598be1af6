// src/scrape.rs
//! Full-article scraping. Selector tables per news site with a generic
//! fallback chain; a bounded worker pool fetches the whole selection up
//! front so the enricher can stay serial.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use scraper::{Html, Selector};
use tokio::sync::Semaphore;

const SCRAPE_TIMEOUT_SECS: u64 = 15;
const PER_WORKER_DELAY_MS: u64 = 500;
const MAX_PARAGRAPHS: usize = 5;
const MIN_PARAGRAPH_CHARS: usize = 30;

/// Site-specific selector chains, tried in order. Keys match on host
/// substring. Heuristic by nature; the generic chain below covers the rest.
const SITE_SELECTORS: &[(&str, &[&str])] = &[
    (
        "dr.dk",
        &[
            "article .dre-article-body p",
            ".dre-article-body p",
            "article[data-article-id] p",
            ".article-content p",
            "main article p",
        ],
    ),
    (
        "ekstrabladet.dk",
        &[
            ".article-body p",
            ".article-content p",
            ".content p",
            "article p",
            ".body-text p",
        ],
    ),
    (
        "tv2.dk",
        &[".article-body p", ".content p", "article p", ".article-text p"],
    ),
    ("bt.dk", &[".article-body p", ".content p", "article p"]),
];

const GENERIC_SELECTORS: &[&str] = &[
    "article p",
    ".article p",
    ".content p",
    ".post-content p",
    ".entry-content p",
    "main p",
    "#content p",
    ".text p",
    "p",
];

const TITLE_SELECTORS: &[&str] = &["h1", "title", ".article-title", ".headline", ".entry-title"];

/// Sentences that mark navigation chrome or a neighboring article teaser.
const NAV_INDICATORS: &[&str] = &[
    "læs også",
    "se også",
    "følg",
    "cookie",
    "gdpr",
    "abonnement",
    "privatlivspolitik",
    "nyhedsbrev",
    "log ind",
    "opret",
    "del artikel",
    "print",
    "reklame",
    "annonce",
    "sponsor",
    "opdateret",
    "redigeret",
    "publiceret",
];

#[derive(Debug, Clone)]
pub struct Article {
    pub title: String,
    pub content: String,
    pub url: String,
}

pub struct Scraper {
    http: reqwest::Client,
}

impl Scraper {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("nyhedsbro/0.3 (+news digest bot)")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(SCRAPE_TIMEOUT_SECS))
            .build()
            .context("building scraper http client")?;
        Ok(Self { http })
    }

    /// Fetch one article body. Errors on HTTP failure or when no selector
    /// chain yields content.
    pub async fn fetch_article(&self, url: &str) -> Result<Article> {
        let body = self
            .http
            .get(url)
            .send()
            .await
            .context("article request")?
            .error_for_status()
            .context("article non-2xx")?
            .text()
            .await
            .context("article body")?;

        let (title, content) = extract_from_html(&body, url);
        if content.is_empty() {
            bail!("no article content extracted from {url}");
        }
        Ok(Article {
            title,
            content,
            url: url.to_string(),
        })
    }

    /// Fetch the page's `og:image`, or empty when absent/unreachable.
    pub async fn fetch_og_image(&self, url: &str) -> Option<String> {
        let body = self
            .http
            .get(url)
            .send()
            .await
            .ok()?
            .error_for_status()
            .ok()?
            .text()
            .await
            .ok()?;
        extract_og_image(&body)
    }

    /// Fetch up to `max` articles with bounded parallelism. Failures are
    /// logged and omitted from the result map; each worker pauses between
    /// requests to avoid hammering a single host.
    pub async fn fetch_all(
        self: Arc<Self>,
        urls: &[String],
        concurrency: usize,
        max: usize,
    ) -> HashMap<String, Article> {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut handles = Vec::new();

        for url in urls.iter().take(max).cloned() {
            let scraper = Arc::clone(&self);
            let permit_source = Arc::clone(&semaphore);
            handles.push(tokio::spawn(async move {
                let _permit = permit_source.acquire_owned().await.ok()?;
                let result = scraper.fetch_article(&url).await;
                tokio::time::sleep(Duration::from_millis(PER_WORKER_DELAY_MS)).await;
                match result {
                    Ok(article) => Some((url, article)),
                    Err(e) => {
                        tracing::debug!(url = %url, error = ?e, "article scrape failed");
                        None
                    }
                }
            }));
        }

        let mut out = HashMap::new();
        for handle in handles {
            if let Ok(Some((url, article))) = handle.await {
                out.insert(url, article);
            }
        }
        tracing::info!(fetched = out.len(), requested = urls.len().min(max), "article scraping done");
        out
    }
}

/// Pull title + cleaned content out of an HTML document, using the site
/// table for the URL's host and falling back to the generic chain.
fn extract_from_html(html: &str, url: &str) -> (String, String) {
    let doc = Html::parse_document(html);

    let title = TITLE_SELECTORS
        .iter()
        .filter_map(|s| Selector::parse(*s).ok())
        .filter_map(|sel| {
            doc.select(&sel)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
        })
        .find(|t| !t.is_empty())
        .unwrap_or_default();

    let chains: Vec<&[&str]> = SITE_SELECTORS
        .iter()
        .filter(|(host, _)| url.contains(host))
        .map(|(_, sels)| *sels)
        .chain(std::iter::once(GENERIC_SELECTORS))
        .collect();

    let mut paragraphs: Vec<String> = Vec::new();
    'chains: for chain in chains {
        for raw_sel in chain.iter().copied() {
            let Ok(sel) = Selector::parse(raw_sel) else {
                continue;
            };
            let mut found: Vec<String> = Vec::new();
            for el in doc.select(&sel) {
                if found.len() >= MAX_PARAGRAPHS {
                    break;
                }
                let text = el.text().collect::<String>();
                let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
                if text.chars().count() < MIN_PARAGRAPH_CHARS || is_navigation(&text) {
                    continue;
                }
                found.push(text);
            }
            if found.len() >= 2 {
                paragraphs = found;
                break 'chains;
            }
            if found.len() > paragraphs.len() {
                paragraphs = found;
            }
        }
    }

    (title, clean_content(&paragraphs.join("\n\n")))
}

fn extract_og_image(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let sel = Selector::parse(r#"meta[property="og:image"]"#).ok()?;
    doc.select(&sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn is_navigation(text: &str) -> bool {
    let lower = text.to_lowercase();
    NAV_INDICATORS.iter().any(|ind| lower.contains(ind))
}

/// Decode entities and normalize whitespace without losing paragraph breaks.
fn clean_content(content: &str) -> String {
    if content.is_empty() {
        return String::new();
    }
    let decoded = html_escape::decode_html_entities(content);
    decoded
        .split("\n\n")
        .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}
