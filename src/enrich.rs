// src/enrich.rs
//! Enrichment: full-article text, bilingual summaries with a budgeted
//! primary provider and an ordered fallback chain, and image resolution.
//! Items are processed strictly serially to respect provider rate limits;
//! only the scraping happens up front in parallel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::ai::{sanitize::sanitize_ai_text, AiRuntime};
use crate::news::{Candidate, EnrichedItem};
use crate::scrape::{Article, Scraper};

const MIN_SCRAPED_CHARS: usize = 200;

/// Textual tags on rule-based summaries, so readers (and downstream
/// formatting) can tell an excerpt from a real summary.
const EXCERPT_TAG_DA: &str = " (uddrag)";
const EXCERPT_TAG_UK: &str = " (уривок)";

static RE_IMG_SRC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<img[^>]+src=["']([^"']+)["']"#).unwrap());

#[derive(Debug, Clone)]
pub struct EnrichOptions {
    pub max_primary_calls: u32,
    /// Pause between items to smooth provider QPS.
    pub inter_item_pause: Duration,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            max_primary_calls: 3,
            inter_item_pause: Duration::from_secs(1),
        }
    }
}

pub struct Enricher<'a> {
    ai: &'a AiRuntime,
    scraper: Arc<Scraper>,
    opts: EnrichOptions,
}

impl<'a> Enricher<'a> {
    pub fn new(ai: &'a AiRuntime, scraper: Arc<Scraper>, opts: EnrichOptions) -> Self {
        Self { ai, scraper, opts }
    }

    /// Enrich every selected candidate. `articles` is the pre-scraped body
    /// map keyed by link. Per-item failures degrade to fallbacks; this never
    /// fails the run.
    pub async fn enrich_all(
        &self,
        selected: Vec<Candidate>,
        articles: &HashMap<String, Article>,
    ) -> Vec<EnrichedItem> {
        let total = selected.len();
        let mut out = Vec::with_capacity(total);
        let mut primary_calls: u32 = 0;

        for (i, candidate) in selected.into_iter().enumerate() {
            tracing::info!(item = i + 1, total, link = %candidate.link, "enriching");
            let item = self.enrich_one(candidate, articles, &mut primary_calls).await;
            out.push(item);
            if !self.opts.inter_item_pause.is_zero() {
                tokio::time::sleep(self.opts.inter_item_pause).await;
            }
        }
        out
    }

    async fn enrich_one(
        &self,
        candidate: Candidate,
        articles: &HashMap<String, Article>,
        primary_calls: &mut u32,
    ) -> EnrichedItem {
        // 1) Full text: scraped body wins when it is substantial.
        let full_content = match articles.get(&candidate.link) {
            Some(a) if a.content.chars().count() >= MIN_SCRAPED_CHARS => a.content.clone(),
            _ => {
                tracing::debug!(link = %candidate.link, "using feed description, no usable scrape");
                candidate.description.clone()
            }
        };

        // 2) Budget check, then the primary provider.
        let mut summary_original = String::new();
        let mut summary_danish = String::new();
        let mut summary_ukrainian = String::new();

        if *primary_calls < self.opts.max_primary_calls {
            counter!("primary_ai_calls_total").increment(1);
            match self
                .ai
                .primary
                .translate_and_summarize(&candidate.title, &full_content)
                .await
            {
                Ok(t) => {
                    // Only a successful call consumes budget.
                    *primary_calls += 1;
                    summary_original = sanitize_ai_text(&t.summary);
                    summary_danish = sanitize_ai_text(&t.danish);
                    summary_ukrainian = sanitize_ai_text(&t.ukrainian);
                }
                Err(e) => {
                    counter!("primary_ai_failures_total").increment(1);
                    tracing::warn!(error = ?e, "primary provider failed, using fallback chain");
                }
            }
        } else {
            tracing::info!("primary call budget exhausted, using fallback chain");
        }

        // 3) Field-by-field fallback chain, then the rule-based excerpt.
        if summary_ukrainian.is_empty() {
            summary_ukrainian = match self.ai.chain.summarize(&full_content, "uk").await {
                Some(s) => {
                    counter!("fallback_summaries_total").increment(1);
                    s
                }
                None => {
                    counter!("rule_based_summaries_total").increment(1);
                    tag_excerpt(&fallback_summary(&full_content), EXCERPT_TAG_UK)
                }
            };
        }
        if summary_danish.is_empty() {
            summary_danish = match self.ai.chain.summarize(&full_content, "da").await {
                Some(s) => {
                    counter!("fallback_summaries_total").increment(1);
                    s
                }
                None => {
                    counter!("rule_based_summaries_total").increment(1);
                    tag_excerpt(&fallback_summary(&full_content), EXCERPT_TAG_DA)
                }
            };
        }
        if summary_original.is_empty() {
            summary_original = fallback_summary(&full_content);
        }

        // 4) Ukrainian title: one translate call down the chain.
        let source_lang = if candidate.source_lang.is_empty() {
            "da"
        } else {
            candidate.source_lang.as_str()
        };
        let title_ukrainian = self
            .ai
            .chain
            .translate(&candidate.title, source_lang, "uk")
            .await;

        // 5) Image resolution.
        let image_url = self.resolve_image(&candidate).await;

        EnrichedItem {
            candidate,
            full_content,
            summary_original,
            summary_danish,
            summary_ukrainian,
            title_ukrainian,
            image_url,
        }
    }

    /// Enclosures, then `<img>` tags in the feed payload, then the page's
    /// `og:image`. Data URLs and SVGs are never acceptable.
    async fn resolve_image(&self, candidate: &Candidate) -> Option<String> {
        if let Some(url) = image_from_feed(candidate) {
            return Some(url);
        }
        if candidate.link.trim().is_empty() {
            return None;
        }
        self.scraper
            .fetch_og_image(&candidate.link)
            .await
            .filter(|u| is_acceptable_image_url(u))
    }
}

/// Feed-local image resolution: RSS enclosures with an image MIME type or an
/// image-suffixed URL, then the first `<img src>` in description or content.
pub fn image_from_feed(candidate: &Candidate) -> Option<String> {
    for e in &candidate.enclosures {
        let url = e.url.trim();
        if url.is_empty() {
            continue;
        }
        let mime_image = e.mime_type.to_lowercase().starts_with("image/");
        if (mime_image || has_image_suffix(url)) && is_acceptable_image_url(url) {
            return Some(url.to_string());
        }
    }
    for html in [&candidate.description, &candidate.feed_content] {
        if let Some(caps) = RE_IMG_SRC.captures(html) {
            let url = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
            if !url.is_empty() && is_acceptable_image_url(url) {
                return Some(url.to_string());
            }
        }
    }
    None
}

fn has_image_suffix(url: &str) -> bool {
    let lower = url.to_lowercase();
    [".jpg", ".jpeg", ".png", ".webp", ".gif"]
        .iter()
        .any(|s| lower.ends_with(s))
}

fn is_acceptable_image_url(url: &str) -> bool {
    let lower = url.trim().to_lowercase();
    !lower.starts_with("data:") && !lower.ends_with(".svg")
}

/// Rule-based summary: the first 1–2 sentences of at least 25 runes, else
/// the first 160 runes.
pub fn fallback_summary(content: &str) -> String {
    let c = content.trim();
    if c.is_empty() {
        return "(intet indhold)".to_string();
    }

    let mut picked: Vec<&str> = Vec::new();
    for sentence in c.split('.') {
        let s = sentence.trim();
        if s.chars().count() < 25 {
            continue;
        }
        picked.push(s);
        if picked.len() >= 2 {
            break;
        }
    }
    if picked.is_empty() {
        if c.chars().count() > 160 {
            let cut: String = c.chars().take(160).collect();
            return format!("{cut}...");
        }
        return c.to_string();
    }
    format!("{}.", picked.join(". "))
}

fn tag_excerpt(excerpt: &str, tag: &str) -> String {
    format!("{excerpt}{tag}")
}
