// src/dedup.rs
//! In-run deduplication. Four stages, checked in order per candidate:
//! normalized URL, content hash, similarity key (host + significant words +
//! time bucket), and a shingle-Jaccard scan against already-accepted titles.

use std::collections::HashSet;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use sha1::{Digest, Sha1};
use url::Url;

use crate::rss::FeedItem;

const SIMILARITY_WINDOW_HOURS: i64 = 6;
const SIMILARITY_MAX_WORDS: usize = 6;
const TITLE_JACCARD_THRESHOLD: f64 = 0.55;

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static RE_SLASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"/+").unwrap());

/// Danish + English stopwords excluded from similarity keys.
static STOPWORDS: &[&str] = &[
    "a", "an", "the", "og", "i", "på", "til", "af", "med", "for", "er", "der",
    "om", "en", "et", "ikke",
];

const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
];

/// Why the deduper rejected an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    DuplicateUrl,
    DuplicateContent,
    SimilarKey,
    SimilarTitle,
}

/// Canonical form of a link for repost detection: https default scheme,
/// fragment and tracking params stripped, lowercased host without `www.`,
/// collapsed slashes, no trailing slash.
pub fn normalize_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    let parsed = Url::parse(raw)
        .or_else(|_| Url::parse(&format!("https://{raw}")))
        .ok();
    let Some(u) = parsed else {
        return raw.to_lowercase();
    };
    let Some(host) = u.host_str() else {
        return raw.to_lowercase();
    };

    let host = host.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    let path = RE_SLASHES.replace_all(u.path(), "/");
    let path = path.trim_end_matches('/');

    let mut query = String::new();
    let kept: Vec<(String, String)> = u
        .query_pairs()
        .filter(|(k, _)| !TRACKING_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if !kept.is_empty() {
        let mut ser = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in &kept {
            ser.append_pair(k, v);
        }
        query = format!("?{}", ser.finish());
    }

    format!("{}://{}{}{}", u.scheme(), host, path, query)
}

/// SHA-1 over lowercased title + description; catches exact syndication.
pub fn content_key(title: &str, description: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!("{title}{description}").to_lowercase().as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(40);
    for b in digest.iter() {
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

fn host_of(link: &str) -> String {
    if link.trim().is_empty() {
        return "unknown".to_string();
    }
    Url::parse(link)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Strip HTML, keep Unicode letters/digits, collapse whitespace, lowercase.
fn normalize_words(s: &str) -> Vec<String> {
    let s = s.to_lowercase();
    let s = RE_TAGS.replace_all(&s, " ");
    let cleaned: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    cleaned.split_whitespace().map(|w| w.to_string()).collect()
}

/// Similarity key: `host|top-significant-words|window-start-unix`. Catches
/// same-source republishes with cosmetic edits inside a 6-hour window.
pub fn similarity_key(item: &FeedItem, now: DateTime<Utc>) -> String {
    let words = normalize_words(&format!("{} {}", item.title, item.description));

    let mut significant: Vec<&str> = Vec::with_capacity(SIMILARITY_MAX_WORDS);
    for w in &words {
        if significant.len() >= SIMILARITY_MAX_WORDS {
            break;
        }
        if STOPWORDS.contains(&w.as_str()) || w.chars().count() <= 2 {
            continue;
        }
        significant.push(w);
    }
    if significant.is_empty() {
        significant = words.iter().take(SIMILARITY_MAX_WORDS).map(|w| w.as_str()).collect();
    }

    let t = item.published.unwrap_or(now);
    let window_secs = SIMILARITY_WINDOW_HOURS * 3600;
    let window_start = t.timestamp().div_euclid(window_secs) * window_secs;

    format!("{}|{}|{}", host_of(&item.link), significant.join("_"), window_start)
}

/// k-gram word shingles over a normalized string. Falls back to single words
/// when the text is shorter than k.
pub fn shingle_set(s: &str, k: usize) -> HashSet<String> {
    let words = normalize_words(s);
    let mut out = HashSet::new();
    if words.is_empty() {
        return out;
    }
    if words.len() >= k {
        for win in words.windows(k) {
            out.insert(win.join(" "));
        }
    }
    if out.is_empty() {
        for w in words {
            out.insert(w);
        }
    }
    out
}

/// Jaccard similarity of two strings over k-gram shingles, in [0.0, 1.0].
pub fn jaccard_similarity(a: &str, b: &str, k: usize) -> f64 {
    let sa = shingle_set(a, k);
    let sb = shingle_set(b, k);
    if sa.is_empty() || sb.is_empty() {
        return 0.0;
    }
    let inter = sa.intersection(&sb).count();
    let union = sa.len() + sb.len() - inter;
    if union == 0 {
        return 0.0;
    }
    inter as f64 / union as f64
}

/// Cross-source paraphrase check on titles: 2-gram shingles, threshold 0.55.
pub fn is_similar_title(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    jaccard_similarity(a, b, 2) >= TITLE_JACCARD_THRESHOLD
}

/// Per-run dedup state. Not shared across tasks; the scoring/dedup/selection
/// stage runs on a single task so this stays trivially consistent.
#[derive(Debug, Default)]
pub struct Deduper {
    seen_links: HashSet<String>,
    seen_content: HashSet<String>,
    seen_similar: HashSet<String>,
    accepted_titles: Vec<String>,
}

impl Deduper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run all four stages for `item`. Keys for stages 1–3 are registered as
    /// their checks pass, so an item dropped at a later stage still claims
    /// its URL/content/similarity keys for the rest of the run.
    pub fn admit(&mut self, item: &FeedItem, now: DateTime<Utc>) -> Result<(), DropReason> {
        if !self.seen_links.insert(normalize_url(&item.link)) {
            return Err(DropReason::DuplicateUrl);
        }
        if !self
            .seen_content
            .insert(content_key(&item.title, &item.description))
        {
            return Err(DropReason::DuplicateContent);
        }
        if !self.seen_similar.insert(similarity_key(item, now)) {
            return Err(DropReason::SimilarKey);
        }
        if self
            .accepted_titles
            .iter()
            .any(|t| is_similar_title(&item.title, t))
        {
            return Err(DropReason::SimilarTitle);
        }
        Ok(())
    }

    /// Record the title of an item that became a candidate, so later items
    /// are compared against it.
    pub fn accept_title(&mut self, title: &str) {
        self.accepted_titles.push(title.to_string());
    }
}
