// src/news.rs
//! Pipeline item types. A `FeedItem` that survives scoring becomes a
//! `Candidate`; a selected candidate leaves the enricher as an
//! `EnrichedItem`. Items move through the pipeline by value.

use chrono::{DateTime, Utc};

use crate::relevance::Category;
use crate::rss::{Enclosure, FeedItem};

/// A scored feed item that has not yet been deduped away.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub title: String,
    pub description: String,
    pub feed_content: String,
    pub link: String,
    pub published: DateTime<Utc>,
    pub category: Category,
    pub score: u32,
    pub source_name: String,
    pub source_lang: String,
    pub enclosures: Vec<Enclosure>,
}

impl Candidate {
    pub fn from_feed_item(item: FeedItem, category: Category, score: u32, now: DateTime<Utc>) -> Self {
        Self {
            title: item.title,
            description: item.description,
            feed_content: item.content,
            link: item.link,
            published: item.published.unwrap_or(now),
            category,
            score,
            source_name: item.source.name,
            source_lang: item.source.lang,
            enclosures: item.enclosures,
        }
    }
}

/// A candidate enriched with full text and bilingual summaries. The Danish
/// and Ukrainian summaries are always non-empty; when every provider failed
/// they carry the rule-based fallback.
#[derive(Debug, Clone)]
pub struct EnrichedItem {
    pub candidate: Candidate,
    pub full_content: String,
    pub summary_original: String,
    pub summary_danish: String,
    pub summary_ukrainian: String,
    pub title_ukrainian: Option<String>,
    pub image_url: Option<String>,
}

impl EnrichedItem {
    pub fn title(&self) -> &str {
        &self.candidate.title
    }

    pub fn link(&self) -> &str {
        &self.candidate.link
    }

    pub fn category(&self) -> Category {
        self.candidate.category
    }

    pub fn source_name(&self) -> &str {
        &self.candidate.source_name
    }
}
