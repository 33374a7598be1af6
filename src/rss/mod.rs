// src/rss/mod.rs
//! Feed list loading and RSS fetching. Each item is wrapped with its source
//! metadata so downstream stages never look the feed up again.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use metrics::counter;
use quick_xml::de::from_str;
use serde::Deserialize;

const ENV_FEEDS_PATH: &str = "FEEDS_CONFIG_PATH";
const DEFAULT_FEEDS: &str = include_str!("../../config/feeds.toml");

/// A single configured feed source.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FeedSource {
    pub url: String,
    pub name: String,
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub categories: Vec<String>,
}

fn default_lang() -> String {
    "da".to_string()
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct FeedsConfig {
    feeds: Vec<FeedSource>,
}

/// A feed enclosure (media attachment), as carried by RSS `<enclosure>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enclosure {
    pub url: String,
    pub mime_type: String,
}

/// One fetched feed entry plus the source it came from.
#[derive(Debug, Clone)]
pub struct FeedItem {
    pub title: String,
    pub description: String,
    pub content: String,
    pub link: String,
    pub published: Option<DateTime<Utc>>,
    pub enclosures: Vec<Enclosure>,
    pub source: FeedSource,
}

/// Load the feed list from `path`, or the embedded default when `path` is
/// None and neither the env override nor `config/feeds.toml` exists.
pub fn load_feeds(path: Option<&str>) -> Result<Vec<FeedSource>> {
    let content = match path {
        Some(p) if Path::new(p).exists() => std::fs::read_to_string(p)
            .with_context(|| format!("reading feeds config from {p}"))?,
        Some(p) => anyhow::bail!("{ENV_FEEDS_PATH} points to non-existent path: {p}"),
        None => DEFAULT_FEEDS.to_string(),
    };
    parse_feeds(&content)
}

fn parse_feeds(content: &str) -> Result<Vec<FeedSource>> {
    let cfg: FeedsConfig = toml::from_str(content).context("parsing feeds TOML")?;
    Ok(cfg.feeds)
}

/* ----------------------------
RSS wire format (quick-xml serde)
---------------------------- */

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    // quick-xml keeps the namespace prefix in element names.
    #[serde(rename = "content:encoded")]
    content_encoded: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    #[serde(default)]
    enclosure: Vec<RawEnclosure>,
}

#[derive(Debug, Deserialize)]
struct RawEnclosure {
    #[serde(rename = "@url", default)]
    url: String,
    #[serde(rename = "@type", default)]
    mime_type: String,
}

fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    // Feeds in the wild use RFC 2822; a few emit RFC 3339.
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse one RSS document into items carrying `source` metadata.
pub fn parse_feed(xml: &str, source: &FeedSource) -> Result<Vec<FeedItem>> {
    let rss: Rss = from_str(xml).context("parsing RSS XML")?;
    let mut out = Vec::with_capacity(rss.channel.item.len());
    for it in rss.channel.item {
        let title = it.title.unwrap_or_default().trim().to_string();
        if title.is_empty() {
            continue;
        }
        out.push(FeedItem {
            title,
            description: it.description.unwrap_or_default(),
            content: it.content_encoded.unwrap_or_default(),
            link: it.link.unwrap_or_default(),
            published: it.pub_date.as_deref().and_then(parse_pub_date),
            enclosures: it
                .enclosure
                .into_iter()
                .filter(|e| !e.url.trim().is_empty())
                .map(|e| Enclosure {
                    url: e.url,
                    mime_type: e.mime_type,
                })
                .collect(),
            source: source.clone(),
        });
    }
    Ok(out)
}

/// Fetch and parse every active feed. Individual failures are logged and
/// skipped; the run continues with whatever arrived.
pub async fn fetch_all_feeds(
    client: &reqwest::Client,
    sources: &[FeedSource],
) -> Vec<FeedItem> {
    let mut all = Vec::new();
    let mut ok = 0usize;

    for source in sources {
        if !source.active {
            tracing::debug!(feed = %source.name, "skipping inactive feed");
            continue;
        }
        match fetch_one(client, source).await {
            Ok(mut items) => {
                tracing::info!(feed = %source.name, items = items.len(), "feed loaded");
                all.append(&mut items);
                ok += 1;
            }
            Err(e) => {
                tracing::warn!(feed = %source.name, url = %source.url, error = ?e, "feed fetch failed");
                counter!("feed_fetch_errors_total").increment(1);
            }
        }
    }

    tracing::info!(ok, total = sources.len(), items = all.len(), "feeds processed");
    all
}

async fn fetch_one(client: &reqwest::Client, source: &FeedSource) -> Result<Vec<FeedItem>> {
    let body = client
        .get(&source.url)
        .send()
        .await
        .context("feed request")?
        .error_for_status()
        .context("feed non-2xx")?
        .text()
        .await
        .context("feed body")?;
    parse_feed(&body, source)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src() -> FeedSource {
        FeedSource {
            url: "https://example.dk/rss".into(),
            name: "Example".into(),
            lang: "da".into(),
            priority: 1,
            active: true,
            categories: vec!["news".into()],
        }
    }

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example</title>
    <item>
      <title>Nye visumregler for ukrainere</title>
      <link>https://example.dk/a/1</link>
      <description>Regeringen har fremlagt nye regler.</description>
      <pubDate>Mon, 01 Sep 2025 12:34:56 GMT</pubDate>
      <enclosure url="https://example.dk/img/1.jpg" type="image/jpeg"/>
    </item>
    <item>
      <title></title>
      <link>https://example.dk/a/2</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_items_and_skips_empty_titles() {
        let items = parse_feed(SAMPLE, &src()).unwrap();
        assert_eq!(items.len(), 1);
        let it = &items[0];
        assert_eq!(it.title, "Nye visumregler for ukrainere");
        assert_eq!(it.enclosures.len(), 1);
        assert_eq!(it.enclosures[0].mime_type, "image/jpeg");
        assert!(it.published.is_some());
        assert_eq!(it.source.name, "Example");
    }

    #[test]
    fn pub_date_rfc2822_and_rfc3339() {
        assert!(parse_pub_date("Mon, 01 Sep 2025 12:34:56 GMT").is_some());
        assert!(parse_pub_date("2025-09-01T12:34:56Z").is_some());
        assert!(parse_pub_date("yesterday").is_none());
    }

    #[test]
    fn feeds_toml_parses_with_defaults() {
        let toml = r#"
[[feeds]]
url = "https://dr.dk/nyheder/service/feeds/allenyheder"
name = "DR"

[[feeds]]
url = "https://tv2.dk/rss"
name = "TV2"
active = false
priority = 3
categories = ["news", "denmark"]
"#;
        let feeds = parse_feeds(toml).unwrap();
        assert_eq!(feeds.len(), 2);
        assert!(feeds[0].active);
        assert_eq!(feeds[0].lang, "da");
        assert!(!feeds[1].active);
    }

    #[test]
    fn embedded_default_feed_list_is_valid() {
        let feeds = load_feeds(None).unwrap();
        assert!(!feeds.is_empty());
    }
}
