// src/app.rs
//! Run orchestration: wiring, the score→dedup→select stage, and the
//! publisher loop with its triple-check against the sent-store.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use metrics::{counter, histogram};

use crate::ai::AiRuntime;
use crate::compose::{self, CaptionBudget};
use crate::config::{BotMode, Config, PostingPolicy};
use crate::dedup::Deduper;
use crate::enrich::{EnrichOptions, Enricher};
use crate::news::{Candidate, EnrichedItem};
use crate::relevance::Scorer;
use crate::rss::{self, FeedItem};
use crate::scrape::Scraper;
use crate::select::{select_diverse, sort_candidates};
use crate::store::{init_store, news_hash, SentStore};
use crate::telegram::TelegramClient;

/// Counters reported at the end of a run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub fetched: usize,
    pub candidates: usize,
    pub selected: usize,
    pub published: usize,
    pub cancelled: bool,
}

/// Execute one pipeline run. The store is always flushed on the way out,
/// whether the run completed, failed, or was cancelled by ctrl-c.
pub async fn run(cfg: &Config) -> Result<RunSummary> {
    let started = Instant::now();

    let store = init_store(cfg).await.context("initializing sent-store")?;
    if let Err(e) = store.purge_expired().await {
        tracing::warn!(error = ?e, "sent-store purge failed");
    }
    match store.stats().await {
        Ok(stats) => tracing::info!(
            backend = store.backend_name(),
            total = stats.total,
            active = stats.active,
            "sent-store ready"
        ),
        Err(e) => tracing::warn!(error = ?e, "sent-store stats unavailable"),
    }

    let result = tokio::select! {
        r = pipeline(cfg, store.as_ref()) => r,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("cancellation received, shutting down");
            Ok(RunSummary { cancelled: true, ..Default::default() })
        }
    };

    if let Err(e) = store.close().await {
        tracing::error!(error = ?e, "sent-store flush failed");
    }

    histogram!("pipeline_run_seconds").record(started.elapsed().as_secs_f64());
    if result.is_ok() {
        crate::telemetry::mark_run_complete();
    }
    result
}

async fn pipeline(cfg: &Config, store: &dyn SentStore) -> Result<RunSummary> {
    // Only a broken primary-provider client is fatal here; everything later
    // degrades per item.
    let ai = AiRuntime::from_env(&cfg.gemini_api_key).context("initializing AI runtime")?;
    let scorer = Scorer::load(cfg.lexicons_config_path.as_deref()).context("loading lexicons")?;

    // An explicitly configured path must exist; the default path falls back
    // to the embedded feed list when absent.
    let feeds_path = if Path::new(&cfg.feeds_config_path).exists() {
        Some(cfg.feeds_config_path.as_str())
    } else if cfg.feeds_config_path == "config/feeds.toml" {
        None
    } else {
        Some(cfg.feeds_config_path.as_str())
    };
    let feeds = rss::load_feeds(feeds_path).context("loading feed list")?;

    let feed_client = reqwest::Client::builder()
        .user_agent("nyhedsbro/0.3 (+news digest bot)")
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(20))
        .build()
        .context("building feed http client")?;

    let items = rss::fetch_all_feeds(&feed_client, &feeds).await;
    let mut summary = RunSummary {
        fetched: items.len(),
        ..Default::default()
    };

    // Score + dedup + select run on this one task; their state is never
    // shared.
    let candidates = score_and_dedup(&scorer, items, cfg);
    summary.candidates = candidates.len();
    if candidates.is_empty() {
        tracing::info!("no relevant news this run");
        return Ok(summary);
    }

    let mut sorted = candidates;
    sort_candidates(&mut sorted);
    let selected = select_diverse(&sorted, cfg.max_news_limit, cfg.per_source_cap, cfg.per_category_cap);

    // Triple-check, step 1: drop anything already published.
    let mut fresh = Vec::with_capacity(selected.len());
    for c in selected {
        let hash = news_hash(&c.title, &c.link);
        if store.is_hash_sent(&hash).await || store.is_link_sent(&c.link).await {
            counter!("publish_skipped_duplicate_total").increment(1);
            tracing::info!(title = %c.title, "already sent, dropped at selection");
            continue;
        }
        fresh.push(c);
    }
    summary.selected = fresh.len();
    if fresh.is_empty() {
        tracing::info!("everything selected was already published");
        return Ok(summary);
    }

    // Scrape the whole selection up front with bounded parallelism, then
    // enrich strictly serially.
    let scraper = Arc::new(Scraper::new()?);
    let urls: Vec<String> = fresh.iter().map(|c| c.link.clone()).collect();
    let articles = Arc::clone(&scraper)
        .fetch_all(&urls, cfg.scrape_concurrency, cfg.scrape_max_articles)
        .await;

    let enricher = Enricher::new(
        &ai,
        Arc::clone(&scraper),
        EnrichOptions {
            max_primary_calls: cfg.max_primary_ai_calls,
            inter_item_pause: Duration::from_secs(1),
        },
    );
    let enriched = enricher.enrich_all(fresh, &articles).await;

    let telegram = TelegramClient::new(&cfg.telegram_token, &cfg.telegram_chat_id)?;
    summary.published = publish(cfg, store, &telegram, &enriched).await;

    tracing::info!(
        fetched = summary.fetched,
        candidates = summary.candidates,
        selected = summary.selected,
        published = summary.published,
        "run complete"
    );
    Ok(summary)
}

/// Stage B+C: age gate, dedup, scoring. Items flow through in feed order;
/// ordering is settled later by the selector sort.
fn score_and_dedup(scorer: &Scorer, items: Vec<FeedItem>, cfg: &Config) -> Vec<Candidate> {
    let now = Utc::now();
    let max_age = chrono::Duration::from_std(cfg.news_max_age).unwrap_or(chrono::Duration::hours(24));
    let mut deduper = Deduper::new();
    let mut candidates = Vec::new();

    for item in items {
        counter!("news_processed_total").increment(1);

        if let Some(published) = item.published {
            if now - published > max_age {
                counter!("news_dropped_age_total").increment(1);
                continue;
            }
        }

        if let Err(reason) = deduper.admit(&item, now) {
            counter!("duplicates_filtered_total").increment(1);
            tracing::debug!(title = %item.title, ?reason, "duplicate dropped");
            continue;
        }

        let Some((category, score)) = scorer.score(&item.title, &item.description) else {
            continue;
        };

        deduper.accept_title(&item.title);
        counter!("candidates_total").increment(1);
        candidates.push(Candidate::from_feed_item(item, category, score, now));
    }

    candidates
}

/// The publisher loop. Serial on purpose: the pre-send re-check is only
/// meaningful when items are dispatched one at a time.
async fn publish(
    cfg: &Config,
    store: &dyn SentStore,
    telegram: &TelegramClient,
    enriched: &[EnrichedItem],
) -> usize {
    let limit = match cfg.bot_mode {
        BotMode::Single => 1,
        BotMode::Multiple => cfg.max_news_limit,
    };

    let mut sent = 0usize;
    for item in enriched {
        if sent >= limit {
            break;
        }

        if !compose::has_publishable_summaries(item, cfg.min_summary_total_runes) {
            tracing::warn!(title = %item.title(), "summaries below publishable floor, skipping");
            continue;
        }

        // Triple-check, step 2: a sibling invocation may have claimed the
        // item since selection.
        let hash = news_hash(item.title(), item.link());
        if store.is_hash_sent(&hash).await || store.is_link_sent(item.link()).await {
            counter!("publish_skipped_duplicate_total").increment(1);
            tracing::info!(title = %item.title(), "claimed by a sibling run, skipping");
            continue;
        }

        let delivered = send_item(cfg, telegram, item).await;
        if !delivered {
            continue;
        }
        counter!("messages_sent_total").increment(1);
        sent += 1;

        // Triple-check, step 3: claim it. A failed claim does not roll back
        // the send; the TTL bounds the duplicate risk.
        if let Err(e) = store
            .mark_sent(
                &hash,
                item.title(),
                item.link(),
                item.category().as_str(),
                item.source_name(),
            )
            .await
        {
            counter!("store_write_failures_total").increment(1);
            tracing::error!(error = ?e, title = %item.title(), "mark_sent failed after delivery");
        }
    }
    sent
}

/// Dispatch one item according to the posting policy. Returns true when a
/// message reached the channel.
async fn send_item(cfg: &Config, telegram: &TelegramClient, item: &EnrichedItem) -> bool {
    let budget = CaptionBudget {
        max_runes: cfg.photo_caption_max_runes,
        min_per_lang_runes: cfg.photo_min_per_lang_runes,
        sentences_per_lang: cfg.photo_sentences_per_lang,
    };

    let photo = match (&item.image_url, cfg.posting_policy) {
        (_, PostingPolicy::TextOnly) => None,
        (Some(url), _) => Some(url.as_str()),
        (None, PostingPolicy::PhotoOnly) => {
            tracing::info!(title = %item.title(), "photo-only policy and no image, skipping item");
            return false;
        }
        (None, PostingPolicy::Hybrid) => None,
    };

    let result = match photo {
        Some(url) => {
            let caption = compose::format_photo_caption(item, budget);
            telegram.send_photo(url, &caption).await
        }
        None => {
            let text = compose::format_text_message(
                item,
                cfg.text_sentences_per_lang_min,
                cfg.text_sentences_per_lang_max,
            );
            telegram.send_text(&text, true).await
        }
    };

    match result {
        Ok(()) => {
            tracing::info!(title = %item.title(), "published");
            true
        }
        Err(e) => {
            tracing::error!(error = ?e, title = %item.title(), "transport failed, item skipped");
            false
        }
    }
}
