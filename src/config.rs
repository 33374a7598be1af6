// src/config.rs
//! Runtime configuration. Everything comes from the environment so the binary
//! can run unchanged under cron, systemd timers, or a container scheduler.

use std::env;
use std::time::Duration;

use anyhow::bail;

/// How many items a single run may publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotMode {
    /// Publish only the top-ranked item.
    Single,
    /// Publish up to `max_news_limit` items.
    Multiple,
}

/// What the publisher sends per item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostingPolicy {
    /// Photo with caption when an image resolved, plain text otherwise.
    Hybrid,
    /// Skip items without a resolved image.
    PhotoOnly,
    /// Always plain text, ignore images.
    TextOnly,
}

/// Which sent-store backend to prefer at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Postgres,
    File,
}

#[derive(Debug, Clone)]
pub struct Config {
    // Transport
    pub telegram_token: String,
    pub telegram_chat_id: String,
    pub bot_mode: BotMode,
    pub posting_policy: PostingPolicy,

    // Primary AI
    pub gemini_api_key: String,
    pub max_primary_ai_calls: u32,

    // Selection
    pub max_news_limit: usize,
    pub news_max_age: Duration,
    pub per_source_cap: usize,
    pub per_category_cap: usize,

    // Scraping
    pub scrape_concurrency: usize,
    pub scrape_max_articles: usize,

    // Composition budgets (all rune counts)
    pub photo_caption_max_runes: usize,
    pub photo_min_per_lang_runes: usize,
    pub photo_sentences_per_lang: usize,
    pub text_sentences_per_lang_min: usize,
    pub text_sentences_per_lang_max: usize,
    pub min_summary_total_runes: usize,

    // Sent-store
    pub cache_backend: CacheBackend,
    pub cache_ttl_hours: i64,
    pub cache_file_path: String,
    pub database_url: Option<String>,

    // File configs
    pub feeds_config_path: String,
    pub lexicons_config_path: Option<String>,

    // Monitoring
    pub enable_http_monitoring: bool,
    pub monitoring_port: u16,
}

impl Config {
    /// Build from environment with defaults, then validate.
    pub fn load() -> anyhow::Result<Self> {
        let cfg = Self {
            telegram_token: env::var("TELEGRAM_TOKEN").unwrap_or_default(),
            telegram_chat_id: env::var("TELEGRAM_CHAT_ID").unwrap_or_default(),
            bot_mode: match env_or("BOT_MODE", "multiple").as_str() {
                "single" => BotMode::Single,
                "multiple" => BotMode::Multiple,
                other => bail!("BOT_MODE must be 'single' or 'multiple', got {other:?}"),
            },
            posting_policy: match env_or("POSTING_POLICY", "hybrid").as_str() {
                "hybrid" => PostingPolicy::Hybrid,
                "photo-only" => PostingPolicy::PhotoOnly,
                "text-only" => PostingPolicy::TextOnly,
                other => bail!("POSTING_POLICY must be hybrid|photo-only|text-only, got {other:?}"),
            },
            gemini_api_key: env::var("GEMINI_API_KEY").unwrap_or_default(),
            max_primary_ai_calls: env_parse("MAX_PRIMARY_AI_CALLS", 3),
            max_news_limit: env_parse("MAX_NEWS_LIMIT", 8),
            news_max_age: Duration::from_secs(env_parse::<u64>("NEWS_MAX_AGE_HOURS", 24) * 3600),
            per_source_cap: env_parse("PER_SOURCE_CAP", 2),
            per_category_cap: env_parse("PER_CATEGORY_CAP", 2),
            scrape_concurrency: env_parse("SCRAPE_CONCURRENCY", 8),
            scrape_max_articles: env_parse("SCRAPE_MAX_ARTICLES", 12),
            photo_caption_max_runes: env_parse::<usize>("PHOTO_CAPTION_MAX_RUNES", 1024).min(1024),
            photo_min_per_lang_runes: env_parse("PHOTO_MIN_PER_LANG_RUNES", 100),
            photo_sentences_per_lang: env_parse::<usize>("PHOTO_SENTENCES_PER_LANG", 2).clamp(1, 2),
            text_sentences_per_lang_min: env_parse("TEXT_SENTENCES_PER_LANG_MIN", 2),
            text_sentences_per_lang_max: env_parse("TEXT_SENTENCES_PER_LANG_MAX", 4),
            min_summary_total_runes: env_parse("MIN_SUMMARY_TOTAL_RUNES", 120),
            cache_backend: match env_or("CACHE_BACKEND", "postgres").as_str() {
                "postgres" | "transactional" => CacheBackend::Postgres,
                "file" => CacheBackend::File,
                other => bail!("CACHE_BACKEND must be 'postgres' or 'file', got {other:?}"),
            },
            cache_ttl_hours: env_parse("CACHE_TTL_HOURS", 48),
            cache_file_path: env_or("CACHE_FILE_PATH", "sent_news.json"),
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            feeds_config_path: env_or("FEEDS_CONFIG_PATH", "config/feeds.toml"),
            lexicons_config_path: env::var("LEXICONS_PATH").ok(),
            enable_http_monitoring: env::var("ENABLE_HTTP_MONITORING")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            monitoring_port: env_parse("MONITORING_PORT", 8080),
        };

        cfg.validate()?;
        Ok(cfg)
    }

    /// Startup-fatal checks: missing transport or primary-AI credentials.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.telegram_token.is_empty() {
            bail!("TELEGRAM_TOKEN is required");
        }
        if self.telegram_chat_id.is_empty() {
            bail!("TELEGRAM_CHAT_ID is required");
        }
        if self.gemini_api_key.is_empty() {
            bail!("GEMINI_API_KEY is required");
        }
        if self.cache_backend == CacheBackend::Postgres && self.database_url.is_none() {
            // Not fatal: the store falls back to the file backend at init.
            tracing::warn!("CACHE_BACKEND=postgres but DATABASE_URL is unset; file fallback will be used");
        }
        Ok(())
    }
}

fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(v) if !v.is_empty() => v,
        _ => default.to_string(),
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_parse_falls_back_on_garbage() {
        std::env::set_var("NYHEDSBRO_TEST_NUM", "not-a-number");
        let v: u32 = env_parse("NYHEDSBRO_TEST_NUM", 7);
        assert_eq!(v, 7);
        std::env::remove_var("NYHEDSBRO_TEST_NUM");
    }

    #[test]
    fn env_or_prefers_set_value() {
        std::env::set_var("NYHEDSBRO_TEST_STR", "x");
        assert_eq!(env_or("NYHEDSBRO_TEST_STR", "y"), "x");
        std::env::remove_var("NYHEDSBRO_TEST_STR");
        assert_eq!(env_or("NYHEDSBRO_TEST_STR", "y"), "y");
    }
}
