// src/store/mod.rs
//! The sent-store: the durable set of published items that makes publication
//! at-most-once per TTL window. Two backends share one contract and one hash
//! function; the orchestrator never knows which one it got.

pub mod file;
pub mod postgres;

use std::collections::HashMap;
use std::fmt::Write as _;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::{CacheBackend, Config};

/// One published item. The file backend persists these as a JSON array; the
/// Postgres backend maps them onto the `sent_news` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentRecord {
    pub hash: String,
    pub title: String,
    pub link: String,
    pub category: String,
    pub source: String,
    pub sent_at: DateTime<Utc>,
}

/// Observational counters for `/health`-style reporting.
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub total: i64,
    pub active: i64,
    pub per_category: HashMap<String, i64>,
}

/// Stable publication hash: 16-hex prefix of SHA-256 over
/// `normalized-title|domain`. Both backends call this one function, so the
/// hash is identical across processes and backends.
pub fn news_hash(title: &str, link: &str) -> String {
    let normalized_title = title
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let domain = extract_domain(link);

    let mut hasher = Sha256::new();
    hasher.update(normalized_title.as_bytes());
    hasher.update(b"|");
    hasher.update(domain.as_bytes());
    let digest = hasher.finalize();

    let mut out = String::with_capacity(16);
    for b in digest.iter().take(8) {
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

/// Lowercased host with `www.` stripped; `"unknown"` when the link is empty
/// or has no host part.
pub fn extract_domain(link: &str) -> String {
    let link = link.trim();
    if link.is_empty() {
        return "unknown".to_string();
    }
    let rest = link
        .strip_prefix("http://")
        .or_else(|| link.strip_prefix("https://"))
        .unwrap_or(link);
    let domain = rest.split('/').next().unwrap_or("");
    if domain.is_empty() {
        return "unknown".to_string();
    }
    let domain = domain.to_lowercase();
    domain.strip_prefix("www.").unwrap_or(&domain).to_string()
}

/// The sent-store contract. `mark_sent` must be atomic: concurrent callers
/// with the same hash leave exactly one logical record, with `sent_at`
/// refreshed by the later call.
#[async_trait]
pub trait SentStore: Send + Sync {
    /// True iff a record with this hash exists within the TTL window.
    async fn is_hash_sent(&self, hash: &str) -> bool;

    /// Analogous check on the link field. The file backend documents this as
    /// a no-op returning `false`.
    async fn is_link_sent(&self, link: &str) -> bool;

    async fn mark_sent(
        &self,
        hash: &str,
        title: &str,
        link: &str,
        category: &str,
        source: &str,
    ) -> Result<()>;

    /// Best-effort removal of records older than the TTL.
    async fn purge_expired(&self) -> Result<u64>;

    async fn stats(&self) -> Result<StoreStats>;

    /// Flush and release resources. The file backend rewrites its JSON here.
    async fn close(&self) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}

/// Build the configured backend. A Postgres connection failure is not fatal:
/// the run degrades to the file backend, which is safe for a single
/// invocation and keeps the schedule alive.
pub async fn init_store(cfg: &Config) -> Result<Box<dyn SentStore>> {
    if cfg.cache_backend == CacheBackend::Postgres {
        if let Some(db_url) = &cfg.database_url {
            match postgres::PostgresStore::connect(db_url, cfg.cache_ttl_hours).await {
                Ok(store) => {
                    tracing::info!("postgres sent-store connected");
                    return Ok(Box::new(store));
                }
                Err(e) => {
                    tracing::warn!(error = ?e, "postgres sent-store unavailable, falling back to file backend");
                }
            }
        } else {
            tracing::warn!("postgres backend selected but DATABASE_URL missing, using file backend");
        }
    }

    let store = file::FileStore::load(&cfg.cache_file_path, cfg.cache_ttl_hours).await?;
    tracing::info!(path = %cfg.cache_file_path, "file sent-store loaded");
    Ok(Box::new(store))
}
