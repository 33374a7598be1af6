// src/store/file.rs
//! File-backed sent-store: a JSON array loaded into memory at startup and
//! rewritten in full on close. Fallback-only — concurrent invocations
//! sharing one file are not safe, which is why Postgres is preferred in
//! production.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;

use super::{SentRecord, SentStore, StoreStats};

pub struct FileStore {
    path: PathBuf,
    ttl_hours: i64,
    items: RwLock<HashMap<String, SentRecord>>,
}

impl FileStore {
    /// Load records from `path`, dropping anything already past the TTL. A
    /// missing or empty file means an empty store.
    pub async fn load(path: impl AsRef<Path>, ttl_hours: i64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut items = HashMap::new();

        if path.exists() {
            let data = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("reading sent-store file {}", path.display()))?;
            if !data.trim().is_empty() {
                let records: Vec<SentRecord> =
                    serde_json::from_str(&data).context("parsing sent-store JSON")?;
                let cutoff = Utc::now() - Duration::hours(ttl_hours);
                for r in records {
                    if r.sent_at > cutoff {
                        items.insert(r.hash.clone(), r);
                    }
                }
            }
        }

        Ok(Self {
            path,
            ttl_hours,
            items: RwLock::new(items),
        })
    }

    /// Rewrite the whole file from the in-memory map.
    pub async fn save(&self) -> Result<()> {
        let items = self.items.read().await;
        let records: Vec<&SentRecord> = items.values().collect();
        let json = serde_json::to_string_pretty(&records).context("serializing sent-store")?;
        drop(items);
        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("writing sent-store file {}", self.path.display()))?;
        Ok(())
    }

    fn cutoff(&self) -> chrono::DateTime<Utc> {
        Utc::now() - Duration::hours(self.ttl_hours)
    }
}

#[async_trait]
impl SentStore for FileStore {
    async fn is_hash_sent(&self, hash: &str) -> bool {
        let items = self.items.read().await;
        items
            .get(hash)
            .map(|r| r.sent_at > self.cutoff())
            .unwrap_or(false)
    }

    /// The file backend detects duplicates by hash only; link lookups always
    /// miss. Known limitation of the fallback backend.
    async fn is_link_sent(&self, _link: &str) -> bool {
        false
    }

    async fn mark_sent(
        &self,
        hash: &str,
        title: &str,
        link: &str,
        category: &str,
        source: &str,
    ) -> Result<()> {
        let mut items = self.items.write().await;
        items.insert(
            hash.to_string(),
            SentRecord {
                hash: hash.to_string(),
                title: title.to_string(),
                link: link.to_string(),
                category: category.to_string(),
                source: source.to_string(),
                sent_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64> {
        let cutoff = self.cutoff();
        let mut items = self.items.write().await;
        let before = items.len();
        items.retain(|_, r| r.sent_at > cutoff);
        Ok((before - items.len()) as u64)
    }

    async fn stats(&self) -> Result<StoreStats> {
        let cutoff = self.cutoff();
        let items = self.items.read().await;
        let mut stats = StoreStats {
            total: items.len() as i64,
            ..Default::default()
        };
        for r in items.values() {
            if r.sent_at > cutoff {
                stats.active += 1;
                *stats.per_category.entry(r.category.clone()).or_insert(0) += 1;
            }
        }
        Ok(stats)
    }

    async fn close(&self) -> Result<()> {
        self.save().await
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::news_hash;

    #[tokio::test]
    async fn mark_then_hash_sent_within_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent.json");
        let store = FileStore::load(&path, 48).await.unwrap();

        let h = news_hash("En titel", "https://dr.dk/a");
        assert!(!store.is_hash_sent(&h).await);
        store
            .mark_sent(&h, "En titel", "https://dr.dk/a", "denmark", "DR")
            .await
            .unwrap();
        assert!(store.is_hash_sent(&h).await);
        // Hash-only backend: link checks always miss.
        assert!(!store.is_link_sent("https://dr.dk/a").await);
    }

    #[tokio::test]
    async fn expired_records_filtered_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent.json");

        let fresh = SentRecord {
            hash: "aaaaaaaaaaaaaaaa".into(),
            title: "frisk".into(),
            link: "https://dr.dk/1".into(),
            category: "denmark".into(),
            source: "DR".into(),
            sent_at: Utc::now() - Duration::hours(1),
        };
        let stale = SentRecord {
            hash: "bbbbbbbbbbbbbbbb".into(),
            title: "gammel".into(),
            link: "https://dr.dk/2".into(),
            category: "denmark".into(),
            source: "DR".into(),
            sent_at: Utc::now() - Duration::hours(72),
        };
        std::fs::write(&path, serde_json::to_string(&vec![&fresh, &stale]).unwrap()).unwrap();

        let store = FileStore::load(&path, 48).await.unwrap();
        assert!(store.is_hash_sent("aaaaaaaaaaaaaaaa").await);
        assert!(!store.is_hash_sent("bbbbbbbbbbbbbbbb").await);
    }

    #[tokio::test]
    async fn save_and_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent.json");

        let store = FileStore::load(&path, 48).await.unwrap();
        store
            .mark_sent("cccccccccccccccc", "titel", "https://dr.dk/3", "ukraine", "DR")
            .await
            .unwrap();
        store.close().await.unwrap();

        let reloaded = FileStore::load(&path, 48).await.unwrap();
        assert!(reloaded.is_hash_sent("cccccccccccccccc").await);
        let stats = reloaded.stats().await.unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.per_category.get("ukraine"), Some(&1));
    }

    #[tokio::test]
    async fn mark_sent_refreshes_existing_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent.json");
        let store = FileStore::load(&path, 48).await.unwrap();

        store
            .mark_sent("dddddddddddddddd", "t", "https://dr.dk/4", "denmark", "DR")
            .await
            .unwrap();
        let first = store.items.read().await.get("dddddddddddddddd").unwrap().sent_at;
        store
            .mark_sent("dddddddddddddddd", "t", "https://dr.dk/4", "denmark", "DR")
            .await
            .unwrap();
        let second = store.items.read().await.get("dddddddddddddddd").unwrap().sent_at;
        assert!(second >= first);
        assert_eq!(store.stats().await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn purge_counts_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sent.json");
        let stale = SentRecord {
            hash: "eeeeeeeeeeeeeeee".into(),
            title: "gammel".into(),
            link: "https://dr.dk/5".into(),
            category: "denmark".into(),
            source: "DR".into(),
            sent_at: Utc::now() - Duration::hours(100),
        };
        std::fs::write(&path, serde_json::to_string(&vec![&stale]).unwrap()).unwrap();

        // TTL 200h: the stale record survives the load filter...
        let store = FileStore::load(&path, 200).await.unwrap();
        assert_eq!(store.stats().await.unwrap().total, 1);
        // ...then a shorter-TTL store would have purged it. Simulate expiry
        // by purging against the record's own age.
        let removed = store.purge_expired().await.unwrap();
        assert_eq!(removed, 0); // still inside 200h

        let short = FileStore::load(&path, 48).await.unwrap();
        assert_eq!(short.stats().await.unwrap().total, 0);
    }
}
