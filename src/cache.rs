//! Líné TTL cache (hrdinové hráčů, obrázky z wiki)

use anyhow::Result;
use opendota_client::PlayerHero;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    /// Fetch selhal, vracíme prošlou hodnotu
    Stale,
}

impl CacheStatus {
    pub fn as_header(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Stale => "STALE",
        }
    }
}

struct Entry<V> {
    fetched_at: Instant,
    value:      V,
}

pub struct TtlCache<K, V> {
    ttl:         Duration,
    max_entries: usize,
    entries:     RwLock<HashMap<K, Entry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
    V: Clone,
{
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get_fresh(&self, key: &K) -> Option<V> {
        let map = self.entries.read().await;
        map.get(key)
            .filter(|e| e.fetched_at.elapsed() < self.ttl)
            .map(|e| e.value.clone())
    }

    pub async fn insert(&self, key: K, value: V) {
        let mut map = self.entries.write().await;

        if !map.contains_key(&key) && map.len() >= self.max_entries {
            let ttl = self.ttl;
            map.retain(|_, e| e.fetched_at.elapsed() < ttl);

            if map.len() >= self.max_entries {
                let oldest = map
                    .iter()
                    .min_by_key(|(_, e)| e.fetched_at)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    map.remove(&oldest);
                }
            }
        }

        map.insert(key, Entry { fetched_at: Instant::now(), value });
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Čerstvá hodnota z cache, jinak `fetch`. Při chybě fetch se vrátí prošlá hodnota, pokud je.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> Result<(V, CacheStatus)>
    where
        F: FnOnce(K) -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let stale = {
            let map = self.entries.read().await;
            match map.get(&key) {
                Some(e) if e.fetched_at.elapsed() < self.ttl => {
                    return Ok((e.value.clone(), CacheStatus::Hit));
                }
                Some(e) => Some(e.value.clone()),
                None => None,
            }
        };

        match fetch(key.clone()).await {
            Ok(value) => {
                self.insert(key, value.clone()).await;
                Ok((value, CacheStatus::Miss))
            }
            Err(e) => match stale {
                Some(value) => {
                    warn!("Refetch of {:?} failed, serving stale entry: {}", key, e);
                    Ok((value, CacheStatus::Stale))
                }
                None => Err(e),
            },
        }
    }
}

pub type PlayerHeroCache = TtlCache<u64, Arc<Vec<PlayerHero>>>;

#[derive(Debug, Clone)]
pub struct CachedImage {
    pub bytes:        Arc<Vec<u8>>,
    pub content_type: String,
}

pub type ImageCache = TtlCache<String, CachedImage>;

/// Obrázků z wiki může být hodně, hrdinů hráčů méně
pub const IMAGE_CACHE_MAX_ENTRIES: usize = 2_000;
pub const PLAYER_CACHE_MAX_ENTRIES: usize = 500;
