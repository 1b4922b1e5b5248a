use crate::cache::{
    ImageCache, PlayerHeroCache, TtlCache, IMAGE_CACHE_MAX_ENTRIES, PLAYER_CACHE_MAX_ENTRIES,
};
use crate::config::Config;
use crate::snapshot::Snapshot;
use liquipedia_scraper::LiquipediaScraper;
use logger::EventLogger;
use opendota_client::OpenDotaClient;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Sdílený stav serveru; Clone je levný (jen Arc)
#[derive(Clone)]
pub struct DashState {
    pub config:        Arc<Config>,
    pub snapshot:      Arc<RwLock<Option<Arc<Snapshot>>>>,
    pub opendota:      Arc<OpenDotaClient>,
    pub wiki:          Arc<LiquipediaScraper>,
    pub player_heroes: Arc<PlayerHeroCache>,
    pub images:        Arc<ImageCache>,
    pub logger:        Arc<EventLogger>,
    refreshing:        Arc<AtomicBool>,
}

impl DashState {
    pub fn new(config: Config) -> Self {
        let opendota = OpenDotaClient::new(
            &config.log_dir,
            config.opendota_base_url.clone(),
            config.api_key.clone(),
        );
        let wiki = LiquipediaScraper::new(&config.log_dir, config.liquipedia_url.clone());
        Self::with_clients(config, opendota, wiki)
    }

    pub fn with_clients(config: Config, opendota: OpenDotaClient, wiki: LiquipediaScraper) -> Self {
        Self {
            player_heroes: Arc::new(TtlCache::new(config.player_heroes_ttl, PLAYER_CACHE_MAX_ENTRIES)),
            images:        Arc::new(TtlCache::new(config.image_ttl, IMAGE_CACHE_MAX_ENTRIES)),
            logger:        Arc::new(EventLogger::new(&config.log_dir)),
            snapshot:      Arc::new(RwLock::new(None)),
            opendota:      Arc::new(opendota),
            wiki:          Arc::new(wiki),
            refreshing:    Arc::new(AtomicBool::new(false)),
            config:        Arc::new(config),
        }
    }

    pub async fn current_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.snapshot.read().await.clone()
    }

    /// None = full refresh už běží
    pub fn try_begin_refresh(&self) -> Option<RefreshGuard> {
        self.refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RefreshGuard { flag: Arc::clone(&self.refreshing) })
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }
}

/// Drží příznak "refresh běží"; uvolní ho při dropu (i při panice v cyklu)
pub struct RefreshGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
