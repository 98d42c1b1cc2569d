use crate::cache::CatalogCache;
use crate::catalog::{CatalogSource, FetchError, RawProductRow};
use crate::debounce::Debouncer;
use crate::product::{normalize, Product};
use rand::seq::SliceRandom;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};

/// Window in which rapid successive background-refresh triggers (listing and
/// detail page loads racing each other) collapse into a single fetch.
const REFRESH_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Serialize)]
pub struct CategoryCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct CatalogSummary {
    pub total_products: usize,
    pub categories: Vec<CategoryCount>,
}

/// Owner of the normalized catalog. The application shell constructs one
/// store and hands it to the view layer; every change bumps a revision that
/// subscribers observe over a watch channel.
pub struct CatalogStore {
    products: RwLock<Vec<Product>>,
    load_error: RwLock<Option<String>>,
    generation: AtomicU64,
    revision: watch::Sender<u64>,
    refresh_debounce: Debouncer,
    source: CatalogSource,
    cache: CatalogCache,
}

impl CatalogStore {
    pub fn new(source: CatalogSource, cache: CatalogCache) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            products: RwLock::new(vec![]),
            load_error: RwLock::new(None),
            generation: AtomicU64::new(0),
            revision,
            refresh_debounce: Debouncer::new(REFRESH_DEBOUNCE),
            source,
            cache,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn publish(&self) {
        self.revision.send_modify(|r| *r += 1);
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Installs a fetched dataset unless a newer fetch started meanwhile;
    /// the stale result is discarded whole, its cache write included. The
    /// products write lock is held across the check so installs serialize.
    async fn install(&self, generation: u64, rows: Vec<RawProductRow>, write_cache: bool) -> usize {
        let mut slot = self.products.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            log::debug!("Discarding catalog fetch superseded by a newer one");
            return 0;
        }
        if write_cache {
            self.cache.write(&rows);
        }
        let products = normalize(rows);
        let count = products.len();
        *slot = products;
        *self.load_error.write().await = None;
        self.publish();
        count
    }

    /// Initial load: a warm cache serves immediately and a refresh runs in
    /// the background; a cold cache goes through the full fetch chain.
    pub async fn load(self: &Arc<Self>) -> Result<(), FetchError> {
        if let Some(rows) = self.cache.read() {
            let generation = self.next_generation();
            self.install(generation, rows, false).await;
            self.schedule_background_refresh();
            return Ok(());
        }
        self.refresh().await.map(|_| ())
    }

    /// Fetches through the source chain, caches the raw rows, and installs
    /// the normalized catalog. Returns the number of installed products.
    pub async fn refresh(&self) -> Result<usize, FetchError> {
        let generation = self.next_generation();
        let rows = match self.source.fetch().await {
            Ok(rows) => rows,
            Err(err) => {
                *self.load_error.write().await = Some(err.to_string());
                return Err(err);
            }
        };
        Ok(self.install(generation, rows, true).await)
    }

    /// Force sync: drops the cache entry first, then refetches.
    pub async fn force_refresh(&self) -> Result<usize, FetchError> {
        self.cache.clear();
        self.refresh().await
    }

    /// Fire-and-forget: the outcome only matters for the next page view.
    pub fn schedule_background_refresh(self: &Arc<Self>) {
        let store = self.clone();
        self.refresh_debounce.call(move || async move {
            if let Err(err) = store.refresh().await {
                log::warn!("Background catalog refresh failed: {err}");
            }
        });
    }

    pub async fn products(&self) -> Vec<Product> {
        self.products.read().await.clone()
    }

    pub async fn is_empty(&self) -> bool {
        self.products.read().await.is_empty()
    }

    pub async fn load_error(&self) -> Option<String> {
        self.load_error.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Product> {
        self.products.read().await.iter().find(|p| p.id == id).cloned()
    }

    /// Other size/color/material combinations of the same base item.
    pub async fn variants_of(&self, product: &Product) -> Vec<Product> {
        self.products
            .read()
            .await
            .iter()
            .filter(|p| p.parent_id == product.parent_id && p.id != product.id)
            .cloned()
            .collect()
    }

    /// Up to six suggestions: shuffled same-category products first, padded
    /// with products from other categories.
    pub async fn suggestions_for(&self, product: &Product) -> Vec<Product> {
        let products = self.products.read().await;
        let mut same: Vec<Product> = products
            .iter()
            .filter(|p| p.category == product.category && p.id != product.id)
            .cloned()
            .collect();
        let mut other: Vec<Product> = products
            .iter()
            .filter(|p| p.category != product.category)
            .cloned()
            .collect();
        let mut rng = rand::thread_rng();
        same.shuffle(&mut rng);
        other.shuffle(&mut rng);
        same.into_iter()
            .take(3)
            .chain(other.into_iter().take(3))
            .take(6)
            .collect()
    }

    pub async fn summary(&self) -> CatalogSummary {
        let products = self.products.read().await;
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for p in products.iter() {
            *counts.entry(p.category.clone()).or_default() += 1;
        }
        CatalogSummary {
            total_products: products.len(),
            categories: counts
                .into_iter()
                .map(|(name, count)| CategoryCount { name, count })
                .collect(),
        }
    }
}
