//! Per-tab history state with a page cache.
//!
//! Each [`HistoryTab`] keeps its own filters, current page and cache of
//! fetched pages. The cache is keyed by [`CacheKey`] (tab, normalized
//! filters, page, page size) and is dropped wholesale whenever the filters
//! actually change or the tab is refreshed.

use crate::api::StudioApi;
use crate::{StoreError, WorkflowError};
use atelier_core::{
    CacheKey, HistoryFilters, HistoryPage, HistoryQuery, HistoryRow, HistoryTab,
    DEFAULT_PAGE_SIZE,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockWriteGuard};

#[derive(Debug, Clone, PartialEq)]
pub struct TabState {
    pub filters: HistoryFilters,
    pub page: u32,
    pub page_size: u32,
    pub search_text: String,
    pub rows: Vec<HistoryRow>,
    pub total: u64,
    pub has_fetched: bool,
    pub error: Option<String>,
    cache: HashMap<CacheKey, HistoryPage>,
}

impl Default for TabState {
    fn default() -> Self {
        Self {
            filters: HistoryFilters::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            search_text: String::new(),
            rows: Vec::new(),
            total: 0,
            has_fetched: false,
            error: None,
            cache: HashMap::new(),
        }
    }
}

impl TabState {
    pub fn query(&self, tab: HistoryTab) -> HistoryQuery {
        HistoryQuery::new(tab, &self.filters, self.page, self.page_size)
    }

    pub fn cached_pages(&self) -> usize {
        self.cache.len()
    }

    pub fn total_pages(&self) -> u64 {
        let size = u64::from(self.page_size.max(1));
        self.total.div_ceil(size).max(1)
    }

    fn search(&self) -> Option<&str> {
        Some(self.search_text.trim()).filter(|text| !text.is_empty())
    }

    fn apply(&mut self, page: &HistoryPage) {
        self.rows = page.rows.clone();
        self.total = page.total;
        self.has_fetched = true;
        self.error = None;
    }
}

pub struct HistoryStore {
    api: Arc<dyn StudioApi>,
    tabs: RwLock<HashMap<HistoryTab, TabState>>,
}

impl HistoryStore {
    pub fn new(api: Arc<dyn StudioApi>) -> Self {
        Self {
            api,
            tabs: RwLock::new(HashMap::new()),
        }
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<HistoryTab, TabState>>, StoreError> {
        self.tabs.write().map_err(|_| StoreError::LockPoisoned)
    }

    fn with_tab<R>(&self, tab: HistoryTab, f: impl FnOnce(&mut TabState) -> R) -> Result<R, StoreError> {
        let mut tabs = self.write()?;
        Ok(f(tabs.entry(tab).or_default()))
    }

    /// Snapshot of one tab.
    pub fn state(&self, tab: HistoryTab) -> Result<TabState, StoreError> {
        let tabs = self.tabs.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(tabs.get(&tab).cloned().unwrap_or_default())
    }

    /// Replace the tab's filters. Returns `true` when they changed, in which
    /// case the cache is dropped and the tab goes back to page one.
    pub fn set_filters(&self, tab: HistoryTab, filters: HistoryFilters) -> Result<bool, StoreError> {
        let filters = filters.normalized();
        self.with_tab(tab, |state| {
            if state.filters.normalized() == filters {
                return false;
            }
            tracing::debug!(tab = tab.as_str(), "history filters changed, dropping cache");
            state.filters = filters;
            state.page = 1;
            state.cache.clear();
            true
        })
    }

    /// Reset filters and search, drop the cache and fetch the first page.
    pub async fn clear_filters(&self, tab: HistoryTab) -> Result<HistoryPage, WorkflowError> {
        self.with_tab(tab, |state| {
            state.filters = HistoryFilters::default();
            state.search_text.clear();
            state.page = 1;
            state.cache.clear();
        })?;
        self.fetch(tab, true).await
    }

    pub fn set_page(&self, tab: HistoryTab, page: u32) -> Result<(), StoreError> {
        self.with_tab(tab, |state| state.page = page.max(1))
    }

    pub fn set_search_text(&self, tab: HistoryTab, text: &str) -> Result<(), StoreError> {
        self.with_tab(tab, |state| {
            state.search_text = text.to_string();
            state.page = 1;
        })
    }

    /// Drop the cache and refetch the current page.
    pub async fn refresh(&self, tab: HistoryTab) -> Result<HistoryPage, WorkflowError> {
        self.with_tab(tab, |state| state.cache.clear())?;
        self.fetch(tab, true).await
    }

    /// Load the current page of `tab`.
    ///
    /// Served from the cache when the query was seen before, unless `force`
    /// is set. Similarity searches always go to the backend. The lock is not
    /// held across the request, and a response for a query the tab no longer
    /// shows is cached but not applied.
    pub async fn fetch(&self, tab: HistoryTab, force: bool) -> Result<HistoryPage, WorkflowError> {
        let (query, search) = {
            let mut tabs = self.write()?;
            let state = tabs.entry(tab).or_default();
            let query = state.query(tab);
            let search = state.search().map(str::to_string);
            if search.is_none() && !force {
                if let Some(page) = state.cache.get(&query).cloned() {
                    tracing::debug!(tab = tab.as_str(), page = query.page, "history cache hit");
                    state.apply(&page);
                    return Ok(page);
                }
            }
            (query, search)
        };

        let response = match &search {
            Some(text) => self
                .api
                .search_history(&query, text)
                .await
                .map(HistoryPage::from),
            None => self.api.fetch_history(&query).await,
        };

        let mut tabs = self.write()?;
        let state = tabs.entry(tab).or_default();
        // Filters, page or search may have moved on while the request was out.
        let current = state.query(tab) == query && state.search() == search.as_deref();
        match response {
            Ok(page) => {
                tracing::debug!(tab = tab.as_str(), page = query.page, rows = page.rows.len(), current, "history page fetched");
                if search.is_none() {
                    state.cache.insert(query, page.clone());
                }
                if current {
                    state.apply(&page);
                }
                Ok(page)
            }
            Err(err) => {
                tracing::warn!(tab = tab.as_str(), error = %err, "history fetch failed");
                if current {
                    state.error = Some(err.to_string());
                }
                Err(err.into())
            }
        }
    }
}
