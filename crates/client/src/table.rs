//! Server-driven table state: paging, sorting, debounced search, and the
//! fetch lifecycle that keeps rows in step with that state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crudstack_core::query::DEFAULT_PER_PAGE;
use crudstack_core::{Page, Sort, TableState};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::columns::next_sort;
use crate::debounce::Debouncer;
use crate::error::ClientError;
use crate::source::PageSource;

pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone)]
pub struct TableOptions {
    pub per_page: u32,
    pub search_debounce: Duration,
    /// Appended after the table parameters on every fetch; `None` values are
    /// left out.
    pub filters: Vec<(String, Option<String>)>,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            per_page: DEFAULT_PER_PAGE,
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
            filters: Vec::new(),
        }
    }
}

impl TableOptions {
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    pub fn search_debounce(mut self, delay: Duration) -> Self {
        self.search_debounce = delay;
        self
    }

    pub fn filter(mut self, key: impl Into<String>, value: Option<&str>) -> Self {
        self.filters.push((key.into(), value.map(str::to_string)));
        self
    }
}

/// Controller for a paginated, sortable, searchable list.
///
/// Every state change that alters the state key issues one fetch. Fetches
/// carry a generation number; a completion is applied only when it is newer
/// than the last applied one, so the most recently issued request wins even
/// if responses arrive out of order.
pub struct TableController<T> {
    shared: Arc<TableShared<T>>,
}

struct TableShared<T> {
    source: Arc<dyn PageSource<T>>,
    filters: Vec<(String, Option<String>)>,
    inner: Mutex<TableInner<T>>,
    revision: watch::Sender<u64>,
}

struct TableInner<T> {
    state: TableState,
    items: Vec<T>,
    total_count: u64,
    last_error: Option<ClientError>,
    search_draft: String,
    last_key: Option<String>,
    issued: u64,
    applied: u64,
    fetches: Vec<JoinHandle<()>>,
    search_debounce: Debouncer,
}

impl<T> TableShared<T> {
    fn lock(&self) -> MutexGuard<'_, TableInner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }
}

impl<T: Clone + Send + Sync + 'static> TableShared<T> {
    fn update_state(self: &Arc<Self>, change: impl FnOnce(&mut TableState) -> bool) {
        let mut inner = self.lock();
        if change(&mut inner.state) {
            self.refresh(&mut inner, false);
        }
    }

    /// Issue a fetch when the state key moved since the last one (or always, with `force`).
    fn refresh(self: &Arc<Self>, inner: &mut TableInner<T>, force: bool) {
        let key = inner.state.key();
        if !force && inner.last_key.as_deref() == Some(key.as_str()) {
            return;
        }
        inner.last_key = Some(key);
        inner.issued += 1;
        let generation = inner.issued;

        let params = inner
            .state
            .query_params(self.filters.iter().map(|(k, v)| (k.as_str(), v.as_deref())));
        tracing::debug!(generation, query = %params.to_query_string(), "fetching table page");

        let source = self.source.clone();
        let table = Arc::downgrade(self);
        inner.fetches.retain(|handle| !handle.is_finished());
        inner.fetches.push(tokio::spawn(async move {
            let result = source.fetch_page(params).await;
            if let Some(table) = table.upgrade() {
                table.complete(generation, result);
            }
        }));
    }

    fn complete(&self, generation: u64, result: Result<Page<T>, ClientError>) {
        let mut inner = self.lock();
        if generation <= inner.applied {
            tracing::debug!(generation, applied = inner.applied, "discarding stale table page");
            return;
        }
        inner.applied = generation;

        match result {
            Ok(page) => {
                inner.items = page.items;
                inner.total_count = page.total_count;
                inner.last_error = None;
            }
            Err(err) => {
                tracing::warn!(generation, error = %err, "table fetch failed; keeping previous rows");
                inner.last_error = Some(err);
            }
        }
        drop(inner);
        self.bump();
    }

    fn commit_search(self: &Arc<Self>, search: Option<String>) {
        let search = search.filter(|s| !s.is_empty());
        let mut inner = self.lock();
        inner.search_draft = search.clone().unwrap_or_default();
        if inner.state.search == search {
            return;
        }
        inner.state.search = search;
        inner.state.page = 1;
        self.refresh(&mut inner, false);
    }
}

impl<T: Clone + Send + Sync + 'static> TableController<T> {
    /// Create the controller and issue the initial fetch.
    pub fn new(source: Arc<dyn PageSource<T>>) -> Self {
        Self::with_options(source, TableOptions::default())
    }

    pub fn with_options(source: Arc<dyn PageSource<T>>, options: TableOptions) -> Self {
        let (revision, _) = watch::channel(0);
        let shared = Arc::new(TableShared {
            source,
            filters: options.filters,
            revision,
            inner: Mutex::new(TableInner {
                state: TableState::new(options.per_page),
                items: Vec::new(),
                total_count: 0,
                last_error: None,
                search_draft: String::new(),
                last_key: None,
                issued: 0,
                applied: 0,
                fetches: Vec::new(),
                search_debounce: Debouncer::new(options.search_debounce),
            }),
        });

        {
            let mut inner = shared.lock();
            shared.refresh(&mut inner, false);
        }
        Self { shared }
    }

    pub fn state(&self) -> TableState {
        self.shared.lock().state.clone()
    }

    /// Rows of the last applied page.
    pub fn items(&self) -> Vec<T> {
        self.shared.lock().items.clone()
    }

    pub fn total_count(&self) -> u64 {
        self.shared.lock().total_count
    }

    pub fn page_count(&self) -> u64 {
        let inner = self.shared.lock();
        inner.state.page_count(inner.total_count)
    }

    /// Uncommitted search text as typed.
    pub fn search_draft(&self) -> String {
        self.shared.lock().search_draft.clone()
    }

    pub fn last_error(&self) -> Option<ClientError> {
        self.shared.lock().last_error.clone()
    }

    /// Whether the most recently issued fetch is still outstanding.
    pub fn is_loading(&self) -> bool {
        let inner = self.shared.lock();
        inner.issued > inner.applied
    }

    /// Receiver that ticks whenever rows or totals change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    /// Jump to `page`. Not clamped to the page count; 0 becomes 1.
    pub fn set_page(&self, page: u32) {
        let page = page.max(1);
        self.shared.update_state(|state| {
            if state.page == page {
                return false;
            }
            state.page = page;
            true
        });
    }

    pub fn set_per_page(&self, per_page: u32) {
        let per_page = per_page.max(1);
        self.shared.update_state(|state| {
            if state.per_page == per_page {
                return false;
            }
            state.per_page = per_page;
            state.page = 1;
            true
        });
    }

    pub fn set_sort(&self, sort: Option<Sort>) {
        self.shared.update_state(|state| {
            if state.sort == sort {
                return false;
            }
            state.sort = sort;
            state.page = 1;
            true
        });
    }

    /// Header click: ascending first, then flip between directions.
    pub fn toggle_sort(&self, column: &str) {
        let next = next_sort(self.shared.lock().state.sort.as_ref(), column);
        self.set_sort(Some(next));
    }

    /// Commit a search right away, dropping any pending typed input.
    /// An empty string counts as no search.
    pub fn set_search(&self, search: Option<String>) {
        self.shared.lock().search_debounce.cancel();
        self.shared.commit_search(search);
    }

    /// Record typed search text; it is committed once input has been quiet
    /// for the debounce delay.
    pub fn input_search(&self, draft: impl Into<String>) {
        let draft = draft.into();
        let table = Arc::downgrade(&self.shared);
        let mut inner = self.shared.lock();
        inner.search_draft = draft.clone();
        inner.search_debounce.schedule(async move {
            if let Some(table) = table.upgrade() {
                table.commit_search(Some(draft));
            }
        });
    }

    /// Refetch the current state even though its key did not change.
    pub fn reload(&self) {
        let mut inner = self.shared.lock();
        self.shared.refresh(&mut inner, true);
    }

    /// Edit the loaded rows locally (e.g. drop a deleted record) without a refetch.
    pub fn update_items(&self, edit: impl FnOnce(&mut Vec<T>)) {
        edit(&mut self.shared.lock().items);
        self.shared.bump();
    }
}

impl<T> Drop for TableController<T> {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        inner.search_debounce.cancel();
        for handle in inner.fetches.drain(..) {
            handle.abort();
        }
    }
}
