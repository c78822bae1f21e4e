use std::sync::Arc;

use shared::{
    domain::{ColumnSet, NewPost, Post, PostField, PostId, PostPatch},
    protocol::PostPage,
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    config::{TableConfig, EVENT_CHANNEL_CAPACITY},
    debounce::Debouncer,
    error::GatewayError,
    gateway::PostGateway,
    types::{FetchOutcome, TableEvent, TableSnapshot, ViewState},
};

/// Single owner of the table's view state and of the last page fetched for
/// it. Every mutation goes through the methods below.
///
/// The state lock is never held across a gateway call, so requests can
/// overlap. Each list request carries a sequence number and only the most
/// recently issued one may touch the state when it resolves.
pub struct TableController {
    gateway: Arc<dyn PostGateway>,
    config: TableConfig,
    inner: Mutex<TableState>,
    events: broadcast::Sender<TableEvent>,
}

struct TableState {
    view: ViewState,
    result: PostPage,
    loading: bool,
    error: Option<String>,
    latest_seq: u64,
}

impl TableState {
    fn snapshot(&self) -> TableSnapshot {
        TableSnapshot {
            view: self.view.clone(),
            data: self.result.data.clone(),
            total: self.result.total,
            loading: self.loading,
            error: self.error.clone(),
        }
    }
}

impl TableController {
    pub fn new(gateway: Arc<dyn PostGateway>, config: TableConfig) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            gateway,
            inner: Mutex::new(TableState {
                view: config.initial_view(),
                result: PostPage::default(),
                loading: false,
                error: None,
                latest_seq: 0,
            }),
            config,
            events,
        })
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<TableEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> TableSnapshot {
        self.inner.lock().await.snapshot()
    }

    /// Initial fetch for a freshly mounted view.
    pub async fn load(&self) -> FetchOutcome {
        self.fetch_with("load", |_| {}).await
    }

    /// Re-issues the current view unchanged, e.g. after a write elsewhere.
    pub async fn refetch(&self) -> FetchOutcome {
        self.fetch_with("refetch", |_| {}).await
    }

    /// Pages past the end are allowed and come back empty.
    pub async fn set_page(&self, page: u32) -> FetchOutcome {
        let page = page.max(1);
        self.fetch_with("page", move |view| view.page = page).await
    }

    pub async fn next_page(&self) -> FetchOutcome {
        let snapshot = self.snapshot().await;
        if !snapshot.has_next() {
            return FetchOutcome::Skipped;
        }
        self.set_page(snapshot.view.page + 1).await
    }

    pub async fn previous_page(&self) -> FetchOutcome {
        let snapshot = self.snapshot().await;
        if !snapshot.has_previous() {
            return FetchOutcome::Skipped;
        }
        self.set_page(snapshot.view.page - 1).await
    }

    pub async fn set_page_size(&self, page_size: u32) -> FetchOutcome {
        let page_size = page_size.max(1);
        self.fetch_with("page_size", move |view| {
            view.page_size = page_size;
            view.page = 1;
        })
        .await
    }

    pub async fn set_sort(&self, field: PostField) -> FetchOutcome {
        self.fetch_with("sort", move |view| view.apply_sort(field)).await
    }

    /// Prefer [`TableController::search_debouncer`] for keystroke input.
    pub async fn set_search(&self, search: String) -> FetchOutcome {
        self.fetch_with("search", move |view| view.apply_search(search)).await
    }

    /// Presentation only; no request is issued.
    pub async fn set_visible_columns(&self, columns: ColumnSet) {
        let snapshot = {
            let mut state = self.inner.lock().await;
            state.view.visible_columns = columns;
            state.snapshot()
        };
        self.publish(TableEvent::StateChanged(snapshot));
    }

    pub async fn toggle_column(&self, field: PostField) {
        let snapshot = {
            let mut state = self.inner.lock().await;
            let columns = &mut state.view.visible_columns;
            if !columns.remove(&field) {
                columns.insert(field);
            }
            state.snapshot()
        };
        self.publish(TableEvent::StateChanged(snapshot));
    }

    /// Debounced entry point for search text, using the configured delay.
    pub fn search_debouncer(self: &Arc<Self>) -> Debouncer<String> {
        let controller = Arc::clone(self);
        Debouncer::new(self.config.search_debounce, move |search: String| {
            let controller = Arc::clone(&controller);
            async move {
                controller.set_search(search).await;
            }
        })
    }

    pub async fn create(&self, post: NewPost) -> Result<Post, GatewayError> {
        let result = match post.validate() {
            Ok(()) => self.gateway.create(&post).await,
            Err(err) => Err(err.into()),
        };
        self.finish_write("create", result).await
    }

    pub async fn update(&self, post_id: PostId, patch: PostPatch) -> Result<Post, GatewayError> {
        let result = match patch.validate() {
            Ok(()) => self.gateway.update(post_id, &patch).await,
            Err(err) => Err(err.into()),
        };
        self.finish_write("update", result).await
    }

    /// Deleting a missing post is reported as an error, not treated as done.
    pub async fn delete(&self, post_id: PostId) -> Result<(), GatewayError> {
        let result = self.gateway.delete(post_id).await;
        self.finish_write("delete", result).await
    }

    /// Reads a single post without touching table state.
    pub async fn fetch_post(&self, post_id: PostId) -> Result<Post, GatewayError> {
        self.gateway.get(post_id).await
    }

    async fn finish_write<T>(
        &self,
        operation: &'static str,
        result: Result<T, GatewayError>,
    ) -> Result<T, GatewayError> {
        match result {
            Ok(value) => {
                info!(operation, "write confirmed; refreshing table");
                self.refetch().await;
                Ok(value)
            }
            Err(err) => {
                warn!(operation, error = %err, "write failed");
                let message = err.to_string();
                let snapshot = {
                    let mut state = self.inner.lock().await;
                    state.error = Some(message.clone());
                    state.snapshot()
                };
                self.publish(TableEvent::StateChanged(snapshot));
                self.publish(TableEvent::WriteFailed(message));
                Err(err)
            }
        }
    }

    async fn fetch_with<F>(&self, reason: &'static str, mutate: F) -> FetchOutcome
    where
        F: FnOnce(&mut ViewState),
    {
        let (seq, view, snapshot) = {
            let mut state = self.inner.lock().await;
            mutate(&mut state.view);
            state.latest_seq += 1;
            state.loading = true;
            state.error = None;
            (state.latest_seq, state.view.clone(), state.snapshot())
        };
        self.publish(TableEvent::StateChanged(snapshot));
        debug!(
            seq,
            reason,
            page = view.page,
            page_size = view.page_size,
            sort_by = %view.sort_by,
            sort_order = %view.sort_order,
            search = %view.search,
            "issuing list request"
        );

        let result = self.gateway.list(&view).await;

        let mut state = self.inner.lock().await;
        if seq != state.latest_seq {
            debug!(seq, latest = state.latest_seq, "discarding superseded list response");
            return FetchOutcome::Superseded;
        }
        state.loading = false;
        match result {
            Ok(page) => {
                state.result = page;
                let snapshot = state.snapshot();
                drop(state);
                self.publish(TableEvent::StateChanged(snapshot));
                FetchOutcome::Applied
            }
            Err(err) => {
                warn!(seq, error = %err, "list request failed; keeping previous rows");
                let message = err.to_string();
                state.error = Some(message.clone());
                let snapshot = state.snapshot();
                drop(state);
                self.publish(TableEvent::StateChanged(snapshot));
                self.publish(TableEvent::FetchFailed(message));
                FetchOutcome::Failed(err)
            }
        }
    }

    fn publish(&self, event: TableEvent) {
        // No subscribers is normal for headless use.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
