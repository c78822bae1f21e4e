use shared::{
    domain::{ColumnSet, Post, PostField, SortOrder},
    protocol::ListPostsQuery,
};

use crate::{config::NEW_SORT_FIELD_ORDER, error::GatewayError};

/// What slice of the collection the user is looking at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub page: u32,
    pub page_size: u32,
    pub sort_by: PostField,
    pub sort_order: SortOrder,
    pub search: String,
    pub visible_columns: ColumnSet,
}

impl ViewState {
    pub fn to_query(&self) -> ListPostsQuery {
        ListPostsQuery::new(
            self.page,
            self.page_size,
            self.sort_by,
            self.sort_order,
            &self.search,
        )
    }

    pub(crate) fn apply_sort(&mut self, field: PostField) {
        if self.sort_by == field {
            self.sort_order = self.sort_order.toggled();
        } else {
            self.sort_by = field;
            self.sort_order = NEW_SORT_FIELD_ORDER;
        }
    }

    pub(crate) fn apply_search(&mut self, search: String) {
        self.search = search;
        self.page = 1;
    }
}

/// Read-only view of the controller handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSnapshot {
    pub view: ViewState,
    pub data: Vec<Post>,
    pub total: u64,
    pub loading: bool,
    pub error: Option<String>,
}

impl TableSnapshot {
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.view.page_size.max(1)))
    }

    pub fn has_previous(&self) -> bool {
        self.view.page > 1
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.view.page) * u64::from(self.view.page_size) < self.total
    }

    /// 1-based numbers of the first and last record on screen.
    pub fn showing_range(&self) -> Option<(u64, u64)> {
        if self.data.is_empty() {
            return None;
        }
        let first = u64::from(self.view.page.saturating_sub(1)) * u64::from(self.view.page_size) + 1;
        Some((first, first + self.data.len() as u64 - 1))
    }

    /// Visible columns in display order.
    pub fn columns(&self) -> impl Iterator<Item = PostField> + '_ {
        self.view.visible_columns.iter().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableEvent {
    StateChanged(TableSnapshot),
    FetchFailed(String),
    WriteFailed(String),
}

/// How a single list request ended from the controller's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    /// A newer request was issued before this one resolved; its response
    /// was dropped.
    Superseded,
    Failed(GatewayError),
    /// Nothing to fetch, for example `next_page` on the last page.
    Skipped,
}
