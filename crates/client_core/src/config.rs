//! Named defaults for the table view. Tests build their own `TableConfig`
//! instead of relying on these values.

use std::time::Duration;

use shared::domain::{ColumnSet, PostField, SortOrder};

use crate::types::ViewState;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3001";
pub const API_BASE_URL_ENV: &str = "POSTS_API_URL";
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const DEFAULT_SORT_FIELD: PostField = PostField::LastUpdated;
pub const DEFAULT_SORT_ORDER: SortOrder = SortOrder::Desc;
/// Order applied when sorting switches to a different field.
pub const NEW_SORT_FIELD_ORDER: SortOrder = SortOrder::Asc;
pub const DEFAULT_VISIBLE_COLUMNS: [PostField; 3] =
    [PostField::Title, PostField::Author, PostField::LastUpdated];
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(1000);
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConfig {
    pub page_size: u32,
    pub sort_by: PostField,
    pub sort_order: SortOrder,
    pub visible_columns: ColumnSet,
    pub search_debounce: Duration,
    pub request_timeout: Option<Duration>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            sort_by: DEFAULT_SORT_FIELD,
            sort_order: DEFAULT_SORT_ORDER,
            visible_columns: DEFAULT_VISIBLE_COLUMNS.into_iter().collect(),
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
            request_timeout: None,
        }
    }
}

impl TableConfig {
    pub fn initial_view(&self) -> ViewState {
        ViewState {
            page: 1,
            page_size: self.page_size.max(1),
            sort_by: self.sort_by,
            sort_order: self.sort_order,
            search: String::new(),
            visible_columns: self.visible_columns.clone(),
        }
    }
}
