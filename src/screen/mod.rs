//! List-screen state: the fetch → render → act → refetch cycle shared by
//! every resource.

pub mod browse;
pub mod debounce;

use tracing::{debug, info};

use crate::api::{ApiClient, ApiError, ListQuery, Resource};
use crate::model::{ListPage, Record};
use crate::pagination::{clamp_page, Pager, PaginationState};

pub use debounce::{debounce, DEFAULT_DEBOUNCE};

#[derive(Clone, Debug)]
pub struct ListScreen {
    resource: Resource,
    page: usize,
    search: Option<String>,
    records: Vec<Record>,
    total_pages: usize,
    last_error: Option<String>,
}

impl ListScreen {
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            page: 1,
            search: None,
            records: Vec::new(),
            total_pages: 1,
            last_error: None,
        }
    }

    pub fn with_page(mut self, page: usize) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn with_search(mut self, search: Option<String>) -> Self {
        self.search = normalize_search(search.as_deref());
        self
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn query(&self) -> ListQuery {
        ListQuery {
            page: self.page,
            search: self.search.clone(),
        }
    }

    pub fn pagination(&self) -> PaginationState {
        PaginationState::clamped(self.page, self.total_pages)
    }

    /// Store a freshly fetched page.
    pub fn apply(&mut self, page: ListPage) {
        self.total_pages = page.pages.max(1);
        self.page = clamp_page(self.page, self.total_pages);
        self.records = page.result;
        self.last_error = None;
    }

    /// Record a failed fetch. The previous records stay on screen.
    pub fn fail(&mut self, err: &ApiError) {
        self.last_error = Some(err.to_string());
    }

    /// Change the search text. A new search starts again from page 1.
    pub fn set_search(&mut self, search: &str) -> bool {
        let search = normalize_search(Some(search));
        if search == self.search {
            return false;
        }
        self.search = search;
        self.page = 1;
        true
    }

    pub fn go_to(&mut self, page: usize) -> bool {
        let state = self.pagination();
        if page < 1 || page > state.total_pages() || page == state.current_page() {
            return false;
        }
        self.page = page;
        true
    }

    pub fn next(&mut self) -> bool {
        let mut target = None;
        let moved = Pager::new(self.pagination(), |page| target = Some(page)).next();
        if let Some(page) = target {
            self.page = page;
        }
        moved
    }

    pub fn previous(&mut self) -> bool {
        let mut target = None;
        let moved = Pager::new(self.pagination(), |page| target = Some(page)).previous();
        if let Some(page) = target {
            self.page = page;
        }
        moved
    }

    /// Fetch the current page. On failure the error is kept on the screen and
    /// also returned so the caller can show a notice; nothing is retried.
    pub async fn refresh(&mut self, client: &ApiClient) -> Result<(), ApiError> {
        let query = self.query();
        debug!(resource = %self.resource, page = query.page, search = ?query.search, "refreshing list");
        match client.list(self.resource, &query).await {
            Ok(page) => {
                info!(
                    resource = %self.resource,
                    rows = page.result.len(),
                    pages = page.pages,
                    "list loaded"
                );
                self.apply(page);
                Ok(())
            }
            Err(err) => {
                self.fail(&err);
                Err(err)
            }
        }
    }
}

fn normalize_search(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn page_of(ids: &[u64], pages: usize) -> ListPage {
        let result = ids
            .iter()
            .map(|id| serde_json::from_value(json!({ "id": id })).unwrap())
            .collect();
        ListPage { result, pages }
    }

    #[test]
    fn apply_clamps_page_to_new_total() {
        let mut screen = ListScreen::new(Resource::Arrivals).with_page(9);
        screen.apply(page_of(&[1, 2], 4));
        assert_eq!(screen.page(), 4);
        assert_eq!(screen.records().len(), 2);

        screen.apply(page_of(&[], 0));
        assert_eq!(screen.page(), 1);
        assert_eq!(screen.pagination().total_pages(), 1);
    }

    #[test]
    fn failed_fetch_keeps_previous_records() {
        let mut screen = ListScreen::new(Resource::Materials);
        screen.apply(page_of(&[1, 2, 3], 2));
        let err = ApiError::InvalidBaseUrl {
            url: "x".to_string(),
            reason: "test".to_string(),
        };
        screen.fail(&err);
        assert_eq!(screen.records().len(), 3);
        assert!(screen.last_error().unwrap().contains("invalid base URL"));

        screen.apply(page_of(&[4], 2));
        assert!(screen.last_error().is_none());
    }

    #[test]
    fn navigation_respects_edges() {
        let mut screen = ListScreen::new(Resource::Payments);
        screen.apply(page_of(&[1], 3));
        assert!(!screen.previous());
        assert!(screen.next());
        assert!(screen.next());
        assert_eq!(screen.page(), 3);
        assert!(!screen.next());
        assert!(screen.previous());
        assert_eq!(screen.page(), 2);
    }

    #[test]
    fn go_to_rejects_out_of_range_and_current() {
        let mut screen = ListScreen::new(Resource::Expenses);
        screen.apply(page_of(&[1], 5));
        assert!(!screen.go_to(0));
        assert!(!screen.go_to(6));
        assert!(!screen.go_to(1));
        assert!(screen.go_to(5));
        assert_eq!(screen.page(), 5);
    }

    #[test]
    fn new_search_resets_page() {
        let mut screen = ListScreen::new(Resource::Suppliers);
        screen.apply(page_of(&[1], 5));
        screen.go_to(3);
        assert!(screen.set_search(" acme "));
        assert_eq!(screen.page(), 1);
        assert_eq!(screen.search(), Some("acme"));
        assert!(!screen.set_search("acme"));
        assert!(screen.set_search(""));
        assert_eq!(screen.search(), None);
    }
}
