//! Search, filter, sort and pagination for the leads table.

use crate::errors::AppError;
use crate::models::{CategoryField, LeadRecord};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Filter value meaning "no filter"; also the first entry of every option list.
pub const ALL_SENTINEL: &str = "all";

/// Page numbers shown by the pager at once.
const PAGE_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    ScoreDesc,
    ScoreAsc,
    IdDesc,
    IdAsc,
}

/// Tri-state personal-loan filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanFilter {
    #[default]
    #[serde(rename = "all")]
    Any,
    #[serde(rename = "yes")]
    HasLoan,
    #[serde(rename = "no")]
    NoLoan,
}

/// Exact-match filter on one categorical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFilter {
    pub field: CategoryField,
    pub value: String,
}

/// Query applied to the full snapshot on every recomputation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    pub search: String,
    pub category_filter: Option<CategoryFilter>,
    pub loan_filter: LoanFilter,
    pub sort: SortKey,
    /// 1-indexed.
    pub page: usize,
    pub page_size: usize,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            search: String::new(),
            category_filter: None,
            loan_filter: LoanFilter::Any,
            sort: SortKey::ScoreDesc,
            page: 1,
            page_size: 10,
        }
    }
}

impl QueryParams {
    /// Rejects a zero page or page size.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.page == 0 {
            return Err(AppError::BadRequest("page must be at least 1".to_string()));
        }
        if self.page_size == 0 {
            return Err(AppError::BadRequest(
                "per_page must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Moves `page` into `[1, total_pages]`.
    pub fn clamp_page(&mut self, total_pages: usize) {
        self.page = self.page.clamp(1, total_pages.max(1));
    }
}

/// One page of the filtered, sorted leads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPage<'a> {
    pub items: Vec<&'a LeadRecord>,
    pub total_count: usize,
    pub total_pages: usize,
    pub page: usize,
    pub page_size: usize,
}

impl QueryPage<'_> {
    /// 1-based positions of the first and last visible rows, `(0, 0)` when nothing matched.
    pub fn showing_range(&self) -> (usize, usize) {
        if self.total_count == 0 || self.items.is_empty() {
            return (0, 0);
        }
        let first = self.page.saturating_sub(1) * self.page_size + 1;
        let last = (first - 1 + self.items.len()).min(self.total_count);
        (first, last)
    }

    /// Page numbers for the pager: the first five, or five centred on the
    /// current page once it is past page 3.
    pub fn page_window(&self) -> Vec<usize> {
        let shift = self.page > 3 && self.total_pages > PAGE_WINDOW;
        (0..PAGE_WINDOW.min(self.total_pages))
            .map(|i| {
                if shift {
                    self.page - 2 + i
                } else {
                    i + 1
                }
            })
            .filter(|&p| p <= self.total_pages)
            .collect()
    }
}

fn matches_search(record: &LeadRecord, needle: &str) -> bool {
    record.id.to_string().contains(needle)
        || record.job.to_lowercase().contains(needle)
        || record.lead_status.as_str().to_lowercase().contains(needle)
}

fn matches_filters(record: &LeadRecord, params: &QueryParams) -> bool {
    if let Some(filter) = &params.category_filter {
        if filter.value != ALL_SENTINEL && filter.field.value(record) != filter.value {
            return false;
        }
    }

    match params.loan_filter {
        LoanFilter::Any => true,
        LoanFilter::HasLoan => record.loan.to_lowercase() == "yes",
        LoanFilter::NoLoan => record.loan.to_lowercase() == "no",
    }
}

fn compare(a: &LeadRecord, b: &LeadRecord, sort: SortKey) -> Ordering {
    match sort {
        SortKey::ScoreDesc => b.score().total_cmp(&a.score()),
        SortKey::ScoreAsc => a.score().total_cmp(&b.score()),
        SortKey::IdDesc => b.id.cmp(&a.id),
        SortKey::IdAsc => a.id.cmp(&b.id),
    }
}

/// Runs search, filters, a stable sort and page slicing, in that order.
///
/// The page is not clamped: a page past the end yields no items.
pub fn run_query<'a>(records: &'a [LeadRecord], params: &QueryParams) -> QueryPage<'a> {
    let needle = if params.search.trim().is_empty() {
        None
    } else {
        Some(params.search.to_lowercase())
    };

    let mut filtered: Vec<&LeadRecord> = records
        .iter()
        .filter(|r| needle.as_deref().map_or(true, |n| matches_search(r, n)))
        .filter(|r| matches_filters(r, params))
        .collect();

    filtered.sort_by(|a, b| compare(a, b, params.sort));

    let page_size = params.page_size.max(1);
    let total_count = filtered.len();
    let total_pages = total_count.div_ceil(page_size).max(1);

    let start = params.page.saturating_sub(1).saturating_mul(page_size);
    let items = filtered
        .into_iter()
        .skip(start)
        .take(page_size)
        .collect();

    QueryPage {
        items,
        total_count,
        total_pages,
        page: params.page,
        page_size,
    }
}

/// Filter options for `field`: "all" first, then each value once in first-seen order.
pub fn distinct_values(records: &[LeadRecord], field: CategoryField) -> Vec<String> {
    let mut values = vec![ALL_SENTINEL.to_string()];
    for record in records {
        let value = field.value(record);
        if !values.iter().any(|v| v == value) {
            values.push(value.to_string());
        }
    }
    values
}
