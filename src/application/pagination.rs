//! Offset pagination: filter normalization and page metadata.

use serde::{Deserialize, Serialize};

use crate::application::repos::UserFilter;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 10_000;
pub const DEFAULT_SORT_FIELD: &str = "name";

/// Columns a listing may be ordered by.
pub const SORTABLE_FIELDS: &[&str] = &["name", "email", "age", "created_at", "updated_at"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Case-insensitive `asc`/`desc`; anything else falls back to ascending.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(value) if value.eq_ignore_ascii_case("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// A [`UserFilter`] with every paging and ordering field resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedFilter {
    pub name: Option<String>,
    pub email: Option<String>,
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
    pub page: i64,
    pub page_size: i64,
    pub sort_by: &'static str,
    pub sort_dir: SortDirection,
}

impl NormalizedFilter {
    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl From<&UserFilter> for NormalizedFilter {
    fn from(filter: &UserFilter) -> Self {
        let page = filter.page.max(1);
        let page_size = if filter.page_size < 1 {
            DEFAULT_PAGE_SIZE
        } else {
            filter.page_size.min(MAX_PAGE_SIZE)
        };

        let requested = filter
            .sort_by
            .as_deref()
            .map(str::trim)
            .map(str::to_ascii_lowercase);
        let sort_by = requested
            .as_deref()
            .and_then(|field| SORTABLE_FIELDS.iter().copied().find(|known| *known == field))
            .unwrap_or(DEFAULT_SORT_FIELD);

        Self {
            name: non_blank(filter.name.as_deref()),
            email: non_blank(filter.email.as_deref()),
            min_age: filter.min_age.filter(|age| *age > 0),
            max_age: filter.max_age.filter(|age| *age > 0),
            page,
            page_size,
            sort_by,
            sort_dir: SortDirection::parse_lenient(filter.sort_dir.as_deref()),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Page metadata returned next to a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: i64,
    pub page_size: i64,
    pub current_elements: i64,
    pub total_pages: i64,
    pub total_elements: i64,
    pub sort_by: String,
    pub sort_dir: String,
}

impl Pagination {
    pub fn new(filter: &NormalizedFilter, current_elements: usize, total_elements: i64) -> Self {
        Self {
            current_page: filter.page,
            page_size: filter.page_size,
            current_elements: i64::try_from(current_elements).unwrap_or(i64::MAX),
            total_pages: total_pages(total_elements, filter.page_size),
            total_elements,
            sort_by: filter.sort_by.to_string(),
            sort_dir: filter.sort_dir.as_sql().to_string(),
        }
    }
}

/// `ceil(total / page_size)`, never less than one.
pub fn total_pages(total_elements: i64, page_size: i64) -> i64 {
    if page_size < 1 || total_elements < 1 {
        return 1;
    }
    let full = total_elements / page_size;
    let pages = if total_elements % page_size == 0 {
        full
    } else {
        full + 1
    };
    pages.max(1)
}

/// One page of results with its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, pagination: Pagination) -> Self {
        Self { items, pagination }
    }
}
