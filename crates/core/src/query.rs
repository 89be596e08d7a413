//! Table query state and its transport encoding.
//!
//! The client keeps a [`TableState`] and projects it into [`QueryParams`]
//! before every fetch. The server decodes the same parameter names back into a
//! [`ListQuery`]. Both directions live here so the two sides cannot drift.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Page size used when a caller does not pick one.
pub const DEFAULT_PER_PAGE: u32 = 15;

pub const PARAM_PAGE: &str = "page";
pub const PARAM_PER_PAGE: &str = "per_page";
pub const PARAM_SORT: &str = "sort";
pub const PARAM_SEARCH: &str = "search";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(DomainError::invalid_query(format!(
                "sort direction must be asc or desc, got {other:?}"
            ))),
        }
    }
}

/// A single-column sort.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sort {
    pub column: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }

    pub fn asc(column: impl Into<String>) -> Self {
        Self::new(column, SortDirection::Asc)
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self::new(column, SortDirection::Desc)
    }
}

/// Encodes as `<column>:<direction>`.
impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.column, self.direction)
    }
}

/// Parses `<column>:<direction>`; a bare column sorts ascending.
impl FromStr for Sort {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (column, direction) = match s.rsplit_once(':') {
            Some((column, direction)) => (column, direction.parse()?),
            None => (s, SortDirection::Asc),
        };
        let column = column.trim();
        if column.is_empty() {
            return Err(DomainError::invalid_query("sort column is empty"));
        }
        Ok(Sort::new(column, direction))
    }
}

/// User-controlled pagination/sort/search configuration of a list view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableState {
    pub page: u32,
    pub per_page: u32,
    pub sort: Option<Sort>,
    pub search: Option<String>,
}

impl Default for TableState {
    fn default() -> Self {
        Self::new(DEFAULT_PER_PAGE)
    }
}

impl TableState {
    /// Fresh state on page 1. A zero page size is bumped to 1.
    pub fn new(per_page: u32) -> Self {
        Self {
            page: 1,
            per_page: per_page.max(1),
            sort: None,
            search: None,
        }
    }

    /// Serialized identity of the state; a change in key means a refetch.
    pub fn key(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }

    /// `ceil(total / per_page)`; no clamping of the current page is implied.
    pub fn page_count(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.per_page.max(1)))
    }

    /// Project this state plus extra filters into transport parameters.
    pub fn query_params<K, V>(&self, extras: impl IntoIterator<Item = (K, Option<V>)>) -> QueryParams
    where
        K: Into<String>,
        V: ToString,
    {
        QueryParams::encode(self, extras)
    }
}

/// Ordered, transport-agnostic list of string parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    /// Encode `state` and `extras`.
    ///
    /// Order: `page`, `per_page`, `sort`, `search`, then extras in the order
    /// given. `sort` is omitted when absent; `search` when absent or empty.
    /// Extras whose value is `None` are omitted, `Some("")` is kept. An extra
    /// reusing an earlier key replaces that value in place.
    pub fn encode<K, V>(state: &TableState, extras: impl IntoIterator<Item = (K, Option<V>)>) -> Self
    where
        K: Into<String>,
        V: ToString,
    {
        let mut params = QueryParams::default();
        params.set(PARAM_PAGE, state.page.to_string());
        params.set(PARAM_PER_PAGE, state.per_page.to_string());

        if let Some(sort) = &state.sort {
            params.set(PARAM_SORT, sort.to_string());
        }

        if let Some(search) = state.search.as_deref().filter(|s| !s.is_empty()) {
            params.set(PARAM_SEARCH, search);
        }

        for (key, value) in extras {
            if let Some(value) = value {
                params.set(key, value.to_string());
            }
        }

        params
    }

    fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.0
    }

    /// `application/x-www-form-urlencoded` rendering, e.g. `page=1&per_page=15`.
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.0.iter())
            .finish()
    }
}

impl IntoIterator for QueryParams {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// One page of results as seen by a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: u64) -> Self {
        Self { items, total_count }
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::new(Vec::new(), 0)
    }
}

/// Pagination metadata returned alongside list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub last_page: u64,
    pub per_page: u32,
    pub total: u64,
}

impl PageMeta {
    /// `last_page` is never below 1, even for an empty result.
    pub fn new(current_page: u32, per_page: u32, total: u64) -> Self {
        let per_page = per_page.max(1);
        Self {
            current_page,
            last_page: total.div_ceil(u64::from(per_page)).max(1),
            per_page,
            total,
        }
    }
}

/// Wire envelope of a list endpoint: `{"data": [...], "meta": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

impl<T> From<Paginated<T>> for Page<T> {
    fn from(value: Paginated<T>) -> Self {
        Page::new(value.data, value.meta.total)
    }
}

/// Server-side defaults applied when decoding a [`ListQuery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListDefaults {
    pub per_page: u32,
    pub max_per_page: u32,
    pub sort: Sort,
}

impl Default for ListDefaults {
    fn default() -> Self {
        Self {
            per_page: DEFAULT_PER_PAGE,
            max_per_page: 100,
            sort: Sort::desc("created_at"),
        }
    }
}

/// Decoded list request (the server's view of [`QueryParams`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32,
    pub per_page: u32,
    pub sort: Sort,
    pub search: Option<String>,
}

impl ListQuery {
    /// Decode parameter pairs.
    ///
    /// A missing, non-numeric or zero `page` means page 1; a missing or invalid
    /// `per_page` means the default, and it is capped at `max_per_page`. An
    /// unparseable `sort` is an error. Unknown keys are ignored.
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
        defaults: &ListDefaults,
    ) -> DomainResult<Self> {
        let mut query = ListQuery {
            page: 1,
            per_page: defaults.per_page,
            sort: defaults.sort.clone(),
            search: None,
        };

        for (key, value) in pairs {
            match key {
                PARAM_PAGE => {
                    query.page = value.trim().parse::<u32>().ok().filter(|p| *p > 0).unwrap_or(1);
                }
                PARAM_PER_PAGE => {
                    query.per_page = value
                        .trim()
                        .parse::<u32>()
                        .ok()
                        .filter(|p| *p > 0)
                        .unwrap_or(defaults.per_page);
                }
                PARAM_SORT if !value.is_empty() => query.sort = value.parse()?,
                PARAM_SEARCH if !value.is_empty() => query.search = Some(value.to_string()),
                _ => {}
            }
        }

        query.per_page = query.per_page.min(defaults.max_per_page.max(1));
        Ok(query)
    }

    /// Number of records to skip.
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize).saturating_mul(self.per_page as usize)
    }
}
