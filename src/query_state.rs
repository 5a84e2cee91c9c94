use std::fmt;

/// Sort used when a table is constructed without one.
pub const DEFAULT_SORT: &str = "endedAt,desc";

/// Filter keys every measurement query knows about, in wire order.
pub const KNOWN_FILTERS: [&str; 5] = ["startedAt", "endedAt", "method", "name", "elapsed"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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

    /// Unknown directions fall back to `desc`, the backend's default.
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => SortDirection::Asc,
            _ => SortDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Parses `"field,dir"`. Returns `None` when the field part is empty.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.splitn(2, ',');
        let field = parts.next().unwrap_or("").trim();
        if field.is_empty() {
            return None;
        }
        let direction = parts
            .next()
            .map(SortDirection::parse)
            .unwrap_or(SortDirection::Desc);
        Some(Self::new(field, direction))
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        Self::new("endedAt", SortDirection::Desc)
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.field, self.direction.as_str())
    }
}

/// Scalar filter value. "No constraint" is expressed as `None` around it.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Int(v) => write!(f, "{}", v),
            FilterValue::Float(v) => write!(f, "{}", v),
            FilterValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Float(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

/// Ordered filter mapping. Keys keep their first-insertion position so the
/// outbound query string is stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    entries: Vec<(String, Option<FilterValue>)>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters with every known measurement key declared and unset.
    pub fn with_known_keys() -> Self {
        Self {
            entries: KNOWN_FILTERS.iter().map(|k| (k.to_string(), None)).collect(),
        }
    }

    /// Builder-style insert, mostly for callers assembling a partial update.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.set(key, Some(value.into()));
        self
    }

    /// Builder-style removal of a constraint (the key is kept, set to null).
    pub fn without(mut self, key: impl Into<String>) -> Self {
        self.set(key, None);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: Option<FilterValue>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_ref())
    }

    /// Whether the key is present at all, even if it holds null.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn merge(&mut self, partial: Filters) {
        for (key, value) in partial.entries {
            self.set(key, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&FilterValue>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, Option<V>)> for Filters
where
    K: Into<String>,
    V: Into<FilterValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        let mut filters = Filters::new();
        for (key, value) in iter {
            filters.set(key, value.map(Into::into));
        }
        filters
    }
}

/// Every parameter that determines one page request.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    skip: usize,
    limit: usize,
    sort: SortSpec,
    filters: Filters,
}

impl QueryState {
    /// A zero page size is replaced by 1 so `limit > 0` always holds.
    pub fn new(page_size: usize, sort: SortSpec) -> Self {
        Self {
            skip: 0,
            limit: page_size.max(1),
            sort,
            filters: Filters::with_known_keys(),
        }
    }

    pub fn skip(&self) -> usize {
        self.skip
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn sort(&self) -> &SortSpec {
        &self.sort
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn current_page(&self) -> usize {
        self.skip / self.limit
    }

    /// Selects `field`: re-selecting the ascending field flips it to
    /// descending, anything else starts ascending.
    pub fn set_sort(&mut self, field: &str) {
        let direction = if self.sort.field == field && self.sort.direction == SortDirection::Asc {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        };
        self.sort = SortSpec::new(field, direction);
        self.skip = 0;
    }

    /// Replaces the sort outright, e.g. from a `"field,dir"` default.
    pub fn set_sort_spec(&mut self, sort: SortSpec) {
        self.sort = sort;
        self.skip = 0;
    }

    pub fn set_filters(&mut self, partial: Filters) {
        self.filters.merge(partial);
        self.skip = 0;
    }

    /// Returns `false` (state untouched) for a zero size.
    pub fn set_page_size(&mut self, size: usize) -> bool {
        if size == 0 {
            return false;
        }
        self.limit = size;
        self.skip = 0;
        true
    }

    /// Returns `false` (state untouched) when the page's records would not
    /// fit in a `usize`.
    pub fn set_page(&mut self, page: usize) -> bool {
        match page
            .checked_mul(self.limit)
            .filter(|skip| skip.checked_add(self.limit).is_some())
        {
            Some(skip) => {
                self.skip = skip;
                true
            }
            None => false,
        }
    }

    /// Query parameters for a request asking for `limit` rows. Null filters
    /// are left out.
    pub fn query_pairs(&self, limit: usize) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("skip".to_string(), self.skip.to_string()),
            ("limit".to_string(), limit.to_string()),
            ("sort".to_string(), self.sort.to_string()),
        ];
        pairs.extend(
            self.filters
                .iter()
                .filter_map(|(k, v)| v.map(|v| (k.to_string(), v.to_string()))),
        );
        pairs
    }
}

impl Default for QueryState {
    fn default() -> Self {
        Self::new(25, SortSpec::default())
    }
}
