//! What a source can do with a query on its own

use super::SortBy;

/// Query features a source can honor natively. Anything it cannot honor is
/// stripped from the query before delegation and emulated by the caller.
pub trait QueryCapabilities: Send + Sync {
    /// Skipping the first `start_index` features
    fn supports_offset(&self) -> bool;

    /// Skipping combined with a non-trivial filter
    fn supports_offset_with_filter(&self) -> bool;

    /// Sorting on exactly these terms
    fn supports_sorting(&self, sort_by: &[SortBy]) -> bool;

    /// Feature identifiers are stable across reads
    fn supports_reliable_fid(&self) -> bool;

    /// Callers may choose the identifiers of inserted features
    fn supports_provided_fid(&self) -> bool;
}

/// Fixed capability answers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticCapabilities {
    pub offset: bool,
    pub offset_with_filter: bool,
    /// Attributes the source can sort on, None for any attribute
    pub sortable: Option<Vec<String>>,
    pub sorting: bool,
    pub reliable_fid: bool,
    pub provided_fid: bool,
}

impl StaticCapabilities {
    /// Everything supported
    pub fn full() -> Self {
        StaticCapabilities {
            offset: true,
            offset_with_filter: true,
            sortable: None,
            sorting: true,
            reliable_fid: true,
            provided_fid: true,
        }
    }

    /// Nothing beyond plain filtered reads
    pub fn minimal() -> Self {
        StaticCapabilities {
            offset: false,
            offset_with_filter: false,
            sortable: None,
            sorting: false,
            reliable_fid: false,
            provided_fid: false,
        }
    }

    /// Restrict sorting to the named attributes
    pub fn with_sortable<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sorting = true;
        self.sortable = Some(names.into_iter().map(Into::into).collect());
        self
    }
}

impl Default for StaticCapabilities {
    fn default() -> Self {
        Self::full()
    }
}

impl QueryCapabilities for StaticCapabilities {
    fn supports_offset(&self) -> bool {
        self.offset
    }

    fn supports_offset_with_filter(&self) -> bool {
        self.offset && self.offset_with_filter
    }

    fn supports_sorting(&self, sort_by: &[SortBy]) -> bool {
        if !self.sorting {
            return sort_by.is_empty();
        }
        match &self.sortable {
            None => true,
            Some(names) => sort_by.iter().all(|s| match s.property() {
                Some(p) => names.iter().any(|n| n == p),
                None => true,
            }),
        }
    }

    fn supports_reliable_fid(&self) -> bool {
        self.reliable_fid
    }

    fn supports_provided_fid(&self) -> bool {
        self.provided_fid
    }
}
