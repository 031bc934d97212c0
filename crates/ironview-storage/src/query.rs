//! Read requests against a feature source

use ironview_expr::Filter;
use std::fmt;

/// Direction of a property sort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// One sort term
#[derive(Debug, Clone, PartialEq)]
pub enum SortBy {
    /// The source's natural (identifier) order
    NaturalOrder,
    /// Reverse of the natural order
    ReverseOrder,
    Property { name: String, order: SortOrder },
}

impl SortBy {
    pub fn ascending(name: impl Into<String>) -> Self {
        SortBy::Property {
            name: name.into(),
            order: SortOrder::Ascending,
        }
    }

    pub fn descending(name: impl Into<String>) -> Self {
        SortBy::Property {
            name: name.into(),
            order: SortOrder::Descending,
        }
    }

    /// The sorted property, if any
    pub fn property(&self) -> Option<&str> {
        match self {
            SortBy::Property { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// A read request: which features, which attributes, in what order, which page
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub filter: Filter,
    /// Requested attribute subset, None for all attributes
    pub properties: Option<Vec<String>>,
    pub sort_by: Vec<SortBy>,
    pub max_features: Option<usize>,
    pub start_index: Option<usize>,
}

impl Query {
    /// Every feature, every attribute
    pub fn all() -> Self {
        Query {
            filter: Filter::Include,
            properties: None,
            sort_by: Vec::new(),
            max_features: None,
            start_index: None,
        }
    }

    pub fn filtered(filter: Filter) -> Self {
        Query {
            filter,
            ..Query::all()
        }
    }

    pub fn with_properties<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.properties = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_sort(mut self, sort_by: Vec<SortBy>) -> Self {
        self.sort_by = sort_by;
        self
    }

    pub fn with_max_features(mut self, max: usize) -> Self {
        self.max_features = Some(max);
        self
    }

    pub fn with_start_index(mut self, start: usize) -> Self {
        self.start_index = Some(start);
        self
    }

    /// Offset, treating zero as absent
    pub fn offset(&self) -> Option<usize> {
        self.start_index.filter(|&s| s > 0)
    }

    /// Whether the result is paged (offset or max count)
    pub fn is_paged(&self) -> bool {
        self.offset().is_some() || self.max_features.is_some()
    }
}

impl Default for Query {
    fn default() -> Self {
        Query::all()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "filter={}", self.filter)?;
        if let Some(props) = &self.properties {
            write!(f, " properties=[{}]", props.join(", "))?;
        }
        if !self.sort_by.is_empty() {
            write!(f, " sort={:?}", self.sort_by)?;
        }
        if let Some(start) = self.start_index {
            write!(f, " start={}", start)?;
        }
        if let Some(max) = self.max_features {
            write!(f, " max={}", max)?;
        }
        Ok(())
    }
}

/// Result of a count request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Count {
    Exact(u64),
    /// The source cannot count cheaply
    Unknown,
}

impl Count {
    pub fn exact(&self) -> Option<u64> {
        match self {
            Count::Exact(n) => Some(*n),
            Count::Unknown => None,
        }
    }
}
