//! Query predicates for document and identity listings

/// A query predicate accepted by platform list operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Field equals value exactly.
    Equal(String, String),
    /// Case-insensitive substring search on a field.
    Search(String, String),
    /// Maximum number of results to return.
    Limit(usize),
    /// Order results by a field, descending. The platform bookkeeping
    /// field `$createdAt` orders by creation time.
    OrderDesc(String),
}

impl Query {
    /// Equality predicate.
    pub fn equal(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equal(field.into(), value.into())
    }

    /// Search predicate.
    pub fn search(field: impl Into<String>, term: impl Into<String>) -> Self {
        Self::Search(field.into(), term.into())
    }

    /// Result limit.
    pub fn limit(limit: usize) -> Self {
        Self::Limit(limit)
    }

    /// Descending order predicate.
    pub fn order_desc(field: impl Into<String>) -> Self {
        Self::OrderDesc(field.into())
    }
}
