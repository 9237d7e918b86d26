//! Minimal predicate tree for query-shaped operations.
//!
//! This is deliberately not a general query DSL: it covers the predicates
//! callers compose with a tenant filter before searching, updating or
//! deleting by query.

use serde_json::Value;

use crate::field::FieldPath;

/// Field holding the owning tenant on every indexed document.
pub const TENANT_FIELD: &str = "tenantId";

/// A filter predicate over stored documents.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document
    MatchAll,
    /// Exact value equality (array fields match if any element equals)
    Term { field: FieldPath, value: Value },
    /// Equality with any of the values
    Terms { field: FieldPath, values: Vec<Value> },
    /// Full-text match on an analyzed field
    Match { field: FieldPath, text: String },
    /// Inclusive range
    Range {
        field: FieldPath,
        gte: Option<Value>,
        lte: Option<Value>,
    },
    /// Field present and non-null
    Exists { field: FieldPath },
    /// Conjunction
    All(Vec<Filter>),
    /// Disjunction
    Any(Vec<Filter>),
    /// Negation
    Not(Box<Filter>),
}

impl Filter {
    /// `tenantId == tenant_id`
    pub fn tenant(tenant_id: i32) -> Filter {
        Filter::Term {
            field: FieldPath::parse(TENANT_FIELD),
            value: Value::from(tenant_id),
        }
    }

    /// Conjoin two filters, flattening nested conjunctions.
    pub fn and(self, other: Filter) -> Filter {
        match (self, other) {
            (Filter::MatchAll, f) | (f, Filter::MatchAll) => f,
            (Filter::All(mut left), Filter::All(right)) => {
                left.extend(right);
                Filter::All(left)
            }
            (Filter::All(mut left), f) => {
                left.push(f);
                Filter::All(left)
            }
            (f, Filter::All(mut right)) => {
                right.insert(0, f);
                Filter::All(right)
            }
            (a, b) => Filter::All(vec![a, b]),
        }
    }

    /// Negate this filter.
    pub fn negate(self) -> Filter {
        Filter::Not(Box::new(self))
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Sort key for search requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub field: FieldPath,
    pub order: SortOrder,
}
