//! Tenant-scoped query composition.
//!
//! Callers describe which documents they mean with a [`Selector`]; a
//! [`QueryScope`] conjoins the tenant predicate and turns the selection into
//! backend requests. There is no way to build a query-shaped request that
//! skips the tenant predicate.

use std::marker::PhantomData;

use serde_json::Value;

use search_backend::{DeleteByQueryRequest, SearchRequest, UpdateByQueryRequest};
use search_types::{FieldPath, Filter, SortField, SortOrder, UpdateScript};

/// Predicates, ordering and paging over documents of `T`.
#[derive(Debug, Clone)]
pub struct Selector<T> {
    clauses: Vec<Filter>,
    sort: Vec<SortField>,
    from: Option<usize>,
    size: Option<usize>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Default for Selector<T> {
    fn default() -> Self {
        Self {
            clauses: Vec::new(),
            sort: Vec::new(),
            from: None,
            size: None,
            _entity: PhantomData,
        }
    }
}

impl<T> Selector<T> {
    /// Selects every document of the tenant.
    pub fn new() -> Self {
        Self::default()
    }

    /// Field equals value.
    pub fn term(self, field: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        self.where_filter(Filter::Term {
            field: field.into(),
            value: value.into(),
        })
    }

    /// Field equals any of the values.
    pub fn any_of<V: Into<Value>>(
        self,
        field: impl Into<FieldPath>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.where_filter(Filter::Terms {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    /// Full-text match.
    pub fn matches(self, field: impl Into<FieldPath>, text: impl Into<String>) -> Self {
        self.where_filter(Filter::Match {
            field: field.into(),
            text: text.into(),
        })
    }

    /// Inclusive range; either bound may be open.
    pub fn range(
        self,
        field: impl Into<FieldPath>,
        gte: Option<Value>,
        lte: Option<Value>,
    ) -> Self {
        self.where_filter(Filter::Range {
            field: field.into(),
            gte,
            lte,
        })
    }

    pub fn exists(self, field: impl Into<FieldPath>) -> Self {
        self.where_filter(Filter::Exists {
            field: field.into(),
        })
    }

    /// Drop documents matched by the nested selection.
    pub fn exclude(self, group: impl FnOnce(Selector<T>) -> Selector<T>) -> Self {
        let excluded = group(Selector::new()).filter();
        self.where_filter(excluded.negate())
    }

    /// Require either of two nested selections.
    pub fn or_else(
        self,
        first: impl FnOnce(Selector<T>) -> Selector<T>,
        second: impl FnOnce(Selector<T>) -> Selector<T>,
    ) -> Self {
        let first = first(Selector::new()).filter();
        let second = second(Selector::new()).filter();
        self.where_filter(Filter::Any(vec![first, second]))
    }

    /// Add a prebuilt predicate.
    pub fn where_filter(mut self, filter: Filter) -> Self {
        self.clauses.push(filter);
        self
    }

    pub fn sort(mut self, field: impl Into<FieldPath>, order: SortOrder) -> Self {
        self.sort.push(SortField {
            field: field.into(),
            order,
        });
        self
    }

    pub fn skip(mut self, from: usize) -> Self {
        self.from = Some(from);
        self
    }

    pub fn take(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    /// Conjunction of all predicates; `MatchAll` when there are none.
    pub fn filter(&self) -> Filter {
        self.clauses
            .iter()
            .cloned()
            .fold(Filter::MatchAll, Filter::and)
    }
}

/// Binds selections to one tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryScope {
    tenant_id: i32,
}

impl QueryScope {
    pub fn new(tenant_id: i32) -> Self {
        Self { tenant_id }
    }

    pub fn tenant_id(&self) -> i32 {
        self.tenant_id
    }

    /// `tenantId == tenant AND selection`
    pub fn filter<T>(&self, selector: &Selector<T>) -> Filter {
        Filter::tenant(self.tenant_id).and(selector.filter())
    }

    pub fn search<T>(&self, index: &str, selector: &Selector<T>, only_ids: bool) -> SearchRequest {
        let mut request = SearchRequest::new(index, self.filter(selector));
        request.only_ids = only_ids;
        request.sort = selector.sort.clone();
        request.from = selector.from;
        request.size = selector.size;
        request
    }

    pub fn update_by_query<T>(
        &self,
        index: &str,
        selector: &Selector<T>,
        script: UpdateScript,
        refresh: bool,
    ) -> UpdateByQueryRequest {
        UpdateByQueryRequest {
            index: index.to_string(),
            query: self.filter(selector),
            script,
            refresh,
        }
    }

    pub fn delete_by_query<T>(
        &self,
        index: &str,
        selector: &Selector<T>,
        refresh: bool,
    ) -> DeleteByQueryRequest {
        DeleteByQueryRequest {
            index: index.to_string(),
            query: self.filter(selector),
            refresh,
        }
    }
}
