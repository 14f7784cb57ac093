//! Document database adapter.
//!
//! [`DocumentStore`] covers the handful of operations the site performs
//! against its hosted document database: keyed reads and writes plus simple
//! equality/range/order queries within one collection.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::Value;

use crate::document::{Collection, ContentDocument, DocumentId};

pub use memory::InMemoryDocumentStore;
pub use postgres::PgDocumentStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document {0} already exists")]
    Duplicate(DocumentId),
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored row is invalid: {0}")]
    InvalidRow(String),
    #[error("stored document is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
    /// The field is an array holding the value.
    ArrayContains,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn array_contains(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::ArrayContains, value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// A query against a single collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: Collection,
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<u64>,
    pub offset: u64,
}

impl Query {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            order_by: None,
            limit: None,
            offset: 0,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by = Some(order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Write a new document. Fails with [`StoreError::Duplicate`] if the id
    /// is taken.
    async fn insert(&self, doc: &ContentDocument) -> Result<(), StoreError>;

    async fn get(
        &self,
        collection: Collection,
        id: &DocumentId,
    ) -> Result<Option<ContentDocument>, StoreError>;

    /// Replace the fields and `updated_at` of an existing document.
    /// Returns `false` if it does not exist.
    async fn update(&self, doc: &ContentDocument) -> Result<bool, StoreError>;

    /// Returns `false` if the document did not exist.
    async fn delete(&self, collection: Collection, id: &DocumentId) -> Result<bool, StoreError>;

    async fn list(&self, query: &Query) -> Result<Vec<ContentDocument>, StoreError>;

    async fn count(&self, collection: Collection, filters: &[Filter]) -> Result<u64, StoreError>;

    /// Cheap reachability check.
    async fn ping(&self) -> Result<(), StoreError>;
}
