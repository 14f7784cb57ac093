//! In-memory [`DocumentStore`] for tests and local development.
//!
//! Documents are kept in insertion order behind a `std::sync::RwLock`.
//! Range filters compare numbers numerically and strings lexically;
//! values of different kinds never match.

use std::cmp::Ordering;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{DocumentStore, Filter, FilterOp, Query, StoreError};
use crate::document::model::{CREATED_AT, UPDATED_AT};
use crate::document::{Collection, ContentDocument, DocumentId};

#[derive(Default)]
pub struct InMemoryDocumentStore {
    docs: RwLock<Vec<ContentDocument>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<ContentDocument>> {
        self.docs.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<ContentDocument>> {
        self.docs.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn timestamp(doc: &ContentDocument, field: &str) -> Option<DateTime<Utc>> {
    match field {
        CREATED_AT => Some(doc.created_at),
        UPDATED_AT => Some(doc.updated_at),
        _ => None,
    }
}

fn compare_json(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Total order for sorting: kinds rank like Postgres `jsonb`
/// (null < string < number < bool < array < object), then by value.
fn sort_json(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::String(_) => 1,
            Value::Number(_) => 2,
            Value::Bool(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Ordering of a document's field against a filter value.
fn compare_field(
    doc: &ContentDocument,
    field: &str,
    value: &Value,
) -> Result<Option<Ordering>, StoreError> {
    if let Some(ts) = timestamp(doc, field) {
        let other = value
            .as_str()
            .and_then(|s| s.parse::<DateTime<Utc>>().ok())
            .ok_or_else(|| {
                StoreError::InvalidQuery(format!("{field} needs an RFC 3339 timestamp"))
            })?;
        return Ok(Some(ts.cmp(&other)));
    }
    Ok(doc.fields.get(field).and_then(|v| compare_json(v, value)))
}

fn matches(doc: &ContentDocument, filter: &Filter) -> Result<bool, StoreError> {
    if filter.op == FilterOp::ArrayContains {
        if timestamp(doc, &filter.field).is_some() {
            return Err(StoreError::InvalidQuery(format!(
                "{} is not an array",
                filter.field
            )));
        }
        return Ok(matches!(
            doc.fields.get(&filter.field),
            Some(Value::Array(items)) if items.contains(&filter.value)
        ));
    }
    if filter.op == FilterOp::Eq && timestamp(doc, &filter.field).is_none() {
        return Ok(doc.fields.get(&filter.field) == Some(&filter.value));
    }
    let Some(ord) = compare_field(doc, &filter.field, &filter.value)? else {
        return Ok(false);
    };
    Ok(match filter.op {
        FilterOp::Eq => ord == Ordering::Equal,
        FilterOp::Lt => ord == Ordering::Less,
        FilterOp::Lte => ord != Ordering::Greater,
        FilterOp::Gt => ord == Ordering::Greater,
        FilterOp::Gte => ord != Ordering::Less,
        FilterOp::ArrayContains => false,
    })
}

fn matching(
    docs: &[ContentDocument],
    collection: Collection,
    filters: &[Filter],
) -> Result<Vec<ContentDocument>, StoreError> {
    let mut out = Vec::new();
    for doc in docs.iter().filter(|d| d.collection == collection) {
        let mut keep = true;
        for f in filters {
            if !matches(doc, f)? {
                keep = false;
                break;
            }
        }
        if keep {
            out.push(doc.clone());
        }
    }
    Ok(out)
}

/// Missing values sort after present ones in either direction.
fn order_key_cmp(
    a: &ContentDocument,
    b: &ContentDocument,
    field: &str,
    descending: bool,
) -> Ordering {
    let ord = match (timestamp(a, field), timestamp(b, field)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => match (a.fields.get(field), b.fields.get(field)) {
            (Some(x), Some(y)) => sort_json(x, y),
            (Some(_), None) => return Ordering::Less,
            (None, Some(_)) => return Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    };
    if descending {
        ord.reverse()
    } else {
        ord
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert(&self, doc: &ContentDocument) -> Result<(), StoreError> {
        let mut docs = self.write();
        if docs
            .iter()
            .any(|d| d.collection == doc.collection && d.id == doc.id)
        {
            return Err(StoreError::Duplicate(doc.id.clone()));
        }
        docs.push(doc.clone());
        Ok(())
    }

    async fn get(
        &self,
        collection: Collection,
        id: &DocumentId,
    ) -> Result<Option<ContentDocument>, StoreError> {
        Ok(self
            .read()
            .iter()
            .find(|d| d.collection == collection && &d.id == id)
            .cloned())
    }

    async fn update(&self, doc: &ContentDocument) -> Result<bool, StoreError> {
        let mut docs = self.write();
        match docs
            .iter_mut()
            .find(|d| d.collection == doc.collection && d.id == doc.id)
        {
            Some(existing) => {
                existing.fields = doc.fields.clone();
                existing.updated_at = doc.updated_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, collection: Collection, id: &DocumentId) -> Result<bool, StoreError> {
        let mut docs = self.write();
        let before = docs.len();
        docs.retain(|d| !(d.collection == collection && &d.id == id));
        Ok(docs.len() != before)
    }

    async fn list(&self, query: &Query) -> Result<Vec<ContentDocument>, StoreError> {
        let mut docs = matching(&self.read(), query.collection, &query.filters)?;
        if let Some(order) = &query.order_by {
            // Newest insertions first on ties when descending.
            if order.descending {
                docs.reverse();
            }
            docs.sort_by(|a, b| order_key_cmp(a, b, &order.field, order.descending));
        }
        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        let limit = query
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);
        Ok(docs.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self, collection: Collection, filters: &[Filter]) -> Result<u64, StoreError> {
        Ok(matching(&self.read(), collection, filters)?.len() as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
