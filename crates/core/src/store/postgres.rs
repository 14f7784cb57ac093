//! PostgreSQL [`DocumentStore`].
//!
//! Documents live in `content_documents` keyed by `(collection, id)`, with
//! fields in a JSONB column. Field filters use JSONB comparison, so numbers
//! compare numerically and strings lexically, as in the in-memory store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder, Row};

use super::{DocumentStore, Filter, FilterOp, OrderBy, Query, StoreError};
use crate::document::model::{CREATED_AT, UPDATED_AT};
use crate::document::{Collection, ContentDocument, DocumentId};

const SELECT_COLUMNS: &str =
    "SELECT collection, id, content, created_at, updated_at FROM content_documents";

#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_document(row: &PgRow) -> Result<ContentDocument, StoreError> {
    let collection: String = row.try_get("collection")?;
    let collection = collection
        .parse::<Collection>()
        .map_err(|e| StoreError::InvalidRow(e.to_string()))?;
    let id: String = row.try_get("id")?;
    let id = DocumentId::parse(&id).map_err(|e| StoreError::InvalidRow(e.to_string()))?;
    let Json(fields): Json<Map<String, Value>> = row.try_get("content")?;
    Ok(ContentDocument {
        id,
        collection,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        fields,
    })
}

fn timestamp_column(field: &str) -> Option<&'static str> {
    match field {
        CREATED_AT => Some("created_at"),
        UPDATED_AT => Some("updated_at"),
        _ => None,
    }
}

fn comparison(op: FilterOp) -> &'static str {
    match op {
        FilterOp::Eq => " = ",
        FilterOp::Lt => " < ",
        FilterOp::Lte => " <= ",
        FilterOp::Gt => " > ",
        FilterOp::Gte => " >= ",
        FilterOp::ArrayContains => " @> ",
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &[Filter]) -> Result<(), StoreError> {
    for filter in filters {
        qb.push(" AND ");
        if let Some(column) = timestamp_column(&filter.field) {
            if filter.op == FilterOp::ArrayContains {
                return Err(StoreError::InvalidQuery(format!("{} is not an array", filter.field)));
            }
            let ts = filter
                .value
                .as_str()
                .and_then(|s| s.parse::<DateTime<Utc>>().ok())
                .ok_or_else(|| {
                    StoreError::InvalidQuery(format!(
                        "{} needs an RFC 3339 timestamp",
                        filter.field
                    ))
                })?;
            qb.push(column).push(comparison(filter.op)).push_bind(ts);
            continue;
        }

        let value = match filter.op {
            FilterOp::ArrayContains => Value::Array(vec![filter.value.clone()]),
            _ => filter.value.clone(),
        };
        qb.push("content -> ")
            .push_bind(filter.field.clone())
            .push(comparison(filter.op))
            .push_bind(Json(value));
    }
    Ok(())
}

fn push_order(qb: &mut QueryBuilder<'_, Postgres>, order: &OrderBy) {
    let direction = if order.descending {
        " DESC NULLS LAST"
    } else {
        " ASC NULLS LAST"
    };
    qb.push(" ORDER BY ");
    match timestamp_column(&order.field) {
        Some(column) => {
            qb.push(column);
        }
        None => {
            qb.push("content -> ").push_bind(order.field.clone());
        }
    }
    qb.push(direction).push(", id");
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(&self, doc: &ContentDocument) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO content_documents (collection, id, content, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5) ON CONFLICT DO NOTHING",
        )
        .bind(doc.collection.as_str())
        .bind(doc.id.as_str())
        .bind(Json(&doc.fields))
        .bind(doc.created_at)
        .bind(doc.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Duplicate(doc.id.clone()));
        }
        Ok(())
    }

    async fn get(
        &self,
        collection: Collection,
        id: &DocumentId,
    ) -> Result<Option<ContentDocument>, StoreError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE collection = $1 AND id = $2"))
            .bind(collection.as_str())
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_document).transpose()
    }

    async fn update(&self, doc: &ContentDocument) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE content_documents SET content = $3, updated_at = $4 \
             WHERE collection = $1 AND id = $2",
        )
        .bind(doc.collection.as_str())
        .bind(doc.id.as_str())
        .bind(Json(&doc.fields))
        .bind(doc.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, collection: Collection, id: &DocumentId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM content_documents WHERE collection = $1 AND id = $2")
            .bind(collection.as_str())
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, query: &Query) -> Result<Vec<ContentDocument>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_COLUMNS);
        qb.push(" WHERE collection = ")
            .push_bind(query.collection.as_str());
        push_filters(&mut qb, &query.filters)?;
        if let Some(order) = &query.order_by {
            push_order(&mut qb, order);
        }
        if let Some(limit) = query.limit {
            qb.push(" LIMIT ").push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if query.offset > 0 {
            qb.push(" OFFSET ")
                .push_bind(i64::try_from(query.offset).unwrap_or(i64::MAX));
        }

        tracing::debug!(collection = %query.collection, sql = qb.sql(), "listing documents");
        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_document).collect()
    }

    async fn count(&self, collection: Collection, filters: &[Filter]) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM content_documents WHERE collection = ",
        );
        qb.push_bind(collection.as_str());
        push_filters(&mut qb, filters)?;
        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_filtered_ordered_sql() {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_COLUMNS);
        qb.push(" WHERE collection = ").push_bind("blogs");
        push_filters(
            &mut qb,
            &[
                Filter::array_contains("tags", "water"),
                Filter::new(CREATED_AT, FilterOp::Gte, "2024-01-01T00:00:00Z"),
            ],
        )
        .unwrap();
        push_order(&mut qb, &OrderBy::desc(CREATED_AT));

        assert_eq!(
            qb.sql(),
            "SELECT collection, id, content, created_at, updated_at FROM content_documents \
             WHERE collection = $1 AND content -> $2 @> $3 AND created_at >= $4 \
             ORDER BY created_at DESC NULLS LAST, id"
        );
    }

    #[test]
    fn rejects_bad_timestamp_filters() {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_COLUMNS);
        let err = push_filters(&mut qb, &[Filter::array_contains(UPDATED_AT, "x")]).unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuery(_)));

        let mut qb = QueryBuilder::<Postgres>::new(SELECT_COLUMNS);
        let err = push_filters(&mut qb, &[Filter::new(CREATED_AT, FilterOp::Lt, 5)]).unwrap_err();
        assert!(matches!(err, StoreError::InvalidQuery(_)));
    }
}
