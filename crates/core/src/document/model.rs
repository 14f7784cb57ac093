use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Collection, DocumentId};
use crate::media::MediaSlot;

/// Field name addressing the creation timestamp in queries.
pub const CREATED_AT: &str = "createdAt";
/// Field name addressing the update timestamp in queries.
pub const UPDATED_AT: &str = "updatedAt";

/// A content item as stored in the document database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDocument {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    #[serde(rename = "_collection")]
    pub collection: Collection,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    /// Descriptive fields, media URLs/paths and tags.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ContentDocument {
    pub fn new(collection: Collection, fields: Map<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            id: DocumentId::generate(),
            collection,
            created_at: now,
            updated_at: now,
            fields,
        }
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Display title (`title`, or `name` for people and tags).
    pub fn title(&self) -> Option<&str> {
        self.str_field(self.collection.title_field())
    }

    pub fn tags(&self) -> Vec<&str> {
        match self.fields.get("tags") {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Storage keys of every blob the document references.
    pub fn media_paths(&self) -> Vec<String> {
        MediaSlot::ALL
            .iter()
            .filter_map(|slot| self.str_field(slot.path_field()))
            .map(str::to_string)
            .collect()
    }
}
