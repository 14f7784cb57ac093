use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::{Collection, DocumentId};
use crate::mutation::MutationAction;

/// Events emitted after successful mutations, forwarded to listeners.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ContentEvent {
    Welcome,
    Mutation(MutationEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationEvent {
    pub collection: Collection,
    pub document_id: DocumentId,
    pub action: MutationAction,
    pub timestamp: DateTime<Utc>,
}

impl MutationEvent {
    pub fn now(collection: Collection, document_id: DocumentId, action: MutationAction) -> Self {
        Self {
            collection,
            document_id,
            action,
            timestamp: Utc::now(),
        }
    }
}
