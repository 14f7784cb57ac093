/// Requests accepted by the create and edit flows.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::DocumentId;
use crate::media::{MediaSlot, MediaUpload};

#[derive(Debug, Clone, Default)]
pub struct CreateRequest {
    pub fields: Map<String, Value>,
    pub uploads: Vec<MediaUpload>,
}

/// Edit of an existing document.
///
/// `fields` are merged over the stored fields; a slot listed in
/// `remove_media` is cleared and its blob deleted, and an upload for a slot
/// replaces whatever was there.
#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    pub fields: Map<String, Value>,
    pub uploads: Vec<MediaUpload>,
    pub remove_media: Vec<MediaSlot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationAction {
    Created,
    Updated,
    Deleted,
}

impl MutationAction {
    /// Verb used in user-facing failure messages.
    pub fn verb(&self) -> &'static str {
        match self {
            MutationAction::Created => "create",
            MutationAction::Updated => "update",
            MutationAction::Deleted => "delete",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationResult {
    pub id: DocumentId,
    pub action: MutationAction,
}
