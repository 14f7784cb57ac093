//! Create, edit and delete flows for content items.
//!
//! Media is always uploaded before the document write. A failed write
//! discards the blobs uploaded for it; blobs replaced by an edit are only
//! deleted once the new document is stored. Nothing is retried.

pub mod error;

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};

use crate::document::model::CREATED_AT;
use crate::document::validate::{validate_fields, ValidationError};
use crate::document::{Collection, ContentDocument, DocumentId};
use crate::events::bus::EventBus;
use crate::events::types::{ContentEvent, MutationEvent};
use crate::media::{self, MediaError, MediaSlot, MediaUpload};
use crate::mutation::{CreateRequest, MutationAction, UpdateRequest};
use crate::pagination::{Page, PageInfo, PageRequest};
use crate::search::{self, SearchHit};
use crate::storage::ObjectStore;
use crate::store::{DocumentStore, Filter, OrderBy, Query};
use crate::youtube;

pub use error::{RemoteError, ServiceError};
use error::{remote_error, RemoteResultExt};

/// Default cap on a single uploaded file.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct ServiceSettings {
    pub max_upload_bytes: usize,
    pub search_limit_per_collection: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            search_limit_per_collection: search::DEFAULT_LIMIT_PER_COLLECTION,
        }
    }
}

#[derive(Clone)]
pub struct ContentService {
    store: Arc<dyn DocumentStore>,
    objects: Arc<dyn ObjectStore>,
    events: EventBus,
    settings: ServiceSettings,
}

impl ContentService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStore>,
        events: EventBus,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            store,
            objects,
            events,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub async fn get(
        &self,
        collection: Collection,
        id: &DocumentId,
    ) -> Result<ContentDocument, ServiceError> {
        self.store
            .get(collection, id)
            .await
            .or_remote("load", collection.label())?
            .ok_or_else(|| ServiceError::not_found(collection, id))
    }

    /// Newest first, optionally restricted to documents carrying `tag`.
    pub async fn list(
        &self,
        collection: Collection,
        page: PageRequest,
        tag: Option<&str>,
    ) -> Result<Page<ContentDocument>, ServiceError> {
        let page = page.clamped();
        let filters: Vec<Filter> = tag
            .map(|t| Filter::array_contains("tags", t.trim()))
            .into_iter()
            .collect();

        let total = self
            .store
            .count(collection, &filters)
            .await
            .or_remote("load", collection.label())?;

        let mut query = Query::new(collection)
            .order_by(OrderBy::desc(CREATED_AT))
            .limit(u64::from(page.per_page))
            .offset(page.offset());
        query.filters = filters;
        let items = self
            .store
            .list(&query)
            .await
            .or_remote("load", collection.label())?;

        Ok(Page {
            items,
            page_info: PageInfo::new(page, total),
        })
    }

    /// Search titles across every searchable collection.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ServiceError> {
        if search::normalize_query(query).is_empty() {
            return Ok(Vec::new());
        }

        let mut candidates = Vec::new();
        for collection in Collection::ALL.into_iter().filter(Collection::searchable) {
            let q = Query::new(collection)
                .order_by(OrderBy::desc(CREATED_AT))
                .limit(self.settings.search_limit_per_collection as u64);
            let docs = self
                .store
                .list(&q)
                .await
                .or_remote("load", "search results")?;
            candidates.extend(docs);
        }

        let hits = search::filter_and_rank(query, &candidates);
        tracing::debug!(
            candidates = candidates.len(),
            hits = hits.len(),
            "search complete"
        );
        Ok(hits)
    }

    pub async fn create(
        &self,
        collection: Collection,
        request: CreateRequest,
    ) -> Result<ContentDocument, ServiceError> {
        let verb = MutationAction::Created.verb();
        let mut fields = validate_fields(collection, &request.fields)?;
        self.check_uploads(collection, &request.uploads)?;
        check_required_media(collection, &fields, &request.uploads)?;

        let uploaded = self
            .upload_all(collection, &request.uploads, &mut fields, verb)
            .await?;
        apply_youtube(collection, &mut fields);

        let doc = ContentDocument::new(collection, fields);
        if let Err(e) = self.store.insert(&doc).await {
            self.discard(&uploaded).await;
            return Err(remote_error(verb, collection.label(), e));
        }

        tracing::info!(
            collection = %collection,
            id = %doc.id,
            uploads = uploaded.len(),
            "created document"
        );
        self.announce(collection, &doc.id, MutationAction::Created);
        Ok(doc)
    }

    pub async fn update(
        &self,
        collection: Collection,
        id: &DocumentId,
        request: UpdateRequest,
    ) -> Result<ContentDocument, ServiceError> {
        let verb = MutationAction::Updated.verb();
        let mut doc = self.get(collection, id).await?;

        let mut merged = doc.fields.clone();
        merged.extend(request.fields);
        let mut fields = validate_fields(collection, &merged)?;

        let allowed = media::allowed_slots(collection);
        for slot in allowed {
            for name in [slot.url_field(), slot.path_field()] {
                if let Some(v) = doc.fields.get(name) {
                    fields.insert(name.to_string(), v.clone());
                }
            }
        }

        self.check_uploads(collection, &request.uploads)?;
        if let Some(slot) = request.remove_media.iter().find(|s| !allowed.contains(s)) {
            return Err(MediaError::SlotNotAllowed {
                label: collection.label(),
                slot: *slot,
            }
            .into());
        }

        let mut stale = Vec::new();
        let cleared = request
            .remove_media
            .iter()
            .copied()
            .chain(request.uploads.iter().map(|u| u.slot));
        for slot in cleared {
            fields.remove(slot.url_field());
            if let Some(Value::String(path)) = fields.remove(slot.path_field()) {
                stale.push(path);
            }
        }
        check_required_media(collection, &fields, &request.uploads)?;

        let uploaded = self
            .upload_all(collection, &request.uploads, &mut fields, verb)
            .await?;
        apply_youtube(collection, &mut fields);

        doc.fields = fields;
        doc.updated_at = Utc::now();
        match self.store.update(&doc).await {
            Ok(true) => {}
            Ok(false) => {
                self.discard(&uploaded).await;
                return Err(ServiceError::not_found(collection, id));
            }
            Err(e) => {
                self.discard(&uploaded).await;
                return Err(remote_error(verb, collection.label(), e));
            }
        }
        self.discard(&stale).await;

        tracing::info!(
            collection = %collection,
            id = %id,
            replaced = stale.len(),
            "updated document"
        );
        self.announce(collection, id, MutationAction::Updated);
        Ok(doc)
    }

    /// Delete a document and its blobs, and the collection's storage folder
    /// once no documents remain. Once the document row is gone the delete
    /// has happened, so later cleanup failures are only logged.
    pub async fn delete(
        &self,
        collection: Collection,
        id: &DocumentId,
    ) -> Result<(), ServiceError> {
        let verb = MutationAction::Deleted.verb();
        let doc = self.get(collection, id).await?;

        let existed = self
            .store
            .delete(collection, id)
            .await
            .or_remote(verb, collection.label())?;
        if !existed {
            return Err(ServiceError::not_found(collection, id));
        }

        self.discard(&doc.media_paths()).await;
        self.remove_folder_if_empty(collection).await;

        tracing::info!(collection = %collection, id = %id, "deleted document");
        self.announce(collection, id, MutationAction::Deleted);
        Ok(())
    }

    async fn remove_folder_if_empty(&self, collection: Collection) {
        let remaining = match self.store.count(collection, &[]).await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(
                    collection = %collection,
                    error = %e,
                    "failed to count remaining documents, keeping storage folder"
                );
                return;
            }
        };
        if remaining > 0 {
            return;
        }
        match self.objects.remove_folder(collection.storage_folder()).await {
            Ok(()) => {
                tracing::info!(
                    collection = %collection,
                    "collection empty, removed storage folder"
                );
            }
            Err(e) => {
                tracing::warn!(
                    collection = %collection,
                    error = %e,
                    "failed to remove storage folder"
                );
            }
        }
    }

    fn check_uploads(
        &self,
        collection: Collection,
        uploads: &[MediaUpload],
    ) -> Result<(), MediaError> {
        for (i, upload) in uploads.iter().enumerate() {
            upload.check(collection, self.settings.max_upload_bytes)?;
            if uploads[..i].iter().any(|u| u.slot == upload.slot) {
                return Err(MediaError::DuplicateSlot(upload.slot));
            }
        }
        Ok(())
    }

    /// Upload every file, recording its URL and key in `fields`. On failure
    /// the files already uploaded by this call are removed again.
    async fn upload_all(
        &self,
        collection: Collection,
        uploads: &[MediaUpload],
        fields: &mut Map<String, Value>,
        verb: &'static str,
    ) -> Result<Vec<String>, ServiceError> {
        let mut keys = Vec::with_capacity(uploads.len());
        for upload in uploads {
            let key = media::object_key(collection, upload.slot, &upload.file_name);
            if let Err(e) = self
                .objects
                .put(&key, upload.bytes.clone(), &upload.content_type)
                .await
            {
                self.discard(&keys).await;
                return Err(remote_error(verb, collection.label(), e));
            }
            let url = self.objects.url(&key);
            fields.insert(upload.slot.url_field().to_string(), Value::String(url));
            fields.insert(
                upload.slot.path_field().to_string(),
                Value::String(key.clone()),
            );
            keys.push(key);
        }
        Ok(keys)
    }

    /// Best-effort blob removal; failures are logged and left behind.
    async fn discard(&self, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.objects.delete(key).await {
                tracing::warn!(key = %key, error = %e, "failed to delete blob");
            }
        }
    }

    fn announce(&self, collection: Collection, id: &DocumentId, action: MutationAction) {
        let delivered = self.events.publish(ContentEvent::Mutation(MutationEvent::now(
            collection,
            id.clone(),
            action,
        )));
        tracing::trace!(delivered, "published content event");
    }
}

fn has_slot(fields: &Map<String, Value>, uploads: &[MediaUpload], slot: MediaSlot) -> bool {
    fields.contains_key(slot.path_field()) || uploads.iter().any(|u| u.slot == slot)
}

fn check_required_media(
    collection: Collection,
    fields: &Map<String, Value>,
    uploads: &[MediaUpload],
) -> Result<(), ValidationError> {
    if collection == Collection::Videos {
        if fields.contains_key("youtubeUrl") || has_slot(fields, uploads, MediaSlot::Video) {
            return Ok(());
        }
        return Err(ValidationError::single(
            "video",
            "provide a YouTube URL or upload a video",
        ));
    }

    let required = media::required_any_of(collection);
    if required.is_empty() || required.iter().any(|slot| has_slot(fields, uploads, *slot)) {
        return Ok(());
    }
    let names: Vec<_> = required.iter().map(MediaSlot::as_str).collect();
    Err(ValidationError::single(
        required[0].as_str(),
        format!("upload required: {}", names.join(" or ")),
    ))
}

/// Keep `youtubeId` and the YouTube poster frame in step with `youtubeUrl`.
/// An uploaded thumbnail takes precedence over the poster frame.
fn apply_youtube(collection: Collection, fields: &mut Map<String, Value>) {
    if collection != Collection::Videos {
        return;
    }
    let uploaded_thumbnail = fields.contains_key(MediaSlot::Thumbnail.path_field());
    let id = fields
        .get("youtubeUrl")
        .and_then(Value::as_str)
        .and_then(youtube::extract_youtube_id);
    match id {
        Some(id) => {
            if !uploaded_thumbnail {
                fields.insert(
                    MediaSlot::Thumbnail.url_field().to_string(),
                    Value::String(youtube::thumbnail_url(&id)),
                );
            }
            fields.insert("youtubeId".to_string(), Value::String(id));
        }
        None => {
            fields.remove("youtubeId");
            if !uploaded_thumbnail {
                fields.remove(MediaSlot::Thumbnail.url_field());
            }
        }
    }
}

#[cfg(test)]
mod tests;
