use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::*;
use crate::storage::InMemoryObjectStore;
use crate::store::{InMemoryDocumentStore, StoreError};

struct Harness {
    service: ContentService,
    objects: Arc<InMemoryObjectStore>,
}

fn harness() -> Harness {
    harness_with(50)
}

fn harness_with(search_limit_per_collection: usize) -> Harness {
    let objects = Arc::new(InMemoryObjectStore::new("https://cdn.test"));
    let service = ContentService::new(
        Arc::new(InMemoryDocumentStore::new()),
        objects.clone(),
        EventBus::new(16),
        ServiceSettings {
            max_upload_bytes: 1024,
            search_limit_per_collection,
        },
    );
    Harness { service, objects }
}

fn fields(v: Value) -> Map<String, Value> {
    v.as_object().cloned().unwrap()
}

fn upload(slot: MediaSlot, name: &str, content_type: &str) -> MediaUpload {
    MediaUpload {
        slot,
        file_name: name.to_string(),
        content_type: content_type.to_string(),
        bytes: b"data".to_vec(),
    }
}

fn blog(title: &str) -> CreateRequest {
    CreateRequest {
        fields: fields(json!({
            "title": title,
            "content": "A long enough body of text.",
            "tags": ["water"],
        })),
        uploads: vec![],
    }
}

#[tokio::test]
async fn create_uploads_media_then_writes_document() {
    let h = harness();
    let mut events = h.service.events().subscribe();

    let mut req = blog("Wells for Kibera");
    req.uploads.push(upload(MediaSlot::Image, "cover photo.jpg", "image/jpeg"));
    let doc = h.service.create(Collection::Blogs, req).await.unwrap();

    let path = doc.str_field("imagePath").unwrap().to_string();
    assert!(path.starts_with("blogs/image/"));
    assert!(path.ends_with("-cover_photo.jpg"));
    assert_eq!(doc.str_field("imageUrl").unwrap(), format!("https://cdn.test/{path}"));
    assert_eq!(h.objects.get(&path).unwrap().content_type, "image/jpeg");

    let stored = h.service.get(Collection::Blogs, &doc.id).await.unwrap();
    assert_eq!(stored, doc);

    match events.recv().await.unwrap() {
        ContentEvent::Mutation(ev) => {
            assert_eq!(ev.action, MutationAction::Created);
            assert_eq!(ev.document_id, doc.id);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn invalid_form_writes_nothing() {
    let h = harness();
    let mut req = blog("Hi");
    req.uploads.push(upload(MediaSlot::Image, "a.png", "image/png"));
    let err = h.service.create(Collection::Blogs, req).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(ref v) if v.has_field("title")));
    assert!(h.objects.is_empty());
}

#[tokio::test]
async fn required_media_is_enforced() {
    let h = harness();
    let err = h
        .service
        .create(
            Collection::Pdfs,
            CreateRequest {
                fields: fields(json!({"title": "Annual report"})),
                uploads: vec![],
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(ref v) if v.has_field("pdf")));

    let err = h
        .service
        .create(
            Collection::Videos,
            CreateRequest {
                fields: fields(json!({"title": "Field day"})),
                uploads: vec![],
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(ref v) if v.has_field("video")));
}

#[tokio::test]
async fn rejects_uploads_for_wrong_slot_or_type() {
    let h = harness();
    let mut req = blog("Wells for Kibera");
    req.uploads.push(upload(MediaSlot::Pdf, "a.pdf", "application/pdf"));
    assert!(matches!(
        h.service.create(Collection::Blogs, req).await,
        Err(ServiceError::Media(MediaError::SlotNotAllowed { .. }))
    ));

    let mut req = blog("Wells for Kibera");
    req.uploads.push(upload(MediaSlot::Image, "a.png", "image/png"));
    req.uploads.push(upload(MediaSlot::Image, "b.png", "image/png"));
    assert!(matches!(
        h.service.create(Collection::Blogs, req).await,
        Err(ServiceError::Media(MediaError::DuplicateSlot(MediaSlot::Image)))
    ));
    assert!(h.objects.is_empty());
}

#[tokio::test]
async fn youtube_video_gets_id_and_poster() {
    let h = harness();
    let doc = h
        .service
        .create(
            Collection::Videos,
            CreateRequest {
                fields: fields(json!({
                    "title": "Field day",
                    "youtubeUrl": "https://youtu.be/dQw4w9WgXcQ",
                })),
                uploads: vec![],
            },
        )
        .await
        .unwrap();
    assert_eq!(doc.str_field("youtubeId"), Some("dQw4w9WgXcQ"));
    assert_eq!(
        doc.str_field("thumbnailUrl"),
        Some("https://img.youtube.com/vi/dQw4w9WgXcQ/hqdefault.jpg")
    );

    // Switching to an uploaded video with a captured frame drops the link data.
    let updated = h
        .service
        .update(
            Collection::Videos,
            &doc.id,
            UpdateRequest {
                fields: fields(json!({"youtubeUrl": null})),
                uploads: vec![
                    upload(MediaSlot::Video, "clip.mp4", "video/mp4"),
                    upload(MediaSlot::Thumbnail, "frame.jpg", "image/jpeg"),
                ],
                remove_media: vec![],
            },
        )
        .await
        .unwrap();
    assert!(updated.fields.get("youtubeId").is_none());
    assert!(updated.fields.get("youtubeUrl").is_none());
    assert!(updated
        .str_field("thumbnailPath")
        .unwrap()
        .starts_with("videos/thumbnail/"));
    assert_eq!(h.objects.len(), 2);
}

#[tokio::test]
async fn update_replaces_and_removes_media() {
    let h = harness();
    let doc = h
        .service
        .create(
            Collection::Banners,
            CreateRequest {
                fields: fields(json!({"title": "Give today"})),
                uploads: vec![upload(MediaSlot::Image, "old.png", "image/png")],
            },
        )
        .await
        .unwrap();
    let old_path = doc.str_field("imagePath").unwrap().to_string();

    let updated = h
        .service
        .update(
            Collection::Banners,
            &doc.id,
            UpdateRequest {
                fields: fields(json!({"link": "https://example.org/give"})),
                uploads: vec![upload(MediaSlot::Image, "new.png", "image/png")],
                remove_media: vec![],
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title(), Some("Give today"));
    assert_eq!(updated.str_field("link"), Some("https://example.org/give"));
    assert_eq!(updated.created_at, doc.created_at);
    assert!(updated.updated_at >= doc.updated_at);
    let new_path = updated.str_field("imagePath").unwrap().to_string();
    assert_ne!(new_path, old_path);
    assert!(h.objects.get(&old_path).is_none());
    assert!(h.objects.get(&new_path).is_some());

    // A banner needs an image or a video, so removing the only image fails.
    let err = h
        .service
        .update(
            Collection::Banners,
            &doc.id,
            UpdateRequest {
                remove_media: vec![MediaSlot::Image],
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
    assert!(h.objects.get(&new_path).is_some());
}

#[tokio::test]
async fn update_can_drop_optional_media() {
    let h = harness();
    let doc = h
        .service
        .create(
            Collection::TeamMembers,
            CreateRequest {
                fields: fields(json!({
                    "name": "Amara",
                    "role": "Director",
                    "bio": "Leads programs in the field.",
                })),
                uploads: vec![upload(MediaSlot::Image, "amara.jpg", "image/jpeg")],
            },
        )
        .await
        .unwrap();

    let updated = h
        .service
        .update(
            Collection::TeamMembers,
            &doc.id,
            UpdateRequest {
                remove_media: vec![MediaSlot::Image],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(updated.fields.get("imageUrl").is_none());
    assert!(updated.fields.get("imagePath").is_none());
    assert!(h.objects.is_empty());
}

#[tokio::test]
async fn update_missing_document_is_not_found() {
    let h = harness();
    let err = h
        .service
        .update(Collection::Blogs, &DocumentId::generate(), UpdateRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
    assert_eq!(err.user_message(), "Blog not found.");
}

#[tokio::test]
async fn delete_removes_blobs_and_empty_folder() {
    let h = harness();
    let a = h
        .service
        .create(
            Collection::Photos,
            CreateRequest {
                fields: fields(json!({"title": "Harvest"})),
                uploads: vec![upload(MediaSlot::Image, "a.jpg", "image/jpeg")],
            },
        )
        .await
        .unwrap();
    let b = h
        .service
        .create(
            Collection::Photos,
            CreateRequest {
                fields: fields(json!({"title": "Market"})),
                uploads: vec![upload(MediaSlot::Image, "b.jpg", "image/jpeg")],
            },
        )
        .await
        .unwrap();
    // A stray object in the folder that no document references.
    h.objects
        .put("photos/image/orphan.jpg", vec![1], "image/jpeg")
        .await
        .unwrap();

    h.service.delete(Collection::Photos, &a.id).await.unwrap();
    assert!(h.objects.get(a.str_field("imagePath").unwrap()).is_none());
    assert_eq!(h.objects.list("photos").await.unwrap().len(), 2);

    h.service.delete(Collection::Photos, &b.id).await.unwrap();
    assert!(h.objects.list("photos").await.unwrap().is_empty());

    assert!(matches!(
        h.service.delete(Collection::Photos, &b.id).await,
        Err(ServiceError::NotFound { .. })
    ));
}

#[tokio::test]
async fn list_pages_newest_first_and_filters_tags() {
    let h = harness();
    for title in ["First story", "Second story", "Third story"] {
        h.service.create(Collection::FeatureStories, blog(title)).await.unwrap();
    }
    let mut other = blog("School roof");
    other.fields.insert("tags".into(), json!(["school"]));
    h.service.create(Collection::FeatureStories, other).await.unwrap();

    let page = h
        .service
        .list(Collection::FeatureStories, PageRequest::new(1, 2), None)
        .await
        .unwrap();
    assert_eq!(page.page_info.total, 4);
    assert_eq!(page.page_info.total_pages, 2);
    let titles: Vec<_> = page.items.iter().filter_map(|d| d.title()).collect();
    assert_eq!(titles, vec!["School roof", "Third story"]);

    let tagged = h
        .service
        .list(Collection::FeatureStories, PageRequest::default(), Some("school"))
        .await
        .unwrap();
    assert_eq!(tagged.items.len(), 1);
    assert_eq!(tagged.page_info.total, 1);
}

#[tokio::test]
async fn search_spans_collections() {
    let h = harness();
    h.service.create(Collection::Blogs, blog("Back to school")).await.unwrap();
    h.service
        .create(
            Collection::TeamMembers,
            CreateRequest {
                fields: fields(json!({
                    "name": "School liaison Ana",
                    "role": "Liaison",
                    "bio": "Works with head teachers.",
                })),
                uploads: vec![],
            },
        )
        .await
        .unwrap();
    h.service
        .create(
            Collection::Tags,
            CreateRequest {
                fields: fields(json!({"name": "school"})),
                uploads: vec![],
            },
        )
        .await
        .unwrap();

    let hits = h.service.search("  SCHOOL ").await.unwrap();
    let titles: Vec<_> = hits.iter().map(|h| h.title.as_str()).collect();
    assert_eq!(titles, vec!["School liaison Ana", "Back to school"]);
    assert!(h.service.search("   ").await.unwrap().is_empty());
}

#[tokio::test]
async fn search_reads_only_the_newest_per_collection() {
    let h = harness_with(1);
    h.service.create(Collection::Blogs, blog("School garden")).await.unwrap();
    h.service.create(Collection::Blogs, blog("New school wing")).await.unwrap();
    h.service.create(Collection::FeatureStories, blog("School meals")).await.unwrap();

    let hits = h.service.search("school").await.unwrap();
    let titles: Vec<_> = hits.iter().map(|h| h.title.as_str()).collect();
    assert_eq!(titles, vec!["School meals", "New school wing"]);
}

/// In-memory store whose writes or counts can be switched to fail.
#[derive(Default)]
struct FlakyStore {
    inner: InMemoryDocumentStore,
    fail_writes: AtomicBool,
    fail_count: AtomicBool,
}

impl FlakyStore {
    fn check(flag: &AtomicBool) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            return Err(StoreError::InvalidQuery("connection reset".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn insert(&self, doc: &ContentDocument) -> Result<(), StoreError> {
        Self::check(&self.fail_writes)?;
        self.inner.insert(doc).await
    }
    async fn get(
        &self,
        collection: Collection,
        id: &DocumentId,
    ) -> Result<Option<ContentDocument>, StoreError> {
        self.inner.get(collection, id).await
    }
    async fn update(&self, doc: &ContentDocument) -> Result<bool, StoreError> {
        Self::check(&self.fail_writes)?;
        self.inner.update(doc).await
    }
    async fn delete(&self, collection: Collection, id: &DocumentId) -> Result<bool, StoreError> {
        Self::check(&self.fail_writes)?;
        self.inner.delete(collection, id).await
    }
    async fn list(&self, query: &Query) -> Result<Vec<ContentDocument>, StoreError> {
        self.inner.list(query).await
    }
    async fn count(&self, collection: Collection, filters: &[Filter]) -> Result<u64, StoreError> {
        Self::check(&self.fail_count)?;
        self.inner.count(collection, filters).await
    }
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

struct FlakyHarness {
    service: ContentService,
    store: Arc<FlakyStore>,
    objects: Arc<InMemoryObjectStore>,
}

fn flaky_harness() -> FlakyHarness {
    let store = Arc::new(FlakyStore::default());
    let objects = Arc::new(InMemoryObjectStore::default());
    let service = ContentService::new(
        store.clone(),
        objects.clone(),
        EventBus::new(4),
        ServiceSettings::default(),
    );
    FlakyHarness {
        service,
        store,
        objects,
    }
}

#[tokio::test]
async fn failed_write_discards_new_uploads() {
    let h = flaky_harness();
    h.store.fail_writes.store(true, Ordering::SeqCst);

    let mut req = blog("Wells for Kibera");
    req.uploads.push(upload(MediaSlot::Image, "a.png", "image/png"));
    let err = h.service.create(Collection::Blogs, req).await.unwrap_err();

    assert!(matches!(err, ServiceError::Remote { .. }));
    assert_eq!(err.user_message(), "Failed to create blog. Please try again.");
    assert!(h.objects.is_empty());
}

#[tokio::test]
async fn failed_update_keeps_old_media() {
    let h = flaky_harness();
    let mut req = blog("Wells for Kibera");
    req.uploads.push(upload(MediaSlot::Image, "old.png", "image/png"));
    let doc = h.service.create(Collection::Blogs, req).await.unwrap();
    let old_path = doc.str_field("imagePath").unwrap().to_string();

    h.store.fail_writes.store(true, Ordering::SeqCst);
    let err = h
        .service
        .update(
            Collection::Blogs,
            &doc.id,
            UpdateRequest {
                uploads: vec![upload(MediaSlot::Image, "new.png", "image/png")],
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.user_message(), "Failed to update blog. Please try again.");
    assert_eq!(h.objects.len(), 1);
    assert!(h.objects.get(&old_path).is_some());
    let stored = h.service.get(Collection::Blogs, &doc.id).await.unwrap();
    assert_eq!(stored.str_field("imagePath"), Some(old_path.as_str()));
}

#[tokio::test]
async fn delete_succeeds_when_remaining_count_fails() {
    let h = flaky_harness();
    let mut req = blog("Wells for Kibera");
    req.uploads.push(upload(MediaSlot::Image, "a.png", "image/png"));
    let doc = h.service.create(Collection::Blogs, req).await.unwrap();
    h.objects
        .put("blogs/image/orphan.png", vec![1], "image/png")
        .await
        .unwrap();
    let mut events = h.service.events().subscribe();

    h.store.fail_count.store(true, Ordering::SeqCst);
    h.service.delete(Collection::Blogs, &doc.id).await.unwrap();

    assert!(h.store.inner.get(Collection::Blogs, &doc.id).await.unwrap().is_none());
    assert!(h.objects.get(doc.str_field("imagePath").unwrap()).is_none());
    // The folder is only removed once the store confirms it is empty.
    assert!(h.objects.get("blogs/image/orphan.png").is_some());
    match events.recv().await.unwrap() {
        ContentEvent::Mutation(ev) => {
            assert_eq!(ev.action, MutationAction::Deleted);
            assert_eq!(ev.document_id, doc.id);
        }
        other => panic!("unexpected event {other:?}"),
    }
}
