use advocacy_core::document::{Collection, ContentDocument, DocumentId};
use advocacy_core::media::{MediaSlot, MediaUpload};
use advocacy_core::mutation::{CreateRequest, MutationAction, MutationResult, UpdateRequest};
use advocacy_core::pagination::{Page, PageRequest};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::auth::Editor;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Content CRUD routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/content/{collection}",
            get(list_documents).post(create_document),
        )
        .route(
            "/v1/content/{collection}/{id}",
            get(get_document)
                .patch(update_document)
                .delete(delete_document),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParams {
    page: Option<u32>,
    per_page: Option<u32>,
    tag: Option<String>,
}

fn parse_collection(name: &str) -> ApiResult<Collection> {
    name.parse()
        .map_err(|_| ApiError::NotFound(format!("unknown collection {name:?}")))
}

fn parse_target(collection: &str, id: &str) -> ApiResult<(Collection, DocumentId)> {
    let collection = parse_collection(collection)?;
    let id = DocumentId::parse(id).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok((collection, id))
}

async fn list_documents(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Page<ContentDocument>>> {
    let collection = parse_collection(&collection)?;
    let defaults = PageRequest::default();
    let page = PageRequest::new(
        params.page.unwrap_or(defaults.page),
        params.per_page.unwrap_or(defaults.per_page),
    );
    let tag = params.tag.as_deref().filter(|t| !t.trim().is_empty());
    Ok(Json(state.service().list(collection, page, tag).await?))
}

async fn get_document(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> ApiResult<Json<ContentDocument>> {
    let (collection, id) = parse_target(&collection, &id)?;
    Ok(Json(state.service().get(collection, &id).await?))
}

async fn create_document(
    State(state): State<AppState>,
    editor: Editor,
    Path(collection): Path<String>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<ContentDocument>)> {
    let collection = parse_collection(&collection)?;
    let form = read_submission(multipart).await?;
    if !form.remove_media.is_empty() {
        return Err(ApiError::BadRequest(
            "removeMedia is only valid when editing".to_string(),
        ));
    }
    tracing::debug!(editor = %editor.subject, %collection, "create submission");

    let doc = state
        .service()
        .create(
            collection,
            CreateRequest {
                fields: form.fields,
                uploads: form.uploads,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(doc)))
}

async fn update_document(
    State(state): State<AppState>,
    editor: Editor,
    Path((collection, id)): Path<(String, String)>,
    multipart: Multipart,
) -> ApiResult<Json<ContentDocument>> {
    let (collection, id) = parse_target(&collection, &id)?;
    let form = read_submission(multipart).await?;
    tracing::debug!(editor = %editor.subject, %collection, %id, "edit submission");

    let doc = state
        .service()
        .update(
            collection,
            &id,
            UpdateRequest {
                fields: form.fields,
                uploads: form.uploads,
                remove_media: form.remove_media,
            },
        )
        .await?;
    Ok(Json(doc))
}

async fn delete_document(
    State(state): State<AppState>,
    editor: Editor,
    Path((collection, id)): Path<(String, String)>,
) -> ApiResult<Json<MutationResult>> {
    let (collection, id) = parse_target(&collection, &id)?;
    tracing::debug!(editor = %editor.subject, %collection, %id, "delete request");

    state.service().delete(collection, &id).await?;
    Ok(Json(MutationResult {
        id,
        action: MutationAction::Deleted,
    }))
}

/// Parsed multipart form submission.
#[derive(Debug, Default)]
struct Submission {
    fields: Map<String, Value>,
    uploads: Vec<MediaUpload>,
    remove_media: Vec<MediaSlot>,
}

/// Read a form submission: a `document` part holding the JSON fields, an
/// optional `removeMedia` JSON array of slots, and one file part per
/// media slot, named after the slot.
async fn read_submission(mut multipart: Multipart) -> ApiResult<Submission> {
    let mut form = Submission::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "document" => {
                let text = field.text().await?;
                form.fields = serde_json::from_str(&text).map_err(|e| {
                    ApiError::BadRequest(format!("document must be a JSON object: {e}"))
                })?;
            }
            "removeMedia" => {
                let text = field.text().await?;
                let names: Vec<String> = serde_json::from_str(&text).map_err(|e| {
                    ApiError::BadRequest(format!("removeMedia must be a JSON array: {e}"))
                })?;
                form.remove_media = names
                    .iter()
                    .map(|n| n.parse::<MediaSlot>())
                    .collect::<Result<_, _>>()
                    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            }
            other => {
                let slot: MediaSlot = other
                    .parse()
                    .map_err(|_| ApiError::BadRequest(format!("unexpected form part {other:?}")))?;
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?.to_vec();
                form.uploads.push(MediaUpload {
                    slot,
                    file_name,
                    content_type,
                    bytes,
                });
            }
        }
    }
    Ok(form)
}
