use advocacy_core::search::{normalize_query, SearchHit};
use advocacy_core::youtube;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::AppState;

/// Site search and link-check helpers used by the page forms.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/search", get(search))
        .route("/v1/youtube", get(check_youtube))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    query: String,
    hits: Vec<SearchHit>,
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<SearchResponse>> {
    let hits = state.service().search(&params.q).await?;
    Ok(Json(SearchResponse {
        query: normalize_query(&params.q),
        hits,
    }))
}

#[derive(Debug, Deserialize)]
struct YoutubeParams {
    #[serde(default)]
    url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct YoutubeCheck {
    valid: bool,
    id: Option<String>,
    embed_url: Option<String>,
    thumbnail_url: Option<String>,
}

async fn check_youtube(Query(params): Query<YoutubeParams>) -> Json<YoutubeCheck> {
    let id = youtube::extract_youtube_id(&params.url);
    Json(YoutubeCheck {
        valid: id.is_some(),
        embed_url: id.as_deref().map(youtube::embed_url),
        thumbnail_url: id.as_deref().map(youtube::thumbnail_url),
        id,
    })
}
