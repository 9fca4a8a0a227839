use crate::error::ShelfError;
use crate::middleware::RequireSession;
use crate::router::ShelfState;
use crate::service::ShelfHandle;
use crate::session::Session;
use crate::types::{BookDraft, BookEntry, BookPage, CoverImage, ReadingStatus};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use tracing::{debug, warn};

/// Cover image carried inline in a JSON body.
#[derive(Debug, Deserialize)]
pub struct CoverUpload {
    pub content_type: String,
    pub data_base64: String,
}

impl CoverUpload {
    fn decode(self) -> Result<CoverImage, ShelfError> {
        let bytes = STANDARD.decode(self.data_base64.trim())?;
        Ok(CoverImage {
            bytes,
            content_type: self.content_type,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct NewBookRequest {
    #[serde(flatten)]
    pub draft: BookDraft,
    #[serde(default)]
    pub cover: Option<CoverUpload>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    #[serde(default)]
    pub status: Option<ReadingStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub size: Option<usize>,
    pub after: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Open the user's shelf and fill it: local rows first, then the remote list.
async fn loaded_shelf(state: &ShelfState, session: &Session) -> Result<ShelfHandle, ShelfError> {
    let (shelf, fresh) = state.shelf.open(session, state.library.remote()).await?;
    if fresh {
        shelf.load_local(state.library.local_shelf(session).await?)?;
    }
    match state.library.remote_books(session).await {
        Ok(entries) => shelf.apply_remote(entries)?,
        Err(e) => warn!(user_id = session.user_id, error = %e, "remote shelf unavailable; showing local rows"),
    }
    Ok(shelf)
}

/// Mirror a write into the open shelf, if it belongs to this user.
async fn notify_shelf(state: &ShelfState, session: &Session, apply: impl FnOnce(&ShelfHandle) -> Result<(), ShelfError>) {
    if let Some(shelf) = state.shelf.current().await
        && shelf.user_id() == session.user_id
        && let Err(e) = apply(&shelf)
    {
        debug!(error = %e, "shelf not updated");
    }
}

/// GET /books -> merged shelf.
pub async fn list(
    State(state): State<ShelfState>,
    RequireSession(session): RequireSession,
) -> Result<Json<Vec<BookEntry>>, ShelfError> {
    let shelf = loaded_shelf(&state, &session).await?;
    Ok(Json(shelf.snapshot().await?))
}

/// GET /books/page?size=&after= -> one forward page of remote books.
pub async fn page(
    State(state): State<ShelfState>,
    RequireSession(session): RequireSession,
    Query(query): Query<PageQuery>,
) -> Result<Json<BookPage>, ShelfError> {
    let size = query.size.unwrap_or(state.page_size);
    let page = state
        .library
        .page(&session, size, query.after.as_deref())
        .await?;
    Ok(Json(page))
}

/// GET /books/search?q= -> in-memory filter over the merged shelf.
pub async fn search(
    State(state): State<ShelfState>,
    RequireSession(session): RequireSession,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<BookEntry>>, ShelfError> {
    let shelf = match state.shelf.current().await {
        Some(shelf) if shelf.user_id() == session.user_id => shelf,
        _ => loaded_shelf(&state, &session).await?,
    };
    Ok(Json(shelf.search(query.q).await?))
}

/// POST /books -> upload, remote create, local insert.
pub async fn add(
    State(state): State<ShelfState>,
    RequireSession(session): RequireSession,
    Json(req): Json<NewBookRequest>,
) -> Result<impl IntoResponse, ShelfError> {
    let cover = req.cover.map(CoverUpload::decode).transpose()?;
    let entry = state.library.add_book(&session, req.draft, cover).await?;
    notify_shelf(&state, &session, |shelf| shelf.upserted(entry.clone())).await;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn update_status(
    State(state): State<ShelfState>,
    RequireSession(session): RequireSession,
    Path(key): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<BookEntry>, ShelfError> {
    let entry = state
        .library
        .update_status(&session, &key, req.status)
        .await?;
    notify_shelf(&state, &session, |shelf| shelf.upserted(entry.clone())).await;
    Ok(Json(entry))
}

pub async fn update_cover(
    State(state): State<ShelfState>,
    RequireSession(session): RequireSession,
    Path(key): Path<String>,
    Json(upload): Json<CoverUpload>,
) -> Result<Json<BookEntry>, ShelfError> {
    let entry = state
        .library
        .update_cover(&session, &key, upload.decode()?)
        .await?;
    notify_shelf(&state, &session, |shelf| shelf.upserted(entry.clone())).await;
    Ok(Json(entry))
}

pub async fn remove(
    State(state): State<ShelfState>,
    RequireSession(session): RequireSession,
    Path(key): Path<String>,
) -> Result<StatusCode, ShelfError> {
    state.library.delete_book(&session, &key).await?;
    notify_shelf(&state, &session, |shelf| shelf.removed(key.as_str())).await;
    Ok(StatusCode::NO_CONTENT)
}
