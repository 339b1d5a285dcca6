//! Audio and artwork downloads

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use kvt_common::models::{EntityRef, SongId};
use kvt_common::Error;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::services::ArtworkKind;
use crate::AppContext;

#[derive(Debug, Default, Deserialize)]
pub struct DownloadQuery {
    /// When valid, the download is recorded in the user's recent feed
    pub token: Option<String>,
}

/// GET /download/:id
pub async fn download(
    State(ctx): State<AppContext>,
    Path(id): Path<SongId>,
    Query(query): Query<DownloadQuery>,
) -> ApiResult<impl IntoResponse> {
    let song = ctx.store.get_song(id).await?;
    let bytes = ctx
        .files
        .read_song_bytes(song.id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("audio for song {}", song.id)))?;

    if let Some(token) = query.token.as_deref() {
        match ctx.store.get_user_by_token(token).await {
            Ok(user) => {
                if let Err(e) = ctx.store.add_recent_entity(&user, EntityRef::from(&song)).await {
                    tracing::warn!(song_id = song.id, error = %e, "Failed to record recent play");
                }
            }
            Err(e) => tracing::debug!(error = %e, "Download token not recognised"),
        }
    }

    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes))
}

/// GET /artwork/:kind/:id
pub async fn artwork(
    State(ctx): State<AppContext>,
    Path((kind, id)): Path<(String, i64)>,
) -> ApiResult<impl IntoResponse> {
    let kind: ArtworkKind = kind.parse()?;
    let bytes = ctx
        .files
        .read_artwork_bytes(kind, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("{} artwork {}", kind, id)))?;

    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes))
}
