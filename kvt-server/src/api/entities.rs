//! Entity lookup by id

use axum::extract::{Path, State};
use axum::Json;
use kvt_common::models::{Album, AlbumId, Artist, ArtistId, Playlist, PlaylistId, Song, SongId};

use crate::error::ApiResult;
use crate::AppContext;

/// GET /api/v1/song/:id
pub async fn get_song(State(ctx): State<AppContext>, Path(id): Path<SongId>) -> ApiResult<Json<Song>> {
    Ok(Json(ctx.store.get_song(id).await?))
}

/// GET /api/v1/artist/:id
pub async fn get_artist(
    State(ctx): State<AppContext>,
    Path(id): Path<ArtistId>,
) -> ApiResult<Json<Artist>> {
    Ok(Json(ctx.store.get_artist(id).await?))
}

/// GET /api/v1/album/:id
pub async fn get_album(State(ctx): State<AppContext>, Path(id): Path<AlbumId>) -> ApiResult<Json<Album>> {
    Ok(Json(ctx.store.get_album(id).await?))
}

/// GET /api/v1/playlist/:id
pub async fn get_playlist(
    State(ctx): State<AppContext>,
    Path(id): Path<PlaylistId>,
) -> ApiResult<Json<Playlist>> {
    Ok(Json(ctx.store.get_playlist(id).await?))
}
