//! Combined search across artists, songs and albums

use axum::extract::{Path, State};
use axum::Json;
use kvt_common::models::{AlbumId, ArtistId, SongId};
use serde::Serialize;

use crate::error::ApiResult;
use crate::AppContext;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub artist_ids: Vec<ArtistId>,
    pub song_ids: Vec<SongId>,
    pub album_ids: Vec<AlbumId>,
}

/// GET /api/v1/search/:query
///
/// The three searches run concurrently.
pub async fn search(
    State(ctx): State<AppContext>,
    Path(query): Path<String>,
) -> ApiResult<Json<SearchResponse>> {
    let (artists, songs, albums) = tokio::try_join!(
        ctx.store.search_artists(&query),
        ctx.store.search_songs(&query),
        ctx.store.search_albums(&query),
    )?;

    tracing::debug!(
        query = %query,
        artists = artists.len(),
        songs = songs.len(),
        albums = albums.len(),
        "Search complete"
    );

    Ok(Json(SearchResponse {
        artist_ids: artists.into_iter().map(|a| a.id).collect(),
        song_ids: songs.into_iter().map(|s| s.id).collect(),
        album_ids: albums.into_iter().map(|a| a.id).collect(),
    }))
}
