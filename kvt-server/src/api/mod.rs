//! HTTP API handlers

pub mod auth;
pub mod entities;
pub mod feeds;
pub mod files;
pub mod health;
pub mod search;

use crate::AppContext;
use axum::routing::{get, post};
use axum::Router;

pub use health::health_routes;

/// Library routes, nested under `/api/v1`
pub fn library_routes() -> Router<AppContext> {
    Router::new()
        .route("/song/:id", get(entities::get_song))
        .route("/artist/:id", get(entities::get_artist))
        .route("/album/:id", get(entities::get_album))
        .route("/playlist/:id", get(entities::get_playlist))
        .route("/search/:query", get(search::search))
        .route("/login", post(auth::login))
        .route("/validate", get(auth::validate))
        .route("/feed/new/count", get(feeds::new_count))
        .route("/feed/new/:offset", get(feeds::new_entity))
        .route("/feed/recent/count", get(feeds::recent_count))
        .route("/feed/recent/:offset", get(feeds::recent_entity))
}

/// Raw audio and artwork downloads
pub fn file_routes() -> Router<AppContext> {
    Router::new()
        .route("/download/:id", get(files::download))
        .route("/artwork/:kind/:id", get(files::artwork))
}
