//! Activity feeds

use axum::extract::{Path, Query, State};
use axum::Json;
use kvt_common::models::LibraryEntity;
use serde::Serialize;

use super::auth::{user_from_token, TokenQuery};
use crate::error::ApiResult;
use crate::AppContext;

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

/// GET /api/v1/feed/new/count
pub async fn new_count(State(ctx): State<AppContext>) -> ApiResult<Json<CountResponse>> {
    let count = ctx.store.get_new_entity_count().await?;
    Ok(Json(CountResponse { count }))
}

/// GET /api/v1/feed/new/:offset
pub async fn new_entity(
    State(ctx): State<AppContext>,
    Path(offset): Path<usize>,
) -> ApiResult<Json<LibraryEntity>> {
    Ok(Json(ctx.store.get_new_entity(offset).await?))
}

/// GET /api/v1/feed/recent/count?token=
pub async fn recent_count(
    State(ctx): State<AppContext>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<Json<CountResponse>> {
    let user = user_from_token(&ctx, &query.token).await?;
    let count = ctx.store.get_recent_entity_count(&user).await?;
    Ok(Json(CountResponse { count }))
}

/// GET /api/v1/feed/recent/:offset?token=
pub async fn recent_entity(
    State(ctx): State<AppContext>,
    Path(offset): Path<usize>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<Json<LibraryEntity>> {
    let user = user_from_token(&ctx, &query.token).await?;
    Ok(Json(ctx.store.get_recent_entity(&user, offset).await?))
}
