//! Activity feed persistence
//!
//! `new_entities` is the global feed, `recent_entities` the per-user one.
//! Both are append-only and read oldest first by insertion order.

use kvt_common::models::{ActivityEvent, EntityKind, EntityRef, UserId};
use kvt_common::{time, Error, Result};
use sqlx::{Row, SqlitePool};

fn entity_from_parts(kind: i64, id: i64) -> Result<EntityRef> {
    let kind = EntityKind::from_code(kind)
        .ok_or_else(|| Error::Internal(format!("unknown entity kind code {}", kind)))?;
    Ok(EntityRef::new(kind, id))
}

pub async fn append_new_entity(pool: &SqlitePool, entity: EntityRef) -> Result<ActivityEvent> {
    let timestamp = time::now_millis();
    let id = sqlx::query(
        "INSERT INTO new_entities (entity_kind, entity_id, created_at) VALUES (?, ?, ?)",
    )
    .bind(entity.kind.code())
    .bind(entity.id)
    .bind(timestamp)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(ActivityEvent {
        id,
        user_id: None,
        timestamp,
        entity,
    })
}

pub async fn append_recent_entity(
    pool: &SqlitePool,
    user_id: UserId,
    entity: EntityRef,
) -> Result<ActivityEvent> {
    let timestamp = time::now_millis();
    let id = sqlx::query(
        r#"
        INSERT INTO recent_entities (user_id, entity_kind, entity_id, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(entity.kind.code())
    .bind(entity.id)
    .bind(timestamp)
    .execute(pool)
    .await
    .map_err(|e| super::map_write_error(e, "recent entity"))?
    .last_insert_rowid();

    Ok(ActivityEvent {
        id,
        user_id: Some(user_id),
        timestamp,
        entity,
    })
}

pub async fn count_new_entities(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM new_entities")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn count_recent_entities(pool: &SqlitePool, user_id: UserId) -> Result<i64> {
    let count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM recent_entities WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}

/// Entry at `offset` of the global feed, oldest first
///
/// Offsets beyond SQLite's integer range have no entry.
pub async fn load_new_entity_at(pool: &SqlitePool, offset: usize) -> Result<Option<EntityRef>> {
    let Ok(offset) = i64::try_from(offset) else {
        return Ok(None);
    };
    let row = sqlx::query(
        "SELECT entity_kind, entity_id FROM new_entities ORDER BY id LIMIT 1 OFFSET ?",
    )
    .bind(offset)
    .fetch_optional(pool)
    .await?;

    row.map(|row| entity_from_parts(row.get("entity_kind"), row.get("entity_id")))
        .transpose()
}

/// Entry at `offset` of one user's feed, oldest first
pub async fn load_recent_entity_at(
    pool: &SqlitePool,
    user_id: UserId,
    offset: usize,
) -> Result<Option<EntityRef>> {
    let Ok(offset) = i64::try_from(offset) else {
        return Ok(None);
    };
    let row = sqlx::query(
        r#"
        SELECT entity_kind, entity_id FROM recent_entities
        WHERE user_id = ?
        ORDER BY id
        LIMIT 1 OFFSET ?
        "#,
    )
    .bind(user_id)
    .bind(offset)
    .fetch_optional(pool)
    .await?;

    row.map(|row| entity_from_parts(row.get("entity_kind"), row.get("entity_id")))
        .transpose()
}
