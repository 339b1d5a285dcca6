//! Asynchronous entity store
//!
//! [`EntityStore`] is the boundary the API layer and the resolver consume.
//! [`SqliteEntityStore`] implements it over the `db` functions: every call is
//! submitted to the [`TaskExecutor`] as exactly one unit of work, and writes
//! retry on SQLite lock contention inside that unit.

use crate::db::{activity, albums, artists, playlists, sessions, songs, users};
use crate::executor::TaskExecutor;
use crate::utils::retry_on_lock;
use async_trait::async_trait;
use kvt_common::auth::generate_token;
use kvt_common::config::{AppConfig, FeedCountMode};
use kvt_common::models::{
    Album, AlbumId, Artist, ArtistId, EntityKind, EntityRef, LibraryEntity, Playlist, PlaylistId,
    Song, SongId, Token, User, UserId,
};
use kvt_common::{time, Error, Result};
use sqlx::SqlitePool;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Library repository contract
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn get_song(&self, id: SongId) -> Result<Song>;
    async fn get_artist(&self, id: ArtistId) -> Result<Artist>;
    async fn get_album(&self, id: AlbumId) -> Result<Album>;
    async fn get_playlist(&self, id: PlaylistId) -> Result<Playlist>;
    async fn get_user(&self, id: UserId) -> Result<User>;

    /// Songs whose sanitized name contains the sanitized query
    async fn search_songs(&self, query: &str) -> Result<Vec<Song>>;
    async fn search_artists(&self, query: &str) -> Result<Vec<Artist>>;
    async fn search_albums(&self, query: &str) -> Result<Vec<Album>>;

    /// Create an artist; a sanitized-name collision fails with `Conflict`
    async fn add_artist(&self, name: &str) -> Result<Artist>;
    async fn add_album(
        &self,
        name: &str,
        artist_ids: &[ArtistId],
        song_ids: &[SongId],
    ) -> Result<Album>;
    async fn add_playlist(&self, name: &str, user_id: UserId, song_ids: &[SongId])
        -> Result<Playlist>;
    async fn add_user(&self, name: &str, password_hash: &str) -> Result<User>;

    async fn get_user_from_name(&self, name: &str) -> Result<User>;

    /// Issue a fresh token for `user`, invalidating any previous one
    async fn login_user(&self, user: &User) -> Result<Token>;
    async fn is_valid_token(&self, token: &str) -> Result<bool>;
    async fn get_user_by_token(&self, token: &str) -> Result<User>;

    async fn get_new_entity_count(&self) -> Result<i64>;
    async fn get_new_entity(&self, offset: usize) -> Result<LibraryEntity>;
    async fn get_recent_entity_count(&self, user: &User) -> Result<i64>;
    async fn get_recent_entity(&self, user: &User, offset: usize) -> Result<LibraryEntity>;
    async fn add_new_entity(&self, entity: EntityRef) -> Result<()>;
    async fn add_recent_entity(&self, user: &User, entity: EntityRef) -> Result<()>;
}

/// Song-creation primitive used by the dedup resolver
#[async_trait]
pub trait SongWriter: Send + Sync {
    /// Create a song row; a sanitized-name collision fails with `Conflict`
    async fn create_song(&self, name: &str, artist_ids: &[ArtistId], is_single: bool)
        -> Result<Song>;
}

/// Everything the server needs from storage
pub trait LibraryStore: EntityStore + SongWriter {}

impl<T: EntityStore + SongWriter + ?Sized> LibraryStore for T {}

/// SQLite-backed store
#[derive(Debug, Clone)]
pub struct SqliteEntityStore {
    pool: SqlitePool,
    executor: TaskExecutor,
    feed_count_mode: FeedCountMode,
    token_ttl: Option<Duration>,
    max_lock_wait_ms: u64,
}

impl SqliteEntityStore {
    pub fn new(pool: SqlitePool, executor: TaskExecutor) -> Self {
        Self {
            pool,
            executor,
            feed_count_mode: FeedCountMode::default(),
            token_ttl: None,
            max_lock_wait_ms: 5000,
        }
    }

    pub fn from_config(pool: SqlitePool, executor: TaskExecutor, config: &AppConfig) -> Self {
        Self::new(pool, executor)
            .with_feed_count_mode(config.feeds.count_mode)
            .with_token_ttl(config.sessions.token_ttl_secs.map(Duration::from_secs))
            .with_max_lock_wait_ms(config.database.max_lock_wait_ms)
    }

    pub fn with_feed_count_mode(mut self, mode: FeedCountMode) -> Self {
        self.feed_count_mode = mode;
        self
    }

    pub fn with_token_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.token_ttl = ttl;
        self
    }

    pub fn with_max_lock_wait_ms(mut self, max_lock_wait_ms: u64) -> Self {
        self.max_lock_wait_ms = max_lock_wait_ms;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn executor(&self) -> &TaskExecutor {
        &self.executor
    }

    /// Submit one unit of work against a clone of the pool
    async fn run<T, F, Fut>(&self, operation: &'static str, work: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(SqlitePool) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        self.executor
            .submit(operation, work(self.pool.clone()))
            .await
    }
}

/// True when a session issued at `issued_at` has outlived `ttl`
///
/// TTLs beyond the millisecond range never expire.
fn token_expired(ttl: Option<Duration>, issued_at: i64) -> bool {
    match ttl {
        Some(ttl) => {
            let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
            time::now_millis().saturating_sub(issued_at) >= ttl_ms
        }
        None => false,
    }
}

/// Load the entity an activity entry points at
async fn resolve_entity(pool: &SqlitePool, entity: EntityRef) -> Result<LibraryEntity> {
    let resolved = match entity.kind {
        EntityKind::Song => songs::load_song(pool, entity.id)
            .await?
            .map(LibraryEntity::Song),
        EntityKind::Album => albums::load_album(pool, entity.id)
            .await?
            .map(LibraryEntity::Album),
        EntityKind::Playlist => playlists::load_playlist(pool, entity.id)
            .await?
            .map(LibraryEntity::Playlist),
    };
    resolved.ok_or_else(|| Error::not_found(entity.kind.as_str(), entity.id))
}

#[async_trait]
impl EntityStore for SqliteEntityStore {
    async fn get_song(&self, id: SongId) -> Result<Song> {
        self.run("get_song", move |pool| async move {
            songs::load_song(&pool, id)
                .await?
                .ok_or_else(|| Error::not_found("song", id))
        })
        .await
    }

    async fn get_artist(&self, id: ArtistId) -> Result<Artist> {
        self.run("get_artist", move |pool| async move {
            artists::load_artist(&pool, id)
                .await?
                .ok_or_else(|| Error::not_found("artist", id))
        })
        .await
    }

    async fn get_album(&self, id: AlbumId) -> Result<Album> {
        self.run("get_album", move |pool| async move {
            albums::load_album(&pool, id)
                .await?
                .ok_or_else(|| Error::not_found("album", id))
        })
        .await
    }

    async fn get_playlist(&self, id: PlaylistId) -> Result<Playlist> {
        self.run("get_playlist", move |pool| async move {
            playlists::load_playlist(&pool, id)
                .await?
                .ok_or_else(|| Error::not_found("playlist", id))
        })
        .await
    }

    async fn get_user(&self, id: UserId) -> Result<User> {
        self.run("get_user", move |pool| async move {
            users::load_user(&pool, id)
                .await?
                .ok_or_else(|| Error::not_found("user", id))
        })
        .await
    }

    async fn search_songs(&self, query: &str) -> Result<Vec<Song>> {
        let query = query.to_string();
        self.run("search_songs", move |pool| async move {
            songs::search_songs(&pool, &query).await
        })
        .await
    }

    async fn search_artists(&self, query: &str) -> Result<Vec<Artist>> {
        let query = query.to_string();
        self.run("search_artists", move |pool| async move {
            artists::search_artists(&pool, &query).await
        })
        .await
    }

    async fn search_albums(&self, query: &str) -> Result<Vec<Album>> {
        let query = query.to_string();
        self.run("search_albums", move |pool| async move {
            albums::search_albums(&pool, &query).await
        })
        .await
    }

    async fn add_artist(&self, name: &str) -> Result<Artist> {
        let name = name.to_string();
        let max_wait = self.max_lock_wait_ms;
        let artist = self
            .run("add_artist", move |pool| async move {
                retry_on_lock("add artist", max_wait, || {
                    artists::insert_artist(&pool, &name)
                })
                .await
            })
            .await?;

        info!(artist_id = artist.id, name = %artist.name, "Artist created");
        Ok(artist)
    }

    async fn add_album(
        &self,
        name: &str,
        artist_ids: &[ArtistId],
        song_ids: &[SongId],
    ) -> Result<Album> {
        let name = name.to_string();
        let artist_ids = artist_ids.to_vec();
        let song_ids = song_ids.to_vec();
        let max_wait = self.max_lock_wait_ms;
        let album = self
            .run("add_album", move |pool| async move {
                retry_on_lock("add album", max_wait, || {
                    albums::insert_album(&pool, &name, &artist_ids, &song_ids)
                })
                .await
            })
            .await?;

        info!(album_id = album.id, name = %album.name, "Album created");
        Ok(album)
    }

    async fn add_playlist(
        &self,
        name: &str,
        user_id: UserId,
        song_ids: &[SongId],
    ) -> Result<Playlist> {
        let name = name.to_string();
        let song_ids = song_ids.to_vec();
        let max_wait = self.max_lock_wait_ms;
        self.run("add_playlist", move |pool| async move {
            retry_on_lock("add playlist", max_wait, || {
                playlists::insert_playlist(&pool, &name, user_id, &song_ids)
            })
            .await
        })
        .await
    }

    async fn add_user(&self, name: &str, password_hash: &str) -> Result<User> {
        let name = name.to_string();
        let password_hash = password_hash.to_string();
        let max_wait = self.max_lock_wait_ms;
        let user = self
            .run("add_user", move |pool| async move {
                retry_on_lock("add user", max_wait, || {
                    users::insert_user(&pool, &name, &password_hash)
                })
                .await
            })
            .await?;

        info!(user_id = user.id, name = %user.name, "User created");
        Ok(user)
    }

    async fn get_user_from_name(&self, name: &str) -> Result<User> {
        let name = name.to_string();
        self.run("get_user_from_name", move |pool| async move {
            users::load_user_by_name(&pool, &name)
                .await?
                .ok_or_else(|| Error::NotFound(format!("user '{}'", name)))
        })
        .await
    }

    async fn login_user(&self, user: &User) -> Result<Token> {
        let user_id = user.id;
        let max_wait = self.max_lock_wait_ms;
        let session = self
            .run("login_user", move |pool| async move {
                if users::load_user(&pool, user_id).await?.is_none() {
                    return Err(Error::not_found("user", user_id));
                }
                let token = generate_token();
                let issued_at = time::now_millis();
                retry_on_lock("login user", max_wait, || {
                    sessions::replace_session(&pool, user_id, &token, issued_at)
                })
                .await
            })
            .await?;

        debug!(user_id, "Session token issued");
        Ok(session.token)
    }

    async fn is_valid_token(&self, token: &str) -> Result<bool> {
        let token = token.to_string();
        let session = self
            .run("is_valid_token", move |pool| async move {
                sessions::load_session_by_token(&pool, &token).await
            })
            .await?;

        Ok(matches!(session, Some(s) if !token_expired(self.token_ttl, s.issued_at)))
    }

    async fn get_user_by_token(&self, token: &str) -> Result<User> {
        let owned = token.to_string();
        let ttl = self.token_ttl;
        self.run("get_user_by_token", move |pool| async move {
            let session = sessions::load_session_by_token(&pool, &owned)
                .await?
                .ok_or_else(|| Error::NotFound("session for token".to_string()))?;
            if token_expired(ttl, session.issued_at) {
                return Err(Error::NotFound("session for token (expired)".to_string()));
            }
            users::load_user(&pool, session.user_id)
                .await?
                .ok_or_else(|| Error::not_found("user", session.user_id))
        })
        .await
    }

    async fn get_new_entity_count(&self) -> Result<i64> {
        let mode = self.feed_count_mode;
        self.run("get_new_entity_count", move |pool| async move {
            Ok(mode.apply(activity::count_new_entities(&pool).await?))
        })
        .await
    }

    async fn get_new_entity(&self, offset: usize) -> Result<LibraryEntity> {
        self.run("get_new_entity", move |pool| async move {
            let entity = activity::load_new_entity_at(&pool, offset)
                .await?
                .ok_or_else(|| Error::NotFound(format!("new feed entry {}", offset)))?;
            resolve_entity(&pool, entity).await
        })
        .await
    }

    async fn get_recent_entity_count(&self, user: &User) -> Result<i64> {
        let mode = self.feed_count_mode;
        let user_id = user.id;
        self.run("get_recent_entity_count", move |pool| async move {
            Ok(mode.apply(activity::count_recent_entities(&pool, user_id).await?))
        })
        .await
    }

    async fn get_recent_entity(&self, user: &User, offset: usize) -> Result<LibraryEntity> {
        let user_id = user.id;
        self.run("get_recent_entity", move |pool| async move {
            let entity = activity::load_recent_entity_at(&pool, user_id, offset)
                .await?
                .ok_or_else(|| {
                    Error::NotFound(format!("recent feed entry {} of user {}", offset, user_id))
                })?;
            resolve_entity(&pool, entity).await
        })
        .await
    }

    async fn add_new_entity(&self, entity: EntityRef) -> Result<()> {
        let max_wait = self.max_lock_wait_ms;
        self.run("add_new_entity", move |pool| async move {
            retry_on_lock("add new entity", max_wait, || {
                activity::append_new_entity(&pool, entity)
            })
            .await
            .map(|_| ())
        })
        .await
    }

    async fn add_recent_entity(&self, user: &User, entity: EntityRef) -> Result<()> {
        let user_id = user.id;
        let max_wait = self.max_lock_wait_ms;
        self.run("add_recent_entity", move |pool| async move {
            retry_on_lock("add recent entity", max_wait, || {
                activity::append_recent_entity(&pool, user_id, entity)
            })
            .await
            .map(|_| ())
        })
        .await
    }
}

#[async_trait]
impl SongWriter for SqliteEntityStore {
    async fn create_song(
        &self,
        name: &str,
        artist_ids: &[ArtistId],
        is_single: bool,
    ) -> Result<Song> {
        let name = name.to_string();
        let artist_ids = artist_ids.to_vec();
        let max_wait = self.max_lock_wait_ms;
        let song = self
            .run("create_song", move |pool| async move {
                retry_on_lock("create song", max_wait, || {
                    songs::insert_song(&pool, &name, &artist_ids, is_single)
                })
                .await
            })
            .await?;

        info!(song_id = song.id, name = %song.name, artists = ?song.artist_ids, "Song created");
        Ok(song)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_store() -> SqliteEntityStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::schema::init_tables(&pool).await.unwrap();
        SqliteEntityStore::new(pool, TaskExecutor::new(2, Duration::from_secs(5)))
    }

    #[tokio::test]
    async fn test_token_ttl_expires_sessions() {
        let store = memory_store()
            .await
            .with_token_ttl(Some(Duration::from_millis(30)));
        let user = store.add_user("ttl", "hash").await.unwrap();
        let token = store.login_user(&user).await.unwrap();
        assert!(store.is_valid_token(&token).await.unwrap());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!store.is_valid_token(&token).await.unwrap());
        assert!(store.get_user_by_token(&token).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_huge_token_ttl_never_expires() {
        let store = memory_store()
            .await
            .with_token_ttl(Some(Duration::from_secs(u64::MAX)));
        let user = store.add_user("forever", "hash").await.unwrap();
        let token = store.login_user(&user).await.unwrap();

        assert!(store.is_valid_token(&token).await.unwrap());
        assert_eq!(store.get_user_by_token(&token).await.unwrap().id, user.id);
    }

    #[test]
    fn test_token_expired_helper() {
        let now = time::now_millis();
        assert!(!token_expired(None, 0));
        assert!(token_expired(Some(Duration::from_secs(1)), now - 5_000));
        assert!(!token_expired(Some(Duration::from_secs(60)), now));
        assert!(!token_expired(Some(Duration::from_secs(u64::MAX)), 0));
    }

    #[tokio::test]
    async fn test_cancelled_executor_fails_store_calls() {
        let store = memory_store().await;
        store.executor().shutdown();
        let err = store.get_song(1).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled(_)));
    }

    #[tokio::test]
    async fn test_feed_entry_pointing_at_missing_row_is_not_found() {
        let store = memory_store().await;
        store.add_new_entity(EntityRef::album(99)).await.unwrap();
        assert!(store.get_new_entity(0).await.unwrap_err().is_not_found());
    }
}
