//! Entity store integration tests
//!
//! Tests cover:
//! - NotFound contract for every entity kind
//! - Sanitized containment search
//! - Uniqueness and reference checks on writes
//! - Session token lifecycle
//! - Activity feeds in both count modes

mod helpers;

use helpers::create_test_store;
use kvt_common::config::FeedCountMode;
use kvt_common::models::{EntityRef, LibraryEntity, User};
use kvt_common::Error;
use kvt_server::store::{EntityStore, SongWriter};

#[tokio::test]
async fn test_get_never_created_ids_is_not_found() {
    let (_dir, store) = create_test_store().await;

    assert!(store.get_song(42).await.unwrap_err().is_not_found());
    assert!(store.get_artist(42).await.unwrap_err().is_not_found());
    assert!(store.get_album(42).await.unwrap_err().is_not_found());
    assert!(store.get_playlist(42).await.unwrap_err().is_not_found());
    assert!(store.get_user(42).await.unwrap_err().is_not_found());
    assert!(store.get_user_from_name("nobody").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_search_songs_is_sanitized_containment() {
    let (_dir, store) = create_test_store().await;
    let jude = store.create_song("Hey Jude", &[], false).await.unwrap();
    store.create_song("Let It Be", &[], false).await.unwrap();

    for query in ["jud", "JUD", "  Jud!"] {
        let found = store.search_songs(query).await.unwrap();
        assert_eq!(found.len(), 1, "query {:?}", query);
        assert_eq!(found[0].id, jude.id);
    }

    assert!(store.search_songs("yesterday").await.unwrap().is_empty());
    assert_eq!(store.search_songs("").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_search_results_ascend_by_id() {
    let (_dir, store) = create_test_store().await;
    for name in ["Love Me Do", "All You Need Is Love", "Lovely Rita"] {
        store.add_artist(name).await.unwrap();
    }

    let ids: Vec<i64> = store
        .search_artists("love")
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_add_artist_rejects_sanitized_duplicate() {
    let (_dir, store) = create_test_store().await;
    let first = store.add_artist("The Beatles").await.unwrap();
    assert_eq!(first.id, 1);

    let err = store.add_artist("the beatles!").await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
    assert_eq!(store.search_artists("beatles").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_add_artist_rejects_blank_name() {
    let (_dir, store) = create_test_store().await;
    let err = store.add_artist(" ?! ").await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_song_artist_order_round_trips() {
    let (_dir, store) = create_test_store().await;
    let a = store.add_artist("A").await.unwrap();
    let b = store.add_artist("B").await.unwrap();
    let c = store.add_artist("C").await.unwrap();

    let song = store
        .create_song("Trio", &[c.id, a.id, b.id], true)
        .await
        .unwrap();
    let loaded = store.get_song(song.id).await.unwrap();
    assert_eq!(loaded, song);
    assert_eq!(loaded.artist_ids, vec![c.id, a.id, b.id]);

    let searched = store.search_songs("trio").await.unwrap();
    assert_eq!(searched, vec![song]);
}

#[tokio::test]
async fn test_song_with_unknown_artist_is_validation_failure() {
    let (_dir, store) = create_test_store().await;
    let err = store.create_song("Ghost", &[999], false).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(store.search_songs("ghost").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_albums_are_created_unconditionally() {
    let (_dir, store) = create_test_store().await;
    let artist = store.add_artist("The Beatles").await.unwrap();
    let s1 = store.create_song("Come Together", &[artist.id], false).await.unwrap();
    let s2 = store.create_song("Something", &[artist.id], false).await.unwrap();

    let album = store
        .add_album("Abbey Road", &[artist.id], &[s2.id, s1.id])
        .await
        .unwrap();
    let twin = store.add_album("Abbey Road", &[artist.id], &[]).await.unwrap();
    assert_ne!(album.id, twin.id);

    let loaded = store.get_album(album.id).await.unwrap();
    assert_eq!(loaded.song_ids, vec![s2.id, s1.id]);
    assert_eq!(loaded.artist_ids, vec![artist.id]);

    let found = store.search_albums("ABBEY").await.unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0], loaded);
}

#[tokio::test]
async fn test_users_and_playlists() {
    let (_dir, store) = create_test_store().await;
    let user = store.add_user("jadon", "sha256$1$00$00").await.unwrap();
    assert!(matches!(
        store.add_user("jadon", "other").await.unwrap_err(),
        Error::Conflict(_)
    ));

    let by_name = store.get_user_from_name("jadon").await.unwrap();
    assert_eq!(by_name, user);
    assert_eq!(store.get_user(user.id).await.unwrap(), user);

    let song = store.create_song("Imagine", &[], true).await.unwrap();
    let playlist = store
        .add_playlist("Favourites", user.id, &[song.id])
        .await
        .unwrap();
    let loaded = store.get_playlist(playlist.id).await.unwrap();
    assert_eq!(loaded.user_id, user.id);
    assert_eq!(loaded.song_ids, vec![song.id]);

    let err = store.add_playlist("Orphan", 999, &[]).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_login_invalidates_previous_token() {
    let (_dir, store) = create_test_store().await;
    let user = store.add_user("jadon", "hash").await.unwrap();

    let t1 = store.login_user(&user).await.unwrap();
    let t2 = store.login_user(&user).await.unwrap();
    assert_ne!(t1, t2);
    assert_eq!(t2.len(), 32);

    assert!(!store.is_valid_token(&t1).await.unwrap());
    assert!(store.is_valid_token(&t2).await.unwrap());
    assert!(store.get_user_by_token(&t1).await.unwrap_err().is_not_found());
    assert_eq!(store.get_user_by_token(&t2).await.unwrap().id, user.id);
}

#[tokio::test]
async fn test_tokens_are_per_user() {
    let (_dir, store) = create_test_store().await;
    let alice = store.add_user("alice", "hash").await.unwrap();
    let bob = store.add_user("bob", "hash").await.unwrap();

    let ta = store.login_user(&alice).await.unwrap();
    let tb = store.login_user(&bob).await.unwrap();

    assert!(store.is_valid_token(&ta).await.unwrap());
    assert!(store.is_valid_token(&tb).await.unwrap());
    assert_eq!(store.get_user_by_token(&tb).await.unwrap().name, "bob");
}

#[tokio::test]
async fn test_login_unknown_user_is_not_found() {
    let (_dir, store) = create_test_store().await;
    let ghost = User {
        id: 999,
        name: "ghost".to_string(),
        password_hash: String::new(),
    };
    assert!(store.login_user(&ghost).await.unwrap_err().is_not_found());
    assert!(!store.is_valid_token("not-a-token").await.unwrap());
}

#[tokio::test]
async fn test_new_feed_floor_count_and_order() {
    let (_dir, store) = create_test_store().await;
    assert_eq!(store.get_new_entity_count().await.unwrap(), 100);

    let song = store.create_song("Imagine", &[], true).await.unwrap();
    let album = store.add_album("Imagine", &[], &[song.id]).await.unwrap();
    store.add_new_entity(EntityRef::from(&song)).await.unwrap();
    store.add_new_entity(EntityRef::from(&album)).await.unwrap();

    assert_eq!(store.get_new_entity_count().await.unwrap(), 100);
    assert_eq!(
        store.get_new_entity(0).await.unwrap(),
        LibraryEntity::Song(song)
    );
    assert_eq!(
        store.get_new_entity(1).await.unwrap(),
        LibraryEntity::Album(album)
    );
    assert!(store.get_new_entity(2).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_feed_offsets_beyond_integer_range_are_not_found() {
    let (_dir, store) = create_test_store().await;
    let user = store.add_user("jadon", "hash").await.unwrap();
    let song = store.create_song("Imagine", &[], true).await.unwrap();
    store.add_new_entity(EntityRef::from(&song)).await.unwrap();
    store.add_recent_entity(&user, EntityRef::from(&song)).await.unwrap();

    for offset in [usize::MAX, i64::MAX as usize + 1] {
        assert!(store.get_new_entity(offset).await.unwrap_err().is_not_found());
        assert!(store
            .get_recent_entity(&user, offset)
            .await
            .unwrap_err()
            .is_not_found());
    }
    assert_eq!(
        store.get_new_entity(0).await.unwrap(),
        LibraryEntity::Song(song)
    );
}

#[tokio::test]
async fn test_new_feed_cap_count() {
    let (_dir, store) = create_test_store().await;
    let store = store.with_feed_count_mode(FeedCountMode::Cap);
    assert_eq!(store.get_new_entity_count().await.unwrap(), 0);

    let song = store.create_song("Imagine", &[], true).await.unwrap();
    store.add_new_entity(EntityRef::from(&song)).await.unwrap();
    store.add_new_entity(EntityRef::from(&song)).await.unwrap();
    assert_eq!(store.get_new_entity_count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_recent_feed_is_per_user() {
    let (_dir, store) = create_test_store().await;
    let store = store.with_feed_count_mode(FeedCountMode::Cap);
    let alice = store.add_user("alice", "hash").await.unwrap();
    let bob = store.add_user("bob", "hash").await.unwrap();
    let song = store.create_song("Imagine", &[], true).await.unwrap();
    let playlist = store.add_playlist("Mix", alice.id, &[song.id]).await.unwrap();

    store.add_recent_entity(&alice, EntityRef::from(&song)).await.unwrap();
    store
        .add_recent_entity(&alice, EntityRef::from(&playlist))
        .await
        .unwrap();

    assert_eq!(store.get_recent_entity_count(&alice).await.unwrap(), 2);
    assert_eq!(store.get_recent_entity_count(&bob).await.unwrap(), 0);
    assert_eq!(
        store.get_recent_entity(&alice, 1).await.unwrap(),
        LibraryEntity::Playlist(playlist)
    );
    assert!(store
        .get_recent_entity(&bob, 0)
        .await
        .unwrap_err()
        .is_not_found());
}
