//! Dedup resolver integration tests
//!
//! Tests cover:
//! - Idempotent song resolution on sanitized names
//! - Artist reuse and creation with input order preserved
//! - Failure without rollback
//! - Concurrent resolution of the same song

mod helpers;

use helpers::{count_artists, count_songs, create_test_store, install_song_insert_failure};
use kvt_common::{Error, ErrorKind};
use kvt_server::services::{DedupResolver, RawSong, Resolution};
use kvt_server::store::{EntityStore, SongWriter};
use std::sync::Arc;

fn raw_song(name: &str, artists: &[&str]) -> RawSong {
    RawSong {
        name: name.to_string(),
        artists: artists.iter().map(|a| a.to_string()).collect(),
        is_single: true,
        audio: vec![0xAA; 16],
        artwork: None,
    }
}

#[tokio::test]
async fn test_end_to_end_imagine() {
    let (_dir, store) = create_test_store().await;
    let store = Arc::new(store);
    let resolver = DedupResolver::new(store.clone());

    let first = resolver
        .add_song(&raw_song("Imagine", &["John Lennon"]))
        .await
        .unwrap();
    let Resolution::Created(song) = first else {
        panic!("expected a new song, got {:?}", first);
    };
    assert_eq!(song.id, 1);
    assert_eq!(song.name, "Imagine");
    assert_eq!(song.artist_ids, vec![1]);
    assert!(song.is_single);

    let artist = store.get_artist(1).await.unwrap();
    assert_eq!(artist.name, "John Lennon");

    let again = resolver
        .add_song(&raw_song("Imagine", &["John Lennon"]))
        .await
        .unwrap();
    assert_eq!(again, Resolution::Existing(song));
    assert_eq!(count_songs(&store).await, 1);
    assert_eq!(count_artists(&store).await, 1);
}

#[tokio::test]
async fn test_sanitized_equal_names_resolve_to_same_song() {
    let (_dir, store) = create_test_store().await;
    let store = Arc::new(store);
    let resolver = DedupResolver::new(store.clone());

    let first = resolver
        .add_song(&raw_song("Hey Jude", &["The Beatles"]))
        .await
        .unwrap();
    let second = resolver
        .add_song(&raw_song("Hey Jude (Remastered 2015)!!", &["The Beatles"]))
        .await
        .unwrap();

    assert!(first.is_created());
    assert!(!second.is_created());
    assert_eq!(first.song().id, second.song().id);
    assert_eq!(count_songs(&store).await, 1);
}

#[tokio::test]
async fn test_existing_artist_reused() {
    let (_dir, store) = create_test_store().await;
    let store = Arc::new(store);
    let beatles = store.add_artist("The Beatles").await.unwrap();
    let resolver = DedupResolver::new(store.clone());

    let resolution = resolver
        .add_song(&raw_song("Real Love", &["the beatles!", "John Lennon"]))
        .await
        .unwrap();

    let song = resolution.into_song();
    assert_eq!(song.artist_ids.len(), 2);
    assert_eq!(song.artist_ids[0], beatles.id);
    assert_ne!(song.artist_ids[1], beatles.id);

    assert_eq!(count_artists(&store).await, 2);
    let lennon = store.get_artist(song.artist_ids[1]).await.unwrap();
    assert_eq!(lennon.name, "John Lennon");
}

#[tokio::test]
async fn test_new_artists_keep_input_positions() {
    let (_dir, store) = create_test_store().await;
    let store = Arc::new(store);
    let resolver = DedupResolver::new(store.clone());
    let names = ["Zed", "Alpha", "Mid", "Omega"];

    let song = resolver
        .add_song(&raw_song("Four Way Split", &names))
        .await
        .unwrap()
        .into_song();

    assert_eq!(song.artist_ids.len(), names.len());
    for (id, name) in song.artist_ids.iter().zip(names) {
        assert_eq!(store.get_artist(*id).await.unwrap().name, name);
    }

    // Stored credit order matches too
    let stored = store.get_song(song.id).await.unwrap();
    assert_eq!(stored.artist_ids, song.artist_ids);
}

#[tokio::test]
async fn test_duplicate_unmatched_names_create_one_artist() {
    let (_dir, store) = create_test_store().await;
    let store = Arc::new(store);
    let resolver = DedupResolver::new(store.clone());

    let song = resolver
        .add_song(&raw_song("Under Pressure", &["Queen", "queen!", "David Bowie"]))
        .await
        .unwrap()
        .into_song();

    assert_eq!(song.artist_ids.len(), 3);
    assert_eq!(song.artist_ids[0], song.artist_ids[1]);
    assert_ne!(song.artist_ids[0], song.artist_ids[2]);
    assert_eq!(count_artists(&store).await, 2);
}

#[tokio::test]
async fn test_blank_artist_entries_dropped() {
    let (_dir, store) = create_test_store().await;
    let store = Arc::new(store);
    let resolver = DedupResolver::new(store.clone());

    let song = resolver
        .add_song(&raw_song("Hello", &["", "   ", "?!", "Adele"]))
        .await
        .unwrap()
        .into_song();

    assert_eq!(song.artist_ids.len(), 1);
    assert_eq!(store.get_artist(song.artist_ids[0]).await.unwrap().name, "Adele");
}

#[tokio::test]
async fn test_blank_song_name_is_validation_failure() {
    let (_dir, store) = create_test_store().await;
    let store = Arc::new(store);
    let resolver = DedupResolver::new(store.clone());

    let err = resolver
        .add_song(&raw_song("(Bonus Track)", &["Someone"]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(count_artists(&store).await, 0);
}

#[tokio::test]
async fn test_title_only_dedup_collapses_different_artists() {
    let (_dir, store) = create_test_store().await;
    let store = Arc::new(store);
    let resolver = DedupResolver::new(store.clone());

    let beatles = resolver
        .add_song(&raw_song("Yesterday", &["The Beatles"]))
        .await
        .unwrap();
    let cover = resolver
        .add_song(&raw_song("Yesterday", &["Boyz II Men"]))
        .await
        .unwrap();

    // Same sanitized title means same song, whoever performs it
    assert!(!cover.is_created());
    assert_eq!(cover.song().id, beatles.song().id);
    assert_eq!(count_songs(&store).await, 1);
    assert_eq!(count_artists(&store).await, 1);
}

#[tokio::test]
async fn test_song_failure_keeps_created_artists() {
    let (_dir, store) = create_test_store().await;
    install_song_insert_failure(&store).await;
    let store = Arc::new(store);
    let resolver = DedupResolver::new(store.clone());

    let err = resolver
        .add_song(&raw_song("Doomed", &["Brand New Artist"]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);

    let artists = store.search_artists("brand new artist").await.unwrap();
    assert_eq!(artists.len(), 1);
    assert_eq!(count_songs(&store).await, 0);
}

#[tokio::test]
async fn test_concurrent_resolution_yields_one_song() {
    let (_dir, store) = create_test_store().await;
    let store = Arc::new(store);
    let resolver = DedupResolver::new(store.clone());

    let input = raw_song("Bohemian Rhapsody", &["Queen"]);
    let (a, b) = tokio::join!(resolver.add_song(&input), resolver.add_song(&input));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.song().id, b.song().id);
    assert_eq!(count_songs(&store).await, 1);
    assert_eq!(count_artists(&store).await, 1);
}

#[tokio::test]
async fn test_song_writer_rejects_sanitized_duplicate() {
    let (_dir, store) = create_test_store().await;
    store.create_song("Let It Be", &[], false).await.unwrap();

    let err = store.create_song("let it be!", &[], false).await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
}
