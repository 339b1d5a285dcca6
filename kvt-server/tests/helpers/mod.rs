//! Test Helper Utilities
//!
//! Shared utilities for testing kvt-server

#![allow(dead_code)]

pub mod db_utils;
pub mod fakes;
pub mod test_server;

pub use db_utils::{count_artists, count_songs, create_test_store, install_song_insert_failure};
pub use fakes::{tagged_bytes, CannedConfirmer, FailingFileStore, FakeTagParser};
pub use test_server::TestServer;
