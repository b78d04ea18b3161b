//! Media store behavior end to end: SQL ordering, parameter binding,
//! deferred visibility under the convergence poller and media scans.

#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        clippy::tests_outside_test_module,
        reason = "Test allows"
    )
)]

use cadence_core::logging::init_test_tracing;
use cadence_core::{
    Clock, Collection, ConvergencePoller, ConvergencePolicy, Field, Predicate, StoreQueryAdapter,
    WaitTiers,
};
use cadence_mediastore::{DeferredWriter, MediaScanner, MediaStore, Mutation, Track, WriteLatency};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::Instant;

const SORT_FIXTURE: [&str; 10] = [
    "MyPlaylist",
    "//><..",
    "0random@112",
    "UPPERLETTER",
    "normal",
    "combination011",
    "0123456789",
    "~!@#$%^&*()_+",
    "**1E?:|}{[]~~.,;'",
    "loooooooog",
];

fn create_store(dir: &TempDir) -> Arc<MediaStore> {
    init_test_tracing();
    Arc::new(MediaStore::create(dir.path().join("databases").join("media.db")).unwrap())
}

fn adapter(store: &Arc<MediaStore>, collection: Collection) -> StoreQueryAdapter {
    StoreQueryAdapter::new(Arc::<MediaStore>::clone(store), collection)
}

fn insert_playlist(store: &MediaStore, name: &str) {
    store
        .apply(&Mutation::InsertPlaylist {
            name: name.to_owned(),
        })
        .unwrap();
}

#[test]
fn test_sort_order_is_byte_order() {
    let dir = TempDir::new().unwrap();
    let store = create_store(&dir);
    for name in SORT_FIXTURE {
        insert_playlist(&store, name);
    }

    let observed = adapter(&store, Collection::Playlists)
        .query(&Predicate::all(), Some(Field::Name))
        .unwrap()
        .into_names();

    let mut expected: Vec<String> = SORT_FIXTURE.iter().map(|name| (*name).to_owned()).collect();
    expected.sort_by(|left, right| left.as_bytes().cmp(right.as_bytes()));
    assert_eq!(observed, expected);
    assert_eq!(observed.first().map(String::as_str), Some("**1E?:|}{[]~~.,;'"));
    assert_eq!(observed.last().map(String::as_str), Some("~!@#$%^&*()_+"));
}

#[test]
fn test_quote_in_name_is_bound_safely() {
    let dir = TempDir::new().unwrap();
    let store = create_store(&dir);
    let tricky = "**1E?:|}{[]~~.,;'";
    insert_playlist(&store, tricky);
    insert_playlist(&store, "x' OR '1'='1");

    let playlists = adapter(&store, Collection::Playlists);
    let exact = playlists
        .query(&Predicate::eq(Field::Name, tricky), None)
        .unwrap();
    assert_eq!(exact.matched_names(), [tricky]);

    store
        .apply(&Mutation::Delete {
            collection: Collection::Playlists,
            predicate: Predicate::eq(Field::Name, "x' OR '1'='1"),
        })
        .unwrap();
    let remaining = playlists.query(&Predicate::all(), None).unwrap();
    assert_eq!(remaining.matched_names(), [tricky]);
}

#[test]
fn test_non_empty_skips_empty_titles() {
    let dir = TempDir::new().unwrap();
    let store = create_store(&dir);
    let mut untitled = Track::from_path(&dir.path().join(".mp3"));
    untitled.title = String::new();
    store.apply(&Mutation::InsertTrack(untitled)).unwrap();
    store
        .apply(&Mutation::InsertTrack(Track::from_path(
            &dir.path().join("GOLDEN.mp3"),
        )))
        .unwrap();

    let titled = adapter(&store, Collection::Audio)
        .query(&Predicate::non_empty(Field::Title), None)
        .unwrap();
    assert_eq!(titled.matched_names(), ["GOLDEN"]);
}

#[test]
fn test_store_lost_after_creation_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let store = create_store(&dir);
    fs::remove_file(store.path()).unwrap();

    let error = adapter(&store, Collection::Playlists)
        .query(&Predicate::all(), None)
        .unwrap_err();
    assert!(error.is_store_failure());
}

#[tokio::test(start_paused = true)]
async fn test_poller_absorbs_deferred_delete() {
    let dir = TempDir::new().unwrap();
    let store = create_store(&dir);
    insert_playlist(&store, "TestDeletPlaylist");

    let tiers = WaitTiers::default();
    let writer = DeferredWriter::spawn(Arc::clone(&store), WriteLatency::from_tiers(&tiers));
    let poller = ConvergencePoller::new(
        adapter(&store, Collection::Playlists),
        Clock::new(tiers),
        ConvergencePolicy::from_tiers(&tiers, tiers.short).unwrap(),
    );
    let named = Predicate::eq(Field::Name, "TestDeletPlaylist");

    writer
        .submit(Mutation::Delete {
            collection: Collection::Playlists,
            predicate: named.clone(),
        })
        .unwrap();

    // The delete lands after 3s: past the 2s presence-sized stage, caught
    // by the third absence stage at 8s.
    let start = Instant::now();
    let outcome = poller.await_absent(&named).await.unwrap();
    assert!(outcome.is_converged());
    assert_eq!(outcome.stages(), 3);
    assert_eq!(start.elapsed(), Duration::from_secs(8));
}

#[tokio::test(start_paused = true)]
async fn test_scan_registers_copied_file() {
    let dir = TempDir::new().unwrap();
    let store = create_store(&dir);
    let sdcard = dir.path().join("sdcard");
    let music = sdcard.join("media_api").join("music");
    fs::create_dir_all(&music).unwrap();
    fs::write(music.join("GOLDEN.mp3"), b"ID3").unwrap();

    let tiers = WaitTiers::default();
    let writer = DeferredWriter::spawn(Arc::clone(&store), WriteLatency::from_tiers(&tiers));
    let scanner = MediaScanner::new(&sdcard, writer, tiers.short);
    let mut finished = scanner.subscribe();

    scanner.broadcast_mounted();
    let report = finished.recv().await.unwrap();

    assert_eq!(report.tracks, 1);
    let audio = adapter(&store, Collection::Audio)
        .query(&Predicate::eq(Field::Title, "GOLDEN"), None)
        .unwrap();
    assert_eq!(audio.matched_count(), 1);
}
