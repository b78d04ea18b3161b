//! Action driver against the simulated music player.

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
use cadence_core::{CadenceConfig, Collection, Error, Predicate};
use cadence_mediastore::Mutation;
use integration_tests::app::{CANCEL, DELETE, NEW_PLAYLIST, RENAME};
use integration_tests::environment::create_file_with_dirs;
use integration_tests::{
    ActionDriver, ActionSpec, ButtonRef, LaunchScreen, SimulatedMusicApp, TestEnvironment,
    UiAutomation as _, UiSession,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const ORIGINAL_PLAYLIST_NAME: &str = "Original_playlist_name";

fn secs(value: u64) -> Duration {
    Duration::from_secs(value)
}

fn environment() -> TestEnvironment {
    init_test_tracing();
    TestEnvironment::new(CadenceConfig::default()).unwrap()
}

fn launch(
    environment: &TestEnvironment,
    screen: LaunchScreen,
) -> (Arc<SimulatedMusicApp>, UiSession) {
    let app = Arc::new(environment.launch_app(screen));
    let session = UiSession::acquire(Arc::<SimulatedMusicApp>::clone(&app));
    (app, session)
}

fn driver_for<'session>(
    environment: &TestEnvironment,
    session: &'session UiSession,
) -> ActionDriver<'session> {
    ActionDriver::new(
        session,
        environment.clock().clone(),
        environment.config().ui.clone(),
    )
}

fn click(text: &str) -> ActionSpec {
    ActionSpec::ClickText {
        text: text.to_owned(),
    }
}

fn long_click(text: &str) -> ActionSpec {
    ActionSpec::LongClickText {
        text: text.to_owned(),
    }
}

fn screen(name: &str) -> ActionSpec {
    ActionSpec::AssertScreen {
        screen: name.to_owned(),
    }
}

fn seed_playlist(environment: &TestEnvironment, name: &str) {
    environment
        .store()
        .apply(&Mutation::InsertPlaylist {
            name: name.to_owned(),
        })
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_missing_target_fails_after_search_window() {
    let environment = environment();
    let (_app, session) = launch(&environment, LaunchScreen::Playlists);

    let start = Instant::now();
    let error = driver_for(&environment, &session)
        .perform(&click("TestDeletPlaylist"))
        .await
        .unwrap_err();

    assert_eq!(start.elapsed(), secs(5));
    assert!(
        matches!(
            &error,
            Error::ActionTargetNotFound { target, timeout_ms: 5000 } if target == "TestDeletPlaylist"
        ),
        "{error}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_sequence_settles_once() {
    let environment = environment();
    let (app, session) = launch(&environment, LaunchScreen::Playlists);

    let start = Instant::now();
    driver_for(&environment, &session)
        .perform_sequence(&[
            ActionSpec::SelectMenu {
                item: NEW_PLAYLIST.to_owned(),
            },
            screen("CreatePlaylist"),
            ActionSpec::EnterText {
                field: 0,
                text: ORIGINAL_PLAYLIST_NAME.to_owned(),
                clear: true,
            },
            ActionSpec::ClickButton {
                button: ButtonRef::Index(0),
            },
        ])
        .await
        .unwrap();

    assert_eq!(start.elapsed(), secs(1));
    assert_eq!(app.current_screen(), "PlaylistBrowserActivity");
}

#[tokio::test(start_paused = true)]
async fn test_enter_text_without_clear_appends() {
    let environment = environment();
    seed_playlist(&environment, ORIGINAL_PLAYLIST_NAME);
    let (_app, session) = launch(&environment, LaunchScreen::Playlists);
    let driver = driver_for(&environment, &session);

    driver
        .perform_sequence(&[
            long_click(ORIGINAL_PLAYLIST_NAME),
            click(RENAME),
            ActionSpec::EnterText {
                field: 0,
                text: "_v2".to_owned(),
                clear: false,
            },
            ActionSpec::ClickButton {
                button: ButtonRef::Label("Save".to_owned()),
            },
        ])
        .await
        .unwrap();
    environment.writer().flush().await.unwrap();

    let names = environment
        .poller(Collection::Playlists)
        .unwrap()
        .observe(&Predicate::all(), None)
        .unwrap();
    assert_eq!(names.matched_names(), ["Original_playlist_name_v2"]);
}

#[tokio::test(start_paused = true)]
async fn test_missing_field_is_a_missing_target() {
    let environment = environment();
    let (_app, session) = launch(&environment, LaunchScreen::Playlists);

    let error = driver_for(&environment, &session)
        .perform(&ActionSpec::EnterText {
            field: 0,
            text: "nowhere".to_owned(),
            clear: true,
        })
        .await
        .unwrap_err();

    assert!(matches!(error, Error::ActionTargetNotFound { .. }), "{error}");
}

#[tokio::test(start_paused = true)]
async fn test_click_with_retry_repeats_swallowed_click() {
    let environment = environment();
    seed_playlist(&environment, ORIGINAL_PLAYLIST_NAME);
    let (app, session) = launch(&environment, LaunchScreen::Playlists);
    let driver = driver_for(&environment, &session);

    driver.perform(&long_click(ORIGINAL_PLAYLIST_NAME)).await.unwrap();
    app.swallow_next_click();
    driver
        .perform(&ActionSpec::ClickTextWithRetry {
            text: RENAME.to_owned(),
        })
        .await
        .unwrap();

    assert_eq!(app.current_screen(), "RenamePlaylist");
}

#[tokio::test(start_paused = true)]
async fn test_click_with_retry_clicks_once_when_menu_closes() {
    let environment = environment();
    seed_playlist(&environment, ORIGINAL_PLAYLIST_NAME);
    let (app, session) = launch(&environment, LaunchScreen::Playlists);
    let driver = driver_for(&environment, &session);

    driver
        .perform_sequence(&[
            long_click(ORIGINAL_PLAYLIST_NAME),
            ActionSpec::ClickTextWithRetry {
                text: RENAME.to_owned(),
            },
            click(CANCEL),
        ])
        .await
        .unwrap();

    assert_eq!(app.current_screen(), "PlaylistBrowserActivity");
}

#[tokio::test(start_paused = true)]
async fn test_long_click_after_refresh_waits_for_scan() {
    let environment = environment();
    create_file_with_dirs(&environment.resolve("aaaToBeDeleted.mp3"), b"ID3").unwrap();
    let (app, session) = launch(&environment, LaunchScreen::Tracks);

    let start = Instant::now();
    environment.scanner().broadcast_mounted();
    driver_for(&environment, &session)
        .perform_sequence(&[
            ActionSpec::LongClickAfterRefresh {
                text: "aaaToBeDeleted".to_owned(),
            },
            click(DELETE),
        ])
        .await
        .unwrap();

    // Scan delay and insert latency are one short wait each.
    assert!(start.elapsed() >= secs(2), "{:?}", start.elapsed());
    assert!(start.elapsed() < secs(4), "{:?}", start.elapsed());
    assert_eq!(app.current_screen(), "ConfirmDeleteItems");
}

#[tokio::test(start_paused = true)]
async fn test_long_click_after_refresh_gives_up() {
    let environment = environment();
    let (_app, session) = launch(&environment, LaunchScreen::Tracks);

    let start = Instant::now();
    let error = driver_for(&environment, &session)
        .perform(&ActionSpec::LongClickAfterRefresh {
            text: "aaaToBeDeleted".to_owned(),
        })
        .await
        .unwrap_err();

    assert!(start.elapsed() >= secs(30));
    assert!(
        matches!(error, Error::ActionTargetNotFound { timeout_ms: 30_000, .. }),
        "{error}"
    );
}

#[tokio::test(start_paused = true)]
async fn test_unknown_key_is_a_config_error() {
    let environment = environment();
    let (_app, session) = launch(&environment, LaunchScreen::Playlists);

    let error = driver_for(&environment, &session)
        .perform(&ActionSpec::SendKeys {
            keys: vec!["hyper+menu".to_owned()],
        })
        .await
        .unwrap_err();

    assert!(matches!(error, Error::Config(_)), "{error}");
}

#[tokio::test(start_paused = true)]
async fn test_dropping_session_finishes_activities() {
    let environment = environment();
    let (app, session) = launch(&environment, LaunchScreen::Playlists);

    driver_for(&environment, &session)
        .perform_sequence(&[
            ActionSpec::SendKeys {
                keys: vec!["menu".to_owned()],
            },
            click(NEW_PLAYLIST),
        ])
        .await
        .unwrap();
    assert_eq!(app.current_screen(), "CreatePlaylist");

    drop(session);
    assert_eq!(app.current_screen(), "PlaylistBrowserActivity");
}
