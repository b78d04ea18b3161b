//! In-process stand-in for the music player application.
//!
//! Lists are rendered from the content store on every look, so they show
//! exactly what the store has made visible so far. Every change the app
//! makes goes through the [`DeferredWriter`] and lands later.

use crate::ui::{ButtonRef, UiAutomation};
use async_trait::async_trait;
use cadence_core::{Collection, ContentStore, Error, Field, Predicate, Result, StoreQueryAdapter};
use cadence_mediastore::{DeferredWriter, Mutation, discover_tracks};
use crossterm::event::{KeyCode, KeyEvent};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Options menu entry creating a playlist.
pub const NEW_PLAYLIST: &str = "New playlist";
/// Context menu entry deleting the pressed item.
pub const DELETE: &str = "Delete";
/// Context menu entry renaming the pressed playlist.
pub const RENAME: &str = "Rename";
/// Context menu entry making the pressed track the ringtone.
pub const USE_AS_RINGTONE: &str = "Use as phone ringtone";
/// Context menu entry playing the pressed item.
pub const PLAY: &str = "Play";
/// Confirmation button.
pub const OK: &str = "OK";
/// Edit dialog confirmation button.
pub const SAVE: &str = "Save";
/// Dismiss button.
pub const CANCEL: &str = "Cancel";

const PLAYLIST_CONTEXT: &[&str] = &[PLAY, DELETE, RENAME];
const TRACK_CONTEXT: &[&str] = &[PLAY, USE_AS_RINGTONE, DELETE];
const TEXT_POLL: Duration = Duration::from_millis(50);

/// Screen the app is launched on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaunchScreen {
    /// Playlist browser
    #[default]
    Playlists,
    /// Track browser
    Tracks,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Screen {
    PlaylistBrowser,
    TrackBrowser,
    CreatePlaylist,
    RenamePlaylist { from: String },
    ConfirmDeleteItems { title: String },
}

impl Screen {
    const fn name(&self) -> &'static str {
        match self {
            Self::PlaylistBrowser => "PlaylistBrowserActivity",
            Self::TrackBrowser => "TrackBrowserActivity",
            Self::CreatePlaylist => "CreatePlaylist",
            Self::RenamePlaylist { .. } => "RenamePlaylist",
            Self::ConfirmDeleteItems { .. } => "ConfirmDeleteItems",
        }
    }

    const fn buttons(&self) -> &'static [&'static str] {
        match self {
            Self::PlaylistBrowser | Self::TrackBrowser => &[],
            Self::CreatePlaylist | Self::RenamePlaylist { .. } => &[SAVE, CANCEL],
            Self::ConfirmDeleteItems { .. } => &[OK, CANCEL],
        }
    }

    const fn list(&self) -> Option<Collection> {
        match self {
            Self::PlaylistBrowser => Some(Collection::Playlists),
            Self::TrackBrowser => Some(Collection::Audio),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Popup {
    Options(&'static [&'static str]),
    Context {
        target: String,
        items: &'static [&'static str],
    },
}

impl Popup {
    const fn items(&self) -> &'static [&'static str] {
        match self {
            Self::Options(items) | Self::Context { items, .. } => items,
        }
    }
}

#[derive(Debug)]
struct AppState {
    root: Screen,
    stack: Vec<Screen>,
    popup: Option<Popup>,
    fields: Vec<String>,
}

impl AppState {
    fn top(&self) -> &Screen {
        self.stack.last().unwrap_or(&self.root)
    }

    /// Trimmed content of the first edit field.
    fn first_field(&self) -> String {
        self.fields
            .first()
            .map(|field| field.trim().to_owned())
            .unwrap_or_default()
    }

    fn open(&mut self, screen: Screen, fields: Vec<String>) {
        tracing::debug!("open {}", screen.name());
        self.stack.push(screen);
        self.fields = fields;
    }

    fn close(&mut self) {
        self.stack.pop();
        self.fields.clear();
    }
}

/// Simulated music player driven through [`UiAutomation`].
#[derive(Debug)]
pub struct SimulatedMusicApp {
    playlists: StoreQueryAdapter,
    audio: StoreQueryAdapter,
    writer: DeferredWriter,
    media_root: PathBuf,
    state: Mutex<AppState>,
    swallow_next_click: AtomicBool,
}

impl SimulatedMusicApp {
    /// Launch on `screen`, reading lists from `store` and writing through
    /// `writer`. Track files live under `media_root`.
    pub fn launch(
        screen: LaunchScreen,
        store: &Arc<dyn ContentStore>,
        writer: DeferredWriter,
        media_root: impl Into<PathBuf>,
    ) -> Self {
        let root = match screen {
            LaunchScreen::Playlists => Screen::PlaylistBrowser,
            LaunchScreen::Tracks => Screen::TrackBrowser,
        };
        tracing::debug!("launching {}", root.name());
        Self {
            playlists: StoreQueryAdapter::new(Arc::clone(store), Collection::Playlists),
            audio: StoreQueryAdapter::new(Arc::clone(store), Collection::Audio),
            writer,
            media_root: media_root.into(),
            state: Mutex::new(AppState {
                root,
                stack: Vec::new(),
                popup: None,
                fields: Vec::new(),
            }),
            swallow_next_click: AtomicBool::new(false),
        }
    }

    /// Make the next tap on text do nothing, as a sluggish menu would.
    pub fn swallow_next_click(&self) {
        self.swallow_next_click.store(true, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, AppState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn list_names(&self, collection: Collection) -> Result<Vec<String>> {
        let adapter = match collection {
            Collection::Playlists => &self.playlists,
            Collection::Audio => &self.audio,
        };
        Ok(adapter
            .query(&Predicate::all(), Some(collection.name_field()))?
            .into_names())
    }

    fn visible_texts(&self) -> Result<Vec<String>> {
        let (screen, popup) = {
            let state = self.lock();
            (state.top().clone(), state.popup.clone())
        };

        let mut texts = Vec::new();
        if let Some(popup) = popup {
            texts.extend(popup.items().iter().map(|item| (*item).to_owned()));
        }
        if let Some(collection) = screen.list() {
            texts.extend(self.list_names(collection)?);
        }
        if let Screen::ConfirmDeleteItems { title } = &screen {
            texts.push(format!("{title} will be deleted permanently."));
        }
        texts.extend(screen.buttons().iter().map(|button| (*button).to_owned()));
        Ok(texts)
    }

    fn select_item(&self, state: &mut AppState, popup: Popup, item: &str) -> Result<()> {
        match (popup, item) {
            (Popup::Options(_), NEW_PLAYLIST) => {
                let existing = self.list_names(Collection::Playlists)?.len();
                state.open(Screen::CreatePlaylist, vec![format!("Playlist {}", existing + 1)]);
            }
            (Popup::Context { target, .. }, DELETE)
                if state.top().list() == Some(Collection::Playlists) =>
            {
                self.writer.submit(Mutation::Delete {
                    collection: Collection::Playlists,
                    predicate: Predicate::eq(Field::Name, target),
                })?;
            }
            (Popup::Context { target, .. }, RENAME) => {
                state.open(Screen::RenamePlaylist { from: target.clone() }, vec![target]);
            }
            (Popup::Context { target, .. }, DELETE) => {
                state.open(Screen::ConfirmDeleteItems { title: target }, Vec::new());
            }
            (Popup::Context { target, .. }, USE_AS_RINGTONE) => {
                self.writer.submit(Mutation::SetRingtone { title: target })?;
            }
            (_, other) => tracing::debug!("menu item '{other}' has no effect"),
        }
        Ok(())
    }

    fn press(&self, state: &mut AppState, label: &str) -> Result<()> {
        let screen = state.top().clone();
        match (screen, label) {
            (_, CANCEL) => state.close(),
            (Screen::CreatePlaylist, SAVE) => {
                let name = state.first_field();
                if name.is_empty() {
                    tracing::debug!("save ignored: empty playlist name");
                    return Ok(());
                }
                self.writer.submit(Mutation::InsertPlaylist { name })?;
                state.close();
            }
            (Screen::RenamePlaylist { from }, SAVE) => {
                let to = state.first_field();
                if !to.is_empty() && to != from {
                    self.writer.submit(Mutation::RenamePlaylist { from, to })?;
                }
                state.close();
            }
            (Screen::ConfirmDeleteItems { title }, OK) => {
                self.delete_track(&title)?;
                state.close();
            }
            (current, other) => tracing::debug!("'{other}' does nothing on {}", current.name()),
        }
        Ok(())
    }

    /// Remove the track's file, then its store row.
    fn delete_track(&self, title: &str) -> Result<()> {
        let file = discover_tracks(&self.media_root)?
            .into_iter()
            .find(|track| track.title == title);

        let predicate = match file {
            Some(track) => {
                fs::remove_file(&track.data)?;
                tracing::debug!("removed {}", track.data);
                Predicate::eq(Field::Data, track.data)
            }
            None => Predicate::eq(Field::Title, title),
        };
        self.writer.submit(Mutation::Delete {
            collection: Collection::Audio,
            predicate,
        })?;
        Ok(())
    }
}

fn not_found(target: impl Into<String>) -> Error {
    Error::ActionTargetNotFound {
        target: target.into(),
        timeout_ms: 0,
    }
}

#[async_trait]
impl UiAutomation for SimulatedMusicApp {
    async fn wait_for_text(&self, text: &str, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.visible_texts()?.iter().any(|shown| shown == text) {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            sleep(TEXT_POLL.min(deadline - now)).await;
        }
    }

    async fn click_text(&self, text: &str) -> Result<()> {
        if self.swallow_next_click.swap(false, Ordering::SeqCst) {
            tracing::debug!("click on '{text}' swallowed");
            return Ok(());
        }

        let mut state = self.lock();
        if let Some(popup) = state.popup.take() {
            if popup.items().contains(&text) {
                return self.select_item(&mut state, popup, text);
            }
            state.popup = Some(popup);
            return Err(not_found(text));
        }

        if state.top().buttons().contains(&text) {
            return self.press(&mut state, text);
        }
        let list = state.top().list();
        drop(state);
        match list {
            Some(collection) if self.list_names(collection)?.iter().any(|name| name == text) => {
                tracing::debug!("opened '{text}'");
                Ok(())
            }
            _ => Err(not_found(text)),
        }
    }

    async fn long_click_text(&self, text: &str) -> Result<()> {
        let list = {
            let state = self.lock();
            if state.popup.is_some() {
                return Err(not_found(text));
            }
            state.top().list()
        };
        let Some(collection) = list else {
            return Err(not_found(text));
        };
        if !self.list_names(collection)?.iter().any(|name| name == text) {
            return Err(not_found(text));
        }

        let items = match collection {
            Collection::Playlists => PLAYLIST_CONTEXT,
            Collection::Audio => TRACK_CONTEXT,
        };
        self.lock().popup = Some(Popup::Context {
            target: text.to_owned(),
            items,
        });
        Ok(())
    }

    async fn click_button(&self, button: &ButtonRef) -> Result<()> {
        let mut state = self.lock();
        if state.popup.is_some() {
            return Err(not_found(button.to_string()));
        }
        let buttons = state.top().buttons();
        let label = match button {
            ButtonRef::Index(index) => buttons.get(*index).copied(),
            ButtonRef::Label(label) => buttons.iter().copied().find(|shown| *shown == *label),
        };
        match label {
            Some(label) => self.press(&mut state, label),
            None => Err(not_found(button.to_string())),
        }
    }

    async fn send_key(&self, key: KeyEvent) -> Result<()> {
        let mut state = self.lock();
        match key.code {
            KeyCode::Menu => {
                if *state.top() == Screen::PlaylistBrowser {
                    state.popup = Some(Popup::Options(&[NEW_PLAYLIST]));
                }
            }
            KeyCode::Esc => {
                if state.popup.take().is_none() {
                    state.close();
                }
            }
            other => tracing::debug!("key {other:?} ignored on {}", state.top().name()),
        }
        Ok(())
    }

    async fn clear_field(&self, index: usize) -> Result<()> {
        let mut state = self.lock();
        let field = state
            .fields
            .get_mut(index)
            .ok_or_else(|| not_found(format!("edit text #{index}")))?;
        field.clear();
        Ok(())
    }

    async fn enter_text(&self, index: usize, text: &str) -> Result<()> {
        let mut state = self.lock();
        let field = state
            .fields
            .get_mut(index)
            .ok_or_else(|| not_found(format!("edit text #{index}")))?;
        field.push_str(text);
        Ok(())
    }

    async fn scroll_up(&self) {
        tracing::trace!("scroll up on {}", self.lock().top().name());
    }

    fn current_screen(&self) -> String {
        self.lock().top().name().to_owned()
    }

    fn finish_opened_activities(&self) {
        let mut state = self.lock();
        state.stack.clear();
        state.popup = None;
        state.fields.clear();
    }
}
