use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::controller::InteractionController;
use crate::runtime::AppEvent;
use crate::settings::{EditorOutcome, GameSettings, SettingsEditor, SettingsStore};
use crate::speech::{Announce, SpeechAnnouncer};

/// Key that opens the settings editor.
pub const SETTINGS_KEY: char = 's';

/// Everything the running drill owns.
pub struct App<A: Announce = SpeechAnnouncer> {
    pub controller: InteractionController<A>,
    pub editor: Option<SettingsEditor>,
    store: Box<dyn SettingsStore>,
    dirty: bool,
}

impl<A: Announce> App<A> {
    pub fn new(controller: InteractionController<A>, store: Box<dyn SettingsStore>) -> Self {
        Self {
            controller,
            editor: None,
            store,
            dirty: true,
        }
    }

    /// Whether anything visible changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn settings(&self) -> &GameSettings {
        self.controller.settings()
    }

    /// Apply one event. Returns false when the app should quit.
    pub fn handle(&mut self, event: AppEvent) -> bool {
        match event {
            AppEvent::Key(key) => self.on_key(key),
            AppEvent::SpeechDone(id) => {
                self.controller.on_speech_done(id);
                self.dirty = true;
                true
            }
            AppEvent::Resize => {
                self.dirty = true;
                true
            }
            AppEvent::Tick => true,
        }
    }

    fn on_key(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return true;
        }

        if let Some(editor) = self.editor.as_mut() {
            self.dirty = true;
            match editor.on_key(key) {
                EditorOutcome::Pending => {}
                EditorOutcome::Cancelled => self.editor = None,
                EditorOutcome::Accepted(settings) => {
                    self.editor = None;
                    self.commit_settings(settings);
                }
            }
            return true;
        }

        match key.code {
            KeyCode::Esc => false,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => false,
            KeyCode::Char(SETTINGS_KEY) if key.modifiers.is_empty() => {
                self.editor = Some(SettingsEditor::open(self.controller.settings()));
                self.dirty = true;
                true
            }
            _ => {
                if self.controller.on_key(key) {
                    self.dirty = true;
                }
                true
            }
        }
    }

    fn commit_settings(&mut self, settings: GameSettings) {
        if let Err(err) = self.store.save(&settings) {
            tracing::warn!(error = %err, "could not persist settings");
        }
        self.controller.apply_settings(settings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::InteractionState;
    use crate::settings::{Locale, QueryFileStore};
    use crate::speech::UtteranceId;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::tempdir;

    #[derive(Default)]
    struct CountingAnnouncer {
        next: u64,
    }

    impl Announce for CountingAnnouncer {
        fn speak(&mut self, _text: &str, _rate: f32, _hint: Option<&str>) -> UtteranceId {
            self.next += 1;
            UtteranceId(self.next)
        }
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn app_with_store(store: QueryFileStore) -> App<CountingAnnouncer> {
        let controller = InteractionController::with_rng(
            store.load(),
            CountingAnnouncer::default(),
            StdRng::seed_from_u64(3),
        );
        App::new(controller, Box::new(store))
    }

    fn type_into(app: &mut App<CountingAnnouncer>, text: &str) {
        for c in text.chars() {
            app.handle(key(KeyCode::Char(c)));
        }
    }

    fn clear_editor(app: &mut App<CountingAnnouncer>) {
        let len = app.editor.as_ref().unwrap().text().chars().count();
        for _ in 0..len {
            app.handle(key(KeyCode::Backspace));
        }
    }

    #[test]
    fn escape_and_ctrl_c_quit() {
        let dir = tempdir().unwrap();
        let mut app = app_with_store(QueryFileStore::with_path(dir.path().join("s.query")));
        assert!(!app.handle(key(KeyCode::Esc)));
        assert!(!app.handle(AppEvent::Key(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL
        ))));
    }

    #[test]
    fn editor_accept_saves_and_applies() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("s.query");
        let mut app = app_with_store(QueryFileStore::with_path(&path));

        assert!(app.handle(key(KeyCode::Char('s'))));
        assert!(app.editor.is_some());

        clear_editor(&mut app);
        type_into(&mut app, r#"{"leftBound": 3, "locale": true}"#);
        assert!(app.handle(key(KeyCode::Enter)));

        assert!(app.editor.is_none());
        assert_eq!(app.settings().left_bound, 3);
        assert_eq!(app.settings().locale, Locale::Alt);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "leftBound=3&locale=1"
        );

        // reloading the persisted form gives the same settings
        let reloaded = QueryFileStore::with_path(&path).load();
        assert_eq!(&reloaded, app.settings());
    }

    #[test]
    fn editor_error_keeps_it_open_and_state_untouched() {
        let dir = tempdir().unwrap();
        let mut app = app_with_store(QueryFileStore::with_path(dir.path().join("s.query")));
        let before = *app.settings();

        app.handle(key(KeyCode::Char('s')));
        clear_editor(&mut app);
        type_into(&mut app, "[]");
        app.handle(key(KeyCode::Enter));

        let editor = app.editor.as_ref().unwrap();
        assert!(editor.error().is_some());
        assert_eq!(app.settings(), &before);
        assert_eq!(app.controller.state(), InteractionState::Waiting);

        // Esc closes the editor instead of quitting
        assert!(app.handle(key(KeyCode::Esc)));
        assert!(app.editor.is_none());
    }

    #[test]
    fn keys_go_to_editor_while_open() {
        let dir = tempdir().unwrap();
        let mut app = app_with_store(QueryFileStore::with_path(dir.path().join("s.query")));
        app.handle(key(KeyCode::Char('s')));
        app.handle(key(KeyCode::Char(' ')));
        assert_eq!(app.controller.state(), InteractionState::Waiting);
        assert!(!app.controller.is_welcoming());
    }

    #[test]
    fn speech_done_drives_controller() {
        let dir = tempdir().unwrap();
        let mut app = app_with_store(QueryFileStore::with_path(dir.path().join("s.query")));
        app.handle(key(KeyCode::Char(' ')));
        assert!(app.controller.is_welcoming());

        app.handle(AppEvent::SpeechDone(UtteranceId(1)));
        assert_eq!(app.controller.state(), InteractionState::Answering);
        assert!(app.controller.question().is_some());
    }

    #[test]
    fn redraw_only_after_visible_changes() {
        let dir = tempdir().unwrap();
        let mut app = app_with_store(QueryFileStore::with_path(dir.path().join("s.query")));
        assert!(app.take_dirty());
        assert!(!app.take_dirty());

        app.handle(AppEvent::Tick);
        app.handle(key(KeyCode::Char('x')));
        app.handle(key(KeyCode::Char('7')));
        assert!(!app.take_dirty());

        app.handle(key(KeyCode::Char(' ')));
        assert!(app.take_dirty());

        app.handle(AppEvent::SpeechDone(UtteranceId(1)));
        assert!(app.take_dirty());

        app.handle(AppEvent::Resize);
        assert!(app.take_dirty());
    }
}
