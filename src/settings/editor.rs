use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use unicode_width::UnicodeWidthChar;

use super::{apply_json, GameSettings};

/// Result of feeding one key to the editor.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorOutcome {
    /// Still open, either editing or showing an error.
    Pending,
    Accepted(GameSettings),
    Cancelled,
}

/// Modal JSON editor for the game settings.
///
/// Enter accepts, Esc cancels. A rejected accept keeps the editor open with the
/// error message set so the text can be corrected.
#[derive(Debug, Clone)]
pub struct SettingsEditor {
    base: GameSettings,
    text: Vec<char>,
    cursor: usize,
    error: Option<String>,
}

impl SettingsEditor {
    pub fn open(current: &GameSettings) -> Self {
        let text: Vec<char> = current.to_pretty_json().chars().collect();
        let cursor = text.len();
        Self {
            base: *current,
            text,
            cursor,
            error: None,
        }
    }

    pub fn text(&self) -> String {
        self.text.iter().collect()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn on_key(&mut self, key: KeyEvent) -> EditorOutcome {
        match key.code {
            KeyCode::Esc => return EditorOutcome::Cancelled,
            KeyCode::Enter => return self.accept(),
            KeyCode::Char(c) => {
                if key.modifiers.contains(KeyModifiers::CONTROL) {
                    if c == 'c' {
                        return EditorOutcome::Cancelled;
                    }
                    return EditorOutcome::Pending;
                }
                self.insert(c);
            }
            KeyCode::Tab => {
                self.insert(' ');
                self.insert(' ');
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.text.remove(self.cursor);
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.text.len() {
                    self.text.remove(self.cursor);
                }
            }
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.text.len()),
            KeyCode::Home => self.cursor = self.line_start(self.cursor),
            KeyCode::End => self.cursor = self.line_end(self.cursor),
            KeyCode::Up => self.move_vertical(false),
            KeyCode::Down => self.move_vertical(true),
            _ => {}
        }
        EditorOutcome::Pending
    }

    fn accept(&mut self) -> EditorOutcome {
        match apply_json(&self.base, &self.text()) {
            Ok(settings) => {
                self.error = None;
                EditorOutcome::Accepted(settings)
            }
            Err(err) => {
                tracing::info!(error = %err, "settings rejected");
                self.error = Some(err.to_string());
                EditorOutcome::Pending
            }
        }
    }

    fn insert(&mut self, c: char) {
        self.text.insert(self.cursor, c);
        self.cursor += 1;
        self.error = None;
    }

    fn line_start(&self, pos: usize) -> usize {
        self.text[..pos]
            .iter()
            .rposition(|c| *c == '\n')
            .map_or(0, |i| i + 1)
    }

    fn line_end(&self, pos: usize) -> usize {
        self.text[pos..]
            .iter()
            .position(|c| *c == '\n')
            .map_or(self.text.len(), |i| pos + i)
    }

    fn move_vertical(&mut self, down: bool) {
        let start = self.line_start(self.cursor);
        let column = self.cursor - start;

        let target_start = if down {
            let end = self.line_end(self.cursor);
            if end == self.text.len() {
                return;
            }
            end + 1
        } else {
            if start == 0 {
                return;
            }
            self.line_start(start - 1)
        };

        let target_end = self.line_end(target_start);
        self.cursor = (target_start + column).min(target_end);
    }

    /// Cursor position as (row, display column) within the text.
    pub fn cursor_position(&self) -> (u16, u16) {
        let start = self.line_start(self.cursor);
        let row = self.text[..start].iter().filter(|c| **c == '\n').count();
        let col: usize = self.text[start..self.cursor]
            .iter()
            .map(|c| c.width().unwrap_or(0))
            .sum();
        (row as u16, col as u16)
    }
}
