use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};

use crate::{
    app::{App, SETTINGS_KEY},
    controller::InteractionState,
    render::HandsView,
    settings::SettingsEditor,
    speech::Announce,
};

const HORIZONTAL_MARGIN: u16 = 2;
const EDITOR_WIDTH_PERCENT: u16 = 60;
const EDITOR_HEIGHT_PERCENT: u16 = 70;

impl<A: Announce> Widget for &App<A> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let controller = &self.controller;
        let bold_style = Style::default().add_modifier(Modifier::BOLD);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .constraints([
                Constraint::Length(3), // header
                Constraint::Min(1),    // hands
                Constraint::Length(1), // score / settings summary
                Constraint::Length(1), // legend
            ])
            .split(area);

        let header_style = match controller.state() {
            InteractionState::Correct => bold_style.fg(Color::Green),
            InteractionState::Incorrect => bold_style.fg(Color::Red),
            _ => bold_style,
        };
        Paragraph::new(Span::styled(controller.header(), header_style))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::BOTTOM))
            .render(chunks[0], buf);

        HandsView::new(controller.question()).render(chunks[1], buf);

        let settings = controller.settings();
        let score = controller.score();
        Paragraph::new(Span::styled(
            format!(
                "correct {}   wrong {}   |   bounds {}/{}   rate {}   voice {}",
                score.correct,
                score.incorrect,
                settings.left_bound,
                settings.right_bound,
                settings.speech_rate,
                settings.locale
            ),
            Style::default().fg(Color::Cyan),
        ))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

        Paragraph::new(Span::styled(
            format!(
                "(space) start / (0-9) answer / ({}) settings / (esc)ape",
                SETTINGS_KEY
            ),
            Style::default().add_modifier(Modifier::ITALIC),
        ))
        .render(chunks[3], buf);

        if let Some(editor) = &self.editor {
            render_editor(editor, area, buf);
        }
    }
}

/// Area of the settings modal within `area`.
pub fn editor_area(area: Rect) -> Rect {
    let width = (u32::from(area.width) * u32::from(EDITOR_WIDTH_PERCENT) / 100) as u16;
    let height = (u32::from(area.height) * u32::from(EDITOR_HEIGHT_PERCENT) / 100) as u16;
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn render_editor(editor: &SettingsEditor, area: Rect, buf: &mut Buffer) {
    let modal = editor_area(area);
    Clear.render(modal, buf);

    let block = Block::default()
        .borders(Borders::ALL)
        .title("Game Settings (JSON)");
    let inner = block.inner(modal);
    block.render(modal, buf);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // text
            Constraint::Length(1), // error
            Constraint::Length(1), // help
        ])
        .split(inner);

    let text = editor.text();
    let lines: Vec<Line> = text.split('\n').map(Line::from).collect();
    Paragraph::new(lines).render(chunks[0], buf);

    if let Some(error) = editor.error() {
        Paragraph::new(Span::styled(
            error,
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ))
        .wrap(Wrap { trim: true })
        .render(chunks[1], buf);
    }

    Paragraph::new(Span::styled(
        "Press Enter to save, Escape to cancel",
        Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
    ))
    .render(chunks[2], buf);
}

/// Terminal cursor position while the editor is open.
pub fn editor_cursor(editor: &SettingsEditor, area: Rect) -> Position {
    let inner = Block::default().borders(Borders::ALL).inner(editor_area(area));
    let (row, col) = editor.cursor_position();
    Position::new(
        (inner.x + col).min(inner.right().saturating_sub(1)),
        (inner.y + row).min(inner.bottom().saturating_sub(1)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::InteractionController;
    use crate::phrasebook::English;
    use crate::question::Question;
    use crate::settings::{GameSettings, QueryFileStore};
    use crate::speech::UtteranceId;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Mute;

    impl Announce for Mute {
        fn speak(&mut self, _text: &str, _rate: f32, _hint: Option<&str>) -> UtteranceId {
            UtteranceId(0)
        }
    }

    fn test_app() -> App<Mute> {
        let controller =
            InteractionController::with_rng(GameSettings::default(), Mute, StdRng::seed_from_u64(5));
        App::new(
            controller,
            Box::new(QueryFileStore::with_path(
                std::env::temp_dir().join("fingers-ui-test.query"),
            )),
        )
    }

    fn render(app: &App<Mute>) -> String {
        let area = Rect::new(0, 0, 80, 24);
        let mut buffer = Buffer::empty(area);
        app.render(area, &mut buffer);
        buffer.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn idle_screen_shows_prompt_and_legend() {
        let rendered = render(&test_app());
        assert!(rendered.contains("Press Space"));
        assert!(rendered.contains("(space) start"));
        assert!(rendered.contains("correct 0"));
    }

    #[test]
    fn answering_screen_shows_sum_and_hands() {
        let mut app = test_app();
        app.controller.pose(Question::new(2, 3, &English));
        let rendered = render(&app);
        assert!(rendered.contains("2 + 3"));
        assert!(rendered.contains("Left"));
        assert!(rendered.contains("Right"));
    }

    #[test]
    fn editor_overlay_shows_json_and_error() {
        let mut app = test_app();
        let mut editor = SettingsEditor::open(app.settings());
        editor.on_key(crossterm::event::KeyEvent::new(
            crossterm::event::KeyCode::Char('x'),
            crossterm::event::KeyModifiers::NONE,
        ));
        editor.on_key(crossterm::event::KeyEvent::new(
            crossterm::event::KeyCode::Enter,
            crossterm::event::KeyModifiers::NONE,
        ));
        app.editor = Some(editor);

        let rendered = render(&app);
        assert!(rendered.contains("Game Settings (JSON)"));
        assert!(rendered.contains("\"leftBound\": 5"));
        assert!(rendered.contains("Invalid JSON"));
    }

    #[test]
    fn editor_cursor_stays_inside_modal() {
        let area = Rect::new(0, 0, 80, 24);
        let editor = SettingsEditor::open(&GameSettings::default());
        let pos = editor_cursor(&editor, area);
        let modal = editor_area(area);
        assert!(pos.x > modal.x && pos.x < modal.right());
        assert!(pos.y > modal.y && pos.y < modal.bottom());
    }

    #[test]
    fn editor_area_scales_on_very_wide_terminals() {
        let area = Rect::new(0, 0, 1100, 50);
        let modal = editor_area(area);
        assert_eq!((modal.width, modal.height), (660, 35));
        assert_eq!((modal.x, modal.y), (220, 7));
    }
}
