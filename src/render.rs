use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::Span,
    widgets::{
        canvas::{Canvas, Circle, Line, Rectangle},
        Clear, Widget,
    },
};

use crate::question::Question;

/// Logical canvas size; the terminal area is scaled to it.
pub const CANVAS_WIDTH: f64 = 100.0;
pub const CANVAS_HEIGHT: f64 = 60.0;

const LEFT_ANCHOR_X: f64 = CANVAS_WIDTH * 0.25;
const RIGHT_ANCHOR_X: f64 = CANVAS_WIDTH * 0.75;
const PALM_BOTTOM_Y: f64 = 8.0;
const PALM_HEIGHT: f64 = 12.0;

const MAX_FINGER_LENGTH: f64 = 26.0;
const MIN_FINGER_LENGTH: f64 = 10.0;
const MAX_LENGTH_STEP: f64 = 4.0;
const FINGER_SPACING: f64 = 4.0;
const HAND_MAX_WIDTH: f64 = CANVAS_WIDTH * 0.4;
const NAIL_RADIUS: f64 = 1.2;

const SKIN: Color = Color::Rgb(255, 219, 172);
const NAIL: Color = Color::Rgb(255, 192, 203);

/// Finger lengths for one hand, left to right.
///
/// Longest in the middle (both middle fingers for an even count) and strictly
/// shorter toward either edge, mirrored around the centre.
pub fn finger_lengths(count: u32) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }
    let half = (count - 1) as f64 / 2.0;
    let step = if half > 0.0 {
        ((MAX_FINGER_LENGTH - MIN_FINGER_LENGTH) / half).min(MAX_LENGTH_STEP)
    } else {
        0.0
    };

    (0..count)
        .map(|i| MAX_FINGER_LENGTH - step * (i as f64 - half).abs())
        .collect()
}

fn finger_spacing(count: u32) -> f64 {
    FINGER_SPACING.min(HAND_MAX_WIDTH / count.max(1) as f64)
}

/// Draws the two hands of a question, or nothing at all without one.
pub struct HandsView<'a> {
    question: Option<&'a Question>,
    show_numerals: bool,
}

impl<'a> HandsView<'a> {
    pub fn new(question: Option<&'a Question>) -> Self {
        Self {
            question,
            show_numerals: true,
        }
    }

    pub fn show_numerals(mut self, show: bool) -> Self {
        self.show_numerals = show;
        self
    }
}

struct Hand {
    anchor_x: f64,
    count: u32,
    label: &'static str,
}

impl Widget for HandsView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Clear.render(area, buf);
        let Some(question) = self.question else {
            return;
        };

        let hands = [
            Hand {
                anchor_x: LEFT_ANCHOR_X,
                count: question.left_count,
                label: "Left",
            },
            Hand {
                anchor_x: RIGHT_ANCHOR_X,
                count: question.right_count,
                label: "Right",
            },
        ];
        let show_numerals = self.show_numerals;

        Canvas::default()
            .marker(Marker::Braille)
            .x_bounds([0.0, CANVAS_WIDTH])
            .y_bounds([0.0, CANVAS_HEIGHT])
            .paint(|ctx| {
                for hand in &hands {
                    let spacing = finger_spacing(hand.count);
                    let span = (hand.count.max(1) - 1) as f64 * spacing;
                    let start_x = hand.anchor_x - span / 2.0;
                    let palm_top = PALM_BOTTOM_Y + PALM_HEIGHT;

                    ctx.draw(&Rectangle {
                        x: start_x - spacing,
                        y: PALM_BOTTOM_Y,
                        width: span + spacing * 2.0,
                        height: PALM_HEIGHT,
                        color: SKIN,
                    });

                    for (i, length) in finger_lengths(hand.count).into_iter().enumerate() {
                        let x = start_x + i as f64 * spacing;
                        ctx.draw(&Line {
                            x1: x,
                            y1: palm_top,
                            x2: x,
                            y2: palm_top + length,
                            color: SKIN,
                        });
                        ctx.draw(&Circle {
                            x,
                            y: palm_top + length,
                            radius: NAIL_RADIUS,
                            color: NAIL,
                        });
                    }

                    ctx.print(
                        hand.anchor_x - hand.label.len() as f64 / 2.0,
                        PALM_BOTTOM_Y - 4.0,
                        Span::styled(hand.label, Style::default().fg(Color::Gray)),
                    );

                    if show_numerals {
                        ctx.print(
                            hand.anchor_x,
                            palm_top + MAX_FINGER_LENGTH + 5.0,
                            Span::styled(
                                hand.count.to_string(),
                                Style::default()
                                    .fg(Color::Yellow)
                                    .add_modifier(Modifier::BOLD),
                            ),
                        );
                    }
                }
            })
            .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phrasebook::English;

    fn buffer_text(buf: &Buffer) -> String {
        buf.content().iter().map(|c| c.symbol()).collect()
    }

    fn render_to_buffer(question: Option<&Question>, show_numerals: bool) -> Buffer {
        let area = Rect::new(0, 0, 80, 24);
        let mut buf = Buffer::empty(area);
        HandsView::new(question)
            .show_numerals(show_numerals)
            .render(area, &mut buf);
        buf
    }

    #[test]
    fn finger_lengths_are_an_inverted_u() {
        for count in 1..=12 {
            let lengths = finger_lengths(count);
            assert_eq!(lengths.len(), count as usize);

            // mirrored
            for i in 0..lengths.len() {
                let mirror = lengths[lengths.len() - 1 - i];
                assert!((lengths[i] - mirror).abs() < 1e-9);
            }

            // strictly increasing up to the middle
            let mid = (lengths.len() - 1) / 2;
            for i in 0..mid {
                assert!(lengths[i] < lengths[i + 1], "count {} at {}", count, i);
            }

            let max = lengths.iter().cloned().fold(f64::MIN, f64::max);
            assert_eq!(lengths[mid], max);
            assert!(lengths.iter().all(|l| *l >= MIN_FINGER_LENGTH - 1e-9));
        }
    }

    #[test]
    fn even_counts_share_the_tallest_finger() {
        let lengths = finger_lengths(4);
        assert_eq!(lengths[1], lengths[2]);
        assert!(lengths[0] < lengths[1]);
    }

    #[test]
    fn zero_count_has_no_fingers() {
        assert!(finger_lengths(0).is_empty());
    }

    #[test]
    fn no_question_renders_blank() {
        let buf = render_to_buffer(None, true);
        assert!(buffer_text(&buf).chars().all(|c| c == ' '));
    }

    #[test]
    fn rendering_is_idempotent() {
        let q = Question::new(3, 4, &English);
        let first = render_to_buffer(Some(&q), true);
        let second = render_to_buffer(Some(&q), true);
        assert_eq!(first, second);
    }

    #[test]
    fn hands_and_numerals_are_drawn() {
        let q = Question::new(3, 4, &English);
        let text = buffer_text(&render_to_buffer(Some(&q), true));
        assert!(text.contains("Left"));
        assert!(text.contains("Right"));
        assert!(text.contains('3'));
        assert!(text.contains('4'));
    }

    #[test]
    fn numerals_can_be_hidden() {
        let q = Question::new(3, 4, &English);
        let text = buffer_text(&render_to_buffer(Some(&q), false));
        assert!(!text.contains('3'));
        assert!(!text.contains('4'));
    }
}
