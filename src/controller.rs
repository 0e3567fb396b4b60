//! The question/answer state machine.
//!
//! Everything a round needs lives in [`InteractionController`]: the state, the
//! current question and typed digits, and the continuations waiting on speech.
//! Speaking never blocks; the rest of a step runs from [`InteractionController::on_speech_done`]
//! once the announcer reports that the utterance finished.

use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::phrasebook::{phrasebook_for, Phrasebook};
use crate::question::{Question, QuestionGenerator};
use crate::settings::GameSettings;
use crate::speech::{Announce, UtteranceId};

pub const IDLE_HEADER: &str = "Press Space";

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum InteractionState {
    Waiting,
    Answering,
    Incorrect,
    Correct,
}

/// How the true sum relates to the digits typed so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// sum < typed, shown as `<`
    Less,
    /// sum > typed, shown as `>`
    Greater,
    Equal,
}

impl Relation {
    pub fn symbol(self) -> char {
        match self {
            Relation::Less => '<',
            Relation::Greater => '>',
            Relation::Equal => '=',
        }
    }
}

pub fn compare(total: u32, typed: u64) -> Relation {
    match u64::from(total).cmp(&typed) {
        std::cmp::Ordering::Less => Relation::Less,
        std::cmp::Ordering::Greater => Relation::Greater,
        std::cmp::Ordering::Equal => Relation::Equal,
    }
}

/// What to do once a given utterance has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Continuation {
    AfterWelcome,
    AfterSuccess,
    AfterIncorrect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    pub question: Question,
    pub input: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Score {
    pub correct: u32,
    pub incorrect: u32,
}

pub struct InteractionController<A: Announce> {
    state: InteractionState,
    round: Option<Round>,
    first_round: bool,
    welcoming: bool,
    header: String,
    pending: HashMap<UtteranceId, Continuation>,
    score: Score,
    settings: GameSettings,
    phrasebook: Box<dyn Phrasebook>,
    announcer: A,
    rng: StdRng,
}

impl<A: Announce> InteractionController<A> {
    pub fn new(settings: GameSettings, announcer: A) -> Self {
        Self::with_rng(settings, announcer, StdRng::from_entropy())
    }

    pub fn with_rng(settings: GameSettings, announcer: A, rng: StdRng) -> Self {
        Self {
            state: InteractionState::Waiting,
            round: None,
            first_round: true,
            welcoming: false,
            header: IDLE_HEADER.to_string(),
            pending: HashMap::new(),
            score: Score::default(),
            phrasebook: phrasebook_for(settings.locale),
            settings,
            announcer,
            rng,
        }
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn question(&self) -> Option<&Question> {
        self.round.as_ref().map(|r| &r.question)
    }

    pub fn input(&self) -> &str {
        self.round.as_ref().map_or("", |r| r.input.as_str())
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn is_welcoming(&self) -> bool {
        self.welcoming
    }

    pub fn announcer(&self) -> &A {
        &self.announcer
    }

    /// Bounds apply from the next question on; the locale from the next utterance.
    pub fn apply_settings(&mut self, settings: GameSettings) {
        if settings.locale != self.settings.locale {
            self.phrasebook = phrasebook_for(settings.locale);
        }
        tracing::info!(query = %settings.to_query(), "settings applied");
        self.settings = settings;
    }

    /// Feed a key press. Returns whether the key changed anything.
    pub fn on_key(&mut self, key: KeyEvent) -> bool {
        // Held keys repeat; only the first press counts.
        if key.kind != KeyEventKind::Press {
            return false;
        }
        if key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
        {
            return false;
        }

        match key.code {
            KeyCode::Char(' ') => self.on_space(),
            KeyCode::Char(c) if c.is_ascii_digit() => self.on_digit(c),
            _ => false,
        }
    }

    /// Run whatever was waiting on utterance `id`.
    pub fn on_speech_done(&mut self, id: UtteranceId) {
        let Some(continuation) = self.pending.remove(&id) else {
            return;
        };
        tracing::debug!(id = id.0, ?continuation, state = %self.state, "speech done");

        match continuation {
            Continuation::AfterWelcome => {
                self.welcoming = false;
                if self.state == InteractionState::Waiting {
                    self.start_round();
                }
            }
            Continuation::AfterSuccess => {
                self.round = None;
                self.header = IDLE_HEADER.to_string();
                self.state = InteractionState::Waiting;
            }
            Continuation::AfterIncorrect => {
                if let Some(round) = self.round.as_mut() {
                    round.input.clear();
                    self.header = round.question.header();
                }
                self.state = InteractionState::Answering;
            }
        }
    }

    /// Start a round with a given question instead of a random one.
    ///
    /// Only valid while waiting; skips the welcome.
    pub fn pose(&mut self, question: Question) -> bool {
        if self.state != InteractionState::Waiting || self.welcoming {
            return false;
        }
        self.first_round = false;
        self.header = question.header();
        self.say(&question.prompt_text, None);
        tracing::info!(
            left = question.left_count,
            right = question.right_count,
            "round started"
        );
        self.round = Some(Round {
            question,
            input: String::new(),
        });
        self.state = InteractionState::Answering;
        true
    }

    fn start_round(&mut self) {
        let question =
            QuestionGenerator::generate(&self.settings, &mut self.rng, self.phrasebook.as_ref());
        self.pose(question);
    }

    fn on_space(&mut self) -> bool {
        if self.state != InteractionState::Waiting || self.welcoming {
            return false;
        }
        if self.first_round {
            self.first_round = false;
            self.welcoming = true;
            let welcome = self.phrasebook.welcome();
            self.say(&welcome, Some(Continuation::AfterWelcome));
        } else {
            self.start_round();
        }
        true
    }

    fn on_digit(&mut self, digit: char) -> bool {
        if self.state != InteractionState::Answering {
            return false;
        }
        let Some(round) = self.round.as_mut() else {
            return false;
        };
        let needed = round.question.digit_len();
        if round.input.len() >= needed {
            return false;
        }

        round.input.push(digit);
        let typed = round.input.parse::<u64>().unwrap_or(0);
        let total = round.question.total;
        self.header = format!(
            "{} {} {}",
            round.question.header(),
            compare(total, typed).symbol(),
            round.input
        );

        if round.input.len() < needed {
            return true;
        }

        if typed == u64::from(total) {
            let message = self.phrasebook.success(&round.question);
            tracing::info!(total, "answered correctly");
            self.score.correct += 1;
            self.state = InteractionState::Correct;
            self.say(&message, Some(Continuation::AfterSuccess));
        } else {
            let message = self.phrasebook.incorrect();
            tracing::info!(total, typed, "answered incorrectly");
            self.score.incorrect += 1;
            self.state = InteractionState::Incorrect;
            self.say(&message, Some(Continuation::AfterIncorrect));
        }
        true
    }

    fn say(&mut self, text: &str, then: Option<Continuation>) {
        let id = self.announcer.speak(
            text,
            self.settings.speech_rate,
            self.phrasebook.voice_hint(),
        );
        if let Some(continuation) = then {
            self.pending.insert(id, continuation);
        }
    }
}
