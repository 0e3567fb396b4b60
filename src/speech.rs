//! Text-to-speech playback.
//!
//! Utterances are queued to a worker thread that plays them one after another through
//! a [`SpeechEngine`]. Every request gets an [`UtteranceId`], and the worker reports
//! `AppEvent::SpeechDone(id)` on the app channel once playback is over, which is the
//! only way the rest of a round gets to run.

use std::io;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use crate::runtime::AppEvent;

/// Words per minute the TTS programs use at rate 1.0.
const BASE_WORDS_PER_MINUTE: f32 = 175.0;
const MIN_WORDS_PER_MINUTE: f32 = 80.0;
const MAX_WORDS_PER_MINUTE: f32 = 450.0;

const KNOWN_PROGRAMS: [&str; 2] = ["espeak-ng", "espeak"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    /// Language tags, primary one first.
    pub languages: Vec<String>,
}

impl Voice {
    pub fn new(name: &str, languages: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            languages: languages.iter().map(|l| l.to_string()).collect(),
        }
    }

    pub fn primary_language(&self) -> Option<&str> {
        self.languages.first().map(String::as_str)
    }
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase().replace('_', "-")
}

/// Pick a voice for a locale hint.
///
/// Tries an exact language tag, then a voice whose name contains the hint, then a
/// voice sharing the primary language subtag. `None` means "use the platform default",
/// which is also the answer when there is no hint.
pub fn select_voice(voices: &[Voice], hint: Option<&str>) -> Option<Voice> {
    let hint = normalize_tag(hint?);
    if hint.is_empty() {
        return None;
    }
    let primary = hint.split('-').next().unwrap_or(&hint).to_string();

    voices
        .iter()
        .find(|v| v.languages.iter().any(|l| normalize_tag(l) == hint))
        .or_else(|| voices.iter().find(|v| v.name.to_lowercase().contains(&hint)))
        .or_else(|| {
            voices.iter().find(|v| {
                v.languages
                    .iter()
                    .any(|l| normalize_tag(l).split('-').next() == Some(primary.as_str()))
            })
        })
        .cloned()
}

/// Blocking speech backend, only ever called from the announcer's worker thread.
pub trait SpeechEngine: Send + 'static {
    fn voices(&self) -> Vec<Voice>;
    fn say(&self, text: &str, rate: f32, voice: Option<&Voice>) -> io::Result<()>;
}

/// Speaks through an espeak-compatible program.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: String,
}

impl CommandEngine {
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// First known TTS program that runs on this machine.
    pub fn detect() -> Option<Self> {
        KNOWN_PROGRAMS.iter().find_map(|program| {
            let available = Command::new(program)
                .arg("--version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .is_ok_and(|status| status.success());
            available.then(|| Self::new(*program))
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

pub fn words_per_minute(rate: f32) -> u32 {
    (BASE_WORDS_PER_MINUTE * rate)
        .round()
        .clamp(MIN_WORDS_PER_MINUTE, MAX_WORDS_PER_MINUTE) as u32
}

/// Parse the table printed by `espeak-ng --voices`.
pub fn parse_voice_listing(listing: &str) -> Vec<Voice> {
    listing
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 5 {
                return None;
            }
            let mut languages = vec![fields[1].to_string()];
            let others = fields[5..].join(" ");
            languages.extend(
                others
                    .split('(')
                    .filter_map(|part| part.split_whitespace().next())
                    .map(|tag| tag.trim_end_matches(')').to_string())
                    .filter(|tag| !tag.is_empty()),
            );
            Some(Voice {
                name: fields[3].to_string(),
                languages,
            })
        })
        .collect()
}

impl SpeechEngine for CommandEngine {
    fn voices(&self) -> Vec<Voice> {
        match Command::new(&self.program)
            .arg("--voices")
            .stderr(Stdio::null())
            .output()
        {
            Ok(output) if output.status.success() => {
                parse_voice_listing(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(output) => {
                tracing::warn!(program = %self.program, status = %output.status, "voice listing failed");
                Vec::new()
            }
            Err(err) => {
                tracing::warn!(program = %self.program, error = %err, "voice listing failed");
                Vec::new()
            }
        }
    }

    fn say(&self, text: &str, rate: f32, voice: Option<&Voice>) -> io::Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-s").arg(words_per_minute(rate).to_string());
        if let Some(language) = voice.and_then(Voice::primary_language) {
            cmd.arg("-v").arg(language);
        }
        let status = cmd
            .arg("--")
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::other(format!(
                "{} exited with {}",
                self.program, status
            )))
        }
    }
}

/// Engine that only logs what it would have said.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentEngine;

impl SpeechEngine for SilentEngine {
    fn voices(&self) -> Vec<Voice> {
        Vec::new()
    }

    fn say(&self, text: &str, rate: f32, _voice: Option<&Voice>) -> io::Result<()> {
        tracing::info!(text, rate, "muted utterance");
        Ok(())
    }
}

/// The seam the interaction controller speaks through.
pub trait Announce {
    /// Queue `text` for playback and return immediately.
    fn speak(&mut self, text: &str, rate: f32, voice_hint: Option<&str>) -> UtteranceId;
}

struct Request {
    id: UtteranceId,
    text: String,
    rate: f32,
    voice_hint: Option<String>,
}

/// Queues utterances to a single worker so overlapping requests play in order.
pub struct SpeechAnnouncer {
    queue: Option<Sender<Request>>,
    events: Sender<AppEvent>,
    worker: Option<JoinHandle<()>>,
    next_id: u64,
}

impl SpeechAnnouncer {
    pub fn spawn<E: SpeechEngine>(engine: E, events: Sender<AppEvent>) -> Self {
        let (tx, rx) = mpsc::channel::<Request>();
        let done = events.clone();

        let worker = thread::spawn(move || {
            let voices = engine.voices();
            tracing::debug!(count = voices.len(), "voices available");

            for request in rx {
                let voice = select_voice(&voices, request.voice_hint.as_deref());
                tracing::debug!(
                    id = request.id.0,
                    voice = voice.as_ref().map(|v| v.name.as_str()),
                    "speaking"
                );
                if let Err(err) = engine.say(&request.text, request.rate, voice.as_ref()) {
                    tracing::warn!(id = request.id.0, error = %err, "speech failed");
                }
                if done.send(AppEvent::SpeechDone(request.id)).is_err() {
                    break;
                }
            }
        });

        Self {
            queue: Some(tx),
            events,
            worker: Some(worker),
            next_id: 0,
        }
    }

    /// Close the queue and wait for the worker to drain it.
    pub fn shutdown(mut self) {
        self.queue.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("speech worker panicked");
            }
        }
    }
}

impl Announce for SpeechAnnouncer {
    fn speak(&mut self, text: &str, rate: f32, voice_hint: Option<&str>) -> UtteranceId {
        self.next_id += 1;
        let id = UtteranceId(self.next_id);
        let request = Request {
            id,
            text: text.to_string(),
            rate,
            voice_hint: voice_hint.map(str::to_string),
        };

        let queued = self
            .queue
            .as_ref()
            .is_some_and(|queue| queue.send(request).is_ok());
        if !queued {
            // Without a worker nothing would ever complete the round.
            tracing::warn!(id = id.0, "speech worker gone, completing immediately");
            let _ = self.events.send(AppEvent::SpeechDone(id));
        }
        id
    }
}

impl Drop for SpeechAnnouncer {
    fn drop(&mut self) {
        // Detach rather than join so quitting never waits on playback.
        self.queue.take();
    }
}
