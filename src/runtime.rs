use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent};

use crate::speech::UtteranceId;

/// Unified event type consumed by the app runner
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    Tick,
    /// An utterance finished playing (or failed to play).
    SpeechDone(UtteranceId),
}

/// Source of app events (keyboard, resize, speech completion)
pub trait EventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError>;
}

/// Event source backed by the app's event channel.
///
/// The terminal reader and the speech worker both feed the sending half, so the
/// loop sees key presses and speech completions in one ordered stream.
pub struct ChannelEventSource {
    rx: Receiver<AppEvent>,
}

impl ChannelEventSource {
    pub fn new(rx: Receiver<AppEvent>) -> Self {
        Self { rx }
    }

    /// Fresh channel; hand the sender to producers.
    pub fn channel() -> (Sender<AppEvent>, Self) {
        let (tx, rx) = mpsc::channel();
        (tx, Self::new(rx))
    }
}

impl EventSource for ChannelEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Forward crossterm key and resize events into the app channel.
pub fn spawn_terminal_reader(tx: Sender<AppEvent>) {
    std::thread::spawn(move || loop {
        match event::read() {
            Ok(CtEvent::Key(key)) => {
                if tx.send(AppEvent::Key(key)).is_err() {
                    break;
                }
            }
            Ok(CtEvent::Resize(_, _)) => {
                if tx.send(AppEvent::Resize).is_err() {
                    break;
                }
            }
            Ok(_) => {}
            Err(err) => {
                tracing::error!(error = %err, "terminal event reader stopped");
                break;
            }
        }
    });
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: EventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: EventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> AppEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => AppEvent::Tick,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};

    #[test]
    fn step_returns_tick_on_timeout() {
        let (_tx, es) = ChannelEventSource::channel();
        let runner = Runner::new(es, FixedTicker::new(Duration::from_millis(1)));

        assert_eq!(runner.step(), AppEvent::Tick);
    }

    #[test]
    fn step_passes_through_events_in_order() {
        let (tx, es) = ChannelEventSource::channel();
        let key = KeyEvent::new(KeyCode::Char(' '), KeyModifiers::NONE);
        tx.send(AppEvent::Key(key)).unwrap();
        tx.send(AppEvent::SpeechDone(UtteranceId(3))).unwrap();
        tx.send(AppEvent::Resize).unwrap();
        let runner = Runner::new(es, FixedTicker::new(Duration::from_millis(10)));

        assert_eq!(runner.step(), AppEvent::Key(key));
        assert_eq!(runner.step(), AppEvent::SpeechDone(UtteranceId(3)));
        assert_eq!(runner.step(), AppEvent::Resize);
    }

    #[test]
    fn disconnected_source_yields_ticks() {
        let (tx, es) = ChannelEventSource::channel();
        drop(tx);
        let runner = Runner::new(es, FixedTicker::new(Duration::from_millis(1)));

        assert_eq!(runner.step(), AppEvent::Tick);
    }
}
