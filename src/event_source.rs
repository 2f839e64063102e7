use anyhow::Result;
pub use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use std::collections::VecDeque;
use std::time::Duration;

/// Input feeding the reader loop.
///
/// `run_reader` calls `poll` with a short timeout and only calls `read` after
/// a `true`, so `read` may block until an event arrives. Key presses drive
/// navigation, resize events only force a repaint.
pub trait EventSource {
    /// Returns true when `read` has an event ready, waiting at most `timeout`.
    fn poll(&mut self, timeout: Duration) -> Result<bool>;

    /// Takes the next event off the source.
    fn read(&mut self) -> Result<Event>;
}

/// Keys and resizes from the real terminal, through crossterm. Requires raw
/// mode, which `app::setup_terminal` turns on.
pub struct KeyboardEventSource;

impl EventSource for KeyboardEventSource {
    fn poll(&mut self, timeout: Duration) -> Result<bool> {
        Ok(crossterm::event::poll(timeout)?)
    }

    fn read(&mut self) -> Result<Event> {
        Ok(crossterm::event::read()?)
    }
}

/// Scripted input for driving `run_reader` in tests.
///
/// Events are handed out in the order given. `poll` never waits and always
/// reports an event, and once the script runs out every `read` returns a
/// plain `q` press, so the reader loop ends even when a scenario never quits.
pub struct SimulatedEventSource {
    events: VecDeque<Event>,
}

impl SimulatedEventSource {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events: events.into(),
        }
    }

    /// A key press with `modifiers` held.
    pub fn key_event(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: crossterm::event::KeyEventKind::Press,
            state: crossterm::event::KeyEventState::empty(),
        })
    }

    /// A plain character press, the form every reader binding takes.
    pub fn char_key(c: char) -> Event {
        Self::key_event(KeyCode::Char(c), KeyModifiers::empty())
    }

    /// A Ctrl+character press. The keymap ignores these, which tests use to
    /// check that modified keys do not trigger reader actions.
    pub fn ctrl_char_key(c: char) -> Event {
        Self::key_event(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    /// Scripted events not yet read.
    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl EventSource for SimulatedEventSource {
    fn poll(&mut self, _timeout: Duration) -> Result<bool> {
        Ok(true)
    }

    fn read(&mut self) -> Result<Event> {
        Ok(self
            .events
            .pop_front()
            .unwrap_or_else(|| SimulatedEventSource::char_key('q')))
    }
}
