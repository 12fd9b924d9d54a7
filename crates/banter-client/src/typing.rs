//! Typing state: the local debounce window and the remote indicator set.

use std::collections::BTreeSet;
use std::time::Duration;

use tokio::time::Instant;

use banter_shared::constants::TYPING_DEBOUNCE_MS;

/// Debounce window for the local user's typing signal.
///
/// A keystroke on non-empty input starts or extends the active window.  The
/// signal goes inactive when the window lapses with no further keystrokes,
/// when the input empties, or when a message is sent.  The caller passes the
/// clock in, so the rules test without waiting.
#[derive(Debug)]
pub struct TypingDebounce {
    window: Duration,
    active: bool,
    deadline: Option<Instant>,
}

impl Default for TypingDebounce {
    fn default() -> Self {
        Self::new(Duration::from_millis(TYPING_DEBOUNCE_MS))
    }
}

impl TypingDebounce {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            active: false,
            deadline: None,
        }
    }

    /// Process an input change.  Returns `Some(active)` when the outgoing
    /// typing signal must change.
    pub fn keystroke(&mut self, text: &str, now: Instant) -> Option<bool> {
        if text.is_empty() {
            return self.stop();
        }
        self.deadline = Some(now + self.window);
        if self.active {
            None
        } else {
            self.active = true;
            Some(true)
        }
    }

    /// Check the window against the clock.  Returns `Some(false)` once when
    /// the window has lapsed.
    pub fn poll(&mut self, now: Instant) -> Option<bool> {
        match self.deadline {
            Some(deadline) if now >= deadline => self.stop(),
            _ => None,
        }
    }

    /// Sending a message ends the typing state immediately.
    pub fn message_sent(&mut self) -> Option<bool> {
        self.stop()
    }

    /// Instant at which the active window lapses, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    fn stop(&mut self) -> Option<bool> {
        self.deadline = None;
        if self.active {
            self.active = false;
            Some(false)
        } else {
            None
        }
    }
}

/// Display names of remote users currently typing in the active channel.
#[derive(Debug, Default)]
pub struct TypingSet {
    names: BTreeSet<String>,
}

impl TypingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a remote typing signal.  Returns true when the set changed.
    pub fn apply(&mut self, name: &str, active: bool) -> bool {
        if active {
            self.names.insert(name.to_string())
        } else {
            self.names.remove(name)
        }
    }

    /// Drop a user outright, e.g. when they leave the channel.
    pub fn remove(&mut self, name: &str) -> bool {
        self.names.remove(name)
    }

    pub fn clear(&mut self) {
        self.names.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Indicator line for display, `None` when nobody is typing.
    pub fn line(&self) -> Option<String> {
        let names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        match names.as_slice() {
            [] => None,
            [one] => Some(format!("{one} is typing…")),
            [a, b] => Some(format!("{a} and {b} are typing…")),
            many => Some(format!("{} people are typing…", many.len())),
        }
    }
}
