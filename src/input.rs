use crate::error::{InputError, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::time::Duration;
use tracing::{debug, error, warn};

/// One operator input event per loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Space bar: start a manual session, or stop the active one
    ToggleRecord,
    /// Escape, `q` or Ctrl-C: leave the monitor loop
    Exit,
}

/// Bounded keyboard poller for the monitor loop.
///
/// Polling blocks for at most the given timeout, which doubles as the
/// loop's pacing budget. Without a terminal the poller degrades to a
/// plain sleep so pacing is preserved headless.
pub struct InputPoller {
    raw_mode: bool,
}

impl InputPoller {
    pub fn new() -> Self {
        let raw_mode = match enable_raw_mode() {
            Ok(()) => {
                debug!("Raw mode enabled for keyboard input");
                true
            }
            Err(e) => {
                warn!("No interactive terminal; keyboard input disabled: {}", e);
                false
            }
        };
        Self { raw_mode }
    }

    /// Wait up to `timeout` for one key event.
    pub fn poll(&self, timeout: Duration) -> Result<Option<InputEvent>> {
        if !self.raw_mode {
            std::thread::sleep(timeout);
            return Ok(None);
        }

        let ready = event::poll(timeout).map_err(|e| InputError::Poll {
            details: e.to_string(),
        })?;
        if !ready {
            return Ok(None);
        }

        let terminal_event = event::read().map_err(|e| InputError::Poll {
            details: e.to_string(),
        })?;

        if let Event::Key(key) = terminal_event {
            return Ok(map_key(key));
        }

        Ok(None)
    }
}

impl Default for InputPoller {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InputPoller {
    fn drop(&mut self) {
        if self.raw_mode {
            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            }
        }
    }
}

/// Map a key press to an input event; releases and other keys are ignored
fn map_key(key: KeyEvent) -> Option<InputEvent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    match key.code {
        KeyCode::Char(' ') => Some(InputEvent::ToggleRecord),
        KeyCode::Esc | KeyCode::Char('q') => Some(InputEvent::Exit),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(InputEvent::Exit)
        }
        other => {
            debug!("Ignoring key {:?}", other);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_toggles_recording() {
        let key = KeyEvent::new(KeyCode::Char(' '), KeyModifiers::NONE);
        assert_eq!(map_key(key), Some(InputEvent::ToggleRecord));
    }

    #[test]
    fn test_exit_keys() {
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)),
            Some(InputEvent::Exit)
        );
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE)),
            Some(InputEvent::Exit)
        );
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(InputEvent::Exit)
        );
    }

    #[test]
    fn test_other_keys_are_ignored() {
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE)),
            None
        );
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE)),
            None
        );
        assert_eq!(
            map_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)),
            None
        );
    }
}
