//! Interactive terminal menu for picking one container file.
//!
//! The menu is a small state machine ([`MenuState`]) driven by key events read
//! from a crossterm [`EventStream`]. Raw mode is held by [`RawModeGuard`] for the
//! lifetime of the menu and released on every exit path, including the future
//! being dropped when the process is interrupted.

mod guard;

pub use guard::RawModeGuard;

use crate::candidate::{Candidate, Chooser};
use crate::error::{Error, Result, SelectionError};
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures_lite::StreamExt;
use std::io::Write;

/// Keys the menu reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuKey {
    /// Arrow up
    Up,
    /// Arrow down
    Down,
    /// Enter / Return
    Enter,
    /// Escape
    Escape,
    /// Ctrl-C
    Interrupt,
    /// Anything else
    Other,
}

impl From<KeyEvent> for MenuKey {
    fn from(key: KeyEvent) -> Self {
        match key.code {
            KeyCode::Up => MenuKey::Up,
            KeyCode::Down => MenuKey::Down,
            KeyCode::Enter => MenuKey::Enter,
            KeyCode::Esc => MenuKey::Escape,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                MenuKey::Interrupt
            }
            _ => MenuKey::Other,
        }
    }
}

/// Result of feeding one key to the menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuStep {
    /// Selection moved, render again
    Render,
    /// Key ignored, nothing to do
    Ignored,
    /// User confirmed the highlighted row
    Resolved(usize),
    /// User left the menu
    Cancelled,
}

/// Highlighted row of an `len`-row menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuState {
    selected: usize,
    len: usize,
}

impl MenuState {
    /// Start on the first row
    pub fn new(len: usize) -> Self {
        Self { selected: 0, len }
    }

    /// Currently highlighted row
    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Apply a key. Up/Down wrap around.
    pub fn apply(&mut self, key: MenuKey) -> MenuStep {
        if self.len == 0 {
            return match key {
                MenuKey::Escape | MenuKey::Interrupt | MenuKey::Enter => MenuStep::Cancelled,
                _ => MenuStep::Ignored,
            };
        }
        match key {
            MenuKey::Up => {
                self.selected = if self.selected == 0 {
                    self.len - 1
                } else {
                    self.selected - 1
                };
                MenuStep::Render
            }
            MenuKey::Down => {
                self.selected = if self.selected + 1 >= self.len {
                    0
                } else {
                    self.selected + 1
                };
                MenuStep::Render
            }
            MenuKey::Enter => MenuStep::Resolved(self.selected),
            MenuKey::Escape | MenuKey::Interrupt => MenuStep::Cancelled,
            MenuKey::Other => MenuStep::Ignored,
        }
    }
}

const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";
const RESET: &str = "\x1b[0m";

/// Render the menu as text. In raw mode lines need an explicit carriage return.
pub fn render_menu(candidates: &[Candidate], state: &MenuState) -> String {
    let mut out = String::new();
    out.push_str("\x1b[2J\x1b[H");
    out.push_str("📋 Available DMG files:\r\n");
    out.push_str("   Use ↑↓ arrow keys to navigate, Enter to select, Esc to cancel\r\n\r\n");

    for (index, candidate) in candidates.iter().enumerate() {
        let is_selected = index == state.selected();
        let (bullet, color) = if is_selected { ("●", CYAN) } else { ("○", WHITE) };
        let version = candidate
            .version
            .as_ref()
            .map_or_else(|| "no version".to_string(), |v| format!("v{}", v.raw));
        out.push_str(&format!("{color}  {bullet} {}{RESET}\r\n", candidate.name));
        out.push_str(&format!(
            "{color}    Version: {version} | Size: {}MB | Date: {}{RESET}\r\n\r\n",
            candidate.size_mb(),
            candidate.modified_at.format("%Y-%m-%d %H:%M:%S"),
        ));
    }

    if let Some(current) = candidates.get(state.selected()) {
        out.push_str(&format!(
            "\r\n🎯 Selected: {} (v{})\r\n",
            current.name,
            current.version_label()
        ));
    }
    out
}

/// Chooser backed by the controlling terminal
#[derive(Debug, Default)]
pub struct TerminalChooser;

impl TerminalChooser {
    /// Create a terminal chooser
    pub fn new() -> Self {
        Self
    }

    fn draw(candidates: &[Candidate], state: &MenuState) -> Result<()> {
        let mut stdout = std::io::stdout();
        stdout.write_all(render_menu(candidates, state).as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}

impl Chooser for TerminalChooser {
    async fn choose(&mut self, candidates: &[Candidate]) -> Result<usize> {
        let mut state = MenuState::new(candidates.len());
        let _raw = RawModeGuard::acquire()?;
        let mut events = EventStream::new();

        Self::draw(candidates, &state)?;

        while let Some(event) = events.next().await {
            let Event::Key(key) = event? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match state.apply(MenuKey::from(key)) {
                MenuStep::Render => Self::draw(candidates, &state)?,
                MenuStep::Ignored => {}
                MenuStep::Resolved(index) => return Ok(index),
                MenuStep::Cancelled => {
                    return Err(Error::Selection(SelectionError::Cancelled));
                }
            }
        }

        // Input closed under us
        Err(Error::Selection(SelectionError::Cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::Version;
    use chrono::Local;
    use std::path::PathBuf;

    #[test]
    fn test_navigation_wraps() {
        let mut state = MenuState::new(3);
        assert_eq!(state.apply(MenuKey::Up), MenuStep::Render);
        assert_eq!(state.selected(), 2);
        assert_eq!(state.apply(MenuKey::Down), MenuStep::Render);
        assert_eq!(state.selected(), 0);
        state.apply(MenuKey::Down);
        assert_eq!(state.selected(), 1);
    }

    #[test]
    fn test_enter_resolves_highlighted_row() {
        let mut state = MenuState::new(2);
        state.apply(MenuKey::Down);
        assert_eq!(state.apply(MenuKey::Enter), MenuStep::Resolved(1));
    }

    #[test]
    fn test_escape_and_interrupt_cancel() {
        let mut state = MenuState::new(2);
        assert_eq!(state.apply(MenuKey::Escape), MenuStep::Cancelled);
        assert_eq!(state.apply(MenuKey::Interrupt), MenuStep::Cancelled);
        assert_eq!(state.apply(MenuKey::Other), MenuStep::Ignored);
    }

    #[test]
    fn test_key_mapping() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(MenuKey::from(ctrl_c), MenuKey::Interrupt);
        let plain_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE);
        assert_eq!(MenuKey::from(plain_c), MenuKey::Other);
        let up = KeyEvent::new(KeyCode::Up, KeyModifiers::NONE);
        assert_eq!(MenuKey::from(up), MenuKey::Up);
    }

    #[test]
    fn test_render_highlights_selection() {
        let candidates = vec![
            Candidate {
                name: "App-1.3.0.dmg".into(),
                path: PathBuf::from("/tmp/App-1.3.0.dmg"),
                version: Version::parse("1.3.0"),
                size_bytes: 3 * 1024 * 1024,
                modified_at: Local::now(),
            },
            Candidate {
                name: "App.dmg".into(),
                path: PathBuf::from("/tmp/App.dmg"),
                version: None,
                size_bytes: 0,
                modified_at: Local::now(),
            },
        ];
        let mut state = MenuState::new(2);
        state.apply(MenuKey::Down);
        let text = render_menu(&candidates, &state);
        assert!(text.contains(&format!("{CYAN}  ● App.dmg")));
        assert!(text.contains(&format!("{WHITE}  ○ App-1.3.0.dmg")));
        assert!(text.contains("Version: no version"));
        assert!(text.contains("Size: 3.00MB"));
        assert!(text.contains("🎯 Selected: App.dmg (vunknown)"));
    }
}
