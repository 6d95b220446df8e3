//! RAII guard for terminal raw mode.
//!
//! Ensures the terminal is restored even on error, cancellation or when the
//! owning future is dropped by an interrupt handler.

use crate::error::Result;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, is_raw_mode_enabled};

/// Holds the terminal in raw mode until dropped.
#[derive(Debug)]
pub struct RawModeGuard {
    was_enabled: bool,
}

impl RawModeGuard {
    /// Enter raw mode. If the terminal already was in raw mode it is left that way on drop.
    pub fn acquire() -> Result<Self> {
        let was_enabled = is_raw_mode_enabled().unwrap_or(false);
        if !was_enabled {
            enable_raw_mode()?;
        }
        log::debug!("Terminal raw mode acquired");
        Ok(Self { was_enabled })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.was_enabled {
            return;
        }
        // Drop must never panic; report and move on
        if let Err(e) = disable_raw_mode() {
            eprintln!("Warning: Failed to restore terminal mode: {e}");
        } else {
            log::debug!("Terminal raw mode released");
        }
    }
}
