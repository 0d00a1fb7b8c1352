//! Compile-time editor tunables.
//!
//! There is deliberately no file- or environment-based configuration layer (Non-goal); these are
//! the fixed constants the rest of the crate builds against.

use std::time::Duration;

/// Width, in columns, of a tab stop.
pub const TAB_STOP: usize = 8;

/// Number of times Ctrl-Q must be pressed to quit with unsaved changes.
pub const QUIT_TIMES: usize = 3;

/// How long a status message stays on screen before it is cleared.
pub const MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum length, in bytes, of a status message.
pub const STATUS_MESSAGE_MAX: usize = 80;

/// Number of bottom rows reserved for the status bar and message bar.
pub const RESERVED_ROWS: usize = 2;
