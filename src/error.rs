//! Error type shared by every fallible operation in the editor.

use thiserror::Error;

/// Unifies I/O failures with the handful of editor-specific failure modes that cannot be
/// expressed as an `io::Error` (window size queries, cursor position reports).
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not determine the terminal window size")]
    WindowSize,

    #[error("could not parse the cursor position report from the terminal")]
    CursorPosition,
}

impl From<nix::errno::Errno> for Error {
    fn from(err: nix::errno::Errno) -> Self {
        Self::Io(std::io::Error::from(err))
    }
}
