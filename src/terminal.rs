//! Raw-mode TTY driver: attribute save/restore, blocking key reads with a 100 ms timeout,
//! escape-sequence decoding, and window-size queries.

use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;
use std::time::Duration;

use libc::{c_ushort, STDIN_FILENO, STDOUT_FILENO, TIOCGWINSZ};
use nix::libc::{VMIN, VTIME};
use nix::sys::termios::{
    tcgetattr, tcsetattr, ControlFlags, InputFlags, LocalFlags, OutputFlags, SetArg, Termios,
};

use crate::error::Error;

nix::ioctl_read_bad!(read_winsize, TIOCGWINSZ, WinSize);

#[derive(Debug)]
#[repr(C)]
struct WinSize {
    ws_row: c_ushort,
    ws_col: c_ushort,
    ws_xpixel: c_ushort,
    ws_ypixel: c_ushort,
}

/// A decoded keypress. Arrow/navigation keys occupy a code space disjoint from raw bytes so they
/// can never collide with an ordinary character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    PageUp,
    PageDown,
    Home,
    End,
    Delete,
    /// A raw byte that was not part of a recognized escape sequence: printable characters,
    /// control characters (Ctrl-letters arrive as 1..=26), Enter (13), Backspace (127), or a bare
    /// Escape (27) when no further bytes followed in time.
    Byte(u8),
}

pub const BACKSPACE: u8 = 127;
pub const ESC: u8 = 0x1b;

pub const fn ctrl_key(b: u8) -> u8 {
    b & 0x1f
}

/// RAII guard that restores the original TTY attributes on drop, covering both clean and fatal
/// exit paths (the `Drop` impl runs during early return and unwinding alike).
pub struct RawModeGuard {
    orig_termios: Termios,
}

impl RawModeGuard {
    /// Captures the current TTY attributes and switches stdin into raw mode: no echo, no
    /// canonical buffering, no signal generation, 8-bit characters, and a 100ms read timeout.
    pub fn enable() -> Result<Self, Error> {
        let orig_termios = tcgetattr(STDIN_FILENO)?;
        let mut raw = orig_termios.clone();

        raw.input_flags &= !(InputFlags::BRKINT
            | InputFlags::ICRNL
            | InputFlags::INPCK
            | InputFlags::ISTRIP
            | InputFlags::IXON);
        raw.output_flags &= !OutputFlags::OPOST;
        raw.control_flags |= ControlFlags::CS8;
        raw.local_flags &=
            !(LocalFlags::ECHO | LocalFlags::ICANON | LocalFlags::IEXTEN | LocalFlags::ISIG);

        raw.control_chars[VMIN] = 0;
        raw.control_chars[VTIME] = 1; // tenths of a second => 100ms

        tcsetattr(STDIN_FILENO, SetArg::TCSAFLUSH, &raw)?;

        Ok(Self { orig_termios })
    }

    fn restore(&self) -> Result<(), Error> {
        tcsetattr(STDIN_FILENO, SetArg::TCSAFLUSH, &self.orig_termios)?;
        Ok(())
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

/// Reads exactly one byte from stdin, blocking until one is available or the 100ms read timeout
/// elapses (in which case `None` is returned).
fn read_byte() -> io::Result<Option<u8>> {
    let mut buf = [0u8; 1];
    loop {
        match io::stdin().read(&mut buf) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(buf[0])),
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Blocks until a byte is available, then decodes it (and, for escape sequences, however many
/// further bytes are needed) into a `Key`.
pub fn read_key() -> Result<Key, Error> {
    let first = loop {
        if let Some(b) = read_byte()? {
            break b;
        }
    };
    if first != ESC {
        return Ok(Key::Byte(first));
    }
    let Some(second) = read_byte()? else {
        return Ok(Key::Byte(ESC));
    };
    let Some(third) = read_byte()? else {
        return Ok(Key::Byte(ESC));
    };
    Ok(decode_escape(second, third, read_byte))
}

/// Pure decoding of the bytes following an initial ESC, given a source of further bytes (used to
/// read the trailing `~` of a `<ESC>[<digit>~` sequence). Factored out of `read_key` so the
/// escape-sequence grammar can be exercised without a live TTY.
fn decode_escape(second: u8, third: u8, mut next: impl FnMut() -> io::Result<Option<u8>>) -> Key {
    if second == b'[' {
        if third.is_ascii_digit() {
            return match next() {
                Ok(Some(b'~')) => match third {
                    b'1' | b'7' => Key::Home,
                    b'3' => Key::Delete,
                    b'4' | b'8' => Key::End,
                    b'5' => Key::PageUp,
                    b'6' => Key::PageDown,
                    _ => Key::Byte(ESC),
                },
                _ => Key::Byte(ESC),
            };
        }
        return match third {
            b'A' => Key::ArrowUp,
            b'B' => Key::ArrowDown,
            b'C' => Key::ArrowRight,
            b'D' => Key::ArrowLeft,
            b'H' => Key::Home,
            b'F' => Key::End,
            _ => Key::Byte(ESC),
        };
    }
    if second == b'O' {
        return match third {
            b'H' => Key::Home,
            b'F' => Key::End,
            _ => Key::Byte(ESC),
        };
    }
    Key::Byte(ESC)
}

/// Queries the terminal window size, preferring the ioctl path and falling back to moving the
/// cursor far down-right and parsing a cursor-position report.
pub fn window_size() -> Result<(usize, usize), Error> {
    match ioctl_window_size() {
        Some((rows, cols)) if cols != 0 => Ok((rows, cols)),
        _ => window_size_via_cursor(),
    }
}

fn ioctl_window_size() -> Option<(usize, usize)> {
    unsafe {
        let mut size: WinSize = std::mem::zeroed();
        read_winsize(STDOUT_FILENO, &mut size).ok()?;
        Some((size.ws_row as usize, size.ws_col as usize))
    }
}

fn window_size_via_cursor() -> Result<(usize, usize), Error> {
    let mut stdout = io::stdout();
    stdout.write_all(b"\x1b[999C\x1b[999B")?;
    stdout.write_all(b"\x1b[6n")?;
    stdout.flush()?;

    let mut resp = Vec::with_capacity(32);
    loop {
        match read_byte()? {
            Some(b'R') => break,
            Some(b) => resp.push(b),
            None => return Err(Error::WindowSize),
        }
        if resp.len() > 31 {
            return Err(Error::WindowSize);
        }
    }
    parse_cursor_report(&resp).ok_or(Error::CursorPosition)
}

/// Parses an `ESC [ rows ; cols` cursor position report (the trailing `R` already stripped).
fn parse_cursor_report(buf: &[u8]) -> Option<(usize, usize)> {
    let buf = buf.strip_prefix(b"\x1b[")?;
    let s = std::str::from_utf8(buf).ok()?;
    let (rows, cols) = s.split_once(';')?;
    Some((rows.parse().ok()?, cols.parse().ok()?))
}

pub fn clear_screen() -> io::Result<()> {
    let mut stdout = io::stdout();
    stdout.write_all(b"\x1b[2J\x1b[H")?;
    stdout.flush()
}

pub fn read_timeout() -> Duration {
    Duration::from_millis(100)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_more() -> io::Result<Option<u8>> {
        Ok(None)
    }

    #[test]
    fn decodes_arrow_keys() {
        assert_eq!(decode_escape(b'[', b'A', no_more), Key::ArrowUp);
        assert_eq!(decode_escape(b'[', b'B', no_more), Key::ArrowDown);
        assert_eq!(decode_escape(b'[', b'C', no_more), Key::ArrowRight);
        assert_eq!(decode_escape(b'[', b'D', no_more), Key::ArrowLeft);
    }

    #[test]
    fn decodes_home_end_both_forms() {
        assert_eq!(decode_escape(b'[', b'H', no_more), Key::Home);
        assert_eq!(decode_escape(b'[', b'F', no_more), Key::End);
        assert_eq!(decode_escape(b'O', b'H', no_more), Key::Home);
        assert_eq!(decode_escape(b'O', b'F', no_more), Key::End);
    }

    #[test]
    fn decodes_tilde_terminated_sequences() {
        let mut tilde = || Ok(Some(b'~'));
        assert_eq!(decode_escape(b'[', b'1', &mut tilde), Key::Home);
        assert_eq!(decode_escape(b'[', b'3', &mut tilde), Key::Delete);
        assert_eq!(decode_escape(b'[', b'4', &mut tilde), Key::End);
        assert_eq!(decode_escape(b'[', b'5', &mut tilde), Key::PageUp);
        assert_eq!(decode_escape(b'[', b'6', &mut tilde), Key::PageDown);
        assert_eq!(decode_escape(b'[', b'7', &mut tilde), Key::Home);
        assert_eq!(decode_escape(b'[', b'8', &mut tilde), Key::End);
    }

    #[test]
    fn unrecognized_sequence_falls_back_to_escape() {
        assert_eq!(decode_escape(b'[', b'Z', no_more), Key::Byte(ESC));
        assert_eq!(decode_escape(b'X', b'Y', no_more), Key::Byte(ESC));
    }

    #[test]
    fn ctrl_key_masks_high_bits() {
        assert_eq!(ctrl_key(b'q'), 17);
        assert_eq!(ctrl_key(b'Q'), 17);
        assert_eq!(ctrl_key(b's'), 19);
    }

    #[test]
    fn cursor_report_parses() {
        assert_eq!(parse_cursor_report(b"\x1b[24;80"), Some((24, 80)));
        assert_eq!(parse_cursor_report(b"garbage"), None);
    }
}
