//! Editor state: the viewport/scroll/paint pipeline, the input dispatcher and editing operations,
//! and the reentrant prompt (including incremental search) built on top of it.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::buffer::AppendBuffer;
use crate::config::{MESSAGE_TIMEOUT, QUIT_TIMES, STATUS_MESSAGE_MAX};
use crate::error::Error;
use crate::fileio::{read_lines, write_rows};
use crate::highlight::{select_syntax, Hl, Syntax};
use crate::row::Row;
use crate::terminal::{ctrl_key, read_key, Key, BACKSPACE, ESC};

const HELP_MESSAGE: &str = "HELP: Ctrl-S = save | Ctrl-Q = quit | Ctrl-F = find";
const WELCOME_MESSAGE: &str = "Kilo editor -- version 0.0.1";

/// Sets a formatted status message on an `Editor`, e.g. `set_status!(self, "{n} bytes written")`.
macro_rules! set_status {
    ($editor:expr, $($arg:expr),*) => ($editor.set_status(format!($($arg),*).into_bytes()))
}

/// Converts a filesystem path into its raw bytes. On Unix this is lossless (`OsStr` is already a
/// thin wrapper over bytes); elsewhere it falls back to a lossy UTF-8 re-encoding.
#[cfg(unix)]
fn path_to_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(not(unix))]
fn path_to_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

/// Inverse of `path_to_bytes`.
#[cfg(unix)]
fn bytes_to_path(bytes: &[u8]) -> PathBuf {
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(std::ffi::OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn bytes_to_path(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

/// State private to one `find()` invocation, carried on the editor rather than in a global or
/// function-local static.
struct FindState {
    last_match: i64,
    direction: i64,
    saved: Option<(usize, Vec<Hl>)>,
}

impl Default for FindState {
    fn default() -> Self {
        Self { last_match: -1, direction: 1, saved: None }
    }
}

/// A callback invoked on every keypress of a `prompt()` call. Plain function pointers are enough
/// here since all callback state (the search's `FindState`) lives on `Editor` itself.
type PromptCallback = fn(&mut Editor, &str, Key);

pub struct Editor {
    cx: usize,
    cy: usize,
    rx: usize,
    rowoff: usize,
    coloff: usize,
    screenrows: usize,
    screencols: usize,
    rows: Vec<Row>,
    dirty: usize,
    /// Raw bytes of the current path, unparsed as text (a filename is treated as a byte string,
    /// like everything else in this editor — see `row.rs`'s `chars`/`render`).
    filename: Option<Vec<u8>>,
    statusmsg: Vec<u8>,
    statusmsg_time: Instant,
    syntax: Option<&'static Syntax>,
    quit_times: usize,
    find_state: FindState,
}

impl Editor {
    /// Builds an editor over an empty buffer sized to the given drawable region (terminal size
    /// minus the two reserved bottom rows). Does not touch the TTY; raw-mode setup and the window
    /// size query are the caller's responsibility (see `main.rs`), which keeps this type testable
    /// without a live terminal.
    pub fn new(screenrows: usize, screencols: usize) -> Self {
        let mut editor = Self {
            cx: 0,
            cy: 0,
            rx: 0,
            rowoff: 0,
            coloff: 0,
            screenrows,
            screencols,
            rows: Vec::new(),
            dirty: 0,
            filename: None,
            statusmsg: Vec::new(),
            statusmsg_time: Instant::now(),
            syntax: None,
            quit_times: QUIT_TIMES,
            find_state: FindState::default(),
        };
        editor.set_status(HELP_MESSAGE.as_bytes().to_vec());
        editor
    }

    /// Runs the read-render loop until a quit command exits it.
    pub fn run(&mut self) -> Result<(), Error> {
        loop {
            self.refresh_screen()?;
            if !self.process_keypress()? {
                return Ok(());
            }
        }
    }

    // ---- file I/O -------------------------------------------------------------------------

    pub fn open(&mut self, path: &Path) -> Result<(), Error> {
        let filename = path_to_bytes(path);
        self.syntax = select_syntax(&String::from_utf8_lossy(&filename));
        self.filename = Some(filename);

        self.rows = read_lines(path)?
            .into_iter()
            .enumerate()
            .map(|(i, line)| Row::new(i, line))
            .collect();
        self.rehighlight_all();
        self.dirty = 0;
        Ok(())
    }

    fn save(&mut self) -> Result<(), Error> {
        if self.filename.is_none() {
            match self.prompt("Save as: %s (ESC to cancel)", None)? {
                Some(name) if !name.is_empty() => self.filename = Some(name.into_bytes()),
                _ => {
                    set_status!(self, "Save aborted");
                    return Ok(());
                }
            }
        }
        let filename = self.filename.clone().expect("filename was just set");
        self.syntax = select_syntax(&String::from_utf8_lossy(&filename));
        self.rehighlight_all();

        let path = bytes_to_path(&filename);
        match write_rows(&path, &self.rows) {
            Ok(n) => {
                self.dirty = 0;
                set_status!(self, "{n} bytes written to disk");
            }
            Err(e) => set_status!(self, "Can't save! I/O error: {e}"),
        }
        Ok(())
    }

    // ---- row store --------------------------------------------------------------------------

    fn current_row(&self) -> Option<&Row> {
        self.rows.get(self.cy)
    }

    fn incoming_comment_state(&self, at: usize) -> bool {
        if at == 0 {
            false
        } else {
            self.rows[at - 1].hl_open_comment
        }
    }

    /// Continues highlight propagation forward from `at` (already updated), stopping as soon as a
    /// row's outgoing state matches what it was before.
    fn propagate_from(&mut self, at: usize) {
        if at >= self.rows.len() {
            return;
        }
        let mut incoming = self.rows[at].hl_open_comment;
        let mut idx = at + 1;
        while idx < self.rows.len() {
            let previous_state = self.rows[idx].hl_open_comment;
            let outgoing = self.rows[idx].update(self.syntax, incoming);
            incoming = outgoing;
            if outgoing == previous_state {
                break;
            }
            idx += 1;
        }
    }

    fn rehighlight_all(&mut self) {
        let mut incoming = false;
        for row in &mut self.rows {
            incoming = row.update(self.syntax, incoming);
        }
    }

    fn insert_row(&mut self, at: usize, bytes: Vec<u8>) {
        let at = at.min(self.rows.len());
        let incoming = self.incoming_comment_state(at);
        let mut row = Row::new(at, bytes);
        row.update(self.syntax, incoming);
        self.rows.insert(at, row);
        for (i, r) in self.rows.iter_mut().enumerate().skip(at) {
            r.idx = i;
        }
        self.propagate_from(at);
        self.dirty += 1;
    }

    /// Rejects `at >= numrows` (fixes the off-by-one boundary check in the source material, which
    /// rejected only `at > numrows`).
    fn delete_row(&mut self, at: usize) {
        if at >= self.rows.len() {
            return;
        }
        self.rows.remove(at);
        for (i, r) in self.rows.iter_mut().enumerate().skip(at) {
            r.idx = i;
        }
        self.dirty += 1;
    }

    // ---- editing operations ------------------------------------------------------------------

    fn insert_char(&mut self, c: u8) {
        if self.cy == self.rows.len() {
            self.insert_row(self.rows.len(), Vec::new());
        }
        let incoming = self.incoming_comment_state(self.cy);
        self.rows[self.cy].insert_char(self.cx, c, self.syntax, incoming);
        self.propagate_from(self.cy);
        self.cx += 1;
        self.dirty += 1;
    }

    fn insert_newline(&mut self) {
        if self.cx == 0 {
            self.insert_row(self.cy, Vec::new());
        } else {
            let incoming = self.incoming_comment_state(self.cy);
            let tail = self.rows[self.cy].split_off(self.cx, self.syntax, incoming);
            self.insert_row(self.cy + 1, tail);
        }
        self.cy += 1;
        self.cx = 0;
    }

    fn del_char(&mut self) {
        if self.cy >= self.rows.len() || (self.cx == 0 && self.cy == 0) {
            return;
        }
        if self.cx > 0 {
            let incoming = self.incoming_comment_state(self.cy);
            self.rows[self.cy].del_char(self.cx - 1, self.syntax, incoming);
            self.propagate_from(self.cy);
            self.cx -= 1;
        } else {
            let tail = self.rows[self.cy].chars.clone();
            let prev = self.cy - 1;
            let prev_size = self.rows[prev].size();
            let incoming = self.incoming_comment_state(prev);
            self.rows[prev].append_bytes(&tail, self.syntax, incoming);
            self.delete_row(self.cy);
            self.propagate_from(prev);
            self.cy = prev;
            self.cx = prev_size;
        }
        self.dirty += 1;
    }

    fn move_cursor(&mut self, key: Key) {
        match key {
            Key::ArrowLeft => {
                if self.cx > 0 {
                    self.cx -= 1;
                } else if self.cy > 0 {
                    self.cy -= 1;
                    self.cx = self.rows[self.cy].size();
                }
            }
            Key::ArrowRight => {
                if let Some(row) = self.current_row() {
                    if self.cx < row.size() {
                        self.cx += 1;
                    } else if self.cx == row.size() {
                        self.cy += 1;
                        self.cx = 0;
                    }
                }
            }
            Key::ArrowUp => {
                if self.cy > 0 {
                    self.cy -= 1;
                }
            }
            Key::ArrowDown => {
                if self.cy < self.rows.len() {
                    self.cy += 1;
                }
            }
            _ => {}
        }
        let row_len = self.current_row().map_or(0, Row::size);
        if self.cx > row_len {
            self.cx = row_len;
        }
    }

    // ---- input dispatch -----------------------------------------------------------------------

    fn process_keypress(&mut self) -> Result<bool, Error> {
        let key = read_key()?;

        if let Key::Byte(b) = key {
            if b == ctrl_key(b'q') {
                return Ok(self.handle_quit_key());
            }
        }

        self.dispatch_key(key)?;
        self.quit_times = QUIT_TIMES;
        Ok(true)
    }

    /// Returns `true` if the editor should keep running (a warning was shown instead of quitting).
    fn handle_quit_key(&mut self) -> bool {
        if self.dirty > 0 && self.quit_times > 0 {
            self.quit_times -= 1;
            if self.quit_times > 0 {
                set_status!(
                    self,
                    "WARNING!!! File has unsaved changes. Press Ctrl-Q {} more times to quit.",
                    self.quit_times
                );
                return true;
            }
        }
        false
    }

    fn dispatch_key(&mut self, key: Key) -> Result<(), Error> {
        match key {
            Key::ArrowUp | Key::ArrowDown | Key::ArrowLeft | Key::ArrowRight => {
                self.move_cursor(key);
            }
            Key::Home => self.cx = 0,
            Key::End => {
                if let Some(row) = self.current_row() {
                    self.cx = row.size();
                }
            }
            Key::Delete => {
                self.move_cursor(Key::ArrowRight);
                self.del_char();
            }
            Key::PageUp => {
                self.cy = self.rowoff;
                for _ in 0..self.screenrows {
                    self.move_cursor(Key::ArrowUp);
                }
            }
            Key::PageDown => {
                self.cy = (self.rowoff + self.screenrows.saturating_sub(1)).min(self.rows.len());
                for _ in 0..self.screenrows {
                    self.move_cursor(Key::ArrowDown);
                }
            }
            Key::Byte(b) if b == b'\r' => self.insert_newline(),
            Key::Byte(b) if b == BACKSPACE || b == ctrl_key(b'h') => self.del_char(),
            Key::Byte(b) if b == ctrl_key(b's') => self.save()?,
            Key::Byte(b) if b == ctrl_key(b'f') => self.find()?,
            Key::Byte(b) if b == ctrl_key(b'l') || b == ESC => {}
            Key::Byte(b) => self.insert_char(b),
        }
        Ok(())
    }

    // ---- status line --------------------------------------------------------------------------

    fn set_status(&mut self, mut msg: Vec<u8>) {
        msg.truncate(STATUS_MESSAGE_MAX);
        self.statusmsg = msg;
        self.statusmsg_time = Instant::now();
    }

    // ---- viewport / paint pipeline --------------------------------------------------------------

    fn scroll(&mut self) {
        self.rx = self.current_row().map_or(0, |r| r.cx_to_rx(self.cx));

        if self.cy < self.rowoff {
            self.rowoff = self.cy;
        }
        if self.cy >= self.rowoff + self.screenrows {
            self.rowoff = self.cy + 1 - self.screenrows;
        }
        if self.rx < self.coloff {
            self.coloff = self.rx;
        }
        if self.rx >= self.coloff + self.screencols {
            self.coloff = self.rx + 1 - self.screencols;
        }
    }

    fn refresh_screen(&mut self) -> Result<(), Error> {
        self.scroll();

        let mut buf = AppendBuffer::new();
        buf.push_str("\x1b[?25l");
        buf.push_str("\x1b[H");

        self.draw_rows(&mut buf);
        self.draw_status_bar(&mut buf);
        self.draw_message_bar(&mut buf);

        buf.push_str(&format!(
            "\x1b[{};{}H",
            self.cy - self.rowoff + 1,
            self.rx - self.coloff + 1
        ));
        buf.push_str("\x1b[?25h");

        let mut stdout = std::io::stdout();
        let _ = buf.flush_to(&mut stdout);
        Ok(())
    }

    fn draw_rows(&self, buf: &mut AppendBuffer) {
        for y in 0..self.screenrows {
            let filerow = y + self.rowoff;
            if filerow >= self.rows.len() {
                if self.rows.is_empty() && y == self.screenrows / 3 {
                    self.draw_welcome(buf);
                } else {
                    buf.push_byte(b'~');
                }
            } else {
                self.draw_row(buf, &self.rows[filerow]);
            }
            buf.push_str("\x1b[K");
            buf.push_str("\r\n");
        }
    }

    fn draw_welcome(&self, buf: &mut AppendBuffer) {
        let mut msg = WELCOME_MESSAGE;
        if msg.len() > self.screencols {
            msg = &msg[..self.screencols];
        }
        let padding = self.screencols.saturating_sub(msg.len()) / 2;
        if padding > 0 {
            buf.push_byte(b'~');
            for _ in 1..padding {
                buf.push_byte(b' ');
            }
        }
        buf.push_str(msg);
    }

    fn draw_row(&self, buf: &mut AppendBuffer, row: &Row) {
        let start = self.coloff.min(row.render.len());
        let end = (self.coloff + self.screencols).min(row.render.len());
        let render = &row.render[start..end];
        let hl = &row.hl[start..end];

        let mut last_color: Option<u8> = None;
        for (i, &b) in render.iter().enumerate() {
            if b < 32 {
                let sym = if b <= 26 { b'@' + b } else { b'?' };
                buf.push_str("\x1b[7m");
                buf.push_byte(sym);
                buf.push_str("\x1b[m");
                if let Some(c) = last_color {
                    buf.push_str(&format!("\x1b[{c}m"));
                }
                continue;
            }
            match hl[i] {
                Hl::Normal => {
                    if last_color.is_some() {
                        buf.push_str("\x1b[39m");
                        last_color = None;
                    }
                }
                tag => {
                    let color = tag.color();
                    if last_color != Some(color) {
                        buf.push_str(&format!("\x1b[{color}m"));
                        last_color = Some(color);
                    }
                }
            }
            buf.push_byte(b);
        }
        buf.push_str("\x1b[39m");
    }

    fn draw_status_bar(&self, buf: &mut AppendBuffer) {
        buf.push_str("\x1b[7m");

        let no_name: &[u8] = b"[No Name]";
        let fname: &[u8] = self.filename.as_deref().unwrap_or(no_name);
        let fname = &fname[..fname.len().min(20)];

        // Built as raw bytes, not a `String`: `fname` may be arbitrary non-UTF-8 bytes, so any
        // byte-count truncation downstream (the `screencols` clamp below) must stay panic-free.
        let mut left = Vec::new();
        left.extend_from_slice(fname);
        left.extend_from_slice(format!(" - {} lines", self.rows.len()).as_bytes());
        if self.dirty > 0 {
            left.extend_from_slice(b" (modified)");
        }
        left.truncate(self.screencols);

        let filetype = self.syntax.map_or("no ft", |s| s.name);
        let right = format!("{} | {}/{}", filetype, self.cy + 1, self.rows.len());

        buf.push_bytes(&left);
        let mut len = left.len();
        while len < self.screencols {
            if self.screencols - len == right.len() {
                buf.push_str(&right);
                break;
            }
            buf.push_byte(b' ');
            len += 1;
        }
        buf.push_str("\x1b[m");
        buf.push_str("\r\n");
    }

    fn draw_message_bar(&self, buf: &mut AppendBuffer) {
        buf.push_str("\x1b[K");
        if !self.statusmsg.is_empty() && self.statusmsg_time.elapsed() < MESSAGE_TIMEOUT {
            let len = self.statusmsg.len().min(self.screencols);
            buf.push_bytes(&self.statusmsg[..len]);
        }
    }

    // ---- prompt / incremental search -----------------------------------------------------------

    fn prompt(&mut self, template: &str, callback: Option<PromptCallback>) -> Result<Option<String>, Error> {
        let mut buf = String::new();
        loop {
            let status = template.replacen("%s", &buf, 1);
            self.set_status(status.into_bytes());
            self.refresh_screen()?;

            let key = read_key()?;
            match key {
                Key::Byte(b) if b == BACKSPACE || b == ctrl_key(b'h') => {
                    buf.pop();
                }
                Key::Delete => {
                    buf.pop();
                }
                Key::Byte(b) if b < 128 && !(b as char).is_ascii_control() => {
                    buf.push(b as char);
                }
                _ => {}
            }

            if let Some(cb) = callback {
                cb(self, &buf, key);
            }

            match key {
                Key::Byte(b) if b == ESC => {
                    self.set_status(Vec::new());
                    return Ok(None);
                }
                Key::Byte(b) if b == b'\r' && !buf.is_empty() => {
                    self.set_status(Vec::new());
                    return Ok(Some(buf));
                }
                _ => {}
            }
        }
    }

    fn find(&mut self) -> Result<(), Error> {
        let (saved_cx, saved_cy, saved_coloff, saved_rowoff) =
            (self.cx, self.cy, self.coloff, self.rowoff);

        let result = self.prompt("Search: %s (Use ESC/Arrows/Enter)", Some(find_callback))?;

        if result.is_none() {
            self.cx = saved_cx;
            self.cy = saved_cy;
            self.coloff = saved_coloff;
            self.rowoff = saved_rowoff;
        }
        Ok(())
    }

    #[cfg(test)]
    fn status(&self) -> &str {
        std::str::from_utf8(&self.statusmsg).expect("test status messages are ASCII")
    }

    #[cfg(test)]
    fn cursor(&self) -> (usize, usize) {
        (self.cx, self.cy)
    }
}

/// The incremental-search prompt callback. Free function (rather than a closure) so it can be
/// stored as a plain `fn` pointer on `Editor::prompt` without a borrow-checker conflict between
/// the callback and the `&mut Editor` it is given each time it runs.
fn find_callback(editor: &mut Editor, query: &str, key: Key) {
    if let Some((row_idx, saved_hl)) = editor.find_state.saved.take() {
        if let Some(row) = editor.rows.get_mut(row_idx) {
            row.hl = saved_hl;
        }
    }

    let is_commit = matches!(key, Key::Byte(b) if b == b'\r');
    let is_cancel = matches!(key, Key::Byte(b) if b == ESC);
    if is_commit || is_cancel {
        editor.find_state.last_match = -1;
        editor.find_state.direction = 1;
        return;
    }

    match key {
        Key::ArrowRight | Key::ArrowDown => editor.find_state.direction = 1,
        Key::ArrowLeft | Key::ArrowUp => editor.find_state.direction = -1,
        _ => {
            editor.find_state.last_match = -1;
            editor.find_state.direction = 1;
        }
    }
    if editor.find_state.last_match == -1 {
        editor.find_state.direction = 1;
    }

    if query.is_empty() || editor.rows.is_empty() {
        return;
    }

    let numrows = editor.rows.len() as i64;
    let mut current = editor.find_state.last_match;
    for _ in 0..numrows {
        current = (current + editor.find_state.direction).rem_euclid(numrows);
        let idx = current as usize;

        let found = find_substring(&editor.rows[idx].render, query.as_bytes());
        if let Some(pos) = found {
            let original_hl = editor.rows[idx].hl.clone();
            let mut new_hl = original_hl.clone();
            for slot in &mut new_hl[pos..pos + query.len()] {
                *slot = Hl::Match;
            }

            editor.find_state.last_match = current;
            editor.cy = idx;
            editor.cx = editor.rows[idx].rx_to_cx(pos);
            editor.rowoff = idx.saturating_sub(editor.screenrows / 2);
            editor.find_state.saved = Some((idx, original_hl));
            editor.rows[idx].hl = new_hl;
            break;
        }
    }
}

fn find_substring(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).find(|&i| &haystack[i..i + needle.len()] == needle)
}
