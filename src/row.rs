//! The row store: each row's raw/rendered/highlight views, and the insert/delete/split/merge
//! operations that keep them in sync.

use crate::config::TAB_STOP;
use crate::highlight::{update_syntax, Hl, Syntax};

/// One logical line of text.
#[derive(Debug, Clone, Default)]
pub struct Row {
    /// Current position in the owning `Vec<Row>`.
    pub idx: usize,
    /// Raw byte content, no line terminator.
    pub chars: Vec<u8>,
    /// Display expansion of `chars`: tabs become spaces out to the next multiple of 8 columns.
    pub render: Vec<u8>,
    /// One highlight tag per byte of `render`.
    pub hl: Vec<Hl>,
    /// Whether this row ends inside an unterminated block comment.
    pub hl_open_comment: bool,
}

impl Row {
    pub fn new(idx: usize, chars: Vec<u8>) -> Self {
        let mut row = Self { idx, chars, render: Vec::new(), hl: Vec::new(), hl_open_comment: false };
        row.update(None, false);
        row
    }

    pub fn size(&self) -> usize {
        self.chars.len()
    }

    /// Rebuilds `render` from `chars` (tab expansion), then re-highlights. Returns the row's
    /// outgoing `hl_open_comment` state.
    pub fn update(&mut self, syntax: Option<&Syntax>, in_comment_incoming: bool) -> bool {
        self.render = expand_tabs(&self.chars);
        let (hl, open) = update_syntax(&self.render, syntax, in_comment_incoming);
        self.hl = hl;
        self.hl_open_comment = open;
        debug_assert_eq!(self.render.len(), self.hl.len());
        open
    }

    pub fn insert_char(&mut self, at: usize, c: u8, syntax: Option<&Syntax>, in_comment: bool) {
        let at = at.min(self.chars.len());
        self.chars.insert(at, c);
        self.update(syntax, in_comment);
    }

    pub fn append_bytes(&mut self, bytes: &[u8], syntax: Option<&Syntax>, in_comment: bool) {
        self.chars.extend_from_slice(bytes);
        self.update(syntax, in_comment);
    }

    /// No-op if `at` is out of range.
    pub fn del_char(&mut self, at: usize, syntax: Option<&Syntax>, in_comment: bool) {
        if at >= self.chars.len() {
            return;
        }
        self.chars.remove(at);
        self.update(syntax, in_comment);
    }

    /// Splits off everything from `at` onward, leaving `self` truncated. The caller is
    /// responsible for inserting the returned bytes as a new row.
    pub fn split_off(&mut self, at: usize, syntax: Option<&Syntax>, in_comment: bool) -> Vec<u8> {
        let at = at.min(self.chars.len());
        let tail = self.chars.split_off(at);
        self.update(syntax, in_comment);
        tail
    }

    /// Converts a `chars` column to the corresponding `render` column, expanding tabs.
    pub fn cx_to_rx(&self, cx: usize) -> usize {
        let mut rx = 0usize;
        for &b in self.chars.iter().take(cx) {
            if b == b'\t' {
                rx += (TAB_STOP - 1) - (rx % TAB_STOP);
            }
            rx += 1;
        }
        rx
    }

    /// Inverse of `cx_to_rx`: the first `cx` whose accumulated render width exceeds `rx`.
    pub fn rx_to_cx(&self, rx: usize) -> usize {
        let mut cur_rx = 0usize;
        for (cx, &b) in self.chars.iter().enumerate() {
            if b == b'\t' {
                cur_rx += (TAB_STOP - 1) - (cur_rx % TAB_STOP);
            }
            cur_rx += 1;
            if cur_rx > rx {
                return cx;
            }
        }
        self.chars.len()
    }
}

/// Expands tabs in `chars` into spaces, filling to the next tab stop of width `TAB_STOP`. Every
/// other byte passes through unchanged.
fn expand_tabs(chars: &[u8]) -> Vec<u8> {
    let mut render = Vec::with_capacity(chars.len());
    for &b in chars {
        if b == b'\t' {
            render.push(b' ');
            while render.len() % TAB_STOP != 0 {
                render.push(b' ');
            }
        } else {
            render.push(b);
        }
    }
    render
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::C_SYNTAX;

    #[test]
    fn render_hl_length_parity_holds_after_update() {
        let row = Row::new(0, b"hi\tthere".to_vec());
        assert_eq!(row.render.len(), row.hl.len());
    }

    #[test]
    fn tab_expands_to_next_multiple_of_eight() {
        let row = Row::new(0, b"\tx".to_vec());
        assert_eq!(row.render, b"        x");
        assert_eq!(row.render.len(), 9);
    }

    #[test]
    fn tab_mid_line_fills_to_next_stop() {
        let row = Row::new(0, b"ab\tcd".to_vec());
        // "ab" = 2 cols, tab fills to col 8 (6 spaces), then "cd".
        assert_eq!(row.render, b"ab      cd");
    }

    #[test]
    fn non_tab_bytes_are_unaltered() {
        let row = Row::new(0, b"plain text!".to_vec());
        assert_eq!(row.render, row.chars);
    }

    #[test]
    fn coordinate_round_trip_for_every_cx() {
        let row = Row::new(0, b"a\tb\tc".to_vec());
        for cx in 0..=row.size() {
            let rx = row.cx_to_rx(cx);
            assert_eq!(row.rx_to_cx(rx), cx, "round-trip failed for cx={cx}");
        }
    }

    #[test]
    fn insert_and_delete_char_update_render() {
        let mut row = Row::new(0, b"ac".to_vec());
        row.insert_char(1, b'b', Some(&C_SYNTAX), false);
        assert_eq!(row.chars, b"abc");
        row.del_char(1, Some(&C_SYNTAX), false);
        assert_eq!(row.chars, b"ac");
    }

    #[test]
    fn del_char_out_of_range_is_noop() {
        let mut row = Row::new(0, b"ab".to_vec());
        row.del_char(5, None, false);
        assert_eq!(row.chars, b"ab");
    }

    #[test]
    fn split_off_truncates_and_returns_tail() {
        let mut row = Row::new(0, b"hello world".to_vec());
        let tail = row.split_off(5, None, false);
        assert_eq!(row.chars, b"hello");
        assert_eq!(tail, b" world");
    }
}
