//! File I/O adapter: reads a file into raw line byte-strings, and serializes rows back out.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

use crate::error::Error;
use crate::row::Row;

/// Reads `path` line by line, stripping a trailing CR and/or LF from each line. A completely
/// empty file yields zero rows (the caller is responsible for ensuring at least one empty row
/// exists so the editor has somewhere to place the cursor).
pub fn read_lines(path: &Path) -> Result<Vec<Vec<u8>>, Error> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut lines = Vec::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            break;
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        lines.push(buf.clone());
    }
    Ok(lines)
}

/// Serializes `rows` as each row's `chars` followed by `\n`, concatenated (every row, including
/// the last, gets a trailing newline), truncating the destination file to the exact output length
/// before writing (reduces data loss on a partial write). Returns the number of bytes written.
pub fn write_rows(path: &Path, rows: &[Row]) -> Result<usize, Error> {
    let total: usize = rows.iter().map(|r| r.size() + 1).sum();

    #[cfg(unix)]
    let mut file = OpenOptions::new().write(true).create(true).truncate(false).mode(0o644).open(path)?;
    #[cfg(not(unix))]
    let mut file = OpenOptions::new().write(true).create(true).truncate(false).open(path)?;

    file.set_len(total as u64)?;

    for row in rows {
        file.write_all(&row.chars)?;
        file.write_all(b"\n")?;
    }
    file.sync_all()?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::select_syntax;

    fn rows_from(lines: &[&[u8]]) -> Vec<Row> {
        lines.iter().enumerate().map(|(i, l)| Row::new(i, l.to_vec())).collect()
    }

    #[test]
    fn strips_trailing_cr_and_lf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crlf.txt");
        std::fs::write(&path, b"hello\r\nworld\n").unwrap();
        let lines = read_lines(&path).unwrap();
        assert_eq!(lines, vec![b"hello".to_vec(), b"world".to_vec()]);
    }

    #[test]
    fn open_save_round_trip_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"hello\nworld\n").unwrap();

        let lines = read_lines(&path).unwrap();
        let rows = rows_from(&[&lines[0], &lines[1]]);
        let written = write_rows(&path, &rows).unwrap();

        assert_eq!(written, 12);
        assert_eq!(std::fs::read(&path).unwrap(), b"hello\nworld\n");
    }

    #[test]
    fn select_syntax_still_resolves_after_round_trip() {
        assert!(select_syntax("a.c").is_some());
    }
}
