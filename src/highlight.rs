//! Incremental syntax highlighter: per-row byte classification plus multi-line comment state
//! propagation across rows.

/// One highlight tag per rendered byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hl {
    Normal,
    Comment,
    MlComment,
    Keyword1,
    Keyword2,
    String,
    Number,
    Match,
}

impl Hl {
    /// ANSI SGR color code used when painting a byte tagged with this highlight.
    pub fn color(self) -> u8 {
        match self {
            Hl::Comment | Hl::MlComment => 36,
            Hl::Keyword1 => 33,
            Hl::Keyword2 => 34,
            Hl::String => 35,
            Hl::Number => 31,
            Hl::Match => 34,
            Hl::Normal => 37,
        }
    }
}

/// Feature flags for a file type entry.
#[derive(Debug, Clone, Copy)]
pub struct SyntaxFlags {
    pub highlight_numbers: bool,
    pub highlight_strings: bool,
}

/// A built-in file-type entry: how to recognize a file of this type, its keyword lists, comment
/// delimiters, and which highlight features are enabled.
pub struct Syntax {
    pub name: &'static str,
    /// Filename match patterns. A pattern starting with `.` is compared against the file
    /// extension; otherwise it is a substring match against the whole filename.
    pub file_match: &'static [&'static str],
    /// Keywords; a trailing `|` marks a secondary keyword (`Hl::Keyword2`).
    pub keywords: &'static [&'static str],
    pub single_line_comment: Option<&'static str>,
    pub multi_line_comment: Option<(&'static str, &'static str)>,
    pub flags: SyntaxFlags,
}

const C_KEYWORDS: &[&str] = &[
    "switch", "if", "while", "for", "break", "continue", "return", "else", "struct", "union",
    "typedef", "static", "enum", "class", "case", "int|", "long|", "double|", "float|", "char|",
    "unsigned|", "signed|", "void|",
];

pub const C_SYNTAX: Syntax = Syntax {
    name: "c",
    file_match: &[".c", ".h", ".cpp"],
    keywords: C_KEYWORDS,
    single_line_comment: Some("//"),
    multi_line_comment: Some(("/*", "*/")),
    flags: SyntaxFlags { highlight_numbers: true, highlight_strings: true },
};

pub const SYNTAX_DB: &[Syntax] = &[C_SYNTAX];

/// Selects a syntax table entry for `filename`, or `None` if nothing matches (highlighting is
/// then suppressed entirely). First match in `SYNTAX_DB` wins.
pub fn select_syntax(filename: &str) -> Option<&'static Syntax> {
    SYNTAX_DB.iter().find(|s| s.file_match.iter().any(|pat| matches_filename(pat, filename)))
}

fn matches_filename(pattern: &str, filename: &str) -> bool {
    if let Some(ext) = pattern.strip_prefix('.') {
        filename.rsplit('.').next().is_some_and(|e| e == ext) && filename.contains('.')
    } else {
        filename.contains(pattern)
    }
}

fn is_separator(b: u8) -> bool {
    b.is_ascii_whitespace() || b == 0 || b",.()+-/*=~%<>[];".contains(&b)
}

/// Scans one row's `render` bytes, producing a same-length `Hl` vector and the outgoing
/// "still inside a multi-line comment" state (the row's `hl_open_comment`).
///
/// `in_comment_incoming` is the previous row's `hl_open_comment` (or `false` for row 0).
pub fn update_syntax(render: &[u8], syntax: Option<&Syntax>, in_comment_incoming: bool) -> (Vec<Hl>, bool) {
    let mut hl = vec![Hl::Normal; render.len()];

    let Some(syntax) = syntax else {
        return (hl, false);
    };

    let mut prev_sep = true;
    let mut in_string: u8 = 0;
    let mut in_comment = in_comment_incoming;
    let mut i = 0usize;

    let scs = syntax.single_line_comment;
    let (mcs, mce) = match syntax.multi_line_comment {
        Some((open, close)) => (open, close),
        None => ("", ""),
    };

    while i < render.len() {
        let b = render[i];

        // 1. single-line comment
        if let Some(scs) = scs {
            if in_string == 0 && !in_comment && render[i..].starts_with(scs.as_bytes()) {
                for slot in &mut hl[i..] {
                    *slot = Hl::Comment;
                }
                break;
            }
        }

        // 2. inside a multi-line comment
        if in_comment {
            hl[i] = Hl::MlComment;
            if !mce.is_empty() && render[i..].starts_with(mce.as_bytes()) {
                for slot in &mut hl[i..i + mce.len()] {
                    *slot = Hl::MlComment;
                }
                i += mce.len();
                in_comment = false;
                prev_sep = true;
                continue;
            }
            i += 1;
            continue;
        }

        // 3. multi-line comment open
        if in_string == 0 && !mcs.is_empty() && render[i..].starts_with(mcs.as_bytes()) {
            for slot in &mut hl[i..i + mcs.len()] {
                *slot = Hl::MlComment;
            }
            i += mcs.len();
            in_comment = true;
            continue;
        }

        // 4. inside a string
        if syntax.flags.highlight_strings && in_string != 0 {
            hl[i] = Hl::String;
            if b == b'\\' && i + 1 < render.len() {
                hl[i + 1] = Hl::String;
                i += 2;
                prev_sep = true;
                continue;
            }
            if b == in_string {
                in_string = 0;
            }
            prev_sep = true;
            i += 1;
            continue;
        }

        // 5. enter string mode
        if syntax.flags.highlight_strings && (b == b'\'' || b == b'"') {
            in_string = b;
            hl[i] = Hl::String;
            i += 1;
            continue;
        }

        // 6. numbers
        if syntax.flags.highlight_numbers {
            let prev_is_number = i > 0 && hl[i - 1] == Hl::Number;
            if (b.is_ascii_digit() && (prev_sep || prev_is_number))
                || (b == b'.' && prev_is_number)
            {
                hl[i] = Hl::Number;
                prev_sep = false;
                i += 1;
                continue;
            }
        }

        // 7. keywords
        if prev_sep {
            if let Some((kw_len, secondary)) = match_keyword(&render[i..], syntax.keywords) {
                let tag = if secondary { Hl::Keyword2 } else { Hl::Keyword1 };
                for slot in &mut hl[i..i + kw_len] {
                    *slot = tag;
                }
                i += kw_len;
                prev_sep = false;
                continue;
            }
        }

        // 8. otherwise
        prev_sep = is_separator(b);
        i += 1;
    }

    (hl, in_comment)
}

/// If `render` starts with one of `keywords` (stripped of its trailing `|` marker) followed
/// immediately by a separator (or end of row), returns its length and whether it was secondary.
fn match_keyword(render: &[u8], keywords: &[&str]) -> Option<(usize, bool)> {
    for kw in keywords {
        let (word, secondary) = match kw.strip_suffix('|') {
            Some(w) => (w, true),
            None => (kw.as_str(), false),
        };
        let word = word.as_bytes();
        if render.len() >= word.len()
            && &render[..word.len()] == word
            && render.get(word.len()).map_or(true, |&b| is_separator(b))
        {
            return Some((word.len(), secondary));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_c_syntax_by_extension() {
        assert!(select_syntax("main.c").is_some());
        assert!(select_syntax("header.h").is_some());
        assert!(select_syntax("impl.cpp").is_some());
        assert!(select_syntax("readme.md").is_none());
    }

    #[test]
    fn line_comment_marks_rest_of_line() {
        let (hl, open) = update_syntax(b"int x; // comment", Some(&C_SYNTAX), false);
        assert!(!open);
        assert_eq!(hl[7], Hl::Comment);
        assert_eq!(*hl.last().unwrap(), Hl::Comment);
    }

    #[test]
    fn keyword_requires_trailing_separator() {
        let (hl, _) = update_syntax(b"intx", Some(&C_SYNTAX), false);
        // "int" is a secondary keyword but "intx" is one identifier, not keyword+x.
        assert_eq!(hl[0], Hl::Normal);

        let (hl, _) = update_syntax(b"int x;", Some(&C_SYNTAX), false);
        assert_eq!(hl[0], Hl::Keyword2);
        assert_eq!(hl[1], Hl::Keyword2);
        assert_eq!(hl[2], Hl::Keyword2);
        assert_eq!(hl[3], Hl::Normal);
    }

    #[test]
    fn primary_keyword_is_keyword1() {
        let (hl, _) = update_syntax(b"if (x)", Some(&C_SYNTAX), false);
        assert_eq!(hl[0], Hl::Keyword1);
        assert_eq!(hl[1], Hl::Keyword1);
    }

    #[test]
    fn strings_and_numbers() {
        let (hl, _) = update_syntax(br#"x = "hi"; y = 42;"#, Some(&C_SYNTAX), false);
        assert_eq!(hl[4], Hl::String);
        assert_eq!(hl[7], Hl::String);
        let num_pos = br#"x = "hi"; y = 42;"#.iter().position(|&b| b == b'4').unwrap();
        assert_eq!(hl[num_pos], Hl::Number);
        assert_eq!(hl[num_pos + 1], Hl::Number);
    }

    #[test]
    fn number_after_string_is_not_continuation() {
        let (hl, _) = update_syntax(br#""str"5"#, Some(&C_SYNTAX), false);
        let digit_pos = br#""str"5"#.iter().position(|&b| b == b'5').unwrap();
        assert_eq!(hl[digit_pos], Hl::Number);
    }

    #[test]
    fn multiline_comment_propagates_across_rows() {
        let rows_src: Vec<&[u8]> = vec![b"int a;", b"/* start", b"still in", b"end */ int b;"];
        let mut open = false;
        let mut hls = Vec::new();
        let mut opens = Vec::new();
        for row in &rows_src {
            let (hl, outgoing) = update_syntax(row, Some(&C_SYNTAX), open);
            hls.push(hl);
            opens.push(outgoing);
            open = outgoing;
        }

        assert!(!opens[0]);
        assert!(opens[1]);
        assert!(opens[2]);
        assert!(!opens[3]);

        assert!(hls[1].iter().all(|&h| h == Hl::MlComment));
        assert!(hls[2].iter().all(|&h| h == Hl::MlComment));

        // row 3: "end */ int b;" -> "end */" is MLCOMMENT, then " int b;" reclassified
        let row3 = &hls[3];
        assert_eq!(row3[0], Hl::MlComment); // 'e'
        let close_end = "end */".len();
        assert_eq!(row3[close_end], Hl::Normal); // the space after */
        let int_pos = rows_src[3].windows(3).position(|w| w == b"int").unwrap();
        assert_eq!(row3[int_pos], Hl::Keyword2);
    }

    #[test]
    fn closing_comment_clears_propagation_in_one_edit() {
        let rows_src: Vec<&[u8]> = vec![b"/* a", b"b */", b"int c;"];
        let mut open = false;
        let mut opens = Vec::new();
        for row in &rows_src {
            let (_, outgoing) = update_syntax(row, Some(&C_SYNTAX), open);
            open = outgoing;
            opens.push(outgoing);
        }
        assert!(opens[0]);
        assert!(!opens[1]);
        assert!(!opens[2]);
    }

    #[test]
    fn render_hl_length_parity() {
        let (hl, _) = update_syntax(b"struct Foo { int x; };", Some(&C_SYNTAX), false);
        assert_eq!(hl.len(), "struct Foo { int x; };".len());
    }

    #[test]
    fn no_syntax_suppresses_highlighting() {
        let (hl, open) = update_syntax(b"whatever // not a comment here", None, false);
        assert!(hl.iter().all(|&h| h == Hl::Normal));
        assert!(!open);
    }
}
