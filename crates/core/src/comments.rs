//! Language-aware comment stripping.
//!
//! Comment text is overwritten with spaces instead of being cut out, so every
//! surviving token keeps both its line number and its byte column. Line breaks
//! inside block comments are kept for the same reason.

use crate::syntax::SyntaxKind;
use std::ops::Range;

#[derive(Debug, Clone, Copy)]
enum Mode {
    Code,
    Str {
        start: usize,
        quote: u8,
        triple: bool,
        multiline: bool,
    },
}

/// Removes comments from `text` for the given syntax.
///
/// Delimiters inside string literals are left alone, so `"a#b"` or
/// `"http://host"` survive. An unterminated block comment swallows the rest of
/// the input.
#[must_use]
pub fn strip(text: &str, syntax: SyntaxKind) -> String {
    let spans = comment_spans(text.as_bytes(), syntax);
    if spans.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for span in spans {
        out.push_str(&text[cursor..span.start]);
        for ch in text[span.clone()].chars() {
            match ch {
                '\n' | '\r' => out.push(ch),
                _ => out.extend(std::iter::repeat_n(' ', ch.len_utf8())),
            }
        }
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);
    out
}

fn comment_spans(bytes: &[u8], syntax: SyntaxKind) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut mode = Mode::Code;
    let mut i = 0;

    loop {
        if i >= bytes.len() {
            match mode {
                Mode::Str {
                    start,
                    multiline: false,
                    ..
                } => {
                    mode = Mode::Code;
                    i = start + 1;
                    continue;
                }
                _ => break,
            }
        }

        let b = bytes[i];
        match mode {
            Mode::Code => match syntax {
                SyntaxKind::TsJs => match (b, bytes.get(i + 1)) {
                    (b'/', Some(b'/')) => {
                        let end = line_end(bytes, i);
                        spans.push(i..end);
                        i = end;
                    }
                    (b'/', Some(b'*')) => {
                        let end = find(bytes, i + 2, b"*/").map_or(bytes.len(), |pos| pos + 2);
                        spans.push(i..end);
                        i = end;
                    }
                    (b'"' | b'\'', _) => {
                        mode = Mode::Str {
                            start: i,
                            quote: b,
                            triple: false,
                            multiline: false,
                        };
                        i += 1;
                    }
                    (b'`', _) => {
                        mode = Mode::Str {
                            start: i,
                            quote: b,
                            triple: false,
                            multiline: true,
                        };
                        i += 1;
                    }
                    _ => i += 1,
                },
                SyntaxKind::Python => match b {
                    b'#' => {
                        let end = line_end(bytes, i);
                        spans.push(i..end);
                        i = end;
                    }
                    b'"' | b'\'' => {
                        let triple = bytes[i..].starts_with(&[b, b, b]);
                        mode = Mode::Str {
                            start: i,
                            quote: b,
                            triple,
                            multiline: triple,
                        };
                        i += if triple { 3 } else { 1 };
                    }
                    _ => i += 1,
                },
            },
            Mode::Str {
                start,
                quote,
                triple,
                multiline,
            } => {
                if b == b'\\' {
                    i += 2;
                } else if triple && bytes[i..].starts_with(&[quote, quote, quote]) {
                    mode = Mode::Code;
                    i += 3;
                } else if !triple && b == quote {
                    mode = Mode::Code;
                    i += 1;
                } else if b == b'\n' && !multiline {
                    // Unterminated on its line, so the quote did not open a
                    // literal (regex `/"/`, JSX text `Don't`). Rescan after it.
                    mode = Mode::Code;
                    i = start + 1;
                } else {
                    i += 1;
                }
            }
        }
    }

    spans
}

fn line_end(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |pos| from + pos)
}

fn find(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    bytes
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| from + pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_ts_line_comment() {
        let src = "const a = 1; // process.env.GONE\nconst b = 2;\n";
        let out = strip(src, SyntaxKind::TsJs);
        assert!(!out.contains("GONE"));
        assert!(out.starts_with("const a = 1; "));
        assert!(out.contains("const b = 2;"));
        assert_eq!(out.lines().count(), src.lines().count());
    }

    #[test]
    fn test_strips_ts_block_comment_keeping_lines() {
        let src = "/* process.env.ONE\n   process.env.TWO */\nconst c = process.env.THREE;\n";
        let out = strip(src, SyntaxKind::TsJs);
        assert!(!out.contains("ONE"));
        assert!(!out.contains("TWO"));
        assert_eq!(out.lines().nth(2), Some("const c = process.env.THREE;"));
    }

    #[test]
    fn test_preserves_columns() {
        let src = "a /* x */ process.env.B";
        let out = strip(src, SyntaxKind::TsJs);
        assert_eq!(out.len(), src.len());
        assert_eq!(out.find("process"), src.find("process"));
    }

    #[test]
    fn test_unterminated_block_comment_strips_rest() {
        let src = "const a = 1;\n/* process.env.NEVER\nprocess.env.CLOSED";
        let out = strip(src, SyntaxKind::TsJs);
        assert!(out.starts_with("const a = 1;\n"));
        assert!(!out.contains("process"));
        assert_eq!(out.lines().count(), 3);
    }

    #[test]
    fn test_ts_slashes_inside_strings_survive() {
        let src = r#"const url = "http://example.com"; const b = process.env.KEEP;"#;
        assert_eq!(strip(src, SyntaxKind::TsJs), src);

        let src = "const t = `a // b ${process.env.TPL}`;";
        assert_eq!(strip(src, SyntaxKind::TsJs), src);

        let src = r#"const s = 'it\'s // fine'; // gone"#;
        let out = strip(src, SyntaxKind::TsJs);
        assert!(out.contains("it\\'s // fine"));
        assert!(!out.contains("gone"));
    }

    #[test]
    fn test_stray_quote_does_not_hide_trailing_comment() {
        let src = "const s = x.replace(/\"/g, ''); // process.env.LEGACY_KEY\n";
        let out = strip(src, SyntaxKind::TsJs);
        assert!(!out.contains("LEGACY_KEY"));
        assert!(out.starts_with("const s = x.replace(/\"/g, '');"));

        let src = "<p>Don't panic</p> {/* process.env.LEGACY_KEY */}\n";
        let out = strip(src, SyntaxKind::TsJs);
        assert!(!out.contains("LEGACY_KEY"));
        assert!(out.contains("Don't panic"));
        assert_eq!(out.len(), src.len());
    }

    #[test]
    fn test_stray_quote_at_end_of_input() {
        let src = "it's /* process.env.GONE */";
        let out = strip(src, SyntaxKind::TsJs);
        assert!(!out.contains("GONE"));

        let src = "x = \"open # trailing";
        assert!(!strip(src, SyntaxKind::Python).contains("trailing"));
    }

    #[test]
    fn test_strips_python_hash_comment() {
        let src = "db = os.environ['REAL']\n# os.getenv('COMMENTED')\nx = 1  # trailing\n";
        let out = strip(src, SyntaxKind::Python);
        assert!(out.contains("REAL"));
        assert!(!out.contains("COMMENTED"));
        assert!(!out.contains("trailing"));
        assert_eq!(out.lines().count(), 3);
    }

    #[test]
    fn test_python_hash_inside_string_survives() {
        let src = "path = \"a#b\"\nkey = os.getenv('KEY')  # note\n";
        let out = strip(src, SyntaxKind::Python);
        assert!(out.contains("\"a#b\""));
        assert!(!out.contains("note"));
    }

    #[test]
    fn test_python_triple_quoted_string() {
        let src = "doc = \"\"\"\n# not a comment\n\"\"\"\n# a comment\n";
        let out = strip(src, SyntaxKind::Python);
        assert!(out.contains("# not a comment"));
        assert!(!out.contains("# a comment"));
        assert_eq!(out.lines().nth(3).map(str::trim), Some(""));
    }

    #[test]
    fn test_python_does_not_treat_slashes_as_comments() {
        let src = "x = 10 // 3\n";
        assert_eq!(strip(src, SyntaxKind::Python), src);
    }

    #[test]
    fn test_ts_does_not_treat_hash_as_comment() {
        let src = "class A { #secret = process.env.PRIVATE; }";
        assert_eq!(strip(src, SyntaxKind::TsJs), src);
    }

    #[test]
    fn test_strip_is_idempotent() {
        let samples = [
            ("const a = 1; // c\n/* b\n c */ const d = process.env.D;\n", SyntaxKind::TsJs),
            ("x = os.getenv('X')  # c\n'''doc # here'''\n# end", SyntaxKind::Python),
            ("/* unterminated\nstill comment", SyntaxKind::TsJs),
        ];

        for (src, syntax) in samples {
            let once = strip(src, syntax);
            let twice = strip(&once, syntax);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_multibyte_comment_keeps_byte_length() {
        let src = "a; // héllo ✓\nb;";
        let out = strip(src, SyntaxKind::TsJs);
        assert_eq!(out.len(), src.len());
        assert!(out.ends_with("\nb;"));
    }
}
