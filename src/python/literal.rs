//! String literal decoding and docstring cleanup.

use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\d\W]\w*$").expect("identifier pattern is valid"));

/// Whether `name` is a valid Python identifier.
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Decode the source text of a single string literal.
///
/// Returns `None` for bytes and f-strings, which never count as docstrings,
/// and for text that isn't a complete literal.
pub fn decode_string(text: &str) -> Option<String> {
    let prefix_len = text
        .chars()
        .take_while(|c| matches!(c, 'r' | 'R' | 'u' | 'U' | 'b' | 'B' | 'f' | 'F'))
        .count();
    let (prefix, rest) = text.split_at(prefix_len);
    let prefix = prefix.to_ascii_lowercase();
    if prefix.contains('b') || prefix.contains('f') {
        return None;
    }
    let raw = prefix.contains('r');

    let quote = if rest.starts_with("\"\"\"") || rest.starts_with("'''") {
        &rest[..3]
    } else if rest.starts_with('"') || rest.starts_with('\'') {
        &rest[..1]
    } else {
        return None;
    };
    if rest.len() < quote.len() * 2 || !rest.ends_with(quote) {
        return None;
    }
    let body = &rest[quote.len()..rest.len() - quote.len()];

    if raw {
        Some(body.to_string())
    } else {
        Some(unescape(body))
    }
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(next) = chars.next() else {
            out.push('\\');
            break;
        };
        match next {
            '\n' => {}
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'a' => out.push('\u{7}'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\u{b}'),
            '0'..='7' => {
                let mut digits = next.to_string();
                while digits.len() < 3 {
                    match chars.peek() {
                        Some(d @ '0'..='7') => {
                            digits.push(*d);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                push_code(&mut out, &digits, 8, &format!("\\{}", digits));
            }
            'x' | 'u' | 'U' => {
                let width = match next {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = (0..width).filter_map(|_| chars.next_if(|d| d.is_ascii_hexdigit())).collect();
                if digits.len() == width {
                    push_code(&mut out, &digits, 16, &format!("\\{}{}", next, digits));
                } else {
                    out.push('\\');
                    out.push(next);
                    out.push_str(&digits);
                }
            }
            other => {
                // Unknown escapes and \N{...} keep their backslash.
                out.push('\\');
                out.push(other);
            }
        }
    }

    out
}

fn push_code(out: &mut String, digits: &str, radix: u32, fallback: &str) {
    match u32::from_str_radix(digits, radix).ok().and_then(char::from_u32) {
        Some(c) => out.push(c),
        None => out.push_str(fallback),
    }
}

/// Clean up a docstring the way `inspect.cleandoc` does: expand tabs,
/// strip the first line, remove the common indentation of the remaining
/// lines and drop blank lines at both ends.
pub fn clean_doc(doc: &str) -> String {
    let mut lines: Vec<String> = doc.split('\n').map(expand_tabs).collect();

    let margin = lines
        .iter()
        .skip(1)
        .filter(|line| !line.trim_start().is_empty())
        .map(|line| line.chars().count() - line.trim_start().chars().count())
        .min();

    if let Some(first) = lines.first_mut() {
        *first = first.trim_start().to_string();
    }
    if let Some(margin) = margin {
        for line in lines.iter_mut().skip(1) {
            *line = line.chars().skip(margin).collect();
        }
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    let leading = lines.iter().take_while(|l| l.is_empty()).count();
    lines.drain(..leading);

    lines.join("\n")
}

fn expand_tabs(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut column = 0;
    for c in line.chars() {
        if c == '\t' {
            let spaces = 8 - column % 8;
            out.extend(std::iter::repeat(' ').take(spaces));
            column += spaces;
        } else {
            out.push(c);
            column += 1;
        }
    }
    out
}

/// Render a string the way Python's `repr()` does.
pub fn repr_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// Join a multi-line expression into one line.
pub fn collapse_source(text: &str) -> String {
    let mut out = String::new();
    for piece in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let glue = !out.is_empty()
            && !out.ends_with(['(', '[', '{'])
            && !piece.starts_with([')', ']', '}']);
        if glue {
            out.push(' ');
        }
        out.push_str(piece);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_triple_quoted() {
        assert_eq!(decode_string(r#""""Print hello.""""#).unwrap(), "Print hello.");
        assert_eq!(decode_string("'''a\nb'''").unwrap(), "a\nb");
    }

    #[test]
    fn test_decode_escapes() {
        assert_eq!(decode_string(r#""tab\there""#).unwrap(), "tab\there");
        assert_eq!(decode_string(r#"'it\'s'"#).unwrap(), "it's");
        assert_eq!(decode_string(r#""\x41é\101""#).unwrap(), "AéA");
        assert_eq!(decode_string(r#""keep \d""#).unwrap(), "keep \\d");
    }

    #[test]
    fn test_decode_raw_keeps_backslashes() {
        assert_eq!(decode_string(r#"r"a\nb""#).unwrap(), "a\\nb");
        assert_eq!(decode_string(r#"R'''\d+'''"#).unwrap(), "\\d+");
    }

    #[test]
    fn test_decode_rejects_bytes_and_fstrings() {
        assert!(decode_string(r#"b"data""#).is_none());
        assert!(decode_string(r#"f"{x}""#).is_none());
        assert!(decode_string("not a string").is_none());
    }

    #[test]
    fn test_clean_doc_removes_indentation() {
        let doc = "Summary line.\n\n    Body line one.\n      indented more.\n    ";
        assert_eq!(clean_doc(doc), "Summary line.\n\nBody line one.\n  indented more.");
    }

    #[test]
    fn test_clean_doc_strips_blank_edges() {
        let doc = "\n    First.\n\n    Second.\n\n";
        assert_eq!(clean_doc(doc), "First.\n\nSecond.");
    }

    #[test]
    fn test_clean_doc_single_line() {
        assert_eq!(clean_doc("  Print *Hello World!*  "), "Print *Hello World!*  ");
    }

    #[test]
    fn test_clean_doc_expands_tabs() {
        assert_eq!(clean_doc("x\n\ty\n\t\tz"), "x\ny\n        z");
    }

    #[test]
    fn test_repr_str_quotes() {
        assert_eq!(repr_str("hello"), "'hello'");
        assert_eq!(repr_str("it's"), "\"it's\"");
        assert_eq!(repr_str("both ' and \""), "'both \\' and \"'");
        assert_eq!(repr_str("a\nb"), "'a\\nb'");
    }

    #[test]
    fn test_collapse_source() {
        assert_eq!(collapse_source("{\n    'a': 1,\n    'b': 2,\n}"), "{'a': 1, 'b': 2,}");
        assert_eq!(collapse_source("42"), "42");
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("hello"));
        assert!(is_identifier("_private"));
        assert!(is_identifier("mod2"));
        assert!(!is_identifier("2mod"));
        assert!(!is_identifier("my-mod"));
        assert!(!is_identifier(""));
    }
}
