use std::borrow::Cow;
use std::io::BufRead;
use std::path::Path;

use tracing::{trace, warn};

use crate::error::{Error, ParseError, ParseErrorKind};
use crate::model::{Entry, EnvironmentMap, KeyMode};

/// Parse `.env` assignments from UTF-8 text.
pub fn parse_str(input: &str) -> Result<EnvironmentMap, Error> {
    parse_str_with_mode(input, KeyMode::Verbatim)
}

/// Parse `.env` assignments from UTF-8 text using a specific key mode.
pub fn parse_str_with_mode(input: &str, key_mode: KeyMode) -> Result<EnvironmentMap, Error> {
    parse_str_with_source(input, None, key_mode).map_err(Error::from)
}

/// Parse `.env` assignments from UTF-8 bytes.
pub fn parse_bytes(input: &[u8]) -> Result<EnvironmentMap, Error> {
    parse_bytes_with_mode(input, KeyMode::Verbatim)
}

/// Parse `.env` assignments from UTF-8 bytes using a specific key mode.
pub fn parse_bytes_with_mode(input: &[u8], key_mode: KeyMode) -> Result<EnvironmentMap, Error> {
    let text = std::str::from_utf8(input)?;
    parse_str_with_mode(text, key_mode)
}

/// Parse `.env` assignments from a buffered reader.
pub fn parse_reader<R: BufRead>(reader: R) -> Result<EnvironmentMap, Error> {
    parse_reader_with_mode(reader, KeyMode::Verbatim)
}

/// Parse `.env` assignments from a buffered reader using a specific key mode.
pub fn parse_reader_with_mode<R: BufRead>(
    mut reader: R,
    key_mode: KeyMode,
) -> Result<EnvironmentMap, Error> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    parse_bytes_with_mode(&buf, key_mode)
}

pub(crate) fn parse_str_with_source(
    input: &str,
    source: Option<&Path>,
    key_mode: KeyMode,
) -> Result<EnvironmentMap, ParseError> {
    let normalized = normalize_newlines(input);
    let lines: Vec<&str> = normalized.split('\n').collect();

    let mut map = EnvironmentMap::new();
    let mut cursor = 0usize;

    while cursor < lines.len() {
        let line_num = cursor as u32 + 1;
        let line = lines[cursor];
        cursor += 1;

        let Some((key, rest)) = split_assignment(line, line_num) else {
            continue;
        };
        if key_mode == KeyMode::Shell && !is_shell_identifier(key) {
            return Err(ParseError::new(
                line_num,
                ParseErrorKind::InvalidKey {
                    key: key.to_owned(),
                },
            ));
        }

        let rest_trimmed = rest.trim_start();
        let value = match rest_trimmed.chars().next() {
            Some(quote @ ('\'' | '"')) => {
                let Some(quoted) = read_quoted(rest_trimmed, &lines[cursor..], quote) else {
                    return Err(ParseError::new(
                        line_num,
                        ParseErrorKind::UnterminatedQuote {
                            key: key.to_owned(),
                        },
                    ));
                };
                cursor += quoted.extra_lines;

                let tail = quoted.tail.trim_start();
                if !tail.is_empty() && !tail.starts_with('#') {
                    warn!(line = line_num, key, "ignoring text after closing quote");
                }
                quoted.value
            }
            _ => unquoted_value(rest).to_owned(),
        };

        trace!(line = line_num, key, "parsed assignment");
        map.insert(Entry {
            key: key.to_owned(),
            value,
            source: source.map(Path::to_path_buf),
            line: line_num,
        });
    }

    Ok(map)
}

fn normalize_newlines(input: &str) -> Cow<'_, str> {
    if !input.contains('\r') {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\r' {
            out.push('\n');
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            continue;
        }
        out.push(ch);
    }

    Cow::Owned(out)
}

/// Split a physical line into `(key, rest)`, or `None` for lines that bind
/// nothing.
fn split_assignment(line: &str, line_num: u32) -> Option<(&str, &str)> {
    let mut working = line.trim_start();
    if working.is_empty() || working.starts_with('#') {
        return None;
    }

    if let Some(rest) = working.strip_prefix("export")
        && rest.starts_with(char::is_whitespace)
    {
        working = rest.trim_start();
    }

    let Some((key, rest)) = working.split_once('=') else {
        warn!(line = line_num, "skipping line without `=`");
        return None;
    };

    let key = key.trim();
    if key.is_empty() {
        warn!(line = line_num, "skipping assignment with empty key");
        return None;
    }

    Some((key, rest))
}

/// Value of an unquoted assignment: everything up to a `#` that follows
/// whitespace, trimmed.
fn unquoted_value(rest: &str) -> &str {
    let mut prev_is_space = false;
    for (idx, ch) in rest.char_indices() {
        if ch == '#' && prev_is_space {
            return rest[..idx].trim();
        }
        prev_is_space = ch.is_whitespace();
    }
    rest.trim()
}

struct QuotedValue<'a> {
    value: String,
    extra_lines: usize,
    tail: &'a str,
}

/// Read a quoted value starting at `first` (which begins with `quote`),
/// continuing into `following` lines while the quote stays open.
fn read_quoted<'a>(first: &'a str, following: &[&'a str], quote: char) -> Option<QuotedValue<'a>> {
    let body = &first[quote.len_utf8()..];
    if let Some(end) = find_closing_quote(body, quote) {
        return Some(QuotedValue {
            value: body[..end].to_owned(),
            extra_lines: 0,
            tail: &body[end + 1..],
        });
    }

    let mut value = body.to_owned();
    for (offset, line) in following.iter().enumerate() {
        value.push('\n');
        if let Some(end) = find_closing_quote(line, quote) {
            value.push_str(&line[..end]);
            return Some(QuotedValue {
                value,
                extra_lines: offset + 1,
                tail: &line[end + 1..],
            });
        }
        value.push_str(line);
    }

    None
}

fn find_closing_quote(text: &str, quote: char) -> Option<usize> {
    let bytes = text.as_bytes();
    text.char_indices()
        .filter(|(_, ch)| *ch == quote)
        .map(|(idx, _)| idx)
        // Single quotes are fully literal; a backslash cannot escape them.
        .find(|idx| quote == '\'' || !is_preceded_by_odd_backslashes(bytes, *idx))
}

fn is_preceded_by_odd_backslashes(bytes: &[u8], idx: usize) -> bool {
    let mut cursor = idx;
    let mut backslash_count = 0usize;
    while cursor > 0 && bytes[cursor - 1] == b'\\' {
        cursor -= 1;
        backslash_count += 1;
    }

    backslash_count % 2 == 1
}

fn is_shell_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(ch) if ch.is_ascii_alphabetic() || ch == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}
