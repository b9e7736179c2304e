use crate::error::Error;
use crate::lexer::Token;

/// Smallest and largest values a declared byte may take: a signed or an
/// unsigned byte both fit.
pub const BYTE_MIN: i32 = -128;
pub const BYTE_MAX: i32 = 255;

// ----------------------------------------------------------------------------
// Token shape tests

pub fn is_number(text: &str) -> bool {
    match text.as_bytes() {
        [c, ..] if c.is_ascii_digit() => true,
        [b'-', c, ..] if c.is_ascii_digit() => true,
        _ => false,
    }
}

pub fn is_character(text: &str) -> bool {
    matches!(text.as_bytes(), [b'\'', ..] | [b'-', b'\'', ..])
}

pub fn is_string(text: &str) -> bool {
    text.starts_with('"')
}

pub fn is_immediate(text: &str) -> bool {
    text.starts_with('#')
}

// ----------------------------------------------------------------------------
// Number literals

/// Parses a number literal: optional sign, then `0x` hex, `0b` binary, a
/// leading `0` for octal, or decimal. Anything left over is fatal.
pub fn parse_number(token: Token) -> Result<i32, Error> {
    let err = || Error::InvalidNumberLiteral {
        line: token.line,
        text: token.text.to_string(),
    };

    let (negative, rest) = match token.text.as_bytes().first() {
        Some(b'-') => (true, &token.text[1..]),
        Some(b'+') => (false, &token.text[1..]),
        _ => (false, token.text),
    };

    let (radix, digits) = if let Some(hex) = strip_prefix_ci(rest, "0x") {
        (16, hex)
    } else if let Some(bin) = strip_prefix_ci(rest, "0b") {
        (2, bin)
    } else if rest.len() > 1 && rest.starts_with('0') {
        (8, &rest[1..])
    } else {
        (10, rest)
    };

    // from_str_radix would happily take its own sign here.
    if digits.starts_with('+') || digits.starts_with('-') {
        return Err(err());
    }

    let value = i64::from_str_radix(digits, radix).map_err(|_| err())?;
    let value = if negative { -value } else { value };
    i32::try_from(value).map_err(|_| err())
}

// `prefix.len()` may fall inside a multi-byte character of `text`, so the
// boundary has to be checked before slicing.
fn strip_prefix_ci<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    if text.len() >= prefix.len()
        && text.is_char_boundary(prefix.len())
        && text[..prefix.len()].eq_ignore_ascii_case(prefix)
    {
        Some(&text[prefix.len()..])
    } else {
        None
    }
}

/// A number literal that must fit a declared byte.
pub fn parse_byte_number(token: Token) -> Result<i32, Error> {
    let value = parse_number(token)?;
    if !(BYTE_MIN..=BYTE_MAX).contains(&value) {
        return Err(Error::NumberOutOfRange {
            line: token.line,
            value,
        });
    }
    Ok(value)
}

// ----------------------------------------------------------------------------
// Character and string literals

/// Decodes the escape sequence at the start of `text` (which begins with the
/// backslash). Returns the byte value and the number of source characters
/// consumed.
pub fn parse_escape(text: &str, line: usize) -> Result<(u8, usize), Error> {
    let invalid = |shown: String| Error::InvalidEscapeSequence { line, text: shown };
    let bytes = text.as_bytes();
    let Some(&selector) = bytes.get(1) else {
        return Err(invalid(String::new()));
    };
    match selector {
        b'n' | b'N' => Ok((b'\n', 2)),
        b't' | b'T' => Ok((b'\t', 2)),
        b'r' | b'R' => Ok((b'\r', 2)),
        b'\'' => Ok((b'\'', 2)),
        b'"' => Ok((b'"', 2)),
        b'\\' => Ok((b'\\', 2)),
        b'x' | b'X' => match (bytes.get(2), bytes.get(3)) {
            (Some(&hi), Some(&lo)) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => {
                Ok(((hex_value(hi) << 4) | hex_value(lo), 4))
            }
            _ => Err(invalid((selector as char).to_string())),
        },
        _ => {
            let shown = text[1..].chars().next().unwrap_or_default();
            Err(invalid(shown.to_string()))
        }
    }
}

fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        _ => b - b'A' + 10,
    }
}

/// Parses `'c'`, `'\X'`, with an optional leading `-` (applied to the decoded
/// value) and an optional `+N`/`-N` suffix (added afterwards).
pub fn parse_character(token: Token) -> Result<i32, Error> {
    let invalid = || Error::InvalidCharacterLiteral {
        line: token.line,
        text: token.text.to_string(),
    };

    let (negative, body) = match token.text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token.text),
    };
    let bytes = body.as_bytes();
    if bytes.first() != Some(&b'\'') {
        return Err(invalid());
    }

    let (value, content_len) = match bytes.get(1) {
        Some(b'\\') => {
            let (byte, len) = parse_escape(&body[1..], token.line)?;
            (byte as i32, len)
        }
        Some(&byte) => (byte as i32, 1),
        None => return Err(invalid()),
    };

    if bytes.get(1 + content_len) != Some(&b'\'') {
        return Err(invalid());
    }
    let value = if negative { -value } else { value };

    let rest = &body[content_len + 2..];
    if rest.is_empty() {
        return Ok(value);
    }
    if !rest.starts_with('+') && !rest.starts_with('-') {
        return Err(invalid());
    }
    let offset = parse_number(Token {
        line: token.line,
        text: rest,
    })?;
    Ok(value + offset)
}

/// A character literal that must fit a declared byte.
pub fn parse_byte_character(token: Token) -> Result<i32, Error> {
    let value = parse_character(token)?;
    if !(BYTE_MIN..=BYTE_MAX).contains(&value) {
        return Err(Error::CharacterOutOfRange {
            line: token.line,
            text: token.text.to_string(),
            value,
        });
    }
    Ok(value)
}

/// A decoded string literal statement.
#[derive(Debug, PartialEq, Eq)]
pub struct StringBytes {
    pub bytes: Vec<u8>,
    /// Plain `"text"` emits a trailing `0` byte; the `nz` suffix suppresses it.
    pub zero_terminated: bool,
}

/// Decodes a `"`-delimited token. The delimiters themselves produce no
/// output; content bytes get the same escape handling as character literals.
pub fn parse_string(token: Token) -> Result<StringBytes, Error> {
    let text = token.text;
    let bytes = text.as_bytes();

    // Locate the closing quote the same way the lexer did.
    let mut close = 1;
    while close < bytes.len() && bytes[close] != b'"' {
        if bytes[close] == b'\\' && bytes.get(close + 1) == Some(&b'"') {
            close += 2;
        } else {
            close += 1;
        }
    }
    if close >= bytes.len() {
        return Err(Error::InvalidToken {
            line: token.line,
            text: text.to_string(),
        });
    }

    let suffix = &text[close + 1..];
    let zero_terminated = if suffix.is_empty() {
        true
    } else if suffix.eq_ignore_ascii_case("nz") {
        false
    } else {
        return Err(Error::InvalidToken {
            line: token.line,
            text: text.to_string(),
        });
    };

    let mut out = Vec::new();
    let mut i = 1;
    while i < close {
        if bytes[i] == b'\\' {
            let (value, len) = parse_escape(&text[i..], token.line)?;
            out.push(value);
            i += len;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    Ok(StringBytes {
        bytes: out,
        zero_terminated,
    })
}

// ----------------------------------------------------------------------------
// Label references

/// Splits `name`, `name+N` or `name-N` into the label name and its signed
/// offset; the offset's sign character is part of the number.
pub fn parse_label_ref(token: Token<'_>) -> Result<(&str, i32), Error> {
    match token.text.find(['+', '-']) {
        Some(idx) => {
            let offset = parse_number(Token {
                line: token.line,
                text: &token.text[idx..],
            })?;
            Ok((&token.text[..idx], offset))
        }
        None => Ok((token.text, 0)),
    }
}
