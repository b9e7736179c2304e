use crate::error::{Error, QuoteKind};

/// One whitespace/comment-delimited unit of source text, tagged with the
/// 1-based line it started on. Tokens borrow from the source buffer; the
/// buffer itself is never modified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub line: usize,
    pub text: &'a str,
}

/// Splits a source buffer into tokens. The lexer has no knowledge of the
/// assembly grammar; a token is a maximal run of non-blank characters, except
/// that a quoted run is kept together even across whitespace and `;`.
pub struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            line: 1,
        }
    }

    /// Line the cursor is currently on.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token<'a>>, Error> {
        self.skip_blank();
        if self.pos >= self.bytes.len() {
            return Ok(None);
        }

        let start = self.pos;
        let line = self.line;
        while let Some(&b) = self.bytes.get(self.pos) {
            if b == b';' || b.is_ascii_whitespace() {
                break;
            }
            if b == b'"' || b == b'\'' {
                self.skip_quoted(b)?;
            } else {
                self.pos += 1;
            }
        }

        Ok(Some(Token {
            line,
            text: &self.src[start..self.pos],
        }))
    }

    // Whitespace and `;`-to-end-of-line comments. A `;` directly after a
    // token still starts a comment.
    fn skip_blank(&mut self) {
        let mut comment = false;
        while let Some(&b) = self.bytes.get(self.pos) {
            match b {
                b';' => comment = true,
                b'\n' => {
                    comment = false;
                    self.line += 1;
                }
                _ if comment || b.is_ascii_whitespace() => {}
                _ => break,
            }
            self.pos += 1;
        }
    }

    // Scans past a quoted run. Only the two-character sequence `\<delim>`
    // keeps the run open here; full escape decoding is the literal decoders'
    // job.
    fn skip_quoted(&mut self, delim: u8) -> Result<(), Error> {
        let start_line = self.line;
        loop {
            if self.bytes[self.pos] == b'\n' {
                self.line += 1;
            }
            if self.bytes[self.pos] == b'\\' && self.bytes.get(self.pos + 1) == Some(&delim) {
                self.pos += 2;
            } else {
                self.pos += 1;
            }
            match self.bytes.get(self.pos) {
                Some(&b) if b == delim => break,
                Some(_) => {}
                None => {
                    let kind = if delim == b'"' {
                        QuoteKind::String
                    } else {
                        QuoteKind::Character
                    };
                    return Err(Error::UnterminatedLiteral {
                        line: start_line,
                        kind,
                    });
                }
            }
        }
        self.pos += 1; // past the closing delimiter
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_tokens(src: &str) -> Vec<(usize, &str)> {
        let mut lexer = Lexer::new(src);
        let mut tokens = vec![];
        while let Some(token) = lexer.next_token().unwrap() {
            tokens.push((token.line, token.text));
        }
        tokens
    }

    #[test]
    fn splits_on_whitespace_and_counts_lines() {
        assert_eq!(
            all_tokens("LD data\n\tST 0x10\n"),
            vec![(1, "LD"), (1, "data"), (2, "ST"), (2, "0x10")]
        );
    }

    #[test]
    fn empty_and_blank_input() {
        assert_eq!(all_tokens(""), vec![]);
        assert_eq!(all_tokens("  \n\t \n"), vec![]);
    }

    #[test]
    fn comments_run_to_end_of_line() {
        assert_eq!(
            all_tokens("one ; two three\nfour"),
            vec![(1, "one"), (2, "four")]
        );
    }

    #[test]
    fn comment_directly_after_token() {
        assert_eq!(all_tokens("one;two\nthree"), vec![(1, "one"), (2, "three")]);
    }

    #[test]
    fn comment_only_source() {
        assert_eq!(all_tokens("; nothing here"), vec![]);
    }

    #[test]
    fn quoted_run_keeps_blanks_and_semicolons() {
        assert_eq!(
            all_tokens("\"a b;c\" next"),
            vec![(1, "\"a b;c\""), (1, "next")]
        );
    }

    #[test]
    fn escaped_delimiter_does_not_terminate() {
        assert_eq!(all_tokens(r#""a\"b""#), vec![(1, r#""a\"b""#)]);
        assert_eq!(all_tokens(r"'\''"), vec![(1, r"'\''")]);
    }

    #[test]
    fn token_reports_its_starting_line() {
        let tokens = all_tokens("\n\n\"a\nb\" tail");
        assert_eq!(tokens, vec![(3, "\"a\nb\""), (4, "tail")]);
    }

    #[test]
    fn unterminated_string_reports_start_line() {
        let mut lexer = Lexer::new("ok\n\"open\nno end");
        assert_eq!(lexer.next_token().unwrap().unwrap().text, "ok");
        match lexer.next_token() {
            Err(Error::UnterminatedLiteral { line, kind }) => {
                assert_eq!(line, 2);
                assert_eq!(kind, QuoteKind::String);
            }
            other => panic!("expected unterminated literal, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_character_literal() {
        let mut lexer = Lexer::new("'x");
        match lexer.next_token() {
            Err(Error::UnterminatedLiteral { line: 1, kind }) => {
                assert_eq!(kind, QuoteKind::Character);
            }
            other => panic!("expected unterminated literal, got {other:?}"),
        }
    }

    #[test]
    fn literal_suffix_stays_in_token() {
        assert_eq!(all_tokens("'A'+1 \"s\"nz"), vec![(1, "'A'+1"), (1, "\"s\"nz")]);
    }
}
