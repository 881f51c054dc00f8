//! Character-level tokenizer for the XFCC header grammar.
//!
//! The header reserves `=`, `;` and `,` as separators. A value may be quoted
//! to suppress separator splitting, and a backslash escapes the character
//! that follows it. The escape rules differ between the quoted and unquoted
//! contexts; see [`Lexer::next_token`].

use std::str::Chars;

use crate::error::LexError;

const SEPARATORS: &str = "=;,";

pub(crate) fn is_separator(ch: char) -> bool {
    SEPARATORS.contains(ch)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// A run of ordinary characters, or the contents of a quoted string.
    String,
    /// A single unescaped separator character.
    Char,
    /// End of input.
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) text: String,
    /// Zero-based character offset of the token's first character.
    pub(crate) column: usize,
}

impl Token {
    pub(crate) fn describe(&self) -> String {
        match self.kind {
            TokenKind::String | TokenKind::Char => format!("`{}`", self.text),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

/// One-pass scanner over a header or subject string.
///
/// When an unquoted run is terminated by a separator, the separator is kept
/// as a pending token and handed out by the following call instead of
/// rewinding the input.
pub(crate) struct Lexer<'a> {
    chars: Chars<'a>,
    pending: Option<Token>,
    buf: String,
    start: usize,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Lexer {
            chars: input.chars(),
            pending: None,
            buf: String::new(),
            start: 0,
            pos: 0,
        }
    }

    fn emit(&mut self, kind: TokenKind) -> Token {
        let token = Token {
            kind,
            text: std::mem::take(&mut self.buf),
            column: self.start,
        };
        self.start = self.pos;
        token
    }

    /// Scan the next token. Quoting and escaping state is local to a single
    /// call: a quote left open at end of input fails here, not later.
    pub(crate) fn next_token(&mut self) -> Result<Token, LexError> {
        if let Some(token) = self.pending.take() {
            return Ok(token);
        }

        let mut quoting = false;
        let mut escaping = false;

        while let Some(ch) = self.chars.next() {
            self.pos += 1;

            if escaping {
                escaping = false;
                match ch {
                    // Inside quotes two backslashes stay two backslashes, so
                    // a doubly-escaped payload survives the outer parse
                    // verbatim. Outside quotes they collapse to one.
                    '\\' if quoting => {
                        self.buf.push('\\');
                        self.buf.push('\\');
                    }
                    '\\' => self.buf.push('\\'),
                    '"' if quoting => self.buf.push('"'),
                    // `\,` is carried through rather than consumed, so a
                    // comma escape inside a quoted Subject value is still
                    // there when the subject string is parsed on its own.
                    ',' if quoting => {
                        self.buf.push('\\');
                        self.buf.push(',');
                    }
                    c if !quoting && is_separator(c) => self.buf.push(c),
                    c => {
                        return Err(LexError::InvalidEscapeCharacter {
                            ch: c,
                            column: self.pos,
                        });
                    }
                }
            } else if ch == '\\' {
                escaping = true;
            } else if ch == '"' {
                if quoting {
                    // Closing quote ends the token even if it is empty.
                    return Ok(self.emit(TokenKind::String));
                }
                quoting = true;
            } else if !quoting && is_separator(ch) {
                if !self.buf.is_empty() {
                    // The separator terminates this run; hand it out on the
                    // next call.
                    self.pending = Some(Token {
                        kind: TokenKind::Char,
                        text: ch.to_string(),
                        column: self.pos - 1,
                    });
                    let token = Token {
                        kind: TokenKind::String,
                        text: std::mem::take(&mut self.buf),
                        column: self.start,
                    };
                    self.start = self.pos;
                    return Ok(token);
                }
                self.buf.push(ch);
                return Ok(self.emit(TokenKind::Char));
            } else {
                self.buf.push(ch);
            }
        }

        if quoting {
            return Err(LexError::UnterminatedQuote { column: self.pos });
        }
        if escaping {
            return Err(LexError::UnterminatedEscape { column: self.pos });
        }

        if !self.buf.is_empty() {
            return Ok(self.emit(TokenKind::String));
        }
        Ok(self.emit(TokenKind::Eof))
    }
}
