//! Recursive-descent grammar over the token stream.
//!
//! One delimiter-parametrized field-list rule serves both levels of the
//! grammar: the top-level header (`;` between fields, `,` between groups)
//! and the subject sub-grammar (`,` between fields). The two semantic key
//! sets stay separate in the mapping layer.

use crate::error::{Error, GrammarError};
use crate::lexer::{Lexer, Token, TokenKind};

/// One `Key=Value` unit. `value` is `None` when the `=` had nothing after
/// it, which is distinct from an empty quoted value (`Some("")`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Field {
    pub(crate) key: String,
    pub(crate) value: Option<String>,
}

pub(crate) type FieldGroup = Vec<Field>;

pub(crate) struct Parser<'a> {
    lexer: Lexer<'a>,
    lookahead: Option<Token>,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Parser {
            lexer: Lexer::new(input),
            lookahead: None,
        }
    }

    /// Top-level grammar: comma-separated groups of semicolon-separated
    /// fields, covering the whole input.
    ///
    /// Callers handle the empty header before lexing, so every group here
    /// must contain at least one field; a header made only of separators is
    /// malformed.
    pub(crate) fn parse_groups(&mut self) -> Result<Vec<FieldGroup>, Error> {
        let mut groups = vec![self.parse_field_list(';')?];
        loop {
            let token = self.bump()?;
            match token.kind {
                TokenKind::Eof => return Ok(groups),
                TokenKind::Char if token.text == "," => {
                    groups.push(self.parse_field_list(';')?);
                }
                _ => {
                    return Err(GrammarError::UnexpectedToken {
                        found: token.describe(),
                        column: token.column,
                    }
                    .into());
                }
            }
        }
    }

    /// Subject sub-grammar: a single comma-separated field list covering the
    /// whole input.
    pub(crate) fn parse_subject_group(&mut self) -> Result<FieldGroup, Error> {
        let fields = self.parse_field_list(',')?;
        let token = self.bump()?;
        if token.kind != TokenKind::Eof {
            return Err(GrammarError::UnexpectedToken {
                found: token.describe(),
                column: token.column,
            }
            .into());
        }
        Ok(fields)
    }

    fn parse_field_list(&mut self, delimiter: char) -> Result<FieldGroup, Error> {
        let mut fields = vec![self.parse_field()?];
        while self.eat_char(delimiter)? {
            fields.push(self.parse_field()?);
        }
        Ok(fields)
    }

    /// `Field := String '=' String?`: the `=` is required, the value is
    /// not. A following separator (or end of input) leaves the value absent.
    fn parse_field(&mut self) -> Result<Field, Error> {
        let key = self.bump()?;
        if key.kind != TokenKind::String {
            return Err(GrammarError::ExpectedFieldKey {
                found: key.describe(),
                column: key.column,
            }
            .into());
        }

        let eq = self.bump()?;
        if !is_char(&eq, '=') {
            return Err(GrammarError::ExpectedEquals {
                key: key.text,
                found: eq.describe(),
                column: eq.column,
            }
            .into());
        }

        let value = if self.peek()?.kind == TokenKind::String {
            Some(self.bump()?.text)
        } else {
            None
        };

        Ok(Field {
            key: key.text,
            value,
        })
    }

    fn eat_char(&mut self, ch: char) -> Result<bool, Error> {
        if is_char(&self.peek()?, ch) {
            self.bump()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn peek(&mut self) -> Result<Token, Error> {
        if let Some(token) = &self.lookahead {
            return Ok(token.clone());
        }
        let token = self.lexer.next_token()?;
        self.lookahead = Some(token.clone());
        Ok(token)
    }

    fn bump(&mut self) -> Result<Token, Error> {
        match self.lookahead.take() {
            Some(token) => Ok(token),
            None => Ok(self.lexer.next_token()?),
        }
    }
}

fn is_char(token: &Token, ch: char) -> bool {
    token.kind == TokenKind::Char && token.text.chars().next() == Some(ch)
}
