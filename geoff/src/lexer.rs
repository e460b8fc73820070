//! Descriptor tokenizer.
//!
//! Scans one line of Geoff source character by character and emits the flat
//! token sequence a [`crate::ast::Descriptor`] is built from. The property
//! literal (`{…}`) is not handled here; the subgraph builder strips it off
//! before the line reaches the tokenizer.

use std::iter::Peekable;
use std::str::Chars;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One typed token of a descriptor.
///
/// `name` may be empty (anonymous). `index` is the numeric suffix parsed
/// from `name.N`; `0` means "no suffix / the whole named set".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Token {
    Node {
        name: String,
        index: usize,
    },
    Rel {
        name: String,
        index: usize,
        rel_type: Option<String>,
    },
    Index {
        name: String,
    },
    /// `-`
    Connects,
    /// `>`
    To,
    /// `<`
    From,
    /// `<=`
    IsEntryIn,
    /// `=`
    Is,
}

impl Token {
    /// Anonymous node token, used for omitted relationship endpoints.
    pub fn anonymous_node() -> Self {
        Token::Node {
            name: String::new(),
            index: 0,
        }
    }

    /// The one-character type symbol this token contributes to a pattern
    /// string.
    pub fn symbol(&self) -> char {
        match self {
            Token::Node { .. } => 'N',
            Token::Rel { .. } => 'R',
            Token::Index { .. } => 'I',
            Token::Connects => '-',
            Token::To => '>',
            Token::From => '<',
            Token::IsEntryIn => '^',
            Token::Is => '=',
        }
    }

    pub fn is_connector(&self) -> bool {
        matches!(
            self,
            Token::Connects | Token::To | Token::From | Token::IsEntryIn | Token::Is
        )
    }
}

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            position: 0,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Option<Token>> {
        self.skip_whitespace();

        let Some(&char) = self.chars.peek() else {
            // End of input terminates the token loop; it is not an error.
            return Ok(None);
        };
        let start = self.position;

        let token = match char {
            '(' => {
                self.advance();
                let (name, index) = self.read_name_and_index()?;
                self.expect(')', start)?;
                Token::Node { name, index }
            }
            '[' => {
                self.advance();
                let (name, index) = self.read_name_and_index()?;
                let rel_type = if self.chars.peek() == Some(&':') {
                    self.advance();
                    let type_start = self.position;
                    let rel_type = self.read_name();
                    if rel_type.is_empty() {
                        return Err(Error::syntax(type_start, "expected a relationship type"));
                    }
                    Some(rel_type)
                } else {
                    None
                };
                self.expect(']', start)?;
                Token::Rel {
                    name,
                    index,
                    rel_type,
                }
            }
            '|' => {
                self.advance();
                let name = self.read_name();
                self.expect('|', start)?;
                Token::Index { name }
            }
            '-' => {
                self.advance();
                Token::Connects
            }
            '>' => {
                self.advance();
                Token::To
            }
            '<' => {
                self.advance();
                if self.chars.peek() == Some(&'=') {
                    self.advance();
                    Token::IsEntryIn
                } else {
                    Token::From
                }
            }
            '=' => {
                self.advance();
                Token::Is
            }
            other => {
                return Err(Error::syntax(
                    start,
                    format!("unexpected character {other:?}"),
                ));
            }
        };

        Ok(Some(token))
    }

    fn advance(&mut self) -> Option<char> {
        let char = self.chars.next();
        if char.is_some() {
            self.position += 1;
        }
        char
    }

    fn skip_whitespace(&mut self) {
        while let Some(&char) = self.chars.peek() {
            if char.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, close: char, open_position: usize) -> Result<()> {
        match self.advance() {
            Some(c) if c == close => Ok(()),
            Some(c) => Err(Error::syntax(
                self.position - 1,
                format!("expected {close:?}, found {c:?}"),
            )),
            None => Err(Error::syntax(
                open_position,
                format!("unterminated descriptor, expected {close:?}"),
            )),
        }
    }

    /// Identifier run: letters, digits and `_`. May be empty.
    fn read_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(&char) = self.chars.peek() {
            if char.is_ascii_alphanumeric() || char == '_' {
                name.push(char);
                self.advance();
            } else {
                break;
            }
        }
        name
    }

    /// Identifier with an optional `.N` suffix; the digits become the index.
    /// Index `0` is reserved for "no suffix", so `.0` is invalid and the
    /// leading digit must be 1–9.
    fn read_name_and_index(&mut self) -> Result<(String, usize)> {
        let name = self.read_name();
        if self.chars.peek() != Some(&'.') {
            return Ok((name, 0));
        }
        self.advance();

        let digits_start = self.position;
        let mut digits = String::new();
        while let Some(&char) = self.chars.peek() {
            if char.is_ascii_digit() {
                digits.push(char);
                self.advance();
            } else {
                break;
            }
        }
        if digits.is_empty() || digits.starts_with('0') {
            return Err(Error::syntax(
                digits_start,
                "index suffix must be a digit run starting 1-9",
            ));
        }
        let index = digits
            .parse::<usize>()
            .map_err(|_| Error::syntax(digits_start, format!("index suffix too large: {digits}")))?;
        Ok((name, index))
    }
}
