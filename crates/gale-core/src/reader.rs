// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Token reader over pre-filtered text.
//!
//! The source is first stripped of every whitespace character found outside
//! double quotes. Tokens are then produced one at a time: exactly one token
//! is buffered as [`Reader::current`] and [`Reader::forward`] replaces it by
//! the next one.

use std::fs;
use std::path::Path;

use crate::error::VarError;

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// End of the stream. Forwarding past it keeps returning `End`.
    End,
    /// Any single character that does not start another token.
    Char(char),
    /// A double-quoted string, escapes decoded.
    Str(String),
    /// An integer literal.
    Int(i32),
    /// A numeric literal holding a `.`.
    Float(f32),
    /// A letter followed by letters, digits or underscores.
    Ident(String),
    /// A numeric literal that does not fit its type, kept as written.
    Malformed(String),
}

/// Forward-only tokenizer.
#[derive(Debug)]
pub struct Reader {
    source: Vec<char>,
    pos: usize,
    current: Token,
}

impl Reader {
    /// Creates a reader over a string. The first token is read immediately.
    pub fn new(text: &str) -> Self {
        let mut reader = Self {
            source: prefilter(text),
            pos: 0,
            current: Token::Char('\0'),
        };
        reader.advance();
        reader
    }

    /// Creates a reader over the content of a file.
    pub fn from_file(path: &Path) -> Result<Self, VarError> {
        let text =
            fs::read_to_string(path).map_err(|_| VarError::FileOpen(path.to_path_buf()))?;
        Ok(Self::new(&text))
    }

    /// The buffered token.
    #[must_use]
    pub fn current(&self) -> &Token {
        &self.current
    }

    /// Returns `true` if the buffered token is the character `c`.
    #[must_use]
    pub fn is_char(&self, c: char) -> bool {
        self.current == Token::Char(c)
    }

    /// Returns `true` once the stream is exhausted.
    #[must_use]
    pub fn at_end(&self) -> bool {
        self.current == Token::End
    }

    /// Drops the buffered token, reads the next one and returns it.
    pub fn forward(&mut self) -> &Token {
        if self.current != Token::End {
            self.advance();
        }
        &self.current
    }

    fn peek_at(&self, pos: usize) -> Option<char> {
        self.source.get(pos).copied()
    }

    fn advance(&mut self) {
        let Some(c) = self.peek_at(self.pos) else {
            self.current = Token::End;
            return;
        };
        self.pos += 1;

        self.current = if c == '"' {
            self.read_string()
        } else if c.is_ascii_digit() || (c == '-' && self.starts_number(self.pos)) {
            self.read_number(c)
        } else if c.is_ascii_alphabetic() {
            self.read_ident(c)
        } else {
            Token::Char(c)
        };
    }

    fn starts_number(&self, pos: usize) -> bool {
        matches!(self.peek_at(pos), Some(n) if n.is_ascii_digit() || n == '.')
    }

    fn read_string(&mut self) -> Token {
        let mut value = String::new();
        // The pre-filter guarantees a closing quote.
        while let Some(c) = self.peek_at(self.pos) {
            self.pos += 1;
            match c {
                '"' => break,
                '\\' => {
                    let escaped = self.peek_at(self.pos).unwrap_or('"');
                    self.pos += 1;
                    value.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    });
                }
                other => value.push(other),
            }
        }
        Token::Str(value)
    }

    fn read_number(&mut self, first: char) -> Token {
        let mut literal = String::from(first);
        let mut dotted = false;
        while let Some(c) = self.peek_at(self.pos) {
            if c.is_ascii_digit() || (c == '.' && !dotted) {
                dotted |= c == '.';
                literal.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }

        let token = if dotted {
            literal
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Token::Float)
        } else {
            literal.parse().map(Token::Int).ok()
        };
        token.unwrap_or(Token::Malformed(literal))
    }

    fn read_ident(&mut self, first: char) -> Token {
        let mut name = String::from(first);
        while let Some(c) = self.peek_at(self.pos) {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        Token::Ident(name)
    }
}

/// Yields the remaining tokens, starting with the buffered one, up to (not
/// including) [`Token::End`].
impl Iterator for Reader {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.current == Token::End {
            return None;
        }
        let token = std::mem::replace(&mut self.current, Token::End);
        self.advance();
        Some(token)
    }
}

/// Removes whitespace outside quotes and closes a dangling quote or escape.
fn prefilter(text: &str) -> Vec<char> {
    let mut out = Vec::with_capacity(text.len());
    let mut quoted = false;
    let mut escape = false;

    for c in text.chars() {
        if quoted {
            out.push(c);
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                quoted = false;
            }
        } else if c == '"' {
            out.push(c);
            quoted = true;
        } else if !c.is_whitespace() {
            out.push(c);
        }
    }

    if quoted {
        if escape {
            log::error!("Reader: escaping character at end of stream in: {text}");
        } else {
            log::error!("Reader: end of stream encountered while expecting a '\"' in: {text}");
        }
        out.push('"');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<Token> {
        Reader::new(text).collect()
    }

    #[test]
    fn whitespace_outside_quotes_is_ignored() {
        assert_eq!(
            tokens(" m . add ( 2 ,\n\t3 ) "),
            vec![
                Token::Ident("m".into()),
                Token::Char('.'),
                Token::Ident("add".into()),
                Token::Char('('),
                Token::Int(2),
                Token::Char(','),
                Token::Int(3),
                Token::Char(')'),
            ]
        );
        assert_eq!(tokens("\"a b  c\""), vec![Token::Str("a b  c".into())]);
    }

    #[test]
    fn string_escapes_are_decoded() {
        assert_eq!(
            tokens(r#""l1\nl2\t\r\"q\"\\x\y""#),
            vec![Token::Str("l1\nl2\t\r\"q\"\\xy".into())]
        );
    }

    #[test]
    fn numbers() {
        assert_eq!(
            tokens("12,-7,3.5,-0.25,1.2.3"),
            vec![
                Token::Int(12),
                Token::Char(','),
                Token::Int(-7),
                Token::Char(','),
                Token::Float(3.5),
                Token::Char(','),
                Token::Float(-0.25),
                Token::Char(','),
                Token::Float(1.2),
                Token::Char('.'),
                Token::Int(3),
            ]
        );
        assert_eq!(tokens("-a"), vec![Token::Char('-'), Token::Ident("a".into())]);
    }

    #[test]
    fn out_of_range_numbers_are_malformed() {
        assert_eq!(
            tokens("3000000000,-.,2147483647"),
            vec![
                Token::Malformed("3000000000".into()),
                Token::Char(','),
                Token::Malformed("-.".into()),
                Token::Char(','),
                Token::Int(i32::MAX),
            ]
        );
        let huge = format!("{}.0", "9".repeat(50));
        assert_eq!(tokens(&huge), vec![Token::Malformed(huge.clone())]);
    }

    #[test]
    fn identifiers_start_with_a_letter() {
        assert_eq!(
            tokens("_x a_1b"),
            vec![Token::Char('_'), Token::Ident("xa_1b".into())]
        );
    }

    #[test]
    fn unterminated_string_is_closed() {
        assert_eq!(tokens("\"abc"), vec![Token::Str("abc".into())]);
        assert_eq!(tokens("\"abc\\"), vec![Token::Str("abc\"".into())]);
    }

    #[test]
    fn forward_sticks_at_end() {
        let mut reader = Reader::new("x");
        assert_eq!(reader.current(), &Token::Ident("x".into()));
        assert_eq!(reader.forward(), &Token::End);
        assert_eq!(reader.forward(), &Token::End);
        assert!(reader.at_end());
        assert_eq!(Reader::new("   ").current(), &Token::End);
    }
}
