use std::iter::FusedIterator;

use log::{debug, info};
use phf::phf_map;

use crate::error::{LoxError, Reporter, Result};
use crate::token::{Token, TokenType};

/// Scan a whole buffer, forwarding lexical errors to the reporter. The
/// returned stream always ends in an `EOF` token.
pub fn scan(source: Vec<u8>, reporter: &mut Reporter) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();

    for result in Scanner::new(source) {
        match result {
            Ok(token) => tokens.push(token),

            Err(LoxError::Lex { line, message }) => reporter.error(line, &message),

            Err(other) => reporter.error(1, &other.to_string()),
        }
    }

    tokens
}

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and" => TokenType::AND,
    b"break" => TokenType::BREAK,
    b"class" => TokenType::CLASS,
    b"else" => TokenType::ELSE,
    b"false" => TokenType::FALSE,
    b"fun" => TokenType::FUN,
    b"for" => TokenType::FOR,
    b"if" => TokenType::IF,
    b"nil" => TokenType::NIL,
    b"or" => TokenType::OR,
    b"print" => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super" => TokenType::SUPER,
    b"this" => TokenType::THIS,
    b"true" => TokenType::TRUE,
    b"var" => TokenType::VAR,
    b"while" => TokenType::WHILE,
};

/// Byte-oriented scanner over a source buffer. Whitespace and comments are
/// consumed between tokens, so every call to `lex_token` starts on the first
/// byte of a real token.
#[derive(Debug, Clone)]
pub struct Scanner {
    source: Vec<u8>,
    pos: usize,
    line: usize,
    done: bool,
}

impl Scanner {
    pub fn new(source: Vec<u8>) -> Self {
        info!("Initializing Scanner with buffer of {} bytes", source.len());

        Self {
            source,
            pos: 0,
            line: 1,
            done: false,
        }
    }

    /// Advance past spaces, tabs, newlines (counting lines) and `//`
    /// comments.
    fn skip_trivia(&mut self) {
        while let Some(&byte) = self.source.get(self.pos) {
            match byte {
                b' ' | b'\r' | b'\t' => self.pos += 1,

                b'\n' => {
                    self.line += 1;
                    self.pos += 1;
                }

                b'/' if self.source.get(self.pos + 1) == Some(&b'/') => {
                    while self.pos < self.source.len() && self.source[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                }

                _ => break,
            }
        }
    }

    /// Lex one token starting at `start`. The caller has already skipped
    /// trivia, so the first byte decides the shape.
    fn lex_token(&mut self, start: usize) -> Result<TokenType> {
        match self.bump() {
            b'(' => Ok(TokenType::LEFT_PAREN),
            b')' => Ok(TokenType::RIGHT_PAREN),
            b'{' => Ok(TokenType::LEFT_BRACE),
            b'}' => Ok(TokenType::RIGHT_BRACE),
            b',' => Ok(TokenType::COMMA),
            b'.' => Ok(TokenType::DOT),
            b'-' => Ok(TokenType::MINUS),
            b'+' => Ok(TokenType::PLUS),
            b';' => Ok(TokenType::SEMICOLON),
            b'*' => Ok(TokenType::STAR),
            b'?' => Ok(TokenType::QUESTION),
            b':' => Ok(TokenType::COLON),

            // A '/' here cannot start a comment; skip_trivia already ate those.
            b'/' => Ok(TokenType::SLASH),

            b'!' => Ok(self.either(b'=', TokenType::BANG_EQUAL, TokenType::BANG)),
            b'=' => Ok(self.either(b'=', TokenType::EQUAL_EQUAL, TokenType::EQUAL)),
            b'<' => Ok(self.either(b'=', TokenType::LESS_EQUAL, TokenType::LESS)),
            b'>' => Ok(self.either(b'=', TokenType::GREATER_EQUAL, TokenType::GREATER)),

            b'"' => self.string(start),

            b'0'..=b'9' => Ok(self.number(start)),

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => Ok(self.identifier(start)),

            other => {
                debug!(
                    "Unexpected character '{}' at line {}",
                    other as char, self.line
                );

                Err(LoxError::lex(
                    self.line,
                    format!("Unexpected character: {}", other as char),
                ))
            }
        }
    }

    fn string(&mut self, start: usize) -> Result<TokenType> {
        while let Some(&byte) = self.source.get(self.pos) {
            self.pos += 1;

            match byte {
                b'"' => {
                    let body = self.text(start + 1, self.pos - 1);
                    return Ok(TokenType::STRING(body));
                }

                b'\n' => self.line += 1,

                _ => {}
            }
        }

        Err(LoxError::lex(self.line, "Unterminated string."))
    }

    fn number(&mut self, start: usize) -> TokenType {
        while self.peek_digit() {
            self.pos += 1;
        }

        // A fractional part needs a digit after the dot, otherwise the dot
        // belongs to a property access.
        if self.source.get(self.pos) == Some(&b'.')
            && self.source.get(self.pos + 1).is_some_and(|b| b.is_ascii_digit())
        {
            self.pos += 1;

            while self.peek_digit() {
                self.pos += 1;
            }
        }

        let value: f64 = self.text(start, self.pos).parse().unwrap_or(0.0);

        TokenType::NUMBER(value)
    }

    fn identifier(&mut self, start: usize) -> TokenType {
        while self
            .source
            .get(self.pos)
            .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_')
        {
            self.pos += 1;
        }

        match KEYWORDS.get(&self.source[start..self.pos]) {
            Some(keyword) => keyword.clone(),
            None => TokenType::IDENTIFIER,
        }
    }

    /// Consume the current byte. Callers check bounds first.
    #[inline]
    fn bump(&mut self) -> u8 {
        let byte = self.source[self.pos];
        self.pos += 1;

        byte
    }

    /// Two-character operator: take `matched` if the next byte is
    /// `expected`, else `single`.
    #[inline]
    fn either(&mut self, expected: u8, matched: TokenType, single: TokenType) -> TokenType {
        if self.source.get(self.pos) == Some(&expected) {
            self.pos += 1;
            matched
        } else {
            single
        }
    }

    #[inline]
    fn peek_digit(&self) -> bool {
        self.source.get(self.pos).is_some_and(|b| b.is_ascii_digit())
    }

    fn text(&self, start: usize, end: usize) -> String {
        String::from_utf8_lossy(&self.source[start..end]).into_owned()
    }
}

impl Iterator for Scanner {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        self.skip_trivia();

        if self.pos >= self.source.len() {
            self.done = true;

            info!("Reached EOF at line {}", self.line);

            return Some(Ok(Token::new(TokenType::EOF, String::new(), self.line)));
        }

        let start = self.pos;

        match self.lex_token(start) {
            Ok(token_type) => {
                let lexeme = self.text(start, self.pos);

                debug!(
                    "Emitting token: type={:?}, lexeme={}, line={}",
                    token_type, lexeme, self.line
                );

                Some(Ok(Token::new(token_type, lexeme, self.line)))
            }

            Err(error) => Some(Err(error)),
        }
    }
}

impl FusedIterator for Scanner {}
