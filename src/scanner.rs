//! One-pass, streaming lexer for Lox source text.
//!
//! [`Scanner`] walks a byte slice and yields `Result<Token<'a>>` as a fused
//! iterator: `Ok` for each recognized token, `Err` for each lexical error
//! (unexpected character, unterminated string). Errors do not stop the
//! stream; the scanner skips the offending bytes and keeps going, so a
//! single pass reports every lexical problem in the input. Exactly one
//! `EOF` token is emitted at the end.
//!
//! [`scan`] is the batch driver used by the front end: it drains a scanner,
//! routing errors into a [`Diagnostics`] collector and returning the token
//! vector (always EOF-terminated).
//!
//! Lexical rules:
//! - maximal munch for the two-character operators `!=`, `==`, `<=`, `>=`;
//! - `//` starts a comment running to end-of-line (skipped with `memchr`);
//! - `"` strings may span lines, each raw `\n` bumps the line counter;
//! - numbers are `digits ( "." digits )?` — a trailing dot is not consumed;
//! - identifiers `[A-Za-z_][A-Za-z0-9_]*` are reclassified as keywords via
//!   a compile-time perfect-hash table.
//!
//! Lexemes are zero-copy slices of the original buffer; only string literal
//! payloads allocate.

use std::iter::FusedIterator;

use log::{debug, info};
use memchr::memchr;
use phf::phf_map;

use crate::error::{Diagnostics, LoxError, Result};
use crate::token::{Token, TokenType};

/// Reserved words, resolved by exact match after an identifier is scanned.
static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"    => TokenType::AND,
    b"class"  => TokenType::CLASS,
    b"else"   => TokenType::ELSE,
    b"false"  => TokenType::FALSE,
    b"fun"    => TokenType::FUN,
    b"for"    => TokenType::FOR,
    b"if"     => TokenType::IF,
    b"nil"    => TokenType::NIL,
    b"or"     => TokenType::OR,
    b"print"  => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super"  => TokenType::SUPER,
    b"this"   => TokenType::THIS,
    b"true"   => TokenType::TRUE,
    b"var"    => TokenType::VAR,
    b"while"  => TokenType::WHILE,
};

/// Drain a full source buffer into a token vector.
///
/// Lexical errors are reported into `diags` and scanning continues, so the
/// returned vector holds every valid token (terminated by `EOF`) even when
/// the source contains garbage.
pub fn scan<'a>(source: &'a [u8], diags: &mut Diagnostics) -> Vec<Token<'a>> {
    let mut tokens: Vec<Token<'a>> = Vec::new();

    for result in Scanner::new(source) {
        match result {
            Ok(token) => tokens.push(token),
            Err(err) => diags.report(err),
        }
    }

    info!(
        "Scanned {} token(s), {} lexical error(s)",
        tokens.len(),
        diags.len()
    );

    tokens
}

/// Streaming scanner over a source buffer.
///
/// The lifetime `'a` ties every emitted token's lexeme slice back to the
/// original buffer. Three cursors are maintained: `start` (first byte of
/// the current lexeme), `curr` (one past the last byte examined), and the
/// 1-based `line` counter.
pub struct Scanner<'a> {
    src: &'a [u8],
    start: usize,
    curr: usize,
    line: usize,
}

impl<'a> Scanner<'a> {
    #[inline]
    pub fn new(src: &'a [u8]) -> Self {
        debug!("Scanner created over {} bytes", src.len());

        Self {
            src,
            start: 0,
            curr: 0,
            line: 1,
        }
    }

    // ───────────────────────── primitive helpers ─────────────────────────

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.src.len()
    }

    /// Consume and return the current byte. Callers guard with
    /// [`is_at_end`](Self::is_at_end).
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b: u8 = self.src[self.curr];
        self.curr += 1;
        b
    }

    /// Current byte without consuming it; `0` past end-of-input.
    #[inline(always)]
    fn peek(&self) -> u8 {
        self.src.get(self.curr).copied().unwrap_or(0)
    }

    /// One byte beyond [`peek`](Self::peek); `0` past end-of-input.
    #[inline(always)]
    fn peek_next(&self) -> u8 {
        self.src.get(self.curr + 1).copied().unwrap_or(0)
    }

    /// Consume the current byte only if it equals `expected`.
    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if self.peek() == expected && !self.is_at_end() {
            self.curr += 1;
            true
        } else {
            false
        }
    }

    /// The source slice of the token being scanned, as UTF-8.
    #[inline(always)]
    fn lexeme(&self) -> &'a str {
        // Lexemes only ever start and end on ASCII bytes, so slicing on
        // token boundaries cannot split a multi-byte sequence.
        let slice: &[u8] = &self.src[self.start..self.curr];
        unsafe { std::str::from_utf8_unchecked(slice) }
    }

    // ─────────────────────────── core lexing ─────────────────────────────

    /// Scan one lexeme starting at `self.start`.
    ///
    /// Returns `Ok(Some(kind))` for a real token, `Ok(None)` for skipped
    /// whitespace or a comment, `Err` for a lexical error.
    fn scan_token(&mut self) -> Result<Option<TokenType>> {
        let b: u8 = self.advance();

        let tt: TokenType = match b {
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,

            b'!' => {
                if self.match_byte(b'=') {
                    TokenType::BANG_EQUAL
                } else {
                    TokenType::BANG
                }
            }

            b'=' => {
                if self.match_byte(b'=') {
                    TokenType::EQUAL_EQUAL
                } else {
                    TokenType::EQUAL
                }
            }

            b'<' => {
                if self.match_byte(b'=') {
                    TokenType::LESS_EQUAL
                } else {
                    TokenType::LESS
                }
            }

            b'>' => {
                if self.match_byte(b'=') {
                    TokenType::GREATER_EQUAL
                } else {
                    TokenType::GREATER
                }
            }

            b' ' | b'\r' | b'\t' => return Ok(None),

            b'\n' => {
                self.line += 1;
                return Ok(None);
            }

            b'/' => {
                if self.match_byte(b'/') {
                    // Comment runs to end-of-line; memchr skips the bulk.
                    match memchr(b'\n', &self.src[self.curr..]) {
                        Some(pos) => self.curr += pos,
                        None => self.curr = self.src.len(),
                    }

                    return Ok(None);
                }

                TokenType::SLASH
            }

            b'"' => self.scan_string()?,

            b'0'..=b'9' => self.scan_number(),

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.scan_identifier(),

            _ => {
                return Err(LoxError::lex(
                    self.line,
                    format!("Unexpected character: {}", b as char),
                ));
            }
        };

        Ok(Some(tt))
    }

    /// Double-quoted string literal; the opening `"` is already consumed.
    /// Strings may span lines. An unterminated string reports an error and
    /// emits no token.
    fn scan_string(&mut self) -> Result<TokenType> {
        while !self.is_at_end() && self.peek() != b'"' {
            if self.advance() == b'\n' {
                self.line += 1;
            }
        }

        if self.is_at_end() {
            return Err(LoxError::lex(self.line, "Unterminated string."));
        }

        self.advance(); // closing quote

        // Payload excludes the surrounding quotes.
        let slice: &[u8] = &self.src[self.start + 1..self.curr - 1];
        let s: &str = unsafe { std::str::from_utf8_unchecked(slice) };

        Ok(TokenType::STRING(s.to_owned()))
    }

    /// Numeric literal, integer or fractional. A dot not followed by a
    /// digit is left for the next token (`3.` scans as `3` then `.`).
    fn scan_number(&mut self) -> TokenType {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance(); // consume '.'

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        // Cannot fail: the lexeme is all digits with at most one dot.
        let n: f64 = self.lexeme().parse::<f64>().unwrap_or(0.0);

        TokenType::NUMBER(n)
    }

    /// Identifier, reclassified as a keyword on an exact match.
    fn scan_identifier(&mut self) -> TokenType {
        while {
            let c: u8 = self.peek();
            c.is_ascii_alphanumeric() || c == b'_'
        } {
            self.advance();
        }

        KEYWORDS
            .get(&self.src[self.start..self.curr])
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.curr <= self.src.len() {
            // Emit exactly one EOF token, then fuse.
            if self.curr == self.src.len() {
                self.curr += 1;
                return Some(Ok(Token::new(TokenType::EOF, "", self.line)));
            }

            self.start = self.curr;

            match self.scan_token() {
                Err(e) => return Some(Err(e)),

                Ok(Some(tt)) => {
                    let token = Token::new(tt, self.lexeme(), self.line);

                    debug!("Scanned {:?} on line {}", token.token_type, token.line);

                    return Some(Ok(token));
                }

                // Whitespace or comment: keep scanning.
                Ok(None) => {}
            }
        }

        None
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
