//! Module `scanner` implements a one‑pass, streaming lexer for Lox source text.
//!
//! It walks a byte slice (`&[u8]`) and yields `Token<'a>`s whose lexemes borrow
//! the original buffer, so scanning never copies source text except for string
//! literal payloads.  Whitespace and `//` comments are consumed silently, every
//! `\n` bumps the line counter used for diagnostics, and exactly one `EOF`
//! token is emitted at the end.  Implemented as a `FusedIterator` over
//! `Result<Token<'a>, LoxError>`: a lexical error (unterminated string,
//! unexpected character) is yielded in place and the caller chooses whether to
//! keep pulling tokens afterwards.
//!
//! Token recognition:
//! - single‑character punctuators map directly;
//! - `!=`, `==`, `<=`, `>=` use one byte of lookahead (`match_byte`);
//! - `//` fast‑forwards to the next newline via `memchr`;
//! - `"…"` strings may span lines; a missing closing quote is an error;
//! - numbers are digit runs with an optional `.digits` fraction, always
//!   materialised as `f64`;
//! - identifiers are `[A-Za-z_][A-Za-z0-9_]*`, checked against a perfect‑hash
//!   keyword table.

use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile‑time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

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

/// Streaming **scanner / lexer** over raw source bytes.  The lifetime `'a`
/// ties every emitted token's `lexeme` slice back to the input buffer.
pub struct Scanner<'a> {
    src: &'a [u8], // entire source file (typically memory‑mapped)
    start: usize,  // index of the *first* byte of the current lexeme
    curr: usize,   // index *one past* the last byte examined
    line: usize,   // 1‑based line counter (\n increments)
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `src`.  The caller guarantees the buffer is
    /// valid UTF‑8; lexeme slices are reborrowed as `&str` without rechecking.
    #[inline]
    pub fn new(src: &'a [u8]) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            start: 0,
            curr: 0,
            line: 1,
        }
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    #[inline(always)]
    const fn len(&self) -> usize {
        self.src.len()
    }

    /// Are we at (or past) the end of input?
    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.len()
    }

    /// Advance one byte and return it.  Callers guard with [`is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.src[self.curr];
        self.curr += 1;
        b
    }

    /// Peek at the current byte without consuming it.  Returns `0` past EOF
    /// to avoid branching at call‑site.
    #[inline(always)]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.src[self.curr]
        }
    }

    /// Peek one byte beyond [`peek`].  Safe at EOF.
    #[inline(always)]
    fn peek_next(&self) -> u8 {
        if self.curr + 1 >= self.len() {
            0
        } else {
            self.src[self.curr + 1]
        }
    }

    /// Conditionally consume a byte **iff** it matches `expected`.
    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Borrow the current lexeme (`start..curr`) as `&str`.
    #[inline(always)]
    fn lexeme(&self) -> &'a str {
        let slice: &[u8] = &self.src[self.start..self.curr];

        // SAFETY: the original source is valid UTF‑8 (guaranteed by caller).
        unsafe { std::str::from_utf8_unchecked(slice) }
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan a *single* lexeme starting at `self.curr`.  `Ok(Some(tt))` is a
    /// recognised token kind, `Ok(None)` means whitespace or a comment was
    /// skipped and the caller should try again.
    fn scan_token(&mut self) -> Result<Option<TokenType>> {
        let b = self.advance();

        let tt: TokenType = match b {
            // ── single‑character punctuators ──────────────────────────────
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

            // ── two‑character operators (!=, ==, <=, >=) ─────────────────
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

            // ── whitespace / newline ─────────────────────────────────────
            b' ' | b'\r' | b'\t' => return Ok(None),

            b'\n' => {
                self.line += 1; // track for diagnostics

                return Ok(None);
            }

            // ── comments (// … until newline) ────────────────────────────
            b'/' => {
                if self.match_byte(b'/') {
                    // Fast‑forward to the next newline using `memchr`.
                    // If none is found, skip to EOF.
                    if let Some(pos) = memchr(b'\n', &self.src[self.curr..]) {
                        self.curr += pos;
                    } else {
                        self.curr = self.len();
                    }

                    return Ok(None);
                }

                TokenType::SLASH
            }

            // ── string literal " … " ─────────────────────────────────────
            b'"' => self.parse_string()?,

            // ── number literal (digit‑leading) ───────────────────────────
            b'0'..=b'9' => self.parse_number(),

            // ── identifiers / keywords (alpha or underscore‑leading) ─────
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.parse_identifier(),

            // ── unexpected character ─────────────────────────────────────
            _ => {
                return Err(LoxError::lex(
                    self.line,
                    format!("Unexpected character: {}", b as char),
                ));
            }
        };

        Ok(Some(tt))
    }

    /// Parse a double‑quoted string literal.
    ///
    /// * `self.start` still points to the opening `"`.
    /// * When we return, `self.curr` points **past** the closing `"`.
    fn parse_string(&mut self) -> Result<TokenType> {
        while !self.is_at_end() && self.peek() != b'"' {
            if self.advance() == b'\n' {
                self.line += 1; // multi‑line strings are allowed in Lox
            }
        }

        if self.is_at_end() {
            return Err(LoxError::lex(self.line, "Unterminated string."));
        }

        self.advance(); // consume closing quote

        // Slice excluding the surrounding quotes.
        let slice: &[u8] = &self.src[self.start + 1..self.curr - 1];

        // SAFETY: the original source is valid UTF‑8 (guaranteed by caller).
        let s: &str = unsafe { std::str::from_utf8_unchecked(slice) };

        Ok(TokenType::STRING(s.to_owned()))
    }

    /// Parse a numeric literal (`123`, `3.14`).  Fractions are optional.
    fn parse_number(&mut self) -> TokenType {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // Optional fractional part.
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance(); // consume "."

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let n: f64 = self.lexeme().parse::<f64>().unwrap_or(0.0); // digits only, cannot fail

        TokenType::NUMBER(n)
    }

    /// Parse an identifier and decide whether it is a **keyword** or a generic
    /// `IDENTIFIER` token.
    fn parse_identifier(&mut self) -> TokenType {
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

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        // Loop until we either emit a token, hit EOF, or see an error.
        while self.curr <= self.len() {
            // 1. EOF guard – emit exactly one EOF then terminate.
            if self.curr == self.len() {
                self.curr += 1; // ensure fused semantics
                return Some(Ok(Token::new(TokenType::EOF, "", self.line)));
            }

            // 2. Reset per‑token state and attempt a scan.
            self.start = self.curr;

            match self.scan_token() {
                Err(e) => return Some(Err(e)),

                Ok(Some(tt)) => {
                    debug!("Scanned token ({:?}) on line {}", tt, self.line);

                    return Some(Ok(Token::new(tt, self.lexeme(), self.line)));
                }

                // Whitespace / comment → keep looping.
                Ok(None) => {}
            }
        }

        None // already yielded EOF
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
