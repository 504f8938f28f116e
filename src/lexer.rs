//! # Lexer
//!
//! Scans raw multi-line Quill source into a flat sequence of located tokens.
//!
//! ## Scanning Rules
//! - Whitespace outside quotes separates tokens and is otherwise dropped
//! - A word starting with `#` begins a comment running to end of line; a line whose
//!   first word is a comment yields no tokens
//! - `"..."` is a lyric; `\"` inside it is a literal quote. The quote must close on
//!   the same line
//! - `[` and `]` are emitted as delimiters; every `[` must be closed on its line
//! - Bar symbols are matched greedily, longest first: `|||`, `:|:`, `||:`, `:||`,
//!   `||`, `:|`, `|:`, `|`, plus the words `bar`, `measure`, `dbar`, `final`
//! - A word of letters followed by `:` is a command keyword; the rest of the line is
//!   one raw `Value` token
//! - `r` / `R` is a rest; any other word containing a digit is a pitch candidate and
//!   everything else a duration candidate. The parser validates both.
//!
//! ## Entry Point
//! `tokenize(text: &str) -> Result<Vec<LocatedToken>, LexError>`

use crate::ast::BarlineKind;
use crate::error::LexError;

/// Token types for the Quill language
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Pitch(String),    // C4, F#5 (validated by the parser)
    Duration(String), // q, h., e.. (validated by the parser)
    Rest,             // r
    OpenBracket,      // [
    CloseBracket,     // ]
    Lyric(String),    // "text", unescaped
    Bar(BarlineKind),
    CommandKeyword(String), // key:, time:, ... (name without the colon)
    Value(String),          // raw text after a command keyword, trimmed
    Comment(String),        // only emitted with `Lexer::keep_comments`
    EndOfLine,
}

/// A token with its position in the source
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedToken {
    pub token: Token,
    pub line: usize,
    pub column: usize,
}

/// Lexer for tokenizing Quill source code
pub struct Lexer<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
    position: usize,
    keep_comments: bool,
    bracket_depth: usize,
    open_bracket: Option<(usize, usize)>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
            position: 0,
            keep_comments: false,
            bracket_depth: 0,
            open_bracket: None,
        }
    }

    /// Emit comments as `Token::Comment` instead of dropping them
    pub fn keep_comments(mut self) -> Self {
        self.keep_comments = true;
        self
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.position += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<&char> {
        self.chars.peek()
    }

    /// Rest of the current line, not including the newline
    fn rest_of_line(&self) -> &'a str {
        let input = self.input;
        let remaining = &input[self.position..];
        remaining.split('\n').next().unwrap_or("")
    }

    /// Consume up to (not including) the next newline
    fn take_rest_of_line(&mut self) -> &'a str {
        let rest = self.rest_of_line();
        while let Some(&c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
        rest
    }

    /// Length of a `[A-Za-z]+:` prefix at the current position, if there is one
    fn command_keyword_len(&self) -> Option<usize> {
        let rest = self.rest_of_line();
        let letters = rest.bytes().take_while(|b| b.is_ascii_alphabetic()).count();
        if letters > 0 && rest[letters..].starts_with(':') {
            Some(letters)
        } else {
            None
        }
    }

    fn end_line(&mut self, tokens: &mut Vec<LocatedToken>, line_start: usize) -> Result<(), LexError> {
        if let Some((line, column)) = self.open_bracket.take() {
            return Err(LexError::UnterminatedBracket { line, column });
        }
        self.bracket_depth = 0;
        if tokens.len() > line_start {
            tokens.push(LocatedToken {
                token: Token::EndOfLine,
                line: self.line,
                column: self.column,
            });
        }
        Ok(())
    }

    pub fn tokenize(&mut self) -> Result<Vec<LocatedToken>, LexError> {
        let mut tokens = Vec::new();
        let mut line_start = 0;

        while let Some(&c) = self.peek() {
            let line = self.line;
            let column = self.column;

            match c {
                '\n' => {
                    self.end_line(&mut tokens, line_start)?;
                    self.advance();
                    line_start = tokens.len();
                }
                c if c.is_whitespace() => {
                    self.advance();
                }
                '#' => {
                    let text = self.take_rest_of_line();
                    if self.keep_comments {
                        tokens.push(LocatedToken {
                            token: Token::Comment(text[1..].trim().to_string()),
                            line,
                            column,
                        });
                    }
                }
                '"' => {
                    let text = self.scan_lyric(line, column)?;
                    tokens.push(LocatedToken {
                        token: Token::Lyric(text),
                        line,
                        column,
                    });
                }
                '[' => {
                    self.advance();
                    self.bracket_depth += 1;
                    if self.open_bracket.is_none() {
                        self.open_bracket = Some((line, column));
                    }
                    tokens.push(LocatedToken {
                        token: Token::OpenBracket,
                        line,
                        column,
                    });
                }
                ']' => {
                    self.advance();
                    // A stray `]` is left for the parser to report
                    self.bracket_depth = self.bracket_depth.saturating_sub(1);
                    if self.bracket_depth == 0 {
                        self.open_bracket = None;
                    }
                    tokens.push(LocatedToken {
                        token: Token::CloseBracket,
                        line,
                        column,
                    });
                }
                _ => {
                    if let Some(len) = self.command_keyword_len() {
                        self.scan_command(len, &mut tokens);
                    } else {
                        self.scan_word(&mut tokens);
                    }
                }
            }
        }

        self.end_line(&mut tokens, line_start)?;

        for t in &tokens {
            log::trace!("{}:{} {:?}", t.line, t.column, t.token);
        }
        Ok(tokens)
    }

    /// Scan a quoted lyric. The opening quote is at the current position.
    fn scan_lyric(&mut self, line: usize, column: usize) -> Result<String, LexError> {
        self.advance(); // opening "
        let mut text = String::new();
        loop {
            match self.peek() {
                None | Some(&'\n') => return Err(LexError::UnterminatedQuote { line, column }),
                Some(&'"') => {
                    self.advance();
                    return Ok(text);
                }
                Some(&'\\') => {
                    self.advance();
                    if let Some(&'"') = self.peek() {
                        self.advance();
                        text.push('"');
                    } else {
                        text.push('\\');
                    }
                }
                Some(&c) => {
                    self.advance();
                    text.push(c);
                }
            }
        }
    }

    /// `name:` followed by the raw remainder of the line
    fn scan_command(&mut self, len: usize, tokens: &mut Vec<LocatedToken>) {
        let line = self.line;
        let column = self.column;
        let name = self.rest_of_line()[..len].to_string();
        for _ in 0..=len {
            self.advance();
        }
        tokens.push(LocatedToken {
            token: Token::CommandKeyword(name),
            line,
            column,
        });

        while let Some(&c) = self.peek() {
            if c == '\n' || !c.is_whitespace() {
                break;
            }
            self.advance();
        }
        let value_column = self.column;
        let value = self.take_rest_of_line().trim_end();
        tokens.push(LocatedToken {
            token: Token::Value(value.to_string()),
            line,
            column: value_column,
        });
    }

    /// Scan a bare word up to whitespace, a quote or a bracket, and classify it
    fn scan_word(&mut self, tokens: &mut Vec<LocatedToken>) {
        let line = self.line;
        let start_column = self.column;
        let input = self.input;
        let start = self.position;
        while let Some(&c) = self.peek() {
            if c.is_whitespace() || matches!(c, '"' | '[' | ']') {
                break;
            }
            self.advance();
        }
        let word = &input[start..self.position];

        // Greedy bar symbols; whatever is left over is classified as a plain word
        let mut rest = word;
        let mut column = start_column;
        while let Some((symbol, kind)) = BarlineKind::SYMBOLS
            .iter()
            .find(|(symbol, _)| rest.starts_with(symbol))
        {
            tokens.push(LocatedToken {
                token: Token::Bar(*kind),
                line,
                column,
            });
            rest = &rest[symbol.len()..];
            column += symbol.len();
        }
        if rest.is_empty() {
            return;
        }

        let token = if let Some(kind) = BarlineKind::from_word(rest) {
            Token::Bar(kind)
        } else if rest == "r" || rest == "R" {
            Token::Rest
        } else if rest.chars().any(|c| c.is_ascii_digit()) {
            Token::Pitch(rest.to_string())
        } else {
            Token::Duration(rest.to_string())
        };
        tokens.push(LocatedToken {
            token,
            line,
            column,
        });
    }
}

/// Tokenize a complete source text
pub fn tokenize(text: &str) -> Result<Vec<LocatedToken>, LexError> {
    Lexer::new(text).tokenize()
}
