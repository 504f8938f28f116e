//! # Parser Module
//!
//! This module parses tokens from the lexer into an ordered sequence of
//! [`ParsedElement`]s.
//!
//! ## Purpose
//! The parser is the second stage of the compilation pipeline. It validates local
//! syntax only: pitch spelling, duration codes, bracket balance, lyric attachment and
//! command keywords. Command values are kept as raw text for the semantic executor.
//!
//! ## Grammar
//! ```text
//! element  := note | rest | chord | barline | command
//! note     := PITCH [DURATION] [LYRIC]
//! rest     := 'r' [DURATION]
//! chord    := '[' PITCH+ ']' [DURATION] [LYRIC]
//! barline  := BAR
//! command  := KEYWORD VALUE
//! ```
//! A single left-to-right pass with one token of lookahead. The optional duration and
//! lyric never cross an end of line. The first error stops parsing.
//!
//! ## Sticky Duration
//! An omitted duration reuses the most recent explicit one (quarter at the start).
//! The sticky value lives in per-call parser state, so one [`Parser`] can be reused
//! across independent sources.
//!
//! ## Entry Points
//! - `parse(tokens: &[LocatedToken]) -> Result<Vec<ParsedElement>, ParseError>`
//! - `parse_source(text: &str) -> Result<Vec<ParsedElement>, ParseError>` (lex + parse)
//!
//! ## Example
//! ```rust
//! use quill::parser::parse_source;
//! use quill::ParsedElement;
//!
//! let elements = parse_source("[C4 E4 G4] q \"lu\"").unwrap();
//! assert!(matches!(&elements[0], ParsedElement::Chord { pitches, .. } if pitches.len() == 3));
//! ```
//!
//! ## Related Modules
//! - `lexer` - Provides tokens to parse
//! - `ast` - Defines `ParsedElement`, `Pitch`, `Duration`
//! - `semantic` - Consumes the parsed elements

use crate::ast::*;
use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::{tokenize, LocatedToken, Token};

/// Reusable parser configuration
#[derive(Debug, Clone, Default)]
pub struct Parser {
    default_duration: Duration,
}

/// Cursor and sticky duration for a single parse call
struct ParserState<'t> {
    tokens: &'t [LocatedToken],
    position: usize,
    sticky_duration: Duration,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Duration used for elements before the first explicit one
    pub fn with_default_duration(mut self, duration: Duration) -> Self {
        self.default_duration = duration;
        self
    }

    pub fn parse(&self, tokens: &[LocatedToken]) -> Result<Vec<ParsedElement>, ParseError> {
        let mut state = ParserState {
            tokens,
            position: 0,
            sticky_duration: self.default_duration,
        };
        let mut elements = Vec::new();

        while let Some(element) = state.parse_element()? {
            elements.push(element);
        }

        log::debug!("parsed {} elements from {} tokens", elements.len(), tokens.len());
        Ok(elements)
    }
}

impl<'t> ParserState<'t> {
    fn current(&self) -> Option<&'t LocatedToken> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<&'t LocatedToken> {
        let token = self.tokens.get(self.position);
        self.position += 1;
        token
    }

    fn error_at(kind: ParseErrorKind, token: &LocatedToken) -> ParseError {
        ParseError::new(kind, token.line, token.column)
    }

    /// Parse the next element, skipping line ends and comments.
    /// Returns `None` at the end of input.
    fn parse_element(&mut self) -> Result<Option<ParsedElement>, ParseError> {
        while let Some(current) = self.current() {
            let element = match &current.token {
                Token::EndOfLine | Token::Comment(_) => {
                    self.advance();
                    continue;
                }
                Token::Pitch(_) => self.parse_note()?,
                Token::Rest => self.parse_rest()?,
                Token::OpenBracket => self.parse_chord()?,
                Token::Bar(kind) => {
                    self.advance();
                    ParsedElement::Barline { kind: *kind }
                }
                Token::CommandKeyword(_) => self.parse_command()?,
                Token::CloseBracket => {
                    return Err(Self::error_at(ParseErrorKind::UnclosedBracket, current));
                }
                Token::Lyric(_) => {
                    return Err(Self::error_at(ParseErrorKind::InvalidAttachment, current));
                }
                Token::Value(_) => {
                    return Err(Self::error_at(ParseErrorKind::UnknownCommand, current));
                }
                // A bare word where a pitch was expected, e.g. `C` without an octave
                Token::Duration(_) => {
                    return Err(Self::error_at(ParseErrorKind::InvalidPitch, current));
                }
            };
            return Ok(Some(element));
        }
        Ok(None)
    }

    fn parse_pitch(&mut self) -> Result<Pitch, ParseError> {
        let Some(token) = self.advance() else {
            return Err(self.end_of_input(ParseErrorKind::InvalidPitch));
        };
        match &token.token {
            Token::Pitch(text) => Pitch::from_str(text)
                .ok_or_else(|| Self::error_at(ParseErrorKind::InvalidPitch, token)),
            _ => Err(Self::error_at(ParseErrorKind::InvalidPitch, token)),
        }
    }

    /// Optional duration; updates the sticky duration when present
    fn parse_duration(&mut self) -> Result<Duration, ParseError> {
        let Some(token) = self.current() else {
            return Ok(self.sticky_duration);
        };
        let Token::Duration(code) = &token.token else {
            return Ok(self.sticky_duration);
        };
        let duration = Duration::from_str(code)
            .ok_or_else(|| Self::error_at(ParseErrorKind::UnknownDuration, token))?;
        self.advance();
        self.sticky_duration = duration;
        Ok(duration)
    }

    /// Optional lyric attached to the preceding note or chord
    fn parse_lyric(&mut self) -> Option<String> {
        match self.current() {
            Some(LocatedToken {
                token: Token::Lyric(text),
                ..
            }) => {
                self.advance();
                Some(text.clone())
            }
            _ => None,
        }
    }

    fn parse_note(&mut self) -> Result<ParsedElement, ParseError> {
        let pitch = self.parse_pitch()?;
        let duration = self.parse_duration()?;
        let lyric = self.parse_lyric();
        Ok(ParsedElement::Note {
            pitch,
            duration,
            lyric,
        })
    }

    fn parse_rest(&mut self) -> Result<ParsedElement, ParseError> {
        self.advance(); // r
        let duration = self.parse_duration()?;

        // Rests never carry lyrics
        if let Some(token) = self.current() {
            if let Token::Lyric(_) = token.token {
                return Err(Self::error_at(ParseErrorKind::InvalidAttachment, token));
            }
        }
        Ok(ParsedElement::Rest { duration })
    }

    fn parse_chord(&mut self) -> Result<ParsedElement, ParseError> {
        let Some(open) = self.advance() else {
            return Err(self.end_of_input(ParseErrorKind::UnclosedBracket));
        };
        let mut pitches = Vec::new();

        loop {
            let Some(token) = self.current() else {
                return Err(Self::error_at(ParseErrorKind::UnclosedBracket, open));
            };
            match &token.token {
                Token::CloseBracket => {
                    if pitches.is_empty() {
                        return Err(Self::error_at(ParseErrorKind::InvalidPitch, token));
                    }
                    self.advance();
                    break;
                }
                Token::EndOfLine => {
                    return Err(Self::error_at(ParseErrorKind::UnclosedBracket, open));
                }
                _ => pitches.push(self.parse_pitch()?),
            }
        }

        let duration = self.parse_duration()?;
        let lyric = self.parse_lyric();
        Ok(ParsedElement::Chord {
            pitches,
            duration,
            lyric,
        })
    }

    fn parse_command(&mut self) -> Result<ParsedElement, ParseError> {
        let Some(keyword) = self.advance() else {
            return Err(self.end_of_input(ParseErrorKind::UnknownCommand));
        };
        let Token::CommandKeyword(name) = &keyword.token else {
            return Err(Self::error_at(ParseErrorKind::UnknownCommand, keyword));
        };
        let key = CommandKey::from_keyword(name)
            .ok_or_else(|| Self::error_at(ParseErrorKind::UnknownCommand, keyword))?;

        let value = match self.current() {
            Some(LocatedToken {
                token: Token::Value(value),
                ..
            }) => {
                self.advance();
                value.clone()
            }
            _ => String::new(),
        };
        Ok(ParsedElement::MetadataCommand { key, value })
    }

    /// Error positioned just after the last token
    fn end_of_input(&self, kind: ParseErrorKind) -> ParseError {
        let (line, column) = self
            .tokens
            .last()
            .map(|t| (t.line, t.column))
            .unwrap_or((1, 1));
        ParseError::new(kind, line, column)
    }
}

/// Parse a token stream with the default parser
pub fn parse(tokens: &[LocatedToken]) -> Result<Vec<ParsedElement>, ParseError> {
    Parser::new().parse(tokens)
}

/// Tokenize and parse a source text, reporting lexer failures as parse errors
pub fn parse_source(text: &str) -> Result<Vec<ParsedElement>, ParseError> {
    let tokens = tokenize(text)?;
    parse(&tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pitch(s: &str) -> Pitch {
        Pitch::from_str(s).unwrap()
    }

    fn dur(s: &str) -> Duration {
        Duration::from_str(s).unwrap()
    }

    fn error_kind(source: &str) -> ParseErrorKind {
        parse_source(source).unwrap_err().kind
    }

    #[test]
    fn test_simple_note() {
        let elements = parse_source("C4 q").unwrap();
        assert_eq!(
            elements,
            vec![ParsedElement::Note {
                pitch: pitch("C4"),
                duration: dur("q"),
                lyric: None,
            }]
        );
    }

    #[test]
    fn test_note_with_lyric() {
        let elements = parse_source("D5 h \"Al-\"").unwrap();
        assert_eq!(
            elements[0],
            ParsedElement::Note {
                pitch: pitch("D5"),
                duration: dur("h"),
                lyric: Some("Al-".to_string()),
            }
        );
    }

    #[test]
    fn test_lowercase_letter_is_folded() {
        let elements = parse_source("bb3 e").unwrap();
        let ParsedElement::Note { pitch, .. } = &elements[0] else {
            panic!("Expected note");
        };
        assert_eq!(pitch.letter, NoteName::B);
        assert_eq!(pitch.accidental, Some(Accidental::Flat));
        assert_eq!(pitch.to_string(), "Bb3");
    }

    #[test]
    fn test_dotted_durations() {
        let elements = parse_source("E4 q. F4 h..").unwrap();
        match (&elements[0], &elements[1]) {
            (
                ParsedElement::Note { duration: d1, .. },
                ParsedElement::Note { duration: d2, .. },
            ) => {
                assert_eq!(d1.dots, 1);
                assert_eq!(d2.dots, 2);
                assert_eq!(d2.beats(), 3.5);
            }
            _ => panic!("Expected two notes"),
        }
    }

    #[test]
    fn test_sticky_duration() {
        let elements = parse_source("C4 D4 h E4 F4\nG4").unwrap();
        let durations: Vec<_> = elements
            .iter()
            .map(|e| match e {
                ParsedElement::Note { duration, .. } => duration.value,
                _ => panic!("Expected note"),
            })
            .collect();
        assert_eq!(
            durations,
            vec![
                NoteValue::Quarter,
                NoteValue::Half,
                NoteValue::Half,
                NoteValue::Half,
                NoteValue::Half,
            ]
        );
    }

    #[test]
    fn test_sticky_duration_applies_to_rests_and_chords() {
        let elements = parse_source("C4 e. r [C4 E4]").unwrap();
        assert_eq!(elements[1], ParsedElement::Rest { duration: dur("e.") });
        assert!(matches!(&elements[2], ParsedElement::Chord { duration, .. } if *duration == dur("e.")));
    }

    #[test]
    fn test_parser_reuse_does_not_leak_sticky_duration() {
        let parser = Parser::new();
        let first = parser.parse(&tokenize("C4 w").unwrap()).unwrap();
        let second = parser.parse(&tokenize("C4").unwrap()).unwrap();
        assert!(matches!(&first[0], ParsedElement::Note { duration, .. } if *duration == dur("w")));
        assert!(matches!(&second[0], ParsedElement::Note { duration, .. } if *duration == dur("q")));
    }

    #[test]
    fn test_custom_default_duration() {
        let parser = Parser::new().with_default_duration(dur("e"));
        let elements = parser.parse(&tokenize("C4 D4").unwrap()).unwrap();
        assert!(matches!(&elements[1], ParsedElement::Note { duration, .. } if *duration == dur("e")));
    }

    #[test]
    fn test_rest() {
        let elements = parse_source("r q R h.").unwrap();
        assert_eq!(
            elements,
            vec![
                ParsedElement::Rest { duration: dur("q") },
                ParsedElement::Rest { duration: dur("h.") },
            ]
        );
    }

    #[test]
    fn test_rest_with_lyric_is_invalid_attachment() {
        let err = parse_source("r q \"la\"").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidAttachment);
        assert_eq!((err.line, err.column), (1, 5));
    }

    #[test]
    fn test_chord_preserves_order_and_duplicates() {
        let elements = parse_source("[G4 C4 E4 C4] h \"lu\"").unwrap();
        assert_eq!(
            elements[0],
            ParsedElement::Chord {
                pitches: vec![pitch("G4"), pitch("C4"), pitch("E4"), pitch("C4")],
                duration: dur("h"),
                lyric: Some("lu".to_string()),
            }
        );
    }

    #[test]
    fn test_barlines() {
        let elements = parse_source("| || |||\n|: :| :|:").unwrap();
        let kinds: Vec<_> = elements
            .iter()
            .map(|e| match e {
                ParsedElement::Barline { kind } => *kind,
                _ => panic!("Expected barline"),
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                BarlineKind::Single,
                BarlineKind::Double,
                BarlineKind::Final,
                BarlineKind::RepeatStart,
                BarlineKind::RepeatEnd,
                BarlineKind::RepeatBoth,
            ]
        );
    }

    #[test]
    fn test_metadata_commands_keep_raw_value() {
        let elements = parse_source("key: G major\nTime: 4/4\ntitle: Amazing Grace").unwrap();
        assert_eq!(
            elements,
            vec![
                ParsedElement::MetadataCommand {
                    key: CommandKey::Key,
                    value: "G major".to_string(),
                },
                ParsedElement::MetadataCommand {
                    key: CommandKey::Time,
                    value: "4/4".to_string(),
                },
                ParsedElement::MetadataCommand {
                    key: CommandKey::Title,
                    value: "Amazing Grace".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_semantically_wrong_value_still_parses() {
        let elements = parse_source("key: H major").unwrap();
        assert_eq!(elements.len(), 1);
    }

    #[test]
    fn test_unknown_command() {
        let err = parse_source("C4 q\nvolume: 11").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnknownCommand);
        assert_eq!((err.line, err.column), (2, 1));
    }

    #[test]
    fn test_invalid_pitch() {
        let err = parse_source("C4 q H4 q").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidPitch);
        assert_eq!((err.line, err.column), (1, 6));

        assert_eq!(error_kind("C# q"), ParseErrorKind::InvalidPitch);
        assert_eq!(error_kind("Cx4"), ParseErrorKind::InvalidPitch);
        assert_eq!(error_kind("C12 q"), ParseErrorKind::InvalidPitch);
        assert_eq!(error_kind("[C4 X4] q"), ParseErrorKind::InvalidPitch);
        assert_eq!(error_kind("[] q"), ParseErrorKind::InvalidPitch);
    }

    #[test]
    fn test_unknown_duration() {
        let err = parse_source("C4 x").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnknownDuration);
        assert_eq!((err.line, err.column), (1, 4));

        assert_eq!(error_kind("C4 q..."), ParseErrorKind::UnknownDuration);
        assert_eq!(error_kind("[C4 E4] z"), ParseErrorKind::UnknownDuration);
        assert_eq!(error_kind("r qq"), ParseErrorKind::UnknownDuration);
    }

    #[test]
    fn test_unclosed_constructs_from_lexer() {
        let err = parse_source("[C4 E4 q").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnclosedBracket);
        assert_eq!((err.line, err.column), (1, 1));

        let err = parse_source("C4 q \"Hello").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnclosedQuote);
        assert_eq!((err.line, err.column), (1, 6));
    }

    #[test]
    fn test_stray_close_bracket() {
        assert_eq!(error_kind("C4 q ]"), ParseErrorKind::UnclosedBracket);
    }

    #[test]
    fn test_chord_missing_close_in_token_stream() {
        let tokens = vec![
            LocatedToken { token: Token::OpenBracket, line: 1, column: 1 },
            LocatedToken { token: Token::Pitch("C4".to_string()), line: 1, column: 2 },
            LocatedToken { token: Token::EndOfLine, line: 1, column: 4 },
        ];
        let err = parse(&tokens).unwrap_err();
        assert_eq!(err, ParseError::new(ParseErrorKind::UnclosedBracket, 1, 1));
    }

    #[test]
    fn test_lyric_does_not_attach_across_lines() {
        let err = parse_source("C4 q\n\"la\"").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidAttachment);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_lyric_after_barline_is_invalid() {
        assert_eq!(error_kind("C4 q | \"la\""), ParseErrorKind::InvalidAttachment);
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = crate::lexer::Lexer::new("# intro\nC4 q # tonic")
            .keep_comments()
            .tokenize()
            .unwrap();
        let elements = parse(&tokens).unwrap();
        assert_eq!(elements.len(), 1);
    }

    #[test]
    fn test_first_error_stops_parsing() {
        let err = parse_source("C4 x\nH4 q").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnknownDuration);
        assert_eq!(err.line, 1);
    }
}
