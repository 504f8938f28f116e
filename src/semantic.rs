//! # Semantic Executor Module
//!
//! This module executes parsed elements into a structured [`Score`].
//!
//! ## Purpose
//! The parser only checks grammar. The executor walks the elements in order while
//! threading an [`ExecutorState`] through them, and:
//! - Validates metadata values against the fixed key, time, tempo and clef vocabularies
//! - Stamps every event with the key/time/tempo/clef in effect when it was emitted
//! - Splits events into measures at barlines and records repeat markers
//! - Aligns lyric syllables, propagating open (hyphenated) syllables as melismas
//!
//! ## Execution Rules
//!
//! ### Measures
//! - A measure is opened by its first event, and takes the attributes in effect then
//! - A barline closes the open measure. A barline with no events since the previous one
//!   merges into the previous measure's closing barline
//! - `|:` marks the next measure as a repeat start, `:|` marks the closing measure as a
//!   repeat end, `:|:` does both
//! - Events after the last barline form a final measure with no closing barline
//! - Under- or over-full measures are logged at debug level, never rejected
//!
//! ### Metadata Commands
//! - `key:`, `time:`, `tempo:` and `clef:` take effect immediately, so a command in the
//!   middle of a measure changes only the events after it
//! - `title:`, `composer:` and `arranger:` set score metadata and are not validated
//!
//! ### Lyrics and Melisma
//! - A note or chord with a lyric opens a new syllable group
//! - If the lyric ends with `-` the group stays open and following lyric-less notes and
//!   chords are linked to it as melisma continuations
//! - The group closes when a note or chord supplies its own lyric
//! - Rests are skipped over: they neither continue nor close an open group
//!
//! ## Entry Point
//! `execute(elements: Vec<ParsedElement>) -> Result<Score, ExecutionError>`
//!
//! ## Example
//! ```rust
//! use quill::{execute, parse_source, Lyric};
//!
//! let elements = parse_source("C4 e \"Glo-\" D4 e E4 q \"ry\"").unwrap();
//! let score = execute(elements).unwrap();
//! let lyrics: Vec<_> = score.events().map(|e| e.lyric.clone()).collect();
//! assert_eq!(lyrics[1], Some(Lyric::Melisma { group: 0 }));
//! ```
//!
//! ## Related Modules
//! - `parser` - Produces the elements executed here
//! - `ast` - Defines `Score`, `Measure`, `Event`
//! - `config` - Builds the initial `ExecutorState`

use crate::ast::*;
use crate::config::CompilerConfig;
use crate::error::{ConfigError, ExecutionError, ExecutionErrorKind};

/// Running state of a single compilation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutorState {
    /// Key, time, tempo and clef currently in effect
    pub attributes: Attributes,
    /// Syllable group left open by a hyphenated lyric
    pub pending_melisma: Option<usize>,
    /// Tie continuation. Reserved: no grammar construct sets it yet.
    pub open_tie: bool,
    next_group: usize,
}

impl ExecutorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initial state from a compiler configuration
    pub fn from_config(config: &CompilerConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            attributes: config.attributes()?,
            ..Self::default()
        })
    }

    /// Lyric attachment for the next note or chord, updating the melisma state
    fn attach_lyric(&mut self, text: Option<String>) -> Option<Lyric> {
        match text {
            Some(text) => {
                let group = self.next_group;
                self.next_group += 1;
                self.pending_melisma = text.ends_with('-').then_some(group);
                Some(Lyric::Syllable { group, text })
            }
            None => self.pending_melisma.map(|group| Lyric::Melisma { group }),
        }
    }
}

/// Accumulates measures while the elements are executed
struct ScoreBuilder {
    state: ExecutorState,
    metadata: Metadata,
    measures: Vec<Measure>,
    current: Option<Measure>,
    repeat_start_pending: bool,
}

impl ScoreBuilder {
    fn new(state: ExecutorState) -> Self {
        Self {
            state,
            metadata: Metadata::default(),
            measures: Vec::new(),
            current: None,
            repeat_start_pending: false,
        }
    }

    fn apply(&mut self, index: usize, element: ParsedElement) -> Result<(), ExecutionError> {
        match element {
            ParsedElement::Note {
                pitch,
                duration,
                lyric,
            } => {
                let lyric = self.state.attach_lyric(lyric);
                self.push_event(EventKind::Note { pitch, duration }, lyric);
            }
            ParsedElement::Chord {
                pitches,
                duration,
                lyric,
            } => {
                let lyric = self.state.attach_lyric(lyric);
                self.push_event(EventKind::Chord { pitches, duration }, lyric);
            }
            ParsedElement::Rest { duration } => {
                self.push_event(EventKind::Rest { duration }, None);
            }
            ParsedElement::Barline { kind } => self.barline(kind),
            ParsedElement::MetadataCommand { key, value } => self.command(index, key, value)?,
        }
        Ok(())
    }

    fn push_event(&mut self, kind: EventKind, lyric: Option<Lyric>) {
        let attributes = self.state.attributes;
        let number = self.measures.len() + 1;
        let repeat_start = &mut self.repeat_start_pending;
        let measure = self.current.get_or_insert_with(|| Measure {
            number,
            attributes,
            events: Vec::new(),
            repeat_start: std::mem::take(repeat_start),
            repeat_end: false,
            barline: None,
        });
        measure.events.push(Event {
            kind,
            attributes,
            lyric,
        });
    }

    fn barline(&mut self, kind: BarlineKind) {
        if kind.opens_repeat() {
            self.repeat_start_pending = true;
        }

        if let Some(mut measure) = self.current.take() {
            measure.barline = Some(kind);
            measure.repeat_end = kind.closes_repeat();
            self.close(measure);
            return;
        }

        // Nothing since the previous barline
        if kind == BarlineKind::RepeatStart {
            return;
        }
        match self.measures.last_mut() {
            Some(previous) => {
                previous.barline = Some(kind);
                previous.repeat_end |= kind.closes_repeat();
            }
            None => log::debug!("ignoring {:?} barline before the first measure", kind),
        }
    }

    fn close(&mut self, measure: Measure) {
        let fill = measure.fill();
        if fill == MeasureFill::Complete {
            log::debug!("measure {} closed", measure.number);
        } else {
            log::debug!(
                "measure {} closed {:?}: {} of {} beats",
                measure.number,
                fill,
                measure.total_beats(),
                measure.attributes.time.quarter_beats()
            );
        }
        self.measures.push(measure);
    }

    fn command(
        &mut self,
        index: usize,
        key: CommandKey,
        value: String,
    ) -> Result<(), ExecutionError> {
        let attributes = &mut self.state.attributes;
        match key {
            CommandKey::Key => match KeySignature::from_str(&value) {
                Some(k) => attributes.key = k,
                None => return Err(unknown(ExecutionErrorKind::UnknownKey, index, value)),
            },
            CommandKey::Time => match TimeSignature::from_str(&value) {
                Some(t) => attributes.time = t,
                None => {
                    return Err(unknown(ExecutionErrorKind::UnknownTimeSignature, index, value))
                }
            },
            CommandKey::Tempo => match Tempo::from_str(&value) {
                Some(t) => attributes.tempo = t,
                None => return Err(unknown(ExecutionErrorKind::UnknownTempoName, index, value)),
            },
            CommandKey::Clef => match Clef::from_str(&value) {
                Some(c) => attributes.clef = c,
                None => return Err(unknown(ExecutionErrorKind::UnknownClef, index, value)),
            },
            CommandKey::Title => self.metadata.title = Some(value),
            CommandKey::Composer => self.metadata.composer = Some(value),
            CommandKey::Arranger => self.metadata.arranger = Some(value),
        }
        Ok(())
    }

    fn finish(mut self) -> Score {
        if let Some(measure) = self.current.take() {
            self.close(measure);
        }
        if self.repeat_start_pending {
            log::debug!("dropping repeat start with no following measure");
        }
        Score {
            metadata: self.metadata,
            measures: self.measures,
        }
    }
}

fn unknown(kind: ExecutionErrorKind, index: usize, value: String) -> ExecutionError {
    ExecutionError { kind, index, value }
}

/// Execute parsed elements from the default state (C major, 4/4, 120 bpm, treble clef)
pub fn execute(elements: Vec<ParsedElement>) -> Result<Score, ExecutionError> {
    execute_with_state(elements, ExecutorState::default())
}

/// Execute parsed elements starting from the given state
pub fn execute_with_state(
    elements: Vec<ParsedElement>,
    state: ExecutorState,
) -> Result<Score, ExecutionError> {
    let mut builder = ScoreBuilder::new(state);
    for (index, element) in elements.into_iter().enumerate() {
        builder.apply(index, element)?;
    }
    Ok(builder.finish())
}
