//! # Abstract Syntax Tree (AST) and Score Types
//!
//! This module defines the value types shared by every stage of the Quill compiler:
//! the musical primitives the parser validates, the elements it emits, and the
//! structured [`Score`] the semantic executor produces.
//!
//! ## Type Hierarchy
//! ```text
//! ParsedElement (parser output, consumed by the executor)
//!   ├── Note { pitch, duration, lyric? }
//!   ├── Rest { duration }
//!   ├── Chord { pitches, duration, lyric? }
//!   ├── Barline { kind }
//!   └── MetadataCommand { key, value }
//!
//! Score (executor output)
//!   ├── Metadata (title, composer, arranger)
//!   └── Vec<Measure>
//!         ├── attributes: Attributes (key, time, tempo, clef at the first event)
//!         ├── repeat_start / repeat_end: bool
//!         ├── barline: Option<BarlineKind>
//!         └── Vec<Event>
//!               ├── kind: EventKind (Note | Rest | Chord)
//!               ├── attributes: Attributes (in effect when the event was emitted)
//!               └── lyric: Option<Lyric> (Syllable | Melisma)
//! ```
//!
//! ## Key Concepts
//!
//! ### Pitch
//! Letter + optional accidental + single-digit octave: `C4`, `F#5`, `Bbb3`, `Css2`, `En4`.
//! Accidental spellings: `#`/`s` (sharp), `##`/`ss` (double sharp), `b` (flat),
//! `bb` (double flat), `n` (explicit natural).
//!
//! ### Duration Calculation
//! - Codes: `w` whole, `h` half, `q` quarter, `e` eighth, `s` sixteenth, `t` thirty-second
//! - Up to two trailing dots: a dot adds half the base value, a second dot a further quarter
//! - Example: dotted quarter (`q.`) = `1.0 * 1.5 = 1.5 beats`
//! - Example: double-dotted half (`h..`) = `2.0 * 1.75 = 3.5 beats`
//!
//! ### Lyrics and Melisma
//! The syllable text lives only on the event that carried it. Lyric-less notes that
//! continue an open (hyphen-terminated) syllable carry [`Lyric::Melisma`] with the same
//! group number, so renderers can draw the extender line.
//!
//! ## Related Modules
//! - `lexer` / `parser` - Produce `ParsedElement`s from source text
//! - `semantic` - Executes `ParsedElement`s into a `Score`

use serde::Serialize;
use std::fmt;

/// Note letters A through G
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum NoteName {
    #[default]
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl NoteName {
    /// Case-insensitive letter lookup
    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'C' => Some(NoteName::C),
            'D' => Some(NoteName::D),
            'E' => Some(NoteName::E),
            'F' => Some(NoteName::F),
            'G' => Some(NoteName::G),
            'A' => Some(NoteName::A),
            'B' => Some(NoteName::B),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            NoteName::C => 'C',
            NoteName::D => 'D',
            NoteName::E => 'E',
            NoteName::F => 'F',
            NoteName::G => 'G',
            NoteName::A => 'A',
            NoteName::B => 'B',
        }
    }

    /// Semitones above C in the same octave
    pub fn semitone(&self) -> i16 {
        match self {
            NoteName::C => 0,
            NoteName::D => 2,
            NoteName::E => 4,
            NoteName::F => 5,
            NoteName::G => 7,
            NoteName::A => 9,
            NoteName::B => 11,
        }
    }
}

/// Explicit accidentals. An absent accidental is `None` on [`Pitch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Accidental {
    Sharp,       // # or s
    DoubleSharp, // ## or ss
    Flat,        // b
    DoubleFlat,  // bb
    Natural,     // n
}

impl Accidental {
    /// Semitone offset applied to the letter
    pub fn alter(&self) -> i16 {
        match self {
            Accidental::Sharp => 1,
            Accidental::DoubleSharp => 2,
            Accidental::Flat => -1,
            Accidental::DoubleFlat => -2,
            Accidental::Natural => 0,
        }
    }

    /// Canonical spelling used when printing a pitch
    pub fn symbol(&self) -> &'static str {
        match self {
            Accidental::Sharp => "#",
            Accidental::DoubleSharp => "##",
            Accidental::Flat => "b",
            Accidental::DoubleFlat => "bb",
            Accidental::Natural => "n",
        }
    }
}

/// A fully specified pitch: letter, optional accidental, octave 0-9
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Pitch {
    pub letter: NoteName,
    pub accidental: Option<Accidental>,
    pub octave: u8,
}

impl Pitch {
    /// Parse a pitch such as `C4`, `f#5`, `Bbb3` or `Ess2`.
    ///
    /// The letter is case-folded; the accidental must be exactly one of the recognized
    /// spellings and the octave exactly one decimal digit.
    pub fn from_str(s: &str) -> Option<Self> {
        let mut chars = s.chars();
        let letter = NoteName::from_char(chars.next()?)?;
        let rest = chars.as_str();

        let octave_char = rest.chars().last()?;
        let octave = octave_char.to_digit(10)? as u8;
        let spelling = &rest[..rest.len() - octave_char.len_utf8()];

        let accidental = match spelling {
            "" => None,
            "#" | "s" => Some(Accidental::Sharp),
            "##" | "ss" => Some(Accidental::DoubleSharp),
            "b" => Some(Accidental::Flat),
            "bb" => Some(Accidental::DoubleFlat),
            "n" => Some(Accidental::Natural),
            _ => return None,
        };

        Some(Self {
            letter,
            accidental,
            octave,
        })
    }

    /// Returns MIDI note number (C4 = 60, middle C), clamped to 0-127
    pub fn midi_number(&self) -> u8 {
        let alter = self.accidental.map(|a| a.alter()).unwrap_or(0);
        let total = (self.octave as i16 + 1) * 12 + self.letter.semitone() + alter;
        total.clamp(0, 127) as u8
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let accidental = self.accidental.map(|a| a.symbol()).unwrap_or("");
        write!(f, "{}{}{}", self.letter.as_char(), accidental, self.octave)
    }
}

/// Undotted note value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoteValue {
    Whole,        // w
    Half,         // h
    #[default]
    Quarter,      // q
    Eighth,       // e
    Sixteenth,    // s
    ThirtySecond, // t
}

impl NoteValue {
    pub fn from_code(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'w' => Some(NoteValue::Whole),
            'h' => Some(NoteValue::Half),
            'q' => Some(NoteValue::Quarter),
            'e' => Some(NoteValue::Eighth),
            's' => Some(NoteValue::Sixteenth),
            't' => Some(NoteValue::ThirtySecond),
            _ => None,
        }
    }

    pub fn code(&self) -> char {
        match self {
            NoteValue::Whole => 'w',
            NoteValue::Half => 'h',
            NoteValue::Quarter => 'q',
            NoteValue::Eighth => 'e',
            NoteValue::Sixteenth => 's',
            NoteValue::ThirtySecond => 't',
        }
    }

    /// Length in quarter-note beats
    pub fn beats(&self) -> f64 {
        match self {
            NoteValue::Whole => 4.0,
            NoteValue::Half => 2.0,
            NoteValue::Quarter => 1.0,
            NoteValue::Eighth => 0.5,
            NoteValue::Sixteenth => 0.25,
            NoteValue::ThirtySecond => 0.125,
        }
    }
}

/// Note value plus 0-2 augmentation dots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Duration {
    pub value: NoteValue,
    pub dots: u8,
}

impl Duration {
    pub const MAX_DOTS: u8 = 2;

    pub fn new(value: NoteValue, dots: u8) -> Self {
        Self { value, dots }
    }

    /// Parse a duration code such as `q`, `h.` or `e..`
    pub fn from_str(s: &str) -> Option<Self> {
        let mut chars = s.chars();
        let value = NoteValue::from_code(chars.next()?)?;
        let suffix = chars.as_str();
        if !suffix.chars().all(|c| c == '.') || suffix.len() > Self::MAX_DOTS as usize {
            return None;
        }
        Some(Self {
            value,
            dots: suffix.len() as u8,
        })
    }

    /// Length in quarter-note beats including dots.
    ///
    /// One dot adds half the base value, two dots add a further quarter:
    /// `base * (2 - 0.5^dots)`.
    pub fn beats(&self) -> f64 {
        let base = self.value.beats();
        base * (2.0 - 0.5f64.powi(self.dots as i32))
    }

    /// Conventional type name ("quarter", "16th", ...)
    pub fn type_name(&self) -> &'static str {
        match self.value {
            NoteValue::Whole => "whole",
            NoteValue::Half => "half",
            NoteValue::Quarter => "quarter",
            NoteValue::Eighth => "eighth",
            NoteValue::Sixteenth => "16th",
            NoteValue::ThirtySecond => "32nd",
        }
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value.code())?;
        for _ in 0..self.dots {
            f.write_str(".")?;
        }
        Ok(())
    }
}

/// Mode for key signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Major,
    Minor,
}

impl Mode {
    fn from_word(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "major" | "maj" => Some(Mode::Major),
            "minor" | "min" => Some(Mode::Minor),
            _ => None,
        }
    }
}

const MAJOR_TONICS: [&str; 15] = [
    "Cb", "Gb", "Db", "Ab", "Eb", "Bb", "F", "C", "G", "D", "A", "E", "B", "F#", "C#",
];
const MINOR_TONICS: [&str; 15] = [
    "Ab", "Eb", "Bb", "F", "C", "G", "D", "A", "E", "B", "F#", "C#", "G#", "D#", "A#",
];
const SHARP_ORDER: [NoteName; 7] = [
    NoteName::F,
    NoteName::C,
    NoteName::G,
    NoteName::D,
    NoteName::A,
    NoteName::E,
    NoteName::B,
];
const FLAT_ORDER: [NoteName; 7] = [
    NoteName::B,
    NoteName::E,
    NoteName::A,
    NoteName::D,
    NoteName::G,
    NoteName::C,
    NoteName::F,
];

/// Key signature (number of sharps/flats)
/// Positive = sharps, Negative = flats, Zero = C major / A minor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct KeySignature {
    pub fifths: i8, // -7 to +7 (flats to sharps)
    pub mode: Mode,
}

impl KeySignature {
    /// Parse a key name like "G major", "D minor", "Bb maj", "F#", or "Ebm".
    ///
    /// Only keys on the circle of fifths (up to seven sharps or flats) are recognized.
    pub fn from_str(s: &str) -> Option<Self> {
        let mut words = s.split_whitespace();
        let tonic = words.next()?;
        let mode_word = words.next();
        if words.next().is_some() {
            return None;
        }

        let (tonic, mode) = match mode_word {
            Some(word) => (tonic, Mode::from_word(word)?),
            None => match tonic.strip_suffix('m') {
                Some(t) if !t.is_empty() => (t, Mode::Minor),
                _ => (tonic, Mode::Major),
            },
        };

        // Normalize the letter case and the alternative accidental spellings
        let mut chars = tonic.chars();
        let letter = NoteName::from_char(chars.next()?)?;
        let accidental = match chars.as_str() {
            "" => "",
            "#" | "s" => "#",
            "b" | "f" => "b",
            _ => return None,
        };
        let name = format!("{}{}", letter.as_char(), accidental);

        let table = match mode {
            Mode::Major => &MAJOR_TONICS,
            Mode::Minor => &MINOR_TONICS,
        };
        let index = table.iter().position(|t| *t == name)?;
        Some(Self {
            fifths: index as i8 - 7,
            mode,
        })
    }

    /// Tonic spelled the way the key is conventionally written ("Bb", "F#")
    pub fn tonic(&self) -> &'static str {
        let index = (self.fifths.clamp(-7, 7) + 7) as usize;
        match self.mode {
            Mode::Major => MAJOR_TONICS[index],
            Mode::Minor => MINOR_TONICS[index],
        }
    }

    /// Returns the accidental this key signature implies for a letter, if any.
    /// Order of sharps: F C G D A E B
    /// Order of flats: B E A D G C F
    pub fn accidental_for(&self, letter: NoteName) -> Option<Accidental> {
        let count = self.fifths.unsigned_abs().min(7) as usize;
        if self.fifths > 0 && SHARP_ORDER[..count].contains(&letter) {
            Some(Accidental::Sharp)
        } else if self.fifths < 0 && FLAT_ORDER[..count].contains(&letter) {
            Some(Accidental::Flat)
        } else {
            None
        }
    }
}

impl fmt::Display for KeySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            Mode::Major => "major",
            Mode::Minor => "minor",
        };
        write!(f, "{} {}", self.tonic(), mode)
    }
}

/// Time signature (e.g., 4/4, 3/4, 6/8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSignature {
    pub beats: u8,
    pub beat_type: u8,
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self {
            beats: 4,
            beat_type: 4,
        }
    }
}

impl TimeSignature {
    const BEAT_TYPES: [u8; 6] = [1, 2, 4, 8, 16, 32];

    /// Parse "N/M", or the synonyms `cut` (2/2) and `common` (4/4)
    pub fn from_str(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "cut" => return Some(Self { beats: 2, beat_type: 2 }),
            "common" => return Some(Self::default()),
            _ => {}
        }

        let (beats, beat_type) = trimmed.split_once('/')?;
        let beats: u8 = beats.trim().parse().ok()?;
        let beat_type: u8 = beat_type.trim().parse().ok()?;
        if !(1..=32).contains(&beats) || !Self::BEAT_TYPES.contains(&beat_type) {
            return None;
        }
        Some(Self { beats, beat_type })
    }

    /// Expected measure length in quarter-note beats
    /// e.g., 4/4 = 4.0, 3/4 = 3.0, 6/8 = 3.0, 2/2 = 4.0
    pub fn quarter_beats(&self) -> f64 {
        self.beats as f64 * 4.0 / self.beat_type as f64
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats, self.beat_type)
    }
}

/// Named tempo markings with their canonical quarter-note BPM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TempoMarking {
    Grave,
    Largo,
    Larghetto,
    Adagio,
    Andante,
    Andantino,
    Moderato,
    Allegretto,
    Allegro,
    Vivace,
    Presto,
    Prestissimo,
}

impl TempoMarking {
    pub const ALL: [TempoMarking; 12] = [
        TempoMarking::Grave,
        TempoMarking::Largo,
        TempoMarking::Larghetto,
        TempoMarking::Adagio,
        TempoMarking::Andante,
        TempoMarking::Andantino,
        TempoMarking::Moderato,
        TempoMarking::Allegretto,
        TempoMarking::Allegro,
        TempoMarking::Vivace,
        TempoMarking::Presto,
        TempoMarking::Prestissimo,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TempoMarking::Grave => "Grave",
            TempoMarking::Largo => "Largo",
            TempoMarking::Larghetto => "Larghetto",
            TempoMarking::Adagio => "Adagio",
            TempoMarking::Andante => "Andante",
            TempoMarking::Andantino => "Andantino",
            TempoMarking::Moderato => "Moderato",
            TempoMarking::Allegretto => "Allegretto",
            TempoMarking::Allegro => "Allegro",
            TempoMarking::Vivace => "Vivace",
            TempoMarking::Presto => "Presto",
            TempoMarking::Prestissimo => "Prestissimo",
        }
    }

    pub fn bpm(&self) -> u16 {
        match self {
            TempoMarking::Grave => 40,
            TempoMarking::Largo => 50,
            TempoMarking::Larghetto => 63,
            TempoMarking::Adagio => 71,
            TempoMarking::Andante => 92,
            TempoMarking::Andantino => 96,
            TempoMarking::Moderato => 114,
            TempoMarking::Allegretto => 120,
            TempoMarking::Allegro => 138,
            TempoMarking::Vivace => 166,
            TempoMarking::Presto => 184,
            TempoMarking::Prestissimo => 208,
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(s.trim()))
    }
}

/// Tempo in quarter-note BPM, remembering the marking it was named by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tempo {
    pub bpm: u16,
    pub marking: Option<TempoMarking>,
}

impl Default for Tempo {
    fn default() -> Self {
        Self {
            bpm: 120,
            marking: None,
        }
    }
}

impl Tempo {
    pub const MAX_BPM: u16 = 999;

    /// Parse "120", "96 bpm", or a tempo marking like "Allegro"
    pub fn from_str(s: &str) -> Option<Self> {
        let lower = s.trim().to_ascii_lowercase();
        let number = lower.strip_suffix("bpm").map(str::trim_end).unwrap_or(lower.as_str());

        if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) {
            let bpm: u16 = number.parse().ok()?;
            if bpm == 0 || bpm > Self::MAX_BPM {
                return None;
            }
            return Some(Self { bpm, marking: None });
        }

        let marking = TempoMarking::from_name(&lower)?;
        Some(Self {
            bpm: marking.bpm(),
            marking: Some(marking),
        })
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.marking {
            Some(marking) => write!(f, "{} ({} bpm)", marking.name(), self.bpm),
            None => write!(f, "{} bpm", self.bpm),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Clef {
    #[default]
    Treble,
    Bass,
    Alto,
    Tenor,
    Percussion,
}

impl Clef {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "treble" => Some(Clef::Treble),
            "bass" => Some(Clef::Bass),
            "alto" => Some(Clef::Alto),
            "tenor" => Some(Clef::Tenor),
            "percussion" => Some(Clef::Percussion),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Clef::Treble => "treble",
            Clef::Bass => "bass",
            Clef::Alto => "alto",
            Clef::Tenor => "tenor",
            Clef::Percussion => "percussion",
        }
    }
}

/// Key, time, tempo and clef in effect at some point of the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Attributes {
    pub key: KeySignature,
    pub time: TimeSignature,
    pub tempo: Tempo,
    pub clef: Clef,
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {} clef",
            self.key,
            self.time,
            self.tempo,
            self.clef.name()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BarlineKind {
    Single,      // | bar measure
    Double,      // || dbar
    Final,       // ||| final
    RepeatStart, // |: ||:
    RepeatEnd,   // :| :||
    RepeatBoth,  // :|:
}

impl BarlineKind {
    /// Symbol forms, longest first so they can be matched greedily
    pub const SYMBOLS: [(&'static str, BarlineKind); 8] = [
        ("|||", BarlineKind::Final),
        (":|:", BarlineKind::RepeatBoth),
        ("||:", BarlineKind::RepeatStart),
        (":||", BarlineKind::RepeatEnd),
        ("||", BarlineKind::Double),
        (":|", BarlineKind::RepeatEnd),
        ("|:", BarlineKind::RepeatStart),
        ("|", BarlineKind::Single),
    ];

    /// Long word forms
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "bar" | "measure" => Some(BarlineKind::Single),
            "dbar" => Some(BarlineKind::Double),
            "final" => Some(BarlineKind::Final),
            _ => None,
        }
    }

    pub fn opens_repeat(&self) -> bool {
        matches!(self, BarlineKind::RepeatStart | BarlineKind::RepeatBoth)
    }

    pub fn closes_repeat(&self) -> bool {
        matches!(self, BarlineKind::RepeatEnd | BarlineKind::RepeatBoth)
    }
}

/// Metadata command keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKey {
    Key,
    Time,
    Tempo,
    Clef,
    Title,
    Composer,
    Arranger,
}

impl CommandKey {
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "key" => Some(CommandKey::Key),
            "time" => Some(CommandKey::Time),
            "tempo" => Some(CommandKey::Tempo),
            "clef" => Some(CommandKey::Clef),
            "title" => Some(CommandKey::Title),
            "composer" => Some(CommandKey::Composer),
            "arranger" => Some(CommandKey::Arranger),
            _ => None,
        }
    }
}

/// A syntactically valid element, in source order
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedElement {
    Note {
        pitch: Pitch,
        duration: Duration,
        lyric: Option<String>,
    },
    Rest {
        duration: Duration,
    },
    Chord {
        pitches: Vec<Pitch>, // source order, duplicates kept
        duration: Duration,
        lyric: Option<String>,
    },
    Barline {
        kind: BarlineKind,
    },
    MetadataCommand {
        key: CommandKey,
        value: String, // raw text, validated by the executor
    },
}

/// Score-level annotations with no effect on musical content
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub composer: Option<String>,
    pub arranger: Option<String>,
}

/// Lyric attachment of a single event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Lyric {
    /// The event carries syllable text and opens syllable group `group`
    Syllable { group: usize, text: String },
    /// Lyric-less continuation of an open syllable group
    Melisma { group: usize },
}

impl Lyric {
    pub fn group(&self) -> usize {
        match self {
            Lyric::Syllable { group, .. } | Lyric::Melisma { group } => *group,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Lyric::Syllable { text, .. } => Some(text),
            Lyric::Melisma { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EventKind {
    Note { pitch: Pitch, duration: Duration },
    Rest { duration: Duration },
    Chord { pitches: Vec<Pitch>, duration: Duration },
}

/// A musical event inside a measure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub kind: EventKind,
    pub attributes: Attributes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lyric: Option<Lyric>,
}

impl Event {
    pub fn duration(&self) -> Duration {
        match &self.kind {
            EventKind::Note { duration, .. }
            | EventKind::Rest { duration }
            | EventKind::Chord { duration, .. } => *duration,
        }
    }
}

/// How a measure's summed durations compare with its time signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasureFill {
    Complete,
    Underfull,
    Overfull,
}

/// A single measure containing musical events
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measure {
    pub number: usize, // 1-indexed
    pub attributes: Attributes,
    pub events: Vec<Event>,
    pub repeat_start: bool, // |: at the beginning of the measure
    pub repeat_end: bool,   // :| at the end of the measure
    pub barline: Option<BarlineKind>, // None when the input ended without a barline
}

impl Measure {
    /// Summed event durations in quarter-note beats
    pub fn total_beats(&self) -> f64 {
        self.events.iter().map(|e| e.duration().beats()).sum()
    }

    /// Advisory comparison against the measure's time signature. Never an error.
    pub fn fill(&self) -> MeasureFill {
        // Allow some floating point tolerance
        let tolerance = 0.001;
        let difference = self.total_beats() - self.attributes.time.quarter_beats();
        if difference.abs() <= tolerance {
            MeasureFill::Complete
        } else if difference < 0.0 {
            MeasureFill::Underfull
        } else {
            MeasureFill::Overfull
        }
    }
}

/// A complete compiled score
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Score {
    pub metadata: Metadata,
    pub measures: Vec<Measure>,
}

impl Score {
    /// All events in score order
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.measures.iter().flat_map(|m| m.events.iter())
    }

    /// Syllable texts in score order (melisma continuations are skipped)
    pub fn lyrics(&self) -> Vec<&str> {
        self.events()
            .filter_map(|e| e.lyric.as_ref().and_then(Lyric::text))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_spellings() {
        let p = Pitch::from_str("F##4").unwrap();
        assert_eq!(p.letter, NoteName::F);
        assert_eq!(p.accidental, Some(Accidental::DoubleSharp));
        assert_eq!(p.octave, 4);

        assert_eq!(
            Pitch::from_str("ess2").unwrap().accidental,
            Some(Accidental::DoubleSharp)
        );
        assert_eq!(
            Pitch::from_str("bb3").unwrap(),
            Pitch {
                letter: NoteName::B,
                accidental: Some(Accidental::Flat),
                octave: 3
            }
        );
        assert_eq!(
            Pitch::from_str("En5").unwrap().accidental,
            Some(Accidental::Natural)
        );
        assert_eq!(Pitch::from_str("G0").unwrap().accidental, None);
    }

    #[test]
    fn test_invalid_pitches() {
        for s in ["H4", "C", "C10", "C#b4", "Cx4", "C###4", "4", "", "C-1", "Cé4"] {
            assert!(Pitch::from_str(s).is_none(), "{s} should be rejected");
        }
    }

    #[test]
    fn test_pitch_display_and_midi() {
        assert_eq!(Pitch::from_str("cs4").unwrap().to_string(), "C#4");
        assert_eq!(Pitch::from_str("Bbb3").unwrap().to_string(), "Bbb3");
        assert_eq!(Pitch::from_str("C4").unwrap().midi_number(), 60);
        assert_eq!(Pitch::from_str("A4").unwrap().midi_number(), 69);
        assert_eq!(Pitch::from_str("Cb4").unwrap().midi_number(), 59);
        assert_eq!(Pitch::from_str("B#3").unwrap().midi_number(), 60);
    }

    #[test]
    fn test_duration_parsing_and_beats() {
        assert_eq!(Duration::from_str("q").unwrap().beats(), 1.0);
        assert_eq!(Duration::from_str("q.").unwrap().beats(), 1.5);
        assert_eq!(Duration::from_str("h..").unwrap().beats(), 3.5);
        assert_eq!(Duration::from_str("t").unwrap().beats(), 0.125);
        assert_eq!(Duration::from_str("W").unwrap().value, NoteValue::Whole);
        assert!(Duration::from_str("q...").is_none());
        assert!(Duration::from_str("x").is_none());
        assert!(Duration::from_str("q,").is_none());
        assert_eq!(Duration::from_str("e.").unwrap().to_string(), "e.");
        assert_eq!(Duration::from_str("s").unwrap().type_name(), "16th");
    }

    #[test]
    fn test_key_signature_names() {
        let g = KeySignature::from_str("G major").unwrap();
        assert_eq!(g.fifths, 1);
        assert_eq!(g.mode, Mode::Major);

        let d = KeySignature::from_str("D minor").unwrap();
        assert_eq!(d.fifths, -1);
        assert_eq!(d.mode, Mode::Minor);

        assert_eq!(KeySignature::from_str("bb maj").unwrap().fifths, -2);
        assert_eq!(KeySignature::from_str("F#").unwrap().fifths, 6);
        assert_eq!(KeySignature::from_str("Ebm").unwrap().fifths, -6);
        assert_eq!(KeySignature::from_str("Cs MINOR").unwrap().fifths, 4);
        assert_eq!(KeySignature::from_str("Bb major").unwrap().to_string(), "Bb major");
    }

    #[test]
    fn test_unknown_keys() {
        for s in ["H major", "G lydian", "D# major", "Fb minor", "", "C major please"] {
            assert!(KeySignature::from_str(s).is_none(), "{s} should be rejected");
        }
    }

    #[test]
    fn test_key_signature_accidentals() {
        let d = KeySignature::from_str("D major").unwrap();
        assert_eq!(d.accidental_for(NoteName::F), Some(Accidental::Sharp));
        assert_eq!(d.accidental_for(NoteName::C), Some(Accidental::Sharp));
        assert_eq!(d.accidental_for(NoteName::G), None);

        let f = KeySignature::from_str("F major").unwrap();
        assert_eq!(f.accidental_for(NoteName::B), Some(Accidental::Flat));
        assert_eq!(f.accidental_for(NoteName::E), None);
    }

    #[test]
    fn test_time_signatures() {
        assert_eq!(TimeSignature::from_str("cut"), TimeSignature::from_str("2/2"));
        assert_eq!(TimeSignature::from_str("Common"), Some(TimeSignature::default()));
        assert_eq!(
            TimeSignature::from_str(" 6 / 8 "),
            Some(TimeSignature { beats: 6, beat_type: 8 })
        );
        assert!(TimeSignature::from_str("5/5").is_none());
        assert!(TimeSignature::from_str("0/4").is_none());
        assert!(TimeSignature::from_str("4").is_none());
        assert_eq!(TimeSignature::from_str("6/8").unwrap().quarter_beats(), 3.0);
    }

    #[test]
    fn test_tempo_values() {
        assert_eq!(Tempo::from_str("120").unwrap().bpm, 120);
        assert_eq!(Tempo::from_str("96 BPM").unwrap().bpm, 96);

        let allegro = Tempo::from_str("allegro").unwrap();
        assert_eq!(allegro.bpm, 138);
        assert_eq!(allegro.marking, Some(TempoMarking::Allegro));

        assert!(Tempo::from_str("0").is_none());
        assert!(Tempo::from_str("-5").is_none());
        assert!(Tempo::from_str("fast").is_none());
        assert!(Tempo::from_str("1000").is_none());
    }

    #[test]
    fn test_clefs() {
        assert_eq!(Clef::from_str("Bass"), Some(Clef::Bass));
        assert_eq!(Clef::from_str("percussion"), Some(Clef::Percussion));
        assert!(Clef::from_str("soprano").is_none());
    }

    #[test]
    fn test_barline_words() {
        assert_eq!(BarlineKind::from_word("bar"), Some(BarlineKind::Single));
        assert_eq!(BarlineKind::from_word("measure"), Some(BarlineKind::Single));
        assert_eq!(BarlineKind::from_word("dbar"), Some(BarlineKind::Double));
        assert_eq!(BarlineKind::from_word("final"), Some(BarlineKind::Final));
        assert!(BarlineKind::RepeatBoth.opens_repeat());
        assert!(BarlineKind::RepeatBoth.closes_repeat());
    }
}
