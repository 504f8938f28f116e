pub mod ast;
pub mod config;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod semantic;

pub use ast::*;
pub use config::CompilerConfig;
pub use error::*;
pub use lexer::{tokenize, Lexer, LocatedToken, Token};
pub use parser::{parse, parse_source, Parser};
pub use semantic::{execute, execute_with_state, ExecutorState};

/// Compile Quill source text into a Score.
/// This is the main entry point for the library.
pub fn compile(source: &str) -> Result<Score, CompileError> {
    compile_with_config(source, &CompilerConfig::default())
}

/// Compile starting from the key, time, tempo, clef and default duration of `config`
pub fn compile_with_config(source: &str, config: &CompilerConfig) -> Result<Score, CompileError> {
    let tokens = tokenize(source)?;
    let elements = Parser::new()
        .with_default_duration(config.default_duration()?)
        .parse(&tokens)?;
    let state = ExecutorState::from_config(config)?;
    Ok(execute_with_state(elements, state)?)
}

/// User-facing summary of the notation language
pub fn syntax_guide() -> &'static str {
    SYNTAX_GUIDE
}

const SYNTAX_GUIDE: &str = r#"QUILL NOTATION

Notes       <letter><accidental?><octave> <duration?> <"lyric"?>
            C4 q   F#5 h.   Bb3 e "la"
            letters A-G (any case), octave 0-9
            accidentals: # or s (sharp), ## or ss (double sharp),
                         b (flat), bb (double flat), n (natural)

Durations   w whole   h half   q quarter   e eighth   s 16th   t 32nd
            add one or two dots: q.  h..
            an omitted duration repeats the last one given (quarter at the start)

Rests       r q   R h.

Chords      [C4 E4 G4] h "lyric"

Lyrics      "text" after a note or chord; \" for a literal quote
            a syllable ending in - is held over the following
            lyric-less notes until a note brings its own lyric

Barlines    |  bar  measure     single
            ||  dbar            double
            |||  final          final
            |:  ||:             repeat start
            :|  :||             repeat end
            :|:                 repeat both

Commands    key: G major        (also D minor, Bb, F#m)
            time: 3/4           (also cut, common)
            tempo: 96           (or a marking such as Andante, Allegro)
            clef: bass          (treble, bass, alto, tenor, percussion)
            title: ...   composer: ...   arranger: ...

Comments    # to end of line
"#;
