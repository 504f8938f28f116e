use clap::{Parser, ValueEnum};
use quill::{CompileError, CompilerConfig, MeasureFill, Score};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("quill=info"))
        .init();

    process::exit(match run(CliArgs::parse()) {
        Ok(()) => 0,
        Err(err) => {
            log::error!("{err}");
            1
        }
    });
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct CliArgs {
    /// Quill source file, or `-` for stdin
    #[arg(required_unless_present = "syntax")]
    input: Option<String>,
    /// YAML file with the initial key, time, tempo, clef and default duration
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write the output here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[arg(short, long, value_enum, default_value_t = Format::Yaml)]
    format: Format,
    /// Only check that the input compiles
    #[arg(long, default_value_t = false)]
    check: bool,
    /// Print the notation syntax guide and exit
    #[arg(long, default_value_t = false)]
    syntax: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Yaml,
    Summary,
}

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error("{0}")]
    Compile(#[from] CompileError),
    #[error("could not read '{path}': {source}")]
    Read { path: String, source: io::Error },
    #[error("could not write '{path}': {source}")]
    Write { path: String, source: io::Error },
    #[error("could not serialize score: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

fn run(args: CliArgs) -> Result<(), AppError> {
    if args.syntax {
        print!("{}", quill::syntax_guide());
        return Ok(());
    }
    let input = args.input.as_deref().unwrap_or("-");

    let config = match &args.config {
        Some(path) => CompilerConfig::load(path).map_err(CompileError::from)?,
        None => CompilerConfig::default(),
    };

    let source = read_source(input)?;
    let score = quill::compile_with_config(&source, &config)?;
    log::info!("compiled {} measures from {}", score.measures.len(), input);

    if args.check {
        println!("ok");
        return Ok(());
    }

    let rendered = match args.format {
        Format::Yaml => serde_yaml::to_string(&score)?,
        Format::Summary => summary(&score),
    };

    match &args.output {
        Some(path) => {
            fs::write(path, &rendered).map_err(|source| AppError::Write {
                path: path.display().to_string(),
                source,
            })?;
            log::info!("wrote {}", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn read_source(input: &str) -> Result<String, AppError> {
    let read_error = |source| AppError::Read {
        path: input.to_string(),
        source,
    };
    if input == "-" {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source).map_err(read_error)?;
        Ok(source)
    } else {
        fs::read_to_string(input).map_err(read_error)
    }
}

/// One line per measure: number, attributes, event count and fill
fn summary(score: &Score) -> String {
    let mut out = String::new();
    if let Some(title) = &score.metadata.title {
        out.push_str(&format!("{title}\n"));
    }
    for measure in &score.measures {
        let fill = match measure.fill() {
            MeasureFill::Complete => "complete",
            MeasureFill::Underfull => "underfull",
            MeasureFill::Overfull => "overfull",
        };
        out.push_str(&format!(
            "{:>3}  {}  {} events  {}\n",
            measure.number,
            measure.attributes,
            measure.events.len(),
            fill
        ));
    }
    out
}
