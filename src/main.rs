use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use piano_tune::convert::{convert_notation, ConvertTarget};
use piano_tune::player::{PlaybackSink, Player, ThreadClock};
use piano_tune::{load_tune, InstructionKind, SourceSpan, TimelineEvent, TuneError};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "piano-tune", version, about = "Compile and play piano-tune notation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the time-ordered note on/off events of a tune
    Events {
        file: PathBuf,
        /// Print the events as YAML
        #[arg(long)]
        yaml: bool,
    },
    /// Play a tune in real time, printing the messages sent to the output
    Play { file: PathBuf },
    /// Rewrite the note names of a tune in another notation
    Convert {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = ConvertTarget::Toggle)]
        to: ConvertTarget,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Events { file, yaml } => print_events(&file, yaml),
        Command::Play { file } => play(&file),
        Command::Convert { file, to } => {
            read_source(&file).map(|source| print!("{}", convert_notation(&source, to)))
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn read_source(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("reading '{}': {}", path.display(), e))
}

fn print_events(path: &Path, yaml: bool) -> Result<(), String> {
    let source = read_source(path)?;
    let tune = load_tune(&source).map_err(|e| describe(&source, &e))?;

    if yaml {
        let text = serde_yaml::to_string(&tune).map_err(|e| e.to_string())?;
        print!("{}", text);
        return Ok(());
    }

    if let Some(title) = &tune.metadata.title {
        println!("# {}", title);
    }
    for event in &tune.events {
        println!("{}", format_event(&source, event));
    }
    Ok(())
}

fn play(path: &Path) -> Result<(), String> {
    let source = read_source(path)?;
    let tune = load_tune(&source).map_err(|e| describe(&source, &e))?;

    let player = Player::new();
    let stop = player.stop_handle();
    ctrlc::set_handler(move || stop.stop()).map_err(|e| e.to_string())?;

    let mut sink = ConsoleSink { source: &source };
    let report = player
        .play(&tune.events, &mut sink, &mut ThreadClock)
        .map_err(|e| e.to_string())?;

    if report.stopped {
        eprintln!("Stopped after {} events", report.dispatched);
    }
    Ok(())
}

/// Output that prints every message instead of sending it to a device
struct ConsoleSink<'a> {
    source: &'a str,
}

impl PlaybackSink for ConsoleSink<'_> {
    fn note_on(&mut self, note: u8) -> Result<(), TuneError> {
        println!("note_on  {:3}", note);
        Ok(())
    }

    fn note_off(&mut self, note: u8) -> Result<(), TuneError> {
        println!("note_off {:3}", note);
        Ok(())
    }

    fn highlight(&mut self, span: SourceSpan, on: bool) -> Result<(), TuneError> {
        if on {
            println!("         > {}", snippet(self.source, span));
        }
        Ok(())
    }
}

fn format_event(source: &str, event: &TimelineEvent) -> String {
    let what = match &event.state.instruction.kind {
        InstructionKind::Note { .. } => match event.midi_note() {
            Some(note) => format!("note {}", note),
            None => "note (out of range)".to_string(),
        },
        InstructionKind::Pause(_) => "pause".to_string(),
        InstructionKind::LabelReference(name) => format!("label {}", name),
        _ => "other".to_string(),
    };
    format!(
        "{:10.3} {:3} {:24} {}",
        event.time_ms,
        if event.on { "on" } else { "off" },
        what,
        snippet(source, event.state.instruction.span)
    )
}

fn snippet(source: &str, span: SourceSpan) -> &str {
    source.get(span.start..span.end).unwrap_or("")
}

/// Error message with the line and column of the error's span
fn describe(source: &str, error: &TuneError) -> String {
    match error.span().and_then(|span| source.get(..span.start)) {
        Some(before) => {
            let line = before.matches('\n').count() + 1;
            let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
            format!("line {}, column {}: {}", line, column, error)
        }
        None => error.to_string(),
    }
}
