use clap::Parser;
use mimick::compiler::Compiler;
use mimick::project::{self, Project};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mimick")]
#[command(version = "0.1.0")]
#[command(about = "Assembly-style music sequence to mimi compiler", long_about = None)]
struct Args {
    /// Output mimi file (writes to stdout if not specified)
    output: Option<PathBuf>,

    /// Project directory or .mina archive
    #[arg(short, long, conflicts_with_all = ["main", "tracks"])]
    project: Option<PathBuf>,

    /// Main sequence file
    #[arg(short, long, required_unless_present = "project")]
    main: Option<PathBuf>,

    /// Directory of <id>.s track files
    #[arg(short, long)]
    tracks: Option<PathBuf>,

    /// Frames per second of the player
    #[arg(long)]
    fps: Option<f64>,

    /// Beats per minute
    #[arg(long)]
    bpm: Option<f64>,

    /// Song title written to the header
    #[arg(long)]
    title: Option<String>,

    /// Compile a single track at frame 0 instead of the main sequence
    #[arg(short, long)]
    solo: Option<String>,
}

fn main() -> Result<(), mimick::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut project = match (&args.project, &args.main) {
        (Some(path), _) => Project::load(path)?,
        (None, Some(main)) => Project {
            main: fs::read_to_string(main)?,
            tracks: match &args.tracks {
                Some(dir) => project::read_track_dir(dir)?,
                None => Default::default(),
            },
            ..Project::default()
        },
        // clap enforces one of the two
        (None, None) => Project::default(),
    };

    if let Some(fps) = args.fps {
        project.fps = fps;
    }
    if let Some(bpm) = args.bpm {
        project.bpm = bpm;
    }
    if let Some(title) = args.title {
        project.title = title;
    }

    let document = match &args.solo {
        Some(id) => Compiler::with_config(project.tempo()).compile_solo(id, &project.tracks)?,
        None => project.compile(),
    };

    tracing::info!(
        lines = document.lines.len(),
        warnings = document.warnings.len(),
        end_frame = document.end_frame,
        "compiled"
    );

    let text = document.to_text();
    match args.output {
        Some(path) => fs::write(path, text)?,
        None => io::stdout().write_all(text.as_bytes())?,
    }

    Ok(())
}
