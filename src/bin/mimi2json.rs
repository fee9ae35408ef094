//! Mimi to JSON converter

use clap::Parser;
use mimick::mimi::MimiReader;
use mimick::project::read_file;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mimi2json")]
#[command(version = "0.1.0")]
#[command(about = "Convert compiled mimi files to JSON", long_about = None)]
struct Args {
    /// Input mimi file (plain or gzip-compressed)
    input: PathBuf,

    /// Output JSON file (writes to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output compact JSON (default is pretty-printed)
    #[arg(short, long)]
    compact: bool,

    /// Only list the notes sounding at this frame
    #[arg(short, long)]
    frame: Option<u64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let data = read_file(&args.input)?;
    let text = String::from_utf8(data)?;
    let song = MimiReader::new(&text).parse();

    let json_string = match args.frame {
        Some(frame) => {
            let active: Vec<_> = song.active_at(frame).collect();
            to_json(&active, args.compact)?
        }
        None => to_json(&song, args.compact)?,
    };

    match args.output {
        Some(path) => {
            let mut file = File::create(path)?;
            file.write_all(json_string.as_bytes())?;
            file.write_all(b"\n")?;
        }
        None => {
            println!("{}", json_string);
        }
    }

    Ok(())
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T, compact: bool) -> serde_json::Result<String> {
    if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    }
}
