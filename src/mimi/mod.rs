//! Playback-side view of compiled mimi text

pub mod reader;

pub use reader::{MimiHeader, MimiReader, MimiRecord, MimiSong, NoteEvent};
