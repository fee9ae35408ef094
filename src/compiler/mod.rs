//! Main-sequence compiler - stitches tracks into a mimi document
//!
//! Compilation is a single pass over the main sequence. Every call starts
//! from a fresh cursor; nothing is carried between calls.

pub mod document;
pub mod hex;
pub mod record;
pub mod sequence;
pub mod track;
pub mod value;

use crate::error::{Error, Result};
use document::{assemble, TempoConfig};
use record::EmittedLine;
use sequence::{compile_sequence, place, CompileWarning, Placement, SequenceState};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::BuildHasher;

/// Lookup of track text by identifier
pub trait TrackSource {
    fn track(&self, id: &str) -> Option<&str>;
}

impl<S: BuildHasher> TrackSource for HashMap<String, String, S> {
    fn track(&self, id: &str) -> Option<&str> {
        self.get(id).map(String::as_str)
    }
}

impl TrackSource for BTreeMap<String, String> {
    fn track(&self, id: &str) -> Option<&str> {
        self.get(id).map(String::as_str)
    }
}

/// Compiler configured with the song-wide scalars
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    config: TempoConfig,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TempoConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TempoConfig {
        &self.config
    }

    /// Compile a main sequence against a set of tracks
    pub fn compile<T>(&self, main: &str, tracks: &T) -> CompiledDocument
    where
        T: TrackSource + ?Sized,
    {
        self.document(compile_sequence(main, tracks))
    }

    /// Compile one track on its own at frame 0, full volume, centered
    pub fn compile_solo<T>(&self, id: &str, tracks: &T) -> Result<CompiledDocument>
    where
        T: TrackSource + ?Sized,
    {
        if tracks.track(id).is_none() {
            return Err(Error::UnknownTrack(id.to_string()));
        }
        let state = place(SequenceState::default(), 1, &Placement::solo(id), tracks);
        Ok(self.document(state))
    }

    fn document(&self, state: SequenceState) -> CompiledDocument {
        CompiledDocument {
            header: self.config.header(),
            lines: state.lines,
            warnings: state.warnings,
            frames_per_beat: self.config.frames_per_beat(),
            end_frame: state.cursor,
        }
    }
}

/// Result of one compile invocation
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDocument {
    pub header: String,
    pub lines: Vec<EmittedLine>,
    pub warnings: Vec<CompileWarning>,
    pub frames_per_beat: i64,
    /// Cursor after the last placement
    pub end_frame: i64,
}

impl CompiledDocument {
    pub fn to_text(&self) -> String {
        assemble(&self.header, &self.lines)
    }
}

impl fmt::Display for CompiledDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// Drop everything from the first `#`
pub(crate) fn strip_comment(line: &str) -> &str {
    line.split_once('#').map_or(line, |(code, _)| code)
}

/// Split on commas and trim each column
pub(crate) fn split_columns(line: &str) -> Vec<&str> {
    line.split(',').map(str::trim).collect()
}

pub(crate) fn non_empty(token: Option<&str>) -> Option<&str> {
    token.filter(|t| !t.is_empty())
}
