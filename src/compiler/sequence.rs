//! Main-sequence placement and cursor threading
//!
//! Each placement resolves its start against the cursor left by the
//! placement before it, so `next` always means "right after the previous
//! line", regardless of which track that was.

use super::record::EmittedLine;
use super::track::{compile_track, TrackParams};
use super::value::resolve;
use super::{non_empty, split_columns, strip_comment, TrackSource};

/// Minimum number of columns for a placement
pub const MIN_PLACEMENT_COLUMNS: usize = 2;

const DEFAULT_PITCH_OFFSET: &str = "0";
const DEFAULT_VOLUME_BASE: &str = "255";
const DEFAULT_PAN_BASE: &str = "128";

/// Prefix of a passthrough directive
pub const PASSTHROUGH_PREFIX: char = '@';

/// Non-fatal problems found while compiling
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileWarning {
    #[error("Track {track} not found at line {line}")]
    UnknownTrack { track: String, line: usize },
}

/// One reference to a track within the main sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement<'a> {
    pub track: &'a str,
    /// Literal, `+offset` or `next`; resolved against the cursor
    pub start: &'a str,
    pub pitch_offset: i64,
    pub volume_base: i64,
    pub pan_base: i64,
}

impl<'a> Placement<'a> {
    /// Track `track` at frame 0 with no pitch offset, full volume, centered
    pub fn solo(track: &'a str) -> Self {
        Self {
            track,
            start: "0",
            pitch_offset: 0,
            volume_base: resolve(DEFAULT_VOLUME_BASE, 0),
            pan_base: resolve(DEFAULT_PAN_BASE, 0),
        }
    }
}

/// A classified main-sequence line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceLine<'a> {
    /// Blank line or `#` comment
    Comment,
    /// `@` directive; the remainder is emitted verbatim
    Passthrough(&'a str),
    Placement(Placement<'a>),
    /// Fewer than two columns
    Incomplete,
}

impl<'a> SequenceLine<'a> {
    pub fn parse(raw: &'a str) -> Self {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            return SequenceLine::Comment;
        }
        if let Some(rest) = line.strip_prefix(PASSTHROUGH_PREFIX) {
            return SequenceLine::Passthrough(rest.trim());
        }

        let cols = split_columns(strip_comment(line));
        if cols.len() < MIN_PLACEMENT_COLUMNS {
            return SequenceLine::Incomplete;
        }

        let column = |i: usize, default: &'static str| {
            resolve(non_empty(cols.get(i).copied()).unwrap_or(default), 0)
        };

        SequenceLine::Placement(Placement {
            track: cols[0],
            start: cols[1],
            pitch_offset: column(2, DEFAULT_PITCH_OFFSET),
            volume_base: column(3, DEFAULT_VOLUME_BASE),
            pan_base: column(4, DEFAULT_PAN_BASE),
        })
    }
}

/// Accumulator threaded through the main sequence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceState {
    /// End frame of the most recent placement
    pub cursor: i64,
    pub lines: Vec<EmittedLine>,
    pub warnings: Vec<CompileWarning>,
}

/// Compile the main sequence, left to right
pub fn compile_sequence<T>(main: &str, tracks: &T) -> SequenceState
where
    T: TrackSource + ?Sized,
{
    main.lines()
        .enumerate()
        .fold(SequenceState::default(), |state, (index, raw)| {
            step(state, index + 1, SequenceLine::parse(raw), tracks)
        })
}

/// Apply one main-sequence line to the accumulator
fn step<T>(
    mut state: SequenceState,
    line_no: usize,
    line: SequenceLine<'_>,
    tracks: &T,
) -> SequenceState
where
    T: TrackSource + ?Sized,
{
    match line {
        SequenceLine::Comment => state,
        SequenceLine::Incomplete => {
            tracing::trace!(line = line_no, "skipping incomplete placement");
            state
        }
        SequenceLine::Passthrough(text) => {
            state.lines.push(EmittedLine::Passthrough(text.to_string()));
            state
        }
        SequenceLine::Placement(placement) => place(state, line_no, &placement, tracks),
    }
}

/// Compile the placed track and advance the cursor to its end
///
/// An unknown track records a warning and leaves the cursor untouched.
pub fn place<T>(
    mut state: SequenceState,
    line_no: usize,
    placement: &Placement<'_>,
    tracks: &T,
) -> SequenceState
where
    T: TrackSource + ?Sized,
{
    let Some(text) = tracks.track(placement.track) else {
        tracing::warn!(track = placement.track, line = line_no, "track not found");
        state.warnings.push(CompileWarning::UnknownTrack {
            track: placement.track.to_string(),
            line: line_no,
        });
        return state;
    };

    let params = TrackParams {
        pitch_offset: placement.pitch_offset,
        volume_base: placement.volume_base,
        pan_base: placement.pan_base,
        base_start: resolve(placement.start, state.cursor),
    };
    let compiled = compile_track(text, &params);
    let cursor = params.base_start.saturating_add(compiled.extent);

    tracing::debug!(
        track = placement.track,
        base_start = params.base_start,
        extent = compiled.extent,
        cursor,
        "placed track"
    );

    state.lines.extend(compiled.lines);
    state.cursor = cursor;
    state
}
