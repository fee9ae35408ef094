//! Per-track note encoding

use super::record::{EmittedLine, Envelope, NoteRecord, PcmRecord, PCM_TYPE};
use super::value::resolve;
use super::{non_empty, split_columns, strip_comment};

/// Minimum number of columns for a note line
pub const MIN_NOTE_COLUMNS: usize = 4;

/// Payload used when a PCM line leaves it empty
pub const DEFAULT_PCM_PAYLOAD: &str = "8";

/// Default note volume before scaling
const DEFAULT_VOLUME: &str = "255";

/// Default attack and release
const DEFAULT_ENVELOPE: &str = "1";

/// Full-scale volume base
pub const FULL_SCALE: i64 = 255;

/// Placement parameters applied to every line of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackParams {
    pub pitch_offset: i64,
    pub volume_base: i64,
    pub pan_base: i64,
    /// Absolute frame the track starts at
    pub base_start: i64,
}

/// Column tokens of a structured note line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteFields<'a> {
    pub kind: i64,
    pub pitch: &'a str,
    pub length: &'a str,
    pub start: &'a str,
    pub volume: Option<&'a str>,
    pub pan: Option<&'a str>,
    /// Attack and release tokens, present with more than six columns
    pub envelope: Option<(Option<&'a str>, Option<&'a str>)>,
    pub slide: Option<&'a str>,
}

/// A track line classified by its type column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteLine<'a> {
    Note(NoteFields<'a>),
    Pcm {
        start: &'a str,
        payload: Option<&'a str>,
    },
}

impl<'a> NoteLine<'a> {
    /// Classify a raw track line
    ///
    /// Returns `None` for blank lines, comments and lines with fewer than
    /// four columns. The `;slide` suffix is split off before the columns.
    pub fn parse(raw: &'a str) -> Option<Self> {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            return None;
        }

        let (body, slide) = match line.split_once(';') {
            Some((body, slide)) => (body, Some(slide.trim())),
            None => (line, None),
        };

        let cols = split_columns(body);
        if cols.len() < MIN_NOTE_COLUMNS {
            return None;
        }

        let kind = resolve(cols[0], 0);
        if kind == PCM_TYPE {
            return Some(NoteLine::Pcm {
                start: cols[1],
                payload: non_empty(cols.get(2).copied()),
            });
        }

        let envelope = if cols.len() > 6 {
            Some((non_empty(cols.get(6).copied()), non_empty(cols.get(7).copied())))
        } else {
            None
        };

        Some(NoteLine::Note(NoteFields {
            kind,
            pitch: cols[1],
            length: cols[2],
            start: cols[3],
            volume: non_empty(cols.get(4).copied()),
            pan: cols.get(5).copied(),
            envelope,
            slide,
        }))
    }
}

/// Records produced by one placement of a track
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledTrack {
    pub lines: Vec<EmittedLine>,
    /// Frames from the placement start to the end of the last note
    pub extent: i64,
}

/// Encode every line of `text` for one placement
pub fn compile_track(text: &str, params: &TrackParams) -> CompiledTrack {
    let mut compiled = CompiledTrack::default();

    for raw in text.lines() {
        let Some(line) = NoteLine::parse(raw) else {
            continue;
        };

        let (record, end) = match line {
            NoteLine::Pcm { start, payload } => {
                let local_start = resolve(start, 0);
                let pcm = PcmRecord {
                    start: local_start.saturating_add(params.base_start),
                    payload: payload.unwrap_or(DEFAULT_PCM_PAYLOAD).to_string(),
                };
                // No length column; a PCM record only reaches its own start.
                (EmittedLine::Pcm(pcm), local_start)
            }
            NoteLine::Note(fields) => {
                let note = encode_note(&fields, params);
                let end = resolve(fields.start, 0).saturating_add(note.length);
                (EmittedLine::Note(note), end)
            }
        };

        compiled.extent = compiled.extent.max(end);
        compiled.lines.push(record);
    }

    compiled
}

fn encode_note(fields: &NoteFields<'_>, params: &TrackParams) -> NoteRecord {
    let local_start = resolve(fields.start, 0);
    let volume = resolve(fields.volume.unwrap_or(DEFAULT_VOLUME), 0);

    let envelope = fields.envelope.map(|(attack, release)| Envelope {
        attack: resolve(attack.unwrap_or(DEFAULT_ENVELOPE), 0),
        release: resolve(release.unwrap_or(DEFAULT_ENVELOPE), 0),
        slide: fields
            .slide
            .map(|slide| resolve(slide, 0))
            .filter(|&slide| slide > 0),
    });

    NoteRecord {
        kind: fields.kind,
        pitch: resolve(fields.pitch, 0).saturating_add(params.pitch_offset),
        length: resolve(fields.length, 0),
        start: local_start.saturating_add(params.base_start),
        volume: volume.saturating_mul(params.volume_base).div_euclid(FULL_SCALE),
        pan: fields
            .pan
            .map_or(params.pan_base, |pan| resolve(pan, 0)),
        envelope,
    }
}
