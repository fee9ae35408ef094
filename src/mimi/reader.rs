//! Mimi text reader
//!
//! Re-parses a compiled document the way the playback engine does: each
//! comma-separated line is a record of hexadecimal fields, `#` lines are
//! header comments.

use crate::compiler::record::PCM_TYPE;
use serde::Serialize;

/// Header metadata recovered from the comment block
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MimiHeader {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bpm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames_per_beat: Option<u64>,
}

/// A structured note as seen by the player
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteEvent {
    #[serde(rename = "type")]
    pub note_type: u64,
    pub pitch: u64,
    pub length: u64,
    pub start: u64,
    pub volume: u64,
    pub pan: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attack: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slide: Option<u64>,
}

impl NoteEvent {
    /// Frame right after the note ends
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.length)
    }

    /// True while `frame` lies in `[start, start + length)`
    pub fn is_active_at(&self, frame: u64) -> bool {
        frame >= self.start && frame < self.end()
    }
}

/// One body line of a mimi document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MimiRecord {
    Note(NoteEvent),
    Pcm { start: u64, payload: String },
    /// Line that is not a record, usually injected by a passthrough
    Raw { text: String },
}

/// A fully parsed mimi document
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MimiSong {
    pub header: MimiHeader,
    pub records: Vec<MimiRecord>,
}

impl MimiSong {
    pub fn notes(&self) -> impl Iterator<Item = &NoteEvent> {
        self.records.iter().filter_map(|record| match record {
            MimiRecord::Note(note) => Some(note),
            _ => None,
        })
    }

    /// Notes sounding at `frame`, in document order
    pub fn active_at(&self, frame: u64) -> impl Iterator<Item = &NoteEvent> {
        self.notes().filter(move |note| note.is_active_at(frame))
    }

    /// Last frame covered by any note or PCM trigger
    pub fn end_frame(&self) -> u64 {
        self.records
            .iter()
            .map(|record| match record {
                MimiRecord::Note(note) => note.end(),
                MimiRecord::Pcm { start, .. } => *start,
                MimiRecord::Raw { .. } => 0,
            })
            .max()
            .unwrap_or(0)
    }
}

/// Line-oriented mimi parser
pub struct MimiReader<'a> {
    text: &'a str,
}

impl<'a> MimiReader<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text }
    }

    /// Parse header metadata and every record
    pub fn parse(&self) -> MimiSong {
        MimiSong {
            header: self.parse_header(),
            records: self.parse_records(),
        }
    }

    /// Collect title and tempo from the `#` comment lines
    pub fn parse_header(&self) -> MimiHeader {
        let mut header = MimiHeader::default();

        for line in self.text.lines() {
            let Some(comment) = line.trim().strip_prefix('#') else {
                continue;
            };
            let comment = comment.trim();

            if let Some(title) = comment.strip_prefix("Title:") {
                header.title = Some(title.trim().to_string());
            } else if let Some(config) = comment.strip_prefix("Config:") {
                parse_config(config, &mut header);
            }
        }

        header
    }

    /// Parse every non-comment line into a record
    pub fn parse_records(&self) -> Vec<MimiRecord> {
        self.text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(parse_record)
            .collect()
    }
}

/// `120BPM, 24FPS (1beat=12f / 1bar=48f)`
fn parse_config(config: &str, header: &mut MimiHeader) {
    for part in config.split(|c: char| c == ',' || c.is_whitespace() || c == '(') {
        let part = part.trim();
        if let Some(bpm) = part.strip_suffix("BPM") {
            header.bpm = bpm.parse().ok();
        } else if let Some(fps) = part.strip_suffix("FPS") {
            header.fps = fps.parse().ok();
        } else if let Some(beat) = part.strip_prefix("1beat=") {
            header.frames_per_beat = beat.trim_end_matches('f').parse().ok();
        }
    }
}

/// Any line that is not a well-formed record is kept as `Raw`
fn parse_record(line: &str) -> MimiRecord {
    parse_event(line).unwrap_or_else(|| MimiRecord::Raw {
        text: line.to_string(),
    })
}

fn parse_event(line: &str) -> Option<MimiRecord> {
    let (body, slide) = match line.split_once(';') {
        Some((body, slide)) => (body, Some(slide)),
        None => (line, None),
    };
    let cols: Vec<&str> = body.split(',').map(str::trim).collect();
    let kind = hex_field(cols[0])?;

    if kind == PCM_TYPE as u64 && cols.len() >= 3 {
        // The payload is opaque; keep everything after the second comma.
        let mut fields = line.splitn(3, ',').skip(1);
        let start = hex_field(fields.next()?)?;
        let payload = fields.next()?.trim().to_string();
        return Some(MimiRecord::Pcm { start, payload });
    }

    if cols.len() < 6 {
        return None;
    }

    let optional = |i: usize| cols.get(i).map_or(Some(None), |c| hex_field(c).map(Some));

    Some(MimiRecord::Note(NoteEvent {
        note_type: kind,
        pitch: hex_field(cols[1])?,
        length: hex_field(cols[2])?,
        start: hex_field(cols[3])?,
        volume: hex_field(cols[4])?,
        pan: hex_field(cols[5])?,
        attack: optional(6)?,
        release: optional(7)?,
        slide: slide.map_or(Some(None), |s| hex_field(s).map(Some))?,
    }))
}

fn hex_field(token: &str) -> Option<u64> {
    u64::from_str_radix(token.trim(), 16).ok()
}
