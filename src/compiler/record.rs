//! Output records of a compiled document

use super::hex::{self, width};
use std::fmt;

/// Note type reserved for PCM records
pub const PCM_TYPE: i64 = 0x0F;

/// Attack/release block with optional slide annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    pub attack: i64,
    pub release: i64,
    /// Only present when greater than zero
    pub slide: Option<i64>,
}

/// A structured note event at an absolute frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRecord {
    pub kind: i64,
    pub pitch: i64,
    /// Length in frames
    pub length: i64,
    /// Absolute start frame
    pub start: i64,
    pub volume: i64,
    pub pan: i64,
    pub envelope: Option<Envelope>,
}

/// A PCM trigger carrying an opaque payload token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmRecord {
    /// Absolute start frame
    pub start: i64,
    pub payload: String,
}

/// One line of compiled output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmittedLine {
    Note(NoteRecord),
    Pcm(PcmRecord),
    /// Text copied verbatim from an `@` directive
    Passthrough(String),
}

impl fmt::Display for NoteRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}, {}, {}",
            hex::format(self.kind, width::TYPE),
            hex::format(self.pitch, width::PITCH),
            hex::format(self.length, width::LENGTH),
            hex::format(self.start, width::START),
            hex::format(self.volume, width::VOLUME),
            hex::format(self.pan, width::PAN),
        )?;
        if let Some(env) = &self.envelope {
            write!(
                f,
                ", {}, {}",
                hex::format(env.attack, width::ATTACK),
                hex::format(env.release, width::RELEASE),
            )?;
            if let Some(slide) = env.slide {
                write!(f, " ; {}", hex::format(slide, width::SLIDE))?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for PcmRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}",
            hex::format(PCM_TYPE, width::TYPE),
            hex::format(self.start, width::START),
            self.payload
        )
    }
}

impl fmt::Display for EmittedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmittedLine::Note(note) => fmt::Display::fmt(note, f),
            EmittedLine::Pcm(pcm) => fmt::Display::fmt(pcm, f),
            EmittedLine::Passthrough(text) => f.write_str(text),
        }
    }
}
