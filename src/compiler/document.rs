//! Header generation and final text assembly

use super::record::EmittedLine;
use serde::{Deserialize, Serialize};

/// Format marker written on the first header line
pub const FORMAT_MARKER: &str = "Mimi Music Format v2.0";

pub const DEFAULT_FPS: f64 = 24.0;
pub const DEFAULT_BPM: f64 = 120.0;
pub const DEFAULT_TITLE: &str = "Untitled";

/// Beats per bar used for the header summary
pub const BEATS_PER_BAR: i64 = 4;

/// Upper bound of frames per beat; keeps frames per bar representable
pub const MAX_FRAMES_PER_BEAT: i64 = i64::MAX / BEATS_PER_BAR;

/// Column legend written at the end of the header
pub const COLUMN_LEGEND: &str =
    "Type, Pitch, Length, Start, Volume, Pan[, Attack, Release[ ; Slide]]";

/// Song-wide scalars
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TempoConfig {
    /// Frames per second of the playback engine
    pub fps: f64,
    /// Beats per minute
    pub bpm: f64,
    pub title: String,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            bpm: DEFAULT_BPM,
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

impl TempoConfig {
    pub fn new(fps: f64, bpm: f64, title: impl Into<String>) -> Self {
        Self {
            fps,
            bpm,
            title: title.into(),
        }
    }

    /// Frame rate, falling back to the default when not positive
    pub fn effective_fps(&self) -> f64 {
        positive_or(self.fps, DEFAULT_FPS)
    }

    /// Tempo, falling back to the default when not positive
    pub fn effective_bpm(&self) -> f64 {
        positive_or(self.bpm, DEFAULT_BPM)
    }

    /// `round(60 / bpm * fps)`, clamped to `0..=MAX_FRAMES_PER_BEAT`
    pub fn frames_per_beat(&self) -> i64 {
        let frames = (60.0 / self.effective_bpm() * self.effective_fps()).round();
        frames.clamp(0.0, MAX_FRAMES_PER_BEAT as f64) as i64
    }

    pub fn frames_per_bar(&self) -> i64 {
        self.frames_per_beat().saturating_mul(BEATS_PER_BAR)
    }

    /// Header comment block, terminated by a blank line
    pub fn header(&self) -> String {
        format!(
            "# {}\n# Title: {}\n# Config: {}BPM, {}FPS (1beat={}f / 1bar={}f)\n# Format: {}\n\n",
            FORMAT_MARKER,
            self.title,
            self.effective_bpm(),
            self.effective_fps(),
            self.frames_per_beat(),
            self.frames_per_bar(),
            COLUMN_LEGEND
        )
    }
}

fn positive_or(value: f64, default: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        default
    }
}

/// Concatenate the header and one text line per emitted record
pub fn assemble(header: &str, lines: &[EmittedLine]) -> String {
    lines.iter().fold(String::from(header), |mut text, line| {
        text.push_str(&line.to_string());
        text.push('\n');
        text
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_per_beat() {
        assert_eq!(TempoConfig::default().frames_per_beat(), 12);
        assert_eq!(TempoConfig::new(60.0, 150.0, "").frames_per_beat(), 24);
        // 60 / 140 * 30 = 12.857
        assert_eq!(TempoConfig::new(30.0, 140.0, "").frames_per_beat(), 13);
    }

    #[test]
    fn test_invalid_scalars_fall_back() {
        let config = TempoConfig::new(0.0, f64::NAN, "x");
        assert_eq!(config.effective_fps(), DEFAULT_FPS);
        assert_eq!(config.effective_bpm(), DEFAULT_BPM);
        assert_eq!(config.frames_per_beat(), 12);

        let config = TempoConfig::new(-24.0, -1.0, "x");
        assert_eq!(config.frames_per_beat(), 12);
    }

    #[test]
    fn test_extreme_scalars_stay_in_range() {
        let fast = TempoConfig::new(1e300, 120.0, "x");
        assert_eq!(fast.frames_per_beat(), MAX_FRAMES_PER_BEAT);
        assert!(fast.frames_per_bar() >= fast.frames_per_beat());
        assert!(fast.header().contains(&format!("1beat={}f", MAX_FRAMES_PER_BEAT)));

        let slow = TempoConfig::new(24.0, 1e-300, "x");
        assert_eq!(slow.frames_per_beat(), MAX_FRAMES_PER_BEAT);
        assert!(slow.header().starts_with("# Mimi Music Format v2.0\n"));

        let tiny = TempoConfig::new(1e-300, 120.0, "x");
        assert_eq!(tiny.frames_per_beat(), 0);
        assert_eq!(tiny.frames_per_bar(), 0);
    }

    #[test]
    fn test_header() {
        let header = TempoConfig::new(24.0, 120.0, "Demo").header();
        assert_eq!(
            header,
            "# Mimi Music Format v2.0\n\
             # Title: Demo\n\
             # Config: 120BPM, 24FPS (1beat=12f / 1bar=48f)\n\
             # Format: Type, Pitch, Length, Start, Volume, Pan[, Attack, Release[ ; Slide]]\n\
             \n"
        );
    }

    #[test]
    fn test_assemble_terminates_every_line() {
        let lines = vec![
            EmittedLine::Passthrough("# raw".to_string()),
            EmittedLine::Passthrough("LOOP".to_string()),
        ];
        assert_eq!(assemble("# h\n", &lines), "# h\n# raw\nLOOP\n");
        assert_eq!(assemble("# h\n", &[]), "# h\n");
    }
}
