//! Fixed-width hexadecimal field rendering

/// Field widths of a note record
pub mod width {
    pub const TYPE: usize = 2;
    pub const PITCH: usize = 2;
    pub const LENGTH: usize = 4;
    pub const START: usize = 8;
    pub const VOLUME: usize = 2;
    pub const PAN: usize = 2;
    pub const ATTACK: usize = 2;
    pub const RELEASE: usize = 2;
    pub const SLIDE: usize = 2;
}

/// Render `value` as uppercase hex, zero-padded to at least `min_width`
///
/// Negative values clamp to zero. Wider values are never truncated.
pub fn format(value: i64, min_width: usize) -> String {
    format!("{:0width$X}", value.max(0), width = min_width)
}
