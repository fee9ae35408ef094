//! Numeric token resolution
//!
//! Tokens are decimal unless they carry a `0x` prefix or contain a hex
//! letter. A digits-only token is always decimal: `10` is ten, never
//! sixteen. Authored songs depend on that asymmetry.

/// Keyword resolving to the running cursor
pub const NEXT_KEYWORD: &str = "next";

/// Resolve a start/value token against the running cursor
///
/// - empty token: `0`
/// - `next`: the cursor itself
/// - `+N`: cursor plus the literal `N`
/// - anything else: the literal value
pub fn resolve(token: &str, cursor: i64) -> i64 {
    let token = token.trim();
    if token.is_empty() {
        return 0;
    }
    if token.eq_ignore_ascii_case(NEXT_KEYWORD) {
        return cursor;
    }
    match token.strip_prefix('+') {
        Some(offset) => cursor.saturating_add(literal(offset)),
        None => literal(token),
    }
}

/// Parse a bare numeral, returning `0` when nothing parses
pub fn literal(token: &str) -> i64 {
    let token = token.trim();

    if let Some(digits) = strip_hex_prefix(token) {
        return parse_hex(digits).unwrap_or(0);
    }

    if has_hex_letter(token) {
        parse_hex(token).unwrap_or(0)
    } else {
        token
            .parse::<i64>()
            .ok()
            .or_else(|| parse_hex(token))
            .unwrap_or(0)
    }
}

fn strip_hex_prefix(token: &str) -> Option<&str> {
    token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
}

/// True when the token holds a letter from `a`-`f` (either case)
fn has_hex_letter(token: &str) -> bool {
    token
        .bytes()
        .any(|b| matches!(b.to_ascii_lowercase(), b'a'..=b'f'))
}

fn parse_hex(digits: &str) -> Option<i64> {
    i64::from_str_radix(digits, 16).ok()
}
