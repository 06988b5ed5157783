// src/catalog/timecode.rs

//! Timecode parsing for operation parameters.
//!
//! Accepted forms, matching what the upstream request classifier produces:
//! - `HH:MM:SS` (fractional seconds allowed)
//! - `MM:SS`
//! - plain seconds (`"90"`, `"7.5"`)

/// Parse a timecode string into non-negative seconds.
///
/// Returns a human-readable reason on failure; the caller wraps it into a
/// `ValidationError::InvalidParameter`.
pub fn parse_timecode(s: &str) -> Result<f64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty time value".to_string());
    }

    let parts: Vec<&str> = s.split(':').collect();
    let numbers: Vec<f64> = parts
        .iter()
        .map(|p| parse_component(p))
        .collect::<Result<_, _>>()?;

    let secs = match numbers.as_slice() {
        [h, m, s] => h * 3600.0 + m * 60.0 + s,
        [m, s] => m * 60.0 + s,
        [s] => *s,
        _ => return Err(format!("expected HH:MM:SS, MM:SS or seconds, got '{s}'")),
    };

    Ok(secs)
}

fn parse_component(part: &str) -> Result<f64, String> {
    let part = part.trim();
    if part.is_empty() {
        return Err("empty time component".to_string());
    }
    let value: f64 = part
        .parse()
        .map_err(|_| format!("'{part}' is not a number"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("time component '{part}' must be non-negative"));
    }
    Ok(value)
}

/// Format seconds as an ffmpeg argument value.
///
/// Whole values print without a fractional part (`50`, not `50.000`).
pub fn format_seconds(secs: f64) -> String {
    if secs.fract() == 0.0 {
        format!("{}", secs as u64)
    } else {
        format!("{secs:.3}")
    }
}
