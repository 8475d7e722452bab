//! Playhead time helpers.
//!
//! Positions are plain seconds (`f64`). The shared playhead is only ever
//! sampled from a playing unit, so frame-exact arithmetic is not needed.

/// Format a playhead position as `m:ss` for the transport display.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// Convert a frame index to seconds.
#[inline]
pub fn frames_to_seconds(frames: usize, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    frames as f64 / sample_rate as f64
}

/// Convert seconds to a frame index, flooring and clamping negatives to 0.
#[inline]
pub fn seconds_to_frames(seconds: f64, sample_rate: u32) -> usize {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * sample_rate as f64).floor() as usize
}
