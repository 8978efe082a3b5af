//! Timestamped meditation script parsing.
//!
//! A script is plain text where each spoken line looks like
//! `[MM:SS] text to speak`. Everything else (blank lines, headings,
//! commentary) is ignored.

use crate::error::{MeditoneError, Result};
use serde::Serialize;

/// One timestamped line of script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    label: String,
    text: String,
    target_offset_seconds: u32,
}

impl Segment {
    /// Timestamp exactly as written in the script, e.g. `"01:30"`.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Spoken content. Never empty.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Seconds from the start of the recording at which speech must begin.
    pub fn target_offset_seconds(&self) -> u32 {
        self.target_offset_seconds
    }

    /// Render the target offset as `MM:SS`.
    pub fn format_offset(&self) -> String {
        format_offset(self.target_offset_seconds)
    }
}

/// Format whole seconds as zero-padded `MM:SS` (minutes may exceed 59).
pub fn format_offset(total_secs: u32) -> String {
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

/// Parse every `[MM:SS] text` line of `raw`, in input order.
///
/// Lines that do not match are skipped. Timestamps are not range-checked
/// (`[00:75]` means 75 seconds) and out-of-order timestamps are kept as
/// written.
///
/// # Errors
/// Returns `NoSegments` if no line matched.
pub fn parse_script(raw: &str) -> Result<Vec<Segment>> {
    let segments: Vec<Segment> = raw.lines().filter_map(parse_line).collect();

    if segments.is_empty() {
        return Err(MeditoneError::NoSegments);
    }

    Ok(segments)
}

/// Target offset of the last segment, a lower bound for the script length.
pub fn script_duration_hint(segments: &[Segment]) -> u32 {
    segments
        .last()
        .map(|s| s.target_offset_seconds)
        .unwrap_or(0)
}

fn parse_line(line: &str) -> Option<Segment> {
    let rest = line.trim().strip_prefix('[')?;
    let (stamp, text) = rest.split_once(']')?;
    let (minutes, seconds) = stamp.split_once(':')?;

    let minutes = parse_digits(minutes)?;
    let seconds = parse_digits(seconds)?;
    let target_offset_seconds = minutes.checked_mul(60)?.checked_add(seconds)?;

    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    Some(Segment {
        label: stamp.to_string(),
        text: text.to_string(),
        target_offset_seconds,
    })
}

/// Parse a non-empty run of ASCII digits. Signs and spaces are rejected.
fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_lines_in_order() {
        let segments = parse_script("[00:00] A\n[00:05] B\n").unwrap();

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].target_offset_seconds(), 0);
        assert_eq!(segments[0].text(), "A");
        assert_eq!(segments[1].target_offset_seconds(), 5);
        assert_eq!(segments[1].text(), "B");
    }

    #[test]
    fn offset_is_minutes_times_sixty_plus_seconds() {
        let segments = parse_script("[02:30] Relax your shoulders.").unwrap();
        assert_eq!(segments[0].target_offset_seconds(), 150);
        assert_eq!(segments[0].label(), "02:30");
    }

    #[test]
    fn skips_lines_without_timestamp() {
        let raw = "Morning meditation\n\n[00:00] Welcome.\nPause here.\n[00:10] Breathe in.\n";
        let segments = parse_script(raw).unwrap();

        let texts: Vec<&str> = segments.iter().map(|s| s.text()).collect();
        assert_eq!(texts, vec!["Welcome.", "Breathe in."]);
    }

    #[test]
    fn only_invalid_lines_is_no_segments() {
        let result = parse_script("Just some text\nwithout timestamps\n");
        assert!(matches!(result, Err(MeditoneError::NoSegments)));
    }

    #[test]
    fn empty_input_is_no_segments() {
        assert!(matches!(parse_script(""), Err(MeditoneError::NoSegments)));
        assert!(matches!(
            parse_script("\n\n  \n"),
            Err(MeditoneError::NoSegments)
        ));
    }

    #[test]
    fn seconds_above_59_are_accepted_as_written() {
        let segments = parse_script("[00:75] Late line").unwrap();
        assert_eq!(segments[0].target_offset_seconds(), 75);
    }

    #[test]
    fn out_of_order_timestamps_keep_input_order() {
        let segments = parse_script("[00:30] second\n[00:10] first\n").unwrap();
        assert_eq!(segments[0].target_offset_seconds(), 30);
        assert_eq!(segments[1].target_offset_seconds(), 10);
    }

    #[test]
    fn timestamp_without_text_is_dropped() {
        let segments = parse_script("[00:00]   \n[00:05] Text").unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text(), "Text");
    }

    #[test]
    fn malformed_timestamps_are_dropped() {
        let raw = "[0a:00] bad\n[:05] bad\n[00-05] bad\n[00:05 bad\n[-1:05] bad\n[ 00:05] bad\n[00:05] good";
        let segments = parse_script(raw).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text(), "good");
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let segments = parse_script("   [01:00]    Let go.   \r\n").unwrap();
        assert_eq!(segments[0].text(), "Let go.");
        assert_eq!(segments[0].target_offset_seconds(), 60);
    }

    #[test]
    fn text_may_contain_brackets() {
        let segments = parse_script("[00:05] Inhale [slowly] and hold").unwrap();
        assert_eq!(segments[0].text(), "Inhale [slowly] and hold");
    }

    #[test]
    fn overflowing_minutes_are_dropped() {
        let raw = "[99999999999:00] too big\n[00:01] fine";
        let segments = parse_script(raw).unwrap();
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn format_offset_pads_minutes_and_seconds() {
        assert_eq!(format_offset(0), "00:00");
        assert_eq!(format_offset(75), "01:15");
        assert_eq!(format_offset(3600), "60:00");
    }

    #[test]
    fn duration_hint_is_last_offset() {
        let segments = parse_script("[00:00] a\n[09:30] b").unwrap();
        assert_eq!(script_duration_hint(&segments), 570);
        assert_eq!(script_duration_hint(&[]), 0);
    }

    #[test]
    fn segment_serializes_for_callers() {
        let segments = parse_script("[00:10] Breathe in.").unwrap();
        let json = serde_json::to_value(&segments[0]).unwrap();
        assert_eq!(json["label"], "00:10");
        assert_eq!(json["text"], "Breathe in.");
        assert_eq!(json["target_offset_seconds"], 10);
    }
}
