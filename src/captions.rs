//! Caption and timestamp text generation.
//!
//! Pure functions over segment slices: no I/O, no wall clock, no locale.
//! Identical input yields byte-identical output across runs.

use murmur_core::Segment;

/// Format elapsed seconds as `HH:MM:SS,mmm`.
///
/// Milliseconds are truncated, not rounded. Hours count elapsed time, so
/// values past a day render as `25:00:00,000` rather than wrapping.
pub fn format_timestamp(seconds: f64) -> String {
    let (hours, minutes, secs, millis) = split_units(seconds);
    format!("{hours:02}:{minutes:02}:{secs:02},{millis:03}")
}

fn vtt_timestamp(seconds: f64) -> String {
    format_timestamp(seconds).replace(',', ".")
}

fn whole_timestamp(seconds: f64) -> String {
    let (hours, minutes, secs, _) = split_units(seconds);
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

fn split_units(seconds: f64) -> (u64, u64, u64, u64) {
    let total_millis = (seconds * 1000.0).floor() as u64;
    let total_seconds = total_millis / 1000;
    (
        total_seconds / 3600,
        (total_seconds % 3600) / 60,
        total_seconds % 60,
        total_millis % 1000,
    )
}

/// Render segments as an SRT document: 1-based sequence number,
/// comma-decimal timestamps, trimmed text, blocks separated by blank
/// lines.
pub fn generate_srt(segments: &[Segment]) -> String {
    segments
        .iter()
        .enumerate()
        .map(|(index, seg)| {
            format!(
                "{}\n{} --> {}\n{}\n",
                index + 1,
                format_timestamp(seg.start),
                format_timestamp(seg.end),
                seg.text.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render segments as WebVTT: `WEBVTT` header, dot-decimal timestamps, no
/// sequence numbers.
pub fn generate_vtt(segments: &[Segment]) -> String {
    let body = segments
        .iter()
        .map(|seg| {
            format!(
                "{} --> {}\n{}\n",
                vtt_timestamp(seg.start),
                vtt_timestamp(seg.end),
                seg.text.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("WEBVTT\n\n{body}")
}

/// Render `[HH:MM:SS - HH:MM:SS] text` lines, fractional seconds dropped.
pub fn generate_timestamped_text(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|seg| {
            format!(
                "[{} - {}] {}",
                whole_timestamp(seg.start),
                whole_timestamp(seg.end),
                seg.text.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
