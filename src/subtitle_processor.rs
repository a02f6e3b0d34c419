use std::fmt;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use regex::Regex;
use once_cell::sync::Lazy;
use anyhow::{Result, Context, anyhow};
use log::{warn, debug};

// @module: Subtitle cues, timestamp formatting and SRT serialization

// @const: SRT timestamp line regex (hours are unbounded)
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2,}):(\d{2}):(\d{2}),(\d{3}) --> (\d{2,}):(\d{2}):(\d{2}),(\d{3})$").unwrap()
});

/// Convert seconds to whole milliseconds, truncating toward zero
///
/// The value is first rounded to the microsecond so that decimal inputs such
/// as `59.999` (stored as `59.99899999…`) keep their written millisecond.
pub fn seconds_to_millis(seconds: f64) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    let micros = (seconds * 1_000_000.0).round() as u64;
    micros / 1_000
}

/// Format seconds as an SRT clock string (`HH:MM:SS,mmm`)
pub fn format_timestamp(seconds: f64) -> String {
    format_timestamp_ms(seconds_to_millis(seconds))
}

/// Format a timestamp in milliseconds to SRT format (HH:MM:SS,mmm)
pub fn format_timestamp_ms(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

// @struct: One subtitle display unit produced by segmentation
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleCue {
    // @field: Start time in seconds
    pub start: f64,

    // @field: End time in seconds (>= start)
    pub end: f64,

    // @field: Display text, may span several lines
    pub text: String,
}

impl SubtitleCue {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        SubtitleCue {
            start,
            end: end.max(start),
            text: text.into(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

// @struct: Indexed subtitle entry, as written to or read from an SRT file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleEntry {
    // @field: Sequence number (1-based)
    pub seq_num: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Subtitle text
    pub text: String,
}

impl SubtitleEntry {
    pub fn new(seq_num: usize, start_time_ms: u64, end_time_ms: u64, text: String) -> Self {
        SubtitleEntry {
            seq_num,
            start_time_ms,
            end_time_ms,
            text,
        }
    }

    /// Build the entry for a cue at a 1-based position
    pub fn from_cue(seq_num: usize, cue: &SubtitleCue) -> Self {
        SubtitleEntry {
            seq_num,
            start_time_ms: seconds_to_millis(cue.start),
            end_time_ms: seconds_to_millis(cue.end),
            text: cue.text.clone(),
        }
    }

    /// Parse an SRT timestamp to milliseconds
    pub fn parse_timestamp(timestamp: &str) -> Result<u64> {
        let parts: Vec<&str> = timestamp.split(&[':', ','][..]).collect();

        if parts.len() != 4 {
            return Err(anyhow!("Invalid timestamp format: {}", timestamp));
        }

        let hours: u64 = parts[0].parse().context("Failed to parse hours")?;
        let minutes: u64 = parts[1].parse().context("Failed to parse minutes")?;
        let seconds: u64 = parts[2].parse().context("Failed to parse seconds")?;
        let millis: u64 = parts[3].parse().context("Failed to parse milliseconds")?;

        if minutes >= 60 || seconds >= 60 || millis >= 1000 {
            return Err(anyhow!("Invalid time components in timestamp: {}", timestamp));
        }

        Ok(hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis)
    }

    pub fn format_start_time(&self) -> String {
        format_timestamp_ms(self.start_time_ms)
    }

    pub fn format_end_time(&self) -> String {
        format_timestamp_ms(self.end_time_ms)
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.seq_num)?;
        writeln!(f, "{} --> {}", self.format_start_time(), self.format_end_time())?;
        // A blank line inside the text would end the block early
        let mut wrote_text = false;
        for line in self.text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            writeln!(f, "{}", line)?;
            wrote_text = true;
        }
        if !wrote_text {
            writeln!(f)?;
        }
        writeln!(f)
    }
}

/// Serialize cues to SRT text, numbering them 1..=n in input order
///
/// Output depends only on the cues, so serializing the same sequence twice
/// yields identical bytes.
pub fn serialize_cues(cues: &[SubtitleCue]) -> String {
    let mut out = String::new();
    for (i, cue) in cues.iter().enumerate() {
        // Writing to a String cannot fail
        let _ = write!(out, "{}", SubtitleEntry::from_cue(i + 1, cue));
    }
    out
}

/// Count the cue blocks in SRT text
pub fn count_cues(content: &str) -> usize {
    parse_srt_string(content).map(|entries| entries.len()).unwrap_or(0)
}

/// Parse SRT format string into subtitle entries
///
/// Entries keep the sequence numbers found in the file and their order of
/// appearance, so callers can check numbering as well as content.
pub fn parse_srt_string(content: &str) -> Result<Vec<SubtitleEntry>> {
    let mut entries = Vec::new();

    let mut current_seq_num: Option<usize> = None;
    let mut current_times: Option<(u64, u64)> = None;
    let mut current_text = String::new();

    let mut flush = |seq_num: usize, (start_ms, end_ms): (u64, u64), text: &mut String| {
        if end_ms < start_ms {
            warn!("Skipping subtitle entry {} with end before start", seq_num);
        } else {
            entries.push(SubtitleEntry::new(seq_num, start_ms, end_ms, text.trim().to_string()));
        }
        text.clear();
    };

    for (line_number, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            if let (Some(seq_num), Some(times)) = (current_seq_num, current_times) {
                flush(seq_num, times, &mut current_text);
                current_seq_num = None;
                current_times = None;
            }
            continue;
        }

        if current_seq_num.is_none() {
            match trimmed.parse::<usize>() {
                Ok(num) => current_seq_num = Some(num),
                Err(_) => warn!("Unexpected text at line {} before sequence number: {}", line_number + 1, trimmed),
            }
            continue;
        }

        if current_times.is_none() {
            if let Some(caps) = TIMESTAMP_REGEX.captures(trimmed) {
                current_times = Some((parse_timestamp_to_ms(&caps, 1)?, parse_timestamp_to_ms(&caps, 5)?));
            } else {
                warn!("Invalid timestamp line at line {}: {}", line_number + 1, trimmed);
                current_seq_num = None;
            }
            continue;
        }

        if !current_text.is_empty() {
            current_text.push('\n');
        }
        current_text.push_str(trimmed);
    }

    if let (Some(seq_num), Some(times)) = (current_seq_num, current_times) {
        flush(seq_num, times, &mut current_text);
    }

    debug!("Parsed {} subtitle entries", entries.len());
    Ok(entries)
}

fn parse_timestamp_to_ms(caps: &regex::Captures, start_idx: usize) -> Result<u64> {
    let mut parts = [0u64; 4];
    for (offset, part) in parts.iter_mut().enumerate() {
        let raw = caps
            .get(start_idx + offset)
            .map(|m| m.as_str())
            .ok_or_else(|| anyhow!("Missing timestamp component"))?;
        *part = raw.parse().with_context(|| format!("Invalid timestamp component: {}", raw))?;
    }
    let [hours, minutes, seconds, millis] = parts;
    Ok((hours * 3600 + minutes * 60 + seconds) * 1000 + millis)
}

/// Write serialized cues to an SRT file
pub fn write_to_srt<P: AsRef<Path>>(cues: &[SubtitleCue], path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, serialize_cues(cues))
        .with_context(|| format!("Failed to write subtitle file: {}", path.display()))?;

    Ok(())
}
