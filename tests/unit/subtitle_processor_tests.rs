/*!
 * Tests for timestamp formatting and SRT serialization
 */

use anyhow::Result;
use subtitle_forge::subtitle_processor::{
    SubtitleCue, SubtitleEntry, count_cues, format_timestamp, parse_srt_string, serialize_cues, write_to_srt,
};
use crate::common;

/// Test that clock strings carry every component with fixed widths
#[test]
fn test_format_timestamp_withMixedComponents_shouldPadEachField() {
    assert_eq!(format_timestamp(0.0), "00:00:00,000");
    assert_eq!(format_timestamp(3661.5), "01:01:01,500");
    assert_eq!(format_timestamp(59.999), "00:00:59,999");
    assert_eq!(format_timestamp(7.25), "00:00:07,250");
}

/// Test that sub-millisecond fractions are truncated, not rounded
#[test]
fn test_format_timestamp_withSubMillisecondFraction_shouldTruncate() {
    assert_eq!(format_timestamp(1.0009), "00:00:01,000");
    assert_eq!(format_timestamp(0.0999), "00:00:00,099");
}

/// Test that hours keep growing past two digits
#[test]
fn test_format_timestamp_withHundredHours_shouldNotWrap() {
    assert_eq!(format_timestamp(360_000.0), "100:00:00,000");
}

/// Test that negative and non-finite inputs clamp to zero
#[test]
fn test_format_timestamp_withInvalidSeconds_shouldClampToZero() {
    assert_eq!(format_timestamp(-3.0), "00:00:00,000");
    assert_eq!(format_timestamp(f64::NAN), "00:00:00,000");
}

/// Test the exact bytes of a two cue document
#[test]
fn test_serialize_cues_withTwoCues_shouldProduceExactBlocks() {
    let cues = vec![
        SubtitleCue::new(0.0, 1.0, "hello world"),
        SubtitleCue::new(1.0, 1.3, "foo"),
    ];

    let srt = serialize_cues(&cues);

    assert_eq!(
        srt,
        "1\n00:00:00,000 --> 00:00:01,000\nhello world\n\n2\n00:00:01,000 --> 00:00:01,300\nfoo\n\n"
    );
}

/// Test that serialization depends only on the cues
#[test]
fn test_serialize_cues_withSameInputTwice_shouldBeByteIdentical() {
    let cues = vec![
        SubtitleCue::new(0.5, 2.25, "first"),
        SubtitleCue::new(2.25, 4.0, "second line"),
    ];
    assert_eq!(serialize_cues(&cues), serialize_cues(&cues.clone()));
}

/// Test that an empty cue list serializes to nothing
#[test]
fn test_serialize_cues_withNoCues_shouldBeEmpty() {
    assert_eq!(serialize_cues(&[]), "");
}

/// Test that blank lines inside cue text cannot split a block
#[test]
fn test_serialize_cues_withBlankLineInText_shouldKeepSingleBlock() {
    let cues = vec![SubtitleCue::new(0.0, 1.0, "top\n\nbottom")];
    let srt = serialize_cues(&cues);

    assert_eq!(srt, "1\n00:00:00,000 --> 00:00:01,000\ntop\nbottom\n\n");
    assert_eq!(count_cues(&srt), 1);
}

/// Test that serialized output parses back with sequential numbering
#[test]
fn test_parse_srt_string_withSerializedCues_shouldNumberFromOne() -> Result<()> {
    let cues = vec![
        SubtitleCue::new(0.0, 1.0, "a"),
        SubtitleCue::new(1.0, 2.0, "b"),
        SubtitleCue::new(2.0, 3.5, "c"),
    ];

    let entries = parse_srt_string(&serialize_cues(&cues))?;

    let numbers: Vec<usize> = entries.iter().map(|e| e.seq_num).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(entries[2].end_time_ms, 3500);
    Ok(())
}

/// Test timestamp parsing on valid and malformed input
#[test]
fn test_parse_timestamp_withValidAndInvalidInput_shouldParseOrFail() {
    assert_eq!(SubtitleEntry::parse_timestamp("01:02:03,456").unwrap(), 3_723_456);
    assert!(SubtitleEntry::parse_timestamp("01:02:03").is_err());
    assert!(SubtitleEntry::parse_timestamp("00:61:00,000").is_err());
}

/// Test that cues with an inverted span are raised to a zero-length span
#[test]
fn test_subtitleCue_withEndBeforeStart_shouldClampEnd() {
    let cue = SubtitleCue::new(2.0, 1.0, "x");
    assert_eq!(cue.end, 2.0);
    assert_eq!(cue.duration(), 0.0);
}

/// Test writing an SRT file into a directory that does not exist yet
#[test]
fn test_write_to_srt_withMissingParent_shouldCreateDirectories() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("nested").join("out.srt");

    write_to_srt(&[SubtitleCue::new(0.0, 1.0, "hi")], &path)?;

    let content = std::fs::read_to_string(&path)?;
    assert_eq!(content, "1\n00:00:00,000 --> 00:00:01,000\nhi\n\n");
    Ok(())
}
