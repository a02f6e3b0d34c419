/*!
 * Tests for transcript normalization and cue segmentation
 */

use subtitle_forge::segmentation::{SegmentationPolicy, segment};
use subtitle_forge::subtitle_processor::{SubtitleCue, serialize_cues};
use subtitle_forge::transcription::{RawSegment, RawWord, Transcript, Utterance};

fn raw_word(word: &str, start: f64, end: f64) -> RawWord {
    RawWord {
        word: word.to_string(),
        start,
        end,
    }
}

/// Test that engine word timing is used when present
#[test]
fn test_from_segments_withWordTiming_shouldKeepEngineWords() {
    let transcript = Transcript::from_segments(vec![
        RawSegment::new("hello world", 0.0, 1.0)
            .with_words(vec![raw_word(" hello", 0.0, 0.4), raw_word("world ", 0.6, 1.0)]),
    ]);

    assert_eq!(transcript.words.len(), 2);
    assert_eq!(transcript.words[0].text, "hello");
    assert_eq!(transcript.words[1].start, 0.6);
    assert_eq!(transcript.utterances.len(), 1);
}

/// Test that words are spread evenly when the engine gives none
#[test]
fn test_from_segments_withoutWordTiming_shouldSynthesizeEvenSpans() {
    let transcript = Transcript::from_segments(vec![RawSegment::new("one two three four", 2.0, 4.0)]);

    let spans: Vec<(f64, f64)> = transcript.words.iter().map(|w| (w.start, w.end)).collect();
    assert_eq!(spans, vec![(2.0, 2.5), (2.5, 3.0), (3.0, 3.5), (3.5, 4.0)]);
}

/// Test that blank segments and blank words disappear
#[test]
fn test_from_segments_withBlankText_shouldProduceEmptyTranscript() {
    let transcript = Transcript::from_segments(vec![
        RawSegment::new("   ", 0.0, 1.0),
        RawSegment::new("", 1.0, 2.0).with_words(vec![raw_word(" ", 1.0, 1.5)]),
    ]);

    assert!(transcript.is_empty());
}

/// Test the word-count policy end to end through serialization
#[test]
fn test_segment_withWordCountPolicy_shouldGroupAndSerialize() {
    let transcript = Transcript::from_segments(vec![
        RawSegment::new("hello world foo", 0.0, 1.3).with_words(vec![
            raw_word("hello", 0.0, 0.5),
            raw_word("world", 0.5, 1.0),
            raw_word("foo", 1.0, 1.3),
        ]),
    ]);

    let cues = segment(&transcript, SegmentationPolicy::WordCount(2));

    assert_eq!(
        serialize_cues(&cues),
        "1\n00:00:00,000 --> 00:00:01,000\nhello world\n\n2\n00:00:01,000 --> 00:00:01,300\nfoo\n\n"
    );
}

/// Test that a words-per-cue larger than the stream yields one cue
#[test]
fn test_segment_withLargeWordCount_shouldEmitSingleCue() {
    let transcript = Transcript::from_segments(vec![RawSegment::new("a b c", 0.0, 3.0)]);

    let cues = segment(&transcript, SegmentationPolicy::WordCount(50));

    assert_eq!(cues.len(), 1);
    assert_eq!(cues[0].text, "a b c");
    assert_eq!((cues[0].start, cues[0].end), (0.0, 3.0));
}

/// Test that word-count cues keep the silence between words
#[test]
fn test_segment_withWordCountPolicy_shouldNotRepairGaps() {
    let transcript = Transcript::from_segments(vec![
        RawSegment::new("first", 0.0, 1.0),
        RawSegment::new("second", 5.0, 6.0),
    ]);

    let cues = segment(&transcript, SegmentationPolicy::WordCount(1));

    assert_eq!(cues[0].end, 1.0);
    assert_eq!(cues[1].start, 5.0);
}

/// Test that natural cues follow utterances and close the gaps between them
#[test]
fn test_segment_withNaturalPolicy_shouldExtendCuesToNextStart() {
    let transcript = Transcript::from_segments(vec![
        RawSegment::new("first sentence", 0.0, 1.0),
        RawSegment::new("second", 2.5, 3.0),
        RawSegment::new("third", 2.8, 4.0),
    ]);

    let cues = segment(&transcript, SegmentationPolicy::Natural);

    assert_eq!(cues.len(), 3);
    assert_eq!(cues[0].text, "first sentence");
    assert_eq!(cues[0].end, 2.5);
    // overlapping neighbours are left alone
    assert_eq!(cues[1].end, 3.0);
    assert_eq!(cues[2].end, 4.0);
}

/// Test that shuffled engine segments still give ordered, gap-free cues
#[test]
fn test_segment_withShuffledSegments_shouldOrderCuesByStart() {
    let transcript = Transcript::from_segments(vec![
        RawSegment::new("late", 5.0, 6.0),
        RawSegment::new("early", 1.0, 2.0),
        RawSegment::new("middle", 3.0, 4.0),
    ]);

    let natural = serialize_cues(&segment(&transcript, SegmentationPolicy::Natural));
    assert_eq!(
        natural,
        "1\n00:00:01,000 --> 00:00:03,000\nearly\n\n\
         2\n00:00:03,000 --> 00:00:05,000\nmiddle\n\n\
         3\n00:00:05,000 --> 00:00:06,000\nlate\n\n"
    );

    let by_words = segment(&transcript, SegmentationPolicy::WordCount(2));
    let texts: Vec<&str> = by_words.iter().map(|cue| cue.text.as_str()).collect();
    assert_eq!(texts, vec!["early middle", "late"]);
}

/// Test that hand-built utterances out of order are sorted before repair
#[test]
fn test_segment_withUnorderedUtterances_shouldSortBeforeRepair() {
    let transcript = Transcript {
        words: Vec::new(),
        utterances: vec![
            Utterance {
                text: "late".to_string(),
                start: 5.0,
                end: 6.0,
            },
            Utterance {
                text: "early".to_string(),
                start: 1.0,
                end: 2.0,
            },
        ],
    };

    let cues = segment(&transcript, SegmentationPolicy::Natural);
    assert_eq!(cues[0], SubtitleCue::new(1.0, 5.0, "early"));
    assert_eq!(cues[1], SubtitleCue::new(5.0, 6.0, "late"));
}

/// Test how job options pick the policy
#[test]
fn test_policy_fromOptions_shouldPreferNaturalFlag() {
    assert_eq!(SegmentationPolicy::from_options(4, true), SegmentationPolicy::Natural);
    assert_eq!(SegmentationPolicy::from_options(4, false), SegmentationPolicy::WordCount(4));
}
