/*!
 * Segmentation engine: turns transcription output into subtitle cues.
 *
 * Two policies are available:
 * - word count: group the flat word stream into cues of at most N words
 * - natural: one cue per engine utterance, followed by a contiguity repair
 *   pass so playback never shows dead air between cues
 */

use log::debug;

use crate::subtitle_processor::SubtitleCue;
use crate::transcription::{TimedWord, Transcript, Utterance};

/// How cues are cut from a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentationPolicy {
    /// Close a cue every `n` words (n >= 1)
    WordCount(usize),
    /// Keep the engine's utterance boundaries
    Natural,
}

impl SegmentationPolicy {
    pub fn from_options(words_per_cue: usize, natural_segmentation: bool) -> Self {
        if natural_segmentation {
            Self::Natural
        } else {
            Self::WordCount(words_per_cue.max(1))
        }
    }
}

/// Run the selected policy over a transcript
///
/// The natural policy is the only one that receives the contiguity repair,
/// and it orders cues by start before repairing.
pub fn segment(transcript: &Transcript, policy: SegmentationPolicy) -> Vec<SubtitleCue> {
    let cues = match policy {
        SegmentationPolicy::WordCount(words_per_cue) => {
            segment_by_word_count(&transcript.words, words_per_cue)
        }
        SegmentationPolicy::Natural => {
            let mut cues = segment_by_utterance(&transcript.utterances);
            cues.sort_by(|a, b| a.start.total_cmp(&b.start));
            repair_contiguity(&mut cues);
            cues
        }
    };
    debug!("Segmented transcript into {} cues ({:?})", cues.len(), policy);
    cues
}

/// Group words into cues of `words_per_cue` words; the last cue may be shorter
pub fn segment_by_word_count(words: &[TimedWord], words_per_cue: usize) -> Vec<SubtitleCue> {
    words
        .chunks(words_per_cue.max(1))
        .filter_map(|group| {
            let first = group.first()?;
            let last = group.last()?;
            let text = group
                .iter()
                .map(|w| w.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            Some(SubtitleCue::new(first.start, last.end, text.trim()))
        })
        .collect()
}

/// Map each utterance straight to a cue
pub fn segment_by_utterance(utterances: &[Utterance]) -> Vec<SubtitleCue> {
    utterances
        .iter()
        .map(|u| SubtitleCue::new(u.start, u.end, u.text.trim()))
        .collect()
}

/// Close gaps between consecutive cues
///
/// A cue whose end falls strictly before the next cue's start is extended to
/// that start. Touching or overlapping cues are left alone, so running the
/// pass twice changes nothing.
pub fn repair_contiguity(cues: &mut [SubtitleCue]) {
    for i in 1..cues.len() {
        let next_start = cues[i].start;
        let current = &mut cues[i - 1];
        if next_start > current.end {
            current.end = next_start;
        }
    }
}
