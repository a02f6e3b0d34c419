/*!
 * Data types produced by the transcription stage.
 */

use serde::{Deserialize, Serialize};

/// A single recognized word with its time span in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedWord {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

impl TimedWord {
    /// Build a word, returning `None` when the text is blank after trimming
    ///
    /// Negative starts are clamped to zero and `end` is raised to `start`
    /// when the engine reports an inverted span.
    pub fn new(text: &str, start: f64, end: f64) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let start = start.max(0.0);
        Some(Self {
            text: text.to_string(),
            start,
            end: end.max(start),
        })
    }
}

/// A natural speech segment as reported by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

/// Word timing exactly as an engine reported it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawWord {
    #[serde(alias = "text")]
    pub word: String,
    pub start: f64,
    pub end: f64,
}

/// Segment exactly as an engine reported it, word timing optional
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSegment {
    pub text: String,
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub words: Option<Vec<RawWord>>,
}

impl RawSegment {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
            words: None,
        }
    }

    pub fn with_words(mut self, words: Vec<RawWord>) -> Self {
        self.words = Some(words);
        self
    }
}

/// Normalized transcription result: a flat word stream plus the utterances
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    pub words: Vec<TimedWord>,
    pub utterances: Vec<Utterance>,
}

impl Transcript {
    /// Normalize raw engine segments into words and utterances
    ///
    /// Segments without word timing get synthesized timing: the segment span
    /// is divided evenly over its whitespace-separated words. Words and
    /// utterances come out ordered by start time whatever order the engine
    /// listed them in; ties keep engine order.
    pub fn from_segments(segments: Vec<RawSegment>) -> Self {
        let mut transcript = Transcript::default();

        for segment in segments {
            let text = segment.text.trim();
            let start = segment.start.max(0.0);
            let end = segment.end.max(start);

            match segment.words.as_deref() {
                Some(words) if !words.is_empty() => {
                    transcript.words.extend(
                        words
                            .iter()
                            .filter_map(|w| TimedWord::new(&w.word, w.start, w.end)),
                    );
                }
                _ => transcript.words.extend(synthesize_word_timing(text, start, end)),
            }

            if !text.is_empty() {
                transcript.utterances.push(Utterance {
                    text: text.to_string(),
                    start,
                    end,
                });
            }
        }

        transcript.words.sort_by(|a, b| a.start.total_cmp(&b.start));
        transcript.utterances.sort_by(|a, b| a.start.total_cmp(&b.start));
        transcript
    }

    /// True when the engine found nothing to subtitle
    pub fn is_empty(&self) -> bool {
        self.words.is_empty() && self.utterances.is_empty()
    }
}

/// Spread an utterance's span evenly across its words
///
/// Word `i` of `n` covers `[start + i*d, start + (i+1)*d)` with
/// `d = (end - start) / n`.
pub fn synthesize_word_timing(text: &str, start: f64, end: f64) -> Vec<TimedWord> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.is_empty() {
        return Vec::new();
    }

    let duration = (end - start).max(0.0) / tokens.len() as f64;
    tokens
        .iter()
        .enumerate()
        .filter_map(|(i, token)| {
            TimedWord::new(token, start + i as f64 * duration, start + (i + 1) as f64 * duration)
        })
        .collect()
}
