//! Incremental sentence boundary detection over a streamed token sequence
//! (spec.md §4.3).
//!
//! Boundaries are the shortest suffix ending in `.`, `!`, `?`, `\n`, or the
//! Devanagari danda `।`, followed by whitespace or end-of-stream, and
//! yielding a buffer of at least 3 non-space characters. Abbreviations are
//! not disambiguated — acceptable for short spoken replies.

use parking_lot::Mutex;

const TERMINATORS: [char; 5] = ['.', '!', '?', '\n', '।'];
const MIN_SENTENCE_CHARS: usize = 3;

#[derive(Default)]
struct Inner {
    buffer: String,
}

/// Fed one LLM token (or any substring) at a time; emits completed
/// sentences as they become available and a final flush at stream end.
pub struct SentenceSplitter {
    inner: Mutex<Inner>,
}

impl SentenceSplitter {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Append `token` to the buffer and drain any whole sentences now
    /// available, in order.
    pub fn push(&self, token: &str) -> Vec<String> {
        let mut inner = self.inner.lock();
        inner.buffer.push_str(token);
        drain_sentences(&mut inner.buffer)
    }

    /// Called once at LLM stream end: flush whatever remains in the buffer
    /// as a final sentence, provided it is non-empty after trimming.
    pub fn flush(&self) -> Option<String> {
        let mut inner = self.inner.lock();
        let remaining = std::mem::take(&mut inner.buffer);
        let trimmed = remaining.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

impl Default for SentenceSplitter {
    fn default() -> Self {
        Self::new()
    }
}

/// Scan `buffer` for every sentence boundary, remove the consumed prefix,
/// and return the trimmed sentences in order.
fn drain_sentences(buffer: &mut String) -> Vec<String> {
    let mut sentences = Vec::new();

    loop {
        let chars: Vec<char> = buffer.chars().collect();
        let mut boundary_end: Option<usize> = None;

        for (i, &c) in chars.iter().enumerate() {
            if !TERMINATORS.contains(&c) {
                continue;
            }
            // A terminator at the very end of the buffer is not a boundary
            // here: it might be the start of a decimal, an ellipsis, or an
            // abbreviation whose continuation hasn't arrived yet. Only
            // `flush()` (end of stream) treats end-of-buffer as final.
            let followed_by_boundary = matches!(chars.get(i + 1), Some(next) if next.is_whitespace());
            if !followed_by_boundary {
                continue;
            }
            let candidate: String = chars[..=i].iter().collect();
            if candidate.chars().filter(|c| !c.is_whitespace()).count() < MIN_SENTENCE_CHARS {
                continue;
            }
            boundary_end = Some(i);
            break;
        }

        let Some(end) = boundary_end else {
            break;
        };

        let consumed: String = chars[..=end].iter().collect();
        let rest: String = chars[end + 1..].iter().collect();
        let trimmed = consumed.trim().to_string();
        if !trimmed.is_empty() {
            sentences.push(trimmed);
        }
        *buffer = rest;
    }

    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_sentence_emitted_on_terminator() {
        let splitter = SentenceSplitter::new();
        assert!(splitter.push("Hello").is_empty());
        let out = splitter.push(" world. ");
        assert_eq!(out, vec!["Hello world."]);
    }

    #[test]
    fn multiple_sentences_in_one_push() {
        let splitter = SentenceSplitter::new();
        let out = splitter.push("Hi there! How are you? ");
        assert_eq!(out, vec!["Hi there!", "How are you?"]);
    }

    #[test]
    fn devanagari_danda_is_a_terminator() {
        let splitter = SentenceSplitter::new();
        let out = splitter.push("नमस्ते। ");
        assert_eq!(out, vec!["नमस्ते।"]);
    }

    #[test]
    fn short_fragment_below_min_chars_is_not_a_boundary() {
        let splitter = SentenceSplitter::new();
        // "Ok." is 3 non-space chars including the period -> boundary.
        // "Hi." is also 3. Try something genuinely too short: "I. "
        let out = splitter.push("I. ");
        assert!(out.is_empty(), "too short to count as a sentence: {out:?}");
    }

    #[test]
    fn terminator_not_followed_by_whitespace_is_not_a_boundary() {
        let splitter = SentenceSplitter::new();
        // "3.14" - the period is not followed by whitespace, so no split.
        let out = splitter.push("Pi is 3.14 exactly. ");
        assert_eq!(out, vec!["Pi is 3.14 exactly."]);
    }

    #[test]
    fn one_token_at_a_time_matches_all_at_once() {
        let text = "Hello there. How are you doing today? Fine, thanks.";
        let incremental = SentenceSplitter::new();
        let mut got_incremental = Vec::new();
        for ch in text.chars() {
            got_incremental.extend(incremental.push(&ch.to_string()));
        }
        if let Some(tail) = incremental.flush() {
            got_incremental.push(tail);
        }

        let bulk = SentenceSplitter::new();
        let mut got_bulk = bulk.push(text);
        if let Some(tail) = bulk.flush() {
            got_bulk.push(tail);
        }

        assert_eq!(got_incremental, got_bulk);
    }

    #[test]
    fn trailing_unterminated_token_is_flushed_at_stream_end() {
        let splitter = SentenceSplitter::new();
        assert!(splitter.push("no terminator here").is_empty());
        assert_eq!(splitter.flush().as_deref(), Some("no terminator here"));
    }

    #[test]
    fn flush_of_empty_buffer_yields_nothing() {
        let splitter = SentenceSplitter::new();
        splitter.push("Done. ");
        assert_eq!(splitter.flush(), None);
    }

    #[test]
    fn decimal_split_across_token_boundary_is_not_a_sentence_end() {
        let splitter = SentenceSplitter::new();
        assert!(splitter.push("The price is 12.").is_empty());
        assert!(splitter.push("5 dollars.").is_empty());
        assert_eq!(splitter.flush().as_deref(), Some("The price is 12.5 dollars."));
    }

    #[test]
    fn terminator_at_end_of_current_token_waits_for_more_input() {
        let splitter = SentenceSplitter::new();
        assert_eq!(splitter.push("Ab."), Vec::<String>::new());
        assert_eq!(splitter.push("cd"), Vec::<String>::new());
        assert_eq!(splitter.flush().as_deref(), Some("Ab.cd"));
    }

    #[test]
    fn concatenation_round_trips_modulo_whitespace() {
        let text = "First sentence. Second one! Third?  trailing";
        let splitter = SentenceSplitter::new();
        let mut all = splitter.push(text);
        if let Some(tail) = splitter.flush() {
            all.push(tail);
        }
        let joined: String = all.join(" ");
        let normalize = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(normalize(&joined), normalize(text));
    }
}
