//! Recursive, tokenizer-aware text splitter.
//!
//! Splits a document into ordered chunks whose token counts stay within a
//! configured ceiling, with a configured token overlap carried between
//! consecutive chunks. Splitting walks a fixed separator ladder from
//! coarse to fine (paragraph break, line break, sentence end, space) and
//! falls back to a sliding token window when no separator can make a
//! segment small enough.
//!
//! # Guarantees
//!
//! - Every emitted chunk's token count is at most `chunk_size`.
//! - No non-whitespace content is dropped; overlapped spans are duplicated.
//! - Empty or whitespace-only input yields zero chunks, and a chunk that
//!   would be entirely whitespace is never emitted.
//! - With `chunk_overlap = 0` and no whitespace-only drops, concatenating
//!   the chunks in order reproduces the input exactly.
//!
//! Recursion depth is bounded by the ladder length; the terminal empty
//! separator always makes progress by slicing at the token level, so
//! termination does not depend on the input.

use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::tokenizer::Tokenizer;

/// Separator ladder, coarsest first. The empty string is the terminal
/// token-window case.
const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// Token-budgeted recursive splitter.
///
/// Pure with respect to its input: `split` returns the full ordered chunk
/// list or the first tokenizer error, never a partial list.
pub struct TextSplitter<'a> {
    chunk_size: usize,
    chunk_overlap: usize,
    tokenizer: &'a dyn Tokenizer,
}

impl<'a> TextSplitter<'a> {
    pub fn new(config: &ChunkingConfig, tokenizer: &'a dyn Tokenizer) -> Self {
        Self {
            chunk_size: config.chunk_size.max(1),
            chunk_overlap: config.chunk_overlap,
            tokenizer,
        }
    }

    /// Split `text` into ordered chunks within the token budget.
    pub fn split(&self, text: &str) -> Result<Vec<String>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.split_at_level(text, 0)
    }

    fn split_at_level(&self, text: &str, level: usize) -> Result<Vec<String>> {
        let separator = SEPARATORS[level.min(SEPARATORS.len() - 1)];
        if separator.is_empty() {
            return self.split_token_window(text);
        }

        // Re-attach the separator to the front of every segment after the
        // first so that concatenating segments reproduces the input.
        let mut segments: Vec<String> = Vec::new();
        for (i, part) in text.split(separator).enumerate() {
            if i == 0 {
                segments.push(part.to_string());
            } else {
                segments.push(format!("{}{}", separator, part));
            }
        }

        let mut chunks: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_tokens = 0usize;

        for segment in segments {
            let segment_tokens = self.tokenizer.token_count(&segment)?;

            // A segment that alone exceeds the budget is split with the
            // next-finer separator; the accumulation restarts after it.
            if segment_tokens > self.chunk_size {
                self.emit(&mut chunks, &current);
                current.clear();
                current_tokens = 0;
                chunks.extend(self.split_at_level(&segment, level + 1)?);
                continue;
            }

            if current_tokens + segment_tokens <= self.chunk_size {
                current.push_str(&segment);
                current_tokens += segment_tokens;
                continue;
            }

            // Overflow: close the current chunk and seed the next one with
            // an overlap tail from its end.
            self.emit(&mut chunks, &current);
            let tail = self.overlap_tail(&current)?;
            let seeded = format!("{}{}", tail, segment);
            let seeded_tokens = self.tokenizer.token_count(&seeded)?;
            if seeded_tokens > self.chunk_size {
                // The seed plus the segment cannot fit either; give the
                // combined text to the next-finer separator instead of
                // emitting an oversized chunk.
                current.clear();
                current_tokens = 0;
                chunks.extend(self.split_at_level(&seeded, level + 1)?);
            } else {
                current = seeded;
                current_tokens = seeded_tokens;
            }
        }

        self.emit(&mut chunks, &current);
        Ok(chunks)
    }

    /// Terminal case: slide a token window of width `chunk_size` with step
    /// `chunk_size - chunk_overlap` (at least 1), decoding each window.
    fn split_token_window(&self, text: &str) -> Result<Vec<String>> {
        let ids = self.tokenizer.encode(text)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let step = self.chunk_size.saturating_sub(self.chunk_overlap).max(1);
        let mut chunks = Vec::new();
        let mut start = 0usize;
        loop {
            let end = (start + self.chunk_size).min(ids.len());
            let window = self.tokenizer.decode(&ids[start..end])?;
            self.emit(&mut chunks, &window);
            if end == ids.len() {
                break;
            }
            start += step;
        }
        Ok(chunks)
    }

    /// Trailing text worth approximately `chunk_overlap` tokens, used to
    /// seed the next chunk after a close.
    fn overlap_tail(&self, closed: &str) -> Result<String> {
        if self.chunk_overlap == 0 || closed.is_empty() {
            return Ok(String::new());
        }
        let ids = self.tokenizer.encode(closed)?;
        if ids.len() <= self.chunk_overlap {
            return Ok(closed.to_string());
        }
        self.tokenizer.decode(&ids[ids.len() - self.chunk_overlap..])
    }

    fn emit(&self, chunks: &mut Vec<String>, candidate: &str) {
        if !candidate.trim().is_empty() {
            chunks.push(candidate.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::testing::{CharTokenizer, FailingTokenizer, WordTokenizer};

    fn splitter(size: usize, overlap: usize, tokenizer: &dyn Tokenizer) -> TextSplitter<'_> {
        TextSplitter::new(
            &ChunkingConfig {
                chunk_size: size,
                chunk_overlap: overlap,
            },
            tokenizer,
        )
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        let tok = WordTokenizer::new();
        let s = splitter(450, 50, &tok);
        assert!(s.split("").unwrap().is_empty());
        assert!(s.split("   \n\n \t ").unwrap().is_empty());
    }

    #[test]
    fn test_short_input_single_chunk() {
        let tok = WordTokenizer::new();
        let s = splitter(450, 50, &tok);
        let chunks = s.split("a small note about nothing").unwrap();
        assert_eq!(chunks, vec!["a small note about nothing".to_string()]);
    }

    #[test]
    fn test_paragraphs_accumulate_within_budget() {
        let tok = WordTokenizer::new();
        let s = splitter(450, 50, &tok);
        let text = "first paragraph here\n\nsecond paragraph here\n\nthird one";
        let chunks = s.split(text).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], text);
    }

    #[test]
    fn test_budget_forces_paragraph_split() {
        let tok = WordTokenizer::new();
        let s = splitter(6, 0, &tok);
        let text = "one two three four\n\nfive six seven eight\n\nnine ten";
        let chunks = s.split(text).unwrap();
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(tok.token_count(chunk).unwrap() <= 6);
        }
    }

    #[test]
    fn test_zero_overlap_concatenation_is_lossless() {
        let tok = WordTokenizer::new();
        let s = splitter(6, 0, &tok);
        let text = "one two three four\n\nfive six seven eight\n\nnine ten eleven";
        let chunks = s.split(text).unwrap();
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_no_word_is_dropped_with_overlap() {
        let tok = WordTokenizer::new();
        let s = splitter(8, 2, &tok);
        let text = "alpha beta gamma delta\n\nepsilon zeta eta theta\n\niota kappa lambda mu";
        let chunks = s.split(text).unwrap();
        let rejoined = chunks.join(" ");
        for word in text.split_whitespace() {
            assert!(rejoined.contains(word), "word '{}' was dropped", word);
        }
        for chunk in &chunks {
            assert!(tok.token_count(chunk).unwrap() <= 8);
        }
    }

    #[test]
    fn test_overlap_duplicates_trailing_words() {
        let tok = WordTokenizer::new();
        let s = splitter(4, 2, &tok);
        // Single level: spaces only, so the " " ladder rung does the work.
        let text = "w1 w2 w3 w4 w5 w6 w7 w8";
        let chunks = s.split(text).unwrap();
        assert!(chunks.len() >= 2);
        // Each chunk after the first starts with the tail of its predecessor.
        for pair in chunks.windows(2) {
            let prev_words: Vec<&str> = pair[0].split_whitespace().collect();
            let tail = prev_words[prev_words.len().saturating_sub(2)..].join(" ");
            assert!(
                pair[1].trim_start().starts_with(&tail),
                "chunk '{}' does not start with overlap '{}'",
                pair[1],
                tail
            );
        }
    }

    #[test]
    fn test_oversized_single_line_recurses() {
        let tok = WordTokenizer::new();
        let s = splitter(450, 50, &tok);
        // One 2000-token paragraph with no line breaks: must recurse down
        // to the space rung rather than emit one oversized chunk.
        let text = (0..2000).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let chunks = s.split(&text).unwrap();
        assert!(chunks.len() >= 5, "expected >= 5 chunks, got {}", chunks.len());
        for chunk in &chunks {
            assert!(tok.token_count(chunk).unwrap() <= 450);
        }
    }

    #[test]
    fn test_token_window_base_case() {
        let tok = CharTokenizer;
        let s = splitter(100, 10, &tok);
        // A single 1000-char word defeats every separator rung.
        let text = "x".repeat(1000);
        let chunks = s.split(&text).unwrap();
        // Window step 90 over 1000 tokens: starts at 0, 90, ..., 900.
        assert_eq!(chunks.len(), 11);
        for chunk in &chunks {
            assert!(chunk.len() <= 100);
        }
        // First window is exact, successive windows restate the overlap.
        assert_eq!(chunks[0], "x".repeat(100));
    }

    #[test]
    fn test_token_window_minimum_step() {
        let tok = CharTokenizer;
        // overlap >= size degenerates to step 1; must still terminate.
        let s = splitter(3, 5, &tok);
        let chunks = s.split("abcdef").unwrap();
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.len() <= 3);
        }
    }

    #[test]
    fn test_whitespace_only_chunks_never_emitted() {
        let tok = WordTokenizer::new();
        let s = splitter(2, 0, &tok);
        let text = "a b\n\n   \n\nc d";
        let chunks = s.split(text).unwrap();
        for chunk in &chunks {
            assert!(!chunk.trim().is_empty());
        }
    }

    #[test]
    fn test_tokenizer_failure_aborts_whole_split() {
        let tok = FailingTokenizer;
        let s = splitter(450, 50, &tok);
        let err = s.split("some text that will not be chunked").unwrap_err();
        assert!(matches!(err, crate::error::MemoryError::Dependency(_)));
    }

    #[test]
    fn test_split_is_deterministic() {
        let tok = WordTokenizer::new();
        let s = splitter(5, 1, &tok);
        let text = "m1 m2 m3 m4 m5 m6 m7\n\nm8 m9 m10 m11 m12 m13";
        let a = s.split(text).unwrap();
        let b = s.split(text).unwrap();
        assert_eq!(a, b);
    }
}
