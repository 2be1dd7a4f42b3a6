//! Recursive character text splitting.
//!
//! Documents are cut into bounded segments by recursively trying an ordered separator
//! cascade: paragraph break, line break, sentence punctuation, comma, space, and finally a
//! hard character split. The earliest separator that yields pieces within the size budget
//! wins, so natural boundaries are preserved whenever they exist and the splitter still
//! terminates on pathological separator-free input. Pieces are then greedily merged into
//! chunks, carrying a bounded tail of the previous chunk forward so consecutive chunks
//! overlap without ever exceeding the configured maximum.
//!
//! Splitting is deterministic: the same input and configuration always produce the same
//! chunk sequence.

use std::collections::VecDeque;

use super::types::ChunkingError;

/// Default chunk budget in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default overlap between consecutive chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Separator cascade tried in order; exhaustion falls back to a character split.
const SEPARATORS: [&str; 7] = ["\n\n", "\n", ".", "!", "?", ",", " "];

/// Character-budget text splitter with overlapping output chunks.
#[derive(Debug, Clone, Copy)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    /// Build a splitter, validating that the overlap leaves room for new content.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        if chunk_overlap >= chunk_size {
            return Err(ChunkingError::OverlapExceedsChunkSize {
                chunk_size,
                chunk_overlap,
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Split `text` into ordered chunks within the size budget.
    ///
    /// Returns an empty vector for all-whitespace input.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let pieces = self.split_recursive(text, 0);
        self.merge(pieces)
    }

    /// Cut text into pieces no larger than the chunk budget, preferring the earliest
    /// separator in the cascade that makes progress.
    fn split_recursive(&self, text: &str, separator_index: usize) -> Vec<String> {
        if char_len(text) <= self.chunk_size {
            return vec![text.to_string()];
        }

        let Some(separator) = SEPARATORS.get(separator_index) else {
            // No separator left: hard character split. Single-character pieces let the
            // merge step rebuild full-size windows with the configured overlap.
            return text.chars().map(String::from).collect();
        };

        let parts: Vec<&str> = text.split_inclusive(separator).collect();
        if parts.len() == 1 {
            return self.split_recursive(text, separator_index + 1);
        }

        let mut pieces = Vec::with_capacity(parts.len());
        for part in parts {
            if char_len(part) <= self.chunk_size {
                pieces.push(part.to_string());
            } else {
                pieces.extend(self.split_recursive(part, separator_index + 1));
            }
        }
        pieces
    }

    /// Greedily pack pieces into chunks, retaining a tail of at most `chunk_overlap`
    /// characters when a chunk is emitted so the next chunk repeats it.
    fn merge(&self, pieces: Vec<String>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(String, usize)> = VecDeque::new();
        let mut window_len = 0usize;

        for piece in pieces {
            let piece_len = char_len(&piece);
            if window_len + piece_len > self.chunk_size && !window.is_empty() {
                chunks.push(join_window(&window));
                while window_len > self.chunk_overlap
                    || (window_len + piece_len > self.chunk_size && window_len > 0)
                {
                    match window.pop_front() {
                        Some((_, dropped)) => window_len -= dropped,
                        None => break,
                    }
                }
            }
            window_len += piece_len;
            window.push_back((piece, piece_len));
        }

        if !window.is_empty() {
            chunks.push(join_window(&window));
        }
        chunks
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

fn join_window(window: &VecDeque<(String, usize)>) -> String {
    let capacity = window.iter().map(|(piece, _)| piece.len()).sum();
    let mut joined = String::with_capacity(capacity);
    for (piece, _) in window {
        joined.push_str(piece);
    }
    joined
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn char_slice(text: &str, start: usize) -> String {
        text.chars().skip(start).collect()
    }

    fn char_tail(text: &str, count: usize) -> String {
        let len = char_len(text);
        text.chars().skip(len.saturating_sub(count)).collect()
    }

    #[test]
    fn short_input_is_a_single_chunk() {
        let splitter = TextSplitter::default();
        let chunks = splitter.split("a short document.");
        assert_eq!(chunks, vec!["a short document."]);
    }

    #[test]
    fn whitespace_input_yields_no_chunks() {
        let splitter = TextSplitter::default();
        assert!(splitter.split("   \n\n  ").is_empty());
        assert!(splitter.split("").is_empty());
    }

    #[test]
    fn prose_of_2500_chars_yields_three_overlapping_chunks() {
        // 25 sentences of exactly 100 characters each.
        let text: String = (0..25).map(|_| format!("{}.", "x".repeat(99))).collect();
        assert_eq!(char_len(&text), 2500);

        let splitter = TextSplitter::default();
        let chunks = splitter.split(&text);

        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert!(char_len(chunk) <= DEFAULT_CHUNK_SIZE);
        }
        assert_eq!(char_len(&chunks[0]), 1000);
        assert_eq!(char_len(&chunks[1]), 1000);
        assert_eq!(char_len(&chunks[2]), 900);

        // Each chunk after the first repeats the trailing overlap of its predecessor.
        assert!(chunks[1].starts_with(&char_tail(&chunks[0], DEFAULT_CHUNK_OVERLAP)));
        assert!(chunks[2].starts_with(&char_tail(&chunks[1], DEFAULT_CHUNK_OVERLAP)));

        // Concatenating the non-overlapping regions reconstructs the input.
        let rebuilt = format!(
            "{}{}{}",
            chunks[0],
            char_slice(&chunks[1], DEFAULT_CHUNK_OVERLAP),
            char_slice(&chunks[2], DEFAULT_CHUNK_OVERLAP)
        );
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn separator_free_input_terminates_with_bounded_chunks() {
        let text = "z".repeat(2500);
        let splitter = TextSplitter::default();
        let chunks = splitter.split(&text);

        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert!(char_len(chunk) <= DEFAULT_CHUNK_SIZE);
        }
        let rebuilt = format!(
            "{}{}{}",
            chunks[0],
            char_slice(&chunks[1], DEFAULT_CHUNK_OVERLAP),
            char_slice(&chunks[2], DEFAULT_CHUNK_OVERLAP)
        );
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn paragraph_breaks_are_preferred_over_later_separators() {
        let first = "a".repeat(600);
        let second = "b".repeat(600);
        let text = format!("{first}\n\n{second}");

        let splitter = TextSplitter::default();
        let chunks = splitter.split(&text);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], format!("{first}\n\n"));
        assert_eq!(chunks[1], second);
    }

    #[test]
    fn splitting_is_deterministic() {
        let text: String = (0..40)
            .map(|i| format!("Sentence number {i} with a bit of filler text. "))
            .collect();
        let splitter = TextSplitter::default();
        assert_eq!(splitter.split(&text), splitter.split(&text));
    }

    #[test]
    fn multibyte_input_respects_character_budget() {
        let text = "é".repeat(1500);
        let splitter = TextSplitter::default();
        let chunks = splitter.split(&text);

        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(char_len(chunk) <= DEFAULT_CHUNK_SIZE);
        }
    }

    #[test]
    fn new_validates_configuration() {
        assert!(matches!(
            TextSplitter::new(0, 0),
            Err(ChunkingError::InvalidChunkSize)
        ));
        assert!(matches!(
            TextSplitter::new(100, 100),
            Err(ChunkingError::OverlapExceedsChunkSize { .. })
        ));
        assert!(TextSplitter::new(100, 20).is_ok());
    }
}
