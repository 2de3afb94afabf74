//! Chunk segmentation
//!
//! Turns a stream of small generated fragments into speakable chunks. A
//! chunk is emitted once the accumulated text reaches `chunk_size`
//! characters or the latest fragment ends a sentence.
//!
//! Fragments are never split: one fragment longer than `chunk_size` becomes
//! one oversized chunk. Whitespace-only text is never emitted on its own; it
//! stays in the accumulator and leads the next chunk.

/// Default threshold for the primary provider
pub const PRIMARY_CHUNK_SIZE: usize = 55;

/// Default threshold for the fallback provider
pub const FALLBACK_CHUNK_SIZE: usize = 100;

const TERMINATORS: [char; 3] = ['.', '!', '?'];

#[derive(Debug, Clone)]
pub struct ChunkSegmenter {
    buffer: String,
    buffered_chars: usize,
    chunk_size: usize,
}

impl ChunkSegmenter {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            buffer: String::new(),
            buffered_chars: 0,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Change the threshold for chunks emitted from now on
    pub fn set_chunk_size(&mut self, chunk_size: usize) {
        self.chunk_size = chunk_size.max(1);
    }

    /// Text accumulated but not yet emitted
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Append a fragment, returning a chunk if one is complete
    pub fn feed(&mut self, fragment: &str) -> Option<String> {
        if fragment.is_empty() {
            return None;
        }

        self.buffer.push_str(fragment);
        self.buffered_chars += fragment.chars().count();

        let terminated = fragment
            .chars()
            .next_back()
            .is_some_and(|c| TERMINATORS.contains(&c));

        if terminated || self.buffered_chars >= self.chunk_size {
            self.take()
        } else {
            None
        }
    }

    /// Emit whatever remains at end of stream
    pub fn flush(&mut self) -> Option<String> {
        let chunk = self.take();
        self.buffer.clear();
        self.buffered_chars = 0;
        chunk
    }

    fn take(&mut self) -> Option<String> {
        if self.buffer.trim().is_empty() {
            return None;
        }
        self.buffered_chars = 0;
        Some(std::mem::take(&mut self.buffer))
    }
}

impl Default for ChunkSegmenter {
    fn default() -> Self {
        Self::new(PRIMARY_CHUNK_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(chunk_size: usize, fragments: &[&str]) -> Vec<String> {
        let mut segmenter = ChunkSegmenter::new(chunk_size);
        let mut chunks: Vec<String> = fragments.iter().filter_map(|f| segmenter.feed(f)).collect();
        chunks.extend(segmenter.flush());
        chunks
    }

    #[test]
    fn test_terminator_emits_below_threshold() {
        let mut segmenter = ChunkSegmenter::new(50);
        assert_eq!(segmenter.feed("Hi"), None);
        assert_eq!(segmenter.feed("!"), Some("Hi!".to_string()));
        assert_eq!(segmenter.pending(), "");
    }

    #[test]
    fn test_threshold_emits_without_terminator() {
        let mut segmenter = ChunkSegmenter::new(10);
        assert_eq!(segmenter.feed("abcde"), None);
        assert_eq!(segmenter.feed("fghij"), Some("abcdefghij".to_string()));
    }

    #[test]
    fn test_threshold_counts_characters() {
        let mut segmenter = ChunkSegmenter::new(4);
        assert_eq!(segmenter.feed("héé"), None);
        assert_eq!(segmenter.feed("é"), Some("hééé".to_string()));
    }

    #[test]
    fn test_say_hello_trace() {
        let mut segmenter = ChunkSegmenter::new(6);
        assert_eq!(segmenter.feed("Hel"), None);
        assert_eq!(segmenter.feed("lo wor"), Some("Hello wor".to_string()));
        assert_eq!(segmenter.feed("ld."), Some("ld.".to_string()));
        assert_eq!(segmenter.flush(), None);
    }

    #[test]
    fn test_oversized_fragment_is_not_split() {
        let long = "a".repeat(120);
        let chunks = segment(55, &["ok ", long.as_str(), " tail"]);
        assert_eq!(chunks, vec![format!("ok {}", long), " tail".to_string()]);
    }

    #[test]
    fn test_whitespace_only_is_retained() {
        let mut segmenter = ChunkSegmenter::new(2);
        assert_eq!(segmenter.feed("   "), None);
        assert_eq!(segmenter.pending(), "   ");
        assert_eq!(segmenter.feed("Yes."), Some("   Yes.".to_string()));
    }

    #[test]
    fn test_flush_drops_whitespace_remainder() {
        let mut segmenter = ChunkSegmenter::new(50);
        assert_eq!(segmenter.feed("Done."), Some("Done.".to_string()));
        assert_eq!(segmenter.feed(" \n"), None);
        assert_eq!(segmenter.flush(), None);
        assert_eq!(segmenter.pending(), "");
    }

    #[test]
    fn test_flush_emits_partial_chunk() {
        assert_eq!(segment(50, &["no", " terminator"]), vec!["no terminator"]);
    }

    #[test]
    fn test_reconstruction_and_no_blank_chunks() {
        let fragments = [
            "The ", "quick", " brown fox", " jumps.", " Over", " the lazy", " dog", "?", " ",
            "It", " was", " fast", "!", " Really", " very", " fast", " indeed", " and", " more",
        ];
        for size in [1, 5, 10, 55, 100] {
            let chunks = segment(size, &fragments);
            assert_eq!(chunks.concat(), fragments.concat(), "chunk size {}", size);
            assert!(chunks.iter().all(|c| !c.trim().is_empty()));
        }
    }

    #[test]
    fn test_set_chunk_size() {
        let mut segmenter = ChunkSegmenter::new(PRIMARY_CHUNK_SIZE);
        segmenter.set_chunk_size(FALLBACK_CHUNK_SIZE);
        assert_eq!(segmenter.chunk_size(), 100);
        assert_eq!(segmenter.feed(&"x".repeat(60)), None);

        segmenter.set_chunk_size(0);
        assert_eq!(segmenter.chunk_size(), 1);
    }
}
