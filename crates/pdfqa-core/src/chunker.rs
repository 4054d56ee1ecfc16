//! Fixed-size, overlapping character windows.
//!
//! Lengths are counted in `char`s, never bytes, so a window never splits a
//! UTF-8 sequence. Window `i` starts at `i * (chunk_size - overlap)`; every
//! window except the last is exactly `chunk_size` long.

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// Fails when `chunk_size == 0` or `overlap >= chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be greater than zero".to_string()));
        }
        if overlap >= chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, overlap })
    }

    pub fn chunk_size(&self) -> usize { self.chunk_size }
    pub fn overlap(&self) -> usize { self.overlap }

    fn stride(&self) -> usize { self.chunk_size - self.overlap }

    /// Split `text` into windows. Whitespace-only input yields no chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        // Byte offset of every char boundary, plus the end of the string.
        let bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
        let n_chars = bounds.len() - 1;

        let mut chunks = Vec::with_capacity(n_chars / self.stride() + 1);
        let mut start = 0usize;
        loop {
            let end = (start + self.chunk_size).min(n_chars);
            chunks.push(text[bounds[start]..bounds[end]].to_string());
            if end == n_chars {
                break;
            }
            start += self.stride();
        }
        chunks
    }

    /// Inverse of [`Chunker::split`]: the first chunk whole, then each later
    /// chunk with its leading `overlap` chars removed.
    pub fn reconstruct(&self, chunks: &[String]) -> String {
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(chunk);
            } else {
                out.extend(chunk.chars().skip(self.overlap));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_parameters() {
        assert!(matches!(Chunker::new(0, 0), Err(Error::InvalidConfig(_))));
        assert!(matches!(Chunker::new(10, 10), Err(Error::InvalidConfig(_))));
        assert!(matches!(Chunker::new(10, 11), Err(Error::InvalidConfig(_))));
        assert!(Chunker::new(10, 0).is_ok());
        assert!(Chunker::new(10, 9).is_ok());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunker = Chunker::new(1000, 100).expect("chunker");
        let chunks = chunker.split("The sky is blue. Grass is green.");
        assert_eq!(chunks, vec!["The sky is blue. Grass is green.".to_string()]);
    }

    #[test]
    fn windows_advance_by_stride() {
        let chunker = Chunker::new(4, 1).expect("chunker");
        let chunks = chunker.split("abcdefghij");
        assert_eq!(chunks, vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn final_chunk_may_be_shorter() {
        let chunker = Chunker::new(4, 2).expect("chunker");
        let chunks = chunker.split("abcdefg");
        assert_eq!(chunks, vec!["abcd", "cdef", "efg"]);
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
    }

    #[test]
    fn whitespace_only_text_has_no_chunks() {
        let chunker = Chunker::new(8, 2).expect("chunker");
        assert!(chunker.split("  \n\t ").is_empty());
        assert!(chunker.split("").is_empty());
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() {
        let chunker = Chunker::new(3, 1).expect("chunker");
        let text = "héllo wörld ☀️ ok";
        let chunks = chunker.split(text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 3));
        assert_eq!(chunker.reconstruct(&chunks), text);
    }

    #[test]
    fn split_is_lossless_and_bounded_across_parameters() {
        let text = "Lorem ipsum dolor sit amet, consectetur adipiscing elit.\n\n\
                    Sed do eiusmod tempor incididunt ut labore et dolore magna aliqua. \
                    Ut enim ad minim veniam, quis nostrud exercitation ullamco.";
        for size in 1..40 {
            for overlap in 0..size {
                let chunker = Chunker::new(size, overlap).expect("chunker");
                let chunks = chunker.split(text);
                assert!(chunks.iter().all(|c| c.chars().count() <= size), "size={size} overlap={overlap}");
                assert_eq!(chunker.reconstruct(&chunks), text, "size={size} overlap={overlap}");
            }
        }
    }

    #[test]
    fn split_is_deterministic() {
        let chunker = Chunker::new(16, 4).expect("chunker");
        let text = "determinism matters for identical uploads of the same file";
        assert_eq!(chunker.split(text), chunker.split(text));
    }
}
