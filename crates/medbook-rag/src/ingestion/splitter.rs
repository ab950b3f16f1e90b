//! Recursive character text splitting with overlap
//!
//! Text is cut on the coarsest separator present (paragraphs, then lines,
//! then words, then characters), and the pieces are merged back into
//! windows of at most `chunk_size` characters. Consecutive windows share up
//! to `chunk_overlap` characters. Lengths are counted in `char`s.

use std::collections::VecDeque;

use crate::config::ChunkingConfig;
use crate::types::{Chunk, Page};

/// Recursive splitter with configurable size, overlap and separators
#[derive(Debug, Clone)]
pub struct RecursiveTextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveTextSplitter {
    /// Create a splitter with the default separators
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separators: ChunkingConfig::default().separators,
        }
    }

    /// Create a splitter from configuration
    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            separators: config.separators.clone(),
        }
    }

    /// Split every page, tagging chunks with their page index
    pub fn split_pages(&self, pages: &[Page]) -> Vec<Chunk> {
        pages
            .iter()
            .flat_map(|page| {
                self.split_text(&page.content)
                    .into_iter()
                    .map(move |text| Chunk {
                        text,
                        page: page.number,
                    })
            })
            .collect()
    }

    /// Split text into overlapping, whitespace-trimmed chunks
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut final_chunks = Vec::new();

        // Coarsest separator present in the text; "" always matches
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = "";
                break;
            }
            if text.contains(sep.as_str()) {
                separator = sep;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut good_splits: Vec<String> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(&piece) < self.chunk_size {
                good_splits.push(piece);
                continue;
            }

            if !good_splits.is_empty() {
                final_chunks.extend(self.merge_splits(&good_splits));
                good_splits.clear();
            }
            if remaining.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    final_chunks.push(trimmed.to_string());
                }
            } else {
                final_chunks.extend(self.split_recursive(&piece, remaining));
            }
        }

        if !good_splits.is_empty() {
            final_chunks.extend(self.merge_splits(&good_splits));
        }

        final_chunks
    }

    /// Greedily pack pieces into windows, carrying an overlap tail
    /// from one window into the next.
    fn merge_splits(&self, splits: &[String]) -> Vec<String> {
        let mut docs = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in splits {
            let len = char_len(piece);

            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    tracing::warn!(
                        "Created a chunk of size {}, which is longer than the specified {}",
                        total,
                        self.chunk_size
                    );
                }
                if !current.is_empty() {
                    if let Some(doc) = join_trimmed(&current) {
                        docs.push(doc);
                    }
                    while total > self.chunk_overlap
                        || (total + len > self.chunk_size && total > 0)
                    {
                        match current.pop_front() {
                            Some(front) => total -= char_len(front),
                            None => break,
                        }
                    }
                }
            }

            current.push_back(piece);
            total += len;
        }

        if let Some(doc) = join_trimmed(&current) {
            docs.push(doc);
        }

        docs
    }
}

/// Split on `separator`, keeping it at the start of the following piece.
/// An empty separator splits into single characters. Empty pieces are
/// dropped.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }

    let mut pieces = Vec::new();
    let mut parts = text.split(separator);
    if let Some(first) = parts.next() {
        if !first.is_empty() {
            pieces.push(first.to_string());
        }
    }
    for part in parts {
        pieces.push(format!("{}{}", separator, part));
    }
    pieces
}

fn join_trimmed(pieces: &VecDeque<&str>) -> Option<String> {
    let joined: String = pieces.iter().copied().collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_single_chunk() {
        let splitter = RecursiveTextSplitter::new(1000, 200);
        assert_eq!(
            splitter.split_text("  Anemia is a low red cell count.  "),
            vec!["Anemia is a low red cell count."]
        );
    }

    #[test]
    fn test_word_windows_overlap() {
        let splitter = RecursiveTextSplitter::new(20, 10);
        let chunks = splitter.split_text("aaaa bbbb cccc dddd eeee ffff");
        assert_eq!(chunks, vec!["aaaa bbbb cccc dddd", "cccc dddd eeee ffff"]);
    }

    #[test]
    fn test_paragraphs_split_first() {
        let splitter = RecursiveTextSplitter::new(12, 0);
        let chunks = splitter.split_text("para one.\n\npara two.");
        assert_eq!(chunks, vec!["para one.", "para two."]);
    }

    #[test]
    fn test_unbroken_text_falls_back_to_characters() {
        let splitter = RecursiveTextSplitter::new(10, 2);
        let chunks = splitter.split_text(&"x".repeat(25));
        let lens: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(lens, vec![10, 10, 9]);
    }

    #[test]
    fn test_chunks_respect_size_on_long_text() {
        let text: String = (0..400)
            .map(|i| format!("word{} ", i))
            .collect::<String>()
            + "\n\nSecond paragraph with more words in it.\nAnd a new line.";
        let splitter = RecursiveTextSplitter::new(100, 20);
        let chunks = splitter.split_text(&text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(char_len(chunk) <= 100, "chunk too long: {}", char_len(chunk));
            assert_eq!(chunk.trim(), chunk);
        }
        // Neighbors inside the long paragraph share a tail
        let first_tail = chunks[0].split_whitespace().last().unwrap();
        assert!(chunks[1].contains(first_tail));
    }

    #[test]
    fn test_multibyte_lengths_are_chars() {
        let splitter = RecursiveTextSplitter::new(5, 0);
        let chunks = splitter.split_text("ééééééé");
        assert_eq!(chunks, vec!["ééééé", "éé"]);
    }

    #[test]
    fn test_split_pages_keeps_page_numbers() {
        let splitter = RecursiveTextSplitter::new(20, 5);
        let pages = vec![
            Page::new(0, "Cover page"),
            Page::new(1, ""),
            Page::new(2, "alpha beta gamma delta epsilon zeta"),
        ];
        let chunks = splitter.split_pages(&pages);

        assert_eq!(chunks[0], Chunk { text: "Cover page".into(), page: 0 });
        assert!(chunks.len() >= 3);
        assert!(chunks[1..].iter().all(|c| c.page == 2));
    }

    #[test]
    fn test_oversized_piece_without_char_fallback_is_trimmed() {
        let splitter = RecursiveTextSplitter::from_config(&ChunkingConfig {
            chunk_size: 5,
            chunk_overlap: 0,
            separators: vec!["\n\n".to_string(), " ".to_string()],
        });
        let chunks = splitter.split_text("ab \n\n   abcdefgh");
        assert_eq!(chunks, vec!["ab", "abcdefgh"]);
    }

    #[test]
    fn test_separator_kept_on_following_piece() {
        assert_eq!(
            split_keeping_separator("a b c", " "),
            vec!["a".to_string(), " b".to_string(), " c".to_string()]
        );
        assert_eq!(split_keeping_separator(" lead", " "), vec![" lead".to_string()]);
    }
}
