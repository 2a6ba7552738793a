use crate::models::{Chunk, ChunkingOptions};

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\u{a0}', " ")
}

/// Cuts one page into fixed-size character windows.
///
/// Adjacent windows overlap by exactly `overlap_chars` characters, except
/// for the final window of the page which simply runs to the end. Windows
/// never exceed `max_chars`.
pub fn split_page(text: &str, options: ChunkingOptions) -> Vec<String> {
    let normalized = normalize_whitespace(text);
    if normalized.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = normalized.chars().collect();
    let step = options
        .max_chars
        .saturating_sub(options.overlap_chars)
        .max(1);

    let mut windows = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + options.max_chars).min(chars.len());
        windows.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    windows
}

/// Splits the extracted pages of one document into chunks, in document
/// order, with a sequence number that is global across pages.
///
/// The contextual summary is left unset; the contextualizer fills it in.
/// Empty input produces an empty sequence.
pub fn split_pages(filename: &str, pages: &[String], options: ChunkingOptions) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut sequence = 0;

    for (page_index, page) in pages.iter().enumerate() {
        for window in split_page(page, options) {
            chunks.push(Chunk::new(filename, sequence, page_index, window));
            sequence += 1;
        }
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(max_chars: usize, overlap_chars: usize) -> ChunkingOptions {
        ChunkingOptions {
            max_chars,
            overlap_chars,
        }
    }

    #[test]
    fn windows_never_exceed_max_chars() {
        let text = "abcdefghij".repeat(30);
        for window in split_page(&text, options(100, 20)) {
            assert!(window.chars().count() <= 100);
        }
    }

    #[test]
    fn adjacent_windows_overlap_by_exactly_the_configured_length() {
        let text: String = ('a'..='z').cycle().take(300).collect();
        let windows = split_page(&text, options(100, 20));
        assert!(windows.len() > 1);

        for pair in windows.windows(2) {
            let tail: String = pair[0].chars().rev().take(20).collect::<Vec<_>>().into_iter().rev().collect();
            let head: String = pair[1].chars().take(20).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn chunks_preserve_page_order_and_valid_page_indices() {
        let pages = vec![
            "first page text".repeat(20),
            "second page text".repeat(20),
            "third page text".repeat(20),
        ];
        let chunks = split_pages("doc.pdf", &pages, options(64, 8));

        assert!(!chunks.is_empty());
        let mut last_page = 0;
        for chunk in &chunks {
            assert!(chunk.page_index < pages.len());
            assert!(chunk.page_index >= last_page);
            last_page = chunk.page_index;
        }
    }

    #[test]
    fn sequence_numbers_are_global_across_pages() {
        let pages = vec!["page one".to_string(), "page two".to_string()];
        let chunks = split_pages("doc.pdf", &pages, options(1_024, 64));

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chunk_id, "doc.pdf-0");
        assert_eq!(chunks[1].chunk_id, "doc.pdf-1");
        assert_eq!(chunks[1].page_index, 1);
    }

    #[test]
    fn empty_input_produces_no_chunks() {
        assert!(split_pages("doc.pdf", &[], ChunkingOptions::default()).is_empty());
        let blank = vec!["   \n\t ".to_string()];
        assert!(split_pages("doc.pdf", &blank, ChunkingOptions::default()).is_empty());
    }
}
