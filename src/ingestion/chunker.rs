//! Text chunking with sentence-boundary snapping
//!
//! Splits normalized text into overlapping, bounded-size windows. Operates on
//! `char` positions throughout, so multi-byte input can never be split inside
//! a code point.

/// Sentence-ending punctuation that qualifies as a clean cut point
const SENTENCE_ENDINGS: [char; 3] = ['.', '!', '?'];

/// Split text into overlapping chunks of at most `size` characters
///
/// Whitespace runs are normalized to single spaces before splitting. Each
/// window prefers to end just after a sentence boundary (punctuation followed
/// by a space and an uppercase letter), then at the last space, then at the
/// hard boundary. Consecutive chunks overlap by roughly `overlap` characters;
/// boundary snapping makes that approximate.
///
/// Pure function of its input. Every returned chunk is non-empty.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let normalized = normalize_whitespace(text);
    if normalized.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = normalized.chars().collect();
    if chars.len() <= size {
        return vec![normalized];
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        let mut end = (start + size).min(chars.len());

        if end < chars.len() {
            if let Some(cut) = last_sentence_break(&chars, start, end) {
                end = cut;
            } else if let Some(space) = last_space(&chars, start, end) {
                end = space;
            }
        }

        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim().to_string();
        if !chunk.is_empty() {
            chunks.push(chunk);
        }

        if end >= chars.len() {
            break;
        }

        // Guard against non-advancing windows on degenerate size/overlap
        let next = end.saturating_sub(overlap);
        if next <= start {
            break;
        }
        start = next;
    }

    chunks
}

/// Collapse all whitespace runs to single spaces and trim
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Find the last sentence boundary in `[start, end)`: punctuation followed by
/// a space and an uppercase letter. Returns the cut position just after the
/// space, so the punctuation and space stay with the current chunk.
fn last_sentence_break(chars: &[char], start: usize, end: usize) -> Option<usize> {
    // p+2 must stay inside the window so the uppercase letter is visible
    for p in (start..end.saturating_sub(2)).rev() {
        if SENTENCE_ENDINGS.contains(&chars[p])
            && chars[p + 1] == ' '
            && chars[p + 2].is_uppercase()
        {
            return Some(p + 2);
        }
    }
    None
}

/// Find the last space strictly after `start` in `[start, end)`
fn last_space(chars: &[char], start: usize, end: usize) -> Option<usize> {
    (start + 1..end).rev().find(|&p| chars[p] == ' ')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_single_normalized_chunk() {
        let chunks = chunk_text("  Hello   world\n\tagain  ", 1000, 200);
        assert_eq!(chunks, vec!["Hello world again".to_string()]);
    }

    #[test]
    fn exact_size_is_single_chunk() {
        let text = "a".repeat(100);
        let chunks = chunk_text(&text, 100, 20);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], text);
    }

    #[test]
    fn empty_and_whitespace_only_yield_nothing() {
        assert!(chunk_text("", 1000, 200).is_empty());
        assert!(chunk_text("   \n\t  ", 1000, 200).is_empty());
    }

    #[test]
    fn chunks_are_never_empty_and_never_oversized() {
        let text = (0..500)
            .map(|i| format!("word{i:04}"))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = chunk_text(&text, 300, 60);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(!chunk.trim().is_empty());
            assert!(chunk.chars().count() <= 300);
        }
    }

    #[test]
    fn consecutive_chunks_overlap() {
        let text = (0..400)
            .map(|i| format!("word{i:04}"))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = chunk_text(&text, 300, 60);
        assert!(chunks.len() >= 2);
        for pair in chunks.windows(2) {
            let first_word = pair[1].split(' ').next().unwrap();
            assert!(
                pair[0].contains(first_word),
                "chunk {:?} should overlap into {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn boundary_2500_chars_with_size_1000() {
        let sentence = "The quick brown fox jumps over the lazy dog near the river bank today. ";
        let text = sentence.repeat(35); // ~2520 chars
        let chunks = chunk_text(&text, 1000, 200);
        assert!(chunks.len() >= 3, "expected at least 3 chunks, got {}", chunks.len());
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 1000);
        }
        // Measurable overlap between adjacent chunks
        for pair in chunks.windows(2) {
            let head: String = pair[1].chars().take(30).collect();
            assert!(pair[0].contains(head.trim()));
        }
    }

    #[test]
    fn prefers_sentence_boundaries() {
        let sentence = "Alpha beta gamma delta epsilon zeta eta theta iota kappa. ";
        let text = sentence.repeat(10); // 580 chars, forces splitting at 300
        let chunks = chunk_text(&text, 300, 50);
        assert!(chunks.len() >= 2);
        // Every non-final chunk should have snapped to a sentence ending
        for chunk in &chunks[..chunks.len() - 1] {
            assert!(
                chunk.ends_with('.'),
                "chunk should end at a sentence boundary: {chunk:?}"
            );
        }
    }

    #[test]
    fn falls_back_to_space_without_sentence_breaks() {
        let text = (0..100)
            .map(|i| format!("token{i}"))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = chunk_text(&text, 200, 40);
        for chunk in &chunks {
            // Space fallback means no token is ever cut in half
            assert!(chunk.split(' ').all(|t| t.starts_with("token")));
        }
    }

    #[test]
    fn hard_cut_on_unbroken_text() {
        let text = "x".repeat(5000);
        let chunks = chunk_text(&text, 1000, 200);
        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].len(), 1000);
    }

    #[test]
    fn degenerate_overlap_terminates() {
        // overlap >= size would loop forever without the progress guard
        let text = "a b c d e f g h i j k l m n o p q r s t u v w x y z".repeat(10);
        let chunks = chunk_text(&text, 10, 20);
        assert!(!chunks.is_empty());
    }

    #[test]
    fn multibyte_input_does_not_panic() {
        let text = "Ünïcødé tëxt wïth mültïbytê çhäräctérs. ".repeat(60);
        let chunks = chunk_text(&text, 300, 50);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 300);
        }
    }
}
