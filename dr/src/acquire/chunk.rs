//! Overlapping character windows over long documents

use tracing::debug;

/// Split `text` into windows of `size` chars sharing `overlap` chars
///
/// Windows are measured in chars, not bytes. Each next window starts at
/// `max(end - overlap, start + 1)`; the last window ends exactly at the end
/// of the text. Empty text yields no windows.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    debug!(len, size, overlap, "chunk_text: called");

    let size = size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < len {
        let end = (start + size).min(len);
        chunks.push(chars[start..end].iter().collect());
        if end == len {
            break;
        }
        start = end.saturating_sub(overlap).max(start + 1);
    }
    chunks
}

/// Keep at most `max` chunks
///
/// Returns the kept chunks and, when some were dropped, the original count.
pub fn cap_chunks(mut chunks: Vec<String>, max: usize) -> (Vec<String>, Option<usize>) {
    if chunks.len() <= max {
        return (chunks, None);
    }
    let total = chunks.len();
    chunks.truncate(max);
    (chunks, Some(total))
}
