//! Splitting an artifact's content into fixed-size chunks.

/// Splits `content` into contiguous chunks, each at most `max_chunk_len`
/// bytes (the last chunk may be shorter). Empty content yields no chunks.
pub(crate) fn layout(content: &[u8], max_chunk_len: usize) -> Vec<Vec<u8>> {
    if content.is_empty() {
        return Vec::new();
    }
    let chunk_size = max_chunk_len.max(1).min(content.len()).max(1);
    content.chunks(chunk_size).map(|c| c.to_vec()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_has_no_chunks() {
        assert!(layout(b"", 3).is_empty());
    }

    #[test]
    fn exact_multiple_of_max_chunk_len() {
        let chunks = layout(b"abcdef", 3);
        assert_eq!(chunks, vec![b"abc".to_vec(), b"def".to_vec()]);
    }

    #[test]
    fn shorter_than_max_chunk_len() {
        let chunks = layout(b"hi", 3);
        assert_eq!(chunks, vec![b"hi".to_vec()]);
    }

    #[test]
    fn last_chunk_shorter() {
        let chunks = layout(b"hello", 3);
        assert_eq!(chunks, vec![b"hel".to_vec(), b"lo".to_vec()]);
    }
}
