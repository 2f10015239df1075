/// Maximum chunk length, in characters.
pub const CHUNK_SIZE: usize = 10_000;

/// Characters shared between consecutive chunks.
pub const CHUNK_OVERLAP: usize = 1_000;

/// Split text into overlapping character windows.
///
/// Each chunk holds at most `size` characters and shares exactly `overlap`
/// characters with its predecessor, so stripping the overlap from every chunk
/// after the first and concatenating reconstructs the input. Offsets are
/// counted in characters, never bytes, so multi-byte text stays intact.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    if size == 0 || text.is_empty() {
        return Vec::new();
    }

    // Byte offset of every char boundary, with the end as a sentinel.
    let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    boundaries.push(text.len());
    let total_chars = boundaries.len() - 1;

    if total_chars <= size {
        return vec![text.to_string()];
    }

    let step = size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + size).min(total_chars);
        chunks.push(text[boundaries[start]..boundaries[end]].to_string());

        if end == total_chars {
            break;
        }
        start += step;
    }

    chunks
}
