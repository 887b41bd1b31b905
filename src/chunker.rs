use crate::types::Chunk;

/// The `TextChunker` splits text into consecutive pieces of at most `chunk_size` characters.
///
/// Slicing is greedy from the start of the text and always lands on character boundaries; only
/// the last chunk may be shorter.
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    chunk_size: usize,
}

impl TextChunker {
    /// Creates a chunker. A `chunk_size` of zero is treated as one.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Splits `text` into indexed chunks, in order. Empty text yields no chunks.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut start = 0;
        let mut chars_in_chunk = 0;

        for (offset, _) in text.char_indices() {
            if chars_in_chunk == self.chunk_size {
                chunks.push(Chunk {
                    index: chunks.len(),
                    text: text[start..offset].to_string(),
                });
                start = offset;
                chars_in_chunk = 0;
            }
            chars_in_chunk += 1;
        }

        if start < text.len() {
            chunks.push(Chunk {
                index: chunks.len(),
                text: text[start..].to_string(),
            });
        }

        chunks
    }
}

/// Splits `text` into chunks of at most `max_chunk_size` characters.
pub fn split(text: &str, max_chunk_size: usize) -> Vec<Chunk> {
    TextChunker::new(max_chunk_size).split(text)
}
