use bytes::Bytes;

/// Growable in-memory sink for response body chunks.
#[derive(Debug, Default)]
pub struct ResponseBuffer(Vec<u8>);

impl ResponseBuffer {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends `chunk` and returns how many bytes were accepted.
    ///
    /// Returns `0` when memory for the chunk cannot be reserved, which the
    /// transport treats as a write failure and aborts the transfer.
    pub fn write(&mut self, chunk: &[u8]) -> usize {
        if let Err(e) = self.0.try_reserve(chunk.len()) {
            log::error!("Failed to grow response buffer by {} bytes: {e}", chunk.len());
            return 0;
        }

        self.0.extend_from_slice(chunk);
        chunk.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn into_bytes(self) -> Bytes {
        Bytes::from(self.0)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn appends_chunks_in_delivery_order() {
        let mut buffer = ResponseBuffer::new();

        assert_eq!(buffer.write(b"AB"), 2);
        assert_eq!(buffer.write(b"CD"), 2);
        assert_eq!(buffer.write(b"EF"), 2);

        assert_eq!(buffer.into_bytes(), Bytes::from_static(b"ABCDEF"));
    }

    #[test]
    fn empty_chunk_is_accepted() {
        let mut buffer = ResponseBuffer::new();

        assert_eq!(buffer.write(b""), 0);
        assert!(buffer.is_empty());

        buffer.write(b"x");
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn preserves_arbitrary_bytes() {
        let mut buffer = ResponseBuffer::new();
        let chunk = [0_u8, 0xff, b'\n', 0x80];

        buffer.write(&chunk);

        assert_eq!(buffer.into_bytes().as_ref(), &chunk);
    }
}
