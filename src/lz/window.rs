//! The history window: the most recent bytes of the stream, which matches in
//! the next block may refer to.

/// A bounded FIFO of previously seen bytes. It grows up to 'capacity' and
/// then evicts the oldest bytes as new ones arrive. The bytes are kept
/// contiguous so that the match finder can scan them as one slice.
#[derive(Debug, Clone)]
pub struct HistoryWindow {
    buf: Vec<u8>,
    capacity: usize,
}

impl HistoryWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: Vec::new(),
            capacity,
        }
    }

    /// The maximum number of bytes the window holds.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The retained bytes, oldest first.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Append 'data', evicting the oldest bytes past the capacity.
    pub fn extend(&mut self, data: &[u8]) {
        if data.len() >= self.capacity {
            self.buf.clear();
            self.buf
                .extend_from_slice(&data[data.len() - self.capacity..]);
            return;
        }
        self.buf.extend_from_slice(data);
        self.evict();
    }

    /// Copies 'len' bytes starting 'distance' bytes back from the end of the
    /// window to the end of the window. The regions may overlap, in which case
    /// the copied bytes repeat. The caller validates 'distance'.
    pub(crate) fn copy_match(&mut self, distance: usize, len: usize) {
        debug_assert!(distance > 0 && distance <= self.buf.len());
        let start = self.buf.len() - distance;
        if distance >= len {
            self.buf.extend_from_within(start..start + len);
            return;
        }
        for i in 0..len {
            let byte = self.buf[start + i];
            self.buf.push(byte);
        }
    }

    /// Appends bytes without evicting. Used while a block is being decoded,
    /// so that the whole block stays addressable until 'evict' is called.
    pub(crate) fn push_slice(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Returns the bytes appended since the window held 'mark' bytes.
    pub(crate) fn tail(&self, mark: usize) -> &[u8] {
        &self.buf[mark..]
    }

    /// Drops bytes from the start of the window until it fits its capacity.
    /// Returns the number of dropped bytes.
    pub(crate) fn evict(&mut self) -> usize {
        if self.buf.len() <= self.capacity {
            return 0;
        }
        let excess = self.buf.len() - self.capacity;
        self.buf.drain(..excess);
        excess
    }

    /// Drops bytes appended after the window held 'mark' bytes.
    pub(crate) fn truncate(&mut self, mark: usize) {
        self.buf.truncate(mark);
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::HistoryWindow;

    #[test]
    fn test_window_evicts_oldest() {
        let mut w = HistoryWindow::new(4);
        w.extend(&[1, 2, 3]);
        assert_eq!(w.as_slice(), &[1, 2, 3]);
        w.extend(&[4, 5]);
        assert_eq!(w.as_slice(), &[2, 3, 4, 5]);
        w.extend(&[6, 7, 8, 9, 10, 11]);
        assert_eq!(w.as_slice(), &[8, 9, 10, 11]);
        assert_eq!(w.len(), w.capacity());
    }

    #[test]
    fn test_copy_overlapping_match() {
        let mut w = HistoryWindow::new(64);
        w.extend(b"ab");
        w.copy_match(2, 7);
        assert_eq!(w.as_slice(), b"ababababa");
        w.copy_match(9, 3);
        assert_eq!(w.as_slice(), b"ababababaaba");
    }
}
