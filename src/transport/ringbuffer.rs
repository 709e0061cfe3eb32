// Fixed-capacity byte queue backing the in-process links.
pub struct RingBuffer<const SIZE: usize> {
    storage: [u8; SIZE],
    start: usize,
    len: usize,
}

impl<const SIZE: usize> Default for RingBuffer<SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const SIZE: usize> RingBuffer<SIZE> {
    pub fn new() -> Self {
        Self {
            storage: [0; SIZE],
            start: 0,
            len: 0,
        }
    }

    pub fn free(&self) -> usize {
        SIZE - self.len
    }

    // Copies as much of `src` as fits and returns how much that was.
    pub fn write(&mut self, src: &[u8]) -> usize {
        let count = src.len().min(self.free());
        if count == 0 {
            return 0;
        }

        let end = (self.start + self.len) % SIZE;
        // At most two runs: up to the end of storage, then from its beginning
        let first = count.min(SIZE - end);
        self.storage[end..(end + first)].copy_from_slice(&src[..first]);
        let second = count - first;
        self.storage[..second].copy_from_slice(&src[first..count]);

        self.len += count;
        count
    }

    pub fn read(&mut self, dst: &mut [u8]) -> usize {
        let count = dst.len().min(self.len);
        if count == 0 {
            return 0;
        }

        let first = count.min(SIZE - self.start);
        dst[..first].copy_from_slice(&self.storage[self.start..(self.start + first)]);
        let second = count - first;
        dst[first..count].copy_from_slice(&self.storage[..second]);

        self.start = (self.start + count) % SIZE;
        self.len -= count;
        count
    }
}
