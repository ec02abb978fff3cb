use std::cmp;
use std::io;

/// A contiguous FIFO byte buffer. Data is appended at the tail and read from
/// the head; both offsets reset to zero whenever the buffer fully drains, so
/// steady-state traffic that fits the current capacity never reallocates.
pub struct Buffer {
    data: Vec<u8>,
    head: usize,
    tail: usize,
}

impl Buffer {
    #[inline]
    pub fn new(capacity: usize) -> Buffer {
        Buffer {
            data: vec![0; capacity],
            head: 0,
            tail: 0,
        }
    }

    /// The number of readable bytes in the buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.tail - self.head
    }

    /// Returns true in case the buffer is empty, false otherwise.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Total allocated capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Free space between the tail and the end of the allocation.
    #[inline]
    pub fn tail_capacity(&self) -> usize {
        self.data.len() - self.tail
    }

    /// Free capacity in total, counting the dead region before the head.
    #[inline]
    pub fn free_capacity(&self) -> usize {
        self.data.len() - self.len()
    }

    /// Guarantee at least `n` contiguous writable bytes at the tail. Prefers
    /// sliding the readable region to the front over growing the allocation.
    pub fn reserve(&mut self, n: usize) {
        if self.tail_capacity() >= n {
            return;
        }

        if self.free_capacity() >= n {
            // Enough space, but fragmented. Slide the data to the front.
            self.data.copy_within(self.head..self.tail, 0);
            self.tail -= self.head;
            self.head = 0;
        } else {
            let target = cmp::max(self.data.len() * 2, self.data.len() + n);
            self.data.resize(target, 0);
        }
    }

    /// Append bytes, reserving space as needed.
    #[inline]
    pub fn append(&mut self, src: &[u8]) {
        self.reserve(src.len());
        self.data[self.tail..self.tail + src.len()].copy_from_slice(src);
        self.tail += src.len();
    }

    /// Release `n` readable bytes from the head.
    #[inline]
    pub fn consume(&mut self, n: usize) {
        if n > self.len() {
            panic!("Consumed {} bytes with only {} available", n, self.len());
        }

        self.head += n;
        if self.head == self.tail {
            self.head = 0;
            self.tail = 0;
        }
    }

    /// Slice containing data.
    #[inline]
    pub fn read_slice(&self) -> &[u8] {
        &self.data[self.head..self.tail]
    }

    /// Slice containing free capacity to be written.
    #[inline]
    pub fn write_slice(&mut self) -> &mut [u8] {
        &mut self.data[self.tail..]
    }

    /// Commit `n` bytes written directly into the write slice.
    #[inline]
    pub fn move_tail(&mut self, n: usize) {
        assert!(
            n <= self.tail_capacity(),
            "Buffer tail moved past the allocation"
        );
        self.tail += n;
    }

    #[inline]
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
    }

    /// Reserve `min_space` bytes and issue a single read from the supplied
    /// reader into the writable region, committing whatever arrives.
    #[inline]
    pub fn ingress<R: io::Read>(&mut self, mut reader: R, min_space: usize) -> io::Result<usize> {
        self.reserve(min_space);
        let count = reader.read(self.write_slice())?;
        self.move_tail(count);
        Ok(count)
    }

    /// Issue a single write of the readable region to the supplied writer,
    /// releasing the bytes it accepted. A zero-length write with data still
    /// pending is reported as `WriteZero`.
    #[inline]
    pub fn egress<W: io::Write>(&mut self, mut writer: W) -> io::Result<usize> {
        if self.is_empty() {
            return Ok(0);
        }

        let count = writer.write(self.read_slice())?;
        if count == 0 {
            return Err(io::ErrorKind::WriteZero.into());
        }

        self.consume(count);
        Ok(count)
    }
}
