//! Sliding window for resolving DEFLATE back-references.
//!
//! The window is a power-of-two ring buffer that always holds the most
//! recent `min(total_written, capacity)` bytes. Decoders append literals to
//! it and resolve `(distance, length)` pairs against it; every resolved byte
//! is also handed to an output sink.

use crate::error::{Result, ZflateError};

/// Window sizes.
pub mod sizes {
    /// Standard DEFLATE window (32 KB).
    pub const DEFLATE: usize = 32768;
    /// Smallest window a zlib header can announce (512 bytes).
    pub const MIN: usize = 512;
}

/// Ring buffer holding decompression history.
#[derive(Debug, Clone)]
pub struct Window {
    /// The underlying buffer.
    buffer: Vec<u8>,
    /// Next write position.
    position: usize,
    /// Number of valid bytes (up to capacity).
    size: usize,
    /// Mask for efficient modulo (capacity - 1).
    mask: usize,
    /// Bytes appended since creation or the last clear.
    total: u64,
}

impl Window {
    /// Create a new window with the specified capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is not a power of 2 or is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two(),
            "Capacity must be a power of 2, got {}",
            capacity
        );

        Self {
            buffer: vec![0; capacity],
            position: 0,
            size: 0,
            mask: capacity - 1,
            total: 0,
        }
    }

    /// Create a standard 32 KB DEFLATE window.
    pub fn deflate() -> Self {
        Self::new(sizes::DEFLATE)
    }

    /// Capacity of the window.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Number of bytes currently available for back-references.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Total bytes appended so far.
    pub fn total_written(&self) -> u64 {
        self.total
    }

    /// Forget all history.
    pub fn clear(&mut self) {
        self.position = 0;
        self.size = 0;
        self.total = 0;
        self.buffer.fill(0);
    }

    /// Append a single byte.
    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.buffer[self.position] = byte;
        self.position = (self.position + 1) & self.mask;
        if self.size < self.buffer.len() {
            self.size += 1;
        }
        self.total += 1;
    }

    /// Append a run of bytes.
    pub fn append(&mut self, bytes: &[u8]) {
        let capacity = self.buffer.len();
        self.total += bytes.len() as u64;

        // Only the tail can survive a write longer than the ring.
        let tail = if bytes.len() > capacity {
            let skipped = bytes.len() - capacity;
            self.position = (self.position + skipped) & self.mask;
            &bytes[skipped..]
        } else {
            bytes
        };

        let first = tail.len().min(capacity - self.position);
        self.buffer[self.position..self.position + first].copy_from_slice(&tail[..first]);
        self.buffer[..tail.len() - first].copy_from_slice(&tail[first..]);
        self.position = (self.position + tail.len()) & self.mask;
        self.size = (self.size + bytes.len()).min(capacity);
    }

    /// Read the byte `distance` positions back (1 = most recent).
    pub fn byte_at_distance(&self, distance: usize) -> Result<u8> {
        if distance == 0 || distance > self.size {
            return Err(ZflateError::distance_too_far(distance, self.size));
        }
        let index = self.position.wrapping_sub(distance) & self.mask;
        Ok(self.buffer[index])
    }

    /// Resolve a back-reference.
    ///
    /// Copies `length` bytes starting `distance` bytes before the end of the
    /// window, appending each byte to the window and to `sink` as it goes.
    /// Copying one byte at a time makes overlapping references
    /// (`distance < length`) repeat the pattern as DEFLATE requires.
    pub fn copy(&mut self, distance: usize, length: usize, sink: &mut Vec<u8>) -> Result<()> {
        if distance == 0 || distance > self.size {
            return Err(ZflateError::distance_too_far(distance, self.size));
        }

        sink.reserve(length);
        let mut src = self.position.wrapping_sub(distance) & self.mask;
        for _ in 0..length {
            let byte = self.buffer[src];
            self.push(byte);
            sink.push(byte);
            src = (src + 1) & self.mask;
        }

        Ok(())
    }

    /// The last `count` bytes written, oldest first.
    pub fn last_bytes(&self, count: usize) -> Vec<u8> {
        let count = count.min(self.size);
        let start = self.position.wrapping_sub(count);
        (0..count)
            .map(|i| self.buffer[start.wrapping_add(i) & self.mask])
            .collect()
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::deflate()
    }
}
