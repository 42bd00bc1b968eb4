//! Adler-32 checksum (RFC 1950).
//!
//! Two running sums modulo 65521: `a` is one plus the sum of all bytes, `b`
//! is the sum of every intermediate `a`. The combined value is `b << 16 | a`.
//! Sums are reduced only every [`NMAX`] bytes, the largest run for which `b`
//! cannot overflow a `u32`.

/// Largest prime smaller than 65536.
pub const ADLER_MOD: u32 = 65521;

/// Number of bytes that can be summed before `b` may overflow.
pub const NMAX: usize = 5552;

/// Checksum of the empty input.
pub const ADLER_INIT: u32 = 1;

/// Fold `data` into an existing Adler-32 value.
///
/// Pure: `adler32_update(adler32_update(ADLER_INIT, x), y)` equals
/// `adler32_update(ADLER_INIT, x ++ y)`.
pub fn adler32_update(checksum: u32, data: &[u8]) -> u32 {
    let mut a = checksum & 0xFFFF;
    let mut b = checksum >> 16;

    for chunk in data.chunks(NMAX) {
        for &byte in chunk {
            a += byte as u32;
            b += a;
        }
        a %= ADLER_MOD;
        b %= ADLER_MOD;
    }

    (b << 16) | a
}

/// Incremental Adler-32 calculator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Adler32 {
    value: u32,
}

impl Adler32 {
    /// Create a new calculator.
    pub fn new() -> Self {
        Self { value: ADLER_INIT }
    }

    /// Update the checksum with more data.
    pub fn update(&mut self, data: &[u8]) {
        self.value = adler32_update(self.value, data);
    }

    /// Current checksum value.
    pub fn finish(&self) -> u32 {
        self.value
    }

    /// Start over for a new stream.
    pub fn reset(&mut self) {
        self.value = ADLER_INIT;
    }

    /// Compute the checksum of `data` in one shot.
    pub fn checksum(data: &[u8]) -> u32 {
        adler32_update(ADLER_INIT, data)
    }
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}
