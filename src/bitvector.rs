//! A growable bit buffer that is written and read as a stack: the bits that
//! were written last are read first. The entropy coder and the offset
//! extra-bit stream both produce their bits in reverse order, so this is the
//! order they want to consume them in.

use crate::error::{truncated, Error, Result};

/// The widest value that a single read or write can carry.
pub const MAX_WIDTH: usize = 64;

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Bitvector {
    /// Stores the packed part of the bitvector.
    data: Vec<u64>,
    /// Stores the last 64bit vectors, for easy access.
    /// The bits are always packed to the right [xxxxx543210]
    /// The last word always has 0..63 bits. Bits above 'len' bits are zero.
    last: u64,
    // Points to the next free bit (also size of bitvector).
    len: usize,
}

impl Default for Bitvector {
    fn default() -> Self {
        Self::new()
    }
}

impl Bitvector {
    pub fn new() -> Bitvector {
        Bitvector {
            data: Vec::new(),
            last: 0,
            len: 0,
        }
    }

    pub fn clear(&mut self) {
        self.len = 0;
        self.last = 0;
        self.data.clear();
    }

    fn verify(&self) {
        debug_assert!(
            self.last == Self::clear_upper_bits(self.last, self.len % 64)
        );
        let allocated = self.data.len() * 64 + 64;
        debug_assert!(self.len < allocated && self.len + 64 >= allocated);
    }

    /// Set all of the bits above 'keep' to zero.
    pub fn clear_upper_bits(bits: u64, keep: usize) -> u64 {
        if keep == 0 {
            return 0;
        }
        let amt: u32 = (64 - keep) as u32;
        let shl = bits.overflowing_shl(amt).0;
        shl.overflowing_shr(amt).0
    }

    /// Append the lowest 'width' bits of 'bits'. Fails with `OutOfRange` if
    /// the width does not fit in a single word.
    pub fn write_bits(&mut self, bits: u64, width: usize) -> Result<()> {
        if width > MAX_WIDTH {
            return Err(Error::OutOfRange(format!(
                "cannot write {} bits at once",
                width
            )));
        }
        self.push_word(bits, width);
        Ok(())
    }

    /// Take the 'width' most recently written bits. Fails with `Truncated` if
    /// fewer bits are left.
    pub fn read_bits(&mut self, width: usize) -> Result<u64> {
        if width > MAX_WIDTH {
            return Err(Error::OutOfRange(format!(
                "cannot read {} bits at once",
                width
            )));
        }
        if width > self.len {
            return truncated(format!(
                "need {} bits, {} left in the bitstream",
                width, self.len
            ));
        }
        Ok(self.pop_word(width))
    }

    /// The bits are inserted into the bitstream from the right as if shifted
    /// right one by one.
    pub(crate) fn push_word(&mut self, bits: u64, num: usize) {
        debug_assert!(num <= 64, "Pushing too many bits");
        let bits = Self::clear_upper_bits(bits, num);
        let first_free_bit = self.len % 64;
        let avail = 64 - first_free_bit;

        // Try to push the bits into the free word.
        if avail >= num {
            self.last |= bits.overflowing_shl(first_free_bit as u32).0;
            self.len += num;

            // If the free word is filled, flush it.
            if self.len % 64 == 0 && num > 0 {
                self.data.push(self.last);
                self.last = 0;
            }
            self.verify();
            return;
        }

        // The upper part of the word does not fit in the current free word
        // and goes into a new one.
        let upper_part = Self::clear_upper_bits(bits >> avail, num - avail);
        self.last |= bits << first_free_bit;
        self.data.push(self.last);

        self.last = upper_part;
        self.len += num;
        self.verify();
    }

    /// Take a single bit, or zero if the bitvector is empty.
    pub(crate) fn pop_bit(&mut self) -> u64 {
        if self.len == 0 {
            return 0;
        }
        self.pop_word(1)
    }

    /// Remove 'num' bits. The caller checked that enough bits are available.
    fn pop_word(&mut self, num: usize) -> u64 {
        debug_assert!(self.len >= num, "Taking too many bits");
        let avail = self.len % 64;

        // Try to extract the bits from the last word.
        if avail >= num {
            let res = self.last.overflowing_shr((avail - num) as u32).0;
            let res = Self::clear_upper_bits(res, num);
            self.last = Self::clear_upper_bits(self.last, avail - num);
            self.len -= num;
            self.verify();
            return res;
        }

        // Some bits come from the free word and the rest from the last packed
        // word: [XXXXXXXX LLLLL][UUUU....]
        self.len -= num;
        let upper_len = avail;
        let lower_len = num - avail;

        let upper = Self::clear_upper_bits(self.last, upper_len);

        // 'avail < num <= len' guarantees a packed word is present.
        self.last = self.data.pop().unwrap_or(0);
        let lower = self.last >> (64 - lower_len);
        // Bits beyond the end of the bitstream are always zero.
        self.last = Self::clear_upper_bits(self.last, self.len % 64);
        self.verify();
        upper.overflowing_shl(lower_len as u32).0 | lower
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Save the bitvector to a stream of bytes. Report the number of bytes
    /// written.
    pub fn serialize(&self, output: &mut Vec<u8>) -> usize {
        output.extend_from_slice(&(self.len as u32).to_be_bytes());
        output.extend_from_slice(&(self.last).to_be_bytes());
        for elem in &self.data {
            output.extend_from_slice(&elem.to_be_bytes());
        }

        4 + (self.data.len() + 1) * 8
    }

    /// Load the bit-vector from a stream of bytes. Returns the bitvector and
    /// the number of bytes that were read.
    pub fn deserialize(input: &[u8]) -> Result<(Self, usize)> {
        if input.len() < 12 {
            return truncated("bitstream header");
        }
        let length_field =
            u32::from_be_bytes([input[0], input[1], input[2], input[3]])
                as usize;
        let mut word = [0u8; 8];
        word.copy_from_slice(&input[4..12]);
        let last = u64::from_be_bytes(word);
        let input = &input[12..];

        let words = length_field / 64;
        if input.len() < words * 8 {
            return truncated(format!(
                "bitstream of {} bits needs {} bytes, {} available",
                length_field,
                words * 8,
                input.len()
            ));
        }
        if last != Self::clear_upper_bits(last, length_field % 64) {
            return Err(Error::CorruptStream(
                "bits set beyond the end of the bitstream".to_string(),
            ));
        }

        let payload = input[..words * 8]
            .chunks_exact(8)
            .map(|chunk| {
                word.copy_from_slice(chunk);
                u64::from_be_bytes(word)
            })
            .collect();

        Ok((
            Bitvector {
                data: payload,
                len: length_field,
                last,
            },
            12 + words * 8,
        ))
    }
}
