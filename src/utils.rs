//! A collection of utilities for handling arrays, numbers and signatures.

/// Magic numbers and tags that identify the different encodings.
pub mod signatures {
    /// Start of every stream: "LZS" followed by a DOS end-of-file byte.
    pub const STREAM_MAGIC: [u8; 4] = [0x4c, 0x5a, 0x53, 0x1a];
    /// Terminates the block list. Every byte has the high bit set, so this
    /// can never be the start of a block header (see `frame`).
    pub const END_MARKER: [u8; 4] = [0xfe, 0xed, 0xfa, 0xce];
    pub const NOP_ENC: [u8; 2] = [0x90, 0x90];
    pub const SIMPLE_ENC: [u8; 2] = [0x12, 34];
    pub const PAGER_SIG: [u8; 4] = [0x9a, 0x93, 0x9a, 0x93];
    pub const START_PAGE_SIG: [u8; 2] = [0x71, 75];
    pub const FILE_EXTENSION: &str = ".lzs";

    /// Return True if 'input' starts with 'signature'.
    pub fn match_signature(input: &[u8], signature: &[u8]) -> bool {
        input.starts_with(signature)
    }
}

/// Unsigned LEB128: seven bits per byte, least significant group first, the
/// high bit marks that another byte follows.
pub mod varint {
    use crate::error::{truncated, Error, Result};

    /// The longest encoding of a u64.
    pub const MAX_LEN: usize = 10;

    /// Encode 'val' into 'stream' and return the number of bytes written.
    pub fn encode(mut val: u64, stream: &mut Vec<u8>) -> usize {
        let mut written = 0;
        loop {
            let byte = (val & 0x7f) as u8;
            val >>= 7;
            written += 1;
            if val == 0 {
                stream.push(byte);
                return written;
            }
            stream.push(byte | 0x80);
        }
    }

    /// Decode a number from the start of 'stream'. Returns the number of
    /// bytes read and the value.
    pub fn decode(stream: &[u8]) -> Result<(usize, u64)> {
        let mut val: u64 = 0;
        for (i, byte) in stream.iter().enumerate() {
            if i == MAX_LEN {
                break;
            }
            let group = (byte & 0x7f) as u64;
            let shift = 7 * i as u32;
            if shift == 63 && group > 1 {
                return Err(Error::OutOfRange("varint overflows u64".into()));
            }
            val |= group << shift;
            if byte & 0x80 == 0 {
                return Ok((i + 1, val));
            }
        }
        if stream.len() >= MAX_LEN {
            return Err(Error::OutOfRange("varint is too long".into()));
        }
        truncated("incomplete varint")
    }

    #[test]
    fn test_varint_known_values() {
        let mut buf = Vec::new();
        assert_eq!(encode(0, &mut buf), 1);
        assert_eq!(encode(127, &mut buf), 1);
        assert_eq!(encode(128, &mut buf), 2);
        assert_eq!(encode(300, &mut buf), 2);
        assert_eq!(buf, [0x00, 0x7f, 0x80, 0x01, 0xac, 0x02]);
        assert_eq!(decode(&buf[4..]).unwrap(), (2, 300));
        assert_eq!(decode(&[0x80, 0x80]), truncated("incomplete varint"));
    }
}

/// Implement encoding and decoding of variable length integers.
/// The number is written as a u8 byte. If the number is greater than 0xff then
/// 0xff is written and the remaining of the number is serialized onwards.
/// The number 350 is serialized as [255, 95].
pub mod variable_length_encoding {
    use super::number_encoding;
    use crate::error::{truncated, Error, Result};

    /// Encode the number 'num' into the stream and return the number of bytes
    /// written.
    pub fn encode(num: u32, stream: &mut Vec<u8>) -> usize {
        let mut val = num;
        let mut written = 0;
        while val >= 255 {
            written += 1;
            val -= 255;
            stream.push(255);
        }
        written += 1;
        stream.push((val & 0xff) as u8);
        written
    }

    /// Decode a number from the stream and return the number of bytes read
    /// and the value that was loaded.
    pub fn decode(stream: &[u8]) -> Result<(usize, u32)> {
        let mut val: u32 = 0;
        for (read, c) in stream.iter().enumerate() {
            val = val.checked_add(*c as u32).ok_or_else(|| {
                Error::OutOfRange("run-length number overflows u32".into())
            })?;
            if *c != 255 {
                return Ok((read + 1, val));
            }
        }
        truncated("incomplete run-length number")
    }

    // Encode the array and return the number of bytes written.
    pub fn encode_array32(array: &[u32], stream: &mut Vec<u8>) -> usize {
        number_encoding::encode32(array.len() as u32, stream);
        let mut written = 4;
        for num in array {
            written += encode(*num, stream);
        }
        written
    }

    // Decode the array and return the number of bytes that were read.
    pub fn decode_array32(stream: &[u8], array: &mut Vec<u32>) -> Result<usize> {
        let (_, len) = number_encoding::decode32(stream)?;
        let mut cursor = 4;
        for _ in 0..len {
            let (read, val) = decode(&stream[cursor..])?;
            cursor += read;
            array.push(val);
        }
        Ok(cursor)
    }
}

/// Implements encoding and decoding of regular numbers.
pub mod number_encoding {
    use crate::error::{truncated, Result};

    pub fn encode32(num: u32, stream: &mut Vec<u8>) -> usize {
        stream.extend_from_slice(&(num).to_be_bytes());
        4
    }

    pub fn decode32(stream: &[u8]) -> Result<(usize, u32)> {
        match stream.get(0..4) {
            Some(b) => Ok((4, u32::from_be_bytes([b[0], b[1], b[2], b[3]]))),
            None => truncated("expected a 32-bit number"),
        }
    }

    /// Write the 'width' low bytes of 'num' in little-endian order.
    pub fn encode_le(num: u64, width: usize, stream: &mut Vec<u8>) {
        stream.extend_from_slice(&num.to_le_bytes()[..width]);
    }

    /// Read a little-endian number of 'width' bytes.
    pub fn decode_le(stream: &[u8], width: usize) -> Result<u64> {
        match stream.get(0..width) {
            Some(b) => {
                let mut bytes = [0u8; 8];
                bytes[..width].copy_from_slice(b);
                Ok(u64::from_le_bytes(bytes))
            }
            None => truncated(format!("expected a {}-byte field", width)),
        }
    }
}

/// Implements encoding and decoding of arrays.
pub mod array_encoding {
    use super::number_encoding;
    use crate::error::{truncated, Result};

    // Encode the array and return the number of bytes written.
    pub fn encode(array: &[u8], stream: &mut Vec<u8>) -> usize {
        number_encoding::encode32(array.len() as u32, stream);
        stream.extend_from_slice(array);
        array.len() + 4
    }

    // Decode the array and return the number of bytes that were read.
    pub fn decode(stream: &[u8], array: &mut Vec<u8>) -> Result<usize> {
        let (_, len) = number_encoding::decode32(stream)?;
        let len = len as usize;
        match stream.get(4..4 + len) {
            Some(payload) => {
                array.extend_from_slice(payload);
                Ok(4 + len)
            }
            None => truncated(format!(
                "array of {} bytes, {} available",
                len,
                stream.len().saturating_sub(4)
            )),
        }
    }
}

/// Encodes numbers into two streams: tokens and extra bits. This is useful when
/// there is a sharp distribution of values, with few high-bit numbers.
/// The first stream stores state values in the range 0..N, and the second
/// stream stores the extra bits. The representation of the value is
/// (1 << code) + read_bits(code). The numbers are shifted by +1, to allow the
/// encoding of zero. This encoder encodes the range [0 .. u32::MAX-1].
/// Reference:
/// <https://github.com/facebook/zstd/blob/dev/doc/zstd_compression_format.md#offset-codes>
pub mod two_stream_encoding {
    use crate::bitvector::Bitvector;
    use crate::error::{Error, Result};

    /// Encode 'val' into a token, and stores the extra bits into 'bv'.
    pub fn encode32(val: u32, bv: &mut Bitvector) -> u32 {
        debug_assert!(val < u32::MAX);
        let code = 32 - (val + 1).leading_zeros() - 1;
        bv.push_word((val + 1) as u64, code as usize);
        code
    }

    /// Decode a value from the token, and extracts the extra bits from 'bv'.
    pub fn decode32(code: u32, bv: &mut Bitvector) -> Result<u32> {
        if code >= 32 {
            return Err(Error::CorruptStream(format!(
                "invalid offset code {}",
                code
            )));
        }
        let extra = bv.read_bits(code as usize)? as u32;
        Ok(((1u32 << code) | extra) - 1)
    }

    #[test]
    fn test_two_stream_encoding_simple() {
        let mut bv = Bitvector::new();
        let val = 7;
        let tok = encode32(val, &mut bv);
        let res = decode32(tok, &mut bv).unwrap();
        assert_eq!(bv.len(), 0);
        assert_eq!(val, res);
    }

    #[test]
    fn test_two_stream_encoding_many() {
        for i in 0..130 {
            let mut bv = Bitvector::new();
            let tok = encode32(i, &mut bv);
            let res = decode32(tok, &mut bv).unwrap();
            assert_eq!(bv.len(), 0);
            assert_eq!(i, res);
            assert!(tok < 8);
        }
    }

    #[test]
    fn test_two_stream_encoding_tokens() {
        let mut bv = Bitvector::new();
        let vals = [
            0, 1, 2, 3, 5, 16, 37, 1121, 3512, 17824, 69481, 32768, 41910,
            65535, 65536, 65537, 192151, 16777218,
        ];
        for val in vals {
            let tok = encode32(val, &mut bv);
            let res = decode32(tok, &mut bv).unwrap();
            assert_eq!(bv.len(), 0);
            assert_eq!(val, res);
        }
    }

    #[test]
    fn test_two_stream_missing_bits() {
        let mut bv = Bitvector::new();
        let tok = encode32(1121, &mut bv);
        bv.clear();
        assert!(matches!(
            decode32(tok, &mut bv),
            Err(Error::Truncated(_))
        ));
    }
}
