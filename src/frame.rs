//! The container format. A stream is a header, a list of blocks and a footer:
//!
//! ```text
//! header: magic (4) | version (1) | flags (1)
//! block:  raw size (varint) | payload size (varint) | checksum | payload
//! footer: end marker (4) | checksum of all raw bytes
//! ```
//!
//! The low nibble of the flags selects the checksum kind and the high nibble
//! stores log2 of the dictionary size, minus 12. Checksums are little-endian
//! and their width depends on the kind. The bytes of the end marker all have
//! the high bit set, and a block size never needs more than four varint
//! bytes, so the end marker can't be mistaken for a block.

use crate::checksum::CheckKind;
use crate::error::{truncated, Error, Result};
use crate::utils::number_encoding::{decode_le, encode_le};
use crate::utils::signatures::{match_signature, END_MARKER, STREAM_MAGIC};
use crate::utils::varint;
use crate::{Context, MAX_BLOCK_SIZE, MAX_DICT_LOG, MIN_DICT_LOG};

/// The only version this crate reads and writes.
pub const FORMAT_VERSION: u8 = 1;

/// Size of the stream header in bytes.
pub const HEADER_SIZE: usize = STREAM_MAGIC.len() + 2;

/// The largest payload a block may carry.
pub const MAX_PAYLOAD_SIZE: usize = 2 * MAX_BLOCK_SIZE;

/// Block sizes up to 'MAX_PAYLOAD_SIZE' fit in this many varint bytes.
const MAX_SIZE_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader {
    pub check: CheckKind,
    pub dict_size: usize,
}

impl StreamHeader {
    pub fn from_context(ctx: &Context) -> Self {
        Self {
            check: ctx.check(),
            dict_size: ctx.dict_size(),
        }
    }

    pub fn flags(&self) -> u8 {
        let dict_log = self.dict_size.trailing_zeros() - MIN_DICT_LOG;
        ((dict_log as u8) << 4) | self.check.id()
    }

    pub fn serialize(&self, output: &mut Vec<u8>) -> usize {
        output.extend(STREAM_MAGIC);
        output.push(FORMAT_VERSION);
        output.push(self.flags());
        HEADER_SIZE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFooter {
    /// The checksum of every uncompressed byte in the stream.
    pub checksum: u64,
}

/// A compressed block and its header fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub uncompressed_size: usize,
    pub compressed_size: usize,
    /// The checksum of the payload.
    pub checksum: u64,
    pub payload: Vec<u8>,
}

impl Block {
    /// Wrap the 'payload' that 'raw_len' bytes were compressed into.
    pub fn new(raw_len: usize, payload: Vec<u8>, kind: CheckKind) -> Result<Self> {
        if raw_len > MAX_BLOCK_SIZE || payload.len() > MAX_PAYLOAD_SIZE {
            return Err(Error::InvalidParameter(format!(
                "block of {} bytes with a payload of {} bytes is too large",
                raw_len,
                payload.len()
            )));
        }
        Ok(Self {
            uncompressed_size: raw_len,
            compressed_size: payload.len(),
            checksum: kind.digest(&payload),
            payload,
        })
    }
}

/// An item parsed from the block list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Block(Block),
    EndOfStream(StreamFooter),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Uninitialized,
    HeaderWritten,
    BlockWritten,
    Finalized,
}

/// Serializes a stream and checks that its parts are written in order.
#[derive(Debug)]
pub struct FrameWriter {
    state: WriterState,
    check: CheckKind,
}

impl Default for FrameWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameWriter {
    pub fn new() -> Self {
        Self {
            state: WriterState::Uninitialized,
            check: CheckKind::default(),
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    fn expect_open(&self, op: &str) -> Result<()> {
        match self.state {
            WriterState::HeaderWritten | WriterState::BlockWritten => Ok(()),
            state => Err(Error::InvalidState(format!(
                "{} called in state {:?}",
                op, state
            ))),
        }
    }

    /// Returns the stream header for 'ctx'.
    pub fn begin_stream(&mut self, ctx: &Context) -> Result<Vec<u8>> {
        if self.state != WriterState::Uninitialized {
            return Err(Error::InvalidState(format!(
                "begin_stream called in state {:?}",
                self.state
            )));
        }
        ctx.validate()?;
        let header = StreamHeader::from_context(ctx);
        let mut output = Vec::with_capacity(HEADER_SIZE);
        header.serialize(&mut output);

        log::trace!("stream header, flags {:#04x}", header.flags());
        self.check = header.check;
        self.state = WriterState::HeaderWritten;
        Ok(output)
    }

    /// Returns the serialized 'block'.
    pub fn emit_block(&mut self, block: &Block) -> Result<Vec<u8>> {
        self.expect_open("emit_block")?;
        if block.compressed_size != block.payload.len() {
            return Err(Error::InvalidParameter(format!(
                "block claims {} payload bytes but has {}",
                block.compressed_size,
                block.payload.len()
            )));
        }

        let width = self.check.width();
        let mut output =
            Vec::with_capacity(2 * MAX_SIZE_LEN + width + block.payload.len());
        varint::encode(block.uncompressed_size as u64, &mut output);
        varint::encode(block.compressed_size as u64, &mut output);
        encode_le(block.checksum, width, &mut output);
        output.extend_from_slice(&block.payload);

        log::trace!(
            "block {} -> {} bytes",
            block.uncompressed_size,
            block.compressed_size
        );
        self.state = WriterState::BlockWritten;
        Ok(output)
    }

    /// Returns the footer that carries 'checksum', the checksum of all of the
    /// uncompressed data.
    pub fn end_stream(&mut self, checksum: u64) -> Result<Vec<u8>> {
        self.expect_open("end_stream")?;
        let width = self.check.width();
        let mut output = Vec::with_capacity(END_MARKER.len() + width);
        output.extend(END_MARKER);
        encode_le(checksum, width, &mut output);

        log::trace!("stream footer, checksum {:#x}", checksum);
        self.state = WriterState::Finalized;
        Ok(output)
    }
}

/// Parses a stream incrementally. Every parse method takes the unread part of
/// the stream and returns the number of bytes it consumed. When the input is
/// incomplete they fail with 'Truncated' and consume nothing, so the caller
/// can retry once more bytes arrive.
#[derive(Debug, Default)]
pub struct FrameReader {
    header: Option<StreamHeader>,
    /// Offset of the next unread byte from the start of the stream.
    position: usize,
    finished: bool,
}

impl FrameReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(&self) -> Option<&StreamHeader> {
        self.header.as_ref()
    }

    /// The number of stream bytes consumed so far.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns true after the footer was parsed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn format_error(&self, at: usize, msg: impl Into<String>) -> Error {
        Error::FormatError {
            offset: self.position + at,
            msg: msg.into(),
        }
    }

    pub fn parse_header(&mut self, input: &[u8]) -> Result<(StreamHeader, usize)> {
        if self.header.is_some() {
            return Err(Error::InvalidState("stream header already parsed".into()));
        }

        let magic_len = STREAM_MAGIC.len().min(input.len());
        if !match_signature(&STREAM_MAGIC, &input[..magic_len]) {
            return Err(self.format_error(0, "bad stream magic"));
        }
        if input.len() < HEADER_SIZE {
            return truncated(format!(
                "stream header needs {} bytes, {} available",
                HEADER_SIZE,
                input.len()
            ));
        }

        let version = input[STREAM_MAGIC.len()];
        if version != FORMAT_VERSION {
            return Err(self.format_error(
                STREAM_MAGIC.len(),
                format!("unsupported format version {}", version),
            ));
        }

        let flags = input[STREAM_MAGIC.len() + 1];
        let flags_at = STREAM_MAGIC.len() + 1;
        let check = CheckKind::from_id(flags & 0xf).map_err(|_| {
            self.format_error(flags_at, format!("unknown checksum kind {}", flags & 0xf))
        })?;
        let dict_log = (flags >> 4) as u32 + MIN_DICT_LOG;
        if dict_log > MAX_DICT_LOG {
            return Err(self.format_error(
                flags_at,
                format!("dictionary of 2^{} bytes is too large", dict_log),
            ));
        }

        let header = StreamHeader {
            check,
            dict_size: 1 << dict_log,
        };
        log::trace!("parsed stream header {:?}", header);
        self.header = Some(header);
        self.position += HEADER_SIZE;
        Ok((header, HEADER_SIZE))
    }

    /// Read a block size field at 'at'.
    fn read_size(
        &self,
        input: &[u8],
        at: usize,
        limit: usize,
        what: &str,
    ) -> Result<(usize, usize)> {
        let field = &input[at..input.len().min(at + MAX_SIZE_LEN)];
        match varint::decode(field) {
            Ok((read, val)) if val <= limit as u64 => Ok((read, val as usize)),
            Ok((_, val)) => Err(self.format_error(
                at,
                format!("{} {} exceeds the limit of {}", what, val, limit),
            )),
            Err(Error::Truncated(msg)) if field.len() < MAX_SIZE_LEN => {
                Err(Error::Truncated(msg))
            }
            Err(_) => Err(self.format_error(at, format!("malformed {}", what))),
        }
    }

    /// Parse the next block or the footer.
    pub fn parse_next(&mut self, input: &[u8]) -> Result<(Frame, usize)> {
        let header = match (self.header, self.finished) {
            (Some(header), false) => header,
            (None, _) => {
                return Err(Error::InvalidState("stream header not parsed".into()))
            }
            (_, true) => {
                return Err(Error::InvalidState("stream already ended".into()))
            }
        };
        let width = header.check.width();

        // Every complete block is longer than the end marker.
        if input.len() < END_MARKER.len() {
            return truncated("incomplete block header");
        }

        if match_signature(input, &END_MARKER) {
            let size = END_MARKER.len() + width;
            if input.len() < size {
                return truncated("incomplete stream footer");
            }
            let checksum = decode_le(&input[END_MARKER.len()..], width)?;
            log::trace!("parsed stream footer at {}", self.position);
            self.position += size;
            self.finished = true;
            return Ok((Frame::EndOfStream(StreamFooter { checksum }), size));
        }

        let (read, uncompressed_size) =
            self.read_size(input, 0, MAX_BLOCK_SIZE, "block size")?;
        let mut cursor = read;
        let (read, compressed_size) =
            self.read_size(input, cursor, MAX_PAYLOAD_SIZE, "payload size")?;
        cursor += read;

        if input.len() < cursor + width + compressed_size {
            return truncated(format!(
                "block needs {} bytes, {} available",
                cursor + width + compressed_size,
                input.len()
            ));
        }
        let expected = decode_le(&input[cursor..], width)?;
        cursor += width;
        let payload = &input[cursor..cursor + compressed_size];
        cursor += compressed_size;

        let actual = header.check.digest(payload);
        if actual != expected {
            return Err(Error::ChecksumMismatch {
                offset: self.position,
                expected,
                actual,
            });
        }

        log::trace!(
            "parsed block at {}: {} -> {} bytes",
            self.position,
            compressed_size,
            uncompressed_size
        );
        self.position += cursor;
        let block = Block {
            uncompressed_size,
            compressed_size,
            checksum: expected,
            payload: payload.to_vec(),
        };
        Ok((Frame::Block(block), cursor))
    }
}
