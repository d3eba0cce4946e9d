//! The 'PagerEncoder' and 'PagerDecoder' are responsible for taking a stream of bytes and
//! partitioning them into pages that are encoded and decoded individually, so
//! that each page gets its own entropy statistics.

use crate::error::{corrupt, Error, Result};
use crate::utils::number_encoding::{decode32, encode32};
use crate::utils::signatures::{match_signature, PAGER_SIG, START_PAGE_SIG};
use crate::{Context, Decoder, Encoder};

/// A callback for handling the encoding of each page.
pub type EncodeHandlerTy = fn(input: &[u8], ctx: Context) -> Result<Vec<u8>>;
/// A callback for handling the decoding of each page.
pub type DecodeHandlerTy = fn(input: &[u8]) -> Result<(usize, Vec<u8>)>;

/// The page size used when none is set.
const DEFAULT_PAGE_SIZE: usize = 1 << 18;

/// Splits the input stream into pages and encodes each one of them
/// independently using the registered callback.
pub struct PagerEncoder<'a> {
    /// The uncompressed input.
    input: &'a [u8],
    /// The output stream.
    output: &'a mut Vec<u8>,
    /// A callback for encoding each page.
    callback: Option<EncodeHandlerTy>,
    /// The size of each page.
    page_size: usize,
    /// Encoder context.
    ctx: Context,
}

impl<'a> PagerEncoder<'a> {
    /// Register a callback for handling each page.
    pub fn set_callback(&mut self, callback: EncodeHandlerTy) {
        self.callback = Some(callback)
    }

    /// Sets the size of each page in the stream.
    pub fn set_page_size(&mut self, new_size: usize) {
        self.page_size = new_size
    }

    fn encode_impl(&mut self) -> Result<usize> {
        let callback = self.callback.ok_or_else(|| {
            Error::InvalidState("pager encoder has no page callback".into())
        })?;
        if self.page_size == 0 {
            return Err(Error::InvalidParameter("page size of zero".into()));
        }

        // An empty input is still written as a single empty page.
        let num_parts = 1 + self.input.len() / self.page_size;
        self.output.extend(PAGER_SIG);
        let mut written = PAGER_SIG.len();
        written += encode32(num_parts as u32, self.output);

        for i in 0..num_parts {
            let start = self.page_size * i;
            let end = (start + self.page_size).min(self.input.len());
            let compressed = callback(&self.input[start..end], self.ctx)?;
            self.output.extend(START_PAGE_SIG);
            written += START_PAGE_SIG.len();
            written += encode32(compressed.len() as u32, self.output);
            self.output.extend(compressed.iter());
            written += compressed.len();
        }

        Ok(written)
    }
}

/// Decodes a stream that was partitioned into multiple pages.
pub struct PagerDecoder<'a> {
    /// The encoded input.
    input: &'a [u8],
    /// The output stream.
    output: &'a mut Vec<u8>,
    /// A callback for handling the decoding of each page.
    callback: Option<DecodeHandlerTy>,
}

impl<'a> PagerDecoder<'a> {
    /// Sets the callback for handling the decoding of each page.
    pub fn set_callback(&mut self, callback: DecodeHandlerTy) {
        self.callback = Some(callback)
    }

    /// Returns the number of bytes consumed and the number of bytes written.
    fn decode_impl(&mut self) -> Result<(usize, usize)> {
        let callback = self.callback.ok_or_else(|| {
            Error::InvalidState("pager decoder has no page callback".into())
        })?;
        if !match_signature(self.input, &PAGER_SIG) {
            return corrupt("missing page list signature");
        }
        let mut cursor = PAGER_SIG.len();
        let (len, parts) = decode32(&self.input[cursor..])?;
        cursor += len;

        let mut written = 0;
        for _ in 0..parts {
            if !match_signature(&self.input[cursor..], &START_PAGE_SIG) {
                return corrupt(format!("missing page signature at {}", cursor));
            }
            cursor += START_PAGE_SIG.len();

            let (len, length) = decode32(&self.input[cursor..])?;
            let length = length as usize;
            cursor += len;

            let packet = match self.input.get(cursor..cursor + length) {
                Some(packet) => packet,
                None => return corrupt("page extends past the end of the input"),
            };
            let (read, buff) = callback(packet)?;
            if read != length {
                return corrupt(format!(
                    "page of {} bytes decoded only {} bytes",
                    length, read
                ));
            }

            cursor += length;
            written += buff.len();
            self.output.extend(&buff);
        }
        Ok((cursor, written))
    }
}

impl<'a> Encoder<'a> for PagerEncoder<'a> {
    fn new(input: &'a [u8], output: &'a mut Vec<u8>, ctx: Context) -> Self {
        PagerEncoder {
            input,
            output,
            callback: None,
            page_size: DEFAULT_PAGE_SIZE,
            ctx,
        }
    }

    fn encode(&mut self) -> Result<usize> {
        self.encode_impl()
    }
}

impl<'a> Decoder<'a> for PagerDecoder<'a> {
    fn new(input: &'a [u8], output: &'a mut Vec<u8>) -> Self {
        PagerDecoder {
            input,
            output,
            callback: None,
        }
    }

    fn decode(&mut self) -> Result<(usize, usize)> {
        self.decode_impl()
    }
}
