//! Incremental compression and decompression. A session accepts input in
//! chunks of any size and returns whatever output became available.
//!
//! The compressor cuts the input into blocks of exactly 'block_size' bytes
//! (the last block may be shorter), so the output does not depend on how the
//! input was chunked.

use crate::block::{decode_block, encode_block};
use crate::checksum::{CheckKind, Checksum};
use crate::error::{Error, Result};
use crate::frame::{Block, Frame, FrameReader, FrameWriter, WriterState};
use crate::lz::matcher::MatchTable;
use crate::lz::HistoryWindow;
use crate::utils::signatures::{match_signature, STREAM_MAGIC};
use crate::Context;

/// The state that one session carries from block to block.
#[derive(Debug)]
pub struct CompressionContext {
    params: Context,
    /// Input that was fed but not yet compressed.
    pending: Vec<u8>,
    window: HistoryWindow,
    /// The match finder's index of the window. Only the compressor fills it.
    table: MatchTable,
    /// Checksum of all of the uncompressed bytes so far.
    checksum: Checksum,
}

impl CompressionContext {
    pub fn new(params: Context) -> Self {
        Self {
            params,
            pending: Vec::new(),
            window: HistoryWindow::new(params.dict_size()),
            table: MatchTable::new(),
            checksum: Checksum::new(params.check()),
        }
    }

    pub fn params(&self) -> &Context {
        &self.params
    }

    pub fn window(&self) -> &HistoryWindow {
        &self.window
    }

    pub(crate) fn window_mut(&mut self) -> &mut HistoryWindow {
        &mut self.window
    }

    pub(crate) fn table_mut(&mut self) -> &mut MatchTable {
        &mut self.table
    }

    /// The window to match against, with the table that indexes it.
    pub(crate) fn match_state(&mut self) -> (&HistoryWindow, &mut MatchTable) {
        (&self.window, &mut self.table)
    }

    pub fn checksum(&self) -> &Checksum {
        &self.checksum
    }
}

/// Compress one block and frame it.
fn emit_block(
    raw: &[u8],
    cctx: &mut CompressionContext,
    writer: &mut FrameWriter,
) -> Result<Vec<u8>> {
    cctx.checksum.update(raw);
    let payload = encode_block(raw, cctx)?;
    let block = Block::new(raw.len(), payload, cctx.params.check())?;
    log::debug!(
        "compressed block: {} -> {} bytes",
        block.uncompressed_size,
        block.compressed_size
    );
    writer.emit_block(&block)
}

/// A streaming compressor.
#[derive(Debug)]
pub struct Compressor {
    /// None once the session was finished or aborted.
    cctx: Option<CompressionContext>,
    writer: FrameWriter,
}

impl Compressor {
    pub fn new(ctx: Context) -> Result<Self> {
        ctx.validate()?;
        Ok(Self {
            cctx: Some(CompressionContext::new(ctx)),
            writer: FrameWriter::new(),
        })
    }

    pub fn context(&self) -> Option<&Context> {
        self.cctx.as_ref().map(|cctx| cctx.params())
    }

    fn begin(cctx: &CompressionContext, writer: &mut FrameWriter) -> Result<Vec<u8>> {
        if writer.state() == WriterState::Uninitialized {
            return writer.begin_stream(cctx.params());
        }
        Ok(Vec::new())
    }

    fn feed_impl(
        cctx: &mut CompressionContext,
        writer: &mut FrameWriter,
        chunk: &[u8],
    ) -> Result<Vec<u8>> {
        let mut output = Self::begin(cctx, writer)?;
        let block_size = cctx.params.block_size();

        let mut pending = std::mem::take(&mut cctx.pending);
        pending.extend_from_slice(chunk);
        let mut consumed = 0;
        while pending.len() - consumed >= block_size {
            let raw = &pending[consumed..consumed + block_size];
            output.extend(emit_block(raw, cctx, writer)?);
            consumed += block_size;
        }
        pending.drain(..consumed);
        cctx.pending = pending;
        Ok(output)
    }

    /// Compress 'chunk' and return the bytes of every block that it
    /// completed. The first call also returns the stream header.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<u8>> {
        let cctx = self.cctx.as_mut().ok_or(Error::SessionClosed)?;
        let res = Self::feed_impl(cctx, &mut self.writer, chunk);
        if res.is_err() {
            self.cctx = None;
        }
        res
    }

    /// Flush the buffered input and end the stream. The session is closed
    /// afterwards.
    pub fn finish(&mut self) -> Result<Vec<u8>> {
        let mut cctx = self.cctx.take().ok_or(Error::SessionClosed)?;
        let writer = &mut self.writer;

        let mut output = Self::begin(&cctx, writer)?;
        let pending = std::mem::take(&mut cctx.pending);
        if !pending.is_empty() {
            output.extend(emit_block(&pending, &mut cctx, writer)?);
        }
        output.extend(writer.end_stream(cctx.checksum.value())?);
        Ok(output)
    }

    /// Drop the session without ending the stream.
    pub fn abort(&mut self) {
        self.cctx = None;
    }

    pub fn is_closed(&self) -> bool {
        self.cctx.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DecoderState {
    Running,
    /// The footer was verified.
    Eof,
    /// A corrupt stream was detected; the error is reported again.
    Poisoned(Error),
    Closed,
}

/// A streaming decompressor.
#[derive(Debug)]
pub struct Decompressor {
    state: DecoderState,
    /// Bytes that were fed but not parsed yet.
    input: Vec<u8>,
    reader: FrameReader,
    /// Created when the stream header is parsed.
    cctx: Option<CompressionContext>,
    memlimit: Option<usize>,
    /// Bytes that followed the end of the stream.
    unused: Vec<u8>,
}

impl Default for Decompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Decompressor {
    pub fn new() -> Self {
        Self {
            state: DecoderState::Running,
            input: Vec::new(),
            reader: FrameReader::new(),
            cctx: None,
            memlimit: None,
            unused: Vec::new(),
        }
    }

    /// A decompressor that refuses streams whose history window is larger
    /// than 'limit' bytes.
    pub fn with_memlimit(limit: usize) -> Self {
        Self {
            memlimit: Some(limit),
            ..Self::new()
        }
    }

    /// Returns true once the end of the stream was reached.
    pub fn is_eof(&self) -> bool {
        self.state == DecoderState::Eof
            || (self.state == DecoderState::Closed && self.reader.is_finished())
    }

    /// The bytes that were fed after the end of the stream.
    pub fn unused_data(&self) -> &[u8] {
        &self.unused
    }

    /// The checksum kind of the stream, once its header was parsed.
    pub fn check(&self) -> Option<CheckKind> {
        self.reader.header().map(|header| header.check)
    }

    /// Start decoding after parsing the stream header.
    fn start_stream(&mut self, consumed: usize) -> Result<usize> {
        let (header, read) = self.reader.parse_header(&self.input[consumed..])?;
        if let Some(limit) = self.memlimit {
            if header.dict_size > limit {
                return Err(Error::MemoryLimit {
                    needed: header.dict_size,
                    limit,
                });
            }
        }
        let params = Context::default()
            .with_dict_size(header.dict_size)
            .with_check(header.check);
        self.cctx = Some(CompressionContext::new(params));
        Ok(read)
    }

    /// Decode every complete frame in the input buffer.
    fn drain(&mut self) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut consumed = 0;

        loop {
            if self.cctx.is_none() {
                match self.start_stream(consumed) {
                    Ok(read) => consumed += read,
                    Err(Error::Truncated(_)) => break,
                    Err(err) => return Err(err),
                }
            }

            let frame = match self.reader.parse_next(&self.input[consumed..]) {
                Ok((frame, read)) => {
                    consumed += read;
                    frame
                }
                Err(Error::Truncated(_)) => break,
                Err(err) => return Err(err),
            };
            let cctx = match self.cctx.as_mut() {
                Some(cctx) => cctx,
                None => return Err(Error::InvalidState("no stream header".into())),
            };

            match frame {
                Frame::Block(block) => {
                    let raw = decode_block(&block.payload, cctx)?;
                    if raw.len() != block.uncompressed_size {
                        return Err(Error::CorruptStream(format!(
                            "block decoded to {} bytes, header says {}",
                            raw.len(),
                            block.uncompressed_size
                        )));
                    }
                    log::debug!(
                        "decompressed block: {} -> {} bytes",
                        block.compressed_size,
                        raw.len()
                    );
                    cctx.checksum.update(&raw);
                    output.extend(raw);
                }
                Frame::EndOfStream(footer) => {
                    let actual = cctx.checksum.value();
                    if actual != footer.checksum {
                        return Err(Error::ChecksumMismatch {
                            offset: self.reader.position(),
                            expected: footer.checksum,
                            actual,
                        });
                    }
                    self.state = DecoderState::Eof;
                    self.unused = self.input.split_off(consumed);
                    self.input.clear();
                    return Ok(output);
                }
            }
        }

        self.input.drain(..consumed);
        Ok(output)
    }

    /// Decompress 'chunk' and return the bytes that became available.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<u8>> {
        match &self.state {
            DecoderState::Running => {}
            DecoderState::Poisoned(err) => return Err(err.clone()),
            DecoderState::Eof | DecoderState::Closed => {
                return Err(Error::SessionClosed)
            }
        }

        self.input.extend_from_slice(chunk);
        let res = self.drain();
        if let Err(err) = &res {
            if err.is_fatal() {
                log::warn!("decompression failed: {}", err);
                self.state = DecoderState::Poisoned(err.clone());
                self.input.clear();
            }
        }
        res
    }

    /// End the session. Fails with 'Truncated' if the stream did not end.
    pub fn finish(&mut self) -> Result<Vec<u8>> {
        let state = std::mem::replace(&mut self.state, DecoderState::Closed);
        match state {
            DecoderState::Eof => Ok(Vec::new()),
            DecoderState::Running => Err(Error::Truncated(format!(
                "stream ended after {} bytes without a footer",
                self.reader.position() + self.input.len()
            ))),
            DecoderState::Poisoned(err) => {
                self.state = DecoderState::Poisoned(err.clone());
                Err(err)
            }
            DecoderState::Closed => Err(Error::SessionClosed),
        }
    }

    /// Drop the session and any buffered input.
    pub fn abort(&mut self) {
        self.state = DecoderState::Closed;
        self.input.clear();
        self.cctx = None;
    }
}

/// Compress 'data' into a complete stream.
pub fn compress(data: &[u8], ctx: Context) -> Result<Vec<u8>> {
    let mut compressor = Compressor::new(ctx)?;
    let mut output = compressor.feed(data)?;
    output.extend(compressor.finish()?);
    Ok(output)
}

/// Decompress one or more concatenated streams.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    let mut rest = data;
    loop {
        let mut decompressor = Decompressor::new();
        output.extend(decompressor.feed(rest)?);
        decompressor.finish()?;

        let unused = decompressor.unused_data();
        if unused.is_empty() {
            return Ok(output);
        }
        if !match_signature(unused, &STREAM_MAGIC) {
            return Err(Error::FormatError {
                offset: data.len() - unused.len(),
                msg: "trailing data after the end of the stream".into(),
            });
        }
        rest = &data[data.len() - unused.len()..];
    }
}
