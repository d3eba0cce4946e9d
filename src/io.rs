//! Adapters that connect the streaming sessions to 'std::io'.

use crate::error::Error;
use crate::session::{Compressor, Decompressor};
use crate::Context;
use std::io::{self, Read, Write};

/// The size of the chunks that 'Reader' pulls from its source.
const READ_CHUNK: usize = 1 << 16;

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        let kind = match err {
            Error::Truncated(_) => io::ErrorKind::UnexpectedEof,
            Error::InvalidParameter(_) => io::ErrorKind::InvalidInput,
            Error::InvalidState(_) | Error::SessionClosed => io::ErrorKind::Other,
            _ => io::ErrorKind::InvalidData,
        };
        io::Error::new(kind, err)
    }
}

/// Compresses everything written to it into 'W'. The stream is complete only
/// after 'finish' is called.
pub struct Writer<W: Write> {
    inner: W,
    compressor: Compressor,
}

impl<W: Write> Writer<W> {
    pub fn new(inner: W, ctx: Context) -> crate::Result<Self> {
        Ok(Self {
            inner,
            compressor: Compressor::new(ctx)?,
        })
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Write the last block and the footer, and return the sink.
    pub fn finish(mut self) -> io::Result<W> {
        let tail = self.compressor.finish()?;
        self.inner.write_all(&tail)?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for Writer<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let out = self.compressor.feed(buf)?;
        self.inner.write_all(&out)?;
        Ok(buf.len())
    }

    /// Flushes the sink. Input that does not fill a block stays buffered
    /// until 'finish'.
    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Decompresses a single stream read from 'R'.
pub struct Reader<R: Read> {
    inner: R,
    decompressor: Decompressor,
    /// Decoded bytes not handed out yet.
    buf: Vec<u8>,
    pos: usize,
    done: bool,
}

impl<R: Read> Reader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_decompressor(inner, Decompressor::new())
    }

    pub fn with_decompressor(inner: R, decompressor: Decompressor) -> Self {
        Self {
            inner,
            decompressor,
            buf: Vec::new(),
            pos: 0,
            done: false,
        }
    }

    /// The bytes that were read from the source past the end of the stream.
    pub fn unused_data(&self) -> &[u8] {
        self.decompressor.unused_data()
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Pull more data from the source and decode it.
    fn fill(&mut self) -> io::Result<()> {
        let mut chunk = vec![0u8; READ_CHUNK];
        let read = match self.inner.read(&mut chunk) {
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Err(err) => return Err(err),
        };

        if read == 0 {
            self.decompressor.finish()?;
            self.done = true;
            return Ok(());
        }
        self.buf = self.decompressor.feed(&chunk[..read])?;
        self.pos = 0;
        if self.decompressor.is_eof() {
            self.done = true;
        }
        Ok(())
    }
}

impl<R: Read> Read for Reader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        loop {
            if self.pos < self.buf.len() {
                let n = out.len().min(self.buf.len() - self.pos);
                out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
                self.pos += n;
                return Ok(n);
            }
            if self.done {
                return Ok(0);
            }
            self.fill()?;
        }
    }
}
