//! Stores its input unchanged behind a small header. Used whenever entropy
//! coding would make a stream larger.

use crate::error::{corrupt, truncated, Result};
use crate::utils::number_encoding::{decode32, encode32};
use crate::utils::signatures::{match_signature, NOP_ENC};
use crate::{Context, Decoder, Encoder};

pub struct NopEncoder<'a> {
    /// The uncompressed input.
    input: &'a [u8],
    /// The output stream.
    output: &'a mut Vec<u8>,
}

impl<'a> NopEncoder<'a> {
    fn encode_impl(&mut self) -> usize {
        self.output.extend(NOP_ENC);
        encode32(self.input.len() as u32, self.output);
        self.output.extend(self.input);
        NOP_ENC.len() + 4 + self.input.len()
    }
}

pub struct NopDecoder<'a> {
    /// The stored input.
    input: &'a [u8],
    /// The output stream.
    output: &'a mut Vec<u8>,
}

impl<'a> NopDecoder<'a> {
    fn decode_impl(&mut self) -> Result<(usize, usize)> {
        let sig_len = NOP_ENC.len();
        if !match_signature(self.input, &NOP_ENC) {
            return corrupt("missing stored stream signature");
        }
        let (_, buff_len) = decode32(&self.input[sig_len..])?;
        let start = sig_len + 4;
        let end = start + buff_len as usize;
        match self.input.get(start..end) {
            Some(stored) => {
                self.output.extend_from_slice(stored);
                Ok((end, stored.len()))
            }
            None => truncated(format!(
                "stored stream of {} bytes, {} available",
                buff_len,
                self.input.len() - start
            )),
        }
    }
}

impl<'a> Encoder<'a> for NopEncoder<'a> {
    fn new(input: &'a [u8], output: &'a mut Vec<u8>, _ctx: Context) -> Self {
        NopEncoder { input, output }
    }

    fn encode(&mut self) -> Result<usize> {
        Ok(self.encode_impl())
    }
}

impl<'a> Decoder<'a> for NopDecoder<'a> {
    fn new(input: &'a [u8], output: &'a mut Vec<u8>) -> Self {
        NopDecoder { input, output }
    }

    fn decode(&mut self) -> Result<(usize, usize)> {
        self.decode_impl()
    }
}
