//! This module handles the encoding and decoding of each block in the stream.
//! In this module we decide the order of transformations, such as matching
//! and entropy encoding.
//!
//! A block payload is made of four length-prefixed sub-streams: literals,
//! literal lengths, match offsets and match lengths. Matches may refer to
//! bytes of earlier blocks that are still held in the history window.

use crate::bitvector::Bitvector;
use crate::coding::simple::{SimpleDecoder, SimpleEncoder};
use crate::error::{corrupt, Error, Result};
use crate::lz::matcher::{select_matcher, Sequence};
use crate::nop::{NopDecoder, NopEncoder};
use crate::pager::{
    DecodeHandlerTy, EncodeHandlerTy, PagerDecoder, PagerEncoder,
};
use crate::session::CompressionContext;
use crate::utils::signatures::{match_signature, NOP_ENC, SIMPLE_ENC};

use crate::utils::array_encoding::decode as decode_arr;
use crate::utils::array_encoding::encode as encode_arr;

use crate::utils::two_stream_encoding;
use crate::utils::variable_length_encoding::decode_array32 as decode_vl32;
use crate::utils::variable_length_encoding::encode_array32 as encode_vl32;

use crate::{Context, Decoder, Encoder, MAX_BLOCK_SIZE};

pub use crate::lz::matcher::MIN_MATCH;

/// The longest match that the block format can express.
pub const MAX_MATCH: usize = 65536;

/// Offset codes below this value select one of the recent offsets.
const REP_CODES: usize = 3;

/// The number of offset tokens. A token is the bit width of the offset code,
/// see 'two_stream_encoding'.
const OFFSET_ALPHABET: usize = 32;

/// Selects the size of each entropy unit.
const ENTROPY_PAGE_SIZE: usize = 1 << 18;

/// The three most recently used match distances, most recent first.
struct RecentOffsets {
    recent: [usize; REP_CODES],
}

impl RecentOffsets {
    fn new() -> Self {
        Self { recent: [1, 4, 8] }
    }

    /// Move the entry at 'idx' to the front.
    fn promote(&mut self, idx: usize) {
        let distance = self.recent[idx];
        self.recent.copy_within(0..idx, 1);
        self.recent[0] = distance;
    }

    fn push(&mut self, distance: usize) {
        self.recent.copy_within(0..REP_CODES - 1, 1);
        self.recent[0] = distance;
    }

    /// Returns the offset code of 'distance' and updates the history.
    fn encode(&mut self, distance: usize) -> u32 {
        match self.recent.iter().position(|d| *d == distance) {
            Some(idx) => {
                self.promote(idx);
                idx as u32
            }
            None => {
                self.push(distance);
                (distance + REP_CODES) as u32
            }
        }
    }

    /// Returns the distance of the offset 'code' and updates the history.
    fn decode(&mut self, code: u32) -> usize {
        let code = code as usize;
        if code < REP_CODES {
            let distance = self.recent[code];
            self.promote(code);
            distance
        } else {
            let distance = code - REP_CODES;
            self.push(distance);
            distance
        }
    }
}

/// Encode a list of offsets, with a histogram that favors short indices, into
/// two streams: tokens and extra bits. The tokens are entropy coded, and
/// the extra bits are encoded into a bitstream. See 'two_stream_encoding' for
/// details.
pub fn encode_offset_stream(input: &[u32], ctx: Context) -> Result<Vec<u8>> {
    let mut bv = Bitvector::new();
    let mut tokens = Vec::with_capacity(input.len());

    // Split the offsets into two streams: tokens and bitvector.
    for val in input {
        tokens.push(two_stream_encoding::encode32(*val, &mut bv) as u8);
    }

    let mut encoded =
        encode_paged_ent(&tokens, ctx, ent_or_nop::<OFFSET_ALPHABET>)?;

    // Append the bitstream after the tokens.
    bv.serialize(&mut encoded);
    Ok(encoded)
}

/// Decode the list of offsets that were encoded with 'encode_offset_stream'.
pub fn decode_offset_stream(input: &[u8]) -> Result<Vec<u32>> {
    let (read, tokens) =
        decode_paged_ent(input, decode_ent_or_nop::<OFFSET_ALPHABET>)?;

    let (mut bv, bv_read) = Bitvector::deserialize(&input[read..])?;
    if read + bv_read != input.len() {
        return corrupt("trailing bytes after the offset stream");
    }

    // We need to process the values in reverse, because the bits are
    // stored in the bitvector in reverse.
    let mut res: Vec<u32> = Vec::with_capacity(tokens.len());
    for tok in tokens.iter().rev() {
        res.push(two_stream_encoding::decode32(*tok as u32, &mut bv)?);
    }
    if !bv.is_empty() {
        return corrupt("unused bits in the offset stream");
    }
    res.reverse();
    Ok(res)
}

/// Try to perform entropy encoding, but if it does not pay off store the page.
fn ent_or_nop<const ALPHABET: usize>(
    input: &[u8],
    ctx: Context,
) -> Result<Vec<u8>> {
    let mut encoded: Vec<u8> = Vec::new();
    let new_size =
        SimpleEncoder::<ALPHABET, 4096>::new(input, &mut encoded, ctx).encode()?;

    if new_size < input.len() {
        return Ok(encoded);
    }
    encoded.clear();
    NopEncoder::new(input, &mut encoded, ctx).encode()?;
    Ok(encoded)
}

/// Decode a page written by 'ent_or_nop', selecting the decoder by its tag.
fn decode_ent_or_nop<const ALPHABET: usize>(
    input: &[u8],
) -> Result<(usize, Vec<u8>)> {
    let mut decoded: Vec<u8> = Vec::new();
    let (read, _) = if match_signature(input, &SIMPLE_ENC) {
        SimpleDecoder::<ALPHABET, 4096>::new(input, &mut decoded).decode()?
    } else if match_signature(input, &NOP_ENC) {
        NopDecoder::new(input, &mut decoded).decode()?
    } else {
        return corrupt("unknown page encoding");
    };
    Ok((read, decoded))
}

fn encode_paged_ent(
    input: &[u8],
    ctx: Context,
    callback: EncodeHandlerTy,
) -> Result<Vec<u8>> {
    let mut encoded: Vec<u8> = Vec::new();
    let mut encoder = PagerEncoder::new(input, &mut encoded, ctx);
    encoder.set_callback(callback);
    encoder.set_page_size(ENTROPY_PAGE_SIZE);
    encoder.encode()?;
    Ok(encoded)
}

fn decode_paged_ent(
    input: &[u8],
    callback: DecodeHandlerTy,
) -> Result<(usize, Vec<u8>)> {
    let mut decoded: Vec<u8> = Vec::new();
    let mut decoder = PagerDecoder::new(input, &mut decoded);
    decoder.set_callback(callback);
    let (read, _) = decoder.decode()?;
    Ok((read, decoded))
}

/// Decode a paged stream that must span all of 'input'.
fn decode_whole_stream(input: &[u8]) -> Result<Vec<u8>> {
    let (read, decoded) = decode_paged_ent(input, decode_ent_or_nop::<256>)?;
    if read != input.len() {
        return corrupt("trailing bytes after a sub-stream");
    }
    Ok(decoded)
}

/// Split a stream of sequences into the four block sub-streams and encode
/// them. 'input' is the matcher input; the sequences address it directly.
fn encode_sequences(
    input: &[u8],
    sequences: impl Iterator<Item = Sequence>,
    ctx: Context,
) -> Result<Vec<u8>> {
    let mut lits: Vec<u8> = Vec::new();
    let mut lit_lens: Vec<u32> = Vec::new();
    let mut mat_offsets: Vec<u32> = Vec::new();
    let mut mat_lens: Vec<u32> = Vec::new();
    let mut recent = RecentOffsets::new();

    for (lit, mat) in sequences {
        lits.extend(&input[lit.clone()]);
        lit_lens.push(lit.len() as u32);

        // Empty matches show up at the end of the block and carry no offset.
        if mat.is_empty() {
            mat_offsets.push(0);
            mat_lens.push(0);
            continue;
        }

        let distance = lit.end - mat.start;
        if distance == 0 || distance > ctx.dict_size() {
            return Err(Error::InvalidParameter(format!(
                "match distance {} exceeds the dictionary size {}",
                distance,
                ctx.dict_size()
            )));
        }
        if !(MIN_MATCH..=MAX_MATCH).contains(&mat.len()) {
            return Err(Error::InvalidParameter(format!(
                "match length {} is not in {}..={}",
                mat.len(),
                MIN_MATCH,
                MAX_MATCH
            )));
        }
        mat_offsets.push(recent.encode(distance));
        mat_lens.push(mat.len() as u32);
    }

    // Turn everything to U8 arrays.
    let mut lit_len_u8: Vec<u8> = Vec::new();
    let mut mat_len_u8: Vec<u8> = Vec::new();
    encode_vl32(&lit_lens, &mut lit_len_u8);
    encode_vl32(&mat_lens, &mut mat_len_u8);

    // Entropy encode what is possible.
    let lit_stream = encode_paged_ent(&lits, ctx, ent_or_nop::<256>)?;
    let lit_len_stream = encode_paged_ent(&lit_len_u8, ctx, ent_or_nop::<256>)?;
    let mat_off_stream = encode_offset_stream(&mat_offsets, ctx)?;
    let mat_len_stream = encode_paged_ent(&mat_len_u8, ctx, ent_or_nop::<256>)?;

    // To the wire!
    let mut result = Vec::new();
    encode_arr(&lit_stream, &mut result);
    encode_arr(&lit_len_stream, &mut result);
    encode_arr(&mat_off_stream, &mut result);
    encode_arr(&mat_len_stream, &mut result);
    Ok(result)
}

/// Compress 'raw' against the history held by 'cctx' and return the block
/// payload. The raw bytes are appended to the history window. On error the
/// window is left as it was.
pub fn encode_block(raw: &[u8], cctx: &mut CompressionContext) -> Result<Vec<u8>> {
    if raw.len() > MAX_BLOCK_SIZE {
        return Err(Error::InvalidParameter(format!(
            "block of {} bytes exceeds the maximum of {}",
            raw.len(),
            MAX_BLOCK_SIZE
        )));
    }
    let ctx = *cctx.params();

    // The matcher sees the history followed by the new bytes.
    let mark = cctx.window().len();
    cctx.window_mut().push_slice(raw);
    let (window, table) = cctx.match_state();
    let input = window.as_slice();
    let res = select_matcher::<MAX_MATCH>(ctx.level(), input, mark, table, ctx.dict_size())
        .and_then(|matcher| encode_sequences(input, matcher, ctx));

    match res {
        Ok(payload) => {
            let evicted = cctx.window_mut().evict();
            cctx.table_mut().consume(evicted);
            Ok(payload)
        }
        Err(err) => {
            cctx.window_mut().truncate(mark);
            cctx.table_mut().reset();
            Err(err)
        }
    }
}

/// Decode a block payload written by 'encode_block' and return the raw bytes.
/// The bytes are appended to the history window of 'cctx'. On error the
/// window is left as it was.
pub fn decode_block(
    payload: &[u8],
    cctx: &mut CompressionContext,
) -> Result<Vec<u8>> {
    let dict_size = cctx.params().dict_size();
    let window = cctx.window_mut();
    let mark = window.len();

    match decode_into_window(payload, dict_size, window, mark) {
        Ok(()) => {
            let raw = window.tail(mark).to_vec();
            window.evict();
            Ok(raw)
        }
        Err(err) => {
            window.truncate(mark);
            Err(err)
        }
    }
}

fn decode_into_window(
    payload: &[u8],
    dict_size: usize,
    window: &mut crate::lz::HistoryWindow,
    mark: usize,
) -> Result<()> {
    let mut literals: Vec<u8> = Vec::new();
    let mut lit_lens: Vec<u8> = Vec::new();
    let mut mat_offs: Vec<u8> = Vec::new();
    let mut mat_lens: Vec<u8> = Vec::new();

    let mut read = 0;
    read += decode_arr(&payload[read..], &mut literals)?;
    read += decode_arr(&payload[read..], &mut lit_lens)?;
    read += decode_arr(&payload[read..], &mut mat_offs)?;
    read += decode_arr(&payload[read..], &mut mat_lens)?;
    if read != payload.len() {
        return corrupt("trailing bytes after the block sub-streams");
    }

    let literals = decode_whole_stream(&literals)?;
    let lit_lens = decode_whole_stream(&lit_lens)?;
    let mat_offs = decode_offset_stream(&mat_offs)?;
    let mat_lens = decode_whole_stream(&mat_lens)?;

    let mut lit_lens32: Vec<u32> = Vec::new();
    let mut mat_lens32: Vec<u32> = Vec::new();
    if decode_vl32(&lit_lens, &mut lit_lens32)? != lit_lens.len()
        || decode_vl32(&mat_lens, &mut mat_lens32)? != mat_lens.len()
    {
        return corrupt("trailing bytes after a length stream");
    }

    let count = lit_lens32.len();
    if mat_lens32.len() != count || mat_offs.len() != count {
        return corrupt(format!(
            "sub-streams disagree on the number of sequences: {}, {}, {}",
            count,
            mat_offs.len(),
            mat_lens32.len()
        ));
    }

    let mut recent = RecentOffsets::new();
    let mut lit_cursor = 0;
    for i in 0..count {
        let lit_len = lit_lens32[i] as usize;
        let mat_len = mat_lens32[i] as usize;

        let produced = window.len() - mark;
        if produced + lit_len + mat_len > MAX_BLOCK_SIZE {
            return corrupt("block expands past the maximum block size");
        }

        // Copy the literals.
        let lit = match literals.get(lit_cursor..lit_cursor + lit_len) {
            Some(lit) => lit,
            None => return corrupt("literal length past the literal stream"),
        };
        lit_cursor += lit_len;
        window.push_slice(lit);

        // Copy the match.
        if mat_len == 0 {
            if mat_offs[i] != 0 {
                return corrupt("offset given for an empty match");
            }
            continue;
        }
        if mat_len > MAX_MATCH {
            return corrupt(format!("match length {} is too long", mat_len));
        }
        let distance = recent.decode(mat_offs[i]);
        if distance == 0 || distance > dict_size || distance > window.len() {
            return corrupt(format!(
                "match distance {} points outside of the history",
                distance
            ));
        }
        window.copy_match(distance, mat_len);
    }

    if lit_cursor != literals.len() {
        return corrupt("unused bytes in the literal stream");
    }
    Ok(())
}
