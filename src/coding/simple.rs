//! A table-based ANS (tANS) entropy coder.
//!
//! The stream is: the 'SIMPLE_ENC' tag, the number of symbols, the normalized
//! histogram (one run-length number per symbol) and the bitvector. The
//! encoder walks the input backwards so that the decoder, which reads the
//! bitvector as a stack, produces the symbols in their original order.

use crate::bitvector::Bitvector;
use crate::coding::hist::{num_bits, Histogram};
use crate::error::{corrupt, Error, Result};
use crate::utils::number_encoding::{decode32, encode32};
use crate::utils::signatures::{match_signature, SIMPLE_ENC};
use crate::utils::variable_length_encoding as vl;
use crate::{Context, Decoder, Encoder, MAX_BLOCK_SIZE};

/// Return True if 'norm_hist' has one bin per symbol and fills the table.
fn is_valid_histogram<const ALPHABET: usize, const TABLESIZE: usize>(
    norm_hist: &[u32],
) -> bool {
    let sum: u64 = norm_hist.iter().map(|v| *v as u64).sum();
    norm_hist.len() == ALPHABET && sum == TABLESIZE as u64
}

/// Assign a symbol to every state. Symbols are scattered around the table
/// instead of grouped together, following
/// http://fastcompression.blogspot.com/2014/02/fse-distributing-symbol-values.html
fn spread_symbols<const TABLESIZE: usize>(norm_hist: &[u32]) -> Vec<u8> {
    let mut state_table = vec![0u8; TABLESIZE];
    // A large odd step visits every slot of a power-of-two table once.
    let step = 118081;
    let mut pos: usize = 0;

    for (sym, occ) in norm_hist.iter().enumerate() {
        for _ in 0..*occ {
            state_table[pos % TABLESIZE] = sym as u8;
            pos += step;
        }
    }
    debug_assert!(pos % TABLESIZE == 0);
    state_table
}

/// Walk the spread table and hand every (symbol, from_state, to_state)
/// transition to 'visit'. Each symbol owns the states F..2F, where F is its
/// normalized frequency. Reference: cbloom "make_tables1".
/// http://cbloomrants.blogspot.com/2014/02/02-04-14-understanding-ans-6.html
fn for_each_transition<const TABLESIZE: usize>(
    norm_hist: &[u32],
    mut visit: impl FnMut(usize, u32, usize),
) {
    let mut next_state: Vec<u32> = norm_hist.to_vec();
    for (slot, sym) in spread_symbols::<TABLESIZE>(norm_hist).iter().enumerate() {
        let sym = *sym as usize;
        let from_state = next_state[sym];
        next_state[sym] += 1;
        visit(sym, from_state, slot + TABLESIZE);
    }
}

fn table_log<const TABLESIZE: usize>() -> usize {
    num_bits(TABLESIZE as u32 - 1) as usize
}

/// Maps (symbol, state) to the state that encodes the symbol.
struct EncodeTable<const ALPHABET: usize, const TABLESIZE: usize> {
    /// Indexed by 'sym * 2 * TABLESIZE + state'.
    next: Vec<u16>,
    /// The first state that is too large to encode each symbol.
    limit: Vec<u32>,
}

impl<const ALPHABET: usize, const TABLESIZE: usize> EncodeTable<ALPHABET, TABLESIZE> {
    fn new(norm_hist: &[u32]) -> Self {
        debug_assert!(is_valid_histogram::<ALPHABET, TABLESIZE>(norm_hist));
        let mut next = vec![0u16; ALPHABET * TABLESIZE * 2];
        for_each_transition::<TABLESIZE>(norm_hist, |sym, from, to| {
            next[sym * TABLESIZE * 2 + from as usize] = to as u16;
        });
        let limit = norm_hist.iter().map(|freq| 2 * freq).collect();
        Self { next, limit }
    }

    /// Push the bits that bring 'state' into the range of 'sym', then move
    /// to the state that encodes 'sym'.
    fn encode_symbol(&self, state: &mut u32, sym: u8, bv: &mut Bitvector) {
        debug_assert!((TABLESIZE..2 * TABLESIZE).contains(&(*state as usize)));
        let limit = self.limit[sym as usize];
        while *state >= limit {
            bv.push_word((*state & 1) as u64, 1);
            *state >>= 1;
        }
        *state = self.next[sym as usize * TABLESIZE * 2 + *state as usize] as u32;
    }
}

/// Maps each state to the symbol it decodes and the state before it.
struct DecodeTable<const TABLESIZE: usize> {
    entries: Vec<(u32, u8)>,
}

impl<const TABLESIZE: usize> DecodeTable<TABLESIZE> {
    fn new(norm_hist: &[u32]) -> Self {
        let mut entries = vec![(0, 0); TABLESIZE * 2];
        for_each_transition::<TABLESIZE>(norm_hist, |sym, from, to| {
            entries[to] = (from, sym as u8);
        });
        Self { entries }
    }

    fn decode_symbol(&self, state: &mut u32, bv: &mut Bitvector) -> u8 {
        let (prev, sym) = self.entries[*state as usize];
        *state = prev;
        while (*state as usize) < TABLESIZE && !bv.is_empty() {
            *state = (*state << 1) | bv.pop_bit() as u32;
        }
        sym
    }
}

/// Encodes a buffer of symbols below 'ALPHABET' with a table of 'TABLESIZE'
/// states.
pub struct SimpleEncoder<'a, const ALPHABET: usize, const TABLESIZE: usize> {
    /// The uncompressed input.
    input: &'a [u8],
    /// The output stream.
    output: &'a mut Vec<u8>,
}

impl<'a, const ALPHABET: usize, const TABLESIZE: usize>
    SimpleEncoder<'a, ALPHABET, TABLESIZE>
{
    fn encode_impl(&mut self) -> Result<usize> {
        if let Some(sym) = self.input.iter().find(|s| **s as usize >= ALPHABET)
        {
            return Err(Error::InvalidParameter(format!(
                "symbol {} is outside of the alphabet of {}",
                sym, ALPHABET
            )));
        }
        let mut hist = Histogram::<ALPHABET>::from_data(self.input);
        hist.normalize(TABLESIZE);
        let norm_hist = hist.get_bins();
        let table = EncodeTable::<ALPHABET, TABLESIZE>::new(norm_hist);

        let mut bv = Bitvector::new();
        let mut state = 2 * TABLESIZE as u32 - 1;
        for sym in self.input.iter().rev() {
            table.encode_symbol(&mut state, *sym, &mut bv);
        }
        // The decoder starts from the final state.
        bv.push_word((state as usize - TABLESIZE) as u64, table_log::<TABLESIZE>());

        self.output.extend(SIMPLE_ENC);
        let mut wrote = SIMPLE_ENC.len();
        wrote += encode32(self.input.len() as u32, self.output);
        wrote += norm_hist.iter().map(|v| vl::encode(*v, self.output)).sum::<usize>();
        wrote += bv.serialize(self.output);
        Ok(wrote)
    }
}

/// Decodes the streams that 'SimpleEncoder' writes.
pub struct SimpleDecoder<'a, const ALPHABET: usize, const TABLESIZE: usize> {
    /// The compressed input.
    input: &'a [u8],
    /// The output stream.
    output: &'a mut Vec<u8>,
}

impl<'a, const ALPHABET: usize, const TABLESIZE: usize>
    SimpleDecoder<'a, ALPHABET, TABLESIZE>
{
    /// Decode the input, and return the number of bytes read and written.
    fn decode_impl(&mut self) -> Result<(usize, usize)> {
        if !match_signature(self.input, &SIMPLE_ENC) {
            return corrupt("missing entropy stream signature");
        }
        let mut read = SIMPLE_ENC.len();
        let (len, count) = decode32(&self.input[read..])?;
        let count = count as usize;
        if count > MAX_BLOCK_SIZE {
            return corrupt(format!("entropy stream of {} symbols", count));
        }
        read += len;

        let mut norm_hist = Vec::with_capacity(ALPHABET);
        for _ in 0..ALPHABET {
            let (len, val) = vl::decode(&self.input[read..])?;
            read += len;
            norm_hist.push(val);
        }
        if !is_valid_histogram::<ALPHABET, TABLESIZE>(&norm_hist) {
            return corrupt("entropy histogram does not sum to the table size");
        }
        let table = DecodeTable::<TABLESIZE>::new(&norm_hist);

        let (mut bv, bv_len) = Bitvector::deserialize(&self.input[read..])?;
        let mut state = TABLESIZE as u32 + bv.read_bits(table_log::<TABLESIZE>())? as u32;
        self.output.reserve(count);
        for _ in 0..count {
            if (state as usize) < TABLESIZE {
                return corrupt("entropy decoder state underflow");
            }
            let sym = table.decode_symbol(&mut state, &mut bv);
            self.output.push(sym);
        }
        if !bv.is_empty() {
            return corrupt(format!("{} unused bits in the entropy stream", bv.len()));
        }
        Ok((read + bv_len, count))
    }
}

impl<'a, const ALPHABET: usize, const TABLESIZE: usize> Encoder<'a>
    for SimpleEncoder<'a, ALPHABET, TABLESIZE>
{
    fn new(input: &'a [u8], output: &'a mut Vec<u8>, _ctx: Context) -> Self {
        SimpleEncoder { input, output }
    }

    fn encode(&mut self) -> Result<usize> {
        self.encode_impl()
    }
}

impl<'a, const ALPHABET: usize, const TABLESIZE: usize> Decoder<'a>
    for SimpleDecoder<'a, ALPHABET, TABLESIZE>
{
    fn new(input: &'a [u8], output: &'a mut Vec<u8>) -> Self {
        SimpleDecoder { input, output }
    }

    fn decode(&mut self) -> Result<(usize, usize)> {
        self.decode_impl()
    }
}
