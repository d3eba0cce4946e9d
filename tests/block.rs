use lzstream::block::{decode_block, encode_block, encode_offset_stream, MAX_MATCH};
use lzstream::nop::NopEncoder;
use lzstream::pager::PagerEncoder;
use lzstream::utils::array_encoding;
use lzstream::utils::variable_length_encoding::encode_array32;
use lzstream::{CompressionContext, Context, Encoder, Error, Result, MAX_BLOCK_SIZE};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn sample_text() -> Vec<u8> {
    let mut text = Vec::new();
    for i in 0..400 {
        let line = format!("line {} of the sample: the quick brown fox {}\n", i, i % 7);
        text.extend(line.as_bytes());
    }
    text
}

fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen()).collect()
}

/// Encode 'blocks' in order with one context and decode them with another.
fn round_trip(ctx: Context, blocks: &[&[u8]]) -> Vec<Vec<u8>> {
    let mut enc = CompressionContext::new(ctx);
    let mut dec = CompressionContext::new(ctx);
    let mut payloads = Vec::new();
    for raw in blocks {
        let payload = encode_block(raw, &mut enc).unwrap();
        let decoded = decode_block(&payload, &mut dec).unwrap();
        assert_eq!(&decoded, raw);
        assert_eq!(enc.window().as_slice(), dec.window().as_slice());
        payloads.push(payload);
    }
    payloads
}

#[test]
fn test_block_round_trip() {
    let text = sample_text();
    let random = random_bytes(5000, 1);
    for level in 1..=12 {
        let ctx = Context::preset(level);
        round_trip(ctx, &[&[]]);
        round_trip(ctx, &[&[1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 2, 2, 2, 2, 0, 0]]);
        round_trip(ctx, &[&[1, 1, 1, 1, 1, 1, 1, 1, 1, 5, 1, 1, 1, 1, 1, 1]]);
        round_trip(ctx, &[b"123456789abcd&ef&gh&ijk&lm7no*aaaa aaaa aaaaaaaa"]);
        round_trip(ctx, &[&text]);
        round_trip(ctx, &[&random]);
    }
}

#[test]
fn test_empty_block_is_valid() {
    let payloads = round_trip(Context::default(), &[&[], &[], b"abc", &[]]);
    assert!(payloads.iter().all(|p| !p.is_empty()));
}

#[test]
fn test_repetitive_block_is_small() {
    let input = b"AAAA".repeat(1000);
    let payloads = round_trip(Context::default(), &[&input]);
    assert!(payloads[0].len() < 400, "payload of {} bytes", payloads[0].len());
}

#[test]
fn test_matches_cross_blocks() {
    let first = random_bytes(1000, 2);
    let payloads = round_trip(Context::default(), &[&first, &first]);
    // The second block is a single match into the first one.
    assert!(payloads[1].len() * 4 < payloads[0].len());

    // Without the history the reference points outside of the window.
    let mut fresh = CompressionContext::new(Context::default());
    let res = decode_block(&payloads[1], &mut fresh);
    assert!(matches!(res, Err(Error::CorruptStream(_))));
    assert!(fresh.window().is_empty());
}

#[test]
fn test_small_dictionary_evicts() {
    let ctx = Context::preset(6).with_dict_size(1 << 12);
    let text = sample_text();
    let chunks: Vec<&[u8]> = text.chunks(3000).collect();
    round_trip(ctx, &chunks);

    let mut enc = CompressionContext::new(ctx);
    for chunk in &chunks {
        encode_block(chunk, &mut enc).unwrap();
        assert!(enc.window().len() <= 1 << 12);
    }
    assert_eq!(enc.window().as_slice(), &text[text.len() - (1 << 12)..]);
}

#[test]
fn test_encoding_is_deterministic() {
    let text = sample_text();
    let mut a = CompressionContext::new(Context::default());
    let mut b = CompressionContext::new(Context::default());
    for chunk in text.chunks(4096) {
        assert_eq!(
            encode_block(chunk, &mut a).unwrap(),
            encode_block(chunk, &mut b).unwrap()
        );
    }
}

#[test]
fn test_oversized_block() {
    let mut cctx = CompressionContext::new(Context::default());
    let raw = vec![0u8; MAX_BLOCK_SIZE + 1];
    let res = encode_block(&raw, &mut cctx);
    assert!(matches!(res, Err(Error::InvalidParameter(_))));
}

#[test]
fn test_corrupt_payload_does_not_panic() {
    let text = sample_text();
    let mut enc = CompressionContext::new(Context::default());
    let payload = encode_block(&text[..2000], &mut enc).unwrap();

    for i in 0..payload.len() {
        let mut corrupt = payload.clone();
        corrupt[i] ^= 0x5a;
        let mut dec = CompressionContext::new(Context::default());
        if decode_block(&corrupt, &mut dec).is_err() {
            assert!(dec.window().is_empty());
        }
    }

    // Cutting the payload short is always detected.
    for len in 0..payload.len() {
        let mut dec = CompressionContext::new(Context::default());
        assert!(decode_block(&payload[..len], &mut dec).is_err());
    }
}

#[test]
fn test_long_repeat_at_every_level() {
    // The second copy is one long run of matches, each capped at MAX_MATCH,
    // some of them preceded by literals they could grow into.
    let first = random_bytes(200_000, 1);
    let mut input = first.clone();
    input.extend_from_slice(&first);
    for level in 1..=12 {
        let ctx = Context::preset(level).with_block_size(1 << 20);
        let payloads = round_trip(ctx, &[&input]);
        // The small tables of the fast levels lose most of the first copy.
        if level < 9 {
            continue;
        }
        assert!(
            payloads[0].len() < first.len() + first.len() / 10,
            "level {}: {} bytes",
            level,
            payloads[0].len()
        );
    }
}

fn encode_nop(input: &[u8], ctx: Context) -> Result<Vec<u8>> {
    let mut encoded: Vec<u8> = Vec::new();
    NopEncoder::new(input, &mut encoded, ctx).encode()?;
    Ok(encoded)
}

/// A paged sub-stream whose pages are all stored.
fn stored(input: &[u8]) -> Vec<u8> {
    let mut encoded = Vec::new();
    let mut encoder = PagerEncoder::new(input, &mut encoded, Context::default());
    encoder.set_callback(encode_nop);
    encoder.encode().unwrap();
    encoded
}

/// Build a block payload from the four sequence streams.
fn block_payload(literals: &[u8], lit_lens: &[u32], offsets: &[u32], mat_lens: &[u32]) -> Vec<u8> {
    let mut lit_len_bytes = Vec::new();
    let mut mat_len_bytes = Vec::new();
    encode_array32(lit_lens, &mut lit_len_bytes);
    encode_array32(mat_lens, &mut mat_len_bytes);

    let mut payload = Vec::new();
    array_encoding::encode(&stored(literals), &mut payload);
    array_encoding::encode(&stored(&lit_len_bytes), &mut payload);
    let offsets = encode_offset_stream(offsets, Context::default()).unwrap();
    array_encoding::encode(&offsets, &mut payload);
    array_encoding::encode(&stored(&mat_len_bytes), &mut payload);
    payload
}

#[test]
fn test_decoder_enforces_match_length_bound() {
    let ctx = Context::default();

    // Offset code 1 selects the initial recent distance of 4.
    let longest = block_payload(b"abcd", &[4], &[1], &[MAX_MATCH as u32]);
    let mut cctx = CompressionContext::new(ctx);
    let raw = decode_block(&longest, &mut cctx).unwrap();
    assert_eq!(raw.len(), 4 + MAX_MATCH);
    assert!(raw.chunks(4).all(|chunk| chunk == b"abcd"));

    let too_long = block_payload(b"abcd", &[4], &[1], &[MAX_MATCH as u32 + 1]);
    let mut cctx = CompressionContext::new(ctx);
    let res = decode_block(&too_long, &mut cctx);
    assert!(matches!(res, Err(Error::CorruptStream(_))));
    assert!(cctx.window().is_empty());
}
