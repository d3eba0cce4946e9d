use lzstream::coding::simple::{SimpleDecoder, SimpleEncoder};
use lzstream::utils::signatures::SIMPLE_ENC;
use lzstream::{Context, Decoder, Encoder, Error};
use rand_distr::Distribution;

type EncoderTy<'a> = SimpleEncoder<'a, 256, 4096>;
type DecoderTy<'a> = SimpleDecoder<'a, 256, 4096>;

#[test]
fn test_round_trip_simple_encoder() {
    let text = "entropy encoding is typically the last stage of a compression pipeline";
    let text = text.as_bytes();
    let mut compressed: Vec<u8> = Vec::new();
    let mut decompressed: Vec<u8> = Vec::new();
    let ctx = Context::preset(9);

    // Define an encoder with 8bit symbols, and 12bit states.
    EncoderTy::new(text, &mut compressed, ctx).encode().unwrap();
    assert!(compressed.starts_with(&SIMPLE_ENC));
    DecoderTy::new(&compressed, &mut decompressed).decode().unwrap();
    assert_eq!(text, decompressed);
}

fn round_trip(input: &[u8]) {
    let ctx = Context::preset(9);

    let mut compressed = Vec::new();
    let mut enc = EncoderTy::new(input, &mut compressed, ctx);
    let compressed_size = enc.encode().unwrap();
    assert_eq!(compressed.len(), compressed_size);

    let mut decompressed = Vec::new();
    let mut decoder = DecoderTy::new(&compressed, &mut decompressed);
    let (consumed, decompressed_size) = decoder.decode().unwrap();
    assert_eq!(compressed.len(), consumed);
    assert_eq!(decompressed.len(), decompressed_size);
    assert_eq!(decompressed, input);
}

#[test]
fn test_simple_coder_round_trip() {
    round_trip(&[]);
    round_trip(&[0]);
    round_trip(&[0, 0, 0, 0]);
    round_trip(&[0, 0, 1, 1, 2, 3]);
    round_trip(&[1, 251, 255, 0, 245, 32, 32, 142]);
    round_trip(&[254, 254, 254, 0, 0]);

    round_trip(&[
        254, 254, 254, 0, 0, 1, 251, 255, 0, 245, 32, 32, 142, 1, 251, 255, 0,
        245, 32, 32, 142, 38, 10, 223, 223, 102, 38, 10, 223, 223, 102, 99, 99,
    ]);

    let mut skewed = vec![0u8; 300];
    skewed.extend([48, 254, 59, 36]);
    skewed.extend(vec![0u8; 200]);
    skewed.extend([48, 254, 59, 36]);
    round_trip(&skewed);
}

#[test]
fn test_small_alphabet() {
    let ctx = Context::default();
    let input: Vec<u8> = (0..1000u32).map(|i| (i * i % 29) as u8).collect();

    let mut compressed = Vec::new();
    SimpleEncoder::<32, 4096>::new(&input, &mut compressed, ctx)
        .encode()
        .unwrap();
    let mut decompressed = Vec::new();
    SimpleDecoder::<32, 4096>::new(&compressed, &mut decompressed)
        .decode()
        .unwrap();
    assert_eq!(decompressed, input);

    // Symbols outside of the alphabet are rejected.
    let mut out = Vec::new();
    let res = SimpleEncoder::<32, 4096>::new(&[1, 2, 40], &mut out, ctx).encode();
    assert!(matches!(res, Err(Error::InvalidParameter(_))));
}

#[test]
fn test_simple_decoder() {
    let mut output = Vec::new();
    assert!(DecoderTy::new(&[], &mut output).decode().is_err());
    assert!(DecoderTy::new(&[1], &mut output).decode().is_err());
    assert!(DecoderTy::new(&[1; 1000], &mut output).decode().is_err());
    assert!(DecoderTy::new(&vec![0; 10000], &mut output).decode().is_err());
}

#[test]
fn test_simple_decoder_random() {
    use rand::thread_rng;
    use rand_distr::Uniform;

    let mut rng = thread_rng();
    let distr = Uniform::new(0, 255);

    // Decoding random input must fail cleanly or consume all of it.
    for i in 1..80 {
        let mut input = SIMPLE_ENC.to_vec();
        for _ in 0..i * 1001 {
            input.push(distr.sample(&mut rng) as u8);
        }

        let mut decoded = Vec::new();
        if let Ok((read, written)) = DecoderTy::new(&input, &mut decoded).decode() {
            assert!(read <= input.len());
            assert_eq!(written, decoded.len());
        }
    }
}
