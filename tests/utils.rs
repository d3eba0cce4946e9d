use lzstream::bitvector::Bitvector;
use lzstream::Error;

#[test]
fn test_var_len_encoding_test() {
    use lzstream::utils::variable_length_encoding::decode_array32;
    use lzstream::utils::variable_length_encoding::encode_array32;

    fn test_round_trip32(input: &[u32]) {
        let mut buffer0 = Vec::new();
        let mut buffer1 = Vec::new();

        let wrote = encode_array32(input, &mut buffer0);
        assert_eq!(buffer0.len(), wrote);
        let read = decode_array32(&buffer0, &mut buffer1).unwrap();
        assert_eq!(wrote, read);
        assert_eq!(input, buffer1);
    }

    test_round_trip32(&[]);
    test_round_trip32(&[0]);
    test_round_trip32(&[1, 2, 3]);
    test_round_trip32(&[1, 65536, 1982, 1 << 20]);
    test_round_trip32(&[1, 2, 255, 256, 65536, 1 << 12, 256, 0, (1 << 18) - 1]);
}

#[test]
fn test_var_len_known_values() {
    use lzstream::utils::variable_length_encoding::{decode, encode};

    let mut buf = Vec::new();
    assert_eq!(encode(350, &mut buf), 2);
    assert_eq!(buf, [255, 95]);
    assert_eq!(encode(255, &mut buf), 2);
    assert_eq!(&buf[2..], [255, 0]);
    assert_eq!(decode(&buf).unwrap(), (2, 350));
    assert!(matches!(decode(&[255, 255]), Err(Error::Truncated(_))));
}

#[test]
fn test_varint() {
    use lzstream::utils::varint::{decode, encode, MAX_LEN};

    for val in [0, 1, 127, 128, 16383, 16384, 1 << 24, u32::MAX as u64, u64::MAX] {
        let mut buf = Vec::new();
        let wrote = encode(val, &mut buf);
        assert_eq!(buf.len(), wrote);
        assert!(wrote <= MAX_LEN);
        assert_eq!(decode(&buf).unwrap(), (wrote, val));
    }

    let mut buf = Vec::new();
    encode(1 << 24, &mut buf);
    assert_eq!(buf.len(), 4);
    assert!(matches!(decode(&buf[..3]), Err(Error::Truncated(_))));
    assert!(matches!(decode(&[0xff; 11]), Err(Error::OutOfRange(_))));
}

#[test]
fn test_array_encoding() {
    use lzstream::utils::array_encoding::{decode, encode};

    let mut buf = Vec::new();
    assert_eq!(encode(&[9, 8, 7], &mut buf), 7);
    let mut out = Vec::new();
    assert_eq!(decode(&buf, &mut out).unwrap(), 7);
    assert_eq!(out, [9, 8, 7]);

    let mut out = Vec::new();
    assert!(matches!(decode(&buf[..6], &mut out), Err(Error::Truncated(_))));
}

#[test]
fn test_little_endian_fields() {
    use lzstream::utils::number_encoding::{decode_le, encode_le};

    let mut buf = Vec::new();
    encode_le(0x1122334455667788, 4, &mut buf);
    assert_eq!(buf, [0x88, 0x77, 0x66, 0x55]);
    assert_eq!(decode_le(&buf, 4).unwrap(), 0x55667788);
    assert!(matches!(decode_le(&buf, 8), Err(Error::Truncated(_))));
}

#[test]
fn test_two_stream_offsets() {
    use lzstream::utils::two_stream_encoding::{decode32, encode32};

    let values = [0, 1, 2, 3, 12, 65233, 11241, (1 << 24) + 3];
    let mut bv = Bitvector::new();
    let tokens: Vec<u32> = values.iter().map(|v| encode32(*v, &mut bv)).collect();
    assert!(tokens.iter().all(|t| *t < 32));

    // The extra bits come back in reverse order.
    let mut decoded = Vec::new();
    for tok in tokens.iter().rev() {
        decoded.push(decode32(*tok, &mut bv).unwrap());
    }
    decoded.reverse();
    assert_eq!(decoded, values);
    assert!(bv.is_empty());

    assert!(matches!(decode32(40, &mut bv), Err(Error::CorruptStream(_))));
    assert!(matches!(decode32(3, &mut bv), Err(Error::Truncated(_))));
}
