use lzstream::bitvector::Bitvector;
use lzstream::Error;

#[test]
fn test_ser_des() {
    for num_bits in 1..120 {
        let mut bv = Bitvector::new();
        // Generate some data.
        for i in 0..num_bits {
            bv.write_bits(i ^ num_bits, 7).unwrap();
        }

        // Serialize, deserialize and compare the results.
        let mut output = Vec::new();
        let wrote = bv.serialize(&mut output);
        let (bv2, read) = Bitvector::deserialize(&output).unwrap();
        assert_eq!(bv, bv2);
        assert_eq!(read, wrote);
    }
}

#[test]
fn test_deserialize_short_input() {
    let mut bv = Bitvector::new();
    bv.write_bits(u64::MAX, 64).unwrap();
    bv.write_bits(0x5, 3).unwrap();
    let mut output = Vec::new();
    bv.serialize(&mut output);

    for len in 0..output.len() {
        let res = Bitvector::deserialize(&output[..len]);
        assert!(matches!(res, Err(Error::Truncated(_))), "length {}", len);
    }
}

#[test]
fn test_clear_upper() {
    assert_eq!(Bitvector::clear_upper_bits(0x3, 1), 1);
    assert_eq!(Bitvector::clear_upper_bits(0x3, 2), 3);
    assert_eq!(Bitvector::clear_upper_bits(0x3, 3), 3);
    assert_eq!(Bitvector::clear_upper_bits(0xffff, 8), 255);
}

#[test]
fn test_bitvector_simple() {
    let mut bv = Bitvector::new();

    assert_eq!(bv.len(), 0);
    bv.write_bits(0b1101, 4).unwrap();
    assert_eq!(bv.len(), 4);
    assert_eq!(bv.read_bits(1).unwrap(), 1);
    assert_eq!(bv.read_bits(1).unwrap(), 1);
    assert_eq!(bv.read_bits(1).unwrap(), 0);
    assert_eq!(bv.read_bits(1).unwrap(), 1);
    assert!(bv.is_empty());

    bv.write_bits(0xffaa, 16).unwrap();
    let upper = bv.read_bits(8).unwrap();
    let lower = bv.read_bits(8).unwrap();
    assert_eq!(upper, 0xff);
    assert_eq!(lower, 0xaa);
}

#[test]
fn test_width_limits() {
    let mut bv = Bitvector::new();
    assert!(matches!(bv.write_bits(1, 65), Err(Error::OutOfRange(_))));
    assert!(bv.is_empty());

    bv.write_bits(0x3, 5).unwrap();
    assert!(matches!(bv.read_bits(65), Err(Error::OutOfRange(_))));
    assert!(matches!(bv.read_bits(6), Err(Error::Truncated(_))));
    // A failed read leaves the bits in place.
    assert_eq!(bv.read_bits(5).unwrap(), 0x3);
    assert!(matches!(bv.read_bits(1), Err(Error::Truncated(_))));
    assert_eq!(bv.read_bits(0).unwrap(), 0);
}

#[test]
fn test_write_keeps_low_bits_only() {
    let mut bv = Bitvector::new();
    bv.write_bits(0xabcd, 4).unwrap();
    assert_eq!(bv.len(), 4);
    assert_eq!(bv.read_bits(4).unwrap(), 0xd);
}

#[test]
fn test_pop() {
    let mut bv = Bitvector::new();
    // Write and read a few pairs.
    for i in 0..1000 {
        bv.write_bits(i % 3, 1).unwrap();
        let val = i * 713;
        // Write a full word.
        bv.write_bits(val, 64).unwrap();
        let val2 = bv.read_bits(64).unwrap();
        assert_eq!(val, val2);
    }
    assert_eq!(bv.len(), 1000);
}

#[test]
fn test_bitvector_bug0() {
    let mut bv = Bitvector::new();
    bv.write_bits(0x0, 61).unwrap();
    bv.write_bits(0xae, 8).unwrap();
    assert_eq!(bv.read_bits(8).unwrap(), 0xae);
}

#[test]
fn test_bitvector_bug1() {
    let mut bv = Bitvector::new();

    let mut counter = 1;

    for i in 1..56 {
        // Start the check at different offset in the vector.
        bv.write_bits(0x1, i).unwrap();

        // Outer write.
        counter = (counter * 7) & 0xffffffff;
        bv.write_bits(counter, 32).unwrap();

        // Do an inner write and read to dirty the upper bits.
        bv.write_bits(0xaf, 8).unwrap();
        assert_eq!(bv.read_bits(8).unwrap(), 0xaf);

        // Check the outer value.
        let popped = bv.read_bits(32).unwrap();
        assert_eq!(counter & 0xffffffff, popped);
    }
}

#[test]
fn test_bitvector_endianness() {
    let mut bv = Bitvector::new();
    bv.write_bits(0x12, 8).unwrap();
    let a = bv.read_bits(8).unwrap();
    bv.write_bits(0x2, 4).unwrap();
    bv.write_bits(0x1, 4).unwrap();
    let b = bv.read_bits(8).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_bitvector_bug4() {
    let mut bv0 = Bitvector::new();
    let mut bv1 = Bitvector::new();

    let elem: u64 = 5657;
    let num_bits = 6;
    let mut state0 = elem;
    for _ in 0..num_bits {
        bv0.write_bits(state0, 1).unwrap();
        state0 >>= 1;
    }
    let mut state1 = elem;
    bv1.write_bits(state1, num_bits).unwrap();
    state1 >>= num_bits;
    assert_eq!(state1, state0);
    assert_eq!(bv0, bv1);
}

#[test]
fn test_bitvector_bug5() {
    let mut bv = Bitvector::new();
    bv.write_bits(0, 2).unwrap();
    bv.write_bits(0, 64).unwrap();
    let _ = bv.read_bits(64).unwrap();
    bv.write_bits(1, 1).unwrap();
    bv.write_bits(0xff, 64).unwrap();
    let _ = bv.read_bits(64).unwrap();
    bv.write_bits(2, 1).unwrap();
    let val = 2 * 713;
    bv.write_bits(val, 64).unwrap();
    assert_eq!(bv.read_bits(64).unwrap(), val);
}
