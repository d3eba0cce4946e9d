#![no_main]

use libfuzzer_sys::fuzz_target;
use lzstream::{compress, decompress, Context};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    // The first byte picks the level and the block size.
    let level = 1 + data[0] % 9;
    let block_size = 1 + (data[0] as usize) * 64;
    let input = &data[1..];
    let ctx = Context::preset(level)
        .with_block_size(block_size)
        .with_dict_size(1 << 12);

    let stream = compress(input, ctx).unwrap();
    assert_eq!(decompress(&stream).unwrap(), input);
});
