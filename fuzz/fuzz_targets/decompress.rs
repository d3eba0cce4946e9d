#![no_main]

use libfuzzer_sys::fuzz_target;
use lzstream::Decompressor;

fuzz_target!(|data: &[u8]| {
    let mut decompressor = Decompressor::with_memlimit(1 << 20);
    for chunk in data.chunks(97) {
        if decompressor.feed(chunk).is_err() {
            return;
        }
    }
    let _ = decompressor.finish();
});
