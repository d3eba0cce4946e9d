#![no_main]

use libfuzzer_sys::fuzz_target;
use lzstream::coding::simple::SimpleDecoder;
use lzstream::Decoder;

fuzz_target!(|data: &[u8]| {
    let mut output = Vec::new();
    let _ = SimpleDecoder::<256, 4096>::new(data, &mut output).decode();
});
