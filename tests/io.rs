use lzstream::io::{Reader, Writer};
use lzstream::{compress, CheckKind, Context};
use std::io::{self, Cursor, Read, Write};

fn sample_text(lines: usize) -> Vec<u8> {
    let mut text = String::new();
    for i in 0..lines {
        text.push_str(&format!("{} bottles of milk on the wall, take {} down\n", i, i % 7));
    }
    text.into_bytes()
}

#[test]
fn test_writer_reader_round_trip() {
    let text = sample_text(500);
    let ctx = Context::preset(3).with_block_size(4096);

    let mut writer = Writer::new(Vec::new(), ctx).unwrap();
    for chunk in text.chunks(1000) {
        writer.write_all(chunk).unwrap();
    }
    writer.flush().unwrap();
    let stream = writer.finish().unwrap();
    assert_eq!(stream, compress(&text, ctx).unwrap());

    let mut reader = Reader::new(Cursor::new(stream));
    let mut decoded = Vec::new();
    reader.read_to_end(&mut decoded).unwrap();
    assert_eq!(decoded, text);
}

#[test]
fn test_io_copy() {
    let text = sample_text(100);
    let ctx = Context::default().with_check(CheckKind::Xxh64);
    let mut writer = Writer::new(Vec::new(), ctx).unwrap();
    io::copy(&mut Cursor::new(&text), &mut writer).unwrap();
    let stream = writer.finish().unwrap();

    let mut out = Vec::new();
    io::copy(&mut Reader::new(Cursor::new(stream)), &mut out).unwrap();
    assert_eq!(out, text);
}

#[test]
fn test_small_reads() {
    let text = sample_text(50);
    let stream = compress(&text, Context::default()).unwrap();
    let mut reader = Reader::new(Cursor::new(stream));
    let mut decoded = Vec::new();
    let mut buf = [0u8; 7];
    loop {
        let n = reader.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        decoded.extend_from_slice(&buf[..n]);
    }
    assert_eq!(decoded, text);
}

#[test]
fn test_truncated_source_is_unexpected_eof() {
    let stream = compress(&sample_text(50), Context::default()).unwrap();
    let cut = stream[..stream.len() - 3].to_vec();
    let mut decoded = Vec::new();
    let err = Reader::new(Cursor::new(cut))
        .read_to_end(&mut decoded)
        .unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
}

#[test]
fn test_corrupt_source_is_invalid_data() {
    let mut stream = compress(&sample_text(50), Context::default()).unwrap();
    let mid = stream.len() / 2;
    stream[mid] ^= 0x40;
    let mut decoded = Vec::new();
    let err = Reader::new(Cursor::new(stream))
        .read_to_end(&mut decoded)
        .unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);
}

#[test]
fn test_reader_keeps_trailing_bytes() {
    let mut stream = compress(b"hello", Context::default()).unwrap();
    stream.extend_from_slice(b"tail");
    let mut reader = Reader::new(Cursor::new(stream));
    let mut decoded = Vec::new();
    reader.read_to_end(&mut decoded).unwrap();
    assert_eq!(decoded, b"hello");
    assert_eq!(reader.unused_data(), b"tail");
}

#[test]
fn test_invalid_context_is_rejected() {
    let ctx = Context::default().with_block_size(0);
    assert!(Writer::new(Vec::new(), ctx).is_err());
}
