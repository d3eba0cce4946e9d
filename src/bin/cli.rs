//! This is the command line tool that streams an input file through the
//! compressor or the decompressor.

extern crate clap;
extern crate env_logger;
extern crate log;

use clap::{value_parser, Arg, ArgAction, Command};
use lzstream::io::{Reader, Writer};
use lzstream::utils::signatures::FILE_EXTENSION;
use lzstream::{CheckKind, Context, DEFAULT_BLOCK_SIZE, DEFAULT_LEVEL};

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read};
use std::process::ExitCode;
use std::time::Instant;

/// A scoped utility struct for measuring and reporting time.
struct Timer {
    start: std::time::Instant,
}

impl Timer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let now = Instant::now();
        if let Some(duration) = now.checked_duration_since(self.start) {
            log::info!(
                "Operation completed in {:03} seconds",
                duration.as_secs_f32()
            );
        }
    }
}

fn compress_file(input: &str, output: &str, ctx: Context) -> io::Result<()> {
    let mut src = BufReader::new(File::open(input)?);
    let dest = BufWriter::new(File::create(output)?);
    let mut writer = Writer::new(dest, ctx)?;
    io::copy(&mut src, &mut writer)?;
    writer.finish()?;
    Ok(())
}

fn decompress_file(input: &str, output: &str) -> io::Result<()> {
    let mut reader = Reader::new(BufReader::new(File::open(input)?));
    let mut dest = BufWriter::new(File::create(output)?);
    io::copy(&mut reader, &mut dest)?;
    Ok(())
}

/// Decompress 'compressed' and compare it with 'original'.
fn verify(original: &str, compressed: &str) -> io::Result<bool> {
    let mut expected = Vec::new();
    File::open(original)?.read_to_end(&mut expected)?;
    let mut decoded = Vec::new();
    Reader::new(BufReader::new(File::open(compressed)?)).read_to_end(&mut decoded)?;
    Ok(expected == decoded)
}

fn file_size(path: &str) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

fn main() -> ExitCode {
    let matches = Command::new("CLI")
        .version(lzstream::version())
        .arg(
            Arg::new("decompress")
                .short('d')
                .long("decompress")
                .help("Try to decompress the input")
                .action(ArgAction::SetTrue)
                .conflicts_with("compress"),
        )
        .arg(
            Arg::new("compress")
                .short('c')
                .long("compress")
                .help("Compress the input")
                .conflicts_with("decompress")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Path of the output file")
                .num_args(1),
        )
        .arg(
            Arg::new("level")
                .short('l')
                .long("level")
                .value_name("N")
                .help("Compression level, 1 (fast) to 12 (small)")
                .value_parser(value_parser!(u8).range(1..=12))
                .num_args(1),
        )
        .arg(
            Arg::new("check")
                .long("check")
                .value_name("KIND")
                .help("The integrity check of the stream")
                .value_parser(["crc32", "xxh64"])
                .num_args(1),
        )
        .arg(
            Arg::new("block-size")
                .long("block-size")
                .value_name("BYTES")
                .help("The number of bytes in each block")
                .value_parser(value_parser!(usize))
                .num_args(1),
        )
        .arg(
            Arg::new("verify")
                .long("verify")
                .help("Decompress the result and compare it with the input")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("INPUT")
                .help("Sets the input file to use")
                .required(true)
                .index(1),
        )
        .get_matches();

    env_logger::builder().format_timestamp(None).init();

    let mut cli_compress = matches.get_flag("compress");
    let cli_decompress = matches.get_flag("decompress");
    let cli_verify = matches.get_flag("verify");
    let mut cli_output_path = matches.get_one::<String>("output").cloned();
    let level = matches.get_one::<u8>("level").copied().unwrap_or(DEFAULT_LEVEL);
    let block_size = matches
        .get_one::<usize>("block-size")
        .copied()
        .unwrap_or(DEFAULT_BLOCK_SIZE);
    let check = matches
        .get_one::<String>("check")
        .map(|name| CheckKind::from_name(name))
        .transpose();
    let check = match check {
        Ok(check) => check.unwrap_or_default(),
        Err(err) => {
            log::error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let input_path = match matches.get_one::<String>("INPUT") {
        Some(path) => path.clone(),
        None => return ExitCode::FAILURE,
    };

    // The user did not specify if this is compress or decompress. Try to figure
    // out using the extension.
    let ends_with_ext = input_path.ends_with(FILE_EXTENSION);
    if !cli_compress && !cli_decompress && !ends_with_ext {
        cli_compress = true;
    }

    // Come up with a file name.
    if cli_output_path.is_none() {
        if ends_with_ext {
            // remove the extension.
            let end = input_path.len() - FILE_EXTENSION.len();
            cli_output_path = Some(String::from(&input_path[0..end]));
        } else {
            // Add the extension.
            cli_output_path = Some(input_path.clone() + FILE_EXTENSION);
        }
    }
    let out = cli_output_path.unwrap_or_default();
    let timer = Timer::new();

    if cli_compress {
        let ctx = Context::new(level, block_size).with_check(check);
        if let Err(err) = compress_file(&input_path, &out, ctx) {
            log::error!("Compression failed: {}", err);
            return ExitCode::FAILURE;
        }
        let (from, to) = (file_size(&input_path), file_size(&out));
        log::info!("Compressed from {} to {} bytes.", from, to);
        log::info!("Compression ratio is {:.4}x.", from as f64 / to as f64);
        log::info!("Wrote {}.", out);

        if cli_verify {
            match verify(&input_path, &out) {
                Ok(true) => log::info!("Correct!"),
                Ok(false) => {
                    log::error!("Incorrect!");
                    return ExitCode::FAILURE;
                }
                Err(err) => {
                    log::error!("Could not decompress the file: {}", err);
                    return ExitCode::FAILURE;
                }
            }
        }
        drop(timer);
        return ExitCode::SUCCESS;
    }

    if let Err(err) = decompress_file(&input_path, &out) {
        log::error!("Decompression failed: {}", err);
        return ExitCode::FAILURE;
    }
    log::info!(
        "Decompressed from {} to {} bytes.",
        file_size(&input_path),
        file_size(&out)
    );
    log::info!("Wrote {}.", out);
    drop(timer);
    ExitCode::SUCCESS
}
