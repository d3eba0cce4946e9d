pub mod bitvector;
pub mod block;
pub mod checksum;
pub mod coding;
pub mod error;
pub mod frame;
pub mod io;
pub mod lz;
pub mod nop;
pub mod pager;
pub mod session;
pub mod utils;

pub use checksum::{is_check_supported, CheckKind};
pub use error::{Error, Result};
pub use session::{
    compress, decompress, CompressionContext, Compressor, Decompressor,
};

/// The lowest supported compression level.
pub const MIN_LEVEL: u8 = 1;
/// The highest supported compression level.
pub const MAX_LEVEL: u8 = 12;
/// The level used by `Context::default`.
pub const DEFAULT_LEVEL: u8 = 6;

/// The smallest dictionary (history window) size, as a power of two.
pub const MIN_DICT_LOG: u32 = 12;
/// The largest dictionary size. Match distances never exceed it.
pub const MAX_DICT_LOG: u32 = 24;

/// The largest block the framer accepts.
pub const MAX_BLOCK_SIZE: usize = 1 << 24;
/// The block size used by `Context::default`.
pub const DEFAULT_BLOCK_SIZE: usize = 1 << 18;

/// Returns the version of the library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Stores information about the environment.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Context {
    /// Specifies the compression level.
    level: u8,
    /// Specifies the size of each block.
    block_size: usize,
    /// The size of the history window. Always a power of two.
    dict_size: usize,
    /// The integrity check written for each block and for the stream.
    check: CheckKind,
}

impl Context {
    /// Creates a context with the preset dictionary size of 'level'.
    pub fn new(level: u8, block_size: usize) -> Self {
        Self {
            level,
            block_size,
            dict_size: 1 << Self::preset_dict_log(level),
            check: CheckKind::default(),
        }
    }

    /// The context of the compression preset 'level'.
    pub fn preset(level: u8) -> Self {
        Self::new(level, DEFAULT_BLOCK_SIZE)
    }

    fn preset_dict_log(level: u8) -> u32 {
        match level {
            0..=3 => 18,
            4..=6 => 20,
            7..=9 => 22,
            _ => MAX_DICT_LOG,
        }
    }

    pub fn with_dict_size(mut self, dict_size: usize) -> Self {
        self.dict_size = dict_size;
        self
    }

    pub fn with_check(mut self, check: CheckKind) -> Self {
        self.check = check;
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn dict_size(&self) -> usize {
        self.dict_size
    }

    pub fn check(&self) -> CheckKind {
        self.check
    }

    /// log2 of the dictionary size.
    pub fn dict_log(&self) -> u32 {
        self.dict_size.trailing_zeros()
    }

    /// Check that every parameter is within the supported bounds.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&self.level) {
            return Err(Error::InvalidParameter(format!(
                "level {} is not in {}..={}",
                self.level, MIN_LEVEL, MAX_LEVEL
            )));
        }
        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(Error::InvalidParameter(format!(
                "block size {} is not in 1..={}",
                self.block_size, MAX_BLOCK_SIZE
            )));
        }
        let log = self.dict_log();
        if !self.dict_size.is_power_of_two()
            || !(MIN_DICT_LOG..=MAX_DICT_LOG).contains(&log)
        {
            return Err(Error::InvalidParameter(format!(
                "dictionary size {} must be a power of two between 2^{} and 2^{}",
                self.dict_size, MIN_DICT_LOG, MAX_DICT_LOG
            )));
        }
        Ok(())
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::preset(DEFAULT_LEVEL)
    }
}

/// A trait that defines the interface for encoding buffers.
pub trait Encoder<'a> {
    /// Creates a new Encoder that reads from 'input' and writes into 'output',
    /// with the encoder context 'ctx'.
    fn new(input: &'a [u8], output: &'a mut Vec<u8>, ctx: Context) -> Self;

    /// Encode the whole input buffer and return the number of bytes that were
    /// written into the output stream.
    fn encode(&mut self) -> Result<usize>;
}

/// A trait that defines the interface for decoding buffers.
pub trait Decoder<'a> {
    /// Creates a new Decoder that reads from 'input' and writes into 'output'.
    fn new(input: &'a [u8], output: &'a mut Vec<u8>) -> Self;

    /// Try to decode the buffer 'input', and return the number of input bytes
    /// that were consumed followed by the number of bytes written.
    fn decode(&mut self) -> Result<(usize, usize)>;
}
