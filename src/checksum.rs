//! Integrity checks used by the framer: CRC32 (4 bytes on the wire) and
//! XXH64 (8 bytes on the wire).

use crate::error::{Error, Result};
use std::fmt;
use xxhash_rust::xxh64::Xxh64;

/// The kinds of integrity checks a stream can carry. The discriminant is the
/// id stored in the stream header flags.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum CheckKind {
    #[default]
    Crc32 = 1,
    Xxh64 = 2,
}

impl CheckKind {
    /// Number of bytes the checksum occupies on the wire.
    pub fn width(self) -> usize {
        match self {
            CheckKind::Crc32 => 4,
            CheckKind::Xxh64 => 8,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            1 => Ok(CheckKind::Crc32),
            2 => Ok(CheckKind::Xxh64),
            _ => Err(Error::InvalidParameter(format!(
                "unknown checksum kind {}",
                id
            ))),
        }
    }

    /// Parse the names used on the command line.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "crc32" => Ok(CheckKind::Crc32),
            "xxh64" => Ok(CheckKind::Xxh64),
            _ => Err(Error::InvalidParameter(format!(
                "unknown checksum '{}'",
                name
            ))),
        }
    }

    /// Compute the checksum of 'data' in one go.
    pub fn digest(self, data: &[u8]) -> u64 {
        let mut hasher = Checksum::new(self);
        hasher.update(data);
        hasher.value()
    }
}

/// Returns true if this build can verify streams that use 'kind'.
pub fn is_check_supported(kind: CheckKind) -> bool {
    matches!(kind, CheckKind::Crc32 | CheckKind::Xxh64)
}

enum State {
    Crc32(crc32fast::Hasher),
    Xxh64(Box<Xxh64>),
}

/// A running checksum over a sequence of buffers.
pub struct Checksum {
    state: State,
}

impl Checksum {
    pub fn new(kind: CheckKind) -> Self {
        let state = match kind {
            CheckKind::Crc32 => State::Crc32(crc32fast::Hasher::new()),
            CheckKind::Xxh64 => State::Xxh64(Box::new(Xxh64::new(0))),
        };
        Self { state }
    }

    pub fn kind(&self) -> CheckKind {
        match self.state {
            State::Crc32(_) => CheckKind::Crc32,
            State::Xxh64(_) => CheckKind::Xxh64,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            State::Crc32(h) => h.update(data),
            State::Xxh64(h) => h.update(data),
        }
    }

    /// The checksum of everything seen so far. Does not reset the state.
    pub fn value(&self) -> u64 {
        match &self.state {
            State::Crc32(h) => h.clone().finalize() as u64,
            State::Xxh64(h) => h.digest(),
        }
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Checksum")
            .field("kind", &self.kind())
            .field("value", &format_args!("{:#x}", self.value()))
            .finish()
    }
}
