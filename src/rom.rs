use byteorder::ReadBytesExt;
use std::io::{self, Cursor, Read};
use std::path::Path;
use thiserror::Error;

/// First four bytes of every iNES image.
pub const MAGIC: &[u8; 4] = b"NES\x1a";
/// Total byte length of the supported image (16-byte header + 2 PRG banks + 1 CHR bank).
pub const ROM_SIZE: usize = 40_976;
/// Byte length of the iNES header preceding PRG data.
pub const HEADER_SIZE: usize = 16;
pub const EXPECTED_PRG_BANKS: u8 = 2;
pub const EXPECTED_CHR_BANKS: u8 = 1;

#[derive(Error, Debug)]
pub enum RomError {
    #[error("Unexpected ROM size {actual} (expected {ROM_SIZE})")]
    BadSize { actual: usize },
    #[error("Not a valid iNES image (missing NES header magic)")]
    BadMagic,
    #[error("Unexpected bank count PRG={prg} CHR={chr} (expected {EXPECTED_PRG_BANKS},{EXPECTED_CHR_BANKS})")]
    BadBankCount { prg: u8, chr: u8 },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// An owned, validated iNES image.
///
/// Construction goes through [`Rom::parse`], which checks (in order) the
/// fixed total size, the magic marker, and the PRG/CHR bank-count header
/// fields, returning the first failing reason.  A `Rom` is never mutated
/// through a shared reference; the patch engine clones the bytes once and
/// works on its own copy.
#[derive(Debug, Clone)]
pub struct Rom {
    data: Vec<u8>,
}

impl Rom {
    pub fn parse(data: Vec<u8>) -> Result<Self, RomError> {
        if data.len() != ROM_SIZE {
            return Err(RomError::BadSize { actual: data.len() });
        }
        let mut cur = Cursor::new(&data);
        let mut magic = [0u8; 4];
        cur.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(RomError::BadMagic);
        }
        let prg = cur.read_u8()?;
        let chr = cur.read_u8()?;
        if prg != EXPECTED_PRG_BANKS || chr != EXPECTED_CHR_BANKS {
            return Err(RomError::BadBankCount { prg, chr });
        }
        Ok(Self { data })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RomError> {
        Self::parse(std::fs::read(path)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), RomError> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }

    /// Re-wrap a buffer produced by the patch engine.  Every engine edit is
    /// length-preserving, so the header fields checked by `parse` are intact.
    pub(crate) fn from_patched_bytes(data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), ROM_SIZE);
        Self { data }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn prg_banks(&self) -> u8 {
        self.data[4]
    }

    pub fn chr_banks(&self) -> u8 {
        self.data[5]
    }

    /// CRC32 of the whole image (the checksum ROM databases key on).
    pub fn crc32(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.data);
        hasher.finalize()
    }

    /// BLAKE3 of the whole image, hex-encoded.
    pub fn blake3_hex(&self) -> String {
        blake3::hash(&self.data).to_hex().to_string()
    }
}
