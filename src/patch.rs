//! Patch model, context verification, and the two appliers.
//!
//! A [`Patch`] is pure configuration: an offset, the exact bytes expected
//! there (the precondition), and a replacement.  Replacements never change
//! the image length — a region replacement consumes exactly `region_len`
//! bytes, padding the remainder with a filler opcode, so every offset after
//! the region stays valid without any relocation pass.
//!
//! Configuration is validated up front by [`PatchSet::validate`]; a
//! replacement that overflows its region or a window that runs past the end
//! of the image is rejected before the first edit, never mid-run.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::genie::{cpu_to_file, GenieCode, GenieError};

/// 6502 NOP — the filler opcode used by every built-in region replacement.
pub const NOP_FILLER: u8 = 0xEA;

// ── Configuration types ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Replacement {
    /// Replace the single byte at the patch offset.
    Byte { value: u8 },
    /// Replace `region_len` bytes with `code` followed by `filler` padding.
    Region {
        code: Vec<u8>,
        region_len: usize,
        filler: u8,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    pub offset: usize,
    /// Exact bytes expected at `offset` before the edit is allowed.
    pub expected: Vec<u8>,
    pub replacement: Replacement,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeEntry {
    pub code: String,
    pub description: String,
}

/// An ordered patch list plus the codes applied after it.
///
/// Serialized as JSON so sets can live outside the binary; the built-in set
/// is in [`crate::presets`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchSet {
    pub name: String,
    /// Inserted before the file extension when deriving an output path.
    pub output_suffix: String,
    pub patches: Vec<Patch>,
    pub codes: Vec<CodeEntry>,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{description}: replacement code is {code_len} bytes but the region holds {region_len}")]
    RegionOverflow {
        code_len: usize,
        region_len: usize,
        description: String,
    },
    #[error("{description}: window ${offset:04X}..${end:04X} runs past the end of the image ({image_len} bytes)")]
    OutOfBounds {
        offset: usize,
        end: usize,
        image_len: usize,
        description: String,
    },
    #[error("{description}: expected-byte window is empty")]
    EmptyWindow { description: String },
    #[error("invalid Game Genie code {code:?}: {source}")]
    BadCode { code: String, source: GenieError },
}

impl Patch {
    /// Bytes the edit itself touches, starting at `offset`.
    fn edit_len(&self) -> usize {
        match &self.replacement {
            Replacement::Byte { .. } => 1,
            Replacement::Region { region_len, .. } => *region_len,
        }
    }

    pub fn validate(&self, image_len: usize) -> Result<(), ConfigError> {
        if self.expected.is_empty() {
            return Err(ConfigError::EmptyWindow {
                description: self.description.clone(),
            });
        }
        if let Replacement::Region { code, region_len, .. } = &self.replacement {
            if code.len() > *region_len {
                return Err(ConfigError::RegionOverflow {
                    code_len: code.len(),
                    region_len: *region_len,
                    description: self.description.clone(),
                });
            }
        }
        let span = self.expected.len().max(self.edit_len());
        let end = self.offset.saturating_add(span);
        if end > image_len {
            return Err(ConfigError::OutOfBounds {
                offset: self.offset,
                end,
                image_len,
                description: self.description.clone(),
            });
        }
        Ok(())
    }
}

impl PatchSet {
    /// Reject misconfiguration before any edit: overflowing regions,
    /// out-of-bounds windows, empty preconditions, unparseable codes, and
    /// code targets outside the image.
    pub fn validate(&self, image_len: usize) -> Result<(), ConfigError> {
        for patch in &self.patches {
            patch.validate(image_len)?;
        }
        for (code, _) in self.parsed_codes()? {
            let offset = cpu_to_file(code.decode().address).map_err(|source| {
                ConfigError::BadCode {
                    code: code.as_str().to_string(),
                    source,
                }
            })?;
            if offset >= image_len {
                return Err(ConfigError::OutOfBounds {
                    offset,
                    end: offset + 1,
                    image_len,
                    description: format!("code {}", code),
                });
            }
        }
        Ok(())
    }

    /// Parse every code entry, surfacing the first bad one.
    pub fn parsed_codes(&self) -> Result<Vec<(GenieCode, String)>, ConfigError> {
        self.codes
            .iter()
            .map(|entry| {
                GenieCode::parse(&entry.code)
                    .map(|code| (code, entry.description.clone()))
                    .map_err(|source| ConfigError::BadCode {
                        code: entry.code.clone(),
                        source,
                    })
            })
            .collect()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

// ── Context verification ─────────────────────────────────────────────────────

/// Byte-exact window equality: `true` iff `image[offset..offset+expected.len()]`
/// equals `expected`.  A window that runs past the end of the image never
/// matches.  This is the sole gate before any mutation; a layout shift
/// between image revisions fails here instead of corrupting unrelated bytes.
pub fn context_matches(image: &[u8], offset: usize, expected: &[u8]) -> bool {
    match offset.checked_add(expected.len()).and_then(|end| image.get(offset..end)) {
        Some(window) => window == expected,
        None => false,
    }
}

// ── Appliers ─────────────────────────────────────────────────────────────────

/// Replace one byte, soft-skipping when the current byte is not `old`.
/// Returns whether the write happened; the buffer is untouched on skip.
pub fn apply_single(image: &mut [u8], offset: usize, old: u8, new: u8) -> bool {
    match image.get_mut(offset) {
        Some(byte) if *byte == old => {
            *byte = new;
            true
        }
        _ => false,
    }
}

/// Overwrite `[offset, offset+region_len)` with `code` padded by `filler`.
///
/// The caller has already verified the precondition via [`context_matches`]
/// and validated `code.len() <= region_len` and the bounds via
/// [`Patch::validate`]; this function only performs the write.  Bytes outside
/// the region are untouched and the image length never changes.
pub fn apply_region(image: &mut [u8], offset: usize, code: &[u8], region_len: usize, filler: u8) {
    debug_assert!(code.len() <= region_len);
    debug_assert!(offset + region_len <= image.len());
    let region = &mut image[offset..offset + region_len];
    region[..code.len()].copy_from_slice(code);
    for byte in &mut region[code.len()..] {
        *byte = filler;
    }
}
