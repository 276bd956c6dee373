//! The patch engine — an ordered, stateful fold over one working buffer.
//!
//! # How it works
//!
//! [`apply_set`] validates the configuration, clones the image bytes once,
//! then attempts every patch in list order.  Each patch's precondition is
//! checked against the buffer *as mutated by every earlier patch*, so the
//! list cannot be reordered or parallelised without changing semantics.
//! A mismatch skips that patch and the run continues; nothing aborts
//! mid-list.
//!
//! After the patch fold, every Game Genie code is decoded and its value
//! written at the mapped file offset unconditionally — no precondition, no
//! skip.  Codes are an overlay by design (the original device replaces
//! whatever byte is present); the report records each overwritten byte so
//! the caller can see what changed.
//!
//! # Run-level outcome
//!
//! A run where no patch applied is a failure ([`PatchReport::is_success`]);
//! the caller must not write output for it.  Partial application (some
//! patches skipped) is success.  Code writes never affect the accounting.

use thiserror::Error;

use crate::genie::{cpu_to_file, GenieError};
use crate::patch::{apply_region, apply_single, context_matches, ConfigError, PatchSet, Replacement};
use crate::rom::Rom;

// ── Outcome types ────────────────────────────────────────────────────────────

/// Why a patch was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The expected window did not match the current image bytes.
    ContextMismatch {
        expected_hex: String,
        actual_hex: String,
    },
}

/// Result of attempting one patch against the working buffer.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub description: String,
    pub offset: usize,
    pub applied: bool,
    pub skip: Option<SkipReason>,
}

/// One unconditional code-derived write.
#[derive(Debug, Clone)]
pub struct CodeWrite {
    pub code: String,
    pub address: u16,
    pub offset: usize,
    pub old: u8,
    pub new: u8,
    pub description: String,
}

/// Complete report for one run.
#[derive(Debug, Default)]
pub struct PatchReport {
    /// Patches whose precondition matched and whose edit was written.
    pub applied: usize,
    /// Patches skipped on a precondition mismatch.
    pub failed: usize,
    /// Per-patch outcomes, in list order.
    pub steps: Vec<StepOutcome>,
    /// Code writes, in list order.
    pub code_writes: Vec<CodeWrite>,
}

impl PatchReport {
    /// A run with zero applied patches produced nothing worth keeping.
    pub fn is_success(&self) -> bool {
        self.applied > 0
    }

    /// Summary line for display.
    pub fn summary(&self) -> String {
        format!(
            "{}/{} patches applied, {} skipped, {} code write(s)",
            self.applied,
            self.steps.len(),
            self.failed,
            self.code_writes.len(),
        )
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("patch set rejected: {0}")]
    Config(#[from] ConfigError),
    #[error("code {code} decoded to an unusable address: {source}")]
    BadCodeAddress { code: String, source: GenieError },
}

// ── Entry points ─────────────────────────────────────────────────────────────

/// Run `set` against `rom`, returning the patched image and the report.
/// The input `rom` is never mutated.
pub fn apply_set(rom: &Rom, set: &PatchSet) -> Result<(Rom, PatchReport), EngineError> {
    set.validate(rom.len())?;
    let mut image = rom.as_bytes().to_vec();
    let report = run(&mut image, set)?;
    Ok((Rom::from_patched_bytes(image), report))
}

/// Dry run: identical fold and accounting, but the result image is dropped.
pub fn check_set(rom: &Rom, set: &PatchSet) -> Result<PatchReport, EngineError> {
    set.validate(rom.len())?;
    let mut image = rom.as_bytes().to_vec();
    run(&mut image, set)
}

fn run(image: &mut [u8], set: &PatchSet) -> Result<PatchReport, EngineError> {
    let mut report = PatchReport::default();

    for patch in &set.patches {
        let matched = context_matches(image, patch.offset, &patch.expected)
            && match &patch.replacement {
                Replacement::Byte { value } => {
                    // The window match pins the old byte; apply_single re-checks
                    // it as its own soft-skip gate.
                    apply_single(image, patch.offset, patch.expected[0], *value)
                }
                Replacement::Region { code, region_len, filler } => {
                    apply_region(image, patch.offset, code, *region_len, *filler);
                    true
                }
            };

        let skip = if matched {
            report.applied += 1;
            None
        } else {
            report.failed += 1;
            let end = patch.offset.saturating_add(patch.expected.len());
            let actual = image.get(patch.offset..end).unwrap_or(&[]);
            Some(SkipReason::ContextMismatch {
                expected_hex: hex::encode(&patch.expected),
                actual_hex: hex::encode(actual),
            })
        };
        report.steps.push(StepOutcome {
            description: patch.description.clone(),
            offset: patch.offset,
            applied: matched,
            skip,
        });
    }

    for (code, description) in set.parsed_codes()? {
        let decoded = code.decode();
        let offset = cpu_to_file(decoded.address).map_err(|source| EngineError::BadCodeAddress {
            code: code.as_str().to_string(),
            source,
        })?;
        let slot = image
            .get_mut(offset)
            .ok_or_else(|| EngineError::BadCodeAddress {
                code: code.as_str().to_string(),
                source: GenieError::AddressOutOfRange(decoded.address),
            })?;
        let old = *slot;
        *slot = decoded.value;
        report.code_writes.push(CodeWrite {
            code: code.as_str().to_string(),
            address: decoded.address,
            offset,
            old,
            new: decoded.value,
            description,
        });
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{CodeEntry, Patch, NOP_FILLER};
    use crate::rom::{EXPECTED_CHR_BANKS, EXPECTED_PRG_BANKS, MAGIC, ROM_SIZE};

    fn blank_rom() -> Rom {
        let mut data = vec![0u8; ROM_SIZE];
        data[..4].copy_from_slice(MAGIC);
        data[4] = EXPECTED_PRG_BANKS;
        data[5] = EXPECTED_CHR_BANKS;
        Rom::parse(data).unwrap()
    }

    fn rom_with(windows: &[(usize, &[u8])]) -> Rom {
        let mut data = blank_rom().into_bytes();
        for (offset, bytes) in windows {
            data[*offset..*offset + bytes.len()].copy_from_slice(bytes);
        }
        Rom::parse(data).unwrap()
    }

    fn byte_patch(offset: usize, old: u8, new: u8, desc: &str) -> Patch {
        Patch {
            offset,
            expected: vec![old],
            replacement: Replacement::Byte { value: new },
            description: desc.to_string(),
        }
    }

    fn set_of(patches: Vec<Patch>, codes: Vec<CodeEntry>) -> PatchSet {
        PatchSet {
            name: "test set".to_string(),
            output_suffix: " (test)".to_string(),
            patches,
            codes,
        }
    }

    #[test]
    fn all_matching_patches_apply_in_order() {
        let rom = rom_with(&[(0x100, &[0xA9, 0xFF]), (0x200, &[0xF9])]);
        let set = set_of(
            vec![
                Patch {
                    offset: 0x100,
                    expected: vec![0xA9, 0xFF],
                    replacement: Replacement::Region {
                        code: vec![0xEA],
                        region_len: 2,
                        filler: NOP_FILLER,
                    },
                    description: "region".to_string(),
                },
                byte_patch(0x200, 0xF9, 0xF4, "byte"),
            ],
            Vec::new(),
        );

        let (patched, report) = apply_set(&rom, &set).unwrap();
        assert_eq!(report.applied, 2);
        assert_eq!(report.failed, 0);
        assert!(report.is_success());
        assert_eq!(&patched.as_bytes()[0x100..0x102], &[0xEA, 0xEA]);
        assert_eq!(patched.as_bytes()[0x200], 0xF4);
        // The caller's image is untouched.
        assert_eq!(rom.as_bytes()[0x200], 0xF9);
    }

    #[test]
    fn one_mismatch_skips_only_that_patch() {
        let rom = rom_with(&[(0x100, &[0x11]), (0x300, &[0x33])]);
        let set = set_of(
            vec![
                byte_patch(0x100, 0x11, 0xAA, "first"),
                byte_patch(0x200, 0x99, 0xBB, "wrong precondition"),
                byte_patch(0x300, 0x33, 0xCC, "third"),
            ],
            Vec::new(),
        );

        let (patched, report) = apply_set(&rom, &set).unwrap();
        assert_eq!(report.applied, 2);
        assert_eq!(report.failed, 1);
        assert!(report.steps[0].applied);
        assert!(!report.steps[1].applied);
        assert!(report.steps[2].applied);
        assert_eq!(patched.as_bytes()[0x100], 0xAA);
        assert_eq!(patched.as_bytes()[0x200], 0x00);
        assert_eq!(patched.as_bytes()[0x300], 0xCC);

        match report.steps[1].skip.as_ref().unwrap() {
            SkipReason::ContextMismatch { expected_hex, actual_hex } => {
                assert_eq!(expected_hex, "99");
                assert_eq!(actual_hex, "00");
            }
        }
    }

    #[test]
    fn later_patch_sees_earlier_edits() {
        // The second patch's precondition only exists once the first has run.
        let rom = rom_with(&[(0x100, &[0x01])]);
        let set = set_of(
            vec![
                byte_patch(0x100, 0x01, 0x02, "creates the next window"),
                byte_patch(0x100, 0x02, 0x03, "depends on the edit above"),
            ],
            Vec::new(),
        );

        let (patched, report) = apply_set(&rom, &set).unwrap();
        assert_eq!(report.applied, 2);
        assert_eq!(patched.as_bytes()[0x100], 0x03);
    }

    #[test]
    fn zero_applied_is_a_failed_run() {
        let rom = blank_rom();
        let set = set_of(vec![byte_patch(0x100, 0xA9, 0x00, "never matches")], Vec::new());

        let (_, report) = apply_set(&rom, &set).unwrap();
        assert_eq!(report.applied, 0);
        assert_eq!(report.failed, 1);
        assert!(!report.is_success());
    }

    #[test]
    fn code_writes_are_unconditional_and_logged() {
        // POAISA decodes to ($D885, $11) = file offset 0x5895.  Whatever byte
        // is there gets overwritten; no precondition, no skip.
        let rom = rom_with(&[(0x5895, &[0xFE]), (0x100, &[0x01])]);
        let set = set_of(
            vec![byte_patch(0x100, 0x01, 0x02, "anchor")],
            vec![CodeEntry {
                code: "POAISA".to_string(),
                description: "power up on enemies".to_string(),
            }],
        );

        let (patched, report) = apply_set(&rom, &set).unwrap();
        assert_eq!(patched.as_bytes()[0x5895], 0x11);
        assert_eq!(report.code_writes.len(), 1);
        let write = &report.code_writes[0];
        assert_eq!(write.address, 0xD885);
        assert_eq!(write.offset, 0x5895);
        assert_eq!(write.old, 0xFE);
        assert_eq!(write.new, 0x11);
    }

    #[test]
    fn codes_do_not_affect_success_accounting() {
        let rom = blank_rom();
        let set = set_of(
            vec![byte_patch(0x100, 0xA9, 0x00, "never matches")],
            vec![CodeEntry {
                code: "AAAAAA".to_string(),
                description: String::new(),
            }],
        );

        let (patched, report) = apply_set(&rom, &set).unwrap();
        assert!(!report.is_success());
        // The code still wrote its byte at $8000 -> file 0x10.
        assert_eq!(patched.as_bytes()[0x10], 0x00);
        assert_eq!(report.code_writes.len(), 1);
    }

    #[test]
    fn misconfigured_set_aborts_before_any_edit() {
        let rom = rom_with(&[(0x100, &[0x01])]);
        let set = set_of(
            vec![
                byte_patch(0x100, 0x01, 0x02, "would apply"),
                Patch {
                    offset: 0x200,
                    expected: vec![0x00],
                    replacement: Replacement::Region {
                        code: vec![0x01, 0x02, 0x03],
                        region_len: 2,
                        filler: NOP_FILLER,
                    },
                    description: "overflowing region".to_string(),
                },
            ],
            Vec::new(),
        );

        assert!(matches!(
            apply_set(&rom, &set).unwrap_err(),
            EngineError::Config(ConfigError::RegionOverflow { .. })
        ));
    }

    #[test]
    fn dry_run_matches_real_run_accounting() {
        let rom = rom_with(&[(0x100, &[0x01]), (0x300, &[0x33])]);
        let set = set_of(
            vec![
                byte_patch(0x100, 0x01, 0x02, "a"),
                byte_patch(0x200, 0x99, 0x00, "b"),
                byte_patch(0x300, 0x33, 0x44, "c"),
            ],
            Vec::new(),
        );

        let dry = check_set(&rom, &set).unwrap();
        let (_, wet) = apply_set(&rom, &set).unwrap();
        assert_eq!(dry.applied, wet.applied);
        assert_eq!(dry.failed, wet.failed);
        // check_set never touched the caller's image either.
        assert_eq!(rom.as_bytes()[0x100], 0x01);
    }
}
