//! Built-in patch sets.
//!
//! These are frozen configuration values: every offset, expected window, and
//! replacement byte targets one specific image revision, and the expected
//! windows are what keep a set from corrupting any other revision.

use crate::patch::{CodeEntry, Patch, PatchSet, Replacement, NOP_FILLER};

/// The Super Mario Bros. accessibility set.
///
/// Four context-gated patches plus four Game Genie codes:
/// 1. Pit survival — falling below the screen gives springboard velocity
///    instead of a death.
/// 2. Timer freeze — the timer digit decrement is NOPped out.
/// 3. Springboard always boosts — the default force becomes the max bounce.
/// 4. Castle maze auto-correct — the maze Y-position check becomes a
///    Y-position set, teleporting the player onto the correct path.
/// Codes: POAISA (power up on enemies) and OZTLLX/AATLGZ/SZLIVO (always
/// stay big).
pub fn smb_no_pits() -> PatchSet {
    PatchSet {
        name: "Super Mario Bros. accessibility (no pits)".to_string(),
        output_suffix: " - No Pits".to_string(),
        patches: vec![
            pit_survival(),
            timer_freeze(),
            springboard_boost(),
            castle_maze_autocorrect(),
        ],
        codes: vec![
            code("POAISA", "power up on enemies"),
            code("OZTLLX", "always stay big (1/3)"),
            code("AATLGZ", "always stay big (2/3)"),
            code("SZLIVO", "always stay big (3/3)"),
        ],
    }
}

fn code(letters: &str, description: &str) -> CodeEntry {
    CodeEntry {
        code: letters.to_string(),
        description: description.to_string(),
    }
}

/// Replaces the 6-byte below-screen death check plus the 59-byte death
/// routine (CPU $B179, file $3189) with a routine that enforces a Y floor
/// every frame: a falling player past Y=$C0 gets springboard velocity while
/// still inside the pit's open air column.  A deep-fall handler catches the
/// below-screen case, and active injury i-frames hold position at the floor
/// instead of boosting.  The exit RTS at file $31CA is untouched.
fn pit_survival() -> Patch {
    Patch {
        offset: 0x3189,
        // LDA HighPos / CMP #$02 / BMI exit / LDX #$01
        expected: vec![0xA5, 0xB5, 0xC9, 0x02, 0x30, 0x3B, 0xA2, 0x01],
        replacement: Replacement::Region {
            code: vec![
                0xA5, 0xB5, // LDA Player_Y_HighPos
                0xC9, 0x02, // CMP #$02
                0xB0, 0x30, // BCS deep_fall
                0xC9, 0x01, // CMP #$01
                0xD0, 0x37, // BNE exit (above the screen)
                0xA5, 0x1D, // LDA Player_State
                0xC9, 0x02, // CMP #$02
                0xD0, 0x31, // BNE exit (not falling)
                0xA5, 0xCE, // LDA Player_Y_Position
                0xC9, 0xC0, // CMP #$C0
                0x90, 0x2B, // BCC exit (above the floor)
                0xAD, 0x9E, 0x07, // LDA InjuryTimer
                0xD0, 0x11, // BNE hold (i-frames active)
                0xA9, 0x00, // LDA #$00
                0x8D, 0x33, 0x04, // STA Player_Y_MoveForce
                0xA9, 0xF4, // LDA #$F4 (springboard velocity)
                0x85, 0x9F, // STA Player_Y_Speed
                0xA9, 0x70, // LDA #$70
                0x8D, 0x0A, 0x07, // STA VerticalForceDown
                0x4C, 0xBA, 0xB1, // JMP exit
                0xA9, 0x00, // hold: LDA #$00
                0x85, 0x9F, // STA Player_Y_Speed
                0xA9, 0xC0, // LDA #$C0
                0x85, 0xCE, // STA Player_Y_Position
                0xD0, 0x0B, // BNE exit (A is never zero here)
                0xA9, 0x01, // deep_fall: LDA #$01
                0x85, 0xB5, // STA Player_Y_HighPos
                0xA9, 0xC0, // LDA #$C0
                0x85, 0xCE, // STA Player_Y_Position
                0x4C, 0x8F, 0xB1, // JMP chk_injury
            ],
            region_len: 65,
            filler: NOP_FILLER,
        },
        description: "pit survival: Y floor with springboard boost".to_string(),
    }
}

/// NOPs the `STA DigitModifier+5` inside RunGameTimer (file $379F) so the
/// timer's -1 digit input is never stored.  The shared digit-math routine is
/// untouched; scores and coins still work and the timer display refreshes
/// harmlessly at its starting value.
fn timer_freeze() -> Patch {
    Patch {
        offset: 0x379D,
        // LDA #$FF / STA DigitModifier+5 / JSR DigitsMathRoutine
        expected: vec![0xA9, 0xFF, 0x8D, 0x39, 0x01, 0x20, 0x5F, 0x8F],
        replacement: Replacement::Region {
            code: vec![0xA9, 0xFF, 0xEA, 0xEA, 0xEA, 0x20, 0x5F, 0x8F],
            region_len: 8,
            filler: NOP_FILLER,
        },
        description: "timer freeze: NOP the digit decrement".to_string(),
    }
}

/// When the player lands on a springboard, the bounce force defaults to $F9
/// (low) and only becomes $F4 (max) with precise A-press timing.  Change the
/// default so every bounce is the max bounce.
fn springboard_boost() -> Patch {
    Patch {
        offset: 0x5ED9,
        // LDA #$70 / STA VerticalForce / LDA #$F9 / STA JumpspringForce
        expected: vec![0xA9, 0x70, 0x8D, 0x09, 0x07, 0xA9, 0xF9, 0x8D, 0xDB, 0x06],
        replacement: Replacement::Region {
            code: vec![0xA9, 0x70, 0x8D, 0x09, 0x07, 0xA9, 0xF4, 0x8D, 0xDB, 0x06],
            region_len: 10,
            filler: NOP_FILLER,
        },
        description: "springboard always gives the max boost".to_string(),
    }
}

/// The castle mazes (4-4, 7-4, 8-4) loop the level back unless the player is
/// at the required Y position at each checkpoint.  Replace the Y-position
/// *check* with a Y-position *set*: load the required Y from the loop table
/// and store it, zeroing vertical speed and the player state.  Disabling the
/// loop outright would soft-lock on dead-end paths; moving the player keeps
/// every route correct.
fn castle_maze_autocorrect() -> Patch {
    Patch {
        offset: 0x40FB,
        // LDA Player_Y_Position / CMP $C081,Y / BNE wrong /
        // LDA Player_State / CMP #$00 / BNE wrong
        expected: vec![
            0xA5, 0xCE, 0xD9, 0x81, 0xC0, 0xD0, 0x23, 0xA5, 0x1D, 0xC9, 0x00, 0xD0, 0x1D,
        ],
        replacement: Replacement::Region {
            code: vec![
                0xB9, 0x81, 0xC0, // LDA $C081,Y (required Y from the table)
                0x85, 0xCE, // STA Player_Y_Position
                0xA9, 0x00, // LDA #$00
                0x85, 0x9F, // STA Player_Y_Speed
                0x85, 0x1D, // STA Player_State (on the ground)
            ],
            region_len: 13,
            filler: NOP_FILLER,
        },
        description: "castle maze auto-correct".to_string(),
    }
}
