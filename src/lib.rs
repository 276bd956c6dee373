pub mod engine;
pub mod genie;
pub mod patch;
pub mod presets;
pub mod rom;

pub use engine::{apply_set, check_set, PatchReport};
pub use genie::{cpu_to_file, Decoded, GenieCode};
pub use patch::{Patch, PatchSet, Replacement};
pub use rom::Rom;
