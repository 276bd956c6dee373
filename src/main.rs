use clap::{Parser, Subcommand};
use ggpatch::engine::{apply_set, check_set, PatchReport, SkipReason};
use ggpatch::genie::{cpu_to_file, GenieCode};
use ggpatch::patch::PatchSet;
use ggpatch::presets;
use ggpatch::rom::Rom;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "ggpatch", about = "Verified Game Genie patcher for the Super Mario Bros. iNES image")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a patch set and write the patched copy alongside the original
    Apply {
        rom: PathBuf,
        /// Output path (default: input with the set's suffix before the extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// JSON patch set (default: the built-in "no pits" set)
        #[arg(short, long)]
        set: Option<PathBuf>,
    },
    /// Dry run: report which patches would apply, writing nothing
    Check {
        rom: PathBuf,
        #[arg(short, long)]
        set: Option<PathBuf>,
    },
    /// Show header fields and digests
    Info {
        rom: PathBuf,
    },
    /// Decode Game Genie codes
    Decode {
        #[arg(required = true)]
        codes: Vec<String>,
    },
    /// Write the built-in patch set as JSON
    ExportSet {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    match Cli::parse().command {

        // ── Apply ────────────────────────────────────────────────────────────
        Commands::Apply { rom, output, set } => {
            let set = load_set(set.as_deref())?;
            let image = Rom::load(&rom)?;
            println!("Loaded ROM: {} bytes", image.len());
            println!("CRC32:  {:08X}", image.crc32());
            println!("BLAKE3: {}", image.blake3_hex());

            let (patched, report) = apply_set(&image, &set)?;
            print_report(&report);

            if !report.is_success() {
                return Err(format!(
                    "no patches were applied: {} does not look like the image this set targets",
                    rom.display(),
                )
                .into());
            }

            let out = output.unwrap_or_else(|| derive_output_path(&rom, &set.output_suffix));
            patched.save(&out)?;
            println!("Patched ROM: {}", out.display());
            println!("New CRC32:   {:08X}", patched.crc32());
        }

        // ── Check ────────────────────────────────────────────────────────────
        Commands::Check { rom, set } => {
            let set = load_set(set.as_deref())?;
            let image = Rom::load(&rom)?;
            let report = check_set(&image, &set)?;
            print_report(&report);
            if !report.is_success() {
                return Err("no patches would apply".into());
            }
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { rom } => {
            let image = Rom::load(&rom)?;
            println!("── iNES image ───────────────────────────────────────────");
            println!("  Path       {}", rom.display());
            println!("  Size       {} bytes", image.len());
            println!("  PRG banks  {}", image.prg_banks());
            println!("  CHR banks  {}", image.chr_banks());
            println!("  CRC32      {:08X}", image.crc32());
            println!("  BLAKE3     {}", image.blake3_hex());
        }

        // ── Decode ───────────────────────────────────────────────────────────
        Commands::Decode { codes } => {
            for raw in &codes {
                let code = GenieCode::parse(raw)?;
                let decoded = code.decode();
                let offset = cpu_to_file(decoded.address)?;
                println!(
                    "{}: CPU ${:04X} -> file ${:04X}, value ${:02X}",
                    code, decoded.address, offset, decoded.value,
                );
            }
        }

        // ── Export set ───────────────────────────────────────────────────────
        Commands::ExportSet { output } => {
            let json = presets::smb_no_pits().to_json()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, &json)?;
                    println!("Wrote: {}", path.display());
                }
                None => println!("{json}"),
            }
        }
    }

    Ok(())
}

fn load_set(path: Option<&Path>) -> Result<PatchSet, Box<dyn std::error::Error>> {
    match path {
        Some(p) => Ok(PatchSet::from_json(&std::fs::read_to_string(p)?)?),
        None => Ok(presets::smb_no_pits()),
    }
}

/// Insert the set's suffix before the extension: `smb.nes` -> `smb - No Pits.nes`.
fn derive_output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("rom");
    let name = match input.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}{suffix}.{ext}"),
        None => format!("{stem}{suffix}"),
    };
    input.with_file_name(name)
}

fn print_report(report: &PatchReport) {
    for step in &report.steps {
        match &step.skip {
            None => println!("  OK    ${:04X}  {}", step.offset, step.description),
            Some(SkipReason::ContextMismatch { expected_hex, actual_hex }) => {
                println!("  SKIP  ${:04X}  {}", step.offset, step.description);
                println!("        expected {expected_hex}");
                println!("        actual   {actual_hex}");
            }
        }
    }
    for w in &report.code_writes {
        println!(
            "  CODE  {}: CPU ${:04X} -> file ${:04X}, ${:02X} -> ${:02X}  ({})",
            w.code, w.address, w.offset, w.old, w.new, w.description,
        );
    }
    println!("{}", report.summary());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_keeps_the_extension() {
        assert_eq!(
            derive_output_path(Path::new("roms/smb.nes"), " - No Pits"),
            PathBuf::from("roms/smb - No Pits.nes"),
        );
    }

    #[test]
    fn output_path_without_extension() {
        assert_eq!(
            derive_output_path(Path::new("smb"), " - No Pits"),
            PathBuf::from("smb - No Pits"),
        );
    }
}
