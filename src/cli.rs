// ============================================================================
// MaskOverlay CLI — headless mask compositing via command-line arguments
// ============================================================================
//
// Usage examples:
//   maskoverlay --input photo.png --mask vignette.png --output out.png
//   maskoverlay -i photo.jpg -m circle.png --mode multiply -o out.bmp
//   maskoverlay -i "shots/*.jpg" -m frame.png --output-dir processed/
//   maskoverlay -i photo.png -m grid.png --offset -20,35 --key 0,255,0
//   maskoverlay --list-masks masks/
//   maskoverlay --generate-samples masks/
//
// All processing runs synchronously on the current thread apart from the
// rayon row loop inside Compositor::apply.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::blend::{BlendMode, KeyColor};
use crate::compositor::Compositor;
use crate::generator;
use crate::io::SaveFormat;
use crate::library::MaskLibrary;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// MaskOverlay headless compositor.
///
/// Overlay a mask image onto source images with a selectable blend mode —
/// no GUI required.
#[derive(Parser, Debug)]
#[command(
    name = "maskoverlay",
    about = "Overlay a mask image onto source images with a selectable blend mode",
    long_about = "Composite a mask image onto one or more source images. Mask pixels\n\
                  matching the key color (magenta by default, tolerance 10 per channel)\n\
                  are treated as transparent and leave the source untouched.\n\n\
                  Example:\n  \
                  maskoverlay --input photo.png --mask vignette.png --output out.png\n  \
                  maskoverlay -i \"*.jpg\" -m frame.png --mode screen --output-dir out/"
)]
pub struct CliArgs {
    /// Source image file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, num_args = 1..)]
    pub input: Vec<String>,

    /// Mask image overlaid onto every input.
    #[arg(short, long, value_name = "FILE")]
    pub mask: Option<PathBuf>,

    /// Blend mode: replace, add, multiply, screen, overlay, difference,
    /// softlight, hardlight.
    #[arg(long, default_value = "replace")]
    pub mode: String,

    /// Key color treated as transparent, as "R,G,B" or "#RRGGBB".
    /// Defaults to magenta (255,0,255).
    #[arg(long, value_name = "COLOR")]
    pub key: Option<String>,

    /// Ignore the mask's alpha channel instead of interpolating with it.
    #[arg(long)]
    pub no_alpha: bool,

    /// Mask offset "DX,DY"; the mask is sampled at output coordinate + offset.
    #[arg(long, value_name = "DX,DY", allow_hyphen_values = true)]
    pub offset: Option<String>,

    /// Output file path. Only valid for single-file input.
    /// For batch input use --output-dir instead.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    /// Files are written here with the original stem and a .png/.bmp extension.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format for --output-dir runs: png or bmp (default png).
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// List the masks found in a directory, sorted by name, then exit.
    #[arg(long, value_name = "DIR")]
    pub list_masks: Option<PathBuf>,

    /// Render the built-in sample mask set into a directory, then exit.
    #[arg(long, value_name = "DIR")]
    pub generate_samples: Option<PathBuf>,

    /// Print per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = everything succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    // Standalone actions first — they don't need input/mask
    if let Some(dir) = &args.generate_samples {
        return match generator::write_samples(dir) {
            Ok(paths) => {
                for path in &paths {
                    println!("wrote {}", path.display());
                }
                println!("{} sample masks written to {}", paths.len(), dir.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: sample generation failed: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    if let Some(dir) = &args.list_masks {
        let mut library = MaskLibrary::new();
        return match library.scan_directory(dir) {
            Ok(_) => {
                for entry in library.entries() {
                    let (tw, th) = entry.thumbnail.dimensions();
                    println!(
                        "{:<24} {} (thumbnail {}x{})",
                        entry.name,
                        entry.path.display(),
                        tw,
                        th
                    );
                }
                println!("{} masks in {}", library.len(), dir.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: cannot scan '{}': {}", dir.display(), e);
                ExitCode::FAILURE
            }
        };
    }

    // -- Compositing run -------------------------------------------------
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    let Some(mask_path) = &args.mask else {
        eprintln!("error: --mask is required when compositing.");
        return ExitCode::FAILURE;
    };

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let Some(mode) = BlendMode::parse(&args.mode) else {
        eprintln!(
            "error: unknown blend mode '{}'. Valid modes: replace, add, multiply, \
             screen, overlay, difference, softlight, hardlight.",
            args.mode
        );
        return ExitCode::FAILURE;
    };

    let key = match &args.key {
        Some(spec) => match parse_key(spec) {
            Some(k) => k,
            None => {
                eprintln!("error: invalid key color '{}'. Use \"R,G,B\" or \"#RRGGBB\".", spec);
                return ExitCode::FAILURE;
            }
        },
        None => KeyColor::default(),
    };

    let offset = match &args.offset {
        Some(spec) => match parse_offset(spec) {
            Some(o) => o,
            None => {
                eprintln!("error: invalid offset '{}'. Use \"DX,DY\" with integers.", spec);
                return ExitCode::FAILURE;
            }
        },
        None => (0, 0),
    };

    let format = match parse_format(args.format.as_deref(), args.output.as_deref()) {
        Some(f) => f,
        None => {
            eprintln!("error: unknown format '{}'. Valid formats: png, bmp.",
                args.format.as_deref().unwrap_or(""));
            return ExitCode::FAILURE;
        }
    };

    if let Some(dir) = &args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "error: could not create output directory '{}': {}",
                dir.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    }

    let mut compositor = Compositor::new();
    if let Err(e) = compositor.load_mask(mask_path) {
        eprintln!("error: cannot load mask '{}': {}", mask_path.display(), e);
        return ExitCode::FAILURE;
    }
    // After the mask load — loading resets the offset to (0,0)
    compositor.set_offset(offset.0, offset.1);

    let use_alpha = !args.no_alpha;
    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();

        let output_path = match build_output_path(
            input_path,
            args.output.as_deref(),
            args.output_dir.as_deref(),
            format,
        ) {
            Some(p) => p,
            None => {
                eprintln!(
                    "  error: cannot determine output path for '{}'.",
                    input_path.display()
                );
                any_failure = true;
                continue;
            }
        };

        match run_one(&mut compositor, input_path, &output_path, mode, key, use_alpha) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

fn run_one(
    compositor: &mut Compositor,
    input: &Path,
    output: &Path,
    mode: BlendMode,
    key: KeyColor,
    use_alpha: bool,
) -> Result<(), String> {
    compositor
        .load_source(input)
        .map_err(|e| format!("load failed: {}", e))?;

    compositor
        .apply(mode, key, use_alpha)
        .map_err(|e| format!("compositing failed: {}", e))?;

    compositor
        .save_result(output)
        .map_err(|e| format!("save failed: {}", e))?;

    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            // Literal path — use directly
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        // Treat as glob pattern
        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Parse a key color from "R,G,B" or "#RRGGBB".
fn parse_key(spec: &str) -> Option<KeyColor> {
    let spec = spec.trim();

    if let Some(hex) = spec.strip_prefix('#') {
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        return Some(KeyColor::new(r, g, b));
    }

    let mut parts = spec.split(',');
    let r = parts.next()?.trim().parse().ok()?;
    let g = parts.next()?.trim().parse().ok()?;
    let b = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(KeyColor::new(r, g, b))
}

/// Parse a mask offset from "DX,DY".
fn parse_offset(spec: &str) -> Option<(i32, i32)> {
    let mut parts = spec.trim().split(',');
    let dx = parts.next()?.trim().parse().ok()?;
    let dy = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((dx, dy))
}

/// Choose the [`SaveFormat`] from the `--format` string or infer it from the
/// output file extension. Defaults to PNG when neither is given; `None`
/// means the `--format` string was unrecognized.
fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> Option<SaveFormat> {
    if let Some(f) = format_arg {
        return match f.to_lowercase().as_str() {
            "png" => Some(SaveFormat::Png),
            "bmp" => Some(SaveFormat::Bmp),
            _ => None,
        };
    }

    if let Some(out) = output {
        return Some(SaveFormat::from_path(out));
    }

    Some(SaveFormat::Png)
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, derives filename from input stem)
/// 3. Fallback: same directory as input, same stem, new extension
///    (appends `_out` to stem if it would collide with the input path)
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: SaveFormat,
) -> Option<PathBuf> {
    // Explicit output path
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let ext = format.extension();
    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    // Write next to the input file
    let parent = input.parent().unwrap_or(Path::new("."));
    let candidate = parent.join(format!("{}.{}", stem, ext));

    // Avoid silent overwrite of the input
    if candidate == input {
        Some(parent.join(format!("{}_out.{}", stem, ext)))
    } else {
        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_parses_from_triple_and_hex() {
        assert_eq!(parse_key("255,0,255"), Some(KeyColor::new(255, 0, 255)));
        assert_eq!(parse_key(" 1, 2, 3 "), Some(KeyColor::new(1, 2, 3)));
        assert_eq!(parse_key("#00ff7f"), Some(KeyColor::new(0, 255, 127)));
        assert_eq!(parse_key("#00FF7F"), Some(KeyColor::new(0, 255, 127)));
        assert_eq!(parse_key("256,0,0"), None);
        assert_eq!(parse_key("1,2"), None);
        assert_eq!(parse_key("1,2,3,4"), None);
        assert_eq!(parse_key("#12345"), None);
        assert_eq!(parse_key("#1234zz"), None);
    }

    #[test]
    fn offset_parses_signed_pairs() {
        assert_eq!(parse_offset("5,10"), Some((5, 10)));
        assert_eq!(parse_offset("-20, 35"), Some((-20, 35)));
        assert_eq!(parse_offset("1"), None);
        assert_eq!(parse_offset("1,2,3"), None);
        assert_eq!(parse_offset("a,b"), None);
    }

    #[test]
    fn format_resolution() {
        assert_eq!(parse_format(Some("bmp"), None), Some(SaveFormat::Bmp));
        assert_eq!(parse_format(Some("PNG"), None), Some(SaveFormat::Png));
        assert_eq!(parse_format(Some("tiff"), None), None);
        assert_eq!(
            parse_format(None, Some(Path::new("out.bmp"))),
            Some(SaveFormat::Bmp)
        );
        assert_eq!(parse_format(None, None), Some(SaveFormat::Png));
    }

    #[test]
    fn output_path_priorities() {
        let input = Path::new("shots/photo.jpg");

        assert_eq!(
            build_output_path(input, Some(Path::new("result.png")), None, SaveFormat::Png),
            Some(PathBuf::from("result.png"))
        );
        assert_eq!(
            build_output_path(input, None, Some(Path::new("out")), SaveFormat::Bmp),
            Some(PathBuf::from("out/photo.bmp"))
        );
        assert_eq!(
            build_output_path(input, None, None, SaveFormat::Png),
            Some(PathBuf::from("shots/photo.png"))
        );
        // Collision with the input appends _out
        assert_eq!(
            build_output_path(Path::new("shots/photo.png"), None, None, SaveFormat::Png),
            Some(PathBuf::from("shots/photo_out.png"))
        );
    }
}
