//! arfind: find connected image regions by bounding-box aspect ratio.
//!
//! Loads an image, runs the detection pipeline, and writes a copy with
//! every matching region outlined.
//!
//! # Usage
//!
//! ```text
//! arfind page.png --aspect 0.7 --error 0.018 -d -v
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use arfind_pipeline::diagnostics::{Clock, detect_with_diagnostics};
use arfind_pipeline::{BoxStyle, Connectivity, DetectConfig, Polarity, ShapeCriteria};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Find connected components whose bounding box matches an aspect ratio
/// and outline them on a copy of the input image.
#[derive(Parser)]
#[command(name = "arfind", version)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Input image (PNG, JPEG, BMP, WebP).
    infile: PathBuf,

    /// Output image path. Defaults to `<infile>.locations.png`.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Aspect ratio of components of interest (width divided by height).
    #[arg(long, default_value_t = ShapeCriteria::DEFAULT_TARGET_RATIO)]
    aspect: f64,

    /// Error threshold for a passable aspect ratio.
    #[arg(long, default_value_t = ShapeCriteria::DEFAULT_TOLERANCE)]
    error: f64,

    /// Minimum component width in pixels.
    #[arg(long, default_value_t = ShapeCriteria::DEFAULT_MIN_WIDTH)]
    min_width: u32,

    /// Minimum component height in pixels.
    #[arg(long, default_value_t = ShapeCriteria::DEFAULT_MIN_HEIGHT)]
    min_height: u32,

    /// Drop components whose sqrt(area) is below this value.
    #[arg(long)]
    min_extent: Option<f64>,

    /// Drop components whose sqrt(area) is above this value.
    #[arg(long)]
    max_extent: Option<f64>,

    /// Treat dark pixels as foreground (dark ink on light paper).
    #[arg(long)]
    dark_foreground: bool,

    /// Pixel adjacency for grouping foreground pixels.
    #[arg(long, value_enum, default_value_t = Adjacency::Eight)]
    connectivity: Adjacency,

    /// Outline colour as "R,G,B".
    #[arg(long, value_name = "R,G,B", default_value = "255,0,0", value_parser = parse_color)]
    color: [u8; 3],

    /// Outline thickness in pixels.
    #[arg(long, default_value_t = BoxStyle::DEFAULT_THICKNESS)]
    line_width: u32,

    /// Full detection config as a JSON string.
    ///
    /// When provided, all other detection parameter flags are ignored.
    /// The JSON must be a valid `DetectConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,

    /// Print status messages during processing.
    #[arg(short, long)]
    verbose: bool,

    /// Write the cleaned binary mask to `<infile>.binary.png` and print
    /// the per-stage diagnostics report.
    #[arg(short, long)]
    debug: bool,

    /// Print detected boxes and diagnostics as JSON on stdout.
    #[arg(long)]
    json: bool,
}

/// Connectivity selection.
#[derive(Clone, Copy, ValueEnum)]
enum Adjacency {
    /// Edge neighbours only.
    Four,
    /// Edge and corner neighbours.
    Eight,
}

/// Parse `"R,G,B"` into an RGB triple.
fn parse_color(s: &str) -> Result<[u8; 3], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [r, g, b] = parts.as_slice() else {
        return Err(format!("color must be 'R,G,B', got: '{s}'"));
    };
    let channel = |v: &str| {
        v.parse::<u8>()
            .map_err(|e| format!("invalid color channel '{v}': {e}"))
    };
    Ok([channel(r)?, channel(g)?, channel(b)?])
}

/// Build a [`DetectConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<DetectConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(DetectConfig {
        shape: ShapeCriteria {
            target_ratio: cli.aspect,
            tolerance: cli.error,
            min_width: cli.min_width,
            min_height: cli.min_height,
        },
        polarity: if cli.dark_foreground {
            Polarity::Dark
        } else {
            Polarity::Light
        },
        connectivity: match cli.connectivity {
            Adjacency::Four => Connectivity::Four,
            Adjacency::Eight => Connectivity::Eight,
        },
        min_extent: cli.min_extent,
        max_extent: cli.max_extent,
    })
}

/// `<path><suffix>`, e.g. `page.png` -> `page.png.locations.png`.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(path.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}

/// Install the tracing subscriber. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| with_suffix(&cli.infile, ".locations.png"));
    tracing::info!(input = %cli.infile.display(), output = %output.display(), "processing");

    let source = match arfind_io::load(&cli.infile) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let gray = arfind_pipeline::grayscale::luminance(&source);

    let (staged, diagnostics) = match detect_with_diagnostics(&gray, &config, &StdClock) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Detection error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.debug {
        eprintln!("{}", diagnostics.report());
        let mask_path = with_suffix(&cli.infile, ".binary.png");
        if let Err(e) = arfind_io::save_mask(&mask_path, &staged.eroded) {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
        tracing::info!(path = %mask_path.display(), "binary mask written");
    }

    if cli.json {
        let payload = serde_json::json!({
            "boxes": staged.retained,
            "diagnostics": diagnostics,
        });
        match serde_json::to_string_pretty(&payload) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing results: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    if staged.retained.is_empty() {
        tracing::info!("no components of appropriate aspect ratio found");
        return ExitCode::SUCCESS;
    }

    tracing::info!(
        count = staged.retained.len(),
        "components of appropriate aspect ratio found"
    );
    let style = BoxStyle {
        color: cli.color,
        thickness: cli.line_width,
    };
    if let Err(e) = arfind_io::render_and_save(&source, &staged.retained, &style, &output) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_match_pipeline_defaults() {
        let cli = Cli::try_parse_from(["arfind", "page.png"]).unwrap();
        assert_eq!(config_from_cli(&cli).unwrap(), DetectConfig::default());
        assert_eq!(cli.color, BoxStyle::DEFAULT_COLOR);
    }

    #[test]
    fn flags_map_onto_config() {
        let cli = Cli::try_parse_from([
            "arfind",
            "page.png",
            "--aspect",
            "0.7",
            "--error",
            "0.018",
            "--min-width",
            "10",
            "--min-height",
            "12",
            "--dark-foreground",
            "--connectivity",
            "four",
            "--max-extent",
            "300",
        ])
        .unwrap();
        let config = config_from_cli(&cli).unwrap();
        assert!((config.shape.target_ratio - 0.7).abs() < f64::EPSILON);
        assert!((config.shape.tolerance - 0.018).abs() < f64::EPSILON);
        assert_eq!(config.shape.min_width, 10);
        assert_eq!(config.shape.min_height, 12);
        assert_eq!(config.polarity, Polarity::Dark);
        assert_eq!(config.connectivity, Connectivity::Four);
        assert_eq!(config.max_extent, Some(300.0));
    }

    #[test]
    fn config_json_overrides_flags() {
        let cli = Cli::try_parse_from([
            "arfind",
            "page.png",
            "--aspect",
            "3.0",
            "--config-json",
            r#"{"connectivity":"Four"}"#,
        ])
        .unwrap();
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.connectivity, Connectivity::Four);
        assert!((config.shape.target_ratio - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn bad_config_json_is_reported() {
        let cli =
            Cli::try_parse_from(["arfind", "page.png", "--config-json", "{not json"]).unwrap();
        assert!(config_from_cli(&cli).is_err());
    }

    #[test]
    fn color_parsing() {
        assert_eq!(parse_color("0, 128,255").unwrap(), [0, 128, 255]);
        assert!(parse_color("1,2").is_err());
        assert!(parse_color("1,2,300").is_err());
    }

    #[test]
    fn default_output_appends_suffix() {
        assert_eq!(
            with_suffix(Path::new("scans/page.jpg"), ".locations.png"),
            PathBuf::from("scans/page.jpg.locations.png")
        );
    }
}
