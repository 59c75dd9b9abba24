use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, ValueEnum};
use flexi_logger::{Logger, LoggerHandle};

use dcp_dehaze::{
    config, default_output_path, DehazeConfig, Dehazer, ProcessOptions, ProcessResult,
    RefinerKind,
};

#[derive(Clone, Copy, ValueEnum)]
enum RefinerArg {
    /// Sequential box-filter guided filter
    Box,
    /// Row-parallel guided filter
    Parallel,
}

impl From<RefinerArg> for RefinerKind {
    fn from(arg: RefinerArg) -> Self {
        match arg {
            RefinerArg::Box => RefinerKind::Box,
            RefinerArg::Parallel => RefinerKind::Parallel,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "dehaze",
    about = "Remove haze from photos using the Dark Channel Prior",
    version,
    after_help = "Simple usage: dehaze <image>  (writes dehazed_<image> next to it)\n\
                  Batch usage:  dehaze <dir> -o <out_dir>"
)]
struct Cli {
    /// Input image file or directory
    input: String,

    /// Output file or directory (default: dehazed_{name})
    #[arg(short, long)]
    output: Option<String>,

    /// Dark channel window size (odd)
    #[arg(long, default_value_t = config::DEFAULT_PATCH_SIZE)]
    patch_size: u32,

    /// Guided filter radius
    #[arg(long, default_value_t = config::DEFAULT_RADIUS)]
    radius: u32,

    /// Guided filter regularization
    #[arg(long, default_value_t = config::DEFAULT_EPS)]
    eps: f32,

    /// Haze removal strength (0.0-1.0]
    #[arg(long, default_value_t = config::DEFAULT_OMEGA)]
    omega: f32,

    /// Fraction of haziest pixels used for atmospheric light
    #[arg(long, default_value_t = config::DEFAULT_TOP_FRACTION)]
    top_fraction: f64,

    /// Minimum transmission
    #[arg(long, default_value_t = config::DEFAULT_TRANSMISSION_FLOOR)]
    floor: f32,

    /// Fail on images whose atmospheric light is (near) black
    #[arg(long)]
    strict: bool,

    /// Transmission refiner backend
    #[arg(long, value_enum, default_value = "parallel")]
    refiner: RefinerArg,

    /// Also write refined transmission maps to this directory
    #[arg(long)]
    transmission_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();
    let _logger = init_logging(cli.verbose, cli.quiet);

    let config = DehazeConfig {
        patch_size: cli.patch_size,
        radius: cli.radius,
        eps: cli.eps,
        omega: cli.omega,
        top_fraction: cli.top_fraction,
        transmission_floor: cli.floor,
        strict_atmosphere: cli.strict,
        refiner: cli.refiner.into(),
    };

    let dehazer = match Dehazer::new(config) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let opts = ProcessOptions {
        transmission_dir: cli.transmission_dir.clone(),
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    let input_path = Path::new(&cli.input);
    if !input_path.exists() {
        eprintln!("Error: Input path does not exist: {}", cli.input);
        process::exit(1);
    }

    if opts.verbose {
        let c = dehazer.config();
        eprintln!(
            "patch {}, radius {}, eps {}, omega {}, refiner {}",
            c.patch_size,
            c.radius,
            c.eps,
            c.omega,
            dehazer.refiner_name()
        );
    }

    let results = if input_path.is_dir() {
        let output_dir = if let Some(o) = &cli.output {
            PathBuf::from(o)
        } else {
            eprintln!("Error: Output directory is required for batch processing");
            eprintln!("Usage: dehaze <input_dir> -o <output_dir>");
            process::exit(1);
        };
        dehazer.process_directory(input_path, &output_dir, &opts)
    } else {
        let output_path = match &cli.output {
            Some(o) => PathBuf::from(o),
            None => default_output_path(input_path),
        };
        vec![dehazer.process_file(input_path, &output_path, &opts)]
    };

    let mut success_count = 0u32;
    let mut fail_count = 0u32;

    for r in &results {
        print_result(r, &opts);
        if r.success {
            success_count += 1;
        } else {
            fail_count += 1;
        }
    }

    if results.len() > 1 && !opts.quiet {
        eprintln!();
        eprint!("[Summary] Processed: {success_count}");
        if fail_count > 0 {
            eprint!(", Failed: {fail_count}");
        }
        eprintln!(" (Total: {})", results.len());
    }

    if fail_count > 0 {
        process::exit(1);
    }
}

fn init_logging(verbose: bool, quiet: bool) -> Option<LoggerHandle> {
    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "info"
    };
    match Logger::try_with_env_or_str(level).and_then(|logger| logger.log_to_stderr().start()) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("Warning: failed to initialize logging: {e}");
            None
        }
    }
}

fn print_result(result: &ProcessResult, opts: &ProcessOptions) {
    for line in status_lines(result, opts) {
        eprintln!("{line}");
    }
}

/// Lines reported for one processed file.
fn status_lines(result: &ProcessResult, opts: &ProcessOptions) -> Vec<String> {
    if opts.quiet && result.success {
        return Vec::new();
    }

    let filename = result.path.file_name().map_or_else(
        || result.path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    );

    let mut lines = Vec::new();
    if result.success {
        match (&result.output, result.atmosphere) {
            (Some(out), Some(a)) => {
                let [r, g, b] = a.components();
                lines.push(format!(
                    "[OK] {filename} -> {} (A = {r:.3}, {g:.3}, {b:.3})",
                    out.display()
                ));
            }
            _ => lines.push(format!("[OK] {filename}")),
        }
        if opts.verbose && !result.message.is_empty() {
            lines.push(format!("  -> {}", result.message));
        }
    } else {
        lines.push(format!("[FAIL] {filename}: {}", result.message));
    }
    lines
}
