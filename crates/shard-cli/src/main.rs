use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use shard_core::{ChunkPipeline, CompressStats, DecompressStats, PipelineOptions};

#[derive(Parser)]
#[command(
    name = "shard",
    version,
    about = "Split a file into compressed chunks and join them back",
    long_about = "Splits a file into independently compressed <output>_<n>.zip \
                  chunk files, or discovers such a chunk set and reassembles \
                  the original file byte for byte."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Number of worker threads (defaults to logical cores minus one).
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Disable best-effort CPU pinning of pipeline threads.
    #[arg(long, global = true, default_value_t = false)]
    no_pin: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a file into `<output>_<n>.zip` chunk files next to it.
    Compress {
        /// Source file to split.
        input: PathBuf,

        /// Base name for the chunk files.
        output: String,
    },
    /// Reassemble a chunk set into `<output>` next to the chunk files.
    Decompress {
        /// Any file of the chunk set (its numeric suffix is stripped).
        input: PathBuf,

        /// Name of the reassembled output file.
        output: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // The chunk-set tooling contract reports 1 for success and 0 for any
    // recorded error.
    let code = match run(&cli) {
        Ok(()) => 1u8,
        Err(error) => {
            eprintln!("error: {error:#}");
            0u8
        }
    };
    println!("Result:{code}");
    ExitCode::from(code)
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut options = PipelineOptions::default();
    if let Some(workers) = cli.workers {
        options.num_workers = workers.max(1);
    }
    options.pin_threads = !cli.no_pin;
    let pipeline = ChunkPipeline::with_options(options);

    match &cli.command {
        Commands::Compress { input, output } => {
            anyhow::ensure!(
                input.is_file(),
                "input file {} not found",
                input.display()
            );
            let stats = pipeline.compress(input, output)?;
            print_compress_summary(input, output, &stats);
        }
        Commands::Decompress { input, output } => {
            let output_path = sibling_path(input, output);
            anyhow::ensure!(
                !output_path.exists(),
                "output file {} already exists",
                output_path.display()
            );
            let stats = pipeline.decompress(input, output)?;
            print_decompress_summary(input, &output_path, &stats);
        }
    }

    Ok(())
}

/// Resolves `name` inside the directory that holds `input`.
fn sibling_path(input: &Path, name: &str) -> PathBuf {
    match input.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(name),
        _ => PathBuf::from(name),
    }
}

fn print_compress_summary(input: &Path, output_base: &str, stats: &CompressStats) {
    let elapsed_secs = stats.elapsed.as_secs_f64().max(1e-6);
    let ratio = if stats.input_bytes > 0 {
        stats.output_bytes as f64 / stats.input_bytes as f64
    } else {
        1.0
    };

    println!("compress complete");
    println!("  source: {}", input.display());
    println!("  chunk files: {} ({output_base}_<n>.zip)", stats.chunks);
    println!("  input bytes: {}", format_bytes(stats.input_bytes));
    println!("  output bytes: {}", format_bytes(stats.output_bytes));
    println!("  ratio: {ratio:.3}x");
    println!("  elapsed: {}", format_duration(stats.elapsed));
    println!(
        "  throughput: {}/s",
        format_rate(stats.input_bytes as f64 / elapsed_secs)
    );
    println!("  workers: {}", stats.workers);
}

fn print_decompress_summary(input: &Path, output: &Path, stats: &DecompressStats) {
    let elapsed_secs = stats.elapsed.as_secs_f64().max(1e-6);

    println!("decompress complete");
    println!("  chunk set: {}", input.display());
    println!("  output: {}", output.display());
    println!("  chunk files: {}", stats.chunks);
    println!("  restored bytes: {}", format_bytes(stats.output_bytes));
    println!("  elapsed: {}", format_duration(stats.elapsed));
    println!(
        "  throughput: {}/s",
        format_rate(stats.output_bytes as f64 / elapsed_secs)
    );
    println!("  workers: {}", stats.workers);
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0usize;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", UNITS[unit])
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

fn format_rate(bytes_per_second: f64) -> String {
    if !bytes_per_second.is_finite() || bytes_per_second <= 0.0 {
        return "0 B".to_string();
    }

    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes_per_second;
    let mut unit = 0usize;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{value:.0} {}", UNITS[unit])
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let millis = duration.subsec_millis();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else if minutes > 0 {
        format!("{minutes:02}:{seconds:02}")
    } else {
        format!("{seconds}.{millis:03}s")
    }
}
