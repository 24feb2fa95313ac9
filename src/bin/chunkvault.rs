//! Chunkvault CLI - content-defined chunking and deduplication.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use chunkvault::{
    Vault, VaultConfig, DEFAULT_FINGERPRINT_DEGREE, DEFAULT_MASK_SIZE, DEFAULT_WINDOW_SIZE,
};

/// Extension given to encoded reference lists.
const REF_EXTENSION: &str = "cvr";

/// Chunkvault - chunk-level deduplication against a shared store
#[derive(Parser)]
#[command(name = "chunkvault")]
#[command(version)]
#[command(about = "Content-defined chunking and chunk-level deduplication")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a file (or every file in a directory) against a shared store
    Encode {
        /// Input file, or a directory to batch-encode
        #[arg(required = true)]
        input: PathBuf,

        /// Chunk store file (created on first use)
        #[arg(short, long, default_value = "chunks.store")]
        store: PathBuf,

        /// Output reference list (default: <input>.cvr; ignored for directories)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Rolling-window width in bytes
        #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE)]
        window_size: usize,

        /// Fingerprint degree in bits (8-56)
        #[arg(long, default_value_t = DEFAULT_FINGERPRINT_DEGREE)]
        degree: u32,

        /// Boundary mask size in bits; expected chunk size is 2^mask-size
        #[arg(long, default_value_t = DEFAULT_MASK_SIZE)]
        mask_size: u32,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Reconstruct a file from a reference list and its store
    Decode {
        /// Reference list produced by encode
        #[arg(required = true)]
        input: PathBuf,

        /// Chunk store file the reference list was encoded against
        #[arg(short, long, default_value = "chunks.store")]
        store: PathBuf,

        /// Output file (default: <input> with .cvr stripped, plus .out)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Encode {
            input,
            store,
            output,
            window_size,
            degree,
            mask_size,
            verbose,
        } => {
            let config = VaultConfig {
                window_size,
                fingerprint_degree: degree,
                mask_size,
                ..VaultConfig::default()
            };
            let vault = Vault::with_config(config);
            if input.is_dir() {
                run_encode_dir(&vault, &input, &store, verbose)
            } else {
                let output = output.unwrap_or_else(|| ref_list_path(&input));
                run_encode(&vault, &input, &output, &store, verbose)
            }
        }
        Commands::Decode {
            input,
            store,
            output,
            verbose,
        } => {
            let output = output.unwrap_or_else(|| decoded_path(&input));
            run_decode(&input, &output, &store, verbose)
        }
    }
}

fn run_encode(
    vault: &Vault,
    input: &Path,
    output: &Path,
    store: &Path,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if verbose {
        eprintln!("Encoding {} -> {}", input.display(), output.display());
        eprintln!("Store: {}", store.display());
        let config = vault.config();
        eprintln!(
            "Window: {} bytes, degree: {} bits, expected chunk: {} bytes",
            config.window_size,
            config.fingerprint_degree,
            1u64 << config.mask_size
        );
    }

    let stats = vault.encode_file(input, output, store)?;

    if verbose {
        eprintln!("Input size: {} bytes", stats.input_len);
        eprintln!("Total chunks: {}", stats.total_chunks);
        eprintln!("Unique chunks: {}", stats.unique_chunks);
        eprintln!("Store records: {}", stats.store_records);
        eprintln!("Dedup ratio: {:.1}%", stats.dedup_ratio() * 100.0);
    }

    println!(
        "Encoded {} ({} chunks, {} new, {} bytes added to store)",
        output.display(),
        stats.total_chunks,
        stats.new_records,
        stats.new_bytes
    );

    Ok(())
}

fn run_encode_dir(
    vault: &Vault,
    dir: &Path,
    store: &Path,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && !is_artifact(path))
        .collect();
    entries.sort();

    if entries.is_empty() {
        println!("No files to encode in {}", dir.display());
        return Ok(());
    }

    for input in &entries {
        let output = ref_list_path(input);
        run_encode(vault, input, &output, store, verbose)?;
    }

    Ok(())
}

fn run_decode(
    input: &Path,
    output: &Path,
    store: &Path,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if verbose {
        eprintln!("Decoding {} -> {}", input.display(), output.display());
        eprintln!("Store: {}", store.display());
    }

    let vault = Vault::new();
    let stats = vault.decode(input, store, output)?;

    println!(
        "Decoded {} ({} chunks, {} bytes)",
        output.display(),
        stats.chunk_count,
        stats.output_len
    );

    Ok(())
}

/// Skip reference lists when batch-encoding a directory.
fn is_artifact(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == REF_EXTENSION)
}

/// `notes.txt` -> `notes.txt.cvr`
fn ref_list_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_os_string();
    name.push(".");
    name.push(REF_EXTENSION);
    PathBuf::from(name)
}

/// `notes.txt.cvr` -> `notes.txt.out`; anything else gets `.out` appended.
fn decoded_path(input: &Path) -> PathBuf {
    let stripped = if is_artifact(input) {
        input.with_extension("")
    } else {
        input.to_path_buf()
    };
    let mut name = stripped.as_os_str().to_os_string();
    name.push(".out");
    PathBuf::from(name)
}
