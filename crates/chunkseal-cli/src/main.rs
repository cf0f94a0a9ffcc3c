//! chunkseal: chunked AES-GCM stream encryption CLI
//!
//! Commands:
//!   encrypt [<input>] [-o <output>]   - seal a file or stdin as a chunked ciphertext stream
//!   decrypt [<input>] [-o <output>]   - open a chunked ciphertext stream
//!   inspect [<input>]                 - list records without decrypting
//!   config show                       - display the effective configuration
//!
//! Keys are base64-encoded (16, 24 or 32 bytes once decoded) and are read from
//! `--key-file`, then `CHUNKSEAL_KEY`, then `[key] key_file` in the config.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as B64, Engine};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use zeroize::Zeroizing;

use chunkseal_core::config::{expand_home, ChunksealConfig, CodecConfig};
use chunkseal_crypto::{split_records, Decoder, Encoder, StreamStats, CHUNK_SIZE};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "chunkseal",
    version,
    about = "Chunked AES-GCM stream encryption",
    long_about = "chunkseal: encrypt arbitrarily large files and pipes as independently sealed AES-GCM chunks"
)]
struct Cli {
    /// Path to config.toml
    #[arg(
        long,
        short = 'c',
        env = "CHUNKSEAL_CONFIG",
        default_value = "~/.config/chunkseal/config.toml"
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config
    #[arg(long, env = "CHUNKSEAL_LOG")]
    log: Option<String>,

    /// Log format; overrides the config
    #[arg(long, env = "CHUNKSEAL_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt a file (or stdin) into a chunked ciphertext stream
    Encrypt(CodecArgs),

    /// Decrypt a chunked ciphertext stream
    ///
    /// Nothing is written unless every chunk authenticates.
    Decrypt(CodecArgs),

    /// Show the records of a ciphertext stream without decrypting it
    Inspect {
        /// Ciphertext file (default: stdin)
        input: Option<PathBuf>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug)]
struct CodecArgs {
    /// Input file (default: stdin)
    input: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// File holding the base64-encoded key
    #[arg(long, short = 'k')]
    key_file: Option<PathBuf>,

    /// Seal/open chunks in parallel batches
    #[arg(long)]
    parallel: bool,

    /// Chunks per parallel batch (0 = one per CPU); overrides the config
    #[arg(long)]
    batch_size: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Direction {
    Encrypt,
    Decrypt,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ChunksealConfig::load(&cli.config)?;

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = cli.log_format.clone().unwrap_or(match config.log.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(&level, &format);

    if !expand_home(&cli.config).exists() {
        warn!(
            "config file not found: {}  (using defaults)",
            cli.config.display()
        );
    }

    match cli.command {
        Commands::Encrypt(args) => cmd_codec(&config, &args, Direction::Encrypt),
        Commands::Decrypt(args) => cmd_codec(&config, &args, Direction::Decrypt),
        Commands::Inspect { input } => cmd_inspect(input.as_deref()),
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&config, &cli.config),
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries stream data, so logs go to stderr
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stderr))
                .init();
        }
    }
}

// ── Key resolution ────────────────────────────────────────────────────────────

/// Resolve the key: `--key-file` > `CHUNKSEAL_KEY` > config `key.key_file`.
fn resolve_key(key_file: Option<&Path>, config: &ChunksealConfig) -> Result<Zeroizing<Vec<u8>>> {
    let encoded = if let Some(path) = key_file {
        read_key_file(path)?
    } else if let Ok(value) = std::env::var("CHUNKSEAL_KEY") {
        Zeroizing::new(value)
    } else if let Some(path) = &config.key.key_file {
        read_key_file(&expand_home(path))?
    } else {
        anyhow::bail!(
            "no key provided; use --key-file, set CHUNKSEAL_KEY, or set key.key_file in config"
        );
    };

    let key = B64
        .decode(encoded.trim())
        .context("key is not valid base64")?;
    Ok(Zeroizing::new(key))
}

fn read_key_file(path: &Path) -> Result<Zeroizing<String>> {
    std::fs::read_to_string(path)
        .map(Zeroizing::new)
        .with_context(|| format!("reading key file: {}", path.display()))
}

// ── I/O plumbing ──────────────────────────────────────────────────────────────

fn open_input(input: Option<&Path>) -> Result<Box<dyn Read>> {
    match input {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("opening input: {}", path.display()))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(io::stdin().lock())),
    }
}

/// Run `produce` against the requested output.
///
/// Files are written to a temporary sibling and renamed into place only on
/// success. With `buffer_stdout`, nothing reaches stdout until `produce`
/// has finished without error.
fn write_output<F>(output: Option<&Path>, buffer_stdout: bool, produce: F) -> Result<StreamStats>
where
    F: FnOnce(&mut dyn Write) -> Result<StreamStats>,
{
    match output {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let mut tmp = tempfile::NamedTempFile::new_in(dir)
                .with_context(|| format!("creating temporary file in {}", dir.display()))?;
            let stats = {
                let mut writer = BufWriter::new(tmp.as_file_mut());
                let stats = produce(&mut writer)?;
                writer.flush().context("flushing output")?;
                stats
            };
            tmp.persist(path)
                .map_err(|e| e.error)
                .with_context(|| format!("writing output: {}", path.display()))?;
            Ok(stats)
        }
        None if buffer_stdout => {
            let mut buf = Zeroizing::new(Vec::new());
            let stats = produce(&mut *buf)?;
            let mut stdout = io::stdout().lock();
            stdout.write_all(&buf).context("writing to stdout")?;
            stdout.flush().context("flushing stdout")?;
            Ok(stats)
        }
        None => {
            let mut stdout = BufWriter::new(io::stdout().lock());
            let stats = produce(&mut stdout)?;
            stdout.flush().context("flushing stdout")?;
            Ok(stats)
        }
    }
}

// ── `chunkseal encrypt` / `chunkseal decrypt` ─────────────────────────────────

fn cmd_codec(config: &ChunksealConfig, args: &CodecArgs, direction: Direction) -> Result<()> {
    let key = resolve_key(args.key_file.as_deref(), config)?;
    let codec = CodecConfig {
        parallel: args.parallel || config.codec.parallel,
        batch_size: args.batch_size.unwrap_or(config.codec.batch_size),
    };
    codec.validate()?;
    let CodecConfig { parallel, batch_size } = codec;

    let stats = match direction {
        Direction::Encrypt => {
            let encoder = Encoder::new(&key)?;
            let source = open_input(args.input.as_deref())?;
            write_output(args.output.as_deref(), false, |sink| {
                let stats = if parallel {
                    encoder.encode_parallel_to(source, sink, batch_size)?
                } else {
                    encoder.encode_to(source, sink)?
                };
                Ok(stats)
            })?
        }
        Direction::Decrypt => {
            let decoder = Decoder::new(&key)?;
            let source = open_input(args.input.as_deref())?;
            write_output(args.output.as_deref(), true, |sink| {
                let stats = if parallel {
                    decoder.decode_parallel_to(source, sink, batch_size)?
                } else {
                    decoder.decode_to(source, sink)?
                };
                Ok(stats)
            })?
        }
    };

    info!(
        direction = ?direction,
        chunks = stats.chunks,
        plaintext = %fmt_bytes(stats.plaintext_bytes),
        ciphertext = %fmt_bytes(stats.ciphertext_bytes),
        parallel,
        "done"
    );
    Ok(())
}

// ── `chunkseal inspect` ───────────────────────────────────────────────────────

fn cmd_inspect(input: Option<&Path>) -> Result<()> {
    let mut stream = Vec::new();
    open_input(input)?
        .read_to_end(&mut stream)
        .context("reading ciphertext stream")?;

    let records = split_records(&stream)?;
    let plaintext: usize = records.iter().map(|r| r.plaintext_len()).sum();

    println!("chunk size: {}", fmt_bytes(CHUNK_SIZE as u64));
    println!("records:    {}", records.len());
    println!("plaintext:  {} ({} bytes)", fmt_bytes(plaintext as u64), plaintext);
    println!("ciphertext: {} ({} bytes)", fmt_bytes(stream.len() as u64), stream.len());
    for record in &records {
        println!("  #{:<6} {:>8} bytes", record.index, record.plaintext_len());
    }
    Ok(())
}

// ── `chunkseal config show` ───────────────────────────────────────────────────

fn cmd_config_show(config: &ChunksealConfig, config_path: &Path) -> Result<()> {
    if expand_home(config_path).exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

fn fmt_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
