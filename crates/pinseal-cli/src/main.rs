//! pinseal: client-side encryption for pinned files
//!
//! Commands:
//!   keygen                      - generate a random 128-bit primary key
//!   encrypt / decrypt           - single-layer AES-GCM (decrypt also opens onion files)
//!   onion-encrypt / onion-decrypt - multi-layer encryption under one primary key
//!   split / combine             - threshold shares of a primary key
//!   merkle / verify             - chunk a file into an integrity manifest, check it later
//!   recover                     - try every known algorithm/IV layout on a blob
//!   config show                 - display current configuration

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::{ExposeSecret, SecretString};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tracing::{debug, info, warn};

use pinseal_chunks::{hash_bytes, hash_to_hex, IntegrityManifest};
use pinseal_core::config::ChunkingConfig;
use pinseal_core::{
    FileInfo, JsonFileStore, MetadataStore, PinsealConfig, SecurityPolicy, StoredMetadata,
};
use pinseal_crypto::{
    combine_key, extract_key, generate_key, render_key_file, split_key, Encryptor,
    OnionEncryptor, Recovery, RecoveryError,
};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "pinseal",
    version,
    about = "Client-side encryption for IPFS-pinned files",
    long_about = "pinseal: encrypt files before pinning, split keys into shares, and verify integrity"
)]
struct Cli {
    /// Path to pinseal.toml configuration file
    #[arg(long, short = 'c', env = "PINSEAL_CONFIG", default_value = "pinseal.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "PINSEAL_LOG")]
    log: Option<String>,

    /// Log format (json, text); overrides the config file
    #[arg(long, env = "PINSEAL_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Args, Debug)]
struct KeyArgs {
    /// Primary key: 32 or 64 hex chars, or any passphrase
    #[arg(long, env = "PINSEAL_KEY", hide_env_values = true, conflicts_with = "key_file")]
    key: Option<String>,

    /// Read the primary key from a downloaded key file
    #[arg(long)]
    key_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a random 128-bit primary key
    Keygen,

    /// Encrypt a file with a single AES-GCM layer
    Encrypt {
        input: PathBuf,
        /// Ciphertext path (default: <input>.enc)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// MIME type recorded in the metadata
        #[arg(long)]
        mime: Option<String>,
        /// Also write a key file for safekeeping
        #[arg(long)]
        key_out: Option<PathBuf>,
        #[command(flatten)]
        key: KeyArgs,
    },

    /// Decrypt a file using its metadata (single-layer or onion)
    Decrypt {
        input: PathBuf,
        /// Metadata JSON (default: <input>.meta.json, then the metadata store)
        #[arg(long, short = 'm')]
        metadata: Option<PathBuf>,
        /// Plaintext path (default: <input> without .enc)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        #[command(flatten)]
        key: KeyArgs,
    },

    /// Encrypt a file with several independently keyed layers
    #[command(name = "onion-encrypt")]
    OnionEncrypt {
        input: PathBuf,
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Number of layers (default: from the security preset)
        #[arg(long, short = 'l')]
        layers: Option<usize>,
        #[command(flatten)]
        key: KeyArgs,
    },

    /// Decrypt a multi-layer file
    #[command(name = "onion-decrypt")]
    OnionDecrypt {
        input: PathBuf,
        #[arg(long, short = 'm')]
        metadata: Option<PathBuf>,
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        #[command(flatten)]
        key: KeyArgs,
    },

    /// Split the primary key into threshold shares, one per line
    Split {
        /// Number of shares (default: from the security preset)
        #[arg(long, short = 'n')]
        shares: Option<u8>,
        /// Shares required to recover (default: from the security preset)
        #[arg(long, short = 't')]
        threshold: Option<u8>,
        #[command(flatten)]
        key: KeyArgs,
    },

    /// Recover the primary key from shares
    Combine {
        /// Shares in "<index>:<hex>" form
        shares: Vec<String>,
        /// Read shares from a file, one per line
        #[arg(long)]
        from_file: Option<PathBuf>,
        /// Shares required (default: from the security preset)
        #[arg(long, short = 't')]
        threshold: Option<u8>,
    },

    /// Build a Merkle integrity manifest for a file
    Merkle {
        input: PathBuf,
        /// Manifest path (default: <input>.merkle.json)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Chunk size in bytes (default: from config)
        #[arg(long)]
        chunk_size: Option<usize>,
        /// Use content-defined chunk boundaries
        #[arg(long)]
        cdc: bool,
    },

    /// Check a file against its Merkle integrity manifest
    Verify {
        input: PathBuf,
        /// Manifest path (default: <input>.merkle.json)
        #[arg(long, short = 'm')]
        manifest: Option<PathBuf>,
    },

    /// Decrypt a blob whose metadata is lost by trying every known layout
    Recover {
        input: PathBuf,
        /// Base64 IV, if known
        #[arg(long)]
        iv: Option<String>,
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        #[command(flatten)]
        key: KeyArgs,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = PinsealConfig::load(&cli.config)
        .with_context(|| format!("loading config: {}", cli.config.display()))?;

    let level = cli.log.clone().unwrap_or_else(|| config.logging.level.clone());
    let format = cli.log_format.clone().unwrap_or_else(|| {
        if config.logging.format.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    });
    init_logging(&level, &format);

    debug!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        preset = %config.security.preset,
        "pinseal starting"
    );

    match cli.command {
        Commands::Keygen => cmd_keygen(),
        Commands::Encrypt { input, output, mime, key_out, key } => {
            cmd_encrypt(&config, &input, output.as_deref(), mime, key_out.as_deref(), &key)
        }
        Commands::Decrypt { input, metadata, output, key } => {
            cmd_decrypt(&config, &input, metadata.as_deref(), output.as_deref(), &key, false)
        }
        Commands::OnionEncrypt { input, output, layers, key } => {
            cmd_onion_encrypt(&config, &input, output.as_deref(), layers, &key)
        }
        Commands::OnionDecrypt { input, metadata, output, key } => {
            cmd_decrypt(&config, &input, metadata.as_deref(), output.as_deref(), &key, true)
        }
        Commands::Split { shares, threshold, key } => cmd_split(&config, shares, threshold, &key),
        Commands::Combine { shares, from_file, threshold } => {
            cmd_combine(&config, shares, from_file.as_deref(), threshold)
        }
        Commands::Merkle { input, output, chunk_size, cdc } => {
            cmd_merkle(&config, &input, output.as_deref(), chunk_size, cdc)
        }
        Commands::Verify { input, manifest } => cmd_verify(&input, manifest.as_deref()),
        Commands::Recover { input, iv, output, key } => {
            cmd_recover(&input, iv.as_deref(), output.as_deref(), &key)
        }
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&config, &cli.config),
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Resolve the primary key: --key / PINSEAL_KEY, then --key-file, then prompt
fn resolve_key(args: &KeyArgs) -> Result<SecretString> {
    if let Some(key) = &args.key {
        return Ok(SecretString::from(key.clone()));
    }
    if let Some(path) = &args.key_file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading key file: {}", path.display()))?;
        let key = extract_key(&text)
            .with_context(|| format!("no ENCRYPTION KEY line in {}", path.display()))?;
        return Ok(SecretString::from(key));
    }
    let entered = rpassword::prompt_password("Primary key: ").context("reading primary key")?;
    Ok(SecretString::from(entered))
}

fn policy(config: &PinsealConfig) -> Result<SecurityPolicy> {
    config
        .security
        .effective()
        .context("resolving security policy")
}

/// `path` with `suffix` appended to the full file name
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn decrypted_path(input: &Path) -> PathBuf {
    match input.extension() {
        Some(ext) if ext == "enc" => input.with_extension(""),
        _ => with_suffix(input, ".dec"),
    }
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn write_output(path: &Path, data: &[u8]) -> Result<()> {
    std::fs::write(path, data).with_context(|| format!("writing {}", path.display()))
}

fn content_key(ciphertext: &[u8]) -> String {
    hash_to_hex(&hash_bytes(ciphertext))
}

fn open_store(config: &PinsealConfig) -> Result<Option<JsonFileStore>> {
    match &config.store.metadata_path {
        Some(path) => JsonFileStore::open(path)
            .with_context(|| format!("opening metadata store: {}", path.display()))
            .map(Some),
        None => Ok(None),
    }
}

/// Write metadata next to the ciphertext and record it in the store, if any.
///
/// Callers write the ciphertext only after this succeeds, so a failed store
/// never leaves an undecryptable output behind.
fn save_metadata(
    config: &PinsealConfig,
    output: &Path,
    ciphertext: &[u8],
    metadata: StoredMetadata,
) -> Result<PathBuf> {
    let store = open_store(config)?;
    let meta_path = with_suffix(output, ".meta.json");
    let json = serde_json::to_string_pretty(&metadata).context("serializing metadata")?;
    write_output(&meta_path, json.as_bytes())?;

    if let Some(mut store) = store {
        let key = content_key(ciphertext);
        store
            .put(&key, metadata)
            .with_context(|| format!("recording metadata for {key}"))?;
        info!(content = %key, "metadata recorded in store");
    }
    Ok(meta_path)
}

fn load_metadata(
    config: &PinsealConfig,
    input: &Path,
    explicit: Option<&Path>,
    ciphertext: &[u8],
) -> Result<StoredMetadata> {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| with_suffix(input, ".meta.json"));
    if path.exists() {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading metadata: {}", path.display()))?;
        return serde_json::from_str(&text)
            .with_context(|| format!("parsing metadata: {}", path.display()));
    }
    if explicit.is_some() {
        anyhow::bail!("metadata file not found: {}", path.display());
    }

    let key = content_key(ciphertext);
    let store = open_store(config)?
        .with_context(|| format!("no metadata at {} and no metadata store configured", path.display()))?;
    store
        .get(&key)?
        .with_context(|| format!("no metadata for {} (content {key})", input.display()))
}

fn make_progress_bar(total: u64, prefix: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("progress bar template")?
            .progress_chars("=>-"),
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

// ── `pinseal keygen` ──────────────────────────────────────────────────────────

fn cmd_keygen() -> Result<()> {
    println!("{}", generate_key());
    Ok(())
}

// ── `pinseal encrypt` ─────────────────────────────────────────────────────────

fn cmd_encrypt(
    config: &PinsealConfig,
    input: &Path,
    output: Option<&Path>,
    mime: Option<String>,
    key_out: Option<&Path>,
    key_args: &KeyArgs,
) -> Result<()> {
    let data = read_input(input)?;
    let key = resolve_key(key_args)?;
    let info = FileInfo {
        name: input.file_name().map(|n| n.to_string_lossy().into_owned()),
        size: Some(data.len() as u64),
        mime_type: mime,
    };

    let encryptor = Encryptor::default().with_max_size(config.limits.max_file_size);
    let (ciphertext, metadata) = encryptor
        .encrypt(&data, key.expose_secret(), &info)
        .with_context(|| format!("encrypting {}", input.display()))?;

    let key_file = key_out
        .map(|path| {
            render_key_file(key.expose_secret(), &metadata)
                .map(|doc| (path, doc))
                .context("--key-out needs a 32 or 64 hex char key")
        })
        .transpose()?;

    let out = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| with_suffix(input, ".enc"));
    let meta_path = save_metadata(config, &out, &ciphertext, metadata.into())?;
    if let Some((path, doc)) = &key_file {
        write_output(path, doc.as_bytes())?;
    }
    write_output(&out, &ciphertext)?;

    println!("Encrypted {} → {}", input.display(), out.display());
    println!("  metadata: {}", meta_path.display());
    if let Some((path, _)) = &key_file {
        println!("  key file: {}", path.display());
    }
    println!("  bytes:    {}", fmt_bytes(ciphertext.len() as u64));
    Ok(())
}

// ── `pinseal onion-encrypt` ───────────────────────────────────────────────────

fn cmd_onion_encrypt(
    config: &PinsealConfig,
    input: &Path,
    output: Option<&Path>,
    layers: Option<usize>,
    key_args: &KeyArgs,
) -> Result<()> {
    let layers = match layers {
        Some(l) => l,
        None => policy(config)?.layers,
    };
    let data = read_input(input)?;
    let key = resolve_key(key_args)?;

    let onion = OnionEncryptor::default().with_max_size(config.limits.max_file_size);
    let (ciphertext, metadata) = onion
        .encrypt(&data, key.expose_secret(), layers)
        .with_context(|| format!("onion-encrypting {}", input.display()))?;

    let out = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| with_suffix(input, ".enc"));
    let id = metadata.encryption_id.clone();
    let meta_path = save_metadata(config, &out, &ciphertext, metadata.into())?;
    write_output(&out, &ciphertext)?;

    println!("Encrypted {} → {} ({layers} layers)", input.display(), out.display());
    println!("  metadata:      {}", meta_path.display());
    println!("  encryption id: {id}");
    Ok(())
}

// ── `pinseal decrypt` / `pinseal onion-decrypt` ──────────────────────────────

fn cmd_decrypt(
    config: &PinsealConfig,
    input: &Path,
    metadata: Option<&Path>,
    output: Option<&Path>,
    key_args: &KeyArgs,
    onion_only: bool,
) -> Result<()> {
    let ciphertext = read_input(input)?;
    let metadata = load_metadata(config, input, metadata, &ciphertext)?;
    let key = resolve_key(key_args)?;

    let plaintext = match metadata {
        StoredMetadata::SingleLayer(_) if onion_only => {
            anyhow::bail!("{} is single-layer; use `pinseal decrypt`", input.display())
        }
        StoredMetadata::SingleLayer(meta) => Encryptor::default()
            .decrypt(&ciphertext, &meta, key.expose_secret())
            .with_context(|| format!("decrypting {}", input.display()))?,
        StoredMetadata::MultiLayer(meta) => OnionEncryptor::default()
            .decrypt(&ciphertext, &meta, key.expose_secret())
            .with_context(|| {
                format!("decrypting {} ({} layers)", input.display(), meta.layer_count())
            })?,
    };

    let out = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| decrypted_path(input));
    write_output(&out, &plaintext)?;
    println!("Decrypted {} → {} ({})", input.display(), out.display(), fmt_bytes(plaintext.len() as u64));
    Ok(())
}

// ── `pinseal split` / `pinseal combine` ───────────────────────────────────────

fn cmd_split(
    config: &PinsealConfig,
    shares: Option<u8>,
    threshold: Option<u8>,
    key_args: &KeyArgs,
) -> Result<()> {
    let policy = policy(config)?;
    let total = shares.unwrap_or(policy.total_shares);
    let threshold = threshold.unwrap_or(policy.threshold);
    let key = resolve_key(key_args)?;

    let shares = split_key(key.expose_secret(), total, threshold).context("splitting key")?;
    eprintln!("# {threshold} of {total} shares required to recover the key");
    for share in shares {
        println!("{share}");
    }
    Ok(())
}

fn cmd_combine(
    config: &PinsealConfig,
    mut shares: Vec<String>,
    from_file: Option<&Path>,
    threshold: Option<u8>,
) -> Result<()> {
    if let Some(path) = from_file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading shares: {}", path.display()))?;
        shares.extend(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#'))
                .map(String::from),
        );
    }
    let threshold = match threshold {
        Some(t) => t,
        None => policy(config)?.threshold,
    };

    let key = combine_key(&shares, threshold).context("combining shares")?;
    println!("{}", key.as_str());
    Ok(())
}

// ── `pinseal merkle` / `pinseal verify` ───────────────────────────────────────

fn cmd_merkle(
    config: &PinsealConfig,
    input: &Path,
    output: Option<&Path>,
    chunk_size: Option<usize>,
    cdc: bool,
) -> Result<()> {
    let data = read_input(input)?;
    let chunking = ChunkingConfig {
        chunk_size: chunk_size.unwrap_or(config.chunking.chunk_size),
        content_defined: cdc || config.chunking.content_defined,
    };

    let manifest = IntegrityManifest::build(&data, &chunking)
        .with_context(|| format!("building manifest for {}", input.display()))?;
    let out = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| with_suffix(input, ".merkle.json"));
    let json = serde_json::to_string_pretty(&manifest).context("serializing manifest")?;
    write_output(&out, json.as_bytes())?;

    println!("Manifest {} → {}", input.display(), out.display());
    println!("  root:   {}", manifest.root.as_deref().unwrap_or("(empty file)"));
    println!("  chunks: {}", manifest.chunks.len());
    Ok(())
}

fn cmd_verify(input: &Path, manifest: Option<&Path>) -> Result<()> {
    let path = manifest
        .map(Path::to_path_buf)
        .unwrap_or_else(|| with_suffix(input, ".merkle.json"));
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("reading manifest: {}", path.display()))?;
    let manifest: IntegrityManifest = serde_json::from_str(&text)
        .with_context(|| format!("parsing manifest: {}", path.display()))?;

    let data = read_input(input)?;
    let report = manifest.verify(&data).context("verifying chunks")?;
    if report.is_ok() {
        println!("{}: OK ({} chunks)", input.display(), report.checked);
        return Ok(());
    }
    for i in &report.failed {
        warn!(chunk = i, "chunk failed integrity check");
    }
    anyhow::bail!(
        "{}: {} of {} chunks failed integrity check",
        input.display(),
        report.failed.len(),
        report.checked
    )
}

// ── `pinseal recover` ─────────────────────────────────────────────────────────

fn cmd_recover(
    input: &Path,
    iv: Option<&str>,
    output: Option<&Path>,
    key_args: &KeyArgs,
) -> Result<()> {
    let blob = read_input(input)?;
    let key = resolve_key(key_args)?;
    let recovery = Recovery::default();
    // Never set: the CLI always runs every candidate
    let cancel = AtomicBool::new(false);

    let pb = make_progress_bar(recovery.candidates().len() as u64, "recover")?;
    let result = recovery.run(&blob, key.expose_secret(), iv, &cancel, |p| {
        pb.set_position(p.attempt as u64);
        pb.set_message(p.candidate.to_string());
    });

    match result {
        Ok(found) => {
            pb.finish_with_message(format!("matched {}", found.candidate));
            let out = output
                .map(Path::to_path_buf)
                .unwrap_or_else(|| decrypted_path(input));
            write_output(&out, &found.plaintext)?;
            println!("Recovered {} → {}", input.display(), out.display());
            println!("  layout:   {}", found.candidate);
            println!("  attempts: {}", found.attempts);
            Ok(())
        }
        Err(RecoveryError::Exhausted(failures)) => {
            pb.abandon_with_message("no candidate matched");
            for (candidate, err) in &failures {
                eprintln!("  {candidate}: {err}");
            }
            anyhow::bail!("could not decrypt {} with any known layout", input.display())
        }
        Err(e @ RecoveryError::Cancelled { .. }) => {
            pb.abandon();
            Err(e.into())
        }
    }
}

// ── `pinseal config show` ─────────────────────────────────────────────────────

fn cmd_config_show(config: &PinsealConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    let policy = policy(config)?;
    println!(
        "# Effective policy: {} layers, {} of {} shares, rotate every {} days",
        policy.layers, policy.threshold, policy.total_shares, policy.key_rotation_days
    );
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_every_subcommand() {
        for args in [
            vec!["pinseal", "keygen"],
            vec!["pinseal", "encrypt", "a.pdf", "--key", "pass phrase"],
            vec!["pinseal", "decrypt", "a.pdf.enc", "--key-file", "a.key"],
            vec!["pinseal", "onion-encrypt", "a.pdf", "-l", "5", "--key", "k"],
            vec!["pinseal", "onion-decrypt", "a.pdf.enc", "--key", "k"],
            vec!["pinseal", "split", "-n", "5", "-t", "3", "--key", "k"],
            vec!["pinseal", "combine", "1:ab", "2:cd"],
            vec!["pinseal", "merkle", "a.pdf", "--cdc"],
            vec!["pinseal", "verify", "a.pdf"],
            vec!["pinseal", "recover", "blob", "--iv", "AAAA", "--key", "k"],
            vec!["pinseal", "--log-format", "json", "config", "show"],
        ] {
            Cli::try_parse_from(args.clone()).unwrap_or_else(|e| panic!("{args:?}: {e}"));
        }
    }

    #[test]
    fn key_and_key_file_conflict() {
        let res = Cli::try_parse_from([
            "pinseal", "decrypt", "x", "--key", "k", "--key-file", "f",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn key_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("k.txt");
        std::fs::write(&path, "ENCRYPTION KEY: 00112233445566778899aabbccddeeff\n").unwrap();
        let args = KeyArgs {
            key: None,
            key_file: Some(path),
        };
        assert_eq!(
            resolve_key(&args).unwrap().expose_secret(),
            "00112233445566778899aabbccddeeff"
        );
    }

    #[test]
    fn derived_paths() {
        assert_eq!(with_suffix(Path::new("a/b.pdf"), ".enc"), PathBuf::from("a/b.pdf.enc"));
        assert_eq!(decrypted_path(Path::new("b.pdf.enc")), PathBuf::from("b.pdf"));
        assert_eq!(decrypted_path(Path::new("blob")), PathBuf::from("blob.dec"));
    }

    #[test]
    fn metadata_roundtrip_through_files_and_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PinsealConfig::default();
        config.store.metadata_path = Some(dir.path().join("store.json"));

        let key = generate_key();
        let (ct, meta) = Encryptor::default()
            .encrypt(b"cli bytes", &key, &FileInfo::default())
            .unwrap();
        let out = dir.path().join("f.enc");
        let meta_path = save_metadata(&config, &out, &ct, meta.clone().into()).unwrap();
        assert!(meta_path.exists());

        // Sidecar file wins
        let loaded = load_metadata(&config, &out, None, &ct).unwrap();
        assert_eq!(loaded, StoredMetadata::SingleLayer(meta.clone()));

        // Falls back to the store once the sidecar is gone
        std::fs::remove_file(&meta_path).unwrap();
        let loaded = load_metadata(&config, &out, None, &ct).unwrap();
        assert_eq!(loaded, StoredMetadata::SingleLayer(meta));
    }

    fn key_args(key: &str) -> KeyArgs {
        KeyArgs {
            key: Some(key.to_string()),
            key_file: None,
        }
    }

    #[test]
    fn encrypt_writes_ciphertext_metadata_and_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("note.txt");
        std::fs::write(&input, b"pinned note").unwrap();
        let key_out = dir.path().join("note.key");
        let key = generate_key();

        cmd_encrypt(
            &PinsealConfig::default(),
            &input,
            None,
            None,
            Some(&key_out),
            &key_args(&key),
        )
        .unwrap();

        let out = with_suffix(&input, ".enc");
        let ct = std::fs::read(&out).unwrap();
        let meta = match load_metadata(&PinsealConfig::default(), &out, None, &ct).unwrap() {
            StoredMetadata::SingleLayer(meta) => meta,
            other => panic!("expected single-layer metadata, got {other:?}"),
        };
        let saved = extract_key(&std::fs::read_to_string(&key_out).unwrap()).unwrap();
        assert_eq!(
            Encryptor::default().decrypt(&ct, &meta, &saved).unwrap(),
            b"pinned note"
        );
    }

    #[test]
    fn passphrase_key_out_fails_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("note.txt");
        std::fs::write(&input, b"pinned note").unwrap();
        let key_out = dir.path().join("note.key");

        let err = cmd_encrypt(
            &PinsealConfig::default(),
            &input,
            None,
            None,
            Some(&key_out),
            &key_args("correct horse battery staple"),
        )
        .unwrap_err();

        assert!(format!("{err:#}").contains("--key-out"));
        assert!(!key_out.exists());
        assert!(!with_suffix(&input, ".enc").exists());
        assert!(!with_suffix(&input, ".enc.meta.json").exists());
    }

    #[test]
    fn store_failure_leaves_no_ciphertext() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("note.txt");
        std::fs::write(&input, b"pinned note").unwrap();
        // A directory where the store file should be cannot be opened
        let mut config = PinsealConfig::default();
        config.store.metadata_path = Some(dir.path().to_path_buf());

        let key = generate_key();
        assert!(cmd_encrypt(&config, &input, None, None, None, &key_args(&key)).is_err());
        assert!(!with_suffix(&input, ".enc").exists());

        let onion_out = dir.path().join("note.onion");
        assert!(
            cmd_onion_encrypt(&config, &input, Some(&onion_out), Some(2), &key_args(&key)).is_err()
        );
        assert!(!onion_out.exists());
    }

    #[test]
    fn fmt_bytes_units() {
        assert_eq!(fmt_bytes(512), "512 B");
        assert_eq!(fmt_bytes(2048), "2.0 KB");
        assert_eq!(fmt_bytes(15 * 1024 * 1024), "15.0 MB");
    }
}
