//! DTA command-line interface
//!
//! Data Transfer Agent log keeping for removable media transfers:
//! - File lists that inventory every transferred file, including the
//!   contents of nested ZIP, TAR and GZIP archives
//! - Yearly transfer and request logs
//! - Review of past transfers and their file lists

mod config;
mod naming;
mod progress;
mod review;
mod transfer_log;

use chrono::{Datelike, Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use console::style;
use dta_files::{
    EntrySize, FileHashMap, FileListOutcome, HashAlgorithm, Hasher, WalkSummary, Walker,
    hash_files, read_ledger, write_file_list,
};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use walkdir::WalkDir;

use config::Config;
use naming::{Naming, TokenValues};
use progress::{TaskProgress, format_bytes};
use review::{DEFAULT_PAGE_SIZE, LogTable, available_years, log_paths_for_year, paginate};
use transfer_log::{RequestRecord, TransferRecord, append_record};

/// Configuration file used when `--config` is not given
const DEFAULT_CONFIG_PATH: &str = "~/.config/dta/config.toml";

/// Accepted `--transfer-date` format (MM/DD/YYYY)
const TRANSFER_DATE_FORMAT: &str = "%m/%d/%Y";

/// DTA - log removable media file transfers
#[derive(Parser)]
#[command(name = "dta")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug output (implies --verbose)
    #[arg(short, long)]
    debug: bool,

    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a transfer: write its file list and append to the transfer log
    Log(LogArgs),

    /// Record a file transfer request
    Request(RequestArgs),

    /// Write a file list without logging a transfer
    List {
        /// Files or directories to list
        #[arg(required = true)]
        files: Vec<String>,

        /// Output CSV path
        #[arg(short, long)]
        output: String,

        /// Hash selected files
        #[arg(long)]
        hash: bool,
    },

    /// Print content digests of files
    Hash {
        /// Files or directories to hash
        #[arg(required = true)]
        files: Vec<String>,

        /// Digest algorithm (sha256, blake3); defaults to hashing.algorithm
        #[arg(short, long)]
        algorithm: Option<String>,
    },

    /// Browse past transfers or requests
    Review(ReviewArgs),

    /// View or modify configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args)]
struct LogArgs {
    /// Files or directories that were transferred
    #[arg(required = true)]
    files: Vec<String>,

    /// Media type (one of ui.media_types)
    #[arg(long)]
    media_type: String,

    /// Media identifier or control number
    #[arg(long)]
    media_id: String,

    /// Transfer type name or abbreviation, e.g. "Low to High" or L2H
    #[arg(long)]
    transfer_type: String,

    /// Source network (one of ui.network_list)
    #[arg(long)]
    source: String,

    /// Destination network (one of ui.network_list)
    #[arg(long)]
    destination: String,

    /// Override the logged username
    #[arg(long)]
    username: Option<String>,

    /// Override the logged computer name
    #[arg(long)]
    computer_name: Option<String>,

    /// Transfer date as MM/DD/YYYY (default: today)
    #[arg(long)]
    transfer_date: Option<String>,

    /// Do not hash selected files
    #[arg(long)]
    no_hash: bool,
}

#[derive(Args)]
struct RequestArgs {
    /// Files or directories requested for transfer
    #[arg(required = true)]
    files: Vec<String>,

    /// Reason for the request
    #[arg(long)]
    purpose: String,

    /// Override the requestor name
    #[arg(long)]
    requestor: Option<String>,

    /// Override the logged computer name
    #[arg(long)]
    computer_name: Option<String>,

    /// Do not hash selected files
    #[arg(long)]
    no_hash: bool,
}

#[derive(Args)]
struct ReviewArgs {
    /// Review the request log instead of the transfer log
    #[arg(long)]
    requests: bool,

    /// List the years that have logs
    #[arg(long)]
    years: bool,

    /// Year to review (default: current year)
    #[arg(long)]
    year: Option<i32>,

    /// Only show rows containing this text (case-insensitive)
    #[arg(short, long)]
    filter: Option<String>,

    /// Page number
    #[arg(long, default_value = "1")]
    page: usize,

    /// Rows per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Print the file list of row N (as numbered in the listing)
    #[arg(long)]
    show: Option<usize>,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show {
        /// Show specific configuration key
        key: Option<String>,
    },

    /// Set a configuration value
    Set {
        /// Configuration key to set
        key: String,

        /// Value to set
        value: String,
    },
}

// ═══════════════════════════════════════════════════════════════════════════
// Helper Functions
// ═══════════════════════════════════════════════════════════════════════════

/// Expand a leading `~/` to the home directory
fn expand_home(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(stripped)
    } else {
        PathBuf::from(path)
    }
}

fn current_username() -> String {
    whoami::username()
}

fn current_computer_name() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Resolve selected paths to a de-duplicated list of files, descending into
/// directories in file name order.
fn expand_inputs(inputs: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for input in inputs {
        let path = normalize_path(&std::path::absolute(input)?);
        if path.is_dir() {
            for entry in WalkDir::new(&path).sort_by_file_name() {
                match entry {
                    Ok(entry) if entry.file_type().is_file() => {
                        let file = entry.into_path();
                        if seen.insert(file.clone()) {
                            files.push(file);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!("Skipping unreadable entry under {}: {}", path.display(), e),
                }
            }
        } else if path.is_file() {
            if seen.insert(path.clone()) {
                files.push(path);
            }
        } else {
            tracing::warn!("Skipping {}: not found", path.display());
            eprintln!("{} {} not found, skipped", style("warning:").yellow().bold(), path.display());
        }
    }

    if files.is_empty() {
        anyhow::bail!("No files selected");
    }
    Ok(files)
}

/// Load the configuration named by `--config`. Only the default location
/// is created on first use; an explicit path must exist.
fn load_config(arg: &str) -> anyhow::Result<Config> {
    if arg == DEFAULT_CONFIG_PATH {
        return Config::load_or_default();
    }
    Config::load(&expand_home(arg))
}

/// Resolve `.` and `..` components without touching the filesystem.
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Match `value` against a configured pick list, case-insensitively,
/// returning the configured spelling. An empty list accepts anything.
fn pick_listed(list: &[String], value: &str, what: &str) -> anyhow::Result<String> {
    let value = value.trim();
    if value.is_empty() {
        anyhow::bail!("Please select a {what}");
    }
    if list.is_empty() {
        return Ok(value.to_string());
    }
    list.iter()
        .find(|item| item.eq_ignore_ascii_case(value))
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Unknown {what} {value:?} (expected one of: {})", list.join(", ")))
}

/// Validated transfer details
#[derive(Debug, PartialEq)]
struct TransferDetails {
    media_type: String,
    media_id: String,
    transfer_type: String,
    source: String,
    destination: String,
}

fn validate_transfer(args: &LogArgs, config: &Config) -> anyhow::Result<TransferDetails> {
    let media_type = pick_listed(&config.ui.media_types, &args.media_type, "media type")?;

    let media_id = args.media_id.trim().to_string();
    if media_id.is_empty() {
        anyhow::bail!("Please enter a media ID");
    }

    let transfer_type = config
        .transfer_type_abbreviation(args.transfer_type.trim())
        .map(str::to_string)
        .ok_or_else(|| {
            let known: Vec<&str> = config.ui.transfer_types.keys().map(String::as_str).collect();
            anyhow::anyhow!(
                "Unknown transfer type {:?} (expected one of: {})",
                args.transfer_type,
                known.join(", ")
            )
        })?;

    let source = pick_listed(&config.ui.network_list, &args.source, "source")?;
    let destination = pick_listed(&config.ui.network_list, &args.destination, "destination")?;
    if source == destination {
        tracing::warn!("Source and destination are both {}", source);
        eprintln!(
            "{} source and destination are the same ({})",
            style("warning:").yellow().bold(),
            source
        );
    }

    Ok(TransferDetails {
        media_type,
        media_id,
        transfer_type,
        source,
        destination,
    })
}

fn print_summary(path: &Path, summary: &WalkSummary) {
    println!();
    println!("{}", style("File list written").green().bold());
    println!("  Path: {}", path.display());
    println!("  Files: {}", summary.files_processed);
    if summary.files_skipped > 0 {
        println!("  Skipped: {}", summary.files_skipped);
    }
    println!("  Entries: {}", summary.rows);
    println!("  Total size: {}", format_bytes(summary.total_size));
    if !summary.warnings.is_empty() {
        println!("  Warnings: {}", summary.warnings.len());
        for warning in &summary.warnings {
            println!("    {}", style(warning).yellow());
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Background work
// ═══════════════════════════════════════════════════════════════════════════

/// Progress reported from a blocking task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProgressEvent {
    Stage(&'static str),
    Percent(u8),
}

type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

fn report(events: &ProgressSender, event: ProgressEvent) {
    // Receiver only goes away once the task is being torn down
    let _ = events.send(event);
}

/// Run `task` on the blocking pool, drawing its progress and turning Ctrl-C
/// into a cancellation flag.
async fn run_with_progress<T, F>(task: F) -> anyhow::Result<T>
where
    T: Send + 'static,
    F: FnOnce(&AtomicBool, &ProgressSender) -> anyhow::Result<T> + Send + 'static,
{
    let cancel = Arc::new(AtomicBool::new(false));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let interrupt = {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Cancellation requested");
                cancel.store(true, Ordering::Relaxed);
            }
        })
    };

    let worker = {
        let cancel = Arc::clone(&cancel);
        tokio::task::spawn_blocking(move || task(&cancel, &tx))
    };

    let progress = TaskProgress::new("Starting");
    while let Some(event) = rx.recv().await {
        match event {
            ProgressEvent::Stage(stage) => progress.set_stage(stage),
            ProgressEvent::Percent(percent) => progress.update(percent),
        }
    }

    let result = worker.await?;
    interrupt.abort();

    if cancel.load(Ordering::Relaxed) {
        progress.abandon_with_message("Canceled");
    } else if result.is_ok() {
        progress.finish_with_message("Done");
    } else {
        progress.abandon_with_message("Failed");
    }
    result
}

/// One file list to produce
struct FileListJob {
    files: Vec<PathBuf>,
    output: PathBuf,
    hasher: Option<Hasher>,
    entry_hasher: Option<Hasher>,
    max_depth: Option<u32>,
    descend: bool,
}

impl FileListJob {
    fn new(files: Vec<PathBuf>, output: PathBuf, config: &Config, hash: bool) -> anyhow::Result<Self> {
        let algorithm = config.hashing.algorithm()?;
        Ok(Self {
            files,
            output,
            hasher: hash.then(|| Hasher::new(algorithm)),
            entry_hasher: (hash && config.hashing.hash_archive_entries)
                .then(|| Hasher::new(algorithm)),
            max_depth: config.hashing.max_depth,
            descend: true,
        })
    }

    /// List top-level files only
    fn without_descent(mut self) -> Self {
        self.descend = false;
        self.entry_hasher = None;
        self
    }

    fn run(&self, cancel: &AtomicBool, events: &ProgressSender) -> anyhow::Result<FileListOutcome> {
        let is_canceled = || cancel.load(Ordering::Relaxed);

        let hashes = match &self.hasher {
            Some(hasher) => {
                report(events, ProgressEvent::Stage("Hashing"));
                let progress = |pct: u8| report(events, ProgressEvent::Percent(pct));
                match hash_files(hasher, &self.files, progress, is_canceled) {
                    Some(hashes) => hashes,
                    None => return Ok(FileListOutcome::Canceled),
                }
            }
            None => FileHashMap::new(),
        };

        report(events, ProgressEvent::Stage("Listing"));
        let mut walker = Walker::new()
            .with_hashes(&hashes)
            .with_cancel(&is_canceled)
            .with_max_depth(self.max_depth)
            .descend_archives(self.descend);
        if let Some(entry_hasher) = &self.entry_hasher {
            walker = walker.with_entry_hasher(entry_hasher);
        }

        let outcome = write_file_list(&self.output, &mut walker, &self.files, |pct| {
            report(events, ProgressEvent::Percent(pct));
        })?;
        Ok(outcome)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Entry point
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;

    // Initialize logging
    let log_level = if cli.debug {
        "trace".to_string()
    } else if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.to_ascii_lowercase()
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Log(args) => {
            log_transfer(args, &config).await?;
        }
        Commands::Request(args) => {
            record_request(args, &config).await?;
        }
        Commands::List {
            files,
            output,
            hash,
        } => {
            list_files(files, PathBuf::from(output), hash, &config).await?;
        }
        Commands::Hash { files, algorithm } => {
            hash_command(files, algorithm, &config).await?;
        }
        Commands::Review(args) => {
            review_logs(&args, &config)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { key } => {
                config_show(key, &config).await?;
            }
            ConfigAction::Set { key, value } => {
                config_set(key, value, &cli.config).await?;
            }
        },
    }

    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
// Commands
// ═══════════════════════════════════════════════════════════════════════════

/// Write the file list for a transfer and append it to the yearly log
async fn log_transfer(args: LogArgs, config: &Config) -> anyhow::Result<()> {
    let details = validate_transfer(&args, config)?;
    let files = expand_inputs(&args.files)?;

    let now = Local::now().naive_local();
    let transfer_date = match &args.transfer_date {
        Some(date) => NaiveDate::parse_from_str(date.trim(), TRANSFER_DATE_FORMAT)
            .map_err(|_| anyhow::anyhow!("Invalid transfer date {date:?}, expected MM/DD/YYYY"))?,
        None => now.date(),
    };

    let values = TokenValues {
        username: args.username.clone().unwrap_or_else(current_username),
        computername: args.computer_name.clone().unwrap_or_else(current_computer_name),
        transfertype: details.transfer_type.clone(),
        source: details.source.clone(),
        destination: details.destination.clone(),
        mediatype: details.media_type.clone(),
        mediaid: details.media_id.clone(),
        local_network: config.ui.local_network.clone(),
    };
    let naming = Naming::new(
        now,
        &config.logging.date_format,
        &config.logging.time_format,
        &values,
    );

    let year_dir = config.logging.output_folder.join(now.year().to_string());
    std::fs::create_dir_all(&year_dir)?;
    let list_path = naming.unique_path(&year_dir, &config.logging.file_list_name);

    println!(
        "Logging {} transfer {} -> {} ({} {})",
        style(&details.transfer_type).bold(),
        details.source,
        details.destination,
        details.media_type,
        details.media_id
    );
    println!("Files: {}", files.len());

    let job = FileListJob::new(files, list_path, config, !args.no_hash && config.hashing.enabled)?;
    let outcome = run_with_progress(move |cancel, events| job.run(cancel, events)).await?;

    let FileListOutcome::Written { path, summary } = outcome else {
        println!("{}", style("Transfer canceled, nothing was logged").yellow());
        return Ok(());
    };

    let record = TransferRecord {
        timestamp: now,
        transfer_date,
        username: values.username.clone(),
        computer_name: values.computername.clone(),
        media_type: details.media_type,
        media_id: details.media_id,
        transfer_type: details.transfer_type,
        source: details.source,
        destination: details.destination,
        file_count: summary.files_processed,
        total_size: summary.total_size,
        file_log: path.clone(),
    };
    let log_path = config
        .logging
        .output_folder
        .join(naming.render(&config.logging.transfer_log_name, 1));
    append_record(&log_path, &record)?;
    tracing::info!("Transfer logged to {}", log_path.display());

    print_summary(&path, &summary);
    println!("  Transfer log: {}", log_path.display());

    Ok(())
}

/// Write a top-level-only request list and append it to the request log
async fn record_request(args: RequestArgs, config: &Config) -> anyhow::Result<()> {
    let purpose = args.purpose.trim().to_string();
    if purpose.is_empty() {
        anyhow::bail!("Please enter a purpose for the request");
    }
    let files = expand_inputs(&args.files)?;

    let now = Local::now().naive_local();
    let values = TokenValues {
        username: args.requestor.clone().unwrap_or_else(current_username),
        computername: args.computer_name.clone().unwrap_or_else(current_computer_name),
        local_network: config.ui.local_network.clone(),
        ..TokenValues::default()
    };
    let naming = Naming::new(
        now,
        &config.logging.date_format,
        &config.logging.time_format,
        &values,
    );

    let requests = &config.requests;
    std::fs::create_dir_all(&requests.output_folder)?;
    let list_path = naming.unique_path(&requests.output_folder, &requests.file_list_name);

    println!("Recording request for {} files", files.len());

    let job = FileListJob::new(files, list_path, config, !args.no_hash && config.hashing.enabled)?
        .without_descent();
    let outcome = run_with_progress(move |cancel, events| job.run(cancel, events)).await?;

    let FileListOutcome::Written { path, summary } = outcome else {
        println!("{}", style("Request canceled, nothing was recorded").yellow());
        return Ok(());
    };

    if requests.enable_request_log {
        let record = RequestRecord {
            timestamp: now,
            request_date: now.date(),
            requestor: values.username.clone(),
            computer_name: values.computername.clone(),
            purpose,
            file_count: summary.files_processed,
            total_size: summary.total_size,
            file_log: path.clone(),
        };
        let log_path = requests
            .output_folder
            .join(naming.render(&requests.request_log_name, 1));
        append_record(&log_path, &record)?;
        println!("Request log: {}", log_path.display());
    }

    print_summary(&path, &summary);
    Ok(())
}

/// Write a file list to an explicit path
async fn list_files(files: Vec<String>, output: PathBuf, hash: bool, config: &Config) -> anyhow::Result<()> {
    let files = expand_inputs(&files)?;
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let job = FileListJob::new(files, output, config, hash)?;
    match run_with_progress(move |cancel, events| job.run(cancel, events)).await? {
        FileListOutcome::Written { path, summary } => print_summary(&path, &summary),
        FileListOutcome::Canceled => println!("{}", style("Canceled, file list removed").yellow()),
    }
    Ok(())
}

/// Print `digest  path` for every file
async fn hash_command(files: Vec<String>, algorithm: Option<String>, config: &Config) -> anyhow::Result<()> {
    let algorithm: HashAlgorithm = match algorithm {
        Some(name) => name.parse().map_err(|e| anyhow::anyhow!("{e}"))?,
        None => config.hashing.algorithm()?,
    };
    let files = expand_inputs(&files)?;
    let hasher = Hasher::new(algorithm);

    let (files, hashes) = run_with_progress(move |cancel, events| {
        report(events, ProgressEvent::Stage("Hashing"));
        let hashes = hash_files(
            &hasher,
            &files,
            |pct: u8| report(events, ProgressEvent::Percent(pct)),
            || cancel.load(Ordering::Relaxed),
        )
        .ok_or_else(|| anyhow::anyhow!("Hashing canceled"))?;
        Ok((files, hashes))
    })
    .await?;

    println!("{}", style(algorithm).dim());
    for file in &files {
        if let Some(digest) = hashes.get(file) {
            println!("{}  {}", digest, file.display());
        }
    }
    Ok(())
}

/// List, filter and page through a yearly log
fn review_logs(args: &ReviewArgs, config: &Config) -> anyhow::Result<()> {
    let (folder, template) = if args.requests {
        (&config.requests.output_folder, &config.requests.request_log_name)
    } else {
        (&config.logging.output_folder, &config.logging.transfer_log_name)
    };

    if args.years {
        let years = available_years(folder, template)?;
        if years.is_empty() {
            println!("No logs found in {}", folder.display());
        }
        for year in years {
            println!("{year}");
        }
        return Ok(());
    }

    let year = args.year.unwrap_or_else(|| Local::now().year());
    let paths = log_paths_for_year(folder, template, year)?;
    if paths.is_empty() {
        anyhow::bail!("No log file found for the year {year} in {}", folder.display());
    }

    let table = LogTable::load_all(&paths)?;
    let rows = table.filter(args.filter.as_deref().unwrap_or_default());

    if let Some(number) = args.show {
        return show_file_list(&table, &rows, number);
    }

    let page_size = args.page_size.max(1);
    let (page, shown, pages) = paginate(&rows, args.page, page_size);

    println!("{}", style(table.headers.join(" | ")).bold());
    for (index, row) in page.iter().enumerate() {
        let number = (shown - 1) * page_size + index + 1;
        println!("{:>4}  {}", style(number).dim(), row.join(" | "));
    }
    println!();
    println!(
        "Page {} of {} ({} of {} rows, newest first)",
        shown,
        pages,
        rows.len(),
        table.rows.len()
    );

    Ok(())
}

/// Print the file list behind row `number` of a review listing
fn show_file_list(table: &LogTable, rows: &[&[String]], number: usize) -> anyhow::Result<()> {
    let row = number
        .checked_sub(1)
        .and_then(|index| rows.get(index))
        .ok_or_else(|| anyhow::anyhow!("No row {number} (listing has {} rows)", rows.len()))?;
    let column = table
        .column("File Log")
        .ok_or_else(|| anyhow::anyhow!("Log has no File Log column"))?;
    let path = row
        .get(column)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| anyhow::anyhow!("Row {number} has no file list"))?;

    let file = std::fs::File::open(path)
        .map_err(|e| anyhow::anyhow!("Failed to open file list {path}: {e}"))?;
    let entries = read_ledger(file)?;

    println!("{}", style(path).bold());
    for entry in &entries {
        let indent = "  ".repeat(entry.level as usize);
        let size = match entry.size {
            EntrySize::Bytes(bytes) => format_bytes(bytes),
            EntrySize::Error => entry.size.to_string(),
        };
        if entry.hash.is_empty() {
            println!("{indent}{}  ({size})", entry.full_name);
        } else {
            println!("{indent}{}  ({size})  {}", entry.full_name, style(&entry.hash).dim());
        }
    }
    println!();
    println!("{} entries", entries.len());

    Ok(())
}

/// Show configuration
async fn config_show(key: Option<String>, config: &Config) -> anyhow::Result<()> {
    if let Some(key_name) = key {
        // Show specific key
        let key_lower = key_name.to_lowercase();

        match key_lower.as_str() {
            "ui.media_types" | "media_types" => println!("{}", config.ui.media_types.join(", ")),
            "ui.transfer_types" | "transfer_types" => {
                for (name, abbr) in &config.ui.transfer_types {
                    println!("{name}:{abbr}");
                }
            }
            "ui.network_list" | "network_list" => println!("{}", config.ui.network_list.join(", ")),
            "ui.local_network" | "local_network" => {
                if let Some(local) = &config.ui.local_network {
                    println!("{local}");
                } else {
                    println!("(not set)");
                }
            }
            "ui.media_ids" | "media_ids" => println!("{}", config.ui.media_ids.join(", ")),
            "logging.output_folder" => println!("{}", config.logging.output_folder.display()),
            "logging.transfer_log_name" | "transfer_log_name" => {
                println!("{}", config.logging.transfer_log_name);
            }
            "logging.file_list_name" => println!("{}", config.logging.file_list_name),
            "logging.date_format" | "date_format" => println!("{}", config.logging.date_format),
            "logging.time_format" | "time_format" => println!("{}", config.logging.time_format),
            "logging.level" | "level" => println!("{}", config.logging.level),
            "requests.output_folder" => println!("{}", config.requests.output_folder.display()),
            "requests.request_log_name" | "request_log_name" => {
                println!("{}", config.requests.request_log_name);
            }
            "requests.file_list_name" => println!("{}", config.requests.file_list_name),
            "requests.enable_request_log" | "enable_request_log" => {
                println!("{}", config.requests.enable_request_log);
            }
            "hashing.enabled" => println!("{}", config.hashing.enabled),
            "hashing.algorithm" | "algorithm" => println!("{}", config.hashing.algorithm),
            "hashing.hash_archive_entries" | "hash_archive_entries" => {
                println!("{}", config.hashing.hash_archive_entries);
            }
            "hashing.max_depth" | "max_depth" => match config.hashing.max_depth {
                Some(depth) => println!("{depth}"),
                None => println!("(unlimited)"),
            },
            _ => {
                anyhow::bail!("Unknown configuration key: {}", key_name);
            }
        }
    } else {
        // Show all configuration
        println!("DTA Configuration");
        println!();

        println!("[ui]");
        println!("  media_types = {:?}", config.ui.media_types);
        println!("  transfer_types = {:?}", config.ui.transfer_types);
        println!("  network_list = {:?}", config.ui.network_list);
        if let Some(local) = &config.ui.local_network {
            println!("  local_network = \"{}\"", local);
        }
        println!("  media_ids = {:?}", config.ui.media_ids);
        println!();

        println!("[logging]");
        println!("  output_folder = \"{}\"", config.logging.output_folder.display());
        println!("  transfer_log_name = \"{}\"", config.logging.transfer_log_name);
        println!("  file_list_name = \"{}\"", config.logging.file_list_name);
        println!("  date_format = \"{}\"", config.logging.date_format);
        println!("  time_format = \"{}\"", config.logging.time_format);
        println!("  level = \"{}\"", config.logging.level);
        println!();

        println!("[requests]");
        println!("  output_folder = \"{}\"", config.requests.output_folder.display());
        println!("  request_log_name = \"{}\"", config.requests.request_log_name);
        println!("  file_list_name = \"{}\"", config.requests.file_list_name);
        println!("  enable_request_log = {}", config.requests.enable_request_log);
        println!();

        println!("[hashing]");
        println!("  enabled = {}", config.hashing.enabled);
        println!("  algorithm = \"{}\"", config.hashing.algorithm);
        println!("  hash_archive_entries = {}", config.hashing.hash_archive_entries);
        if let Some(depth) = config.hashing.max_depth {
            println!("  max_depth = {}", depth);
        }
    }

    Ok(())
}

fn parse_bool(key: &str, value: &str) -> anyhow::Result<bool> {
    value
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid boolean value for {}: {}", key, value))
}

/// Set a configuration value
async fn config_set(key: String, value: String, config_path: &str) -> anyhow::Result<()> {
    let config_path_buf = expand_home(config_path);

    // Load current config
    let mut config = if config_path_buf.exists() {
        Config::load(&config_path_buf)?
    } else {
        Config::default()
    };

    // Set the value
    let key_lower = key.to_lowercase();
    match key_lower.as_str() {
        "ui.media_types" | "media_types" => config.ui.media_types = config::parse_list(&value),
        "ui.transfer_types" | "transfer_types" => {
            config.ui.transfer_types = config::parse_transfer_types(&value)?;
        }
        "ui.network_list" | "network_list" => config.ui.network_list = config::parse_list(&value),
        "ui.local_network" | "local_network" => {
            config.ui.local_network = (!value.trim().is_empty()).then(|| value.trim().to_string());
        }
        "ui.media_ids" | "media_ids" => config.ui.media_ids = config::parse_list(&value),
        "logging.output_folder" => config.logging.output_folder = PathBuf::from(&value),
        "logging.transfer_log_name" | "transfer_log_name" => {
            config.logging.transfer_log_name = value.clone();
        }
        "logging.file_list_name" => config.logging.file_list_name = value.clone(),
        "logging.date_format" | "date_format" => config.logging.date_format = value.clone(),
        "logging.time_format" | "time_format" => config.logging.time_format = value.clone(),
        "logging.level" | "level" => config.logging.level = value.clone(),
        "requests.output_folder" => config.requests.output_folder = PathBuf::from(&value),
        "requests.request_log_name" | "request_log_name" => {
            config.requests.request_log_name = value.clone();
        }
        "requests.file_list_name" => config.requests.file_list_name = value.clone(),
        "requests.enable_request_log" | "enable_request_log" => {
            config.requests.enable_request_log = parse_bool("enable_request_log", &value)?;
        }
        "hashing.enabled" => config.hashing.enabled = parse_bool("hashing.enabled", &value)?,
        "hashing.algorithm" | "algorithm" => config.hashing.algorithm = value.to_lowercase(),
        "hashing.hash_archive_entries" | "hash_archive_entries" => {
            config.hashing.hash_archive_entries = parse_bool("hash_archive_entries", &value)?;
        }
        "hashing.max_depth" | "max_depth" => {
            config.hashing.max_depth = match value.trim().to_lowercase().as_str() {
                "" | "none" | "unlimited" => None,
                depth => Some(
                    depth
                        .parse()
                        .map_err(|_| anyhow::anyhow!("Invalid number for max_depth: {}", value))?,
                ),
            };
        }
        _ => {
            anyhow::bail!("Unknown configuration key: {}", key);
        }
    }

    // Validate the new configuration
    config.validate()?;

    // Save the configuration
    config.save(&config_path_buf)?;

    println!("Configuration updated: {} = {}", key, value);
    println!("Saved to: {}", config_path_buf.display());

    Ok(())
}
