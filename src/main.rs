//! CLI entry point for `mailscanner`.

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use mailscanner::config::Config;
use mailscanner::dataset;
use mailscanner::model::record::Partition;
use mailscanner::source::ImapSource;
use mailscanner::store::MailStore;
use mailscanner::sync::{self, Pass, SyncProgress, SyncReport};

#[derive(Parser)]
#[command(name = "mailscanner", version, about = "Tools for machine learning on your email")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Download all and sent mail into a database, resuming where the last run stopped
    Download {
        /// SQLite database file (created if missing)
        database: PathBuf,
        /// IMAP login; prompted for if not given
        #[arg(short, long, env = "GMAIL_ADDRESS")]
        username: Option<String>,
        /// IMAP password or app password; prompted for (without echo) if not given
        #[arg(long, env = "GMAIL_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Write the replied / did-not-reply dataset as tab-separated text
    PrepareDataset {
        /// SQLite database filled by `download`
        database: PathBuf,
        /// Output text file, one `label<TAB>text` sample per line
        output: PathBuf,
    },
    /// Show per-partition counts of a mail database
    Stats {
        database: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Show class balance of a labeled text dataset
    Inspect {
        dataset: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = mailscanner::config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Download {
            database,
            username,
            password,
        } => cmd_download(&database, username, password, &config),
        Commands::PrepareDataset { database, output } => {
            cmd_prepare_dataset(&database, &output, &config)
        }
        Commands::Stats { database, json } => cmd_stats(&database, json),
        Commands::Inspect { dataset, json } => cmd_inspect(&dataset, json),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = mailscanner::config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mailscanner.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

fn open_store(database: &Path, config: &Config) -> anyhow::Result<MailStore> {
    Ok(MailStore::open(database)?
        .with_batch_size(config.sync.batch_size)
        .with_page_size(config.sync.page_size))
}

fn progress_style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .expect("valid template")
        .progress_chars("#>-")
}

/// Download both partitions with one progress bar per pass.
fn cmd_download(
    database: &Path,
    username: Option<String>,
    password: Option<String>,
    config: &Config,
) -> anyhow::Result<()> {
    let username = match username.or_else(|| config.imap.username.clone()) {
        Some(u) => u,
        None => prompt("IMAP address: ")?,
    };
    let password = match password {
        Some(p) => p,
        None => rpassword::prompt_password(format!("Password for {username}: "))?,
    };

    let store = open_store(database, config)?;
    let mut source = ImapSource::connect(config.imap.profile(), &username, &password)?;

    let pb = ProgressBar::new(0);
    let current_pass = std::cell::Cell::new(None::<(Partition, Pass)>);
    let on_progress = |p: &SyncProgress| {
        if current_pass.get() != Some((p.partition, p.pass)) {
            current_pass.set(Some((p.partition, p.pass)));
            let unit = match p.pass {
                Pass::Discovery => "ids",
                Pass::Fetch => "emails",
            };
            pb.reset();
            pb.set_style(progress_style(&format!(
                "{{spinner:.green}} {}/{} [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {unit} ({{per_sec}}, {{eta}})",
                p.partition.table(),
                p.pass.as_str(),
            )));
        }
        pb.set_length(p.total);
        pb.set_position(p.current);
    };

    let start = Instant::now();
    let report = sync::sync_all(&mut source, &store, Some(&on_progress))?;
    pb.finish_and_clear();
    source.logout()?;

    print_sync_report(&report, start.elapsed());
    Ok(())
}

/// Read one line from stdin after printing a prompt.
fn prompt(label: &str) -> anyhow::Result<String> {
    eprint!("{label}");
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let line = line.trim().to_string();
    if line.is_empty() {
        anyhow::bail!("An IMAP address is required");
    }
    Ok(line)
}

/// Build the replies dataset and write it out.
fn cmd_prepare_dataset(database: &Path, output: &Path, config: &Config) -> anyhow::Result<()> {
    if !database.exists() {
        anyhow::bail!("Database not found: {}", database.display());
    }
    let store = open_store(database, config)?;

    let pending: u64 = Partition::ALL
        .iter()
        .map(|&p| store.pending_count(p))
        .sum::<Result<u64, _>>()?;
    if pending > 0 {
        tracing::warn!(pending, "Some messages have no body yet; run `download` again to include them");
    }

    let pb = ProgressBar::new(0);
    pb.set_style(progress_style(
        "{spinner:.green} Labeling [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
    ));

    let samples = dataset::build_dataset(
        &store,
        Some(&|current, total| {
            pb.set_length(total);
            pb.set_position(current);
        }),
    )?;
    pb.finish_and_clear();

    dataset::write_dataset_file(output, &samples)?;

    let file = dataset::LabeledTextFile::from_samples(samples);
    println!();
    println!("  {:<20} {}", "Samples", file.len());
    for (label, count) in file.class_counts() {
        println!("  {:<20} {}", label, count);
    }
    println!("  {:<20} {}", "Output", output.display());
    println!();
    Ok(())
}

/// Show statistics for a mail database.
fn cmd_stats(database: &Path, json: bool) -> anyhow::Result<()> {
    use humansize::{format_size, BINARY};

    if !database.exists() {
        anyhow::bail!("Database not found: {}", database.display());
    }
    let store = MailStore::open(database)?;
    let stats = store.stats()?;

    if json {
        let output = serde_json::json!({
            "database": database.to_string_lossy(),
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!("  {:<20} {}", "Database", database.display());
    println!(
        "  {:<20} {}",
        "File size",
        format_size(stats.file_size, BINARY)
    );
    println!();
    println!(
        "  {:<12} {:>10} {:>10} {:>10} {:>10}",
        "Partition", "Total", "Fetched", "Pending", "Empty"
    );
    println!("  {}", "-".repeat(56));
    for partition in Partition::ALL {
        let counts = stats.partition(partition);
        println!(
            "  {:<12} {:>10} {:>10} {:>10} {:>10}",
            partition.table(),
            counts.total,
            counts.fetched(),
            counts.pending,
            counts.empty
        );
    }
    println!();
    Ok(())
}

/// Show the label balance of a dataset file.
fn cmd_inspect(path: &Path, json: bool) -> anyhow::Result<()> {
    let file = dataset::LabeledTextFile::open(path)?;
    let counts = file.class_counts();

    if json {
        let classes: serde_json::Map<String, serde_json::Value> = counts
            .iter()
            .map(|(label, count)| (label.to_string(), serde_json::json!(count)))
            .collect();
        let output = serde_json::json!({
            "file": path.to_string_lossy(),
            "samples": file.len(),
            "classes": classes,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!("  {:<20} {}", "File", path.display());
    println!("  {:<20} {}", "Samples", file.len());
    for (label, count) in &counts {
        let share = if file.is_empty() {
            0.0
        } else {
            *count as f64 / file.len() as f64 * 100.0
        };
        println!("  {:<20} {} ({:.1}%)", label, count, share);
    }
    println!();
    Ok(())
}

/// Print what a download run did.
fn print_sync_report(report: &SyncReport, elapsed: std::time::Duration) {
    println!();
    println!(
        "  {:<12} {:>10} {:>10} {:>10} {:>12}",
        "Partition", "Listed", "New", "Fetched", "Undecodable"
    );
    println!("  {}", "-".repeat(58));
    for partition in Partition::ALL {
        let r = report.partition(partition);
        println!(
            "  {:<12} {:>10} {:>10} {:>10} {:>12}",
            partition.table(),
            r.listed,
            r.discovered,
            r.fetched,
            r.substituted
        );
    }
    println!();
    println!("  {:<20} {:.2?}", "Elapsed", elapsed);
    println!();
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailscanner", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}
