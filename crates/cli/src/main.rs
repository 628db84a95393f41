use anatomist::{
    default_exclusions, scan_batch, set_label_enabled, BatchFile, ExclusionSet, RuleSet,
};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use common::RecordKind;
use reaper::Quarantine;
use secrecy::SecretString;
use sentinel::{project_entry, ScanService, Settings};
use serde::Serialize;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use vault::{JsonFileStore, Ledger};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "vigil")]
#[command(about = "Threat verdicts for files, projects and URLs", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// VirusTotal API key. Required by `serve`, `scan` and `monitor`.
    #[arg(long, env = "VT_API_KEY", hide_env_values = true, global = true)]
    vt_api_key: Option<String>,
    #[arg(long, env = "VT_BASE_URL", default_value = oracle::DEFAULT_BASE_URL, global = true)]
    vt_base_url: String,
    /// Holds ledger.json, uploads/ and quarantine/.
    #[arg(long, env = "VIGIL_DATA_DIR", default_value = "data", global = true)]
    data_dir: PathBuf,
    #[arg(long, env = "VIGIL_POLL_INTERVAL_SECS", default_value_t = 2, global = true)]
    poll_interval_secs: u64,
    #[arg(long, env = "VIGIL_POLL_MAX_ATTEMPTS", default_value_t = 20, global = true)]
    poll_max_attempts: u32,
    #[arg(long, env = "VIGIL_HTTP_TIMEOUT_SECS", default_value_t = 30, global = true)]
    http_timeout_secs: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API.
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: IpAddr,
        #[arg(long, env = "PORT", default_value_t = sentinel::settings::DEFAULT_PORT)]
        port: u16,
    },
    /// Look up (or submit) one local file and wait for its verdict.
    Scan {
        file: PathBuf,
    },
    /// Secret-scan every file under a directory. No oracle calls.
    Project {
        dir: PathBuf,
        /// Disable an exclusion label (node_modules, git, venv, dist). Repeatable.
        #[arg(long = "include")]
        include: Vec<String>,
        /// Ledger target name. Defaults to the directory name.
        #[arg(long)]
        name: Option<String>,
    },
    /// Audit a URL's security headers and submit it for reputation analysis.
    Monitor {
        url: String,
    },
    /// Show (or prune) the scan history.
    History {
        #[arg(long)]
        limit: Option<usize>,
        /// Remove one history entry by id.
        #[arg(long)]
        delete: Option<Uuid>,
    },
    /// Quarantine management.
    Quarantine {
        #[command(subcommand)]
        cmd: QuarantineCmd,
    },
}

#[derive(Subcommand)]
enum QuarantineCmd {
    List,
    /// Move a file into quarantine.
    Move {
        path: PathBuf,
        #[arg(long, default_value = "Manual quarantine")]
        reason: String,
    },
    /// Permanently delete a quarantined artifact and its record.
    Delete {
        id: Uuid,
    },
    /// Move a quarantined artifact back to where it came from.
    Restore {
        id: Uuid,
    },
}

impl GlobalArgs {
    fn settings(&self) -> Settings {
        Settings {
            vt_api_key: self.vt_api_key.clone().map(SecretString::from),
            vt_base_url: self.vt_base_url.clone(),
            data_dir: self.data_dir.clone(),
            poll: oracle::PollConfig {
                interval: Duration::from_secs(self.poll_interval_secs),
                max_attempts: self.poll_max_attempts,
            },
            http_timeout: Duration::from_secs(self.http_timeout_secs),
            ..Settings::default()
        }
    }
}

/// Every workspace crate that emits events, at `info`.
const DEFAULT_LOG_FILTER: &str = "vigil=info,sentinel=info,oracle=info,reaper=info,\
watchtower=info,vault=info,anatomist=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("warning: .env: {}", e);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = cli.global.settings();

    match &cli.command {
        Commands::Serve { host, port } => {
            settings.port = *port;
            cmd_serve(&settings, *host).await?
        }
        Commands::Scan { file } => cmd_scan(&settings, file).await?,
        Commands::Project { dir, include, name } => {
            cmd_project(&settings, dir, include, name.as_deref())?
        }
        Commands::Monitor { url } => cmd_monitor(&settings, url).await?,
        Commands::History { limit, delete } => cmd_history(&settings, *limit, *delete)?,
        Commands::Quarantine { cmd } => match cmd {
            QuarantineCmd::List => cmd_quarantine_list(&settings)?,
            QuarantineCmd::Move { path, reason } => cmd_quarantine_move(&settings, path, reason)?,
            QuarantineCmd::Delete { id } => cmd_quarantine_delete(&settings, *id)?,
            QuarantineCmd::Restore { id } => cmd_quarantine_restore(&settings, *id)?,
        },
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// wiring
// ---------------------------------------------------------------------------

fn open_service(settings: &Settings) -> anyhow::Result<ScanService> {
    let client = settings
        .virustotal()
        .context("VT_API_KEY is required for this command")?;
    ScanService::open(settings, Arc::new(client)).context("cannot open the data directory")
}

fn open_ledger(settings: &Settings) -> anyhow::Result<Arc<Ledger>> {
    let path = settings.ledger_path();
    let store = JsonFileStore::open(&path)
        .with_context(|| format!("cannot open ledger {}", path.display()))?;
    Ok(Arc::new(Ledger::new(Arc::new(store))))
}

fn open_quarantine(settings: &Settings) -> anyhow::Result<Quarantine> {
    let ledger = open_ledger(settings)?;
    Quarantine::new(settings.quarantine_dir(), ledger).context("cannot open quarantine directory")
}

/// Wire name of a serde enum variant (`FILE_SCAN`, `THREAT`, ...).
fn label<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_owned))
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// serve
// ---------------------------------------------------------------------------

async fn cmd_serve(settings: &Settings, host: IpAddr) -> anyhow::Result<()> {
    let service = Arc::new(open_service(settings)?);
    let addr = SocketAddr::new(host, settings.port);
    sentinel::api::serve(service, addr)
        .await
        .with_context(|| format!("server on {addr} failed"))
}

// ---------------------------------------------------------------------------
// scan
// ---------------------------------------------------------------------------

async fn cmd_scan(settings: &Settings, file: &Path) -> anyhow::Result<()> {
    let service = open_service(settings)?;
    let outcome = service
        .scan_file(file)
        .await
        .with_context(|| format!("scan of {} failed", file.display()))?;
    let stats = outcome.verdict.stats;

    println!("+------------------------------------------+");
    println!("| VIGIL FILE SCAN                          |");
    println!("+------------------------------------------+");
    println!(
        "| Verdict        : {:>22} |",
        label(&outcome.verdict.classification())
    );
    println!("| Malicious      : {:>22} |", stats.malicious);
    println!("| Suspicious     : {:>22} |", stats.suspicious);
    println!("| Harmless       : {:>22} |", stats.harmless);
    println!("| Undetected     : {:>22} |", stats.undetected);
    println!(
        "| Source         : {:>22} |",
        if outcome.polled { "new analysis" } else { "known" }
    );
    println!("+------------------------------------------+");
    println!("sha256: {}", outcome.fingerprint);

    let flagged: Vec<_> = outcome.verdict.flagging_engines().collect();
    if !flagged.is_empty() {
        println!("\nFLAGGED BY:");
        for engine in flagged {
            println!(
                "  {:<24} {:<11} {}",
                engine.engine_name,
                engine.category,
                engine.result.as_deref().unwrap_or("-")
            );
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// project
// ---------------------------------------------------------------------------

/// Every regular file under `root`, keyed by its slash-separated relative path.
fn collect_project_files(root: &Path) -> Vec<BatchFile> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                eprintln!("warning: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        files.push(BatchFile::external(rel, entry.path()));
    }
    files
}

fn project_name(dir: &Path, name: Option<&str>) -> String {
    name.map(str::to_owned)
        .filter(|n| !n.trim().is_empty())
        .or_else(|| {
            let dir = dunce::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
            dir.file_name().map(|n| n.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "project".to_string())
}

fn cmd_project(
    settings: &Settings,
    dir: &Path,
    include: &[String],
    name: Option<&str>,
) -> anyhow::Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("{} is not a directory", dir.display());
    }

    let mut rules = default_exclusions();
    for l in include {
        if set_label_enabled(&mut rules, l.trim(), false) == 0 {
            eprintln!("warning: unknown exclusion label `{}`", l);
        }
    }
    let exclusions = ExclusionSet::new(&rules).context("cannot build exclusion rules")?;

    let files = collect_project_files(dir);
    let report = scan_batch(&files, RuleSet::default_rules(), &exclusions);
    let summary = report.summary;

    let project = project_name(dir, name);
    let ledger = open_ledger(settings)?;
    let entry = ledger
        .append_history(project_entry(&project, &summary))
        .context("cannot record project scan")?;

    println!("+------------------------------------------+");
    println!("| VIGIL PROJECT SCAN                       |");
    println!("+------------------------------------------+");
    println!("| Files scanned  : {:>22} |", summary.files_scanned);
    println!("| Secrets found  : {:>22} |", summary.secrets_found);
    println!("| Excluded       : {:>22} |", summary.files_excluded);
    println!("| Unreadable     : {:>22} |", summary.files_skipped);
    println!("| Status         : {:>22} |", label(&entry.status));
    println!("+------------------------------------------+");

    if report.findings.is_empty() {
        println!("No secrets detected.");
    } else {
        println!("\nFINDINGS:");
        for file in &report.findings {
            println!("  {}  ({})", file.path, file.details);
            for issue in &file.issues {
                println!("    L{:<5} {:<28} {}", issue.line, issue.rule, issue.content.trim());
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// monitor
// ---------------------------------------------------------------------------

async fn cmd_monitor(settings: &Settings, url: &str) -> anyhow::Result<()> {
    let service = open_service(settings)?;
    let report = service
        .monitor_url(url)
        .await
        .with_context(|| format!("monitoring {url} failed"))?;

    println!("+------------------------------------------+");
    println!("| VIGIL URL MONITOR                        |");
    println!("+------------------------------------------+");
    println!("| HTTP status    : {:>22} |", report.status);
    println!("| Issues         : {:>22} |", report.security_issues.len());
    println!("+------------------------------------------+");
    println!("url: {}", report.url);

    if report.security_issues.is_empty() {
        println!("No security issues found.");
    } else {
        println!("\nSECURITY ISSUES:");
        for issue in &report.security_issues {
            println!("  - {}", issue);
        }
    }
    match &report.reputation {
        Some(rep) => println!("\nreputation analysis: {}", rep.analysis_id),
        None => eprintln!("warning: URL reputation submission unavailable"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// history
// ---------------------------------------------------------------------------

fn cmd_history(
    settings: &Settings,
    limit: Option<usize>,
    delete: Option<Uuid>,
) -> anyhow::Result<()> {
    let ledger = open_ledger(settings)?;

    if let Some(id) = delete {
        ledger
            .remove(id, RecordKind::HistoryLog)
            .with_context(|| format!("cannot delete history entry {id}"))?;
        println!("Deleted history entry {}", id);
        return Ok(());
    }

    let entries = ledger.history().context("cannot read history")?;
    if entries.is_empty() {
        println!("History is empty.");
        return Ok(());
    }
    for entry in entries.iter().take(limit.unwrap_or(usize::MAX)) {
        println!(
            "{}  {}  {:<12} {:<8} {}",
            entry.id,
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            label(&entry.kind),
            label(&entry.status),
            entry.target
        );
        println!("    {}", entry.details);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// quarantine
// ---------------------------------------------------------------------------

fn cmd_quarantine_list(settings: &Settings) -> anyhow::Result<()> {
    let quarantine = open_quarantine(settings)?;
    let entries = quarantine.list().context("cannot read quarantine")?;
    if entries.is_empty() {
        println!("Quarantine is empty.");
        return Ok(());
    }
    for entry in &entries {
        println!(
            "{}  {}  {}",
            entry.id,
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.file_name
        );
        println!("    from:   {}", entry.original_path);
        println!("    reason: {}", entry.reason);
    }
    Ok(())
}

fn cmd_quarantine_move(settings: &Settings, path: &Path, reason: &str) -> anyhow::Result<()> {
    let quarantine = open_quarantine(settings)?;
    let entry = quarantine
        .isolate(path, reason)
        .with_context(|| format!("cannot quarantine {}", path.display()))?;
    println!("Quarantined {} as {}", entry.original_path, entry.id);
    Ok(())
}

fn cmd_quarantine_delete(settings: &Settings, id: Uuid) -> anyhow::Result<()> {
    let quarantine = open_quarantine(settings)?;
    quarantine
        .delete(id)
        .with_context(|| format!("cannot delete quarantine entry {id}"))?;
    println!("Deleted quarantined artifact {}", id);
    Ok(())
}

fn cmd_quarantine_restore(settings: &Settings, id: Uuid) -> anyhow::Result<()> {
    let quarantine = open_quarantine(settings)?;
    let entry = quarantine
        .restore(id)
        .with_context(|| format!("cannot restore quarantine entry {id}"))?;
    println!("Restored {}", entry.original_path);
    Ok(())
}
