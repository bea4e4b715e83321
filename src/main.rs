//! Lists every URL the Wayback Machine knows about for a set of domains.

#![warn(
    clippy::all,
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_import_braces,
    unused_qualifications
)]

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use env_logger::Env;
use wayback_urls::{
    archive::{ArchiveClient, ArchivedUrl},
    config::{self, Config, DEFAULT_INDEX_URL, INDEX_URL_ENV_VAR},
    error::Error,
    fetch::Orchestrator,
    versions::resolve_versions,
};

static RFC3339_UTC_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Parser, Debug)]
#[clap(about = "Fetches all the URLs the Wayback Machine knows about for a domain.")]
struct CliArgs {
    /// Domain to fetch URLs for. Domains are read from stdin, one per line,
    /// when omitted.
    #[clap()]
    domain: Option<String>,
    /// Number of days back to fetch URLs for; 0 fetches all of them.
    #[clap(long, default_value_t = 0)]
    days: u32,
    /// Don't include subdomains of the target domain.
    #[clap(long)]
    no_subs: bool,
    /// Lists URLs for crawled versions of the input URL(s).
    #[clap(long)]
    get_versions: bool,
    /// Shows the snapshot date before each URL.
    #[clap(long)]
    dates: bool,
    /// Seconds to wait for a single archive query; 0 waits forever.
    #[clap(long, default_value_t = config::DEFAULT_TASK_TIMEOUT_SECS)]
    timeout: u64,
    #[clap(long, env = INDEX_URL_ENV_VAR, default_value = DEFAULT_INDEX_URL, hide = true)]
    index_url: String,
    /// Shows trace messages, including potentially sensitive HTTP data.
    #[clap(long)]
    trace: bool,
    /// Generates shell completions and exits.
    #[clap(long)]
    completions: Option<Shell>,
}

fn config_from_args(args: &CliArgs) -> Result<Config> {
    let base = Config::new(&args.index_url)
        .with_context(|| format!("invalid index url: {}", args.index_url))?;
    Ok(Config {
        exclude_subdomains: args.no_subs,
        days_back: args.days,
        show_dates: args.dates,
        task_timeout: config::task_timeout_from_secs(args.timeout),
        ..base
    })
}

/// Reads one entry per line, trimmed, skipping blank lines. A read error
/// is logged and ends the input; whatever was read before it is kept.
fn read_lines(input: impl BufRead) -> Vec<String> {
    let mut lines = Vec::new();
    for line in input.lines() {
        match line {
            Ok(line) => {
                let line = line.trim();
                if !line.is_empty() {
                    lines.push(line.to_owned());
                }
            }
            Err(e) => {
                log::error!("failed to read input: {}", e);
                break;
            }
        }
    }
    lines
}

fn format_record(record: &ArchivedUrl, show_dates: bool) -> String {
    if !show_dates {
        return record.url().to_owned();
    }
    match record.timestamp() {
        Some(time) => format!("{} {}", time.format(RFC3339_UTC_FORMAT), record.url()),
        None => format!("{} {}", record.date(), record.url()),
    }
}

fn is_broken_pipe(e: &Error) -> bool {
    matches!(e, Error::Io(e) if e.kind() == io::ErrorKind::BrokenPipe)
}

async fn run_fetch(
    config: &Config,
    client: &ArchiveClient,
    domains: &[String],
    out: &mut impl Write,
) -> Result<()> {
    let orchestrator = Orchestrator::from_config(config, client);
    for domain in domains {
        let res = orchestrator
            .fetch_domain(domain, |record| {
                writeln!(out, "{}", format_record(record, config.show_dates))
            })
            .await;
        let summary = match res {
            Ok(summary) => summary,
            Err(e) if is_broken_pipe(&e) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        for failure in &summary.failures {
            log::warn!(
                "{} query for {} failed: {}",
                failure.strategy,
                domain,
                failure.error
            );
        }
        log::info!(
            "{}: {} urls ({} duplicates dropped)",
            domain,
            summary.emitted,
            summary.duplicates
        );
    }
    out.flush()?;
    Ok(())
}

async fn run_versions(client: &ArchiveClient, urls: &[String], out: &mut impl Write) -> Result<()> {
    for url in urls {
        let versions = match resolve_versions(client, url).await {
            Ok(versions) => versions,
            Err(e) => {
                log::debug!("skipping versions of {}: {}", url, e);
                continue;
            }
        };
        for version in versions {
            if let Err(e) = writeln!(out, "{}", version) {
                if e.kind() == io::ErrorKind::BrokenPipe {
                    return Ok(());
                }
                return Err(e.into());
            }
        }
    }
    out.flush()?;
    Ok(())
}

fn run_completions(shell: Shell, buf: &mut impl Write) {
    clap_complete::generate(shell, &mut CliArgs::command(), "wayback_urls", buf);
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    if let Some(shell) = args.completions {
        run_completions(shell, &mut io::stdout());
        return Ok(());
    }

    // Keep stdout clean: only problems are reported unless asked for more.
    let default_log_level = if args.trace { "trace" } else { "warn" };
    let mut log_builder =
        env_logger::Builder::from_env(Env::default().default_filter_or(default_log_level));
    if args.trace {
        log_builder.filter_module("reqwest", log::LevelFilter::Trace);
    }
    log_builder.init();

    let config = config_from_args(&args)?;
    let http_client = reqwest::ClientBuilder::new()
        .user_agent(concat!("wayback_urls/", env!("CARGO_PKG_VERSION")))
        .connection_verbose(args.trace)
        .build()?;
    let client = ArchiveClient::new(config.index_url.clone(), http_client);

    let inputs = match &args.domain {
        Some(domain) => vec![domain.clone()],
        None => read_lines(io::stdin().lock()),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.get_versions {
        run_versions(&client, &inputs, &mut out).await?;
    } else {
        run_fetch(&config, &client, &inputs, &mut out).await?;
    }

    Ok(())
}
