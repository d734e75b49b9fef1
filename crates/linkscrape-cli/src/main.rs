use anyhow::{Context, Result};
use clap::builder::NonEmptyStringValueParser;
use clap::Parser;
use linkscrape_acquire::fetch::DEFAULT_BASE_URL;
use linkscrape_acquire::{output, FetchConfig};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "linkscrape")]
#[command(about = "Extract the profile and links from a link-aggregation profile page")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_HASH"), ")"))]
struct Cli {
    /// Profile handle to fetch (e.g., "testuser")
    #[arg(short, long, required_unless_present = "input", value_parser = NonEmptyStringValueParser::new())]
    username: Option<String>,

    /// JSON file holding a flat object of request headers
    #[arg(long, alias = "headersFile", value_name = "PATH")]
    headers_file: Option<PathBuf>,

    /// Extra request header, repeatable; wins over the headers file
    #[arg(short = 'H', long = "header", value_name = "NAME:VALUE", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Write the record here instead of stdout
    #[arg(short, long, value_name = "PATH")]
    outfile: Option<PathBuf>,

    /// Pretty-print the JSON record
    #[arg(long)]
    pretty: bool,

    /// Extract from a saved HTML page instead of fetching
    #[arg(long, value_name = "PATH", conflicts_with_all = ["username", "save_html"])]
    input: Option<PathBuf>,

    /// Also save the fetched HTML to this path
    #[arg(long, value_name = "PATH")]
    save_html: Option<PathBuf>,

    /// Base URL the username is appended to
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Request deadline in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// User-Agent header sent with the request
    #[arg(long)]
    user_agent: Option<String>,

    /// Log level: error, warn, info, debug, trace
    #[arg(long, default_value = "warn", value_enum)]
    log_level: LogLevel,

    /// Use UTC timestamps instead of local time
    #[arg(long)]
    utc: bool,
}

#[derive(Clone, clap::ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.utc);

    match run(cli, std::io::stdout()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn init_tracing(log_level: &LogLevel, utc: bool) {
    // Keep HTML-parsing crates quiet at debug/trace
    let level = match log_level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug,selectors=warn,html5ever=warn",
        LogLevel::Trace => "trace,selectors=warn,html5ever=warn",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // Timestamp format: 2026-02-14 19:44:09.123 -08:00
    let time_format = "%Y-%m-%d %H:%M:%S%.3f %:z".to_string();

    // stdout carries the record only
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    if utc {
        builder
            .with_timer(tracing_subscriber::fmt::time::ChronoUtc::new(time_format))
            .init();
    } else {
        builder
            .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(time_format))
            .init();
    }
}

/// Acquire the record and write it to the outfile, or to `stdout` when none is given.
async fn run<W: Write>(cli: Cli, stdout: W) -> Result<()> {
    let extraction = match (&cli.input, &cli.username) {
        (Some(input), _) => {
            tracing::info!(input = %input.display(), "Extracting from saved page");
            linkscrape_acquire::extract_file(input)?
        }
        (None, Some(username)) => {
            let headers = load_headers(cli.headers_file.as_deref(), &cli.headers)?;
            let config = FetchConfig {
                base_url: cli.base_url.clone(),
                timeout: Duration::from_secs(cli.timeout),
                user_agent: cli
                    .user_agent
                    .clone()
                    .unwrap_or_else(|| FetchConfig::default().user_agent),
            };

            tracing::info!(username = %username, "Acquiring profile");
            linkscrape_acquire::acquire(
                username,
                headers.as_ref(),
                &config,
                cli.save_html.as_deref(),
            )
            .await?
        }
        (None, None) => anyhow::bail!("a username is required unless --input is given"),
    };

    for warning in &extraction.warnings {
        tracing::warn!("{warning}");
    }
    tracing::debug!(titles = ?extraction.record.link_titles(), "Links");

    match &cli.outfile {
        Some(path) => output::write_record_file(&extraction.record, path, cli.pretty)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => output::write_record(&extraction.record, stdout, cli.pretty)
            .context("Failed to write record to stdout")?,
    }

    Ok(())
}

/// Parse `NAME:VALUE`, trimming whitespace around both parts.
fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected NAME:VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in '{raw}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Merge the headers file with `-H` flags. `None` when no headers were given.
fn load_headers(
    file: Option<&Path>,
    extra: &[(String, String)],
) -> Result<Option<BTreeMap<String, String>>> {
    let mut headers = match file {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read headers file {}", path.display()))?;
            parse_headers_json(&contents)
                .with_context(|| format!("Invalid headers file {}", path.display()))?
        }
        None => BTreeMap::new(),
    };

    for (name, value) in extra {
        headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
        headers.insert(name.clone(), value.clone());
    }

    Ok((!headers.is_empty()).then_some(headers))
}

/// Headers must be a flat JSON object of strings; nested values are rejected.
fn parse_headers_json(contents: &str) -> Result<BTreeMap<String, String>> {
    serde_json::from_str(contents).context("expected a JSON object of string values")
}

/// Exit status for a failed run: the library's per-kind code, else 1.
fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<linkscrape_acquire::Error>())
        .map_or(1, linkscrape_acquire::Error::exit_code)
}
