use anyhow::{Context, Result};
use book_harvester::config::{
    find_config_file, load_config, validate_request, Config, ConfigError, LogFormat,
    LoggingConfig,
};
use book_harvester::models::{Sort, Target};
use book_harvester::sources::{KakaoBookSource, PageFetcher, PaginationDriver, Termination};
use book_harvester::ui::{self, PageProgressBar, Status};
use book_harvester::utils::{dedupe, export, sanitize_query, HttpClient, LogProgress};
use clap::{CommandFactory, Parser, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Book Harvester - Collect every page of a Kakao book search into JSON and CSV
#[derive(Parser, Debug)]
#[command(name = "book-harvester")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Collect every page of a Kakao book search, deduplicated by ISBN, into JSON and CSV", long_about = None)]
#[command(after_help = "The REST API key is read from KAKAO_REST_API_KEY.")]
struct Cli {
    /// Search text
    #[arg(long, required_unless_present_any = ["completions", "print_config"])]
    query: Option<String>,

    /// Field to match the query against [default: title]
    #[arg(long, value_enum)]
    target: Option<TargetArg>,

    /// Result ordering [default: accuracy]
    #[arg(long, value_enum)]
    sort: Option<SortArg>,

    /// Records per page, 1-50 [default: 50]
    #[arg(long)]
    size: Option<u8>,

    /// Maximum number of pages to fetch [default: 20]
    #[arg(long)]
    max_pages: Option<u32>,

    /// Output directory [default: ./out]
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Delay between page requests in milliseconds [default: 200]
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Per-request timeout in seconds [default: 10]
    #[arg(long)]
    timeout: Option<u64>,

    /// Write the records collected so far when a page fails
    #[arg(long)]
    keep_partial: bool,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging (-v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, conflicts_with = "verbose")]
    quiet: bool,

    /// Log output format [default: pretty]
    #[arg(long, value_enum)]
    log_format: Option<LogFormatArg>,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Print shell completions and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<Shell>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum TargetArg {
    Title,
    Isbn,
    Publisher,
    Person,
}

impl From<TargetArg> for Target {
    fn from(arg: TargetArg) -> Self {
        match arg {
            TargetArg::Title => Target::Title,
            TargetArg::Isbn => Target::Isbn,
            TargetArg::Publisher => Target::Publisher,
            TargetArg::Person => Target::Person,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SortArg {
    Accuracy,
    Latest,
}

impl From<SortArg> for Sort {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Accuracy => Sort::Accuracy,
            SortArg::Latest => Sort::Latest,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

impl Cli {
    /// Layer command-line flags over the loaded configuration
    fn apply(&self, config: &mut Config) {
        if let Some(target) = self.target {
            config.search.target = target.into();
        }
        if let Some(sort) = self.sort {
            config.search.sort = sort.into();
        }
        if let Some(size) = self.size {
            config.search.size = size;
        }
        if let Some(max_pages) = self.max_pages {
            config.search.max_pages = max_pages;
        }
        if let Some(out_dir) = &self.out_dir {
            config.output.out_dir = out_dir.clone();
        }
        if let Some(delay_ms) = self.delay_ms {
            config.http.page_delay_ms = delay_ms;
        }
        if let Some(timeout) = self.timeout {
            config.http.timeout_secs = timeout;
        }
        if self.keep_partial {
            config.output.keep_partial = true;
        }
        if let Some(format) = self.log_format {
            config.logging.format = format.into();
        }
    }

    fn log_level<'a>(&self, logging: &'a LoggingConfig) -> &'a str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => &logging.level,
            1 => "debug",
            _ => "trace",
        }
    }
}

fn init_tracing(cli: &Cli, logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| format!("book_harvester={}", cli.log_level(logging))),
    );
    let registry = tracing_subscriber::registry().with(filter);

    match logging.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn load(cli: &Cli) -> Result<Config, ConfigError> {
    let path = cli.config.clone().or_else(find_config_file);
    let mut config = load_config(path.as_deref())?;
    cli.apply(&mut config);
    Ok(config)
}

async fn run(cli: Cli, config: Config) -> Result<ExitCode> {
    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(ExitCode::SUCCESS);
    }

    config.validate()?;
    let query = cli.query.clone().ok_or(ConfigError::Invalid {
        field: "query",
        message: "is required".to_string(),
    })?;
    let request = config.search_request(query);
    validate_request(&request)?;
    let api_key = config.api_key()?;

    let client = HttpClient::from_config(&config.http).context("failed to build HTTP client")?;
    let source = KakaoBookSource::new(client, api_key)
        .with_endpoint(config.api.endpoint.clone())
        .with_auth_scheme(config.api.auth_scheme.clone());
    let driver = PaginationDriver::new(PageFetcher::new(source, config.retry.to_retry_config()))
        .page_delay(config.http.page_delay());

    let show_progress = !cli.no_progress && !cli.quiet && ui::is_terminal();
    let mut harvest = if show_progress {
        let bar = PageProgressBar::new(&request.query, request.max_pages);
        let harvest = driver.run(&request, &bar).await;
        bar.finish(&harvest);
        harvest
    } else {
        driver.run(&request, &LogProgress).await
    };

    let received = harvest.records.len();
    let results = dedupe(std::mem::take(&mut harvest.records));
    let sanitized = sanitize_query(&request.query);
    let out_dir = config.output.out_dir.clone();

    let plan = disposition(&harvest.termination, config.output.keep_partial);
    let files = match (plan, harvest.failure()) {
        (Disposition::Write, _) => Some(
            export::write(&results, &out_dir, &sanitized)
                .context("failed to write output files")?,
        ),
        (Disposition::WritePartial, failure) => {
            if let Some(failure) = failure {
                tracing::warn!(records = received, error = %failure, "writing partial results");
            }
            Some(
                export::write(&results, &out_dir, &sanitized)
                    .context("failed to write partial output files")?,
            )
        }
        (Disposition::Discard, failure) => {
            if let Some(failure) = failure {
                tracing::error!(records = received, error = %failure, "harvest failed, no output written");
            }
            None
        }
    };

    if !cli.quiet {
        ui::print_summary(&harvest, received, results.len(), files.as_ref());
    }
    if files.is_none() {
        ui::print_status(
            Status::Error,
            &format!(
                "no output written; rerun with --keep-partial to save the {} records collected",
                received
            ),
        );
    }
    let exit = match plan {
        Disposition::Write => ExitCode::SUCCESS,
        Disposition::WritePartial | Disposition::Discard => ExitCode::FAILURE,
    };
    Ok(exit)
}

/// What to do with the records of a finished harvest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    /// The run finished; write and exit 0
    Write,
    /// The run failed but partial output was requested; write and exit 1
    WritePartial,
    /// The run failed; write nothing and exit 1
    Discard,
}

fn disposition(termination: &Termination, keep_partial: bool) -> Disposition {
    match termination {
        Termination::EndOfResults | Termination::PageLimit => Disposition::Write,
        Termination::Failed(_) if keep_partial => Disposition::WritePartial,
        Termination::Failed(_) => Disposition::Discard,
    }
}

/// 2 for configuration errors, 1 for everything else
fn exit_status(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<ConfigError>().is_some() {
        2
    } else {
        1
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        clap_complete::generate(
            shell,
            &mut Cli::command(),
            "book-harvester",
            &mut std::io::stdout(),
        );
        return ExitCode::SUCCESS;
    }

    let config = match load(&cli) {
        Ok(config) => config,
        Err(err) => {
            ui::print_status(Status::Error, &err.to_string());
            return ExitCode::from(2);
        }
    };
    init_tracing(&cli, &config.logging);

    match run(cli, config).await {
        Ok(code) => code,
        Err(err) => {
            tracing::debug!(error = ?err, "run failed");
            ui::print_status(Status::Error, &format!("{:#}", err));
            ExitCode::from(exit_status(&err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use book_harvester::config::CREDENTIAL_ENV;
    use std::time::Duration;

    #[test]
    fn test_cli_version() {
        let version = env!("CARGO_PKG_VERSION");
        assert!(!version.is_empty());
        let parts: Vec<&str> = version.split('.').collect();
        assert!(parts.len() >= 2);
        assert!(parts[0].parse::<u32>().is_ok());
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["book-harvester", "--query", "파이썬"]);
        assert_eq!(cli.query.as_deref(), Some("파이썬"));
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert!(!cli.keep_partial);
        assert!(!cli.no_progress);
        assert!(cli.target.is_none());
        assert!(cli.size.is_none());
    }

    #[test]
    fn test_cli_query_required() {
        assert!(Cli::try_parse_from(["book-harvester"]).is_err());
        assert!(Cli::try_parse_from(["book-harvester", "--completions", "bash"]).is_ok());
        assert!(Cli::try_parse_from(["book-harvester", "--print-config"]).is_ok());
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::parse_from(["book-harvester", "--query", "q", "-v"]);
        assert_eq!(cli.verbose, 1);

        let cli = Cli::parse_from(["book-harvester", "--query", "q", "-vv"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["book-harvester", "--query", "q", "-q", "-v"]).is_err());
    }

    #[test]
    fn test_cli_log_level() {
        let logging = LoggingConfig::default();
        let cli = Cli::parse_from(["book-harvester", "--query", "q"]);
        assert_eq!(cli.log_level(&logging), "info");
        let cli = Cli::parse_from(["book-harvester", "--query", "q", "-vv"]);
        assert_eq!(cli.log_level(&logging), "trace");
        let cli = Cli::parse_from(["book-harvester", "--query", "q", "-q"]);
        assert_eq!(cli.log_level(&logging), "error");
    }

    #[test]
    fn test_cli_search_options() {
        let cli = Cli::parse_from([
            "book-harvester",
            "--query",
            "python 3.10",
            "--target",
            "publisher",
            "--sort",
            "latest",
            "--size",
            "10",
            "--max-pages",
            "3",
            "--out-dir",
            "/tmp/out",
            "--delay-ms",
            "0",
            "--timeout",
            "5",
            "--keep-partial",
            "--log-format",
            "json",
        ]);

        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config.search.target, Target::Publisher);
        assert_eq!(config.search.sort, Sort::Latest);
        assert_eq!(config.search.size, 10);
        assert_eq!(config.search.max_pages, 3);
        assert_eq!(config.output.out_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.http.page_delay(), Duration::ZERO);
        assert_eq!(config.http.timeout_secs, 5);
        assert!(config.output.keep_partial);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_cli_rejects_unknown_target() {
        assert!(Cli::try_parse_from(["book-harvester", "--query", "q", "--target", "author"]).is_err());
    }

    #[test]
    fn test_cli_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[search]\nsize = 20\nmax_pages = 7\n\n[http]\npage_delay_ms = 50\n")
            .unwrap();

        let cli = Cli::parse_from([
            "book-harvester",
            "--query",
            "q",
            "--config",
            path.to_str().unwrap(),
            "--size",
            "30",
        ]);
        let config = load(&cli).unwrap();

        assert_eq!(config.search.size, 30);
        assert_eq!(config.search.max_pages, 7);
        assert_eq!(config.http.page_delay_ms, 50);
    }

    #[test]
    fn test_disposition_of_a_finished_harvest() {
        use book_harvester::sources::{FetchFailure, SourceError};

        assert_eq!(disposition(&Termination::EndOfResults, false), Disposition::Write);
        assert_eq!(disposition(&Termination::PageLimit, false), Disposition::Write);

        let failed = Termination::Failed(FetchFailure {
            page_index: 2,
            attempts: 4,
            error: SourceError::RateLimit,
        });
        assert_eq!(disposition(&failed, false), Disposition::Discard);
        assert_eq!(disposition(&failed, true), Disposition::WritePartial);
    }

    #[test]
    fn test_config_errors_exit_with_two() {
        let err = anyhow::Error::from(ConfigError::MissingCredential(CREDENTIAL_ENV));
        assert_eq!(exit_status(&err), 2);

        let err = anyhow::anyhow!("boom");
        assert_eq!(exit_status(&err), 1);
    }
}
