mod cli;

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use diaglink_config::{load_config, load_from_file, Config};
use diaglink_lsp::{check_files, ClientOptions, DiagnosticsClient, Report, Severity};
use diaglink_platform::{
    filter_directive, log_file_path, open_log_file, DefaultPaths, PlatformPaths, LOG_ENV_VAR,
};

use crate::cli::{Args, Command};

/// No errors reported.
const EXIT_CLEAN: i32 = 0;
/// The server reported at least one error.
const EXIT_ERRORS: i32 = 1;
/// Connection, configuration or timeout failure.
const EXIT_FAILURE: i32 = 2;

fn init_logging(config: &Config, paths: &dyn PlatformPaths) -> Result<()> {
    let directive = filter_directive(
        config.log.level.as_str(),
        env::var(LOG_ENV_VAR).ok().as_deref(),
    );
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match &config.log.file {
        Some(configured) => {
            let path = log_file_path(paths, configured);
            let file = open_log_file(&path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            builder
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

fn load(args: &Args, paths: &dyn PlatformPaths, cwd: &Path) -> Result<Config> {
    match &args.config {
        Some(path) => load_from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => load_config(&paths.config_dir(), Some(cwd)).context("failed to load config"),
    }
}

fn client_options(config: &Config, cwd: &Path) -> ClientOptions {
    let root = match &config.project.root {
        Some(root) => absolute(root, cwd),
        None => cwd.to_path_buf(),
    };
    ClientOptions {
        host: config.server.host.clone(),
        port: config.server.port,
        root,
        language_id: config.project.language_id.clone(),
        tick_interval: Duration::from_millis(config.poll.tick_interval_ms),
    }
}

fn absolute(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// One `path:line:col: severity: message` line per diagnostic.
fn format_report(report: &Report, root: &Path) -> Vec<String> {
    report.diagnostics().map(|d| d.display(Some(root))).collect()
}

fn summary(report: &Report) -> String {
    format!(
        "{} error(s), {} warning(s), {} note(s) in {} file(s)",
        report.count(Severity::Error),
        report.count(Severity::Warning),
        report.count(Severity::Information) + report.count(Severity::Hint),
        report.files.len()
    )
}

fn exit_code(report: &Report) -> i32 {
    if !report.is_complete() {
        EXIT_FAILURE
    } else if report.has_errors() {
        EXIT_ERRORS
    } else {
        EXIT_CLEAN
    }
}

fn run(args: Args) -> Result<i32> {
    let paths = DefaultPaths::new().context("failed to detect platform paths")?;
    let cwd = env::current_dir().context("failed to read current directory")?;
    let config = load(&args, &paths, &cwd)?;
    init_logging(&config, &paths)?;

    let options = client_options(&config, &cwd);
    let root = options.root.clone();
    let files: Vec<PathBuf> = args.files.iter().map(|f| absolute(f, &cwd)).collect();
    info!(
        "checking {} file(s) against {}:{}",
        files.len(),
        options.host,
        options.port
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    let report = runtime
        .block_on(async {
            let (mut client, mut events) = DiagnosticsClient::tcp(options);
            let report = check_files(&mut client, &mut events, &files, args.timeout).await;
            client.disconnect();
            report
        })
        .context("diagnostics check failed")?;

    for line in format_report(&report, &root) {
        println!("{line}");
    }
    for path in report.missing() {
        eprintln!("diaglink: no diagnostics received for {}", path.display());
    }
    eprintln!("{}", summary(&report));

    info!("diaglink finished");
    Ok(exit_code(&report))
}

fn main() {
    let command = match cli::parse_args(env::args().skip(1)) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("diaglink: {:#}", e);
            std::process::exit(EXIT_FAILURE);
        }
    };

    match command {
        Command::Help => println!("{}", cli::USAGE),
        Command::Check(args) => match run(args) {
            Ok(code) => std::process::exit(code),
            Err(e) => {
                eprintln!("diaglink: {:#}", e);
                std::process::exit(EXIT_FAILURE);
            }
        },
    }
}
