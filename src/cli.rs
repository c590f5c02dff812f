//! Command-line arguments.
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Default overall wait.
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) const USAGE: &str = "\
usage: diaglink [--config PATH] [--timeout-secs N] FILE...

Ask a running diagnostics server about FILE... and print what it reports.

options:
  --config PATH       read configuration from PATH only
  --timeout-secs N    give up waiting after N seconds (default 10)
  -h, --help          show this help";

/// Parsed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Check(Args),
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Args {
    pub config: Option<PathBuf>,
    pub timeout: Duration,
    pub files: Vec<PathBuf>,
}

/// Parse arguments, excluding the program name.
pub(crate) fn parse_args<I>(args: I) -> Result<Command>
where
    I: IntoIterator<Item = String>,
{
    let mut config = None;
    let mut timeout = DEFAULT_TIMEOUT;
    let mut files = Vec::new();

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "--config" => {
                let value = args.next().context("--config needs a path")?;
                config = Some(PathBuf::from(value));
            }
            "--timeout-secs" => {
                let value = args.next().context("--timeout-secs needs a value")?;
                let secs: u64 = value
                    .parse()
                    .with_context(|| format!("invalid --timeout-secs value {value:?}"))?;
                if secs == 0 {
                    bail!("--timeout-secs must be at least 1");
                }
                timeout = Duration::from_secs(secs);
            }
            "--" => files.extend(args.by_ref().map(PathBuf::from)),
            flag if flag.starts_with('-') && flag.len() > 1 => bail!("unknown option {flag}"),
            _ => files.push(PathBuf::from(arg)),
        }
    }

    if files.is_empty() {
        bail!("no files given\n\n{USAGE}");
    }
    Ok(Command::Check(Args {
        config,
        timeout,
        files,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    fn check(args: &[&str]) -> Args {
        match parse(args).unwrap() {
            Command::Check(args) => args,
            Command::Help => panic!("expected check"),
        }
    }

    #[test]
    fn files_with_defaults() {
        let args = check(&["a.gd", "scenes/b.gd"]);
        assert_eq!(args.files, vec![PathBuf::from("a.gd"), PathBuf::from("scenes/b.gd")]);
        assert_eq!(args.timeout, DEFAULT_TIMEOUT);
        assert!(args.config.is_none());
    }

    #[test]
    fn options_anywhere() {
        let args = check(&["a.gd", "--timeout-secs", "3", "--config", "/tmp/c.toml", "b.gd"]);
        assert_eq!(args.timeout, Duration::from_secs(3));
        assert_eq!(args.config, Some(PathBuf::from("/tmp/c.toml")));
        assert_eq!(args.files.len(), 2);
    }

    #[test]
    fn double_dash_ends_options() {
        let args = check(&["--", "--odd-name.gd"]);
        assert_eq!(args.files, vec![PathBuf::from("--odd-name.gd")]);
    }

    #[test]
    fn help_flag() {
        assert_eq!(parse(&["-h"]).unwrap(), Command::Help);
        assert_eq!(parse(&["a.gd", "--help"]).unwrap(), Command::Help);
    }

    #[test]
    fn errors() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["--config"]).is_err());
        assert!(parse(&["--timeout-secs", "soon", "a.gd"]).is_err());
        assert!(parse(&["--timeout-secs", "0", "a.gd"]).is_err());
        assert!(parse(&["--verbose", "a.gd"]).is_err());
    }
}
