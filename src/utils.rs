use time::macros::format_description;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::EnvFilter;

use crate::args::{Args, Command};

pub fn setup_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(LocalTime::new(format_description!(
            "[hour]:[minute]:[second].[subsecond digits:3]"
        )))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn format_number(num: usize) -> String {
    num.to_string()
        .as_bytes()
        .rchunks(3)
        .rev()
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn validate_args(args: &Args) -> anyhow::Result<()> {
    if let Command::Scan {
        timeout, max_pages, ..
    } = &args.command
    {
        if *timeout == 0 {
            anyhow::bail!("--timeout must be greater than 0");
        }
        if *max_pages == 0 {
            anyhow::bail!("--max-pages must be greater than 0");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn format_number_groups_thousands() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1234567), "1,234,567");
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let args = Args::parse_from(["medalscan", "scan", "--timeout", "0"]);
        assert!(validate_args(&args).is_err());

        let args = Args::parse_from(["medalscan", "scan"]);
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn browser_defaults_to_firefox() {
        let args = Args::parse_from(["medalscan", "sites"]);
        assert_eq!(args.browser, "firefox");
    }
}
