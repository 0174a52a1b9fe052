use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use workpartner_core::DataPaths;

#[derive(Parser, Debug)]
#[command(
    name = "workpartner-backend",
    version,
    about = "Tracks focused work time from the foreground window"
)]
struct Args {
    /// Data directory (default: %APPDATA%\WorkPartner, else ./data)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Shop item catalog (default: <data-dir>/items_db.json)
    #[arg(long)]
    items_db: Option<PathBuf>,

    /// Sampling interval in milliseconds
    #[arg(long, default_value_t = 1000)]
    poll_ms: u64,

    /// Nag while a distraction is in the foreground
    #[arg(long)]
    focus_mode: bool,

    /// Do not show predicted-focus suggestions
    #[arg(long)]
    no_advice: bool,
}

pub struct Config {
    pub paths: DataPaths,
    pub poll_interval: Duration,
    pub focus_mode: bool,
    pub advice: bool,
}

impl Config {
    pub fn from_args() -> Result<Self> {
        Self::from_parsed(Args::parse())
    }

    fn from_parsed(args: Args) -> Result<Self> {
        if args.poll_ms == 0 {
            bail!("--poll-ms must be greater than zero");
        }

        let root = args.data_dir.unwrap_or_else(DataPaths::default_root);
        let mut paths = DataPaths::new(root);
        if let Some(items_db) = args.items_db {
            paths = paths.with_items_db(items_db);
        }

        Ok(Self {
            paths,
            poll_interval: Duration::from_millis(args.poll_ms),
            focus_mode: args.focus_mode,
            advice: !args.no_advice,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Config> {
        let argv = std::iter::once("workpartner-backend").chain(args.iter().copied());
        Config::from_parsed(Args::try_parse_from(argv)?)
    }

    #[test]
    fn defaults() {
        let config = parse(&["--data-dir", "wp"]).unwrap();
        assert_eq!(config.paths.root(), std::path::Path::new("wp"));
        assert_eq!(config.paths.items_db(), std::path::Path::new("wp").join("items_db.json"));
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert!(!config.focus_mode);
        assert!(config.advice);
    }

    #[test]
    fn flags_and_validation() {
        let config = parse(&["--items-db", "cat.json", "--focus-mode", "--no-advice", "--poll-ms", "250"])
            .unwrap();
        assert_eq!(config.paths.items_db(), std::path::Path::new("cat.json"));
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert!(config.focus_mode);
        assert!(!config.advice);

        assert!(parse(&["--poll-ms", "0"]).is_err());
        assert!(parse(&["--unknown"]).is_err());
    }
}
