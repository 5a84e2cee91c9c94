use anyhow::{bail, Context, Result};
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;
use structopt::StructOpt;

pub const DEFAULT_URL: &str = "http://127.0.0.1:5000/flask-profiler";

#[derive(Debug, Clone, StructOpt)]
#[structopt(
    name = "profview",
    about = "Terminal dashboard for a flask-profiler instance.\n\n\
    Browses grouped endpoint statistics and individual measurements through the profiler's REST API."
)]
pub struct Cli {
    /// Base URL of the profiler blueprint
    #[structopt(short, long, default_value = "http://127.0.0.1:5000/flask-profiler")]
    pub url: String,

    /// Rows per table page
    #[structopt(short = "p", long, default_value = "25")]
    pub page_size: usize,

    /// Request timeout in seconds
    #[structopt(short, long, default_value = "10")]
    pub timeout: u64,

    /// File the log output is written to
    #[structopt(long, parse(from_os_str), default_value = "profview.log")]
    pub log_file: PathBuf,

    /// Directory database dumps are written to
    #[structopt(long, parse(from_os_str), default_value = ".")]
    pub dump_dir: PathBuf,
}

/// Validated runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub base_url: String,
    pub page_size: usize,
    pub timeout: Duration,
    pub log_file: PathBuf,
    pub dump_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_URL.to_string(),
            page_size: 25,
            timeout: Duration::from_secs(10),
            log_file: PathBuf::from("profview.log"),
            dump_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let url = Url::parse(&cli.url).with_context(|| format!("invalid --url `{}`", cli.url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("--url must use http or https, got `{}`", url.scheme());
        }
        if cli.page_size == 0 {
            bail!("--page-size must be greater than zero");
        }
        if cli.timeout == 0 {
            bail!("--timeout must be greater than zero");
        }

        Ok(Self {
            base_url: cli.url.trim_end_matches('/').to_string(),
            page_size: cli.page_size,
            timeout: Duration::from_secs(cli.timeout),
            log_file: cli.log_file,
            dump_dir: cli.dump_dir,
        })
    }

    /// `(name, value)` pairs for the settings view.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Profiler URL", self.base_url.clone()),
            ("Page size", self.page_size.to_string()),
            ("Timeout", format!("{}s", self.timeout.as_secs())),
            ("Log file", self.log_file.display().to_string()),
            ("Dump directory", self.dump_dir.display().to_string()),
        ]
    }
}
