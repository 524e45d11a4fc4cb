use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use log::LevelFilter;
use reqwest::Url;

use crate::dispatcher::DEFAULT_CLIENT_ID;
use crate::error::{Error, Result};

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8188/prompt";
pub const INPUT_SUBDIR: &str = "clipboard_images";
pub const WORKFLOW_FILE: &str = "clipboard_processor.json";
pub const LOG_FILE: &str = "clipboard.log";

/// Watches the clipboard and feeds new images or text into a local
/// workflow engine.
#[derive(Debug, Clone, Parser)]
#[command(name = "clipfeed", version, about)]
pub struct Config {
    /// Engine installation directory; the other paths default relative to it
    #[arg(long, env = "CLIPFEED_COMFY_DIR", default_value = "ComfyUI")]
    pub comfy_dir: PathBuf,

    /// Directory captured images are written to [default: <comfy-dir>/input/clipboard_images]
    #[arg(long, env = "CLIPFEED_INPUT_DIR")]
    pub input_dir: Option<PathBuf>,

    /// API-format workflow template [default: <comfy-dir>/user/default/workflows/clipboard_processor.json]
    #[arg(long, env = "CLIPFEED_WORKFLOW")]
    pub workflow: Option<PathBuf>,

    /// Engine prompt endpoint
    #[arg(long, env = "CLIPFEED_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Log file, appended to [default: <comfy-dir>/clipboard.log]
    #[arg(long, env = "CLIPFEED_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Delay between clipboard polls, in milliseconds
    #[arg(long, env = "CLIPFEED_INTERVAL_MS", default_value_t = 1000)]
    pub interval_ms: u64,

    /// `client_id` sent with every prompt
    #[arg(long, env = "CLIPFEED_CLIENT_ID", default_value = DEFAULT_CLIENT_ID)]
    pub client_id: String,

    /// HTTP request timeout, in seconds
    #[arg(long, env = "CLIPFEED_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub input_dir: PathBuf,
    pub engine_input_root: PathBuf,
    pub workflow: PathBuf,
    pub endpoint: Url,
    pub log_file: PathBuf,
    pub log_level: LevelFilter,
    pub interval: Duration,
    pub client_id: String,
    pub timeout: Duration,
}

impl Config {
    pub fn resolve(&self) -> Result<Settings> {
        let endpoint = Url::parse(&self.endpoint).map_err(|e| Error::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(Error::InvalidEndpoint {
                endpoint: self.endpoint.clone(),
                reason: format!("unsupported scheme {:?}", endpoint.scheme()),
            });
        }

        if self.interval_ms == 0 {
            return Err(Error::InvalidInterval);
        }

        let engine_input_root = self.comfy_dir.join("input");
        let input_dir = self
            .input_dir
            .clone()
            .unwrap_or_else(|| engine_input_root.join(INPUT_SUBDIR));
        let workflow = self.workflow.clone().unwrap_or_else(|| {
            self.comfy_dir
                .join("user")
                .join("default")
                .join("workflows")
                .join(WORKFLOW_FILE)
        });
        let log_file = self
            .log_file
            .clone()
            .unwrap_or_else(|| self.comfy_dir.join(LOG_FILE));

        let log_level = match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        Ok(Settings {
            input_dir,
            engine_input_root,
            workflow,
            endpoint,
            log_file,
            log_level,
            interval: Duration::from_millis(self.interval_ms),
            client_id: self.client_id.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}
