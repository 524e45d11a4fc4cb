use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read workflow template {}: {source}", path.display())]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse workflow template {}: {source}", path.display())]
    TemplateParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("workflow template {} is not a JSON object of nodes", path.display())]
    TemplateShape { path: PathBuf },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("engine answered {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("engine response is not valid JSON: {0}")]
    ResponseDecode(#[source] serde_json::Error),

    #[error("image buffer does not match {width}x{height} RGBA ({len} bytes)")]
    InvalidImage { width: u32, height: u32, len: usize },

    #[error("failed to encode clipboard image: {0}")]
    ImageEncode(#[from] image::ImageError),

    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("poll interval must be greater than zero")]
    InvalidInterval,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
