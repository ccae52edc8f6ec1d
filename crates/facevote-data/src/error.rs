use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{path}: missing column {column}")]
    MissingColumn { path: PathBuf, column: String },
    #[error("study config: {0}")]
    Study(#[from] toml::de::Error),
    #[error("scores: {0}")]
    Scores(#[from] facevote_core::batch::BatchError),
}

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    #[error("GET {url} returned {status}")]
    Status { url: String, status: u16 },
    #[error("invalid selector {0}")]
    Selector(String),
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
