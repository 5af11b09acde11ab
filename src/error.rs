use thiserror::Error;
use tokio::sync::mpsc;

use crate::ExtractedRecord;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("The selector you are trying to scrape for is invalid. Selector: {0}")]
    ParseMissingSelector(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tokio Join Error, couldn't await a task! {0}")]
    RuntimeJoin(#[from] tokio::task::JoinError),
    #[error("Couldn't send a page of records through a channel.")]
    RuntimeSendError,

    #[error("Reqwest Error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Sqlite Error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl From<mpsc::error::SendError<Vec<ExtractedRecord>>> for Error {
    fn from(_value: mpsc::error::SendError<Vec<ExtractedRecord>>) -> Self {
        Error::RuntimeSendError
    }
}
