use chrono::NaiveDate;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is a required env variable")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unable to connect to the database: {0}")]
    Connection(String),
    #[error("database call timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to write standup status: {0}")]
    Write(#[source] diesel::result::Error),
    #[error("failed to read standup status: {0}")]
    Read(#[source] diesel::result::Error),
    #[error("failed to change the standups schema: {0}")]
    Schema(#[source] diesel::result::Error),
    #[error("a standup update needs at least one field")]
    EmptyUpdate,
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("report start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to write report file: {0}")]
    Io(#[from] std::io::Error),
}
