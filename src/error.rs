use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} is required")]
    EmptyField(&'static str),
    #[error("date must be DD/MM/YYYY, got '{0}'")]
    BadDate(String),
    #[error("no application with id {0}")]
    NotFound(i64),
    #[error("could not load {path}: {detail}")]
    Load { path: PathBuf, detail: String },
    #[error("could not write {path}: {detail}")]
    Persist { path: PathBuf, detail: String },
}

impl StoreError {
    /// Which input field a validation failure points at, if any.
    /// Lets a form highlight the offending entry.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            StoreError::EmptyField(field) => Some(field),
            StoreError::BadDate(_) => Some("date"),
            _ => None,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
