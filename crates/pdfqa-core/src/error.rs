use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Invalid chat request: {0}")]
    InvalidQuery(String),

    #[error("No extractable text found in PDF. Try OCR.")]
    NoExtractableText,

    #[error("Error extracting text from PDF: {0}")]
    Extraction(String),

    #[error("No documents found")]
    EmptyCorpus,

    #[error("Document store failure: {0:#}")]
    Store(anyhow::Error),

    #[error("Embedding failure: {0:#}")]
    Embedding(anyhow::Error),

    #[error("Generation failure: {0:#}")]
    Generation(anyhow::Error),

    #[error("Worker task failed: {0}")]
    Worker(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification used by outer surfaces to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The caller can fix the request (bad file, no text).
    Client,
    /// Nothing has been ingested yet.
    NotFound,
    /// Configuration, adapter or worker failure.
    Server,
}

impl Error {
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::InvalidUpload(_) | Error::InvalidQuery(_) | Error::NoExtractableText | Error::Extraction(_) => {
                ErrorClass::Client
            }
            Error::EmptyCorpus => ErrorClass::NotFound,
            Error::InvalidConfig(_)
            | Error::Store(_)
            | Error::Embedding(_)
            | Error::Generation(_)
            | Error::Worker(_)
            | Error::Io(_) => ErrorClass::Server,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
