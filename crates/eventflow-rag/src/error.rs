use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by retrieval pipeline services.
#[derive(Debug, Error)]
pub enum ServiceError {
  #[error("failed to read {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("no documents found in {}", path.display())]
  EmptyCorpus { path: PathBuf },

  #[error("{service} failed: {message}")]
  Failed {
    service: &'static str,
    message: String,
  },
}

impl ServiceError {
  pub fn failed(service: &'static str, message: impl Into<String>) -> Self {
    Self::Failed {
      service,
      message: message.into(),
    }
  }
}
