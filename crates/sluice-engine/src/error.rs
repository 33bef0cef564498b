//! Error type for `sluice-engine`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] sluice_core::Error),

  #[error("invalid configuration: {0}")]
  Config(String),

  #[error("demo generator is already running")]
  AlreadyRunning,

  #[error("template pool is empty")]
  NoTemplates,

  #[error("failed to read templates from {path:?}: {source}")]
  TemplateFile {
    path:   PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse templates: {0}")]
  TemplateParse(#[from] serde_json::Error),

  #[error("transport error: {0}")]
  Transport(#[source] sluice_core::transport::TransportError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
