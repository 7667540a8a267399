use thiserror::Error;

use crate::config::ConfigError;
use crate::core::document::DocumentError;
use crate::graph::GraphError;

#[derive(Debug, Error)]
pub enum ReleaseGraphError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("input error: {0}")]
    Document(#[from] DocumentError),
    #[error("graph error: {0}")]
    Graph(#[from] GraphError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ReleaseGraphError>;
