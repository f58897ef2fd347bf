//! Unified writer for aggregated output
//!
//! Routes writes to standard output or to a file based on configuration.

use super::tsv_writer::KeyedLineWriter;
use super::value::Object;
use super::writer_backend::{AggregatorWriterBackend, AggregatorWriterError};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::Stdout;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    pub fn from_path(path: Option<PathBuf>) -> Self {
        path.map(OutputTarget::File).unwrap_or(OutputTarget::Stdout)
    }
}

/// Unified writer that routes to stdout or a file
pub enum AggregatorWriter {
    Stdout(KeyedLineWriter<Stdout>),
    File(KeyedLineWriter<File>),
}

impl AggregatorWriter {
    /// Create the writer; an output file is created (or truncated) up front
    pub async fn new(target: &OutputTarget) -> Result<Self, AggregatorWriterError> {
        match target {
            OutputTarget::Stdout => Ok(AggregatorWriter::Stdout(KeyedLineWriter::new(tokio::io::stdout()))),
            OutputTarget::File(path) => {
                let file = File::create(path).await?;
                log::info!("📝 Writing aggregates to: {}", path.display());
                Ok(AggregatorWriter::File(KeyedLineWriter::new(file)))
            }
        }
    }
}

#[async_trait]
impl AggregatorWriterBackend for AggregatorWriter {
    async fn write_entry(&mut self, key: &str, value: &Object) -> Result<(), AggregatorWriterError> {
        match self {
            AggregatorWriter::Stdout(w) => w.write_entry(key, value).await,
            AggregatorWriter::File(w) => w.write_entry(key, value).await,
        }
    }

    async fn flush(&mut self) -> Result<(), AggregatorWriterError> {
        match self {
            AggregatorWriter::Stdout(w) => w.flush().await,
            AggregatorWriter::File(w) => w.flush().await,
        }
    }

    fn backend_type(&self) -> &'static str {
        match self {
            AggregatorWriter::Stdout(_) => "stdout",
            AggregatorWriter::File(_) => "file",
        }
    }
}
