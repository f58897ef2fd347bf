//! Keyed line writer - one `key<TAB>json` line per aggregated key

use super::value::Object;
use super::writer_backend::{AggregatorWriterBackend, AggregatorWriterError};
use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

/// Output always uses a tab, whatever the input delimiter was
pub const OUTPUT_DELIMITER: &str = "\t";

pub struct KeyedLineWriter<W: AsyncWrite + Unpin + Send> {
    writer: BufWriter<W>,
    lines_written: u64,
}

impl<W: AsyncWrite + Unpin + Send> KeyedLineWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: BufWriter::new(inner),
            lines_written: 0,
        }
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    pub async fn write_entry(&mut self, key: &str, value: &Object) -> Result<(), AggregatorWriterError> {
        // Serialize before touching the output so a failure leaves no partial line
        let json = serde_json::to_string(value)?;

        let mut line = String::with_capacity(key.len() + json.len() + 2);
        line.push_str(key);
        line.push_str(OUTPUT_DELIMITER);
        line.push_str(&json);
        line.push('\n');

        self.writer.write_all(line.as_bytes()).await?;
        self.lines_written += 1;
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<(), AggregatorWriterError> {
        self.writer.flush().await?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> AggregatorWriterBackend for KeyedLineWriter<W> {
    async fn write_entry(&mut self, key: &str, value: &Object) -> Result<(), AggregatorWriterError> {
        KeyedLineWriter::write_entry(self, key, value).await
    }

    async fn flush(&mut self) -> Result<(), AggregatorWriterError> {
        KeyedLineWriter::flush(self).await
    }

    fn backend_type(&self) -> &'static str {
        "TSV"
    }
}
