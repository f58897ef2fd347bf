//! Writer backend trait for aggregated output
//!
//! Defines the interface for emitting one accumulated object per key.

use super::value::Object;
use async_trait::async_trait;

#[derive(Debug)]
pub enum AggregatorWriterError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
}

impl AggregatorWriterError {
    /// I/O failures abort the run; a value that won't serialize only costs its own line
    pub fn is_fatal(&self) -> bool {
        matches!(self, AggregatorWriterError::Io(_))
    }
}

impl From<std::io::Error> for AggregatorWriterError {
    fn from(err: std::io::Error) -> Self {
        AggregatorWriterError::Io(err)
    }
}

impl From<serde_json::Error> for AggregatorWriterError {
    fn from(err: serde_json::Error) -> Self {
        AggregatorWriterError::Serialization(err)
    }
}

impl std::fmt::Display for AggregatorWriterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregatorWriterError::Io(e) => write!(f, "IO error: {}", e),
            AggregatorWriterError::Serialization(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl std::error::Error for AggregatorWriterError {}

/// Backend trait for writing aggregated entries
#[async_trait]
pub trait AggregatorWriterBackend: Send {
    /// Write one key and its accumulated object
    async fn write_entry(&mut self, key: &str, value: &Object) -> Result<(), AggregatorWriterError>;

    /// Flush pending writes to the destination
    async fn flush(&mut self) -> Result<(), AggregatorWriterError>;

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_io_errors_are_fatal() {
        let io = AggregatorWriterError::from(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"));
        assert!(io.is_fatal());
        assert_eq!(io.to_string(), "IO error: closed");

        let serde_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let ser = AggregatorWriterError::from(serde_err);
        assert!(!ser.is_fatal());
        assert!(ser.to_string().starts_with("Serialization error: "));
    }
}
