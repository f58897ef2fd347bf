//! Asynchronous line reader over stdin or an input file

use std::fmt;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Stdin => write!(f, "<stdin>"),
            InputSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

pub struct LineReader {
    source: InputSource,
    reader: BufReader<Box<dyn AsyncRead + Unpin + Send>>,
    line_number: usize,
    buf: Vec<u8>,
}

impl LineReader {
    pub fn new(source: InputSource, inner: Box<dyn AsyncRead + Unpin + Send>) -> Self {
        Self {
            source,
            reader: BufReader::new(inner),
            line_number: 0,
            buf: Vec::new(),
        }
    }

    /// Open stdin or a file for reading
    pub async fn open(source: &InputSource) -> std::io::Result<Self> {
        let inner: Box<dyn AsyncRead + Unpin + Send> = match source {
            InputSource::Stdin => Box::new(tokio::io::stdin()),
            InputSource::File(path) => Box::new(File::open(path).await?),
        };

        log::debug!("📖 Reading from: {}", source);
        Ok(Self::new(source.clone(), inner))
    }

    pub fn source(&self) -> &InputSource {
        &self.source
    }

    /// Number of the line most recently returned, starting at 1
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Next line without its `\n` / `\r\n` terminator, or `None` at end of input
    pub async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf).await? == 0 {
            return Ok(None);
        }
        self.line_number += 1;

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
        }
        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }

        let line = match String::from_utf8(std::mem::take(&mut self.buf)) {
            Ok(line) => line,
            Err(err) => {
                log::warn!(
                    "Invalid UTF-8 at {} line {}, decoding lossily",
                    self.source,
                    self.line_number
                );
                String::from_utf8_lossy(err.as_bytes()).into_owned()
            }
        };

        Ok(Some(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    fn from_bytes(bytes: &'static [u8]) -> LineReader {
        LineReader::new(InputSource::Stdin, Box::new(bytes))
    }

    #[tokio::test]
    async fn test_strips_terminators_and_counts_lines() {
        let mut reader = from_bytes(b"a\tb\r\nsecond\n\nlast");

        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("a\tb"));
        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("second"));
        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some(""));
        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("last"));
        assert_eq!(reader.line_number(), 4);
        assert_eq!(reader.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_utf8_decoded_lossily() {
        let mut reader = from_bytes(b"k\xff\t{}\n");
        let line = reader.read_line().await.unwrap().unwrap();
        assert_eq!(line, "k\u{FFFD}\t{}");
    }

    #[tokio::test]
    async fn test_open_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("input.tsv");

        let mut file = tokio::fs::File::create(&file_path).await.unwrap();
        file.write_all(b"foo\t{\"a\":1}\n").await.unwrap();
        file.flush().await.unwrap();
        drop(file);

        let source = InputSource::File(file_path.clone());
        let mut reader = LineReader::open(&source).await.unwrap();
        assert_eq!(reader.source(), &source);
        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("foo\t{\"a\":1}"));
        assert_eq!(reader.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_open_missing_file_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let source = InputSource::File(temp_dir.path().join("missing.tsv"));
        assert!(LineReader::open(&source).await.is_err());
    }
}
