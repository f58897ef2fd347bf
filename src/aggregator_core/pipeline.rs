//! Ingestion loop: lines → records → store, with optional unique-key flushing

use super::reader::LineReader;
use super::record::{Record, RecordError};
use super::store::{AggregationStore, IngestOutcome};
use super::value::Object;
use super::writer_backend::{AggregatorWriterBackend, AggregatorWriterError};
use std::fmt;

/// Flush the whole store before a new key would push it past `limit` keys.
/// A limit of zero never flushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlushPolicy {
    limit: usize,
}

impl FlushPolicy {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn unbounded() -> Self {
        Self::new(0)
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn should_flush(&self, store: &AggregationStore, key: &str) -> bool {
        self.limit > 0 && store.len() >= self.limit && !store.contains_key(key)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatorStats {
    pub lines_read: u64,
    pub records_inserted: u64,
    pub records_merged: u64,
    pub records_skipped: u64,
    pub field_errors: u64,
    pub flushes: u64,
    pub keys_written: u64,
}

#[derive(Debug)]
pub enum AggregatorError {
    MissingDelimiter { line_number: usize, line: String },
    Input(std::io::Error),
    Output(AggregatorWriterError),
}

impl From<std::io::Error> for AggregatorError {
    fn from(err: std::io::Error) -> Self {
        AggregatorError::Input(err)
    }
}

impl From<AggregatorWriterError> for AggregatorError {
    fn from(err: AggregatorWriterError) -> Self {
        AggregatorError::Output(err)
    }
}

impl fmt::Display for AggregatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregatorError::MissingDelimiter { line_number, line } => {
                write!(f, "wrong number of fields at line {}: '{}'", line_number, line)
            }
            AggregatorError::Input(e) => write!(f, "Input error: {}", e),
            AggregatorError::Output(e) => write!(f, "Output error: {}", e),
        }
    }
}

impl std::error::Error for AggregatorError {}

/// Parse one line. `Ok(None)` means the record was malformed and skipped.
fn parse_line(
    line: &str,
    line_number: usize,
    delimiter: &str,
    stats: &mut AggregatorStats,
) -> Result<Option<Record>, AggregatorError> {
    stats.lines_read += 1;

    match Record::parse(line, delimiter) {
        Ok(record) => Ok(Some(record)),
        Err(RecordError::MissingDelimiter { line }) => {
            Err(AggregatorError::MissingDelimiter { line_number, line })
        }
        Err(err) => {
            log::warn!("Skipping line {}: {}", line_number, err);
            stats.records_skipped += 1;
            Ok(None)
        }
    }
}

fn apply(store: &mut AggregationStore, record: Record, stats: &mut AggregatorStats) {
    match store.ingest(record) {
        IngestOutcome::Inserted => stats.records_inserted += 1,
        IngestOutcome::Merged { field_errors } => {
            stats.records_merged += 1;
            stats.field_errors += field_errors.len() as u64;
        }
    }
}

/// Aggregate lines into a fresh store without flushing or writing anything
pub fn aggregate_lines<'a, I>(lines: I, delimiter: &str) -> Result<AggregationStore, AggregatorError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut store = AggregationStore::new();
    let mut stats = AggregatorStats::default();

    for (idx, line) in lines.into_iter().enumerate() {
        if let Some(record) = parse_line(line, idx + 1, delimiter, &mut stats)? {
            apply(&mut store, record, &mut stats);
        }
    }

    Ok(store)
}

async fn write_entries<'a, W, I>(
    writer: &mut W,
    entries: I,
    stats: &mut AggregatorStats,
) -> Result<(), AggregatorWriterError>
where
    W: AggregatorWriterBackend,
    I: Iterator<Item = (&'a String, &'a Object)>,
{
    for (key, value) in entries {
        match writer.write_entry(key, value).await {
            Ok(()) => stats.keys_written += 1,
            Err(err) if !err.is_fatal() => {
                log::warn!("Couldn't convert data for key '{}' to JSON: {}", key, err);
            }
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

pub struct Aggregator<W: AggregatorWriterBackend> {
    store: AggregationStore,
    delimiter: String,
    policy: FlushPolicy,
    sort_output: bool,
    writer: W,
    stats: AggregatorStats,
}

impl<W: AggregatorWriterBackend> Aggregator<W> {
    pub fn new(writer: W, delimiter: impl Into<String>, policy: FlushPolicy, sort_output: bool) -> Self {
        Self::with_store(AggregationStore::new(), writer, delimiter, policy, sort_output)
    }

    pub fn with_store(
        store: AggregationStore,
        writer: W,
        delimiter: impl Into<String>,
        policy: FlushPolicy,
        sort_output: bool,
    ) -> Self {
        Self {
            store,
            delimiter: delimiter.into(),
            policy,
            sort_output,
            writer,
            stats: AggregatorStats::default(),
        }
    }

    pub fn store(&self) -> &AggregationStore {
        &self.store
    }

    pub fn stats(&self) -> &AggregatorStats {
        &self.stats
    }

    /// Parse one line and fold it into the store, flushing first if the policy says so
    pub async fn ingest_line(&mut self, line: &str, line_number: usize) -> Result<(), AggregatorError> {
        let Some(record) = parse_line(line, line_number, &self.delimiter, &mut self.stats)? else {
            return Ok(());
        };

        if self.policy.should_flush(&self.store, &record.key) {
            log::debug!(
                "Unique key limit {} reached at line {}, flushing",
                self.policy.limit(),
                line_number
            );
            self.flush().await?;
        }

        apply(&mut self.store, record, &mut self.stats);
        Ok(())
    }

    /// Drain one input into the store
    pub async fn process(&mut self, reader: &mut LineReader) -> Result<(), AggregatorError> {
        while let Some(line) = reader.read_line().await? {
            self.ingest_line(&line, reader.line_number()).await?;
        }

        log::debug!("Finished {} after {} lines", reader.source(), reader.line_number());
        Ok(())
    }

    /// Write every accumulated entry, then start over with an empty store
    pub async fn flush(&mut self) -> Result<(), AggregatorError> {
        if self.sort_output {
            write_entries(&mut self.writer, self.store.sorted_entries().into_iter(), &mut self.stats).await?;
        } else {
            write_entries(&mut self.writer, self.store.iter(), &mut self.stats).await?;
        }
        self.writer.flush().await?;

        let flushed = self.store.take();
        self.stats.flushes += 1;
        log::debug!("Flushed {} keys to {}", flushed.len(), self.writer.backend_type());
        Ok(())
    }

    /// Final flush at end of input; hands back the writer and the run statistics
    pub async fn finish(mut self) -> Result<(W, AggregatorStats), AggregatorError> {
        if !self.store.is_empty() {
            self.flush().await?;
        }
        self.writer.flush().await?;

        log::info!(
            "✅ Aggregated {} lines: {} new keys, {} merged, {} skipped, {} field errors, {} keys written in {} flushes",
            self.stats.lines_read,
            self.stats.records_inserted,
            self.stats.records_merged,
            self.stats.records_skipped,
            self.stats.field_errors,
            self.stats.keys_written,
            self.stats.flushes
        );

        Ok((self.writer, self.stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator_core::reader::InputSource;
    use crate::aggregator_core::tsv_writer::KeyedLineWriter;
    use crate::aggregator_core::value::Value;

    type MemoryAggregator = Aggregator<KeyedLineWriter<Vec<u8>>>;

    fn aggregator(limit: usize, sort: bool) -> MemoryAggregator {
        Aggregator::new(KeyedLineWriter::new(Vec::new()), "\t", FlushPolicy::new(limit), sort)
    }

    async fn output(agg: MemoryAggregator) -> (String, AggregatorStats) {
        let (writer, stats) = agg.finish().await.unwrap();
        (String::from_utf8(writer.into_inner()).unwrap(), stats)
    }

    #[test]
    fn test_flush_policy() {
        let mut store = AggregationStore::new();
        store.ingest(Record::parse("a\t{}", "\t").unwrap());

        assert!(!FlushPolicy::unbounded().should_flush(&store, "b"));
        assert!(FlushPolicy::new(1).should_flush(&store, "b"));
        // Existing keys never trigger a flush
        assert!(!FlushPolicy::new(1).should_flush(&store, "a"));
        assert!(!FlushPolicy::new(2).should_flush(&store, "b"));
    }

    #[test]
    fn test_aggregate_lines() {
        let store = aggregate_lines(
            ["foo\t{\"n\": 1}", "foo\tnot json", "bar\t{\"n\": 2}", "foo\t{\"n\": 2}"],
            "\t",
        )
        .unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("foo").unwrap()["n"], Value::UnsignedInt(3));
    }

    #[test]
    fn test_aggregate_lines_stops_at_missing_delimiter() {
        let err = aggregate_lines(["foo\t{}", "broken", "bar\t{}"], "\t").err().unwrap();
        match err {
            AggregatorError::MissingDelimiter { line_number, line } => {
                assert_eq!(line_number, 2);
                assert_eq!(line, "broken");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sorted_output() {
        let mut agg = aggregator(0, true);
        agg.ingest_line("foo\t{\"chips\": 1}", 1).await.unwrap();
        agg.ingest_line("bar\t{\"pizza\": 2, \"cheese\": 3}", 2).await.unwrap();
        agg.ingest_line("foo\t{\"chips\": 3}", 3).await.unwrap();

        let (out, stats) = output(agg).await;
        assert_eq!(out, "bar\t{\"cheese\":3,\"pizza\":2}\nfoo\t{\"chips\":4}\n");
        assert_eq!(stats.records_inserted, 2);
        assert_eq!(stats.records_merged, 1);
        assert_eq!(stats.flushes, 1);
        assert_eq!(stats.keys_written, 2);
    }

    #[tokio::test]
    async fn test_limit_flushes_whole_store() {
        let mut agg = aggregator(2, true);
        for (n, line) in ["a\t{\"n\": 1}", "b\t{\"n\": 1}", "a\t{\"n\": 1}", "c\t{\"n\": 1}", "a\t{\"n\": 5}"]
            .iter()
            .enumerate()
        {
            agg.ingest_line(line, n + 1).await.unwrap();
        }
        assert_eq!(agg.stats().flushes, 1);
        assert_eq!(agg.store().len(), 2);

        let (out, stats) = output(agg).await;
        // "a" does not carry its pre-flush total across the boundary
        assert_eq!(out, "a\t{\"n\":2}\nb\t{\"n\":1}\na\t{\"n\":5}\nc\t{\"n\":1}\n");
        assert_eq!(stats.flushes, 2);
    }

    #[tokio::test]
    async fn test_empty_input_writes_nothing() {
        let (out, stats) = output(aggregator(0, false)).await;
        assert!(out.is_empty());
        assert_eq!(stats.flushes, 0);
    }

    #[tokio::test]
    async fn test_process_reader_with_custom_delimiter() {
        let mut agg = Aggregator::new(KeyedLineWriter::new(Vec::new()), "|", FlushPolicy::unbounded(), false);
        let mut reader = LineReader::new(
            InputSource::Stdin,
            Box::new(&b"k|{\"v\": [1]}\r\nk|{\"v\": [2], \"s\": \"a|b\"}\n"[..]),
        );
        agg.process(&mut reader).await.unwrap();

        let (out, _) = output(agg).await;
        assert_eq!(out, "k\t{\"s\":\"a|b\",\"v\":[1,2]}\n");
    }

    #[tokio::test]
    async fn test_process_aborts_on_missing_delimiter() {
        let mut agg = aggregator(0, false);
        let mut reader = LineReader::new(
            InputSource::Stdin,
            Box::new(&b"k\t{\"n\": 1}\nno delimiter here\nk\t{\"n\": 1}\n"[..]),
        );

        let err = agg.process(&mut reader).await.unwrap_err();
        assert!(matches!(err, AggregatorError::MissingDelimiter { line_number: 2, .. }));
        assert_eq!(agg.stats().lines_read, 2);
        assert_eq!(agg.store().get("k").unwrap()["n"], Value::UnsignedInt(1));
    }
}
