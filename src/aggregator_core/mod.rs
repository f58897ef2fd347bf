//! Aggregator Core - keyed JSON roll-up engine
//!
//! Folds a stream of `key<TAB>{json object}` records into one cumulative
//! object per key. Numbers are summed, objects merge recursively, arrays
//! concatenate, and other scalars are last-write-wins. A field that once
//! held a number ignores later non-numeric values.
//!
//! # Architecture
//!
//! ```text
//! input files / stdin → LineReader
//!     ↓
//! Record::parse (split at first delimiter, decode JSON object)
//!     ↓
//! FlushPolicy (unique-key limit) ──→ flush: whole store → writer
//!     ↓
//! AggregationStore::ingest → insert | MergeEngine::merge
//!     ↓
//! AggregatorWriter → key<TAB>json lines on stdout or a file
//! ```

pub mod merge;
pub mod pipeline;
pub mod reader;
pub mod record;
pub mod store;
pub mod tsv_writer;
pub mod value;
pub mod writer;
pub mod writer_backend;

pub use merge::{add_numbers, MergeEngine, MergeError, DEFAULT_MAX_MERGE_DEPTH};
pub use pipeline::{aggregate_lines, Aggregator, AggregatorError, AggregatorStats, FlushPolicy};
pub use reader::{InputSource, LineReader};
pub use record::{split_record_line, Record, RecordError};
pub use store::{AggregationStore, IngestOutcome};
pub use tsv_writer::{KeyedLineWriter, OUTPUT_DELIMITER};
pub use value::{NumericKind, Object, Value, ValueKind};
pub use writer::{AggregatorWriter, OutputTarget};
pub use writer_backend::{AggregatorWriterBackend, AggregatorWriterError};
