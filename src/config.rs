use crate::aggregator_core::{FlushPolicy, InputSource, OutputTarget};
use clap::Parser;
use std::path::PathBuf;

/// Aggregate `key<TAB>JSON object` lines into one object per key.
///
/// Numbers are summed, nested objects are merged, arrays are appended, and for
/// other values the last one wins. Once a field holds a number, non-numeric
/// values for it are ignored.
///
/// Every option can also be set through its environment variable (or a `.env` file).
#[derive(Parser, Debug, Clone)]
#[command(name = "statsaggjs", version)]
pub struct AggregatorConfig {
    /// Alternate delimiter between key and JSON object
    #[arg(short = 'd', long = "del", env = "STATSAGG_DELIMITER", default_value = "\t", hide_default_value = true)]
    pub delimiter: String,

    /// If more than `limit` unique keys are found, the data is flushed to output
    /// and aggregation starts over. A limit of zero means no limit.
    #[arg(short, long, env = "STATSAGG_LIMIT", default_value_t = 0)]
    pub limit: usize,

    /// Output file (defaults to standard output)
    #[arg(short, long, env = "STATSAGG_OUTFILE")]
    pub outfile: Option<PathBuf>,

    /// Sort output by key
    #[arg(short, long, env = "STATSAGG_SORT")]
    pub sort: bool,

    /// Input files, read in order (defaults to standard input)
    pub inputs: Vec<PathBuf>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl AggregatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.delimiter.is_empty() {
            return Err(ConfigError::InvalidValue(
                "delimiter cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn flush_policy(&self) -> FlushPolicy {
        FlushPolicy::new(self.limit)
    }

    pub fn output_target(&self) -> OutputTarget {
        OutputTarget::from_path(self.outfile.clone())
    }

    /// Inputs in processing order; stdin when no files were given
    pub fn input_sources(&self) -> Vec<InputSource> {
        if self.inputs.is_empty() {
            vec![InputSource::Stdin]
        } else {
            self.inputs.iter().cloned().map(InputSource::File).collect()
        }
    }
}
