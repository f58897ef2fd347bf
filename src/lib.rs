pub mod aggregator_core;
pub mod config;

pub use aggregator_core::{
    aggregate_lines, AggregationStore, Aggregator, AggregatorError, MergeEngine, Object, Record,
    Value,
};
pub use config::{AggregatorConfig, ConfigError};
