//! statsaggjs - roll up keyed JSON objects
//!
//! Reads `key<TAB>{json object}` lines and writes one aggregated line per key.
//!
//! ## Usage
//!
//! ```bash
//! statsaggjs [--del D] [--limit N] [--outfile PATH] [--sort] [INPUTS...]
//! ```
//!
//! These records:
//!
//! ```text
//! foo	{"chips": 1, "drinks": 1, "frugal": false}
//! foo	{"deep": {"level1": {"level2": 1}}}
//! foo	{"chips": 3, "frugal": true, "nested": {"count": 1}}
//! foo	{"deep": {"level1": {"level2": 2}}, "versions": ["1.2"]}
//! foo	{"nested": {"count": 3}, "versions": ["2.0"]}
//! bar	{"pizza": 2, "cheese": 3}
//! ```
//!
//! reduce to
//!
//! ```text
//! bar	{"cheese":3,"pizza":2}
//! foo	{"chips":4,"deep":{"level1":{"level2":3}},"drinks":1,"frugal":true,"nested":{"count":4},"versions":["1.2","2.0"]}
//! ```
//!
//! ## Environment Variables
//!
//! - STATSAGG_DELIMITER - Delimiter between key and JSON object (default: tab)
//! - STATSAGG_LIMIT - Unique-key flush threshold, 0 for none (default: 0)
//! - STATSAGG_OUTFILE - Output file (default: standard output)
//! - STATSAGG_SORT - Sort output by key (default: false)
//! - RUST_LOG - Logging level (optional, default: info)

use clap::Parser;
use statsagg::aggregator_core::{
    AggregationStore, Aggregator, AggregatorWriter, AggregatorWriterBackend, LineReader, MergeEngine,
};
use statsagg::AggregatorConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = AggregatorConfig::parse();

    if let Err(e) = run(config).await {
        log::error!("❌ {}", e);
        std::process::exit(1);
    }
}

async fn run(config: AggregatorConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    let target = config.output_target();
    let writer = AggregatorWriter::new(&target)
        .await
        .map_err(|e| format!("couldn't open output file {:?}: {}", target, e))?;

    let engine = MergeEngine::new();

    log::info!("🚀 Starting statsaggjs");
    log::info!("   Delimiter: {:?}", config.delimiter);
    log::info!("   Unique key limit: {}", config.limit);
    log::info!("   Sorted output: {}", config.sort);
    log::info!("   Backend: {}", writer.backend_type());
    log::info!("   Max merge depth: {}", engine.max_depth());

    let mut aggregator = Aggregator::with_store(
        AggregationStore::with_engine(engine),
        writer,
        config.delimiter.clone(),
        config.flush_policy(),
        config.sort,
    );

    for source in config.input_sources() {
        let mut reader = LineReader::open(&source)
            .await
            .map_err(|e| format!("couldn't open input file {}: {}", source, e))?;

        aggregator
            .process(&mut reader)
            .await
            .map_err(|e| format!("{} ({})", e, source))?;
    }

    aggregator.finish().await?;
    Ok(())
}
