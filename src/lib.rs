//! Hadoop exporter library
//!
//! Polls the `/jmx` management endpoint of an HDFS NameNode, DataNode or
//! JournalNode, optionally authenticating with Kerberos/SPNEGO, and
//! republishes selected bean fields as Prometheus gauges.

pub mod cli;
pub mod collector;
pub mod config;
pub mod error;
pub mod extractor;
pub mod poller;
pub mod registry;
pub mod server;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging subsystem
///
/// # Arguments
/// * `level` - Log level string (trace, debug, info, warn, error)
///
/// # Errors
/// Returns an error if the logging system fails to initialize
pub fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
