//! Hadoop exporter binary
//!
//! Serves a Prometheus exposition endpoint backed by the `/jmx` management
//! endpoint of an HDFS NameNode, DataNode or JournalNode.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use hadoop_exporter::{cli::Cli, collector, server};

fn main() -> Result<()> {
    // GSSAPI resolves the Kerberos credential cache through KRB5CCNAME.
    // Export the process-private path before any runtime thread exists;
    // nothing mutates the environment after this point.
    std::env::set_var("KRB5CCNAME", collector::private_ccache_path());

    run()
}

#[tokio::main]
async fn run() -> Result<()> {
    let cli = Cli::parse();

    hadoop_exporter::init_logging(&cli.log_level.to_string())?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting hadoop-exporter"
    );

    let config = cli.resolve_config()?;

    if cli.validate {
        // Credential resolution is part of validation: a bad principal or
        // unreadable keytab should fail here, not at the first scrape.
        config.auth_mode()?;
        println!(
            "configuration OK: {} target {}",
            config.target.kind, config.target.url
        );
        return Ok(());
    }

    server::run(config).await?;

    Ok(())
}
