//! CLI argument parsing
//!
//! Options override the config file, environment variables sit between the
//! two, and the file supplies the rest. The exporter can also run without a
//! config file when `--jmx-url` and `--target` are given.
//!
//! The Kerberos password is intentionally not a CLI option; it is read from
//! the `HADOOP_EXPORTER_KRB5_PASSWORD` environment variable so it never
//! appears in a process listing.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::{default_timeout_ms, Config, ConfigError, ServerConfig, TargetConfig};
use crate::error::StartupError;
use crate::extractor::TargetKind;

/// Prometheus exporter for Hadoop daemon management endpoints
///
/// Polls a NameNode, DataNode or JournalNode `/jmx` endpoint, optionally
/// authenticating with Kerberos/SPNEGO, and republishes the bean fields as
/// Prometheus gauges.
#[derive(Parser, Debug)]
#[command(name = "hadoop-exporter")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config.yaml",
        env = "HADOOP_EXPORTER_CONFIG"
    )]
    pub config: PathBuf,

    /// Listen port (overrides config file)
    #[arg(short, long, value_name = "PORT", env = "HADOOP_EXPORTER_PORT")]
    pub port: Option<u16>,

    /// Bind address (overrides config file)
    #[arg(long, value_name = "ADDRESS", env = "HADOOP_EXPORTER_BIND_ADDRESS")]
    pub bind_address: Option<String>,

    /// Exposition path (overrides config file)
    #[arg(long, value_name = "PATH", env = "HADOOP_EXPORTER_METRICS_PATH")]
    pub metrics_path: Option<String>,

    /// Target endpoint URL, e.g. http://nn01:50070/jmx (overrides config file)
    #[arg(long, value_name = "URL", env = "HADOOP_EXPORTER_JMX_URL")]
    pub jmx_url: Option<String>,

    /// Target daemon kind (overrides config file)
    #[arg(long, value_enum, value_name = "KIND", env = "HADOOP_EXPORTER_TARGET")]
    pub target: Option<TargetKindArg>,

    /// Endpoint request timeout in milliseconds (overrides config file)
    #[arg(long, value_name = "MS", env = "HADOOP_EXPORTER_TIMEOUT")]
    pub timeout_ms: Option<u64>,

    /// Kerberos principal as user@REALM (overrides config file)
    #[arg(long, value_name = "PRINCIPAL", env = "HADOOP_EXPORTER_PRINCIPAL")]
    pub principal: Option<String>,

    /// Kerberos keytab path (overrides config file)
    #[arg(long, value_name = "FILE", env = "HADOOP_EXPORTER_KEYTAB")]
    pub keytab: Option<PathBuf>,

    /// Validate configuration and exit
    #[arg(long)]
    pub validate: bool,

    /// Log level
    #[arg(
        short,
        long,
        value_enum,
        default_value = "info",
        env = "HADOOP_EXPORTER_LOG_LEVEL"
    )]
    pub log_level: LogLevel,
}

impl Cli {
    /// Resolve the final configuration: config file if present, otherwise a
    /// default built from `--jmx-url`/`--target`, with CLI overrides applied
    /// on top.
    pub fn resolve_config(&self) -> Result<Config, StartupError> {
        let mut config = if self.config.exists() {
            Config::load(&self.config)?
        } else {
            let url = self.jmx_url.clone().ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "config file '{}' not found and --jmx-url not given",
                    self.config.display()
                ))
            })?;
            let kind = self.target.ok_or_else(|| {
                ConfigError::Invalid(
                    "running without a config file requires --target".to_string(),
                )
            })?;
            Config {
                server: ServerConfig::default(),
                target: TargetConfig {
                    kind: kind.into(),
                    url,
                    timeout_ms: default_timeout_ms(),
                },
                auth: Default::default(),
            }
        };

        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(address) = &self.bind_address {
            config.server.bind_address = address.clone();
        }
        if let Some(path) = &self.metrics_path {
            config.server.path = path.clone();
        }
        if let Some(url) = &self.jmx_url {
            config.target.url = url.clone();
        }
        if let Some(kind) = self.target {
            config.target.kind = kind.into();
        }
        if let Some(timeout) = self.timeout_ms {
            config.target.timeout_ms = timeout;
        }
        if let Some(principal) = &self.principal {
            config.auth.principal = Some(principal.clone());
        }
        if let Some(keytab) = &self.keytab {
            config.auth.keytab = Some(keytab.clone());
        }

        config.validate().map_err(StartupError::Config)?;
        Ok(config)
    }
}

/// Target daemon kinds accepted on the command line
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum TargetKindArg {
    /// HDFS NameNode
    Namenode,
    /// HDFS DataNode
    Datanode,
    /// HDFS JournalNode
    Journalnode,
}

impl From<TargetKindArg> for TargetKind {
    fn from(arg: TargetKindArg) -> Self {
        match arg {
            TargetKindArg::Namenode => TargetKind::NameNode,
            TargetKindArg::Datanode => TargetKind::DataNode,
            TargetKindArg::Journalnode => TargetKind::JournalNode,
        }
    }
}

/// Log level options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Trace level, most verbose
    Trace,
    /// Debug level
    Debug,
    /// Info level, the default
    Info,
    /// Warn level
    Warn,
    /// Error level, least verbose
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["hadoop-exporter"]);
        assert_eq!(cli.config, PathBuf::from("config.yaml"));
        assert_eq!(cli.port, None);
        assert_eq!(cli.bind_address, None);
        assert_eq!(cli.jmx_url, None);
        assert_eq!(cli.target, None);
        assert!(!cli.validate);
        assert_eq!(cli.log_level, LogLevel::Info);
    }

    #[test]
    fn test_cli_with_options() {
        let cli = Cli::parse_from([
            "hadoop-exporter",
            "-c",
            "custom.yaml",
            "-p",
            "9071",
            "--target",
            "datanode",
            "--log-level",
            "debug",
        ]);
        assert_eq!(cli.config, PathBuf::from("custom.yaml"));
        assert_eq!(cli.port, Some(9071));
        assert_eq!(cli.target, Some(TargetKindArg::Datanode));
        assert_eq!(cli.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_resolve_without_config_file_requires_url_and_target() {
        let cli = Cli::parse_from(["hadoop-exporter", "-c", "/nonexistent/config.yaml"]);
        assert!(cli.resolve_config().is_err());

        let cli = Cli::parse_from([
            "hadoop-exporter",
            "-c",
            "/nonexistent/config.yaml",
            "--jmx-url",
            "http://nn01:50070/jmx",
        ]);
        assert!(cli.resolve_config().is_err());

        let cli = Cli::parse_from([
            "hadoop-exporter",
            "-c",
            "/nonexistent/config.yaml",
            "--jmx-url",
            "http://nn01:50070/jmx",
            "--target",
            "namenode",
        ]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.target.url, "http://nn01:50070/jmx");
        assert_eq!(config.target.kind, TargetKind::NameNode);
        assert_eq!(config.server.port, 9070);
        // Same default the config file path uses.
        assert_eq!(config.target.timeout_ms, default_timeout_ms());
    }

    #[test]
    fn test_cli_overrides_win() {
        let cli = Cli::parse_from([
            "hadoop-exporter",
            "-c",
            "/nonexistent/config.yaml",
            "--jmx-url",
            "http://jn01:8480/jmx",
            "--target",
            "journalnode",
            "--port",
            "9073",
            "--metrics-path",
            "/jn-metrics",
            "--timeout-ms",
            "2500",
        ]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.server.port, 9073);
        assert_eq!(config.server.path, "/jn-metrics");
        assert_eq!(config.target.timeout_ms, 2500);
        assert_eq!(config.target.kind, TargetKind::JournalNode);
    }

    #[test]
    fn test_target_kind_arg_mapping() {
        assert_eq!(TargetKind::from(TargetKindArg::Namenode), TargetKind::NameNode);
        assert_eq!(TargetKind::from(TargetKindArg::Datanode), TargetKind::DataNode);
        assert_eq!(
            TargetKind::from(TargetKindArg::Journalnode),
            TargetKind::JournalNode
        );
    }

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Trace.to_string(), "trace");
        assert_eq!(LogLevel::Error.to_string(), "error");
    }
}
