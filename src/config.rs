use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use clap::Parser;

/// CLI / env configuration parsed at process startup.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "storefront-catalog",
    about = "Read-only product catalog API",
    version,
    disable_help_subcommand = true
)]
struct CliConfig {
    /// JSON file holding the product catalog
    #[arg(long, env = "STOREFRONT_CATALOG_PATH", default_value = "./data/catalog.json")]
    catalog_path: PathBuf,

    /// Address to bind the HTTP server to (e.g., 0.0.0.0:8080)
    #[arg(long = "bind-addr", env = "STOREFRONT_BIND_ADDR", default_value = "0.0.0.0:8080")]
    listen_addr: SocketAddr,

    /// Optional OTLP endpoint for OpenTelemetry export
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    otel_endpoint: Option<String>,

    /// Logical service name for telemetry (resource attribute)
    #[arg(long, env = "OTEL_SERVICE_NAME", default_value = "storefront-catalog")]
    otel_service_name: String,

    /// Disable OTLP trace export even if an endpoint is set
    #[arg(long, env = "STOREFRONT_OTEL_DISABLE_TRACES", default_value_t = false)]
    otel_disable_traces: bool,

    /// Disable OTLP log export even if an endpoint is set
    #[arg(long, env = "STOREFRONT_OTEL_DISABLE_LOGS", default_value_t = false)]
    otel_disable_logs: bool,

    /// Deployment environment tag for telemetry (e.g., development, staging, prod)
    #[arg(long, env = "STOREFRONT_ENV", default_value = "development")]
    environment: String,

    /// Default log filter when RUST_LOG is not provided
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Comma-separated list of allowed CORS origins
    #[arg(long, env = "STOREFRONT_CORS_ALLOWED_ORIGINS", value_delimiter = ',')]
    cors_allowed_origins: Vec<String>,
}

/// Fully validated configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub catalog_path: PathBuf,
    pub listen_addr: SocketAddr,
    pub otel: OtelConfig,
    pub log: LogConfig,
    pub environment: String,
    pub cors_allowed_origins: Vec<String>,
}

/// OpenTelemetry exporter configuration.
#[derive(Debug, Clone)]
pub struct OtelConfig {
    pub endpoint: Option<String>,
    pub service_name: String,
    pub disable_traces: bool,
    pub disable_logs: bool,
}

/// Structured logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: String,
}

impl AppConfig {
    /// Parse CLI/env arguments and return a validated configuration.
    pub fn load() -> Result<Self> {
        let cli = CliConfig::parse();
        Self::try_from(cli)
    }
}

impl TryFrom<CliConfig> for AppConfig {
    type Error = anyhow::Error;

    fn try_from(value: CliConfig) -> Result<Self> {
        if let Some(parent) = value
            .catalog_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
        {
            ensure_directory_exists(parent).with_context(|| {
                format!(
                    "catalog directory for '{}' missing",
                    value.catalog_path.display()
                )
            })?;
        }

        Ok(Self {
            catalog_path: value.catalog_path,
            listen_addr: value.listen_addr,
            environment: value.environment,
            otel: OtelConfig {
                endpoint: value.otel_endpoint,
                service_name: value.otel_service_name,
                disable_traces: value.otel_disable_traces,
                disable_logs: value.otel_disable_logs,
            },
            log: LogConfig {
                level: value.log_level,
            },
            cors_allowed_origins: value
                .cors_allowed_origins
                .into_iter()
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
        })
    }
}

fn ensure_directory_exists(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    Err(anyhow!(
        "path '{}' does not exist or is not a directory",
        path.display()
    ))
}
