//! Process configuration, read from `BLOOMCART_*` environment variables.

use std::net::SocketAddr;

use anyhow::{Context, bail};

use bloomcart_catalog::DEFAULT_PACKAGING_FEE;
use bloomcart_observability::LogFormat;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://bloomcart.db?mode=rwc";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Where products, drafts and carts live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Lost on restart; `BLOOMCART_DATABASE_URL=memory`.
    Memory,
    Sqlite(String),
}

impl StoreBackend {
    pub fn name(&self) -> &'static str {
        match self {
            StoreBackend::Memory => "memory",
            StoreBackend::Sqlite(_) => "sqlite",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database: StoreBackend,
    pub bind_addr: SocketAddr,
    pub packaging_fee: u64,
    pub seed_catalog: bool,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from `lookup` (an environment variable reader).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database = match lookup("BLOOMCART_DATABASE_URL") {
            None => StoreBackend::Sqlite(DEFAULT_DATABASE_URL.to_string()),
            Some(url) if url.trim().eq_ignore_ascii_case("memory") => StoreBackend::Memory,
            Some(url) if url.trim().is_empty() => bail!("BLOOMCART_DATABASE_URL is empty"),
            Some(url) => StoreBackend::Sqlite(url.trim().to_string()),
        };

        let bind_addr = lookup("BLOOMCART_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .trim()
            .parse::<SocketAddr>()
            .context("BLOOMCART_BIND_ADDR must be a socket address like 0.0.0.0:8080")?;

        let packaging_fee = match lookup("BLOOMCART_PACKAGING_FEE") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .context("BLOOMCART_PACKAGING_FEE must be a non-negative integer")?,
            None => DEFAULT_PACKAGING_FEE,
        };

        let seed_catalog = match lookup("BLOOMCART_SEED_CATALOG") {
            Some(raw) => parse_flag(&raw).context("BLOOMCART_SEED_CATALOG must be true or false")?,
            None => true,
        };

        let log_format = match lookup("BLOOMCART_LOG_FORMAT") {
            Some(raw) => raw.parse::<LogFormat>()?,
            None => LogFormat::default(),
        };

        Ok(Self {
            database,
            bind_addr,
            packaging_fee,
            seed_catalog,
            log_format,
        })
    }

    /// In-memory store with the seeded catalog, bound to an ephemeral local port.
    pub fn in_memory() -> Self {
        Self {
            database: StoreBackend::Memory,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            packaging_fee: DEFAULT_PACKAGING_FEE,
            seed_catalog: true,
            log_format: LogFormat::default(),
        }
    }
}

fn parse_flag(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => bail!("not a boolean: {other:?}"),
    }
}
