use std::str::FromStr;

use anyhow::{Context, Result};

// ---------------------------------------------------------------------------
// CommandDelivery
// ---------------------------------------------------------------------------

/// What `GET /api/blinds/command` hands to the polling device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommandDelivery {
    /// Return the most recent command and discard every pending one.
    #[default]
    Latest,
    /// Return only the oldest pending command; the rest stay queued.
    Fifo,
}

impl FromStr for CommandDelivery {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "latest" => Ok(Self::Latest),
            "fifo" => Ok(Self::Fifo),
            other => Err(anyhow::anyhow!("unknown command delivery mode: {other:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres URI. `None` runs the service on the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub server_host: String,
    pub server_port: u16,
    pub command_delivery: CommandDelivery,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let optional = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        // `PORT` is what most hosting platforms inject.
        let port = lookup("SERVER_PORT")
            .or_else(|| lookup("PORT"))
            .unwrap_or_else(|| "3000".to_owned());

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|s| !s.trim().is_empty()),
            db_max_connections: optional("DB_MAX_CONNECTIONS", "10")
                .parse()
                .context("DB_MAX_CONNECTIONS must be a positive integer")?,
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: port
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            command_delivery: optional("COMMAND_DELIVERY", "latest")
                .trim()
                .parse()
                .context("COMMAND_DELIVERY must be 'latest' or 'fifo'")?,
        })
    }
}
