use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::catalog::{CACHE_DURATION, Columns};
use crate::catalog::loader::{DEFAULT_NAME_COLUMN, DEFAULT_PRICE_COLUMN};

/// Medicine price lookup API backed by a Google Sheet.
///
/// The Gemini key is read from `GEMINI_API_KEY` (optional model override in
/// `GEMINI_MODEL`); without it `/gemini-info` answers with an error.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "DORITOP_HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "DORITOP_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Exact title of the Google spreadsheet holding the catalog
    #[arg(long, env = "DORITOP_SHEET_NAME", default_value = "Dori Bazasi")]
    pub sheet_name: String,

    /// Service-account key file with access to the spreadsheet
    #[arg(long, env = "DORITOP_CREDENTIALS", default_value = "credentials.json")]
    pub credentials: PathBuf,

    /// Seconds a loaded catalog is served before it is refreshed
    #[arg(long, env = "DORITOP_CACHE_TTL_SECS", default_value_t = CACHE_DURATION.as_secs())]
    pub cache_ttl_secs: u64,

    /// Header of the medicine name column
    #[arg(long, env = "DORITOP_NAME_COLUMN", default_value = DEFAULT_NAME_COLUMN)]
    pub name_column: String,

    /// Header of the price column
    #[arg(long, env = "DORITOP_PRICE_COLUMN", default_value = DEFAULT_PRICE_COLUMN)]
    pub price_column: String,
}

impl Config {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn columns(&self) -> Columns {
        Columns {
            name: self.name_column.clone(),
            price: self.price_column.clone(),
        }
    }
}
