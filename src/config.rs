use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub log_filter: String,
    pub db_max_connections: u32,
    pub cert_code_prefix: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL not set")?;

        let host = env::var("HOST")
            .ok()
            .and_then(|s| s.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let port: u16 = env::var("PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(8081);
        let log_filter = env::var("RUST_LOG")
            .unwrap_or_else(|_| "course_progress=info,tower_http=info".into());
        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);
        let cert_code_prefix = env::var("CERT_CODE_PREFIX").unwrap_or_else(|_| "CERT".into());

        Ok(Self {
            database_url,
            host,
            port,
            log_filter,
            db_max_connections,
            cert_code_prefix,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
