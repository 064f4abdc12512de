use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

fn default_max_file_size() -> usize {
    // 10 MB in bytes
    10 * 1024 * 1024
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub max_file_size: usize,
    /// Rows shown in every preview table.
    pub preview_rows: usize,
    /// Idle time after which a session and its table are discarded.
    pub session_ttl: Duration,
    pub max_sessions: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            max_file_size: default_max_file_size(),
            preview_rows: 5,
            session_ttl: Duration::from_secs(3600),
            max_sessions: 1000,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        let defaults = Config::default();
        let preview_rows = env_or("PREVIEW_ROWS", defaults.preview_rows)?;
        if preview_rows == 0 {
            anyhow::bail!("PREVIEW_ROWS must be at least 1");
        }

        Ok(Config {
            host: env_or("APP_HOST", defaults.host)?,
            port: env_or("APP_PORT", defaults.port)?,
            max_file_size: env_or("MAX_FILE_SIZE", defaults.max_file_size)?,
            preview_rows,
            session_ttl: Duration::from_secs(env_or(
                "SESSION_TTL_SECS",
                defaults.session_ttl.as_secs(),
            )?),
            max_sessions: env_or("MAX_SESSIONS", defaults.max_sessions)?,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Failed to parse {}={:?}", key, raw)),
        Err(_) => Ok(default),
    }
}

pub fn load_config() -> Result<Config> {
    let config = Config::from_env()?;
    tracing::info!(
        "Configuration loaded: addr={}, max_file_size={}B, preview_rows={}, session_ttl={:?}",
        config.socket_addr(),
        config.max_file_size,
        config.preview_rows,
        config.session_ttl
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_or_falls_back_to_default() {
        let value: usize = env_or("SHEET_EXPLORER_TEST_UNSET_KEY", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_env_or_reports_bad_values() {
        std::env::set_var("SHEET_EXPLORER_TEST_BAD_PORT", "not-a-port");
        let err = env_or::<u16>("SHEET_EXPLORER_TEST_BAD_PORT", 3000).unwrap_err();
        assert!(err.to_string().contains("SHEET_EXPLORER_TEST_BAD_PORT"));
    }

    #[test]
    fn test_default_socket_addr() {
        let config = Config::default();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.max_file_size, 10 * 1024 * 1024);
    }
}
