//! Runtime configuration, read from the environment (and `.env` if present).

use std::{net::SocketAddr, path::PathBuf};

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub media_dir: PathBuf,
    pub session_idle: time::Duration,
    pub secure_cookies: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Config> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Config> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        let bind_addr = var("BIND_ADDR", "0.0.0.0:8080");
        let bind_addr = bind_addr
            .parse()
            .with_context(|| format!("BIND_ADDR: can't parse {bind_addr:?}"))?;

        let idle = var("SESSION_IDLE_MINUTES", "60");
        let idle: i64 = idle
            .parse()
            .with_context(|| format!("SESSION_IDLE_MINUTES: can't parse {idle:?}"))?;

        let secure = var("SECURE_COOKIES", "false");
        let secure_cookies = match secure.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" | "" => false,
            _ => anyhow::bail!("SECURE_COOKIES: expected true/false, got {secure:?}"),
        };

        Ok(Config {
            database_url: var("DATABASE_URL", "sqlite://roomboard.db"),
            bind_addr,
            media_dir: PathBuf::from(var("MEDIA_DIR", "media")),
            session_idle: time::Duration::minutes(idle),
            secure_cookies,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.database_url, "sqlite://roomboard.db");
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.media_dir, PathBuf::from("media"));
        assert_eq!(config.session_idle, time::Duration::minutes(60));
        assert!(!config.secure_cookies);
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("BIND_ADDR", "127.0.0.1:3000"),
            ("SESSION_IDLE_MINUTES", "5"),
            ("SECURE_COOKIES", "TRUE"),
            ("MEDIA_DIR", "/tmp/avatars"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:3000");
        assert_eq!(config.session_idle, time::Duration::minutes(5));
        assert!(config.secure_cookies);
        assert_eq!(config.media_dir, PathBuf::from("/tmp/avatars"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(config(&[("BIND_ADDR", "nowhere")]).is_err());
        assert!(config(&[("SESSION_IDLE_MINUTES", "soon")]).is_err());
        assert!(config(&[("SECURE_COOKIES", "maybe")]).is_err());
    }
}
