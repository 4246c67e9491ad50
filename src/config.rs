use std::{net::SocketAddr, path::PathBuf, str::FromStr};

use anyhow::Context;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Backend {
    Sql,
    Json,
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sql" => Ok(Backend::Sql),
            "json" => Ok(Backend::Json),
            other => anyhow::bail!("unknown movie backend '{other}', expected 'sql' or 'json'"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub backend: Backend,
    pub database_url: String,
    pub movies_json_path: PathBuf,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "1234".to_string()).parse().context("PORT")?;

        let backend: Backend = std::env::var("MOVIES_BACKEND")
            .unwrap_or_else(|_| "sql".to_string())
            .parse()
            .context("MOVIES_BACKEND")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://movies.db?mode=rwc".to_string());

        let movies_json_path = std::env::var("MOVIES_JSON_PATH")
            .unwrap_or_else(|_| "data/movies.json".to_string())
            .into();

        let cors_origins = parse_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://127.0.0.1:5500".to_string()),
        );

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            backend,
            database_url,
            movies_json_path,
            cors_origins,
        })
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|o| !o.is_empty()).map(str::to_string).collect()
}
