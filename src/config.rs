use anyhow::{Context, Result};
use std::env;

/// Connection string used when MONGODB_URI is not set.
const DEFAULT_DATABASE_URL: &str = "mongodb://localhost:27017/postdb";

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub environment: Environment,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Local,
    Production,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("PORT must be a valid port number")?;

        let database_url =
            env::var("MONGODB_URI").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let environment = match env::var("ENV")
            .unwrap_or_else(|_| "local".to_string())
            .as_str()
        {
            "production" | "prod" => Environment::Production,
            _ => Environment::Local,
        };

        let config = Config {
            port,
            database_url,
            environment,
        };
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("PORT must be greater than 0");
        }

        if !self.database_url.starts_with("mongodb://")
            && !self.database_url.starts_with("mongodb+srv://")
        {
            anyhow::bail!("MONGODB_URI must start with 'mongodb://' or 'mongodb+srv://'");
        }

        Ok(())
    }
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Environment::Local)
    }
}
