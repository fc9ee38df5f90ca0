use crate::core::{AppError, Result};
use serde::Deserialize;
use std::env;

pub mod database;
pub mod server;

pub use database::DatabaseConfig;
pub use server::ServerConfig;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub log_level: String,
    /// Window (in days) for the "due this week" receivables KPI
    pub due_soon_window_days: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let config = Config {
            app: AppConfig {
                env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
                due_soon_window_days: env::var("DUE_SOON_WINDOW_DAYS")
                    .unwrap_or_else(|_| "7".to_string())
                    .parse()
                    .map_err(|_| {
                        AppError::Configuration("Invalid DUE_SOON_WINDOW_DAYS".to_string())
                    })?,
            },
            database: DatabaseConfig::from_env()?,
            server: ServerConfig::from_env()?,
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.app.due_soon_window_days == 0 {
            return Err(AppError::Configuration(
                "Due-soon window must be greater than 0 days".to_string(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(AppError::Configuration(
                "Database max connections must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
