use std::env;
use std::time::Duration;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub token_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub app_key: Option<String>,
    pub tavily_api_key: Option<String>,
    pub tavily_base_url: String,
    pub azure_endpoint: Option<String>,
    pub azure_api_version: String,
    pub chat_model: String,
    pub search_delay: Duration,
    pub otel_service_name: String,
    pub otel_exporter_endpoint: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            port: env::var("APP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("APP_PORT must be a number")?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            token_url: non_empty("OAUTH_TOKEN_URL"),
            client_id: non_empty("CLIENT_ID"),
            client_secret: non_empty("CLIENT_SECRET"),
            app_key: non_empty("APP_KEY"),
            tavily_api_key: non_empty("TAVILY_API_KEY"),
            tavily_base_url: env::var("TAVILY_BASE_URL")
                .unwrap_or_else(|_| "https://api.tavily.com".to_string()),
            azure_endpoint: non_empty("AZURE_OPENAI_ENDPOINT"),
            azure_api_version: env::var("AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|_| "2024-08-01-preview".to_string()),
            chat_model: env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            search_delay: Duration::from_millis(
                env::var("SEARCH_DELAY_MS")
                    .unwrap_or_else(|_| "1000".to_string())
                    .parse()
                    .context("SEARCH_DELAY_MS must be a number")?,
            ),
            otel_service_name: env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| "company-research".to_string()),
            otel_exporter_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4317".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
