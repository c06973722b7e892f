pub mod analysis;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod storage;
pub mod time;

pub mod config {
    use crate::domain::instrument::Eligibility;
    use anyhow::Context;

    #[derive(Debug, Clone, Default)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub market_data_base_url: Option<String>,
        pub market_data_api_key: Option<String>,
        pub market_data_timeout_secs: Option<u64>,
        pub market_data_retries: Option<u32>,
        /// `None` keeps the default suffix rule; `Some("")` disables it.
        pub symbol_suffix: Option<String>,
        pub symbols: Vec<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                market_data_base_url: std::env::var("MARKET_DATA_BASE_URL").ok(),
                market_data_api_key: std::env::var("MARKET_DATA_API_KEY").ok(),
                market_data_timeout_secs: parse_env("MARKET_DATA_TIMEOUT_SECS")?,
                market_data_retries: parse_env("MARKET_DATA_RETRIES")?,
                symbol_suffix: std::env::var("LEVERMANN_SYMBOL_SUFFIX").ok(),
                symbols: std::env::var("LEVERMANN_SYMBOLS")
                    .map(|s| parse_symbols(&s))
                    .unwrap_or_default(),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_market_data_base_url(&self) -> anyhow::Result<&str> {
            self.market_data_base_url
                .as_deref()
                .context("MARKET_DATA_BASE_URL is required")
        }

        pub fn eligibility(&self) -> Eligibility {
            match self.symbol_suffix.as_deref().map(str::trim) {
                None => Eligibility::default(),
                Some("") => Eligibility::any(),
                Some(suffix) => Eligibility {
                    symbol_suffix: Some(suffix.to_string()),
                },
            }
        }
    }

    fn parse_env<T: std::str::FromStr>(key: &str) -> anyhow::Result<Option<T>> {
        match std::env::var(key) {
            Ok(s) if !s.trim().is_empty() => s
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|_| anyhow::anyhow!("{key} is not a valid value: {s}")),
            _ => Ok(None),
        }
    }

    pub fn parse_symbols(s: &str) -> Vec<String> {
        s.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }

}
