use crate::config::Settings;
use crate::domain::instrument::{Fundamentals, MarketSnapshot};
use crate::domain::tier::ReferenceIndex;
use crate::error::QuoteError;
use crate::ingest::types::{
    FundamentalsResponse, InstrumentSnapshotResponse, QuarterlyFiguresResponse, QuoteResponse,
};
use crate::time::is_weekday;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;

/// Historical closing quotes. Retry policy belongs to the implementation.
#[async_trait::async_trait]
pub trait QuoteSource: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn quote(&self, symbol: &str, date: NaiveDate) -> Result<f64, QuoteError>;

    async fn reference_index_quote(
        &self,
        index: ReferenceIndex,
        date: NaiveDate,
    ) -> Result<f64, QuoteError> {
        self.quote(index.symbol(), date).await
    }
}

#[async_trait::async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn snapshot(&self, symbol: &str) -> Result<MarketSnapshot>;
}

#[async_trait::async_trait]
pub trait FundamentalsSource: Send + Sync {
    async fn fundamentals(&self, symbol: &str) -> Result<Fundamentals>;
}

#[async_trait::async_trait]
pub trait CalendarSource: Send + Sync {
    async fn quarterly_release_dates(&self, symbol: &str) -> Result<Vec<NaiveDate>>;

    async fn last_quarterly_release_date(
        &self,
        symbol: &str,
        today: NaiveDate,
    ) -> Result<Option<NaiveDate>> {
        let dates = self.quarterly_release_dates(symbol).await?;
        Ok(dates.into_iter().filter(|d| *d <= today).max())
    }
}

/// Rejects weekend dates before any lookup is attempted.
pub fn ensure_weekday(date: NaiveDate) -> Result<(), QuoteError> {
    if is_weekday(date) {
        Ok(())
    } else {
        Err(QuoteError::Weekend { date })
    }
}

/// A close of zero, below zero or non-finite is a data error, never a usable quote.
pub fn validate_price(symbol: &str, date: NaiveDate, price: f64) -> Result<f64, QuoteError> {
    if price.is_finite() && price > 0.0 {
        Ok(price)
    } else {
        Err(QuoteError::InvalidPrice {
            symbol: symbol.to_string(),
            date,
            price,
        })
    }
}

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 3;

/// JSON market-data API client implementing every collaborator trait.
#[derive(Debug)]
pub struct HttpJsonMarketData {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
    retries: u32,

    // Quotes are immutable history; cache them for the lifetime of the process.
    quote_cache: tokio::sync::Mutex<HashMap<(String, NaiveDate), f64>>,
}

impl HttpJsonMarketData {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_market_data_base_url()?;
        let base_url = Url::parse(base_url)
            .with_context(|| format!("MARKET_DATA_BASE_URL is not a valid URL: {base_url}"))?;
        anyhow::ensure!(
            !base_url.cannot_be_a_base(),
            "MARKET_DATA_BASE_URL cannot be used as a base URL"
        );

        let timeout_secs = settings
            .market_data_timeout_secs
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let retries = settings.market_data_retries.unwrap_or(DEFAULT_RETRIES).max(1);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build market data http client")?;

        Ok(Self {
            http,
            base_url,
            api_key: settings.market_data_api_key.clone(),
            retries,
            quote_cache: tokio::sync::Mutex::new(HashMap::new()),
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            headers.insert("x-api-key", HeaderValue::from_str(api_key)?);
        }
        Ok(headers)
    }

    /// `Ok(None)` when the resource does not exist (HTTP 404).
    async fn fetch_once<T: DeserializeOwned>(
        &self,
        url: &Url,
        query: &[(&str, String)],
    ) -> Result<Option<T>> {
        let res = self
            .http
            .get(url.clone())
            .headers(self.headers()?)
            .query(query)
            .send()
            .await
            .context("market data request failed")?;

        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let text = res
            .text()
            .await
            .context("failed to read market data response")?;
        if !status.is_success() {
            anyhow::bail!("market data HTTP {status}: {text}");
        }

        let parsed = serde_json::from_str::<T>(&text)
            .with_context(|| format!("market data response has unexpected shape: {text}"))?;
        Ok(Some(parsed))
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<Option<T>> {
        let url = self.url(segments);
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_once(&url, query).await {
                Ok(body) => return Ok(body),
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err);
                    }
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(attempt, ?backoff, %url, error = %err, "market data fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl QuoteSource for HttpJsonMarketData {
    fn provider_name(&self) -> &'static str {
        "external_http_json"
    }

    async fn quote(&self, symbol: &str, date: NaiveDate) -> Result<f64, QuoteError> {
        ensure_weekday(date)?;

        let key = (symbol.to_string(), date);
        if let Some(price) = self.quote_cache.lock().await.get(&key) {
            tracing::debug!(%symbol, %date, price, "quote cache hit");
            return Ok(*price);
        }

        let body: Option<QuoteResponse> = self
            .fetch_json(&["v1", "quotes", symbol], &[("date", date.to_string())])
            .await?;
        let Some(body) = body else {
            return Err(QuoteError::NoData {
                symbol: symbol.to_string(),
                date,
            });
        };

        if body.date != date {
            return Err(QuoteError::NoData {
                symbol: symbol.to_string(),
                date,
            });
        }
        let price = validate_price(symbol, date, body.close)?;

        tracing::debug!(%symbol, %date, price, "fetched quote");
        self.quote_cache.lock().await.insert(key, price);
        Ok(price)
    }
}

#[async_trait::async_trait]
impl SnapshotSource for HttpJsonMarketData {
    async fn snapshot(&self, symbol: &str) -> Result<MarketSnapshot> {
        let body: InstrumentSnapshotResponse = self
            .fetch_json(&["v1", "instruments", symbol], &[])
            .await?
            .with_context(|| format!("unknown instrument {symbol}"))?;
        body.validate_and_into_snapshot(symbol)
    }
}

#[async_trait::async_trait]
impl FundamentalsSource for HttpJsonMarketData {
    async fn fundamentals(&self, symbol: &str) -> Result<Fundamentals> {
        let body: FundamentalsResponse = self
            .fetch_json(&["v1", "fundamentals", symbol], &[])
            .await?
            .with_context(|| format!("no fundamentals for {symbol}"))?;
        body.validate_and_into_fundamentals(symbol)
    }
}

#[async_trait::async_trait]
impl CalendarSource for HttpJsonMarketData {
    async fn quarterly_release_dates(&self, symbol: &str) -> Result<Vec<NaiveDate>> {
        let body: Option<QuarterlyFiguresResponse> = self
            .fetch_json(&["v1", "calendar", symbol, "quarterly-figures"], &[])
            .await?;
        match body {
            Some(body) => body.validate_and_into_dates(symbol),
            // No known release dates; the reaction criterion degrades to neutral.
            None => Ok(Vec::new()),
        }
    }
}
