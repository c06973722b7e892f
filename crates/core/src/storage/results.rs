use crate::domain::history::History;
use crate::domain::instrument::{InstrumentHeader, Money};
use crate::domain::result::{EvaluationResult, LevermannRatings};
use crate::domain::tier::Tier;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Persisted history of one symbol plus the header of its most recent row.
#[derive(Debug, Clone, Default)]
pub struct StoredHistory {
    pub header: Option<InstrumentHeader>,
    pub history: History,
}

impl StoredHistory {
    pub fn tier(&self) -> Option<Tier> {
        self.header.as_ref().map(|h| h.tier)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SymbolSummary {
    pub symbol: String,
    pub name: String,
    pub tier: String,
    pub score: i32,
    pub evaluated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ResultRow {
    symbol: String,
    name: String,
    tier: String,
    quote: f64,
    currency: String,
    market_cap: f64,
    evaluated_at: DateTime<Utc>,
    score: i32,
    ratings: serde_json::Value,
}

impl ResultRow {
    fn header(&self) -> anyhow::Result<InstrumentHeader> {
        let tier: Tier = self
            .tier
            .parse()
            .with_context(|| format!("stored tier of {} is invalid", self.symbol))?;
        Ok(InstrumentHeader {
            symbol: self.symbol.clone(),
            name: self.name.clone(),
            tier,
            quote: Money::new(self.quote, self.currency.clone()),
            market_cap: self.market_cap,
        })
    }

    /// Rejects rows whose stored score disagrees with their stored ratings.
    fn to_result(&self) -> anyhow::Result<EvaluationResult> {
        let ratings: LevermannRatings = serde_json::from_value(self.ratings.clone())
            .with_context(|| format!("stored ratings of {} have unexpected shape", self.symbol))?;
        EvaluationResult::restore(self.evaluated_at, ratings, self.score).with_context(|| {
            format!(
                "stored result of {} at {} is inconsistent",
                self.symbol, self.evaluated_at
            )
        })
    }
}

pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

fn into_stored_history(rows: Vec<ResultRow>) -> anyhow::Result<StoredHistory> {
    let header = rows.last().map(ResultRow::header).transpose()?;
    let results = rows
        .iter()
        .map(ResultRow::to_result)
        .collect::<anyhow::Result<Vec<_>>>()?;
    let history = History::from_results(results)?;
    Ok(StoredHistory { header, history })
}

pub async fn load_history(pool: &sqlx::PgPool, symbol: &str) -> anyhow::Result<StoredHistory> {
    let symbol = normalize_symbol(symbol);
    let rows: Vec<ResultRow> = sqlx::query_as(
        "SELECT symbol, name, tier, quote, currency, market_cap, evaluated_at, score, ratings \
         FROM levermann_results \
         WHERE symbol = $1 \
         ORDER BY evaluated_at ASC, inserted_at ASC",
    )
    .bind(&symbol)
    .fetch_all(pool)
    .await
    .with_context(|| format!("select levermann_results for {symbol} failed"))?;

    tracing::debug!(%symbol, rows = rows.len(), "loaded history");
    into_stored_history(rows)
}

/// Appends one accepted result. A single INSERT; partial writes cannot occur.
pub async fn append_result(
    pool: &sqlx::PgPool,
    header: &InstrumentHeader,
    result: &EvaluationResult,
) -> anyhow::Result<Uuid> {
    let ratings =
        serde_json::to_value(result.ratings()).context("failed to serialize ratings")?;

    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO levermann_results \
         (id, symbol, name, tier, quote, currency, market_cap, evaluated_at, score, ratings) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(normalize_symbol(&header.symbol))
    .bind(&header.name)
    .bind(header.tier.as_str())
    .bind(header.quote.amount)
    .bind(&header.quote.currency)
    .bind(header.market_cap)
    .bind(result.timestamp())
    .bind(result.score())
    .bind(ratings)
    .fetch_one(pool)
    .await
    .with_context(|| format!("insert levermann_results for {} failed", header.symbol))?;

    Ok(id)
}

/// Latest stored result per symbol.
pub async fn list_symbols(pool: &sqlx::PgPool) -> anyhow::Result<Vec<SymbolSummary>> {
    let rows: Vec<SymbolSummary> = sqlx::query_as(
        "SELECT DISTINCT ON (symbol) symbol, name, tier, score, evaluated_at \
         FROM levermann_results \
         ORDER BY symbol, evaluated_at DESC, inserted_at DESC",
    )
    .fetch_all(pool)
    .await
    .context("select latest levermann_results failed")?;
    Ok(rows)
}
