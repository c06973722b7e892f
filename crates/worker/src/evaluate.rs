use anyhow::Context;
use levermann_core::analysis::Levermann;
use levermann_core::config::Settings;
use levermann_core::domain::instrument::{Eligibility, Instrument};
use levermann_core::domain::recommendation::Recommendation;
use levermann_core::ingest::provider::HttpJsonMarketData;
use levermann_core::storage::{self, StoredHistory};
use sqlx::PgPool;

#[derive(Debug, Clone, Copy)]
pub struct Options {
    pub force: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Another run holds the symbol's lock.
    Locked,
    /// Stored history is recent enough; nothing was fetched.
    Fresh,
    Evaluated {
        appended: bool,
        score: i32,
        recommendation: Recommendation,
    },
}

/// Evaluates every symbol; a failing symbol does not stop the others.
pub async fn run(
    settings: &Settings,
    pool: Option<&PgPool>,
    symbols: &[String],
    opts: Options,
) -> anyhow::Result<()> {
    let market = HttpJsonMarketData::from_settings(settings)?;
    let eligibility = settings.eligibility();

    let mut failures = 0usize;
    for symbol in symbols {
        match evaluate_symbol(pool, &market, &eligibility, symbol, opts).await {
            Ok(Outcome::Evaluated {
                appended,
                score,
                recommendation,
            }) => {
                tracing::info!(
                    %symbol,
                    score,
                    appended,
                    %recommendation,
                    dry_run = opts.dry_run,
                    "symbol evaluated"
                );
            }
            Ok(Outcome::Fresh) => {
                tracing::info!(%symbol, "history is fresh; skipped (use --force to re-evaluate)");
            }
            Ok(Outcome::Locked) => {
                tracing::warn!(%symbol, "symbol lock not acquired; another run in progress");
            }
            Err(err) => {
                failures += 1;
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(%symbol, error = %format!("{err:#}"), "evaluation failed");
            }
        }
    }

    anyhow::ensure!(
        failures == 0,
        "{failures} of {} symbols failed to evaluate",
        symbols.len()
    );
    Ok(())
}

async fn evaluate_symbol(
    pool: Option<&PgPool>,
    market: &HttpJsonMarketData,
    eligibility: &Eligibility,
    symbol: &str,
    opts: Options,
) -> anyhow::Result<Outcome> {
    let Some(pool) = pool else {
        return evaluate_locked(None, market, eligibility, symbol, opts).await;
    };

    let Some(lock) = storage::try_acquire_symbol_lock(pool, symbol).await? else {
        return Ok(Outcome::Locked);
    };

    let res = evaluate_locked(Some(pool), market, eligibility, symbol, opts).await;

    if let Err(err) = lock.release().await {
        tracing::warn!(%symbol, error = %err, "failed to release symbol lock");
    }
    res
}

async fn evaluate_locked(
    pool: Option<&PgPool>,
    market: &HttpJsonMarketData,
    eligibility: &Eligibility,
    symbol: &str,
    opts: Options,
) -> anyhow::Result<Outcome> {
    let stored = match pool {
        Some(pool) => storage::load_history(pool, symbol).await?,
        None => StoredHistory::default(),
    };
    let mut engine = Levermann::with_history(symbol, stored.tier(), stored.history);

    if !opts.force && !engine.outdated() {
        return Ok(Outcome::Fresh);
    }

    let instrument = Instrument::load(symbol, market, eligibility).await?;
    let appended = engine
        .evaluate(&instrument, market)
        .await
        .with_context(|| format!("failed to evaluate {symbol}"))?;

    let latest = engine
        .latest()
        .with_context(|| format!("history of {symbol} is empty after evaluation"))?;

    if appended {
        if let Some(pool) = pool {
            let id = storage::append_result(pool, &instrument.header(), latest).await?;
            tracing::debug!(%symbol, %id, "persisted evaluation result");
        }
    }

    Ok(Outcome::Evaluated {
        appended,
        score: latest.score(),
        recommendation: engine.recommendation()?,
    })
}
