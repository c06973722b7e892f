use crate::analysis::criteria;
use crate::analysis::market::{self, ONE_YEAR_DAYS, SIX_MONTHS_DAYS};
use crate::analysis::quotes::QuoteLookup;
use crate::domain::history::History;
use crate::domain::instrument::Instrument;
use crate::domain::rating::CriteriaRating;
use crate::domain::recommendation::{recommendation, Recommendation};
use crate::domain::result::{EvaluationResult, LevermannRatings};
use crate::domain::tier::Tier;
use crate::error::EngineError;
use crate::ingest::provider::QuoteSource;
use chrono::{DateTime, NaiveDate, Utc};

/// Ratings that depend only on the instrument and quote lookups.
#[derive(Debug, Clone)]
struct IndependentRatings {
    return_on_equity: CriteriaRating,
    ebit_margin: CriteriaRating,
    equity_ratio: CriteriaRating,
    price_earnings_ratio: CriteriaRating,
    five_year_price_earnings_ratio: CriteriaRating,
    analyst_rating: CriteriaRating,
    quarterly_figures_reaction: CriteriaRating,
    quote_change_6month: CriteriaRating,
    quote_change_1year: CriteriaRating,
    three_month_reversal: CriteriaRating,
    earnings_growth: CriteriaRating,
    earnings_revision: CriteriaRating,
}

impl IndependentRatings {
    async fn evaluate(
        instrument: &Instrument,
        lookup: QuoteLookup<'_>,
        today: NaiveDate,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            return_on_equity: criteria::return_on_equity(instrument, today),
            ebit_margin: criteria::ebit_margin(instrument, today),
            equity_ratio: criteria::equity_ratio(instrument, today),
            price_earnings_ratio: criteria::price_earnings_ratio(instrument, today),
            five_year_price_earnings_ratio: criteria::five_year_price_earnings_ratio(
                instrument, today,
            ),
            analyst_rating: criteria::analyst_rating(instrument),
            quarterly_figures_reaction: market::quarterly_figures_reaction(
                lookup, instrument, today,
            )
            .await?,
            quote_change_6month: market::quote_change(lookup, instrument, today, SIX_MONTHS_DAYS)
                .await?,
            quote_change_1year: market::quote_change(lookup, instrument, today, ONE_YEAR_DAYS)
                .await?,
            three_month_reversal: market::three_month_reversal(lookup, instrument, today).await?,
            earnings_growth: criteria::earnings_growth(instrument, today),
            earnings_revision: criteria::earnings_revision(instrument, today),
        })
    }

    /// Second phase: criteria combining first-phase points.
    fn with_dependent(self) -> LevermannRatings {
        let momentum = criteria::momentum(
            self.quote_change_6month.points(),
            self.quote_change_1year.points(),
        );
        LevermannRatings {
            return_on_equity: self.return_on_equity,
            ebit_margin: self.ebit_margin,
            equity_ratio: self.equity_ratio,
            price_earnings_ratio: self.price_earnings_ratio,
            five_year_price_earnings_ratio: self.five_year_price_earnings_ratio,
            analyst_rating: self.analyst_rating,
            quarterly_figures_reaction: self.quarterly_figures_reaction,
            quote_change_6month: self.quote_change_6month,
            quote_change_1year: self.quote_change_1year,
            momentum,
            three_month_reversal: self.three_month_reversal,
            earnings_growth: self.earnings_growth,
            earnings_revision: self.earnings_revision,
        }
    }
}

/// Runs all thirteen criteria for `instrument` as of `today`.
///
/// Any quote failure aborts the whole computation; no partial ratings are returned.
pub async fn compute_ratings(
    instrument: &Instrument,
    quotes: &dyn QuoteSource,
    today: NaiveDate,
) -> Result<LevermannRatings, EngineError> {
    let lookup = QuoteLookup::new(quotes);
    let independent = IndependentRatings::evaluate(instrument, lookup, today).await?;
    Ok(independent.with_dependent())
}

/// Scoring state of one instrument: its history and the tier of its latest snapshot.
#[derive(Debug, Clone)]
pub struct Levermann {
    symbol: String,
    tier: Option<Tier>,
    history: History,
}

impl Levermann {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self::with_history(symbol, None, History::new())
    }

    pub fn with_history(symbol: impl Into<String>, tier: Option<Tier>, history: History) -> Self {
        Self {
            symbol: symbol.into(),
            tier,
            history,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn tier(&self) -> Option<Tier> {
        self.tier
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn latest(&self) -> Option<&EvaluationResult> {
        self.history.latest()
    }

    pub fn outdated(&self) -> bool {
        self.history.outdated()
    }

    pub fn outdated_at(&self, now: DateTime<Utc>) -> bool {
        self.history.outdated_at(now)
    }

    pub async fn evaluate(
        &mut self,
        instrument: &Instrument,
        quotes: &dyn QuoteSource,
    ) -> Result<bool, EngineError> {
        self.evaluate_at(instrument, quotes, Utc::now()).await
    }

    /// Scores `instrument` at `now` and appends the result unless it is redundant.
    /// Returns whether the result was appended.
    pub async fn evaluate_at(
        &mut self,
        instrument: &Instrument,
        quotes: &dyn QuoteSource,
        now: DateTime<Utc>,
    ) -> Result<bool, EngineError> {
        if !instrument.symbol().eq_ignore_ascii_case(&self.symbol) {
            return Err(EngineError::Precondition(format!(
                "instrument {} evaluated against history of {}",
                instrument.symbol(),
                self.symbol
            )));
        }

        let ratings = compute_ratings(instrument, quotes, now.date_naive()).await?;
        let result = EvaluationResult::new(now, ratings);
        let score = result.score();

        let appended = self.history.push_if_novel(result)?;
        self.tier = Some(instrument.tier());

        tracing::info!(
            symbol = %self.symbol,
            tier = %instrument.tier(),
            provider = quotes.provider_name(),
            score,
            appended,
            history_len = self.history.len(),
            "levermann evaluation finished"
        );
        Ok(appended)
    }

    pub fn recommendation(&self) -> Result<Recommendation, EngineError> {
        let tier = self.tier.ok_or_else(|| {
            EngineError::Precondition(format!(
                "no tier known for {}; evaluate it first",
                self.symbol
            ))
        })?;
        Ok(recommendation(&self.history, tier))
    }
}
