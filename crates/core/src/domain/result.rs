use crate::domain::rating::CriteriaRating;
use crate::error::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    ReturnOnEquity,
    EbitMargin,
    EquityRatio,
    PriceEarningsRatio,
    FiveYearPriceEarningsRatio,
    AnalystRating,
    QuarterlyFiguresReaction,
    QuoteChange6Month,
    QuoteChange1Year,
    Momentum,
    ThreeMonthReversal,
    EarningsGrowth,
    EarningsRevision,
}

impl Criterion {
    pub const ALL: [Criterion; 13] = [
        Criterion::ReturnOnEquity,
        Criterion::EbitMargin,
        Criterion::EquityRatio,
        Criterion::PriceEarningsRatio,
        Criterion::FiveYearPriceEarningsRatio,
        Criterion::AnalystRating,
        Criterion::QuarterlyFiguresReaction,
        Criterion::QuoteChange6Month,
        Criterion::QuoteChange1Year,
        Criterion::Momentum,
        Criterion::ThreeMonthReversal,
        Criterion::EarningsGrowth,
        Criterion::EarningsRevision,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Criterion::ReturnOnEquity => "RoE",
            Criterion::EbitMargin => "EBIT margin",
            Criterion::EquityRatio => "Equity ratio",
            Criterion::PriceEarningsRatio => "Price earnings ratio",
            Criterion::FiveYearPriceEarningsRatio => "5y price earnings ratio",
            Criterion::AnalystRating => "Analyst rating",
            Criterion::QuarterlyFiguresReaction => "Quarterly figures reaction",
            Criterion::QuoteChange6Month => "6 month quote movement",
            Criterion::QuoteChange1Year => "1 year quote movement",
            Criterion::Momentum => "Momentum (6m, 1y points)",
            Criterion::ThreeMonthReversal => "3 month reversal",
            Criterion::EarningsGrowth => "EPS growth",
            Criterion::EarningsRevision => "Earnings revision (cur, next)",
        }
    }
}

/// One rating per criterion; every field is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevermannRatings {
    pub return_on_equity: CriteriaRating,
    pub ebit_margin: CriteriaRating,
    pub equity_ratio: CriteriaRating,
    pub price_earnings_ratio: CriteriaRating,
    pub five_year_price_earnings_ratio: CriteriaRating,
    pub analyst_rating: CriteriaRating,
    pub quarterly_figures_reaction: CriteriaRating,
    pub quote_change_6month: CriteriaRating,
    pub quote_change_1year: CriteriaRating,
    pub momentum: CriteriaRating,
    pub three_month_reversal: CriteriaRating,
    pub earnings_growth: CriteriaRating,
    pub earnings_revision: CriteriaRating,
}

impl LevermannRatings {
    pub fn get(&self, criterion: Criterion) -> &CriteriaRating {
        match criterion {
            Criterion::ReturnOnEquity => &self.return_on_equity,
            Criterion::EbitMargin => &self.ebit_margin,
            Criterion::EquityRatio => &self.equity_ratio,
            Criterion::PriceEarningsRatio => &self.price_earnings_ratio,
            Criterion::FiveYearPriceEarningsRatio => &self.five_year_price_earnings_ratio,
            Criterion::AnalystRating => &self.analyst_rating,
            Criterion::QuarterlyFiguresReaction => &self.quarterly_figures_reaction,
            Criterion::QuoteChange6Month => &self.quote_change_6month,
            Criterion::QuoteChange1Year => &self.quote_change_1year,
            Criterion::Momentum => &self.momentum,
            Criterion::ThreeMonthReversal => &self.three_month_reversal,
            Criterion::EarningsGrowth => &self.earnings_growth,
            Criterion::EarningsRevision => &self.earnings_revision,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Criterion, &CriteriaRating)> + '_ {
        Criterion::ALL.into_iter().map(move |c| (c, self.get(c)))
    }

    pub fn total(&self) -> i32 {
        self.iter().map(|(_, r)| r.points().value()).sum()
    }
}

/// Immutable snapshot of one evaluation run. The score is fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredEvaluationResult")]
pub struct EvaluationResult {
    timestamp: DateTime<Utc>,
    ratings: LevermannRatings,
    score: i32,
}

#[derive(Deserialize)]
struct StoredEvaluationResult {
    timestamp: DateTime<Utc>,
    ratings: LevermannRatings,
    score: i32,
}

impl TryFrom<StoredEvaluationResult> for EvaluationResult {
    type Error = EngineError;

    fn try_from(s: StoredEvaluationResult) -> Result<Self, Self::Error> {
        Self::restore(s.timestamp, s.ratings, s.score)
    }
}

impl EvaluationResult {
    pub fn new(timestamp: DateTime<Utc>, ratings: LevermannRatings) -> Self {
        let score = ratings.total();
        Self {
            timestamp,
            ratings,
            score,
        }
    }

    /// Rebuilds a persisted result, rejecting it when the stored score disagrees with its ratings.
    pub fn restore(
        timestamp: DateTime<Utc>,
        ratings: LevermannRatings,
        stored_score: i32,
    ) -> Result<Self, EngineError> {
        let result = Self::new(timestamp, ratings);
        if result.score != stored_score {
            return Err(EngineError::InvalidData(format!(
                "stored score {stored_score} does not match rating sum {}",
                result.score
            )));
        }
        Ok(result)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn ratings(&self) -> &LevermannRatings {
        &self.ratings
    }

    pub fn rating(&self, criterion: Criterion) -> &CriteriaRating {
        self.ratings.get(criterion)
    }

    pub fn score(&self) -> i32 {
        self.score
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::ratings_with_score;
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 18, 0, 0).unwrap()
    }

    #[test]
    fn score_is_sum_of_points() {
        for score in [-13, -4, 0, 3, 13] {
            let result = EvaluationResult::new(ts(), ratings_with_score(score));
            assert_eq!(result.score(), score);
            let post_hoc: i32 = result
                .ratings()
                .iter()
                .map(|(_, r)| r.points().value())
                .sum();
            assert_eq!(post_hoc, result.score());
        }
    }

    #[test]
    fn iterates_all_thirteen_criteria_in_order() {
        let ratings = ratings_with_score(0);
        let criteria: Vec<_> = ratings.iter().map(|(c, _)| c).collect();
        assert_eq!(criteria, Criterion::ALL.to_vec());
    }

    #[test]
    fn serde_round_trip_keeps_score() {
        let result = EvaluationResult::new(ts(), ratings_with_score(5));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["score"], 5);
        let back: EvaluationResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn rejects_tampered_score() {
        let result = EvaluationResult::new(ts(), ratings_with_score(5));
        let mut json = serde_json::to_value(&result).unwrap();
        json["score"] = serde_json::json!(6);
        assert!(serde_json::from_value::<EvaluationResult>(json).is_err());
        assert!(EvaluationResult::restore(ts(), ratings_with_score(5), 6).is_err());
    }
}
