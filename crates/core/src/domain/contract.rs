use crate::domain::instrument::{AnalystRatings, EpsEstimate, Fundamentals, MarketSnapshot, Money};
use crate::ingest::types::{
    FundamentalsResponse, InstrumentSnapshotResponse, QuarterlyFiguresResponse,
};
use anyhow::ensure;
use chrono::NaiveDate;

impl InstrumentSnapshotResponse {
    pub fn validate_and_into_snapshot(self, expected_symbol: &str) -> anyhow::Result<MarketSnapshot> {
        ensure_symbol(&self.symbol, expected_symbol)?;

        let name = self.name.trim().to_string();
        ensure!(!name.is_empty(), "name must be non-empty");

        let currency = self.currency.trim().to_ascii_uppercase();
        ensure!(
            currency.len() == 3,
            "currency must be a 3-letter code (got {:?})",
            self.currency
        );
        ensure!(
            self.previous_close.is_finite() && self.previous_close > 0.0,
            "previous close must be positive (got {})",
            self.previous_close
        );
        ensure!(
            self.market_cap.is_finite(),
            "market cap must be finite (got {})",
            self.market_cap
        );

        Ok(MarketSnapshot {
            name,
            quote: Money::new(self.previous_close, currency),
            market_cap: self.market_cap,
        })
    }
}

impl FundamentalsResponse {
    pub fn validate_and_into_fundamentals(self, expected_symbol: &str) -> anyhow::Result<Fundamentals> {
        ensure_symbol(&self.symbol, expected_symbol)?;

        let mut eps = std::collections::BTreeMap::new();
        for (year, revisions) in self.eps {
            // Years without any estimate are treated as absent.
            if revisions.is_empty() {
                continue;
            }
            let mut out = Vec::with_capacity(revisions.len());
            for r in revisions {
                ensure!(r.value.is_finite(), "EPS for {year} must be finite");
                out.push(EpsEstimate {
                    value: Money::new(r.value, r.currency.trim().to_ascii_uppercase()),
                    revision_date: r.revision_date,
                });
            }
            eps.insert(year, out);
        }

        Ok(Fundamentals {
            roe: self.roe,
            ebit_margin: self.ebit_margin,
            equity_ratio: self.equity_ratio,
            eps,
            analyst_ratings: self.analyst_ratings.map(|a| AnalystRatings {
                buy: a.buy,
                hold: a.hold,
                sell: a.sell,
            }),
        })
    }
}

impl QuarterlyFiguresResponse {
    pub fn validate_and_into_dates(self, expected_symbol: &str) -> anyhow::Result<Vec<NaiveDate>> {
        ensure_symbol(&self.symbol, expected_symbol)?;
        let mut dates = self.release_dates;
        dates.sort_unstable();
        dates.dedup();
        Ok(dates)
    }
}

fn ensure_symbol(got: &str, expected: &str) -> anyhow::Result<()> {
    ensure!(
        got.trim().eq_ignore_ascii_case(expected.trim()),
        "symbol mismatch: expected {expected}, got {got}"
    );
    Ok(())
}
