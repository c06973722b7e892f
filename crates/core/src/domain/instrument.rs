use crate::domain::tier::Tier;
use crate::error::EngineError;
use crate::ingest::provider::{CalendarSource, FundamentalsSource, SnapshotSource};
use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub amount: f64,
    pub currency: String,
}

impl Money {
    pub fn new(amount: f64, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpsEstimate {
    pub value: Money,
    pub revision_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalystRatings {
    pub buy: u32,
    pub hold: u32,
    pub sell: u32,
}

impl AnalystRatings {
    pub fn total(&self) -> u32 {
        self.buy + self.hold + self.sell
    }

    /// Weighted average on a 1 (buy) .. 3 (sell) scale; `None` without any rating.
    pub fn average_score(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let weighted = f64::from(self.buy) + 2.0 * f64::from(self.hold) + 3.0 * f64::from(self.sell);
        Some(weighted / f64::from(total))
    }
}

/// Year-indexed fundamental series. Percentages are plain numbers (21.5 = 21.5%).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fundamentals {
    pub roe: BTreeMap<i32, f64>,
    pub ebit_margin: BTreeMap<i32, f64>,
    pub equity_ratio: BTreeMap<i32, f64>,
    /// Estimate revisions per fiscal year.
    pub eps: BTreeMap<i32, Vec<EpsEstimate>>,
    pub analyst_ratings: Option<AnalystRatings>,
}

/// Current market data for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub name: String,
    pub quote: Money,
    pub market_cap: f64,
}

/// Eligibility rules applied before an instrument can be evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eligibility {
    /// Case-insensitive suffix every symbol must carry, e.g. ".de".
    pub symbol_suffix: Option<String>,
}

impl Default for Eligibility {
    fn default() -> Self {
        Self {
            symbol_suffix: Some(".de".to_string()),
        }
    }
}

impl Eligibility {
    pub fn any() -> Self {
        Self {
            symbol_suffix: None,
        }
    }

    pub fn check_symbol(&self, symbol: &str) -> Result<(), EngineError> {
        if let Some(suffix) = &self.symbol_suffix {
            if !symbol
                .to_ascii_lowercase()
                .ends_with(&suffix.to_ascii_lowercase())
            {
                return Err(EngineError::UnsupportedInstrument(format!(
                    "symbol {symbol} must end in {suffix}"
                )));
            }
        }
        Ok(())
    }
}

/// Display data shared by reports and persisted history rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentHeader {
    pub symbol: String,
    pub name: String,
    pub tier: Tier,
    pub quote: Money,
    pub market_cap: f64,
}

/// Validated per-run snapshot of one equity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instrument {
    symbol: String,
    name: String,
    quote: Money,
    market_cap: f64,
    tier: Tier,
    fundamentals: Fundamentals,
    quarterly_release_dates: Vec<NaiveDate>,
}

impl Instrument {
    pub fn new(
        symbol: &str,
        snapshot: MarketSnapshot,
        mut fundamentals: Fundamentals,
        mut quarterly_release_dates: Vec<NaiveDate>,
        eligibility: &Eligibility,
    ) -> Result<Self, EngineError> {
        let symbol = symbol.trim().to_string();
        if symbol.is_empty() {
            return Err(EngineError::InvalidData("symbol must be non-empty".into()));
        }
        eligibility.check_symbol(&symbol)?;

        let name = snapshot.name.trim().to_string();
        if name.is_empty() {
            return Err(EngineError::InvalidData(format!("{symbol}: name must be non-empty")));
        }

        let quote = snapshot.quote;
        if !quote.amount.is_finite() || quote.amount <= 0.0 {
            return Err(EngineError::InvalidData(format!(
                "{symbol}: quote must be positive (got {})",
                quote.amount
            )));
        }

        let tier = Tier::classify(snapshot.market_cap)?;

        validate_percentages(&symbol, "roe", &fundamentals.roe)?;
        validate_percentages(&symbol, "ebit_margin", &fundamentals.ebit_margin)?;
        validate_percentages(&symbol, "equity_ratio", &fundamentals.equity_ratio)?;

        for (year, revisions) in fundamentals.eps.iter_mut() {
            for eps in revisions.iter() {
                if !eps.value.amount.is_finite() {
                    return Err(EngineError::InvalidData(format!(
                        "{symbol}: non-finite EPS for {year}"
                    )));
                }
                if eps.value.currency != quote.currency {
                    return Err(EngineError::InvalidData(format!(
                        "{symbol}: EPS for {year} is in {}, quote is in {}",
                        eps.value.currency, quote.currency
                    )));
                }
            }
            // Stable: same-day revisions keep their delivery order.
            revisions.sort_by_key(|e| e.revision_date);
        }

        quarterly_release_dates.sort_unstable();
        quarterly_release_dates.dedup();

        Ok(Self {
            symbol,
            name,
            quote,
            market_cap: snapshot.market_cap,
            tier,
            fundamentals,
            quarterly_release_dates,
        })
    }

    /// Assembles a snapshot from the data collaborators.
    pub async fn load<S>(symbol: &str, source: &S, eligibility: &Eligibility) -> anyhow::Result<Self>
    where
        S: SnapshotSource + FundamentalsSource + CalendarSource,
    {
        // Reject ineligible symbols before any I/O.
        eligibility.check_symbol(symbol)?;

        let snapshot = source
            .snapshot(symbol)
            .await
            .with_context(|| format!("failed to load market snapshot for {symbol}"))?;
        let fundamentals = source
            .fundamentals(symbol)
            .await
            .with_context(|| format!("failed to load fundamentals for {symbol}"))?;
        let release_dates = source
            .quarterly_release_dates(symbol)
            .await
            .with_context(|| format!("failed to load quarterly figures dates for {symbol}"))?;

        Ok(Self::new(symbol, snapshot, fundamentals, release_dates, eligibility)?)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quote(&self) -> &Money {
        &self.quote
    }

    pub fn market_cap(&self) -> f64 {
        self.market_cap
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn fundamentals(&self) -> &Fundamentals {
        &self.fundamentals
    }

    /// Most recent estimate revision for a fiscal year.
    pub fn latest_eps(&self, year: i32) -> Option<&EpsEstimate> {
        self.fundamentals.eps.get(&year).and_then(|r| r.last())
    }

    pub fn eps_revisions(&self, year: i32) -> &[EpsEstimate] {
        self.fundamentals
            .eps
            .get(&year)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Most recent known quarterly-figures release on or before `today`.
    pub fn last_quarterly_release(&self, today: NaiveDate) -> Option<NaiveDate> {
        self.quarterly_release_dates
            .iter()
            .rev()
            .find(|d| **d <= today)
            .copied()
    }

    pub fn header(&self) -> InstrumentHeader {
        InstrumentHeader {
            symbol: self.symbol.clone(),
            name: self.name.clone(),
            tier: self.tier,
            quote: self.quote.clone(),
            market_cap: self.market_cap,
        }
    }
}

fn validate_percentages(
    symbol: &str,
    field: &str,
    values: &BTreeMap<i32, f64>,
) -> Result<(), EngineError> {
    for (year, v) in values {
        if !v.is_finite() || *v > 100.0 {
            return Err(EngineError::InvalidData(format!(
                "{symbol}: {field} for {year} must be a percentage <= 100 (got {v})"
            )));
        }
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::fixtures::{eps, snapshot};
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn rejects_symbol_without_required_suffix() {
        let err = Instrument::new(
            "GOOG",
            snapshot(100.0, 1.0e12),
            Fundamentals::default(),
            vec![],
            &Eligibility::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedInstrument(_)));

        assert!(Instrument::new(
            "GOOG",
            snapshot(100.0, 1.0e12),
            Fundamentals::default(),
            vec![],
            &Eligibility::any(),
        )
        .is_ok());
    }

    #[test]
    fn rejects_undeterminable_tier() {
        let err = Instrument::new(
            "VOW3.DE",
            snapshot(100.0, 0.0),
            Fundamentals::default(),
            vec![],
            &Eligibility::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedInstrument(_)));
    }

    #[test]
    fn rejects_percentages_above_hundred() {
        let mut f = Fundamentals::default();
        f.roe.insert(2025, 100.1);
        let err = Instrument::new("VOW3.DE", snapshot(100.0, 6.0e10), f, vec![], &Eligibility::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidData(_)));
    }

    #[test]
    fn rejects_eps_in_foreign_currency() {
        let mut f = Fundamentals::default();
        f.eps.insert(
            2026,
            vec![EpsEstimate {
                value: Money::new(3.0, "USD"),
                revision_date: d(2026, 1, 3),
            }],
        );
        let err = Instrument::new("VOW3.DE", snapshot(100.0, 6.0e10), f, vec![], &Eligibility::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidData(_)));
    }

    #[test]
    fn sorts_eps_revisions_chronologically() {
        let mut f = Fundamentals::default();
        f.eps.insert(
            2026,
            vec![eps(3.0, 2026, 2, 1), eps(2.0, 2025, 11, 1), eps(2.5, 2026, 1, 1)],
        );
        let inst = Instrument::new("vow3.de", snapshot(100.0, 6.0e10), f, vec![], &Eligibility::default())
            .unwrap();
        assert_eq!(inst.latest_eps(2026).unwrap().value.amount, 3.0);
        let amounts: Vec<f64> = inst.eps_revisions(2026).iter().map(|e| e.value.amount).collect();
        assert_eq!(amounts, vec![2.0, 2.5, 3.0]);
        assert!(inst.eps_revisions(2030).is_empty());
    }

    #[test]
    fn selects_latest_release_not_after_today() {
        let inst = Instrument::new(
            "VOW3.DE",
            snapshot(100.0, 6.0e10),
            Fundamentals::default(),
            vec![d(2026, 4, 29), d(2025, 10, 30), d(2026, 2, 26)],
            &Eligibility::default(),
        )
        .unwrap();
        assert_eq!(inst.last_quarterly_release(d(2026, 3, 15)), Some(d(2026, 2, 26)));
        assert_eq!(inst.last_quarterly_release(d(2026, 2, 26)), Some(d(2026, 2, 26)));
        assert_eq!(inst.last_quarterly_release(d(2025, 1, 1)), None);
        assert_eq!(inst.tier(), Tier::Large);
    }

    #[test]
    fn analyst_average_is_weighted() {
        let r = AnalystRatings { buy: 2, hold: 1, sell: 1 };
        assert_eq!(r.total(), 4);
        assert_eq!(r.average_score(), Some(7.0 / 4.0));
        assert_eq!(AnalystRatings { buy: 0, hold: 0, sell: 0 }.average_score(), None);
    }
}
