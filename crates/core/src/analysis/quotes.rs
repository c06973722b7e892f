use crate::domain::tier::ReferenceIndex;
use crate::error::QuoteError;
use crate::ingest::provider::{ensure_weekday, validate_price, QuoteSource};
use chrono::NaiveDate;

/// Percentage change from `from` to `to`. Exact for whole-percent moves such as 100 -> 95.
pub fn pct_change(from: f64, to: f64) -> f64 {
    (to - from) * 100.0 / from
}

/// Engine-side view of the quote collaborator. Enforces the lookup contract regardless of
/// which source is plugged in: weekend dates are rejected before the source is called and
/// unusable prices are turned into errors.
#[derive(Clone, Copy)]
pub struct QuoteLookup<'a> {
    source: &'a dyn QuoteSource,
}

impl<'a> QuoteLookup<'a> {
    pub fn new(source: &'a dyn QuoteSource) -> Self {
        Self { source }
    }

    pub async fn quote(&self, symbol: &str, date: NaiveDate) -> Result<f64, QuoteError> {
        ensure_weekday(date)?;
        let price = self.source.quote(symbol, date).await?;
        validate_price(symbol, date, price)
    }

    pub async fn index_quote(
        &self,
        index: ReferenceIndex,
        date: NaiveDate,
    ) -> Result<f64, QuoteError> {
        ensure_weekday(date)?;
        let price = self.source.reference_index_quote(index, date).await?;
        validate_price(index.symbol(), date, price)
    }

    pub async fn change_pct(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<f64, QuoteError> {
        let start = self.quote(symbol, from).await?;
        let end = self.quote(symbol, to).await?;
        Ok(pct_change(start, end))
    }

    pub async fn index_change_pct(
        &self,
        index: ReferenceIndex,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<f64, QuoteError> {
        let start = self.index_quote(index, from).await?;
        let end = self.index_quote(index, to).await?;
        Ok(pct_change(start, end))
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::StaticQuotes;
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[tokio::test]
    async fn weekend_lookup_never_reaches_source() {
        let source = StaticQuotes::new().with_default("SAP.DE", 100.0);
        let lookup = QuoteLookup::new(&source);
        let err = lookup.quote("SAP.DE", d(2026, 3, 7)).await.unwrap_err();
        assert!(matches!(err, QuoteError::Weekend { .. }));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn zero_price_from_source_is_rejected() {
        let source = StaticQuotes::new().with_default("SAP.DE", 0.0);
        let lookup = QuoteLookup::new(&source);
        let err = lookup.quote("SAP.DE", d(2026, 3, 6)).await.unwrap_err();
        assert!(matches!(err, QuoteError::InvalidPrice { .. }));
    }

    #[test]
    fn whole_percent_moves_are_exact() {
        assert_eq!(pct_change(100.0, 95.0), -5.0);
        assert_eq!(pct_change(100.0, 105.0), 5.0);
        assert_eq!(pct_change(10.0, 10.5), 5.0);
        assert_eq!(pct_change(10.0, 9.5), -5.0);
    }

    #[tokio::test]
    async fn change_is_relative_to_start() {
        let source = StaticQuotes::new()
            .with_price("SAP.DE", d(2026, 3, 5), 200.0)
            .with_price("SAP.DE", d(2026, 3, 6), 150.0)
            .with_default(ReferenceIndex::Dax.symbol(), 1000.0);
        let lookup = QuoteLookup::new(&source);
        let chg = lookup
            .change_pct("SAP.DE", d(2026, 3, 5), d(2026, 3, 6))
            .await
            .unwrap();
        assert_eq!(chg, -25.0);
        let idx = lookup
            .index_change_pct(ReferenceIndex::Dax, d(2026, 3, 5), d(2026, 3, 6))
            .await
            .unwrap();
        assert_eq!(idx, 0.0);
    }
}
