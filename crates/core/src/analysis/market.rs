//! Evaluators that need historical quotes.

use crate::analysis::criteria::{quarterly_reaction_points, quote_change_points, reversal_points};
use crate::analysis::quotes::{pct_change, QuoteLookup};
use crate::domain::instrument::Instrument;
use crate::domain::rating::{CriteriaRating, RatingValue};
use crate::error::QuoteError;
use crate::time::{closest_weekday, last_weekday_of_month, prev_month, prev_weekday};
use chrono::{Duration, NaiveDate};

pub const SIX_MONTHS_DAYS: i64 = 182;
pub const ONE_YEAR_DAYS: i64 = 365;

/// Change of the current quote against the close `days` calendar days ago.
pub async fn quote_change(
    lookup: QuoteLookup<'_>,
    instrument: &Instrument,
    today: NaiveDate,
    days: i64,
) -> Result<CriteriaRating, QuoteError> {
    let before = closest_weekday(today - Duration::days(days));
    let then = lookup.quote(instrument.symbol(), before).await?;
    let chg = pct_change(then, instrument.quote().amount);
    let points = quote_change_points(chg);
    tracing::debug!(
        symbol = instrument.symbol(),
        days,
        %before,
        chg,
        points = points.value(),
        "quote change rated"
    );
    Ok(CriteriaRating::number(chg, points))
}

/// Day-of-release move relative to the reference index.
pub async fn quarterly_figures_reaction(
    lookup: QuoteLookup<'_>,
    instrument: &Instrument,
    today: NaiveDate,
) -> Result<CriteriaRating, QuoteError> {
    let Some(release) = instrument.last_quarterly_release(today) else {
        tracing::debug!(symbol = instrument.symbol(), "no quarterly figures release known");
        return Ok(CriteriaRating::insufficient_data());
    };
    let before = prev_weekday(release);
    let index = instrument.tier().reference_index();

    let stock = lookup.change_pct(instrument.symbol(), before, release).await?;
    let market = lookup.index_change_pct(index, before, release).await?;
    let relative = stock - market;

    let points = quarterly_reaction_points(relative);
    tracing::debug!(
        symbol = instrument.symbol(),
        %release,
        stock,
        market,
        relative,
        points = points.value(),
        "quarterly figures reaction rated"
    );
    Ok(CriteriaRating::number(relative, points))
}

/// Performance of the month ending on `month`'s last weekday, minus the index's.
async fn relative_month_performance(
    lookup: QuoteLookup<'_>,
    instrument: &Instrument,
    month: NaiveDate,
) -> Result<f64, QuoteError> {
    let end = last_weekday_of_month(month);
    let start = last_weekday_of_month(prev_month(month));
    let index = instrument.tier().reference_index();

    let stock = lookup.change_pct(instrument.symbol(), start, end).await?;
    let market = lookup.index_change_pct(index, start, end).await?;
    Ok(stock - market)
}

/// Relative performance over the three completed months before `today`, most recent first.
pub async fn three_month_reversal(
    lookup: QuoteLookup<'_>,
    instrument: &Instrument,
    today: NaiveDate,
) -> Result<CriteriaRating, QuoteError> {
    if !instrument.tier().profile().three_month_reversal {
        return Ok(CriteriaRating::not_applicable());
    }

    let m1 = prev_month(today);
    let m2 = prev_month(m1);
    let m3 = prev_month(m2);

    let diffs = [
        relative_month_performance(lookup, instrument, m1).await?,
        relative_month_performance(lookup, instrument, m2).await?,
        relative_month_performance(lookup, instrument, m3).await?,
    ];
    let points = reversal_points(diffs);
    tracing::debug!(
        symbol = instrument.symbol(),
        ?diffs,
        points = points.value(),
        "three month reversal rated"
    );
    Ok(CriteriaRating::new(RatingValue::Triple(diffs), points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::quotes::fixtures::StaticQuotes;
    use crate::domain::instrument::fixtures::instrument;
    use crate::domain::instrument::Fundamentals;
    use crate::domain::rating::Points;
    use crate::domain::tier::ReferenceIndex;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    const DAX: &str = "^GDAXI";

    #[tokio::test]
    async fn six_month_change_uses_closest_weekday() {
        // 2026-03-22 is Sunday; 182 days earlier is Sunday 2025-09-21, snapped to Monday.
        let source = StaticQuotes::new().with_price("VOW3.DE", d(2025, 9, 22), 100.0);
        let inst = instrument(120.0, 6.0e10, Fundamentals::default(), vec![]);
        let r = quote_change(QuoteLookup::new(&source), &inst, d(2026, 3, 22), SIX_MONTHS_DAYS)
            .await
            .unwrap();
        assert_eq!(r.points(), Points::Plus);
    }

    #[tokio::test]
    async fn one_year_loss_is_negative() {
        let source = StaticQuotes::new().with_price("VOW3.DE", d(2025, 3, 20), 200.0);
        let inst = instrument(100.0, 6.0e10, Fundamentals::default(), vec![]);
        let r = quote_change(QuoteLookup::new(&source), &inst, d(2026, 3, 20), ONE_YEAR_DAYS)
            .await
            .unwrap();
        assert_eq!(r.value(), &RatingValue::Number(-50.0));
        assert_eq!(r.points(), Points::Minus);
    }

    #[tokio::test]
    async fn five_percent_moves_stay_neutral() {
        let source = StaticQuotes::new().with_price("VOW3.DE", d(2025, 3, 20), 100.0);
        for quote in [95.0, 105.0] {
            let inst = instrument(quote, 6.0e10, Fundamentals::default(), vec![]);
            let r = quote_change(QuoteLookup::new(&source), &inst, d(2026, 3, 20), ONE_YEAR_DAYS)
                .await
                .unwrap();
            assert_eq!(r.points(), Points::Zero, "quote {quote}");
        }
    }

    #[tokio::test]
    async fn reaction_is_relative_to_reference_index() {
        // Thursday release; stock +4%, DAX +2% -> +2 relative.
        let source = StaticQuotes::new()
            .with_price("VOW3.DE", d(2026, 2, 25), 100.0)
            .with_price("VOW3.DE", d(2026, 2, 26), 104.0)
            .with_price(DAX, d(2026, 2, 25), 1000.0)
            .with_price(DAX, d(2026, 2, 26), 1020.0);
        let inst = instrument(110.0, 6.0e10, Fundamentals::default(), vec![d(2026, 2, 26)]);
        let r = quarterly_figures_reaction(QuoteLookup::new(&source), &inst, d(2026, 3, 20))
            .await
            .unwrap();
        assert_eq!(r.points(), Points::Plus);
    }

    #[tokio::test]
    async fn monday_release_compares_against_friday() {
        let source = StaticQuotes::new()
            .with_price("VOW3.DE", d(2026, 2, 27), 100.0)
            .with_price("VOW3.DE", d(2026, 3, 2), 95.0)
            .with_default(ReferenceIndex::Dax.symbol(), 1000.0);
        let inst = instrument(110.0, 6.0e10, Fundamentals::default(), vec![d(2026, 3, 2)]);
        let r = quarterly_figures_reaction(QuoteLookup::new(&source), &inst, d(2026, 3, 20))
            .await
            .unwrap();
        assert_eq!(r.value(), &RatingValue::Number(pct_change(100.0, 95.0)));
        assert_eq!(r.points(), Points::Minus);
    }

    #[tokio::test]
    async fn reaction_without_release_is_insufficient_data() {
        let source = StaticQuotes::new();
        let inst = instrument(110.0, 6.0e10, Fundamentals::default(), vec![d(2026, 4, 29)]);
        let r = quarterly_figures_reaction(QuoteLookup::new(&source), &inst, d(2026, 3, 20))
            .await
            .unwrap();
        assert_eq!(r.value(), &RatingValue::InsufficientData);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn weekend_release_date_aborts() {
        let source = StaticQuotes::new().with_default("VOW3.DE", 100.0).with_default(DAX, 1000.0);
        // 2026-02-28 is Saturday.
        let inst = instrument(110.0, 6.0e10, Fundamentals::default(), vec![d(2026, 2, 28)]);
        let err = quarterly_figures_reaction(QuoteLookup::new(&source), &inst, d(2026, 3, 20))
            .await
            .unwrap_err();
        assert!(matches!(err, QuoteError::Weekend { .. }));
    }

    #[tokio::test]
    async fn three_outperforming_months_signal_reversal() {
        // Month ends before 2026-03-20: Feb 27, Jan 30, Dec 31, Nov 28.
        let source = StaticQuotes::new()
            .with_price("VOW3.DE", d(2025, 11, 28), 80.0)
            .with_price("VOW3.DE", d(2025, 12, 31), 90.0)
            .with_price("VOW3.DE", d(2026, 1, 30), 100.0)
            .with_price("VOW3.DE", d(2026, 2, 27), 110.0)
            .with_default(DAX, 1000.0);
        let inst = instrument(110.0, 6.0e10, Fundamentals::default(), vec![]);
        let r = three_month_reversal(QuoteLookup::new(&source), &inst, d(2026, 3, 20))
            .await
            .unwrap();
        assert_eq!(r.points(), Points::Minus);
        assert_eq!(
            r.value(),
            &RatingValue::Triple([
                pct_change(100.0, 110.0),
                pct_change(90.0, 100.0),
                pct_change(80.0, 90.0)
            ])
        );
    }

    #[tokio::test]
    async fn three_underperforming_months_signal_reversal() {
        let source = StaticQuotes::new()
            .with_default("VOW3.DE", 100.0)
            .with_price(DAX, d(2025, 11, 28), 800.0)
            .with_price(DAX, d(2025, 12, 31), 900.0)
            .with_price(DAX, d(2026, 1, 30), 1000.0)
            .with_price(DAX, d(2026, 2, 27), 1100.0);
        let inst = instrument(110.0, 6.0e10, Fundamentals::default(), vec![]);
        let r = three_month_reversal(QuoteLookup::new(&source), &inst, d(2026, 3, 20))
            .await
            .unwrap();
        assert_eq!(r.points(), Points::Plus);
    }

    #[tokio::test]
    async fn reversal_is_not_applicable_below_large_caps() {
        let source = StaticQuotes::new();
        let inst = instrument(110.0, 3.0e9, Fundamentals::default(), vec![]);
        let r = three_month_reversal(QuoteLookup::new(&source), &inst, d(2026, 3, 20))
            .await
            .unwrap();
        assert_eq!(r.value(), &RatingValue::NotApplicable);
        assert_eq!(r.points(), Points::Zero);
        assert_eq!(source.calls(), 0);
    }
}
