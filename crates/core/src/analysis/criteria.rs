//! Evaluators that only read the instrument snapshot.
//!
//! All bands are inclusive at both ends: a value on a boundary lands in the neutral band.

use crate::analysis::quotes::pct_change;
use crate::domain::instrument::{EpsEstimate, Instrument};
use crate::domain::rating::{CriteriaRating, Points, RatingValue};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeMap;

pub const ROE_BAND: (f64, f64) = (10.0, 20.0);
pub const EBIT_MARGIN_BAND: (f64, f64) = (6.0, 12.0);
pub const EQUITY_RATIO_BAND: (f64, f64) = (15.0, 25.0);
pub const PER_BAND: (f64, f64) = (12.0, 16.0);
pub const CHANGE_BAND: (f64, f64) = (-5.0, 5.0);

/// An older second-latest estimate does not count as a revision.
pub const REVISION_MAX_AGE_DAYS: i64 = 180;

pub fn band(value: f64, (low, high): (f64, f64)) -> Points {
    if value < low {
        Points::Minus
    } else if value <= high {
        Points::Zero
    } else {
        Points::Plus
    }
}

/// Value for `year`, falling back exactly one year.
fn with_fallback(series: &BTreeMap<i32, f64>, year: i32) -> Option<(i32, f64)> {
    series
        .get(&year)
        .map(|v| (year, *v))
        .or_else(|| series.get(&(year - 1)).map(|v| (year - 1, *v)))
}

fn rate_last_year(
    name: &'static str,
    series: &BTreeMap<i32, f64>,
    today: NaiveDate,
    bounds: (f64, f64),
) -> CriteriaRating {
    let last_year = today.year() - 1;
    let Some((year, value)) = with_fallback(series, last_year) else {
        tracing::debug!(criterion = name, last_year, "no value for last two years");
        return CriteriaRating::insufficient_data();
    };

    let points = band(value, bounds);
    tracing::debug!(criterion = name, year, value, points = points.value(), "rated");
    CriteriaRating::number(value, points)
}

pub fn return_on_equity(instrument: &Instrument, today: NaiveDate) -> CriteriaRating {
    rate_last_year("roe", &instrument.fundamentals().roe, today, ROE_BAND)
}

pub fn ebit_margin(instrument: &Instrument, today: NaiveDate) -> CriteriaRating {
    rate_last_year(
        "ebit_margin",
        &instrument.fundamentals().ebit_margin,
        today,
        EBIT_MARGIN_BAND,
    )
}

pub fn equity_ratio(instrument: &Instrument, today: NaiveDate) -> CriteriaRating {
    rate_last_year(
        "equity_ratio",
        &instrument.fundamentals().equity_ratio,
        today,
        EQUITY_RATIO_BAND,
    )
}

/// Non-positive multiples are never cheap.
pub fn price_earnings_points(per: f64) -> Points {
    if per <= 0.0 || per > PER_BAND.1 {
        Points::Minus
    } else if per >= PER_BAND.0 {
        Points::Zero
    } else {
        Points::Plus
    }
}

fn rate_price_earnings(name: &'static str, quote: f64, eps: f64) -> CriteriaRating {
    if eps == 0.0 {
        tracing::debug!(criterion = name, "zero earnings; ratio undefined");
        return CriteriaRating::new(RatingValue::Undefined, Points::Minus);
    }
    let per = quote / eps;
    let points = price_earnings_points(per);
    tracing::debug!(criterion = name, per, points = points.value(), "rated");
    CriteriaRating::number(per, points)
}

pub fn price_earnings_ratio(instrument: &Instrument, today: NaiveDate) -> CriteriaRating {
    let Some(eps) = instrument.latest_eps(today.year()) else {
        return CriteriaRating::insufficient_data();
    };
    rate_price_earnings("per", instrument.quote().amount, eps.value.amount)
}

/// P/E over the mean latest EPS of three past years, this year and next year.
pub fn five_year_price_earnings_ratio(instrument: &Instrument, today: NaiveDate) -> CriteriaRating {
    let this_year = today.year();
    let mut sum = 0.0;
    for year in (this_year - 3)..=(this_year + 1) {
        let Some(eps) = instrument.latest_eps(year) else {
            tracing::debug!(criterion = "per_5y", year, "missing EPS");
            return CriteriaRating::insufficient_data();
        };
        sum += eps.value.amount;
    }
    rate_price_earnings("per_5y", instrument.quote().amount, sum / 5.0)
}

/// Ratings are followed for thinly covered small caps and inverted otherwise: broad
/// consensus on a well covered stock is read as a contrarian signal.
pub fn analyst_rating(instrument: &Instrument) -> CriteriaRating {
    let Some(ratings) = instrument.fundamentals().analyst_ratings else {
        return CriteriaRating::insufficient_data();
    };
    let Some(score) = ratings.average_score() else {
        return CriteriaRating::insufficient_data();
    };

    let crowd = if score < 1.5 {
        Points::Plus
    } else if score < 2.5 {
        Points::Zero
    } else {
        Points::Minus
    };

    let follow_crowd = instrument
        .tier()
        .profile()
        .follow_analysts_below
        .is_some_and(|min| ratings.total() < min);
    let points = if follow_crowd { crowd } else { crowd.inverted() };

    tracing::debug!(
        criterion = "analyst_rating",
        score,
        total = ratings.total(),
        follow_crowd,
        points = points.value(),
        "rated"
    );
    CriteriaRating::number(score, points)
}

/// Growth of next year's over this year's EPS estimate.
pub fn earnings_growth(instrument: &Instrument, today: NaiveDate) -> CriteriaRating {
    let this_year = today.year();
    let (Some(cur), Some(next)) = (
        instrument.latest_eps(this_year),
        instrument.latest_eps(this_year + 1),
    ) else {
        return CriteriaRating::insufficient_data();
    };
    let (cur, next) = (cur.value.amount, next.value.amount);

    if cur == 0.0 {
        return CriteriaRating::new(RatingValue::Undefined, Points::from_sign(next - cur));
    }

    let chg = pct_change(cur, next);
    let points = if band(chg, CHANGE_BAND) == Points::Zero {
        Points::Zero
    } else {
        Points::from_sign(next - cur)
    };
    tracing::debug!(criterion = "earnings_growth", cur, next, chg, points = points.value(), "rated");
    CriteriaRating::number(chg, points)
}

/// Points of the latest revision of one fiscal year; `None` with fewer than two estimates.
fn revision_points(revisions: &[EpsEstimate]) -> Option<Points> {
    let [.., prev, latest] = revisions else {
        return None;
    };

    if latest.revision_date - prev.revision_date > Duration::days(REVISION_MAX_AGE_DAYS) {
        return Some(Points::Zero);
    }

    let (prev, latest) = (prev.value.amount, latest.value.amount);
    if prev == 0.0 {
        return Some(Points::from_sign(latest - prev));
    }
    Some(band(pct_change(prev, latest), CHANGE_BAND))
}

pub fn earnings_revision(instrument: &Instrument, today: NaiveDate) -> CriteriaRating {
    let this_year = today.year();
    let (Some(cur), Some(next)) = (
        revision_points(instrument.eps_revisions(this_year)),
        revision_points(instrument.eps_revisions(this_year + 1)),
    ) else {
        return CriteriaRating::insufficient_data();
    };

    let sum = cur.value() + next.value();
    let points = if cur == Points::Zero && next == Points::Zero {
        Points::Zero
    } else if sum >= 1 {
        Points::Plus
    } else if sum <= -1 {
        Points::Minus
    } else {
        Points::Zero
    };

    tracing::debug!(
        criterion = "earnings_revision",
        cur = cur.value(),
        next = next.value(),
        points = points.value(),
        "rated"
    );
    CriteriaRating::new(RatingValue::SubPoints(cur, next), points)
}

/// Rewards acceleration and punishes deceleration, not raw direction.
pub fn momentum(six_month: Points, one_year: Points) -> CriteriaRating {
    let points = match (six_month, one_year) {
        (Points::Plus, Points::Zero | Points::Minus) => Points::Plus,
        (Points::Minus, Points::Zero | Points::Plus) => Points::Minus,
        _ => Points::Zero,
    };
    CriteriaRating::new(RatingValue::SubPoints(six_month, one_year), points)
}

pub fn quote_change_points(chg: f64) -> Points {
    band(chg, CHANGE_BAND)
}

/// Tighter band than the other criteria: [-1, 1) is neutral.
pub fn quarterly_reaction_points(relative_reaction: f64) -> Points {
    if relative_reaction < -1.0 {
        Points::Minus
    } else if relative_reaction < 1.0 {
        Points::Zero
    } else {
        Points::Plus
    }
}

/// Three outperforming months in a row predict a pullback and vice versa.
pub fn reversal_points(monthly_relative: [f64; 3]) -> Points {
    if monthly_relative.iter().all(|d| *d > 0.0) {
        Points::Minus
    } else if monthly_relative.iter().all(|d| *d < 0.0) {
        Points::Plus
    } else {
        Points::Zero
    }
}
