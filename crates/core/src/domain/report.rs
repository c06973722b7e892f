use crate::domain::instrument::InstrumentHeader;
use crate::domain::rating::RatingValue;
use crate::domain::result::{Criterion, EvaluationResult};
use std::fmt;

/// Fixed-width text report of one evaluation result.
pub struct Report<'a> {
    header: &'a InstrumentHeader,
    result: &'a EvaluationResult,
}

pub fn render<'a>(header: &'a InstrumentHeader, result: &'a EvaluationResult) -> Report<'a> {
    Report { header, result }
}

fn is_percentage(criterion: Criterion) -> bool {
    matches!(
        criterion,
        Criterion::ReturnOnEquity
            | Criterion::EbitMargin
            | Criterion::EquityRatio
            | Criterion::QuarterlyFiguresReaction
            | Criterion::QuoteChange6Month
            | Criterion::QuoteChange1Year
            | Criterion::EarningsGrowth
    )
}

fn format_value(criterion: Criterion, value: &RatingValue) -> String {
    match value {
        RatingValue::Number(v) if is_percentage(criterion) => format!("{v:.2}%"),
        RatingValue::Number(v) => format!("{v:.2}"),
        RatingValue::Triple([a, b, c]) => format!("{a:.2}%, {b:.2}%, {c:.2}%"),
        RatingValue::SubPoints(a, b) => format!("{a} Points, {b} Points"),
        RatingValue::Undefined => "undefined".to_string(),
        RatingValue::InsufficientData => "insufficient data".to_string(),
        RatingValue::NotApplicable => "not applicable".to_string(),
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = self.header;
        let tier = format!("{} ({})", h.tier, h.tier.reference_index().name());
        let evaluated = self.result.timestamp().date_naive().to_string();

        writeln!(f, "{:<35} {:<25}", "Name:", h.name)?;
        writeln!(f, "{:<35} {:<25}", "Symbol:", h.symbol)?;
        writeln!(f, "{:<35} {:<25}", "Tier:", tier)?;
        writeln!(f, "{:<35} {:<25}", "Market Cap.:", format!("{:.0}", h.market_cap))?;
        writeln!(f, "{:<35} {:<25}", "Quote:", h.quote.to_string())?;
        writeln!(f, "{:<35} {:<25}", "Last Evaluation Date:", evaluated)?;
        writeln!(f, "{}", "-".repeat(80))?;

        for (criterion, rating) in self.result.ratings().iter() {
            writeln!(
                f,
                "{:<35} {:<25} | {} Points",
                format!("{}:", criterion.label()),
                format_value(criterion, rating.value()),
                rating.points()
            )?;
        }

        writeln!(f, "{}", "-".repeat(80))?;
        writeln!(f, "{:<35} {:<25}", "Total Levermann Points:", self.result.score())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instrument::Money;
    use crate::domain::rating::Points;
    use crate::domain::result::fixtures::ratings_with_score;
    use crate::domain::tier::Tier;
    use chrono::{TimeZone, Utc};

    fn header() -> InstrumentHeader {
        InstrumentHeader {
            symbol: "VOW3.DE".to_string(),
            name: "Volkswagen AG VZ".to_string(),
            tier: Tier::Large,
            quote: Money::new(110.5, "EUR"),
            market_cap: 6.0e10,
        }
    }

    #[test]
    fn renders_one_line_per_criterion() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 20, 18, 0, 0).unwrap();
        let result = EvaluationResult::new(ts, ratings_with_score(3));
        let text = render(&header(), &result).to_string();

        assert!(text.contains("Volkswagen AG VZ"));
        assert!(text.contains("LARGE (DAX)"));
        assert!(text.contains("60000000000"));
        assert!(text.contains("110.5 EUR"));
        assert!(text.contains("2026-03-20"));
        for c in Criterion::ALL {
            assert!(text.contains(&format!("{}:", c.label())), "missing {c:?}");
        }
        assert_eq!(text.matches(" Points\n").count(), 13);
        assert!(text.trim_end().ends_with('3'));

        let roe_line = text.lines().find(|l| l.starts_with("RoE:")).unwrap();
        assert_eq!(roe_line, format!("{:<35} {:<25} | 1 Points", "RoE:", "0.00%"));
    }

    #[test]
    fn formats_structured_values() {
        assert_eq!(
            format_value(Criterion::ThreeMonthReversal, &RatingValue::Triple([1.0, -2.5, 0.126])),
            "1.00%, -2.50%, 0.13%"
        );
        assert_eq!(
            format_value(
                Criterion::Momentum,
                &RatingValue::SubPoints(Points::Plus, Points::Minus)
            ),
            "1 Points, -1 Points"
        );
        assert_eq!(
            format_value(Criterion::PriceEarningsRatio, &RatingValue::Number(11.456)),
            "11.46"
        );
        assert_eq!(
            format_value(Criterion::EarningsRevision, &RatingValue::InsufficientData),
            "insufficient data"
        );
    }
}
