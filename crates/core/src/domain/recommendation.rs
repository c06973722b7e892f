use crate::domain::history::History;
use crate::domain::tier::Tier;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A score drop at least this sharp between the two latest results forces SELL.
pub const SHARP_DROP: i32 = -2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Recommendation {
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
    #[serde(rename = "NONE")]
    NoSignal,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Recommendation::Buy => "BUY",
            Recommendation::Sell => "SELL",
            Recommendation::NoSignal => "NONE",
        })
    }
}

/// Derives the recommendation from the two most recent results. Empty history yields no signal.
pub fn recommendation(history: &History, tier: Tier) -> Recommendation {
    let Some(latest) = history.latest() else {
        return Recommendation::NoSignal;
    };

    if history.score_delta().is_some_and(|delta| delta <= SHARP_DROP) {
        return Recommendation::Sell;
    }

    let profile = tier.profile();
    let score = latest.score();
    if score <= profile.sell_at_or_below {
        Recommendation::Sell
    } else if score >= profile.buy_at_or_above {
        Recommendation::Buy
    } else {
        Recommendation::NoSignal
    }
}
