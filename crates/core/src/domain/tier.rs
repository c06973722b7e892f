use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const LARGE_CAP_MIN: f64 = 5.0e9;
pub const MID_CAP_MIN: f64 = 2.0e9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Large,
    Mid,
    Small,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReferenceIndex {
    Dax,
    Mdax,
    Sdax,
}

/// Everything that varies by capitalization tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierProfile {
    pub reference_index: ReferenceIndex,
    /// Recommendation is SELL when the latest score is at or below this.
    pub sell_at_or_below: i32,
    /// Recommendation is BUY when the latest score is at or above this.
    pub buy_at_or_above: i32,
    pub three_month_reversal: bool,
    /// Analyst consensus is followed (not inverted) when fewer ratings than this exist.
    pub follow_analysts_below: Option<u32>,
}

const LARGE_PROFILE: TierProfile = TierProfile {
    reference_index: ReferenceIndex::Dax,
    sell_at_or_below: 2,
    buy_at_or_above: 4,
    three_month_reversal: true,
    follow_analysts_below: None,
};

const MID_PROFILE: TierProfile = TierProfile {
    reference_index: ReferenceIndex::Mdax,
    sell_at_or_below: 4,
    buy_at_or_above: 7,
    three_month_reversal: false,
    follow_analysts_below: None,
};

const SMALL_PROFILE: TierProfile = TierProfile {
    reference_index: ReferenceIndex::Sdax,
    sell_at_or_below: 4,
    buy_at_or_above: 7,
    three_month_reversal: false,
    follow_analysts_below: Some(5),
};

impl Tier {
    pub fn classify(market_cap: f64) -> Result<Self, EngineError> {
        if !market_cap.is_finite() || market_cap <= 0.0 {
            return Err(EngineError::UnsupportedInstrument(format!(
                "cannot determine tier from market cap {market_cap}"
            )));
        }

        Ok(if market_cap >= LARGE_CAP_MIN {
            Tier::Large
        } else if market_cap >= MID_CAP_MIN {
            Tier::Mid
        } else {
            Tier::Small
        })
    }

    pub fn profile(self) -> &'static TierProfile {
        match self {
            Tier::Large => &LARGE_PROFILE,
            Tier::Mid => &MID_PROFILE,
            Tier::Small => &SMALL_PROFILE,
        }
    }

    pub fn reference_index(self) -> ReferenceIndex {
        self.profile().reference_index
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Large => "LARGE",
            Tier::Mid => "MID",
            Tier::Small => "SMALL",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LARGE" => Ok(Tier::Large),
            "MID" => Ok(Tier::Mid),
            "SMALL" => Ok(Tier::Small),
            other => Err(EngineError::UnsupportedInstrument(format!(
                "unknown tier: {other}"
            ))),
        }
    }
}

impl ReferenceIndex {
    /// Symbol used when querying the market-data source.
    pub fn symbol(self) -> &'static str {
        match self {
            ReferenceIndex::Dax => "^GDAXI",
            ReferenceIndex::Mdax => "^MDAXI",
            ReferenceIndex::Sdax => "^SDAXI",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ReferenceIndex::Dax => "DAX",
            ReferenceIndex::Mdax => "MDAX",
            ReferenceIndex::Sdax => "SDAX",
        }
    }
}
