use serde::{Deserialize, Serialize};
use std::fmt;

/// Contribution of a single criterion to the total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Points {
    Minus,
    Zero,
    Plus,
}

impl Points {
    pub fn value(self) -> i32 {
        match self {
            Points::Minus => -1,
            Points::Zero => 0,
            Points::Plus => 1,
        }
    }

    pub fn inverted(self) -> Self {
        match self {
            Points::Minus => Points::Plus,
            Points::Zero => Points::Zero,
            Points::Plus => Points::Minus,
        }
    }

    /// Sign of a comparison, used where a ratio is not computable.
    pub fn from_sign(diff: f64) -> Self {
        if diff > 0.0 {
            Points::Plus
        } else if diff < 0.0 {
            Points::Minus
        } else {
            Points::Zero
        }
    }
}

impl From<Points> for i8 {
    fn from(p: Points) -> Self {
        match p {
            Points::Minus => -1,
            Points::Zero => 0,
            Points::Plus => 1,
        }
    }
}

impl TryFrom<i8> for Points {
    type Error = String;

    fn try_from(v: i8) -> Result<Self, Self::Error> {
        match v {
            -1 => Ok(Points::Minus),
            0 => Ok(Points::Zero),
            1 => Ok(Points::Plus),
            other => Err(format!("points must be -1, 0 or 1 (got {other})")),
        }
    }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Raw metric behind a rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RatingValue {
    Number(f64),
    /// Relative monthly performance, most recent month first.
    Triple([f64; 3]),
    /// Points of two sibling inputs that were merged into this rating.
    SubPoints(Points, Points),
    /// The metric has no finite value, e.g. a ratio over a zero denominator.
    Undefined,
    InsufficientData,
    NotApplicable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaRating {
    value: RatingValue,
    points: Points,
}

impl CriteriaRating {
    pub fn new(value: RatingValue, points: Points) -> Self {
        Self { value, points }
    }

    pub fn number(value: f64, points: Points) -> Self {
        Self::new(RatingValue::Number(value), points)
    }

    pub fn insufficient_data() -> Self {
        Self::new(RatingValue::InsufficientData, Points::Zero)
    }

    pub fn not_applicable() -> Self {
        Self::new(RatingValue::NotApplicable, Points::Zero)
    }

    pub fn value(&self) -> &RatingValue {
        &self.value
    }

    pub fn points(&self) -> Points {
        self.points
    }

    pub fn has_data(&self) -> bool {
        !matches!(
            self.value,
            RatingValue::InsufficientData | RatingValue::NotApplicable
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn points_serialize_as_integers() {
        let rating = CriteriaRating::number(21.5, Points::Plus);
        let v = serde_json::to_value(&rating).unwrap();
        assert_eq!(
            v,
            json!({"value": {"kind": "number", "value": 21.5}, "points": 1})
        );
    }

    #[test]
    fn rejects_out_of_range_points() {
        let v = json!({"value": {"kind": "insufficient_data"}, "points": 2});
        assert!(serde_json::from_value::<CriteriaRating>(v).is_err());
    }

    #[test]
    fn markers_are_neutral() {
        assert_eq!(CriteriaRating::insufficient_data().points(), Points::Zero);
        assert_eq!(CriteriaRating::not_applicable().points(), Points::Zero);
        assert!(!CriteriaRating::insufficient_data().has_data());
    }

    #[test]
    fn sub_points_round_trip() {
        let rating = CriteriaRating::new(
            RatingValue::SubPoints(Points::Plus, Points::Minus),
            Points::Zero,
        );
        let v = serde_json::to_value(&rating).unwrap();
        assert_eq!(v["value"]["value"], json!([1, -1]));
        let back: CriteriaRating = serde_json::from_value(v).unwrap();
        assert_eq!(back, rating);
    }

    #[test]
    fn inversion_keeps_neutral() {
        assert_eq!(Points::Plus.inverted(), Points::Minus);
        assert_eq!(Points::Minus.inverted(), Points::Plus);
        assert_eq!(Points::Zero.inverted(), Points::Zero);
    }
}
