use crate::domain::result::EvaluationResult;
use crate::error::EngineError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A new result with an unchanged score is discarded while the previous one is younger than this.
pub const DEDUP_WINDOW_DAYS: i64 = 7;

/// History is considered stale once its latest result is older than this.
pub const OUTDATED_AFTER_DAYS: i64 = 3;

/// Append-only, chronologically ordered evaluation results of one instrument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<EvaluationResult>", into = "Vec<EvaluationResult>")]
pub struct History {
    results: Vec<EvaluationResult>,
}

impl TryFrom<Vec<EvaluationResult>> for History {
    type Error = EngineError;

    fn try_from(results: Vec<EvaluationResult>) -> Result<Self, Self::Error> {
        Self::from_results(results)
    }
}

impl From<History> for Vec<EvaluationResult> {
    fn from(h: History) -> Self {
        h.results
    }
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_results(results: Vec<EvaluationResult>) -> Result<Self, EngineError> {
        if let Some(pair) = results
            .windows(2)
            .find(|w| w[1].timestamp() < w[0].timestamp())
        {
            return Err(EngineError::InvalidData(format!(
                "history is not chronological: {} after {}",
                pair[1].timestamp(),
                pair[0].timestamp()
            )));
        }
        Ok(Self { results })
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn latest(&self) -> Option<&EvaluationResult> {
        self.results.last()
    }

    pub fn previous(&self) -> Option<&EvaluationResult> {
        self.results.len().checked_sub(2).map(|i| &self.results[i])
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &EvaluationResult> + '_ {
        self.results.iter()
    }

    /// Score change between the two most recent results.
    pub fn score_delta(&self) -> Option<i32> {
        Some(self.latest()?.score() - self.previous()?.score())
    }

    /// True when `candidate` repeats the latest score within the dedup window.
    pub fn is_redundant(&self, candidate: &EvaluationResult) -> bool {
        let Some(latest) = self.latest() else {
            return false;
        };
        let age = candidate.timestamp() - latest.timestamp();
        age < Duration::days(DEDUP_WINDOW_DAYS) && latest.score() == candidate.score()
    }

    /// Appends `result` unless the dedup policy discards it. Returns whether it was appended.
    pub fn push_if_novel(&mut self, result: EvaluationResult) -> Result<bool, EngineError> {
        if let Some(latest) = self.latest() {
            if result.timestamp() < latest.timestamp() {
                return Err(EngineError::Precondition(format!(
                    "result at {} predates latest history entry at {}",
                    result.timestamp(),
                    latest.timestamp()
                )));
            }
        }

        if self.is_redundant(&result) {
            return Ok(false);
        }

        self.results.push(result);
        Ok(true)
    }

    /// Advisory: whether a fresh evaluation is warranted at `now`.
    pub fn outdated_at(&self, now: DateTime<Utc>) -> bool {
        match self.latest() {
            None => true,
            Some(latest) => now - latest.timestamp() > Duration::days(OUTDATED_AFTER_DAYS),
        }
    }

    pub fn outdated(&self) -> bool {
        self.outdated_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::result::fixtures::ratings_with_score;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 20, 18, 0, 0).unwrap()
    }

    fn result_at(days_ago: i64, score: i32) -> EvaluationResult {
        EvaluationResult::new(now() - Duration::days(days_ago), ratings_with_score(score))
    }

    fn history_with(previous: EvaluationResult) -> History {
        let mut h = History::new();
        assert!(h.push_if_novel(previous).unwrap());
        h
    }

    #[test]
    fn first_result_is_always_appended() {
        let mut h = History::new();
        assert!(h.push_if_novel(result_at(0, 5)).unwrap());
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn discards_recent_result_with_same_score() {
        let mut h = history_with(result_at(3, 5));
        assert!(!h.push_if_novel(result_at(0, 5)).unwrap());
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn keeps_recent_result_with_changed_score() {
        let mut h = history_with(result_at(3, 5));
        assert!(h.push_if_novel(result_at(0, 4)).unwrap());
        assert_eq!(h.len(), 2);
        assert_eq!(h.latest().unwrap().score(), 4);
        assert_eq!(h.previous().unwrap().score(), 5);
        assert_eq!(h.score_delta(), Some(-1));
    }

    #[test]
    fn keeps_old_enough_result_with_same_score() {
        let mut h = history_with(result_at(10, 5));
        assert!(h.push_if_novel(result_at(0, 5)).unwrap());
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn dedup_window_boundary_is_exclusive() {
        let mut h = history_with(result_at(DEDUP_WINDOW_DAYS, 5));
        assert!(h.push_if_novel(result_at(0, 5)).unwrap());
    }

    #[test]
    fn rejects_out_of_order_append() {
        let mut h = history_with(result_at(0, 5));
        assert!(matches!(
            h.push_if_novel(result_at(2, 1)),
            Err(EngineError::Precondition(_))
        ));
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn outdated_when_empty_or_stale() {
        assert!(History::new().outdated_at(now()));
        assert!(!history_with(result_at(1, 5)).outdated_at(now()));
        assert!(!history_with(result_at(3, 5)).outdated_at(now()));
        assert!(history_with(result_at(4, 5)).outdated_at(now()));
    }

    #[test]
    fn from_results_requires_chronological_order() {
        assert!(History::from_results(vec![result_at(5, 1), result_at(1, 2)]).is_ok());
        assert!(History::from_results(vec![result_at(1, 1), result_at(5, 2)]).is_err());
    }

    #[test]
    fn serializes_as_plain_list() {
        let h = History::from_results(vec![result_at(5, 1), result_at(1, 2)]).unwrap();
        let v = serde_json::to_value(&h).unwrap();
        assert_eq!(v.as_array().map(Vec::len), Some(2));
        let back: History = serde_json::from_value(v).unwrap();
        assert_eq!(back, h);
    }
}
