use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteResponse {
    pub symbol: String,
    pub date: NaiveDate,
    pub close: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentSnapshotResponse {
    pub symbol: String,
    pub name: String,
    pub previous_close: f64,
    pub currency: String,
    pub market_cap: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundamentalsResponse {
    pub symbol: String,
    #[serde(default)]
    pub roe: BTreeMap<i32, f64>,
    #[serde(default)]
    pub ebit_margin: BTreeMap<i32, f64>,
    #[serde(default)]
    pub equity_ratio: BTreeMap<i32, f64>,
    #[serde(default)]
    pub eps: BTreeMap<i32, Vec<EpsRevisionItem>>,
    pub analyst_ratings: Option<AnalystRatingsItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpsRevisionItem {
    pub value: f64,
    pub currency: String,
    pub revision_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalystRatingsItem {
    pub buy: u32,
    pub hold: u32,
    pub sell: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarterlyFiguresResponse {
    pub symbol: String,
    pub release_dates: Vec<NaiveDate>,
}
