//! Per-role summary statistics over a record set.
//!
//! Everything here is a pure function of the records passed in and is
//! recomputed on every read.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{StageFields, StageRecord};

/// Dashboard figures for one actor's records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSummary {
    pub count: usize,
    pub total_weight: Decimal,
    pub total_value: Decimal,
    pub average_margin: Decimal,
    pub total_profit: Decimal,
    pub total_cost: Decimal,
}

pub fn total_count(records: &[StageRecord]) -> usize {
    records.len()
}

/// Sum of lot weights in kg.
pub fn total_weight(records: &[StageRecord]) -> Decimal {
    records.iter().map(|r| r.weight).sum()
}

/// Sum of weight times unit price, plus flat charges.
pub fn total_value(records: &[StageRecord]) -> Decimal {
    records.iter().map(StageRecord::value).sum()
}

/// Mean per-kg margin over the sale records. Zero when there are none.
pub fn average_margin(records: &[StageRecord]) -> Decimal {
    let margins: Vec<Decimal> = records.iter().filter_map(StageRecord::margin).collect();
    if margins.is_empty() {
        return Decimal::ZERO;
    }
    let sum: Decimal = margins.iter().sum();
    sum / Decimal::from(margins.len())
}

/// Sum of margin times weight over the sale records.
pub fn total_profit(records: &[StageRecord]) -> Decimal {
    records
        .iter()
        .filter_map(|r| r.margin().map(|m| m * r.weight))
        .sum()
}

/// What the actor paid for its lots.
///
/// Sales cost the purchase price per kg; purchases cost the buying price per
/// kg plus their flat charges. Harvests cost nothing here.
pub fn total_cost(records: &[StageRecord]) -> Decimal {
    records
        .iter()
        .map(|r| match &r.fields {
            StageFields::Sale(s) => s.purchase_price * r.weight,
            StageFields::Purchase(p) => p.buying_price * r.weight + p.other_charges,
            StageFields::Harvest(_) => Decimal::ZERO,
        })
        .sum()
}

/// All summary figures at once.
pub fn summarize(records: &[StageRecord]) -> RoleSummary {
    RoleSummary {
        count: total_count(records),
        total_weight: total_weight(records),
        total_value: total_value(records),
        average_margin: average_margin(records),
        total_profit: total_profit(records),
        total_cost: total_cost(records),
    }
}
