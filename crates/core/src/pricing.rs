//! Commodity price reference table.
//!
//! A static table of recommended and market prices per commodity, quoted per
//! quintal. Lookups are case-insensitive and fall back to substring matching
//! in table order: the first entry that matches wins, not the closest one.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use time::macros::date;
use time::Date;

use crate::KG_PER_QUINTAL;

/// Maximum number of names returned by [`PriceTable::search`].
pub const SEARCH_LIMIT: usize = 5;

/// Queries shorter than this (in characters) return no search results.
pub const MIN_SEARCH_LEN: usize = 2;

/// Direction the market price is moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Stable => "stable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Decimal,
    pub max: Decimal,
}

/// Reference prices for one commodity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceReference {
    /// Lowercase lookup key, e.g. `"rice"`.
    pub key: String,
    /// Display name, e.g. `"Rice"`.
    pub commodity: String,
    pub recommended_price: Decimal,
    pub market_price: Decimal,
    pub range: PriceRange,
    pub unit: String,
    #[serde(with = "crate::types::iso_date")]
    pub last_updated: Date,
    pub trend: Trend,
    /// Factors driving the price, most significant first.
    pub factors: Vec<String>,
}

impl PriceReference {
    /// Recommended price converted to a whole-rupee per-kg figure.
    pub fn suggested_price_per_kg(&self) -> Decimal {
        (self.recommended_price / Decimal::from(KG_PER_QUINTAL))
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
    }
}

/// An ordered, immutable price reference table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceTable {
    entries: Vec<PriceReference>,
}

impl Default for PriceTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PriceTable {
    /// Build a table from loaded entries, keeping their order.
    ///
    /// Keys are normalized to trimmed lowercase.
    pub fn from_entries(entries: Vec<PriceReference>) -> Self {
        let entries = entries
            .into_iter()
            .map(|mut e| {
                e.key = e.key.trim().to_lowercase();
                e
            })
            .collect();
        PriceTable { entries }
    }

    /// The built-in reference table.
    pub fn builtin() -> Self {
        let updated = date!(2024 - 01 - 22);
        let entry = |key: &str,
                     name: &str,
                     prices: [i64; 4],
                     trend: Trend,
                     factors: [&str; 3]| PriceReference {
            key: key.to_string(),
            commodity: name.to_string(),
            recommended_price: Decimal::from(prices[0]),
            market_price: Decimal::from(prices[1]),
            range: PriceRange {
                min: Decimal::from(prices[2]),
                max: Decimal::from(prices[3]),
            },
            unit: "per quintal".to_string(),
            last_updated: updated,
            trend,
            factors: factors.iter().map(|f| f.to_string()).collect(),
        };

        PriceTable::from_entries(vec![
            entry(
                "rice",
                "Rice",
                [2800, 2650, 2500, 3000],
                Trend::Up,
                [
                    "High demand in urban markets",
                    "Good quality expected",
                    "Seasonal price increase",
                ],
            ),
            entry(
                "wheat",
                "Wheat",
                [2200, 2150, 2000, 2400],
                Trend::Stable,
                [
                    "Stable demand",
                    "Average quality expected",
                    "Government procurement available",
                ],
            ),
            entry(
                "corn",
                "Corn",
                [1800, 1750, 1600, 2000],
                Trend::Up,
                [
                    "Feed industry demand",
                    "Export opportunities",
                    "Weather concerns in other regions",
                ],
            ),
            entry(
                "sugarcane",
                "Sugarcane",
                [350, 320, 300, 380],
                Trend::Up,
                [
                    "Sugar mill procurement",
                    "Good sugar recovery rate",
                    "Festival season demand",
                ],
            ),
            entry(
                "tomato",
                "Tomato",
                [2500, 2200, 1800, 3000],
                Trend::Up,
                [
                    "Cold storage shortage",
                    "High restaurant demand",
                    "Transport cost increase",
                ],
            ),
            entry(
                "onion",
                "Onion",
                [1200, 1100, 900, 1500],
                Trend::Stable,
                [
                    "Steady household demand",
                    "Storage availability",
                    "Government buffer stock",
                ],
            ),
            entry(
                "potato",
                "Potato",
                [800, 750, 600, 1000],
                Trend::Down,
                [
                    "Oversupply in market",
                    "Good storage conditions",
                    "Import competition",
                ],
            ),
            entry(
                "cotton",
                "Cotton",
                [6200, 5800, 5500, 6500],
                Trend::Up,
                [
                    "Textile industry recovery",
                    "Export demand rising",
                    "Quality premium available",
                ],
            ),
        ])
    }

    pub fn entries(&self) -> &[PriceReference] {
        &self.entries
    }

    /// Look up a commodity by name.
    ///
    /// Exact case-insensitive key match first; otherwise the first entry
    /// whose key contains the query or is contained in it. A blank or
    /// whitespace-only name matches nothing rather than the first entry.
    pub fn lookup(&self, name: &str) -> Option<&PriceReference> {
        let normalized = name.trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|e| e.key == normalized)
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|e| e.key.contains(&normalized) || normalized.contains(&e.key))
            })
    }

    /// Display names of commodities whose key or display name contains the
    /// query, in table order, at most [`SEARCH_LIMIT`].
    pub fn search(&self, query: &str) -> Vec<&str> {
        if query.chars().count() < MIN_SEARCH_LEN {
            return Vec::new();
        }
        let normalized = query.to_lowercase();
        self.entries
            .iter()
            .filter(|e| {
                e.key.contains(&normalized) || e.commodity.to_lowercase().contains(&normalized)
            })
            .map(|e| e.commodity.as_str())
            .take(SEARCH_LIMIT)
            .collect()
    }

    /// All display names in table order.
    pub fn all_commodities(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.commodity.as_str()).collect()
    }

    /// Per-kg price suggestion for a commodity name, if it resolves.
    pub fn suggested_price_per_kg(&self, name: &str) -> Option<Decimal> {
        self.lookup(name).map(PriceReference::suggested_price_per_kg)
    }
}
