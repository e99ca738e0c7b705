//! Stage records, stages, roles and actors.
//!
//! A [`StageRecord`] is one link in a lot's chain of custody. The
//! stage-specific economics live in the [`StageFields`] tagged union so that
//! each stage's required fields are enforced by the type system rather than
//! carried in an open-ended map.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

// ──────────────────────────────────────────────
// Stage
// ──────────────────────────────────────────────

/// A step in the supply chain. Ordering follows the chain:
/// `Harvest < Purchase < Sale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Harvest,
    Purchase,
    Sale,
}

impl Stage {
    /// All stages in chain order.
    pub const ALL: [Stage; 3] = [Stage::Harvest, Stage::Purchase, Stage::Sale];

    /// Record identifier prefix for this stage.
    pub fn prefix(self) -> &'static str {
        match self {
            Stage::Harvest => "BC",
            Stage::Purchase => "DIST",
            Stage::Sale => "RET",
        }
    }

    /// The stage a record of this stage must reference, if any.
    pub fn predecessor(self) -> Option<Stage> {
        match self {
            Stage::Harvest => None,
            Stage::Purchase => Some(Stage::Harvest),
            Stage::Sale => Some(Stage::Purchase),
        }
    }

    /// The only role allowed to author records of this stage.
    pub fn authoring_role(self) -> Role {
        match self {
            Stage::Harvest => Role::Farmer,
            Stage::Purchase => Role::Distributor,
            Stage::Sale => Role::Retailer,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Harvest => "harvest",
            Stage::Purchase => "purchase",
            Stage::Sale => "sale",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ──────────────────────────────────────────────
// Role / Actor
// ──────────────────────────────────────────────

/// The part an actor plays. Fixed at signup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Farmer,
    Distributor,
    Retailer,
    Customer,
}

impl Role {
    /// The stage this role records, or `None` for read-only customers.
    pub fn authored_stage(self) -> Option<Stage> {
        match self {
            Role::Farmer => Some(Stage::Harvest),
            Role::Distributor => Some(Stage::Purchase),
            Role::Retailer => Some(Stage::Sale),
            Role::Customer => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Farmer => "farmer",
            Role::Distributor => "distributor",
            Role::Retailer => "retailer",
            Role::Customer => "customer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "farmer" => Ok(Role::Farmer),
            "distributor" => Ok(Role::Distributor),
            "retailer" => Ok(Role::Retailer),
            "customer" => Ok(Role::Customer),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// A registered participant: farmer, distributor, retailer or customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub uid: String,
    pub email: String,
    pub role: Role,
    /// Display name shown on provenance trails.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

// ──────────────────────────────────────────────
// Stage-specific fields
// ──────────────────────────────────────────────

/// Where a distributor's purchased lot currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    #[default]
    Processing,
    InTransit,
    Delivered,
}

impl ShipmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ShipmentStatus::Processing => "processing",
            ShipmentStatus::InTransit => "in transit",
            ShipmentStatus::Delivered => "delivered",
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Farmer's harvest economics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestFields {
    /// Asking price per kg.
    pub expected_price: Decimal,
}

/// Distributor's purchase economics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseFields {
    /// Price paid to the farmer per kg.
    pub buying_price: Decimal,
    /// Flat transport/handling charges for the whole lot.
    pub other_charges: Decimal,
    #[serde(default)]
    pub status: ShipmentStatus,
}

/// Retailer's sale economics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleFields {
    /// Price the retailer paid per kg (the upstream purchase's buying price).
    pub purchase_price: Decimal,
    /// Price the retailer sells at per kg.
    pub selling_price: Decimal,
}

impl SaleFields {
    /// Per-kg margin: selling price minus purchase price.
    pub fn margin(&self) -> Decimal {
        self.selling_price - self.purchase_price
    }
}

/// Stage-specific attributes of a record. The variant determines the stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageFields {
    Harvest(HarvestFields),
    Purchase(PurchaseFields),
    Sale(SaleFields),
}

impl StageFields {
    pub fn stage(&self) -> Stage {
        match self {
            StageFields::Harvest(_) => Stage::Harvest,
            StageFields::Purchase(_) => Stage::Purchase,
            StageFields::Sale(_) => Stage::Sale,
        }
    }

    /// The per-kg price this stage transacts at.
    pub fn unit_price(&self) -> Decimal {
        match self {
            StageFields::Harvest(h) => h.expected_price,
            StageFields::Purchase(p) => p.buying_price,
            StageFields::Sale(s) => s.selling_price,
        }
    }

    /// Charges applied once per lot regardless of weight.
    pub fn flat_charges(&self) -> Decimal {
        match self {
            StageFields::Purchase(p) => p.other_charges,
            StageFields::Harvest(_) | StageFields::Sale(_) => Decimal::ZERO,
        }
    }

    /// Named monetary amounts, for validation and display.
    pub(crate) fn amounts(&self) -> Vec<(&'static str, Decimal)> {
        match self {
            StageFields::Harvest(h) => vec![("expected_price", h.expected_price)],
            StageFields::Purchase(p) => vec![
                ("buying_price", p.buying_price),
                ("other_charges", p.other_charges),
            ],
            StageFields::Sale(s) => vec![
                ("purchase_price", s.purchase_price),
                ("selling_price", s.selling_price),
            ],
        }
    }
}

// ──────────────────────────────────────────────
// Records
// ──────────────────────────────────────────────

/// A stored stage record.
///
/// Serializes flat: the stage fields sit next to the common fields, tagged
/// by a `"stage"` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub record_id: String,
    /// The immediately preceding stage's record. `None` only for harvests.
    pub upstream_record_id: Option<String>,
    /// Author of the record.
    pub actor_id: String,
    pub commodity_name: String,
    /// Lot weight in kg. Always positive.
    pub weight: Decimal,
    #[serde(with = "iso_date")]
    pub date: Date,
    pub location: String,
    #[serde(flatten)]
    pub fields: StageFields,
}

impl StageRecord {
    pub fn stage(&self) -> Stage {
        self.fields.stage()
    }

    /// Per-kg margin for sale records.
    pub fn margin(&self) -> Option<Decimal> {
        match &self.fields {
            StageFields::Sale(s) => Some(s.margin()),
            _ => None,
        }
    }

    /// Weight times unit price, plus any flat charges.
    pub fn value(&self) -> Decimal {
        self.weight * self.fields.unit_price() + self.fields.flat_charges()
    }
}

/// Input for creating a stage record. The store validates it and assigns
/// the record identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStageRecord {
    pub actor_id: String,
    #[serde(default)]
    pub upstream_record_id: Option<String>,
    pub commodity_name: String,
    pub weight: Decimal,
    /// Calendar date as entered, `YYYY-MM-DD`.
    pub date: String,
    pub location: String,
    pub fields: StageFields,
}

impl NewStageRecord {
    pub fn stage(&self) -> Stage {
        self.fields.stage()
    }

    /// The trimmed upstream reference, treating blank input as absent.
    pub fn upstream_id(&self) -> Option<&str> {
        self.upstream_record_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Build the stored record once validation has produced the parsed date.
    pub fn into_record(self, record_id: String, date: Date) -> StageRecord {
        StageRecord {
            record_id,
            upstream_record_id: self.upstream_id().map(str::to_string),
            actor_id: self.actor_id,
            commodity_name: self.commodity_name.trim().to_string(),
            weight: self.weight,
            date,
            location: self.location.trim().to_string(),
            fields: self.fields,
        }
    }
}

/// `YYYY-MM-DD` serde adapter for [`time::Date`].
pub(crate) mod iso_date {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    use crate::validate::DATE_FORMAT;

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        let text = date
            .format(DATE_FORMAT)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Date::parse(&raw, DATE_FORMAT).map_err(D::Error::custom)
    }
}
