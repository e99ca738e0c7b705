//! krishi-core: supply-chain traceability domain for Krishi.
//!
//! Models the chain of custody for an agricultural lot as a sequence of
//! stage records (harvest, purchase, sale), each pointing at the record of
//! the stage before it.
//!
//! # Public API
//!
//! Key types are re-exported at the crate root for convenience:
//!
//! - [`StageRecord`], [`NewStageRecord`], [`StageFields`] -- the record model
//! - [`Stage`], [`Role`], [`Actor`] -- stages and the actors that author them
//! - [`PriceTable`], [`PriceReference`] -- commodity price reference lookup
//! - [`RoleSummary`] and the free functions in [`aggregate`]
//! - [`next_id()`] -- stage-prefixed record identifiers
//! - [`ValidationError`] -- rejected record input

pub mod aggregate;
pub mod identity;
pub mod pricing;
pub mod types;
pub mod validate;

/// Kilograms in one quintal, the unit the price reference table is quoted in.
pub const KG_PER_QUINTAL: u32 = 100;

// ── Convenience re-exports ───────────────────────────────────────────

pub use aggregate::{summarize, RoleSummary};
pub use identity::{next_id, stage_of};
pub use pricing::{PriceRange, PriceReference, PriceTable, Trend};
pub use types::{
    Actor, HarvestFields, NewStageRecord, PurchaseFields, Role, SaleFields, ShipmentStatus, Stage,
    StageFields, StageRecord,
};
pub use validate::{parse_date, validate_new_record, ValidationError, DATE_FORMAT};
