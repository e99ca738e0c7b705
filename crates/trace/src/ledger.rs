//! Role-aware recording of supply-chain stages.
//!
//! The [`Ledger`] is what a signed-in actor talks to. It checks that the
//! actor's role authors the stage, carries the lot's commodity and weight
//! forward from the upstream record, and hands the assembled record to the
//! [`RecordStore`] for validation and storage.

use krishi_core::{
    summarize, Actor, HarvestFields, NewStageRecord, PriceTable, PurchaseFields, RoleSummary,
    SaleFields, ShipmentStatus, Stage, StageFields, StageRecord, ValidationError,
};
use krishi_storage::RecordStore;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::TraceError;
use crate::resolver::{resolve_trail, ProvenanceTrail};

/// A farmer's harvest form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestInput {
    pub commodity_name: String,
    pub weight: Decimal,
    pub harvest_date: String,
    /// Defaults to the farmer's profile address.
    #[serde(default)]
    pub location: Option<String>,
    /// Asking price per kg. Defaults to the reference price suggestion.
    #[serde(default)]
    pub expected_price: Option<Decimal>,
}

/// A distributor's purchase form. Commodity and weight come from the harvest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseInput {
    pub harvest_record_id: String,
    pub purchase_date: String,
    /// Defaults to the distributor's profile address.
    #[serde(default)]
    pub location: Option<String>,
    pub buying_price: Decimal,
    #[serde(default)]
    pub other_charges: Decimal,
    #[serde(default)]
    pub status: ShipmentStatus,
}

/// A retailer's sale form. Commodity, weight and the purchase price come
/// from the upstream purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleInput {
    pub purchase_record_id: String,
    pub sale_date: String,
    /// Defaults to the retailer's profile address.
    #[serde(default)]
    pub location: Option<String>,
    pub selling_price: Decimal,
}

/// Stage recording and per-actor reporting over a record store.
#[derive(Debug)]
pub struct Ledger<S> {
    store: S,
    prices: PriceTable,
}

impl<S: RecordStore> Ledger<S> {
    pub fn new(store: S, prices: PriceTable) -> Self {
        Ledger { store, prices }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn prices(&self) -> &PriceTable {
        &self.prices
    }

    pub async fn record_harvest(
        &self,
        actor: &Actor,
        input: HarvestInput,
    ) -> Result<StageRecord, TraceError> {
        ensure_role(actor, Stage::Harvest)?;
        let expected_price = match input.expected_price {
            Some(price) => price,
            None => self
                .prices
                .suggested_price_per_kg(&input.commodity_name)
                .ok_or(ValidationError::MissingField {
                    field: "expected_price",
                })?,
        };
        let new = NewStageRecord {
            actor_id: actor.uid.clone(),
            upstream_record_id: None,
            commodity_name: input.commodity_name,
            weight: input.weight,
            date: input.harvest_date,
            location: location_or_address(input.location, actor),
            fields: StageFields::Harvest(HarvestFields { expected_price }),
        };
        Ok(self.store.create(new).await?)
    }

    pub async fn record_purchase(
        &self,
        actor: &Actor,
        input: PurchaseInput,
    ) -> Result<StageRecord, TraceError> {
        ensure_role(actor, Stage::Purchase)?;
        let harvest = self
            .upstream(&input.harvest_record_id, Stage::Harvest)
            .await?;
        let new = NewStageRecord {
            actor_id: actor.uid.clone(),
            upstream_record_id: Some(harvest.record_id),
            commodity_name: harvest.commodity_name,
            weight: harvest.weight,
            date: input.purchase_date,
            location: location_or_address(input.location, actor),
            fields: StageFields::Purchase(PurchaseFields {
                buying_price: input.buying_price,
                other_charges: input.other_charges,
                status: input.status,
            }),
        };
        Ok(self.store.create(new).await?)
    }

    pub async fn record_sale(
        &self,
        actor: &Actor,
        input: SaleInput,
    ) -> Result<StageRecord, TraceError> {
        ensure_role(actor, Stage::Sale)?;
        let purchase = self
            .upstream(&input.purchase_record_id, Stage::Purchase)
            .await?;
        let StageFields::Purchase(PurchaseFields { buying_price, .. }) = purchase.fields else {
            return Err(TraceError::UnknownUpstreamReference {
                upstream_record_id: purchase.record_id,
                expected: Stage::Purchase,
            });
        };
        let new = NewStageRecord {
            actor_id: actor.uid.clone(),
            upstream_record_id: Some(purchase.record_id),
            commodity_name: purchase.commodity_name,
            weight: purchase.weight,
            date: input.sale_date,
            location: location_or_address(input.location, actor),
            fields: StageFields::Sale(SaleFields {
                purchase_price: buying_price,
                selling_price: input.selling_price,
            }),
        };
        Ok(self.store.create(new).await?)
    }

    pub async fn record(&self, record_id: &str) -> Result<StageRecord, TraceError> {
        self.store
            .get(record_id.trim())
            .await?
            .ok_or_else(|| TraceError::NotFound {
                what: "record",
                key: record_id.trim().to_string(),
            })
    }

    /// Records authored by `actor_id`, in creation order.
    pub async fn records_for(&self, actor_id: &str) -> Result<Vec<StageRecord>, TraceError> {
        Ok(self.store.list_by_actor(actor_id).await?)
    }

    /// Dashboard totals over the actor's records.
    pub async fn summary(&self, actor_id: &str) -> Result<RoleSummary, TraceError> {
        let records = self.records_for(actor_id).await?;
        Ok(summarize(&records))
    }

    pub async fn trail(&self, lookup_code: &str) -> Result<ProvenanceTrail, TraceError> {
        resolve_trail(&self.store, lookup_code).await
    }

    /// Fetch the record named by a form's upstream field, requiring `stage`.
    async fn upstream(&self, record_id: &str, stage: Stage) -> Result<StageRecord, TraceError> {
        let record_id = record_id.trim();
        if record_id.is_empty() {
            return Err(ValidationError::MissingField {
                field: "upstream_record_id",
            }
            .into());
        }
        match self.store.get(record_id).await? {
            Some(record) if record.stage() == stage => Ok(record),
            _ => Err(TraceError::UnknownUpstreamReference {
                upstream_record_id: record_id.to_string(),
                expected: stage,
            }),
        }
    }
}

fn ensure_role(actor: &Actor, stage: Stage) -> Result<(), TraceError> {
    if actor.role.authored_stage() == Some(stage) {
        Ok(())
    } else {
        Err(TraceError::RoleNotPermitted {
            role: actor.role,
            stage,
        })
    }
}

/// The form's location if filled in, otherwise the actor's address. An
/// empty result is rejected by record validation.
fn location_or_address(location: Option<String>, actor: &Actor) -> String {
    location
        .filter(|l| !l.trim().is_empty())
        .or_else(|| actor.address.clone())
        .unwrap_or_default()
}
