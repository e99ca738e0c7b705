//! Provenance trail resolution.
//!
//! Starting from any record, follow `upstream_record_id` links back to the
//! originating harvest and return the chain in harvest-first order. Each link
//! must point at the immediately preceding stage, so a well-formed trail has
//! at most one record per stage.

use krishi_core::{Actor, Stage, StageRecord};
use krishi_storage::{get_profile, DocumentStore, RecordStore};
use serde::Serialize;

use crate::error::TraceError;

/// Upper bound on upstream links followed. A chain longer than the number of
/// stages cannot be well-formed.
pub const MAX_TRAIL_DEPTH: usize = Stage::ALL.len();

/// One record on a trail, with its author's profile when available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrailStep {
    pub record: StageRecord,
    /// `None` when the author has no stored profile.
    pub holder: Option<Actor>,
}

/// The chain of custody for one lookup code, ordered harvest first.
///
/// Never empty: a trail for a harvest has exactly one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvenanceTrail {
    pub lookup_code: String,
    pub steps: Vec<TrailStep>,
}

impl ProvenanceTrail {
    /// The harvest the lot originated from.
    pub fn origin(&self) -> &StageRecord {
        &self.steps[0].record
    }

    /// The record the lookup code named (latest stage on the trail).
    pub fn current(&self) -> &StageRecord {
        &self.steps[self.steps.len() - 1].record
    }

    pub fn commodity_name(&self) -> &str {
        &self.origin().commodity_name
    }

    /// Where the lot was last recorded.
    pub fn current_location(&self) -> &str {
        &self.current().location
    }

    pub fn records(&self) -> impl Iterator<Item = &StageRecord> {
        self.steps.iter().map(|s| &s.record)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Resolve the trail for `lookup_code` without holder profiles.
///
/// Fails with `TraceError::NotFound` when no record has that id and with
/// `TraceError::CorruptChain` when an upstream link dangles, skips or
/// repeats a stage, or the chain does not start at a harvest.
pub async fn resolve_trail<S: RecordStore + ?Sized>(
    store: &S,
    lookup_code: &str,
) -> Result<ProvenanceTrail, TraceError> {
    let code = lookup_code.trim();
    let chain = walk_upstream(store, code).await?;
    Ok(ProvenanceTrail {
        lookup_code: code.to_string(),
        steps: chain
            .into_iter()
            .map(|record| TrailStep {
                record,
                holder: None,
            })
            .collect(),
    })
}

/// Resolve the trail for `lookup_code` and attach each author's profile.
///
/// A missing profile leaves `holder` empty rather than failing the lookup.
pub async fn resolve_trail_with_holders<S, D>(
    store: &S,
    profiles: &D,
    lookup_code: &str,
) -> Result<ProvenanceTrail, TraceError>
where
    S: RecordStore + ?Sized,
    D: DocumentStore + ?Sized,
{
    let mut trail = resolve_trail(store, lookup_code).await?;
    for step in &mut trail.steps {
        step.holder = get_profile(profiles, &step.record.actor_id).await?;
        if step.holder.is_none() {
            tracing::debug!(actor_id = %step.record.actor_id, "no profile for trail holder");
        }
    }
    Ok(trail)
}

/// Follow upstream links from `code` and return the chain harvest first.
async fn walk_upstream<S: RecordStore + ?Sized>(
    store: &S,
    code: &str,
) -> Result<Vec<StageRecord>, TraceError> {
    let start = store
        .get(code)
        .await?
        .ok_or_else(|| TraceError::NotFound {
            what: "record",
            key: code.to_string(),
        })?;

    let mut chain = vec![start];
    loop {
        let last = &chain[chain.len() - 1];
        let Some(upstream_id) = last.upstream_record_id.clone() else {
            break;
        };
        if chain.len() >= MAX_TRAIL_DEPTH {
            return Err(corrupt(
                last,
                format!("more than {} links in the chain", MAX_TRAIL_DEPTH),
            ));
        }
        let upstream = store.get(&upstream_id).await?.ok_or_else(|| {
            corrupt(
                last,
                format!("upstream record {} does not exist", upstream_id),
            )
        })?;
        let expected = last.stage().predecessor();
        if Some(upstream.stage()) != expected {
            return Err(corrupt(
                last,
                format!(
                    "upstream record {} is a {} record, expected {}",
                    upstream.record_id,
                    upstream.stage(),
                    expected.map_or("none", Stage::as_str)
                ),
            ));
        }
        chain.push(upstream);
    }

    let origin = &chain[chain.len() - 1];
    if origin.stage() != Stage::Harvest {
        return Err(corrupt(
            origin,
            format!(
                "trail starts at a {} record, not a harvest",
                origin.stage()
            ),
        ));
    }

    chain.reverse();
    tracing::debug!(lookup_code = code, links = chain.len(), "trail resolved");
    Ok(chain)
}

fn corrupt(record: &StageRecord, message: String) -> TraceError {
    TraceError::CorruptChain {
        record_id: record.record_id.clone(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use krishi_core::{
        HarvestFields, NewStageRecord, PurchaseFields, SaleFields, ShipmentStatus, StageFields,
    };
    use krishi_storage::{DocumentRecordStore, MemoryDocumentStore, MemoryRecordStore, RECORDS};
    use rust_decimal::Decimal;
    use serde_json::json;

    fn harvest() -> NewStageRecord {
        NewStageRecord {
            actor_id: "farmer-1".to_string(),
            upstream_record_id: None,
            commodity_name: "Rice".to_string(),
            weight: Decimal::from(500),
            date: "2024-01-15".to_string(),
            location: "Village A, State X".to_string(),
            fields: StageFields::Harvest(HarvestFields {
                expected_price: Decimal::from(25),
            }),
        }
    }

    fn purchase(upstream: &str) -> NewStageRecord {
        NewStageRecord {
            actor_id: "dist-1".to_string(),
            upstream_record_id: Some(upstream.to_string()),
            location: "Warehouse Delhi".to_string(),
            date: "2024-01-16".to_string(),
            fields: StageFields::Purchase(PurchaseFields {
                buying_price: Decimal::from(25),
                other_charges: Decimal::from(500),
                status: ShipmentStatus::InTransit,
            }),
            ..harvest()
        }
    }

    fn sale(upstream: &str) -> NewStageRecord {
        NewStageRecord {
            actor_id: "ret-1".to_string(),
            upstream_record_id: Some(upstream.to_string()),
            location: "Connaught Place, Delhi".to_string(),
            date: "2024-01-22".to_string(),
            fields: StageFields::Sale(SaleFields {
                purchase_price: Decimal::from(25),
                selling_price: Decimal::from(35),
            }),
            ..harvest()
        }
    }

    async fn full_chain() -> MemoryRecordStore {
        let store = MemoryRecordStore::new();
        store.create(harvest()).await.unwrap();
        store.create(purchase("BC001")).await.unwrap();
        store.create(sale("DIST001")).await.unwrap();
        store
    }

    fn ids(trail: &ProvenanceTrail) -> Vec<&str> {
        trail.records().map(|r| r.record_id.as_str()).collect()
    }

    #[tokio::test]
    async fn trail_from_sale_is_harvest_first() {
        let store = full_chain().await;
        let trail = resolve_trail(&store, "RET001").await.unwrap();
        assert_eq!(ids(&trail), ["BC001", "DIST001", "RET001"]);
        assert_eq!(trail.origin().record_id, "BC001");
        assert_eq!(trail.current().margin(), Some(Decimal::from(10)));
        assert_eq!(trail.commodity_name(), "Rice");
        assert_eq!(trail.current_location(), "Connaught Place, Delhi");
    }

    #[tokio::test]
    async fn trail_from_middle_stops_at_named_record() {
        let store = full_chain().await;
        let trail = resolve_trail(&store, "DIST001").await.unwrap();
        assert_eq!(ids(&trail), ["BC001", "DIST001"]);
    }

    #[tokio::test]
    async fn trail_from_harvest_has_one_step() {
        let store = full_chain().await;
        let trail = resolve_trail(&store, " BC001 ").await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail.lookup_code, "BC001");
    }

    #[tokio::test]
    async fn unknown_code_is_not_found() {
        let store = full_chain().await;
        let err = resolve_trail(&store, "QR999").await.unwrap_err();
        assert!(matches!(err, TraceError::NotFound { ref key, .. } if key == "QR999"));
    }

    async fn raw_store(documents: Vec<serde_json::Value>) -> DocumentRecordStore<MemoryDocumentStore> {
        let docs = MemoryDocumentStore::new();
        for doc in documents {
            let key = doc["record_id"].as_str().unwrap().to_string();
            docs.put(RECORDS, &key, doc).await.unwrap();
        }
        DocumentRecordStore::new(docs)
    }

    fn raw_purchase(id: &str, upstream: &str) -> serde_json::Value {
        json!({
            "record_id": id,
            "upstream_record_id": upstream,
            "actor_id": "dist-1",
            "commodity_name": "Rice",
            "weight": "500",
            "date": "2024-01-16",
            "location": "Warehouse Delhi",
            "stage": "purchase",
            "buying_price": "25",
            "other_charges": "500",
            "status": "processing"
        })
    }

    #[tokio::test]
    async fn dangling_upstream_is_corrupt() {
        let store = raw_store(vec![raw_purchase("DIST001", "BC404")]).await;
        let err = resolve_trail(&store, "DIST001").await.unwrap_err();
        assert!(matches!(err, TraceError::CorruptChain { ref record_id, .. } if record_id == "DIST001"));
    }

    #[tokio::test]
    async fn self_reference_is_corrupt() {
        let store = raw_store(vec![raw_purchase("DIST001", "DIST001")]).await;
        let err = resolve_trail(&store, "DIST001").await.unwrap_err();
        assert!(matches!(err, TraceError::CorruptChain { .. }));
    }

    #[tokio::test]
    async fn purchase_without_upstream_is_corrupt() {
        let mut doc = raw_purchase("DIST001", "BC001");
        doc["upstream_record_id"] = serde_json::Value::Null;
        let store = raw_store(vec![doc]).await;
        let err = resolve_trail(&store, "DIST001").await.unwrap_err();
        assert!(matches!(err, TraceError::CorruptChain { .. }));
    }

    #[tokio::test]
    async fn chain_longer_than_stage_count_is_corrupt() {
        let harvest = json!({
            "record_id": "BC001",
            "upstream_record_id": "BC000",
            "actor_id": "farmer-1",
            "commodity_name": "Rice",
            "weight": "500",
            "date": "2024-01-15",
            "location": "Village A, State X",
            "stage": "harvest",
            "expected_price": "25"
        });
        let sale = json!({
            "record_id": "RET001",
            "upstream_record_id": "DIST001",
            "actor_id": "retail-1",
            "commodity_name": "Rice",
            "weight": "500",
            "date": "2024-01-22",
            "location": "Connaught Place, Delhi",
            "stage": "sale",
            "purchase_price": "25",
            "selling_price": "35"
        });
        let store = raw_store(vec![harvest, raw_purchase("DIST001", "BC001"), sale]).await;

        let err = resolve_trail(&store, "RET001").await.unwrap_err();
        match err {
            TraceError::CorruptChain { record_id, message } => {
                assert_eq!(record_id, "BC001");
                assert!(message.contains("more than 3 links"), "{message}");
            }
            other => panic!("expected CorruptChain, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn holders_attached_when_profiles_exist() {
        use krishi_core::{Actor, Role};
        use krishi_storage::put_profile;
        use time::OffsetDateTime;

        let store = full_chain().await;
        let profiles = MemoryDocumentStore::new();
        let now = OffsetDateTime::now_utc();
        put_profile(
            &profiles,
            &Actor {
                uid: "farmer-1".to_string(),
                email: "raj@example.com".to_string(),
                role: Role::Farmer,
                name: "Raj Kumar".to_string(),
                phone: None,
                address: None,
                created_at: now,
                updated_at: now,
            },
        )
        .await
        .unwrap();

        let trail = resolve_trail_with_holders(&store, &profiles, "RET001")
            .await
            .unwrap();
        assert_eq!(
            trail.steps[0].holder.as_ref().map(|a| a.name.as_str()),
            Some("Raj Kumar")
        );
        assert!(trail.steps[1].holder.is_none());
        assert!(trail.steps[2].holder.is_none());
    }
}
