use std::future::Future;

use krishi_core::{Stage, ValidationError};
use rust_decimal::Decimal;

use super::{create_ok, make_harvest, make_purchase, make_sale, TestResult};
use crate::{RecordStore, StorageError};

pub(super) async fn run_create_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "create",
            "create_harvest_assigns_id",
            create_harvest_assigns_id(factory).await,
        ),
        TestResult::from_result(
            "create",
            "create_full_chain",
            create_full_chain(factory).await,
        ),
        TestResult::from_result(
            "create",
            "create_trims_commodity_and_location",
            create_trims_commodity_and_location(factory).await,
        ),
        TestResult::from_result(
            "create",
            "unknown_upstream_rejected",
            unknown_upstream_rejected(factory).await,
        ),
        TestResult::from_result(
            "create",
            "wrong_stage_upstream_rejected",
            wrong_stage_upstream_rejected(factory).await,
        ),
        TestResult::from_result(
            "create",
            "failed_create_leaves_store_unchanged",
            failed_create_leaves_store_unchanged(factory).await,
        ),
        TestResult::from_result(
            "create",
            "non_positive_weight_rejected",
            non_positive_weight_rejected(factory).await,
        ),
        TestResult::from_result(
            "create",
            "invalid_date_rejected",
            invalid_date_rejected(factory).await,
        ),
        TestResult::from_result(
            "create",
            "harvest_with_upstream_rejected",
            harvest_with_upstream_rejected(factory).await,
        ),
    ]
}

// ── Test implementations ──────────────────────────────────────────────────────

/// The first harvest in an empty store is BC001 with no upstream.
async fn create_harvest_assigns_id<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let rec = create_ok(&s, make_harvest("farmer-1", "Rice", 500)).await?;
    if rec.record_id != "BC001" {
        return Err(format!("expected BC001, got {}", rec.record_id));
    }
    if rec.upstream_record_id.is_some() {
        return Err("harvest should have no upstream".to_string());
    }
    if rec.stage() != Stage::Harvest {
        return Err(format!("expected harvest stage, got {}", rec.stage()));
    }
    Ok(())
}

/// Harvest -> purchase -> sale links each record to its predecessor.
async fn create_full_chain<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let harvest = create_ok(&s, make_harvest("farmer-1", "Rice", 500)).await?;
    let purchase = create_ok(&s, make_purchase("dist-1", &harvest.record_id)).await?;
    let sale = create_ok(&s, make_sale("ret-1", &purchase.record_id)).await?;

    if purchase.record_id != "DIST001" || sale.record_id != "RET001" {
        return Err(format!(
            "expected DIST001/RET001, got {}/{}",
            purchase.record_id, sale.record_id
        ));
    }
    if purchase.upstream_record_id.as_deref() != Some("BC001") {
        return Err(format!(
            "purchase upstream: expected BC001, got {:?}",
            purchase.upstream_record_id
        ));
    }
    if sale.upstream_record_id.as_deref() != Some("DIST001") {
        return Err(format!(
            "sale upstream: expected DIST001, got {:?}",
            sale.upstream_record_id
        ));
    }
    if sale.margin() != Some(Decimal::from(10)) {
        return Err(format!("expected margin 10, got {:?}", sale.margin()));
    }
    Ok(())
}

/// Surrounding whitespace in text fields and the upstream id is dropped.
async fn create_trims_commodity_and_location<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut harvest = make_harvest("farmer-1", "  Rice ", 500);
    harvest.location = " Village A ".to_string();
    let rec = create_ok(&s, harvest).await?;
    if rec.commodity_name != "Rice" || rec.location != "Village A" {
        return Err(format!(
            "expected trimmed fields, got {:?}/{:?}",
            rec.commodity_name, rec.location
        ));
    }
    let purchase = create_ok(&s, make_purchase("dist-1", " BC001 ")).await?;
    if purchase.upstream_record_id.as_deref() != Some("BC001") {
        return Err(format!(
            "expected trimmed upstream, got {:?}",
            purchase.upstream_record_id
        ));
    }
    Ok(())
}

/// A purchase naming a non-existent harvest fails with UnknownUpstreamReference.
async fn unknown_upstream_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.create(make_purchase("dist-1", "BC999")).await {
        Err(StorageError::UnknownUpstreamReference {
            upstream_record_id,
            expected: Stage::Harvest,
        }) if upstream_record_id == "BC999" => Ok(()),
        Err(e) => Err(format!("expected UnknownUpstreamReference, got {}", e)),
        Ok(rec) => Err(format!("expected error, created {}", rec.record_id)),
    }
}

/// A sale must reference a purchase; pointing it at a harvest fails.
async fn wrong_stage_upstream_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    create_ok(&s, make_harvest("farmer-1", "Rice", 500)).await?;
    match s.create(make_sale("ret-1", "BC001")).await {
        Err(StorageError::UnknownUpstreamReference {
            expected: Stage::Purchase,
            ..
        }) => Ok(()),
        Err(e) => Err(format!("expected UnknownUpstreamReference, got {}", e)),
        Ok(rec) => Err(format!("expected error, created {}", rec.record_id)),
    }
}

/// A rejected create is invisible to get, list_by_actor and the id counter.
async fn failed_create_leaves_store_unchanged<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    if s.create(make_purchase("dist-1", "BC001")).await.is_ok() {
        return Err("purchase with dangling upstream was accepted".to_string());
    }
    let listed = s
        .list_by_actor("dist-1")
        .await
        .map_err(|e| e.to_string())?;
    if !listed.is_empty() {
        return Err(format!("expected no records, got {}", listed.len()));
    }
    if s.get("DIST001").await.map_err(|e| e.to_string())?.is_some() {
        return Err("DIST001 should not exist".to_string());
    }
    let count = s
        .count_by_stage(Stage::Purchase)
        .await
        .map_err(|e| e.to_string())?;
    if count != 0 {
        return Err(format!("expected 0 purchases, got {}", count));
    }
    Ok(())
}

async fn non_positive_weight_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.create(make_harvest("farmer-1", "Rice", -5)).await {
        Err(StorageError::Validation(ValidationError::NonPositiveWeight { .. })) => Ok(()),
        Err(e) => Err(format!("expected NonPositiveWeight, got {}", e)),
        Ok(rec) => Err(format!("expected error, created {}", rec.record_id)),
    }
}

async fn invalid_date_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut harvest = make_harvest("farmer-1", "Rice", 500);
    harvest.date = "2024-13-01".to_string();
    match s.create(harvest).await {
        Err(StorageError::Validation(ValidationError::InvalidDate { .. })) => Ok(()),
        Err(e) => Err(format!("expected InvalidDate, got {}", e)),
        Ok(rec) => Err(format!("expected error, created {}", rec.record_id)),
    }
}

async fn harvest_with_upstream_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let mut harvest = make_harvest("farmer-1", "Rice", 500);
    harvest.upstream_record_id = Some("BC000".to_string());
    match s.create(harvest).await {
        Err(StorageError::Validation(ValidationError::UnexpectedUpstream { .. })) => Ok(()),
        Err(e) => Err(format!("expected UnexpectedUpstream, got {}", e)),
        Ok(rec) => Err(format!("expected error, created {}", rec.record_id)),
    }
}
