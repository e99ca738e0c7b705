use std::future::Future;

use super::{create_ok, make_harvest, make_purchase, record_ids, TestResult};
use crate::RecordStore;

pub(super) async fn run_lookup_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "lookup",
            "create_visible_to_get",
            create_visible_to_get(factory).await,
        ),
        TestResult::from_result(
            "lookup",
            "get_unknown_returns_none",
            get_unknown_returns_none(factory).await,
        ),
        TestResult::from_result(
            "lookup",
            "list_by_actor_in_creation_order",
            list_by_actor_in_creation_order(factory).await,
        ),
        TestResult::from_result(
            "lookup",
            "list_by_actor_excludes_other_actors",
            list_by_actor_excludes_other_actors(factory).await,
        ),
        TestResult::from_result(
            "lookup",
            "list_by_unknown_actor_is_empty",
            list_by_unknown_actor_is_empty(factory).await,
        ),
    ]
}

// ── Test implementations ──────────────────────────────────────────────────────

/// A created record reads back field-for-field.
async fn create_visible_to_get<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let created = create_ok(&s, make_harvest("farmer-1", "Wheat", 300)).await?;
    let fetched = s
        .get(&created.record_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("{} not found after create", created.record_id))?;
    if fetched != created {
        return Err(format!("expected {:?}, got {:?}", created, fetched));
    }
    Ok(())
}

async fn get_unknown_returns_none<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.get("RET404").await {
        Ok(None) => Ok(()),
        Ok(Some(rec)) => Err(format!("expected None, got {}", rec.record_id)),
        Err(e) => Err(format!("expected Ok(None), got error {}", e)),
    }
}

async fn list_by_actor_in_creation_order<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    for (commodity, weight) in [("Rice", 500), ("Wheat", 300), ("Corn", 200)] {
        create_ok(&s, make_harvest("farmer-1", commodity, weight)).await?;
    }
    let listed = s
        .list_by_actor("farmer-1")
        .await
        .map_err(|e| e.to_string())?;
    let ids = record_ids(&listed);
    if ids != ["BC001", "BC002", "BC003"] {
        return Err(format!("expected [BC001, BC002, BC003], got {:?}", ids));
    }
    Ok(())
}

async fn list_by_actor_excludes_other_actors<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    create_ok(&s, make_harvest("farmer-1", "Rice", 500)).await?;
    create_ok(&s, make_harvest("farmer-2", "Onion", 100)).await?;
    create_ok(&s, make_purchase("dist-1", "BC001")).await?;

    let listed = s
        .list_by_actor("farmer-2")
        .await
        .map_err(|e| e.to_string())?;
    let ids = record_ids(&listed);
    if ids != ["BC002"] {
        return Err(format!("expected [BC002], got {:?}", ids));
    }
    Ok(())
}

async fn list_by_unknown_actor_is_empty<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    create_ok(&s, make_harvest("farmer-1", "Rice", 500)).await?;
    let listed = s
        .list_by_actor("customer-1")
        .await
        .map_err(|e| e.to_string())?;
    if !listed.is_empty() {
        return Err(format!("expected no records, got {:?}", record_ids(&listed)));
    }
    Ok(())
}
