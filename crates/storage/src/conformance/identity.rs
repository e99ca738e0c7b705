use std::future::Future;

use krishi_core::Stage;

use super::{create_ok, make_harvest, make_purchase, make_sale, TestResult};
use crate::RecordStore;

pub(super) async fn run_identity_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "identity",
            "next_id_after_two_harvests",
            next_id_after_two_harvests(factory).await,
        ),
        TestResult::from_result(
            "identity",
            "sequences_are_per_stage",
            sequences_are_per_stage(factory).await,
        ),
        TestResult::from_result(
            "identity",
            "next_id_matches_assigned_id",
            next_id_matches_assigned_id(factory).await,
        ),
    ]
}

// ── Test implementations ──────────────────────────────────────────────────────

async fn next_id_after_two_harvests<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    create_ok(&s, make_harvest("farmer-1", "Rice", 500)).await?;
    create_ok(&s, make_harvest("farmer-1", "Wheat", 300)).await?;
    let next = s
        .next_id(Stage::Harvest)
        .await
        .map_err(|e| e.to_string())?;
    if next != "BC003" {
        return Err(format!("expected BC003, got {}", next));
    }
    Ok(())
}

/// Each stage counts only its own records.
async fn sequences_are_per_stage<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    create_ok(&s, make_harvest("farmer-1", "Rice", 500)).await?;
    create_ok(&s, make_harvest("farmer-1", "Wheat", 300)).await?;
    create_ok(&s, make_purchase("dist-1", "BC002")).await?;

    let counts = (
        s.count_by_stage(Stage::Harvest).await,
        s.count_by_stage(Stage::Purchase).await,
        s.count_by_stage(Stage::Sale).await,
    );
    match counts {
        (Ok(2), Ok(1), Ok(0)) => {}
        other => return Err(format!("expected counts (2, 1, 0), got {:?}", other)),
    }
    let next_sale = s.next_id(Stage::Sale).await.map_err(|e| e.to_string())?;
    if next_sale != "RET001" {
        return Err(format!("expected RET001, got {}", next_sale));
    }
    Ok(())
}

async fn next_id_matches_assigned_id<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    create_ok(&s, make_harvest("farmer-1", "Rice", 500)).await?;
    create_ok(&s, make_purchase("dist-1", "BC001")).await?;
    let predicted = s.next_id(Stage::Sale).await.map_err(|e| e.to_string())?;
    let sale = create_ok(&s, make_sale("ret-1", "DIST001")).await?;
    if sale.record_id != predicted {
        return Err(format!(
            "next_id predicted {}, create assigned {}",
            predicted, sale.record_id
        ));
    }
    Ok(())
}
