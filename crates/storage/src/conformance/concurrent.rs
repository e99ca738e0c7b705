use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use krishi_core::Stage;

use super::{make_harvest, make_purchase, record_ids, TestResult};
use crate::{RecordStore, StorageError};

/// Number of concurrent tasks to spawn in each test.
const N: usize = 20;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "concurrent",
            "concurrent_creates_all_stored",
            concurrent_creates_all_stored(factory).await,
        ),
        TestResult::from_result(
            "concurrent",
            "concurrent_creates_same_actor_listed",
            concurrent_creates_same_actor_listed(factory).await,
        ),
        TestResult::from_result(
            "concurrent",
            "concurrent_purchases_of_one_harvest",
            concurrent_purchases_of_one_harvest(factory).await,
        ),
    ]
}

/// Await every handle, failing on a panicked task or a storage error.
async fn join_all(
    handles: Vec<tokio::task::JoinHandle<Result<String, StorageError>>>,
) -> Result<Vec<String>, String> {
    let mut ids = Vec::with_capacity(handles.len());
    for handle in handles {
        let id = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e| format!("storage error: {e}"))?;
        ids.push(id);
    }
    Ok(ids)
}

// ── Different actors: every create lands ─────────────────────────────────────

/// N farmers each create a harvest at once. Every create succeeds with a
/// distinct id and every returned record is readable afterwards.
async fn concurrent_creates_all_stored<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);

    let mut handles = Vec::new();
    for i in 0..N {
        let s = store.clone();
        handles.push(tokio::spawn(async move {
            let record = s.create(make_harvest(&format!("farmer-{i}"), "Rice", 100)).await?;
            Ok::<_, StorageError>(record.record_id)
        }));
    }
    let ids = join_all(handles).await?;

    let distinct: BTreeSet<&str> = ids.iter().map(String::as_str).collect();
    if distinct.len() != N {
        return Err(format!("expected {N} distinct ids, got {}", distinct.len()));
    }

    for (i, id) in ids.iter().enumerate() {
        let actor = format!("farmer-{i}");
        let stored = store
            .get(id)
            .await
            .map_err(|e| format!("get {id}: {e}"))?
            .ok_or_else(|| format!("{id} returned Ok but is not stored"))?;
        if stored.actor_id != actor {
            return Err(format!(
                "{id} was created by {actor} but is stored for {}",
                stored.actor_id
            ));
        }
        let listed = store
            .list_by_actor(&actor)
            .await
            .map_err(|e| format!("list {actor}: {e}"))?;
        if record_ids(&listed) != [id.as_str()] {
            return Err(format!("{actor} lists {:?}, expected [{id}]", record_ids(&listed)));
        }
    }

    let count = store
        .count_by_stage(Stage::Harvest)
        .await
        .map_err(|e| format!("count: {e}"))?;
    if count != N {
        return Err(format!("expected {N} harvests stored, got {count}"));
    }
    Ok(())
}

// ── Same actor: all records listed ───────────────────────────────────────────

/// One farmer fires N creates at once; `list_by_actor` returns all of them.
async fn concurrent_creates_same_actor_listed<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);

    let mut handles = Vec::new();
    for _ in 0..N {
        let s = store.clone();
        handles.push(tokio::spawn(async move {
            let record = s.create(make_harvest("farmer-1", "Wheat", 50)).await?;
            Ok::<_, StorageError>(record.record_id)
        }));
    }
    let ids: BTreeSet<String> = join_all(handles).await?.into_iter().collect();

    let listed = store
        .list_by_actor("farmer-1")
        .await
        .map_err(|e| format!("list: {e}"))?;
    let listed: BTreeSet<String> = listed.into_iter().map(|r| r.record_id).collect();
    if ids.len() != N || listed != ids {
        return Err(format!(
            "created {} distinct ids, listed {:?}",
            ids.len(),
            listed
        ));
    }
    Ok(())
}

// ── Downstream creates race on the same upstream ─────────────────────────────

/// N distributors buy from the same harvest at once. Each gets its own
/// purchase id, all pointing at the harvest.
async fn concurrent_purchases_of_one_harvest<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);
    let harvest = store
        .create(make_harvest("farmer-1", "Rice", 500))
        .await
        .map_err(|e| format!("harvest: {e}"))?;

    let mut handles = Vec::new();
    for i in 0..N {
        let s = store.clone();
        let upstream = harvest.record_id.clone();
        handles.push(tokio::spawn(async move {
            let record = s
                .create(make_purchase(&format!("distributor-{i}"), &upstream))
                .await?;
            Ok::<_, StorageError>(record.record_id)
        }));
    }
    let ids = join_all(handles).await?;

    let distinct: BTreeSet<&str> = ids.iter().map(String::as_str).collect();
    if distinct.len() != N {
        return Err(format!("expected {N} distinct ids, got {}", distinct.len()));
    }
    for id in &ids {
        let stored = store
            .get(id)
            .await
            .map_err(|e| format!("get {id}: {e}"))?
            .ok_or_else(|| format!("{id} returned Ok but is not stored"))?;
        if stored.upstream_record_id.as_deref() != Some(harvest.record_id.as_str()) {
            return Err(format!("{id} lost its upstream reference"));
        }
    }
    Ok(())
}
