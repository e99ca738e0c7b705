//! Conformance test suite for `RecordStore` implementations.
//!
//! This module provides a backend-agnostic test suite that any `RecordStore`
//! implementation can run to verify correctness. The suite covers:
//!
//! - **Create**: validation, upstream resolution, nothing written on failure
//! - **Lookup**: `get` and `list_by_actor` visibility and ordering
//! - **Identity**: stage-prefixed sequential identifiers
//! - **Concurrent**: racing `tokio::spawn`ed creates all land, with distinct ids
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function that
//! creates a fresh, empty store for each test. The concurrent section spawns
//! tasks, so run it on a multi-threaded runtime:
//!
//! ```ignore
//! use krishi_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
//! async fn memory_conformance() {
//!     let report = run_conformance_suite(|| async { MemoryRecordStore::new() }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod concurrent;
mod create;
mod identity;
mod lookup;

use std::fmt;
use std::future::Future;

use krishi_core::{
    HarvestFields, NewStageRecord, PurchaseFields, SaleFields, ShipmentStatus, StageFields,
    StageRecord,
};
use rust_decimal::Decimal;

use crate::RecordStore;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "create", "lookup", "concurrent").
    pub category: String,
    /// Test name (e.g. "create_visible_to_get").
    pub name: String,
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        let (passed, message) = match result {
            Ok(()) => (true, None),
            Err(msg) => (false, Some(msg)),
        };
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed,
            message,
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in self.results.iter().filter(|r| !r.passed) {
            writeln!(
                f,
                "  FAIL [{}/{}]: {}",
                r.category,
                r.name,
                r.message.as_deref().unwrap_or("(no message)")
            )?;
        }
        Ok(())
    }
}

/// Run the full conformance suite against a record store.
///
/// The `factory` function is called once per test to create a fresh, empty
/// store, ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: RecordStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(create::run_create_tests(&factory).await);
    results.extend(lookup::run_lookup_tests(&factory).await);
    results.extend(identity::run_identity_tests(&factory).await);
    results.extend(concurrent::run_concurrent_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers: record inputs with sensible defaults ────────────────────────────

fn make_harvest(actor_id: &str, commodity: &str, weight: i64) -> NewStageRecord {
    NewStageRecord {
        actor_id: actor_id.to_string(),
        upstream_record_id: None,
        commodity_name: commodity.to_string(),
        weight: Decimal::from(weight),
        date: "2024-01-15".to_string(),
        location: "Village A, State X".to_string(),
        fields: StageFields::Harvest(HarvestFields {
            expected_price: Decimal::from(25),
        }),
    }
}

fn make_purchase(actor_id: &str, upstream: &str) -> NewStageRecord {
    NewStageRecord {
        actor_id: actor_id.to_string(),
        upstream_record_id: Some(upstream.to_string()),
        commodity_name: "Rice".to_string(),
        weight: Decimal::from(500),
        date: "2024-01-16".to_string(),
        location: "Warehouse Delhi".to_string(),
        fields: StageFields::Purchase(PurchaseFields {
            buying_price: Decimal::from(25),
            other_charges: Decimal::from(500),
            status: ShipmentStatus::InTransit,
        }),
    }
}

fn make_sale(actor_id: &str, upstream: &str) -> NewStageRecord {
    NewStageRecord {
        actor_id: actor_id.to_string(),
        upstream_record_id: Some(upstream.to_string()),
        commodity_name: "Rice".to_string(),
        weight: Decimal::from(500),
        date: "2024-01-22".to_string(),
        location: "Connaught Place, Delhi".to_string(),
        fields: StageFields::Sale(SaleFields {
            purchase_price: Decimal::from(25),
            selling_price: Decimal::from(35),
        }),
    }
}

/// Create a record, stringifying the error for test reporting.
async fn create_ok<S: RecordStore>(s: &S, new: NewStageRecord) -> Result<StageRecord, String> {
    s.create(new).await.map_err(|e| e.to_string())
}

fn record_ids(records: &[StageRecord]) -> Vec<&str> {
    records.iter().map(|r| r.record_id.as_str()).collect()
}
