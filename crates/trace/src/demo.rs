//! Demonstration dataset: two lots traced from farm to shelf.
//!
//! Lot one is Raj Kumar's rice (BC001 -> DIST001 -> RET001), lot two Priya
//! Sharma's wheat (BC002 -> DIST002 -> RET002). Every demo account signs in
//! with [`DEMO_PASSWORD`].

use krishi_core::{Actor, Role, ShipmentStatus, StageRecord};
use krishi_storage::RecordStore;
use rust_decimal::Decimal;

use crate::auth::{AuthProvider, SignupProfile};
use crate::error::TraceError;
use crate::ledger::{HarvestInput, Ledger, PurchaseInput, SaleInput};

pub const DEMO_PASSWORD: &str = "krishi-demo";

/// Accounts and records created by [`seed_demo`].
#[derive(Debug, Clone)]
pub struct DemoDataset {
    pub actors: Vec<Actor>,
    pub records: Vec<StageRecord>,
}

struct DemoLot {
    farmer: (&'static str, &'static str, &'static str),
    distributor: (&'static str, &'static str, &'static str),
    retailer: (&'static str, &'static str, &'static str),
    commodity: &'static str,
    weight: i64,
    dates: [&'static str; 3],
    expected_price: i64,
    buying_price: i64,
    other_charges: i64,
    status: ShipmentStatus,
    selling_price: i64,
}

const LOTS: [DemoLot; 2] = [
    DemoLot {
        farmer: ("raj@demo.krishi", "Raj Kumar", "Village Rampur, Uttar Pradesh"),
        distributor: ("agriflow@demo.krishi", "AgriFlow Logistics", "Warehouse Delhi"),
        retailer: ("freshmart@demo.krishi", "Fresh Mart", "Connaught Place, Delhi"),
        commodity: "Rice",
        weight: 500,
        dates: ["2024-01-15", "2024-01-16", "2024-01-22"],
        expected_price: 25,
        buying_price: 25,
        other_charges: 500,
        status: ShipmentStatus::InTransit,
        selling_price: 35,
    },
    DemoLot {
        farmer: ("priya@demo.krishi", "Priya Sharma", "Village Khetri, Rajasthan"),
        distributor: ("grainflow@demo.krishi", "GrainFlow Solutions", "Warehouse Mumbai"),
        retailer: ("superbazaar@demo.krishi", "Super Bazaar", "Bandra, Mumbai"),
        commodity: "Wheat",
        weight: 300,
        dates: ["2024-01-20", "2024-01-21", "2024-01-26"],
        expected_price: 30,
        buying_price: 30,
        other_charges: 300,
        status: ShipmentStatus::Delivered,
        selling_price: 40,
    },
];

/// Register the demo accounts and record both lots.
///
/// Records are created stage by stage across lots, so harvests get BC001 and
/// BC002, purchases DIST001 and DIST002, sales RET001 and RET002. Expects an
/// empty store; signing up an existing demo email fails.
pub async fn seed_demo<S, A>(ledger: &Ledger<S>, auth: &A) -> Result<DemoDataset, TraceError>
where
    S: RecordStore,
    A: AuthProvider + ?Sized,
{
    let mut farmers = Vec::new();
    let mut distributors = Vec::new();
    let mut retailers = Vec::new();
    for lot in &LOTS {
        farmers.push(sign_up(auth, Role::Farmer, lot.farmer).await?);
        distributors.push(sign_up(auth, Role::Distributor, lot.distributor).await?);
        retailers.push(sign_up(auth, Role::Retailer, lot.retailer).await?);
    }

    let mut harvests = Vec::new();
    for (lot, farmer) in LOTS.iter().zip(&farmers) {
        let input = HarvestInput {
            commodity_name: lot.commodity.to_string(),
            weight: Decimal::from(lot.weight),
            harvest_date: lot.dates[0].to_string(),
            location: None,
            expected_price: Some(Decimal::from(lot.expected_price)),
        };
        harvests.push(ledger.record_harvest(farmer, input).await?);
    }

    let mut purchases = Vec::new();
    for ((lot, distributor), harvest) in LOTS.iter().zip(&distributors).zip(&harvests) {
        let input = PurchaseInput {
            harvest_record_id: harvest.record_id.clone(),
            purchase_date: lot.dates[1].to_string(),
            location: None,
            buying_price: Decimal::from(lot.buying_price),
            other_charges: Decimal::from(lot.other_charges),
            status: lot.status,
        };
        purchases.push(ledger.record_purchase(distributor, input).await?);
    }

    let mut sales = Vec::new();
    for ((lot, retailer), purchase) in LOTS.iter().zip(&retailers).zip(&purchases) {
        let input = SaleInput {
            purchase_record_id: purchase.record_id.clone(),
            sale_date: lot.dates[2].to_string(),
            location: None,
            selling_price: Decimal::from(lot.selling_price),
        };
        sales.push(ledger.record_sale(retailer, input).await?);
    }

    tracing::info!(lots = LOTS.len(), "demo dataset seeded");

    let actors = farmers
        .into_iter()
        .chain(distributors)
        .chain(retailers)
        .collect();
    let records = harvests
        .into_iter()
        .chain(purchases)
        .chain(sales)
        .collect();
    Ok(DemoDataset { actors, records })
}

async fn sign_up<A: AuthProvider + ?Sized>(
    auth: &A,
    role: Role,
    (email, name, address): (&str, &str, &str),
) -> Result<Actor, TraceError> {
    let profile = SignupProfile {
        role,
        name: name.to_string(),
        phone: None,
        address: Some(address.to_string()),
    };
    auth.sign_up(email, DEMO_PASSWORD, profile).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::LocalAuthProvider;
    use krishi_core::PriceTable;
    use krishi_storage::{MemoryDocumentStore, MemoryRecordStore};

    #[tokio::test]
    async fn seeds_two_complete_lots() {
        let ledger = Ledger::new(MemoryRecordStore::new(), PriceTable::builtin());
        let auth = LocalAuthProvider::new(MemoryDocumentStore::new());
        let demo = seed_demo(&ledger, &auth).await.unwrap();

        assert_eq!(demo.actors.len(), 6);
        let ids: Vec<&str> = demo.records.iter().map(|r| r.record_id.as_str()).collect();
        assert_eq!(ids, ["BC001", "BC002", "DIST001", "DIST002", "RET001", "RET002"]);

        let wheat = ledger.trail("RET002").await.unwrap();
        assert_eq!(wheat.commodity_name(), "Wheat");
        assert_eq!(wheat.current_location(), "Bandra, Mumbai");
        assert_eq!(wheat.current().margin(), Some(Decimal::from(10)));
    }

    #[tokio::test]
    async fn demo_accounts_can_sign_in() {
        let ledger = Ledger::new(MemoryRecordStore::new(), PriceTable::builtin());
        let auth = LocalAuthProvider::new(MemoryDocumentStore::new());
        seed_demo(&ledger, &auth).await.unwrap();
        assert!(auth.sign_in("raj@demo.krishi", DEMO_PASSWORD).await.is_ok());
    }
}
