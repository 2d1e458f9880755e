use std::sync::{Arc, Barrier};
use std::thread;

use loyalty_ledger::access::{AllowAll, Caller};
use loyalty_ledger::config::PointsConfig;
use loyalty_ledger::ledger::{CustomerCode, NewSalesRecord, SalesLedger};
use loyalty_ledger::points::{ClaimError, PointsRepository};
use loyalty_ledger::service::{LoyaltyService, ServiceError};
use loyalty_ledger::store::InMemoryLoyaltyStore;
use rust_decimal::Decimal;

fn service() -> (LoyaltyService<InMemoryLoyaltyStore>, Arc<InMemoryLoyaltyStore>) {
    let store = Arc::new(InMemoryLoyaltyStore::new());
    let config = PointsConfig {
        scan_page_size: 2,
        ..PointsConfig::default()
    };
    (
        LoyaltyService::new(store.clone(), Arc::new(AllowAll), config),
        store,
    )
}

fn counter() -> Caller {
    Caller("counter-2".to_string())
}

fn code(raw: &str) -> CustomerCode {
    CustomerCode::parse(raw).expect("valid code")
}

fn sell(service: &LoyaltyService<InMemoryLoyaltyStore>, customer: &str, grams: i64) {
    service
        .ingest(&counter(), NewSalesRecord::new(customer, Decimal::from(grams)))
        .expect("ingest");
}

#[test]
fn recompute_is_idempotent() {
    let (service, store) = service();
    for (customer, grams) in [("A", 95), ("B", 100), ("C", 7), ("D", 1234), ("E", 10)] {
        sell(&service, customer, grams);
    }

    let first = service.recompute(&counter()).expect("first pass");
    assert_eq!(first.created, 5);
    let snapshot: Vec<_> = ["A", "B", "C", "D", "E"]
        .iter()
        .map(|customer| {
            store
                .fetch(&code(customer))
                .expect("fetch")
                .expect("account")
                .total()
        })
        .collect();
    assert_eq!(
        snapshot,
        vec![
            Decimal::from(9),
            Decimal::from(10),
            Decimal::ZERO,
            Decimal::from(123),
            Decimal::ONE
        ]
    );

    let second = service.recompute(&counter()).expect("second pass");
    assert_eq!(second.created, 0);
    assert_eq!(second.updated, 0);
    assert_eq!(second.unchanged, 5);
}

#[test]
fn downward_correction_below_claimed_is_reported_not_applied() {
    let (service, store) = service();
    sell(&service, "A", 100);
    sell(&service, "B", 50);
    service.recompute(&counter()).expect("recompute");
    service
        .claim(&counter(), "A", Decimal::from(8))
        .expect("claim");

    sell(&service, "A", 40);
    sell(&service, "B", 80);
    let summary = service.recompute(&counter()).expect("recompute");
    assert_eq!(summary.conflicts.len(), 1);
    assert_eq!(summary.conflicts[0].customer_code, "A");
    assert_eq!(summary.conflicts[0].derived_total, Decimal::from(4));
    assert_eq!(summary.updated, 1);

    let account = store.fetch(&code("A")).expect("fetch").expect("account");
    assert_eq!(account.total(), Decimal::from(10));
    assert_eq!(account.claimed(), Decimal::from(8));
    let other = store.fetch(&code("B")).expect("fetch").expect("account");
    assert_eq!(other.total(), Decimal::from(8));
}

#[test]
fn claims_racing_recompute_are_never_lost() {
    let (service, store) = service();
    for index in 0..20 {
        sell(&service, &format!("R-{index:02}"), 200);
    }
    service.recompute(&counter()).expect("seed points");

    let barrier = Barrier::new(2);
    thread::scope(|scope| {
        scope.spawn(|| {
            barrier.wait();
            for _ in 0..5 {
                service.recompute(&counter()).expect("recompute");
            }
        });
        scope.spawn(|| {
            barrier.wait();
            for index in 0..20 {
                service
                    .claim(&counter(), &format!("R-{index:02}"), Decimal::from(3))
                    .expect("claim");
            }
        });
    });

    for index in 0..20 {
        let account = store
            .fetch(&code(&format!("R-{index:02}")))
            .expect("fetch")
            .expect("account");
        assert_eq!(account.total(), Decimal::from(20));
        assert_eq!(account.claimed(), Decimal::from(3));
    }
}

#[test]
fn deleting_during_claims_leaves_no_orphan_account() {
    let (service, store) = service();
    sell(&service, "X", 1000);
    service.recompute(&counter()).expect("recompute");

    let barrier = Barrier::new(2);
    let outcomes: Vec<_> = thread::scope(|scope| {
        let claims = scope.spawn(|| {
            barrier.wait();
            (0..50)
                .map(|_| service.claim(&counter(), "X", Decimal::ONE))
                .collect::<Vec<_>>()
        });
        scope.spawn(|| {
            barrier.wait();
            service.delete_customer(&counter(), "X").expect("delete");
        });
        claims.join().expect("claim thread")
    });

    assert!(outcomes.iter().all(|outcome| matches!(
        outcome,
        Ok(_) | Err(ServiceError::Claim(ClaimError::UnknownCustomer(_)))
    )));
    assert!(store.get(&code("X")).expect("get").is_none());
    assert!(store.fetch(&code("X")).expect("fetch").is_none());
    assert_eq!(store.account_count().expect("count"), 0);
}
