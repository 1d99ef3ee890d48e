//! End-to-end tests for the order transaction
//!
//! Orders run against a real database file, from several sessions and
//! threads at once where that matters.

mod common;

use common::*;
use recordings_catalog::catalog_store::{NewOrder, Price};
use recordings_catalog::{CatalogError, Deadline};
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn deadline() -> Deadline {
    Deadline::after(Duration::from_secs(10))
}

#[test]
fn test_order_decrements_stock_and_records_ledger_entry() {
    let test_catalog = TestCatalog::create();
    let catalog = &test_catalog.catalog;

    let order_id = catalog
        .orders
        .create_order(
            &deadline(),
            MARSHAL_MATTERS_TITLE,
            2,
            &NewOrder::for_customer("slim"),
        )
        .unwrap();

    let album = catalog.reader.get_by_id(test_catalog.marshal_matters).unwrap();
    assert_eq!(album.quantity, MARSHAL_MATTERS_QUANTITY - 2);

    let order = catalog.reader.get_order(order_id).unwrap();
    assert_eq!(order.album_id, test_catalog.marshal_matters);
    assert_eq!(order.quantity, 2);
    assert_eq!(
        order.unit_price,
        Price::from_cents(MARSHAL_MATTERS_PRICE_CENTS)
    );
    assert_eq!(order.customer, "slim");

    // Other albums are untouched.
    let jeru = catalog.reader.get_by_id(test_catalog.jeru).unwrap();
    assert_eq!(jeru.quantity, JERU_QUANTITY);
}

#[test]
fn test_order_is_visible_from_another_session() {
    let test_catalog = TestCatalog::create();
    let other = test_catalog.new_catalog();

    test_catalog
        .catalog
        .orders
        .create_order(&deadline(), JERU_TITLE, 1, &NewOrder::for_customer("gerry"))
        .unwrap();

    let album = other.reader.get_by_id(test_catalog.jeru).unwrap();
    assert_eq!(album.quantity, JERU_QUANTITY - 1);
    assert_eq!(
        other
            .reader
            .list_orders_for_album(test_catalog.jeru)
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn test_rejected_orders_leave_no_trace() {
    let test_catalog = TestCatalog::create();
    let catalog = &test_catalog.catalog;
    let before = catalog.reader.get_combined().unwrap();

    let err = catalog
        .orders
        .create_order(&deadline(), "Spiderverse", 1, &NewOrder::for_customer("miles"))
        .unwrap_err();
    assert!(err.is_not_found());

    let err = catalog
        .orders
        .create_order(
            &deadline(),
            GIANT_STEPS_TITLE,
            (GIANT_STEPS_QUANTITY + 1) as u32,
            &NewOrder::for_customer("miles"),
        )
        .unwrap_err();
    assert!(matches!(err, CatalogError::InsufficientStock { .. }));

    let err = catalog
        .orders
        .create_order(&deadline(), BLUE_TRAIN_TITLE, 1, &NewOrder::for_customer(""))
        .unwrap_err();
    assert!(matches!(err, CatalogError::InvalidInput { .. }));

    assert_eq!(catalog.reader.get_combined().unwrap(), before);
    for album in &before.0 {
        assert!(catalog
            .reader
            .list_orders_for_album(album.id)
            .unwrap()
            .is_empty());
    }
}

#[test]
fn test_concurrent_orders_never_oversell() {
    const BUYERS: usize = 8;
    const ORDERS_PER_BUYER: usize = 3;

    let test_catalog = TestCatalog::create();
    let barrier = Arc::new(Barrier::new(BUYERS));

    let results: Vec<Result<i64, CatalogError>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..BUYERS)
            .map(|buyer| {
                let catalog = test_catalog.new_catalog();
                let barrier = barrier.clone();
                scope.spawn(move || {
                    barrier.wait();
                    (0..ORDERS_PER_BUYER)
                        .map(|_| {
                            catalog.orders.create_order(
                                &deadline(),
                                MARSHAL_MATTERS_TITLE,
                                1,
                                &NewOrder::for_customer(format!("buyer-{}", buyer)),
                            )
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect()
    });

    let mut committed = HashSet::new();
    for result in &results {
        match result {
            Ok(order_id) => assert!(committed.insert(*order_id)),
            Err(CatalogError::InsufficientStock { .. }) => {}
            Err(other) => panic!("Unexpected order failure: {}", other),
        }
    }

    assert_eq!(committed.len() as i64, MARSHAL_MATTERS_QUANTITY);
    let reader = &test_catalog.catalog.reader;
    assert_eq!(
        reader.get_by_id(test_catalog.marshal_matters).unwrap().quantity,
        0
    );
    let ledger = reader
        .list_orders_for_album(test_catalog.marshal_matters)
        .unwrap();
    assert_eq!(ledger.len(), committed.len());
    for order in &ledger {
        assert!(committed.contains(&order.id));
    }
}

#[test]
fn test_concurrent_orders_on_different_albums() {
    let test_catalog = TestCatalog::create();
    let titles = [
        (BLUE_TRAIN_TITLE, BLUE_TRAIN_QUANTITY),
        (GIANT_STEPS_TITLE, GIANT_STEPS_QUANTITY),
        (JERU_TITLE, JERU_QUANTITY),
        (MARSHAL_MATTERS_TITLE, MARSHAL_MATTERS_QUANTITY),
    ];

    thread::scope(|scope| {
        for (title, quantity) in titles {
            let catalog = test_catalog.new_catalog();
            scope.spawn(move || {
                for _ in 0..quantity {
                    catalog
                        .orders
                        .create_order(&deadline(), title, 1, &NewOrder::for_customer("shop"))
                        .unwrap();
                }
            });
        }
    });

    let (albums, _songs) = test_catalog.catalog.reader.get_combined().unwrap();
    assert_eq!(albums.len(), ALBUM_COUNT);
    assert!(albums.iter().all(|album| album.quantity == 0));
}

#[test]
fn test_order_gives_up_when_writer_lock_outlives_deadline() {
    let test_catalog = TestCatalog::create();
    let holder = test_catalog.open_session();
    let contender = test_catalog.new_catalog();

    let mut held = holder.begin_tx(&deadline()).unwrap();

    let err = thread::scope(|scope| {
        scope
            .spawn(|| {
                contender
                    .orders
                    .create_order(
                        &Deadline::after(Duration::from_millis(300)),
                        BLUE_TRAIN_TITLE,
                        1,
                        &NewOrder::for_customer("late"),
                    )
                    .unwrap_err()
            })
            .join()
            .unwrap()
    });
    assert!(
        matches!(
            err,
            CatalogError::DeadlineExceeded { .. } | CatalogError::TransactionBeginFailed { .. }
        ),
        "unexpected error: {}",
        err
    );

    held.rollback().unwrap();
    drop(held);

    // Once the lock is gone the same order goes through.
    contender
        .orders
        .create_order(&deadline(), BLUE_TRAIN_TITLE, 1, &NewOrder::for_customer("late"))
        .unwrap();
    let album = contender.reader.get_by_id(test_catalog.blue_train).unwrap();
    assert_eq!(album.quantity, BLUE_TRAIN_QUANTITY - 1);
}

#[tokio::test]
async fn test_cancelled_order_on_blocking_pool() {
    let test_catalog = TestCatalog::create();
    let orders = test_catalog.catalog.orders.clone();

    let token = CancellationToken::new();
    let deadline = Deadline::after(Duration::from_secs(10)).with_cancellation(token.clone());
    token.cancel();

    let result = tokio::task::spawn_blocking(move || {
        orders.create_order(&deadline, JERU_TITLE, 1, &NewOrder::for_customer("nobody"))
    })
    .await
    .unwrap();

    assert!(matches!(result, Err(CatalogError::DeadlineExceeded { .. })));
    let album = test_catalog
        .catalog
        .reader
        .get_by_id(test_catalog.jeru)
        .unwrap();
    assert_eq!(album.quantity, JERU_QUANTITY);
}

#[tokio::test]
async fn test_orders_from_many_tasks() {
    let test_catalog = TestCatalog::create();

    let mut handles = Vec::new();
    for i in 0..GIANT_STEPS_QUANTITY {
        let orders = test_catalog.new_catalog().orders;
        handles.push(tokio::task::spawn_blocking(move || {
            orders.create_order(
                &Deadline::after(Duration::from_secs(10)),
                GIANT_STEPS_TITLE,
                1,
                &NewOrder::for_customer(format!("task-{}", i)),
            )
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let reader = &test_catalog.catalog.reader;
    assert_eq!(
        reader.get_by_id(test_catalog.giant_steps).unwrap().quantity,
        0
    );
    assert_eq!(
        reader
            .list_orders_for_album(test_catalog.giant_steps)
            .unwrap()
            .len() as i64,
        GIANT_STEPS_QUANTITY
    );
}
