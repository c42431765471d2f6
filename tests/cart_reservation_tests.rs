//! Cart and reservation behavior: admission, lockstep, expiry, concurrency.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal_macros::dec;

use stockroom::domain::{
    AccountId, Holder, ProductId, Reservation, SessionCart, Variant, VariantId,
};
use stockroom::error::{CartError, Error};
use stockroom::service::{CartService, VariantLocks};
use stockroom::store::{CartStore, MemoryStore, ReservationStore};

fn variant(id: &str, stock: u32) -> Variant {
    Variant {
        id: VariantId::new(id),
        product_id: ProductId::new("p1"),
        name: format!("Product {id}"),
        color: "black".to_string(),
        image_url: String::new(),
        list_price: dec!(49.90),
        sale_price: None,
        stock,
    }
}

fn setup() -> (Arc<MemoryStore>, CartService<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let locks = Arc::new(VariantLocks::new());
    let cart = CartService::new(Arc::clone(&store), locks, Duration::hours(24));
    (store, cart)
}

#[tokio::test]
async fn add_item_reserves_and_mirrors_into_session() {
    let (store, cart) = setup();
    store.insert_variant(variant("v1", 5));
    let holder = Holder::session("s1");
    let mut session = SessionCart::new();

    let update = cart
        .add_item(&holder, &mut session, &VariantId::new("v1"), 2)
        .await
        .unwrap();
    assert_eq!(update.quantity, 2);
    assert_eq!(update.available, 3);

    // Lockstep: cart line quantity equals the live reservation quantity.
    assert_eq!(session.quantity(&VariantId::new("v1")), 2);
    let reservation = store
        .reservation(&VariantId::new("v1"), &holder)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reservation.quantity, 2);
    assert!(reservation.is_active(Utc::now()));
}

#[tokio::test]
async fn add_accumulates_and_update_sets_absolute() {
    let (store, cart) = setup();
    store.insert_variant(variant("v1", 10));
    let holder = Holder::session("s1");
    let mut session = SessionCart::new();
    let v = VariantId::new("v1");

    cart.add_item(&holder, &mut session, &v, 2).await.unwrap();
    let update = cart.add_item(&holder, &mut session, &v, 3).await.unwrap();
    assert_eq!(update.quantity, 5);

    let update = cart
        .update_quantity(&holder, &mut session, &v, 1)
        .await
        .unwrap();
    assert_eq!(update.quantity, 1);
    assert_eq!(session.quantity(&v), 1);
    assert_eq!(
        store.reservation(&v, &holder).await.unwrap().unwrap().quantity,
        1
    );
}

#[tokio::test]
async fn insufficient_stock_carries_exact_available_and_mutates_nothing() {
    let (store, cart) = setup();
    store.insert_variant(variant("v1", 5));
    let v = VariantId::new("v1");

    let a = Holder::session("holder-a");
    let mut session_a = SessionCart::new();
    cart.add_item(&a, &mut session_a, &v, 5).await.unwrap();

    let b = Holder::session("holder-b");
    let mut session_b = SessionCart::new();
    let err = cart.add_item(&b, &mut session_b, &v, 1).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Cart(CartError::InsufficientStock {
            requested: 1,
            available: 0
        })
    ));

    // No partial state for the rejected holder.
    assert!(session_b.is_empty());
    assert!(store.reservation(&v, &b).await.unwrap().is_none());
}

#[tokio::test]
async fn release_then_retry_succeeds() {
    let (store, cart) = setup();
    store.insert_variant(variant("v1", 5));
    let v = VariantId::new("v1");

    let a = Holder::session("holder-a");
    let mut session_a = SessionCart::new();
    cart.add_item(&a, &mut session_a, &v, 5).await.unwrap();

    let b = Holder::session("holder-b");
    let mut session_b = SessionCart::new();
    assert!(cart.add_item(&b, &mut session_b, &v, 1).await.is_err());

    // Holder A abandons the line; B's retry now fits.
    cart.remove_item(&a, &mut session_a, &v).await.unwrap();
    let update = cart.add_item(&b, &mut session_b, &v, 1).await.unwrap();
    assert_eq!(update.quantity, 1);

    assert_eq!(cart.effective_available(&v, Some(&b)).await.unwrap(), 5);
    assert_eq!(cart.effective_available(&v, None).await.unwrap(), 4);
}

#[tokio::test]
async fn update_to_zero_removes_the_line() {
    let (store, cart) = setup();
    store.insert_variant(variant("v1", 5));
    let holder = Holder::session("s1");
    let mut session = SessionCart::new();
    let v = VariantId::new("v1");

    cart.add_item(&holder, &mut session, &v, 3).await.unwrap();
    let update = cart
        .update_quantity(&holder, &mut session, &v, 0)
        .await
        .unwrap();
    assert_eq!(update.quantity, 0);
    assert_eq!(update.available, 5);
    assert!(session.is_empty());
    assert!(store.reservation(&v, &holder).await.unwrap().is_none());
}

#[tokio::test]
async fn remove_item_is_idempotent() {
    let (store, cart) = setup();
    store.insert_variant(variant("v1", 5));
    let holder = Holder::session("s1");
    let mut session = SessionCart::new();
    let v = VariantId::new("v1");

    cart.add_item(&holder, &mut session, &v, 2).await.unwrap();
    cart.remove_item(&holder, &mut session, &v).await.unwrap();
    // Second removal of an absent line is a no-op, not an error.
    cart.remove_item(&holder, &mut session, &v).await.unwrap();

    assert!(store.reservation(&v, &holder).await.unwrap().is_none());
}

#[tokio::test]
async fn zero_delta_add_is_rejected() {
    let (store, cart) = setup();
    store.insert_variant(variant("v1", 5));
    let mut session = SessionCart::new();

    let err = cart
        .add_item(
            &Holder::session("s1"),
            &mut session,
            &VariantId::new("v1"),
            0,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Cart(CartError::InvalidQuantity { quantity: 0 })
    ));
}

#[tokio::test]
async fn unknown_variant_is_a_client_error() {
    let (_store, cart) = setup();
    let mut session = SessionCart::new();

    let err = cart
        .add_item(
            &Holder::session("s1"),
            &mut session,
            &VariantId::new("ghost"),
            1,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cart(CartError::VariantNotFound { .. })));
}

#[tokio::test]
async fn expired_reservation_drops_line_on_read_and_frees_stock() {
    let (store, cart) = setup();
    store.insert_variant(variant("v1", 5));
    let holder = Holder::session("s1");
    let mut session = SessionCart::new();
    let v = VariantId::new("v1");

    cart.add_item(&holder, &mut session, &v, 3).await.unwrap();
    assert_eq!(
        cart.effective_available(&v, Some(&Holder::session("other")))
            .await
            .unwrap(),
        2
    );

    // Age the hold past its window, as if 25 hours passed.
    let mut lapsed = Reservation::new(v.clone(), holder.clone(), 3, Duration::hours(24));
    lapsed.expires_at = Utc::now() - Duration::hours(1);
    store.save(&lapsed).await.unwrap();

    // Other holders see the stock again even before any sweep runs.
    assert_eq!(
        cart.effective_available(&v, Some(&Holder::session("other")))
            .await
            .unwrap(),
        5
    );

    // The next read drops the line and tells the caller what disappeared.
    let snapshot = cart.snapshot(&holder, &mut session).await.unwrap();
    assert!(snapshot.is_empty());
    assert_eq!(snapshot.dropped, vec!["Product v1".to_string()]);
    assert!(session.is_empty());
    assert!(store.reservation(&v, &holder).await.unwrap().is_none());
}

#[tokio::test]
async fn snapshot_prices_active_lines() {
    let (store, cart) = setup();
    let mut v = variant("v1", 5);
    v.sale_price = Some(dec!(39.90));
    store.insert_variant(v);
    let holder = Holder::session("s1");
    let mut session = SessionCart::new();

    cart.add_item(&holder, &mut session, &VariantId::new("v1"), 2)
        .await
        .unwrap();
    let snapshot = cart.snapshot(&holder, &mut session).await.unwrap();

    assert_eq!(snapshot.lines.len(), 1);
    assert_eq!(snapshot.lines[0].unit_price, dec!(39.90));
    assert_eq!(snapshot.lines[0].original_price, Some(dec!(49.90)));
    assert_eq!(snapshot.lines[0].subtotal, dec!(79.80));
    assert_eq!(snapshot.total, dec!(79.80));
    assert_eq!(snapshot.item_count, 2);
    assert!(snapshot.dropped.is_empty());
}

#[tokio::test]
async fn held_price_survives_catalog_changes_until_re_add() {
    let (store, cart) = setup();
    let mut on_sale = variant("v1", 5);
    on_sale.sale_price = Some(dec!(39.90));
    store.insert_variant(on_sale.clone());
    let holder = Holder::session("s1");
    let mut session = SessionCart::new();
    let v = VariantId::new("v1");

    cart.add_item(&holder, &mut session, &v, 1).await.unwrap();

    // The sale ends; the shopper's captured price is honored on reads.
    let mut repriced = on_sale;
    repriced.sale_price = None;
    store.insert_variant(repriced);

    let snapshot = cart.snapshot(&holder, &mut session).await.unwrap();
    assert_eq!(snapshot.lines[0].unit_price, dec!(39.90));

    // Touching the line re-captures the current effective price.
    cart.update_quantity(&holder, &mut session, &v, 2)
        .await
        .unwrap();
    let snapshot = cart.snapshot(&holder, &mut session).await.unwrap();
    assert_eq!(snapshot.lines[0].unit_price, dec!(49.90));
}

#[tokio::test]
async fn lockstep_holds_for_account_holders_too() {
    let (store, cart) = setup();
    store.insert_variant(variant("v1", 5));
    let holder = Holder::account("acct-1");
    let mut session = SessionCart::new();
    let v = VariantId::new("v1");

    cart.add_item(&holder, &mut session, &v, 4).await.unwrap();

    let durable = store
        .line(&AccountId::new("acct-1"), &v)
        .await
        .unwrap()
        .unwrap();
    let reservation = store.reservation(&v, &holder).await.unwrap().unwrap();
    assert_eq!(durable.quantity, reservation.quantity);
    assert_eq!(session.quantity(&v), reservation.quantity);
}

#[tokio::test]
async fn concurrent_adds_never_oversubscribe_stock() {
    let (store, cart) = setup();
    store.insert_variant(variant("v1", 5));
    let cart = Arc::new(cart);
    let v = VariantId::new("v1");

    let mut handles = Vec::new();
    for i in 0..10 {
        let cart = Arc::clone(&cart);
        let v = v.clone();
        handles.push(tokio::spawn(async move {
            let holder = Holder::session(format!("shopper-{i}"));
            let mut session = SessionCart::new();
            cart.add_item(&holder, &mut session, &v, 1).await.is_ok()
        }));
    }

    let mut admitted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            admitted += 1;
        }
    }

    // Exactly the physical stock was admitted; the invariant
    // sum(active reservations) <= stock held throughout.
    assert_eq!(admitted, 5);
    assert_eq!(store.reserved_total(&v).await.unwrap(), 5);
}
