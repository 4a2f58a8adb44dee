//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p order-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use order_store::{
    EntityId, Include, LoadQuery, OrderReader, OrderStore, PostgresOrderStore, StoreError,
    StoreTable, UnitOfWork,
};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_order_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store(max_connections: u32) -> PostgresOrderStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query(
        "TRUNCATE TABLE order_dynamic_property_values, order_discounts, order_tax_details, \
         order_addresses, order_payment_transactions, order_shipment_items, \
         order_shipment_packages, order_payments_in, order_shipments, order_line_items, \
         customer_orders",
    )
    .execute(&pool)
    .await
    .unwrap();

    PostgresOrderStore::new(pool)
}

/// Inserts an order with one line item (with a dynamic property), one
/// shipment (one item, one package), one payment (one transaction) and a
/// root discount.
async fn seed_order(pool: &PgPool, id: &str) {
    let statements = [
        format!(
            "INSERT INTO customer_orders (id, number, customer_id, store_id, status, currency, sub_total, total, tax_percent_rate) \
             VALUES ('{id}', 'CO-{id}', 'customer-1', 'store', 'New', 'USD', 2000, 2500, 0.2)"
        ),
        format!(
            "INSERT INTO order_discounts (id, owner_kind, owner_id, currency, discount_amount) \
             VALUES ('{id}-d', 'order', '{id}', 'USD', 100)"
        ),
        format!(
            "INSERT INTO order_addresses (id, owner_kind, owner_id, address_type, first_name, last_name, line1, city, postal_code, country_code) \
             VALUES ('{id}-a', 'order', '{id}', 'billing', 'Ada', 'Lovelace', '1 Main St', 'London', 'N1', 'GB')"
        ),
        format!(
            "INSERT INTO order_line_items (id, order_id, sku, product_id, name, quantity, currency, price, list_price) \
             VALUES ('{id}-li', '{id}', 'SKU-1', 'SKU-1', 'Widget', 2, 'USD', 1000, 1000)"
        ),
        format!(
            "INSERT INTO order_dynamic_property_values (id, owner_kind, owner_id, property_name, value) \
             VALUES ('{id}-dp', 'line_item', '{id}-li', 'gift_note', '\"hello\"')"
        ),
        format!(
            "INSERT INTO order_shipments (id, order_id, number, shipment_method_code, status, currency, price, total) \
             VALUES ('{id}-s', '{id}', 'SH-1', 'ground', 'New', 'USD', 500, 500)"
        ),
        format!(
            "INSERT INTO order_shipment_packages (id, shipment_id, package_type) \
             VALUES ('{id}-pkg', '{id}-s', 'box')"
        ),
        format!(
            "INSERT INTO order_shipment_items (id, shipment_id, line_item_id, package_id, quantity) \
             VALUES ('{id}-si', '{id}-s', '{id}-li', '{id}-pkg', 2)"
        ),
        format!(
            "INSERT INTO order_payments_in (id, order_id, number, gateway_code, status, currency, sum, total) \
             VALUES ('{id}-p', '{id}', 'PI-1', 'card', 'Paid', 'USD', 2500, 2500)"
        ),
        format!(
            "INSERT INTO order_payment_transactions (id, payment_in_id, amount, currency, status, is_processed) \
             VALUES ('{id}-tx', '{id}-p', 2500, 'USD', 'Captured', TRUE)"
        ),
    ];
    for sql in statements {
        sqlx::query(&sql).execute(pool).await.unwrap();
    }
}

#[tokio::test]
#[serial]
async fn load_orders_with_root_pricing() {
    let store = get_test_store(5).await;
    seed_order(store.pool(), "A").await;

    let query = LoadQuery::for_ids(["A", "missing"])
        .include(Include::Discounts)
        .include(Include::TaxDetails);
    let orders = store.load_orders(&query).await.unwrap();

    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order.id, EntityId::from("A"));
    assert_eq!(order.total.cents(), 2500);
    assert_eq!(order.discounts.as_ref().unwrap().len(), 1);
    assert_eq!(order.tax_details, Some(vec![]));
    assert!(order.items.is_none());
}

#[tokio::test]
#[serial]
async fn load_addresses_returns_only_root_owned_rows() {
    let store = get_test_store(5).await;
    seed_order(store.pool(), "A").await;

    let addresses = store
        .load_addresses(&LoadQuery::for_ids(["A"]))
        .await
        .unwrap();

    assert_eq!(addresses.len(), 1);
    assert_eq!(addresses[0].city, "London");
}

#[tokio::test]
#[serial]
async fn load_line_items_with_dynamic_properties() {
    let store = get_test_store(5).await;
    seed_order(store.pool(), "A").await;

    let query = LoadQuery::for_ids(["A"]).include(Include::Discounts);
    let items = store.load_line_items(&query).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 2);
    assert_eq!(items[0].discounts, Some(vec![]));
    assert!(items[0].dynamic_properties.is_none());

    let items = store
        .load_line_items(&query.include(Include::DynamicProperties))
        .await
        .unwrap();
    let values = items[0].dynamic_properties.as_ref().unwrap();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].value, serde_json::json!("hello"));
}

#[tokio::test]
#[serial]
async fn load_shipments_and_payments_with_nested_relations() {
    let store = get_test_store(5).await;
    seed_order(store.pool(), "A").await;

    let query = LoadQuery::for_ids(["A"])
        .include(Include::Items)
        .include(Include::Packages)
        .include(Include::Transactions)
        .include(Include::Addresses);

    let shipments = store.load_shipments(&query).await.unwrap();
    assert_eq!(shipments.len(), 1);
    assert_eq!(shipments[0].items.as_ref().unwrap().len(), 1);
    assert_eq!(shipments[0].packages.as_ref().unwrap().len(), 1);
    assert_eq!(shipments[0].addresses, Some(vec![]));

    let payments = store.load_in_payments(&query).await.unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].transactions.as_ref().unwrap().len(), 1);
    assert!(payments[0].transactions.as_ref().unwrap()[0].is_processed);
}

#[tokio::test]
#[serial]
async fn single_connection_pool_reports_serialized_reads() {
    let store = get_test_store(1).await;
    assert!(!store.supports_concurrent_reads());

    let store = get_test_store(4).await;
    assert!(store.supports_concurrent_reads());
}

#[tokio::test]
#[serial]
async fn commit_deletes_full_graph_in_child_first_order() {
    let store = get_test_store(5).await;
    seed_order(store.pool(), "A").await;
    seed_order(store.pool(), "B").await;

    let all = LoadQuery::for_ids(["A"])
        .include(Include::Discounts)
        .include(Include::TaxDetails)
        .include(Include::Addresses)
        .include(Include::Transactions)
        .include(Include::Items)
        .include(Include::Packages)
        .include(Include::DynamicProperties);
    let mut order = store.load_orders(&all).await.unwrap().remove(0);
    order.addresses = Some(store.load_addresses(&all).await.unwrap());
    order.items = Some(store.load_line_items(&all).await.unwrap());
    order.shipments = Some(store.load_shipments(&all).await.unwrap());
    order.in_payments = Some(store.load_in_payments(&all).await.unwrap());

    let mut uow = UnitOfWork::new();
    uow.stage_removal(order).unwrap();
    assert_eq!(uow.cascade_set().len(StoreTable::ShipmentItems), 1);

    let deleted = uow.commit(&store).await.unwrap();
    assert_eq!(deleted, 1);

    let remaining = store
        .load_orders(&LoadQuery::for_ids(["A", "B"]))
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, EntityId::from("B"));

    let leftover: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM order_dynamic_property_values WHERE owner_id LIKE 'A-%'")
            .fetch_one(store.pool())
            .await
            .unwrap();
    assert_eq!(leftover, 0);
}

#[tokio::test]
#[serial]
async fn staging_without_in_payments_is_rejected() {
    let store = get_test_store(5).await;
    seed_order(store.pool(), "A").await;

    let all = LoadQuery::for_ids(["A"])
        .include(Include::Discounts)
        .include(Include::TaxDetails);
    let mut order = store.load_orders(&all).await.unwrap().remove(0);
    order.addresses = Some(store.load_addresses(&all).await.unwrap());

    let mut uow = UnitOfWork::new();
    let result = uow.stage_removal(order);
    assert!(matches!(
        result,
        Err(StoreError::IncompleteGraph { missing: "in_payments", .. })
    ));
    assert!(uow.is_empty());
}

#[tokio::test]
#[serial]
async fn snapshot_loads_ignore_later_commits() {
    let store = get_test_store(4).await;
    seed_order(store.pool(), "A").await;

    let snapshot = store.snapshot().await.unwrap();
    assert!(snapshot.supports_concurrent_reads());
    let query = LoadQuery::for_ids(["A", "C"]).include(Include::Items);
    assert_eq!(snapshot.load_orders(&query).await.unwrap().len(), 1);

    seed_order(store.pool(), "C").await;
    sqlx::query("DELETE FROM order_shipment_items WHERE shipment_id = 'A-s'")
        .execute(store.pool())
        .await
        .unwrap();

    let (orders, shipments) = tokio::join!(
        snapshot.load_orders(&query),
        snapshot.load_shipments(&query)
    );
    assert_eq!(orders.unwrap().len(), 1);
    let shipments = shipments.unwrap();
    assert_eq!(shipments.len(), 1);
    assert_eq!(shipments[0].items.as_ref().unwrap().len(), 1);

    let fresh = store.load_shipments(&query).await.unwrap();
    assert_eq!(fresh.len(), 2);
    let a = fresh.iter().find(|s| s.order_id == EntityId::from("A")).unwrap();
    assert_eq!(a.items, Some(vec![]));
    drop(snapshot);
}

#[tokio::test]
#[serial]
async fn single_connection_snapshot_reads_on_the_exporting_transaction() {
    let store = get_test_store(1).await;
    seed_order(store.pool(), "A").await;
    let other = PgPool::connect(&get_container_info().await.connection_string)
        .await
        .unwrap();

    let snapshot = store.snapshot().await.unwrap();
    assert!(!snapshot.supports_concurrent_reads());
    let query = LoadQuery::for_ids(["A", "C"]).include(Include::DynamicProperties);

    seed_order(&other, "C").await;

    assert_eq!(snapshot.load_orders(&query).await.unwrap().len(), 1);
    let items = snapshot.load_line_items(&query).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].dynamic_properties.as_ref().unwrap().len(), 1);
    drop(snapshot);

    assert_eq!(store.load_orders(&query).await.unwrap().len(), 2);
    other.close().await;
}
