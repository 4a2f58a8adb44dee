use std::collections::HashMap;

use async_trait::async_trait;
use common::{EntityId, Money};
use order_model::{
    Address, AddressType, CustomerOrder, Discount, DynamicPropertyValue, LineItem, OwnerKind,
    OwnerRef, PaymentIn, PaymentTransaction, Shipment, ShipmentItem, ShipmentPackage, TaxDetail,
};
use sqlx::{PgConnection, PgPool, Postgres, Row, Transaction, postgres::PgRow};
use tokio::sync::Mutex;

use crate::{
    CascadeSet, Include, LoadQuery, Result, StoreError, StoreTable,
    store::{OrderReader, OrderStore},
};

/// PostgreSQL-backed order store.
///
/// Every load checks out its own pooled connection and issues one statement
/// per requested relation inside a read-only `REPEATABLE READ` transaction,
/// matching rows with `= ANY($1)` and assembling them by foreign key.
/// Concurrent loads therefore never share a session, and each load sees a
/// single state of the database. [`OrderStore::snapshot`] extends that to a
/// group of loads.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Begins a read-only `REPEATABLE READ` transaction, optionally pinned
    /// to a snapshot exported by another session.
    async fn begin_read(&self, snapshot: Option<&str>) -> Result<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(READ_ONLY_REPEATABLE).execute(&mut *tx).await?;
        if let Some(snapshot_id) = snapshot {
            // SET does not take bind parameters; the id was checked on export.
            sqlx::query(&format!("SET TRANSACTION SNAPSHOT '{snapshot_id}'"))
                .execute(&mut *tx)
                .await?;
        }
        Ok(tx)
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn id(row: &PgRow, column: &str) -> Result<EntityId> {
    Ok(EntityId::from(row.try_get::<String, _>(column)?))
}

fn money(row: &PgRow, column: &str) -> Result<Money> {
    Ok(Money::from_cents(row.try_get::<i64, _>(column)?))
}

fn quantity(row: &PgRow, table: StoreTable) -> Result<u32> {
    let value: i32 = row.try_get("quantity")?;
    u32::try_from(value).map_err(|_| StoreError::InvalidRow {
        table,
        message: format!("negative quantity {value}"),
    })
}

fn owner(row: &PgRow, table: StoreTable) -> Result<OwnerRef> {
    let kind: String = row.try_get("owner_kind")?;
    let kind = OwnerKind::parse(&kind).ok_or_else(|| StoreError::InvalidRow {
        table,
        message: format!("unknown owner kind '{kind}'"),
    })?;
    Ok(OwnerRef::new(kind, id(row, "owner_id")?))
}

fn row_to_order(row: &PgRow) -> Result<CustomerOrder> {
    Ok(CustomerOrder {
        id: id(row, "id")?,
        number: row.try_get("number")?,
        customer_id: row.try_get("customer_id")?,
        store_id: row.try_get("store_id")?,
        status: row.try_get("status")?,
        currency: row.try_get("currency")?,
        created_at: row.try_get("created_at")?,
        sub_total: money(row, "sub_total")?,
        shipping_total: money(row, "shipping_total")?,
        payment_total: money(row, "payment_total")?,
        handling_total: money(row, "handling_total")?,
        discount_amount: money(row, "discount_amount")?,
        discount_total: money(row, "discount_total")?,
        tax_total: money(row, "tax_total")?,
        fee: money(row, "fee")?,
        total: money(row, "total")?,
        tax_percent_rate: row.try_get("tax_percent_rate")?,
        discounts: None,
        tax_details: None,
        addresses: None,
        in_payments: None,
        items: None,
        shipments: None,
        prices_hidden: false,
    })
}

fn row_to_address(row: &PgRow) -> Result<Address> {
    let address_type: String = row.try_get("address_type")?;
    Ok(Address {
        id: id(row, "id")?,
        owner: owner(row, StoreTable::Addresses)?,
        address_type: AddressType::parse(&address_type).ok_or_else(|| {
            StoreError::InvalidRow {
                table: StoreTable::Addresses,
                message: format!("unknown address type '{address_type}'"),
            }
        })?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        line1: row.try_get("line1")?,
        line2: row.try_get("line2")?,
        city: row.try_get("city")?,
        region: row.try_get("region")?,
        postal_code: row.try_get("postal_code")?,
        country_code: row.try_get("country_code")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
    })
}

fn row_to_discount(row: &PgRow) -> Result<Discount> {
    Ok(Discount {
        id: id(row, "id")?,
        owner: owner(row, StoreTable::Discounts)?,
        promotion_id: row.try_get("promotion_id")?,
        coupon_code: row.try_get("coupon_code")?,
        description: row.try_get("description")?,
        currency: row.try_get("currency")?,
        discount_amount: money(row, "discount_amount")?,
    })
}

fn row_to_tax_detail(row: &PgRow) -> Result<TaxDetail> {
    Ok(TaxDetail {
        id: id(row, "id")?,
        owner: owner(row, StoreTable::TaxDetails)?,
        name: row.try_get("name")?,
        rate: row.try_get("rate")?,
        amount: money(row, "amount")?,
    })
}

fn row_to_dynamic_property(row: &PgRow) -> Result<DynamicPropertyValue> {
    Ok(DynamicPropertyValue {
        id: id(row, "id")?,
        owner: owner(row, StoreTable::DynamicPropertyValues)?,
        property_name: row.try_get("property_name")?,
        locale: row.try_get("locale")?,
        value: row.try_get("value")?,
    })
}

fn row_to_line_item(row: &PgRow) -> Result<LineItem> {
    Ok(LineItem {
        id: id(row, "id")?,
        order_id: id(row, "order_id")?,
        sku: row.try_get("sku")?,
        product_id: row.try_get("product_id")?,
        name: row.try_get("name")?,
        quantity: quantity(row, StoreTable::LineItems)?,
        currency: row.try_get("currency")?,
        price: money(row, "price")?,
        list_price: money(row, "list_price")?,
        discount_amount: money(row, "discount_amount")?,
        tax_total: money(row, "tax_total")?,
        fee: money(row, "fee")?,
        discounts: None,
        tax_details: None,
        dynamic_properties: None,
    })
}

fn row_to_payment(row: &PgRow) -> Result<PaymentIn> {
    Ok(PaymentIn {
        id: id(row, "id")?,
        order_id: id(row, "order_id")?,
        number: row.try_get("number")?,
        gateway_code: row.try_get("gateway_code")?,
        status: row.try_get("status")?,
        currency: row.try_get("currency")?,
        sum: money(row, "sum")?,
        price: money(row, "price")?,
        discount_amount: money(row, "discount_amount")?,
        tax_total: money(row, "tax_total")?,
        total: money(row, "total")?,
        discounts: None,
        tax_details: None,
        addresses: None,
        transactions: None,
        dynamic_properties: None,
    })
}

fn row_to_transaction(row: &PgRow) -> Result<PaymentTransaction> {
    Ok(PaymentTransaction {
        id: id(row, "id")?,
        payment_in_id: id(row, "payment_in_id")?,
        amount: money(row, "amount")?,
        currency: row.try_get("currency")?,
        status: row.try_get("status")?,
        is_processed: row.try_get("is_processed")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_shipment(row: &PgRow) -> Result<Shipment> {
    Ok(Shipment {
        id: id(row, "id")?,
        order_id: id(row, "order_id")?,
        number: row.try_get("number")?,
        shipment_method_code: row.try_get("shipment_method_code")?,
        status: row.try_get("status")?,
        currency: row.try_get("currency")?,
        price: money(row, "price")?,
        discount_amount: money(row, "discount_amount")?,
        tax_total: money(row, "tax_total")?,
        total: money(row, "total")?,
        discounts: None,
        tax_details: None,
        addresses: None,
        items: None,
        packages: None,
        dynamic_properties: None,
    })
}

fn row_to_shipment_item(row: &PgRow) -> Result<ShipmentItem> {
    Ok(ShipmentItem {
        id: id(row, "id")?,
        shipment_id: id(row, "shipment_id")?,
        line_item_id: id(row, "line_item_id")?,
        package_id: row
            .try_get::<Option<String>, _>("package_id")?
            .map(EntityId::from),
        quantity: quantity(row, StoreTable::ShipmentItems)?,
        barcode: row.try_get("barcode")?,
    })
}

fn row_to_shipment_package(row: &PgRow) -> Result<ShipmentPackage> {
    Ok(ShipmentPackage {
        id: id(row, "id")?,
        shipment_id: id(row, "shipment_id")?,
        barcode: row.try_get("barcode")?,
        package_type: row.try_get("package_type")?,
        weight: row.try_get("weight")?,
    })
}

/// Runs `sql` with `$1` bound to `ids`, mapping rows and grouping them by
/// the key `group` extracts.
async fn fetch_grouped<T>(
    conn: &mut PgConnection,
    sql: &str,
    ids: &[String],
    map: fn(&PgRow) -> Result<T>,
    group: fn(&T) -> &EntityId,
) -> Result<HashMap<EntityId, Vec<T>>> {
    let rows = sqlx::query(sql).bind(ids).fetch_all(&mut *conn).await?;
    let mut grouped: HashMap<EntityId, Vec<T>> = HashMap::new();
    for row in &rows {
        let value = map(row)?;
        grouped.entry(group(&value).clone()).or_default().push(value);
    }
    Ok(grouped)
}

/// Like [`fetch_grouped`] for tables shared between owner kinds; `$2` is
/// bound to the owner kind.
async fn fetch_owned<T>(
    conn: &mut PgConnection,
    sql: &str,
    kind: OwnerKind,
    ids: &[String],
    map: fn(&PgRow) -> Result<T>,
    group: fn(&T) -> &EntityId,
) -> Result<HashMap<EntityId, Vec<T>>> {
    let rows = sqlx::query(sql)
        .bind(ids)
        .bind(kind.as_str())
        .fetch_all(&mut *conn)
        .await?;
    let mut grouped: HashMap<EntityId, Vec<T>> = HashMap::new();
    for row in &rows {
        let value = map(row)?;
        grouped.entry(group(&value).clone()).or_default().push(value);
    }
    Ok(grouped)
}

/// Moves grouped children onto their parents. Every parent gets `Some`,
/// empty when nothing matched.
fn attach<P, C>(
    parents: &mut [P],
    mut grouped: HashMap<EntityId, Vec<C>>,
    slot: fn(&mut P) -> (&EntityId, &mut Option<Vec<C>>),
) {
    for parent in parents {
        let (id, children) = slot(parent);
        *children = Some(grouped.remove(id).unwrap_or_default());
    }
}

const SELECT_ORDERS: &str = r#"
    SELECT id, number, customer_id, store_id, status, currency, created_at,
           sub_total, shipping_total, payment_total, handling_total, discount_amount,
           discount_total, tax_total, fee, total, tax_percent_rate
    FROM customer_orders
    WHERE id = ANY($1)
    ORDER BY created_at ASC, id ASC
"#;

const SELECT_ADDRESSES: &str = r#"
    SELECT id, owner_kind, owner_id, address_type, first_name, last_name, line1, line2,
           city, region, postal_code, country_code, email, phone
    FROM order_addresses
    WHERE owner_id = ANY($1) AND owner_kind = $2
    ORDER BY id ASC
"#;

const SELECT_DISCOUNTS: &str = r#"
    SELECT id, owner_kind, owner_id, promotion_id, coupon_code, description, currency,
           discount_amount
    FROM order_discounts
    WHERE owner_id = ANY($1) AND owner_kind = $2
    ORDER BY id ASC
"#;

const SELECT_TAX_DETAILS: &str = r#"
    SELECT id, owner_kind, owner_id, name, rate, amount
    FROM order_tax_details
    WHERE owner_id = ANY($1) AND owner_kind = $2
    ORDER BY id ASC
"#;

const SELECT_DYNAMIC_PROPERTIES: &str = r#"
    SELECT id, owner_kind, owner_id, property_name, locale, value
    FROM order_dynamic_property_values
    WHERE owner_id = ANY($1) AND owner_kind = $2
    ORDER BY id ASC
"#;

const SELECT_LINE_ITEMS: &str = r#"
    SELECT id, order_id, sku, product_id, name, quantity, currency, price, list_price,
           discount_amount, tax_total, fee
    FROM order_line_items
    WHERE order_id = ANY($1)
    ORDER BY id ASC
"#;

const SELECT_PAYMENTS: &str = r#"
    SELECT id, order_id, number, gateway_code, status, currency, sum, price,
           discount_amount, tax_total, total
    FROM order_payments_in
    WHERE order_id = ANY($1)
    ORDER BY id ASC
"#;

const SELECT_TRANSACTIONS: &str = r#"
    SELECT id, payment_in_id, amount, currency, status, is_processed, created_at
    FROM order_payment_transactions
    WHERE payment_in_id = ANY($1)
    ORDER BY created_at ASC, id ASC
"#;

const SELECT_SHIPMENTS: &str = r#"
    SELECT id, order_id, number, shipment_method_code, status, currency, price,
           discount_amount, tax_total, total
    FROM order_shipments
    WHERE order_id = ANY($1)
    ORDER BY id ASC
"#;

const SELECT_SHIPMENT_ITEMS: &str = r#"
    SELECT id, shipment_id, line_item_id, package_id, quantity, barcode
    FROM order_shipment_items
    WHERE shipment_id = ANY($1)
    ORDER BY id ASC
"#;

const SELECT_SHIPMENT_PACKAGES: &str = r#"
    SELECT id, shipment_id, barcode, package_type, weight
    FROM order_shipment_packages
    WHERE shipment_id = ANY($1)
    ORDER BY id ASC
"#;

fn ids_of<T>(rows: &[T], id: fn(&T) -> &EntityId) -> Vec<String> {
    rows.iter().map(|row| id(row).as_str().to_string()).collect()
}

/// Attaches discounts and tax details of `kind` when the query asks for them.
async fn attach_pricing<P>(
    conn: &mut PgConnection,
    query: &LoadQuery,
    kind: OwnerKind,
    parents: &mut [P],
    discounts: fn(&mut P) -> (&EntityId, &mut Option<Vec<Discount>>),
    tax_details: fn(&mut P) -> (&EntityId, &mut Option<Vec<TaxDetail>>),
    ids: &[String],
) -> Result<()> {
    if query.includes(Include::Discounts) {
        let grouped = fetch_owned(
            conn,
            SELECT_DISCOUNTS,
            kind,
            ids,
            row_to_discount,
            |d| &d.owner.id,
        )
        .await?;
        attach(parents, grouped, discounts);
    }
    if query.includes(Include::TaxDetails) {
        let grouped = fetch_owned(
            conn,
            SELECT_TAX_DETAILS,
            kind,
            ids,
            row_to_tax_detail,
            |t| &t.owner.id,
        )
        .await?;
        attach(parents, grouped, tax_details);
    }
    Ok(())
}

async fn load_orders_on(conn: &mut PgConnection, query: &LoadQuery) -> Result<Vec<CustomerOrder>> {
    if query.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query(SELECT_ORDERS)
        .bind(query.id_strings())
        .fetch_all(&mut *conn)
        .await?;
    let mut orders = rows.iter().map(row_to_order).collect::<Result<Vec<_>>>()?;
    if orders.is_empty() {
        return Ok(orders);
    }

    let ids = ids_of(&orders, |o| &o.id);
    attach_pricing(
        conn,
        query,
        OwnerKind::Order,
        &mut orders,
        |o| (&o.id, &mut o.discounts),
        |o| (&o.id, &mut o.tax_details),
        &ids,
    )
    .await?;
    Ok(orders)
}

async fn load_addresses_on(conn: &mut PgConnection, query: &LoadQuery) -> Result<Vec<Address>> {
    if query.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query(SELECT_ADDRESSES)
        .bind(query.id_strings())
        .bind(OwnerKind::Order.as_str())
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(row_to_address).collect()
}

async fn load_in_payments_on(conn: &mut PgConnection, query: &LoadQuery) -> Result<Vec<PaymentIn>> {
    if query.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query(SELECT_PAYMENTS)
        .bind(query.id_strings())
        .fetch_all(&mut *conn)
        .await?;
    let mut payments = rows.iter().map(row_to_payment).collect::<Result<Vec<_>>>()?;
    if payments.is_empty() {
        return Ok(payments);
    }

    let kind = OwnerKind::PaymentIn;
    let ids = ids_of(&payments, |p| &p.id);
    attach_pricing(
        conn,
        query,
        kind,
        &mut payments,
        |p| (&p.id, &mut p.discounts),
        |p| (&p.id, &mut p.tax_details),
        &ids,
    )
    .await?;
    if query.includes(Include::Addresses) {
        let grouped = fetch_owned(
            conn,
            SELECT_ADDRESSES,
            kind,
            &ids,
            row_to_address,
            |a| &a.owner.id,
        )
        .await?;
        attach(&mut payments, grouped, |p| (&p.id, &mut p.addresses));
    }
    if query.includes(Include::Transactions) {
        let grouped = fetch_grouped(
            conn,
            SELECT_TRANSACTIONS,
            &ids,
            row_to_transaction,
            |t| &t.payment_in_id,
        )
        .await?;
        attach(&mut payments, grouped, |p| (&p.id, &mut p.transactions));
    }
    if query.includes(Include::DynamicProperties) {
        let grouped = fetch_owned(
            conn,
            SELECT_DYNAMIC_PROPERTIES,
            kind,
            &ids,
            row_to_dynamic_property,
            |v| &v.owner.id,
        )
        .await?;
        attach(&mut payments, grouped, |p| {
            (&p.id, &mut p.dynamic_properties)
        });
    }
    Ok(payments)
}

async fn load_line_items_on(conn: &mut PgConnection, query: &LoadQuery) -> Result<Vec<LineItem>> {
    if query.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query(SELECT_LINE_ITEMS)
        .bind(query.id_strings())
        .fetch_all(&mut *conn)
        .await?;
    let mut items = rows
        .iter()
        .map(row_to_line_item)
        .collect::<Result<Vec<_>>>()?;
    if items.is_empty() {
        return Ok(items);
    }

    let kind = OwnerKind::LineItem;
    let ids = ids_of(&items, |i| &i.id);
    attach_pricing(
        conn,
        query,
        kind,
        &mut items,
        |i| (&i.id, &mut i.discounts),
        |i| (&i.id, &mut i.tax_details),
        &ids,
    )
    .await?;
    if query.includes(Include::DynamicProperties) {
        let grouped = fetch_owned(
            conn,
            SELECT_DYNAMIC_PROPERTIES,
            kind,
            &ids,
            row_to_dynamic_property,
            |v| &v.owner.id,
        )
        .await?;
        attach(&mut items, grouped, |i| (&i.id, &mut i.dynamic_properties));
    }
    Ok(items)
}

async fn load_shipments_on(conn: &mut PgConnection, query: &LoadQuery) -> Result<Vec<Shipment>> {
    if query.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query(SELECT_SHIPMENTS)
        .bind(query.id_strings())
        .fetch_all(&mut *conn)
        .await?;
    let mut shipments = rows.iter().map(row_to_shipment).collect::<Result<Vec<_>>>()?;
    if shipments.is_empty() {
        return Ok(shipments);
    }

    let kind = OwnerKind::Shipment;
    let ids = ids_of(&shipments, |s| &s.id);
    attach_pricing(
        conn,
        query,
        kind,
        &mut shipments,
        |s| (&s.id, &mut s.discounts),
        |s| (&s.id, &mut s.tax_details),
        &ids,
    )
    .await?;
    if query.includes(Include::Addresses) {
        let grouped = fetch_owned(
            conn,
            SELECT_ADDRESSES,
            kind,
            &ids,
            row_to_address,
            |a| &a.owner.id,
        )
        .await?;
        attach(&mut shipments, grouped, |s| (&s.id, &mut s.addresses));
    }
    if query.includes(Include::Items) {
        let grouped = fetch_grouped(
            conn,
            SELECT_SHIPMENT_ITEMS,
            &ids,
            row_to_shipment_item,
            |i| &i.shipment_id,
        )
        .await?;
        attach(&mut shipments, grouped, |s| (&s.id, &mut s.items));
    }
    if query.includes(Include::Packages) {
        let grouped = fetch_grouped(
            conn,
            SELECT_SHIPMENT_PACKAGES,
            &ids,
            row_to_shipment_package,
            |p| &p.shipment_id,
        )
        .await?;
        attach(&mut shipments, grouped, |s| (&s.id, &mut s.packages));
    }
    if query.includes(Include::DynamicProperties) {
        let grouped = fetch_owned(
            conn,
            SELECT_DYNAMIC_PROPERTIES,
            kind,
            &ids,
            row_to_dynamic_property,
            |v| &v.owner.id,
        )
        .await?;
        attach(&mut shipments, grouped, |s| {
            (&s.id, &mut s.dynamic_properties)
        });
    }
    Ok(shipments)
}

const READ_ONLY_REPEATABLE: &str =
    "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY";

const EXPORT_SNAPSHOT: &str = "SELECT pg_export_snapshot()";

/// Runs one load on a fresh read transaction and commits it.
macro_rules! read_in_tx {
    ($store:expr, $snapshot:expr, $load:ident, $query:expr) => {{
        let mut tx = $store.begin_read($snapshot).await?;
        let rows = $load(&mut *tx, $query).await?;
        tx.commit().await?;
        Ok(rows)
    }};
}

#[async_trait]
impl OrderReader for PostgresOrderStore {
    async fn load_orders(&self, query: &LoadQuery) -> Result<Vec<CustomerOrder>> {
        read_in_tx!(self, None, load_orders_on, query)
    }

    async fn load_addresses(&self, query: &LoadQuery) -> Result<Vec<Address>> {
        read_in_tx!(self, None, load_addresses_on, query)
    }

    async fn load_in_payments(&self, query: &LoadQuery) -> Result<Vec<PaymentIn>> {
        read_in_tx!(self, None, load_in_payments_on, query)
    }

    async fn load_line_items(&self, query: &LoadQuery) -> Result<Vec<LineItem>> {
        read_in_tx!(self, None, load_line_items_on, query)
    }

    async fn load_shipments(&self, query: &LoadQuery) -> Result<Vec<Shipment>> {
        read_in_tx!(self, None, load_shipments_on, query)
    }

    fn supports_concurrent_reads(&self) -> bool {
        self.pool.options().get_max_connections() > 1
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn snapshot<'a>(&'a self) -> Result<Box<dyn OrderReader + 'a>> {
        let mut exporter = self.pool.begin().await?;
        sqlx::query(READ_ONLY_REPEATABLE)
            .execute(&mut *exporter)
            .await?;
        let snapshot_id: String = sqlx::query_scalar(EXPORT_SNAPSHOT)
            .fetch_one(&mut *exporter)
            .await?;
        if snapshot_id.is_empty()
            || !snapshot_id
                .chars()
                .all(|c| c.is_ascii_hexdigit() || c == '-')
        {
            return Err(StoreError::Backend {
                table: StoreTable::Orders,
                message: format!("unexpected snapshot id '{snapshot_id}'"),
            });
        }

        let imports = self.supports_concurrent_reads();
        tracing::debug!(%snapshot_id, imports, "exported read snapshot");
        Ok(Box::new(PostgresSnapshot {
            store: self,
            exporter: Mutex::new(exporter),
            snapshot_id,
            imports,
        }))
    }

    async fn delete_cascade(&self, set: &CascadeSet) -> Result<u64> {
        if set.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut deleted_roots = 0;
        for table in StoreTable::DELETE_ORDER {
            let ids = set.id_strings(table);
            if ids.is_empty() {
                continue;
            }
            let sql = format!("DELETE FROM {} WHERE id = ANY($1)", table.as_str());
            let result = sqlx::query(&sql).bind(ids).execute(&mut *tx).await?;
            tracing::debug!(%table, rows = result.rows_affected(), "deleted rows");
            if table == StoreTable::Orders {
                deleted_roots = result.rows_affected();
            }
        }
        tx.commit().await?;

        Ok(deleted_roots)
    }
}

/// Reader pinned to one exported database snapshot.
///
/// The exporting transaction stays open for the reader's lifetime so the
/// snapshot remains importable; it is rolled back on drop. With a pool of
/// more than one connection every load runs in its own transaction that
/// imports the snapshot, so loads may run concurrently. A single-connection
/// pool has nothing left to import with, and loads run one at a time on the
/// exporting transaction instead.
struct PostgresSnapshot<'a> {
    store: &'a PostgresOrderStore,
    exporter: Mutex<Transaction<'static, Postgres>>,
    snapshot_id: String,
    imports: bool,
}

/// Runs one load under the snapshot.
macro_rules! read_in_snapshot {
    ($snapshot:expr, $load:ident, $query:expr) => {{
        if $snapshot.imports {
            let snapshot_id = Some($snapshot.snapshot_id.as_str());
            read_in_tx!($snapshot.store, snapshot_id, $load, $query)
        } else {
            let mut exporter = $snapshot.exporter.lock().await;
            $load(&mut **exporter, $query).await
        }
    }};
}

#[async_trait]
impl OrderReader for PostgresSnapshot<'_> {
    async fn load_orders(&self, query: &LoadQuery) -> Result<Vec<CustomerOrder>> {
        read_in_snapshot!(self, load_orders_on, query)
    }

    async fn load_addresses(&self, query: &LoadQuery) -> Result<Vec<Address>> {
        read_in_snapshot!(self, load_addresses_on, query)
    }

    async fn load_in_payments(&self, query: &LoadQuery) -> Result<Vec<PaymentIn>> {
        read_in_snapshot!(self, load_in_payments_on, query)
    }

    async fn load_line_items(&self, query: &LoadQuery) -> Result<Vec<LineItem>> {
        read_in_snapshot!(self, load_line_items_on, query)
    }

    async fn load_shipments(&self, query: &LoadQuery) -> Result<Vec<Shipment>> {
        read_in_snapshot!(self, load_shipments_on, query)
    }

    fn supports_concurrent_reads(&self) -> bool {
        self.imports
    }
}
