//! SQLite store implementation using Diesel.

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use rust_decimal::Decimal;

use super::{CartStore, CatalogStore, CommitRequest, OrderStore, ReservationStore};
use crate::db::model::{
    CartItemRow, NewOrderLineRow, OrderLineRow, OrderRow, ReservationRow, VariantRow,
};
use crate::db::schema::{cart_items, order_lines, orders, reservations, variants};
use crate::db::DbPool;
use crate::domain::{
    AccountId, CartLine, CustomerDetails, Holder, HolderKind, Order, OrderId, OrderLine,
    ProductId, Reservation, Variant, VariantId,
};
use crate::error::{CheckoutError, Error, Result};

/// SQLite-backed storefront store.
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    /// Create a new SQLite store over a connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Seed or update a catalog variant.
    ///
    /// The catalog is owned by an external service; this entry point exists
    /// for seeding fixtures and tests.
    pub async fn insert_variant(&self, variant: &Variant) -> Result<()> {
        let row = Self::variant_to_row(variant);
        let mut conn = self.conn()?;
        diesel::replace_into(variants::table)
            .values(&row)
            .execute(&mut conn)?;
        Ok(())
    }

    fn conn(&self) -> Result<diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<SqliteConnection>>> {
        self.pool.get().map_err(|e| Error::Connection(e.to_string()))
    }

    fn parse_decimal(value: &str) -> Result<Decimal> {
        Decimal::from_str(value).map_err(|e| Error::Parse(e.to_string()))
    }

    fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
        Ok(DateTime::parse_from_rfc3339(value)
            .map_err(|e| Error::Parse(e.to_string()))?
            .with_timezone(&Utc))
    }

    fn parse_holder(kind: &str, id: &str) -> Result<Holder> {
        Ok(match kind.parse::<HolderKind>()? {
            HolderKind::Session => Holder::session(id),
            HolderKind::Account => Holder::account(id),
        })
    }

    fn variant_to_row(variant: &Variant) -> VariantRow {
        VariantRow {
            id: variant.id.to_string(),
            product_id: variant.product_id.to_string(),
            name: variant.name.clone(),
            color: variant.color.clone(),
            image_url: variant.image_url.clone(),
            list_price: variant.list_price.to_string(),
            sale_price: variant.sale_price.map(|p| p.to_string()),
            stock: variant.stock as i32,
        }
    }

    fn variant_from_row(row: VariantRow) -> Result<Variant> {
        Ok(Variant {
            id: VariantId::from(row.id),
            product_id: ProductId::from(row.product_id),
            name: row.name,
            color: row.color,
            image_url: row.image_url,
            list_price: Self::parse_decimal(&row.list_price)?,
            sale_price: row.sale_price.as_deref().map(Self::parse_decimal).transpose()?,
            stock: row.stock.max(0) as u32,
        })
    }

    fn reservation_to_row(reservation: &Reservation) -> ReservationRow {
        ReservationRow {
            variant_id: reservation.variant_id.to_string(),
            holder_kind: reservation.holder.kind().as_str().to_string(),
            holder_id: reservation.holder.id_str().to_string(),
            quantity: reservation.quantity as i32,
            reserved_at: reservation.reserved_at.to_rfc3339(),
            expires_at: reservation.expires_at.to_rfc3339(),
        }
    }

    fn reservation_from_row(row: ReservationRow) -> Result<Reservation> {
        Ok(Reservation {
            variant_id: VariantId::from(row.variant_id),
            holder: Self::parse_holder(&row.holder_kind, &row.holder_id)?,
            quantity: row.quantity.max(0) as u32,
            reserved_at: Self::parse_datetime(&row.reserved_at)?,
            expires_at: Self::parse_datetime(&row.expires_at)?,
        })
    }

    fn cart_line_to_row(account: &AccountId, line: &CartLine) -> CartItemRow {
        CartItemRow {
            account_id: account.to_string(),
            variant_id: line.variant_id.to_string(),
            product_id: line.product_id.to_string(),
            quantity: line.quantity as i32,
            unit_price: line.unit_price.to_string(),
            original_price: line.original_price.map(|p| p.to_string()),
            name: line.name.clone(),
            color: line.color.clone(),
            image_url: line.image_url.clone(),
            added_at: line.added_at.to_rfc3339(),
        }
    }

    fn cart_line_from_row(row: CartItemRow) -> Result<CartLine> {
        Ok(CartLine {
            variant_id: VariantId::from(row.variant_id),
            product_id: ProductId::from(row.product_id),
            quantity: row.quantity.max(0) as u32,
            unit_price: Self::parse_decimal(&row.unit_price)?,
            original_price: row
                .original_price
                .as_deref()
                .map(Self::parse_decimal)
                .transpose()?,
            name: row.name,
            color: row.color,
            image_url: row.image_url,
            added_at: Self::parse_datetime(&row.added_at)?,
        })
    }

    fn order_to_rows(order: &Order) -> (OrderRow, Vec<NewOrderLineRow>) {
        let header = OrderRow {
            id: order.id.to_string(),
            code: order.code.clone(),
            created_at: order.created_at.to_rfc3339(),
            total: order.total.to_string(),
            account_id: order.placed_by.as_ref().map(ToString::to_string),
            customer_name: order.customer.name.clone(),
            customer_email: order.customer.email.clone(),
            customer_phone: order.customer.phone.clone(),
            ship_city: order.customer.city.clone(),
            ship_address: order.customer.address.clone(),
        };
        let lines = order
            .lines
            .iter()
            .map(|line| NewOrderLineRow {
                order_id: order.id.to_string(),
                product_name: line.product_name.clone(),
                variant_color: line.variant_color.clone(),
                quantity: line.quantity as i32,
                unit_price: line.unit_price.to_string(),
                image_url: line.image_url.clone(),
            })
            .collect();
        (header, lines)
    }

    fn order_from_rows(header: OrderRow, line_rows: Vec<OrderLineRow>) -> Result<Order> {
        let lines = line_rows
            .into_iter()
            .map(|row| {
                Ok(OrderLine {
                    product_name: row.product_name,
                    variant_color: row.variant_color,
                    quantity: row.quantity.max(0) as u32,
                    unit_price: Self::parse_decimal(&row.unit_price)?,
                    image_url: row.image_url,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Order {
            id: OrderId::from(header.id),
            code: header.code,
            created_at: Self::parse_datetime(&header.created_at)?,
            total: Self::parse_decimal(&header.total)?,
            placed_by: header.account_id.map(AccountId::from),
            customer: CustomerDetails {
                name: header.customer_name,
                email: header.customer_email,
                phone: header.customer_phone,
                city: header.ship_city,
                address: header.ship_address,
            },
            lines,
        })
    }

    fn active_rows_for_variant(
        conn: &mut SqliteConnection,
        variant_id: &VariantId,
        now: &str,
    ) -> Result<Vec<ReservationRow>> {
        Ok(reservations::table
            .filter(reservations::variant_id.eq(variant_id.as_str()))
            .filter(reservations::expires_at.gt(now))
            .filter(reservations::quantity.gt(0))
            .load(conn)?)
    }

    fn sum_excluding(rows: &[ReservationRow], exclude: &[Holder]) -> u32 {
        rows.iter()
            .filter(|row| {
                !exclude.iter().any(|holder| {
                    holder.kind().as_str() == row.holder_kind && holder.id_str() == row.holder_id
                })
            })
            .map(|row| row.quantity.max(0) as u32)
            .sum()
    }
}

impl CatalogStore for SqliteStore {
    async fn variant(&self, id: &VariantId) -> Result<Option<Variant>> {
        let mut conn = self.conn()?;
        let row: Option<VariantRow> = variants::table
            .find(id.as_str())
            .first(&mut conn)
            .optional()?;
        row.map(Self::variant_from_row).transpose()
    }
}

impl ReservationStore for SqliteStore {
    async fn reservation(
        &self,
        variant_id: &VariantId,
        holder: &Holder,
    ) -> Result<Option<Reservation>> {
        let mut conn = self.conn()?;
        let row: Option<ReservationRow> = reservations::table
            .find((variant_id.as_str(), holder.kind().as_str(), holder.id_str()))
            .first(&mut conn)
            .optional()?;
        row.map(Self::reservation_from_row).transpose()
    }

    async fn reserved_by_others(&self, variant_id: &VariantId, holder: &Holder) -> Result<u32> {
        let mut conn = self.conn()?;
        let now = Utc::now().to_rfc3339();
        let rows = Self::active_rows_for_variant(&mut conn, variant_id, &now)?;
        Ok(Self::sum_excluding(&rows, std::slice::from_ref(holder)))
    }

    async fn reserved_total(&self, variant_id: &VariantId) -> Result<u32> {
        let mut conn = self.conn()?;
        let now = Utc::now().to_rfc3339();
        let rows = Self::active_rows_for_variant(&mut conn, variant_id, &now)?;
        Ok(Self::sum_excluding(&rows, &[]))
    }

    async fn save(&self, reservation: &Reservation) -> Result<()> {
        let row = Self::reservation_to_row(reservation);
        let mut conn = self.conn()?;
        diesel::replace_into(reservations::table)
            .values(&row)
            .execute(&mut conn)?;
        Ok(())
    }

    async fn release(&self, variant_id: &VariantId, holder: &Holder) -> Result<bool> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(reservations::table.find((
            variant_id.as_str(),
            holder.kind().as_str(),
            holder.id_str(),
        )))
        .execute(&mut conn)?;
        Ok(deleted > 0)
    }

    async fn re_key(
        &self,
        variant_id: &VariantId,
        old_holder: &Holder,
        new_holder: &Holder,
        merge_quantity: u32,
        hold: Duration,
    ) -> Result<()> {
        let row = Self::reservation_to_row(&Reservation::new(
            variant_id.clone(),
            new_holder.clone(),
            merge_quantity,
            hold,
        ));
        let mut conn = self.conn()?;
        conn.transaction::<_, Error, _>(|conn| {
            diesel::delete(reservations::table.find((
                variant_id.as_str(),
                old_holder.kind().as_str(),
                old_holder.id_str(),
            )))
            .execute(conn)?;
            diesel::replace_into(reservations::table)
                .values(&row)
                .execute(conn)?;
            Ok(())
        })
    }

    async fn prune_expired(&self) -> Result<usize> {
        let mut conn = self.conn()?;
        let now = Utc::now().to_rfc3339();
        let deleted = diesel::delete(reservations::table.filter(reservations::expires_at.le(&now)))
            .execute(&mut conn)?;
        Ok(deleted)
    }

    async fn active(&self) -> Result<Vec<Reservation>> {
        let mut conn = self.conn()?;
        let now = Utc::now().to_rfc3339();
        let rows: Vec<ReservationRow> = reservations::table
            .filter(reservations::expires_at.gt(&now))
            .filter(reservations::quantity.gt(0))
            .load(&mut conn)?;
        rows.into_iter().map(Self::reservation_from_row).collect()
    }
}

impl CartStore for SqliteStore {
    async fn line(&self, account: &AccountId, variant_id: &VariantId) -> Result<Option<CartLine>> {
        let mut conn = self.conn()?;
        let row: Option<CartItemRow> = cart_items::table
            .find((account.as_str(), variant_id.as_str()))
            .first(&mut conn)
            .optional()?;
        row.map(Self::cart_line_from_row).transpose()
    }

    async fn lines(&self, account: &AccountId) -> Result<Vec<CartLine>> {
        let mut conn = self.conn()?;
        let rows: Vec<CartItemRow> = cart_items::table
            .filter(cart_items::account_id.eq(account.as_str()))
            .order(cart_items::variant_id.asc())
            .load(&mut conn)?;
        rows.into_iter().map(Self::cart_line_from_row).collect()
    }

    async fn save_line(&self, account: &AccountId, line: &CartLine) -> Result<()> {
        let row = Self::cart_line_to_row(account, line);
        let mut conn = self.conn()?;
        diesel::replace_into(cart_items::table)
            .values(&row)
            .execute(&mut conn)?;
        Ok(())
    }

    async fn delete_line(&self, account: &AccountId, variant_id: &VariantId) -> Result<bool> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(
            cart_items::table.find((account.as_str(), variant_id.as_str())),
        )
        .execute(&mut conn)?;
        Ok(deleted > 0)
    }
}

impl OrderStore for SqliteStore {
    async fn commit(&self, request: &CommitRequest) -> Result<()> {
        let (header, line_rows) = Self::order_to_rows(&request.order);
        let now = Utc::now().to_rfc3339();
        let mut conn = self.conn()?;

        conn.transaction::<_, Error, _>(|conn| {
            // Revalidate and decrement line by line; any deficit rolls the
            // whole transaction back.
            for (variant_id, quantity) in &request.decrements {
                let stock: Option<i32> = variants::table
                    .find(variant_id.as_str())
                    .select(variants::stock)
                    .first(conn)
                    .optional()?;
                let stock = stock.unwrap_or(0).max(0) as u32;
                let rows = Self::active_rows_for_variant(conn, variant_id, &now)?;
                let others = Self::sum_excluding(&rows, &request.holders);
                let available = stock.saturating_sub(others);
                if *quantity > available {
                    return Err(CheckoutError::StockChanged {
                        variant: variant_id.clone(),
                        available,
                    }
                    .into());
                }

                diesel::update(variants::table.find(variant_id.as_str()))
                    .set(variants::stock.eq((stock - quantity) as i32))
                    .execute(conn)?;
                for holder in &request.holders {
                    diesel::delete(reservations::table.find((
                        variant_id.as_str(),
                        holder.kind().as_str(),
                        holder.id_str(),
                    )))
                    .execute(conn)?;
                }
            }

            diesel::insert_into(orders::table)
                .values(&header)
                .execute(conn)?;
            diesel::insert_into(order_lines::table)
                .values(&line_rows)
                .execute(conn)?;

            for holder in &request.holders {
                if let Holder::Account(account) = holder {
                    diesel::delete(
                        cart_items::table.filter(cart_items::account_id.eq(account.as_str())),
                    )
                    .execute(conn)?;
                }
            }
            Ok(())
        })
    }

    async fn order(&self, id: &OrderId) -> Result<Option<Order>> {
        let mut conn = self.conn()?;
        let header: Option<OrderRow> = orders::table
            .find(id.as_str())
            .first(&mut conn)
            .optional()?;
        let Some(header) = header else {
            return Ok(None);
        };
        let line_rows: Vec<OrderLineRow> = order_lines::table
            .filter(order_lines::order_id.eq(id.as_str()))
            .order(order_lines::id.asc())
            .load(&mut conn)?;
        Ok(Some(Self::order_from_rows(header, line_rows)?))
    }

    async fn orders(&self) -> Result<Vec<Order>> {
        let mut conn = self.conn()?;
        let headers: Vec<OrderRow> = orders::table
            .order(orders::created_at.desc())
            .load(&mut conn)?;
        headers
            .into_iter()
            .map(|header| {
                let line_rows: Vec<OrderLineRow> = order_lines::table
                    .filter(order_lines::order_id.eq(&header.id))
                    .order(order_lines::id.asc())
                    .load(&mut conn)?;
                Self::order_from_rows(header, line_rows)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use diesel::r2d2::{ConnectionManager, Pool};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::db::run_migrations;
    use crate::domain::SessionLine;

    fn setup_test_db() -> DbPool {
        // A single connection keeps the in-memory database visible to every
        // pool checkout.
        let manager = ConnectionManager::<SqliteConnection>::new(":memory:");
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        pool
    }

    fn variant(id: &str, stock: u32) -> Variant {
        Variant {
            id: VariantId::new(id),
            product_id: ProductId::new("p1"),
            name: "Bodysuit".to_string(),
            color: "black".to_string(),
            image_url: "/img/v1.jpg".to_string(),
            list_price: dec!(49.90),
            sale_price: Some(dec!(39.90)),
            stock,
        }
    }

    fn hold() -> Duration {
        Duration::hours(24)
    }

    #[tokio::test]
    async fn variant_roundtrip() {
        let store = SqliteStore::new(setup_test_db());
        let v = variant("v1", 7);
        store.insert_variant(&v).await.unwrap();

        let loaded = store.variant(&v.id).await.unwrap().unwrap();
        assert_eq!(loaded, v);
        assert!(store
            .variant(&VariantId::new("missing"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn reservation_roundtrip_and_exclusion_sums() {
        let store = SqliteStore::new(setup_test_db());
        let v = VariantId::new("v1");
        let me = Holder::session("me");
        let other = Holder::account("other");

        store
            .save(&Reservation::new(v.clone(), me.clone(), 2, hold()))
            .await
            .unwrap();
        store
            .save(&Reservation::new(v.clone(), other.clone(), 3, hold()))
            .await
            .unwrap();

        let mine = store.reservation(&v, &me).await.unwrap().unwrap();
        assert_eq!(mine.quantity, 2);
        assert_eq!(store.reserved_by_others(&v, &me).await.unwrap(), 3);
        assert_eq!(store.reserved_total(&v).await.unwrap(), 5);

        // Replacing refreshes quantity on the same key.
        store
            .save(&Reservation::new(v.clone(), me.clone(), 4, hold()))
            .await
            .unwrap();
        assert_eq!(store.reserved_total(&v).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn expired_reservations_do_not_count_and_prune_deletes_them() {
        let store = SqliteStore::new(setup_test_db());
        let v = VariantId::new("v1");

        let mut lapsed = Reservation::new(v.clone(), Holder::session("gone"), 4, hold());
        lapsed.expires_at = Utc::now() - Duration::hours(1);
        store.save(&lapsed).await.unwrap();
        store
            .save(&Reservation::new(v.clone(), Holder::session("here"), 1, hold()))
            .await
            .unwrap();

        assert_eq!(store.reserved_total(&v).await.unwrap(), 1);
        assert_eq!(store.active().await.unwrap().len(), 1);
        assert_eq!(store.prune_expired().await.unwrap(), 1);
        assert_eq!(store.prune_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn re_key_transfers_the_hold() {
        let store = SqliteStore::new(setup_test_db());
        let v = VariantId::new("v1");
        let session = Holder::session("s1");
        let account = Holder::account("a1");

        store
            .save(&Reservation::new(v.clone(), session.clone(), 2, hold()))
            .await
            .unwrap();
        store.re_key(&v, &session, &account, 5, hold()).await.unwrap();

        assert!(store.reservation(&v, &session).await.unwrap().is_none());
        assert_eq!(
            store.reservation(&v, &account).await.unwrap().unwrap().quantity,
            5
        );
    }

    #[tokio::test]
    async fn cart_lines_roundtrip_per_account() {
        let store = SqliteStore::new(setup_test_db());
        let account = AccountId::new("a1");
        let v = variant("v1", 5);
        let line = CartLine::from_session(v.id.clone(), &SessionLine::snapshot(&v, 2));

        store.save_line(&account, &line).await.unwrap();
        let loaded = store.line(&account, &v.id).await.unwrap().unwrap();
        assert_eq!(loaded.quantity, 2);
        assert_eq!(loaded.unit_price, dec!(39.90));
        assert_eq!(loaded.original_price, Some(dec!(49.90)));

        assert_eq!(store.lines(&account).await.unwrap().len(), 1);
        assert!(store
            .lines(&AccountId::new("someone-else"))
            .await
            .unwrap()
            .is_empty());

        assert!(store.delete_line(&account, &v.id).await.unwrap());
        assert!(!store.delete_line(&account, &v.id).await.unwrap());
    }

    #[tokio::test]
    async fn commit_persists_order_and_rolls_state_forward() {
        let store = SqliteStore::new(setup_test_db());
        let v = variant("v1", 5);
        let holder = Holder::account("a1");
        store.insert_variant(&v).await.unwrap();
        store
            .save(&Reservation::new(v.id.clone(), holder.clone(), 3, hold()))
            .await
            .unwrap();
        let line = CartLine::from_session(v.id.clone(), &SessionLine::snapshot(&v, 3));
        store.save_line(&AccountId::new("a1"), &line).await.unwrap();

        let order = Order::new(
            Some(AccountId::new("a1")),
            CustomerDetails {
                name: "Ana".to_string(),
                city: "Lima".to_string(),
                ..Default::default()
            },
            vec![OrderLine {
                product_name: v.name.clone(),
                variant_color: v.color.clone(),
                quantity: 3,
                unit_price: dec!(39.90),
                image_url: v.image_url.clone(),
            }],
            dec!(10.00),
        );
        store
            .commit(&CommitRequest {
                order: order.clone(),
                decrements: vec![(v.id.clone(), 3)],
                holders: vec![holder.clone()],
            })
            .await
            .unwrap();

        assert_eq!(store.variant(&v.id).await.unwrap().unwrap().stock, 2);
        assert!(store.reservation(&v.id, &holder).await.unwrap().is_none());
        assert!(store.lines(&AccountId::new("a1")).await.unwrap().is_empty());

        let loaded = store.order(&order.id).await.unwrap().unwrap();
        assert_eq!(loaded.code, order.code);
        assert_eq!(loaded.total, dec!(129.70));
        assert_eq!(loaded.lines.len(), 1);
        assert_eq!(loaded.customer.name, "Ana");
        assert_eq!(store.orders().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn commit_rejection_rolls_everything_back() {
        let store = SqliteStore::new(setup_test_db());
        let v = variant("v1", 5);
        store.insert_variant(&v).await.unwrap();
        store
            .save(&Reservation::new(
                v.id.clone(),
                Holder::session("rival"),
                4,
                hold(),
            ))
            .await
            .unwrap();

        let order = Order::new(
            None,
            CustomerDetails::default(),
            vec![OrderLine {
                product_name: v.name.clone(),
                variant_color: v.color.clone(),
                quantity: 3,
                unit_price: dec!(39.90),
                image_url: String::new(),
            }],
            dec!(0),
        );
        let err = store
            .commit(&CommitRequest {
                order,
                decrements: vec![(v.id.clone(), 3)],
                holders: vec![Holder::session("buyer")],
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Checkout(CheckoutError::StockChanged { available: 1, .. })
        ));
        assert_eq!(store.variant(&v.id).await.unwrap().unwrap().stock, 5);
        assert!(store.orders().await.unwrap().is_empty());
    }
}
