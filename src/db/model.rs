//! Database model types for Diesel ORM.

use diesel::prelude::*;

use super::schema::{cart_items, order_lines, orders, reservations, variants};

/// Database row for a catalog variant.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = variants)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct VariantRow {
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub color: String,
    pub image_url: String,
    pub list_price: String,
    pub sale_price: Option<String>,
    pub stock: i32,
}

/// Database row for a stock reservation.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = reservations)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ReservationRow {
    pub variant_id: String,
    pub holder_kind: String,
    pub holder_id: String,
    pub quantity: i32,
    pub reserved_at: String,
    pub expires_at: String,
}

/// Database row for a durable cart line.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = cart_items)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CartItemRow {
    pub account_id: String,
    pub variant_id: String,
    pub product_id: String,
    pub quantity: i32,
    pub unit_price: String,
    pub original_price: Option<String>,
    pub name: String,
    pub color: String,
    pub image_url: String,
    pub added_at: String,
}

/// Database row for an order header.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OrderRow {
    pub id: String,
    pub code: String,
    pub created_at: String,
    pub total: String,
    pub account_id: Option<String>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub ship_city: String,
    pub ship_address: String,
}

/// Database row for an order line (insertable).
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = order_lines)]
pub struct NewOrderLineRow {
    pub order_id: String,
    pub product_name: String,
    pub variant_color: String,
    pub quantity: i32,
    pub unit_price: String,
    pub image_url: String,
}

/// Database row for an order line (queryable).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = order_lines)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OrderLineRow {
    pub id: i32,
    pub order_id: String,
    pub product_name: String,
    pub variant_color: String,
    pub quantity: i32,
    pub unit_price: String,
    pub image_url: String,
}
