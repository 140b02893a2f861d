//! Cart repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide cart lifecycle APIs and cart line management.
//! - Resolve cart lines, their items and the cart coupon in one read.
//!
//! # Invariants
//! - `get`/`get_all` issue a single joined query and fold rows into
//!   `CartDetail`s; there is no lazy association loading.
//! - Cart lines are listed oldest first; carts are listed newest first.
//! - A dangling coupon or item reference surfaces as `NotFound`, never as a
//!   store fault.

use crate::db::{ensure_table_ready, DbResult, StoreFault};
use crate::model::cart::{Cart, CartDetail, CartId, CartItem, CartLine};
use crate::model::coupon::{Coupon, CouponId};
use crate::model::item::{Item, ItemId};
use crate::repo::columns::{optional_uuid_column, uuid_column};
use crate::repo::error::{RepoError, RepoResult, CART_ERRORS, COUPON_ERRORS, ITEM_ERRORS};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::num::NonZeroU32;
use uuid::Uuid;

const CART_COLUMNS: &[&str] = &["id", "coupon_id", "created_at"];
const CART_ITEM_COLUMNS: &[&str] = &["id", "cart_id", "item_id", "qty", "created_at"];

const CART_ITEM_NOT_FOUND: &str = "Cart item not found";
const CART_ITEM_QTY_LIMIT: &str = "Cart item quantity limit exceeded";

const CART_DETAIL_SELECT_SQL: &str = "SELECT
    c.id AS cart_id,
    c.coupon_id AS cart_coupon_id,
    c.created_at AS cart_created_at,
    cp.id AS coupon_id,
    cp.code AS coupon_code,
    cp.name AS coupon_name,
    cp.description AS coupon_description,
    cp.discount AS coupon_discount,
    cp.created_at AS coupon_created_at,
    ci.id AS line_id,
    ci.qty AS line_qty,
    ci.created_at AS line_created_at,
    i.id AS item_id,
    i.slug AS item_slug,
    i.name AS item_name,
    i.description AS item_description,
    i.thumbnail AS item_thumbnail,
    i.price AS item_price,
    i.qty AS item_qty,
    i.created_at AS item_created_at
FROM carts c
LEFT JOIN coupons cp ON cp.id = c.coupon_id
LEFT JOIN cart_items ci ON ci.cart_id = c.id
LEFT JOIN items i ON i.id = ci.item_id";

const LINE_ORDER: &str = "ci.created_at ASC, ci.rowid ASC";

/// Repository interface for carts and their lines.
pub trait CartRepository {
    /// Bare cart row by id.
    fn find(&self, id: CartId) -> RepoResult<Cart>;
    /// Cart with lines, items and coupon resolved.
    fn get(&self, id: CartId) -> RepoResult<CartDetail>;
    /// Every cart with associations resolved, newest first.
    fn get_all(&self) -> RepoResult<Vec<CartDetail>>;
    /// Creates an empty cart, optionally attached to a coupon.
    /// `Conflict` is only reachable through a generated-id collision.
    fn create(&self, coupon_id: Option<CouponId>) -> RepoResult<Cart>;
    /// Attaches, replaces or (with `None`) clears the cart coupon.
    fn set_coupon(&self, id: CartId, coupon_id: Option<CouponId>) -> RepoResult<()>;
    /// Adds `qty` units of an item; merges into an existing line for the item.
    /// A merge that would push the line past `u32::MAX` is a `Conflict` and
    /// leaves the line unchanged.
    fn add_item(&self, cart_id: CartId, item_id: ItemId, qty: NonZeroU32)
        -> RepoResult<CartItem>;
    /// Overwrites a line quantity; zero removes the line.
    fn set_item_qty(&self, cart_id: CartId, item_id: ItemId, qty: u32) -> RepoResult<()>;
    fn remove_item(&self, cart_id: CartId, item_id: ItemId) -> RepoResult<()>;
    /// Deletes the cart together with its lines.
    fn delete(&self, id: CartId) -> RepoResult<()>;
}

/// SQLite-backed cart repository.
pub struct SqliteCartRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCartRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> DbResult<Self> {
        ensure_table_ready(conn, "carts", CART_COLUMNS)?;
        ensure_table_ready(conn, "cart_items", CART_ITEM_COLUMNS)?;
        Ok(Self { conn })
    }

    fn load_details(
        &self,
        filter: Option<CartId>,
        op: &'static str,
    ) -> RepoResult<Vec<CartDetail>> {
        let load = || -> rusqlite::Result<Vec<CartDetail>> {
            let mut details: Vec<CartDetail> = Vec::new();
            match filter {
                Some(id) => {
                    let mut stmt = self.conn.prepare(&format!(
                        "{CART_DETAIL_SELECT_SQL}
                         WHERE c.id = ?1
                         ORDER BY {LINE_ORDER};"
                    ))?;
                    let mut rows = stmt.query([id.to_string()])?;
                    while let Some(row) = rows.next()? {
                        fold_detail_row(&mut details, row)?;
                    }
                }
                None => {
                    let mut stmt = self.conn.prepare(&format!(
                        "{CART_DETAIL_SELECT_SQL}
                         ORDER BY c.created_at DESC, c.rowid DESC, {LINE_ORDER};"
                    ))?;
                    let mut rows = stmt.query([])?;
                    while let Some(row) = rows.next()? {
                        fold_detail_row(&mut details, row)?;
                    }
                }
            }
            Ok(details)
        };
        load().map_err(|err| CART_ERRORS.fault(op, err))
    }

    /// Maps a foreign-key failure on a cart write to the reference that is
    /// actually missing.
    fn missing_reference(
        &self,
        op: &'static str,
        cart_id: Option<CartId>,
        coupon_id: Option<CouponId>,
        item_id: Option<ItemId>,
    ) -> RepoError {
        let checks = [
            (cart_id, "carts", CART_ERRORS.not_found),
            (coupon_id, "coupons", COUPON_ERRORS.not_found),
            (item_id, "items", ITEM_ERRORS.not_found),
        ];
        for (id, table, message) in checks {
            let Some(id) = id else {
                continue;
            };
            match row_exists(self.conn, table, id) {
                Ok(true) => {}
                Ok(false) => return CART_ERRORS.not_found_with(op, message),
                Err(err) => return CART_ERRORS.fault(op, err),
            }
        }
        CART_ERRORS.not_found(op)
    }

    fn map_write_error(
        &self,
        op: &'static str,
        err: rusqlite::Error,
        cart_id: Option<CartId>,
        coupon_id: Option<CouponId>,
        item_id: Option<ItemId>,
    ) -> RepoError {
        match StoreFault::classify(&err) {
            StoreFault::ForeignKeyViolation => {
                self.missing_reference(op, cart_id, coupon_id, item_id)
            }
            _ => CART_ERRORS.fault(op, err),
        }
    }
}

impl CartRepository for SqliteCartRepository<'_> {
    fn find(&self, id: CartId) -> RepoResult<Cart> {
        self.conn
            .query_row(
                "SELECT id, coupon_id, created_at FROM carts WHERE id = ?1;",
                [id.to_string()],
                parse_cart_row,
            )
            .optional()
            .map_err(|err| CART_ERRORS.fault("find", err))?
            .ok_or_else(|| CART_ERRORS.not_found("find"))
    }

    fn get(&self, id: CartId) -> RepoResult<CartDetail> {
        self.load_details(Some(id), "get")?
            .into_iter()
            .next()
            .ok_or_else(|| CART_ERRORS.not_found("get"))
    }

    fn get_all(&self) -> RepoResult<Vec<CartDetail>> {
        self.load_details(None, "get_all")
    }

    fn create(&self, coupon_id: Option<CouponId>) -> RepoResult<Cart> {
        let id = Uuid::new_v4();
        self.conn
            .query_row(
                "INSERT INTO carts (id, coupon_id)
                 VALUES (?1, ?2)
                 RETURNING id, coupon_id, created_at;",
                params![id.to_string(), coupon_id.map(|value| value.to_string())],
                parse_cart_row,
            )
            .map_err(|err| self.map_write_error("create", err, None, coupon_id, None))
    }

    fn set_coupon(&self, id: CartId, coupon_id: Option<CouponId>) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE carts SET coupon_id = ?2 WHERE id = ?1;",
                params![id.to_string(), coupon_id.map(|value| value.to_string())],
            )
            .map_err(|err| self.map_write_error("set_coupon", err, Some(id), coupon_id, None))?;

        if changed == 0 {
            return Err(CART_ERRORS.not_found("set_coupon"));
        }

        Ok(())
    }

    fn add_item(
        &self,
        cart_id: CartId,
        item_id: ItemId,
        qty: NonZeroU32,
    ) -> RepoResult<CartItem> {
        let id = Uuid::new_v4();
        let line = self
            .conn
            .query_row(
                "INSERT INTO cart_items (id, cart_id, item_id, qty)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (cart_id, item_id)
                 DO UPDATE SET qty = cart_items.qty + excluded.qty
                 WHERE cart_items.qty + excluded.qty <= ?5
                 RETURNING id, cart_id, item_id, qty, created_at;",
                params![
                    id.to_string(),
                    cart_id.to_string(),
                    item_id.to_string(),
                    qty.get(),
                    u32::MAX,
                ],
                parse_cart_item_row,
            )
            .optional()
            .map_err(|err| {
                self.map_write_error("add_item", err, Some(cart_id), None, Some(item_id))
            })?;

        // A skipped DO UPDATE returns no row: the merged quantity would overflow.
        line.ok_or_else(|| CART_ERRORS.conflict_with("add_item", CART_ITEM_QTY_LIMIT))
    }

    fn set_item_qty(&self, cart_id: CartId, item_id: ItemId, qty: u32) -> RepoResult<()> {
        if qty == 0 {
            return self.remove_item(cart_id, item_id);
        }

        let changed = self
            .conn
            .execute(
                "UPDATE cart_items
                 SET qty = ?3
                 WHERE cart_id = ?1
                   AND item_id = ?2;",
                params![cart_id.to_string(), item_id.to_string(), qty],
            )
            .map_err(|err| CART_ERRORS.fault("set_item_qty", err))?;

        if changed == 0 {
            return Err(CART_ERRORS.not_found_with("set_item_qty", CART_ITEM_NOT_FOUND));
        }

        Ok(())
    }

    fn remove_item(&self, cart_id: CartId, item_id: ItemId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "DELETE FROM cart_items WHERE cart_id = ?1 AND item_id = ?2;",
                params![cart_id.to_string(), item_id.to_string()],
            )
            .map_err(|err| CART_ERRORS.fault("remove_item", err))?;

        if changed == 0 {
            return Err(CART_ERRORS.not_found_with("remove_item", CART_ITEM_NOT_FOUND));
        }

        Ok(())
    }

    fn delete(&self, id: CartId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM carts WHERE id = ?1;", [id.to_string()])
            .map_err(|err| CART_ERRORS.fault("delete", err))?;

        if changed == 0 {
            return Err(CART_ERRORS.not_found("delete"));
        }

        Ok(())
    }
}

/// Appends one joined row: starts a new detail when the cart id changes,
/// otherwise adds the row's line to the current detail.
fn fold_detail_row(details: &mut Vec<CartDetail>, row: &Row<'_>) -> rusqlite::Result<()> {
    let cart_id = uuid_column(row, "cart_id")?;
    let starts_new_cart = details
        .last()
        .map_or(true, |current| current.cart.id != cart_id);

    if starts_new_cart {
        details.push(CartDetail {
            cart: Cart {
                id: cart_id,
                coupon_id: optional_uuid_column(row, "cart_coupon_id")?,
                created_at: row.get("cart_created_at")?,
            },
            cart_items: Vec::new(),
            coupon: parse_joined_coupon(row)?,
        });
    }

    let Some(line) = parse_joined_line(row, cart_id)? else {
        return Ok(());
    };
    if let Some(current) = details.last_mut() {
        current.cart_items.push(line);
    }
    Ok(())
}

fn parse_joined_coupon(row: &Row<'_>) -> rusqlite::Result<Option<Coupon>> {
    let Some(id) = optional_uuid_column(row, "coupon_id")? else {
        return Ok(None);
    };
    Ok(Some(Coupon {
        id,
        code: row.get("coupon_code")?,
        name: row.get("coupon_name")?,
        description: row.get("coupon_description")?,
        discount: row.get("coupon_discount")?,
        created_at: row.get("coupon_created_at")?,
    }))
}

fn parse_joined_line(row: &Row<'_>, cart_id: CartId) -> rusqlite::Result<Option<CartLine>> {
    let Some(line_id) = optional_uuid_column(row, "line_id")? else {
        return Ok(None);
    };
    let item = Item {
        id: uuid_column(row, "item_id")?,
        slug: row.get("item_slug")?,
        name: row.get("item_name")?,
        description: row.get("item_description")?,
        thumbnail: row.get("item_thumbnail")?,
        price: row.get("item_price")?,
        qty: row.get("item_qty")?,
        created_at: row.get("item_created_at")?,
    };
    Ok(Some(CartLine {
        cart_item: CartItem {
            id: line_id,
            cart_id,
            item_id: item.id,
            qty: row.get("line_qty")?,
            created_at: row.get("line_created_at")?,
        },
        item,
    }))
}

fn parse_cart_row(row: &Row<'_>) -> rusqlite::Result<Cart> {
    Ok(Cart {
        id: uuid_column(row, "id")?,
        coupon_id: optional_uuid_column(row, "coupon_id")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_cart_item_row(row: &Row<'_>) -> rusqlite::Result<CartItem> {
    Ok(CartItem {
        id: uuid_column(row, "id")?,
        cart_id: uuid_column(row, "cart_id")?,
        item_id: uuid_column(row, "item_id")?,
        qty: row.get("qty")?,
        created_at: row.get("created_at")?,
    })
}

fn row_exists(conn: &Connection, table: &'static str, id: Uuid) -> rusqlite::Result<bool> {
    let exists: i64 = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1);"),
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
