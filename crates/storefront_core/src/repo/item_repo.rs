//! Item repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide lookup, listing and write APIs over the `items` table.
//! - Keep quantity adjustments atomic inside the store.
//!
//! # Invariants
//! - `get` resolves either the primary id or the slug; an id match wins.
//! - `update` never touches `slug`.
//! - Quantity never goes below zero: `qty_decrement` is guarded in SQL and
//!   the column carries `CHECK (qty >= 0)`.

use crate::db::{ensure_table_ready, DbResult};
use crate::model::item::{Item, ItemId, ItemUpdate, NewItem};
use crate::repo::columns::{uuid_column, NEWEST_FIRST};
use crate::repo::error::{RepoError, RepoResult, ITEM_ERRORS};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const ITEM_COLUMNS: &[&str] = &[
    "id",
    "slug",
    "name",
    "description",
    "thumbnail",
    "price",
    "qty",
    "created_at",
];

const ITEM_SELECT_SQL: &str = "SELECT
    id,
    slug,
    name,
    description,
    thumbnail,
    price,
    qty,
    created_at
FROM items";

const INSUFFICIENT_QTY: &str = "Insufficient item quantity";
const QTY_LIMIT_EXCEEDED: &str = "Item quantity limit exceeded";

/// Repository interface for catalog items.
pub trait ItemRepository {
    /// Exact primary-key lookup.
    fn find(&self, id: ItemId) -> RepoResult<Item>;
    /// Lookup by primary id or slug.
    fn get(&self, id_or_slug: &str) -> RepoResult<Item>;
    /// All items, newest first.
    fn get_all(&self) -> RepoResult<Vec<Item>>;
    /// All slugs, in `get_all` order.
    fn get_all_slugs(&self) -> RepoResult<Vec<String>>;
    /// Inserts a new item with a generated id and store-assigned timestamp.
    fn create(&self, item: &NewItem) -> RepoResult<Item>;
    /// Replaces every mutable field except the slug.
    fn update(&self, id: ItemId, update: &ItemUpdate) -> RepoResult<()>;
    /// Adds `delta` to quantity on hand in one store-side expression.
    fn qty_increment(&self, id: ItemId, delta: u32) -> RepoResult<()>;
    /// Subtracts `delta` from quantity on hand; rejects going below zero.
    fn qty_decrement(&self, id: ItemId, delta: u32) -> RepoResult<()>;
    fn delete(&self, id: ItemId) -> RepoResult<()>;
}

/// SQLite-backed item repository.
pub struct SqliteItemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteItemRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    ///
    /// # Errors
    /// - Returns `DbError::UninitializedConnection` when migrations are not applied.
    /// - Returns `DbError::MissingRequiredTable`/`MissingRequiredColumn` on schema drift.
    pub fn try_new(conn: &'conn Connection) -> DbResult<Self> {
        ensure_table_ready(conn, "items", ITEM_COLUMNS)?;
        Ok(Self { conn })
    }

    /// Resolves a zero-row quantity update into `NotFound` or `Conflict`.
    fn missing_or_conflict(
        &self,
        id: ItemId,
        op: &'static str,
        conflict_message: &'static str,
    ) -> RepoError {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM items WHERE id = ?1);",
            [id.to_string()],
            |row| row.get::<_, i64>(0),
        );
        match exists {
            Ok(1) => ITEM_ERRORS.conflict_with(op, conflict_message),
            Ok(_) => ITEM_ERRORS.not_found(op),
            Err(err) => ITEM_ERRORS.fault(op, err),
        }
    }
}

impl ItemRepository for SqliteItemRepository<'_> {
    fn find(&self, id: ItemId) -> RepoResult<Item> {
        self.conn
            .query_row(
                &format!("{ITEM_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                parse_item_row,
            )
            .optional()
            .map_err(|err| ITEM_ERRORS.fault("find", err))?
            .ok_or_else(|| ITEM_ERRORS.not_found("find"))
    }

    fn get(&self, id_or_slug: &str) -> RepoResult<Item> {
        self.conn
            .query_row(
                &format!(
                    "{ITEM_SELECT_SQL}
                     WHERE id = ?1 OR slug = ?1
                     ORDER BY (id = ?1) DESC
                     LIMIT 1;"
                ),
                [id_or_slug],
                parse_item_row,
            )
            .optional()
            .map_err(|err| ITEM_ERRORS.fault("get", err))?
            .ok_or_else(|| ITEM_ERRORS.not_found("get"))
    }

    fn get_all(&self) -> RepoResult<Vec<Item>> {
        let load = || -> rusqlite::Result<Vec<Item>> {
            let mut stmt = self
                .conn
                .prepare(&format!("{ITEM_SELECT_SQL} ORDER BY {NEWEST_FIRST};"))?;
            let items = stmt
                .query_map([], parse_item_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(items)
        };
        load().map_err(|err| ITEM_ERRORS.fault("get_all", err))
    }

    fn get_all_slugs(&self) -> RepoResult<Vec<String>> {
        let load = || -> rusqlite::Result<Vec<String>> {
            let mut stmt = self
                .conn
                .prepare(&format!("SELECT slug FROM items ORDER BY {NEWEST_FIRST};"))?;
            let slugs = stmt
                .query_map([], |row| row.get::<_, String>("slug"))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(slugs)
        };
        load().map_err(|err| ITEM_ERRORS.fault("get_all_slugs", err))
    }

    fn create(&self, item: &NewItem) -> RepoResult<Item> {
        let id = Uuid::new_v4();
        self.conn
            .query_row(
                "INSERT INTO items (
                    id,
                    slug,
                    name,
                    description,
                    thumbnail,
                    price,
                    qty
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                RETURNING
                    id,
                    slug,
                    name,
                    description,
                    thumbnail,
                    price,
                    qty,
                    created_at;",
                params![
                    id.to_string(),
                    item.slug.as_str(),
                    item.name.as_str(),
                    item.description.as_str(),
                    item.thumbnail.as_str(),
                    item.price,
                    item.qty,
                ],
                parse_item_row,
            )
            .map_err(|err| ITEM_ERRORS.fault("create", err))
    }

    fn update(&self, id: ItemId, update: &ItemUpdate) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE items
                 SET
                    name = ?2,
                    description = ?3,
                    thumbnail = ?4,
                    price = ?5,
                    qty = ?6
                 WHERE id = ?1;",
                params![
                    id.to_string(),
                    update.name.as_str(),
                    update.description.as_str(),
                    update.thumbnail.as_str(),
                    update.price,
                    update.qty,
                ],
            )
            .map_err(|err| ITEM_ERRORS.fault("update", err))?;

        if changed == 0 {
            return Err(ITEM_ERRORS.not_found("update"));
        }

        Ok(())
    }

    fn qty_increment(&self, id: ItemId, delta: u32) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE items
                 SET qty = qty + ?2
                 WHERE id = ?1
                   AND qty + ?2 <= ?3;",
                params![id.to_string(), delta, u32::MAX],
            )
            .map_err(|err| ITEM_ERRORS.fault("qty_increment", err))?;

        if changed == 0 {
            return Err(self.missing_or_conflict(id, "qty_increment", QTY_LIMIT_EXCEEDED));
        }

        Ok(())
    }

    fn qty_decrement(&self, id: ItemId, delta: u32) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE items
                 SET qty = qty - ?2
                 WHERE id = ?1
                   AND qty >= ?2;",
                params![id.to_string(), delta],
            )
            .map_err(|err| ITEM_ERRORS.fault("qty_decrement", err))?;

        if changed == 0 {
            return Err(self.missing_or_conflict(id, "qty_decrement", INSUFFICIENT_QTY));
        }

        Ok(())
    }

    fn delete(&self, id: ItemId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM items WHERE id = ?1;", [id.to_string()])
            .map_err(|err| ITEM_ERRORS.fault("delete", err))?;

        if changed == 0 {
            return Err(ITEM_ERRORS.not_found("delete"));
        }

        Ok(())
    }
}

fn parse_item_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: uuid_column(row, "id")?,
        slug: row.get("slug")?,
        name: row.get("name")?,
        description: row.get("description")?,
        thumbnail: row.get("thumbnail")?,
        price: row.get("price")?,
        qty: row.get("qty")?,
        created_at: row.get("created_at")?,
    })
}
