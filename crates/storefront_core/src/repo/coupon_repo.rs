//! Coupon repository contract and SQLite implementation.
//!
//! # Invariants
//! - `code` is unique; create and update both report duplicates as `Conflict`.
//! - Deleting a coupon detaches it from carts (`ON DELETE SET NULL`).

use crate::db::{ensure_table_ready, DbResult};
use crate::model::coupon::{Coupon, CouponId, CouponUpdate, NewCoupon};
use crate::repo::columns::{uuid_column, NEWEST_FIRST};
use crate::repo::error::{RepoResult, COUPON_ERRORS};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const COUPON_COLUMNS: &[&str] = &["id", "code", "name", "description", "discount", "created_at"];

const COUPON_SELECT_SQL: &str = "SELECT
    id,
    code,
    name,
    description,
    discount,
    created_at
FROM coupons";

/// Repository interface for coupons.
pub trait CouponRepository {
    fn find(&self, id: CouponId) -> RepoResult<Coupon>;
    /// Lookup by primary id or coupon code.
    fn get(&self, id_or_code: &str) -> RepoResult<Coupon>;
    fn get_all(&self) -> RepoResult<Vec<Coupon>>;
    fn get_all_codes(&self) -> RepoResult<Vec<String>>;
    fn create(&self, coupon: &NewCoupon) -> RepoResult<Coupon>;
    /// Replaces every mutable field, code included.
    fn update(&self, id: CouponId, update: &CouponUpdate) -> RepoResult<()>;
    fn delete(&self, id: CouponId) -> RepoResult<()>;
}

/// SQLite-backed coupon repository.
pub struct SqliteCouponRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCouponRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> DbResult<Self> {
        ensure_table_ready(conn, "coupons", COUPON_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl CouponRepository for SqliteCouponRepository<'_> {
    fn find(&self, id: CouponId) -> RepoResult<Coupon> {
        self.conn
            .query_row(
                &format!("{COUPON_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                parse_coupon_row,
            )
            .optional()
            .map_err(|err| COUPON_ERRORS.fault("find", err))?
            .ok_or_else(|| COUPON_ERRORS.not_found("find"))
    }

    fn get(&self, id_or_code: &str) -> RepoResult<Coupon> {
        self.conn
            .query_row(
                &format!(
                    "{COUPON_SELECT_SQL}
                     WHERE id = ?1 OR code = ?1
                     ORDER BY (id = ?1) DESC
                     LIMIT 1;"
                ),
                [id_or_code],
                parse_coupon_row,
            )
            .optional()
            .map_err(|err| COUPON_ERRORS.fault("get", err))?
            .ok_or_else(|| COUPON_ERRORS.not_found("get"))
    }

    fn get_all(&self) -> RepoResult<Vec<Coupon>> {
        let load = || -> rusqlite::Result<Vec<Coupon>> {
            let mut stmt = self
                .conn
                .prepare(&format!("{COUPON_SELECT_SQL} ORDER BY {NEWEST_FIRST};"))?;
            let coupons = stmt
                .query_map([], parse_coupon_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(coupons)
        };
        load().map_err(|err| COUPON_ERRORS.fault("get_all", err))
    }

    fn get_all_codes(&self) -> RepoResult<Vec<String>> {
        let load = || -> rusqlite::Result<Vec<String>> {
            let mut stmt = self
                .conn
                .prepare(&format!("SELECT code FROM coupons ORDER BY {NEWEST_FIRST};"))?;
            let codes = stmt
                .query_map([], |row| row.get::<_, String>("code"))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(codes)
        };
        load().map_err(|err| COUPON_ERRORS.fault("get_all_codes", err))
    }

    fn create(&self, coupon: &NewCoupon) -> RepoResult<Coupon> {
        let id = Uuid::new_v4();
        self.conn
            .query_row(
                "INSERT INTO coupons (id, code, name, description, discount)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 RETURNING id, code, name, description, discount, created_at;",
                params![
                    id.to_string(),
                    coupon.code.as_str(),
                    coupon.name.as_str(),
                    coupon.description.as_str(),
                    coupon.discount,
                ],
                parse_coupon_row,
            )
            .map_err(|err| COUPON_ERRORS.fault("create", err))
    }

    fn update(&self, id: CouponId, update: &CouponUpdate) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE coupons
                 SET
                    name = ?2,
                    code = ?3,
                    description = ?4,
                    discount = ?5
                 WHERE id = ?1;",
                params![
                    id.to_string(),
                    update.name.as_str(),
                    update.code.as_str(),
                    update.description.as_str(),
                    update.discount,
                ],
            )
            .map_err(|err| COUPON_ERRORS.fault("update", err))?;

        if changed == 0 {
            return Err(COUPON_ERRORS.not_found("update"));
        }

        Ok(())
    }

    fn delete(&self, id: CouponId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM coupons WHERE id = ?1;", [id.to_string()])
            .map_err(|err| COUPON_ERRORS.fault("delete", err))?;

        if changed == 0 {
            return Err(COUPON_ERRORS.not_found("delete"));
        }

        Ok(())
    }
}

fn parse_coupon_row(row: &Row<'_>) -> rusqlite::Result<Coupon> {
    Ok(Coupon {
        id: uuid_column(row, "id")?,
        code: row.get("code")?,
        name: row.get("name")?,
        description: row.get("description")?,
        discount: row.get("discount")?,
        created_at: row.get("created_at")?,
    })
}
