use rusqlite::{params, Connection};
use std::num::NonZeroU32;
use storefront_core::db::open_db_in_memory;
use storefront_core::{
    CartRepository, Coupon, CouponRepository, ErrorKind, Item, ItemRepository, NewCoupon,
    NewItem, SqliteCartRepository, SqliteCouponRepository, SqliteItemRepository,
};
use uuid::Uuid;

fn seed_item(conn: &Connection, slug: &str) -> Item {
    let repo = SqliteItemRepository::try_new(conn).unwrap();
    repo.create(&NewItem {
        name: slug.to_uppercase(),
        slug: slug.to_string(),
        description: String::new(),
        thumbnail: format!("/thumbs/{slug}.png"),
        price: 4.5,
        qty: 10,
    })
    .unwrap()
}

fn seed_coupon(conn: &Connection, code: &str) -> Coupon {
    let repo = SqliteCouponRepository::try_new(conn).unwrap();
    repo.create(&NewCoupon {
        name: code.to_string(),
        code: code.to_string(),
        description: String::new(),
        discount: 10.0,
    })
    .unwrap()
}

fn units(qty: u32) -> NonZeroU32 {
    NonZeroU32::new(qty).unwrap()
}

#[test]
fn empty_cart_has_no_lines_and_no_coupon() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCartRepository::try_new(&conn).unwrap();

    let cart = repo.create(None).unwrap();
    let detail = repo.get(cart.id).unwrap();

    assert_eq!(detail.cart, cart);
    assert!(detail.cart_items.is_empty());
    assert!(detail.coupon.is_none());
}

#[test]
fn get_resolves_lines_items_and_coupon_in_one_read() {
    let conn = open_db_in_memory().unwrap();
    let mug = seed_item(&conn, "mug");
    let tea = seed_item(&conn, "tea");
    let coupon = seed_coupon(&conn, "SPRING10");
    let repo = SqliteCartRepository::try_new(&conn).unwrap();

    let cart = repo.create(Some(coupon.id)).unwrap();
    repo.add_item(cart.id, mug.id, units(2)).unwrap();
    repo.add_item(cart.id, tea.id, units(1)).unwrap();

    let detail = repo.get(cart.id).unwrap();
    assert_eq!(detail.coupon, Some(coupon));
    assert_eq!(detail.cart_items.len(), 2);
    assert_eq!(detail.cart_items[0].item, mug);
    assert_eq!(detail.cart_items[0].cart_item.qty, 2);
    assert_eq!(detail.cart_items[1].item, tea);
    assert!(detail
        .cart_items
        .iter()
        .all(|line| line.cart_item.cart_id == cart.id));
}

#[test]
fn add_item_merges_quantity_into_existing_line() {
    let conn = open_db_in_memory().unwrap();
    let mug = seed_item(&conn, "mug");
    let repo = SqliteCartRepository::try_new(&conn).unwrap();

    let cart = repo.create(None).unwrap();
    let first = repo.add_item(cart.id, mug.id, units(2)).unwrap();
    let merged = repo.add_item(cart.id, mug.id, units(3)).unwrap();

    assert_eq!(merged.id, first.id);
    assert_eq!(merged.qty, 5);
    assert_eq!(repo.get(cart.id).unwrap().cart_items.len(), 1);
}

#[test]
fn add_item_past_quantity_limit_is_conflict_and_keeps_line() {
    let conn = open_db_in_memory().unwrap();
    let mug = seed_item(&conn, "mug");
    let repo = SqliteCartRepository::try_new(&conn).unwrap();

    let cart = repo.create(None).unwrap();
    let full = repo.add_item(cart.id, mug.id, units(u32::MAX)).unwrap();
    assert_eq!(full.qty, u32::MAX);

    let err = repo.add_item(cart.id, mug.id, units(1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.message(), "Cart item quantity limit exceeded");

    let detail = repo.get(cart.id).unwrap();
    assert_eq!(detail.cart_items.len(), 1);
    assert_eq!(detail.cart_items[0].cart_item.qty, u32::MAX);

    let all = repo.get_all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].cart_items[0].cart_item.qty, u32::MAX);
}

#[test]
fn cart_item_quantity_above_limit_is_rejected_by_store() {
    let conn = open_db_in_memory().unwrap();
    let mug = seed_item(&conn, "mug");
    let repo = SqliteCartRepository::try_new(&conn).unwrap();
    let cart = repo.create(None).unwrap();
    let line = repo.add_item(cart.id, mug.id, units(1)).unwrap();

    let result = conn.execute(
        "UPDATE cart_items SET qty = ?2 WHERE id = ?1;",
        params![line.id.to_string(), i64::from(u32::MAX) + 1],
    );
    assert!(result.is_err());
    assert_eq!(repo.get(cart.id).unwrap().cart_items[0].cart_item.qty, 1);
}

#[test]
fn add_item_with_missing_references_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let mug = seed_item(&conn, "mug");
    let repo = SqliteCartRepository::try_new(&conn).unwrap();
    let cart = repo.create(None).unwrap();

    let err = repo.add_item(cart.id, Uuid::new_v4(), units(1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.message(), "Item not found");

    let err = repo.add_item(Uuid::new_v4(), mug.id, units(1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.message(), "Cart not found");
}

#[test]
fn create_with_unknown_coupon_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCartRepository::try_new(&conn).unwrap();

    let err = repo.create(Some(Uuid::new_v4())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.message(), "Coupon not found");
    assert!(repo.get_all().unwrap().is_empty());
}

#[test]
fn set_coupon_attaches_replaces_and_clears() {
    let conn = open_db_in_memory().unwrap();
    let first = seed_coupon(&conn, "FIRST");
    let second = seed_coupon(&conn, "SECOND");
    let repo = SqliteCartRepository::try_new(&conn).unwrap();
    let cart = repo.create(None).unwrap();

    repo.set_coupon(cart.id, Some(first.id)).unwrap();
    assert_eq!(repo.find(cart.id).unwrap().coupon_id, Some(first.id));

    repo.set_coupon(cart.id, Some(second.id)).unwrap();
    assert_eq!(repo.get(cart.id).unwrap().coupon, Some(second));

    repo.set_coupon(cart.id, None).unwrap();
    assert!(repo.get(cart.id).unwrap().coupon.is_none());

    let err = repo.set_coupon(cart.id, Some(Uuid::new_v4())).unwrap_err();
    assert_eq!(err.message(), "Coupon not found");
    let err = repo.set_coupon(Uuid::new_v4(), None).unwrap_err();
    assert_eq!(err.message(), "Cart not found");
}

#[test]
fn deleting_coupon_detaches_it_from_carts() {
    let conn = open_db_in_memory().unwrap();
    let coupon = seed_coupon(&conn, "GONE");
    let carts = SqliteCartRepository::try_new(&conn).unwrap();
    let cart = carts.create(Some(coupon.id)).unwrap();

    SqliteCouponRepository::try_new(&conn)
        .unwrap()
        .delete(coupon.id)
        .unwrap();

    let detail = carts.get(cart.id).unwrap();
    assert!(detail.cart.coupon_id.is_none());
    assert!(detail.coupon.is_none());
}

#[test]
fn set_item_qty_overwrites_and_zero_removes_line() {
    let conn = open_db_in_memory().unwrap();
    let mug = seed_item(&conn, "mug");
    let repo = SqliteCartRepository::try_new(&conn).unwrap();
    let cart = repo.create(None).unwrap();
    repo.add_item(cart.id, mug.id, units(2)).unwrap();

    repo.set_item_qty(cart.id, mug.id, 7).unwrap();
    assert_eq!(repo.get(cart.id).unwrap().cart_items[0].cart_item.qty, 7);

    repo.set_item_qty(cart.id, mug.id, 0).unwrap();
    assert!(repo.get(cart.id).unwrap().cart_items.is_empty());

    let err = repo.set_item_qty(cart.id, mug.id, 3).unwrap_err();
    assert_eq!(err.message(), "Cart item not found");
}

#[test]
fn remove_item_deletes_line_once() {
    let conn = open_db_in_memory().unwrap();
    let mug = seed_item(&conn, "mug");
    let repo = SqliteCartRepository::try_new(&conn).unwrap();
    let cart = repo.create(None).unwrap();
    repo.add_item(cart.id, mug.id, units(1)).unwrap();

    repo.remove_item(cart.id, mug.id).unwrap();
    let err = repo.remove_item(cart.id, mug.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn deleting_item_removes_it_from_carts() {
    let conn = open_db_in_memory().unwrap();
    let mug = seed_item(&conn, "mug");
    let tea = seed_item(&conn, "tea");
    let repo = SqliteCartRepository::try_new(&conn).unwrap();
    let cart = repo.create(None).unwrap();
    repo.add_item(cart.id, mug.id, units(1)).unwrap();
    repo.add_item(cart.id, tea.id, units(1)).unwrap();

    SqliteItemRepository::try_new(&conn)
        .unwrap()
        .delete(mug.id)
        .unwrap();

    let lines = repo.get(cart.id).unwrap().cart_items;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].item.id, tea.id);
}

#[test]
fn get_all_lists_carts_newest_first_with_their_own_lines() {
    let conn = open_db_in_memory().unwrap();
    let mug = seed_item(&conn, "mug");
    let tea = seed_item(&conn, "tea");
    let repo = SqliteCartRepository::try_new(&conn).unwrap();

    let older = repo.create(None).unwrap();
    let newer = repo.create(None).unwrap();
    let empty = repo.create(None).unwrap();
    repo.add_item(older.id, mug.id, units(1)).unwrap();
    repo.add_item(newer.id, mug.id, units(2)).unwrap();
    repo.add_item(newer.id, tea.id, units(3)).unwrap();

    for (id, created_at) in [(older.id, 1_000_i64), (newer.id, 2_000), (empty.id, 3_000)] {
        conn.execute(
            "UPDATE carts SET created_at = ?2 WHERE id = ?1;",
            params![id.to_string(), created_at],
        )
        .unwrap();
    }

    let details = repo.get_all().unwrap();
    let ids: Vec<_> = details.iter().map(|detail| detail.cart.id).collect();
    assert_eq!(ids, vec![empty.id, newer.id, older.id]);

    assert!(details[0].cart_items.is_empty());
    assert_eq!(details[1].cart_items.len(), 2);
    assert_eq!(details[2].cart_items.len(), 1);
    assert_eq!(details[2].cart_items[0].item.slug, "mug");
}

#[test]
fn delete_cart_cascades_lines_and_missing_delete_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let mug = seed_item(&conn, "mug");
    let repo = SqliteCartRepository::try_new(&conn).unwrap();
    let cart = repo.create(None).unwrap();
    repo.add_item(cart.id, mug.id, units(1)).unwrap();

    repo.delete(cart.id).unwrap();

    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM cart_items;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 0);
    assert!(repo.get(cart.id).unwrap_err().is_not_found());
    assert!(repo.find(cart.id).unwrap_err().is_not_found());
    assert!(repo.delete(cart.id).unwrap_err().is_not_found());
}

#[test]
fn cart_detail_serializes_with_flattened_cart_fields() {
    let conn = open_db_in_memory().unwrap();
    let mug = seed_item(&conn, "mug");
    let repo = SqliteCartRepository::try_new(&conn).unwrap();
    let cart = repo.create(None).unwrap();
    repo.add_item(cart.id, mug.id, units(2)).unwrap();

    let json = serde_json::to_value(repo.get(cart.id).unwrap()).unwrap();
    assert_eq!(json["id"], cart.id.to_string());
    assert!(json["coupon"].is_null());
    assert_eq!(json["cart_items"][0]["qty"], 2);
    assert_eq!(json["cart_items"][0]["item"]["slug"], "mug");
}
