use std::path::Path;
use std::thread;
use storefront_core::db::open_db;
use storefront_core::{ItemId, ItemRepository, NewItem, SqliteItemRepository};

const INCREMENT_WORKERS: u32 = 4;
const DECREMENT_WORKERS: u32 = 2;
const CALLS_PER_WORKER: u32 = 50;
const INITIAL_QTY: u32 = 1_000;

fn spawn_adjuster(path: &Path, id: ItemId, increment: bool) -> thread::JoinHandle<()> {
    let path = path.to_path_buf();
    thread::spawn(move || {
        let conn = open_db(&path).unwrap();
        let repo = SqliteItemRepository::try_new(&conn).unwrap();
        for _ in 0..CALLS_PER_WORKER {
            if increment {
                repo.qty_increment(id, 1).unwrap();
            } else {
                repo.qty_decrement(id, 1).unwrap();
            }
        }
    })
}

#[test]
fn concurrent_adjustments_from_separate_connections_do_not_lose_updates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("concurrency.db");

    let conn = open_db(&path).unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();
    let item = repo
        .create(&NewItem {
            name: "Mug".to_string(),
            slug: "mug".to_string(),
            description: String::new(),
            thumbnail: String::new(),
            price: 10.0,
            qty: INITIAL_QTY,
        })
        .unwrap();

    let mut workers = Vec::new();
    for _ in 0..INCREMENT_WORKERS {
        workers.push(spawn_adjuster(&path, item.id, true));
    }
    for _ in 0..DECREMENT_WORKERS {
        workers.push(spawn_adjuster(&path, item.id, false));
    }
    for worker in workers {
        worker.join().unwrap();
    }

    let expected = INITIAL_QTY + INCREMENT_WORKERS * CALLS_PER_WORKER
        - DECREMENT_WORKERS * CALLS_PER_WORKER;
    assert_eq!(repo.find(item.id).unwrap().qty, expected);
}

#[test]
fn concurrent_decrements_never_drive_quantity_negative() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("floor.db");

    let conn = open_db(&path).unwrap();
    let repo = SqliteItemRepository::try_new(&conn).unwrap();
    let item = repo
        .create(&NewItem {
            name: "Last one".to_string(),
            slug: "last-one".to_string(),
            description: String::new(),
            thumbnail: String::new(),
            price: 1.0,
            qty: 10,
        })
        .unwrap();

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let path = path.clone();
            let id = item.id;
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                let repo = SqliteItemRepository::try_new(&conn).unwrap();
                (0..5)
                    .filter(|_| repo.qty_decrement(id, 1).is_ok())
                    .count()
            })
        })
        .collect();

    let succeeded: usize = workers
        .into_iter()
        .map(|worker| worker.join().unwrap())
        .sum();

    assert_eq!(succeeded, 10);
    assert_eq!(repo.find(item.id).unwrap().qty, 0);
}
