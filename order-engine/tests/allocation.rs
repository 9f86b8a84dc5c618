//! 订单号并发分配测试 - 文件数据库 + 多线程

use chrono::NaiveDate;
use order_engine::OrderStorage;
use order_engine::numbering::NumberAllocator;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

const THREADS: usize = 8;
const PER_THREAD: usize = 50;

#[test]
fn concurrent_allocations_are_unique() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(OrderStorage::open(dir.path().join("orders.redb")).unwrap());
    let allocator = NumberAllocator::new(storage.clone());
    let date = NaiveDate::from_ymd_opt(2026, 1, 9).unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let allocator = allocator.clone();
            thread::spawn(move || {
                (0..PER_THREAD)
                    .map(|_| allocator.allocate("NO.{SEQ:6}", date, true, "").unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for number in handle.join().unwrap() {
            assert!(seen.insert(number.clone()), "duplicate number {number}");
        }
    }
    assert_eq!(seen.len(), THREADS * PER_THREAD);
    assert!(seen.contains("NO.000001"));
    assert!(seen.contains(&format!("NO.{:06}", THREADS * PER_THREAD)));
}

#[test]
fn counters_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("orders.redb");
    let date = NaiveDate::from_ymd_opt(2026, 1, 9).unwrap();

    {
        let storage = Arc::new(OrderStorage::open(&path).unwrap());
        let allocator = NumberAllocator::new(storage);
        assert_eq!(allocator.allocate("{SEQ:3}", date, false, "").unwrap(), "001");
        assert_eq!(allocator.allocate("{SEQ:3}", date, false, "").unwrap(), "002");
    }

    let storage = Arc::new(OrderStorage::open(&path).unwrap());
    let allocator = NumberAllocator::new(storage);
    assert_eq!(allocator.allocate("{SEQ:3}", date, false, "").unwrap(), "003");
}
