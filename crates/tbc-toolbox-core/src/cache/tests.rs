use std::num::NonZeroUsize;

use googletest::prelude::*;

use super::*;
use crate::field::FieldId;

fn cache_of(capacity: usize) -> BoundedCache<FieldId, Vec<u16>> {
    BoundedCache::new(NonZeroUsize::new(capacity).unwrap())
}

#[googletest::test]
fn test_put_and_get() {
    let mut cache = cache_of(2);
    expect_that!(cache.put(FieldId::new(1), vec![1]), none());
    expect_that!(cache.get(&FieldId::new(1)), some(eq(&vec![1])));
    expect_that!(cache.get(&FieldId::new(2)), none());
    expect_that!(cache.len(), eq(1));
}

#[googletest::test]
fn test_eviction_order_is_least_recently_used() {
    let mut cache = cache_of(2);
    cache.put(FieldId::new(1), vec![1]);
    cache.put(FieldId::new(2), vec![2]);

    // Touch 1 so that 2 becomes the eviction candidate.
    expect_that!(cache.get(&FieldId::new(1)), some(anything()));

    cache.put(FieldId::new(3), vec![3]);
    expect_that!(cache.contains(&FieldId::new(1)), eq(true));
    expect_that!(cache.contains(&FieldId::new(2)), eq(false));
    expect_that!(cache.contains(&FieldId::new(3)), eq(true));
}

#[googletest::test]
fn test_put_existing_key_replaces_and_promotes() {
    let mut cache = cache_of(2);
    cache.put(FieldId::new(1), vec![1]);
    cache.put(FieldId::new(2), vec![2]);

    // Replacing key 1 promotes it; the subsequent overflow evicts key 2.
    expect_that!(cache.put(FieldId::new(1), vec![10]), some(eq(&vec![1])));
    cache.put(FieldId::new(3), vec![3]);

    expect_that!(cache.get(&FieldId::new(1)), some(eq(&vec![10])));
    expect_that!(cache.contains(&FieldId::new(2)), eq(false));
}

#[googletest::test]
fn test_clear() {
    let mut cache = cache_of(4);
    cache.put(FieldId::new(1), vec![1]);
    cache.put(FieldId::new(2), vec![2]);
    cache.clear();
    expect_that!(cache.is_empty(), eq(true));
    expect_that!(cache.capacity(), eq(4));
}

#[googletest::test]
fn test_capacity_is_fixed() {
    let mut cache = cache_of(3);
    for i in 0..10 {
        cache.put(FieldId::new(i), vec![i as u16]);
    }
    expect_that!(cache.len(), eq(3));
    // The most recent three survive.
    expect_that!(cache.contains(&FieldId::new(7)), eq(true));
    expect_that!(cache.contains(&FieldId::new(8)), eq(true));
    expect_that!(cache.contains(&FieldId::new(9)), eq(true));
}
