//! End-to-end exercise of the bucket primitives the way the tree layer uses
//! them: fill a leaf until it rejects an insert, split it into a sibling,
//! and keep both halves consistent.

use mvbucket::bucket::NO_SIBLING;
use mvbucket::{BucketEntry, DurablePage, MultiValueBucket, PageId, RecordId, Result};

const PAGE_SIZE: u32 = 1024;

fn rid(cluster: i16, position: i64) -> RecordId {
    RecordId::new(cluster, position)
}

#[test]
fn split_overflowing_leaf_into_sibling() -> Result<()> {
    let mut left_page = DurablePage::new(PageId(4), PAGE_SIZE)?;
    let mut left = MultiValueBucket::<u64>::format(&mut left_page, true, None);

    // Fill until the bucket signals capacity exhaustion.
    let mut next_key = 0u64;
    loop {
        let raw = left.encode_key(&next_key);
        if !left.add_new_leaf_entry(left.size(), &raw, rid(1, next_key as i64)) {
            break;
        }
        next_key += 1;
    }
    let total = left.size();
    assert!(total >= 4, "expected several entries before overflow");

    // Lift the upper half into a fresh right sibling, then shrink the left.
    let split_at = total / 2;
    let mut moved = Vec::with_capacity(total - split_at);
    for index in split_at..total {
        moved.push(left.leaf_entry(index)?);
    }

    let mut right_page = DurablePage::new(PageId(5), PAGE_SIZE)?;
    let mut right = MultiValueBucket::<u64>::format(&mut right_page, true, None);
    right.add_all(&moved);
    left.shrink(split_at)?;

    // Sibling chain maintenance is the caller's job after a split.
    left.set_right_sibling(5);
    right.set_left_sibling(4);
    assert_eq!(left.left_sibling(), NO_SIBLING);
    assert_eq!(right.right_sibling(), NO_SIBLING);

    // The rejected insert now fits in whichever half owns the key range.
    let raw = right.encode_key(&next_key);
    assert!(right.add_new_leaf_entry(right.size(), &raw, rid(1, next_key as i64)));

    assert_eq!(left.size(), split_at);
    assert_eq!(right.size(), total - split_at + 1);
    for key in 0..split_at as u64 {
        assert_eq!(left.find(&key)?, key as i32);
        assert!(right.find(&key)? < 0);
    }
    for key in split_at as u64..=next_key {
        assert_eq!(right.find(&key)?, (key - split_at as u64) as i32);
        assert!(left.find(&key)? < 0);
    }

    // Duplicate lists survive the move intact.
    match right.leaf_entry(0)? {
        BucketEntry::Leaf { values, .. } => assert_eq!(values, vec![rid(1, split_at as i64)]),
        BucketEntry::NonLeaf { .. } => panic!("leaf bucket produced an internal entry"),
    }
    Ok(())
}
