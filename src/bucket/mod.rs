#![forbid(unsafe_code)]

//! Multi-value B+ tree bucket: one page interpreted as an index node.
//!
//! A leaf bucket maps each key to one or more [`RecordId`]s; an internal
//! bucket maps each key to left/right child page pointers. All durable state
//! lives in the page bytes. The bucket object carries only configuration
//! (node kind, key codec, optional cipher) and is rebuilt cheaply on every
//! access.
//!
//! # Layout
//!
//! After the generic page header come the fixed bucket fields, then the
//! positions array: `size` i32 offsets, index `i` giving the absolute byte
//! offset of logical entry `i`'s payload. The positions array is the only
//! ordering structure; payload placement is allocation order, growing down
//! from the end of the page as `free_pointer` decreases.
//!
//! Leaf head entry: `[next_item:i32][key bytes][cluster_id:i16][cluster_pos:i64]`.
//! Extra-value node: `[next_item:i32][cluster_id:i16][cluster_pos:i64]`.
//! Internal entry:  `[left_child:i32][right_child:i32][key bytes]`.
//!
//! `next_item == -1` terminates a duplicate list. Appending a value splices
//! the new node in as the list head, so duplicate order is insertion-reversed
//! and carries no semantic meaning.

use std::cmp::Ordering;
use std::marker::PhantomData;

use smallvec::SmallVec;
use tracing::debug;

use crate::codec::{KeyCodec, PageCipher};
use crate::page::{DurablePage, PageKind, PAGE_HDR_LEN};
use crate::types::{RecordId, Result};

/// Encoded size of one record id (`cluster_id:i16` + `cluster_position:i64`).
pub const RID_SIZE: usize = 2 + 8;

/// Size of a duplicate-list extra node (`next_item:i32` + record id).
pub const EXTRA_NODE_SIZE: usize = 4 + RID_SIZE;

const FREE_POINTER_OFFSET: usize = PAGE_HDR_LEN;
const SIZE_OFFSET: usize = FREE_POINTER_OFFSET + 4;
const IS_LEAF_OFFSET: usize = SIZE_OFFSET + 4;
const LEFT_SIBLING_OFFSET: usize = IS_LEAF_OFFSET + 1;
const RIGHT_SIBLING_OFFSET: usize = LEFT_SIBLING_OFFSET + 8;
const TREE_SIZE_OFFSET: usize = RIGHT_SIBLING_OFFSET + 8;

/// Offset of the first positions-array slot. `free_pointer` must never drop
/// below `POSITIONS_ARRAY_OFFSET + size * 4`.
pub const POSITIONS_ARRAY_OFFSET: usize = TREE_SIZE_OFFSET + 8;

/// Sentinel for "no sibling page".
pub const NO_SIBLING: i64 = -1;

/// Record ids for one key; inline for the common low-duplicate case.
pub type RecordIdList = SmallVec<[RecordId; 8]>;

/// One logical entry lifted off a page for bulk repacking.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BucketEntry {
    /// Leaf entry: stored key bytes plus every record id of the key.
    Leaf {
        /// Key in its stored form (ciphertext-prefixed when encrypted).
        key: Vec<u8>,
        /// All record ids, head value first.
        values: Vec<RecordId>,
    },
    /// Internal entry: stored key bytes plus the two child page pointers.
    NonLeaf {
        /// Key in its stored form.
        key: Vec<u8>,
        /// Page index of the child covering keys below this key.
        left_child: i32,
        /// Page index of the child covering keys at or above this key.
        right_child: i32,
    },
}

/// One B+ tree node view over a [`DurablePage`].
///
/// Mutating calls assume the external page cache has granted exclusive access
/// to the page for the duration of the call. Insertion primitives report
/// capacity exhaustion by returning `false` without touching the page; the
/// tree layer splits the bucket and retries. Calling a leaf-only operation on
/// an internal bucket (or the reverse) is a caller bug and panics.
pub struct MultiValueBucket<'a, K: KeyCodec> {
    page: &'a mut DurablePage,
    is_leaf: bool,
    cipher: Option<&'a dyn PageCipher>,
    _key: PhantomData<K>,
}

impl<'a, K: KeyCodec> MultiValueBucket<'a, K> {
    /// Formats `page` as an empty bucket and wraps it.
    ///
    /// Writes the default header: `free_pointer` at the page end, zero
    /// entries, no siblings, zero tree size.
    pub fn format(
        page: &'a mut DurablePage,
        is_leaf: bool,
        cipher: Option<&'a dyn PageCipher>,
    ) -> Self {
        let capacity = page.capacity();
        page.set_kind(if is_leaf {
            PageKind::IndexLeaf
        } else {
            PageKind::IndexInternal
        });
        page.set_i32(FREE_POINTER_OFFSET, capacity as i32);
        page.set_i32(SIZE_OFFSET, 0);
        page.set_u8(IS_LEAF_OFFSET, u8::from(is_leaf));
        page.set_i64(LEFT_SIBLING_OFFSET, NO_SIBLING);
        page.set_i64(RIGHT_SIBLING_OFFSET, NO_SIBLING);
        page.set_i64(TREE_SIZE_OFFSET, 0);
        Self {
            page,
            is_leaf,
            cipher,
            _key: PhantomData,
        }
    }

    /// Wraps an already-formatted page, reading back only the node kind.
    pub fn attach(page: &'a mut DurablePage, cipher: Option<&'a dyn PageCipher>) -> Self {
        let is_leaf = page.get_u8(IS_LEAF_OFFSET) > 0;
        Self {
            page,
            is_leaf,
            cipher,
            _key: PhantomData,
        }
    }

    /// Whether this bucket is a leaf node.
    pub fn is_leaf(&self) -> bool {
        self.is_leaf
    }

    /// Number of logical entries (distinct keys) in the bucket.
    pub fn size(&self) -> usize {
        self.page.get_i32(SIZE_OFFSET) as usize
    }

    /// Whether the bucket holds no entries.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Running count of values in the whole tree. Meaningful only on the
    /// page designated to carry it (the root).
    pub fn tree_size(&self) -> i64 {
        self.page.get_i64(TREE_SIZE_OFFSET)
    }

    /// Stores the whole-tree value count.
    pub fn set_tree_size(&mut self, size: i64) {
        self.page.set_i64(TREE_SIZE_OFFSET, size);
    }

    /// Left sibling page index, [`NO_SIBLING`] when none. Leaf-only.
    pub fn left_sibling(&self) -> i64 {
        debug_assert!(self.is_leaf, "sibling pointers are leaf-only");
        self.page.get_i64(LEFT_SIBLING_OFFSET)
    }

    /// Sets the left sibling page index. Leaf-only; the tree layer calls
    /// this after a split, the bucket never rewires siblings itself.
    pub fn set_left_sibling(&mut self, page_index: i64) {
        debug_assert!(self.is_leaf, "sibling pointers are leaf-only");
        self.page.set_i64(LEFT_SIBLING_OFFSET, page_index);
    }

    /// Right sibling page index, [`NO_SIBLING`] when none. Leaf-only.
    pub fn right_sibling(&self) -> i64 {
        debug_assert!(self.is_leaf, "sibling pointers are leaf-only");
        self.page.get_i64(RIGHT_SIBLING_OFFSET)
    }

    /// Sets the right sibling page index. Leaf-only.
    pub fn set_right_sibling(&mut self, page_index: i64) {
        debug_assert!(self.is_leaf, "sibling pointers are leaf-only");
        self.page.set_i64(RIGHT_SIBLING_OFFSET, page_index);
    }

    /// Binary-searches the positions array for `key`.
    ///
    /// Returns the matching index when present; otherwise the encoded
    /// insertion point `-(low + 1)`, so `-(result + 1)` is the index the key
    /// would be inserted at to preserve order.
    pub fn find(&self, key: &K) -> Result<i32> {
        let mut probe = Vec::new();
        K::encode_key(key, &mut probe);

        let mut low: i32 = 0;
        let mut high: i32 = self.size() as i32 - 1;
        while low <= high {
            let mid = (low + high) >> 1;
            match self.compare_key_at(mid as usize, &probe)? {
                Ordering::Less => low = mid + 1,
                Ordering::Greater => high = mid - 1,
                Ordering::Equal => return Ok(mid),
            }
        }
        Ok(-(low + 1))
    }

    /// Decodes the key of logical entry `index`.
    pub fn key(&self, index: usize) -> Result<K> {
        let offset = self.key_offset(index);
        match self.cipher {
            None => {
                let len = K::encoded_len_in(self.page.data(), offset)?;
                K::decode_key(self.page.get_bytes(offset, len))
            }
            Some(cipher) => {
                let cipher_len = self.page.get_i32(offset) as usize;
                let plain = cipher.decrypt(self.page.get_bytes(offset + 4, cipher_len));
                K::decode_key(&plain)
            }
        }
    }

    /// Returns the key of logical entry `index` in its stored form: the raw
    /// codec encoding, or the length-prefixed ciphertext when encrypted.
    pub fn raw_key(&self, index: usize) -> Result<Vec<u8>> {
        let offset = self.key_offset(index);
        let len = self.stored_key_len(offset)?;
        Ok(self.page.get_bytes(offset, len).to_vec())
    }

    /// Left child page index of internal entry `index`.
    pub fn left_child(&self, index: usize) -> i32 {
        assert!(!self.is_leaf, "child pointers live on internal buckets");
        let position = self.entry_position(index);
        self.page.get_i32(position)
    }

    /// Right child page index of internal entry `index`.
    pub fn right_child(&self, index: usize) -> i32 {
        assert!(!self.is_leaf, "child pointers live on internal buckets");
        let position = self.entry_position(index);
        self.page.get_i32(position + 4)
    }

    /// Returns every record id stored under logical entry `index`: the head
    /// record followed by the extra-node chain. Leaf-only.
    pub fn values(&self, index: usize) -> Result<RecordIdList> {
        assert!(self.is_leaf, "values live on leaf buckets");
        let entry_position = self.entry_position(index);
        let next_item = self.page.get_i32(entry_position);
        let key_len = self.stored_key_len(entry_position + 4)?;
        let head_rid = self.read_rid(entry_position + 4 + key_len);

        let mut out = RecordIdList::new();
        out.push(head_rid);
        self.walk_extras(next_item, |_, rid| out.push(rid));
        Ok(out)
    }

    /// Lifts leaf entry `index` off the page as one unit for bulk repacking.
    pub fn leaf_entry(&self, index: usize) -> Result<BucketEntry> {
        assert!(self.is_leaf, "leaf entries live on leaf buckets");
        let key = self.raw_key(index)?;
        let values = self.values(index)?;
        Ok(BucketEntry::Leaf {
            key,
            values: values.into_vec(),
        })
    }

    /// Lifts internal entry `index` off the page as one unit.
    pub fn non_leaf_entry(&self, index: usize) -> Result<BucketEntry> {
        assert!(!self.is_leaf, "internal entries live on internal buckets");
        let position = self.entry_position(index);
        let left_child = self.page.get_i32(position);
        let right_child = self.page.get_i32(position + 4);
        let key = self.raw_key(index)?;
        Ok(BucketEntry::NonLeaf {
            key,
            left_child,
            right_child,
        })
    }

    /// Encodes `key` into its stored form for this bucket: the codec
    /// encoding, wrapped in `[cipher_len:i32][ciphertext]` when encrypted.
    pub fn encode_key(&self, key: &K) -> Vec<u8> {
        let mut plain = Vec::new();
        K::encode_key(key, &mut plain);
        match self.cipher {
            None => plain,
            Some(cipher) => {
                let ciphertext = cipher.encrypt(&plain);
                let mut stored = Vec::with_capacity(4 + ciphertext.len());
                stored.extend_from_slice(&(ciphertext.len() as i32).to_be_bytes());
                stored.extend_from_slice(&ciphertext);
                stored
            }
        }
    }

    /// Inserts a brand-new key with a single value at logical `index`.
    ///
    /// `key` must be in stored form (see [`MultiValueBucket::encode_key`]).
    /// Returns `false` without mutating anything when the entry does not fit.
    pub fn add_new_leaf_entry(&mut self, index: usize, key: &[u8], value: RecordId) -> bool {
        assert!(self.is_leaf, "leaf insertion on an internal bucket");
        let size = self.size();
        assert!(index <= size, "insertion index out of range");

        // next_item pointer + key + head record
        let entry_size = 4 + key.len() + RID_SIZE;
        let free_pointer = self.free_pointer();
        if free_pointer < entry_size
            || free_pointer - entry_size < POSITIONS_ARRAY_OFFSET + (size + 1) * 4
        {
            return false;
        }

        self.open_position_slot(index, size);
        let free_pointer = free_pointer - entry_size;
        self.page.set_i32(FREE_POINTER_OFFSET, free_pointer as i32);
        self.page
            .set_i32(POSITIONS_ARRAY_OFFSET + index * 4, free_pointer as i32);
        self.page.set_i32(SIZE_OFFSET, (size + 1) as i32);

        let mut pos = free_pointer;
        pos += self.page.set_i32(pos, -1);
        pos += self.page.set_bytes(pos, key);
        pos += self.page.set_i16(pos, value.cluster_id);
        self.page.set_i64(pos, value.cluster_position);
        true
    }

    /// Adds one more value to the key already at logical `index` by splicing
    /// a new extra node in as the duplicate-list head.
    ///
    /// Returns `false` without mutating anything when the node does not fit.
    pub fn append_new_leaf_entry(&mut self, index: usize, value: RecordId) -> bool {
        assert!(self.is_leaf, "leaf append on an internal bucket");
        let size = self.size();
        assert!(index < size, "append index out of range");

        let free_pointer = self.free_pointer();
        if free_pointer < EXTRA_NODE_SIZE
            || free_pointer - EXTRA_NODE_SIZE < POSITIONS_ARRAY_OFFSET + size * 4
        {
            return false;
        }

        let free_pointer = free_pointer - EXTRA_NODE_SIZE;
        self.page.set_i32(FREE_POINTER_OFFSET, free_pointer as i32);

        let entry_position = self.entry_position(index);
        let next_item = self.page.get_i32(entry_position);
        self.page.set_i32(entry_position, free_pointer as i32);

        let mut pos = free_pointer;
        pos += self.page.set_i32(pos, next_item);
        pos += self.page.set_i16(pos, value.cluster_id);
        self.page.set_i64(pos, value.cluster_position);
        true
    }

    /// Inserts an internal entry at logical `index`.
    ///
    /// Internal entries conceptually share child pointers with their
    /// neighbors, so when `update_neighbors` is set the right neighbor's left
    /// child is overwritten with `right_child` and the left neighbor's right
    /// child with `left_child`. Returns `false` without mutating anything
    /// when the entry does not fit.
    pub fn add_non_leaf_entry(
        &mut self,
        index: usize,
        key: &[u8],
        left_child: i32,
        right_child: i32,
        update_neighbors: bool,
    ) -> bool {
        assert!(!self.is_leaf, "internal insertion on a leaf bucket");
        let size = self.size();
        assert!(index <= size, "insertion index out of range");

        let entry_size = 8 + key.len();
        let free_pointer = self.free_pointer();
        if free_pointer < entry_size
            || free_pointer - entry_size < POSITIONS_ARRAY_OFFSET + (size + 1) * 4
        {
            return false;
        }

        self.open_position_slot(index, size);
        let free_pointer = free_pointer - entry_size;
        self.page.set_i32(FREE_POINTER_OFFSET, free_pointer as i32);
        self.page
            .set_i32(POSITIONS_ARRAY_OFFSET + index * 4, free_pointer as i32);
        self.page.set_i32(SIZE_OFFSET, (size + 1) as i32);

        let mut pos = free_pointer;
        pos += self.page.set_i32(pos, left_child);
        pos += self.page.set_i32(pos, right_child);
        self.page.set_bytes(pos, key);

        let size = size + 1;
        if update_neighbors && size > 1 {
            if index < size - 1 {
                let next_position = self.entry_position(index + 1);
                self.page.set_i32(next_position, right_child);
            }
            if index > 0 {
                let prev_position = self.entry_position(index - 1);
                self.page.set_i32(prev_position + 4, left_child);
            }
        }
        true
    }

    /// Removes the one value matching `value` from the key at logical
    /// `index`. Leaf-only.
    ///
    /// Returns `Ok(false)` with no mutation when `value` is not among the
    /// key's records. When the key held only that value the whole entry is
    /// deleted; otherwise the matching list node is unlinked. Freed bytes are
    /// reclaimed immediately by compaction.
    pub fn remove(&mut self, index: usize, value: RecordId) -> Result<bool> {
        assert!(self.is_leaf, "removal on an internal bucket");
        let entry_position = self.entry_position(index);
        let next_item = self.page.get_i32(entry_position);
        let key_len = self.stored_key_len(entry_position + 4)?;
        let head_rid = self.read_rid(entry_position + 4 + key_len);

        if next_item == -1 {
            // Single-value key: a match deletes the whole logical entry.
            if head_rid != value {
                return Ok(false);
            }
            let size = self.size();
            if index < size - 1 {
                self.page.move_data(
                    POSITIONS_ARRAY_OFFSET + (index + 1) * 4,
                    POSITIONS_ARRAY_OFFSET + index * 4,
                    (size - index - 1) * 4,
                );
            }
            self.page.set_i32(SIZE_OFFSET, (size - 1) as i32);
            self.reclaim(entry_position, 4 + key_len + RID_SIZE);
            return Ok(true);
        }

        if head_rid == value {
            // The head record anchors the key, so pull the second list
            // node's payload into it and free that node instead.
            let second = next_item as usize;
            let second_next = self.page.get_i32(second);
            let second_rid = self.page.get_bytes(second + 4, RID_SIZE).to_vec();

            self.page.set_i32(entry_position, second_next);
            self.page
                .set_bytes(entry_position + 4 + key_len, &second_rid);
            self.reclaim(second, EXTRA_NODE_SIZE);
            return Ok(true);
        }

        // Walk the chain; unlink the node holding the match.
        let mut prev_link = entry_position;
        let mut current = next_item;
        while current > 0 {
            let node = current as usize;
            let node_next = self.page.get_i32(node);
            let rid = self.read_rid(node + 4);
            if rid == value {
                self.page.set_i32(prev_link, node_next);
                self.reclaim(node, EXTRA_NODE_SIZE);
                return Ok(true);
            }
            prev_link = node;
            current = node_next;
        }
        Ok(false)
    }

    /// Resets entry storage and writes `entries` from scratch, in order.
    ///
    /// Used to populate a freshly split or merged bucket; the caller
    /// guarantees the entries fit. Sibling pointers and tree size are left
    /// untouched.
    pub fn add_all(&mut self, entries: &[BucketEntry]) {
        debug!(count = entries.len(), is_leaf = self.is_leaf, "bucket repack");
        let capacity = self.page.capacity();
        self.page.set_i32(FREE_POINTER_OFFSET, capacity as i32);
        self.page.set_i32(SIZE_OFFSET, 0);

        for (index, entry) in entries.iter().enumerate() {
            match entry {
                BucketEntry::Leaf { key, values } => {
                    let (head, extras) = values
                        .split_first()
                        .expect("leaf entry carries at least one value");
                    let fit = self.add_new_leaf_entry(index, key, *head);
                    debug_assert!(fit, "repacked leaf entry must fit");
                    for value in extras {
                        let fit = self.append_new_leaf_entry(index, *value);
                        debug_assert!(fit, "repacked extra value must fit");
                    }
                }
                BucketEntry::NonLeaf {
                    key,
                    left_child,
                    right_child,
                } => {
                    let fit =
                        self.add_non_leaf_entry(index, key, *left_child, *right_child, false);
                    debug_assert!(fit, "repacked internal entry must fit");
                }
            }
        }
        self.page.set_i32(SIZE_OFFSET, entries.len() as i32);
    }

    /// Keeps only the first `new_size` logical entries, rewriting the page
    /// from a blank `free_pointer` so no fragmentation is left behind. Used
    /// after a split to discard the entries now living in the sibling.
    pub fn shrink(&mut self, new_size: usize) -> Result<()> {
        assert!(new_size <= self.size(), "shrink cannot grow the bucket");
        debug!(new_size, old_size = self.size(), "bucket shrink");

        let mut entries = Vec::with_capacity(new_size);
        for index in 0..new_size {
            let entry = if self.is_leaf {
                self.leaf_entry(index)?
            } else {
                self.non_leaf_entry(index)?
            };
            entries.push(entry);
        }
        self.add_all(&entries);
        Ok(())
    }

    /// Splits the duplicate list of a bucket holding exactly one key.
    ///
    /// Such a bucket cannot split by key, so roughly the first half of the
    /// extra nodes is discarded instead, keeping the head record and the
    /// second half of the chain. The freed nodes are reclaimed through the
    /// same compaction as [`MultiValueBucket::remove`].
    pub fn half_single_entry(&mut self) -> Result<()> {
        assert!(self.is_leaf, "duplicate-list split on an internal bucket");
        assert!(self.size() == 1, "half_single_entry needs exactly one key");

        let entry_position = self.entry_position(0);
        let mut chain = Vec::new();
        self.walk_extras(self.page.get_i32(entry_position), |offset, _| {
            chain.push(offset)
        });

        // One head value plus chain.len() extras; drop the first total/2
        // chain nodes.
        let drop_count = (chain.len() + 1) / 2;
        if drop_count == 0 {
            return Ok(());
        }
        debug!(
            values = chain.len() + 1,
            dropped = drop_count,
            "duplicate-list split"
        );

        let new_head_next = if drop_count == chain.len() {
            -1
        } else {
            chain[drop_count] as i32
        };
        self.page.set_i32(entry_position, new_head_next);

        // Reclaim from the highest offset down: each pass shifts every lower
        // freed node up by the node size, which the running adjustment tracks.
        let mut freed: Vec<usize> = chain[..drop_count].to_vec();
        freed.sort_unstable();
        let mut adjustment = 0;
        for offset in freed.into_iter().rev() {
            self.reclaim(offset + adjustment, EXTRA_NODE_SIZE);
            adjustment += EXTRA_NODE_SIZE;
        }
        Ok(())
    }

    fn free_pointer(&self) -> usize {
        self.page.get_i32(FREE_POINTER_OFFSET) as usize
    }

    /// Absolute payload offset of logical entry `index`.
    fn entry_position(&self, index: usize) -> usize {
        let size = self.size();
        assert!(index < size, "entry index out of range");
        let position = self.page.get_i32(POSITIONS_ARRAY_OFFSET + index * 4) as usize;
        debug_assert!(
            position >= POSITIONS_ARRAY_OFFSET + size * 4 && position < self.page.capacity(),
            "entry position {position} outside the payload arena"
        );
        position
    }

    /// Offset of entry `index`'s stored key, past the fixed leading fields.
    fn key_offset(&self, index: usize) -> usize {
        let position = self.entry_position(index);
        if self.is_leaf {
            position + 4
        } else {
            position + 8
        }
    }

    /// Length of the stored key at `offset`: codec-sized, or the ciphertext
    /// prefix plus its length field when encrypted.
    fn stored_key_len(&self, offset: usize) -> Result<usize> {
        match self.cipher {
            None => K::encoded_len_in(self.page.data(), offset),
            Some(_) => {
                let cipher_len = self.page.get_i32(offset) as usize;
                Ok(4 + cipher_len)
            }
        }
    }

    fn compare_key_at(&self, index: usize, probe: &[u8]) -> Result<Ordering> {
        let offset = self.key_offset(index);
        match self.cipher {
            None => {
                let len = K::encoded_len_in(self.page.data(), offset)?;
                Ok(K::compare_encoded(self.page.get_bytes(offset, len), probe))
            }
            Some(cipher) => {
                let cipher_len = self.page.get_i32(offset) as usize;
                let plain = cipher.decrypt(self.page.get_bytes(offset + 4, cipher_len));
                Ok(K::compare_encoded(&plain, probe))
            }
        }
    }

    fn read_rid(&self, offset: usize) -> RecordId {
        RecordId {
            cluster_id: self.page.get_i16(offset),
            cluster_position: self.page.get_i64(offset + 2),
        }
    }

    /// Visits every extra node of a duplicate list starting at `next_item`.
    fn walk_extras(&self, mut next_item: i32, mut visit: impl FnMut(usize, RecordId)) {
        while next_item > 0 {
            let node = next_item as usize;
            visit(node, self.read_rid(node + 4));
            next_item = self.page.get_i32(node);
        }
    }

    /// Shifts positions-array slots `[index, size)` up by one to make room
    /// for an insertion at `index`.
    fn open_position_slot(&mut self, index: usize, size: usize) {
        if index < size {
            self.page.move_data(
                POSITIONS_ARRAY_OFFSET + index * 4,
                POSITIONS_ARRAY_OFFSET + (index + 1) * 4,
                (size - index) * 4,
            );
        }
    }

    /// Reclaims `freed_len` payload bytes at `freed_offset`.
    ///
    /// Closes the gap by shifting the byte range `[free_pointer,
    /// freed_offset)` up by `freed_len`, advances `free_pointer`, then
    /// rewrites every recorded offset that pointed below `freed_offset`: the
    /// positions array, and on leaf pages the `next_item` links threaded
    /// through the shifted payload. The freed range must already be
    /// unreferenced.
    fn reclaim(&mut self, freed_offset: usize, freed_len: usize) {
        let free_pointer = self.free_pointer();
        debug_assert!(freed_offset >= free_pointer, "freed range below the arena");

        if freed_offset > free_pointer {
            self.page
                .move_data(free_pointer, free_pointer + freed_len, freed_offset - free_pointer);
        }
        self.page
            .set_i32(FREE_POINTER_OFFSET, (free_pointer + freed_len) as i32);

        let size = self.size();
        for slot in 0..size {
            let slot_offset = POSITIONS_ARRAY_OFFSET + slot * 4;
            let position = self.page.get_i32(slot_offset) as usize;
            if position < freed_offset {
                self.page.set_i32(slot_offset, (position + freed_len) as i32);
            }
        }

        if self.is_leaf {
            for slot in 0..size {
                self.shift_chain_links(self.entry_position(slot), freed_offset, freed_len);
            }
        }
    }

    /// Rewrites the `next_item` links of one duplicate list after the bytes
    /// below `freed_offset` moved up by `freed_len`.
    fn shift_chain_links(&mut self, entry_position: usize, freed_offset: usize, freed_len: usize) {
        let mut link_offset = entry_position;
        loop {
            let target = self.page.get_i32(link_offset);
            if target <= 0 {
                break;
            }
            let mut node = target as usize;
            if node < freed_offset {
                node += freed_len;
                self.page.set_i32(link_offset, node as i32);
            }
            link_offset = node;
        }
    }
}
