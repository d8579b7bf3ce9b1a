//! On-page format and in-page algorithms for multi-value B+ tree index
//! buckets: the node layout used by a secondary index that maps one key to
//! many record ids.
//!
//! The crate owns exactly one layer of a storage engine. A
//! [`page::DurablePage`] is a fixed-size byte buffer whose every mutation is
//! captured for crash-recovery replay; a [`bucket::MultiValueBucket`] wraps
//! one page and interprets it as a leaf node (key -> record-id list) or an
//! internal node (key -> child page pointers). The page cache, write-ahead
//! log, and tree rebalancing logic above are external collaborators reached
//! through narrow seams ([`codec::KeyCodec`], [`codec::PageCipher`]).

#![warn(missing_docs)]

pub mod bucket;
pub mod bytes;
pub mod codec;
pub mod page;
pub mod types;

pub use bucket::{BucketEntry, MultiValueBucket};
pub use codec::{KeyCodec, PageCipher};
pub use page::{DurablePage, PageOp};
pub use types::{Error, PageId, RecordId, Result};
