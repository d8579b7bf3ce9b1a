#![forbid(unsafe_code)]

//! Fixed-size durable page buffer.
//!
//! A [`DurablePage`] is the only mutation path to a page's bytes. Every write
//! is captured as a physical [`PageOp`] (offset + new bytes) so the owning
//! write-ahead-log layer can persist and replay it; replaying the recorded
//! ops onto a blank buffer of the same size reproduces the page exactly, and
//! replay is idempotent. The page never performs I/O or locking itself — the
//! external page cache pins the buffer and serializes writers.

use tracing::trace;

use crate::types::{Error, PageId, Result};

/// Magic bytes identifying an index page.
pub const PAGE_MAGIC: [u8; 4] = *b"MVBK";
/// On-disk format version written into every page header.
pub const PAGE_FORMAT_VERSION: u16 = 1;
/// Default page capacity in bytes.
pub const DEFAULT_PAGE_SIZE: u32 = 8192;
/// Length of the generic page header preceding any payload.
pub const PAGE_HDR_LEN: usize = 32;

/// Byte offsets for the generic page header fields.
pub mod header {
    use core::ops::Range;

    /// Magic bytes.
    pub const MAGIC: Range<usize> = 0..4;
    /// Format version.
    pub const FORMAT_VERSION: Range<usize> = 4..6;
    /// Page kind discriminant.
    pub const PAGE_KIND: usize = 6;
    /// Reserved byte, always zero.
    pub const RESERVED: usize = 7;
    /// Page capacity in bytes.
    pub const PAGE_SIZE: Range<usize> = 8..12;
    /// Page number within the index file.
    pub const PAGE_NO: Range<usize> = 12..20;
    /// LSN of the last mutation, maintained by the external WAL layer.
    pub const LSN: Range<usize> = 20..28;
    /// CRC32 slot, filled by the external pager on write-out.
    pub const CRC32: Range<usize> = 28..32;
}

/// Logical kind of an index page.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PageKind {
    /// Freshly allocated, not yet formatted by a bucket.
    Blank = 0,
    /// Leaf node carrying key -> record-id-list entries.
    IndexLeaf = 1,
    /// Internal node carrying key -> child-pointer entries.
    IndexInternal = 2,
}

impl PageKind {
    /// Returns the raw discriminant byte.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for PageKind {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(PageKind::Blank),
            1 => Ok(PageKind::IndexLeaf),
            2 => Ok(PageKind::IndexInternal),
            _ => Err(Error::Corruption("unknown page kind")),
        }
    }
}

/// One recorded page mutation: `bytes` were written at `offset`.
///
/// Ops are pure physical redo records. Applying a sequence of ops in order
/// is idempotent, so a recovery pass may replay a tail of the log that was
/// already partially applied.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PageOp {
    /// Absolute byte offset of the write within the page.
    pub offset: u32,
    /// The bytes that were written.
    pub bytes: Vec<u8>,
}

impl PageOp {
    /// Encodes the op as `[offset:u32][len:u32][bytes]` for log framing.
    pub fn encode(&self, dst: &mut Vec<u8>) {
        dst.extend_from_slice(&self.offset.to_be_bytes());
        dst.extend_from_slice(&(self.bytes.len() as u32).to_be_bytes());
        dst.extend_from_slice(&self.bytes);
    }

    /// Decodes one op from `src`, returning it and the bytes consumed.
    pub fn decode(src: &[u8]) -> Result<(Self, usize)> {
        if src.len() < 8 {
            return Err(Error::Corruption("page op header truncated"));
        }
        let offset = u32::from_be_bytes([src[0], src[1], src[2], src[3]]);
        let len = u32::from_be_bytes([src[4], src[5], src[6], src[7]]) as usize;
        let end = 8 + len;
        if src.len() < end {
            return Err(Error::Corruption("page op body truncated"));
        }
        Ok((
            Self {
                offset,
                bytes: src[8..end].to_vec(),
            },
            end,
        ))
    }
}

/// A fixed-size page buffer with typed accessors and a mutation log.
#[derive(Debug)]
pub struct DurablePage {
    buf: Vec<u8>,
    ops: Vec<PageOp>,
}

impl DurablePage {
    /// Formats a brand-new page of `page_size` bytes with a generic header.
    ///
    /// The header writes themselves go through the logged path, so a fresh
    /// page is fully reconstructible from its op log alone.
    pub fn new(page_no: PageId, page_size: u32) -> Result<Self> {
        if (page_size as usize) < PAGE_HDR_LEN {
            return Err(Error::Invalid("page size smaller than header"));
        }
        let mut page = Self {
            buf: vec![0u8; page_size as usize],
            ops: Vec::new(),
        };
        page.set_bytes(header::MAGIC.start, &PAGE_MAGIC);
        page.set_bytes(header::FORMAT_VERSION.start, &PAGE_FORMAT_VERSION.to_be_bytes());
        page.set_u8(header::PAGE_KIND, PageKind::Blank.as_u8());
        page.set_u8(header::RESERVED, 0);
        page.set_bytes(header::PAGE_SIZE.start, &page_size.to_be_bytes());
        page.set_bytes(header::PAGE_NO.start, &page_no.0.to_be_bytes());
        Ok(page)
    }

    /// Attaches to an existing page image, validating the generic header.
    pub fn from_bytes(buf: Vec<u8>) -> Result<Self> {
        if buf.len() < PAGE_HDR_LEN {
            return Err(Error::Corruption("page shorter than header"));
        }
        if buf[header::MAGIC] != PAGE_MAGIC {
            return Err(Error::Corruption("bad page magic"));
        }
        let version = u16::from_be_bytes([buf[4], buf[5]]);
        if version != PAGE_FORMAT_VERSION {
            return Err(Error::Corruption("unsupported page format version"));
        }
        let declared = u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]) as usize;
        if declared != buf.len() {
            return Err(Error::Corruption("page size field disagrees with buffer"));
        }
        PageKind::try_from(buf[header::PAGE_KIND])?;
        Ok(Self {
            buf,
            ops: Vec::new(),
        })
    }

    /// Total capacity of the page in bytes.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Page number stored in the generic header.
    pub fn page_no(&self) -> PageId {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&self.buf[header::PAGE_NO]);
        PageId(u64::from_be_bytes(raw))
    }

    /// Kind byte stored in the generic header.
    pub fn kind(&self) -> Result<PageKind> {
        PageKind::try_from(self.buf[header::PAGE_KIND])
    }

    /// Stamps the page kind. Called once when a bucket formats the page.
    pub fn set_kind(&mut self, kind: PageKind) {
        self.set_u8(header::PAGE_KIND, kind.as_u8());
    }

    /// LSN of the last logged mutation, maintained by the external WAL layer.
    pub fn lsn(&self) -> u64 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&self.buf[header::LSN]);
        u64::from_be_bytes(raw)
    }

    /// Stamps the header LSN field.
    pub fn set_lsn(&mut self, lsn: u64) {
        self.set_bytes(header::LSN.start, &lsn.to_be_bytes());
    }

    /// Immutable view of the whole page image.
    pub fn data(&self) -> &[u8] {
        &self.buf
    }

    /// Reads one byte at `offset`.
    pub fn get_u8(&self, offset: usize) -> u8 {
        assert!(offset < self.buf.len(), "byte read out of page");
        self.buf[offset]
    }

    /// Reads a big-endian i16 at `offset`.
    pub fn get_i16(&self, offset: usize) -> i16 {
        let raw = self.read(offset, 2);
        i16::from_be_bytes([raw[0], raw[1]])
    }

    /// Reads a big-endian i32 at `offset`.
    pub fn get_i32(&self, offset: usize) -> i32 {
        let raw = self.read(offset, 4);
        i32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]])
    }

    /// Reads a big-endian i64 at `offset`.
    pub fn get_i64(&self, offset: usize) -> i64 {
        let raw = self.read(offset, 8);
        let mut arr = [0u8; 8];
        arr.copy_from_slice(raw);
        i64::from_be_bytes(arr)
    }

    /// Reads `len` raw bytes at `offset`.
    pub fn get_bytes(&self, offset: usize, len: usize) -> &[u8] {
        self.read(offset, len)
    }

    /// Writes one byte, returning the bytes written.
    pub fn set_u8(&mut self, offset: usize, value: u8) -> usize {
        self.write(offset, &[value]);
        1
    }

    /// Writes a big-endian i16, returning the bytes written.
    pub fn set_i16(&mut self, offset: usize, value: i16) -> usize {
        self.write(offset, &value.to_be_bytes());
        2
    }

    /// Writes a big-endian i32, returning the bytes written.
    pub fn set_i32(&mut self, offset: usize, value: i32) -> usize {
        self.write(offset, &value.to_be_bytes());
        4
    }

    /// Writes a big-endian i64, returning the bytes written.
    pub fn set_i64(&mut self, offset: usize, value: i64) -> usize {
        self.write(offset, &value.to_be_bytes());
        8
    }

    /// Writes raw bytes, returning the bytes written.
    pub fn set_bytes(&mut self, offset: usize, value: &[u8]) -> usize {
        self.write(offset, value);
        value.len()
    }

    /// Copies `len` bytes from `src` to `dst` within the page. The ranges may
    /// overlap; the copy behaves as if staged through a scratch buffer.
    pub fn move_data(&mut self, src: usize, dst: usize, len: usize) {
        if len == 0 {
            return;
        }
        assert!(src + len <= self.buf.len(), "move source out of page");
        assert!(dst + len <= self.buf.len(), "move destination out of page");
        let moved = self.buf[src..src + len].to_vec();
        self.write(dst, &moved);
    }

    /// Drains the mutation log accumulated since the last call.
    pub fn take_ops(&mut self) -> Vec<PageOp> {
        std::mem::take(&mut self.ops)
    }

    /// Number of mutations recorded since the last [`DurablePage::take_ops`].
    pub fn pending_ops(&self) -> usize {
        self.ops.len()
    }

    /// Replays recorded ops onto a raw page buffer. Used by recovery to
    /// rebuild a page image from its log; safe to call more than once with
    /// the same ops.
    pub fn replay(buf: &mut [u8], ops: &[PageOp]) -> Result<()> {
        for op in ops {
            let start = op.offset as usize;
            let end = start
                .checked_add(op.bytes.len())
                .ok_or(Error::Corruption("page op length overflow"))?;
            if end > buf.len() {
                return Err(Error::Corruption("page op outside page"));
            }
            buf[start..end].copy_from_slice(&op.bytes);
        }
        Ok(())
    }

    fn read(&self, offset: usize, len: usize) -> &[u8] {
        let end = offset.checked_add(len).expect("page read overflows usize");
        assert!(end <= self.buf.len(), "read of {len} bytes at {offset} out of page");
        &self.buf[offset..end]
    }

    fn write(&mut self, offset: usize, bytes: &[u8]) {
        let end = offset
            .checked_add(bytes.len())
            .expect("page write overflows usize");
        assert!(
            end <= self.buf.len(),
            "write of {} bytes at {offset} out of page",
            bytes.len()
        );
        self.buf[offset..end].copy_from_slice(bytes);
        trace!(offset, len = bytes.len(), "page write");
        self.ops.push(PageOp {
            offset: offset as u32,
            bytes: bytes.to_vec(),
        });
    }
}
