#![forbid(unsafe_code)]

//! Seams between the bucket and its collaborators: key (de)serialization and
//! optional page-level key encryption.

use std::cmp::Ordering;

use crate::bytes::ord;
use crate::types::{Error, Result};

/// Trait implemented by key types that can be stored in a bucket.
///
/// Keys live on the page in their encoded form. Lookup compares encoded
/// bytes directly via [`KeyCodec::compare_encoded`] so a search never has to
/// decode keys it only routes past; [`KeyCodec::encoded_len_in`] sizes a key
/// that is already stored at some offset without decoding it either.
pub trait KeyCodec: Sized {
    /// Encode `key` into `out` using the order-preserving representation.
    fn encode_key(key: &Self, out: &mut Vec<u8>);

    /// Compare two encoded keys without decoding them.
    fn compare_encoded(a: &[u8], b: &[u8]) -> Ordering;

    /// Decode a key from its encoded representation.
    fn decode_key(bytes: &[u8]) -> Result<Self>;

    /// Length in bytes of the encoded key starting at `offset` in `buf`.
    fn encoded_len_in(buf: &[u8], offset: usize) -> Result<usize>;
}

impl KeyCodec for u64 {
    fn encode_key(key: &Self, out: &mut Vec<u8>) {
        let mut buf = [0u8; 8];
        ord::put_u64_be(&mut buf, *key);
        out.extend_from_slice(&buf);
    }

    fn compare_encoded(a: &[u8], b: &[u8]) -> Ordering {
        a.cmp(b)
    }

    fn decode_key(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 8 {
            return Err(Error::Corruption("u64 key shorter than 8 bytes"));
        }
        Ok(ord::get_u64_be(bytes))
    }

    fn encoded_len_in(_buf: &[u8], _offset: usize) -> Result<usize> {
        Ok(8)
    }
}

impl KeyCodec for i64 {
    fn encode_key(key: &Self, out: &mut Vec<u8>) {
        let mut buf = [0u8; 8];
        ord::put_i64_be(&mut buf, *key);
        out.extend_from_slice(&buf);
    }

    fn compare_encoded(a: &[u8], b: &[u8]) -> Ordering {
        a.cmp(b)
    }

    fn decode_key(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 8 {
            return Err(Error::Corruption("i64 key shorter than 8 bytes"));
        }
        Ok(ord::get_i64_be(bytes))
    }

    fn encoded_len_in(_buf: &[u8], _offset: usize) -> Result<usize> {
        Ok(8)
    }
}

impl KeyCodec for String {
    fn encode_key(key: &Self, out: &mut Vec<u8>) {
        ord::put_str_key(out, key);
    }

    fn compare_encoded(a: &[u8], b: &[u8]) -> Ordering {
        let (sa, _) = ord::split_str_key(a);
        let (sb, _) = ord::split_str_key(b);
        sa.cmp(sb)
    }

    fn decode_key(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 4 {
            return Err(Error::Corruption("string key shorter than length prefix"));
        }
        let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        let end = 4 + len;
        if bytes.len() < end {
            return Err(Error::Corruption("string key truncated"));
        }
        let s = std::str::from_utf8(&bytes[4..end])
            .map_err(|_| Error::Corruption("string key not utf-8"))?;
        Ok(s.to_owned())
    }

    fn encoded_len_in(buf: &[u8], offset: usize) -> Result<usize> {
        let prefix = buf
            .get(offset..offset + 4)
            .ok_or(Error::Corruption("string key length prefix out of page"))?;
        let len = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
        Ok(4 + len)
    }
}

/// Optional page-level encryption for stored keys.
///
/// When a cipher is configured, every key is stored as
/// `[cipher_len:i32][ciphertext]` instead of the codec's native encoding, and
/// reads that need the logical key decrypt first. Raw-byte paths (copying an
/// entry during repack) move the prefixed ciphertext untouched.
pub trait PageCipher {
    /// Encrypts the codec-encoded key bytes.
    fn encrypt(&self, plain: &[u8]) -> Vec<u8>;

    /// Decrypts stored ciphertext back to codec-encoded key bytes.
    fn decrypt(&self, cipher: &[u8]) -> Vec<u8>;
}
