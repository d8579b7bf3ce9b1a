#![forbid(unsafe_code)]
//! Order-preserving key encoders shared by the built-in [`crate::KeyCodec`]
//! implementations.

pub mod ord {
    //! Encoders whose byte order under `memcmp` matches logical order.

    use core::convert::TryInto;

    const U64_LEN: usize = core::mem::size_of::<u64>();
    const SIGN_BIT: u64 = 1 << 63;

    /// Big-endian encoding for lexicographic order preservation.
    pub fn put_u64_be(dst: &mut [u8], v: u64) {
        assert!(dst.len() >= U64_LEN, "destination too small");
        dst[..U64_LEN].copy_from_slice(&v.to_be_bytes());
    }

    /// Decodes a u64 from big-endian byte order.
    pub fn get_u64_be(src: &[u8]) -> u64 {
        let head = src
            .get(..U64_LEN)
            .unwrap_or_else(|| panic!("u64 source shorter than 8 bytes (have {})", src.len()));
        let bytes: [u8; U64_LEN] = head.try_into().unwrap();
        u64::from_be_bytes(bytes)
    }

    /// Encodes a signed i64 with order preservation (flip sign bit for sorting).
    pub fn put_i64_be(dst: &mut [u8], v: i64) {
        let flipped = (v as u64) ^ SIGN_BIT;
        put_u64_be(dst, flipped);
    }

    /// Decodes a signed i64 with order preservation.
    pub fn get_i64_be(src: &[u8]) -> i64 {
        let flipped = get_u64_be(src);
        let raw = flipped ^ SIGN_BIT;
        raw as i64
    }

    /// Appends a length-prefixed string key to a byte vector.
    pub fn put_str_key(dst: &mut Vec<u8>, s: &str) {
        let len = s.len();
        assert!(
            len <= u32::MAX as usize,
            "string key too long (>{} bytes)",
            u32::MAX
        );
        dst.extend_from_slice(&(len as u32).to_be_bytes());
        dst.extend_from_slice(s.as_bytes());
    }

    /// Splits a length-prefixed string key, returning the string and its
    /// total length in bytes (prefix included).
    pub fn split_str_key(src: &[u8]) -> (&str, usize) {
        const LEN_LEN: usize = core::mem::size_of::<u32>();
        assert!(
            src.len() >= LEN_LEN,
            "string key slice shorter than length prefix"
        );
        let len = u32::from_be_bytes(
            src[..LEN_LEN]
                .try_into()
                .expect("prefix conversion should not fail"),
        ) as usize;
        let end = LEN_LEN + len;
        assert!(src.len() >= end, "string key slice shorter than its prefix");
        let s = core::str::from_utf8(&src[LEN_LEN..end]).expect("string key not utf-8");
        (s, end)
    }
}

#[cfg(test)]
mod tests {
    use super::ord;

    #[test]
    fn u64_round_trip_preserves_order() {
        let mut a = [0u8; 8];
        let mut b = [0u8; 8];
        ord::put_u64_be(&mut a, 3);
        ord::put_u64_be(&mut b, 300);
        assert!(a < b);
        assert_eq!(ord::get_u64_be(&a), 3);
        assert_eq!(ord::get_u64_be(&b), 300);
    }

    #[test]
    fn i64_sign_flip_orders_negatives_first() {
        let mut neg = [0u8; 8];
        let mut pos = [0u8; 8];
        ord::put_i64_be(&mut neg, -5);
        ord::put_i64_be(&mut pos, 5);
        assert!(neg < pos);
        assert_eq!(ord::get_i64_be(&neg), -5);
        assert_eq!(ord::get_i64_be(&pos), 5);
    }

    #[test]
    fn str_key_round_trip() {
        let mut buf = Vec::new();
        ord::put_str_key(&mut buf, "alpha");
        let (s, len) = ord::split_str_key(&buf);
        assert_eq!(s, "alpha");
        assert_eq!(len, buf.len());
    }
}
